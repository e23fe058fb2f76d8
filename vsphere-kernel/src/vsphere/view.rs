use std::sync::Arc;
use tracing::{error, warn};
use vsphere_vim::{ManagedObjectReference, ObjectContent, VimApi, VimError};

/// Vue conteneur récursive sur le dossier racine.
///
/// Doit être rendue avec `release()`. Si le futur qui la détient est annulé
/// avant, `Drop` planifie la destruction sur le runtime courant.
pub struct ContainerView {
    api: Arc<dyn VimApi>,
    moref: ManagedObjectReference,
    released: bool,
}

impl ContainerView {
    pub async fn open(api: &Arc<dyn VimApi>, kind: &str) -> Result<Self, VimError> {
        let root = api.content().root_folder.clone();
        let moref = api.create_container_view(&root, &[kind], true).await?;
        Ok(Self { api: api.clone(), moref, released: false })
    }

    pub async fn objects(&self) -> Result<Vec<ManagedObjectReference>, VimError> {
        self.api.view_objects(&self.moref).await
    }

    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = self.api.destroy_view(&self.moref).await {
            warn!("Failed to destroy container view {}: {}", self.moref, e);
        }
    }
}

impl Drop for ContainerView {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("Container view {} leaked: no runtime to release it", self.moref);
            return;
        };
        let api = self.api.clone();
        let moref = self.moref.clone();
        handle.spawn(async move {
            if let Err(e) = api.destroy_view(&moref).await {
                warn!("Failed to destroy container view {}: {}", moref, e);
            }
        });
    }
}

/// Lit `paths` sur tous les objets de type `kind` en un seul aller-retour.
/// La vue est libérée sur tous les chemins.
///
/// Un objet supprimé entre l'énumération et la lecture fait échouer le lot
/// entier : on relit alors objet par objet et on écarte les disparus.
pub async fn retrieve_all(
    api: &Arc<dyn VimApi>,
    kind: &str,
    paths: &[&str],
) -> Result<Vec<ObjectContent>, VimError> {
    let view = ContainerView::open(api, kind).await?;
    let outcome = match view.objects().await {
        Ok(objects) if objects.is_empty() => Ok(Vec::new()),
        Ok(objects) => match api.retrieve_properties(&objects, paths).await {
            Err(e) if e.is_not_found() => retrieve_each(api, &objects, paths).await,
            other => other,
        },
        Err(e) => Err(e),
    };
    view.release().await;
    outcome
}

async fn retrieve_each(
    api: &Arc<dyn VimApi>,
    objects: &[ManagedObjectReference],
    paths: &[&str],
) -> Result<Vec<ObjectContent>, VimError> {
    let mut contents = Vec::with_capacity(objects.len());
    for obj in objects {
        match api.retrieve_properties(std::slice::from_ref(obj), paths).await {
            Ok(found) => contents.extend(found),
            Err(e) if e.is_not_found() => error!("Object {} disappeared during listing: {}", obj, e),
            Err(e) => return Err(e),
        }
    }
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsphere_devkit::{Inventory, MockOp, MockVm, TestHarness};
    use vsphere_vim::{kinds, VimConnector};

    async fn session(harness: &TestHarness) -> Arc<dyn VimApi> {
        harness.connector.connect(&harness.target()).await.unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_all_releases_view() {
        let harness = TestHarness::new(
            Inventory::new().vm(MockVm::new("vm-1", "alpha")).vm(MockVm::new("vm-2", "beta")),
        );
        let api = session(&harness).await;

        let contents = retrieve_all(&api, kinds::VIRTUAL_MACHINE, &["name"]).await.unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(harness.vim.views_created(), 1);
        assert_eq!(harness.vim.open_views(), 0);
    }

    #[tokio::test]
    async fn test_retrieve_failure_still_releases_view() {
        let harness = TestHarness::new(Inventory::new().vm(MockVm::new("vm-1", "alpha")));
        harness.vim.fail_on(MockOp::Retrieve);
        let api = session(&harness).await;

        assert!(retrieve_all(&api, kinds::VIRTUAL_MACHINE, &["name"]).await.is_err());
        assert_eq!(harness.vim.views_destroyed(), 1);
        assert_eq!(harness.vim.open_views(), 0);
    }

    #[tokio::test]
    async fn test_vanished_object_is_skipped() {
        let harness = TestHarness::new(
            Inventory::new()
                .vm(MockVm::new("vm-1", "alpha"))
                .vm(MockVm::new("vm-2", "beta"))
                .vm(MockVm::new("vm-3", "gamma")),
        );
        harness.vim.vanish_after_listing("vm-2");
        let api = session(&harness).await;

        let contents = retrieve_all(&api, kinds::VIRTUAL_MACHINE, &["name"]).await.unwrap();
        let moids: Vec<_> = contents.iter().map(|c| c.obj.value.as_str()).collect();
        assert_eq!(moids, vec!["vm-1", "vm-3"]);
        assert_eq!(harness.errors(), 1);
        assert_eq!(harness.vim.open_views(), 0);
    }

    #[tokio::test]
    async fn test_dropped_view_is_released_in_background() {
        let harness = TestHarness::new(Inventory::new());
        let api = session(&harness).await;

        let view = ContainerView::open(&api, kinds::HOST_SYSTEM).await.unwrap();
        assert_eq!(harness.vim.open_views(), 1);
        drop(view);
        tokio::task::yield_now().await;
        assert_eq!(harness.vim.open_views(), 0);
    }
}
