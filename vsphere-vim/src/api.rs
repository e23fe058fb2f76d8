use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::VimError;
use crate::types::{
    ConnectTarget, ManagedObjectReference, ObjectContent, PerfCounterInfo, PerfEntityMetric,
    PerfQuerySpec, ServiceContent,
};

/// Session authentifiée sur un endpoint de gestion.
///
/// Chaque appel est un unique aller-retour, sans cache ni nouvelle tentative.
/// Les méthodes à tâche rendent la référence de la tâche dès que l'endpoint
/// a accepté la requête, sans attendre sa fin.
#[async_trait]
pub trait VimApi: Send + Sync {
    /// Points d'entrée résolus au login
    fn content(&self) -> &ServiceContent;

    /// Crée une vue sur tous les objets des types donnés sous `container`
    async fn create_container_view(
        &self,
        container: &ManagedObjectReference,
        kinds: &[&str],
        recursive: bool,
    ) -> Result<ManagedObjectReference, VimError>;

    /// Objets visibles dans la vue, dans l'ordre du serveur
    async fn view_objects(&self, view: &ManagedObjectReference) -> Result<Vec<ManagedObjectReference>, VimError>;

    async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<(), VimError>;

    /// Lit `paths` sur chaque objet. Une propriété non renseignée est absente,
    /// un fault de lecture par objet atterrit dans `ObjectContent::missing`
    async fn retrieve_properties(
        &self,
        objects: &[ManagedObjectReference],
        paths: &[&str],
    ) -> Result<Vec<ObjectContent>, VimError>;

    async fn perf_counters(&self) -> Result<Vec<PerfCounterInfo>, VimError>;

    async fn query_perf(&self, spec: &PerfQuerySpec) -> Result<Vec<PerfEntityMetric>, VimError>;

    /// Invoque une méthode sur un objet géré. Rend la tâche pour les
    /// méthodes `*_Task` et `None` pour les méthodes sans retour
    async fn invoke(
        &self,
        obj: &ManagedObjectReference,
        method: &str,
        args: Value,
    ) -> Result<Option<ManagedObjectReference>, VimError>;

    async fn logout(&self) -> Result<(), VimError>;
}

/// Ouvre les sessions. Un connecteur par processus, une session par login.
#[async_trait]
pub trait VimConnector: Send + Sync {
    async fn connect(&self, target: &ConnectTarget) -> Result<Arc<dyn VimApi>, VimError>;
}
