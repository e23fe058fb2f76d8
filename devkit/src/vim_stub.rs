/*!
Endpoint de gestion simulé pour tests sans vCenter

`MockVim` implémente `VimApi` sur un `Inventory` en mémoire.
Enregistre toutes les invocations de méthodes, les requêtes de performance
et le cycle de vie des vues, et permet d'injecter des pannes par opération.
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use vsphere_vim::{
    ConnectTarget, ManagedObjectReference, MissingProperty, ObjectContent, PerfCounterInfo,
    PerfEntityMetric, PerfMetricSeries, PerfQuerySpec, ServiceContent, VimApi, VimConnector, VimError,
};

use crate::inventory::Inventory;

/// Opérations sur lesquelles une panne peut être injectée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    CreateView,
    ViewObjects,
    DestroyView,
    Retrieve,
    PerfCounters,
    QueryPerf,
    Invoke,
    Logout,
}

/// Invocation de méthode enregistrée
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub obj: ManagedObjectReference,
    pub method: String,
    pub args: Value,
}

#[derive(Default)]
struct MockState {
    inventory: Inventory,
    views: HashMap<String, Vec<ManagedObjectReference>>,
    next_view: u32,
    next_task: u32,
    views_created: usize,
    views_destroyed: usize,
    calls: Vec<MockCall>,
    perf_queries: Vec<PerfQuerySpec>,
    failures: HashSet<MockOp>,
    logouts: Vec<u32>,
    /// VMs supprimées juste après la prochaine énumération de vue
    vanishing: Vec<String>,
}

/// Session simulée; les clones partagent le même état
#[derive(Clone)]
pub struct MockVim {
    state: Arc<Mutex<MockState>>,
    content: ServiceContent,
    session: u32,
}

impl MockVim {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState { inventory, ..MockState::default() })),
            content: default_content(),
            session: 0,
        }
    }

    /// Nouvelle session sur le même état partagé
    fn open_session(&self, session: u32) -> Self {
        Self { state: self.state.clone(), content: self.content.clone(), session }
    }

    pub fn session_id(&self) -> u32 {
        self.session
    }

    pub fn fail_on(&self, op: MockOp) {
        self.state.lock().failures.insert(op);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Modifie l'inventaire en place (ex: changer l'état d'alimentation)
    pub fn update_inventory<F: FnOnce(&mut Inventory)>(&self, f: F) {
        f(&mut self.state.lock().inventory);
    }

    /// Simule une VM supprimée entre l'énumération d'une vue et la lecture
    /// de ses propriétés
    pub fn vanish_after_listing(&self, moid: impl Into<String>) {
        self.state.lock().vanishing.push(moid.into());
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn calls_for(&self, method: &str) -> Vec<MockCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn perf_queries(&self) -> Vec<PerfQuerySpec> {
        self.state.lock().perf_queries.clone()
    }

    /// Vues créées et pas encore détruites
    pub fn open_views(&self) -> usize {
        self.state.lock().views.len()
    }

    pub fn views_created(&self) -> usize {
        self.state.lock().views_created
    }

    pub fn views_destroyed(&self) -> usize {
        self.state.lock().views_destroyed
    }

    /// Sessions fermées via Logout, dans l'ordre
    pub fn logouts(&self) -> Vec<u32> {
        self.state.lock().logouts.clone()
    }

    fn check(&self, op: MockOp) -> Result<(), VimError> {
        if self.state.lock().failures.contains(&op) {
            return Err(VimError::fault("SystemError", format!("injected failure in {op:?}")));
        }
        Ok(())
    }
}

fn default_content() -> ServiceContent {
    ServiceContent {
        root_folder: ManagedObjectReference::new("Folder", "group-d1"),
        property_collector: ManagedObjectReference::new("PropertyCollector", "propertyCollector"),
        view_manager: ManagedObjectReference::new("ViewManager", "ViewManager"),
        perf_manager: ManagedObjectReference::new("PerformanceManager", "PerfMgr"),
        session_manager: ManagedObjectReference::new("SessionManager", "SessionManager"),
        about: None,
    }
}

fn object_content(inventory: &Inventory, obj: &ManagedObjectReference, paths: &[&str]) -> Option<ObjectContent> {
    let mut targeted: HashMap<String, String> = HashMap::new();
    let (lookup, fault): (Box<dyn Fn(&str) -> Option<Value>>, Option<String>) = match obj.kind.as_str() {
        vsphere_vim::kinds::VIRTUAL_MACHINE => {
            let vm = inventory.find_vm(&obj.value)?.clone();
            let fault = vm.fault.clone();
            targeted = vm.property_faults.clone();
            (Box::new(move |p: &str| vm.property(p)), fault)
        }
        vsphere_vim::kinds::HOST_SYSTEM => {
            let host = inventory.find_host(&obj.value)?.clone();
            let fault = host.fault.clone();
            (Box::new(move |p: &str| host.property(p)), fault)
        }
        _ => {
            let net = inventory.find_network(obj)?.clone();
            (Box::new(move |p: &str| net.property(p)), None)
        }
    };

    let mut content = ObjectContent::new(obj.clone());
    for path in paths {
        let fault = targeted
            .get(*path)
            .or(fault.as_ref().filter(|_| *path != "name"));
        match fault {
            Some(fault) => content.missing.push(MissingProperty {
                path: path.to_string(),
                fault: fault.clone(),
            }),
            None => {
                if let Some(value) = lookup(path) {
                    content.properties.insert(path.to_string(), value);
                }
            }
        }
    }
    Some(content)
}

#[async_trait]
impl VimApi for MockVim {
    fn content(&self) -> &ServiceContent {
        &self.content
    }

    async fn create_container_view(
        &self,
        container: &ManagedObjectReference,
        kinds: &[&str],
        recursive: bool,
    ) -> Result<ManagedObjectReference, VimError> {
        self.check(MockOp::CreateView)?;
        let mut state = self.state.lock();
        let objects: Vec<ManagedObjectReference> = kinds
            .iter()
            .flat_map(|kind| state.inventory.objects_of(kind))
            .collect();
        state.next_view += 1;
        let id = format!("session[{}]view-{}", self.session, state.next_view);
        state.views.insert(id.clone(), objects);
        state.views_created += 1;
        debug!("[mock] created view {} on {} (recursive: {})", id, container, recursive);
        Ok(ManagedObjectReference::new("ContainerView", id))
    }

    async fn view_objects(&self, view: &ManagedObjectReference) -> Result<Vec<ManagedObjectReference>, VimError> {
        self.check(MockOp::ViewObjects)?;
        let mut state = self.state.lock();
        let objects = state
            .views
            .get(&view.value)
            .cloned()
            .ok_or_else(|| VimError::fault("ManagedObjectNotFound", view.to_string()))?;
        let vanishing = std::mem::take(&mut state.vanishing);
        if !vanishing.is_empty() {
            state.inventory.vms.retain(|vm| !vanishing.contains(&vm.moid));
            debug!("[mock] removed {:?} after listing {}", vanishing, view);
        }
        Ok(objects)
    }

    async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<(), VimError> {
        self.check(MockOp::DestroyView)?;
        let mut state = self.state.lock();
        if state.views.remove(&view.value).is_none() {
            return Err(VimError::fault("ManagedObjectNotFound", view.to_string()));
        }
        state.views_destroyed += 1;
        Ok(())
    }

    async fn retrieve_properties(
        &self,
        objects: &[ManagedObjectReference],
        paths: &[&str],
    ) -> Result<Vec<ObjectContent>, VimError> {
        self.check(MockOp::Retrieve)?;
        let state = self.state.lock();
        objects
            .iter()
            .map(|obj| {
                object_content(&state.inventory, obj, paths)
                    .ok_or_else(|| VimError::fault("ManagedObjectNotFound", obj.to_string()))
            })
            .collect()
    }

    async fn perf_counters(&self) -> Result<Vec<PerfCounterInfo>, VimError> {
        self.check(MockOp::PerfCounters)?;
        Ok(self.state.lock().inventory.counters.clone())
    }

    async fn query_perf(&self, spec: &PerfQuerySpec) -> Result<Vec<PerfEntityMetric>, VimError> {
        self.check(MockOp::QueryPerf)?;
        let mut state = self.state.lock();
        state.perf_queries.push(spec.clone());

        let max = usize::try_from(spec.max_sample).unwrap_or(0);
        let series: Vec<PerfMetricSeries> = spec
            .metric_ids
            .iter()
            .filter_map(|id| {
                state.inventory.samples.get(&id.counter_id).map(|values| PerfMetricSeries {
                    id: id.clone(),
                    value: values.iter().copied().take(max).collect(),
                })
            })
            .collect();
        if series.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![PerfEntityMetric { entity: spec.entity.clone(), sample_info: Vec::new(), value: series }])
    }

    async fn invoke(
        &self,
        obj: &ManagedObjectReference,
        method: &str,
        args: Value,
    ) -> Result<Option<ManagedObjectReference>, VimError> {
        self.check(MockOp::Invoke)?;
        let mut state = self.state.lock();
        state.calls.push(MockCall { obj: obj.clone(), method: method.to_string(), args });
        debug!("[mock] invoked {} on {}", method, obj);
        if method.ends_with("_Task") {
            state.next_task += 1;
            Ok(Some(ManagedObjectReference::new(vsphere_vim::kinds::TASK, format!("task-{}", state.next_task))))
        } else {
            Ok(None)
        }
    }

    async fn logout(&self) -> Result<(), VimError> {
        self.check(MockOp::Logout)?;
        self.state.lock().logouts.push(self.session);
        Ok(())
    }
}

/// Connecteur simulé: vérifie les identifiants et ouvre une `MockVim`
#[derive(Clone)]
pub struct MockConnector {
    vim: MockVim,
    user: String,
    password: String,
    unreachable: Arc<Mutex<bool>>,
    attempts: Arc<Mutex<Vec<ConnectTarget>>>,
}

impl MockConnector {
    pub fn new(vim: MockVim, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            vim,
            user: user.into(),
            password: password.into(),
            unreachable: Arc::new(Mutex::new(false)),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Simule un endpoint injoignable (réseau/TLS)
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock() = unreachable;
    }

    pub fn attempts(&self) -> Vec<ConnectTarget> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl VimConnector for MockConnector {
    async fn connect(&self, target: &ConnectTarget) -> Result<Arc<dyn VimApi>, VimError> {
        let session = {
            let mut attempts = self.attempts.lock();
            attempts.push(target.clone());
            attempts.len() as u32
        };
        if *self.unreachable.lock() {
            return Err(VimError::Status { status: 503, body: "endpoint unreachable".into() });
        }
        if target.user != self.user || target.password != self.password {
            return Err(VimError::fault(
                "InvalidLogin",
                "Cannot complete login due to an incorrect user name or password.",
            ));
        }
        let api: Arc<dyn VimApi> = Arc::new(self.vim.open_session(session));
        Ok(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{MockHost, MockVm};
    use serde_json::json;
    use vsphere_vim::{kinds, PerfMetricId};

    fn sample_vim() -> MockVim {
        MockVim::new(
            Inventory::new()
                .vm(MockVm::new("vm-1", "web-01").powered_on())
                .vm(MockVm::new("vm-2", "db-01").faulty("NoPermission"))
                .host(MockHost::new("host-1", "esx-01"))
                .with_standard_counters()
                .samples(2, vec![10, 20, 30]),
        )
    }

    #[tokio::test]
    async fn test_view_lifecycle() {
        let vim = sample_vim();
        let root = vim.content().root_folder.clone();
        let view = vim.create_container_view(&root, &[kinds::VIRTUAL_MACHINE], true).await.unwrap();
        assert_eq!(vim.view_objects(&view).await.unwrap().len(), 2);
        assert_eq!(vim.open_views(), 1);

        vim.destroy_view(&view).await.unwrap();
        assert_eq!(vim.open_views(), 0);
        assert!(vim.destroy_view(&view).await.is_err());
    }

    #[tokio::test]
    async fn test_faulty_object_reports_missing() {
        let vim = sample_vim();
        let objects = vec![
            ManagedObjectReference::new(kinds::VIRTUAL_MACHINE, "vm-1"),
            ManagedObjectReference::new(kinds::VIRTUAL_MACHINE, "vm-2"),
        ];
        let contents = vim.retrieve_properties(&objects, &["name", "runtime.powerState"]).await.unwrap();
        assert!(contents[0].missing.is_empty());
        assert_eq!(contents[1].get("name"), Some(&json!("db-01")));
        assert_eq!(contents[1].missing[0].fault, "NoPermission");
    }

    #[tokio::test]
    async fn test_targeted_property_fault() {
        let vim = MockVim::new(
            Inventory::new().vm(MockVm::new("vm-1", "web-01").with_property_fault("guest.ipAddress", "NoPermission")),
        );
        let vm = ManagedObjectReference::new(kinds::VIRTUAL_MACHINE, "vm-1");
        let contents = vim.retrieve_properties(&[vm], &["runtime.powerState", "guest.ipAddress"]).await.unwrap();
        assert_eq!(contents[0].get("runtime.powerState"), Some(&json!("poweredOff")));
        assert_eq!(contents[0].missing.len(), 1);
        assert_eq!(contents[0].missing[0].path, "guest.ipAddress");
    }

    #[tokio::test]
    async fn test_vm_vanishes_after_listing() {
        let vim = sample_vim();
        vim.vanish_after_listing("vm-1");
        let root = vim.content().root_folder.clone();
        let view = vim.create_container_view(&root, &[kinds::VIRTUAL_MACHINE], true).await.unwrap();
        let objects = vim.view_objects(&view).await.unwrap();
        assert_eq!(objects.len(), 2);

        let err = vim.retrieve_properties(&objects, &["name"]).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(vim.view_objects(&view).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invoke_records_calls() {
        let vim = sample_vim();
        let vm = ManagedObjectReference::new(kinds::VIRTUAL_MACHINE, "vm-1");
        let task = vim.invoke(&vm, "PowerOffVM_Task", Value::Null).await.unwrap();
        assert!(task.unwrap().is_kind(kinds::TASK));
        assert!(vim.invoke(&vm, "ShutdownGuest", Value::Null).await.unwrap().is_none());
        assert_eq!(vim.calls().len(), 2);
        assert_eq!(vim.calls_for("ShutdownGuest").len(), 1);
    }

    #[tokio::test]
    async fn test_query_perf_truncates_to_max_sample() {
        let vim = sample_vim();
        let spec = PerfQuerySpec {
            entity: ManagedObjectReference::new(kinds::VIRTUAL_MACHINE, "vm-1"),
            start_time: time::macros::datetime!(2025-01-01 10:00 UTC),
            end_time: time::macros::datetime!(2025-01-01 11:00 UTC),
            max_sample: 2,
            metric_ids: vec![PerfMetricId::aggregate(2), PerfMetricId::aggregate(999)],
            interval_id: 20,
        };
        let metrics = vim.query_perf(&spec).await.unwrap();
        assert_eq!(metrics[0].value.len(), 1);
        assert_eq!(metrics[0].value[0].value, vec![10, 20]);
        assert_eq!(vim.perf_queries().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let vim = sample_vim();
        vim.fail_on(MockOp::PerfCounters);
        assert!(vim.perf_counters().await.is_err());
        vim.clear_failures();
        assert!(!vim.perf_counters().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connector_checks_credentials() {
        let connector = MockConnector::new(sample_vim(), "admin", "pw");
        let err = connector.connect(&ConnectTarget::new("vc", "admin", "nope")).await.err().unwrap();
        assert!(err.is_auth());

        assert!(connector.connect(&ConnectTarget::new("vc", "admin", "pw")).await.is_ok());

        connector.set_unreachable(true);
        assert!(connector.connect(&ConnectTarget::new("vc", "admin", "pw")).await.is_err());
        assert_eq!(connector.attempts().len(), 3);
    }
}
