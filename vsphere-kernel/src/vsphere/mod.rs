/**
 * CLIENT DE GESTION vSphere - Requêtes d'inventaire et opérations sur les VMs
 *
 * RÔLE :
 * Traduit les besoins du dashboard (liste des VMs, hôtes, réseaux, snapshots,
 * performances, actions d'alimentation) en appels vim25 sur la session courante.
 *
 * FONCTIONNEMENT :
 * - Chaque opération existe en `try_*` (Result) et en version publique qui
 *   absorbe l'erreur : log + résultat vide / false
 * - Déconnecté => résultat vide sans log d'erreur
 * - Lectures d'inventaire groupées : une vue conteneur + un seul RetrieveProperties
 * - Une VM illisible est ignorée avec exactement un log d'erreur
 * - Les tâches (power, snapshot) ne sont pas attendues
 */

pub mod actions;
pub mod mapping;
pub mod perf;
pub mod view;

use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use vsphere_vim::{kinds, ManagedObjectReference, ObjectContent, VimApi, VimError};

use crate::models::{Host, Network, PerformanceSeries, PowerState, Snapshot, VirtualMachine};
use crate::session::SessionStore;
use actions::{UnknownAction, VmAction};
use mapping::MappingError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not connected to a vSphere server")]
    NotConnected,
    #[error(transparent)]
    Vim(#[from] VimError),
    #[error("VM {0} not found")]
    VmNotFound(String),
    #[error(transparent)]
    InvalidAction(#[from] UnknownAction),
    #[error("VM {vm} is {state}, {action} not allowed")]
    InvalidState { vm: String, action: VmAction, state: PowerState },
    #[error("cannot read {object}: {source}")]
    Mapping {
        object: String,
        #[source]
        source: MappingError,
    },
}

fn vm_ref(vm: &VirtualMachine) -> ManagedObjectReference {
    ManagedObjectReference::new(kinds::VIRTUAL_MACHINE, vm.moid.clone())
}

#[derive(Clone)]
pub struct ManagementClient {
    sessions: Arc<SessionStore>,
}

impl ManagementClient {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    fn session(&self) -> Result<Arc<dyn VimApi>, ClientError> {
        self.sessions.current().ok_or(ClientError::NotConnected)
    }

    /// Absorbe l'erreur d'une opération publique
    fn settle<T>(result: Result<T, ClientError>, what: &str, fallback: T) -> T {
        match result {
            Ok(value) => value,
            Err(ClientError::NotConnected) => {
                debug!("{what}: not connected");
                fallback
            }
            Err(e) => {
                error!("Error {what}: {e}");
                fallback
            }
        }
    }

    // ---- VMs ----

    pub async fn list_virtual_machines(&self) -> Vec<VirtualMachine> {
        Self::settle(self.try_list_virtual_machines().await, "getting VMs", Vec::new())
    }

    pub async fn try_list_virtual_machines(&self) -> Result<Vec<VirtualMachine>, ClientError> {
        let api = self.session()?;
        let contents = view::retrieve_all(&api, kinds::VIRTUAL_MACHINE, mapping::VM_PROPERTIES).await?;
        let host_names = self.host_names(&api, &contents).await;

        let mut vms = Vec::with_capacity(contents.len());
        for content in &contents {
            match mapping::vm_from_content(content, &host_names) {
                Ok(vm) => vms.push(vm),
                Err(e) => error!("Error processing VM {}: {}", mapping::display_name(content), e),
            }
        }
        Ok(vms)
    }

    /// Résolution groupée moid d'hôte -> nom. En cas d'échec les VMs
    /// affichent "N/A".
    async fn host_names(&self, api: &Arc<dyn VimApi>, contents: &[ObjectContent]) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let hosts: Vec<ManagedObjectReference> = contents
            .iter()
            .filter(|c| c.first_fault().is_none())
            .filter_map(mapping::host_ref)
            .filter(|h| seen.insert(h.value.clone()))
            .collect();
        if hosts.is_empty() {
            return HashMap::new();
        }
        match api.retrieve_properties(&hosts, &["name"]).await {
            Ok(found) => found
                .iter()
                .filter_map(|c| mapping::name_of(c).map(|n| (c.obj.value.clone(), n.to_string())))
                .collect(),
            Err(e) => {
                warn!("Could not resolve host names for {} hosts: {}", hosts.len(), e);
                HashMap::new()
            }
        }
    }

    /// Référence de la première VM dont le nom correspond exactement
    async fn locate_vm(&self, api: &Arc<dyn VimApi>, name: &str) -> Result<Option<ManagedObjectReference>, ClientError> {
        let contents = view::retrieve_all(api, kinds::VIRTUAL_MACHINE, &["name"]).await?;
        Ok(contents
            .into_iter()
            .find(|c| mapping::name_of(c) == Some(name))
            .map(|c| c.obj))
    }

    /// Lit `paths` sur une seule VM
    async fn read_vm(
        &self,
        api: &Arc<dyn VimApi>,
        vm: &ManagedObjectReference,
        paths: &[&str],
    ) -> Result<ObjectContent, ClientError> {
        api.retrieve_properties(std::slice::from_ref(vm), paths)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::VmNotFound(vm.value.clone()))
    }

    pub async fn find_vm_by_name(&self, name: &str) -> Option<VirtualMachine> {
        Self::settle(self.try_find_vm_by_name(name).await, "finding VM", None)
    }

    pub async fn try_find_vm_by_name(&self, name: &str) -> Result<Option<VirtualMachine>, ClientError> {
        let api = self.session()?;
        let Some(vm) = self.locate_vm(&api, name).await? else {
            return Ok(None);
        };
        let content = self.read_vm(&api, &vm, mapping::VM_PROPERTIES).await?;
        let host_names = self.host_names(&api, std::slice::from_ref(&content)).await;
        mapping::vm_from_content(&content, &host_names)
            .map(Some)
            .map_err(|source| ClientError::Mapping { object: name.to_string(), source })
    }

    // ---- performances ----

    pub async fn get_performance_metrics(&self, vm: &VirtualMachine, metric_type: &str) -> Option<PerformanceSeries> {
        Self::settle(self.try_get_performance_metrics(vm, metric_type).await, "getting performance metrics", None)
    }

    pub async fn try_get_performance_metrics(
        &self,
        vm: &VirtualMachine,
        metric_type: &str,
    ) -> Result<Option<PerformanceSeries>, ClientError> {
        let api = self.session()?;
        let Some(patterns) = perf::family_patterns(metric_type) else {
            debug!("unknown metric family {metric_type}");
            return Ok(None);
        };
        let catalog = api.perf_counters().await?;
        let counter_ids = perf::select_counters(&catalog, patterns);
        if counter_ids.is_empty() {
            debug!("no {metric_type} counters in the catalog");
            return Ok(None);
        }

        let spec = perf::build_query(vm_ref(vm), &counter_ids, OffsetDateTime::now_utc());
        let metrics = api.query_perf(&spec).await?;
        Ok(perf::flatten(&metrics, &counter_ids, spec.start_time))
    }

    // ---- actions ----

    pub async fn perform_action(&self, vm_name: &str, action: &str) -> bool {
        Self::settle(self.try_perform_action(vm_name, action).await.map(|_| true), "performing action", false)
    }

    /// Lance l'action et rend la tâche créée (aucune pour shutdown / reboot)
    pub async fn try_perform_action(
        &self,
        vm_name: &str,
        action: &str,
    ) -> Result<Option<ManagedObjectReference>, ClientError> {
        let api = self.session()?;
        let vm = self
            .locate_vm(&api, vm_name)
            .await?
            .ok_or_else(|| ClientError::VmNotFound(vm_name.to_string()))?;
        // seul l'état d'alimentation compte, une autre propriété illisible ne bloque pas
        let content = self.read_vm(&api, &vm, &["runtime.powerState"]).await?;
        let state = mapping::power_state(&content)
            .map_err(|source| ClientError::Mapping { object: vm_name.to_string(), source })?;
        let action: VmAction = action.parse()?;
        if !action.permits(state) {
            return Err(ClientError::InvalidState { vm: vm_name.to_string(), action, state });
        }

        let task = api.invoke(&vm, action.method(), Value::Null).await?;
        match &task {
            Some(t) => info!("Successfully initiated {} on VM {} ({})", action, vm_name, t),
            None => info!("Successfully initiated {} on VM {}", action, vm_name),
        }
        Ok(task)
    }

    // ---- snapshots ----

    pub async fn get_vm_snapshots(&self, vm_name: &str) -> Vec<Snapshot> {
        Self::settle(self.try_get_vm_snapshots(vm_name).await, "getting snapshots", Vec::new())
    }

    pub async fn try_get_vm_snapshots(&self, vm_name: &str) -> Result<Vec<Snapshot>, ClientError> {
        let api = self.session()?;
        let Some(vm) = self.locate_vm(&api, vm_name).await? else {
            return Ok(Vec::new());
        };
        let content = self.read_vm(&api, &vm, &["snapshot"]).await?;
        let mapped = mapping::snapshot_info(&content).and_then(|info| match info {
            Some(info) => mapping::snapshots_from_info(&info),
            None => Ok(Vec::new()),
        });
        mapped.map_err(|source| ClientError::Mapping { object: vm_name.to_string(), source })
    }

    pub async fn create_snapshot(&self, vm_name: &str, snapshot_name: &str, description: &str) -> bool {
        Self::settle(
            self.try_create_snapshot(vm_name, snapshot_name, description).await.map(|_| true),
            "creating snapshot",
            false,
        )
    }

    pub async fn try_create_snapshot(
        &self,
        vm_name: &str,
        snapshot_name: &str,
        description: &str,
    ) -> Result<Option<ManagedObjectReference>, ClientError> {
        let api = self.session()?;
        let vm = self
            .locate_vm(&api, vm_name)
            .await?
            .ok_or_else(|| ClientError::VmNotFound(vm_name.to_string()))?;
        let args = json!({
            "name": snapshot_name,
            "description": description,
            "memory": true,
            "quiesce": false,
        });
        let task = api.invoke(&vm, "CreateSnapshot_Task", args).await?;
        info!("Successfully initiated snapshot {} of VM {}", snapshot_name, vm_name);
        Ok(task)
    }

    // ---- réseaux ----

    pub async fn get_vm_networks(&self, vm_name: &str) -> Vec<Network> {
        Self::settle(self.try_get_vm_networks(vm_name).await, "getting networks", Vec::new())
    }

    pub async fn try_get_vm_networks(&self, vm_name: &str) -> Result<Vec<Network>, ClientError> {
        let api = self.session()?;
        let Some(vm) = self.locate_vm(&api, vm_name).await? else {
            return Ok(Vec::new());
        };
        let content = self.read_vm(&api, &vm, &["network"]).await?;
        let attached = mapping::attached_networks(&content)
            .map_err(|source| ClientError::Mapping { object: vm_name.to_string(), source })?;
        if attached.is_empty() {
            return Ok(Vec::new());
        }

        let contents = api.retrieve_properties(&attached, mapping::NETWORK_PROPERTIES).await?;
        contents
            .iter()
            .map(|c| {
                mapping::network_from_content(c)
                    .map_err(|source| ClientError::Mapping { object: mapping::display_name(c), source })
            })
            .collect()
    }

    // ---- hôtes ----

    pub async fn list_hosts(&self) -> Vec<Host> {
        Self::settle(self.try_list_hosts().await, "getting hosts", Vec::new())
    }

    pub async fn try_list_hosts(&self) -> Result<Vec<Host>, ClientError> {
        let api = self.session()?;
        let contents = view::retrieve_all(&api, kinds::HOST_SYSTEM, mapping::HOST_PROPERTIES).await?;
        let mut hosts = Vec::with_capacity(contents.len());
        for content in &contents {
            match mapping::host_from_content(content) {
                Ok(host) => hosts.push(host),
                Err(e) => error!("Error processing host {}: {}", mapping::display_name(content), e),
            }
        }
        Ok(hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use vsphere_devkit::{Inventory, MockHost, MockNetwork, MockOp, MockVm, TestHarness};
    use vsphere_vim::SnapshotTree;

    async fn connected(inventory: Inventory) -> (TestHarness, ManagementClient) {
        let harness = TestHarness::new(inventory);
        let sessions = Arc::new(SessionStore::new(Arc::new(harness.connector.clone())));
        assert!(sessions.connect(&harness.target()).await);
        harness.logs.clear();
        (harness, ManagementClient::new(sessions))
    }

    fn lab() -> Inventory {
        Inventory::new()
            .host(MockHost::new("host-1", "esx-01.lab").with_hardware(16, 68_719_476_736).with_usage(2400, 30000))
            .host(MockHost::new("host-2", "esx-02.lab").in_maintenance())
            .vm(MockVm::new("vm-1", "web-01")
                .powered_on()
                .with_config("Ubuntu Linux (64-bit)", 2, 4096)
                .with_ip("10.0.0.11")
                .on_host("host-1"))
            .vm(MockVm::new("vm-2", "db-01").with_config("Rocky Linux (64-bit)", 4, 8192).on_host("host-2"))
            .vm(MockVm::new("vm-3", "old-app").suspended().with_config("Windows Server 2019", 2, 2048))
    }

    #[tokio::test]
    async fn test_disconnected_returns_empty_silently() {
        let harness = TestHarness::new(lab());
        let sessions = Arc::new(SessionStore::new(Arc::new(harness.connector.clone())));
        let client = ManagementClient::new(sessions);

        assert!(client.list_virtual_machines().await.is_empty());
        assert!(client.find_vm_by_name("web-01").await.is_none());
        assert!(client.list_hosts().await.is_empty());
        assert!(client.get_vm_snapshots("web-01").await.is_empty());
        assert!(!client.perform_action("web-01", "power_on").await);
        assert!(client.get_vm_networks("web-01").await.is_empty());
        assert!(!client.create_snapshot("web-01", "pre-patch", "").await);
        let vm = VirtualMachine {
            name: "web-01".into(),
            power_state: PowerState::PoweredOn,
            guest_os: mapping::NOT_AVAILABLE.into(),
            cpu: 2,
            memory_mb: 4096,
            ip_address: None,
            moid: "vm-1".into(),
            guest_state: mapping::NOT_AVAILABLE.into(),
            boot_time: None,
            host: mapping::NOT_AVAILABLE.into(),
        };
        assert!(client.get_performance_metrics(&vm, "cpu").await.is_none());
        assert!(matches!(client.try_list_hosts().await, Err(ClientError::NotConnected)));

        assert_eq!(harness.errors(), 0);
        assert!(harness.vim.calls().is_empty());
        assert_eq!(harness.vim.views_created(), 0);
        assert!(harness.vim.perf_queries().is_empty());
    }

    #[tokio::test]
    async fn test_list_vms_batched() {
        let (harness, client) = connected(lab()).await;
        let vms = client.list_virtual_machines().await;

        assert_eq!(vms.len(), 3);
        let web = vms.iter().find(|v| v.name == "web-01").unwrap();
        assert_eq!(web.power_state, PowerState::PoweredOn);
        assert_eq!(web.host, "esx-01.lab");
        assert_eq!(web.ip_address.as_deref(), Some("10.0.0.11"));
        let old = vms.iter().find(|v| v.name == "old-app").unwrap();
        assert_eq!(old.host, mapping::NOT_AVAILABLE);
        assert_eq!(old.power_state, PowerState::Suspended);

        assert_eq!(harness.vim.views_created(), 1);
        assert_eq!(harness.vim.open_views(), 0);
        assert_eq!(harness.errors(), 0);
    }

    #[tokio::test]
    async fn test_faulty_vm_is_skipped_with_one_error() {
        let (harness, client) =
            connected(lab().vm(MockVm::new("vm-4", "broken").faulty("NoPermission"))).await;
        let vms = client.list_virtual_machines().await;

        assert_eq!(vms.len(), 3);
        assert!(vms.iter().all(|v| v.name != "broken"));
        assert_eq!(harness.errors(), 1);
        assert!(harness.logs.contains(Level::ERROR, "broken"));
    }

    #[tokio::test]
    async fn test_vanished_vm_is_skipped_with_one_error() {
        let (harness, client) = connected(lab()).await;
        harness.vim.vanish_after_listing("vm-2");
        let vms = client.list_virtual_machines().await;

        let names: Vec<&str> = vms.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["web-01", "old-app"]);
        assert_eq!(harness.errors(), 1);
        assert!(harness.logs.contains(Level::ERROR, "vm-2"));
        assert_eq!(harness.vim.open_views(), 0);
    }

    #[tokio::test]
    async fn test_host_name_failure_degrades_to_na() {
        // vm sur un hôte absent de l'inventaire : la résolution groupée échoue
        let (harness, client) =
            connected(Inventory::new().vm(MockVm::new("vm-1", "orphan").on_host("host-404"))).await;
        let vms = client.list_virtual_machines().await;

        assert_eq!(vms.len(), 1);
        assert_eq!(vms[0].host, mapping::NOT_AVAILABLE);
        assert_eq!(harness.errors(), 0);
        assert_eq!(harness.logs.count(Level::WARN), 1);
    }

    #[tokio::test]
    async fn test_list_failure_is_logged_and_view_released() {
        let (harness, client) = connected(lab()).await;
        harness.vim.fail_on(MockOp::Retrieve);

        assert!(client.list_virtual_machines().await.is_empty());
        assert_eq!(harness.errors(), 1);
        assert_eq!(harness.vim.open_views(), 0);
    }

    #[tokio::test]
    async fn test_find_vm_by_name() {
        let (_harness, client) = connected(lab()).await;
        let vm = client.find_vm_by_name("db-01").await.unwrap();
        assert_eq!(vm.moid, "vm-2");
        assert_eq!(vm.host, "esx-02.lab");

        assert!(client.find_vm_by_name("DB-01").await.is_none());
        assert!(client.find_vm_by_name("").await.is_none());
    }

    #[tokio::test]
    async fn test_find_returns_first_exact_match() {
        let (_harness, client) = connected(
            Inventory::new()
                .vm(MockVm::new("vm-10", "twin").powered_on())
                .vm(MockVm::new("vm-11", "twin")),
        )
        .await;
        assert_eq!(client.find_vm_by_name("twin").await.unwrap().moid, "vm-10");
    }

    #[tokio::test]
    async fn test_power_on_requires_powered_off() {
        let (harness, client) = connected(lab()).await;

        assert!(client.perform_action("db-01", "power_on").await);
        let calls = harness.vim.calls_for("PowerOnVM_Task");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].obj.value, "vm-2");

        // déjà allumée
        assert!(!client.perform_action("web-01", "power_on").await);
        assert_eq!(harness.vim.calls_for("PowerOnVM_Task").len(), 1);
        assert_eq!(harness.errors(), 1);
    }

    #[tokio::test]
    async fn test_action_ignores_unrelated_property_fault() {
        let (harness, client) = connected(
            Inventory::new().vm(MockVm::new("vm-7", "locked-down").with_property_fault("guest.ipAddress", "NoPermission")),
        )
        .await;

        assert!(client.find_vm_by_name("locked-down").await.is_none());
        harness.logs.clear();
        assert!(client.perform_action("locked-down", "power_on").await);
        assert_eq!(harness.vim.calls_for("PowerOnVM_Task").len(), 1);
        assert_eq!(harness.errors(), 0);
    }

    #[tokio::test]
    async fn test_guest_operations_and_bypass() {
        let (harness, client) = connected(lab()).await;

        assert!(client.perform_action("web-01", "shutdown").await);
        assert_eq!(harness.vim.calls_for("ShutdownGuest").len(), 1);
        assert!(!client.perform_action("db-01", "suspend").await);

        // reset / reboot partent quel que soit l'état
        assert!(client.perform_action("db-01", "reset").await);
        assert!(client.perform_action("old-app", "reboot").await);
        assert_eq!(harness.vim.calls_for("ResetVM_Task").len(), 1);
        assert_eq!(harness.vim.calls_for("RebootGuest").len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_action_and_vm() {
        let (harness, client) = connected(lab()).await;

        let err = client.try_perform_action("web-01", "hibernate").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidAction(_)));
        let err = client.try_perform_action("ghost", "power_on").await.unwrap_err();
        assert!(matches!(err, ClientError::VmNotFound(_)));

        assert!(!client.perform_action("ghost", "power_on").await);
        assert!(harness.vim.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_failure_returns_false() {
        let (harness, client) = connected(lab()).await;
        harness.vim.fail_on(MockOp::Invoke);
        assert!(!client.perform_action("web-01", "power_off").await);
        assert_eq!(harness.errors(), 1);
    }

    #[tokio::test]
    async fn test_snapshots() {
        let tree = |name: &str, children: Vec<SnapshotTree>| SnapshotTree {
            name: name.into(),
            description: format!("{name} desc"),
            create_time: "2025-02-01T08:00:00Z".into(),
            state: "poweredOn".into(),
            id: None,
            snapshot: None,
            child_snapshot_list: children,
        };
        let (_harness, client) = connected(
            lab().vm(MockVm::new("vm-5", "snappy")
                .with_snapshots(vec![tree("base", vec![tree("child", vec![])]), tree("second", vec![])])),
        )
        .await;

        let snaps = client.get_vm_snapshots("snappy").await;
        let names: Vec<&str> = snaps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["base", "second"]);
        assert_eq!(snaps[0].state, PowerState::PoweredOn);

        assert!(client.get_vm_snapshots("web-01").await.is_empty());
        assert!(client.get_vm_snapshots("ghost").await.is_empty());
    }

    #[tokio::test]
    async fn test_create_snapshot() {
        let (harness, client) = connected(lab()).await;

        assert!(client.create_snapshot("web-01", "pre-patch", "before patching").await);
        let calls = harness.vim.calls_for("CreateSnapshot_Task");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args["name"], "pre-patch");
        assert_eq!(calls[0].args["description"], "before patching");
        assert_eq!(calls[0].args["memory"], true);
        assert_eq!(calls[0].args["quiesce"], false);

        assert!(!client.create_snapshot("ghost", "x", "").await);
    }

    #[tokio::test]
    async fn test_networks() {
        let (_harness, client) = connected(
            Inventory::new()
                .network(MockNetwork::standard("network-1", "VM Network"))
                .network(MockNetwork::portgroup("dvportgroup-7", "dvPG-Prod").inaccessible())
                .vm(MockVm::new("vm-1", "web-01")
                    .attached_to(ManagedObjectReference::new(kinds::NETWORK, "network-1"))
                    .attached_to(ManagedObjectReference::new("DistributedVirtualPortgroup", "dvportgroup-7")))
                .vm(MockVm::new("vm-2", "isolated")),
        )
        .await;

        let nets = client.get_vm_networks("web-01").await;
        assert_eq!(nets.len(), 2);
        assert_eq!(nets[0].name, "VM Network");
        assert_eq!(nets[0].network_type, "Network");
        assert!(nets[0].accessible);
        assert_eq!(nets[1].network_type, "DistributedVirtualPortgroup");
        assert!(!nets[1].accessible);

        assert!(client.get_vm_networks("isolated").await.is_empty());
        assert!(client.get_vm_networks("ghost").await.is_empty());
    }

    #[tokio::test]
    async fn test_hosts() {
        let (harness, client) = connected(lab().host(MockHost::new("host-3", "esx-03.lab").faulty("NoPermission"))).await;
        let hosts = client.list_hosts().await;

        assert_eq!(hosts.len(), 2);
        let esx1 = hosts.iter().find(|h| h.name == "esx-01.lab").unwrap();
        assert_eq!(esx1.cpu_cores, 16);
        assert_eq!(esx1.memory_size_mb, 65536.0);
        assert_eq!(esx1.cpu_usage, 2400);
        assert!(hosts.iter().any(|h| h.maintenance_mode));
        assert_eq!(harness.errors(), 1);
        assert_eq!(harness.vim.open_views(), 0);
    }

    #[tokio::test]
    async fn test_performance_cpu() {
        let (harness, client) =
            connected(lab().with_standard_counters().samples(2, vec![150, 275, 300])).await;
        let vm = client.find_vm_by_name("web-01").await.unwrap();

        let series = client.get_performance_metrics(&vm, "cpu").await.unwrap();
        assert_eq!(series.values, vec![150.0, 275.0, 300.0]);
        assert_eq!(series.timestamps.len(), 3);

        let queries = harness.vim.perf_queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].entity.value, "vm-1");
        assert_eq!(queries[0].metric_ids.len(), 1);
        assert_eq!(queries[0].metric_ids[0].counter_id, 2);
        assert_eq!(queries[0].end_time - queries[0].start_time, perf::WINDOW);
    }

    #[tokio::test]
    async fn test_performance_disk_concatenates() {
        let (harness, client) = connected(
            lab()
                .with_standard_counters()
                .samples(125, vec![1, 2])
                .samples(130, vec![3])
                .samples(131, vec![4, 5]),
        )
        .await;
        let vm = client.find_vm_by_name("db-01").await.unwrap();

        let series = client.get_performance_metrics(&vm, "disk").await.unwrap();
        assert_eq!(series.values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(series.timestamps[0], series.timestamps[2]);

        let queries = harness.vim.perf_queries();
        assert_eq!(queries.len(), 1);
        let ids: Vec<i32> = queries[0].metric_ids.iter().map(|m| m.counter_id).collect();
        assert_eq!(ids, vec![125, 130, 131]);
        assert_eq!(queries[0].interval_id, 20);
        assert_eq!(queries[0].max_sample, 60);
        assert_eq!(queries[0].end_time - queries[0].start_time, perf::WINDOW);
    }

    #[tokio::test]
    async fn test_performance_absent_data() {
        let (harness, client) = connected(lab().with_standard_counters()).await;
        let vm = client.find_vm_by_name("web-01").await.unwrap();

        assert!(client.get_performance_metrics(&vm, "gpu").await.is_none());
        assert!(client.get_performance_metrics(&vm, "memory").await.is_none());
        assert!(harness.vim.perf_queries().len() == 1);

        harness.vim.fail_on(MockOp::QueryPerf);
        assert!(client.get_performance_metrics(&vm, "cpu").await.is_none());
        assert_eq!(harness.errors(), 1);
    }

    #[tokio::test]
    async fn test_performance_without_counters() {
        let (harness, client) = connected(lab()).await;
        let vm = client.find_vm_by_name("web-01").await.unwrap();
        assert!(client.get_performance_metrics(&vm, "network").await.is_none());
        assert!(harness.vim.perf_queries().is_empty());
    }
}
