/*!
Inventaire simulé pour `MockVim`

Chaque objet sait produire la valeur JSON d'un chemin de propriété vim25
(`runtime.powerState`, `config.hardware.numCPU`...), exactement comme le
PropertyCollector la renverrait une fois désemballée.
*/

use serde_json::{json, Value};
use std::collections::HashMap;
use vsphere_vim::{kinds, ElementDescription, ManagedObjectReference, PerfCounterInfo, SnapshotInfo, SnapshotTree};

/// Machine virtuelle simulée
#[derive(Debug, Clone)]
pub struct MockVm {
    pub moid: String,
    pub name: String,
    pub power_state: String,
    pub guest_full_name: Option<String>,
    pub num_cpu: Option<i64>,
    pub memory_mb: Option<i64>,
    pub ip_address: Option<String>,
    pub guest_state: Option<String>,
    pub boot_time: Option<String>,
    pub host: Option<String>,
    pub snapshot: Option<SnapshotInfo>,
    pub networks: Vec<ManagedObjectReference>,
    /// Fault renvoyé pour toute propriété autre que `name`
    pub fault: Option<String>,
    /// Faults ciblés : chemin de propriété -> fault
    pub property_faults: HashMap<String, String>,
}

impl MockVm {
    pub fn new(moid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            moid: moid.into(),
            name: name.into(),
            power_state: "poweredOff".into(),
            guest_full_name: None,
            num_cpu: None,
            memory_mb: None,
            ip_address: None,
            guest_state: None,
            boot_time: None,
            host: None,
            snapshot: None,
            networks: Vec::new(),
            fault: None,
            property_faults: HashMap::new(),
        }
    }

    pub fn powered_on(mut self) -> Self {
        self.power_state = "poweredOn".into();
        self.guest_state = Some("running".into());
        self
    }

    pub fn suspended(mut self) -> Self {
        self.power_state = "suspended".into();
        self
    }

    pub fn with_power_state(mut self, state: impl Into<String>) -> Self {
        self.power_state = state.into();
        self
    }

    pub fn with_config(mut self, guest_os: impl Into<String>, cpus: i64, memory_mb: i64) -> Self {
        self.guest_full_name = Some(guest_os.into());
        self.num_cpu = Some(cpus);
        self.memory_mb = Some(memory_mb);
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn booted_at(mut self, ts: impl Into<String>) -> Self {
        self.boot_time = Some(ts.into());
        self
    }

    pub fn on_host(mut self, host_moid: impl Into<String>) -> Self {
        self.host = Some(host_moid.into());
        self
    }

    pub fn with_snapshots(mut self, roots: Vec<SnapshotTree>) -> Self {
        self.snapshot = Some(SnapshotInfo { current_snapshot: None, root_snapshot_list: roots });
        self
    }

    pub fn attached_to(mut self, network: ManagedObjectReference) -> Self {
        self.networks.push(network);
        self
    }

    pub fn faulty(mut self, fault: impl Into<String>) -> Self {
        self.fault = Some(fault.into());
        self
    }

    /// Une seule propriété illisible, le reste de la VM répond normalement
    pub fn with_property_fault(mut self, path: impl Into<String>, fault: impl Into<String>) -> Self {
        self.property_faults.insert(path.into(), fault.into());
        self
    }

    pub fn moref(&self) -> ManagedObjectReference {
        ManagedObjectReference::new(kinds::VIRTUAL_MACHINE, &self.moid)
    }

    pub fn property(&self, path: &str) -> Option<Value> {
        match path {
            "name" => Some(json!(self.name)),
            "runtime.powerState" => Some(json!(self.power_state)),
            "config.guestFullName" => self.guest_full_name.as_ref().map(|v| json!(v)),
            "config.hardware.numCPU" => self.num_cpu.map(|v| json!(v)),
            "config.hardware.memoryMB" => self.memory_mb.map(|v| json!(v)),
            "guest.ipAddress" => self.ip_address.as_ref().map(|v| json!(v)),
            "guest.guestState" => self.guest_state.as_ref().map(|v| json!(v)),
            "runtime.bootTime" => self.boot_time.as_ref().map(|v| json!(v)),
            "runtime.host" => self
                .host
                .as_ref()
                .map(|h| json!(ManagedObjectReference::new(kinds::HOST_SYSTEM, h))),
            "snapshot" => self.snapshot.as_ref().and_then(|s| serde_json::to_value(s).ok()),
            "network" => Some(json!(self.networks)),
            _ => None,
        }
    }
}

/// Hôte ESXi simulé
#[derive(Debug, Clone)]
pub struct MockHost {
    pub moid: String,
    pub name: String,
    pub power_state: String,
    pub connection_state: String,
    pub in_maintenance_mode: bool,
    pub num_cpu_cores: Option<i64>,
    pub memory_size: Option<i64>,
    pub overall_cpu_usage: Option<i64>,
    pub overall_memory_usage: Option<i64>,
    pub fault: Option<String>,
}

impl MockHost {
    pub fn new(moid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            moid: moid.into(),
            name: name.into(),
            power_state: "poweredOn".into(),
            connection_state: "connected".into(),
            in_maintenance_mode: false,
            num_cpu_cores: None,
            memory_size: None,
            overall_cpu_usage: None,
            overall_memory_usage: None,
            fault: None,
        }
    }

    pub fn with_hardware(mut self, cores: i64, memory_bytes: i64) -> Self {
        self.num_cpu_cores = Some(cores);
        self.memory_size = Some(memory_bytes);
        self
    }

    pub fn with_usage(mut self, cpu_mhz: i64, memory_mb: i64) -> Self {
        self.overall_cpu_usage = Some(cpu_mhz);
        self.overall_memory_usage = Some(memory_mb);
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connection_state = "disconnected".into();
        self
    }

    pub fn in_maintenance(mut self) -> Self {
        self.in_maintenance_mode = true;
        self
    }

    pub fn faulty(mut self, fault: impl Into<String>) -> Self {
        self.fault = Some(fault.into());
        self
    }

    pub fn moref(&self) -> ManagedObjectReference {
        ManagedObjectReference::new(kinds::HOST_SYSTEM, &self.moid)
    }

    pub fn property(&self, path: &str) -> Option<Value> {
        match path {
            "name" => Some(json!(self.name)),
            "runtime.powerState" => Some(json!(self.power_state)),
            "runtime.connectionState" => Some(json!(self.connection_state)),
            "runtime.inMaintenanceMode" => Some(json!(self.in_maintenance_mode)),
            "hardware.cpuInfo.numCpuCores" => self.num_cpu_cores.map(|v| json!(v)),
            "hardware.memorySize" => self.memory_size.map(|v| json!(v)),
            "summary.quickStats.overallCpuUsage" => self.overall_cpu_usage.map(|v| json!(v)),
            "summary.quickStats.overallMemoryUsage" => self.overall_memory_usage.map(|v| json!(v)),
            _ => None,
        }
    }
}

/// Réseau ou portgroup simulé
#[derive(Debug, Clone)]
pub struct MockNetwork {
    pub moref: ManagedObjectReference,
    pub name: String,
    pub accessible: bool,
}

impl MockNetwork {
    pub fn standard(moid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            moref: ManagedObjectReference::new(kinds::NETWORK, moid),
            name: name.into(),
            accessible: true,
        }
    }

    pub fn portgroup(moid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            moref: ManagedObjectReference::new("DistributedVirtualPortgroup", moid),
            name: name.into(),
            accessible: true,
        }
    }

    pub fn inaccessible(mut self) -> Self {
        self.accessible = false;
        self
    }

    pub fn property(&self, path: &str) -> Option<Value> {
        match path {
            "name" => Some(json!(self.name)),
            "summary.accessible" => Some(json!(self.accessible)),
            _ => None,
        }
    }
}

/// Inventaire complet servi par `MockVim`
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub vms: Vec<MockVm>,
    pub hosts: Vec<MockHost>,
    pub networks: Vec<MockNetwork>,
    pub counters: Vec<PerfCounterInfo>,
    /// Échantillons par counterId
    pub samples: HashMap<i32, Vec<i64>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vm(mut self, vm: MockVm) -> Self {
        self.vms.push(vm);
        self
    }

    pub fn host(mut self, host: MockHost) -> Self {
        self.hosts.push(host);
        self
    }

    pub fn network(mut self, network: MockNetwork) -> Self {
        self.networks.push(network);
        self
    }

    pub fn counter(mut self, key: i32, catalog_name: &str) -> Self {
        let mut parts = catalog_name.splitn(3, '.');
        let group = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        let rollup = parts.next().unwrap_or_default();
        self.counters.push(PerfCounterInfo {
            key,
            name_info: ElementDescription { key: name.into(), label: None },
            group_info: ElementDescription { key: group.into(), label: None },
            rollup_type: rollup.into(),
        });
        self
    }

    pub fn samples(mut self, counter_id: i32, values: Vec<i64>) -> Self {
        self.samples.insert(counter_id, values);
        self
    }

    /// Catalogue proche de celui d'un vCenter 8 (clés arbitraires mais stables)
    pub fn with_standard_counters(self) -> Self {
        self.counter(2, "cpu.usage.average")
            .counter(12, "cpu.ready.summation")
            .counter(24, "mem.usage.average")
            .counter(29, "mem.active.average")
            .counter(125, "disk.usage.average")
            .counter(130, "disk.read.average")
            .counter(131, "disk.write.average")
            .counter(133, "disk.maxTotalLatency.latest")
            .counter(143, "net.usage.average")
            .counter(146, "net.received.average")
            .counter(147, "net.transmitted.average")
    }

    pub fn find_vm(&self, moid: &str) -> Option<&MockVm> {
        self.vms.iter().find(|vm| vm.moid == moid)
    }

    pub fn find_host(&self, moid: &str) -> Option<&MockHost> {
        self.hosts.iter().find(|h| h.moid == moid)
    }

    pub fn find_network(&self, moref: &ManagedObjectReference) -> Option<&MockNetwork> {
        self.networks.iter().find(|n| &n.moref == moref)
    }

    /// Objets d'un type donné, dans l'ordre d'insertion
    pub fn objects_of(&self, kind: &str) -> Vec<ManagedObjectReference> {
        match kind {
            kinds::VIRTUAL_MACHINE => self.vms.iter().map(MockVm::moref).collect(),
            kinds::HOST_SYSTEM => self.hosts.iter().map(MockHost::moref).collect(),
            _ => self
                .networks
                .iter()
                .filter(|n| n.moref.kind == kind)
                .map(|n| n.moref.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_properties() {
        let vm = MockVm::new("vm-1", "web-01")
            .powered_on()
            .with_config("Ubuntu Linux (64-bit)", 2, 4096)
            .on_host("host-9");
        assert_eq!(vm.property("runtime.powerState"), Some(json!("poweredOn")));
        assert_eq!(vm.property("config.hardware.numCPU"), Some(json!(2)));
        assert_eq!(vm.property("runtime.host").unwrap()["value"], "host-9");
        assert_eq!(vm.property("guest.ipAddress"), None);
    }

    #[test]
    fn test_counter_builder() {
        let inv = Inventory::new().with_standard_counters();
        let names: Vec<String> = inv.counters.iter().map(|c| c.catalog_name()).collect();
        assert!(names.contains(&"disk.read.average".to_string()));
        assert!(names.contains(&"mem.usage.average".to_string()));
    }

    #[test]
    fn test_objects_of_kind() {
        let inv = Inventory::new()
            .vm(MockVm::new("vm-1", "a"))
            .vm(MockVm::new("vm-2", "b"))
            .host(MockHost::new("host-1", "esx-01"))
            .network(MockNetwork::portgroup("dvportgroup-1", "VM Network"));
        assert_eq!(inv.objects_of(kinds::VIRTUAL_MACHINE).len(), 2);
        assert_eq!(inv.objects_of(kinds::HOST_SYSTEM).len(), 1);
        assert_eq!(inv.objects_of("DistributedVirtualPortgroup").len(), 1);
    }
}
