//! ObjectContent -> records du dashboard

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use vsphere_vim::{ManagedObjectReference, ObjectContent, SnapshotInfo, SnapshotTree};

use crate::models::{Host, Network, PowerState, Snapshot, VirtualMachine};

pub const NOT_AVAILABLE: &str = "N/A";

pub const VM_PROPERTIES: &[&str] = &[
    "name",
    "runtime.powerState",
    "config.guestFullName",
    "config.hardware.numCPU",
    "config.hardware.memoryMB",
    "guest.ipAddress",
    "guest.guestState",
    "runtime.bootTime",
    "runtime.host",
];

pub const HOST_PROPERTIES: &[&str] = &[
    "name",
    "runtime.powerState",
    "runtime.connectionState",
    "runtime.inMaintenanceMode",
    "hardware.cpuInfo.numCpuCores",
    "hardware.memorySize",
    "summary.quickStats.overallCpuUsage",
    "summary.quickStats.overallMemoryUsage",
];

pub const NETWORK_PROPERTIES: &[&str] = &["name", "summary.accessible"];

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("property {path} unreadable: {fault}")]
    Fault { path: String, fault: String },
    #[error("required property {0} missing")]
    Missing(String),
    #[error("property {path} has an unexpected value: {source}")]
    Invalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn optional<T: DeserializeOwned>(content: &ObjectContent, path: &str) -> Result<Option<T>, MappingError> {
    content
        .get(path)
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()
        .map_err(|source| MappingError::Invalid { path: path.to_string(), source })
}

fn required<T: DeserializeOwned>(content: &ObjectContent, path: &str) -> Result<T, MappingError> {
    optional(content, path)?.ok_or_else(|| MappingError::Missing(path.to_string()))
}

fn check_faults(content: &ObjectContent) -> Result<(), MappingError> {
    match content.first_fault() {
        Some(m) => Err(MappingError::Fault { path: m.path.clone(), fault: m.fault.clone() }),
        None => Ok(()),
    }
}

/// Nom lisible pour les logs, même quand le reste de l'objet est illisible
pub fn display_name(content: &ObjectContent) -> String {
    content
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| content.obj.value.clone())
}

pub fn name_of(content: &ObjectContent) -> Option<&str> {
    content.get("name").and_then(Value::as_str)
}

/// Hôte d'exécution d'une VM, s'il est lisible
pub fn host_ref(content: &ObjectContent) -> Option<ManagedObjectReference> {
    optional::<ManagedObjectReference>(content, "runtime.host").ok().flatten()
}

pub fn vm_from_content(
    content: &ObjectContent,
    host_names: &HashMap<String, String>,
) -> Result<VirtualMachine, MappingError> {
    check_faults(content)?;
    let host = host_ref(content)
        .and_then(|h| host_names.get(&h.value).cloned())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    Ok(VirtualMachine {
        name: required(content, "name")?,
        power_state: required(content, "runtime.powerState")?,
        guest_os: optional(content, "config.guestFullName")?.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        cpu: optional(content, "config.hardware.numCPU")?.unwrap_or(0),
        memory_mb: optional(content, "config.hardware.memoryMB")?.unwrap_or(0),
        ip_address: optional(content, "guest.ipAddress")?,
        moid: content.obj.value.clone(),
        guest_state: optional(content, "guest.guestState")?.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        boot_time: optional(content, "runtime.bootTime")?,
        host,
    })
}

/// État d'alimentation seul, pour décider d'une action
pub fn power_state(content: &ObjectContent) -> Result<PowerState, MappingError> {
    check_faults(content)?;
    required(content, "runtime.powerState")
}

pub fn host_from_content(content: &ObjectContent) -> Result<Host, MappingError> {
    check_faults(content)?;
    let memory_bytes: i64 = optional(content, "hardware.memorySize")?.unwrap_or(0);
    Ok(Host {
        name: required(content, "name")?,
        power_state: required(content, "runtime.powerState")?,
        connection_state: required(content, "runtime.connectionState")?,
        maintenance_mode: optional(content, "runtime.inMaintenanceMode")?.unwrap_or(false),
        cpu_cores: optional(content, "hardware.cpuInfo.numCpuCores")?.unwrap_or(0),
        memory_size_mb: memory_bytes as f64 / (1024.0 * 1024.0),
        cpu_usage: optional(content, "summary.quickStats.overallCpuUsage")?.unwrap_or(0),
        memory_usage: optional(content, "summary.quickStats.overallMemoryUsage")?.unwrap_or(0),
    })
}

pub fn network_from_content(content: &ObjectContent) -> Result<Network, MappingError> {
    check_faults(content)?;
    Ok(Network {
        name: required(content, "name")?,
        accessible: optional(content, "summary.accessible")?.unwrap_or(false),
        network_type: content.obj.kind.clone(),
    })
}

/// Arbre de snapshots d'une VM, `None` si elle n'en a jamais eu
pub fn snapshot_info(content: &ObjectContent) -> Result<Option<SnapshotInfo>, MappingError> {
    check_faults(content)?;
    optional(content, "snapshot")
}

/// Seules les racines sont listées, les enfants ne sont pas parcourus
pub fn snapshots_from_info(info: &SnapshotInfo) -> Result<Vec<Snapshot>, MappingError> {
    info.root_snapshot_list.iter().map(snapshot_from_tree).collect()
}

fn snapshot_from_tree(tree: &SnapshotTree) -> Result<Snapshot, MappingError> {
    let state = serde_json::from_value(Value::String(tree.state.clone()))
        .map_err(|source| MappingError::Invalid { path: "snapshot.state".into(), source })?;
    Ok(Snapshot {
        name: tree.name.clone(),
        description: tree.description.clone(),
        creation_time: tree.create_time.clone(),
        state,
    })
}

pub fn attached_networks(content: &ObjectContent) -> Result<Vec<ManagedObjectReference>, MappingError> {
    check_faults(content)?;
    Ok(optional(content, "network")?.unwrap_or_default())
}
