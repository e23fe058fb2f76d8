use serde::{Deserialize, Serialize};
use std::fmt;

/// État d'alimentation d'une VM tel que rapporté par `runtime.powerState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

impl PowerState {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerState::PoweredOn => "poweredOn",
            PowerState::PoweredOff => "poweredOff",
            PowerState::Suspended => "suspended",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostPowerState {
    PoweredOn,
    PoweredOff,
    StandBy,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    NotResponding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub name: String,
    pub power_state: PowerState,
    pub guest_os: String,
    pub cpu: i64,
    pub memory_mb: i64,
    pub ip_address: Option<String>,
    pub moid: String,
    pub guest_state: String,
    pub boot_time: Option<String>,
    /// nom de l'hôte ESXi, "N/A" si non résolu
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub description: String,
    pub creation_time: String,
    pub state: PowerState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub accessible: bool,
    pub network_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    pub power_state: HostPowerState,
    pub connection_state: ConnectionState,
    pub maintenance_mode: bool,
    pub cpu_cores: i64,
    pub memory_size_mb: f64,
    /// MHz
    pub cpu_usage: i64,
    /// MB
    pub memory_usage: i64,
}

/// Série de performance aplatie : une valeur par échantillon, compteurs concaténés
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSeries {
    pub timestamps: Vec<String>,
    pub values: Vec<f64>,
}

impl PerformanceSeries {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
