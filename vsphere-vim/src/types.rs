//! Types d'objets gérés, calqués sur le modèle de données vim25.
//!
//! Seuls les champs lus par le kernel sont déclarés. serde ignore le reste
//! de la réponse de l'endpoint (balises `_typeName` comprises).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use time::OffsetDateTime;

/// Types d'objets gérés utilisés par le kernel
pub mod kinds {
    pub const VIRTUAL_MACHINE: &str = "VirtualMachine";
    pub const HOST_SYSTEM: &str = "HostSystem";
    pub const NETWORK: &str = "Network";
    pub const TASK: &str = "Task";
}

/// Référence vers un objet géré côté serveur (ex: `VirtualMachine:vm-42`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self { kind: kind.into(), value: value.into() }
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    pub full_name: String,
    pub api_version: String,
}

/// Points d'entrée de l'inventaire, rendus une fois par session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    pub view_manager: ManagedObjectReference,
    pub perf_manager: ManagedObjectReference,
    pub session_manager: ManagedObjectReference,
    #[serde(default)]
    pub about: Option<AboutInfo>,
}

/// Où et sous quelle identité ouvrir une session
#[derive(Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl ConnectTarget {
    pub const DEFAULT_PORT: u16 = 443;

    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Hôte tel qu'il doit apparaître dans une URL (IPv6 entre crochets)
    pub fn url_host(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

// jamais de mot de passe dans les logs
impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Chemin de propriété que le collector n'a pas pu lire sur un objet
#[derive(Debug, Clone, PartialEq)]
pub struct MissingProperty {
    pub path: String,
    pub fault: String,
}

/// Propriétés d'un objet, telles que rendues par RetrievePropertiesEx
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectContent {
    pub obj: ManagedObjectReference,
    pub properties: HashMap<String, Value>,
    pub missing: Vec<MissingProperty>,
}

impl ObjectContent {
    pub fn new(obj: ManagedObjectReference) -> Self {
        Self { obj, properties: HashMap::new(), missing: Vec::new() }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.properties.get(path).filter(|v| !v.is_null())
    }

    pub fn first_fault(&self) -> Option<&MissingProperty> {
        self.missing.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescription {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Entrée du catalogue des compteurs de performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfCounterInfo {
    pub key: i32,
    pub name_info: ElementDescription,
    pub group_info: ElementDescription,
    pub rollup_type: String,
}

impl PerfCounterInfo {
    /// Nom pointé du catalogue, ex: `cpu.usage.average`
    pub fn catalog_name(&self) -> String {
        format!("{}.{}.{}", self.group_info.key, self.name_info.key, self.rollup_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfMetricId {
    pub counter_id: i32,
    #[serde(default)]
    pub instance: String,
}

impl PerfMetricId {
    /// Instance agrégée d'un compteur
    pub fn aggregate(counter_id: i32) -> Self {
        Self { counter_id, instance: String::new() }
    }
}

/// Requête de statistiques historiques pour une entité
#[derive(Debug, Clone, PartialEq)]
pub struct PerfQuerySpec {
    pub entity: ManagedObjectReference,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub max_sample: i32,
    pub metric_ids: Vec<PerfMetricId>,
    pub interval_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfSampleInfo {
    pub timestamp: String,
    pub interval: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfMetricSeries {
    pub id: PerfMetricId,
    #[serde(default)]
    pub value: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfEntityMetric {
    pub entity: ManagedObjectReference,
    #[serde(default)]
    pub sample_info: Vec<PerfSampleInfo>,
    #[serde(default)]
    pub value: Vec<PerfMetricSeries>,
}

/// Nœud de l'arbre de snapshots d'une VM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTree {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub create_time: String,
    pub state: String,
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub snapshot: Option<ManagedObjectReference>,
    #[serde(default)]
    pub child_snapshot_list: Vec<SnapshotTree>,
}

/// Valeur de la propriété `snapshot` d'une VM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    #[serde(default)]
    pub current_snapshot: Option<ManagedObjectReference>,
    #[serde(default)]
    pub root_snapshot_list: Vec<SnapshotTree>,
}
