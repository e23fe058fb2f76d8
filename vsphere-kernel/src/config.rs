use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "VSPHERE_MANAGER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "manager.yaml";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ManagerConfig {
    pub server: ServerConf,
    pub vsphere: VsphereConf,
    pub auth: AuthConf,
    pub logging: LoggingConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConf {
    pub bind: String,
    pub port: u16,
    /// taille fixe du pool de workers
    pub worker_threads: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct VsphereConf {
    pub default_port: u16,
    pub api_release: String,
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConf {
    pub require_session: bool,
    pub cookie_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConf {
    pub filter: String,
    pub file: Option<PathBuf>,
}

impl Default for ServerConf {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 5000, worker_threads: 4 }
    }
}

impl Default for VsphereConf {
    fn default() -> Self {
        Self {
            default_port: vsphere_vim::ConnectTarget::DEFAULT_PORT,
            api_release: vsphere_vim::json_client::DEFAULT_RELEASE.into(),
            accept_invalid_certs: true,
        }
    }
}

impl Default for AuthConf {
    fn default() -> Self {
        Self { require_session: false, cookie_name: "vsphere_session".into() }
    }
}

impl Default for LoggingConf {
    fn default() -> Self {
        Self { filter: "info".into(), file: Some(PathBuf::from("vsphere_manager.log")) }
    }
}

/// D'où vient la configuration effective, pour le log de démarrage
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults(String),
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ManagerConfig,
    pub source: ConfigSource,
}

pub fn parse_config(txt: &str) -> Result<ManagerConfig, serde_yaml::Error> {
    if txt.trim().is_empty() {
        return Ok(ManagerConfig::default());
    }
    serde_yaml::from_str(txt)
}

/// Lecture synchrone : appelée avant la construction du runtime
pub fn load_config() -> LoadedConfig {
    let path = PathBuf::from(std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into()));
    let mut loaded = load_from(&path);
    apply_port_override(&mut loaded.config, std::env::var("PORT").ok().as_deref());
    loaded
}

fn load_from(path: &Path) -> LoadedConfig {
    if !path.exists() {
        return LoadedConfig {
            config: ManagerConfig::default(),
            source: ConfigSource::Defaults(format!("{} not found", path.display())),
        };
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|txt| parse_config(&txt).map_err(|e| e.to_string()));
    match parsed {
        Ok(config) => LoadedConfig { config, source: ConfigSource::File(path.to_path_buf()) },
        Err(e) => LoadedConfig {
            config: ManagerConfig::default(),
            source: ConfigSource::Defaults(format!("invalid {}: {e}", path.display())),
        },
    }
}

/// `PORT` prime sur le fichier ; une valeur illisible est ignorée
pub fn apply_port_override(cfg: &mut ManagerConfig, value: Option<&str>) {
    if let Some(port) = value.and_then(|v| v.trim().parse::<u16>().ok()) {
        cfg.server.port = port;
    }
}
