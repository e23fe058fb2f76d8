/**
 * SESSION STORE - Connexion unique au serveur de gestion vSphere
 *
 * RÔLE : Garde la session authentifiée courante, partagée par tous les handlers.
 *
 * FONCTIONNEMENT :
 * - `connect` ouvre une nouvelle session via le `VimConnector` et remplace l'ancienne
 *   (déconnectée au mieux)
 * - Les connexions concurrentes sont sérialisées ; les lectures ne bloquent jamais
 * - Un échec de connexion laisse le store déconnecté
 * - `disconnect` n'est appelé qu'à l'arrêt du process
 */

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use vsphere_vim::{ConnectTarget, VimApi, VimConnector, VimError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("authentication rejected: {0}")]
    Auth(#[source] VimError),
    #[error("connection failed: {0}")]
    Connect(#[source] VimError),
}

impl From<VimError> for SessionError {
    fn from(e: VimError) -> Self {
        if e.is_auth() {
            SessionError::Auth(e)
        } else {
            SessionError::Connect(e)
        }
    }
}

#[derive(Clone)]
struct Connection {
    api: Arc<dyn VimApi>,
    host: String,
    user: String,
    since: OffsetDateTime,
}

/// Vue publique de la connexion, exposée par `/api/session`
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub host: Option<String>,
    pub user: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub since: Option<OffsetDateTime>,
}

pub struct SessionStore {
    connector: Arc<dyn VimConnector>,
    connect_gate: tokio::sync::Mutex<()>,
    active: RwLock<Option<Connection>>,
}

impl SessionStore {
    pub fn new(connector: Arc<dyn VimConnector>) -> Self {
        Self { connector, connect_gate: tokio::sync::Mutex::new(()), active: RwLock::new(None) }
    }

    pub async fn connect(&self, target: &ConnectTarget) -> bool {
        match self.try_connect(target).await {
            Ok(()) => {
                info!("Successfully connected to vSphere server: {}", target.host);
                true
            }
            Err(e) => {
                error!("Failed to connect to vSphere server {}: {}", target.host, e);
                false
            }
        }
    }

    pub async fn try_connect(&self, target: &ConnectTarget) -> Result<(), SessionError> {
        let _gate = self.connect_gate.lock().await;

        let outcome = self.connector.connect(target).await;
        let next = outcome.as_ref().ok().map(|api| Connection {
            api: api.clone(),
            host: target.host.clone(),
            user: target.user.clone(),
            since: OffsetDateTime::now_utc(),
        });
        let previous = std::mem::replace(&mut *self.active.write(), next);

        if let Some(old) = previous {
            close(old).await;
        }
        outcome.map(|_| ()).map_err(SessionError::from)
    }

    pub fn is_connected(&self) -> bool {
        self.active.read().is_some()
    }

    /// Session courante, `None` si déconnecté
    pub fn current(&self) -> Option<Arc<dyn VimApi>> {
        self.active.read().as_ref().map(|c| c.api.clone())
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.active.read().as_ref() {
            Some(c) => ConnectionStatus {
                connected: true,
                host: Some(c.host.clone()),
                user: Some(c.user.clone()),
                since: Some(c.since),
            },
            None => ConnectionStatus { connected: false, host: None, user: None, since: None },
        }
    }

    pub async fn disconnect(&self) {
        let _gate = self.connect_gate.lock().await;
        let previous = self.active.write().take();
        if let Some(old) = previous {
            close(old).await;
        }
    }
}

async fn close(conn: Connection) {
    match conn.api.logout().await {
        Ok(()) => info!("Closed vSphere session on {} ({})", conn.host, conn.user),
        Err(e) => warn!("Failed to close vSphere session on {}: {}", conn.host, e),
    }
}
