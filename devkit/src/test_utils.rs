/*!
Test Harness pour le kernel vSphere Manager

Facilite l'écriture de tests avec:
- Setup automatique d'un endpoint simulé et de son connecteur
- Capture des événements `tracing` (comptage par niveau)
- Identifiants de test cohérents
*/

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;
use vsphere_vim::ConnectTarget;

use crate::inventory::Inventory;
use crate::vim_stub::{MockConnector, MockVim};

pub const TEST_HOST: &str = "vcenter.lab.local";
pub const TEST_USER: &str = "administrator@vsphere.local";
pub const TEST_PASSWORD: &str = "VMware1!";

/// Événement capturé
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

/// Layer `tracing` qui garde tous les événements en mémoire
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installe la capture comme subscriber du thread courant
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(Registry::default().with(self.clone()))
    }

    pub fn count(&self, level: Level) -> usize {
        self.events.lock().iter().filter(|e| e.level == level).count()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages(level).iter().any(|m| m.contains(needle))
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
        });
    }
}

/// Harness complet: endpoint simulé + connecteur + capture de logs.
///
/// Le subscriber est installé pour le thread courant; les tests
/// `#[tokio::test]` (runtime mono-thread) voient donc tous les événements.
pub struct TestHarness {
    pub vim: MockVim,
    pub connector: MockConnector,
    pub logs: LogCapture,
    _guard: DefaultGuard,
}

impl TestHarness {
    pub fn new(inventory: Inventory) -> Self {
        let vim = MockVim::new(inventory);
        let connector = MockConnector::new(vim.clone(), TEST_USER, TEST_PASSWORD);
        let logs = LogCapture::new();
        let guard = logs.install();
        Self { vim, connector, logs, _guard: guard }
    }

    /// Cible valide pour le connecteur simulé
    pub fn target(&self) -> ConnectTarget {
        ConnectTarget::new(TEST_HOST, TEST_USER, TEST_PASSWORD)
    }

    pub fn bad_target(&self) -> ConnectTarget {
        ConnectTarget::new(TEST_HOST, TEST_USER, "wrong-password")
    }

    pub fn errors(&self) -> usize {
        self.logs.count(Level::ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{error, info, warn};
    use vsphere_vim::VimConnector;

    #[test]
    fn test_log_capture_counts_levels() {
        let logs = LogCapture::new();
        let _guard = logs.install();

        info!("connected to {}", "vc-01");
        warn!("slow answer");
        error!("first failure");
        error!("second failure");

        assert_eq!(logs.count(Level::ERROR), 2);
        assert_eq!(logs.count(Level::WARN), 1);
        assert!(logs.contains(Level::INFO, "vc-01"));

        logs.clear();
        assert_eq!(logs.count(Level::ERROR), 0);
    }

    #[tokio::test]
    async fn test_harness_connects() {
        let harness = TestHarness::new(Inventory::new());
        assert!(harness.connector.connect(&harness.target()).await.is_ok());
        assert!(harness.connector.connect(&harness.bad_target()).await.is_err());
        assert_eq!(harness.connector.attempts().len(), 2);
        assert_eq!(harness.errors(), 0);
    }
}
