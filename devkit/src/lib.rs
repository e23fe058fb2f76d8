/*!
# vSphere Manager DevKit - Stubs et utilitaires de test

Bibliothèque facilitant les tests du kernel sans vCenter réel:
- Endpoint de gestion simulé en mémoire (`MockVim`, `MockConnector`)
- Construction d'inventaires (VMs, hôtes, réseaux, compteurs de perf)
- Capture des logs `tracing` pour assertions
- Harness de test prêt à l'emploi
*/

pub mod inventory;
pub mod vim_stub;
pub mod test_utils;

pub use inventory::{Inventory, MockHost, MockNetwork, MockVm};
pub use vim_stub::{MockCall, MockConnector, MockOp, MockVim};
pub use test_utils::{LogCapture, TestHarness};
