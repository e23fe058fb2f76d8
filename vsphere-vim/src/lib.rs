//! Binding VI/JSON vSphere
//!
//! Le strict nécessaire de l'API vim25 pour le kernel vSphere Manager :
//! - ouverture (`VimConnector`) et fermeture de session
//! - vues conteneur récursives sur l'inventaire
//! - lectures groupées via le PropertyCollector
//! - catalogue des compteurs de performance et échantillons historiques
//! - invocation de méthodes à tâche (alimentation, snapshots)
//!
//! `VimJsonClient` parle à un vrai endpoint en HTTPS. Les tests branchent
//! l'endpoint en mémoire de `vsphere-devkit` derrière les mêmes traits.

pub mod api;
pub mod error;
pub mod json_client;
pub mod types;

pub use api::{VimApi, VimConnector};
pub use error::VimError;
pub use json_client::{VimJsonClient, VimJsonConnector};
pub use types::*;
