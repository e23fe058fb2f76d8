use thiserror::Error;

/// Erreurs remontées par le binding de l'endpoint de gestion
#[derive(Debug, Error)]
pub enum VimError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("vendor fault {kind}: {message}")]
    Fault { kind: String, message: String },
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("login response carried no session id")]
    MissingSession,
    #[error("time formatting error: {0}")]
    Time(#[from] time::error::Format),
}

impl VimError {
    pub fn fault(kind: impl Into<String>, message: impl Into<String>) -> Self {
        VimError::Fault { kind: kind.into(), message: message.into() }
    }

    /// Vrai quand l'endpoint a rejeté les identifiants ou la session
    pub fn is_auth(&self) -> bool {
        matches!(self, VimError::Fault { kind, .. } if kind == "InvalidLogin" || kind == "NotAuthenticated")
    }

    /// Objet disparu côté serveur (supprimé entre deux appels)
    pub fn is_not_found(&self) -> bool {
        matches!(self, VimError::Fault { kind, .. } if kind == "ManagedObjectNotFound")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_faults() {
        assert!(VimError::fault("InvalidLogin", "bad password").is_auth());
        assert!(VimError::fault("NotAuthenticated", "").is_auth());
        assert!(!VimError::fault("SystemError", "boom").is_auth());
        assert!(!VimError::MissingSession.is_auth());
    }

    #[test]
    fn test_not_found_fault() {
        assert!(VimError::fault("ManagedObjectNotFound", "VirtualMachine:vm-2").is_not_found());
        assert!(!VimError::fault("InvalidLogin", "").is_not_found());
        assert!(!VimError::Status { status: 404, body: String::new() }.is_not_found());
    }
}
