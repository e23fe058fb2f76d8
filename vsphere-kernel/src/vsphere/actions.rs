use std::fmt;
use std::str::FromStr;

use crate::models::PowerState;

/// Opérations d'alimentation exposées par `/api/vm/action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmAction {
    PowerOn,
    PowerOff,
    Reset,
    Suspend,
    Shutdown,
    Reboot,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl VmAction {
    pub const ALL: [VmAction; 6] = [
        VmAction::PowerOn,
        VmAction::PowerOff,
        VmAction::Reset,
        VmAction::Suspend,
        VmAction::Shutdown,
        VmAction::Reboot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VmAction::PowerOn => "power_on",
            VmAction::PowerOff => "power_off",
            VmAction::Reset => "reset",
            VmAction::Suspend => "suspend",
            VmAction::Shutdown => "shutdown",
            VmAction::Reboot => "reboot",
        }
    }

    /// Méthode vim25 invoquée sur la VM
    pub fn method(self) -> &'static str {
        match self {
            VmAction::PowerOn => "PowerOnVM_Task",
            VmAction::PowerOff => "PowerOffVM_Task",
            VmAction::Reset => "ResetVM_Task",
            VmAction::Suspend => "SuspendVM_Task",
            VmAction::Shutdown => "ShutdownGuest",
            VmAction::Reboot => "RebootGuest",
        }
    }

    /// État exigé avant d'agir. reset et reboot sont envoyés tels quels,
    /// le serveur rejette lui-même ce qui n'a pas de sens.
    pub fn required_state(self) -> Option<PowerState> {
        match self {
            VmAction::PowerOn => Some(PowerState::PoweredOff),
            VmAction::PowerOff | VmAction::Suspend | VmAction::Shutdown => Some(PowerState::PoweredOn),
            VmAction::Reset | VmAction::Reboot => None,
        }
    }

    pub fn permits(self, state: PowerState) -> bool {
        self.required_state().map_or(true, |required| required == state)
    }
}

impl FromStr for VmAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VmAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

impl fmt::Display for VmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("power_on".parse::<VmAction>(), Ok(VmAction::PowerOn));
        assert_eq!("reboot".parse::<VmAction>(), Ok(VmAction::Reboot));
        assert_eq!("hibernate".parse::<VmAction>(), Err(UnknownAction("hibernate".into())));
        assert!("Power_On".parse::<VmAction>().is_err());
        for action in VmAction::ALL {
            assert_eq!(action.to_string().parse::<VmAction>(), Ok(action));
        }
    }

    #[test]
    fn test_state_requirements() {
        assert!(VmAction::PowerOn.permits(PowerState::PoweredOff));
        assert!(!VmAction::PowerOn.permits(PowerState::Suspended));
        assert!(VmAction::Shutdown.permits(PowerState::PoweredOn));
        assert!(!VmAction::Suspend.permits(PowerState::PoweredOff));
        // reset / reboot : pas de contrôle local
        assert!(VmAction::Reset.permits(PowerState::PoweredOff));
        assert!(VmAction::Reboot.permits(PowerState::Suspended));
        assert_eq!(VmAction::Shutdown.method(), "ShutdownGuest");
    }
}
