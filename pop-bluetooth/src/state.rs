//! Power and connection states mirrored from CoreBluetooth.

use std::fmt::Display;

/// The state of a central or peripheral manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ManagerState {
    #[default]
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
    /// A state this crate does not know about, with its raw value.
    Other(isize),
}

impl ManagerState {
    pub fn is_powered_on(self) -> bool {
        self == ManagerState::PoweredOn
    }
}

impl Display for ManagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerState::Unknown => f.write_str("unknown"),
            ManagerState::Resetting => f.write_str("resetting"),
            ManagerState::Unsupported => f.write_str("unsupported"),
            ManagerState::Unauthorized => f.write_str("unauthorized"),
            ManagerState::PoweredOff => f.write_str("powered off"),
            ManagerState::PoweredOn => f.write_str("powered on"),
            ManagerState::Other(state) => write!(f, "unknown state ({state})"),
        }
    }
}

/// The connection state of a remote peripheral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PeripheralState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Other(isize),
}

impl Display for PeripheralState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeripheralState::Disconnected => f.write_str("disconnected"),
            PeripheralState::Connecting => f.write_str("connecting"),
            PeripheralState::Connected => f.write_str("connected"),
            PeripheralState::Disconnecting => f.write_str("disconnecting"),
            PeripheralState::Other(state) => write!(f, "unknown state ({state})"),
        }
    }
}

#[cfg(target_vendor = "apple")]
mod platform {
    use corebluetooth_bridge::{CBManagerState, CBPeripheralState};

    use super::{ManagerState, PeripheralState};

    impl From<CBManagerState> for ManagerState {
        fn from(state: CBManagerState) -> Self {
            match state {
                CBManagerState::Unknown => ManagerState::Unknown,
                CBManagerState::Resetting => ManagerState::Resetting,
                CBManagerState::Unsupported => ManagerState::Unsupported,
                CBManagerState::Unauthorized => ManagerState::Unauthorized,
                CBManagerState::PoweredOff => ManagerState::PoweredOff,
                CBManagerState::PoweredOn => ManagerState::PoweredOn,
                other => ManagerState::Other(other.0),
            }
        }
    }

    impl From<CBPeripheralState> for PeripheralState {
        fn from(state: CBPeripheralState) -> Self {
            match state {
                CBPeripheralState::Disconnected => PeripheralState::Disconnected,
                CBPeripheralState::Connecting => PeripheralState::Connecting,
                CBPeripheralState::Connected => PeripheralState::Connected,
                CBPeripheralState::Disconnecting => PeripheralState::Disconnecting,
                other => PeripheralState::Other(other.0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_state_display() {
        assert_eq!(ManagerState::PoweredOn.to_string(), "powered on");
        assert_eq!(ManagerState::Unauthorized.to_string(), "unauthorized");
        assert_eq!(ManagerState::Other(9).to_string(), "unknown state (9)");
    }

    #[test]
    fn only_powered_on_is_powered_on() {
        assert!(ManagerState::PoweredOn.is_powered_on());
        assert!(!ManagerState::PoweredOff.is_powered_on());
        assert!(!ManagerState::default().is_powered_on());
    }

    #[test]
    fn peripheral_state_display() {
        assert_eq!(PeripheralState::Connecting.to_string(), "connecting");
        assert_eq!(PeripheralState::default().to_string(), "disconnected");
    }
}
