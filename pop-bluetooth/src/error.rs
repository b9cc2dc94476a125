//! Error types for this crate.

use std::fmt::Display;

use btuuid::BluetoothUuid;
use uuid::Uuid;

/// A convenience type alias for a `Result` with an `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised by a wrapper or reported by CoreBluetooth.
///
/// Errors are plain data so they can be published to observers on any thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    data: ErrorData,
}

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// A CoreBluetooth error with its `CBError` code.
    Bluetooth(isize),
    /// An ATT error with its `CBATTError` code.
    Att(isize),
    /// A characteristic had no value when one was expected.
    MissingValue,
    /// No hosted service has the requested identifier.
    NoSuchService,
    /// The service has no mutable characteristic with the requested identifier.
    NoSuchCharacteristic,
    /// The requested central is not subscribed to the characteristic.
    NoSubscribedPeer,
    /// The platform does not support the requested role.
    Unsupported,
    /// An unknown or other error.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ErrorData {
    Simple(ErrorKind),
    Message(ErrorKind, String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            ErrorData::Simple(kind) => kind.fmt(f),
            ErrorData::Message(_, message) => f.write_str(message),
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            data: ErrorData::Simple(kind),
        }
    }
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            data: ErrorData::Message(kind, message.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.data {
            ErrorData::Simple(kind) | ErrorData::Message(kind, _) => *kind,
        }
    }
}

impl Error {
    pub(crate) fn missing_value(characteristic: &BluetoothUuid) -> Self {
        Self::new(
            ErrorKind::MissingValue,
            format!("missing characteristic {characteristic:?} value"),
        )
    }

    pub(crate) fn no_such_service(service: &BluetoothUuid) -> Self {
        Self::new(
            ErrorKind::NoSuchService,
            format!("no such service {service:?}"),
        )
    }

    pub(crate) fn no_such_characteristic(
        characteristic: &BluetoothUuid,
        service: &BluetoothUuid,
    ) -> Self {
        Self::new(
            ErrorKind::NoSuchCharacteristic,
            format!("no such mutable characteristic {characteristic:?} on service {service:?}"),
        )
    }

    pub(crate) fn no_subscribed_peer(peer: &Uuid) -> Self {
        Self::new(
            ErrorKind::NoSubscribedPeer,
            format!("no subscribed peer {peer}"),
        )
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Bluetooth(code) => write!(f, "bluetooth error ({code})"),
            ErrorKind::Att(code) => write!(f, "ATT error ({code})"),
            ErrorKind::MissingValue => f.write_str("missing value"),
            ErrorKind::NoSuchService => f.write_str("no such service"),
            ErrorKind::NoSuchCharacteristic => f.write_str("no such characteristic"),
            ErrorKind::NoSubscribedPeer => f.write_str("no subscribed peer"),
            ErrorKind::Unsupported => f.write_str("unsupported"),
            ErrorKind::Other => f.write_str("other error"),
        }
    }
}

#[cfg(target_vendor = "apple")]
impl From<corebluetooth_bridge::Error> for Error {
    fn from(error: corebluetooth_bridge::Error) -> Self {
        use corebluetooth_bridge::error::ErrorKind as BridgeKind;

        let kind = match error.kind() {
            BridgeKind::Bluetooth(error) => ErrorKind::Bluetooth(error.0),
            BridgeKind::ATT(error) => ErrorKind::Att(error.0),
            BridgeKind::Other => ErrorKind::Other,
        };
        Error::new(kind, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_error_displays_kind() {
        let error = Error::from(ErrorKind::Unsupported);
        assert_eq!(error.kind(), ErrorKind::Unsupported);
        assert_eq!(error.to_string(), "unsupported");
    }

    #[test]
    fn lookup_errors_name_the_identifiers() {
        let service = BluetoothUuid::from_u16(0x180d);
        let error = Error::no_such_service(&service);
        assert_eq!(error.kind(), ErrorKind::NoSuchService);
        assert!(error.to_string().contains(&format!("{service:?}")));

        let peer = Uuid::from_u128(7);
        let error = Error::no_subscribed_peer(&peer);
        assert_eq!(error.kind(), ErrorKind::NoSubscribedPeer);
        assert!(error.to_string().contains(&peer.to_string()));
    }

    #[test]
    fn platform_codes_display() {
        assert_eq!(ErrorKind::Bluetooth(6).to_string(), "bluetooth error (6)");
        assert_eq!(ErrorKind::Att(3).to_string(), "ATT error (3)");
    }
}
