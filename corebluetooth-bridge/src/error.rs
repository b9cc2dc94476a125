//! Errors reported by CoreBluetooth.

use std::fmt::Display;

use objc2::Message;
use objc2::rc::Retained;
use objc2_core_bluetooth::{CBATTError, CBATTErrorDomain, CBError, CBErrorDomain};
use objc2_foundation::NSError;

pub type Result<T> = std::result::Result<T, Error>;

/// An error reported by CoreBluetooth, or synthesized when a callback carried none.
#[derive(Debug, Clone)]
pub struct Error {
    data: ErrorData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    Bluetooth(CBError),
    ATT(CBATTError),
    Other,
}

#[derive(Debug, Clone)]
enum ErrorData {
    Os(Retained<NSError>),
    Simple(ErrorKind),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            ErrorData::Os(error) => f.write_str(&error.localizedDescription().to_string()),
            ErrorData::Simple(kind) => kind.fmt(f),
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
    pub(crate) fn from_nserror(error: &NSError) -> Self {
        Self {
            data: ErrorData::Os(error.retain()),
        }
    }

    pub(crate) fn from_nserror_or_kind(error: Option<&NSError>, kind: ErrorKind) -> Self {
        match error {
            Some(error) => Self::from_nserror(error),
            None => kind.into(),
        }
    }

    /// The underlying `NSError`, if CoreBluetooth supplied one.
    pub fn get_ref(&self) -> Option<&NSError> {
        match &self.data {
            ErrorData::Os(error) => Some(error),
            ErrorData::Simple(_) => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.data {
            ErrorData::Os(error) => ErrorKind::from(&**error),
            ErrorData::Simple(kind) => *kind,
        }
    }
}

impl From<&NSError> for ErrorKind {
    fn from(error: &NSError) -> Self {
        if &*error.domain() == unsafe { CBErrorDomain } {
            ErrorKind::Bluetooth(CBError(error.code()))
        } else if &*error.domain() == unsafe { CBATTErrorDomain } {
            ErrorKind::ATT(CBATTError(error.code()))
        } else {
            ErrorKind::Other
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Bluetooth(error) => write!(f, "bluetooth error ({})", error.0),
            ErrorKind::ATT(error) => write!(f, "ATT error ({})", error.0),
            ErrorKind::Other => f.write_str("other error"),
        }
    }
}

/// Converts a delegate callback's optional error into a `Result`.
pub(crate) fn or_err<T>(val: T, error: Option<&NSError>) -> Result<T> {
    match error {
        None => Ok(val),
        Some(err) => Err(Error::from_nserror(err)),
    }
}
