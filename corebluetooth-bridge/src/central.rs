use objc2::rc::Retained;
use objc2_core_bluetooth::CBCentral;
use uuid::Uuid;

/// A remote central connected to the local peripheral manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Central {
    pub(crate) central: Retained<CBCentral>,
}

impl Central {
    pub(crate) fn new(central: Retained<CBCentral>) -> Self {
        Central { central }
    }

    pub fn identifier(&self) -> Uuid {
        let uuid = unsafe { self.central.identifier() };
        Uuid::from_bytes(uuid.as_bytes())
    }

    /// The largest value, in bytes, that one notification or indication to this central can carry.
    pub fn max_value_update_len(&self) -> usize {
        unsafe { self.central.maximumUpdateValueLength() }
    }
}
