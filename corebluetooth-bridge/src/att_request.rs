use objc2::rc::Retained;
use objc2_core_bluetooth::CBATTRequest;
use objc2_foundation::NSData;

use crate::central::Central;
use crate::characteristic::Characteristic;

/// A read or write request from a remote central against a locally hosted characteristic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttRequest {
    pub(crate) request: Retained<CBATTRequest>,
}

impl AttRequest {
    pub(crate) fn new(request: Retained<CBATTRequest>) -> Self {
        Self { request }
    }

    pub fn central(&self) -> Central {
        Central::new(unsafe { self.request.central() })
    }

    pub fn characteristic(&self) -> Characteristic {
        Characteristic::new(unsafe { self.request.characteristic() })
    }

    /// The zero-based byte offset of the read or write.
    pub fn offset(&self) -> usize {
        unsafe { self.request.offset() }
    }

    /// The data written by the central. Always `None` for read requests until a response value
    /// is set.
    pub fn value(&self) -> Option<Vec<u8>> {
        unsafe { self.request.value() }.map(|x| x.to_vec())
    }

    /// Sets the value returned to the central when responding to a read request.
    pub fn set_value(&self, value: &[u8]) {
        let data = NSData::with_bytes(value);
        unsafe { self.request.setValue(Some(&data)) };
    }
}
