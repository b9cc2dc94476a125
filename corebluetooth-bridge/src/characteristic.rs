use btuuid::BluetoothUuid;
use objc2::rc::Retained;
use objc2_core_bluetooth::{CBCharacteristic, CBCharacteristicProperties};

use crate::service::Service;
use crate::util::from_cbuuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Characteristic {
    pub(crate) characteristic: Retained<CBCharacteristic>,
}

impl Characteristic {
    pub(crate) fn new(characteristic: Retained<CBCharacteristic>) -> Self {
        Self { characteristic }
    }

    pub fn uuid(&self) -> BluetoothUuid {
        from_cbuuid(&unsafe { self.characteristic.UUID() })
    }

    /// The most recently read or notified value. `None` before the first read.
    pub fn value(&self) -> Option<Vec<u8>> {
        unsafe { self.characteristic.value() }.map(|x| x.to_vec())
    }

    /// The service this characteristic belongs to. `None` once the service has been released.
    pub fn service(&self) -> Option<Service> {
        unsafe { self.characteristic.service() }.map(Service::new)
    }

    pub fn properties(&self) -> CBCharacteristicProperties {
        unsafe { self.characteristic.properties() }
    }

    pub fn is_notifying(&self) -> bool {
        unsafe { self.characteristic.isNotifying() }
    }
}
