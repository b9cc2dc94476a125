use btuuid::BluetoothUuid;
use objc2::rc::Retained;
use objc2_core_bluetooth::CBService;

use crate::characteristic::Characteristic;
use crate::util::from_cbuuid;

/// A GATT service discovered on a remote peripheral, or hosted by the local peripheral manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Service {
    pub(crate) service: Retained<CBService>,
}

impl Service {
    pub(crate) fn new(service: Retained<CBService>) -> Self {
        Self { service }
    }

    pub fn uuid(&self) -> BluetoothUuid {
        from_cbuuid(&unsafe { self.service.UUID() })
    }

    pub fn is_primary(&self) -> bool {
        unsafe { self.service.isPrimary() }
    }

    /// The characteristics of this service, or `None` until they have been discovered.
    pub fn characteristics(&self) -> Option<Vec<Characteristic>> {
        let characteristics = unsafe { self.service.characteristics() };
        characteristics.map(|x| x.iter().map(Characteristic::new).collect())
    }
}
