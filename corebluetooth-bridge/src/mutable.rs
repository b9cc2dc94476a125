//! Services and characteristics hosted by the local [`PeripheralManager`](crate::PeripheralManager).

use btuuid::BluetoothUuid;
use objc2::AnyThread;
use objc2::rc::{Retained, RetainedFromIterator};
use objc2_core_bluetooth::{
    CBAttributePermissions, CBCharacteristicProperties, CBMutableCharacteristic, CBMutableService,
};
use objc2_foundation::{NSArray, NSData};

use crate::central::Central;
use crate::service::Service;
use crate::util::{from_cbuuid, to_cbuuid};

/// A service published by the local peripheral manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutableService {
    pub(crate) service: Retained<CBMutableService>,
}

impl MutableService {
    pub fn new(uuid: &BluetoothUuid, primary: bool) -> Self {
        let service = unsafe {
            CBMutableService::initWithType_primary(
                CBMutableService::alloc(),
                &to_cbuuid(uuid),
                primary,
            )
        };
        Self { service }
    }

    /// Creates a primary service holding `characteristics`.
    pub fn with_characteristics(
        uuid: &BluetoothUuid,
        characteristics: &[MutableCharacteristic],
    ) -> Self {
        let service = Self::new(uuid, true);
        service.set_characteristics(characteristics);
        service
    }

    pub fn uuid(&self) -> BluetoothUuid {
        from_cbuuid(&unsafe { self.service.UUID() })
    }

    pub fn set_characteristics(&self, characteristics: &[MutableCharacteristic]) {
        let characteristics = NSArray::retained_from_iter(
            characteristics
                .iter()
                .map(|c| c.characteristic.clone().into_super()),
        );
        unsafe { self.service.setCharacteristics(Some(&characteristics)) };
    }

    /// The characteristics of this service that were created as [`MutableCharacteristic`]s.
    pub fn characteristics(&self) -> Vec<MutableCharacteristic> {
        let characteristics = unsafe { self.service.characteristics() };
        characteristics
            .into_iter()
            .flatten()
            .filter_map(|c| c.downcast::<CBMutableCharacteristic>().ok())
            .map(MutableCharacteristic::new)
            .collect()
    }

    pub fn as_service(&self) -> Service {
        Service::new(self.service.clone().into_super())
    }
}

/// A characteristic published by the local peripheral manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutableCharacteristic {
    pub(crate) characteristic: Retained<CBMutableCharacteristic>,
}

impl MutableCharacteristic {
    pub(crate) fn new(characteristic: Retained<CBMutableCharacteristic>) -> Self {
        Self { characteristic }
    }

    /// Creates a characteristic.
    ///
    /// A `value` makes the characteristic read-only with a value cached by CoreBluetooth; pass
    /// `None` for values that change or are written by centrals.
    pub fn create(
        uuid: &BluetoothUuid,
        properties: CBCharacteristicProperties,
        value: Option<&[u8]>,
        permissions: CBAttributePermissions,
    ) -> Self {
        let value = value.map(NSData::with_bytes);
        let characteristic = unsafe {
            CBMutableCharacteristic::initWithType_properties_value_permissions(
                CBMutableCharacteristic::alloc(),
                &to_cbuuid(uuid),
                properties,
                value.as_deref(),
                permissions,
            )
        };
        Self { characteristic }
    }

    pub fn uuid(&self) -> BluetoothUuid {
        from_cbuuid(&unsafe { self.characteristic.UUID() })
    }

    pub fn properties(&self) -> CBCharacteristicProperties {
        unsafe { self.characteristic.properties() }
    }

    /// The centrals currently subscribed to notifications or indications.
    pub fn subscribed_centrals(&self) -> Vec<Central> {
        let centrals = unsafe { self.characteristic.subscribedCentrals() };
        centrals
            .into_iter()
            .flatten()
            .map(Central::new)
            .collect()
    }
}
