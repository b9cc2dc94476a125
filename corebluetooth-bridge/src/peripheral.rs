//! A remote peripheral seen by the [`CentralManager`](crate::CentralManager).

use std::any::Any;

use btuuid::BluetoothUuid;
use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2::{AnyThread, DefinedClass, Message, define_class, msg_send};
use objc2_core_bluetooth::{
    CBCharacteristic, CBCharacteristicWriteType, CBPeripheral, CBPeripheralDelegate,
    CBPeripheralState, CBService,
};
use objc2_foundation::{NSArray, NSData, NSError, NSObject, NSObjectProtocol};
use uuid::Uuid;

use crate::characteristic::Characteristic;
use crate::error::{Result, or_err};
use crate::service::Service;
use crate::util::to_cbuuids;

/// A remote peripheral.
///
/// CoreBluetooth only holds a weak reference to a peripheral's delegate, so a `Peripheral`
/// keeps the delegate attached with [`set_delegate`](Self::set_delegate) alive. Every clone
/// shares it.
#[derive(Clone)]
pub struct Peripheral {
    pub(crate) peripheral: Retained<CBPeripheral>,
    delegate: Option<Retained<PeripheralDelegateBridge>>,
}

impl std::fmt::Debug for Peripheral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peripheral")
            .field("peripheral", &self.peripheral)
            .finish()
    }
}

impl PartialEq for Peripheral {
    fn eq(&self, other: &Self) -> bool {
        self.peripheral == other.peripheral
    }
}

impl Eq for Peripheral {}

impl std::hash::Hash for Peripheral {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.peripheral.hash(state);
    }
}

impl Peripheral {
    pub(crate) fn new(peripheral: Retained<CBPeripheral>) -> Self {
        let delegate =
            unsafe { peripheral.delegate() }.and_then(|delegate| delegate.downcast().ok());

        Peripheral {
            peripheral,
            delegate,
        }
    }

    /// Replaces the delegate receiving this peripheral's events.
    pub fn set_delegate(&mut self, delegate: Box<dyn PeripheralDelegate>) {
        let delegate = PeripheralDelegateBridge::new(delegate);
        unsafe {
            self.peripheral
                .setDelegate(Some(ProtocolObject::from_ref(&*delegate)))
        };
        self.delegate = Some(delegate);
    }

    pub fn delegate(&self) -> Option<&dyn PeripheralDelegate> {
        self.delegate
            .as_deref()
            .map(|bridge| &*bridge.ivars().delegate)
    }

    pub fn identifier(&self) -> Uuid {
        let uuid = unsafe { self.peripheral.identifier() };
        Uuid::from_bytes(uuid.as_bytes())
    }

    pub fn name(&self) -> Option<String> {
        let name = unsafe { self.peripheral.name() };
        name.map(|x| x.to_string())
    }

    pub fn state(&self) -> CBPeripheralState {
        unsafe { self.peripheral.state() }
    }

    /// Starts service discovery. `None` discovers every service.
    pub fn discover_services(&self, services: Option<&[BluetoothUuid]>) {
        let services = services.map(to_cbuuids);
        unsafe { self.peripheral.discoverServices(services.as_deref()) };
    }

    /// The discovered services, or `None` before discovery has completed.
    pub fn services(&self) -> Option<Vec<Service>> {
        let services = unsafe { self.peripheral.services() };
        services.map(|x| x.iter().map(Service::new).collect())
    }

    /// Starts characteristic discovery on `service`. `None` discovers every characteristic.
    pub fn discover_characteristics(
        &self,
        service: &Service,
        characteristics: Option<&[BluetoothUuid]>,
    ) {
        let characteristics = characteristics.map(to_cbuuids);
        unsafe {
            self.peripheral
                .discoverCharacteristics_forService(characteristics.as_deref(), &service.service)
        };
    }

    pub fn read_characteristic_value(&self, characteristic: &Characteristic) {
        unsafe {
            self.peripheral
                .readValueForCharacteristic(&characteristic.characteristic)
        };
    }

    pub fn write_characteristic_value(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: CharacteristicWriteType,
    ) {
        let data = NSData::with_bytes(data);
        let write_type = match write_type {
            CharacteristicWriteType::WithResponse => CBCharacteristicWriteType::WithResponse,
            CharacteristicWriteType::WithoutResponse => CBCharacteristicWriteType::WithoutResponse,
        };

        unsafe {
            self.peripheral.writeValue_forCharacteristic_type(
                &data,
                &characteristic.characteristic,
                write_type,
            );
        }
    }

    /// Subscribes to or unsubscribes from notifications and indications of `characteristic`.
    pub fn set_notify(&self, characteristic: &Characteristic, notify: bool) {
        unsafe {
            self.peripheral
                .setNotifyValue_forCharacteristic(notify, &characteristic.characteristic);
        }
    }
}

/// Events for a [`Peripheral`]. Every method has an empty default.
#[allow(unused_variables)]
pub trait PeripheralDelegate: Any {
    fn did_update_name(&self, peripheral: Peripheral) {}

    fn did_modify_services(&self, peripheral: Peripheral, invalidated_services: Vec<Service>) {}

    fn did_discover_services(&self, peripheral: Peripheral, result: Result<()>) {}

    fn did_discover_characteristics(
        &self,
        peripheral: Peripheral,
        service: Service,
        result: Result<()>,
    ) {
    }

    fn did_update_value_for_characteristic(
        &self,
        peripheral: Peripheral,
        characteristic: Characteristic,
        result: Result<()>,
    ) {
    }

    fn did_write_value_for_characteristic(
        &self,
        peripheral: Peripheral,
        characteristic: Characteristic,
        result: Result<()>,
    ) {
    }

    fn did_update_notification_state_for_characteristic(
        &self,
        peripheral: Peripheral,
        characteristic: Characteristic,
        result: Result<()>,
    ) {
    }
}

struct PeripheralDelegateIvars {
    delegate: Box<dyn PeripheralDelegate>,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[ivars = PeripheralDelegateIvars]
    struct PeripheralDelegateBridge;

    unsafe impl NSObjectProtocol for PeripheralDelegateBridge {}

    #[allow(non_snake_case)]
    unsafe impl CBPeripheralDelegate for PeripheralDelegateBridge {
        #[unsafe(method(peripheralDidUpdateName:))]
        unsafe fn peripheralDidUpdateName(&self, peripheral: &CBPeripheral) {
            self.ivars()
                .delegate
                .did_update_name(Peripheral::new(peripheral.retain()));
        }

        #[unsafe(method(peripheral:didModifyServices:))]
        unsafe fn peripheral_didModifyServices(
            &self,
            peripheral: &CBPeripheral,
            invalidated_services: &NSArray<CBService>,
        ) {
            let invalidated_services = invalidated_services.iter().map(Service::new).collect();
            self.ivars()
                .delegate
                .did_modify_services(Peripheral::new(peripheral.retain()), invalidated_services);
        }

        #[unsafe(method(peripheral:didDiscoverServices:))]
        unsafe fn peripheral_didDiscoverServices(
            &self,
            peripheral: &CBPeripheral,
            error: Option<&NSError>,
        ) {
            self.ivars()
                .delegate
                .did_discover_services(Peripheral::new(peripheral.retain()), or_err((), error));
        }

        #[unsafe(method(peripheral:didDiscoverCharacteristicsForService:error:))]
        unsafe fn peripheral_didDiscoverCharacteristicsForService_error(
            &self,
            peripheral: &CBPeripheral,
            service: &CBService,
            error: Option<&NSError>,
        ) {
            self.ivars().delegate.did_discover_characteristics(
                Peripheral::new(peripheral.retain()),
                Service::new(service.retain()),
                or_err((), error),
            );
        }

        #[unsafe(method(peripheral:didUpdateValueForCharacteristic:error:))]
        unsafe fn peripheral_didUpdateValueForCharacteristic_error(
            &self,
            peripheral: &CBPeripheral,
            characteristic: &CBCharacteristic,
            error: Option<&NSError>,
        ) {
            self.ivars().delegate.did_update_value_for_characteristic(
                Peripheral::new(peripheral.retain()),
                Characteristic::new(characteristic.retain()),
                or_err((), error),
            );
        }

        #[unsafe(method(peripheral:didWriteValueForCharacteristic:error:))]
        unsafe fn peripheral_didWriteValueForCharacteristic_error(
            &self,
            peripheral: &CBPeripheral,
            characteristic: &CBCharacteristic,
            error: Option<&NSError>,
        ) {
            self.ivars().delegate.did_write_value_for_characteristic(
                Peripheral::new(peripheral.retain()),
                Characteristic::new(characteristic.retain()),
                or_err((), error),
            );
        }

        #[unsafe(method(peripheral:didUpdateNotificationStateForCharacteristic:error:))]
        unsafe fn peripheral_didUpdateNotificationStateForCharacteristic_error(
            &self,
            peripheral: &CBPeripheral,
            characteristic: &CBCharacteristic,
            error: Option<&NSError>,
        ) {
            self.ivars()
                .delegate
                .did_update_notification_state_for_characteristic(
                    Peripheral::new(peripheral.retain()),
                    Characteristic::new(characteristic.retain()),
                    or_err((), error),
                );
        }
    }
);

impl PeripheralDelegateBridge {
    fn new(delegate: Box<dyn PeripheralDelegate>) -> Retained<Self> {
        let ivars = PeripheralDelegateIvars { delegate };
        let this = PeripheralDelegateBridge::alloc().set_ivars(ivars);
        unsafe { msg_send![super(this), init] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CharacteristicWriteType {
    WithResponse,
    WithoutResponse,
}
