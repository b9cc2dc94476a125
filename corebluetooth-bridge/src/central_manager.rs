//! The central manager, the application's interface to the central role.

use std::any::Any;

use btuuid::BluetoothUuid;
use dispatch2::DispatchQueue;
use objc2::rc::Retained;
use objc2::runtime::{AnyObject, ProtocolObject};
use objc2::{AnyThread, DefinedClass, MainThreadMarker, Message, define_class, msg_send};
use objc2_core_bluetooth::{
    CBCentralManager, CBCentralManagerDelegate, CBCentralManagerOptionShowPowerAlertKey,
    CBCentralManagerScanOptionAllowDuplicatesKey, CBError, CBManagerState, CBPeripheral,
};
use objc2_foundation::{
    NSDictionary, NSError, NSMutableDictionary, NSNumber, NSObject, NSObjectProtocol, NSString,
};

use crate::advertisement_data::AdvertisementData;
use crate::dispatch::{DispatchQoS, QueueContext, on_serial_queue};
use crate::error::{Error, ErrorKind};
use crate::peripheral::Peripheral;
use crate::util::to_cbuuids;

/// An object that scans for, discovers, connects to, and manages peripherals.
#[derive(Clone)]
pub struct CentralManager {
    central: Retained<CBCentralManager>,
    delegate: Retained<CentralManagerDelegateBridge>,
}

impl std::fmt::Debug for CentralManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CentralManager")
            .field("central", &self.central)
            .finish()
    }
}

impl PartialEq for CentralManager {
    fn eq(&self, other: &Self) -> bool {
        self.central == other.central
    }
}

impl Eq for CentralManager {}

impl CentralManager {
    /// Creates a new central manager on a background dispatch queue.
    ///
    /// `delegate` is created on the new queue and every delegate method is called on it. `entry`
    /// runs on the queue with the new manager and its result is returned. The manager and its
    /// delegate are released when the last reference goes away, so keep one with
    /// [`QueueContext::bind`] for as long as events should be delivered.
    pub fn background<R: Send>(
        qos: DispatchQoS,
        delegate: impl FnOnce() -> Box<dyn CentralManagerDelegate> + Send,
        show_power_alert: bool,
        entry: impl FnOnce(Self, &QueueContext) -> R + Send,
    ) -> R {
        on_serial_queue("bluetooth.central", qos, move |context| {
            let central = Self::init(context.queue(), delegate(), show_power_alert);
            entry(central, context)
        })
    }

    /// Creates a new central manager delivering its events on the main queue.
    pub fn main_thread(
        delegate: Box<dyn CentralManagerDelegate>,
        show_power_alert: bool,
        _mtm: MainThreadMarker,
    ) -> Self {
        Self::init(DispatchQueue::main(), delegate, show_power_alert)
    }

    fn new(central: Retained<CBCentralManager>) -> Self {
        let delegate = unsafe { central.delegate() }
            .and_then(|delegate| delegate.downcast().ok())
            .expect("central manager delegate is a CentralManagerDelegateBridge");

        CentralManager { central, delegate }
    }

    fn init(
        queue: &DispatchQueue,
        delegate: Box<dyn CentralManagerDelegate>,
        show_power_alert: bool,
    ) -> Self {
        let delegate = CentralManagerDelegateBridge::new(delegate);

        let options: Retained<NSMutableDictionary<NSString, AnyObject>> =
            NSMutableDictionary::from_retained_objects(
                &[unsafe { CBCentralManagerOptionShowPowerAlertKey }],
                &[NSNumber::new_bool(show_power_alert).into()],
            );

        let central = unsafe {
            CBCentralManager::initWithDelegate_queue_options(
                CBCentralManager::alloc(),
                Some(ProtocolObject::from_ref(&*delegate)),
                Some(queue),
                Some(&options),
            )
        };

        Self { central, delegate }
    }

    pub fn delegate(&self) -> &dyn CentralManagerDelegate {
        &*self.delegate.ivars().delegate
    }

    /// See [`-[CBManager state]`](https://developer.apple.com/documentation/corebluetooth/cbmanager/state).
    pub fn state(&self) -> CBManagerState {
        unsafe { self.central.state() }
    }

    pub fn is_scanning(&self) -> bool {
        unsafe { self.central.isScanning() }
    }

    /// Starts scanning for peripherals advertising any of `services`, or every peripheral when
    /// `services` is `None`.
    ///
    /// See [`-[CBCentralManager scanForPeripheralsWithServices:options:]`](https://developer.apple.com/documentation/corebluetooth/cbcentralmanager/scanforperipherals(withservices:options:)).
    pub fn scan(&self, services: Option<&[BluetoothUuid]>, allow_duplicates: bool) {
        let services = services.map(to_cbuuids);

        let options = NSMutableDictionary::<NSString, AnyObject>::new();
        if allow_duplicates {
            unsafe {
                options.setValue_forKey(
                    Some(&NSNumber::new_bool(true)),
                    CBCentralManagerScanOptionAllowDuplicatesKey,
                );
            }
        }

        unsafe {
            self.central
                .scanForPeripheralsWithServices_options(services.as_deref(), Some(&options));
        }
    }

    pub fn stop_scan(&self) {
        unsafe { self.central.stopScan() };
    }

    /// See [`-[CBCentralManager connectPeripheral:options:]`](https://developer.apple.com/documentation/corebluetooth/cbcentralmanager/connect(_:options:)).
    pub fn connect(&self, peripheral: &Peripheral) {
        unsafe {
            self.central
                .connectPeripheral_options(&peripheral.peripheral, None)
        }
    }

    /// Cancels an active or pending connection to a peripheral.
    pub fn cancel_peripheral_connection(&self, peripheral: &Peripheral) {
        unsafe {
            self.central
                .cancelPeripheralConnection(&peripheral.peripheral)
        };
    }
}

/// Events for a [`CentralManager`].
#[allow(unused_variables)]
pub trait CentralManagerDelegate: Any {
    fn did_update_state(&self, central: CentralManager);

    fn did_discover(
        &self,
        central: CentralManager,
        peripheral: Peripheral,
        advertisement_data: AdvertisementData,
        rssi: i16,
    ) {
    }

    fn did_connect(&self, central: CentralManager, peripheral: Peripheral) {}

    fn did_fail_to_connect(&self, central: CentralManager, peripheral: Peripheral, error: Error) {}

    fn did_disconnect(
        &self,
        central: CentralManager,
        peripheral: Peripheral,
        error: Option<Error>,
    ) {
    }
}

struct CentralManagerDelegateIvars {
    delegate: Box<dyn CentralManagerDelegate>,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[ivars = CentralManagerDelegateIvars]
    struct CentralManagerDelegateBridge;

    unsafe impl NSObjectProtocol for CentralManagerDelegateBridge {}

    #[allow(non_snake_case)]
    unsafe impl CBCentralManagerDelegate for CentralManagerDelegateBridge {
        #[unsafe(method(centralManagerDidUpdateState:))]
        fn centralManagerDidUpdateState(&self, central: &CBCentralManager) {
            self.ivars()
                .delegate
                .did_update_state(CentralManager::new(central.retain()));
        }

        #[unsafe(method(centralManager:didDiscoverPeripheral:advertisementData:RSSI:))]
        fn centralManager_didDiscoverPeripheral_advertisementData_RSSI(
            &self,
            central: &CBCentralManager,
            peripheral: &CBPeripheral,
            advertisement_data: &NSDictionary<NSString, AnyObject>,
            rssi: &NSNumber,
        ) {
            self.ivars().delegate.did_discover(
                CentralManager::new(central.retain()),
                Peripheral::new(peripheral.retain()),
                AdvertisementData::from_nsdictionary(advertisement_data),
                rssi.shortValue(),
            );
        }

        #[unsafe(method(centralManager:didConnectPeripheral:))]
        fn centralManager_didConnectPeripheral(
            &self,
            central: &CBCentralManager,
            peripheral: &CBPeripheral,
        ) {
            self.ivars().delegate.did_connect(
                CentralManager::new(central.retain()),
                Peripheral::new(peripheral.retain()),
            );
        }

        #[unsafe(method(centralManager:didFailToConnectPeripheral:error:))]
        fn centralManager_didFailToConnectPeripheral_error(
            &self,
            central: &CBCentralManager,
            peripheral: &CBPeripheral,
            error: Option<&NSError>,
        ) {
            let error =
                Error::from_nserror_or_kind(error, ErrorKind::Bluetooth(CBError::ConnectionFailed));

            self.ivars().delegate.did_fail_to_connect(
                CentralManager::new(central.retain()),
                Peripheral::new(peripheral.retain()),
                error,
            );
        }

        #[unsafe(method(centralManager:didDisconnectPeripheral:error:))]
        fn centralManager_didDisconnectPeripheral_error(
            &self,
            central: &CBCentralManager,
            peripheral: &CBPeripheral,
            error: Option<&NSError>,
        ) {
            self.ivars().delegate.did_disconnect(
                CentralManager::new(central.retain()),
                Peripheral::new(peripheral.retain()),
                error.map(Error::from_nserror),
            );
        }
    }
);

impl CentralManagerDelegateBridge {
    fn new(delegate: Box<dyn CentralManagerDelegate>) -> Retained<Self> {
        let ivars = CentralManagerDelegateIvars { delegate };
        let this = CentralManagerDelegateBridge::alloc().set_ivars(ivars);
        unsafe { msg_send![super(this), init] }
    }
}
