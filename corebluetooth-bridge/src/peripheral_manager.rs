//! The peripheral manager, the application's interface to the peripheral role.

use std::any::Any;

use dispatch2::DispatchQueue;
use objc2::rc::{Retained, RetainedFromIterator};
use objc2::runtime::{AnyObject, ProtocolObject};
use objc2::{AnyThread, DefinedClass, MainThreadMarker, Message, define_class, msg_send};
use objc2_core_bluetooth::{
    CBATTError, CBATTRequest, CBCentral, CBCharacteristic, CBManagerState, CBPeripheralManager,
    CBPeripheralManagerDelegate, CBPeripheralManagerOptionShowPowerAlertKey, CBService,
};
use objc2_foundation::{
    NSArray, NSData, NSError, NSMutableDictionary, NSNumber, NSObject, NSObjectProtocol, NSString,
};

use crate::advertisement_data::Advertisement;
use crate::att_request::AttRequest;
use crate::central::Central;
use crate::characteristic::Characteristic;
use crate::dispatch::{DispatchQoS, QueueContext, on_serial_queue};
use crate::error::{Result, or_err};
use crate::mutable::{MutableCharacteristic, MutableService};
use crate::service::Service;

/// An object that publishes services and advertises them to remote centrals.
#[derive(Clone)]
pub struct PeripheralManager {
    manager: Retained<CBPeripheralManager>,
    delegate: Retained<PeripheralManagerDelegateBridge>,
}

impl std::fmt::Debug for PeripheralManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeripheralManager")
            .field("manager", &self.manager)
            .finish()
    }
}

impl PartialEq for PeripheralManager {
    fn eq(&self, other: &Self) -> bool {
        self.manager == other.manager
    }
}

impl Eq for PeripheralManager {}

impl PeripheralManager {
    /// Creates a new peripheral manager on a background dispatch queue.
    ///
    /// Works like [`CentralManager::background`](crate::CentralManager::background).
    pub fn background<R: Send>(
        qos: DispatchQoS,
        delegate: impl FnOnce() -> Box<dyn PeripheralManagerDelegate> + Send,
        show_power_alert: bool,
        entry: impl FnOnce(Self, &QueueContext) -> R + Send,
    ) -> R {
        on_serial_queue("bluetooth.peripheral", qos, move |context| {
            let manager = Self::init(context.queue(), delegate(), show_power_alert);
            entry(manager, context)
        })
    }

    /// Creates a new peripheral manager delivering its events on the main queue.
    pub fn main_thread(
        delegate: Box<dyn PeripheralManagerDelegate>,
        show_power_alert: bool,
        _mtm: MainThreadMarker,
    ) -> Self {
        Self::init(DispatchQueue::main(), delegate, show_power_alert)
    }

    fn new(manager: Retained<CBPeripheralManager>) -> Self {
        let delegate = unsafe { manager.delegate() }
            .and_then(|delegate| delegate.downcast().ok())
            .expect("peripheral manager delegate is a PeripheralManagerDelegateBridge");

        PeripheralManager { manager, delegate }
    }

    fn init(
        queue: &DispatchQueue,
        delegate: Box<dyn PeripheralManagerDelegate>,
        show_power_alert: bool,
    ) -> Self {
        let delegate = PeripheralManagerDelegateBridge::new(delegate);

        let options: Retained<NSMutableDictionary<NSString, AnyObject>> =
            NSMutableDictionary::from_retained_objects(
                &[unsafe { CBPeripheralManagerOptionShowPowerAlertKey }],
                &[NSNumber::new_bool(show_power_alert).into()],
            );

        let manager = unsafe {
            CBPeripheralManager::initWithDelegate_queue_options(
                CBPeripheralManager::alloc(),
                Some(ProtocolObject::from_ref(&*delegate)),
                Some(queue),
                Some(&options),
            )
        };

        Self { manager, delegate }
    }

    pub fn delegate(&self) -> &dyn PeripheralManagerDelegate {
        &*self.delegate.ivars().delegate
    }

    pub fn state(&self) -> CBManagerState {
        unsafe { self.manager.state() }
    }

    pub fn is_advertising(&self) -> bool {
        unsafe { self.manager.isAdvertising() }
    }

    /// Publishes `service` and its characteristics to the local GATT database.
    ///
    /// Completion is reported by [`PeripheralManagerDelegate::did_add_service`].
    pub fn add_service(&self, service: &MutableService) {
        unsafe { self.manager.addService(&service.service) };
    }

    pub fn remove_service(&self, service: &MutableService) {
        unsafe { self.manager.removeService(&service.service) };
    }

    pub fn remove_all_services(&self) {
        unsafe { self.manager.removeAllServices() };
    }

    /// See [`-[CBPeripheralManager startAdvertising:]`](https://developer.apple.com/documentation/corebluetooth/cbperipheralmanager/startadvertising(_:)).
    pub fn start_advertising(&self, advertisement: &Advertisement) {
        let data = advertisement.to_dictionary();
        unsafe { self.manager.startAdvertising(Some(&data)) };
    }

    pub fn stop_advertising(&self) {
        unsafe { self.manager.stopAdvertising() };
    }

    /// Sends a notification or indication of `value` to `centrals`, or to every subscribed
    /// central when `centrals` is `None`.
    ///
    /// Returns `false` if the transmit queue is full. The update is then dropped and may be
    /// retried after [`PeripheralManagerDelegate::is_ready_to_update_subscribers`].
    pub fn update_value(
        &self,
        value: &[u8],
        characteristic: &MutableCharacteristic,
        centrals: Option<&[Central]>,
    ) -> bool {
        let value = NSData::with_bytes(value);
        let centrals = centrals.map(|centrals| {
            NSArray::retained_from_iter(centrals.iter().map(|c| c.central.clone()))
        });

        unsafe {
            self.manager.updateValue_forCharacteristic_onSubscribedCentrals(
                &value,
                &characteristic.characteristic,
                centrals.as_deref(),
            )
        }
    }

    /// Responds to a read or write request. Each batch of write requests takes one response,
    /// given with the batch's first request.
    pub fn respond_to_request(&self, request: &AttRequest, result: CBATTError) {
        unsafe {
            self.manager
                .respondToRequest_withResult(&request.request, result)
        };
    }
}

/// Events for a [`PeripheralManager`].
#[allow(unused_variables)]
pub trait PeripheralManagerDelegate: Any {
    fn did_update_state(&self, manager: PeripheralManager);

    fn did_start_advertising(&self, manager: PeripheralManager, result: Result<()>) {}

    fn did_add_service(&self, manager: PeripheralManager, service: Service, result: Result<()>) {}

    fn central_did_subscribe(
        &self,
        manager: PeripheralManager,
        central: Central,
        characteristic: Characteristic,
    ) {
    }

    fn central_did_unsubscribe(
        &self,
        manager: PeripheralManager,
        central: Central,
        characteristic: Characteristic,
    ) {
    }

    /// Every read request must be answered with
    /// [`respond_to_request`](PeripheralManager::respond_to_request).
    fn did_receive_read_request(&self, manager: PeripheralManager, request: AttRequest) {}

    fn did_receive_write_requests(&self, manager: PeripheralManager, requests: Vec<AttRequest>) {}

    fn is_ready_to_update_subscribers(&self, manager: PeripheralManager) {}
}

struct PeripheralManagerDelegateIvars {
    delegate: Box<dyn PeripheralManagerDelegate>,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[ivars = PeripheralManagerDelegateIvars]
    struct PeripheralManagerDelegateBridge;

    unsafe impl NSObjectProtocol for PeripheralManagerDelegateBridge {}

    #[allow(non_snake_case)]
    unsafe impl CBPeripheralManagerDelegate for PeripheralManagerDelegateBridge {
        #[unsafe(method(peripheralManagerDidUpdateState:))]
        fn peripheralManagerDidUpdateState(&self, peripheral: &CBPeripheralManager) {
            self.ivars()
                .delegate
                .did_update_state(PeripheralManager::new(peripheral.retain()));
        }

        #[unsafe(method(peripheralManagerDidStartAdvertising:error:))]
        fn peripheralManagerDidStartAdvertising_error(
            &self,
            peripheral: &CBPeripheralManager,
            error: Option<&NSError>,
        ) {
            self.ivars().delegate.did_start_advertising(
                PeripheralManager::new(peripheral.retain()),
                or_err((), error),
            );
        }

        #[unsafe(method(peripheralManager:didAddService:error:))]
        fn peripheralManager_didAddService_error(
            &self,
            peripheral: &CBPeripheralManager,
            service: &CBService,
            error: Option<&NSError>,
        ) {
            self.ivars().delegate.did_add_service(
                PeripheralManager::new(peripheral.retain()),
                Service::new(service.retain()),
                or_err((), error),
            );
        }

        #[unsafe(method(peripheralManager:central:didSubscribeToCharacteristic:))]
        fn peripheralManager_central_didSubscribeToCharacteristic(
            &self,
            peripheral: &CBPeripheralManager,
            central: &CBCentral,
            characteristic: &CBCharacteristic,
        ) {
            self.ivars().delegate.central_did_subscribe(
                PeripheralManager::new(peripheral.retain()),
                Central::new(central.retain()),
                Characteristic::new(characteristic.retain()),
            );
        }

        #[unsafe(method(peripheralManager:central:didUnsubscribeFromCharacteristic:))]
        fn peripheralManager_central_didUnsubscribeFromCharacteristic(
            &self,
            peripheral: &CBPeripheralManager,
            central: &CBCentral,
            characteristic: &CBCharacteristic,
        ) {
            self.ivars().delegate.central_did_unsubscribe(
                PeripheralManager::new(peripheral.retain()),
                Central::new(central.retain()),
                Characteristic::new(characteristic.retain()),
            );
        }

        #[unsafe(method(peripheralManager:didReceiveReadRequest:))]
        fn peripheralManager_didReceiveReadRequest(
            &self,
            peripheral: &CBPeripheralManager,
            request: &CBATTRequest,
        ) {
            self.ivars().delegate.did_receive_read_request(
                PeripheralManager::new(peripheral.retain()),
                AttRequest::new(request.retain()),
            );
        }

        #[unsafe(method(peripheralManager:didReceiveWriteRequests:))]
        fn peripheralManager_didReceiveWriteRequests(
            &self,
            peripheral: &CBPeripheralManager,
            requests: &NSArray<CBATTRequest>,
        ) {
            let requests = requests.iter().map(AttRequest::new).collect();
            self.ivars().delegate.did_receive_write_requests(
                PeripheralManager::new(peripheral.retain()),
                requests,
            );
        }

        #[unsafe(method(peripheralManagerIsReadyToUpdateSubscribers:))]
        fn peripheralManagerIsReadyToUpdateSubscribers(&self, peripheral: &CBPeripheralManager) {
            self.ivars()
                .delegate
                .is_ready_to_update_subscribers(PeripheralManager::new(peripheral.retain()));
        }
    }
);

impl PeripheralManagerDelegateBridge {
    fn new(delegate: Box<dyn PeripheralManagerDelegate>) -> Retained<Self> {
        let ivars = PeripheralManagerDelegateIvars { delegate };
        let this = PeripheralManagerDelegateBridge::alloc().set_ivars(ivars);
        unsafe { msg_send![super(this), init] }
    }
}
