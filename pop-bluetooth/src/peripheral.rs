//! The peripheral role: hosting services and talking to remote centrals.

use std::any::Any;
use std::cell::{Ref, RefCell};

use btuuid::BluetoothUuid;
use corebluetooth_bridge::advertisement_data::Advertisement;
use corebluetooth_bridge::dispatch::{DispatchQoS, QueueContext};
use corebluetooth_bridge::{
    AttRequest, CBATTError, Central, Characteristic, MutableService, PeripheralManager,
    PeripheralManagerDelegate, Service,
};
use objc2::MainThreadMarker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PeripheralConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::lookup::{find_hosted, find_peer, unique_peers};
use crate::published::{Published, Subscription};
use crate::state::ManagerState;
use crate::write::{ReadError, ValueCache, WriteMeta, forward_writes};

type ServiceFactory = Box<dyn Fn() -> Vec<MutableService>>;
type WriteCallback = Box<dyn Fn(WriteMeta)>;

/// The peripheral role.
///
/// Whenever Bluetooth is powered on, the services returned by `create_services` are hosted
/// and advertised under the configured name. Writes from remote centrals are handed to
/// `on_write`; values are pushed to subscribed centrals with [`set_value`](Self::set_value).
#[derive(Debug, Clone)]
pub struct BluetoothPeripheral {
    manager: PeripheralManager,
}

impl BluetoothPeripheral {
    /// Creates a peripheral delivering its events on the main queue.
    ///
    /// Fails with [`ErrorKind::Unsupported`] on tvOS, which has no peripheral role.
    pub fn main_thread(
        config: PeripheralConfig,
        create_services: impl Fn() -> Vec<MutableService> + 'static,
        on_write: impl Fn(WriteMeta) + 'static,
        mtm: MainThreadMarker,
    ) -> Result<Self> {
        check_supported()?;

        let show_power_alert = config.show_power_alert;
        let delegate = RoleDelegate::new(config, Box::new(create_services), Box::new(on_write));
        let manager = PeripheralManager::main_thread(Box::new(delegate), show_power_alert, mtm);
        Ok(Self { manager })
    }

    /// Creates a peripheral on a private serial queue. See
    /// [`BluetoothManager::background`](crate::BluetoothManager::background); the peripheral
    /// stops once it is dropped, so bind it to the queue with [`QueueContext::bind`] to keep it.
    pub fn background<R: Send>(
        qos: DispatchQoS,
        config: PeripheralConfig,
        create_services: impl Fn() -> Vec<MutableService> + Send + 'static,
        on_write: impl Fn(WriteMeta) + Send + 'static,
        entry: impl FnOnce(Self, &QueueContext) -> R + Send,
    ) -> Result<R> {
        check_supported()?;

        let show_power_alert = config.show_power_alert;
        Ok(PeripheralManager::background(
            qos,
            move || {
                Box::new(RoleDelegate::new(
                    config,
                    Box::new(create_services),
                    Box::new(on_write),
                ))
            },
            show_power_alert,
            |manager, context| entry(Self { manager }, context),
        ))
    }

    fn delegate(&self) -> &RoleDelegate {
        let delegate: &dyn Any = self.manager.delegate();
        delegate
            .downcast_ref()
            .expect("peripheral manager delegate is a RoleDelegate")
    }

    pub fn manager(&self) -> &PeripheralManager {
        &self.manager
    }

    pub fn state(&self) -> ManagerState {
        self.delegate().state.get()
    }

    pub fn state_updates(&self) -> Subscription<ManagerState> {
        self.delegate().state.subscribe()
    }

    pub fn is_advertising(&self) -> bool {
        self.delegate().is_advertising.get()
    }

    pub fn advertising_updates(&self) -> Subscription<bool> {
        self.delegate().is_advertising.subscribe()
    }

    /// Identifiers of the hosted services.
    pub fn services(&self) -> Vec<BluetoothUuid> {
        self.delegate().services.get()
    }

    /// Identifiers of the hosted services while advertising.
    pub fn advertising_services(&self) -> Option<Vec<BluetoothUuid>> {
        self.is_advertising().then(|| self.services())
    }

    pub fn errors(&self) -> Vec<Error> {
        self.delegate().errors.get()
    }

    pub fn error_updates(&self) -> Subscription<Vec<Error>> {
        self.delegate().errors.subscribe()
    }

    /// Every error reported so far, one per line.
    pub fn error(&self) -> Option<String> {
        self.delegate().errors.with(|errors| join_errors(errors))
    }

    /// Centrals subscribed to at least one hosted characteristic.
    pub fn peers(&self) -> Vec<Uuid> {
        self.delegate().peers.get()
    }

    pub fn peer_updates(&self) -> Subscription<Vec<Uuid>> {
        self.delegate().peers.subscribe()
    }

    /// Sends `value` to the centrals subscribed to a hosted characteristic, or only to `peer`.
    ///
    /// The value is also returned to centrals reading the characteristic. Returns `false` if the
    /// transmit queue is full and the update was dropped.
    pub fn set_value(
        &self,
        service: &BluetoothUuid,
        characteristic: &BluetoothUuid,
        value: &[u8],
        peer: Option<&Uuid>,
    ) -> Result<bool> {
        let delegate = self.delegate();
        let target = find_hosted(delegate.hosted().iter(), service, characteristic)?;
        let centrals = find_peer(target.subscribed_centrals(), peer)?.map(|central| vec![central]);

        delegate.values.borrow_mut().set(service, characteristic, value);
        let queued = self
            .manager
            .update_value(value, &target, centrals.as_deref());
        if !queued {
            debug!(characteristic = ?characteristic, "transmit queue full");
        }
        Ok(queued)
    }

    /// Advertises the hosted services. Does nothing unless powered on.
    pub fn start_advertising(&self) {
        self.delegate().advertise(&self.manager);
    }

    pub fn stop_advertising(&self) {
        self.manager.stop_advertising();
        self.delegate().is_advertising.set(false);
    }
}

fn check_supported() -> Result<()> {
    if cfg!(target_os = "tvos") {
        return Err(Error::new(
            ErrorKind::Unsupported,
            "the peripheral role is not available on tvOS",
        ));
    }
    Ok(())
}

fn join_errors(errors: &[Error]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }

    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    Some(messages.join("\n"))
}

struct RoleDelegate {
    config: PeripheralConfig,
    create_services: ServiceFactory,
    on_write: WriteCallback,
    state: Published<ManagerState>,
    is_advertising: Published<bool>,
    services: Published<Vec<BluetoothUuid>>,
    errors: Published<Vec<Error>>,
    peers: Published<Vec<Uuid>>,
    hosted: RefCell<Vec<MutableService>>,
    values: RefCell<ValueCache>,
}

impl RoleDelegate {
    fn new(
        config: PeripheralConfig,
        create_services: ServiceFactory,
        on_write: WriteCallback,
    ) -> Self {
        Self {
            config,
            create_services,
            on_write,
            state: Published::default(),
            is_advertising: Published::new(false),
            services: Published::default(),
            errors: Published::default(),
            peers: Published::default(),
            hosted: RefCell::new(Vec::new()),
            values: RefCell::new(ValueCache::new()),
        }
    }

    fn hosted(&self) -> Ref<'_, Vec<MutableService>> {
        self.hosted.borrow()
    }

    fn push_error(&self, error: Error) {
        warn!(%error, "peripheral manager error");
        self.errors.update(|errors| errors.push(error));
    }

    /// Replaces the hosted services with freshly created ones and advertises them.
    fn host(&self, manager: &PeripheralManager) {
        manager.remove_all_services();

        let services = (self.create_services)();
        for service in &services {
            manager.add_service(service);
        }

        let uuids: Vec<_> = services.iter().map(MutableService::uuid).collect();
        info!(services = ?uuids, "hosting services");
        *self.hosted.borrow_mut() = services;
        self.services.set(uuids);
        self.refresh_peers(None);

        self.advertise(manager);
    }

    fn advertise(&self, manager: &PeripheralManager) {
        if !ManagerState::from(manager.state()).is_powered_on() {
            debug!("not advertising until powered on");
            return;
        }

        let advertisement = Advertisement {
            local_name: Some(self.config.advertised_name.clone()),
            service_uuids: self.services.get(),
        };
        manager.start_advertising(&advertisement);
    }

    /// Publishes the centrals subscribed to any hosted characteristic, plus `subscriber`, which
    /// may not be listed by CoreBluetooth yet.
    fn refresh_peers(&self, subscriber: Option<Central>) {
        let subscribed: Vec<Central> = self
            .hosted()
            .iter()
            .flat_map(MutableService::characteristics)
            .flat_map(|characteristic| characteristic.subscribed_centrals())
            .chain(subscriber)
            .collect();
        self.peers.set(unique_peers(subscribed));
    }

    fn respond_to_read(&self, manager: &PeripheralManager, request: &AttRequest) {
        let characteristic = request.characteristic();
        let Some(service) = characteristic.service() else {
            debug!(characteristic = ?characteristic.uuid(), "read of a released service");
            manager.respond_to_request(request, CBATTError::AttributeNotFound);
            return;
        };

        let values = self.values.borrow();
        let read = values.read(&service.uuid(), &characteristic.uuid(), request.offset());
        let result = match read {
            Ok(value) => {
                request.set_value(value);
                CBATTError::Success
            }
            Err(ReadError::NoValue) => CBATTError::AttributeNotFound,
            Err(ReadError::InvalidOffset) => CBATTError::InvalidOffset,
        };
        manager.respond_to_request(request, result);
    }
}

impl PeripheralManagerDelegate for RoleDelegate {
    fn did_update_state(&self, manager: PeripheralManager) {
        let state = ManagerState::from(manager.state());
        info!(%state, "peripheral manager state changed");
        self.state.set(state);
        self.is_advertising.set(manager.is_advertising());

        if state.is_powered_on() {
            self.host(&manager);
        }
    }

    fn did_start_advertising(
        &self,
        manager: PeripheralManager,
        result: corebluetooth_bridge::Result<()>,
    ) {
        self.is_advertising.set(manager.is_advertising());
        match result {
            Ok(()) => info!(name = %self.config.advertised_name, "advertising"),
            Err(err) => self.push_error(err.into()),
        }
    }

    fn did_add_service(
        &self,
        _manager: PeripheralManager,
        service: Service,
        result: corebluetooth_bridge::Result<()>,
    ) {
        match result {
            Ok(()) => debug!(service = ?service.uuid(), "added service"),
            Err(err) => self.push_error(err.into()),
        }
    }

    fn central_did_subscribe(
        &self,
        _manager: PeripheralManager,
        central: Central,
        characteristic: Characteristic,
    ) {
        info!(
            peer = %central.identifier(),
            characteristic = ?characteristic.uuid(),
            "central subscribed"
        );
        self.refresh_peers(Some(central));
    }

    fn central_did_unsubscribe(
        &self,
        _manager: PeripheralManager,
        central: Central,
        characteristic: Characteristic,
    ) {
        info!(
            peer = %central.identifier(),
            characteristic = ?characteristic.uuid(),
            "central unsubscribed"
        );
        self.refresh_peers(None);
    }

    fn did_receive_read_request(&self, manager: PeripheralManager, request: AttRequest) {
        self.respond_to_read(&manager, &request);
    }

    fn did_receive_write_requests(&self, manager: PeripheralManager, requests: Vec<AttRequest>) {
        let respond_to = forward_writes(&requests, self.config.respond_to_writes, |request| {
            let write = WriteMeta {
                peer: request.central().identifier(),
                characteristic: request.characteristic().uuid(),
                data: request.value().unwrap_or_default(),
            };
            debug!(
                peer = %write.peer,
                characteristic = ?write.characteristic,
                len = write.data.len(),
                "write request"
            );
            (self.on_write)(write);
        });

        if let Some(request) = respond_to {
            manager.respond_to_request(request, CBATTError::Success);
        }
    }

    fn is_ready_to_update_subscribers(&self, _manager: PeripheralManager) {
        debug!("ready to update subscribers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_errors_no_message() {
        assert_eq!(join_errors(&[]), None);
    }

    #[test]
    fn errors_joined_by_line() {
        let errors = [
            Error::new(ErrorKind::Att(3), "write not permitted"),
            Error::from(ErrorKind::Unsupported),
        ];
        assert_eq!(
            join_errors(&errors).as_deref(),
            Some("write not permitted\nunsupported")
        );
    }
}
