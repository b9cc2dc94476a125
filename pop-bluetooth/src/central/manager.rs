use std::any::Any;
use std::cell::{RefCell, RefMut};

use corebluetooth_bridge::advertisement_data::AdvertisementData;
use corebluetooth_bridge::dispatch::{DispatchQoS, QueueContext};
use corebluetooth_bridge::{CentralManager, CentralManagerDelegate, Peripheral};
use objc2::MainThreadMarker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::handler::{PeripheralHandle, PeripheralHandler, sighting};
use crate::config::ManagerConfig;
use crate::device::{BluetoothDevice, DeviceSet, Sighting};
use crate::error::Error;
use crate::published::{Published, Subscription};
use crate::registry::ConnectionRegistry;
use crate::state::ManagerState;

/// A peripheral seen while scanning, offered to the application.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub peripheral: Peripheral,
    pub advertisement_data: AdvertisementData,
    /// Signal strength of the advertisement, in dBm.
    pub rssi: i16,
}

type DiscoveryCallback = Box<dyn Fn(&Discovery) -> Option<Box<dyn PeripheralHandler>>>;

/// A discovery callback that never connects.
pub fn default_handler(_discovery: &Discovery) -> Option<Box<dyn PeripheralHandler>> {
    None
}

/// The central role.
///
/// Scans as soon as Bluetooth is powered on, keeps a record of every peripheral it sees and
/// connects to the ones the discovery callback returns a [`PeripheralHandler`] for.
#[derive(Debug, Clone)]
pub struct BluetoothManager {
    central: CentralManager,
}

impl BluetoothManager {
    /// Creates a manager delivering its events on the main queue.
    pub fn main_thread(
        config: ManagerConfig,
        on_discover: impl Fn(&Discovery) -> Option<Box<dyn PeripheralHandler>> + 'static,
        mtm: MainThreadMarker,
    ) -> Self {
        let show_power_alert = config.show_power_alert;
        let delegate = ManagerDelegate::new(config, Box::new(on_discover));
        let central = CentralManager::main_thread(Box::new(delegate), show_power_alert, mtm);
        Self { central }
    }

    /// Creates a manager on a private serial queue.
    ///
    /// `entry` runs on the queue with the new manager. Every event is delivered on the same
    /// queue, so the manager should only be used from there; its published values can be
    /// observed from anywhere.
    ///
    /// CoreBluetooth stops delivering events once the manager is dropped. To keep it beyond
    /// `entry`, bind it to the queue:
    ///
    /// ```no_run
    /// # use pop_bluetooth::central::default_handler;
    /// # use pop_bluetooth::{BluetoothManager, DispatchQoS, ManagerConfig};
    /// let (manager, devices) = BluetoothManager::background(
    ///     DispatchQoS::default(),
    ///     ManagerConfig::default(),
    ///     default_handler,
    ///     |manager, queue| {
    ///         let devices = manager.device_updates();
    ///         (queue.bind(manager), devices)
    ///     },
    /// );
    /// let scanning = manager.with(|manager| manager.is_scanning());
    /// ```
    pub fn background<R: Send>(
        qos: DispatchQoS,
        config: ManagerConfig,
        on_discover: impl Fn(&Discovery) -> Option<Box<dyn PeripheralHandler>> + Send + 'static,
        entry: impl FnOnce(Self, &QueueContext) -> R + Send,
    ) -> R {
        let show_power_alert = config.show_power_alert;
        CentralManager::background(
            qos,
            move || Box::new(ManagerDelegate::new(config, Box::new(on_discover))),
            show_power_alert,
            |central, context| entry(Self { central }, context),
        )
    }

    fn delegate(&self) -> &ManagerDelegate {
        let delegate: &dyn Any = self.central.delegate();
        delegate
            .downcast_ref()
            .expect("central manager delegate is a ManagerDelegate")
    }

    pub fn central(&self) -> &CentralManager {
        &self.central
    }

    pub fn state(&self) -> ManagerState {
        self.delegate().state.get()
    }

    pub fn state_updates(&self) -> Subscription<ManagerState> {
        self.delegate().state.subscribe()
    }

    pub fn is_scanning(&self) -> bool {
        self.delegate().is_scanning.get()
    }

    pub fn scanning_updates(&self) -> Subscription<bool> {
        self.delegate().is_scanning.subscribe()
    }

    /// Every peripheral seen so far, ordered by name.
    pub fn devices(&self) -> Vec<BluetoothDevice> {
        self.delegate().devices.with(DeviceSet::sorted)
    }

    pub fn device_updates(&self) -> Subscription<DeviceSet> {
        self.delegate().devices.subscribe()
    }

    /// Starts scanning with the configured options. Does nothing unless powered on.
    pub fn start_scan(&self) {
        self.delegate().scan(&self.central);
    }

    pub fn stop_scan(&self) {
        self.central.stop_scan();
        self.delegate().is_scanning.set(false);
    }

    /// Cancels the connection to a peripheral the manager connected to. Returns `false` if
    /// there is no such peripheral.
    pub fn disconnect(&self, id: &Uuid) -> bool {
        match self.handler(id) {
            Some(handle) => {
                self.central.cancel_peripheral_connection(handle.peripheral());
                true
            }
            None => false,
        }
    }

    /// The handle of a peripheral the manager is connecting or connected to.
    pub fn handler(&self, id: &Uuid) -> Option<PeripheralHandle> {
        self.delegate().registry().get(id).cloned()
    }

    pub fn handlers(&self) -> Vec<PeripheralHandle> {
        self.delegate().registry().values().cloned().collect()
    }
}

struct ManagerDelegate {
    config: ManagerConfig,
    on_discover: DiscoveryCallback,
    state: Published<ManagerState>,
    is_scanning: Published<bool>,
    devices: Published<DeviceSet>,
    registry: RefCell<ConnectionRegistry<PeripheralHandle>>,
}

impl ManagerDelegate {
    fn new(config: ManagerConfig, on_discover: DiscoveryCallback) -> Self {
        Self {
            config,
            on_discover,
            state: Published::default(),
            is_scanning: Published::new(false),
            devices: Published::default(),
            registry: RefCell::new(ConnectionRegistry::new()),
        }
    }

    fn registry(&self) -> RefMut<'_, ConnectionRegistry<PeripheralHandle>> {
        self.registry.borrow_mut()
    }

    fn scan(&self, central: &CentralManager) {
        if !ManagerState::from(central.state()).is_powered_on() {
            debug!("not scanning until powered on");
            return;
        }

        info!(services = ?self.config.required_services, "starting scan");
        central.scan(
            self.config.required_services.as_deref(),
            self.config.allow_duplicates,
        );
        self.is_scanning.set(central.is_scanning());
    }

    fn observe(&self, sighting: Sighting) {
        let id = sighting.id;
        let show_unnamed = self.config.show_unnamed_devices;
        if self
            .devices
            .update(|devices| devices.observe(sighting, show_unnamed))
        {
            debug!(%id, "new device");
        }
    }

    /// Takes a peripheral's handler out of the registry after its connection ended.
    fn connection_ended(&self, peripheral: &Peripheral, error: Option<Error>) {
        self.observe(sighting(peripheral));

        let handle = self.registry().remove(&peripheral.identifier());
        if let (Some(handle), Some(error)) = (handle, error) {
            handle.report_error(error);
        }
    }
}

impl CentralManagerDelegate for ManagerDelegate {
    fn did_update_state(&self, central: CentralManager) {
        let state = ManagerState::from(central.state());
        info!(%state, "central manager state changed");
        self.state.set(state);
        self.is_scanning.set(central.is_scanning());

        if !state.is_powered_on() {
            let dropped = self.registry().clear();
            if !dropped.is_empty() {
                info!(count = dropped.len(), "dropping peripheral handlers");
            }
            return;
        }

        if self.config.scan_on_power_on {
            self.scan(&central);
        }
    }

    fn did_discover(
        &self,
        central: CentralManager,
        peripheral: Peripheral,
        advertisement_data: AdvertisementData,
        rssi: i16,
    ) {
        let id = peripheral.identifier();
        self.observe(Sighting {
            advertised_name: advertisement_data.local_name.clone(),
            rssi: Some(rssi),
            ..sighting(&peripheral)
        });

        if !self.registry().should_offer(&id) {
            return;
        }

        let discovery = Discovery {
            peripheral,
            advertisement_data,
            rssi,
        };
        let Some(handler) = (self.on_discover)(&discovery) else {
            return;
        };

        let mut peripheral = discovery.peripheral;
        let handle = PeripheralHandle::attach(&mut peripheral, handler);
        info!(%id, name = %handle.name(), "connecting");
        self.registry().insert(id, handle);
        central.connect(&peripheral);
    }

    fn did_connect(&self, _central: CentralManager, peripheral: Peripheral) {
        let id = peripheral.identifier();
        self.observe(sighting(&peripheral));

        let handle = self.registry().get(&id).cloned();
        match handle {
            Some(handle) => {
                info!(%id, name = %handle.name(), "connected");
                handle.on_connected();
            }
            None => warn!(%id, "connected to a peripheral without a handler"),
        }
    }

    fn did_fail_to_connect(
        &self,
        _central: CentralManager,
        peripheral: Peripheral,
        error: corebluetooth_bridge::Error,
    ) {
        warn!(id = %peripheral.identifier(), %error, "failed to connect");
        self.connection_ended(&peripheral, Some(error.into()));
    }

    fn did_disconnect(
        &self,
        _central: CentralManager,
        peripheral: Peripheral,
        error: Option<corebluetooth_bridge::Error>,
    ) {
        info!(id = %peripheral.identifier(), "disconnected");
        self.connection_ended(&peripheral, error.map(Error::from));
    }
}
