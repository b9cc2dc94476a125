use btuuid::BluetoothUuid;
use corebluetooth_bridge::{Characteristic, Peripheral, PeripheralDelegate, Service};
use tracing::debug;
use uuid::Uuid;

use crate::device::{Sighting, display_name};
use crate::error::{Error, Result};
use crate::published::{Notifier, Subscription};
use crate::state::PeripheralState;
use crate::status::{PeripheralStatus, deliver_value};

/// Application logic for one connected peripheral.
///
/// A [`BluetoothManager`](crate::BluetoothManager) discovers every service and characteristic
/// of a peripheral it connects to and calls the handler as they turn up. Errors returned by the
/// handler are published on the peripheral's [`PeripheralHandle`].
pub trait PeripheralHandler {
    /// Called once the characteristics of `service` have been discovered.
    ///
    /// This is the place to read values or subscribe to notifications with
    /// [`Peripheral::read_characteristic_value`] and [`Peripheral::set_notify`].
    fn on_characteristics_found(
        &self,
        peripheral: &Peripheral,
        service: &Service,
        characteristics: &[Characteristic],
    ) -> Result<()>;

    /// Called with every value read from or notified by the peripheral.
    fn on_characteristic_value_changed(
        &self,
        peripheral: &Peripheral,
        characteristic: BluetoothUuid,
        value: &[u8],
    ) -> Result<()>;
}

/// A connected (or connecting) peripheral together with its observable status.
///
/// Identity, name and services are read live from CoreBluetooth; subscribe to
/// [`changes`](Self::changes) to learn when they may have changed.
#[derive(Debug, Clone)]
pub struct PeripheralHandle {
    peripheral: Peripheral,
    status: PeripheralStatus,
}

impl PeripheralHandle {
    /// Attaches `handler` to `peripheral` as its delegate.
    pub(crate) fn attach(peripheral: &mut Peripheral, handler: Box<dyn PeripheralHandler>) -> Self {
        let status = PeripheralStatus::new();
        peripheral.set_delegate(Box::new(HandlerDelegate {
            handler,
            status: status.clone(),
        }));

        Self {
            peripheral: peripheral.clone(),
            status,
        }
    }

    pub fn id(&self) -> Uuid {
        self.peripheral.identifier()
    }

    /// The peripheral's name, or its identifier if it has none.
    pub fn name(&self) -> String {
        display_name(self.id(), self.peripheral.name())
    }

    pub fn state(&self) -> PeripheralState {
        self.peripheral.state().into()
    }

    /// Identifiers of the services discovered so far.
    pub fn services(&self) -> Vec<BluetoothUuid> {
        service_uuids(&self.peripheral)
    }

    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    /// The most recent error reported for this peripheral.
    pub fn error(&self) -> Option<Error> {
        self.status.error()
    }

    pub fn error_updates(&self) -> Subscription<Option<Error>> {
        self.status.error_updates()
    }

    pub fn changes(&self) -> &Notifier {
        self.status.changes()
    }

    pub(crate) fn on_connected(&self) {
        self.status.changes().notify();
        self.peripheral.discover_services(None);
    }

    pub(crate) fn report_error(&self, error: Error) {
        self.status.report(self.id(), error);
    }
}

pub(crate) fn service_uuids(peripheral: &Peripheral) -> Vec<BluetoothUuid> {
    peripheral
        .services()
        .unwrap_or_default()
        .iter()
        .map(Service::uuid)
        .collect()
}

/// What the peripheral itself tells us, without advertisement data.
pub(crate) fn sighting(peripheral: &Peripheral) -> Sighting {
    Sighting {
        id: peripheral.identifier(),
        name: peripheral.name(),
        advertised_name: None,
        state: peripheral.state().into(),
        services: service_uuids(peripheral),
        rssi: None,
    }
}

struct HandlerDelegate {
    handler: Box<dyn PeripheralHandler>,
    status: PeripheralStatus,
}

impl HandlerDelegate {
    fn report(&self, peripheral: &Peripheral, error: impl Into<Error>) {
        self.status.report(peripheral.identifier(), error.into());
    }

    fn value_changed(&self, peripheral: &Peripheral, characteristic: &Characteristic) {
        let result = deliver_value(characteristic.uuid(), characteristic.value(), |uuid, value| {
            self.handler
                .on_characteristic_value_changed(peripheral, uuid, value)
        });
        self.status.check(peripheral.identifier(), result);
    }
}

impl PeripheralDelegate for HandlerDelegate {
    fn did_update_name(&self, _peripheral: Peripheral) {
        self.status.changes().notify();
    }

    fn did_modify_services(&self, peripheral: Peripheral, invalidated_services: Vec<Service>) {
        self.status.changes().notify();
        if invalidated_services.is_empty() {
            return;
        }

        let uuids: Vec<_> = invalidated_services.iter().map(Service::uuid).collect();
        debug!(id = %peripheral.identifier(), ?uuids, "rediscovering invalidated services");
        peripheral.discover_services(Some(&uuids));
    }

    fn did_discover_services(
        &self,
        peripheral: Peripheral,
        result: corebluetooth_bridge::Result<()>,
    ) {
        if let Err(err) = result {
            return self.report(&peripheral, err);
        }

        self.status.changes().notify();
        for service in peripheral.services().unwrap_or_default() {
            peripheral.discover_characteristics(&service, None);
        }
    }

    fn did_discover_characteristics(
        &self,
        peripheral: Peripheral,
        service: Service,
        result: corebluetooth_bridge::Result<()>,
    ) {
        if let Err(err) = result {
            return self.report(&peripheral, err);
        }

        self.status.changes().notify();
        let characteristics = service.characteristics().unwrap_or_default();
        let result = self
            .handler
            .on_characteristics_found(&peripheral, &service, &characteristics);
        self.status.check(peripheral.identifier(), result);
    }

    fn did_update_value_for_characteristic(
        &self,
        peripheral: Peripheral,
        characteristic: Characteristic,
        result: corebluetooth_bridge::Result<()>,
    ) {
        if let Err(err) = result {
            return self.report(&peripheral, err);
        }

        self.value_changed(&peripheral, &characteristic);
    }

    fn did_write_value_for_characteristic(
        &self,
        peripheral: Peripheral,
        characteristic: Characteristic,
        result: corebluetooth_bridge::Result<()>,
    ) {
        if let Err(err) = result {
            return self.report(&peripheral, err);
        }

        debug!(
            id = %peripheral.identifier(),
            characteristic = ?characteristic.uuid(),
            "wrote characteristic value"
        );
    }

    fn did_update_notification_state_for_characteristic(
        &self,
        peripheral: Peripheral,
        characteristic: Characteristic,
        result: corebluetooth_bridge::Result<()>,
    ) {
        if let Err(err) = result {
            return self.report(&peripheral, err);
        }

        debug!(
            id = %peripheral.identifier(),
            characteristic = ?characteristic.uuid(),
            notifying = characteristic.is_notifying(),
            "notification state updated"
        );
        self.value_changed(&peripheral, &characteristic);
    }
}
