//! Records of discovered peripherals, as shown in a device list.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use btuuid::BluetoothUuid;
use uuid::Uuid;

use crate::state::PeripheralState;

/// A snapshot of a discovered peripheral.
///
/// Two records are equal when they describe the same peripheral, whatever their contents.
/// Records sort by name.
#[derive(Debug, Clone)]
pub struct BluetoothDevice {
    pub id: Uuid,
    pub name: String,
    pub state: PeripheralState,
    /// Identifiers of the services discovered so far.
    pub services: Vec<BluetoothUuid>,
    /// Signal strength of the last advertisement, in dBm.
    pub rssi: Option<i16>,
}

/// Connection status of a device, for list decorations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Idle,
    Connecting,
    Connected,
}

impl BluetoothDevice {
    pub fn new(id: Uuid, name: Option<String>, state: PeripheralState) -> Self {
        Self {
            id,
            name: display_name(id, name),
            state,
            services: Vec::new(),
            rssi: None,
        }
    }

    pub fn indicator(&self) -> Indicator {
        match self.state {
            PeripheralState::Connecting => Indicator::Connecting,
            PeripheralState::Connected => Indicator::Connected,
            _ => Indicator::Idle,
        }
    }
}

/// The name to show for a peripheral: its advertised name, or its identifier.
pub fn display_name(id: Uuid, name: Option<String>) -> String {
    name.unwrap_or_else(|| id.to_string())
}

impl PartialEq for BluetoothDevice {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BluetoothDevice {}

impl Hash for BluetoothDevice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for BluetoothDevice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BluetoothDevice {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// What one scan or connection event reported about a peripheral.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sighting {
    pub id: Uuid,
    /// The name the peripheral reports for itself.
    pub name: Option<String>,
    /// The local name from the advertisement, if the event carried one.
    pub advertised_name: Option<String>,
    pub state: PeripheralState,
    pub services: Vec<BluetoothUuid>,
    pub rssi: Option<i16>,
}

/// Every peripheral seen so far, one record per identifier.
#[derive(Debug, Clone, Default)]
pub struct DeviceSet {
    devices: HashMap<Uuid, BluetoothDevice>,
}

impl DeviceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `device` or replaces the record with the same identifier. Returns `true` if the
    /// device was not known before.
    ///
    /// A replacement without an RSSI keeps the previously reported one.
    pub fn update(&mut self, mut device: BluetoothDevice) -> bool {
        match self.devices.get(&device.id) {
            Some(previous) => {
                if device.rssi.is_none() {
                    device.rssi = previous.rssi;
                }
                self.devices.insert(device.id, device);
                false
            }
            None => {
                self.devices.insert(device.id, device);
                true
            }
        }
    }

    /// Records what an event reported about a peripheral. Returns `true` if the device was not
    /// known before.
    ///
    /// The peripheral's own name wins over the advertised one. When neither is reported the
    /// stored name is kept. A device that has never reported a name is only added when
    /// `show_unnamed` is set; once listed it keeps being updated.
    pub fn observe(&mut self, sighting: Sighting, show_unnamed: bool) -> bool {
        let previous = self.devices.get(&sighting.id);
        let name = match sighting.name.or(sighting.advertised_name) {
            Some(name) => name,
            None => match previous {
                Some(previous) => previous.name.clone(),
                None if show_unnamed => sighting.id.to_string(),
                None => return false,
            },
        };

        self.update(BluetoothDevice {
            id: sighting.id,
            name,
            state: sighting.state,
            services: sighting.services,
            rssi: sighting.rssi,
        })
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<BluetoothDevice> {
        self.devices.remove(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&BluetoothDevice> {
        self.devices.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.devices.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BluetoothDevice> {
        self.devices.values()
    }

    /// The devices ordered by name.
    pub fn sorted(&self) -> Vec<BluetoothDevice> {
        let mut devices: Vec<_> = self.devices.values().cloned().collect();
        devices.sort();
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: u128, name: &str) -> BluetoothDevice {
        BluetoothDevice::new(
            Uuid::from_u128(id),
            Some(name.to_string()),
            PeripheralState::Disconnected,
        )
    }

    #[test]
    fn unnamed_devices_use_their_identifier() {
        let id = Uuid::from_u128(0xfeed);
        let device = BluetoothDevice::new(id, None, PeripheralState::Disconnected);
        assert_eq!(device.name, id.to_string());
    }

    #[test]
    fn equality_is_by_identifier() {
        let mut a = device(1, "a");
        let b = device(1, "renamed");
        a.state = PeripheralState::Connected;
        assert_eq!(a, b);
        assert_ne!(device(1, "a"), device(2, "a"));
    }

    #[test]
    fn set_deduplicates_by_identifier() {
        let mut set = DeviceSet::new();
        assert!(set.update(device(1, "kettle")));
        assert!(!set.update(device(1, "kettle 2")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&Uuid::from_u128(1)).unwrap().name, "kettle 2");
    }

    #[test]
    fn sorted_orders_by_name_then_identifier() {
        let mut set = DeviceSet::new();
        set.update(device(3, "toaster"));
        set.update(device(2, "kettle"));
        set.update(device(1, "kettle"));
        set.update(device(4, "blender"));

        let ids: Vec<u128> = set.sorted().iter().map(|d| d.id.as_u128()).collect();
        assert_eq!(ids, vec![4, 1, 2, 3]);
    }

    #[test]
    fn update_keeps_known_rssi() {
        let mut set = DeviceSet::new();
        let mut seen = device(1, "lamp");
        seen.rssi = Some(-60);
        set.update(seen);

        let mut connected = device(1, "lamp");
        connected.state = PeripheralState::Connected;
        set.update(connected);

        let record = set.get(&Uuid::from_u128(1)).unwrap();
        assert_eq!(record.rssi, Some(-60));
        assert_eq!(record.state, PeripheralState::Connected);
    }

    #[test]
    fn indicator_follows_state() {
        let mut d = device(1, "x");
        assert_eq!(d.indicator(), Indicator::Idle);
        d.state = PeripheralState::Connecting;
        assert_eq!(d.indicator(), Indicator::Connecting);
        d.state = PeripheralState::Connected;
        assert_eq!(d.indicator(), Indicator::Connected);
        d.state = PeripheralState::Disconnecting;
        assert_eq!(d.indicator(), Indicator::Idle);
    }

    fn sighting(id: u128) -> Sighting {
        Sighting {
            id: Uuid::from_u128(id),
            ..Sighting::default()
        }
    }

    #[test]
    fn observe_prefers_peripheral_name() {
        let mut set = DeviceSet::new();
        let seen = Sighting {
            name: Some("gap name".into()),
            advertised_name: Some("adv name".into()),
            ..sighting(1)
        };
        assert!(set.observe(seen, false));
        assert_eq!(set.get(&Uuid::from_u128(1)).unwrap().name, "gap name");
    }

    #[test]
    fn observe_falls_back_to_advertised_name() {
        let mut set = DeviceSet::new();
        let seen = Sighting {
            advertised_name: Some("thermometer".into()),
            rssi: Some(-70),
            ..sighting(1)
        };
        assert!(set.observe(seen, false));
        let record = set.get(&Uuid::from_u128(1)).unwrap();
        assert_eq!(record.name, "thermometer");
        assert_eq!(record.rssi, Some(-70));
    }

    #[test]
    fn observe_hides_unnamed_devices_unless_asked() {
        let mut set = DeviceSet::new();
        assert!(!set.observe(sighting(1), false));
        assert!(set.is_empty());

        assert!(set.observe(sighting(1), true));
        assert_eq!(
            set.get(&Uuid::from_u128(1)).unwrap().name,
            Uuid::from_u128(1).to_string()
        );
    }

    #[test]
    fn connection_events_keep_advertised_name() {
        let mut set = DeviceSet::new();
        let advertised = Sighting {
            advertised_name: Some("thermometer".into()),
            rssi: Some(-70),
            ..sighting(1)
        };
        set.observe(advertised, false);

        let connected = Sighting {
            state: PeripheralState::Connected,
            ..sighting(1)
        };
        assert!(!set.observe(connected, false));

        let record = set.get(&Uuid::from_u128(1)).unwrap();
        assert_eq!(record.name, "thermometer");
        assert_eq!(record.state, PeripheralState::Connected);
        assert_eq!(record.rssi, Some(-70));
    }

    #[test]
    fn connection_events_respect_unnamed_filter() {
        let mut set = DeviceSet::new();
        let connected = Sighting {
            state: PeripheralState::Connected,
            ..sighting(1)
        };
        assert!(!set.observe(connected, false));
        assert!(set.is_empty());
    }

    #[test]
    fn remove_forgets_device() {
        let mut set = DeviceSet::new();
        set.update(device(1, "x"));
        assert!(set.remove(&Uuid::from_u128(1)).is_some());
        assert!(set.is_empty());
    }
}
