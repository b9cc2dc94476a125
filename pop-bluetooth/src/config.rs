//! Options for the central and peripheral role wrappers.

use btuuid::BluetoothUuid;

/// Options for a [`BluetoothManager`](crate::BluetoothManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Only discover peripherals advertising at least one of these services. `None` discovers
    /// every peripheral.
    pub required_services: Option<Vec<BluetoothUuid>>,
    /// Report every advertisement instead of one per peripheral. Keeps RSSI values fresh at
    /// the cost of power.
    pub allow_duplicates: bool,
    /// Ask the system to warn the user when Bluetooth is powered off.
    pub show_power_alert: bool,
    /// List peripherals that do not advertise a name, under their identifier.
    pub show_unnamed_devices: bool,
    /// Start scanning as soon as the radio reports powered on.
    pub scan_on_power_on: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            required_services: None,
            allow_duplicates: false,
            show_power_alert: false,
            show_unnamed_devices: true,
            scan_on_power_on: true,
        }
    }
}

impl ManagerConfig {
    pub fn with_required_services(mut self, services: impl Into<Vec<BluetoothUuid>>) -> Self {
        self.required_services = Some(services.into());
        self
    }
}

/// Options for a [`BluetoothPeripheral`](crate::BluetoothPeripheral).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralConfig {
    /// The local name put in advertisements.
    pub advertised_name: String,
    /// Ask the system to warn the user when Bluetooth is powered off.
    pub show_power_alert: bool,
    /// Answer every batch of write requests with success once it has been handed to the
    /// write callback. Centrals writing with response time out when this is off.
    pub respond_to_writes: bool,
}

impl PeripheralConfig {
    pub fn new(advertised_name: impl Into<String>) -> Self {
        Self {
            advertised_name: advertised_name.into(),
            show_power_alert: false,
            respond_to_writes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_defaults_scan_everything() {
        let config = ManagerConfig::default();
        assert_eq!(config.required_services, None);
        assert!(config.scan_on_power_on);
        assert!(config.show_unnamed_devices);
        assert!(!config.allow_duplicates);
    }

    #[test]
    fn required_services_builder() {
        let config =
            ManagerConfig::default().with_required_services([BluetoothUuid::from_u16(0x180d)]);
        assert_eq!(
            config.required_services,
            Some(vec![BluetoothUuid::from_u16(0x180d)])
        );
    }

    #[test]
    fn peripheral_defaults_respond_to_writes() {
        let config = PeripheralConfig::new("pop");
        assert_eq!(config.advertised_name, "pop");
        assert!(config.respond_to_writes);
    }
}
