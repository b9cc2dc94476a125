//! Observable Bluetooth LE roles for reactive user interfaces.
//!
//! `pop-bluetooth` sits on top of CoreBluetooth and republishes everything a UI needs to
//! render as [`Published`] values:
//!
//! - [`BluetoothManager`] scans as a central, asks the application which discovered peripherals
//!   to connect to, and keeps a deduplicated, sorted [`DeviceSet`] of everything it has seen.
//! - [`PeripheralHandler`] is implemented by the application for every peripheral it connects
//!   to. The manager drives service and characteristic discovery and forwards characteristic
//!   values to it.
//! - [`BluetoothPeripheral`] advertises application-defined services, forwards writes from
//!   remote centrals, and pushes characteristic updates to subscribers.
//!
//! Connection management, GATT transactions and radio state all belong to CoreBluetooth. The
//! platform wrappers are only compiled on Apple targets; the data types are available
//! everywhere.

#[cfg(target_vendor = "apple")]
pub mod central;
pub mod config;
pub mod device;
pub mod error;
pub mod lookup;
#[cfg(target_vendor = "apple")]
pub mod peripheral;
mod published;
pub mod registry;
pub mod state;
pub mod status;
pub mod write;

#[cfg(target_vendor = "apple")]
pub use central::{BluetoothManager, Discovery, PeripheralHandle, PeripheralHandler};
pub use config::{ManagerConfig, PeripheralConfig};
pub use device::{BluetoothDevice, DeviceSet, Indicator, Sighting};
pub use error::{Error, ErrorKind, Result};
#[cfg(target_vendor = "apple")]
pub use peripheral::BluetoothPeripheral;
pub use published::{Notifier, Published, Subscription};
pub use state::{ManagerState, PeripheralState};
pub use status::PeripheralStatus;
pub use write::{ValueCache, WriteMeta};

pub use btuuid::BluetoothUuid;
#[cfg(target_vendor = "apple")]
pub use corebluetooth_bridge as bridge;
#[cfg(target_vendor = "apple")]
pub use corebluetooth_bridge::dispatch::{DispatchQoS, QueueBound, QueueContext};
pub use uuid::Uuid;
