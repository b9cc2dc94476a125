//! The central role: scanning, connecting and reacting to remote peripherals.

mod handler;
mod manager;

pub use handler::{PeripheralHandle, PeripheralHandler};
pub use manager::{BluetoothManager, Discovery, default_handler};
