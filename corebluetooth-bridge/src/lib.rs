//! Delegate-trait bindings to Apple's [CoreBluetooth framework](https://developer.apple.com/documentation/corebluetooth)
//! covering both Bluetooth LE roles.
//!
//! Each CoreBluetooth manager is paired with an Objective-C bridge object that owns a boxed Rust
//! delegate. CoreBluetooth calls the bridge on the manager's dispatch queue and the bridge
//! forwards every callback to the Rust trait with safe wrapper types.
//!
//! - central role: [`CentralManager`], [`Peripheral`], [`Service`], [`Characteristic`]
//! - peripheral role: [`PeripheralManager`], [`MutableService`], [`MutableCharacteristic`],
//!   [`Central`], [`AttRequest`]
//!
//! This crate is empty on non-Apple targets.

#![cfg(target_vendor = "apple")]

pub mod advertisement_data;
mod att_request;
mod central;
mod central_manager;
mod characteristic;
pub mod dispatch;
pub mod error;
mod mutable;
mod peripheral;
mod peripheral_manager;
mod service;
mod util;

pub use att_request::*;
pub use central::*;
pub use central_manager::*;
pub use characteristic::*;
pub use error::{Error, Result};
pub use mutable::*;
pub use peripheral::*;
pub use peripheral_manager::*;
pub use service::*;

pub use objc2_core_bluetooth::{
    CBATTError, CBAttributePermissions, CBCharacteristicProperties, CBError, CBManagerState,
    CBPeripheralState,
};
