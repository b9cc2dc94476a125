//! Hosts a service with one writable characteristic and logs every write.

#[cfg(target_vendor = "apple")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use objc2::MainThreadMarker;
    use objc2_foundation::NSRunLoop;
    use pop_bluetooth::bridge::{
        CBAttributePermissions, CBCharacteristicProperties, MutableCharacteristic, MutableService,
    };
    use pop_bluetooth::{BluetoothPeripheral, BluetoothUuid, PeripheralConfig, WriteMeta};
    use tracing::info;
    use tracing::metadata::LevelFilter;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    const SERVICE: BluetoothUuid = BluetoothUuid::from_u16(0xffe0);
    const MESSAGE: BluetoothUuid = BluetoothUuid::from_u16(0xffe1);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let run_loop = unsafe { NSRunLoop::currentRunLoop() };
    let mtm = MainThreadMarker::new().ok_or("not on the main thread")?;

    let create_services = || {
        let message = MutableCharacteristic::create(
            &MESSAGE,
            CBCharacteristicProperties::Read
                | CBCharacteristicProperties::Write
                | CBCharacteristicProperties::Notify,
            None,
            CBAttributePermissions::Readable | CBAttributePermissions::Writeable,
        );
        vec![MutableService::with_characteristics(&SERVICE, &[message])]
    };

    let on_write = |write: WriteMeta| {
        info!(
            peer = %write.peer,
            "{:?}: {}",
            write.characteristic,
            String::from_utf8_lossy(&write.data)
        );
    };

    let _peripheral = BluetoothPeripheral::main_thread(
        PeripheralConfig::new("pop"),
        create_services,
        on_write,
        mtm,
    )?;

    unsafe { run_loop.run() };

    Ok(())
}

#[cfg(not(target_vendor = "apple"))]
fn main() {}
