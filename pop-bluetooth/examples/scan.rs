//! Lists nearby peripherals and logs heart rate measurements from any heart rate monitor.

#[cfg(target_vendor = "apple")]
mod heart_rate {
    use pop_bluetooth::bridge::{Characteristic, Peripheral, Service};
    use pop_bluetooth::central::Discovery;
    use pop_bluetooth::{BluetoothUuid, ErrorKind, PeripheralHandler, Result};
    use tracing::info;

    const SERVICE: BluetoothUuid = BluetoothUuid::from_u16(0x180d);
    const MEASUREMENT: BluetoothUuid = BluetoothUuid::from_u16(0x2a37);

    pub fn on_discover(discovery: &Discovery) -> Option<Box<dyn PeripheralHandler>> {
        discovery
            .advertisement_data
            .service_uuids
            .contains(&SERVICE)
            .then(|| Box::new(HeartRate) as Box<dyn PeripheralHandler>)
    }

    struct HeartRate;

    impl PeripheralHandler for HeartRate {
        fn on_characteristics_found(
            &self,
            peripheral: &Peripheral,
            service: &Service,
            characteristics: &[Characteristic],
        ) -> Result<()> {
            if service.uuid() != SERVICE {
                return Ok(());
            }

            for characteristic in characteristics {
                if characteristic.uuid() == MEASUREMENT {
                    peripheral.set_notify(characteristic, true);
                }
            }
            Ok(())
        }

        fn on_characteristic_value_changed(
            &self,
            peripheral: &Peripheral,
            characteristic: BluetoothUuid,
            value: &[u8],
        ) -> Result<()> {
            if characteristic != MEASUREMENT {
                return Ok(());
            }

            let bpm = match value {
                [flags, bpm, ..] if flags & 1 == 0 => u16::from(*bpm),
                [_, lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
                _ => return Err(ErrorKind::MissingValue.into()),
            };
            info!(id = %peripheral.identifier(), bpm, "heart rate");
            Ok(())
        }
    }
}

#[cfg(target_vendor = "apple")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use futures_lite::StreamExt;
    use pop_bluetooth::{BluetoothManager, DispatchQoS, ManagerConfig};
    use tracing::info;
    use tracing::metadata::LevelFilter;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let (manager, mut devices) = BluetoothManager::background(
        DispatchQoS::user_initiated(),
        ManagerConfig::default(),
        heart_rate::on_discover,
        |manager, queue| {
            let devices = manager.device_updates();
            (queue.bind(manager), devices)
        },
    );

    while let Some(devices) = devices.next().await {
        let scanning = manager.with(|manager| manager.is_scanning());
        info!(scanning, count = devices.len(), "devices updated");
        for device in devices.sorted() {
            let rssi = device.rssi.map(|rssi| format!(" ({rssi}dBm)")).unwrap_or_default();
            info!("{}{rssi}: {}", device.name, device.state);
        }
    }

    Ok(())
}

#[cfg(not(target_vendor = "apple"))]
fn main() {}
