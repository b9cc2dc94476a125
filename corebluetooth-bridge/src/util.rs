use btuuid::BluetoothUuid;
use objc2::rc::{Retained, RetainedFromIterator};
use objc2_core_bluetooth::CBUUID;
use objc2_foundation::{NSArray, NSData};

pub fn to_cbuuid(uuid: &BluetoothUuid) -> Retained<CBUUID> {
    let data = match uuid {
        BluetoothUuid::Uuid16(uuid) => NSData::with_bytes(&uuid.to_be_bytes()),
        BluetoothUuid::Uuid32(uuid) => NSData::with_bytes(&uuid.to_be_bytes()),
        BluetoothUuid::Uuid128(uuid) => NSData::with_bytes(&uuid.to_be_bytes()),
    };
    unsafe { CBUUID::UUIDWithData(&data) }
}

pub fn to_cbuuids(uuids: &[BluetoothUuid]) -> Retained<NSArray<CBUUID>> {
    NSArray::retained_from_iter(uuids.iter().map(to_cbuuid))
}

/// CoreBluetooth only hands out 16, 32 and 128-bit UUIDs.
pub fn from_cbuuid(uuid: &CBUUID) -> BluetoothUuid {
    let data = unsafe { uuid.data() };
    BluetoothUuid::from_be_slice(unsafe { data.as_bytes_unchecked() })
        .expect("CBUUID data is 2, 4 or 16 bytes long")
}
