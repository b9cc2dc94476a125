//! Advertisement data received during a scan, and the payload the peripheral manager advertises.

use btuuid::BluetoothUuid;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_core_bluetooth::{
    CBAdvertisementDataIsConnectable, CBAdvertisementDataLocalNameKey,
    CBAdvertisementDataManufacturerDataKey, CBAdvertisementDataServiceUUIDsKey,
    CBAdvertisementDataTxPowerLevelKey, CBUUID,
};
use objc2_foundation::{NSArray, NSData, NSDictionary, NSMutableDictionary, NSNumber, NSString};

use crate::util::{from_cbuuid, to_cbuuids};

/// Data included in a Bluetooth advertisement or scan reponse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisementData {
    /// The (possibly shortened) local name of the device (CSS §A.1.2)
    pub local_name: Option<String>,
    /// Manufacturer specific data (CSS §A.1.4)
    pub manufacturer_data: Option<ManufacturerData>,
    /// Advertised GATT service UUIDs (CSS §A.1.1)
    pub service_uuids: Vec<BluetoothUuid>,
    /// Transmitted power level (CSS §A.1.5)
    pub tx_power_level: Option<i16>,
    /// Set to true for connectable advertising packets
    pub is_connectable: bool,
}

/// Manufacturer specific data (CSS §A.1.4).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManufacturerData {
    pub company_id: u16,
    pub data: Vec<u8>,
}

impl AdvertisementData {
    pub(crate) fn from_nsdictionary(adv_data: &NSDictionary<NSString, AnyObject>) -> Self {
        let is_connectable = adv_data
            .objectForKey(unsafe { CBAdvertisementDataIsConnectable })
            .and_then(|val| val.downcast_ref::<NSNumber>().map(|b| b.as_bool()))
            .unwrap_or(false);

        let local_name = adv_data
            .objectForKey(unsafe { CBAdvertisementDataLocalNameKey })
            .and_then(|val| val.downcast_ref::<NSString>().map(|s| s.to_string()));

        let manufacturer_data = adv_data
            .objectForKey(unsafe { CBAdvertisementDataManufacturerDataKey })
            .and_then(|val| val.downcast_ref::<NSData>().map(|v| v.to_vec()))
            .and_then(|val| match val.as_slice() {
                [lo, hi, data @ ..] => Some(ManufacturerData {
                    company_id: u16::from_le_bytes([*lo, *hi]),
                    data: data.to_vec(),
                }),
                _ => None,
            });

        let tx_power_level = adv_data
            .objectForKey(unsafe { CBAdvertisementDataTxPowerLevelKey })
            .and_then(|val| val.downcast_ref::<NSNumber>().map(|val| val.shortValue()));

        let service_uuids = adv_data
            .objectForKey(unsafe { CBAdvertisementDataServiceUUIDsKey })
            .into_iter()
            .flat_map(|x| x.downcast::<NSArray>())
            .flatten()
            .flat_map(|obj| obj.downcast::<CBUUID>())
            .map(|uuid| from_cbuuid(&uuid))
            .collect();

        AdvertisementData {
            local_name,
            manufacturer_data,
            service_uuids,
            tx_power_level,
            is_connectable,
        }
    }
}

/// What the local peripheral manager puts in its advertisements.
///
/// CoreBluetooth only honours the local name and service UUIDs when advertising.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    pub local_name: Option<String>,
    pub service_uuids: Vec<BluetoothUuid>,
}

impl Advertisement {
    pub(crate) fn to_dictionary(&self) -> Retained<NSDictionary<NSString, AnyObject>> {
        let dict = NSMutableDictionary::<NSString, AnyObject>::new();

        if let Some(name) = &self.local_name {
            unsafe {
                dict.setValue_forKey(
                    Some(&NSString::from_str(name)),
                    CBAdvertisementDataLocalNameKey,
                )
            };
        }

        if !self.service_uuids.is_empty() {
            unsafe {
                dict.setValue_forKey(
                    Some(&to_cbuuids(&self.service_uuids)),
                    CBAdvertisementDataServiceUUIDsKey,
                )
            };
        }

        dict.into_super()
    }
}
