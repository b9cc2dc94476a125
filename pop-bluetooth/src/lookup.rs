//! Finding services, characteristics and peers by identifier.

use btuuid::BluetoothUuid;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Anything in a GATT database that is identified by a UUID.
pub trait GattAttribute {
    fn uuid(&self) -> BluetoothUuid;
}

/// The first of `items` with the given identifier.
pub fn find_attribute<'a, T: GattAttribute>(
    items: impl IntoIterator<Item = &'a T>,
    uuid: &BluetoothUuid,
) -> Option<&'a T>
where
    T: 'a,
{
    items.into_iter().find(|item| item.uuid() == *uuid)
}

/// A locally hosted service.
pub trait HostedService: GattAttribute {
    type Characteristic: GattAttribute;

    /// The characteristics of the service that can be updated.
    fn mutable_characteristics(&self) -> Vec<Self::Characteristic>;
}

/// A remote central.
pub trait Peer {
    fn peer_id(&self) -> Uuid;
}

/// The hosted characteristic `characteristic` of the hosted service `service`.
pub fn find_hosted<'a, S: HostedService + 'a>(
    services: impl IntoIterator<Item = &'a S>,
    service: &BluetoothUuid,
    characteristic: &BluetoothUuid,
) -> Result<S::Characteristic> {
    let hosted =
        find_attribute(services, service).ok_or_else(|| Error::no_such_service(service))?;
    hosted
        .mutable_characteristics()
        .into_iter()
        .find(|c| c.uuid() == *characteristic)
        .ok_or_else(|| Error::no_such_characteristic(characteristic, service))
}

/// The subscriber with identifier `peer`. With no `peer`, resolves to `None`, which addresses
/// every subscriber.
pub fn find_peer<P: Peer>(
    subscribers: impl IntoIterator<Item = P>,
    peer: Option<&Uuid>,
) -> Result<Option<P>> {
    let Some(peer) = peer else {
        return Ok(None);
    };

    subscribers
        .into_iter()
        .find(|subscriber| subscriber.peer_id() == *peer)
        .map(Some)
        .ok_or_else(|| Error::no_subscribed_peer(peer))
}

/// Identifiers of `subscribers` in first-seen order, each listed once.
pub fn unique_peers<P: Peer>(subscribers: impl IntoIterator<Item = P>) -> Vec<Uuid> {
    let mut peers = Vec::new();
    for subscriber in subscribers {
        let id = subscriber.peer_id();
        if !peers.contains(&id) {
            peers.push(id);
        }
    }
    peers
}

#[cfg(target_vendor = "apple")]
mod platform {
    use btuuid::BluetoothUuid;
    use corebluetooth_bridge::{
        Central, Characteristic, MutableCharacteristic, MutableService, Peripheral, Service,
    };
    use uuid::Uuid;

    use super::{GattAttribute, HostedService, Peer, find_attribute};

    impl GattAttribute for Service {
        fn uuid(&self) -> BluetoothUuid {
            Service::uuid(self)
        }
    }

    impl GattAttribute for Characteristic {
        fn uuid(&self) -> BluetoothUuid {
            Characteristic::uuid(self)
        }
    }

    impl GattAttribute for MutableService {
        fn uuid(&self) -> BluetoothUuid {
            MutableService::uuid(self)
        }
    }

    impl GattAttribute for MutableCharacteristic {
        fn uuid(&self) -> BluetoothUuid {
            MutableCharacteristic::uuid(self)
        }
    }

    impl HostedService for MutableService {
        type Characteristic = MutableCharacteristic;

        fn mutable_characteristics(&self) -> Vec<MutableCharacteristic> {
            self.characteristics()
        }
    }

    impl Peer for Central {
        fn peer_id(&self) -> Uuid {
            self.identifier()
        }
    }

    pub trait PeripheralExt {
        /// The discovered service with the given identifier.
        fn service(&self, uuid: &BluetoothUuid) -> Option<Service>;
    }

    impl PeripheralExt for Peripheral {
        fn service(&self, uuid: &BluetoothUuid) -> Option<Service> {
            let services = self.services()?;
            find_attribute(&services, uuid).cloned()
        }
    }

    pub trait ServiceExt {
        /// The discovered characteristic with the given identifier.
        fn characteristic(&self, uuid: &BluetoothUuid) -> Option<Characteristic>;
    }

    impl ServiceExt for Service {
        fn characteristic(&self, uuid: &BluetoothUuid) -> Option<Characteristic> {
            let characteristics = self.characteristics()?;
            find_attribute(&characteristics, uuid).cloned()
        }
    }

    pub trait MutableServiceExt {
        /// The hosted characteristic with the given identifier.
        fn mutable_characteristic(&self, uuid: &BluetoothUuid) -> Option<MutableCharacteristic>;
    }

    impl MutableServiceExt for MutableService {
        fn mutable_characteristic(&self, uuid: &BluetoothUuid) -> Option<MutableCharacteristic> {
            find_attribute(&self.characteristics(), uuid).cloned()
        }
    }
}

#[cfg(target_vendor = "apple")]
pub use platform::{MutableServiceExt, PeripheralExt, ServiceExt};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, PartialEq)]
    struct Attribute(u16, &'static str);

    impl GattAttribute for Attribute {
        fn uuid(&self) -> BluetoothUuid {
            BluetoothUuid::from_u16(self.0)
        }
    }

    #[derive(Debug, PartialEq)]
    struct Hosted(u16, Vec<u16>);

    impl GattAttribute for Hosted {
        fn uuid(&self) -> BluetoothUuid {
            BluetoothUuid::from_u16(self.0)
        }
    }

    impl HostedService for Hosted {
        type Characteristic = Attribute;

        fn mutable_characteristics(&self) -> Vec<Attribute> {
            self.1.iter().map(|&uuid| Attribute(uuid, "hosted")).collect()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Subscriber(u128);

    impl Peer for Subscriber {
        fn peer_id(&self) -> Uuid {
            Uuid::from_u128(self.0)
        }
    }

    fn hosted() -> Vec<Hosted> {
        vec![Hosted(0xfff0, vec![0xfff1, 0xfff2]), Hosted(0x180f, vec![0x2a19])]
    }

    #[test]
    fn find_hosted_characteristic() {
        let found = find_hosted(
            &hosted(),
            &BluetoothUuid::from_u16(0xfff0),
            &BluetoothUuid::from_u16(0xfff2),
        );
        assert_eq!(found, Ok(Attribute(0xfff2, "hosted")));
    }

    #[test]
    fn find_hosted_unknown_service() {
        let err = find_hosted(
            &hosted(),
            &BluetoothUuid::from_u16(0x1800),
            &BluetoothUuid::from_u16(0xfff1),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchService);
    }

    #[test]
    fn find_hosted_characteristic_on_other_service() {
        let err = find_hosted(
            &hosted(),
            &BluetoothUuid::from_u16(0x180f),
            &BluetoothUuid::from_u16(0xfff1),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchCharacteristic);
    }

    #[test]
    fn find_peer_among_subscribers() {
        let subscribers = [Subscriber(1), Subscriber(2)];
        let peer = Uuid::from_u128(2);
        assert_eq!(find_peer(subscribers, Some(&peer)), Ok(Some(Subscriber(2))));
        assert_eq!(find_peer(subscribers, None), Ok(None));
    }

    #[test]
    fn find_peer_not_subscribed() {
        let peer = Uuid::from_u128(3);
        let err = find_peer([Subscriber(1)], Some(&peer)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSubscribedPeer);

        let err = find_peer(Vec::<Subscriber>::new(), Some(&peer)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSubscribedPeer);
    }

    #[test]
    fn peers_are_listed_once() {
        let peers = unique_peers([Subscriber(2), Subscriber(1), Subscriber(2)]);
        assert_eq!(peers, vec![Uuid::from_u128(2), Uuid::from_u128(1)]);
    }

    #[test]
    fn finds_matching_attribute() {
        let items = [Attribute(0x180d, "heart rate"), Attribute(0x180f, "battery")];
        let found = find_attribute(&items, &BluetoothUuid::from_u16(0x180f));
        assert_eq!(found, Some(&Attribute(0x180f, "battery")));
    }

    #[test]
    fn first_match_wins() {
        let items = [Attribute(0x2a37, "first"), Attribute(0x2a37, "second")];
        let found = find_attribute(&items, &BluetoothUuid::from_u16(0x2a37));
        assert_eq!(found.map(|a| a.1), Some("first"));
    }

    #[test]
    fn missing_attribute() {
        let items = [Attribute(0x180d, "heart rate")];
        assert!(find_attribute(&items, &BluetoothUuid::from_u16(0x1800)).is_none());
        let empty: [Attribute; 0] = [];
        assert!(find_attribute(&empty, &BluetoothUuid::from_u16(0x180d)).is_none());
    }
}
