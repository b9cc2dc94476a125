//! Requests from remote centrals against locally hosted characteristics.

use std::collections::HashMap;

use btuuid::BluetoothUuid;
use uuid::Uuid;

/// A write from a remote central, handed to the peripheral role's write callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteMeta {
    /// The central that wrote.
    pub peer: Uuid,
    pub characteristic: BluetoothUuid,
    /// The written bytes. Empty if the request carried no value.
    pub data: Vec<u8>,
}

/// Why a read request could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// No value has been set for the characteristic.
    NoValue,
    /// The request offset lies past the end of the value.
    InvalidOffset,
}

/// The part of `value` a read at `offset` returns. Reading exactly at the end yields an empty
/// slice.
pub fn read_at(value: Option<&[u8]>, offset: usize) -> Result<&[u8], ReadError> {
    let value = value.ok_or(ReadError::NoValue)?;
    value.get(offset..).ok_or(ReadError::InvalidOffset)
}

/// The last value set for each hosted characteristic, answered to read requests.
///
/// Values are keyed by service and characteristic, since two hosted services may use the same
/// characteristic identifier.
#[derive(Debug, Clone, Default)]
pub struct ValueCache {
    values: HashMap<(BluetoothUuid, BluetoothUuid), Vec<u8>>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, service: &BluetoothUuid, characteristic: &BluetoothUuid, value: &[u8]) {
        self.values
            .insert((service.clone(), characteristic.clone()), value.to_vec());
    }

    pub fn get(&self, service: &BluetoothUuid, characteristic: &BluetoothUuid) -> Option<&[u8]> {
        self.values
            .get(&(service.clone(), characteristic.clone()))
            .map(Vec::as_slice)
    }

    /// The part of a cached value a read at `offset` returns.
    pub fn read(
        &self,
        service: &BluetoothUuid,
        characteristic: &BluetoothUuid,
        offset: usize,
    ) -> Result<&[u8], ReadError> {
        read_at(self.get(service, characteristic), offset)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Hands every request of a write batch to `forward`, in order. Returns the request the whole
/// batch is answered through, if it is to be answered at all.
pub fn forward_writes<R>(requests: &[R], respond: bool, forward: impl FnMut(&R)) -> Option<&R> {
    requests.iter().for_each(forward);
    if respond { requests.first() } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &[u8] = b"hello";

    #[test]
    fn read_from_start() {
        assert_eq!(read_at(Some(HELLO), 0), Ok(HELLO));
    }

    #[test]
    fn read_honours_offset() {
        assert_eq!(read_at(Some(HELLO), 3), Ok(&b"lo"[..]));
        assert_eq!(read_at(Some(HELLO), 5), Ok(&b""[..]));
    }

    #[test]
    fn read_past_end_is_invalid() {
        assert_eq!(read_at(Some(HELLO), 6), Err(ReadError::InvalidOffset));
    }

    #[test]
    fn read_without_value() {
        assert_eq!(read_at(None, 0), Err(ReadError::NoValue));
    }

    #[test]
    fn cache_separates_services_sharing_a_characteristic() {
        let first = BluetoothUuid::from_u16(0xfff0);
        let second = BluetoothUuid::from_u16(0xfff1);
        let shared = BluetoothUuid::from_u16(0x2a00);

        let mut cache = ValueCache::new();
        cache.set(&first, &shared, b"a");
        cache.set(&second, &shared, b"b");

        assert_eq!(cache.read(&first, &shared, 0), Ok(&b"a"[..]));
        assert_eq!(cache.read(&second, &shared, 0), Ok(&b"b"[..]));
    }

    #[test]
    fn cache_reads_honour_offset() {
        let service = BluetoothUuid::from_u16(0xfff0);
        let characteristic = BluetoothUuid::from_u16(0x2a00);

        let mut cache = ValueCache::new();
        assert_eq!(
            cache.read(&service, &characteristic, 0),
            Err(ReadError::NoValue)
        );

        cache.set(&service, &characteristic, HELLO);
        cache.set(&service, &characteristic, b"bye");
        assert_eq!(cache.read(&service, &characteristic, 1), Ok(&b"ye"[..]));
        assert_eq!(
            cache.read(&service, &characteristic, 4),
            Err(ReadError::InvalidOffset)
        );

        cache.clear();
        assert_eq!(cache.get(&service, &characteristic), None);
    }

    #[test]
    fn write_batch_is_answered_once() {
        let requests = [1, 2, 3];
        let mut forwarded = Vec::new();
        let answer = forward_writes(&requests, true, |request| forwarded.push(*request));
        assert_eq!(forwarded, vec![1, 2, 3]);
        assert_eq!(answer, Some(&1));
    }

    #[test]
    fn write_batch_without_responses() {
        let requests = [1, 2];
        let mut forwarded = 0;
        assert_eq!(forward_writes(&requests, false, |_| forwarded += 1), None);
        assert_eq!(forwarded, 2);

        let empty: [i32; 0] = [];
        assert_eq!(forward_writes(&empty, true, |_| forwarded += 1), None);
        assert_eq!(forwarded, 2);
    }
}
