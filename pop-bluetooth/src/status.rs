//! Observable status of a connected peripheral.

use btuuid::BluetoothUuid;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::published::{Notifier, Published, Subscription};

/// The last error reported for a peripheral and a signal for changes to its live state.
///
/// Clones share both, so the peripheral's delegate reports into the same status that readers
/// observe.
#[derive(Debug, Clone, Default)]
pub struct PeripheralStatus {
    error: Published<Option<Error>>,
    changes: Notifier,
}

impl PeripheralStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self) -> Option<Error> {
        self.error.get()
    }

    pub fn error_updates(&self) -> Subscription<Option<Error>> {
        self.error.subscribe()
    }

    pub fn changes(&self) -> &Notifier {
        &self.changes
    }

    pub fn report(&self, id: Uuid, error: Error) {
        warn!(%id, %error, "peripheral error");
        self.error.set(Some(error));
    }

    /// Publishes the error of `result`, if any.
    pub fn check(&self, id: Uuid, result: Result<()>) {
        if let Err(error) = result {
            self.report(id, error);
        }
    }
}

/// Hands a characteristic value to `deliver`. A characteristic without a value is an error and
/// `deliver` is not called.
pub fn deliver_value(
    characteristic: BluetoothUuid,
    value: Option<Vec<u8>>,
    deliver: impl FnOnce(BluetoothUuid, &[u8]) -> Result<()>,
) -> Result<()> {
    let value = value.ok_or_else(|| Error::missing_value(&characteristic))?;
    deliver(characteristic, &value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const BATTERY_LEVEL: BluetoothUuid = BluetoothUuid::from_u16(0x2a19);

    #[test]
    fn missing_value_is_not_delivered() {
        let mut delivered = false;
        let result = deliver_value(BATTERY_LEVEL, None, |_, _| {
            delivered = true;
            Ok(())
        });

        assert_eq!(result.unwrap_err().kind(), ErrorKind::MissingValue);
        assert!(!delivered);
    }

    #[test]
    fn value_is_delivered() {
        let mut received = Vec::new();
        let result = deliver_value(BATTERY_LEVEL, Some(vec![87]), |uuid, value| {
            assert_eq!(uuid, BATTERY_LEVEL);
            received.extend_from_slice(value);
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(received, [87]);
    }

    #[test]
    fn handler_errors_are_published() {
        let status = PeripheralStatus::new();
        let mut updates = status.error_updates();
        let id = Uuid::from_u128(7);

        let result = deliver_value(BATTERY_LEVEL, Some(vec![0]), |_, _| {
            Err(Error::new(ErrorKind::Other, "bad level"))
        });
        status.check(id, result);

        assert_eq!(status.error().map(|e| e.kind()), Some(ErrorKind::Other));
        let published = updates.try_recv().unwrap();
        assert_eq!(published.map(|e| e.kind()), Some(ErrorKind::Other));
    }

    #[test]
    fn missing_value_is_published() {
        let status = PeripheralStatus::new();
        status.check(
            Uuid::from_u128(7),
            deliver_value(BATTERY_LEVEL, None, |_, _| Ok(())),
        );
        assert_eq!(
            status.error().map(|e| e.kind()),
            Some(ErrorKind::MissingValue)
        );
    }

    #[test]
    fn success_publishes_nothing() {
        let status = PeripheralStatus::new();
        let mut updates = status.error_updates();
        status.check(Uuid::from_u128(7), Ok(()));

        assert!(status.error().is_none());
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn changes_are_observable() {
        let status = PeripheralStatus::new();
        let mut changes = status.changes().subscribe();
        let writer = status.clone();
        tokio::spawn(async move { writer.changes().notify() });
        assert_eq!(changes.recv().await.unwrap(), 1);
    }
}
