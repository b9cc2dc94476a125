//! Strong references to the handlers of peripherals being connected to.

use std::collections::HashMap;

use uuid::Uuid;

/// Handlers keyed by peripheral identifier.
///
/// CoreBluetooth does not retain peripherals or their delegates. The central manager keeps
/// every handler it starts connecting here until the peripheral fails to connect or
/// disconnects, and never offers a registered peripheral to the application again.
#[derive(Debug)]
pub struct ConnectionRegistry<H> {
    handlers: HashMap<Uuid, H>,
}

impl<H> Default for ConnectionRegistry<H> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<H> ConnectionRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.handlers.contains_key(id)
    }

    /// Whether a discovered peripheral may be offered to the application. Peripherals with a
    /// registered handler are never offered twice.
    pub fn should_offer(&self, id: &Uuid) -> bool {
        !self.contains(id)
    }

    /// Registers `handler` for `id`. Returns the handler it replaced, if any.
    pub fn insert(&mut self, id: Uuid, handler: H) -> Option<H> {
        self.handlers.insert(id, handler)
    }

    pub fn get(&self, id: &Uuid) -> Option<&H> {
        self.handlers.get(id)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<H> {
        self.handlers.remove(id)
    }

    /// Forgets every handler, returning them. Used when the radio goes away, since no
    /// disconnect events follow.
    pub fn clear(&mut self) -> Vec<H> {
        self.handlers.drain().map(|(_, handler)| handler).collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &Uuid> {
        self.handlers.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &H> {
        self.handlers.values()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut registry = ConnectionRegistry::new();
        let id = Uuid::from_u128(1);
        assert!(registry.insert(id, "heart rate").is_none());
        assert!(registry.contains(&id));
        assert_eq!(registry.get(&id), Some(&"heart rate"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_allows_offering_again() {
        let mut registry = ConnectionRegistry::new();
        let id = Uuid::from_u128(1);
        registry.insert(id, 1);
        assert_eq!(registry.remove(&id), Some(1));
        assert!(!registry.contains(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn registered_peripherals_are_not_offered_again() {
        let mut registry = ConnectionRegistry::new();
        let id = Uuid::from_u128(1);
        assert!(registry.should_offer(&id));
        registry.insert(id, ());
        assert!(!registry.should_offer(&id));
        assert!(registry.should_offer(&Uuid::from_u128(2)));
    }

    #[test]
    fn clear_allows_offering_after_power_cycle() {
        let mut registry = ConnectionRegistry::new();
        registry.insert(Uuid::from_u128(1), "a");
        registry.insert(Uuid::from_u128(2), "b");

        let mut dropped = registry.clear();
        dropped.sort();
        assert_eq!(dropped, vec!["a", "b"]);
        assert!(registry.is_empty());
        assert!(registry.should_offer(&Uuid::from_u128(1)));
    }

    #[test]
    fn insert_replaces_existing() {
        let mut registry = ConnectionRegistry::new();
        let id = Uuid::from_u128(1);
        registry.insert(id, 1);
        assert_eq!(registry.insert(id, 2), Some(1));
        assert_eq!(registry.values().copied().collect::<Vec<_>>(), vec![2]);
    }
}
