//! The bytes this node is currently responsible for, keyed by identifier.
//!
//! Keys are stored and compared as [`Identifier`] values, never as decimal or
//! hex strings — that conversion would lose the ability to cheaply range-test
//! a key against a predecessor/successor arc, which hand-off depends on.
//!
//! [`Identifier`]: ../routing/identifier/struct.Identifier.html

use crate::routing::identifier::Identifier;
use std::collections::HashMap;

/// A node's local key-value store.
///
/// `self_id` is fixed at construction, matching the routing table's own
/// immutable `self` peer reference; it is only ever used to decide, during
/// [`LocalStore::hand_off`], which keys remain this node's responsibility.
pub struct LocalStore {
    self_id: Identifier,
    entries: HashMap<Identifier, Vec<u8>>,
}

impl LocalStore {
    /// Creates an empty store for a node with the given identifier.
    pub fn new(self_id: Identifier) -> Self {
        Self {
            self_id,
            entries: HashMap::new(),
        }
    }

    /// Stores `value` under `key`, overwriting any previous value.
    pub fn put(&mut self, key: Identifier, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    /// Returns a copy of the value stored under `key`, if any.
    pub fn get(&self, key: &Identifier) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    /// Removes and returns every `(key, value)` pair this node is no longer
    /// responsible for now that `new_predecessor` has inserted itself between
    /// this node's old predecessor and this node.
    ///
    /// A key stays behind — is neither returned nor deleted — when it still
    /// falls in `(new_predecessor, self_id]`.
    pub fn hand_off(&mut self, new_predecessor: Identifier) -> Vec<(Identifier, Vec<u8>)> {
        let self_id = self.self_id;

        let departing: Vec<Identifier> = self
            .entries
            .keys()
            .filter(|key| !Identifier::between(key, &new_predecessor, &self_id))
            .cloned()
            .collect();

        departing
            .into_iter()
            .map(|key| {
                let value = self.entries.remove(&key).expect("key just observed present");
                (key, value)
            })
            .collect()
    }

    /// Returns the identifiers currently held by this node, for state dumps.
    pub fn keys(&self) -> Vec<Identifier> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64, m: u32) -> Identifier {
        let mut cur = Identifier::zero();
        for _ in 0..n {
            cur = cur.add_pow2(0, m);
        }
        cur
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut store = LocalStore::new(id(0, 3));
        let key = id(5, 3);

        store.put(key, b"X".to_vec());

        assert_eq!(store.get(&key), Some(b"X".to_vec()));
    }

    #[test]
    fn get_of_absent_key_is_none() {
        let store = LocalStore::new(id(0, 3));

        assert_eq!(store.get(&id(5, 3)), None);
    }

    #[test]
    fn hand_off_moves_only_keys_outside_new_arc() {
        // self_id = 0, keys 3 and 5 present. New predecessor = 4, so the arc
        // this node keeps is (4, 0] = {5, 6, 7, 0}. Key 3 departs, key 5 stays.
        let m = 3;
        let self_id = id(0, m);
        let mut store = LocalStore::new(self_id);

        store.put(id(3, m), b"three".to_vec());
        store.put(id(5, m), b"five".to_vec());

        let mut handed = store.hand_off(id(4, m));
        handed.sort_by_key(|(k, _)| k.to_bytes());

        assert_eq!(handed, vec![(id(3, m), b"three".to_vec())]);
        assert_eq!(store.get(&id(5, m)), Some(b"five".to_vec()));
        assert_eq!(store.get(&id(3, m)), None);
    }
}
