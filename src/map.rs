use crate::Madrone;

struct MapEntry<K: Ord, V> {
    key: K,
    value: Option<V>,
}

impl<K: Default + Ord, V> Default for MapEntry<K, V> {
    fn default() -> Self {
        Self {
            key: K::default(),
            value: Option::default(),
        }
    }
}

impl<K: Ord, V> PartialEq for MapEntry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Ord, V> Eq for MapEntry<K, V> {}

impl<K: Ord, V> PartialOrd for MapEntry<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.key.cmp(&other.key))
    }
}

impl<K: Ord, V> Ord for MapEntry<K, V> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// An associative array, storing key-value pairs.
///
/// Uses a Madrone red-black tree with a specialized key type that orders
/// entries by key alone, so a probe entry with no value can stand in for a
/// key during lookups.
pub struct MadroneMap<K: Ord, V> {
    tree: Madrone<MapEntry<K, V>>,
}

impl<K: Default + Ord, V> MadroneMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: Madrone::new(),
        }
    }

    pub fn contains_key(&self, key: K) -> bool {
        self.tree.contains(&MapEntry { key, value: None })
    }

    /// Binds `value` to `key` unless the key is already bound.
    ///
    /// Returns whether a new entry was created. An existing binding keeps
    /// its original value.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.tree
            .insert(MapEntry {
                key,
                value: Some(value),
            })
            .1
    }

    pub fn get(&self, key: K) -> Option<&V> {
        let probe = MapEntry { key, value: None };

        self.tree
            .lower_bound(&probe)
            .filter(|&e| e.key == probe.key)?
            .value
            .as_ref()
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        let probe = MapEntry { key, value: None };

        self.tree
            .lower_bound_mut(&probe)
            .filter(|e| e.key == probe.key)?
            .value
            .as_mut()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.len() == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }
}

impl<K: Default + Ord, V> Default for MadroneMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::MadroneMap;

    #[test]
    pub fn map_entry_multi_insertion() {
        let mut map = MadroneMap::<usize, usize>::new();

        map.insert(3, 17);
        map.insert(2, 12);
        map.insert(1, 7);

        assert!(map.contains_key(2));
        assert!(map.contains_key(1));
        assert!(map.contains_key(3));

        assert!(!map.insert(3, 19));
        assert_eq!(*map.get(3).unwrap(), 17);
        assert_eq!(map.len(), 3);
    }

    #[test]
    pub fn map_update_entry() {
        let mut map = MadroneMap::<usize, usize>::new();

        map.insert(3, 17);
        *map.get_mut(3).unwrap() = 5;

        assert_eq!(*map.get(3).unwrap(), 5);
    }

    #[test]
    pub fn map_missing_key() {
        let mut map = MadroneMap::<usize, usize>::new();

        assert!(map.is_empty());
        assert!(map.get(4).is_none());
        assert!(!map.contains_key(4));

        map.insert(4, 1);
        assert!(map.get(5).is_none());
        assert!(map.get_mut(5).is_none());
        assert_eq!(*map.get(4).unwrap(), 1);
    }
}
