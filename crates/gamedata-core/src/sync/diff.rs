use std::collections::btree_map::{self, BTreeMap};

/// Keyed collection of the items currently known for a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedCollection<K: Ord, V> {
    items: BTreeMap<K, V>,
}

impl<K: Ord, V> TrackedCollection<K, V> {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// Build a collection keyed by `key_of`. Later duplicates replace earlier ones.
    pub fn from_items<I, F>(items: I, key_of: F) -> Self
    where
        I: IntoIterator<Item = V>,
        F: Fn(&V) -> K,
    {
        Self {
            items: items.into_iter().map(|item| (key_of(&item), item)).collect(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.items.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.items.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, K, V> {
        self.items.keys()
    }

    pub fn values(&self) -> btree_map::Values<'_, K, V> {
        self.items.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.items.iter()
    }
}

impl<K: Ord, V> Default for TrackedCollection<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for TrackedCollection<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent<V> {
    Added(V),
    Removed(V),
}

/// Result of one detection pass, in ascending key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet<V> {
    pub added: Vec<V>,
    pub removed: Vec<V>,
}

impl<V> ChangeSet<V> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// All additions, then all removals.
    pub fn into_events(self) -> impl Iterator<Item = ChangeEvent<V>> {
        self.added
            .into_iter()
            .map(ChangeEvent::Added)
            .chain(self.removed.into_iter().map(ChangeEvent::Removed))
    }
}

impl<V> Default for ChangeSet<V> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Keys only in `new` are added, keys only in `old` are removed. Keys present
/// in both produce nothing, whatever their values.
pub fn detect_changes<K, V>(
    old: &TrackedCollection<K, V>,
    new: &TrackedCollection<K, V>,
) -> ChangeSet<V>
where
    K: Ord,
    V: Clone,
{
    let added = new
        .iter()
        .filter(|(key, _)| !old.contains(key))
        .map(|(_, value)| value.clone())
        .collect();
    let removed = old
        .iter()
        .filter(|(key, _)| !new.contains(key))
        .map(|(_, value)| value.clone())
        .collect();

    ChangeSet { added, removed }
}
