// SPDX-License-Identifier: MPL-2.0

use std::hash::Hash;

use crate::type_aliases::Map;

/// Map optimised for the one or two entries most incompatibilities hold.
/// Inline variants keep insertion order.
#[derive(Debug, Clone)]
pub enum SmallMap<K, V> {
    Empty,
    One([(K, V); 1]),
    Two([(K, V); 2]),
    Flexible(Map<K, V>),
}

impl<K: PartialEq + Eq + Hash, V> SmallMap<K, V> {
    pub fn get(&self, key: &K) -> Option<&V> {
        match self {
            Self::Empty => None,
            Self::One([(k, v)]) if k == key => Some(v),
            Self::One(_) => None,
            Self::Two([(k1, v1), _]) if key == k1 => Some(v1),
            Self::Two([_, (k2, v2)]) if key == k2 => Some(v2),
            Self::Two(_) => None,
            Self::Flexible(data) => data.get(key),
        }
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self {
            Self::Empty => None,
            Self::One([(k, v)]) if k == key => Some(v),
            Self::One(_) => None,
            Self::Two([(k1, v1), _]) if key == k1 => Some(v1),
            Self::Two([_, (k2, v2)]) if key == k2 => Some(v2),
            Self::Two(_) => None,
            Self::Flexible(data) => data.get_mut(key),
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut out = None;
        *self = match std::mem::take(self) {
            Self::Empty => Self::Empty,
            Self::One([(k, v)]) => {
                if key == &k {
                    out = Some(v);
                    Self::Empty
                } else {
                    Self::One([(k, v)])
                }
            }
            Self::Two([(k1, v1), (k2, v2)]) => {
                if key == &k1 {
                    out = Some(v1);
                    Self::One([(k2, v2)])
                } else if key == &k2 {
                    out = Some(v2);
                    Self::One([(k1, v1)])
                } else {
                    Self::Two([(k1, v1), (k2, v2)])
                }
            }
            Self::Flexible(mut data) => {
                out = data.remove(key);
                Self::Flexible(data)
            }
        };
        out
    }

    pub fn insert(&mut self, key: K, value: V) {
        if let Some(existing) = self.get_mut(&key) {
            *existing = value;
            return;
        }
        *self = match std::mem::take(self) {
            Self::Empty => Self::One([(key, value)]),
            Self::One([(k, v)]) => Self::Two([(k, v), (key, value)]),
            Self::Two([(k1, v1), (k2, v2)]) => {
                let mut data = Map::default();
                data.insert(k1, v1);
                data.insert(k2, v2);
                data.insert(key, value);
                Self::Flexible(data)
            }
            Self::Flexible(mut data) => {
                data.insert(key, value);
                Self::Flexible(data)
            }
        };
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::One(_) => 1,
            Self::Two(_) => 2,
            Self::Flexible(data) => data.len(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        match self {
            Self::Empty => IterSmallMap::Inline([].iter()),
            Self::One(data) => IterSmallMap::Inline(data.iter()),
            Self::Two(data) => IterSmallMap::Inline(data.iter()),
            Self::Flexible(data) => IterSmallMap::Map(data.iter()),
        }
    }
}

impl<K: Clone + PartialEq + Eq + Hash, V: Clone> SmallMap<K, V> {
    /// Merge two maps. For every key present in both, `f` combines the two values,
    /// and the key is dropped when `f` returns `None`.
    pub fn merge<'b>(
        &mut self,
        map_2: impl Iterator<Item = (&'b K, &'b V)>,
        f: impl Fn(&V, &V) -> Option<V>,
    ) where
        K: 'b,
        V: 'b,
    {
        for (key, val) in map_2 {
            match self.get_mut(key) {
                None => {
                    self.insert(key.clone(), val.clone());
                }
                Some(v) => match f(v, val) {
                    None => {
                        self.remove(key);
                    }
                    Some(merged) => *v = merged,
                },
            }
        }
    }

    /// Copy of the entries in a regular map.
    pub fn as_map(&self) -> Map<K, V> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K, V> Default for SmallMap<K, V> {
    fn default() -> Self {
        Self::Empty
    }
}

enum IterSmallMap<'a, K, V> {
    Inline(std::slice::Iter<'a, (K, V)>),
    Map(std::collections::hash_map::Iter<'a, K, V>),
}

impl<'a, K: 'a, V: 'a> Iterator for IterSmallMap<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            IterSmallMap::Inline(inner) => inner.next().map(|(k, v)| (k, v)),
            IterSmallMap::Map(inner) => inner.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_and_shrinks() {
        let mut map = SmallMap::Empty;
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("a", 10);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a"), Some(&10));
        map.insert("c", 3);
        assert!(matches!(map, SmallMap::Flexible(_)));
        assert_eq!(map.remove(&"b"), Some(2));
        assert_eq!(map.get(&"b"), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn merge_combines_shared_keys() {
        let mut left = SmallMap::Two([("a", 1), ("b", 2)]);
        let right = SmallMap::Two([("b", 2), ("c", 5)]);
        left.merge(right.iter(), |l, r| if l == r { None } else { Some(l + r) });
        let merged = left.as_map();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("a"), Some(&1));
        assert_eq!(merged.get("c"), Some(&5));
    }
}
