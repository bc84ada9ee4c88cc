//! Ordered maps with unique keys.

use indexmap::IndexMap;

use super::Value;

/// An insertion-ordered Sass map. Keys compare by [`Value::key`], so `a`
/// and `"a"` are the same key; the last write wins.
#[derive(Debug, Clone, Default)]
pub struct SassMap {
    entries: IndexMap<String, (Value, Value)>,
}

impl SassMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: Value, value: Value) {
        let canonical = key.key();
        match self.entries.get_mut(&canonical) {
            Some(slot) => slot.1 = value,
            None => {
                self.entries.insert(canonical, (key, value));
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(&key.key()).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(&key.key())
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.entries.shift_remove(&key.key()).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.values().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.values().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values().map(|(_, v)| v)
    }

    /// Entries of `other` override and extend `self`.
    pub fn merged(&self, other: &SassMap) -> SassMap {
        let mut result = self.clone();
        for (k, v) in other.iter() {
            result.insert(k.clone(), v.clone());
        }
        result
    }

    /// Like [`SassMap::merged`], but nested maps present on both sides are
    /// merged recursively.
    pub fn deep_merged(&self, other: &SassMap) -> SassMap {
        let mut result = self.clone();
        for (k, v) in other.iter() {
            let merged = match (result.get(k), v) {
                (Some(Value::Map(left)), Value::Map(right)) => Value::Map(left.deep_merged(right)),
                _ => v.clone(),
            };
            result.insert(k.clone(), merged);
        }
        result
    }
}

impl FromIterator<(Value, Value)> for SassMap {
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> Self {
        let mut map = SassMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl PartialEq for SassMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_and_unquoted_keys_collide() {
        let mut map = SassMap::new();
        map.insert(Value::unquoted("a"), Value::number(1.0));
        map.insert(Value::quoted("a"), Value::number(2.0));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Value::unquoted("a")), Some(&Value::number(2.0)));
    }

    #[test]
    fn test_deep_merge() {
        let inner_a: SassMap = [(Value::unquoted("x"), Value::number(1.0))].into_iter().collect();
        let inner_b: SassMap = [(Value::unquoted("y"), Value::number(2.0))].into_iter().collect();
        let a: SassMap = [(Value::unquoted("k"), Value::Map(inner_a))].into_iter().collect();
        let b: SassMap = [(Value::unquoted("k"), Value::Map(inner_b))].into_iter().collect();
        let merged = a.deep_merged(&b);
        let Some(Value::Map(inner)) = merged.get(&Value::unquoted("k")) else {
            panic!("expected nested map");
        };
        assert_eq!(inner.len(), 2);
    }
}
