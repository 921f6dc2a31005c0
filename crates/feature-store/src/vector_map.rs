use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Path-keyed vectors that remember insertion order.
///
/// Corpus order drives tie-breaking during ranking, so it has to survive a save/load cycle:
/// serialization writes entries in insertion order and deserialization keeps document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorMap {
    entries: Vec<(String, Vec<f32>)>,
    positions: HashMap<String, usize>,
}

impl VectorMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: String, vector: Vec<f32>) -> Option<Vec<f32>> {
        if let Some(&pos) = self.positions.get(&key) {
            return Some(std::mem::replace(&mut self.entries[pos].1, vector));
        }
        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push((key, vector));
        None
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<f32>> {
        let pos = self.positions.remove(key)?;
        let (_, vector) = self.entries.remove(pos);
        for (_, slot) in self.positions.iter_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(vector)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.positions
            .get(key)
            .map(|&pos| self.entries[pos].1.as_slice())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries
            .iter()
            .map(|(key, vector)| (key.as_str(), vector.as_slice()))
    }
}

impl FromIterator<(String, Vec<f32>)> for VectorMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<f32>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, vector) in iter {
            map.insert(key, vector);
        }
        map
    }
}

impl Serialize for VectorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, vector) in &self.entries {
            map.serialize_entry(key, vector)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VectorMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VectorMapVisitor;

        impl<'de> Visitor<'de> for VectorMapVisitor {
            type Value = VectorMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of path to float array")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<VectorMap, A::Error> {
                let mut map = VectorMap::new();
                while let Some((key, vector)) = access.next_entry::<String, Vec<f32>>()? {
                    map.insert(key, vector);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(VectorMapVisitor)
    }
}
