//! Section storage used while building and after finalization.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use indexmap::IndexMap;

use super::value::Value;

/// Key of an entry in a creating-form section.
///
/// Keys written as `NAME_...` (or `NAME_…`) are sequential: they receive the
/// smallest free numeric suffix in their group during finalization. The
/// serial keeps insertion order unique until then.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum SectionKey {
    Plain(String),
    Sequential { group: String, serial: u64 },
}

impl SectionKey {
    pub fn display_name(&self) -> &str {
        match self {
            SectionKey::Plain(name) => name,
            SectionKey::Sequential { group, .. } => group,
        }
    }
}

/// Insertion-ordered mapping built while a section is still open.
#[derive(Debug, Clone, Default)]
pub(crate) struct CreatingSection {
    values: IndexMap<SectionKey, Value>,
}

/// Flat mapping produced by the finalizer.
pub type ResultingSection = HashMap<String, Value>;

/// Build list: closed sections in source order, merged at finalization.
pub(crate) type SectionList = Vec<(String, CreatingSection)>;

impl CreatingSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: SectionKey, value: Value) {
        self.values.insert(key, value);
    }

    pub fn set_plain(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(SectionKey::Plain(key.into()), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(&SectionKey::Plain(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(&SectionKey::Plain(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) {
        self.values.shift_remove(&SectionKey::Plain(name.to_string()));
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SectionKey, &Value)> {
        self.values.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&SectionKey, &mut Value)> {
        self.values.iter_mut()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&SectionKey, &Value) -> bool) {
        self.values.retain(|k, v| keep(k, v));
    }

    /// Order-independent hash of the key/value pairs, used to deduplicate
    /// includes by parameter set.
    pub fn fingerprint(&self) -> u64 {
        let mut ret = 0u64;
        for (key, value) in &self.values {
            let mut hasher = DefaultHasher::new();
            key.display_name().hash(&mut hasher);
            let mut r = hasher.finish();
            for piece in value.iter() {
                let mut h = DefaultHasher::new();
                piece.hash(&mut h);
                r = r.wrapping_mul(397) ^ h.finish();
            }
            ret ^= r;
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_order_independent() {
        let mut a = CreatingSection::new();
        a.set_plain("X", Value::single("1"));
        a.set_plain("Y", Value::single("2"));
        let mut b = CreatingSection::new();
        b.set_plain("Y", Value::single("2"));
        b.set_plain("X", Value::single("1"));
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = CreatingSection::new();
        c.set_plain("X", Value::single("1"));
        c.set_plain("Y", Value::single("3"));
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut s = CreatingSection::new();
        s.set_plain("B", Value::single("1"));
        s.set_plain("A", Value::single("2"));
        let keys: Vec<_> = s.iter().map(|(k, _)| k.display_name().to_string()).collect();
        assert_eq!(keys, ["B", "A"]);
    }
}
