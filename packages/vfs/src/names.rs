//! Directory name tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FsError, Result};

/// How a directory compares names.
///
/// Insensitive tables normalise names for comparison and storage keys only;
/// the name as given is what callers see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    pub fn normalize(self, name: &str) -> String {
        match self {
            CaseSensitivity::Sensitive => name.to_string(),
            CaseSensitivity::Insensitive => name.to_lowercase(),
        }
    }
}

/// Unique-name table for one directory.
///
/// Iteration order is by normalised key, so listings are deterministic.
#[derive(Clone, Debug)]
pub struct EntryTable<V> {
    policy: CaseSensitivity,
    entries: BTreeMap<String, (String, V)>,
}

impl<V> EntryTable<V> {
    pub fn new(policy: CaseSensitivity) -> Self {
        Self {
            policy,
            entries: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> CaseSensitivity {
        self.policy
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .get(&self.policy.normalize(name))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&self.policy.normalize(name))
    }

    /// Insert `value` under `name`, returning the value it replaced.
    pub fn insert(&mut self, name: &str, value: V) -> Option<V> {
        self.entries
            .insert(self.policy.normalize(name), (name.to_string(), value))
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.entries
            .remove(&self.policy.normalize(name))
            .map(|(_, v)| v)
    }

    /// Move the entry at `old` to `new`.
    ///
    /// Renaming to a name that differs only by case (in an insensitive
    /// table) updates the display name in place. Any other collision fails
    /// with `AlreadyExists` and leaves the table unchanged.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let old_key = self.policy.normalize(old);
        let new_key = self.policy.normalize(new);
        if old_key != new_key && self.entries.contains_key(&new_key) {
            return Err(FsError::AlreadyExists(new.to_string()));
        }
        let (_, value) = self
            .entries
            .remove(&old_key)
            .ok_or_else(|| FsError::NotFound(old.to_string()))?;
        self.entries.insert(new_key, (new.to_string(), value));
        Ok(())
    }

    /// Display name stored for `name`.
    pub fn display_name(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&self.policy.normalize(name))
            .map(|(display, _)| display.as_str())
    }

    /// `(display name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries
            .values()
            .map(|(display, v)| (display.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything, returning the values.
    pub fn drain(&mut self) -> Vec<V> {
        std::mem::take(&mut self.entries)
            .into_values()
            .map(|(_, v)| v)
            .collect()
    }
}

impl<V> Default for EntryTable<V> {
    fn default() -> Self {
        Self::new(CaseSensitivity::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_existing() {
        let mut table = EntryTable::new(CaseSensitivity::Sensitive);
        assert_eq!(table.insert("a", 1), None);
        assert_eq!(table.insert("a", 2), Some(1));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a"), Some(&2));
    }

    #[test]
    fn sensitive_names_are_distinct() {
        let mut table = EntryTable::new(CaseSensitivity::Sensitive);
        table.insert("Readme", 1);
        table.insert("README", 2);
        assert_eq!(table.len(), 2);
        assert!(table.get("readme").is_none());
    }

    #[test]
    fn insensitive_lookup_keeps_display_name() {
        let mut table = EntryTable::new(CaseSensitivity::Insensitive);
        table.insert("ReadMe.TXT", 1);
        assert_eq!(table.get("readme.txt"), Some(&1));
        assert_eq!(table.display_name("README.txt"), Some("ReadMe.TXT"));
        assert_eq!(table.insert("README.TXT", 2), Some(1));
        assert_eq!(table.len(), 1);
        let names: Vec<&str> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["README.TXT"]);
    }

    #[test]
    fn rename_rejects_collision() {
        let mut table = EntryTable::new(CaseSensitivity::Sensitive);
        table.insert("a", 1);
        table.insert("b", 2);
        assert!(matches!(
            table.rename("a", "b"),
            Err(FsError::AlreadyExists(_))
        ));
        assert_eq!(table.get("a"), Some(&1));
        table.rename("a", "c").unwrap();
        assert!(table.get("a").is_none());
        assert_eq!(table.get("c"), Some(&1));
        assert!(matches!(
            table.rename("zzz", "y"),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn case_only_rename_in_insensitive_table() {
        let mut table = EntryTable::new(CaseSensitivity::Insensitive);
        table.insert("notes", 1);
        table.rename("notes", "NOTES").unwrap();
        assert_eq!(table.display_name("notes"), Some("NOTES"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn iteration_is_ordered() {
        let mut table = EntryTable::default();
        table.insert("c", 3);
        table.insert("a", 1);
        table.insert("b", 2);
        let values: Vec<i32> = table.values().copied().collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(table.drain(), vec![1, 2, 3]);
        assert!(table.is_empty());
    }

    #[test]
    fn case_sensitivity_serde() {
        let json = serde_json::to_string(&CaseSensitivity::Insensitive).unwrap();
        assert_eq!(json, "\"insensitive\"");
    }
}
