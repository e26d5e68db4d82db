//! Name Registry
//!
//! Maps symbolic input/output names to their resolved values so a later
//! rule can consume an earlier rule's output by name.
//!
//! The first registration of a name wins. Later attempts are ignored; a
//! conflicting value is reported at debug level only.

use std::collections::HashMap;

use log::debug;

use super::model::EntryValue;

/// Registry of resolved names for one generation pass.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    entries: HashMap<String, EntryValue>,
    /// Names in registration order
    order: Vec<String>,
}

impl NameRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `name` unless the name is already taken.
    ///
    /// Returns true if the value was inserted. Empty values are never
    /// registered.
    pub fn register(&mut self, name: &str, value: EntryValue) -> bool {
        if value.is_empty() {
            return false;
        }

        if let Some(existing) = self.entries.get(name) {
            if *existing != value {
                debug!(
                    "Name '{}' already registered as '{}', ignoring '{}'",
                    name,
                    existing.text(),
                    value.text()
                );
            }
            return false;
        }

        self.entries.insert(name.to_string(), value);
        self.order.push(name.to_string());
        true
    }

    /// Returns the value registered under `name`.
    pub fn resolve(&self, name: &str) -> Option<&EntryValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in the order they were first seen.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(s: &str) -> EntryValue {
        EntryValue::Quoted(s.to_string())
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = NameRegistry::new();
        assert!(registry.register("bam", quoted("out/a.bam")));
        assert_eq!(registry.resolve("bam"), Some(&quoted("out/a.bam")));
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = NameRegistry::new();
        assert!(registry.register("bam", quoted("first.bam")));
        assert!(!registry.register("bam", quoted("second.bam")));

        assert_eq!(registry.resolve("bam").unwrap().text(), "first.bam");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_same_value_twice() {
        let mut registry = NameRegistry::new();
        registry.register("x", quoted("a"));
        assert!(!registry.register("x", quoted("a")));
        assert_eq!(registry.names(), &["x".to_string()]);
    }

    #[test]
    fn test_empty_values_are_not_registered() {
        let mut registry = NameRegistry::new();
        assert!(!registry.register("x", EntryValue::Empty));
        assert!(!registry.contains("x"));

        // A later real value can still claim the name
        assert!(registry.register("x", quoted("a")));
    }

    #[test]
    fn test_registration_order() {
        let mut registry = NameRegistry::new();
        registry.register("c", quoted("3"));
        registry.register("a", quoted("1"));
        registry.register("b", EntryValue::Raw("f(x)".to_string()));

        assert_eq!(registry.names(), &["c", "a", "b"]);
        assert!(!registry.is_empty());
    }
}
