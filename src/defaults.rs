use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::flag::{FeatureFlag, FlagSet, FlagType};

/// Description attached to every flag synthesized from a default.
pub const FALLBACK_DESCRIPTION: &str = "Fallback default";

/// Static defaults supplied once at initialization.
///
/// Values may be booleans, numbers, strings or any structured JSON value.
/// They are consulted only when neither the remote source nor a cache
/// knows about a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    values: BTreeMap<String, Value>,
}

impl Defaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn bool_default(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn string_default(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn number_default(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Any default that is neither boolean nor numeric. Strings are returned
    /// raw, everything else as compact JSON text.
    pub fn json_default(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::Bool(_) | Value::Number(_) => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Converts every default into a synthesized flag.
    pub fn to_flag_set(&self) -> FlagSet {
        self.values
            .iter()
            .map(|(key, value)| coerce(key, value))
            .collect()
    }
}

fn coerce(key: &str, value: &Value) -> FeatureFlag {
    let (flag_type, serialized) = match value {
        Value::Bool(_) => (FlagType::Boolean, None),
        Value::Number(n) => (FlagType::Number, Some(n.to_string())),
        Value::String(s) => (FlagType::String, Some(s.clone())),
        other => (FlagType::Json, Some(other.to_string())),
    };

    // Only a literal `false` switches a default off.
    let enabled = !matches!(value, Value::Bool(false));

    FeatureFlag {
        key: key.to_string(),
        enabled,
        display_name: key.to_string(),
        description: Some(FALLBACK_DESCRIPTION.to_string()),
        value: serialized,
        flag_type,
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Defaults {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut defaults = Defaults::new();
        for (key, value) in iter {
            defaults.insert(key, value);
        }
        defaults
    }
}

impl From<HashMap<String, Value>> for Defaults {
    fn from(map: HashMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_false_default_is_disabled_boolean() {
        let set = Defaults::new().with("flag", false).to_flag_set();
        let flag = set.get("flag").unwrap();
        assert_eq!(flag.flag_type, FlagType::Boolean);
        assert!(!flag.enabled);
        assert_eq!(flag.value, None);
    }

    #[test]
    fn test_mixed_defaults_coerce_by_type() {
        let set = Defaults::new()
            .with("x", true)
            .with("y", 5)
            .with("z", "hi")
            .to_flag_set();
        assert_eq!(set.len(), 3);

        let x = set.get("x").unwrap();
        assert_eq!((x.flag_type, x.enabled, x.value.clone()), (FlagType::Boolean, true, None));

        let y = set.get("y").unwrap();
        assert_eq!(y.flag_type, FlagType::Number);
        assert!(y.enabled);
        assert_eq!(y.value.as_deref(), Some("5"));

        let z = set.get("z").unwrap();
        assert_eq!(z.flag_type, FlagType::String);
        assert!(z.enabled);
        assert_eq!(z.value.as_deref(), Some("hi"));

        for flag in set.iter() {
            assert_eq!(flag.display_name, flag.key);
            assert_eq!(flag.description.as_deref(), Some(FALLBACK_DESCRIPTION));
        }
    }

    #[test]
    fn test_structured_default_becomes_json() {
        let set = Defaults::new()
            .with("limits", json!({"max": 3}))
            .with("zero", 0)
            .with("empty", "")
            .to_flag_set();

        let limits = set.get("limits").unwrap();
        assert_eq!(limits.flag_type, FlagType::Json);
        assert_eq!(limits.value.as_deref(), Some(r#"{"max":3}"#));
        assert!(limits.enabled);

        // zero and empty string are not the "off" sentinel
        assert!(set.get("zero").unwrap().enabled);
        assert!(set.get("empty").unwrap().enabled);
    }

    #[test]
    fn test_fractional_number_keeps_its_text() {
        let set = Defaults::new().with("ratio", 0.25).to_flag_set();
        assert_eq!(set.get("ratio").unwrap().value.as_deref(), Some("0.25"));
    }

    #[test]
    fn test_typed_lookups() {
        let defaults = Defaults::new()
            .with("on", true)
            .with("n", 7)
            .with("s", "text")
            .with("obj", json!(["a", "b"]));

        assert_eq!(defaults.bool_default("on"), Some(true));
        assert_eq!(defaults.bool_default("n"), None);
        assert_eq!(defaults.number_default("n"), Some(7.0));
        assert_eq!(defaults.number_default("s"), None);
        assert_eq!(defaults.string_default("s"), Some("text"));
        assert_eq!(defaults.json_default("s").as_deref(), Some("text"));
        assert_eq!(defaults.json_default("obj").as_deref(), Some(r#"["a","b"]"#));
        assert_eq!(defaults.json_default("on"), None);
        assert_eq!(defaults.json_default("n"), None);
        assert_eq!(defaults.json_default("missing"), None);
    }

    #[test]
    fn test_from_hash_map() {
        let map = HashMap::from([("a".to_string(), json!(true))]);
        let defaults = Defaults::from(map);
        assert_eq!(defaults.len(), 1);
        assert!(!defaults.is_empty());
    }
}
