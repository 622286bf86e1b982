use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Payload interpretation of a [`FeatureFlag::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlagType {
    Boolean,
    String,
    Number,
    Json,
}

impl FlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::Boolean => "BOOLEAN",
            FlagType::String => "STRING",
            FlagType::Number => "NUMBER",
            FlagType::Json => "JSON",
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named flag as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    pub key: String,
    pub enabled: bool,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Serialized payload, interpreted according to `flag_type`.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
}

impl FeatureFlag {
    pub fn new(key: impl Into<String>, flag_type: FlagType, enabled: bool) -> Self {
        let key = key.into();
        Self {
            display_name: key.clone(),
            key,
            enabled,
            description: None,
            value: None,
            flag_type,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The complete set of flags, indexed by key.
///
/// Built from any sequence of flags with last-write-wins on duplicate keys.
/// Flags with an empty key are dropped. Serializes as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FeatureFlag>", into = "Vec<FeatureFlag>")]
pub struct FlagSet {
    flags: BTreeMap<String, FeatureFlag>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FeatureFlag> {
        self.flags.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags in key order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureFlag> {
        self.flags.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<FeatureFlag> {
        self.flags.values().cloned().collect()
    }

    fn insert(&mut self, flag: FeatureFlag) {
        if flag.key.is_empty() {
            tracing::warn!(display_name = %flag.display_name, "dropping flag with empty key");
            return;
        }
        self.flags.insert(flag.key.clone(), flag);
    }
}

impl FromIterator<FeatureFlag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = FeatureFlag>>(iter: I) -> Self {
        let mut set = FlagSet::new();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl From<Vec<FeatureFlag>> for FlagSet {
    fn from(flags: Vec<FeatureFlag>) -> Self {
        flags.into_iter().collect()
    }
}

impl From<FlagSet> for Vec<FeatureFlag> {
    fn from(set: FlagSet) -> Self {
        set.flags.into_values().collect()
    }
}

impl IntoIterator for FlagSet {
    type Item = FeatureFlag;
    type IntoIter = std::collections::btree_map::IntoValues<String, FeatureFlag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.into_values()
    }
}
