//! Typed flag resolution over a cached [`FlagSet`] and the static [`Defaults`].
//!
//! A flag must be both present and enabled to override a typed default: a
//! disabled flag behaves as if it were absent for string, number and JSON
//! lookups. [`is_enabled`] always reports the cached enabled state.

use crate::defaults::Defaults;
use crate::flag::{FeatureFlag, FlagSet, FlagType};

fn active<'a>(flags: &'a FlagSet, key: &str, flag_type: FlagType) -> Option<&'a FeatureFlag> {
    flags
        .get(key)
        .filter(|flag| flag.enabled && flag.flag_type == flag_type)
}

pub fn is_enabled(flags: &FlagSet, defaults: &Defaults, key: &str, fallback: bool) -> bool {
    if let Some(flag) = flags.get(key) {
        return flag.enabled;
    }
    defaults.bool_default(key).unwrap_or(fallback)
}

pub fn get_string(flags: &FlagSet, defaults: &Defaults, key: &str, fallback: &str) -> String {
    if let Some(flag) = active(flags, key, FlagType::String) {
        return flag.value.clone().unwrap_or_else(|| fallback.to_string());
    }
    defaults
        .string_default(key)
        .unwrap_or(fallback)
        .to_string()
}

pub fn get_number(flags: &FlagSet, defaults: &Defaults, key: &str, fallback: f64) -> f64 {
    if let Some(flag) = active(flags, key, FlagType::Number) {
        return flag
            .value
            .as_deref()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(fallback);
    }
    defaults.number_default(key).unwrap_or(fallback)
}

/// Integer view of [`get_number`]; the floating result is truncated.
pub fn get_int(flags: &FlagSet, defaults: &Defaults, key: &str, fallback: i64) -> i64 {
    get_number(flags, defaults, key, fallback as f64) as i64
}

pub fn get_json(flags: &FlagSet, defaults: &Defaults, key: &str, fallback: &str) -> String {
    if let Some(flag) = active(flags, key, FlagType::Json) {
        return flag.value.clone().unwrap_or_else(|| fallback.to_string());
    }
    defaults
        .json_default(key)
        .unwrap_or_else(|| fallback.to_string())
}
