use serde::{Deserialize, Serialize};

/// Tree construction and evaluation options.
///
/// Deserializable from host configuration; every field has a default:
///
/// ```json
/// {"keyAttribute": "_key", "modeAttribute": "_mode",
///  "preserveWhitespace": false, "invalidateCacheOnSet": false}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Attribute naming a child inside its parent (`Key` path segment).
    #[serde(default = "default_key_attribute")]
    pub key_attribute: String,
    /// Attribute overriding a smart tag's mode (`isolation`/`coalescion`).
    #[serde(default = "default_mode_attribute")]
    pub mode_attribute: String,
    /// Keep whitespace-only text children instead of dropping them.
    #[serde(default)]
    pub preserve_whitespace: bool,
    /// Drop every cached evaluation when a variable is written.
    #[serde(default)]
    pub invalidate_cache_on_set: bool,
}

fn default_key_attribute() -> String {
    "_key".to_string()
}

fn default_mode_attribute() -> String {
    "_mode".to_string()
}

impl Default for Options {
    fn default() -> Self {
        Self {
            key_attribute: default_key_attribute(),
            mode_attribute: default_mode_attribute(),
            preserve_whitespace: false,
            invalidate_cache_on_set: false,
        }
    }
}

impl Options {
    pub fn is_reserved_attribute(&self, name: &str) -> bool {
        name == self.key_attribute || name == self.mode_attribute
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_fields() {
        let options: Options =
            serde_json::from_value(json!({"invalidateCacheOnSet": true})).expect("options");
        assert_eq!(options.key_attribute, "_key");
        assert_eq!(options.mode_attribute, "_mode");
        assert!(!options.preserve_whitespace);
        assert!(options.invalidate_cache_on_set);
        assert!(options.is_reserved_attribute("_key"));
        assert!(!options.is_reserved_attribute("class"));
    }
}
