//! Common types for address-formatter.

use std::collections::BTreeMap;
use std::fmt;

/// Canonical component names the formatting pipeline reads or writes.
pub mod names {
    /// Synthesized venue/POI line built from unknown components.
    pub const ATTENTION: &str = "attention";
    /// City
    pub const CITY: &str = "city";
    /// Country display name
    pub const COUNTRY: &str = "country";
    /// ISO 3166-1 alpha-2 country code
    pub const COUNTRY_CODE: &str = "country_code";
    /// County
    pub const COUNTY: &str = "county";
    /// County code
    pub const COUNTY_CODE: &str = "county_code";
    /// Ambiguous district, reclassified during normalization
    pub const DISTRICT: &str = "district";
    /// Neighbourhood
    pub const NEIGHBOURHOOD: &str = "neighbourhood";
    /// Postcode
    pub const POSTCODE: &str = "postcode";
    /// Road/street
    pub const ROAD: &str = "road";
    /// State/province
    pub const STATE: &str = "state";
    /// State code
    pub const STATE_CODE: &str = "state_code";
    /// State district
    pub const STATE_DISTRICT: &str = "state_district";
}

/// A set of named address components (road, city, postcode, ...).
///
/// Keys are case-sensitive. Iteration is in sorted key order, so every
/// stage that walks the map (attention synthesis, replacement rules)
/// behaves the same from run to run.
///
/// # Examples
///
/// ```rust
/// use address_formatter::Components;
///
/// let components: Components = [
///     ("road", "Avenue Gustave Eiffel"),
///     ("city", "Paris"),
///     ("country_code", "fr"),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(components.get("city"), Some("Paris"));
/// assert!(!components.contains("postcode"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Components {
    values: BTreeMap<String, String>,
}

impl Components {
    /// Create an empty component set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build components from a parsed YAML mapping.
    ///
    /// Strings are taken verbatim, numbers and booleans are stringified and
    /// nested values are serialized back to YAML text. `null` values are
    /// treated as absent. Anything other than a mapping yields an empty set.
    pub fn from_yaml(value: &serde_yaml::Value) -> Self {
        let mut components = Self::new();
        if let serde_yaml::Value::Mapping(mapping) = value {
            for (key, value) in mapping {
                let (Some(key), Some(value)) = (scalar_to_string(key), scalar_to_string(value))
                else {
                    continue;
                };
                components.insert(key, value);
            }
        }
        components
    }

    /// Get a component value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether a component is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set a component, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl fmt::Display) -> Option<String> {
        self.values.insert(name.into(), value.to_string())
    }

    /// Remove a component, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    /// Keep only the components for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.values.retain(|name, value| keep(name, value));
    }

    /// Iterate over component names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Mutable access to every value, in sorted name order.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut String)> {
        self.values.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no components.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Components
where
    K: Into<String>,
    V: fmt::Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut components = Self::new();
        for (key, value) in iter {
            components.insert(key, value);
        }
        components
    }
}

impl<K, V> Extend<(K, V)> for Components
where
    K: Into<String>,
    V: fmt::Display,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl From<BTreeMap<String, String>> for Components {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl From<std::collections::HashMap<String, String>> for Components {
    fn from(values: std::collections::HashMap<String, String>) -> Self {
        values.into_iter().collect()
    }
}

/// Coerce a YAML value to text. Returns `None` for `null`.
pub(crate) fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;

    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        other => serde_yaml::to_string(other)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_from_iter_coerces_values() {
        let components: Components = [("house_number", 17), ("postcode", 75007)]
            .into_iter()
            .collect();

        assert_eq!(components.get("house_number"), Some("17"));
        assert_eq!(components.get("postcode"), Some("75007"));
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn test_components_iterate_in_sorted_order() {
        let components: Components = [("road", "a"), ("city", "b"), ("attention", "c")]
            .into_iter()
            .collect();

        let names: Vec<_> = components.names().collect();
        assert_eq!(names, vec!["attention", "city", "road"]);
    }

    #[test]
    fn test_components_from_yaml() {
        let yaml: serde_yaml::Value = serde_yaml::from_str(
            "road: Main St\nhouse_number: 12\npostcode: ~\nverified: true\n",
        )
        .unwrap();

        let components = Components::from_yaml(&yaml);
        assert_eq!(components.get("road"), Some("Main St"));
        assert_eq!(components.get("house_number"), Some("12"));
        assert_eq!(components.get("verified"), Some("true"));
        assert!(!components.contains("postcode"));
    }

    #[test]
    fn test_components_from_non_mapping_is_empty() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("- a\n- b\n").unwrap();
        assert!(Components::from_yaml(&yaml).is_empty());
    }
}
