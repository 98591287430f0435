//! Custom and event property payloads.
//!
//! Validation mirrors the limits the native SDKs enforce, so invalid entries are
//! rejected before they cross the native boundary instead of being dropped
//! silently on the other side.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Properties attached to a single tracked event.
pub type EventProperties = BTreeMap<String, String>;

/// Maximum number of distinct keys in one [`CustomProperties`] payload.
pub const MAX_PROPERTIES: usize = 60;
/// Maximum length (in characters) of a custom property key.
pub const MAX_PROPERTY_KEY_LENGTH: usize = 128;
/// Maximum length (in characters) of a custom property string value.
pub const MAX_PROPERTY_VALUE_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("custom property key {0:?} must start with a letter and contain only letters, digits, '-' or '_'")]
    InvalidKey(String),
    #[error("custom property key exceeds 128 characters")]
    KeyTooLong,
    #[error("value for custom property {0:?} exceeds 128 characters")]
    ValueTooLong(String),
    #[error("value for custom property {0:?} is not a finite number")]
    NonFiniteNumber(String),
    #[error("custom properties are limited to 60 keys")]
    TooMany,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

/// A pending change to one custom property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyChange {
    Set(PropertyValue),
    Clear,
}

/// Ordered set of custom property changes applied in one native call.
///
/// Setting or clearing a key that is already present replaces the earlier
/// change in place, so the payload keeps first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomProperties {
    entries: Vec<(String, PropertyChange)>,
}

impl CustomProperties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, logging and skipping the entry if it is invalid.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> &mut Self {
        let key = key.into();
        if let Err(err) = self.try_set(key.clone(), value) {
            tracing::warn!(key = %key, error = %err, "Dropping custom property");
        }
        self
    }

    /// Mark `key` for removal, logging and skipping the entry if it is invalid.
    pub fn clear(&mut self, key: impl Into<String>) -> &mut Self {
        let key = key.into();
        if let Err(err) = self.try_clear(key.clone()) {
            tracing::warn!(key = %key, error = %err, "Dropping custom property clear");
        }
        self
    }

    pub fn try_set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<&mut Self, PropertyError> {
        let key = key.into();
        validate_key(&key)?;
        let value = value.into();
        match &value {
            PropertyValue::String(s) if s.chars().count() > MAX_PROPERTY_VALUE_LENGTH => {
                return Err(PropertyError::ValueTooLong(key));
            }
            PropertyValue::Number(n) if !n.is_finite() => {
                return Err(PropertyError::NonFiniteNumber(key));
            }
            _ => {}
        }
        self.upsert(key, PropertyChange::Set(value))?;
        Ok(self)
    }

    pub fn try_clear(&mut self, key: impl Into<String>) -> Result<&mut Self, PropertyError> {
        let key = key.into();
        validate_key(&key)?;
        self.upsert(key, PropertyChange::Clear)?;
        Ok(self)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyChange> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, change)| change)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyChange)> {
        self.entries
            .iter()
            .map(|(key, change)| (key.as_str(), change))
    }

    fn upsert(&mut self, key: String, change: PropertyChange) -> Result<(), PropertyError> {
        if let Some(slot) = self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            slot.1 = change;
            return Ok(());
        }
        if self.entries.len() >= MAX_PROPERTIES {
            return Err(PropertyError::TooMany);
        }
        self.entries.push((key, change));
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<(), PropertyError> {
    if key.chars().count() > MAX_PROPERTY_KEY_LENGTH {
        return Err(PropertyError::KeyTooLong);
    }
    let mut chars = key.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_with_letter || !chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(PropertyError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CustomProperties, MAX_PROPERTIES, PropertyChange, PropertyError, PropertyValue};
    use chrono::{TimeZone, Utc};

    #[test]
    fn set_accepts_each_value_kind() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut props = CustomProperties::new();
        props
            .set("color", "blue")
            .set("score", 7_i64)
            .set("ratio", 0.5)
            .set("premium", true)
            .set("joined", date);

        assert_eq!(props.len(), 5);
        assert_eq!(
            props.get("color"),
            Some(&PropertyChange::Set(PropertyValue::String("blue".into())))
        );
        assert_eq!(
            props.get("score"),
            Some(&PropertyChange::Set(PropertyValue::Number(7.0)))
        );
        assert_eq!(
            props.get("joined"),
            Some(&PropertyChange::Set(PropertyValue::Date(date)))
        );
    }

    #[test]
    fn clear_replaces_earlier_set_in_place() {
        let mut props = CustomProperties::new();
        props.set("a", "1").set("b", "2").clear("a");

        let keys: Vec<_> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(props.get("a"), Some(&PropertyChange::Clear));
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let mut props = CustomProperties::new();
        assert_eq!(
            props.try_set("1abc", "x").unwrap_err(),
            PropertyError::InvalidKey("1abc".into())
        );
        assert!(props.try_set("has space", "x").is_err());
        assert!(props.try_set("", "x").is_err());
        assert_eq!(
            props.try_set("k".repeat(129), "x").unwrap_err(),
            PropertyError::KeyTooLong
        );
        assert!(props.try_set("valid-key_1", "x").is_ok());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut props = CustomProperties::new();
        assert_eq!(
            props.try_set("long", "v".repeat(129)).unwrap_err(),
            PropertyError::ValueTooLong("long".into())
        );
        assert_eq!(
            props.try_set("nan", f64::NAN).unwrap_err(),
            PropertyError::NonFiniteNumber("nan".into())
        );
        assert!(props.is_empty());
    }

    #[test]
    fn lenient_set_drops_invalid_entries() {
        let mut props = CustomProperties::new();
        props.set("ok", "1").set("not ok", "2");
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn key_limit_is_enforced_but_updates_still_allowed() {
        let mut props = CustomProperties::new();
        for i in 0..MAX_PROPERTIES {
            props.try_set(format!("key{i}"), "v").unwrap();
        }
        assert_eq!(
            props.try_set("overflow", "v").unwrap_err(),
            PropertyError::TooMany
        );
        assert!(props.try_set("key0", "updated").is_ok());
        assert_eq!(props.len(), MAX_PROPERTIES);
    }
}
