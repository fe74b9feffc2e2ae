//! Attribute dump decoding.
//!
//! The identity service describes a subject as a line-oriented dump:
//!
//! ```text
//! userdetails.token.id=AQIC5w...
//! userdetails.attribute.name=cn
//! userdetails.attribute.value=Alice
//! userdetails.attribute.name=mail
//! userdetails.attribute.value=alice@example.org
//! userdetails.attribute.value=a.smith@example.org
//! ```
//!
//! Each `name=` line starts an attribute; the `value=` lines that follow
//! belong to it. Every other line is ignored.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{SsoError, SsoResult};

const NAME_KEY: &str = "userdetails.attribute.name";
const VALUE_KEY: &str = "userdetails.attribute.value";

/// Value of a decoded attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Exactly one value line was seen.
    Single(String),
    /// Zero or several value lines were seen (or array-forcing was requested).
    Multi(Vec<String>),
}

impl AttributeValue {
    fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::Single(values.remove(0))
        } else {
            Self::Multi(values)
        }
    }

    /// Wrap a scalar in a one-element sequence; sequences are unchanged.
    pub fn into_multi(self) -> Self {
        match self {
            Self::Single(value) => Self::Multi(vec![value]),
            multi => multi,
        }
    }

    /// All values as a slice-like vector.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// The scalar value, if this attribute holds exactly one.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(_) => None,
        }
    }
}

/// Decoded attributes keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeMap {
    entries: BTreeMap<String, AttributeValue>,
}

impl AttributeMap {
    /// Decode an attribute dump.
    pub fn decode(body: &str) -> Self {
        let mut map = Self::default();
        let mut pending: Option<(String, Vec<String>)> = None;

        for line in body.split(|c: char| c == '\n' || c == '\r') {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            match key {
                NAME_KEY => {
                    if let Some((name, values)) = pending.take() {
                        map.insert(&name, values);
                    }
                    pending = Some((value.to_string(), Vec::new()));
                }
                VALUE_KEY => {
                    if let Some((_, values)) = pending.as_mut() {
                        values.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        if let Some((name, values)) = pending {
            map.insert(&name, values);
        }

        map
    }

    fn insert(&mut self, name: &str, values: Vec<String>) {
        if name.is_empty() {
            return;
        }
        self.entries
            .insert(name.to_lowercase(), AttributeValue::from_values(values));
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.get(&name.to_lowercase())
    }

    /// Look up one attribute.
    ///
    /// A missing attribute yields an empty string, or an empty sequence when
    /// `force_array` is set.
    pub fn attribute(&self, name: &str, force_array: bool) -> SsoResult<AttributeValue> {
        if name.is_empty() {
            return Err(SsoError::EmptyAttributeName);
        }

        let value = match self.get(name) {
            Some(value) => value.clone(),
            None if force_array => AttributeValue::Multi(Vec::new()),
            None => AttributeValue::Single(String::new()),
        };

        Ok(if force_array { value.into_multi() } else { value })
    }

    /// All attributes, optionally with every scalar wrapped in a sequence.
    pub fn all(&self, force_array: bool) -> BTreeMap<String, AttributeValue> {
        self.entries
            .iter()
            .map(|(name, value)| {
                let value = if force_array {
                    value.clone().into_multi()
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
