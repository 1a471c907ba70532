//! # Qualifiers
//!
//! Sensitivity and lifetime metadata attached to a schema attribute.
//!
//! On the wire a qualifier set is an array of objects tagged by `type`:
//!
//! ```json
//! [{"type": "PII"}, {"type": "SHORT_LIVED", "ttlSeconds": 3600}]
//! ```
//!
//! The set holds at most one qualifier per [`QualifierType`]; order is
//! irrelevant. Deserialization rejects a `SHORT_LIVED` entry with a zero ttl.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// The kind of a qualifier, used as the set key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualifierType {
    /// Personally identifiable information.
    Pii,
    /// Must be encrypted at rest and in transit.
    Encrypted,
    /// Must not outlive its ttl.
    ShortLived,
}

impl QualifierType {
    /// Wire name of this qualifier kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pii => "PII",
            Self::Encrypted => "ENCRYPTED",
            Self::ShortLived => "SHORT_LIVED",
        }
    }
}

impl fmt::Display for QualifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single qualifier. Equality of `ShortLived` includes its ttl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Qualifier {
    Pii,
    Encrypted,
    ShortLived {
        #[serde(rename = "ttlSeconds")]
        ttl_seconds: u64,
    },
}

impl Qualifier {
    /// Build a `ShortLived` qualifier, rejecting a zero ttl.
    pub fn short_lived(ttl_seconds: u64) -> Result<Self, ModelError> {
        let q = Self::ShortLived { ttl_seconds };
        q.validate()?;
        Ok(q)
    }

    pub fn kind(&self) -> QualifierType {
        match self {
            Self::Pii => QualifierType::Pii,
            Self::Encrypted => QualifierType::Encrypted,
            Self::ShortLived { .. } => QualifierType::ShortLived,
        }
    }

    /// Check the payload invariants of this qualifier.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::ShortLived { ttl_seconds: 0 } => Err(ModelError::InvalidQualifier(
                "SHORT_LIVED ttlSeconds must be greater than zero".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortLived { ttl_seconds } => write!(f, "SHORT_LIVED({ttl_seconds}s)"),
            other => f.write_str(other.kind().as_str()),
        }
    }
}

/// A set of qualifiers keyed by [`QualifierType`].
///
/// Inserting a qualifier whose kind is already present replaces the
/// previous one, so a set never holds two `ShortLived` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Qualifier>", into = "Vec<Qualifier>")]
pub struct Qualifiers(BTreeMap<QualifierType, Qualifier>);

impl Qualifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a qualifier, returning the one it replaced, if any.
    pub fn insert(&mut self, qualifier: Qualifier) -> Option<Qualifier> {
        self.0.insert(qualifier.kind(), qualifier)
    }

    /// Builder-style insert.
    pub fn with(mut self, qualifier: Qualifier) -> Self {
        self.insert(qualifier);
        self
    }

    pub fn contains(&self, kind: QualifierType) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn get(&self, kind: QualifierType) -> Option<&Qualifier> {
        self.0.get(&kind)
    }

    /// Add every qualifier of `other` not already present by kind.
    pub fn merge(&mut self, other: &Qualifiers) {
        for (kind, qualifier) in &other.0 {
            self.0.entry(*kind).or_insert(*qualifier);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check every contained qualifier's payload.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.0.values().try_for_each(Qualifier::validate)
    }
}

impl FromIterator<Qualifier> for Qualifiers {
    fn from_iter<T: IntoIterator<Item = Qualifier>>(iter: T) -> Self {
        let mut set = Self::new();
        for q in iter {
            set.insert(q);
        }
        set
    }
}

impl TryFrom<Vec<Qualifier>> for Qualifiers {
    type Error = ModelError;

    fn try_from(value: Vec<Qualifier>) -> Result<Self, Self::Error> {
        let set: Qualifiers = value.into_iter().collect();
        set.validate()?;
        Ok(set)
    }
}

impl From<Qualifiers> for Vec<Qualifier> {
    fn from(value: Qualifiers) -> Self {
        value.0.into_values().collect()
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, q) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{q}")?;
        }
        f.write_str("}")
    }
}
