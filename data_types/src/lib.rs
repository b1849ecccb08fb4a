//! Shared vocabulary types for the columnar storage engine: the attribute
//! type enumeration, the dynamically-typed value container used at column
//! boundaries, and tuple ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tuple id: the 0-based position of a tuple within a column.
///
/// Tids are positional, not stable. Removing a tuple renumbers every
/// later tuple down by one.
pub type Tid = usize;

/// The declared value type of a column attribute.
///
/// Recorded on a column at construction time. Floating point attributes are
/// deliberately absent: dictionary interning requires a total order over the
/// value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    String,
    Integer,
    UInteger,
    Boolean,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::UInteger => write!(f, "uinteger"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// An owned, dynamically-typed value as exchanged across the type-erased
/// column boundary.
///
/// Carries exactly one concrete value, or nothing at all (`Null`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnedValue {
    /// Represents an empty container: no value at all.
    Null,
    String(String),
    Integer(i64),
    UInteger(u64),
    Boolean(bool),
}

impl OwnedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The attribute type of the contained value, or `None` for `Null`.
    pub fn data_type(&self) -> Option<AttributeType> {
        match self {
            Self::Null => None,
            Self::String(_) => Some(AttributeType::String),
            Self::Integer(_) => Some(AttributeType::Integer),
            Self::UInteger(_) => Some(AttributeType::UInteger),
            Self::Boolean(_) => Some(AttributeType::Boolean),
        }
    }
}

impl fmt::Display for OwnedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::String(v) => v.fmt(f),
            Self::Integer(v) => v.fmt(f),
            Self::UInteger(v) => v.fmt(f),
            Self::Boolean(v) => v.fmt(f),
        }
    }
}

impl From<&str> for OwnedValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for OwnedValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for OwnedValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u64> for OwnedValue {
    fn from(v: u64) -> Self {
        Self::UInteger(v)
    }
}

impl From<bool> for OwnedValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}
