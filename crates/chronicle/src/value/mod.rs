
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

///
/// FieldMap
///
/// Opaque field-to-value map used for composite ids, encoded elements and
/// raw audit rows. Ordered so that equal maps hash and compare identically.
///

pub type FieldMap = BTreeMap<String, Value>;

///
/// Value
///
/// Owned, hashable, totally ordered field value.
///
/// Null  -> absent field / SQL NULL.
/// List  -> ordered sequence; also used for projection tuples.
/// Map   -> nested composite value (ids, embedded components).
///

#[derive(
    Clone, Debug, Default, Deserialize, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
    Blob(Vec<u8>),
    List(Vec<Self>),
    Map(FieldMap),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&FieldMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_map(self) -> Option<FieldMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_list(self) -> Option<Vec<Self>> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// Short type label used in error messages.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Uint(u64::from(value))
    }
}

impl From<Revision> for Value {
    fn from(value: Revision) -> Self {
        Self::Uint(value.get())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

///
/// Revision
///
/// Opaque, totally ordered identifier stamping one committed unit of change.
///

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[display("rev#{_0}")]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Interpret a stored revision column value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uint(n) => Some(Self(*n)),
            Value::Int(n) => u64::try_from(*n).ok().map(Self),
            _ => None,
        }
    }
}

///
/// RevisionType
///
/// Kind of change recorded in an audit row.
/// Discriminants are the persisted codes.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(u8)]
pub enum RevisionType {
    Added = 0,
    Modified = 1,
    Deleted = 2,
}

impl RevisionType {
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Added),
            1 => Some(Self::Modified),
            2 => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Decode the revision-type column of a raw row.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uint(n) => u8::try_from(*n).ok().and_then(Self::from_code),
            Value::Int(n) => u8::try_from(*n).ok().and_then(Self::from_code),
            _ => None,
        }
    }
}

impl From<RevisionType> for Value {
    fn from(value: RevisionType) -> Self {
        Self::Uint(u64::from(value.code()))
    }
}

impl fmt::Display for RevisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Added => "ADD",
            Self::Modified => "MOD",
            Self::Deleted => "DEL",
        };
        write!(f, "{label}")
    }
}

/// Build a `FieldMap` from `(name, value)` pairs.
pub fn field_map<I, K, V>(pairs: I) -> FieldMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
