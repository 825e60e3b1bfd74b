use crate::{
    error::InternalError,
    model::RelationKind,
    value::{FieldMap, Value},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Element
///
/// One flattened collection element. Equality and hashing are computed
/// from the owned value at comparison time.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Element {
    /// Set or bag member.
    Value(Value),

    /// List member with its position.
    Indexed { index: u64, value: Value },

    /// Map entry.
    Keyed { key: Value, value: Value },
}

impl Element {
    /// The element payload without its index or key.
    #[must_use]
    pub const fn value(&self) -> &Value {
        match self {
            Self::Value(value) | Self::Indexed { value, .. } | Self::Keyed { value, .. } => value,
        }
    }
}

///
/// CollectionSnapshot
///
/// Point-in-time contents of a collection-valued relation.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum CollectionSnapshot {
    Set(Vec<Value>),
    Bag(Vec<Value>),
    List(Vec<Value>),
    Map(BTreeMap<Value, Value>),
}

impl CollectionSnapshot {
    /// Empty snapshot of the given shape.
    #[must_use]
    pub const fn empty(kind: RelationKind) -> Self {
        match kind {
            RelationKind::Set => Self::Set(Vec::new()),
            RelationKind::Bag => Self::Bag(Vec::new()),
            RelationKind::List => Self::List(Vec::new()),
            RelationKind::Map => Self::Map(BTreeMap::new()),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        match self {
            Self::Set(_) => RelationKind::Set,
            Self::Bag(_) => RelationKind::Bag,
            Self::List(_) => RelationKind::List,
            Self::Map(_) => RelationKind::Map,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Set(values) | Self::Bag(values) | Self::List(values) => values.len(),
            Self::Map(entries) => entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into diffable elements.
    #[must_use]
    pub fn elements(&self) -> Vec<Element> {
        match self {
            Self::Set(values) | Self::Bag(values) => {
                values.iter().cloned().map(Element::Value).collect()
            }
            Self::List(values) => values
                .iter()
                .zip(0u64..)
                .map(|(value, index)| Element::Indexed {
                    index,
                    value: value.clone(),
                })
                .collect(),
            Self::Map(entries) => entries
                .iter()
                .map(|(key, value)| Element::Keyed {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

///
/// RelationValue
///
/// What the persistence runtime hands over for one relation property:
/// nothing, a plain (non-collection) value, or a live collection.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum RelationValue {
    #[default]
    Absent,
    Plain(Value),
    Collection(CollectionSnapshot),
}

impl RelationValue {
    #[must_use]
    pub const fn is_plain(&self) -> bool {
        matches!(self, Self::Plain(_))
    }

    // Plain-value view used by equality comparison; collections compare
    // by their elements.
    pub(crate) fn as_comparable(&self) -> Option<Comparable<'_>> {
        match self {
            Self::Absent | Self::Plain(Value::Null) => None,
            Self::Plain(value) => Some(Comparable::Plain(value)),
            Self::Collection(snapshot) => Some(Comparable::Collection(snapshot)),
        }
    }
}

impl From<CollectionSnapshot> for RelationValue {
    fn from(snapshot: CollectionSnapshot) -> Self {
        Self::Collection(snapshot)
    }
}

impl From<Option<CollectionSnapshot>> for RelationValue {
    fn from(snapshot: Option<CollectionSnapshot>) -> Self {
        snapshot.map_or(Self::Absent, Self::Collection)
    }
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Comparable<'a> {
    Plain(&'a Value),
    Collection(&'a CollectionSnapshot),
}

/// Extract the element sequence of a relation source.
///
/// Returns `None` for an absent relation; callers treat that as empty.
pub fn extract(
    kind: RelationKind,
    source: &RelationValue,
    relation: &str,
) -> Result<Option<Vec<Element>>, InternalError> {
    match source {
        RelationValue::Absent => Ok(None),
        RelationValue::Plain(value) => Err(InternalError::collection_invariant(format!(
            "relation '{relation}' expected a {kind} collection, found plain {} value",
            value.kind_label()
        ))),
        RelationValue::Collection(snapshot) if snapshot.kind() == kind => {
            Ok(Some(snapshot.elements()))
        }
        RelationValue::Collection(snapshot) => Err(InternalError::collection_invariant(format!(
            "relation '{relation}' expected a {kind} collection, found {}",
            snapshot.kind()
        ))),
    }
}

/// Encode the index/key part of an element plus its payload into `data`.
pub(crate) fn encode_element(
    descriptor: &crate::model::RelationDescriptor,
    data: &mut FieldMap,
    element: &Element,
) -> Result<(), InternalError> {
    let index_column = || {
        descriptor.index_column().ok_or_else(|| {
            InternalError::diff_corruption(format!(
                "relation '{}' of kind {} has no index column for positional elements",
                descriptor.name, descriptor.kind
            ))
        })
    };

    match element {
        Element::Value(_) => {}
        Element::Indexed { index, .. } => {
            data.insert(index_column()?, Value::Uint(*index));
        }
        Element::Keyed { key, .. } => {
            data.insert(index_column()?, key.clone());
        }
    }

    descriptor
        .element
        .encode_value(data, element.value(), &descriptor.name)
}
