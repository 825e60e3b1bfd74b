use crate::{
    query::property::AuditProperty,
    value::{RevisionType, Value},
};
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, Not};

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

///
/// AuditCriterion
///
/// Restriction over logical properties. Property names are resolved when
/// the query compiles, against the alias of the node the criterion was
/// added to.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuditCriterion {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        property: AuditProperty,
        op: CompareOp,
        value: Value,
    },
    In {
        property: AuditProperty,
        values: Vec<Value>,
    },
    Between {
        property: AuditProperty,
        low: Value,
        high: Value,
    },
    IsNull(AuditProperty),
    IsNotNull(AuditProperty),
}

impl AuditCriterion {
    /// Number of leaf restrictions.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::And(items) | Self::Or(items) => items.iter().map(Self::leaf_count).sum(),
            Self::Not(inner) => inner.leaf_count(),
            _ => 1,
        }
    }
}

impl BitAnd for AuditCriterion {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        match self {
            Self::And(mut items) => {
                items.push(rhs);
                Self::And(items)
            }
            lhs => Self::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for AuditCriterion {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        match self {
            Self::Or(mut items) => {
                items.push(rhs);
                Self::Or(items)
            }
            lhs => Self::Or(vec![lhs, rhs]),
        }
    }
}

impl Not for AuditCriterion {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

///
/// PropertyRef
///
/// Method-based criterion builder bound to one logical property.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PropertyRef(AuditProperty);

impl PropertyRef {
    #[must_use]
    pub const fn new(property: AuditProperty) -> Self {
        Self(property)
    }

    #[must_use]
    pub const fn property(&self) -> &AuditProperty {
        &self.0
    }

    #[must_use]
    pub fn into_property(self) -> AuditProperty {
        self.0
    }

    fn compare(self, op: CompareOp, value: impl Into<Value>) -> AuditCriterion {
        AuditCriterion::Compare {
            property: self.0,
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> AuditCriterion {
        self.compare(CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(self, value: impl Into<Value>) -> AuditCriterion {
        self.compare(CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> AuditCriterion {
        self.compare(CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Value>) -> AuditCriterion {
        self.compare(CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> AuditCriterion {
        self.compare(CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Value>) -> AuditCriterion {
        self.compare(CompareOp::Gte, value)
    }

    /// SQL-style pattern match (`%` and `_` wildcards).
    #[must_use]
    pub fn like(self, pattern: impl Into<String>) -> AuditCriterion {
        self.compare(CompareOp::Like, Value::Text(pattern.into()))
    }

    #[must_use]
    pub fn in_list<I, V>(self, values: I) -> AuditCriterion
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        AuditCriterion::In {
            property: self.0,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> AuditCriterion {
        AuditCriterion::Between {
            property: self.0,
            low: low.into(),
            high: high.into(),
        }
    }

    #[must_use]
    pub fn is_null(self) -> AuditCriterion {
        AuditCriterion::IsNull(self.0)
    }

    #[must_use]
    pub fn is_not_null(self) -> AuditCriterion {
        AuditCriterion::IsNotNull(self.0)
    }
}

///
/// AuditEntity
///
/// Entry points for building criteria, orders and projections.
///

pub struct AuditEntity;

impl AuditEntity {
    #[must_use]
    pub fn property(name: impl Into<String>) -> PropertyRef {
        PropertyRef(AuditProperty::Field(name.into()))
    }

    /// Sole identifier field.
    #[must_use]
    pub const fn id() -> PropertyRef {
        PropertyRef(AuditProperty::Id(None))
    }

    /// One field of a composite identifier.
    #[must_use]
    pub fn id_field(name: impl Into<String>) -> PropertyRef {
        PropertyRef(AuditProperty::Id(Some(name.into())))
    }

    #[must_use]
    pub const fn revision_number() -> PropertyRef {
        PropertyRef(AuditProperty::RevisionNumber)
    }

    #[must_use]
    pub const fn revision_type() -> PropertyRef {
        PropertyRef(AuditProperty::RevisionType)
    }

    /// Rows whose modified flag for `name` is set.
    #[must_use]
    pub fn has_changed(name: impl Into<String>) -> AuditCriterion {
        PropertyRef(AuditProperty::ModifiedFlag(name.into())).eq(true)
    }

    /// Rows whose modified flag for `name` is clear.
    #[must_use]
    pub fn has_not_changed(name: impl Into<String>) -> AuditCriterion {
        PropertyRef(AuditProperty::ModifiedFlag(name.into())).eq(false)
    }

    /// Shorthand for a revision-type restriction.
    #[must_use]
    pub fn revision_type_is(kind: RevisionType) -> AuditCriterion {
        Self::revision_type().eq(kind)
    }
}
