//! Executor-facing query form.
//!
//! Everything here is resolved: property references are physical paths
//! qualified by a node alias, and nested joins carry their own predicates.
//! The structure serializes with serde and is stable across releases.

use crate::{
    query::{
        JoinKind, criteria::CompareOp, options::QueryOptions, order::OrderDirection,
        projection::ProjectionFunction,
    },
    value::{Revision, Value},
};
use serde::Serialize;

///
/// PropertyPath
/// Physical property path qualified by the alias of the node it belongs to.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct PropertyPath {
    pub alias: String,
    pub property: String,
}

impl PropertyPath {
    #[must_use]
    pub fn new(alias: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            property: property.into(),
        }
    }
}

///
/// RevisionBound
///
/// Upper bound of a revision-validity predicate: a fixed revision, or the
/// revision of another node's row.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum RevisionBound {
    Fixed(Revision),
    Property(PropertyPath),
}

///
/// CompiledPredicate
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum CompiledPredicate {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        path: PropertyPath,
        op: CompareOp,
        value: Value,
    },
    In {
        path: PropertyPath,
        values: Vec<Value>,
    },
    Between {
        path: PropertyPath,
        low: Value,
        high: Value,
    },
    IsNull {
        path: PropertyPath,
    },
    IsNotNull {
        path: PropertyPath,
    },

    /// For each identifier, keep only the row with the greatest revision
    /// not above `bound`.
    RevisionAsOf {
        revision: PropertyPath,
        id: Vec<PropertyPath>,
        bound: RevisionBound,
    },
}

///
/// CompiledOrder
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CompiledOrder {
    pub path: PropertyPath,
    pub direction: OrderDirection,
}

///
/// CompiledProjection
///
/// `path: None` selects the whole row of `alias`.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CompiledProjection {
    pub alias: String,
    pub path: Option<PropertyPath>,
    pub function: Option<ProjectionFunction>,
    pub distinct: bool,
}

///
/// CompiledJoin
///
/// Join from the parent node onto the audit entity of a related entity.
/// `on` pairs a parent path with the child path it must equal.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CompiledJoin {
    pub relation: String,
    pub kind: JoinKind,
    pub entity_name: String,
    pub alias: String,
    pub parent_alias: String,
    pub on: Vec<(PropertyPath, PropertyPath)>,
    pub predicates: Vec<CompiledPredicate>,
    pub joins: Vec<Self>,
}

impl CompiledJoin {
    fn count(&self) -> usize {
        1 + self.joins.iter().map(Self::count).sum::<usize>()
    }
}

///
/// CompiledQuery
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CompiledQuery {
    /// Physical audit entity queried at the root.
    pub entity_name: String,
    pub alias: String,
    pub predicates: Vec<CompiledPredicate>,
    pub joins: Vec<CompiledJoin>,

    /// Query-wide, in registration order across all nodes.
    pub orders: Vec<CompiledOrder>,

    /// Query-wide, in registration order across all nodes.
    pub projections: Vec<CompiledProjection>,
    pub options: QueryOptions,
}

impl CompiledQuery {
    /// Number of joins at every depth.
    #[must_use]
    pub fn join_count(&self) -> usize {
        self.joins.iter().map(CompiledJoin::count).sum()
    }

    /// Find a join anywhere in the tree by alias.
    #[must_use]
    pub fn join(&self, alias: &str) -> Option<&CompiledJoin> {
        fn find<'a>(joins: &'a [CompiledJoin], alias: &str) -> Option<&'a CompiledJoin> {
            joins.iter().find_map(|join| {
                if join.alias == alias {
                    Some(join)
                } else {
                    find(&join.joins, alias)
                }
            })
        }

        find(&self.joins, alias)
    }
}
