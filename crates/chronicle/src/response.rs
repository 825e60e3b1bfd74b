use crate::{
    materialize::HistoricalEntity,
    value::{Revision, RevisionType, Value},
};
use thiserror::Error as ThisError;

///
/// ResponseError
///
/// Errors related to interpreting a materialized result set.
///

#[derive(Debug, ThisError)]
pub enum ResponseError {
    #[error("expected at most one result for {entity}, found {count}")]
    NonUniqueResult { entity: String, count: usize },

    #[error("expected {expected} result, found {found}")]
    UnexpectedResult {
        expected: &'static str,
        found: &'static str,
    },
}

///
/// QueryResult
/// One post-processed query result.
///

#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Entity(HistoricalEntity),
    Value(Value),
    Tuple(Vec<Self>),
}

impl QueryResult {
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Entity(_) => "entity",
            Self::Value(_) => "value",
            Self::Tuple(_) => "tuple",
        }
    }

    #[must_use]
    pub const fn as_entity(&self) -> Option<&HistoricalEntity> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_tuple(&self) -> Option<&[Self]> {
        match self {
            Self::Tuple(slots) => Some(slots),
            _ => None,
        }
    }

    fn unexpected(&self, expected: &'static str) -> ResponseError {
        ResponseError::UnexpectedResult {
            expected,
            found: self.kind_label(),
        }
    }
}

///
/// FromQueryResult
/// Typed extraction used by `get_result_list_as` / `get_single_result_as`.
///

pub trait FromQueryResult: Sized {
    fn from_query_result(result: QueryResult) -> Result<Self, ResponseError>;
}

impl FromQueryResult for QueryResult {
    fn from_query_result(result: QueryResult) -> Result<Self, ResponseError> {
        Ok(result)
    }
}

impl FromQueryResult for HistoricalEntity {
    fn from_query_result(result: QueryResult) -> Result<Self, ResponseError> {
        match result {
            QueryResult::Entity(entity) => Ok(entity),
            other => Err(other.unexpected("entity")),
        }
    }
}

impl FromQueryResult for Value {
    fn from_query_result(result: QueryResult) -> Result<Self, ResponseError> {
        match result {
            QueryResult::Value(value) => Ok(value),
            other => Err(other.unexpected("value")),
        }
    }
}

impl FromQueryResult for Vec<QueryResult> {
    fn from_query_result(result: QueryResult) -> Result<Self, ResponseError> {
        match result {
            QueryResult::Tuple(slots) => Ok(slots),
            other => Err(other.unexpected("tuple")),
        }
    }
}

impl FromQueryResult for Revision {
    fn from_query_result(result: QueryResult) -> Result<Self, ResponseError> {
        match &result {
            QueryResult::Value(value) => {
                Self::from_value(value).ok_or_else(|| result.unexpected("revision number"))
            }
            _ => Err(result.unexpected("revision number")),
        }
    }
}

impl FromQueryResult for RevisionType {
    fn from_query_result(result: QueryResult) -> Result<Self, ResponseError> {
        match &result {
            QueryResult::Value(value) => {
                Self::from_value(value).ok_or_else(|| result.unexpected("revision type"))
            }
            _ => Err(result.unexpected("revision type")),
        }
    }
}

impl FromQueryResult for u64 {
    fn from_query_result(result: QueryResult) -> Result<Self, ResponseError> {
        match &result {
            QueryResult::Value(Value::Uint(n)) => Ok(*n),
            QueryResult::Value(Value::Int(n)) => {
                Self::try_from(*n).map_err(|_| result.unexpected("unsigned integer"))
            }
            _ => Err(result.unexpected("unsigned integer")),
        }
    }
}
