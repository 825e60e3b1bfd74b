use crate::{
    Error,
    config::AuditConfiguration,
    error::InternalError,
    materialize::EntityInstantiator,
    query::{
        criteria::{AuditEntity, PropertyRef},
        property::AuditProperty,
    },
    response::QueryResult,
    value::{Revision, Value},
};
use serde::{Deserialize, Serialize};

///
/// ProjectionFunction
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ProjectionFunction {
    Count,
    CountDistinct,
    Min,
    Max,
    Sum,
    Avg,
}

///
/// AuditProjection
///
/// One selected output column. The projection both describes what the
/// executor must select and converts the raw value it returns.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuditProjection {
    Property {
        property: AuditProperty,
        distinct: bool,
    },
    Function {
        function: ProjectionFunction,
        property: AuditProperty,
    },

    /// Whole row of the node the projection was added to, materialized.
    Entity { distinct: bool },
}

impl AuditProjection {
    #[must_use]
    pub const fn function(&self) -> Option<ProjectionFunction> {
        match self {
            Self::Function { function, .. } => Some(*function),
            _ => None,
        }
    }

    #[must_use]
    pub const fn property(&self) -> Option<&AuditProperty> {
        match self {
            Self::Property { property, .. } | Self::Function { property, .. } => Some(property),
            Self::Entity { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        match self {
            Self::Property { distinct, .. } | Self::Entity { distinct } => *distinct,
            Self::Function { .. } => false,
        }
    }

    /// Convert one raw executor value for this projection.
    ///
    /// `entity_name` is the versioned entity of the node the projection
    /// belongs to; `revision` is the revision entities are materialized at.
    pub fn convert_query_result(
        &self,
        _config: &AuditConfiguration,
        instantiator: &EntityInstantiator<'_>,
        entity_name: &str,
        revision: Option<Revision>,
        raw: Value,
    ) -> Result<QueryResult, Error> {
        match self {
            Self::Entity { .. } => {
                if raw.is_null() {
                    return Ok(QueryResult::Value(Value::Null));
                }

                let found = raw.kind_label();
                let row = raw.into_map().ok_or_else(|| {
                    InternalError::materialize_corruption(format!(
                        "entity projection on '{entity_name}' expected a row, found {found}"
                    ))
                })?;
                let revision = revision.ok_or_else(|| {
                    InternalError::materialize_corruption(format!(
                        "audit row of '{entity_name}' carries no revision number"
                    ))
                })?;

                Ok(QueryResult::Entity(instantiator.create_instance(
                    entity_name,
                    row,
                    revision,
                )?))
            }
            Self::Property { .. } | Self::Function { .. } => Ok(QueryResult::Value(raw)),
        }
    }
}

impl PropertyRef {
    #[must_use]
    pub fn project(self) -> AuditProjection {
        AuditProjection::Property {
            property: self.into_property(),
            distinct: false,
        }
    }

    #[must_use]
    pub fn distinct(self) -> AuditProjection {
        AuditProjection::Property {
            property: self.into_property(),
            distinct: true,
        }
    }

    fn function(self, function: ProjectionFunction) -> AuditProjection {
        AuditProjection::Function {
            function,
            property: self.into_property(),
        }
    }

    #[must_use]
    pub fn count(self) -> AuditProjection {
        self.function(ProjectionFunction::Count)
    }

    #[must_use]
    pub fn count_distinct(self) -> AuditProjection {
        self.function(ProjectionFunction::CountDistinct)
    }

    #[must_use]
    pub fn min(self) -> AuditProjection {
        self.function(ProjectionFunction::Min)
    }

    #[must_use]
    pub fn max(self) -> AuditProjection {
        self.function(ProjectionFunction::Max)
    }

    #[must_use]
    pub fn sum(self) -> AuditProjection {
        self.function(ProjectionFunction::Sum)
    }

    #[must_use]
    pub fn avg(self) -> AuditProjection {
        self.function(ProjectionFunction::Avg)
    }
}

impl AuditEntity {
    /// Project the materialized entity of the current node.
    #[must_use]
    pub const fn selected_entity(distinct: bool) -> AuditProjection {
        AuditProjection::Entity { distinct }
    }
}
