use crate::{config::AuditConfiguration, query::QueryError};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// AuditProperty
///
/// Logical property reference. Turned into a physical row path by
/// `resolve_property`, the single rule shared by criteria, orders and
/// projections.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum AuditProperty {
    /// Audited column, id field, or to-one relation by name.
    Field(String),

    /// Identifier; `None` selects the sole id field.
    Id(Option<String>),

    RevisionNumber,
    RevisionType,

    /// Modified-flag column of the named property or relation.
    ModifiedFlag(String),
}

impl fmt::Display for AuditProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::Id(Some(field)) => write!(f, "id.{field}"),
            Self::Id(None) => write!(f, "id"),
            Self::RevisionNumber => write!(f, "revision number"),
            Self::RevisionType => write!(f, "revision type"),
            Self::ModifiedFlag(name) => write!(f, "{name} modified flag"),
        }
    }
}

/// Resolve `property` of `entity` to its physical path in audit rows.
pub fn resolve_property(
    config: &AuditConfiguration,
    entity: &str,
    property: &AuditProperty,
) -> Result<String, QueryError> {
    let model = config
        .entity(entity)
        .ok_or_else(|| QueryError::NotVersioned {
            entity: entity.to_string(),
        })?;
    let audit = config.audit();
    let unknown = || QueryError::UnknownProperty {
        entity: entity.to_string(),
        property: property.to_string(),
    };

    match property {
        AuditProperty::RevisionNumber => Ok(audit.revision_number_path()),
        AuditProperty::RevisionType => Ok(audit.revision_type_prop_name.clone()),

        AuditProperty::Id(Some(field)) if model.is_id_field(field) => Ok(audit.id_path(field)),
        AuditProperty::Id(Some(_)) => Err(unknown()),
        AuditProperty::Id(None) => match model.id_fields.as_slice() {
            [field] => Ok(audit.id_path(field)),
            _ => Err(QueryError::CompositeIdentifier {
                entity: entity.to_string(),
            }),
        },

        AuditProperty::Field(name) => {
            if model.is_id_field(name) {
                Ok(audit.id_path(name))
            } else if let Some(relation) = model.to_one(name) {
                Ok(relation.id_column())
            } else if model.has_field(name) {
                Ok(name.clone())
            } else {
                Err(unknown())
            }
        }

        AuditProperty::ModifiedFlag(name) => {
            let flagged = model.has_field(name)
                || model.to_one(name).is_some()
                || model.to_many(name).is_some_and(|r| r.modified_flag);

            if flagged {
                Ok(format!("{name}{}", audit.modified_flag_suffix))
            } else {
                Err(unknown())
            }
        }
    }
}
