use crate::{
    config::AuditConfig,
    error::InternalError,
    value::{FieldMap, Value},
};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// RelationKind
///
/// Closed set of collection shapes. Selected at configuration time; the
/// snapshot extractor and element encoder dispatch on it.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Set,
    Bag,
    List,
    Map,
}

impl RelationKind {
    /// True when elements carry an explicit index or key column.
    #[must_use]
    pub const fn is_indexed(self) -> bool {
        matches!(self, Self::List | Self::Map)
    }

    const fn default_index_column(self) -> Option<&'static str> {
        match self {
            Self::List => Some("index"),
            Self::Map => Some("mapkey"),
            Self::Set | Self::Bag => None,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Set => "set",
            Self::Bag => "bag",
            Self::List => "list",
            Self::Map => "map",
        };
        write!(f, "{label}")
    }
}

///
/// ElementEncoding
///
/// How one collection element is written into an audit row.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementEncoding {
    /// Element value stored as-is in one column.
    Direct { field: String },

    /// Element is a reference to another entity; its identifier fields are
    /// stored under `prefix + field`.
    ForeignKey {
        #[serde(default = "default_fk_id_fields")]
        id_fields: Vec<String>,
        #[serde(default)]
        prefix: String,
    },
}

fn default_fk_id_fields() -> Vec<String> {
    vec!["id".to_string()]
}

impl ElementEncoding {
    /// Write `value` into `data`. Elements that cannot be encoded are
    /// reported as corruption; a skipped element would be a lost change.
    pub(crate) fn encode_value(
        &self,
        data: &mut FieldMap,
        value: &Value,
        relation: &str,
    ) -> Result<(), InternalError> {
        match self {
            Self::Direct { field } => {
                data.insert(field.clone(), value.clone());
                Ok(())
            }
            Self::ForeignKey { id_fields, prefix } => match value {
                Value::Map(ids) => {
                    for field in id_fields {
                        let id = ids.get(field).filter(|v| !v.is_null()).ok_or_else(|| {
                            InternalError::diff_corruption(format!(
                                "relation '{relation}' element is missing identifier field '{field}'"
                            ))
                        })?;
                        data.insert(format!("{prefix}{field}"), id.clone());
                    }
                    Ok(())
                }
                Value::Null => Err(InternalError::diff_corruption(format!(
                    "relation '{relation}' contains a null entity reference"
                ))),
                scalar if id_fields.len() == 1 => {
                    data.insert(format!("{prefix}{}", id_fields[0]), scalar.clone());
                    Ok(())
                }
                other => Err(InternalError::diff_corruption(format!(
                    "relation '{relation}' element of type {} cannot supply composite id {id_fields:?}",
                    other.kind_label()
                ))),
            },
        }
    }
}

///
/// RelationDescriptor
///
/// Static metadata for one collection-valued relation.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RelationDescriptor {
    /// Owning entity; filled in when the relation is attached to an entity.
    #[serde(default)]
    pub owner_entity: String,

    pub name: String,
    pub kind: RelationKind,

    /// Related versioned entity, when elements are entity references.
    #[serde(default)]
    pub target: Option<String>,

    pub element: ElementEncoding,

    /// Explicit middle (audit) entity name; derived from owner and relation
    /// name when unset.
    #[serde(default)]
    pub middle_entity: Option<String>,

    /// Prefix applied to owner id fields inside change records.
    #[serde(default)]
    pub owner_id_prefix: Option<String>,

    /// Column for list positions / map keys.
    #[serde(default)]
    pub index_column: Option<String>,

    /// Whether the owner's audit row carries a `<name><suffix>` modified flag.
    #[serde(default)]
    pub modified_flag: bool,
}

impl RelationDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: RelationKind, element: ElementEncoding) -> Self {
        Self {
            owner_entity: String::new(),
            name: name.into(),
            kind,
            target: None,
            element,
            middle_entity: None,
            owner_id_prefix: None,
            index_column: None,
            modified_flag: false,
        }
    }

    #[must_use]
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner_entity = owner.into();
        self
    }

    #[must_use]
    pub fn targeting(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_modified_flag(mut self) -> Self {
        self.modified_flag = true;
        self
    }

    #[must_use]
    pub fn with_index_column(mut self, column: impl Into<String>) -> Self {
        self.index_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_owner_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.owner_id_prefix = Some(prefix.into());
        self
    }

    /// Audit entity receiving this relation's change rows.
    #[must_use]
    pub fn middle_entity_name(&self, config: &AuditConfig) -> String {
        self.middle_entity.clone().unwrap_or_else(|| {
            config.audit_entity_name(&format!("{}_{}", self.owner_entity, self.name))
        })
    }

    #[must_use]
    pub fn owner_id_prefix(&self) -> String {
        self.owner_id_prefix
            .clone()
            .unwrap_or_else(|| format!("{}_", self.owner_entity))
    }

    #[must_use]
    pub fn index_column(&self) -> Option<String> {
        self.index_column
            .clone()
            .or_else(|| self.kind.default_index_column().map(str::to_string))
    }

    /// Modified-flag column on the owner's audit row, if enabled.
    #[must_use]
    pub fn modified_flag_column(&self, config: &AuditConfig) -> Option<String> {
        self.modified_flag
            .then(|| format!("{}{}", self.name, config.modified_flag_suffix))
    }
}
