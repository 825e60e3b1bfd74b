use crate::model::relation::RelationDescriptor;
use serde::{Deserialize, Serialize};

///
/// EntityModel
/// Audit metadata for one versioned entity.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityModel {
    /// Stable entity name used in query construction and routing.
    pub name: String,

    /// Fields forming the entity identifier (stored under the original-id map).
    #[serde(default = "default_id_fields")]
    pub id_fields: Vec<String>,

    /// Plain audited columns.
    #[serde(default)]
    pub fields: Vec<String>,

    /// Single-valued relations, stored as the target's id column.
    #[serde(default)]
    pub to_one: Vec<ToOneModel>,

    /// Collection-valued relations, diffed into a middle audit entity.
    #[serde(default)]
    pub to_many: Vec<RelationDescriptor>,
}

fn default_id_fields() -> Vec<String> {
    vec!["id".to_string()]
}

impl EntityModel {
    /// Create a model with a single `id` identifier and no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_fields: default_id_fields(),
            fields: Vec::new(),
            to_one: Vec::new(),
            to_many: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_id_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    #[must_use]
    pub fn with_to_one(mut self, relation: ToOneModel) -> Self {
        self.to_one.push(relation);
        self
    }

    /// Attach a to-many relation, binding its owner to this entity.
    #[must_use]
    pub fn with_to_many(mut self, relation: RelationDescriptor) -> Self {
        self.to_many.push(relation.owned_by(&self.name));
        self
    }

    #[must_use]
    pub fn is_id_field(&self, name: &str) -> bool {
        self.id_fields.iter().any(|f| f == name)
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    #[must_use]
    pub fn to_one(&self, name: &str) -> Option<&ToOneModel> {
        self.to_one.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn to_many(&self, name: &str) -> Option<&RelationDescriptor> {
        self.to_many.iter().find(|r| r.name == name)
    }
}

///
/// ToOneModel
///
/// Single-valued relation. The audit row stores the target's identifier
/// under `<name>_<target_id_field>`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ToOneModel {
    pub name: String,
    pub target: String,
    #[serde(default = "default_target_id_field")]
    pub target_id_field: String,
}

fn default_target_id_field() -> String {
    "id".to_string()
}

impl ToOneModel {
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            target_id_field: default_target_id_field(),
        }
    }

    /// Column holding the related identifier.
    #[must_use]
    pub fn id_column(&self) -> String {
        format!("{}_{}", self.name, self.target_id_field)
    }
}
