//! Module: config
//! Responsibility: audit naming rules and the registry of versioned entities.
//! Does not own: diffing, query compilation, or row materialization.
//! Boundary: built once at startup, shared read-only afterwards.

use crate::model::{EntityModel, RelationDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid audit configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("entity '{name}' is configured more than once")]
    DuplicateEntity { name: String },

    #[error("entity '{entity}' declares relation '{relation}' more than once")]
    DuplicateRelation { entity: String, relation: String },

    #[error("entity '{entity}' has no identifier fields")]
    EmptyIdFields { entity: String },

    #[error("relation '{entity}.{relation}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        relation: String,
        target: String,
    },
}

///
/// AuditConfig
///
/// Naming rules shared by every audit entity.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    pub audit_table_prefix: String,
    pub audit_table_suffix: String,

    /// Name of the nested map holding id fields and the revision number.
    pub original_id_prop_name: String,

    pub revision_field_name: String,
    pub revision_type_prop_name: String,
    pub modified_flag_suffix: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            audit_table_prefix: String::new(),
            audit_table_suffix: "_AUD".to_string(),
            original_id_prop_name: "originalId".to_string(),
            revision_field_name: "REV".to_string(),
            revision_type_prop_name: "REVTYPE".to_string(),
            modified_flag_suffix: "_MOD".to_string(),
        }
    }
}

impl AuditConfig {
    /// Audit entity name for a primary entity name.
    #[must_use]
    pub fn audit_entity_name(&self, entity: &str) -> String {
        format!(
            "{}{entity}{}",
            self.audit_table_prefix, self.audit_table_suffix
        )
    }

    /// Path of the revision number inside an audit row.
    #[must_use]
    pub fn revision_number_path(&self) -> String {
        format!(
            "{}.{}",
            self.original_id_prop_name, self.revision_field_name
        )
    }

    /// Path of an identifier field inside an audit row.
    #[must_use]
    pub fn id_path(&self, field: &str) -> String {
        format!("{}.{field}", self.original_id_prop_name)
    }
}

// On-disk layout.
#[derive(Deserialize)]
struct RawConfiguration {
    #[serde(default)]
    audit: AuditConfig,
    #[serde(default)]
    entities: Vec<EntityModel>,
}

///
/// AuditConfiguration
///
/// Validated audit configuration: naming rules plus every versioned entity.
///

#[derive(Clone, Debug)]
pub struct AuditConfiguration {
    audit: AuditConfig,
    entities: BTreeMap<String, EntityModel>,
}

impl AuditConfiguration {
    /// Build and validate a configuration.
    pub fn new(
        audit: AuditConfig,
        entities: impl IntoIterator<Item = EntityModel>,
    ) -> Result<Self, ConfigError> {
        let mut by_name = BTreeMap::new();

        for mut entity in entities {
            if entity.id_fields.is_empty() {
                return Err(ConfigError::EmptyIdFields {
                    entity: entity.name,
                });
            }

            let mut seen = Vec::with_capacity(entity.to_many.len());
            for relation in &mut entity.to_many {
                if seen.contains(&relation.name) {
                    return Err(ConfigError::DuplicateRelation {
                        entity: entity.name.clone(),
                        relation: relation.name.clone(),
                    });
                }
                seen.push(relation.name.clone());
                relation.owner_entity.clone_from(&entity.name);
            }

            if by_name.contains_key(&entity.name) {
                return Err(ConfigError::DuplicateEntity { name: entity.name });
            }
            by_name.insert(entity.name.clone(), entity);
        }

        let config = Self {
            audit,
            entities: by_name,
        };
        config.validate_targets()?;

        Ok(config)
    }

    /// Parse and validate a TOML configuration document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawConfiguration = toml::from_str(source)?;

        Self::new(raw.audit, raw.entities)
    }

    fn validate_targets(&self) -> Result<(), ConfigError> {
        for entity in self.entities.values() {
            let to_one = entity
                .to_one
                .iter()
                .map(|r| (&r.name, Some(&r.target)));
            let to_many = entity
                .to_many
                .iter()
                .map(|r| (&r.name, r.target.as_ref()));

            for (relation, target) in to_one.chain(to_many) {
                if let Some(target) = target
                    && !self.entities.contains_key(target)
                {
                    return Err(ConfigError::UnknownTarget {
                        entity: entity.name.clone(),
                        relation: relation.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub const fn audit(&self) -> &AuditConfig {
        &self.audit
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityModel> {
        self.entities.get(name)
    }

    #[must_use]
    pub fn is_versioned(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    #[must_use]
    pub fn audit_entity_name(&self, entity: &str) -> String {
        self.audit.audit_entity_name(entity)
    }

    #[must_use]
    pub fn relation(&self, owner: &str, name: &str) -> Option<&RelationDescriptor> {
        self.entity(owner).and_then(|e| e.to_many(name))
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityModel> {
        self.entities.values()
    }
}

///
/// TESTS
///
