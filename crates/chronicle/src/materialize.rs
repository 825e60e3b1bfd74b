//! Module: materialize
//! Responsibility: turn raw audit rows into historical entity values.
//! Does not own: query post-processing order (see `query::execute`).
//! Boundary: rows in, `HistoricalEntity` out; lazy collections attached here.

use crate::{
    Error,
    collection::{CollectionSnapshot, HistoricalCollection, build_historical_collection},
    error::InternalError,
    reader::AuditReader,
    value::{FieldMap, Revision, RevisionType, Value},
};
use std::{collections::BTreeMap, sync::Arc};

///
/// HistoricalEntity
///
/// State of one entity as recorded at `revision`. To-many relations are
/// lazy handles pinned to the same revision and identifier.
///

#[derive(Clone, Debug)]
pub struct HistoricalEntity {
    entity_name: String,
    id: FieldMap,
    revision: Revision,
    revision_type: Option<RevisionType>,
    fields: FieldMap,
    relations: BTreeMap<String, Arc<HistoricalCollection>>,
}

impl HistoricalEntity {
    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Identifier fields, without revision metadata.
    #[must_use]
    pub const fn id(&self) -> &FieldMap {
        &self.id
    }

    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    #[must_use]
    pub const fn revision_type(&self) -> Option<RevisionType> {
        self.revision_type
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.revision_type == Some(RevisionType::Deleted)
    }

    #[must_use]
    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&HistoricalCollection> {
        self.relations.get(name).map(Arc::as_ref)
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Resolve a to-many relation; `None` if no handle is attached.
    pub fn collection(&self, name: &str) -> Option<Result<Arc<CollectionSnapshot>, Error>> {
        self.relations.get(name).map(|handle| handle.get())
    }
}

// relation handles compare by name only
impl PartialEq for HistoricalEntity {
    fn eq(&self, other: &Self) -> bool {
        self.entity_name == other.entity_name
            && self.id == other.id
            && self.revision == other.revision
            && self.revision_type == other.revision_type
            && self.fields == other.fields
            && self.relations.keys().eq(other.relations.keys())
    }
}

///
/// EntityInstantiator
///

pub struct EntityInstantiator<'r> {
    reader: &'r AuditReader,
}

impl<'r> EntityInstantiator<'r> {
    #[must_use]
    pub const fn new(reader: &'r AuditReader) -> Self {
        Self { reader }
    }

    /// Build the historical state of `entity` from one audit row.
    pub fn create_instance(
        &self,
        entity: &str,
        mut row: FieldMap,
        revision: Revision,
    ) -> Result<HistoricalEntity, InternalError> {
        let config = self.reader.configuration();
        let audit = config.audit();
        let model = config.entity(entity).ok_or_else(|| {
            InternalError::query_invariant(format!("cannot materialize unversioned '{entity}'"))
        })?;

        let mut id = row
            .remove(&audit.original_id_prop_name)
            .and_then(Value::into_map)
            .ok_or_else(|| {
                InternalError::materialize_corruption(format!(
                    "audit row of '{entity}' has no '{}' map",
                    audit.original_id_prop_name
                ))
            })?;
        id.remove(&audit.revision_field_name);

        if let Some(missing) = model.id_fields.iter().find(|f| !id.contains_key(*f)) {
            return Err(InternalError::materialize_corruption(format!(
                "audit row of '{entity}' lacks id field '{missing}'"
            )));
        }

        let revision_type = row
            .remove(&audit.revision_type_prop_name)
            .as_ref()
            .and_then(RevisionType::from_value);

        // modified flags are storage metadata, not entity state
        let flags = model
            .fields
            .iter()
            .chain(model.to_one.iter().map(|r| &r.name))
            .chain(model.to_many.iter().map(|r| &r.name))
            .map(|name| format!("{name}{}", audit.modified_flag_suffix));
        for flag in flags {
            row.remove(&flag);
        }

        let relations = model
            .to_many
            .iter()
            .filter_map(|relation| {
                self.reader
                    .collection_initializer(entity, &relation.name)
                    .map(|initializer| {
                        let handle = build_historical_collection(
                            relation.kind,
                            relation.name.clone(),
                            revision,
                            id.clone(),
                            initializer,
                        );
                        (relation.name.clone(), Arc::new(handle))
                    })
            })
            .collect();

        Ok(HistoricalEntity {
            entity_name: entity.to_string(),
            id,
            revision,
            revision_type,
            fields: row,
            relations,
        })
    }
}
