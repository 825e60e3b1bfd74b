//! Module: reader
//! Responsibility: entry point for historical reads.
//! Does not own: storage access (delegated to `AuditQueryExecutor`).
//! Boundary: owns configuration, executor and per-relation initializers.

use crate::{
    Error,
    collection::{CollectionChangeMapper, CollectionInitializer},
    config::AuditConfiguration,
    error::InternalError,
    materialize::{EntityInstantiator, HistoricalEntity},
    query::{AuditEntity, AuditQuery, AuditQueryExecutor, QueryError, QueryKind},
    value::{Revision, Value},
};
use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::debug;

///
/// AuditReader
///

pub struct AuditReader {
    config: Arc<AuditConfiguration>,
    executor: Arc<dyn AuditQueryExecutor>,
    initializers: BTreeMap<(String, String), Arc<dyn CollectionInitializer>>,
}

impl AuditReader {
    #[must_use]
    pub fn new(
        config: impl Into<Arc<AuditConfiguration>>,
        executor: Arc<dyn AuditQueryExecutor>,
    ) -> Self {
        Self {
            config: config.into(),
            executor,
            initializers: BTreeMap::new(),
        }
    }

    /// Register the loader for one to-many relation. Entities materialized
    /// afterwards carry a lazy handle for it.
    pub fn with_collection_initializer(
        mut self,
        entity: &str,
        relation: &str,
        initializer: Arc<dyn CollectionInitializer>,
    ) -> Result<Self, QueryError> {
        if !self.config.is_versioned(entity) {
            return Err(QueryError::NotVersioned {
                entity: entity.to_string(),
            });
        }
        if self.config.relation(entity, relation).is_none() {
            return Err(QueryError::UnknownRelation {
                entity: entity.to_string(),
                relation: relation.to_string(),
            });
        }

        debug!(entity, relation, "collection initializer registered");
        self.initializers
            .insert((entity.to_string(), relation.to_string()), initializer);

        Ok(self)
    }

    #[must_use]
    pub fn configuration(&self) -> &AuditConfiguration {
        &self.config
    }

    #[must_use]
    pub fn executor(&self) -> &dyn AuditQueryExecutor {
        self.executor.as_ref()
    }

    #[must_use]
    pub fn collection_initializer(
        &self,
        entity: &str,
        relation: &str,
    ) -> Option<Arc<dyn CollectionInitializer>> {
        self.initializers
            .get(&(entity.to_string(), relation.to_string()))
            .cloned()
    }

    #[must_use]
    pub const fn instantiator(&self) -> EntityInstantiator<'_> {
        EntityInstantiator::new(self)
    }

    /// Diff engine bound to one configured relation.
    #[must_use]
    pub fn change_mapper(
        &self,
        entity: &str,
        relation: &str,
    ) -> Option<CollectionChangeMapper<'_>> {
        self.config
            .relation(entity, relation)
            .map(|descriptor| CollectionChangeMapper::new(self.config.audit(), descriptor))
    }

    #[must_use]
    pub const fn create_query(&self) -> AuditQueryCreator<'_> {
        AuditQueryCreator { reader: self }
    }

    /// State of one entity at `revision`, or `None` if it did not exist.
    pub fn find(
        &self,
        entity: &str,
        id: impl Into<Value>,
        revision: Revision,
    ) -> Result<Option<HistoricalEntity>, Error> {
        self.create_query()
            .for_entities_at_revision(entity, revision)?
            .add(AuditEntity::id().eq(id))
            .get_single_result_as()
    }

    /// Every revision at which the entity was recorded, oldest first.
    pub fn get_revisions(
        &self,
        entity: &str,
        id: impl Into<Value>,
    ) -> Result<Vec<Revision>, Error> {
        let values: Vec<Value> = self
            .create_query()
            .for_revisions_of_entity(entity, false, true)?
            .add(AuditEntity::id().eq(id))
            .add_projection(AuditEntity::revision_number().project())
            .add_order(AuditEntity::revision_number().asc())
            .get_result_list_as()?;

        values
            .iter()
            .map(|value| {
                Revision::from_value(value).ok_or_else(|| {
                    InternalError::materialize_corruption(format!(
                        "revision listing of '{entity}' returned {}",
                        value.kind_label()
                    ))
                    .into()
                })
            })
            .collect()
    }
}

impl fmt::Debug for AuditReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditReader")
            .field("config", &self.config)
            .field("initializers", &self.initializers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

///
/// AuditQueryCreator
/// Factory for the three query kinds.
///

pub struct AuditQueryCreator<'r> {
    reader: &'r AuditReader,
}

impl<'r> AuditQueryCreator<'r> {
    pub fn for_entities_at_revision(
        &self,
        entity: &str,
        revision: Revision,
    ) -> Result<AuditQuery<'r>, QueryError> {
        self.for_entities_at_revision_with_deleted(entity, revision, false)
    }

    pub fn for_entities_at_revision_with_deleted(
        &self,
        entity: &str,
        revision: Revision,
        include_deleted: bool,
    ) -> Result<AuditQuery<'r>, QueryError> {
        AuditQuery::new(
            self.reader,
            entity,
            QueryKind::EntitiesAtRevision {
                revision,
                include_deleted,
            },
        )
    }

    pub fn for_entities_modified_at_revision(
        &self,
        entity: &str,
        revision: Revision,
    ) -> Result<AuditQuery<'r>, QueryError> {
        AuditQuery::new(
            self.reader,
            entity,
            QueryKind::EntitiesModifiedAtRevision { revision },
        )
    }

    pub fn for_revisions_of_entity(
        &self,
        entity: &str,
        selected_entities_only: bool,
        include_deleted: bool,
    ) -> Result<AuditQuery<'r>, QueryError> {
        AuditQuery::new(
            self.reader,
            entity,
            QueryKind::RevisionsOfEntity {
                selected_entities_only,
                include_deleted,
            },
        )
    }
}
