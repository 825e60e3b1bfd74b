use crate::{
    Error,
    error::InternalError,
    materialize::EntityInstantiator,
    obs::{AuditEvent, sink},
    query::{builder::QueryKind, compiled::CompiledQuery, projection::AuditProjection},
    reader::AuditReader,
    response::{FromQueryResult, QueryResult, ResponseError},
    value::{FieldMap, Revision, Value},
};
use thiserror::Error as ThisError;

///
/// AuditQueryExecutor
///
/// Runs a compiled query against audit storage. Returns row maps when the
/// query has no projection, scalars with one projection, and `Value::List`
/// tuples with several.
///

pub trait AuditQueryExecutor: Send + Sync {
    fn execute(&self, query: &CompiledQuery) -> Result<Vec<Value>, ExecutorError>;
}

///
/// ExecutorError
/// Opaque executor failure; surfaced to callers unchanged.
///

#[derive(Debug, ThisError)]
#[error(transparent)]
pub struct ExecutorError(Box<dyn std::error::Error + Send + Sync>);

impl ExecutorError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(source.into())
    }

    #[must_use]
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync> {
        self.0
    }
}

///
/// CompiledAuditQuery
///
/// Resolved query ready to run. Result retrieval consumes it.
///

pub struct CompiledAuditQuery<'r> {
    reader: &'r AuditReader,
    kind: QueryKind,
    entity_name: String,
    query: CompiledQuery,
    converters: Vec<(String, AuditProjection)>,
}

impl<'r> CompiledAuditQuery<'r> {
    pub(crate) const fn new(
        reader: &'r AuditReader,
        kind: QueryKind,
        entity_name: String,
        query: CompiledQuery,
        converters: Vec<(String, AuditProjection)>,
    ) -> Self {
        Self {
            reader,
            kind,
            entity_name,
            query,
            converters,
        }
    }

    #[must_use]
    pub const fn query(&self) -> &CompiledQuery {
        &self.query
    }

    #[must_use]
    pub const fn kind(&self) -> QueryKind {
        self.kind
    }

    #[must_use]
    pub fn into_query(self) -> CompiledQuery {
        self.query
    }

    /// Execute and post-process every raw result.
    pub fn get_result_list(self) -> Result<Vec<QueryResult>, Error> {
        let raw = self.reader.executor().execute(&self.query)?;
        sink::record(AuditEvent::QueryExecuted {
            entity: &self.entity_name,
            rows: raw.len() as u64,
        });

        let instantiator = self.reader.instantiator();
        raw.into_iter()
            .map(|value| self.convert(&instantiator, value))
            .collect()
    }

    pub fn get_result_list_as<T: FromQueryResult>(self) -> Result<Vec<T>, Error> {
        self.get_result_list()?
            .into_iter()
            .map(|result| T::from_query_result(result).map_err(Error::from))
            .collect()
    }

    /// Zero results yield `None`; more than one is a `NonUniqueResult`.
    pub fn get_single_result(self) -> Result<Option<QueryResult>, Error> {
        let entity = self.entity_name.clone();
        let mut results = self.get_result_list()?;

        match results.len() {
            0 => Ok(None),
            1 => Ok(results.pop()),
            count => Err(ResponseError::NonUniqueResult { entity, count }.into()),
        }
    }

    pub fn get_single_result_as<T: FromQueryResult>(self) -> Result<Option<T>, Error> {
        self.get_single_result()?
            .map(|result| T::from_query_result(result).map_err(Error::from))
            .transpose()
    }

    // ------------------------------------------------------------------
    // Post-processing
    // ------------------------------------------------------------------

    fn convert(
        &self,
        instantiator: &EntityInstantiator<'_>,
        raw: Value,
    ) -> Result<QueryResult, Error> {
        let config = self.reader.configuration();

        match self.converters.as_slice() {
            [] => self.materialize_row(instantiator, raw),
            [(entity, projection)] => {
                let revision = self.revision_for(&raw);
                projection.convert_query_result(config, instantiator, entity, revision, raw)
            }
            converters => {
                let found = raw.kind_label();
                let slots = raw.into_list().ok_or_else(|| {
                    InternalError::materialize_corruption(format!(
                        "expected a {}-slot result tuple, found {found}",
                        converters.len()
                    ))
                })?;
                if slots.len() != converters.len() {
                    return Err(InternalError::materialize_corruption(format!(
                        "expected a {}-slot result tuple, found {} slots",
                        converters.len(),
                        slots.len()
                    ))
                    .into());
                }

                converters
                    .iter()
                    .zip(slots)
                    .map(|((entity, projection), slot)| {
                        let revision = self.revision_for(&slot);
                        projection
                            .convert_query_result(config, instantiator, entity, revision, slot)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(QueryResult::Tuple)
            }
        }
    }

    fn materialize_row(
        &self,
        instantiator: &EntityInstantiator<'_>,
        raw: Value,
    ) -> Result<QueryResult, Error> {
        let found = raw.kind_label();
        let row = raw.into_map().ok_or_else(|| {
            InternalError::materialize_corruption(format!(
                "audit query on '{}' expected a row, found {found}",
                self.entity_name
            ))
        })?;

        match self.kind {
            QueryKind::EntitiesAtRevision { revision, .. }
            | QueryKind::EntitiesModifiedAtRevision { revision } => Ok(QueryResult::Entity(
                instantiator.create_instance(&self.entity_name, row, revision)?,
            )),

            QueryKind::RevisionsOfEntity {
                selected_entities_only,
                ..
            } => {
                let revision = self.row_revision(&row).ok_or_else(|| {
                    InternalError::materialize_corruption(format!(
                        "audit row of '{}' carries no revision number",
                        self.entity_name
                    ))
                })?;
                let entity = instantiator.create_instance(&self.entity_name, row, revision)?;

                if selected_entities_only {
                    return Ok(QueryResult::Entity(entity));
                }

                let revision_type = entity.revision_type().ok_or_else(|| {
                    InternalError::materialize_corruption(format!(
                        "audit row of '{}' at {revision} carries no revision type",
                        self.entity_name
                    ))
                })?;

                Ok(QueryResult::Tuple(vec![
                    QueryResult::Entity(entity),
                    QueryResult::Value(Value::from(revision)),
                    QueryResult::Value(Value::from(revision_type)),
                ]))
            }
        }
    }

    /// Revision projected values are materialized at. Revision listings
    /// use the row's own revision; scalar slots never read it.
    fn revision_for(&self, raw: &Value) -> Option<Revision> {
        self.kind
            .pinned_revision()
            .or_else(|| raw.as_map().and_then(|row| self.row_revision(row)))
    }

    fn row_revision(&self, row: &FieldMap) -> Option<Revision> {
        let audit = self.reader.configuration().audit();

        row.get(&audit.original_id_prop_name)
            .and_then(Value::as_map)
            .and_then(|id| id.get(&audit.revision_field_name))
            .and_then(Revision::from_value)
    }
}
