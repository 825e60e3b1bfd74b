use crate::{
    Error,
    obs::{AuditEvent, sink},
    query::{
        JoinKind, QueryError,
        association::{AssociationQuery, QueryNode, Registry},
        compiled::{
            CompiledOrder, CompiledPredicate, CompiledProjection, CompiledQuery, PropertyPath,
            RevisionBound,
        },
        criteria::{AuditCriterion, CompareOp},
        execute::CompiledAuditQuery,
        options::{CacheMode, FlushMode, LockMode, QueryOptions},
        order::{AuditOrder, OrderDirection},
        projection::AuditProjection,
        property::{AuditProperty, resolve_property},
    },
    reader::AuditReader,
    response::{FromQueryResult, QueryResult},
    value::{Revision, Value},
};
use std::{cell::RefCell, rc::Rc};

/// Alias of the root node.
pub const ROOT_ALIAS: &str = "e";

///
/// QueryKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryKind {
    /// State of each entity as of `revision`.
    EntitiesAtRevision {
        revision: Revision,
        include_deleted: bool,
    },

    /// Entities with a row stamped exactly at `revision`.
    EntitiesModifiedAtRevision { revision: Revision },

    /// One result per recorded revision.
    RevisionsOfEntity {
        selected_entities_only: bool,
        include_deleted: bool,
    },
}

impl QueryKind {
    /// Revision every result is pinned to, if the kind has one.
    #[must_use]
    pub const fn pinned_revision(self) -> Option<Revision> {
        match self {
            Self::EntitiesAtRevision { revision, .. }
            | Self::EntitiesModifiedAtRevision { revision } => Some(revision),
            Self::RevisionsOfEntity { .. } => None,
        }
    }
}

///
/// AuditQuery
///
/// Historical query under construction. Single use: `compile` consumes it.
///

pub struct AuditQuery<'r> {
    reader: &'r AuditReader,
    kind: QueryKind,
    root: QueryNode<'r>,
    options: QueryOptions,
}

impl<'r> AuditQuery<'r> {
    /// Start a query over `entity`, which must be versioned.
    pub fn new(
        reader: &'r AuditReader,
        entity: &str,
        kind: QueryKind,
    ) -> Result<Self, QueryError> {
        let config = reader.configuration();
        if !config.is_versioned(entity) {
            return Err(QueryError::NotVersioned {
                entity: entity.to_string(),
            });
        }

        Ok(Self {
            reader,
            kind,
            root: QueryNode::new(
                config,
                entity,
                ROOT_ALIAS,
                Rc::new(RefCell::new(Registry::default())),
            ),
            options: QueryOptions::new(),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> QueryKind {
        self.kind
    }

    #[must_use]
    pub fn entity_name(&self) -> &str {
        self.root.entity_name()
    }

    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    #[must_use]
    pub fn add(mut self, criterion: AuditCriterion) -> Self {
        self.root.add_criterion(criterion);
        self
    }

    #[must_use]
    pub fn add_order(mut self, order: AuditOrder) -> Self {
        self.root.add_order(order);
        self
    }

    #[must_use]
    pub fn add_projection(mut self, projection: AuditProjection) -> Self {
        self.root.add_projection(projection);
        self
    }

    /// Traverse a to-one relation of the root entity. Repeated calls with
    /// the same name return the same node.
    pub fn traverse_relation(
        &mut self,
        relation: &str,
        kind: JoinKind,
    ) -> Result<&mut AssociationQuery<'r>, QueryError> {
        self.root.traverse(relation, kind)
    }

    // ------------------------------------------------------------------
    // Hints
    // ------------------------------------------------------------------

    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn set_max_results(mut self, n: u32) -> Self {
        self.options = self.options.with_max_results(n);
        self
    }

    #[must_use]
    pub fn set_first_result(mut self, n: u32) -> Self {
        self.options = self.options.with_first_result(n);
        self
    }

    #[must_use]
    pub fn set_cacheable(mut self, cacheable: bool) -> Self {
        self.options = self.options.with_cacheable(cacheable);
        self
    }

    #[must_use]
    pub fn set_cache_region(mut self, region: impl Into<String>) -> Self {
        self.options = self.options.with_cache_region(region);
        self
    }

    #[must_use]
    pub fn set_comment(mut self, comment: impl Into<String>) -> Self {
        self.options = self.options.with_comment(comment);
        self
    }

    #[must_use]
    pub fn set_flush_mode(mut self, mode: FlushMode) -> Self {
        self.options = self.options.with_flush_mode(mode);
        self
    }

    #[must_use]
    pub fn set_cache_mode(mut self, mode: CacheMode) -> Self {
        self.options = self.options.with_cache_mode(mode);
        self
    }

    #[must_use]
    pub fn set_timeout(mut self, secs: u32) -> Self {
        self.options = self.options.with_timeout_secs(secs);
        self
    }

    #[must_use]
    pub fn set_lock_mode(mut self, mode: LockMode) -> Self {
        self.options = self.options.with_lock_mode(mode);
        self
    }

    // ------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------

    /// Resolve every property and produce the executor-facing query.
    pub fn compile(self) -> Result<CompiledAuditQuery<'r>, Error> {
        let config = self.root.config();
        let entity = self.root.entity_name().to_string();
        let revision_path = self.root.path(&AuditProperty::RevisionNumber)?;

        let mut predicates = Vec::new();
        let bound = match self.kind {
            QueryKind::EntitiesAtRevision {
                revision,
                include_deleted,
            } => {
                predicates.push(self.root.revision_as_of(RevisionBound::Fixed(revision))?);
                if !include_deleted {
                    predicates.push(self.root.not_deleted());
                }
                RevisionBound::Fixed(revision)
            }
            QueryKind::EntitiesModifiedAtRevision { revision } => {
                predicates.push(CompiledPredicate::Compare {
                    path: revision_path.clone(),
                    op: CompareOp::Eq,
                    value: Value::from(revision),
                });
                RevisionBound::Fixed(revision)
            }
            QueryKind::RevisionsOfEntity {
                include_deleted, ..
            } => {
                if !include_deleted {
                    predicates.push(self.root.not_deleted());
                }
                RevisionBound::Property(revision_path.clone())
            }
        };
        predicates.extend(self.root.compile_criteria()?);
        let joins = self.root.compile_joins(&bound)?;

        let registry = self.root.registry().borrow();
        let mut orders = registry
            .orders
            .iter()
            .map(|registered| {
                Ok(CompiledOrder {
                    path: self.node_path(
                        &registered.alias,
                        &registered.entity_name,
                        &registered.item.property,
                    )?,
                    direction: registered.item.direction,
                })
            })
            .collect::<Result<Vec<_>, QueryError>>()?;

        // revision listings come back oldest first unless ordered explicitly
        if orders.is_empty() && matches!(self.kind, QueryKind::RevisionsOfEntity { .. }) {
            orders.push(CompiledOrder {
                path: revision_path,
                direction: OrderDirection::Asc,
            });
        }

        let mut projections = Vec::with_capacity(registry.projections.len());
        let mut converters = Vec::with_capacity(registry.projections.len());
        for registered in &registry.projections {
            let projection = &registered.item;
            let path = projection
                .property()
                .map(|property| {
                    self.node_path(&registered.alias, &registered.entity_name, property)
                })
                .transpose()?;

            projections.push(CompiledProjection {
                alias: registered.alias.clone(),
                path,
                function: projection.function(),
                distinct: projection.is_distinct(),
            });
            converters.push((registered.entity_name.clone(), projection.clone()));
        }
        drop(registry);

        let query = CompiledQuery {
            entity_name: config.audit_entity_name(&entity),
            alias: self.root.alias().to_string(),
            predicates,
            joins,
            orders,
            projections,
            options: self.options,
        };

        sink::record(AuditEvent::QueryCompiled {
            entity: &entity,
            criteria: self.root.criteria_count() as u64,
            joins: query.join_count() as u64,
            projections: query.projections.len() as u64,
        });

        Ok(CompiledAuditQuery::new(
            self.reader,
            self.kind,
            entity,
            query,
            converters,
        ))
    }

    fn node_path(
        &self,
        alias: &str,
        entity: &str,
        property: &AuditProperty,
    ) -> Result<PropertyPath, QueryError> {
        let resolved = resolve_property(self.root.config(), entity, property)?;

        Ok(PropertyPath::new(alias, resolved))
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    pub fn get_result_list(self) -> Result<Vec<QueryResult>, Error> {
        self.compile()?.get_result_list()
    }

    pub fn get_result_list_as<T: FromQueryResult>(self) -> Result<Vec<T>, Error> {
        self.compile()?.get_result_list_as()
    }

    pub fn get_single_result(self) -> Result<Option<QueryResult>, Error> {
        self.compile()?.get_single_result()
    }

    pub fn get_single_result_as<T: FromQueryResult>(self) -> Result<Option<T>, Error> {
        self.compile()?.get_single_result_as()
    }
}
