//! Module: query::association
//! Responsibility: the query node tree (root plus traversed relations).
//! Does not own: query kinds or execution (see `builder` / `execute`).
//! Boundary: nodes own their children; children keep only the parent alias.

use crate::{
    config::AuditConfiguration,
    query::{
        JoinKind, QueryError,
        compiled::{CompiledJoin, CompiledPredicate, PropertyPath, RevisionBound},
        criteria::{AuditCriterion, CompareOp},
        order::AuditOrder,
        projection::AuditProjection,
        property::{AuditProperty, resolve_property},
    },
    value::{RevisionType, Value},
};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

///
/// Registered
/// Order or projection tagged with the node it was added to.
///

#[derive(Clone, Debug)]
pub(crate) struct Registered<T> {
    pub(crate) alias: String,
    pub(crate) entity_name: String,
    pub(crate) item: T,
}

///
/// Registry
///
/// Query-wide orders and projections. Shared by every node of one query so
/// registration order is global rather than per node.
///

#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub(crate) orders: Vec<Registered<AuditOrder>>,
    pub(crate) projections: Vec<Registered<AuditProjection>>,
}

pub(crate) type SharedRegistry = Rc<RefCell<Registry>>;

///
/// QueryNode
///
/// State common to the root and to every association.
///

pub(crate) struct QueryNode<'r> {
    config: &'r AuditConfiguration,
    entity_name: String,
    alias: String,
    criteria: Vec<AuditCriterion>,
    associations: Vec<AssociationQuery<'r>>,
    by_relation: BTreeMap<String, usize>,
    registry: SharedRegistry,
}

impl<'r> QueryNode<'r> {
    pub(crate) fn new(
        config: &'r AuditConfiguration,
        entity_name: impl Into<String>,
        alias: impl Into<String>,
        registry: SharedRegistry,
    ) -> Self {
        Self {
            config,
            entity_name: entity_name.into(),
            alias: alias.into(),
            criteria: Vec::new(),
            associations: Vec::new(),
            by_relation: BTreeMap::new(),
            registry,
        }
    }

    pub(crate) fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub(crate) fn alias(&self) -> &str {
        &self.alias
    }

    pub(crate) const fn config(&self) -> &'r AuditConfiguration {
        self.config
    }

    pub(crate) const fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub(crate) fn add_criterion(&mut self, criterion: AuditCriterion) {
        self.criteria.push(criterion);
    }

    pub(crate) fn add_order(&mut self, order: AuditOrder) {
        self.registry.borrow_mut().orders.push(self.register(order));
    }

    pub(crate) fn add_projection(&mut self, projection: AuditProjection) {
        self.registry
            .borrow_mut()
            .projections
            .push(self.register(projection));
    }

    fn register<T>(&self, item: T) -> Registered<T> {
        Registered {
            alias: self.alias.clone(),
            entity_name: self.entity_name.clone(),
            item,
        }
    }

    pub(crate) fn criteria_count(&self) -> usize {
        self.criteria.iter().map(AuditCriterion::leaf_count).sum::<usize>()
            + self
                .associations
                .iter()
                .map(|a| a.node.criteria_count())
                .sum::<usize>()
    }

    /// Return the association for `relation`, creating it on first use.
    pub(crate) fn traverse(
        &mut self,
        relation: &str,
        kind: JoinKind,
    ) -> Result<&mut AssociationQuery<'r>, QueryError> {
        if let Some(&index) = self.by_relation.get(relation) {
            return Ok(&mut self.associations[index]);
        }

        let association = self.new_association(relation, kind)?;
        let index = self.associations.len();
        self.associations.push(association);
        self.by_relation.insert(relation.to_string(), index);

        Ok(&mut self.associations[index])
    }

    fn new_association(
        &self,
        relation: &str,
        kind: JoinKind,
    ) -> Result<AssociationQuery<'r>, QueryError> {
        let model = self
            .config
            .entity(&self.entity_name)
            .ok_or_else(|| QueryError::NotVersioned {
                entity: self.entity_name.clone(),
            })?;

        let Some(to_one) = model.to_one(relation) else {
            return Err(if model.to_many(relation).is_some() {
                QueryError::UnsupportedTraversal {
                    entity: self.entity_name.clone(),
                    relation: relation.to_string(),
                    reason: "only to-one relations can be joined",
                }
            } else {
                QueryError::UnknownRelation {
                    entity: self.entity_name.clone(),
                    relation: relation.to_string(),
                }
            });
        };

        if !self.config.is_versioned(&to_one.target) {
            return Err(QueryError::NotVersioned {
                entity: to_one.target.clone(),
            });
        }

        let alias = format!("{}_{}", self.alias, self.associations.len() + 1);
        let on = vec![(
            PropertyPath::new(&self.alias, to_one.id_column()),
            PropertyPath::new(&alias, self.config.audit().id_path(&to_one.target_id_field)),
        )];

        Ok(AssociationQuery {
            node: QueryNode::new(
                self.config,
                to_one.target.clone(),
                alias,
                Rc::clone(&self.registry),
            ),
            relation: relation.to_string(),
            kind,
            parent_alias: self.alias.clone(),
            on,
        })
    }

    // ------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------

    pub(crate) fn path(&self, property: &AuditProperty) -> Result<PropertyPath, QueryError> {
        let resolved = resolve_property(self.config, &self.entity_name, property)?;

        Ok(PropertyPath::new(&self.alias, resolved))
    }

    pub(crate) fn compile_criteria(&self) -> Result<Vec<CompiledPredicate>, QueryError> {
        self.criteria
            .iter()
            .map(|criterion| self.compile_criterion(criterion))
            .collect()
    }

    fn compile_criterion(&self, criterion: &AuditCriterion) -> Result<CompiledPredicate, QueryError> {
        let compiled = match criterion {
            AuditCriterion::And(items) => CompiledPredicate::And(self.compile_all(items)?),
            AuditCriterion::Or(items) => CompiledPredicate::Or(self.compile_all(items)?),
            AuditCriterion::Not(inner) => {
                CompiledPredicate::Not(Box::new(self.compile_criterion(inner)?))
            }
            AuditCriterion::Compare {
                property,
                op,
                value,
            } => CompiledPredicate::Compare {
                path: self.path(property)?,
                op: *op,
                value: value.clone(),
            },
            AuditCriterion::In { property, values } => CompiledPredicate::In {
                path: self.path(property)?,
                values: values.clone(),
            },
            AuditCriterion::Between {
                property,
                low,
                high,
            } => CompiledPredicate::Between {
                path: self.path(property)?,
                low: low.clone(),
                high: high.clone(),
            },
            AuditCriterion::IsNull(property) => CompiledPredicate::IsNull {
                path: self.path(property)?,
            },
            AuditCriterion::IsNotNull(property) => CompiledPredicate::IsNotNull {
                path: self.path(property)?,
            },
        };

        Ok(compiled)
    }

    fn compile_all(&self, items: &[AuditCriterion]) -> Result<Vec<CompiledPredicate>, QueryError> {
        items.iter().map(|c| self.compile_criterion(c)).collect()
    }

    /// Revision-validity predicate for this node's rows.
    pub(crate) fn revision_as_of(&self, bound: RevisionBound) -> Result<CompiledPredicate, QueryError> {
        let model = self
            .config
            .entity(&self.entity_name)
            .ok_or_else(|| QueryError::NotVersioned {
                entity: self.entity_name.clone(),
            })?;
        let audit = self.config.audit();

        Ok(CompiledPredicate::RevisionAsOf {
            revision: PropertyPath::new(&self.alias, audit.revision_number_path()),
            id: model
                .id_fields
                .iter()
                .map(|field| PropertyPath::new(&self.alias, audit.id_path(field)))
                .collect(),
            bound,
        })
    }

    /// Predicate excluding rows that record a deletion.
    pub(crate) fn not_deleted(&self) -> CompiledPredicate {
        CompiledPredicate::Compare {
            path: PropertyPath::new(
                &self.alias,
                self.config.audit().revision_type_prop_name.clone(),
            ),
            op: CompareOp::Ne,
            value: Value::from(RevisionType::Deleted),
        }
    }

    /// Compile every child, pinning joined rows to `bound`.
    pub(crate) fn compile_joins(&self, bound: &RevisionBound) -> Result<Vec<CompiledJoin>, QueryError> {
        self.associations
            .iter()
            .map(|association| association.compile(bound))
            .collect()
    }
}

///
/// AssociationQuery
///
/// Node reached by traversing a to-one relation. Accepts the same
/// criteria, orders, projections and nested traversals as the root.
///

pub struct AssociationQuery<'r> {
    node: QueryNode<'r>,
    relation: String,
    kind: JoinKind,
    parent_alias: String,
    on: Vec<(PropertyPath, PropertyPath)>,
}

impl<'r> AssociationQuery<'r> {
    #[must_use]
    pub fn alias(&self) -> &str {
        self.node.alias()
    }

    #[must_use]
    pub fn parent_alias(&self) -> &str {
        &self.parent_alias
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Versioned entity this node selects.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        self.node.entity_name()
    }

    #[must_use]
    pub const fn join_kind(&self) -> JoinKind {
        self.kind
    }

    pub fn add(&mut self, criterion: AuditCriterion) -> &mut Self {
        self.node.add_criterion(criterion);
        self
    }

    pub fn add_order(&mut self, order: AuditOrder) -> &mut Self {
        self.node.add_order(order);
        self
    }

    pub fn add_projection(&mut self, projection: AuditProjection) -> &mut Self {
        self.node.add_projection(projection);
        self
    }

    /// Traverse a to-one relation of this node's entity. Repeated calls
    /// with the same name return the same node.
    pub fn traverse_relation(
        &mut self,
        relation: &str,
        kind: JoinKind,
    ) -> Result<&mut AssociationQuery<'r>, QueryError> {
        self.node.traverse(relation, kind)
    }

    fn compile(&self, bound: &RevisionBound) -> Result<CompiledJoin, QueryError> {
        let mut predicates = vec![
            self.node.revision_as_of(bound.clone())?,
            self.node.not_deleted(),
        ];
        predicates.extend(self.node.compile_criteria()?);

        Ok(CompiledJoin {
            relation: self.relation.clone(),
            kind: self.kind,
            entity_name: self
                .node
                .config()
                .audit_entity_name(self.node.entity_name()),
            alias: self.node.alias().to_string(),
            parent_alias: self.parent_alias.clone(),
            on: self.on.clone(),
            predicates,
            joins: self.node.compile_joins(bound)?,
        })
    }
}
