use super::*;
use crate::{
    config::{AuditConfig, AuditConfiguration},
    model::{ElementEncoding, EntityModel, RelationDescriptor, RelationKind, ToOneModel},
    reader::AuditReader,
    value::{Revision, RevisionType, Value},
};
use std::sync::Arc;

///
/// NoopExecutor
///

struct NoopExecutor;

impl AuditQueryExecutor for NoopExecutor {
    fn execute(&self, _query: &CompiledQuery) -> Result<Vec<Value>, ExecutorError> {
        Ok(Vec::new())
    }
}

fn configuration() -> AuditConfiguration {
    AuditConfiguration::new(
        AuditConfig::default(),
        [
            EntityModel::new("Region").with_field("name"),
            EntityModel::new("Customer")
                .with_field("name")
                .with_to_one(ToOneModel::new("region", "Region")),
            EntityModel::new("Order")
                .with_field("status")
                .with_field("total")
                .with_to_one(ToOneModel::new("customer", "Customer"))
                .with_to_many(
                    RelationDescriptor::new(
                        "tags",
                        RelationKind::Set,
                        ElementEncoding::Direct {
                            field: "tag".to_string(),
                        },
                    )
                    .with_modified_flag(),
                ),
            EntityModel::new("Shipment")
                .with_id_fields(["order_id", "line"])
                .with_field("carrier"),
        ],
    )
    .expect("fixture configuration is valid")
}

fn reader() -> AuditReader {
    AuditReader::new(configuration(), Arc::new(NoopExecutor))
}

fn path(alias: &str, property: &str) -> PropertyPath {
    PropertyPath::new(alias, property)
}

// ------------------------------------------------------------------
// Property resolution
// ------------------------------------------------------------------

#[test]
fn properties_resolve_to_physical_paths() {
    let config = configuration();
    let resolve =
        |entity: &str, property: AuditProperty| resolve_property(&config, entity, &property);

    assert_eq!(resolve("Order", AuditProperty::RevisionNumber).unwrap(), "originalId.REV");
    assert_eq!(resolve("Order", AuditProperty::RevisionType).unwrap(), "REVTYPE");
    assert_eq!(resolve("Order", AuditProperty::Id(None)).unwrap(), "originalId.id");
    assert_eq!(
        resolve("Order", AuditProperty::Field("id".to_string())).unwrap(),
        "originalId.id"
    );
    assert_eq!(
        resolve("Order", AuditProperty::Field("customer".to_string())).unwrap(),
        "customer_id"
    );
    assert_eq!(
        resolve("Order", AuditProperty::Field("status".to_string())).unwrap(),
        "status"
    );
    assert_eq!(
        resolve("Order", AuditProperty::ModifiedFlag("tags".to_string())).unwrap(),
        "tags_MOD"
    );
    assert_eq!(
        resolve("Shipment", AuditProperty::Id(Some("line".to_string()))).unwrap(),
        "originalId.line"
    );
}

#[test]
fn unknown_and_ambiguous_properties_are_rejected() {
    let config = configuration();

    let err = resolve_property(&config, "Order", &AuditProperty::Field("colour".to_string()))
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::UnknownProperty { ref entity, ref property }
            if entity == "Order" && property == "colour"
    ));

    let err = resolve_property(&config, "Shipment", &AuditProperty::Id(None)).unwrap_err();
    assert!(matches!(err, QueryError::CompositeIdentifier { .. }));

    let flag = AuditProperty::ModifiedFlag("tags".to_string());
    let err = resolve_property(&config, "Region", &flag).unwrap_err();
    assert!(matches!(err, QueryError::UnknownProperty { .. }));
}

// ------------------------------------------------------------------
// Construction
// ------------------------------------------------------------------

#[test]
fn unversioned_entity_is_rejected_at_construction() {
    let reader = reader();

    let err = reader
        .create_query()
        .for_entities_at_revision("Invoice", Revision::new(3))
        .err()
        .expect("unversioned entity must be rejected");

    assert!(matches!(err, QueryError::NotVersioned { ref entity } if entity == "Invoice"));
    assert_eq!(err.to_string(), "Invoice is not versioned");
}

#[test]
fn traversal_is_idempotent_per_relation_name() {
    let reader = reader();
    let mut query = reader
        .create_query()
        .for_entities_at_revision("Order", Revision::new(4))
        .unwrap();

    let first: *const AssociationQuery<'_> =
        query.traverse_relation("customer", JoinKind::Inner).unwrap();
    let second: *const AssociationQuery<'_> =
        query.traverse_relation("customer", JoinKind::Left).unwrap();
    assert!(std::ptr::eq(first, second));

    let customer = query.traverse_relation("customer", JoinKind::Inner).unwrap();
    assert_eq!(customer.alias(), "e_1");
    assert_eq!(customer.parent_alias(), "e");
    assert_eq!(customer.entity_name(), "Customer");
    assert_eq!(customer.join_kind(), JoinKind::Inner);

    let region = customer.traverse_relation("region", JoinKind::Left).unwrap();
    assert_eq!(region.alias(), "e_1_1");
    assert_eq!(region.parent_alias(), "e_1");

    let compiled = query.compile().unwrap().into_query();
    assert_eq!(compiled.joins.len(), 1);
    assert_eq!(compiled.join_count(), 2);
}

#[test]
fn traversal_rejects_unknown_and_collection_relations() {
    let reader = reader();
    let mut query = reader
        .create_query()
        .for_entities_at_revision("Order", Revision::new(4))
        .unwrap();

    let err = query
        .traverse_relation("supplier", JoinKind::Inner)
        .err()
        .expect("unknown relation");
    assert!(matches!(
        err,
        QueryError::UnknownRelation { ref relation, .. } if relation == "supplier"
    ));

    let err = query
        .traverse_relation("tags", JoinKind::Inner)
        .err()
        .expect("to-many relation");
    assert!(matches!(err, QueryError::UnsupportedTraversal { .. }));
}

// ------------------------------------------------------------------
// Compilation
// ------------------------------------------------------------------

#[test]
fn at_revision_query_pins_rows_and_excludes_deletions() {
    let reader = reader();
    let compiled = reader
        .create_query()
        .for_entities_at_revision("Order", Revision::new(9))
        .unwrap()
        .add(AuditEntity::property("status").eq("open"))
        .compile()
        .unwrap()
        .into_query();

    assert_eq!(compiled.entity_name, "Order_AUD");
    assert_eq!(compiled.alias, "e");
    assert_eq!(
        compiled.predicates,
        vec![
            CompiledPredicate::RevisionAsOf {
                revision: path("e", "originalId.REV"),
                id: vec![path("e", "originalId.id")],
                bound: RevisionBound::Fixed(Revision::new(9)),
            },
            CompiledPredicate::Compare {
                path: path("e", "REVTYPE"),
                op: CompareOp::Ne,
                value: Value::from(RevisionType::Deleted),
            },
            CompiledPredicate::Compare {
                path: path("e", "status"),
                op: CompareOp::Eq,
                value: Value::from("open"),
            },
        ]
    );
    assert!(compiled.orders.is_empty());
    assert!(compiled.projections.is_empty());
}

#[test]
fn modified_at_revision_matches_exact_revision() {
    let reader = reader();
    let compiled = reader
        .create_query()
        .for_entities_modified_at_revision("Order", Revision::new(5))
        .unwrap()
        .add(AuditEntity::has_changed("tags"))
        .compile()
        .unwrap()
        .into_query();

    assert_eq!(
        compiled.predicates,
        vec![
            CompiledPredicate::Compare {
                path: path("e", "originalId.REV"),
                op: CompareOp::Eq,
                value: Value::from(Revision::new(5)),
            },
            CompiledPredicate::Compare {
                path: path("e", "tags_MOD"),
                op: CompareOp::Eq,
                value: Value::Bool(true),
            },
        ]
    );
}

#[test]
fn revision_listing_defaults_to_ascending_revision_order() {
    let reader = reader();
    let compiled = reader
        .create_query()
        .for_revisions_of_entity("Order", false, true)
        .unwrap()
        .compile()
        .unwrap()
        .into_query();

    assert!(compiled.predicates.is_empty());
    assert_eq!(
        compiled.orders,
        vec![CompiledOrder {
            path: path("e", "originalId.REV"),
            direction: OrderDirection::Asc,
        }]
    );

    let compiled = reader
        .create_query()
        .for_revisions_of_entity("Order", false, true)
        .unwrap()
        .add_order(AuditEntity::property("total").desc())
        .compile()
        .unwrap()
        .into_query();
    assert_eq!(compiled.orders.len(), 1);
    assert_eq!(compiled.orders[0].path, path("e", "total"));
}

#[test]
fn joined_nodes_are_pinned_and_scoped_to_their_alias() {
    let reader = reader();
    let mut query = reader
        .create_query()
        .for_revisions_of_entity("Order", true, false)
        .unwrap();
    query
        .traverse_relation("customer", JoinKind::Left)
        .unwrap()
        .add(AuditEntity::property("name").like("A%"));

    let compiled = query.compile().unwrap().into_query();
    let join = compiled.join("e_1").expect("customer join");

    assert_eq!(join.entity_name, "Customer_AUD");
    assert_eq!(join.kind, JoinKind::Left);
    assert_eq!(
        join.on,
        vec![(path("e", "customer_id"), path("e_1", "originalId.id"))]
    );
    assert_eq!(
        join.predicates[0],
        CompiledPredicate::RevisionAsOf {
            revision: path("e_1", "originalId.REV"),
            id: vec![path("e_1", "originalId.id")],
            bound: RevisionBound::Property(path("e", "originalId.REV")),
        }
    );
    assert_eq!(
        join.predicates[2],
        CompiledPredicate::Compare {
            path: path("e_1", "name"),
            op: CompareOp::Like,
            value: Value::from("A%"),
        }
    );
}

#[test]
fn unknown_property_in_join_fails_compilation() {
    let reader = reader();
    let mut query = reader
        .create_query()
        .for_entities_at_revision("Order", Revision::new(2))
        .unwrap();
    query
        .traverse_relation("customer", JoinKind::Inner)
        .unwrap()
        .add(AuditEntity::property("status").eq("open"));

    let err = query.compile().err().expect("status is not a Customer field");
    assert!(matches!(
        err,
        crate::Error::Query(QueryError::UnknownProperty { ref entity, .. }) if entity == "Customer"
    ));
}

#[test]
fn projections_and_orders_keep_query_wide_registration_order() {
    let reader = reader();
    let mut query = reader
        .create_query()
        .for_entities_at_revision("Order", Revision::new(2))
        .unwrap()
        .add_projection(AuditEntity::property("status").project());
    query
        .traverse_relation("customer", JoinKind::Inner)
        .unwrap()
        .add_projection(AuditEntity::property("name").distinct())
        .add_order(AuditEntity::property("name").asc());
    let query = query
        .add_projection(AuditEntity::property("total").sum())
        .add_order(AuditEntity::revision_number().desc());

    let compiled = query.compile().unwrap().into_query();

    assert_eq!(
        compiled.projections,
        vec![
            CompiledProjection {
                alias: "e".to_string(),
                path: Some(path("e", "status")),
                function: None,
                distinct: false,
            },
            CompiledProjection {
                alias: "e_1".to_string(),
                path: Some(path("e_1", "name")),
                function: None,
                distinct: true,
            },
            CompiledProjection {
                alias: "e".to_string(),
                path: Some(path("e", "total")),
                function: Some(ProjectionFunction::Sum),
                distinct: false,
            },
        ]
    );
    assert_eq!(
        compiled.orders,
        vec![
            CompiledOrder {
                path: path("e_1", "name"),
                direction: OrderDirection::Asc,
            },
            CompiledOrder {
                path: path("e", "originalId.REV"),
                direction: OrderDirection::Desc,
            },
        ]
    );
}

// ------------------------------------------------------------------
// Options
// ------------------------------------------------------------------

#[test]
fn unset_hints_stay_unset() {
    let reader = reader();
    let compiled = reader
        .create_query()
        .for_entities_at_revision("Order", Revision::new(1))
        .unwrap()
        .set_max_results(25)
        .set_lock_mode(LockMode::Read)
        .compile()
        .unwrap()
        .into_query();

    let options = &compiled.options;
    assert_eq!(options.max_results(), Some(25));
    assert_eq!(options.lock_mode(), Some(LockMode::Read));
    assert_eq!(options.first_result(), None);
    assert_eq!(options.cacheable(), None);
    assert_eq!(options.cache_region(), None);
    assert_eq!(options.comment(), None);
    assert_eq!(options.flush_mode(), None);
    assert_eq!(options.cache_mode(), None);
    assert_eq!(options.timeout_secs(), None);
}

#[test]
fn with_options_replaces_every_hint() {
    let reader = reader();
    let options = QueryOptions::new()
        .with_comment("nightly export")
        .with_flush_mode(FlushMode::Manual)
        .with_cache_mode(CacheMode::Ignore);

    let query = reader
        .create_query()
        .for_entities_at_revision("Order", Revision::new(1))
        .unwrap()
        .set_max_results(10)
        .with_options(options.clone())
        .set_timeout(30);

    let compiled = query.compile().unwrap().into_query();
    assert_eq!(compiled.options, options.with_timeout_secs(30));
    assert_eq!(compiled.options.max_results(), None);
    assert!(QueryOptions::new().is_empty());
}

// ------------------------------------------------------------------
// Criteria and serialization
// ------------------------------------------------------------------

#[test]
fn criteria_combinators_flatten() {
    let status = AuditEntity::property("status");
    let total = AuditEntity::property("total");

    let combined = status.clone().eq("open") & total.clone().gt(10) & total.clone().lt(100);
    let AuditCriterion::And(items) = &combined else {
        panic!("expected a conjunction, got {combined:?}");
    };
    assert_eq!(items.len(), 3);
    assert_eq!(combined.leaf_count(), 3);

    let either = status.clone().eq("open") | status.eq("held");
    assert!(matches!(either, AuditCriterion::Or(ref items) if items.len() == 2));
    assert!(matches!(!total.is_null(), AuditCriterion::Not(_)));
}

#[test]
fn compiled_query_serializes_with_resolved_paths() {
    let reader = reader();
    let compiled = reader
        .create_query()
        .for_entities_at_revision("Order", Revision::new(7))
        .unwrap()
        .add(AuditEntity::id().in_list([1_u64, 2, 3]))
        .add_projection(AuditEntity::selected_entity(false))
        .set_comment("audit")
        .compile()
        .unwrap()
        .into_query();

    let json = serde_json::to_value(&compiled).unwrap();

    assert_eq!(json["entity_name"], "Order_AUD");
    assert_eq!(json["predicates"][0]["RevisionAsOf"]["bound"]["Fixed"], 7);
    assert_eq!(json["predicates"][2]["In"]["path"]["property"], "originalId.id");
    assert_eq!(json["projections"][0]["path"], serde_json::Value::Null);
    assert_eq!(json["options"]["comment"], "audit");
    assert_eq!(json["options"]["max_results"], serde_json::Value::Null);
}
