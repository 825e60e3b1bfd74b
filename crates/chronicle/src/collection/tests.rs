use super::*;
use crate::{
    Error,
    config::AuditConfig,
    error::ErrorClass,
    model::{ElementEncoding, RelationDescriptor, RelationKind},
    value::{FieldMap, Revision, RevisionType, Value, field_map},
};
use proptest::prelude::*;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

fn tags_relation() -> RelationDescriptor {
    RelationDescriptor::new(
        "tags",
        RelationKind::Set,
        ElementEncoding::Direct {
            field: "tag".to_string(),
        },
    )
    .owned_by("Order")
    .with_modified_flag()
}

fn set_of(values: &[&str]) -> RelationValue {
    CollectionSnapshot::Set(values.iter().map(|v| Value::from(*v)).collect()).into()
}

fn owner(id: i64) -> FieldMap {
    field_map([("id", id)])
}

fn tag_of(record: &ChangeRecord) -> &Value {
    &record.element["tag"]
}

//
// Diff engine
//

#[test]
fn overlapping_snapshots_produce_minimal_changes() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let changes = mapper
        .compute_changes("tags", &set_of(&["B", "C"]), &set_of(&["A", "B"]), &owner(7))
        .expect("diff should succeed");
    let records = changes.records().expect("relation is applicable");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, RevisionType::Added);
    assert_eq!(tag_of(&records[0]), &Value::from("C"));
    assert_eq!(records[1].kind, RevisionType::Deleted);
    assert_eq!(tag_of(&records[1]), &Value::from("A"));

    for record in records {
        assert_eq!(record.owner_id, field_map([("Order_id", 7)]));
        assert_eq!(record.middle_entity, "Order_tags_AUD");
    }
}

#[test]
fn foreign_relation_name_is_not_applicable() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let changes = mapper
        .compute_changes("lines", &set_of(&["A"]), &RelationValue::Absent, &owner(1))
        .expect("sentinel is not an error");

    assert_eq!(changes, CollectionChanges::NotApplicable);
    assert!(!changes.is_unchanged());
    assert!(changes.records().is_none());
}

#[test]
fn both_absent_is_an_applicable_empty_change_set() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let changes = mapper
        .compute_changes("tags", &RelationValue::Absent, &RelationValue::Absent, &owner(1))
        .expect("diff should succeed");

    assert!(changes.is_applicable());
    assert!(changes.is_unchanged());
}

#[test]
fn absent_old_snapshot_adds_everything() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let records = mapper
        .compute_changes("tags", &set_of(&["A", "A", "B"]), &RelationValue::Absent, &owner(1))
        .expect("diff should succeed")
        .into_records()
        .expect("applicable");

    let tags: Vec<_> = records.iter().map(tag_of).cloned().collect();
    assert_eq!(tags, vec![Value::from("A"), Value::from("B")]);
    assert!(records.iter().all(|r| r.kind == RevisionType::Added));
}

#[test]
fn list_move_is_recorded_as_delete_and_add_with_index() {
    let config = AuditConfig::default();
    let relation = RelationDescriptor::new(
        "lines",
        RelationKind::List,
        ElementEncoding::ForeignKey {
            id_fields: vec!["id".to_string()],
            prefix: "line_".to_string(),
        },
    )
    .owned_by("Order")
    .with_index_column("position");
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let old = CollectionSnapshot::List(vec![Value::Int(10), Value::Int(20)]).into();
    let new = CollectionSnapshot::List(vec![Value::Int(20), Value::Int(10)]).into();

    let records = mapper
        .compute_changes("lines", &new, &old, &owner(3))
        .expect("diff should succeed")
        .into_records()
        .expect("applicable");

    assert_eq!(records.len(), 4);
    assert_eq!(
        records[0].element,
        field_map([("position", Value::Uint(0)), ("line_id", Value::Int(20))])
    );
    assert_eq!(records[0].kind, RevisionType::Added);
    assert_eq!(records[2].kind, RevisionType::Deleted);
    assert_eq!(
        records[2].element,
        field_map([("position", Value::Uint(0)), ("line_id", Value::Int(10))])
    );
}

#[test]
fn map_entries_encode_their_key() {
    let config = AuditConfig::default();
    let relation = RelationDescriptor::new(
        "labels",
        RelationKind::Map,
        ElementEncoding::Direct {
            field: "label".to_string(),
        },
    )
    .owned_by("Order");
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let old = CollectionSnapshot::Map(BTreeMap::from([(Value::from("en"), Value::from("box"))]));
    let new = CollectionSnapshot::Map(BTreeMap::from([(Value::from("en"), Value::from("crate"))]));

    let records = mapper
        .compute_changes("labels", &new.into(), &old.into(), &owner(1))
        .expect("diff should succeed")
        .into_records()
        .expect("applicable");

    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].element,
        field_map([("mapkey", "en"), ("label", "crate")])
    );
    assert_eq!(
        records[1].element,
        field_map([("mapkey", "en"), ("label", "box")])
    );
}

#[test]
fn entity_reference_without_identifier_is_corruption() {
    let config = AuditConfig::default();
    let relation = RelationDescriptor::new(
        "parts",
        RelationKind::Bag,
        ElementEncoding::ForeignKey {
            id_fields: vec!["id".to_string()],
            prefix: "part_".to_string(),
        },
    )
    .owned_by("Order");
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let new = CollectionSnapshot::Bag(vec![Value::Map(field_map([("sku", "X-1")]))]).into();
    let err = mapper
        .compute_changes("parts", &new, &RelationValue::Absent, &owner(1))
        .expect_err("missing id must fail");

    assert_eq!(err.class, ErrorClass::Corruption);
}

#[test]
fn missing_owner_identifier_is_corruption() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let err = mapper
        .compute_changes("tags", &set_of(&["A"]), &RelationValue::Absent, &FieldMap::new())
        .expect_err("owner id is required");

    assert_eq!(err.class, ErrorClass::Corruption);
}

#[test]
fn snapshot_shape_must_match_relation_kind() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let list = CollectionSnapshot::List(vec![Value::from("A")]).into();
    let err = mapper
        .compute_changes("tags", &list, &RelationValue::Absent, &owner(1))
        .expect_err("list for a set relation");

    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn change_record_becomes_stamped_audit_row() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let mapper = CollectionChangeMapper::new(&config, &relation);

    let record = mapper
        .compute_changes("tags", &set_of(&["A"]), &RelationValue::Absent, &owner(7))
        .expect("diff should succeed")
        .into_records()
        .and_then(|mut records| records.pop())
        .expect("one record");

    let row = record.into_audit_row(&config, Revision::new(12));

    assert_eq!(row.entity_name(), "Order_tags_AUD");
    assert_eq!(row.revision(), Revision::new(12));
    assert_eq!(row.revision_type(), RevisionType::Added);
    assert_eq!(
        row.data(),
        &field_map([
            (
                "originalId",
                Value::Map(field_map([
                    ("Order_id", Value::Int(7)),
                    ("tag", Value::from("A")),
                    ("REV", Value::Uint(12)),
                ])),
            ),
            ("REVTYPE", Value::Uint(0)),
        ])
    );
}

//
// Diff properties
//

fn snapshot(values: &[u8]) -> RelationValue {
    CollectionSnapshot::Bag(values.iter().map(|v| Value::Uint(u64::from(*v))).collect()).into()
}

fn partition(changes: &CollectionChanges) -> (BTreeSet<Value>, BTreeSet<Value>) {
    let mut added = BTreeSet::new();
    let mut deleted = BTreeSet::new();

    for record in changes.records().unwrap_or_default() {
        let value = record.element["tag"].clone();
        match record.kind {
            RevisionType::Added => assert!(added.insert(value)),
            RevisionType::Deleted => assert!(deleted.insert(value)),
            RevisionType::Modified => panic!("collections never emit modified records"),
        }
    }

    (added, deleted)
}

fn bag_relation() -> RelationDescriptor {
    RelationDescriptor::new(
        "tags",
        RelationKind::Bag,
        ElementEncoding::Direct {
            field: "tag".to_string(),
        },
    )
    .owned_by("Order")
}

proptest! {
    #[test]
    fn diff_partitions_by_equality(
        old in prop::collection::vec(0u8..12, 0..10),
        new in prop::collection::vec(0u8..12, 0..10),
    ) {
        let config = AuditConfig::default();
        let relation = bag_relation();
        let mapper = CollectionChangeMapper::new(&config, &relation);

        let changes = mapper
            .compute_changes("tags", &snapshot(&new), &snapshot(&old), &owner(1))
            .expect("diff should succeed");
        let (added, deleted) = partition(&changes);

        let old_set: BTreeSet<Value> = old.iter().map(|v| Value::Uint(u64::from(*v))).collect();
        let new_set: BTreeSet<Value> = new.iter().map(|v| Value::Uint(u64::from(*v))).collect();

        prop_assert_eq!(&added, &new_set.difference(&old_set).cloned().collect::<BTreeSet<_>>());
        prop_assert_eq!(&deleted, &old_set.difference(&new_set).cloned().collect::<BTreeSet<_>>());
        prop_assert!(added.is_disjoint(&deleted));

        // added records precede deleted ones
        let kinds: Vec<_> = changes.records().unwrap_or_default().iter().map(|r| r.kind).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        prop_assert_eq!(kinds, sorted);
    }

    #[test]
    fn diff_of_identical_snapshots_is_empty(values in prop::collection::vec(0u8..12, 0..10)) {
        let config = AuditConfig::default();
        let relation = bag_relation();
        let mapper = CollectionChangeMapper::new(&config, &relation);

        let changes = mapper
            .compute_changes("tags", &snapshot(&values), &snapshot(&values), &owner(1))
            .expect("diff should succeed");

        prop_assert!(changes.is_unchanged());
    }

    #[test]
    fn diff_contents_ignore_input_order(
        old in prop::collection::vec(0u8..12, 0..10),
        new in prop::collection::vec(0u8..12, 0..10),
    ) {
        let config = AuditConfig::default();
        let relation = bag_relation();
        let mapper = CollectionChangeMapper::new(&config, &relation);

        let mut old_rev = old.clone();
        old_rev.reverse();
        let mut new_rev = new.clone();
        new_rev.reverse();

        let forward = mapper
            .compute_changes("tags", &snapshot(&new), &snapshot(&old), &owner(1))
            .expect("diff should succeed");
        let reversed = mapper
            .compute_changes("tags", &snapshot(&new_rev), &snapshot(&old_rev), &owner(1))
            .expect("diff should succeed");

        prop_assert_eq!(partition(&forward), partition(&reversed));
    }
}

//
// Modified flags
//

#[test]
fn null_and_empty_transitions_are_modifications() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let evaluator = ModifiedFlagEvaluator::new(CollectionChangeMapper::new(&config, &relation));
    let empty = set_of(&[]);

    assert!(!evaluator
        .is_modified(&RelationValue::Absent, &RelationValue::Absent)
        .unwrap());
    assert!(evaluator.is_modified(&empty, &RelationValue::Absent).unwrap());
    assert!(evaluator.is_modified(&RelationValue::Absent, &empty).unwrap());
    assert!(!evaluator.is_modified(&empty, &empty).unwrap());
}

#[test]
fn content_changes_drive_the_flag() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let evaluator = ModifiedFlagEvaluator::new(CollectionChangeMapper::new(&config, &relation));

    assert!(!evaluator
        .is_modified(&set_of(&["A", "B"]), &set_of(&["B", "A"]))
        .unwrap());
    assert!(evaluator
        .is_modified(&set_of(&["A", "C"]), &set_of(&["A", "B"]))
        .unwrap());
    assert!(evaluator
        .is_modified(&RelationValue::Absent, &set_of(&["A"]))
        .unwrap());
}

#[test]
fn plain_values_compare_by_equality() {
    let config = AuditConfig::default();
    let relation = tags_relation();
    let evaluator = ModifiedFlagEvaluator::new(CollectionChangeMapper::new(&config, &relation));

    let a = RelationValue::Plain(Value::from("a"));
    let b = RelationValue::Plain(Value::from("b"));

    assert!(!evaluator.is_modified(&a, &a.clone()).unwrap());
    assert!(evaluator.is_modified(&a, &b).unwrap());
    assert!(evaluator.is_modified(&a, &RelationValue::Absent).unwrap());
    assert!(!evaluator
        .is_modified(&RelationValue::Plain(Value::Null), &RelationValue::Absent)
        .unwrap());
}

#[test]
fn modified_flag_columns_are_written_only_when_enabled() {
    let config = AuditConfig::default();
    let flagged = tags_relation();
    let evaluator = ModifiedFlagEvaluator::new(CollectionChangeMapper::new(&config, &flagged));

    let mut data = FieldMap::new();
    evaluator
        .map_modified_flag(&mut data, &set_of(&["A"]), &RelationValue::Absent)
        .unwrap();
    assert_eq!(data.get("tags_MOD"), Some(&Value::Bool(true)));

    evaluator.map_modified_flag_for_collection_change("lines", &mut data);
    assert_eq!(data.get("tags_MOD"), Some(&Value::Bool(false)));
    assert!(evaluator.is_modified_by_relation_name("tags"));

    let unflagged = bag_relation();
    let evaluator = ModifiedFlagEvaluator::new(CollectionChangeMapper::new(&config, &unflagged));
    let mut data = FieldMap::new();
    evaluator.map_modified_flag_for_collection_change("tags", &mut data);
    assert!(data.is_empty());
}

//
// Lazy historical collections
//

fn counting_initializer(
    calls: Arc<AtomicUsize>,
    contents: CollectionSnapshot,
) -> Arc<dyn CollectionInitializer> {
    Arc::new(move |_revision: Revision, _owner: &FieldMap| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Error>(contents.clone())
    })
}

#[test]
fn lazy_collection_initializes_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handle = build_historical_collection(
        RelationKind::Set,
        "tags",
        Revision::new(4),
        owner(7),
        counting_initializer(calls.clone(), CollectionSnapshot::Set(vec![Value::from("A")])),
    );

    assert!(!handle.is_resolved());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let first = handle.get().expect("load should succeed");
    let second = handle.get().expect("cached");

    assert!(Arc::ptr_eq(&first, &second));
    assert!(handle.is_resolved());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn lazy_collection_initializes_once_under_contention() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handle = Arc::new(build_historical_collection(
        RelationKind::Bag,
        "tags",
        Revision::new(1),
        owner(1),
        counting_initializer(calls.clone(), CollectionSnapshot::Bag(vec![Value::Int(1)])),
    ));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.get().expect("load should succeed").len())
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().expect("worker panicked"), 1);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_initialization_can_be_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let initializer: Arc<dyn CollectionInitializer> =
        Arc::new(move |_revision: Revision, _owner: &FieldMap| -> Result<CollectionSnapshot, Error> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(crate::error::InternalError::new(
                    ErrorClass::Internal,
                    crate::error::ErrorOrigin::Collection,
                    "storage unavailable",
                )
                .into())
            } else {
                Ok(CollectionSnapshot::empty(RelationKind::Set))
            }
        });
    let handle = build_historical_collection(
        RelationKind::Set,
        "tags",
        Revision::new(2),
        owner(1),
        initializer,
    );

    assert!(handle.get().is_err());
    assert!(!handle.is_resolved());
    assert!(handle.get().expect("retry succeeds").is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn initializer_shape_mismatch_is_rejected() {
    let handle = build_historical_collection(
        RelationKind::List,
        "lines",
        Revision::new(2),
        owner(1),
        counting_initializer(
            Arc::new(AtomicUsize::new(0)),
            CollectionSnapshot::empty(RelationKind::Set),
        ),
    );

    let err = handle.get().expect_err("shape mismatch");
    assert!(matches!(
        err,
        Error::Internal(ref inner) if inner.class == ErrorClass::InvariantViolation
    ));
}
