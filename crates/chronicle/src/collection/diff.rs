//! Module: collection::diff
//! Responsibility: minimal add/remove change sets between two snapshots.
//! Does not own: persisting rows or stamping revisions.
//! Boundary: pure function of (new snapshot, old snapshot, owner id).

use crate::{
    collection::{
        record::ChangeRecord,
        snapshot::{Element, RelationValue, encode_element, extract},
    },
    config::AuditConfig,
    error::InternalError,
    model::RelationDescriptor,
    obs::{AuditEvent, sink},
    value::{FieldMap, RevisionType},
};
use std::collections::HashSet;

///
/// CollectionChanges
///
/// Tri-state diff outcome. `NotApplicable` means the mapper was asked about
/// a relation it is not bound to; it is not the same as "no changes".
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CollectionChanges {
    NotApplicable,
    Changes(Vec<ChangeRecord>),
}

impl CollectionChanges {
    #[must_use]
    pub const fn is_applicable(&self) -> bool {
        matches!(self, Self::Changes(_))
    }

    /// True only for an applicable, empty change set.
    #[must_use]
    pub const fn is_unchanged(&self) -> bool {
        match self {
            Self::Changes(records) => records.is_empty(),
            Self::NotApplicable => false,
        }
    }

    #[must_use]
    pub fn records(&self) -> Option<&[ChangeRecord]> {
        match self {
            Self::Changes(records) => Some(records),
            Self::NotApplicable => None,
        }
    }

    #[must_use]
    pub fn into_records(self) -> Option<Vec<ChangeRecord>> {
        match self {
            Self::Changes(records) => Some(records),
            Self::NotApplicable => None,
        }
    }
}

///
/// ElementDiff
/// Raw added/deleted elements before encoding.
///

#[derive(Debug, Default, Eq, PartialEq)]
pub(crate) struct ElementDiff {
    pub(crate) added: Vec<Element>,
    pub(crate) deleted: Vec<Element>,
}

impl ElementDiff {
    pub(crate) const fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}

///
/// CollectionChangeMapper
///
/// Diff engine bound to exactly one relation.
///

#[derive(Clone, Copy, Debug)]
pub struct CollectionChangeMapper<'a> {
    config: &'a AuditConfig,
    relation: &'a RelationDescriptor,
}

impl<'a> CollectionChangeMapper<'a> {
    #[must_use]
    pub const fn new(config: &'a AuditConfig, relation: &'a RelationDescriptor) -> Self {
        Self { config, relation }
    }

    #[must_use]
    pub const fn relation(&self) -> &'a RelationDescriptor {
        self.relation
    }

    #[must_use]
    pub const fn config(&self) -> &'a AuditConfig {
        self.config
    }

    /// Compute change records for `referencing_property`.
    ///
    /// Added records come first, then deleted ones. Within each kind the
    /// order is the first occurrence in the source snapshot.
    pub fn compute_changes(
        &self,
        referencing_property: &str,
        new: &RelationValue,
        old: &RelationValue,
        owner_id: &FieldMap,
    ) -> Result<CollectionChanges, InternalError> {
        if referencing_property != self.relation.name {
            sink::record(AuditEvent::RelationNotApplicable {
                relation: &self.relation.name,
                requested: referencing_property,
            });

            return Ok(CollectionChanges::NotApplicable);
        }

        let diff = self.diff_elements(new, old)?;
        let owner_columns = self.encode_owner_id(owner_id)?;
        let middle_entity = self.relation.middle_entity_name(self.config);

        sink::record(AuditEvent::ChangesComputed {
            owner_entity: &self.relation.owner_entity,
            relation: &self.relation.name,
            added: diff.added.len() as u64,
            deleted: diff.deleted.len() as u64,
        });

        let mut records = Vec::with_capacity(diff.added.len() + diff.deleted.len());
        let tagged = diff
            .added
            .into_iter()
            .map(|e| (e, RevisionType::Added))
            .chain(diff.deleted.into_iter().map(|e| (e, RevisionType::Deleted)));

        for (changed, kind) in tagged {
            let mut element = FieldMap::new();
            encode_element(self.relation, &mut element, &changed)?;

            records.push(ChangeRecord {
                middle_entity: middle_entity.clone(),
                owner_id: owner_columns.clone(),
                element,
                kind,
                changed,
            });
        }

        Ok(CollectionChanges::Changes(records))
    }

    /// Unencoded added/deleted elements.
    pub(crate) fn diff_elements(
        &self,
        new: &RelationValue,
        old: &RelationValue,
    ) -> Result<ElementDiff, InternalError> {
        let name = &self.relation.name;
        let new_elements = extract(self.relation.kind, new, name)?.unwrap_or_default();
        let old_elements = extract(self.relation.kind, old, name)?.unwrap_or_default();

        Ok(ElementDiff {
            added: subtract(&new_elements, &old_elements),
            deleted: subtract(&old_elements, &new_elements),
        })
    }

    // Owner id columns, prefixed so they cannot collide with element columns.
    fn encode_owner_id(&self, owner_id: &FieldMap) -> Result<FieldMap, InternalError> {
        if owner_id.is_empty() || owner_id.values().any(crate::value::Value::is_null) {
            return Err(InternalError::diff_corruption(format!(
                "relation '{}.{}' change has no usable owner identifier",
                self.relation.owner_entity, self.relation.name
            )));
        }

        let prefix = self.relation.owner_id_prefix();

        Ok(owner_id
            .iter()
            .map(|(field, value)| (format!("{prefix}{field}"), value.clone()))
            .collect())
    }
}

// Elements of `source` not present in `other`, deduplicated, in first
// occurrence order. The exclusion set is built here from the current
// element values so no earlier hash state is ever consulted.
fn subtract(source: &[Element], other: &[Element]) -> Vec<Element> {
    let exclude: HashSet<&Element> = other.iter().collect();
    let mut emitted: HashSet<&Element> = HashSet::with_capacity(source.len());

    source
        .iter()
        .filter(|element| !exclude.contains(element) && emitted.insert(*element))
        .cloned()
        .collect()
}
