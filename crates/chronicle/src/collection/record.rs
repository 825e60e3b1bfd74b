use crate::{
    collection::snapshot::Element,
    config::AuditConfig,
    value::{FieldMap, Revision, RevisionType, Value},
};
use serde::{Deserialize, Serialize};

///
/// ChangeRecord
///
/// One added or deleted element of one relation-owner pair.
/// Owner id and element are already encoded into their row columns.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub middle_entity: String,
    pub owner_id: FieldMap,
    pub element: FieldMap,
    pub kind: RevisionType,
    pub changed: Element,
}

impl ChangeRecord {
    /// Owner id and element columns merged into one original-id map.
    #[must_use]
    pub fn original_id(&self) -> FieldMap {
        let mut id = self.owner_id.clone();
        id.extend(self.element.iter().map(|(k, v)| (k.clone(), v.clone())));
        id
    }

    /// Stamp this record with a revision, producing its persisted row.
    #[must_use]
    pub fn into_audit_row(self, config: &AuditConfig, revision: Revision) -> AuditRow {
        let mut original_id = self.original_id();
        original_id.insert(config.revision_field_name.clone(), revision.into());

        let mut data = FieldMap::new();
        data.insert(
            config.original_id_prop_name.clone(),
            Value::Map(original_id),
        );
        data.insert(config.revision_type_prop_name.clone(), self.kind.into());

        AuditRow {
            entity_name: self.middle_entity,
            revision,
            revision_type: self.kind,
            data,
        }
    }
}

///
/// AuditRow
///
/// Append-only persisted form of a change. There are no mutators; rows
/// are written once by the storage layer and never touched again.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AuditRow {
    entity_name: String,
    revision: Revision,
    revision_type: RevisionType,
    data: FieldMap,
}

impl AuditRow {
    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    #[must_use]
    pub const fn revision_type(&self) -> RevisionType {
        self.revision_type
    }

    #[must_use]
    pub const fn data(&self) -> &FieldMap {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> FieldMap {
        self.data
    }
}
