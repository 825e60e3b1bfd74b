use crate::{
    collection::{diff::CollectionChangeMapper, snapshot::RelationValue},
    error::InternalError,
    value::{FieldMap, Value},
};

///
/// ModifiedFlagEvaluator
///
/// Cheap "did this relation change" check for modified-flag columns.
///

#[derive(Clone, Copy, Debug)]
pub struct ModifiedFlagEvaluator<'a> {
    mapper: CollectionChangeMapper<'a>,
}

impl<'a> ModifiedFlagEvaluator<'a> {
    #[must_use]
    pub const fn new(mapper: CollectionChangeMapper<'a>) -> Self {
        Self { mapper }
    }

    /// Whether the relation changed between `old` and `new`.
    ///
    /// Plain values compare by equality. Absent to empty (or back) is a
    /// change even though neither side has elements.
    pub fn is_modified(
        &self,
        new: &RelationValue,
        old: &RelationValue,
    ) -> Result<bool, InternalError> {
        if new.is_plain() || old.is_plain() {
            return Ok(new.as_comparable() != old.as_comparable());
        }

        if is_null_empty_transition(new, old) {
            return Ok(true);
        }

        Ok(!self.mapper.diff_elements(new, old)?.is_empty())
    }

    /// True iff this evaluator is bound to `candidate`.
    #[must_use]
    pub fn is_modified_by_relation_name(&self, candidate: &str) -> bool {
        self.mapper.relation().name == candidate
    }

    /// Write the modified flag for a content change into `data`.
    /// No-op when the relation has no modified-flag column.
    pub fn map_modified_flag(
        &self,
        data: &mut FieldMap,
        new: &RelationValue,
        old: &RelationValue,
    ) -> Result<(), InternalError> {
        if let Some(column) = self.flag_column() {
            let modified = self.is_modified(new, old)?;
            data.insert(column, Value::Bool(modified));
        }

        Ok(())
    }

    /// Write the modified flag for a structural change already signalled
    /// for `relation_name`.
    pub fn map_modified_flag_for_collection_change(&self, relation_name: &str, data: &mut FieldMap) {
        if let Some(column) = self.flag_column() {
            data.insert(
                column,
                Value::Bool(self.is_modified_by_relation_name(relation_name)),
            );
        }
    }

    fn flag_column(&self) -> Option<String> {
        self.mapper
            .relation()
            .modified_flag_column(self.mapper.config())
    }
}

fn is_null_empty_transition(new: &RelationValue, old: &RelationValue) -> bool {
    match (new, old) {
        (RelationValue::Collection(snapshot), RelationValue::Absent)
        | (RelationValue::Absent, RelationValue::Collection(snapshot)) => snapshot.is_empty(),
        _ => false,
    }
}
