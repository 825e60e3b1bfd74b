//! Module: collection::lazy
//! Responsibility: revision-pinned collection handles resolved on first access.
//! Does not own: the historical load itself (see `CollectionInitializer`).
//! Boundary: handles are attached to materialized entities.

use crate::{
    Error,
    collection::snapshot::CollectionSnapshot,
    error::InternalError,
    model::RelationKind,
    obs::{AuditEvent, sink},
    value::{FieldMap, Revision},
};
use std::{
    fmt,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

///
/// CollectionInitializer
///
/// Loads the full contents of one relation as of `revision` for the owner
/// identified by `owner_key`. Must return an empty snapshot when the
/// relation had no elements at that revision.
///

pub trait CollectionInitializer: Send + Sync {
    fn initialize(
        &self,
        revision: Revision,
        owner_key: &FieldMap,
    ) -> Result<CollectionSnapshot, Error>;
}

impl<F> CollectionInitializer for F
where
    F: Fn(Revision, &FieldMap) -> Result<CollectionSnapshot, Error> + Send + Sync,
{
    fn initialize(
        &self,
        revision: Revision,
        owner_key: &FieldMap,
    ) -> Result<CollectionSnapshot, Error> {
        self(revision, owner_key)
    }
}

///
/// HistoricalCollection
///
/// Unresolved handle that becomes resolved exactly once. Concurrent first
/// access is serialized; later reads take the lock-free path. A failed
/// load leaves the handle unresolved.
///

pub struct HistoricalCollection {
    kind: RelationKind,
    relation: String,
    revision: Revision,
    owner_key: FieldMap,
    initializer: Arc<dyn CollectionInitializer>,
    resolved: OnceLock<Arc<CollectionSnapshot>>,
    init_lock: Mutex<()>,
}

impl HistoricalCollection {
    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    #[must_use]
    pub const fn owner_key(&self) -> &FieldMap {
        &self.owner_key
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Resolve (once) and return the historical contents.
    pub fn get(&self) -> Result<Arc<CollectionSnapshot>, Error> {
        if let Some(snapshot) = self.resolved.get() {
            return Ok(Arc::clone(snapshot));
        }

        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // another caller may have resolved while we waited
        if let Some(snapshot) = self.resolved.get() {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = self.initializer.initialize(self.revision, &self.owner_key)?;
        if snapshot.kind() != self.kind {
            return Err(InternalError::collection_invariant(format!(
                "historical collection '{}' expected {} contents, initializer produced {}",
                self.relation,
                self.kind,
                snapshot.kind()
            ))
            .into());
        }

        sink::record(AuditEvent::CollectionInitialized {
            relation: &self.relation,
            elements: snapshot.len() as u64,
        });

        let snapshot = Arc::new(snapshot);
        let _ = self.resolved.set(Arc::clone(&snapshot));

        Ok(snapshot)
    }
}

impl fmt::Debug for HistoricalCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoricalCollection")
            .field("kind", &self.kind)
            .field("relation", &self.relation)
            .field("revision", &self.revision)
            .field("owner_key", &self.owner_key)
            .field("resolved", &self.resolved.get())
            .finish_non_exhaustive()
    }
}

/// Wrap `initializer` behind a handle pinned to `(revision, owner_key)`.
#[must_use]
pub fn build_historical_collection(
    kind: RelationKind,
    relation: impl Into<String>,
    revision: Revision,
    owner_key: FieldMap,
    initializer: Arc<dyn CollectionInitializer>,
) -> HistoricalCollection {
    HistoricalCollection {
        kind,
        relation: relation.into(),
        revision,
        owner_key,
        initializer,
        resolved: OnceLock::new(),
        init_lock: Mutex::new(()),
    }
}
