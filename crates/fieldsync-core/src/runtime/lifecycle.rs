// crates/fieldsync-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Field Sync Occurrence Lifecycle
// Description: Pending/synchronized state machine for occurrence records.
// Purpose: Enforce which mutations are allowed in each record state.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Records enter the store as [`SyncStatus::Synchronized`], either through a
//! direct create or through the batch reconciler. Their content is frozen
//! until an explicit reopen moves them to [`SyncStatus::Pending`]; pending
//! records accept partial edits and stay pending. Nothing moves a record back
//! to pending implicitly.
//!
//! Single-record operations resolve the record first, then check its state,
//! then consult the [`AccessPolicy`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::account::Subject;
use crate::core::identifiers::OccurrenceId;
use crate::core::occurrence::Occurrence;
use crate::core::occurrence::OccurrenceDraft;
use crate::core::occurrence::OccurrenceInput;
use crate::core::occurrence::OccurrencePatch;
use crate::core::occurrence::SyncStatus;
use crate::core::time::Timestamp;
use crate::interfaces::OccurrenceQuery;
use crate::interfaces::OccurrenceStore;
use crate::interfaces::StoreError;
use crate::runtime::clock::SharedClock;
use crate::runtime::error::CoreError;
use crate::runtime::policy::AccessPolicy;
use crate::runtime::policy::Operation;
use crate::runtime::store::SharedOccurrenceStore;

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Occurrence state machine over a record store.
#[derive(Clone)]
pub struct OccurrenceLifecycle {
    /// Occurrence storage.
    store: SharedOccurrenceStore,
    /// Wall clock.
    clock: SharedClock,
}

impl OccurrenceLifecycle {
    /// Creates a lifecycle over the given store and clock.
    #[must_use]
    pub fn new(store: SharedOccurrenceStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
        }
    }

    /// Returns the current time from the lifecycle clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &SharedOccurrenceStore {
        &self.store
    }

    /// Creates a synchronized record owned by `subject`.
    ///
    /// A supplied local id is stored with the record, so a later batch upload
    /// of the same id is rejected as already synchronized.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for missing or malformed fields and
    /// [`CoreError::Conflict`] when the local id is already stored.
    pub fn create(&self, subject: &Subject, input: OccurrenceInput) -> Result<Occurrence, CoreError> {
        let draft = input.validate(self.clock.now())?;
        self.ingest(subject, draft)
    }

    /// Persists a validated draft as a synchronized record owned by `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conflict`] when the draft's local id is already
    /// stored and [`CoreError::Internal`] on other store failures.
    pub fn ingest(&self, subject: &Subject, draft: OccurrenceDraft) -> Result<Occurrence, CoreError> {
        AccessPolicy::authorize(subject, &subject.id, Operation::Create)?;
        let record =
            Occurrence::from_draft(OccurrenceId::generate(), draft, subject.id.clone(), self.clock.now());
        match self.store.insert_occurrence(&record) {
            Ok(()) => Ok(record),
            Err(StoreError::Conflict(message)) => Err(CoreError::Conflict(message)),
            Err(err) => Err(err.into()),
        }
    }

    /// Applies a partial edit to a pending record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`], then [`CoreError::State`] unless the
    /// record is pending, then [`CoreError::Forbidden`] unless update is
    /// permitted, then [`CoreError::Validation`] for bad patch values.
    pub fn edit_pending(
        &self,
        subject: &Subject,
        id: &OccurrenceId,
        patch: OccurrencePatch,
    ) -> Result<Occurrence, CoreError> {
        let mut record = self.load(id)?;
        if record.sync_status != SyncStatus::Pending {
            return Err(CoreError::State("only pending occurrences can be edited".to_string()));
        }
        AccessPolicy::authorize(subject, &record.created_by, Operation::Update)?;
        patch.apply_to(&mut record, self.clock.now())?;
        self.store.update_occurrence(&record)?;
        Ok(record)
    }

    /// Moves a synchronized record back to pending so it can be edited.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`], then [`CoreError::State`] when the
    /// record is already pending, then [`CoreError::Forbidden`] unless update
    /// is permitted.
    pub fn reopen(&self, subject: &Subject, id: &OccurrenceId) -> Result<Occurrence, CoreError> {
        let mut record = self.load(id)?;
        if record.sync_status != SyncStatus::Synchronized {
            return Err(CoreError::State("occurrence is already pending".to_string()));
        }
        AccessPolicy::authorize(subject, &record.created_by, Operation::Update)?;
        record.sync_status = SyncStatus::Pending;
        record.updated_at = self.clock.now();
        self.store.update_occurrence(&record)?;
        Ok(record)
    }

    /// Hard-deletes a record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] or [`CoreError::Forbidden`].
    pub fn delete(&self, subject: &Subject, id: &OccurrenceId) -> Result<(), CoreError> {
        let record = self.load(id)?;
        AccessPolicy::authorize(subject, &record.created_by, Operation::Delete)?;
        if self.store.delete_occurrence(id)? { Ok(()) } else { Err(CoreError::NotFound) }
    }

    /// Loads a single record visible to `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] or [`CoreError::Forbidden`].
    pub fn get(&self, subject: &Subject, id: &OccurrenceId) -> Result<Occurrence, CoreError> {
        let record = self.load(id)?;
        AccessPolicy::authorize(subject, &record.created_by, Operation::Read)?;
        Ok(record)
    }

    /// Lists records visible to `subject`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] on store failure.
    pub fn list(&self, subject: &Subject) -> Result<Vec<Occurrence>, CoreError> {
        self.query(subject, None)
    }

    /// Lists pending records visible to `subject`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] on store failure.
    pub fn list_pending(&self, subject: &Subject) -> Result<Vec<Occurrence>, CoreError> {
        self.query(subject, Some(SyncStatus::Pending))
    }

    /// Runs a scoped listing query.
    fn query(
        &self,
        subject: &Subject,
        status: Option<SyncStatus>,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let query = OccurrenceQuery {
            owner: AccessPolicy::list_scope(subject).owner(),
            status,
        };
        Ok(self.store.query_occurrences(&query)?)
    }

    /// Loads a record or fails with [`CoreError::NotFound`].
    fn load(&self, id: &OccurrenceId) -> Result<Occurrence, CoreError> {
        self.store.occurrence(id)?.ok_or(CoreError::NotFound)
    }
}
