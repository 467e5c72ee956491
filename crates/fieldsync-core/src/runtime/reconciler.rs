// crates/fieldsync-core/src/runtime/reconciler.rs
// ============================================================================
// Module: Field Sync Reconciler
// Description: Batch ingestion of offline-captured occurrences.
// Purpose: Deduplicate uploads by local id and report per-item outcomes.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Items are processed in submission order and each one is decided on its
//! own:
//!
//! 1. missing required fields are rejected before anything else is checked,
//! 2. a local id that is already stored (by any owner) is rejected as
//!    already synchronized,
//! 3. malformed payloads and invalid values are rejected as invalid,
//! 4. everything else is handed to the [`OccurrenceLifecycle`] and stored as
//!    synchronized.
//!
//! The first two checks read the raw payload, so they apply to malformed
//! items too.
//!
//! A uniqueness conflict raised by the store at insert time is treated as a
//! duplicate, so two concurrent uploads of the same local id produce exactly
//! one record. Items without a local id are never deduplicated. Any other
//! store failure stops the batch; items committed before it stay committed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::account::Subject;
use crate::core::identifiers::LocalId;
use crate::core::occurrence::InputError;
use crate::core::sync::AcceptedItem;
use crate::core::sync::RejectedItem;
use crate::core::sync::RejectionReason;
use crate::core::sync::SyncItem;
use crate::core::sync::SyncReport;
use crate::interfaces::OccurrenceStore;
use crate::runtime::error::CoreError;
use crate::runtime::lifecycle::OccurrenceLifecycle;

// ============================================================================
// SECTION: Reconciler
// ============================================================================

/// Batch sync reconciler.
#[derive(Clone)]
pub struct SyncReconciler {
    /// Lifecycle used to construct and persist accepted items.
    lifecycle: OccurrenceLifecycle,
}

impl SyncReconciler {
    /// Creates a reconciler delegating to `lifecycle`.
    #[must_use]
    pub const fn new(lifecycle: OccurrenceLifecycle) -> Self {
        Self {
            lifecycle,
        }
    }

    /// Processes a batch of items on behalf of `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] when the store fails for a reason other
    /// than a uniqueness conflict.
    pub fn sync_batch(
        &self,
        subject: &Subject,
        items: Vec<SyncItem>,
    ) -> Result<SyncReport, CoreError> {
        let mut report = SyncReport::default();
        for item in items {
            match self.reconcile(subject, item)? {
                Ok(accepted) => report.accepted.push(accepted),
                Err(rejected) => report.rejected.push(rejected),
            }
        }
        Ok(report)
    }

    /// Decides a single item; the outer error aborts the batch.
    fn reconcile(
        &self,
        subject: &Subject,
        item: SyncItem,
    ) -> Result<Result<AcceptedItem, RejectedItem>, CoreError> {
        let local_id = item.local_id();
        let reject = |reason| Ok(Err(rejection(local_id.clone(), reason)));
        if !item.missing_required().is_empty() {
            return reject(RejectionReason::MissingRequiredFields);
        }
        if let Some(existing) = &local_id
            && self.lifecycle.store().occurrence_by_local_id(existing)?.is_some()
        {
            return reject(RejectionReason::AlreadySynchronized);
        }
        let SyncItem::Parsed(input) = item else {
            return reject(RejectionReason::InvalidFieldValues);
        };
        let draft = match input.validate(self.lifecycle.now()) {
            Ok(draft) => draft,
            Err(InputError::MissingRequired(_)) => {
                return reject(RejectionReason::MissingRequiredFields);
            }
            Err(InputError::Invalid(_)) => return reject(RejectionReason::InvalidFieldValues),
        };
        match self.lifecycle.ingest(subject, draft) {
            Ok(record) => Ok(Ok(AcceptedItem {
                local_id,
                assigned_id: record.id,
            })),
            Err(CoreError::Conflict(_)) => reject(RejectionReason::AlreadySynchronized),
            Err(err) => Err(err),
        }
    }
}

/// Builds a rejection entry.
const fn rejection(local_id: Option<LocalId>, reason: RejectionReason) -> RejectedItem {
    RejectedItem {
        local_id,
        reason,
    }
}
