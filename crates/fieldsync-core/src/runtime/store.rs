// crates/fieldsync-core/src/runtime/store.rs
// ============================================================================
// Module: Field Sync In-Memory Stores
// Description: In-memory account and occurrence stores plus shared wrappers.
// Purpose: Provide deterministic stores without external dependencies.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! In-memory implementations of [`AccountStore`] and [`OccurrenceStore`] for
//! tests, local demos, and the `memory` store type. Uniqueness checks and
//! inserts happen under a single lock so concurrent duplicate submissions
//! resolve to exactly one record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::account::Account;
use crate::core::identifiers::AccountId;
use crate::core::identifiers::LocalId;
use crate::core::identifiers::OccurrenceId;
use crate::core::occurrence::Occurrence;
use crate::interfaces::AccountStore;
use crate::interfaces::OccurrenceQuery;
use crate::interfaces::OccurrenceStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Account Store
// ============================================================================

/// In-memory account store keyed by account id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountStore {
    /// Account map protected by a mutex.
    accounts: Arc<Mutex<BTreeMap<AccountId, Account>>>,
}

impl InMemoryAccountStore {
    /// Creates a new in-memory account store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl AccountStore for InMemoryAccountStore {
    fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|_| StoreError::Store("account store mutex poisoned".to_string()))?;
        if guard.contains_key(&account.id) {
            return Err(StoreError::Conflict("account id already exists".to_string()));
        }
        if guard.values().any(|existing| existing.email == account.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        guard.insert(account.id.clone(), account.clone());
        drop(guard);
        Ok(())
    }

    fn account_by_id(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        let guard = self
            .accounts
            .lock()
            .map_err(|_| StoreError::Store("account store mutex poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let guard = self
            .accounts
            .lock()
            .map_err(|_| StoreError::Store("account store mutex poisoned".to_string()))?;
        Ok(guard.values().find(|account| account.email == email).cloned())
    }

    fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|_| StoreError::Store("account store mutex poisoned".to_string()))?;
        let Some(slot) = guard.get_mut(&account.id) else {
            return Err(StoreError::Missing(format!("account {}", account.id)));
        };
        *slot = account.clone();
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Occurrence Store
// ============================================================================

/// In-memory occurrence store preserving insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOccurrenceStore {
    /// Occurrences in insertion order, protected by a mutex.
    records: Arc<Mutex<Vec<Occurrence>>>,
}

impl InMemoryOccurrenceStore {
    /// Creates a new in-memory occurrence store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the number of stored occurrences.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn record_count(&self) -> Result<usize, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("occurrence store mutex poisoned".to_string()))?;
        Ok(guard.len())
    }
}

impl OccurrenceStore for InMemoryOccurrenceStore {
    fn insert_occurrence(&self, occurrence: &Occurrence) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("occurrence store mutex poisoned".to_string()))?;
        if guard.iter().any(|existing| existing.id == occurrence.id) {
            return Err(StoreError::Conflict("occurrence id already exists".to_string()));
        }
        if let Some(local_id) = &occurrence.local_id
            && guard.iter().any(|existing| existing.local_id.as_ref() == Some(local_id))
        {
            return Err(StoreError::Conflict("local id already stored".to_string()));
        }
        guard.push(occurrence.clone());
        drop(guard);
        Ok(())
    }

    fn occurrence(&self, id: &OccurrenceId) -> Result<Option<Occurrence>, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("occurrence store mutex poisoned".to_string()))?;
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn occurrence_by_local_id(
        &self,
        local_id: &LocalId,
    ) -> Result<Option<Occurrence>, StoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("occurrence store mutex poisoned".to_string()))?;
        Ok(guard.iter().find(|record| record.local_id.as_ref() == Some(local_id)).cloned())
    }

    fn update_occurrence(&self, occurrence: &Occurrence) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("occurrence store mutex poisoned".to_string()))?;
        let Some(slot) = guard.iter_mut().find(|record| record.id == occurrence.id) else {
            return Err(StoreError::Missing(format!("occurrence {}", occurrence.id)));
        };
        *slot = occurrence.clone();
        drop(guard);
        Ok(())
    }

    fn delete_occurrence(&self, id: &OccurrenceId) -> Result<bool, StoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Store("occurrence store mutex poisoned".to_string()))?;
        let before = guard.len();
        guard.retain(|record| &record.id != id);
        let removed = guard.len() != before;
        drop(guard);
        Ok(removed)
    }

    fn query_occurrences(&self, query: &OccurrenceQuery) -> Result<Vec<Occurrence>, StoreError> {
        let mut records: Vec<Occurrence> = {
            let guard = self
                .records
                .lock()
                .map_err(|_| StoreError::Store("occurrence store mutex poisoned".to_string()))?;
            guard.iter().rev().filter(|record| query.matches(record)).cloned().collect()
        };
        // Stable sort keeps newest-inserted first among equal timestamps.
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

// ============================================================================
// SECTION: Shared Store Wrappers
// ============================================================================

/// Shared account store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedAccountStore {
    /// Inner store implementation.
    inner: Arc<dyn AccountStore + Send + Sync>,
}

impl SharedAccountStore {
    /// Wraps an account store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl AccountStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn AccountStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl AccountStore for SharedAccountStore {
    fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.inner.insert_account(account)
    }

    fn account_by_id(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        self.inner.account_by_id(id)
    }

    fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.inner.account_by_email(email)
    }

    fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        self.inner.update_account(account)
    }
}

/// Shared occurrence store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedOccurrenceStore {
    /// Inner store implementation.
    inner: Arc<dyn OccurrenceStore + Send + Sync>,
}

impl SharedOccurrenceStore {
    /// Wraps an occurrence store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl OccurrenceStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn OccurrenceStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl OccurrenceStore for SharedOccurrenceStore {
    fn insert_occurrence(&self, occurrence: &Occurrence) -> Result<(), StoreError> {
        self.inner.insert_occurrence(occurrence)
    }

    fn occurrence(&self, id: &OccurrenceId) -> Result<Option<Occurrence>, StoreError> {
        self.inner.occurrence(id)
    }

    fn occurrence_by_local_id(
        &self,
        local_id: &LocalId,
    ) -> Result<Option<Occurrence>, StoreError> {
        self.inner.occurrence_by_local_id(local_id)
    }

    fn update_occurrence(&self, occurrence: &Occurrence) -> Result<(), StoreError> {
        self.inner.update_occurrence(occurrence)
    }

    fn delete_occurrence(&self, id: &OccurrenceId) -> Result<bool, StoreError> {
        self.inner.delete_occurrence(id)
    }

    fn query_occurrences(&self, query: &OccurrenceQuery) -> Result<Vec<Occurrence>, StoreError> {
        self.inner.query_occurrences(query)
    }
}
