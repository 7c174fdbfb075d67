//! # Document store
//!
//! The ledger persists through an opaque key/value document API with
//! optimistic concurrency:
//!
//! | Call                                   | Behaviour                                        |
//! |----------------------------------------|--------------------------------------------------|
//! | `get(collection, key)`                 | Document and its [`VersionToken`], or `None`     |
//! | `set(collection, key, data, expected)` | Writes only if the stored version is `expected`  |
//! | `list(collection)`                     | Every document in the collection                 |
//!
//! `expected = None` means "create": the write fails if the key already exists.
//! A stale `expected` fails with [`StoreError::Conflict`]. No locks are held
//! between a `get` and the following `set`.

use std::collections::BTreeMap;
use std::future::Future;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StoreError;

/// Opaque optimistic-concurrency token issued by the store on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(u64);

impl VersionToken {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A stored document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub data: Value,
    pub version: VersionToken,
}

pub trait DocumentStore: Send + Sync {
    fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Returns the new version token on success.
    fn set(
        &self,
        collection: &str,
        key: &str,
        data: Value,
        expected: Option<VersionToken>,
    ) -> impl Future<Output = Result<VersionToken, StoreError>> + Send;

    fn list(&self, collection: &str)
        -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;
}

// ── In-memory store ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    next_version: u64,
    docs: BTreeMap<(String, String), (Value, VersionToken)>,
}

/// Process-local [`DocumentStore`], used for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_sync(&self, collection: &str, key: &str) -> Option<Document> {
        let state = self.state.lock();
        state
            .docs
            .get(&(collection.to_string(), key.to_string()))
            .map(|(data, version)| Document {
                key: key.to_string(),
                data: data.clone(),
                version: *version,
            })
    }

    fn set_sync(
        &self,
        collection: &str,
        key: &str,
        data: Value,
        expected: Option<VersionToken>,
    ) -> Result<VersionToken, StoreError> {
        let mut state = self.state.lock();
        let slot = (collection.to_string(), key.to_string());
        let current = state.docs.get(&slot).map(|(_, v)| *v);

        if current != expected {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        }

        state.next_version += 1;
        let version = VersionToken(state.next_version);
        state.docs.insert(slot, (data, version));
        Ok(version)
    }

    fn list_sync(&self, collection: &str) -> Vec<Document> {
        let state = self.state.lock();
        state
            .docs
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, key), (data, version))| Document {
                key: key.clone(),
                data: data.clone(),
                version: *version,
            })
            .collect()
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.get_sync(collection, key))
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        data: Value,
        expected: Option<VersionToken>,
    ) -> Result<VersionToken, StoreError> {
        self.set_sync(collection, key, data, expected)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self.list_sync(collection))
    }
}
