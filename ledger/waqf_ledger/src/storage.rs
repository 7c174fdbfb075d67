//! # Storage
//!
//! Typed helpers over a [`DocumentStore`]: every waqf document is decoded and
//! validated on the way in, and written back only under the version token it
//! was read with.
//!
//! | Helper         | Store call                    | Failure modes                               |
//! |----------------|-------------------------------|---------------------------------------------|
//! | [`load_waqf`]  | `get`                         | `NotFound`, `MalformedDocument`, `Store`    |
//! | [`save_waqf`]  | `set(.., Some(version))`      | `ConcurrentModification`, `Store`           |
//! | [`create_waqf`]| `set(.., None)`               | `ConcurrentModification` if the key exists  |
//! | [`list_waqfs`] | `list`                        | `Store`; malformed documents are skipped    |

use tracing::warn;

use crate::errors::{LedgerError, Result};
use crate::store::{Document, DocumentStore, VersionToken};
use crate::types::WaqfProfile;

/// A decoded waqf together with the version token it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredWaqf {
    pub key: String,
    pub waqf: WaqfProfile,
    pub version: VersionToken,
}

fn malformed(key: &str, reason: impl ToString) -> LedgerError {
    LedgerError::MalformedDocument {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// The store key is the waqf id; documents written without an `id` get it here.
fn decode(doc: Document) -> Result<StoredWaqf> {
    let mut waqf: WaqfProfile = serde_json::from_value(doc.data).map_err(|e| malformed(&doc.key, e))?;
    waqf.validate().map_err(|reason| malformed(&doc.key, reason))?;
    if waqf.id.is_empty() {
        waqf.id = doc.key.clone();
    }
    Ok(StoredWaqf {
        key: doc.key,
        waqf,
        version: doc.version,
    })
}

fn encode(key: &str, waqf: &WaqfProfile) -> Result<serde_json::Value> {
    waqf.validate().map_err(|reason| malformed(key, reason))?;
    serde_json::to_value(waqf).map_err(|e| malformed(key, e))
}

/// Load and validate one waqf.
pub async fn load_waqf<S: DocumentStore>(
    store: &S,
    collection: &str,
    key: &str,
) -> Result<StoredWaqf> {
    match store.get(collection, key).await? {
        Some(doc) => decode(doc),
        None => Err(LedgerError::NotFound(key.to_string())),
    }
}

/// Write `stored.waqf` back, guarded by `stored.version`.
pub async fn save_waqf<S: DocumentStore>(
    store: &S,
    collection: &str,
    stored: &StoredWaqf,
) -> Result<VersionToken> {
    let data = encode(&stored.key, &stored.waqf)?;
    let version = store
        .set(collection, &stored.key, data, Some(stored.version))
        .await?;
    Ok(version)
}

/// Insert a new waqf. Fails if `key` is already taken.
pub async fn create_waqf<S: DocumentStore>(
    store: &S,
    collection: &str,
    key: &str,
    waqf: &WaqfProfile,
) -> Result<VersionToken> {
    let data = encode(key, waqf)?;
    let version = store.set(collection, key, data, None).await?;
    Ok(version)
}

/// Every well-formed waqf in `collection`.
pub async fn list_waqfs<S: DocumentStore>(store: &S, collection: &str) -> Result<Vec<StoredWaqf>> {
    let docs = store.list(collection).await?;
    let mut waqfs = Vec::with_capacity(docs.len());
    for doc in docs {
        match decode(doc) {
            Ok(stored) => waqfs.push(stored),
            Err(e) => warn!("Skipping waqf document: {e}"),
        }
    }
    Ok(waqfs)
}
