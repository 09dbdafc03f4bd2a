//! Persisted membership snapshot.
//!
//! The client keeps one JSON blob under a well-known storage key so a new
//! session starts from the last known membership instead of an empty cache.
//! The blob is eventually consistent with the backend record; the store
//! refresh loop closes the gap.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::domain::foundation::Timestamp;
use crate::domain::membership::MembershipTier;

/// Well-known storage key for the snapshot blob.
pub const SNAPSHOT_STORAGE_KEY: &str = "nosmoke.membership";

/// The persisted projection of the user's membership.
///
/// Carries the raw tier signals rather than a resolved tier: resolution
/// happens in [`MembershipSnapshot::tier`], the single place the explicit
/// code and the package-name compatibility shim are reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    /// Membership row id, when the user has one.
    #[serde(default)]
    pub id: Option<String>,

    /// Explicit tier code (`free` / `premium` / `pro`), the preferred signal.
    #[serde(default)]
    pub membership: Option<String>,

    /// Human-readable package name from payloads predating the tier code.
    #[serde(default, rename = "membershipType")]
    pub membership_type: Option<String>,

    /// When this snapshot was fetched from the backend.
    #[serde(default)]
    pub refreshed_at: Option<Timestamp>,
}

impl MembershipSnapshot {
    /// The tier this snapshot represents.
    ///
    /// The explicit code wins when present (unknown codes coerce to free);
    /// otherwise the package name is classified by substring; an empty
    /// snapshot is free.
    pub fn tier(&self) -> MembershipTier {
        if let Some(code) = self.membership.as_deref().filter(|s| !s.trim().is_empty()) {
            return MembershipTier::from_str_lenient(code);
        }
        match self.membership_type.as_deref() {
            Some(name) => MembershipTier::from_package_name(name),
            None => MembershipTier::Free,
        }
    }
}

/// Errors from snapshot persistence.
///
/// The store treats these as degradations, not failures: a snapshot that
/// cannot be written is logged and the in-memory cache stays authoritative.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The underlying storage could not be read or written.
    #[error("snapshot storage error: {0}")]
    Storage(String),

    /// The stored blob is not valid snapshot JSON.
    #[error("snapshot blob is corrupt: {0}")]
    Corrupt(String),
}

/// Persistence for the membership snapshot blob.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the stored snapshot, `None` if nothing was persisted yet.
    async fn load(&self) -> Result<Option<MembershipSnapshot>, SnapshotError>;

    /// Persist the snapshot, replacing any previous blob.
    async fn save(&self, snapshot: &MembershipSnapshot) -> Result<(), SnapshotError>;

    /// Remove the stored snapshot (logout).
    async fn clear(&self) -> Result<(), SnapshotError>;
}

/// Snapshot persistence in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Store the blob at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the blob under the well-known key inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", SNAPSHOT_STORAGE_KEY)),
        }
    }

    /// The file the blob lives at.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<MembershipSnapshot>, SnapshotError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SnapshotError::Storage(e.to_string())),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| SnapshotError::Corrupt(e.to_string()))
    }

    async fn save(&self, snapshot: &MembershipSnapshot) -> Result<(), SnapshotError> {
        let bytes =
            serde_json::to_vec(snapshot).map_err(|e| SnapshotError::Corrupt(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SnapshotError::Storage(e.to_string()))?;
        }

        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| SnapshotError::Storage(e.to_string()))
    }

    async fn clear(&self) -> Result<(), SnapshotError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnapshotError::Storage(e.to_string())),
        }
    }
}

/// Snapshot persistence in memory, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<MembershipSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a snapshot already stored.
    pub fn with_snapshot(snapshot: MembershipSnapshot) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<MembershipSnapshot>, SnapshotError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, snapshot: &MembershipSnapshot) -> Result<(), SnapshotError> {
        *self.slot.lock().await = Some(snapshot.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SnapshotError> {
        *self.slot.lock().await = None;
        Ok(())
    }
}
