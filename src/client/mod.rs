//! Client-side membership runtime.
//!
//! Everything an application embedding this crate needs to consume the
//! membership API: a typed HTTP client, a persistent snapshot cache, a
//! single state store that owns the session's tier, and feature gates
//! that react to tier changes.
//!
//! ## Data Flow
//!
//! ```text
//! MembershipApi ──► MembershipStore ──► watch::Receiver<MembershipTier>
//!      ▲                  │                      │
//!      │                  ▼                      ▼
//!  backend          SnapshotStore          FeatureGate
//!                  (offline cache)      (Loading/Granted/Denied)
//! ```
//!
//! The store is the only component that normalizes raw payloads into a
//! tier; gates and callers read the derived tier, never the raw blob.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use nosmoke::client::{
//!     FeatureGate, FileSnapshotStore, HttpMembershipApi, MembershipStore, StoreConfig,
//! };
//! use nosmoke::domain::membership::{AccessRequirement, MembershipTier};
//! use secrecy::SecretString;
//!
//! let api = Arc::new(HttpMembershipApi::new(
//!     "https://api.example.com",
//!     SecretString::new(session_token),
//! ));
//! let snapshots = Arc::new(FileSnapshotStore::in_dir(data_dir));
//! let store = Arc::new(MembershipStore::new(api.clone(), snapshots, StoreConfig::default()).await);
//!
//! tokio::spawn(store.clone().run_refresh_loop());
//!
//! let gate = FeatureGate::new(
//!     AccessRequirement::at_least(MembershipTier::Premium),
//!     api,
//!     store,
//! );
//! let mut state = gate.watch();
//! ```

mod api;
mod gate;
mod mock;
mod snapshot;
mod store;

pub use api::{
    AccessCheckPayload, ApiError, HttpMembershipApi, MembershipApi, MembershipPayload,
    UpgradeOrder,
};
pub use gate::{FeatureGate, GateState};
pub use mock::MockMembershipApi;
pub use snapshot::{
    FileSnapshotStore, MembershipSnapshot, MemorySnapshotStore, SnapshotError, SnapshotStore,
    SNAPSHOT_STORAGE_KEY,
};
pub use store::{MembershipStore, StoreConfig};
