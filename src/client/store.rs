//! Client-side membership state store.
//!
//! The one cache of the current user's tier. Consumers (feature gates, UI
//! badges) read from here instead of issuing their own network calls. The
//! cache is seeded from the persisted snapshot blob, refreshed on a fixed
//! interval and on explicit "membership changed" signals, and broadcasts
//! tier changes over a watch channel.
//!
//! Tier normalization happens exactly once, at [`MembershipStore::refresh`]'s
//! ingestion of a payload; everything downstream sees a typed
//! [`MembershipTier`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};

use crate::client::api::{ApiError, MembershipApi};
use crate::client::snapshot::{MembershipSnapshot, SnapshotStore};
use crate::domain::foundation::Timestamp;
use crate::domain::membership::MembershipTier;

/// Tuning knobs for the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How often the background loop refreshes the cache.
    pub refresh_interval: Duration,
    /// Upper bound on a single refresh round-trip.
    pub request_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(180),
            request_timeout: Duration::from_secs(10),
        }
    }
}

struct StoreState {
    snapshot: MembershipSnapshot,
    tier: MembershipTier,
    last_refreshed: Option<Timestamp>,
}

/// Cached membership state for the current session.
///
/// Single writer (its own refresh), many readers. Concurrent refreshes obey
/// "last successful write wins"; no ordering guarantee is made between a
/// periodic and an event-triggered refresh that race.
pub struct MembershipStore {
    api: Arc<dyn MembershipApi>,
    snapshots: Arc<dyn SnapshotStore>,
    config: StoreConfig,
    state: RwLock<StoreState>,
    changes: watch::Sender<MembershipTier>,
}

impl MembershipStore {
    /// Build the store, seeding the cache from the persisted blob.
    ///
    /// A missing or unreadable blob seeds an anonymous free-tier cache; the
    /// first refresh reconciles with the backend.
    pub async fn new(
        api: Arc<dyn MembershipApi>,
        snapshots: Arc<dyn SnapshotStore>,
        config: StoreConfig,
    ) -> Self {
        let seeded = match snapshots.load().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => MembershipSnapshot::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable membership snapshot");
                MembershipSnapshot::default()
            }
        };

        let tier = seeded.tier();
        let (changes, _) = watch::channel(tier);

        Self {
            api,
            snapshots,
            config,
            state: RwLock::new(StoreState {
                tier,
                last_refreshed: seeded.refreshed_at,
                snapshot: seeded,
            }),
            changes,
        }
    }

    /// The cached effective tier.
    pub async fn current_tier(&self) -> MembershipTier {
        self.state.read().await.tier
    }

    /// The cached snapshot.
    pub async fn snapshot(&self) -> MembershipSnapshot {
        self.state.read().await.snapshot.clone()
    }

    /// When the cache last came from the backend, if ever.
    pub async fn last_refreshed(&self) -> Option<Timestamp> {
        self.state.read().await.last_refreshed
    }

    /// Subscribe to tier changes.
    ///
    /// The receiver holds the current tier and signals whenever a refresh
    /// lands a different one.
    pub fn watch_tier(&self) -> watch::Receiver<MembershipTier> {
        self.changes.subscribe()
    }

    /// Fetch the current membership from the backend and apply it.
    ///
    /// On failure the cache keeps its previous value.
    pub async fn refresh(&self) -> Result<MembershipTier, ApiError> {
        let payload = tokio::time::timeout(
            self.config.request_timeout,
            self.api.fetch_membership(),
        )
        .await
        .map_err(|_| ApiError::Timeout)??;

        Ok(self.apply_snapshot(payload.to_snapshot()).await)
    }

    /// Signal that the membership changed server-side (e.g. after a
    /// purchase completed) and refresh immediately.
    pub async fn notify_membership_changed(&self) {
        tracing::debug!("Membership change signalled, refreshing");
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Refresh after membership change failed");
        }
    }

    /// Drop the cached membership and the persisted blob (logout).
    pub async fn clear(&self) {
        {
            let mut state = self.state.write().await;
            state.snapshot = MembershipSnapshot::default();
            state.tier = MembershipTier::Free;
            state.last_refreshed = None;
        }

        if let Err(e) = self.snapshots.clear().await {
            tracing::warn!(error = %e, "Failed to clear membership snapshot");
        }

        self.publish_tier(MembershipTier::Free);
    }

    /// Refresh on the configured interval until dropped.
    ///
    /// Callers spawn this on the runtime; failures are logged and the loop
    /// keeps going.
    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.refresh_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; construction already seeded
        // the cache, so skip it.
        interval.tick().await;

        loop {
            interval.tick().await;
            if let Err(e) = self.refresh().await {
                tracing::warn!(error = %e, "Periodic membership refresh failed");
            }
        }
    }

    /// The single ingestion boundary: derive the tier, update the cache,
    /// persist the blob and notify watchers.
    async fn apply_snapshot(&self, snapshot: MembershipSnapshot) -> MembershipTier {
        let tier = snapshot.tier();

        {
            let mut state = self.state.write().await;
            state.snapshot = snapshot.clone();
            state.tier = tier;
            state.last_refreshed = Some(Timestamp::now());
        }

        if let Err(e) = self.snapshots.save(&snapshot).await {
            tracing::warn!(error = %e, "Failed to persist membership snapshot");
        }

        self.publish_tier(tier);
        tier
    }

    fn publish_tier(&self, tier: MembershipTier) {
        self.changes.send_if_modified(|current| {
            if *current == tier {
                return false;
            }
            *current = tier;
            true
        });
    }
}

impl std::fmt::Debug for MembershipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
