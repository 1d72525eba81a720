//! Proxy-granting ticket correlation.
//!
//! The CAS server answers a proxy validation with a PGT IOU and, separately,
//! calls the receptor endpoint with `pgtIou` + `pgtId`. Either may arrive
//! first. The correlator keeps the delivered pairs and lets an
//! authentication wait, for a bounded time, until its IOU shows up.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::{ClaimError, DomainError};

/// Storage for IOU → proxy-granting ticket pairs.
///
/// Implementations must tolerate concurrent `put` and `take` calls; `take`
/// hands an entry to exactly one caller.
#[async_trait]
pub trait PgtStore: Send + Sync {
    async fn put(&self, iou: String, pgt: String);

    /// Non-consuming lookup. Expired entries are reported as absent.
    async fn get(&self, iou: &str) -> Option<String>;

    /// Remove and return the ticket for `iou`.
    async fn take(&self, iou: &str) -> Result<String, ClaimError>;

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self) -> usize;
}

struct Entry {
    pgt: SecretString,
    stored_at: Instant,
}

/// Default in-process store backed by a sharded map.
///
/// Entries live for `ttl` after delivery. An insert sweeps expired entries
/// only when at least `ttl / 2` has passed since the previous sweep, so a
/// burst of callbacks does not lock every shard on each one. Expired
/// entries are never handed out in between; they just occupy memory until
/// the next sweep or an explicit [`PgtStore::purge_expired`].
pub struct InMemoryPgtStore {
    entries: DashMap<String, Entry>,
    ttl: Duration,
    origin: Instant,
    /// Milliseconds after `origin` of the last sweep.
    last_purge_ms: AtomicU64,
}

impl InMemoryPgtStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            origin: Instant::now(),
            last_purge_ms: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) >= self.ttl
    }

    fn millis_since_origin(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.origin).as_millis()).unwrap_or(u64::MAX)
    }

    /// Claim the right to sweep at `now`; only one concurrent caller wins.
    fn sweep_due(&self, now: Instant) -> bool {
        let interval = u64::try_from((self.ttl / 2).as_millis()).unwrap_or(u64::MAX);
        let now_ms = self.millis_since_origin(now);
        let last = self.last_purge_ms.load(Ordering::Acquire);
        now_ms.saturating_sub(last) >= interval
            && self
                .last_purge_ms
                .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait]
impl PgtStore for InMemoryPgtStore {
    async fn put(&self, iou: String, pgt: String) {
        let now = Instant::now();
        if self.sweep_due(now) {
            let purged = self.sweep(now);
            if purged > 0 {
                debug!(purged, "expired proxy-granting tickets purged");
            }
        }
        self.entries.insert(
            iou,
            Entry {
                pgt: pgt.into(),
                stored_at: now,
            },
        );
    }

    async fn get(&self, iou: &str) -> Option<String> {
        let entry = self.entries.get(iou)?;
        if self.is_expired(&entry, Instant::now()) {
            return None;
        }
        Some(entry.pgt.expose_secret().to_owned())
    }

    async fn take(&self, iou: &str) -> Result<String, ClaimError> {
        let (_, entry) = self.entries.remove(iou).ok_or(ClaimError::NotYetDelivered)?;
        if self.is_expired(&entry, Instant::now()) {
            return Err(ClaimError::Expired);
        }
        Ok(entry.pgt.expose_secret().to_owned())
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        self.last_purge_ms
            .fetch_max(self.millis_since_origin(now), Ordering::AcqRel);
        self.sweep(now)
    }
}

/// Matches PGT IOUs from validation responses with the tickets delivered
/// to the receptor endpoint.
pub struct ProxyTicketCorrelator {
    store: Arc<dyn PgtStore>,
    delivered: Notify,
}

impl ProxyTicketCorrelator {
    /// Correlator over an [`InMemoryPgtStore`] with the given entry TTL.
    #[must_use]
    pub fn new(ticket_ttl: Duration) -> Self {
        Self::with_store(Arc::new(InMemoryPgtStore::new(ticket_ttl)))
    }

    #[must_use]
    pub fn with_store(store: Arc<dyn PgtStore>) -> Self {
        Self {
            store,
            delivered: Notify::new(),
        }
    }

    /// Record a callback from the CAS server and wake pending claims.
    pub async fn receive(&self, iou: impl Into<String>, pgt: impl Into<String>) {
        let iou = iou.into();
        debug!(pgt_iou = %iou, "proxy-granting ticket delivered");
        self.store.put(iou, pgt.into()).await;
        self.delivered.notify_waiters();
    }

    /// Look up the ticket for `iou` without consuming it.
    pub async fn resolve(&self, iou: &str) -> Option<String> {
        self.store.get(iou).await
    }

    /// Take the ticket for `iou`; only one caller ever receives it.
    ///
    /// # Errors
    ///
    /// - `NotYetDelivered` if the CAS server has not called back (yet)
    /// - `Expired` if the entry outlived its TTL
    pub async fn claim(&self, iou: &str) -> Result<String, ClaimError> {
        self.store.take(iou).await
    }

    /// Claim the ticket for `iou`, waiting at most `bound` for its delivery.
    ///
    /// Returns at once when the ticket is already there.
    ///
    /// # Errors
    ///
    /// `CorrelationTimedOut` once `bound` has elapsed, or if the delivered
    /// entry had already expired.
    pub async fn await_claim(&self, iou: &str, bound: Duration) -> Result<String, DomainError> {
        let deadline = Instant::now() + bound;
        let timed_out = || DomainError::CorrelationTimedOut {
            iou: iou.to_owned(),
            waited: bound,
        };

        loop {
            // Register interest before looking, so a delivery between the
            // lookup and the wait is not missed.
            let notified = self.delivered.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.claim(iou).await {
                Ok(pgt) => return Ok(pgt),
                Err(ClaimError::Expired) => {
                    warn!(pgt_iou = %iou, "proxy-granting ticket expired before it was claimed");
                    return Err(timed_out());
                }
                Err(ClaimError::NotYetDelivered) => {}
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                warn!(
                    pgt_iou = %iou,
                    waited = ?bound,
                    "proxy-granting ticket not delivered in time"
                );
                return Err(timed_out());
            }
        }
    }

    /// Drop expired entries from the store.
    pub async fn purge_expired(&self) -> usize {
        self.store.purge_expired().await
    }
}
