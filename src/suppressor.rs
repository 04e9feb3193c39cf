//! Replay filter for redelivered links
//!
//! Deep-link and share-intent channels can hand the same event over again
//! when the app resumes. Only the single most recent delivery is remembered;
//! this is not a cache.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::model::CanonicalUrl;

/// Default window in which an identical delivery counts as a replay.
pub const DEFAULT_REPLAY_WINDOW: Duration = Duration::from_secs(3);

/// The last link handled and when
#[derive(Debug, Clone)]
pub struct DeliveryRecord {
    pub url: CanonicalUrl,
    pub handled_at: Instant,
}

/// Holds exactly one [`DeliveryRecord`]
///
/// The record sits behind a mutex because the resolver call suspends, and a
/// second delivery may read or write the record meanwhile.
#[derive(Debug)]
pub struct DuplicateSuppressor {
    window: Duration,
    record: Mutex<Option<DeliveryRecord>>,
}

impl DuplicateSuppressor {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            record: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True iff `url` equals the last handled URL and was handled less than
    /// the window ago.
    pub fn should_skip(&self, url: &CanonicalUrl, now: Instant) -> bool {
        let record = self.record.lock();
        is_replay(record.as_ref(), url, now, self.window)
    }

    /// Overwrite the record with this delivery.
    pub fn mark_handled(&self, url: &CanonicalUrl, now: Instant) {
        *self.record.lock() = Some(DeliveryRecord {
            url: url.clone(),
            handled_at: now,
        });
    }

    /// Check and mark under one lock. Returns true when the delivery is a
    /// replay; otherwise records it as handled.
    pub fn check_and_mark(&self, url: &CanonicalUrl, now: Instant) -> bool {
        let mut record = self.record.lock();
        if is_replay(record.as_ref(), url, now, self.window) {
            debug!("Suppressing replayed delivery of {}", url);
            return true;
        }
        *record = Some(DeliveryRecord {
            url: url.clone(),
            handled_at: now,
        });
        false
    }

    /// Clear the record if it still holds `url`, so the user can retry a
    /// delivery that failed after it was marked.
    pub fn forget(&self, url: &CanonicalUrl) {
        let mut record = self.record.lock();
        if record.as_ref().is_some_and(|r| r.url == *url) {
            debug!("Forgetting failed delivery of {}", url);
            *record = None;
        }
    }

    /// Snapshot of the current record.
    pub fn last_delivery(&self) -> Option<DeliveryRecord> {
        self.record.lock().clone()
    }
}

impl Default for DuplicateSuppressor {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_WINDOW)
    }
}

fn is_replay(
    record: Option<&DeliveryRecord>,
    url: &CanonicalUrl,
    now: Instant,
    window: Duration,
) -> bool {
    record.is_some_and(|r| {
        r.url == *url && now.saturating_duration_since(r.handled_at) < window
    })
}
