//! Time-bounded memory of delivery identifiers.
//!
//! [`DedupeCache`] knows nothing about notifications: it answers "has this
//! identifier been seen within the retention window" and nothing else.
//! [`LastDelivery`] is the single-slot fast path checked before signature
//! verification.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};

use crate::types::DedupeRecord;

/// Source of "now" for expiry decisions.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct DedupeCache {
    retention: Duration,
    clock: Clock,
    records: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl DedupeCache {
    /// Creates a cache using the wall clock.
    pub fn new(retention: Duration) -> Self {
        Self::with_clock(retention, Arc::new(Utc::now))
    }

    pub fn with_clock(retention: Duration, clock: Clock) -> Self {
        Self {
            retention,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Returns `true` when `id` was recorded and has not yet expired.
    pub fn seen(&self, id: &str) -> bool {
        let now = (self.clock)();
        let records = self.lock();
        records
            .get(id)
            .is_some_and(|seen_at| !self.is_expired(*seen_at, now))
    }

    /// Remembers `id`. A live record is left untouched so its expiry is not
    /// pushed back.
    pub fn record(&self, id: &str) {
        let now = (self.clock)();
        let mut records = self.lock();
        self.insert_if_absent(&mut records, id, now);
    }

    /// Atomically checks for `id` and records it when absent.
    ///
    /// Returns `true` when the identifier was already known. Of any number of
    /// concurrent callers with the same identifier, exactly one observes
    /// `false`.
    pub fn check_and_record(&self, id: &str) -> bool {
        let now = (self.clock)();
        let mut records = self.lock();
        !self.insert_if_absent(&mut records, id, now)
    }

    /// Returns the live record for `id`, if any.
    pub fn get(&self, id: &str) -> Option<DedupeRecord> {
        let now = (self.clock)();
        let records = self.lock();
        records
            .get(id)
            .filter(|seen_at| !self.is_expired(**seen_at, now))
            .map(|seen_at| DedupeRecord {
                delivery_id: id.to_string(),
                seen_at: *seen_at,
            })
    }

    /// Drops every record older than the retention window and returns how
    /// many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = (self.clock)();
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, seen_at| !self.is_expired(*seen_at, now));
        before - records.len()
    }

    /// Number of records currently held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_if_absent(
        &self,
        records: &mut HashMap<String, DateTime<Utc>>,
        id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        match records.get_mut(id) {
            Some(seen_at) if !self.is_expired(*seen_at, now) => false,
            Some(seen_at) => {
                *seen_at = now;
                true
            }
            None => {
                records.insert(id.to_string(), now);
                true
            }
        }
    }

    fn is_expired(&self, seen_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(seen_at)
            .to_std()
            .map(|age| age >= self.retention)
            .unwrap_or(false)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DedupeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupeCache")
            .field("retention", &self.retention)
            .field("records", &self.len())
            .finish()
    }
}

/// The identifier of the most recently processed delivery.
#[derive(Debug, Default)]
pub struct LastDelivery {
    id: Mutex<Option<String>>,
}

impl LastDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `id` equals the most recently processed identifier.
    pub fn matches(&self, id: &str) -> bool {
        self.lock().as_deref() == Some(id)
    }

    pub fn set(&self, id: &str) {
        *self.lock() = Some(id.to_string());
    }

    pub fn get(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.id.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
