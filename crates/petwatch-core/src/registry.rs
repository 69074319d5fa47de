// ── Device registry ──
//
// Concurrent storage of tracked devices with O(1) lookups and push-based
// change notification via `watch` channels. Written only by the monitor's
// control path; read by anyone.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{DeviceId, TrackedDevice};

/// The in-memory set of known devices, keyed by [`DeviceId`].
///
/// Every mutation bumps a version counter and rebuilds the snapshot that
/// subscribers receive. Entries are stored as [`TrackedDevice`], so a
/// snapshot and the escape status derived from it are always published
/// in the same write.
pub struct DeviceRegistry {
    by_id: DashMap<DeviceId, Arc<TrackedDevice>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, sorted by name, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<Arc<TrackedDevice>>>>,

    /// Time of the last successfully applied full poll.
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (last_refresh, _) = watch::channel(None);

        Self {
            by_id: DashMap::new(),
            version,
            snapshot,
            last_refresh,
        }
    }

    /// Insert or replace a device. Returns `true` if the id was new.
    pub(crate) fn upsert(&self, device: TrackedDevice) -> bool {
        let id = device.id().clone();
        let is_new = self.by_id.insert(id, Arc::new(device)).is_none();
        self.rebuild_snapshot();
        self.bump_version();
        is_new
    }

    /// Remove a device. Returns the removed entry if it existed.
    pub(crate) fn remove(&self, id: &DeviceId) -> Option<Arc<TrackedDevice>> {
        let removed = self.by_id.remove(id).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
            self.bump_version();
        }
        removed
    }

    /// Ids present in the registry but absent from `incoming`.
    pub(crate) fn missing_from(&self, incoming: &HashSet<DeviceId>) -> Vec<DeviceId> {
        self.by_id
            .iter()
            .filter(|r| !incoming.contains(r.key()))
            .map(|r| r.key().clone())
            .collect()
    }

    pub(crate) fn mark_refreshed(&self) {
        let _ = self.last_refresh.send_replace(Some(Utc::now()));
    }

    // ── Readers ──────────────────────────────────────────────────────

    pub fn get(&self, id: &DeviceId) -> Option<Arc<TrackedDevice>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Find a device by id, or by case-insensitive name.
    pub fn find(&self, id_or_name: &str) -> Option<Arc<TrackedDevice>> {
        if let Some(found) = self.get(&DeviceId::from(id_or_name)) {
            return Some(found);
        }
        self.by_id
            .iter()
            .find(|r| r.value().snapshot.name.eq_ignore_ascii_case(id_or_name))
            .map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<TrackedDevice>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<TrackedDevice>>>> {
        self.snapshot.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn rebuild_snapshot(&self) {
        let mut values: Vec<Arc<TrackedDevice>> =
            self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by(|a, b| a.snapshot.name.cmp(&b.snapshot.name));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
