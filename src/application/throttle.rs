//! Anti-spam cooldown between app-initiated grants.
//!
//! Process-local by design: entries are lost on restart, which at worst lets
//! one extra open through after a deploy. The map is bounded - once it grows
//! past its capacity, entries older than the window are evicted before the
//! next insert.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::foundation::{DeviceId, Timestamp, UserId};

/// Default entry cap before stale-entry eviction kicks in.
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Outcome of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// No recent grant; the current timestamp was recorded for the key.
    Allowed,
    /// A grant occurred within the window.
    Throttled { remaining_secs: u64 },
}

impl ThrottleDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ThrottleDecision::Allowed)
    }
}

/// Per (actor, device) cooldown clock.
///
/// Safe under concurrent calls for the same key: the check and the timestamp
/// write happen under one mutex, so two racing requests cannot both pass.
#[derive(Debug)]
pub struct CooldownThrottle {
    window_secs: u64,
    max_entries: usize,
    last_grant: Mutex<HashMap<(UserId, DeviceId), u64>>,
}

impl CooldownThrottle {
    /// Creates a throttle with the given window and the default entry cap.
    pub fn new(window_secs: u64) -> Self {
        Self::with_capacity(window_secs, DEFAULT_MAX_ENTRIES)
    }

    /// Creates a throttle with an explicit entry cap.
    pub fn with_capacity(window_secs: u64, max_entries: usize) -> Self {
        Self {
            window_secs,
            max_entries,
            last_grant: Mutex::new(HashMap::new()),
        }
    }

    /// Checks the cooldown for a key, recording the timestamp on allow.
    pub fn try_consume(&self, actor_id: UserId, device_id: DeviceId) -> ThrottleDecision {
        self.try_consume_at(actor_id, device_id, Timestamp::now())
    }

    /// `try_consume` against an explicit clock.
    pub fn try_consume_at(
        &self,
        actor_id: UserId,
        device_id: DeviceId,
        now: Timestamp,
    ) -> ThrottleDecision {
        let now_secs = now.as_unix_secs();
        let mut map = self.lock();

        if let Some(&last) = map.get(&(actor_id, device_id)) {
            let elapsed = now_secs.saturating_sub(last);
            if elapsed < self.window_secs {
                return ThrottleDecision::Throttled {
                    remaining_secs: self.window_secs - elapsed,
                };
            }
        }

        Self::evict_stale(&mut map, now_secs, self.window_secs, self.max_entries);
        map.insert((actor_id, device_id), now_secs);
        ThrottleDecision::Allowed
    }

    /// Records a grant timestamp without checking (QR and guard grants arm the
    /// cooldown but are never gated by it).
    pub fn record(&self, actor_id: UserId, device_id: DeviceId) {
        self.record_at(actor_id, device_id, Timestamp::now());
    }

    /// `record` against an explicit clock.
    pub fn record_at(&self, actor_id: UserId, device_id: DeviceId, now: Timestamp) {
        let now_secs = now.as_unix_secs();
        let mut map = self.lock();
        Self::evict_stale(&mut map, now_secs, self.window_secs, self.max_entries);
        map.insert((actor_id, device_id), now_secs);
    }

    /// Current entry count (test observability).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(UserId, DeviceId), u64>> {
        // A poisoned lock only means another thread panicked mid-insert; the
        // map stays usable.
        self.last_grant
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_stale(
        map: &mut HashMap<(UserId, DeviceId), u64>,
        now_secs: u64,
        window_secs: u64,
        max_entries: usize,
    ) {
        if map.len() >= max_entries {
            map.retain(|_, &mut last| now_secs.saturating_sub(last) < window_secs);
        }
    }
}
