use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Remembers interaction ids so a redelivered interaction never produces a
/// second follow-up.
/// In-memory only; entries expire after the TTL.
#[derive(Debug)]
pub struct InteractionDedup {
    ttl: Duration,
    max_entries: usize,
    seen: Mutex<HashMap<String, Instant>>,
}

impl InteractionDedup {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record `id`; returns `true` the first time an id is seen within the TTL.
    pub fn first_seen(&self, id: &str) -> bool {
        self.first_seen_at(id, Instant::now())
    }

    pub fn first_seen_at(&self, id: &str, now: Instant) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(at) = seen.get(id) {
            if now.saturating_duration_since(*at) < self.ttl {
                return false;
            }
        }

        if seen.len() >= self.max_entries {
            let ttl = self.ttl;
            seen.retain(|_, at| now.saturating_duration_since(*at) < ttl);
        }
        if seen.len() >= self.max_entries {
            // Still full of live entries: evict the oldest.
            if let Some(oldest) = seen
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(k, _)| k.clone())
            {
                seen.remove(&oldest);
            }
        }

        seen.insert(id.to_string(), now);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
