use dashmap::DashMap;

use domain::coords::Coord;
use domain::lockout::coord_key;

/// Recent-repair lockout (C1): suppresses redispatch of a pixel for a
/// configurable window after a successful paint. Workers need several
/// seconds for a paint to show up in the next preview; without this the
/// planner would redispatch the same pixel and waste credits.
pub struct LockoutService {
    locked_until: DashMap<String, i64>,
}

impl LockoutService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locked_until: DashMap::new(),
        }
    }

    /// Locks every coordinate in `coords` until `now + ttl_seconds`.
    pub fn mark(&self, coords: &[Coord], now: i64, ttl_seconds: u64) {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let unlock_at = now.saturating_add(ttl);
        for coord in coords {
            self.locked_until.insert(coord_key(*coord), unlock_at);
        }
    }

    #[must_use]
    pub fn is_locked(&self, coord: Coord, now: i64) -> bool {
        self.locked_until
            .get(&coord_key(coord))
            .is_some_and(|unlock_at| *unlock_at > now)
    }

    /// Drops every lock that has already expired. Called from the preview
    /// ingress path so the map does not grow unbounded.
    pub fn prune_expired(&self, now: i64) {
        self.locked_until.retain(|_, unlock_at| *unlock_at > now);
    }
}

impl Default for LockoutService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_and_expires() {
        let lockout = LockoutService::new();
        let coord = Coord { x: 10, y: 20 };
        assert!(!lockout.is_locked(coord, 0));

        lockout.mark(&[coord], 0, 60);
        assert!(lockout.is_locked(coord, 0));
        assert!(lockout.is_locked(coord, 59));
        assert!(!lockout.is_locked(coord, 61));
    }

    #[test]
    fn prune_removes_expired_only() {
        let lockout = LockoutService::new();
        let a = Coord { x: 1, y: 1 };
        let b = Coord { x: 2, y: 2 };
        lockout.mark(&[a], 0, 10);
        lockout.mark(&[b], 0, 1000);

        lockout.prune_expired(11);
        assert!(!lockout.is_locked(a, 11));
        assert!(lockout.is_locked(b, 11));
    }
}
