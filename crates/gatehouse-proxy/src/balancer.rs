//! Round-robin instance selection.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Per-service round-robin cursor.
///
/// The cursor advances monotonically and is reduced modulo the current
/// instance count at selection time, so instance lists of different
/// lengths (a registry refresh shrinking or growing the set) never
/// panic or skew the rotation for other services.
#[derive(Debug, Default)]
pub struct RoundRobinBalancer {
    cursors: Mutex<HashMap<String, usize>>,
}

impl RoundRobinBalancer {
    /// Creates a balancer with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the next instance for `service` from `instances`, or `None`
    /// when the list is empty.
    pub fn pick<'a>(&self, service: &str, instances: &'a [String]) -> Option<&'a String> {
        if instances.is_empty() {
            return None;
        }
        let mut cursors = self.cursors.lock();
        let cursor = cursors.entry(service.to_string()).or_insert(0);
        let picked = &instances[*cursor % instances.len()];
        *cursor = cursor.wrapping_add(1);
        Some(picked)
    }
}
