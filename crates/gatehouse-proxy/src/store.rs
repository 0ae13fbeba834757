//! Atomically swappable rule snapshot holder.

use crate::rules::{RuleError, RuleSet};
use parking_lot::RwLock;
use std::sync::Arc;

/// Holds the currently active [`RuleSet`] and swaps it wholesale.
///
/// Readers take a cheap `Arc` clone of the snapshot; a request that
/// started under the old set finishes under the old set. Writers validate
/// the candidate first, so an invalid reload leaves the active set
/// untouched.
#[derive(Debug)]
pub struct RuleStore {
    active: RwLock<Arc<RuleSet>>,
}

impl RuleStore {
    /// Creates a store with an initial, already validated set.
    pub fn new(initial: RuleSet) -> Result<Self, RuleError> {
        initial.validate()?;
        Ok(Self {
            active: RwLock::new(Arc::new(initial)),
        })
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.active.read())
    }

    /// Validates and installs a replacement set. On error the previous
    /// set stays active.
    pub fn replace(&self, candidate: RuleSet) -> Result<(), RuleError> {
        candidate.validate()?;
        *self.active.write() = Arc::new(candidate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RouteRule, RuleSet};

    fn one_route(prefix: &str) -> RuleSet {
        RuleSet {
            routes: vec![RouteRule {
                path_prefix: prefix.to_string(),
                strip_prefix_segments: 1,
                target_service: "svc".to_string(),
            }],
            admission: Vec::new(),
            auth_whitelist: Vec::new(),
        }
    }

    #[test]
    fn replace_swaps_the_snapshot() {
        let store = RuleStore::new(one_route("/a")).unwrap();
        let before = store.snapshot();
        store.replace(one_route("/b")).unwrap();
        let after = store.snapshot();

        assert!(before.match_route("/a/x").is_some());
        assert!(after.match_route("/a/x").is_none());
        assert!(after.match_route("/b/x").is_some());
    }

    #[test]
    fn invalid_replacement_keeps_previous_set() {
        let store = RuleStore::new(one_route("/a")).unwrap();
        let invalid = one_route("no-leading-slash");
        assert!(store.replace(invalid).is_err());
        assert!(store.snapshot().match_route("/a/x").is_some());
    }

    #[test]
    fn old_snapshot_survives_a_swap() {
        let store = RuleStore::new(one_route("/a")).unwrap();
        let held = store.snapshot();
        store.replace(one_route("/b")).unwrap();
        // A request that grabbed the old set still sees it unchanged.
        assert!(held.match_route("/a/x").is_some());
    }
}
