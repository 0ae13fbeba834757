//! Fixed-window admission counting.
//!
//! Each protected resource has one window cell: a start instant and a
//! count. When the window length has elapsed the cell resets and counting
//! starts over; there is no smoothing across the boundary. A request
//! governed by several rules is admitted only if every rule has quota,
//! and the commit is all-or-nothing so a denial never consumes quota
//! from the rules that would have admitted it.

use gatehouse_proxy::AdmissionRule;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: u64,
}

/// Shared fixed-window counters, keyed by resource id.
///
/// Cells are created lazily on first use and survive rule reloads, so a
/// reload that keeps a resource does not reset its live window.
#[derive(Debug, Default)]
pub struct FixedWindowLimiter {
    cells: Mutex<HashMap<String, Arc<Mutex<Window>>>>,
}

impl FixedWindowLimiter {
    /// Creates a limiter with no live windows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to admit one request under every rule in `rules`.
    ///
    /// Returns the resource id of the first exhausted rule on denial, or
    /// `Ok(())` after incrementing every window. Cells are locked in
    /// sorted resource order, which keeps concurrent multi-rule admits
    /// deadlock-free.
    pub fn try_admit(&self, rules: &[&AdmissionRule]) -> Result<(), String> {
        if rules.is_empty() {
            return Ok(());
        }

        let now = Instant::now();

        let mut sorted: Vec<&&AdmissionRule> = rules.iter().collect();
        sorted.sort_by(|a, b| a.resource.cmp(&b.resource));

        let cells: Vec<(Arc<Mutex<Window>>, &AdmissionRule)> = {
            let mut map = self.cells.lock();
            sorted
                .iter()
                .map(|rule| {
                    let cell = map
                        .entry(rule.resource.clone())
                        .or_insert_with(|| {
                            Arc::new(Mutex::new(Window {
                                started_at: now,
                                count: 0,
                            }))
                        })
                        .clone();
                    (cell, **rule)
                })
                .collect()
        };

        let mut guards = Vec::with_capacity(cells.len());
        for (cell, rule) in &cells {
            let mut window = cell.lock();
            if now.duration_since(window.started_at) >= Duration::from_secs(rule.window_secs) {
                window.started_at = now;
                window.count = 0;
            }
            guards.push((window, *rule));
        }

        if let Some((_, exhausted)) = guards
            .iter()
            .find(|(window, rule)| window.count >= rule.max_requests)
        {
            return Err(exhausted.resource.clone());
        }

        for (window, _) in &mut guards {
            window.count += 1;
        }
        Ok(())
    }
}
