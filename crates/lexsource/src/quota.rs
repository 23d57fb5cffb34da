//! Daily request quotas for free-tier APIs.
//!
//! The window resets 24 wall-clock hours after the last reset, not at
//! midnight — matching the providers' rolling windows closely enough while
//! keeping the logic clock-free and testable.

use std::sync::Mutex;
use std::time::{Duration, Instant};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

struct QuotaState {
    used: u32,
    window_started: Instant,
}

pub struct DailyQuota {
    limit: u32,
    state: Mutex<QuotaState>,
}

impl DailyQuota {
    pub fn new(limit: u32) -> Self {
        DailyQuota {
            limit,
            state: Mutex::new(QuotaState {
                used: 0,
                window_started: Instant::now(),
            }),
        }
    }

    /// Take one request slot. Returns `false` when the day's budget is gone;
    /// the caller degrades to an empty result rather than failing.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().expect("quota poisoned");
        if state.window_started.elapsed() > DAY {
            state.used = 0;
            state.window_started = Instant::now();
        }
        if state.used < self.limit {
            state.used += 1;
            true
        } else {
            false
        }
    }

    pub fn remaining(&self) -> u32 {
        let state = self.state.lock().expect("quota poisoned");
        self.limit.saturating_sub(state.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_at_limit() {
        let quota = DailyQuota::new(2);
        assert!(quota.try_acquire());
        assert!(quota.try_acquire());
        assert!(!quota.try_acquire());
        assert_eq!(quota.remaining(), 0);
    }
}
