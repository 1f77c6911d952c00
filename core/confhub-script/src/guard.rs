//! Runaway-script detection.
//!
//! Scripts may change settings, and setting changes trigger scripts, so a
//! pair of scripts can bounce off each other forever. The guard keeps a
//! bounded execution history per owner and refuses a run when the owner has
//! executed unusually often in the recent past.
//!
//! Rule: with `D` the owner's mean recorded duration, count the executions
//! that finished within `window_multiplier × D` of now, plus the attempt
//! being checked. More than `max_executions_in_window` of them means the
//! owner is likely looping, so with the defaults the eleventh back-to-back
//! attempt is refused.

use crate::config::GuardConfig;
use confhub_types::ClientId;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// One completed script execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub finished_at: Instant,
    pub duration: Duration,
}

/// Tracks recent script executions per owner. Safe to share across threads.
#[derive(Debug, Default)]
pub struct RunawayGuard {
    config: GuardConfig,
    history: Mutex<HashMap<ClientId, VecDeque<ExecutionRecord>>>,
}

impl RunawayGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    fn history(&self) -> MutexGuard<'_, HashMap<ClientId, VecDeque<ExecutionRecord>>> {
        // A poisoned map still holds valid records.
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records an execution of `duration` that finished just now.
    pub fn record(&self, owner: ClientId, duration: Duration) {
        self.record_at(owner, Instant::now(), duration);
    }

    /// Records an execution that finished at `finished_at`. The oldest record
    /// is dropped once the owner's history is at capacity.
    pub fn record_at(&self, owner: ClientId, finished_at: Instant, duration: Duration) {
        let capacity = self.config.history_capacity.max(1);
        let mut history = self.history();
        let records = history.entry(owner).or_default();
        while records.len() >= capacity {
            records.pop_front();
        }
        records.push_back(ExecutionRecord {
            finished_at,
            duration,
        });
        debug!(
            owner = %owner,
            duration_us = duration.as_micros() as u64,
            history = records.len(),
            "Recorded script execution"
        );
    }

    /// Whether `owner` appears to be in a runaway loop right now.
    pub fn is_likely_looping(&self, owner: ClientId) -> bool {
        self.is_likely_looping_at(owner, Instant::now())
    }

    /// [`is_likely_looping`](Self::is_likely_looping) evaluated at `now`.
    pub fn is_likely_looping_at(&self, owner: ClientId, now: Instant) -> bool {
        let history = self.history();
        let Some(records) = history.get(&owner) else {
            return false;
        };
        if records.is_empty() {
            return false;
        }

        let total: Duration = records.iter().map(|r| r.duration).sum();
        let mean = total / records.len() as u32;
        let window = mean.saturating_mul(self.config.window_multiplier);
        let recent = records
            .iter()
            .filter(|r| now.saturating_duration_since(r.finished_at) <= window)
            .count();

        let attempts = recent + 1;
        debug!(
            owner = %owner,
            attempts,
            window_us = window.as_micros() as u64,
            "Checked recent script executions"
        );
        attempts > self.config.max_executions_in_window
    }

    /// Number of records currently held for `owner`.
    pub fn history_len(&self, owner: ClientId) -> usize {
        self.history().get(&owner).map_or(0, VecDeque::len)
    }

    /// Forgets every record for `owner`.
    pub fn clear(&self, owner: ClientId) {
        self.history().remove(&owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_owner_is_not_looping() {
        let guard = RunawayGuard::default();
        assert!(!guard.is_likely_looping(ClientId::new()));
    }

    #[test]
    fn history_is_bounded() {
        let guard = RunawayGuard::new(GuardConfig {
            history_capacity: 3,
            ..GuardConfig::default()
        });
        let owner = ClientId::new();
        let start = Instant::now();
        for _ in 0..5 {
            guard.record_at(owner, start, Duration::from_millis(1));
        }
        assert_eq!(guard.history_len(owner), 3);
    }

    #[test]
    fn single_record_is_not_looping() {
        let guard = RunawayGuard::default();
        let owner = ClientId::new();
        guard.record(owner, Duration::from_millis(5));
        assert!(!guard.is_likely_looping(owner));
    }
}
