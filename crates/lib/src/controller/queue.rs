//! Deduplicating work queue with per-key backoff.
//!
//! A key is in at most one of three places: pending, active (a pass is
//! running) or nowhere. Adding a key that is already pending is a no-op;
//! adding one that is active marks it dirty so it is queued again once the
//! running pass is done.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use crate::reference::ObjectKey;

/// Exponential retry delay: `base * 2^failures`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
  pub base: Duration,
  pub max: Duration,
}

impl Default for Backoff {
  fn default() -> Self {
    Self {
      base: Duration::from_millis(5),
      max: Duration::from_secs(300),
    }
  }
}

impl Backoff {
  /// Delay before retry number `failures` (1 for the first retry).
  pub fn delay(&self, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(31);
    self.base.saturating_mul(1u32 << exponent).min(self.max)
  }
}

#[derive(Debug, Default)]
pub struct WorkQueue {
  pending: VecDeque<ObjectKey>,
  queued: HashSet<ObjectKey>,
  active: HashSet<ObjectKey>,
  dirty: HashSet<ObjectKey>,
  failures: HashMap<ObjectKey, u32>,
  backoff: Backoff,
}

impl WorkQueue {
  pub fn new(backoff: Backoff) -> Self {
    Self {
      backoff,
      ..Self::default()
    }
  }

  /// Queue `key` unless it is already waiting.
  pub fn add(&mut self, key: ObjectKey) {
    if self.active.contains(&key) {
      self.dirty.insert(key);
      return;
    }
    if self.queued.insert(key.clone()) {
      self.pending.push_back(key);
    }
  }

  /// Take the next key and mark it active.
  pub fn next(&mut self) -> Option<ObjectKey> {
    let key = self.pending.pop_front()?;
    self.queued.remove(&key);
    self.active.insert(key.clone());
    Some(key)
  }

  /// Mark the pass for `key` finished, re-queueing it if it was added meanwhile.
  pub fn done(&mut self, key: &ObjectKey) {
    self.active.remove(key);
    if self.dirty.remove(key) {
      self.add(key.clone());
    }
  }

  /// Clear the failure count of `key` after a successful pass.
  pub fn forget(&mut self, key: &ObjectKey) {
    self.failures.remove(key);
  }

  /// Record a failed pass and return how long to wait before retrying.
  pub fn backoff(&mut self, key: &ObjectKey) -> Duration {
    let failures = self.failures.entry(key.clone()).or_insert(0);
    *failures = failures.saturating_add(1);
    self.backoff.delay(*failures)
  }

  pub fn failures(&self, key: &ObjectKey) -> u32 {
    self.failures.get(key).copied().unwrap_or(0)
  }

  pub fn len(&self) -> usize {
    self.pending.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.is_empty()
  }

  pub fn active(&self) -> usize {
    self.active.len()
  }
}
