//! In-process releaser.
//!
//! Keeps installed releases in memory and records every call, which makes the
//! reconciler's behaviour observable without a real cluster.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use super::{ReleaseError, Releaser};
use crate::render::{ManifestBundle, Values};

/// A call received by a [`MemoryReleaser`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseCall {
  Upgrade {
    release: String,
    values: Values,
    install: bool,
  },
  Uninstall {
    release: String,
  },
}

/// An installed release.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRecord {
  pub revision: u32,
  pub files: usize,
  pub values: Values,
}

#[derive(Debug, Default)]
struct State {
  releases: HashMap<String, ReleaseRecord>,
  calls: Vec<ReleaseCall>,
}

#[derive(Debug, Default)]
pub struct MemoryReleaser {
  state: Mutex<State>,
}

impl MemoryReleaser {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn release(&self, name: &str) -> Option<ReleaseRecord> {
    self.state.lock().releases.get(name).cloned()
  }

  pub fn calls(&self) -> Vec<ReleaseCall> {
    self.state.lock().calls.clone()
  }

  pub fn upgrade_count(&self) -> usize {
    self
      .state
      .lock()
      .calls
      .iter()
      .filter(|c| matches!(c, ReleaseCall::Upgrade { .. }))
      .count()
  }

  pub fn uninstall_count(&self) -> usize {
    self
      .state
      .lock()
      .calls
      .iter()
      .filter(|c| matches!(c, ReleaseCall::Uninstall { .. }))
      .count()
  }
}

impl Releaser for MemoryReleaser {
  fn upgrade(&self, release: &str, bundle: &ManifestBundle, values: &Values, install: bool) -> Result<(), ReleaseError> {
    let mut state = self.state.lock();
    state.calls.push(ReleaseCall::Upgrade {
      release: release.to_string(),
      values: values.clone(),
      install,
    });

    let revision = match state.releases.get(release) {
      Some(record) => record.revision + 1,
      None if install => 1,
      None => return Err(ReleaseError::NotFound(release.to_string())),
    };
    debug!(release, revision, "release stored");

    state.releases.insert(
      release.to_string(),
      ReleaseRecord {
        revision,
        files: bundle.files.len(),
        values: values.clone(),
      },
    );
    Ok(())
  }

  fn uninstall(&self, release: &str) -> Result<(), ReleaseError> {
    let mut state = self.state.lock();
    state.calls.push(ReleaseCall::Uninstall {
      release: release.to_string(),
    });

    match state.releases.remove(release) {
      Some(_) => Ok(()),
      None => Err(ReleaseError::NotFound(release.to_string())),
    }
  }
}
