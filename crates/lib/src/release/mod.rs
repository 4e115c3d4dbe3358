//! Release management boundary.
//!
//! A [`Releaser`] installs, upgrades and removes a rendered chart as a named
//! release. Releasers are namespace scoped; a [`ReleaserFactory`] hands out
//! one for the namespace of the instance being reconciled.

pub mod memory;

use std::sync::Arc;

use thiserror::Error;

use crate::consts::DEFAULT_MAX_HISTORY;
use crate::render::{ManifestBundle, Values};

pub use memory::{MemoryReleaser, ReleaseCall};

/// Errors reported by a releaser.
#[derive(Debug, Error)]
pub enum ReleaseError {
  /// The named release does not exist.
  #[error("release not found: {0}")]
  NotFound(String),

  /// The release operation failed.
  #[error("release {release} failed: {message}")]
  Failed { release: String, message: String },
}

impl ReleaseError {
  pub fn failed(release: impl Into<String>, message: impl Into<String>) -> Self {
    ReleaseError::Failed {
      release: release.into(),
      message: message.into(),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, ReleaseError::NotFound(_))
  }
}

/// Settings passed to every releaser the factory creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
  /// Storage driver for release records; `None` lets the releaser choose.
  pub driver: Option<String>,
  /// Maximum revisions kept per release, 0 for unlimited.
  pub max_history: usize,
}

impl Default for ReleaseOptions {
  fn default() -> Self {
    Self {
      driver: None,
      max_history: DEFAULT_MAX_HISTORY,
    }
  }
}

pub trait Releaser: Send + Sync {
  /// Upgrade `release` to the given chart and values.
  ///
  /// When the release does not exist and `install` is set, it is installed
  /// instead; without `install` a missing release is [`ReleaseError::NotFound`].
  fn upgrade(&self, release: &str, bundle: &ManifestBundle, values: &Values, install: bool) -> Result<(), ReleaseError>;

  /// Remove `release`. A missing release is [`ReleaseError::NotFound`].
  fn uninstall(&self, release: &str) -> Result<(), ReleaseError>;
}

/// Creates releasers bound to a namespace.
pub trait ReleaserFactory: Send + Sync {
  fn for_namespace(&self, namespace: &str, options: &ReleaseOptions) -> Result<Arc<dyn Releaser>, ReleaseError>;
}

impl<F> ReleaserFactory for F
where
  F: Fn(&str, &ReleaseOptions) -> Result<Arc<dyn Releaser>, ReleaseError> + Send + Sync,
{
  fn for_namespace(&self, namespace: &str, options: &ReleaseOptions) -> Result<Arc<dyn Releaser>, ReleaseError> {
    self(namespace, options)
  }
}

/// Factory returning the same releaser for every namespace.
#[derive(Clone)]
pub struct SharedReleaser(pub Arc<dyn Releaser>);

impl ReleaserFactory for SharedReleaser {
  fn for_namespace(&self, _namespace: &str, _options: &ReleaseOptions) -> Result<Arc<dyn Releaser>, ReleaseError> {
    Ok(Arc::clone(&self.0))
  }
}
