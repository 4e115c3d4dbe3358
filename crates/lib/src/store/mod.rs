//! Declarative resource store boundary.
//!
//! The reconciler reads and writes primary instances and lists secondary
//! resources through a [`ResourceStore`]. Watch delivery is not part of this
//! trait: events reach the controller through its channel.

pub mod memory;

use thiserror::Error;

use crate::instance::Instance;
use crate::reference::{Labels, ObjectKey, Resource};

pub use memory::MemoryStore;

/// Errors that can occur when talking to the store.
#[derive(Debug, Error)]
pub enum StoreError {
  /// The instance does not exist.
  #[error("instance {0} not found")]
  NotFound(ObjectKey),

  /// An update was based on a stale resource version.
  #[error("conflict updating {key}: expected resource version {expected}, found {actual}")]
  Conflict { key: ObjectKey, expected: u64, actual: u64 },

  /// A patch could not be applied.
  #[error("invalid patch for {key}: {source}")]
  InvalidPatch {
    key: ObjectKey,
    #[source]
    source: json_patch::PatchError,
  },

  /// An instance could not be converted to or from its document form.
  #[error("failed to serialize instance: {0}")]
  Serialize(#[from] serde_json::Error),
}

impl StoreError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, StoreError::NotFound(_))
  }
}

/// Exact-match label selector: every listed label must be present with the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
  pub labels: Labels,
}

impl LabelSelector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.labels.insert(key.into(), value.into());
    self
  }

  pub fn matches(&self, labels: &Labels) -> bool {
    self.labels.iter().all(|(k, v)| labels.get(k) == Some(v))
  }
}

pub trait ResourceStore: Send + Sync {
  /// Fetch an instance. A missing instance is [`StoreError::NotFound`].
  fn get(&self, key: &ObjectKey) -> Result<Instance, StoreError>;

  /// Replace an instance, returning the stored result.
  fn update(&self, instance: &Instance) -> Result<Instance, StoreError>;

  /// Apply a JSON patch to an instance, returning the stored result.
  fn patch(&self, key: &ObjectKey, patch: &json_patch::Patch) -> Result<Instance, StoreError>;

  /// List secondary resources matching `selector`.
  fn list(&self, selector: &LabelSelector) -> Result<Vec<Resource>, StoreError>;
}
