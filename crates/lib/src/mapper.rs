//! Translation of resource change notifications into reconcile requests.

use std::sync::Arc;

use tracing::debug;

use crate::consts::{LABEL_OWNER_NAME, LABEL_OWNER_NAMESPACE};
use crate::graph::DependencyGraph;
use crate::reference::{Labels, ObjectKey, Reference, Resource};

/// Request to run one reconciliation pass for an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
  pub key: ObjectKey,
}

impl From<ObjectKey> for ReconcileRequest {
  fn from(key: ObjectKey) -> Self {
    Self { key }
  }
}

/// Maps a changed resource to the instances depending on it.
#[derive(Debug, Clone)]
pub struct InstanceMapper {
  graph: Arc<DependencyGraph>,
}

impl InstanceMapper {
  pub fn new(graph: Arc<DependencyGraph>) -> Self {
    Self { graph }
  }

  pub fn graph(&self) -> &Arc<DependencyGraph> {
    &self.graph
  }

  /// Produce one request per dependency of `changed`.
  ///
  /// A resource labelled with an owner is linked to that owner first, so the
  /// very first notification about it already reaches the instance.
  pub fn map(&self, changed: &Resource) -> Vec<ReconcileRequest> {
    if let Some(owner) = owner_reference(&changed.labels) {
      self.graph.add_dependency(&changed.reference, &owner);
    }

    let requests: Vec<ReconcileRequest> = self
      .graph
      .dependencies_for(&changed.reference)
      .into_iter()
      .map(|dependency| ReconcileRequest::from(dependency.key()))
      .collect();

    debug!(resource = %changed.reference, requests = requests.len(), "mapped change");
    requests
  }
}

/// The instance a resource points at through its owner labels, if both are set.
pub fn owner_reference(labels: &Labels) -> Option<Reference> {
  let name = labels.get(LABEL_OWNER_NAME).filter(|v| !v.is_empty())?;
  let namespace = labels.get(LABEL_OWNER_NAMESPACE).filter(|v| !v.is_empty())?;
  Some(Reference::instance(namespace.as_str(), name.as_str()))
}
