//! Undirected dependency graph between resources.
//!
//! The graph records which resources are related so that a change to one of
//! them can be routed back to the primary instances that depend on it. Edges
//! are stored symmetrically: an edge `a - b` lives in the bucket of `a` and in
//! the bucket of `b`.
//!
//! Removing an edge only marks it `false`; the bucket entry stays behind until
//! [`DependencyGraph::compact`] is called. Soft-deleted edges are never
//! reported by [`DependencyGraph::has_dependency`] or
//! [`DependencyGraph::dependencies_for`].
//!
//! Every public operation is atomic on its own. Sequences of calls are not:
//! concurrent readers may observe an edge set that is being rebuilt.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::reference::Reference;

type Edges = HashMap<Reference, HashMap<Reference, bool>>;

/// Concurrency-safe bidirectional reference graph.
///
/// Share it between passes with an `Arc`.
#[derive(Debug, Default)]
pub struct DependencyGraph {
  edges: RwLock<Edges>,
}

impl DependencyGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Create (or revive) the edge between `a` and `b`.
  pub fn add_dependency(&self, a: &Reference, b: &Reference) {
    self.set(a, b, true);
  }

  /// Soft-delete the edge between `a` and `b`.
  pub fn remove_dependency(&self, a: &Reference, b: &Reference) {
    self.set(a, b, false);
  }

  /// Every reference currently connected to `a`, in unspecified order.
  pub fn dependencies_for(&self, a: &Reference) -> Vec<Reference> {
    let edges = self.edges.read();
    let Some(bucket) = edges.get(a) else {
      return Vec::new();
    };

    bucket
      .iter()
      .filter(|(_, active)| **active)
      .map(|(b, _)| b.clone())
      .collect()
  }

  /// Soft-delete every edge incident to `a`.
  pub fn remove_all_dependencies_for(&self, a: &Reference) {
    let mut edges = self.edges.write();
    let Some(bucket) = edges.get_mut(a) else {
      return;
    };

    let mut connected = Vec::new();
    for (b, active) in bucket.iter_mut() {
      if *active {
        *active = false;
        connected.push(b.clone());
      }
    }

    for b in connected {
      if let Some(reverse) = edges.get_mut(&b).and_then(|bucket| bucket.get_mut(a)) {
        *reverse = false;
      }
    }
  }

  /// True iff the edge is active in both directions.
  pub fn has_dependency(&self, a: &Reference, b: &Reference) -> bool {
    let edges = self.edges.read();
    let forward = edges.get(a).and_then(|bucket| bucket.get(b)).copied().unwrap_or(false);
    let backward = edges.get(b).and_then(|bucket| bucket.get(a)).copied().unwrap_or(false);
    forward && backward
  }

  /// Drop soft-deleted edges and buckets left without any active edge.
  ///
  /// Returns the number of buckets removed.
  pub fn compact(&self) -> usize {
    let mut edges = self.edges.write();
    let before = edges.len();
    for bucket in edges.values_mut() {
      bucket.retain(|_, active| *active);
    }
    edges.retain(|_, bucket| !bucket.is_empty());
    before - edges.len()
  }

  /// Number of buckets, including ones holding only soft-deleted edges.
  pub fn node_count(&self) -> usize {
    self.edges.read().len()
  }

  fn set(&self, a: &Reference, b: &Reference, active: bool) {
    let mut edges = self.edges.write();
    edges.entry(a.clone()).or_default().insert(b.clone(), active);
    edges.entry(b.clone()).or_default().insert(a.clone(), active);
  }
}
