//! The reconciliation engine.
//!
//! One pass drives a single instance toward its desired state:
//!
//! 1. Fetch the instance (a missing instance ends the pass quietly)
//! 2. Clear every graph edge touching it
//! 3. Deleting: uninstall the release, drop the finalizer and stop
//! 4. Make sure the uninstall finalizer is present
//! 5. Default component images according to the update policy
//! 6. Load the chart and assemble values, discovering managed namespaces
//! 7. Hash chart files and values
//! 8. Upgrade (installing if needed) and record the hash, unless it is unchanged
//!
//! Passes are idempotent. Any error aborts the pass and the caller retries it
//! from the start.

pub mod values;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::OperatorConfig;
use crate::consts::{ANNOTATION_CHART_HASH, ANNOTATION_IMAGE_UPDATE_POLICY, FINALIZER};
use crate::graph::DependencyGraph;
use crate::instance::{Component, Instance, UpdatePolicy, apply_policy};
use crate::reference::ObjectKey;
use crate::release::{ReleaseError, ReleaserFactory};
use crate::render::{RenderError, Renderer};
use crate::store::{ResourceStore, StoreError};
use crate::util::hash::{ContentHash, release_hash};

use values::{assemble_values, discover_namespaces};

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
  /// Reading, writing or listing resources failed.
  #[error("store error: {0}")]
  Store(#[from] StoreError),

  /// The chart could not be loaded.
  #[error("render error: {0}")]
  Render(#[from] RenderError),

  /// Installing, upgrading or uninstalling the release failed.
  #[error("release error: {0}")]
  Release(#[from] ReleaseError),

  /// The instance or the values could not be serialized.
  #[error("serialization error: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// What a successful pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
  /// The instance no longer exists.
  Absent,
  /// The release was uninstalled and the finalizer removed.
  Finalized,
  /// The instance is being deleted and holds no finalizer of ours.
  Deleted,
  /// The release was installed or upgraded to the given hash.
  Applied { hash: ContentHash },
  /// The release already matches the given hash.
  Unchanged { hash: ContentHash },
}

/// Runs one reconciliation pass for an instance.
///
/// Implementations must be safe to call concurrently for different keys.
pub trait Reconcile: Send + Sync {
  fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ReconcileError>;
}

/// Reconciler wired to its collaborators.
#[derive(Clone)]
pub struct Reconciler {
  config: Arc<OperatorConfig>,
  graph: Arc<DependencyGraph>,
  store: Arc<dyn ResourceStore>,
  renderer: Arc<dyn Renderer>,
  releasers: Arc<dyn ReleaserFactory>,
}

impl Reconciler {
  pub fn new(
    config: Arc<OperatorConfig>,
    graph: Arc<DependencyGraph>,
    store: Arc<dyn ResourceStore>,
    renderer: Arc<dyn Renderer>,
    releasers: Arc<dyn ReleaserFactory>,
  ) -> Self {
    Self {
      config,
      graph,
      store,
      renderer,
      releasers,
    }
  }

  pub fn graph(&self) -> &Arc<DependencyGraph> {
    &self.graph
  }

  pub fn config(&self) -> &OperatorConfig {
    &self.config
  }

  fn finalize(&self, mut instance: Instance) -> Result<ReconcileOutcome, ReconcileError> {
    let key = instance.key();
    if !instance.has_finalizer(FINALIZER) {
      debug!(instance = %key, "deleting without finalizer, nothing to clean up");
      return Ok(ReconcileOutcome::Deleted);
    }

    let releaser = self
      .releasers
      .for_namespace(&instance.metadata.namespace, &self.config.release)?;
    match releaser.uninstall(&instance.metadata.name) {
      Ok(()) => info!(instance = %key, "release uninstalled"),
      Err(e) if e.is_not_found() => info!(instance = %key, "release already removed"),
      Err(e) => return Err(e.into()),
    }

    instance.remove_finalizer(FINALIZER);
    self.store.update(&instance)?;
    info!(instance = %key, "finalizer removed");
    Ok(ReconcileOutcome::Finalized)
  }

  /// Apply the image update policy to every component, patching only real changes.
  fn default_images(&self, instance: Instance) -> Result<Instance, ReconcileError> {
    let policy = UpdatePolicy::from_annotation(instance.annotation(ANNOTATION_IMAGE_UPDATE_POLICY));

    let mut desired = instance.clone();
    for component in Component::ALL {
      let current = instance.spec.component(component);
      *desired.spec.component_mut(component) = apply_policy(current, policy, self.config.image_source(component));
    }

    let key = instance.key();
    match self.patch_towards(&instance, &desired)? {
      Some(patched) => {
        info!(instance = %key, policy = policy.as_str(), "component images updated");
        Ok(patched)
      }
      None => Ok(instance),
    }
  }

  /// Patch `current` into `desired`, skipping the write when they serialize the same.
  fn patch_towards(&self, current: &Instance, desired: &Instance) -> Result<Option<Instance>, ReconcileError> {
    let from: Value = serde_json::to_value(current)?;
    let to: Value = serde_json::to_value(desired)?;
    let patch = json_patch::diff(&from, &to);
    if patch.0.is_empty() {
      return Ok(None);
    }
    Ok(Some(self.store.patch(&current.key(), &patch)?))
  }
}

impl Reconcile for Reconciler {
  fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ReconcileError> {
    let mut instance = match self.store.get(key) {
      Ok(instance) => instance,
      Err(e) if e.is_not_found() => {
        debug!(instance = %key, "instance not found, nothing to do");
        return Ok(ReconcileOutcome::Absent);
      }
      Err(e) => return Err(e.into()),
    };

    self.graph.remove_all_dependencies_for(&instance.reference());

    if instance.is_deleting() {
      return self.finalize(instance);
    }

    if instance.add_finalizer(FINALIZER) {
      instance = self.store.update(&instance)?;
      info!(instance = %key, "finalizer added");
    }

    let instance = self.default_images(instance)?;

    let bundle = self.renderer.load(&self.config.chart_dir)?;
    let namespaces = if self.config.is_cluster_wide(key) {
      debug!(instance = %key, "cluster-wide instance, skipping namespace discovery");
      None
    } else {
      Some(discover_namespaces(self.store.as_ref(), &self.graph, &instance)?)
    };
    let values = assemble_values(&bundle.values, namespaces);

    let hash = release_hash(&bundle.files, &values)?;
    if instance.annotation(ANNOTATION_CHART_HASH) == Some(hash.as_str()) {
      debug!(instance = %key, hash = %hash, "release up to date");
      return Ok(ReconcileOutcome::Unchanged { hash });
    }

    let releaser = self
      .releasers
      .for_namespace(&instance.metadata.namespace, &self.config.release)?;
    releaser.upgrade(&instance.metadata.name, &bundle, &values, true)?;

    let recorded = instance.clone().with_annotation(ANNOTATION_CHART_HASH, hash.as_str());
    self.patch_towards(&instance, &recorded)?;
    info!(instance = %key, hash = %hash, files = bundle.files.len(), "release applied");

    Ok(ReconcileOutcome::Applied { hash })
  }
}
