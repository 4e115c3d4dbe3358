//! In-process resource store.
//!
//! Mirrors the semantics a reconciler relies on from a real declarative store:
//!
//! - every write bumps the resource version
//! - `update` is rejected when the caller's resource version is stale
//! - `delete` only marks objects that still carry finalizers
//! - an object that is deleting and has lost its last finalizer disappears

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tracing::debug;

use super::{LabelSelector, ResourceStore, StoreError};
use crate::instance::Instance;
use crate::reference::{ObjectKey, Reference, Resource};

#[derive(Debug, Default)]
pub struct MemoryStore {
  instances: RwLock<BTreeMap<ObjectKey, Instance>>,
  resources: RwLock<Vec<Resource>>,
  writes: AtomicUsize,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed an instance, as if created by a user. Returns the stored copy.
  pub fn create(&self, mut instance: Instance) -> Instance {
    instance.metadata.resource_version = 1;
    self.instances.write().insert(instance.key(), instance.clone());
    instance
  }

  /// Request deletion of an instance.
  ///
  /// Returns false if the instance does not exist.
  pub fn delete(&self, key: &ObjectKey) -> bool {
    let mut instances = self.instances.write();
    let Some(instance) = instances.get_mut(key) else {
      return false;
    };

    if instance.metadata.finalizers.is_empty() {
      instances.remove(key);
    } else if instance.metadata.deletion_timestamp.is_none() {
      instance.metadata.deletion_timestamp = Some(now_unix());
      instance.metadata.resource_version += 1;
    }
    true
  }

  /// Add or replace a secondary resource. Listing preserves insertion order.
  pub fn put_resource(&self, resource: Resource) {
    let mut resources = self.resources.write();
    match resources.iter_mut().find(|r| r.reference == resource.reference) {
      Some(existing) => *existing = resource,
      None => resources.push(resource),
    }
  }

  pub fn remove_resource(&self, reference: &Reference) {
    self.resources.write().retain(|r| &r.reference != reference);
  }

  /// Number of successful `update` and `patch` calls.
  pub fn write_count(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  fn store(&self, instances: &mut BTreeMap<ObjectKey, Instance>, mut instance: Instance) -> Instance {
    instance.metadata.resource_version += 1;
    self.writes.fetch_add(1, Ordering::SeqCst);

    let key = instance.key();
    if instance.is_deleting() && instance.metadata.finalizers.is_empty() {
      debug!(instance = %key, "last finalizer removed, deleting");
      instances.remove(&key);
    } else {
      instances.insert(key, instance.clone());
    }
    instance
  }
}

impl ResourceStore for MemoryStore {
  fn get(&self, key: &ObjectKey) -> Result<Instance, StoreError> {
    self
      .instances
      .read()
      .get(key)
      .cloned()
      .ok_or_else(|| StoreError::NotFound(key.clone()))
  }

  fn update(&self, instance: &Instance) -> Result<Instance, StoreError> {
    let key = instance.key();
    let mut instances = self.instances.write();
    let current = instances.get(&key).ok_or_else(|| StoreError::NotFound(key.clone()))?;

    if current.metadata.resource_version != instance.metadata.resource_version {
      return Err(StoreError::Conflict {
        expected: instance.metadata.resource_version,
        actual: current.metadata.resource_version,
        key,
      });
    }

    let mut next = instance.clone();
    // The deletion marker is owned by the store, not by writers.
    next.metadata.deletion_timestamp = current.metadata.deletion_timestamp;
    Ok(self.store(&mut instances, next))
  }

  fn patch(&self, key: &ObjectKey, patch: &json_patch::Patch) -> Result<Instance, StoreError> {
    let mut instances = self.instances.write();
    let current = instances.get(key).ok_or_else(|| StoreError::NotFound(key.clone()))?;

    let mut doc = serde_json::to_value(current)?;
    json_patch::patch(&mut doc, &patch.0).map_err(|source| StoreError::InvalidPatch {
      key: key.clone(),
      source,
    })?;

    let mut next: Instance = serde_json::from_value(doc)?;
    next.metadata.resource_version = current.metadata.resource_version;
    next.metadata.deletion_timestamp = current.metadata.deletion_timestamp;
    Ok(self.store(&mut instances, next))
  }

  fn list(&self, selector: &LabelSelector) -> Result<Vec<Resource>, StoreError> {
    Ok(
      self
        .resources
        .read()
        .iter()
        .filter(|r| selector.matches(&r.labels))
        .cloned()
        .collect(),
    )
  }
}

fn now_unix() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_secs()
}
