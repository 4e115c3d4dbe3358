//! The primary managed resource.
//!
//! An [`Instance`] describes one deployment of the chart: where it lives, which
//! component images it runs and the bookkeeping (annotations, finalizers,
//! deletion marker) the reconciler keeps on it.

pub mod policy;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::reference::{Labels, ObjectKey, Reference};

pub use policy::{Component, UpdatePolicy, apply_policy};

/// Object metadata, in the shape a declarative resource store keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
  pub name: String,
  pub namespace: String,
  #[serde(default)]
  pub labels: Labels,
  #[serde(default)]
  pub annotations: BTreeMap<String, String>,
  #[serde(default)]
  pub finalizers: Vec<String>,
  /// Unix timestamp (seconds) at which deletion was requested.
  #[serde(default)]
  pub deletion_timestamp: Option<u64>,
  #[serde(default)]
  pub resource_version: u64,
}

/// Image and version of one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
  #[serde(default)]
  pub image: String,
  #[serde(default)]
  pub version: String,
}

impl ComponentSpec {
  pub fn new(image: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      image: image.into(),
      version: version.into(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.image.is_empty() && self.version.is_empty()
  }
}

/// Desired deployment parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
  #[serde(default)]
  pub server: ComponentSpec,
  #[serde(default)]
  pub auth_proxy: ComponentSpec,
  #[serde(default)]
  pub cache: ComponentSpec,
}

impl InstanceSpec {
  pub fn component(&self, component: Component) -> &ComponentSpec {
    match component {
      Component::Server => &self.server,
      Component::AuthProxy => &self.auth_proxy,
      Component::Cache => &self.cache,
    }
  }

  pub fn component_mut(&mut self, component: Component) -> &mut ComponentSpec {
    match component {
      Component::Server => &mut self.server,
      Component::AuthProxy => &mut self.auth_proxy,
      Component::Cache => &mut self.cache,
    }
  }
}

/// A managed application instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
  pub metadata: ObjectMeta,
  #[serde(default)]
  pub spec: InstanceSpec,
}

impl Instance {
  pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      metadata: ObjectMeta {
        name: name.into(),
        namespace: namespace.into(),
        ..Default::default()
      },
      spec: InstanceSpec::default(),
    }
  }

  pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.metadata.annotations.insert(key.into(), value.into());
    self
  }

  pub fn with_finalizer(mut self, finalizer: impl Into<String>) -> Self {
    self.add_finalizer(&finalizer.into());
    self
  }

  pub fn with_spec(mut self, spec: InstanceSpec) -> Self {
    self.spec = spec;
    self
  }

  pub fn key(&self) -> ObjectKey {
    ObjectKey::new(&self.metadata.namespace, &self.metadata.name)
  }

  pub fn reference(&self) -> Reference {
    Reference::instance(&self.metadata.namespace, &self.metadata.name)
  }

  pub fn is_deleting(&self) -> bool {
    self.metadata.deletion_timestamp.is_some()
  }

  pub fn annotation(&self, key: &str) -> Option<&str> {
    self.metadata.annotations.get(key).map(String::as_str)
  }

  pub fn has_finalizer(&self, finalizer: &str) -> bool {
    self.metadata.finalizers.iter().any(|f| f == finalizer)
  }

  /// Returns false if the finalizer was already present.
  pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
    if self.has_finalizer(finalizer) {
      return false;
    }
    self.metadata.finalizers.push(finalizer.to_string());
    true
  }

  /// Returns false if the finalizer was not present.
  pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
    let before = self.metadata.finalizers.len();
    self.metadata.finalizers.retain(|f| f != finalizer);
    before != self.metadata.finalizers.len()
  }
}
