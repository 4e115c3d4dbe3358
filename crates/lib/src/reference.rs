//! Resource identities.
//!
//! A [`Reference`] names any resource by group, kind, namespace and name and is
//! the node key of the dependency graph. An [`ObjectKey`] is the narrower
//! namespace/name pair that addresses a primary instance.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{INSTANCE_API_GROUP, INSTANCE_KIND};

/// Labels attached to a resource.
pub type Labels = BTreeMap<String, String>;

/// Identity of a resource: `{api_group, kind, namespace, name}`.
///
/// Two references are equal iff all four fields match.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
  pub api_group: String,
  pub kind: String,
  pub namespace: String,
  pub name: String,
}

impl Reference {
  pub fn new(
    api_group: impl Into<String>,
    kind: impl Into<String>,
    namespace: impl Into<String>,
    name: impl Into<String>,
  ) -> Self {
    Self {
      api_group: api_group.into(),
      kind: kind.into(),
      namespace: namespace.into(),
      name: name.into(),
    }
  }

  /// Reference to a primary instance.
  pub fn instance(namespace: impl Into<String>, name: impl Into<String>) -> Self {
    Self::new(INSTANCE_API_GROUP, INSTANCE_KIND, namespace, name)
  }

  /// Reference to a (cluster scoped) core namespace.
  pub fn namespace(name: impl Into<String>) -> Self {
    Self::new("", "Namespace", "", name)
  }

  /// The namespace/name part of this reference.
  pub fn key(&self) -> ObjectKey {
    ObjectKey::new(&self.namespace, &self.name)
  }
}

impl fmt::Display for Reference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.api_group.is_empty() {
      write!(f, "{}:{}/{}", self.kind, self.namespace, self.name)
    } else {
      write!(f, "{}.{}:{}/{}", self.kind, self.api_group, self.namespace, self.name)
    }
  }
}

/// Namespace/name pair addressing a primary instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
  pub namespace: String,
  pub name: String,
}

impl ObjectKey {
  pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      namespace: namespace.into(),
      name: name.into(),
    }
  }
}

impl fmt::Display for ObjectKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.namespace, self.name)
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid object key {0:?}: expected <namespace>/<name>")]
pub struct ParseObjectKeyError(pub String);

impl FromStr for ObjectKey {
  type Err = ParseObjectKeyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().split_once('/') {
      Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() && !name.contains('/') => {
        Ok(Self::new(namespace, name))
      }
      _ => Err(ParseObjectKeyError(s.to_string())),
    }
  }
}

/// A resource as seen by a watch or a list: its identity plus current labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
  pub reference: Reference,
  #[serde(default)]
  pub labels: Labels,
}

impl Resource {
  pub fn new(reference: Reference) -> Self {
    Self {
      reference,
      labels: Labels::new(),
    }
  }

  pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.labels.insert(key.into(), value.into());
    self
  }
}
