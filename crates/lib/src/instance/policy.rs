//! Declarative image and version defaulting.
//!
//! Operators can pin component images through the environment (`image:version`)
//! and let each instance opt in with the update-policy annotation:
//!
//! - `None`: leave the component untouched (default, also used for unknown values)
//! - `Always`: overwrite from the environment on every pass
//! - `IfNotPresent`: fill in only when both image and version are empty
//!
//! Only the non-empty halves of the environment value are applied, so `repo`
//! updates the image alone and `:v1.2.3` updates the version alone.

use std::fmt;

use tracing::warn;

use super::ComponentSpec;
use crate::consts::{ENV_AUTH_PROXY_IMAGE, ENV_CACHE_IMAGE, ENV_SERVER_IMAGE};

/// Sub-components whose images can be defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
  Server,
  AuthProxy,
  Cache,
}

impl Component {
  pub const ALL: [Component; 3] = [Component::Server, Component::AuthProxy, Component::Cache];

  /// Environment variable carrying the `image:version` for this component.
  pub fn env_var(self) -> &'static str {
    match self {
      Component::Server => ENV_SERVER_IMAGE,
      Component::AuthProxy => ENV_AUTH_PROXY_IMAGE,
      Component::Cache => ENV_CACHE_IMAGE,
    }
  }
}

impl fmt::Display for Component {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Component::Server => "server",
      Component::AuthProxy => "auth-proxy",
      Component::Cache => "cache",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
  #[default]
  None,
  Always,
  IfNotPresent,
}

impl UpdatePolicy {
  /// Interpret the annotation value; absent and unknown values mean `None`.
  pub fn from_annotation(value: Option<&str>) -> Self {
    match value {
      None | Some("None") => UpdatePolicy::None,
      Some("Always") => UpdatePolicy::Always,
      Some("IfNotPresent") => UpdatePolicy::IfNotPresent,
      Some(other) => {
        warn!(policy = other, "unknown image update policy, treating as None");
        UpdatePolicy::None
      }
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      UpdatePolicy::None => "None",
      UpdatePolicy::Always => "Always",
      UpdatePolicy::IfNotPresent => "IfNotPresent",
    }
  }
}

impl ComponentSpec {
  /// Parse `image:version`.
  ///
  /// The split happens at the last `:` unless what follows it contains a `/`,
  /// in which case the colon belongs to a registry port and there is no version.
  pub fn parse(value: &str) -> Self {
    let value = value.trim();
    match value.rsplit_once(':') {
      Some((image, version)) if !version.contains('/') => ComponentSpec::new(image, version),
      _ => ComponentSpec::new(value, ""),
    }
  }
}

/// Compute the component spec `policy` asks for, given the environment `source`.
pub fn apply_policy(current: &ComponentSpec, policy: UpdatePolicy, source: Option<&ComponentSpec>) -> ComponentSpec {
  let Some(source) = source else {
    return current.clone();
  };

  let applies = match policy {
    UpdatePolicy::None => false,
    UpdatePolicy::Always => true,
    UpdatePolicy::IfNotPresent => current.is_empty(),
  };
  if !applies {
    return current.clone();
  }

  let mut next = current.clone();
  if !source.image.is_empty() {
    next.image = source.image.clone();
  }
  if !source.version.is_empty() {
    next.version = source.version.clone();
  }
  next
}
