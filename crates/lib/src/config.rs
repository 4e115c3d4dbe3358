//! Operator configuration.
//!
//! Read once from the environment at startup and injected into the reconciler
//! and controller.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::consts::{
  DEFAULT_WORKERS, ENV_CHART_DIR, ENV_CLUSTER_INSTANCES, ENV_MAX_HISTORY, ENV_RELEASE_DRIVER, ENV_WORKERS,
};
use crate::instance::{Component, ComponentSpec};
use crate::reference::ObjectKey;
use crate::release::ReleaseOptions;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  /// A required variable is unset or empty.
  #[error("{0} must be set")]
  Missing(&'static str),

  /// A variable holds a value that cannot be used.
  #[error("invalid value {value:?} for {var}: {reason}")]
  Invalid {
    var: &'static str,
    value: String,
    reason: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
  /// Directory of the chart every instance deploys.
  pub chart_dir: PathBuf,
  /// Options handed to each namespace's releaser.
  pub release: ReleaseOptions,
  /// Instances that manage the whole cluster and skip namespace discovery.
  pub cluster_wide: BTreeSet<ObjectKey>,
  /// Environment-pinned images, applied according to each instance's update policy.
  pub server_image: Option<ComponentSpec>,
  pub auth_proxy_image: Option<ComponentSpec>,
  pub cache_image: Option<ComponentSpec>,
  /// Maximum concurrent reconciliation passes.
  pub workers: usize,
}

impl OperatorConfig {
  /// Configuration with defaults for everything but the chart directory.
  pub fn new(chart_dir: impl Into<PathBuf>) -> Self {
    Self {
      chart_dir: chart_dir.into(),
      release: ReleaseOptions::default(),
      cluster_wide: BTreeSet::new(),
      server_image: None,
      auth_proxy_image: None,
      cache_image: None,
      workers: DEFAULT_WORKERS,
    }
  }

  pub fn from_env() -> Result<Self, ConfigError> {
    let chart_dir = var(ENV_CHART_DIR).ok_or(ConfigError::Missing(ENV_CHART_DIR))?;
    let mut config = Self::new(chart_dir);

    config.release.driver = var(ENV_RELEASE_DRIVER);
    if let Some(value) = var(ENV_MAX_HISTORY) {
      config.release.max_history = parse_number(ENV_MAX_HISTORY, &value)?;
    }

    if let Some(value) = var(ENV_CLUSTER_INSTANCES) {
      config.cluster_wide = parse_cluster_instances(&value)?;
    }

    for component in Component::ALL {
      let image = var(component.env_var()).map(|v| ComponentSpec::parse(&v));
      *config.image_slot(component) = image;
    }

    if let Some(value) = var(ENV_WORKERS) {
      config.workers = parse_number(ENV_WORKERS, &value)?;
      if config.workers == 0 {
        return Err(ConfigError::Invalid {
          var: ENV_WORKERS,
          value,
          reason: "must be at least 1".to_string(),
        });
      }
    }

    Ok(config)
  }

  pub fn is_cluster_wide(&self, key: &ObjectKey) -> bool {
    self.cluster_wide.contains(key)
  }

  /// The environment-pinned image for `component`, if any.
  pub fn image_source(&self, component: Component) -> Option<&ComponentSpec> {
    match component {
      Component::Server => self.server_image.as_ref(),
      Component::AuthProxy => self.auth_proxy_image.as_ref(),
      Component::Cache => self.cache_image.as_ref(),
    }
  }

  pub fn with_image(mut self, component: Component, value: &str) -> Self {
    *self.image_slot(component) = Some(ComponentSpec::parse(value));
    self
  }

  pub fn with_cluster_wide(mut self, key: ObjectKey) -> Self {
    self.cluster_wide.insert(key);
    self
  }

  fn image_slot(&mut self, component: Component) -> &mut Option<ComponentSpec> {
    match component {
      Component::Server => &mut self.server_image,
      Component::AuthProxy => &mut self.auth_proxy_image,
      Component::Cache => &mut self.cache_image,
    }
  }
}

/// Non-empty value of an environment variable.
fn var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_number(var: &'static str, value: &str) -> Result<usize, ConfigError> {
  value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
    var,
    value: value.to_string(),
    reason: e.to_string(),
  })
}

/// Parse a comma separated list of `namespace/name` entries; blank entries are skipped.
fn parse_cluster_instances(value: &str) -> Result<BTreeSet<ObjectKey>, ConfigError> {
  value
    .split(',')
    .filter(|entry| !entry.trim().is_empty())
    .map(|entry| {
      entry.parse::<ObjectKey>().map_err(|e| ConfigError::Invalid {
        var: ENV_CLUSTER_INSTANCES,
        value: entry.to_string(),
        reason: e.to_string(),
      })
    })
    .collect()
}
