//! Chart rendering boundary.
//!
//! A [`Renderer`] turns a chart source into a [`ManifestBundle`]: the raw chart
//! files plus the default values the chart declares. How those files become
//! manifests is the releaser's business.

pub mod chart_dir;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use chart_dir::ChartDirRenderer;

/// Structured values handed to the releaser.
pub type Values = serde_json::Map<String, serde_json::Value>;

/// One raw file of a chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
  /// Path relative to the chart root, `/` separated.
  pub name: String,
  pub data: Vec<u8>,
}

impl ChartFile {
  pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
    Self {
      name: name.into(),
      data: data.into(),
    }
  }
}

/// A loaded chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestBundle {
  /// Chart files in load order.
  pub files: Vec<ChartFile>,
  /// Default values declared by the chart.
  pub values: Values,
}

/// Errors that can occur while loading a chart.
#[derive(Debug, Error)]
pub enum RenderError {
  /// The chart source does not exist or is not a directory.
  #[error("chart not found at {0}")]
  NotFound(PathBuf),

  /// Walking the chart directory failed.
  #[error("failed to walk chart directory: {message}")]
  Walk { message: String },

  /// A chart file could not be read.
  #[error("failed to read chart file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The values file is not valid YAML.
  #[error("failed to parse chart values: {0}")]
  Values(#[from] serde_yaml::Error),

  /// The values file parsed, but is not a mapping.
  #[error("chart values must be a mapping, got {0}")]
  ValuesNotMapping(String),
}

/// Loads charts.
pub trait Renderer: Send + Sync {
  fn load(&self, source: &Path) -> Result<ManifestBundle, RenderError>;
}
