//! Chart loading from a local directory.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use super::{ChartFile, ManifestBundle, RenderError, Renderer, Values};
use crate::consts::VALUES_FILENAME;

/// Loads a chart laid out on disk.
///
/// Every regular file below the chart root becomes a bundle file, ordered by
/// path. The root `values.yaml`, when present, supplies the default values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartDirRenderer;

impl ChartDirRenderer {
  pub fn new() -> Self {
    Self
  }
}

impl Renderer for ChartDirRenderer {
  fn load(&self, source: &Path) -> Result<ManifestBundle, RenderError> {
    if !source.is_dir() {
      return Err(RenderError::NotFound(source.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
      let entry = entry.map_err(|e| RenderError::Walk { message: e.to_string() })?;
      if !entry.file_type().is_file() {
        continue;
      }

      let path = entry.path();
      let name = path
        .strip_prefix(source)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
      let data = fs::read(path).map_err(|source| RenderError::Read {
        path: path.to_path_buf(),
        source,
      })?;

      files.push(ChartFile { name, data });
    }

    let values = match files.iter().find(|f| f.name == VALUES_FILENAME) {
      Some(file) => parse_values(&file.data)?,
      None => Values::new(),
    };

    debug!(chart = %source.display(), files = files.len(), "loaded chart");
    Ok(ManifestBundle { files, values })
  }
}

fn parse_values(data: &[u8]) -> Result<Values, RenderError> {
  match serde_yaml::from_slice::<Value>(data)? {
    Value::Null => Ok(Values::new()),
    Value::Object(map) => Ok(map),
    other => Err(RenderError::ValuesNotMapping(other.to_string())),
  }
}
