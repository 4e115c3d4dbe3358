//! Content hashing for idempotent applies.
//!
//! The reconciler stores the hash of the chart and values it last applied on
//! the instance and skips the release step when nothing changed. The hash must
//! therefore not depend on the order chart files were loaded in or on the
//! order values keys were inserted in.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::render::{ChartFile, Values};

/// Number of hex digits kept from the digest (64 bits).
pub const CONTENT_HASH_LEN: usize = 16;

pub type HashError = serde_json::Error;

/// Fingerprint of a chart plus values.
///
/// # Format
///
/// A lowercase hexadecimal string of [`CONTENT_HASH_LEN`] characters, e.g. `"9f86d081884c7d65"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ContentHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash chart files and values.
///
/// Files are hashed sorted by name (the caller's slice is left untouched),
/// each as its name followed by its length-prefixed bytes. Values are hashed
/// as canonical JSON with object keys sorted at every level.
pub fn release_hash(files: &[ChartFile], values: &Values) -> Result<ContentHash, HashError> {
  let mut sorted: Vec<&ChartFile> = files.iter().collect();
  sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.data.cmp(&b.data)));

  let mut hasher = Sha256::new();
  for file in sorted {
    hasher.update(file.name.as_bytes());
    hasher.update(b"\0");
    hasher.update((file.data.len() as u64).to_le_bytes());
    hasher.update(&file.data);
  }

  let mut canonical = Vec::new();
  write_canonical_map(&mut canonical, values.iter())?;
  hasher.update(&canonical);

  let digest = hasher.finalize();
  Ok(ContentHash(hex::encode(&digest[..CONTENT_HASH_LEN / 2])))
}

fn write_canonical_map<'a>(
  out: &mut Vec<u8>,
  entries: impl Iterator<Item = (&'a String, &'a Value)>,
) -> Result<(), HashError> {
  let mut entries: Vec<_> = entries.collect();
  entries.sort_by(|a, b| a.0.cmp(b.0));

  out.push(b'{');
  for (i, (key, value)) in entries.into_iter().enumerate() {
    if i > 0 {
      out.push(b',');
    }
    serde_json::to_writer(&mut *out, key)?;
    out.push(b':');
    write_canonical(out, value)?;
  }
  out.push(b'}');
  Ok(())
}

fn write_canonical(out: &mut Vec<u8>, value: &Value) -> Result<(), HashError> {
  match value {
    Value::Object(map) => write_canonical_map(out, map.iter()),
    Value::Array(items) => {
      out.push(b'[');
      for (i, item) in items.iter().enumerate() {
        if i > 0 {
          out.push(b',');
        }
        write_canonical(out, item)?;
      }
      out.push(b']');
      Ok(())
    }
    scalar => serde_json::to_writer(&mut *out, scalar),
  }
}
