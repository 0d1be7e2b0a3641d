//! Configuration of the sharing layer.
//!
//! A [`SharingConfig`] names where shared package records live and how their
//! names are prefixed. It can be built directly, read from the environment
//! (`PKGSHARE_SHARED_ROOT`, `PKGSHARE_NAME_PREFIX`) or loaded from a JSON file:
//!
//! ```json
//! { "shared_root_path": "/var/sling/replication/", "name_prefix": "replpackage" }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_NAME_PREFIX, DEFAULT_SHARED_ROOT, NAME_PREFIX_ENV, NAME_SEPARATOR, SHARED_ROOT_ENV};
use crate::package::OriginTag;
use crate::store::path;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("shared root '{root}' is invalid: {reason}")]
  InvalidRoot { root: String, reason: &'static str },

  #[error("name prefix '{prefix}' is invalid: {reason}")]
  InvalidPrefix { prefix: String, reason: &'static str },

  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Raw, unvalidated form used for deserialization.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
  shared_root_path: String,
  name_prefix: String,
}

impl Default for RawConfig {
  fn default() -> Self {
    Self {
      shared_root_path: DEFAULT_SHARED_ROOT.to_string(),
      name_prefix: DEFAULT_NAME_PREFIX.to_string(),
    }
  }
}

/// Where and under which names shared package records are stored.
///
/// Immutable once built. `shared_root_path` always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharingConfig {
  shared_root_path: String,
  name_prefix: String,
}

impl Default for SharingConfig {
  fn default() -> Self {
    Self {
      shared_root_path: DEFAULT_SHARED_ROOT.to_string(),
      name_prefix: DEFAULT_NAME_PREFIX.to_string(),
    }
  }
}

impl SharingConfig {
  /// Validate and build a config. A missing trailing `/` on the root is added.
  pub fn new(shared_root_path: &str, name_prefix: &str) -> Result<Self, ConfigError> {
    let normalized = path::normalize(shared_root_path).map_err(|_| ConfigError::InvalidRoot {
      root: shared_root_path.to_string(),
      reason: "must be an absolute path without empty or relative segments",
    })?;
    if normalized == path::ROOT {
      return Err(ConfigError::InvalidRoot {
        root: shared_root_path.to_string(),
        reason: "records cannot live directly under the store root",
      });
    }

    path::validate_name(name_prefix).map_err(|reason| ConfigError::InvalidPrefix {
      prefix: name_prefix.to_string(),
      reason,
    })?;
    if name_prefix.contains(NAME_SEPARATOR) {
      return Err(ConfigError::InvalidPrefix {
        prefix: name_prefix.to_string(),
        reason: "must not contain the name separator '_'",
      });
    }

    Ok(Self {
      shared_root_path: format!("{}/", normalized),
      name_prefix: name_prefix.to_string(),
    })
  }

  /// Build a config from the environment, falling back to defaults.
  pub fn from_env() -> Result<Self, ConfigError> {
    let root = std::env::var(SHARED_ROOT_ENV).unwrap_or_else(|_| DEFAULT_SHARED_ROOT.to_string());
    let prefix = std::env::var(NAME_PREFIX_ENV).unwrap_or_else(|_| DEFAULT_NAME_PREFIX.to_string());
    Self::new(&root, &prefix)
  }

  /// Load a config from a JSON file. Missing keys take their defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let raw: RawConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    Self::new(&raw.shared_root_path, &raw.name_prefix)
  }

  pub fn shared_root_path(&self) -> &str {
    &self.shared_root_path
  }

  pub fn name_prefix(&self) -> &str {
    &self.name_prefix
  }

  /// Tag carried by every package shared under this config.
  pub fn origin_tag(&self) -> OriginTag {
    OriginTag::new(format!("{}{}", self.shared_root_path, self.name_prefix))
  }
}
