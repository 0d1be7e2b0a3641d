use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::path;

/// A single property value stored on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Bool(bool),
  Long(i64),
  String(String),
  Strings(Vec<String>),
}

impl Value {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_strings(&self) -> Option<&[String]> {
    match self {
      Value::Strings(values) => Some(values),
      _ => None,
    }
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(value)
  }
}

impl From<Vec<String>> for Value {
  fn from(values: Vec<String>) -> Self {
    Value::Strings(values)
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Long(value)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

/// Properties of a node, ordered by name.
pub type ValueMap = BTreeMap<String, Value>;

/// Handle to a node in the store.
///
/// A `Resource` is only a validated path; its properties are read through the
/// session that resolved it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Resource {
  path: String,
}

impl Resource {
  pub(crate) fn new(path: String) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn name(&self) -> &str {
    path::name(&self.path)
  }

  pub fn parent_path(&self) -> Option<&str> {
    path::parent(&self.path)
  }
}

impl std::fmt::Display for Resource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.path)
  }
}

/// Errors raised by store sessions and their backends.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("invalid path '{path}': {reason}")]
  InvalidPath { path: String, reason: &'static str },

  #[error("resource not found: {0}")]
  NotFound(String),

  #[error("resource already exists: {0}")]
  AlreadyExists(String),

  #[error("parent of '{0}' does not exist")]
  MissingParent(String),

  #[error("'{0}' was created concurrently by another session")]
  Conflict(String),

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse properties of {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize properties of {path}: {source}")]
  Serialize {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}
