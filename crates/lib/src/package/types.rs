use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a replication package does to its target paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplicationActionType {
  Add,
  Delete,
  Poll,
  Test,
}

impl ReplicationActionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReplicationActionType::Add => "ADD",
      ReplicationActionType::Delete => "DELETE",
      ReplicationActionType::Poll => "POLL",
      ReplicationActionType::Test => "TEST",
    }
  }
}

impl fmt::Display for ReplicationActionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown replication action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for ReplicationActionType {
  type Err = UnknownAction;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_uppercase().as_str() {
      "ADD" => Ok(ReplicationActionType::Add),
      "DELETE" => Ok(ReplicationActionType::Delete),
      "POLL" => Ok(ReplicationActionType::Poll),
      "TEST" => Ok(ReplicationActionType::Test),
      _ => Err(UnknownAction(s.to_string())),
    }
  }
}

/// A request to build a package for a set of content paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationRequest {
  /// Milliseconds since the Unix epoch.
  pub time: u64,
  pub action: ReplicationActionType,
  pub paths: Vec<String>,
}

impl ReplicationRequest {
  /// Create a request stamped with the current time.
  pub fn new(action: ReplicationActionType, paths: Vec<String>) -> Self {
    let time = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_millis() as u64)
      .unwrap_or_default();
    Self { time, action, paths }
  }
}

/// Identifies which sharing layer wrapped a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OriginTag(String);

impl OriginTag {
  pub fn new(tag: impl Into<String>) -> Self {
    Self(tag.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for OriginTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A unit of content change produced by a [`PackageBuilder`](super::PackageBuilder).
pub trait ReplicationPackage: fmt::Debug + Send + Sync {
  fn id(&self) -> &str;

  fn action(&self) -> ReplicationActionType;

  fn paths(&self) -> &[String];

  /// Builder-specific name of the serialization format.
  fn package_type(&self) -> &str;

  /// Payload size in bytes.
  fn length(&self) -> u64;

  /// Open the serialized payload.
  fn open_stream(&self) -> io::Result<Box<dyn Read + '_>>;

  /// Tag of the sharing layer that wrapped this package, if any.
  fn origin(&self) -> Option<&OriginTag> {
    None
  }

  /// The package this one decorates, if any.
  fn inner(&self) -> Option<&dyn ReplicationPackage> {
    None
  }
}

/// A package whose payload is held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesPackage {
  id: String,
  action: ReplicationActionType,
  paths: Vec<String>,
  package_type: String,
  data: Vec<u8>,
}

impl BytesPackage {
  pub fn new(
    id: impl Into<String>,
    action: ReplicationActionType,
    paths: Vec<String>,
    package_type: impl Into<String>,
    data: Vec<u8>,
  ) -> Self {
    Self {
      id: id.into(),
      action,
      paths,
      package_type: package_type.into(),
      data,
    }
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }
}

impl ReplicationPackage for BytesPackage {
  fn id(&self) -> &str {
    &self.id
  }

  fn action(&self) -> ReplicationActionType {
    self.action
  }

  fn paths(&self) -> &[String] {
    &self.paths
  }

  fn package_type(&self) -> &str {
    &self.package_type
  }

  fn length(&self) -> u64 {
    self.data.len() as u64
  }

  fn open_stream(&self) -> io::Result<Box<dyn Read + '_>> {
    Ok(Box::new(self.data.as_slice()))
  }
}
