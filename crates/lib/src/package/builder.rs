use std::io::{self, Read};
use std::sync::Arc;

use thiserror::Error;

use super::types::{ReplicationPackage, ReplicationRequest};
use crate::store::{ResourceStore, StoreError};

/// Boxed package as returned by builders.
pub type PackageBox = Box<dyn ReplicationPackage>;

/// Errors while building a package from a request.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to persist shared package: {0}")]
  Store(#[from] StoreError),

  #[error("package build failed: {message}")]
  Delegate { message: String },
}

/// Errors while reading, fetching or installing a package.
#[derive(Debug, Error)]
pub enum ReadError {
  #[error("failed to persist shared package: {0}")]
  Store(#[from] StoreError),

  #[error("io error: {0}")]
  Io(#[from] io::Error),

  #[error("malformed package: {message}")]
  Malformed { message: String },

  #[error("package read failed: {message}")]
  Delegate { message: String },
}

/// Builds, deserializes, looks up and installs packages.
///
/// Every operation receives the caller's store session; builders never open
/// or close sessions themselves.
pub trait PackageBuilder: Send + Sync {
  /// Build a package for `request`. `Ok(None)` means nothing needed building.
  fn create(&self, store: &mut dyn ResourceStore, request: &ReplicationRequest) -> Result<Option<PackageBox>, BuildError>;

  /// Deserialize a package from `stream`.
  fn read(&self, store: &mut dyn ResourceStore, stream: &mut dyn Read) -> Result<Option<PackageBox>, ReadError>;

  /// Look up a previously built package. `Ok(None)` if it is unknown.
  fn fetch(&self, store: &mut dyn ResourceStore, id: &str) -> Result<Option<PackageBox>, ReadError>;

  /// Install `package`. `Ok(false)` if this builder does not handle it.
  fn install(&self, store: &mut dyn ResourceStore, package: &dyn ReplicationPackage) -> Result<bool, ReadError>;
}

impl<T: PackageBuilder + ?Sized> PackageBuilder for Box<T> {
  fn create(&self, store: &mut dyn ResourceStore, request: &ReplicationRequest) -> Result<Option<PackageBox>, BuildError> {
    (**self).create(store, request)
  }

  fn read(&self, store: &mut dyn ResourceStore, stream: &mut dyn Read) -> Result<Option<PackageBox>, ReadError> {
    (**self).read(store, stream)
  }

  fn fetch(&self, store: &mut dyn ResourceStore, id: &str) -> Result<Option<PackageBox>, ReadError> {
    (**self).fetch(store, id)
  }

  fn install(&self, store: &mut dyn ResourceStore, package: &dyn ReplicationPackage) -> Result<bool, ReadError> {
    (**self).install(store, package)
  }
}

impl<T: PackageBuilder + ?Sized> PackageBuilder for Arc<T> {
  fn create(&self, store: &mut dyn ResourceStore, request: &ReplicationRequest) -> Result<Option<PackageBox>, BuildError> {
    (**self).create(store, request)
  }

  fn read(&self, store: &mut dyn ResourceStore, stream: &mut dyn Read) -> Result<Option<PackageBox>, ReadError> {
    (**self).read(store, stream)
  }

  fn fetch(&self, store: &mut dyn ResourceStore, id: &str) -> Result<Option<PackageBox>, ReadError> {
    (**self).fetch(store, id)
  }

  fn install(&self, store: &mut dyn ResourceStore, package: &dyn ReplicationPackage) -> Result<bool, ReadError> {
    (**self).install(store, package)
  }
}
