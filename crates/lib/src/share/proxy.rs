use std::io::{self, Read};

use crate::package::{OriginTag, PackageBox, ReplicationActionType, ReplicationPackage};

/// A delegate package exposed under its shared storage path.
///
/// The id is the storage path; everything else, including the payload, comes
/// from the wrapped package. The session is not retained: callers pass it
/// again to install.
#[derive(Debug)]
pub struct SharedPackage {
  path: String,
  origin: OriginTag,
  package: PackageBox,
}

impl SharedPackage {
  pub(crate) fn new(path: String, origin: OriginTag, package: PackageBox) -> Self {
    Self { path, origin, package }
  }

  /// Storage path of the shared record.
  pub fn path(&self) -> &str {
    &self.path
  }

  /// The wrapped delegate package.
  pub fn package(&self) -> &dyn ReplicationPackage {
    self.package.as_ref()
  }

  pub fn into_package(self) -> PackageBox {
    self.package
  }
}

impl ReplicationPackage for SharedPackage {
  fn id(&self) -> &str {
    &self.path
  }

  fn action(&self) -> ReplicationActionType {
    self.package.action()
  }

  fn paths(&self) -> &[String] {
    self.package.paths()
  }

  fn package_type(&self) -> &str {
    self.package.package_type()
  }

  fn length(&self) -> u64 {
    self.package.length()
  }

  fn open_stream(&self) -> io::Result<Box<dyn Read + '_>> {
    self.package.open_stream()
  }

  fn origin(&self) -> Option<&OriginTag> {
    Some(&self.origin)
  }

  fn inner(&self) -> Option<&dyn ReplicationPackage> {
    Some(self.package.as_ref())
  }
}
