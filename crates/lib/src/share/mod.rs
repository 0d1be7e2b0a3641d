//! Sharing layer for replication packages.
//!
//! [`SharedPackageBuilder`] decorates another [`PackageBuilder`]. Each package
//! the delegate builds or reads is persisted as a record node under the shared
//! root and handed back as a [`SharedPackage`] whose id is the record's storage
//! path. Any holder of that path can later fetch and install the package.
//!
//! [`PackageBuilder`]: crate::package::PackageBuilder

mod builder;
pub mod codec;
mod proxy;
mod record;

pub use builder::SharedPackageBuilder;
pub use codec::MintedName;
pub use proxy::SharedPackage;
pub use record::SharedPackageRecord;
