//! The sharing builder: wraps a delegate and persists what it builds.

use std::io::Read;

use tracing::{debug, info, warn};

use super::codec;
use super::proxy::SharedPackage;
use super::record::{SharedPackageRecord, resolve_record_node};
use crate::config::SharingConfig;
use crate::consts::{NT_UNSTRUCTURED, PN_RESOURCE_TYPE, REFERENCE_ROOT_NODE};
use crate::package::{
  BuildError, OriginTag, PackageBox, PackageBuilder, ReadError, ReplicationPackage, ReplicationRequest,
};
use crate::store::{ResourceStore, StoreError, Value, ValueMap, path};

/// Decorates a [`PackageBuilder`] so that every package it produces is
/// recorded in the store and addressed by a newly minted path.
///
/// Holds no mutable state; all operations run against the session passed in
/// by the caller and can be called concurrently.
#[derive(Debug)]
pub struct SharedPackageBuilder<B> {
  config: SharingConfig,
  origin: OriginTag,
  delegate: B,
}

impl<B: PackageBuilder> SharedPackageBuilder<B> {
  /// Wrap `delegate` using the default config.
  pub fn new(delegate: B) -> Self {
    Self::with_config(delegate, SharingConfig::default())
  }

  pub fn with_config(delegate: B, config: SharingConfig) -> Self {
    let origin = config.origin_tag();
    Self {
      config,
      origin,
      delegate,
    }
  }

  pub fn config(&self) -> &SharingConfig {
    &self.config
  }

  /// Tag carried by every package this builder hands out.
  pub fn origin(&self) -> &OriginTag {
    &self.origin
  }

  pub fn delegate(&self) -> &B {
    &self.delegate
  }

  /// Build a package through the delegate and share it.
  ///
  /// `Ok(None)` if the delegate had nothing to build; nothing is persisted
  /// in that case.
  pub fn create(
    &self,
    store: &mut dyn ResourceStore,
    request: &ReplicationRequest,
  ) -> Result<Option<SharedPackage>, BuildError> {
    let Some(package) = self.delegate.create(store, request)? else {
      debug!(action = %request.action, "delegate built no package");
      return Ok(None);
    };

    Ok(Some(self.share(store, package)?))
  }

  /// Deserialize a package through the delegate and share it.
  pub fn read(&self, store: &mut dyn ResourceStore, stream: &mut dyn Read) -> Result<Option<SharedPackage>, ReadError> {
    let Some(package) = self.delegate.read(store, stream)? else {
      debug!("delegate read no package");
      return Ok(None);
    };

    Ok(Some(self.share(store, package)?))
  }

  /// Look up a shared package by its storage path.
  ///
  /// `Ok(None)` if the path is not a shared record or the delegate no longer
  /// knows the original package. The returned package keeps `storage_path`
  /// as its id.
  pub fn fetch(&self, store: &mut dyn ResourceStore, storage_path: &str) -> Result<Option<SharedPackage>, ReadError> {
    let Some(original_id) = codec::recover_id(store, &self.config, storage_path)? else {
      return Ok(None);
    };

    let Some(package) = self.delegate.fetch(store, &original_id)? else {
      warn!(path = %storage_path, original_id = %original_id, "shared package record is orphaned");
      return Ok(None);
    };

    Ok(Some(SharedPackage::new(
      storage_path.to_string(),
      self.origin.clone(),
      package,
    )))
  }

  /// Install a package handed out by this builder.
  ///
  /// Packages from anywhere else yield `Ok(false)` without touching the
  /// delegate. Otherwise the wrapped package is installed by the delegate and
  /// its result returned unchanged.
  pub fn install(&self, store: &mut dyn ResourceStore, package: &dyn ReplicationPackage) -> Result<bool, ReadError> {
    if package.origin() != Some(&self.origin) {
      debug!(id = %package.id(), "not a shared package from this builder");
      return Ok(false);
    }
    let Some(original) = package.inner() else {
      debug!(id = %package.id(), "shared package has no wrapped package");
      return Ok(false);
    };

    let installed = self.delegate.install(store, original)?;
    debug!(path = %package.id(), original_id = %original.id(), installed, "installed shared package");
    Ok(installed)
  }

  /// Load the persisted record at `storage_path`.
  pub fn record(
    &self,
    store: &dyn ResourceStore,
    storage_path: &str,
  ) -> Result<Option<SharedPackageRecord>, StoreError> {
    SharedPackageRecord::load(store, &self.config, storage_path)
  }

  /// Register `holder` as a user of the shared package and commit.
  ///
  /// Returns `false` if `storage_path` is not a valid shared record. Acquiring
  /// twice with the same holder is a no-op.
  pub fn acquire(&self, store: &mut dyn ResourceStore, storage_path: &str, holder: &str) -> Result<bool, StoreError> {
    validate_holder(holder)?;
    let Some(record) = resolve_record_node(store, &self.config, storage_path)? else {
      return Ok(false);
    };
    let refs_path = path::join(record.path(), REFERENCE_ROOT_NODE);
    let Some(refs) = store.resolve(&refs_path)? else {
      return Ok(false);
    };

    let entry_path = path::join(&refs_path, holder);
    if store.resolve(&entry_path)?.is_some() {
      return Ok(true);
    }

    let mut props = ValueMap::new();
    props.insert(PN_RESOURCE_TYPE.to_string(), Value::from(NT_UNSTRUCTURED));
    let staged = store.create_child(&refs, holder, props).and_then(|_| store.commit());
    if let Err(e) = staged {
      discard_staged(store, &entry_path);
      return Err(e);
    }

    debug!(path = %storage_path, holder, "acquired shared package");
    Ok(true)
  }

  /// Drop `holder`'s reference and commit.
  ///
  /// Returns the number of remaining holders, or `None` if `storage_path` is
  /// not a valid shared record. Records are never removed here, even when no
  /// holders remain.
  pub fn release(
    &self,
    store: &mut dyn ResourceStore,
    storage_path: &str,
    holder: &str,
  ) -> Result<Option<usize>, StoreError> {
    validate_holder(holder)?;
    let Some(record) = resolve_record_node(store, &self.config, storage_path)? else {
      return Ok(None);
    };
    let refs_path = path::join(record.path(), REFERENCE_ROOT_NODE);

    if let Some(entry) = store.resolve(&path::join(&refs_path, holder))? {
      let removed = store.delete(&entry).and_then(|_| store.commit());
      if let Err(e) = removed {
        discard_staged(store, entry.path());
        return Err(e);
      }
      debug!(path = %storage_path, holder, "released shared package");
    }

    Ok(self.references(store, storage_path)?.map(|holders| holders.len()))
  }

  /// Current holders of the shared package, in name order.
  pub fn references(&self, store: &dyn ResourceStore, storage_path: &str) -> Result<Option<Vec<String>>, StoreError> {
    let Some(record) = resolve_record_node(store, &self.config, storage_path)? else {
      return Ok(None);
    };
    let Some(refs) = store.resolve(&path::join(record.path(), REFERENCE_ROOT_NODE))? else {
      return Ok(None);
    };

    let holders = store
      .children(&refs)?
      .iter()
      .map(|entry| entry.name().to_string())
      .collect();
    Ok(Some(holders))
  }

  /// Persist a record for `package` under a fresh path and wrap it.
  ///
  /// The proxy is only built once the commit has succeeded. On failure only
  /// the nodes staged for the record are dropped from the session; anything
  /// else the caller or the delegate staged is left in place.
  fn share(&self, store: &mut dyn ResourceStore, package: PackageBox) -> Result<SharedPackage, StoreError> {
    let storage_path = codec::mint_path(&self.config);
    let record = SharedPackageRecord::from_package(storage_path, package.as_ref());
    let staged_root = outermost_missing(store, &record.path)?;

    let persisted = record.stage(store).and_then(|_| store.commit());
    if let Err(e) = persisted {
      warn!(path = %record.path, original_id = %record.original_id, error = %e, "failed to persist shared package");
      discard_staged(store, &staged_root);
      return Err(e);
    }

    info!(path = %record.path, original_id = %record.original_id, "shared package created");
    Ok(SharedPackage::new(record.path, self.origin.clone(), package))
  }
}

fn validate_holder(holder: &str) -> Result<(), StoreError> {
  path::validate_name(holder).map_err(|reason| StoreError::InvalidPath {
    path: holder.to_string(),
    reason,
  })
}

/// Outermost node on the way to `target` that does not exist yet, or
/// `target` itself if all its ancestors do.
fn outermost_missing(store: &dyn ResourceStore, target: &str) -> Result<String, StoreError> {
  for ancestor in path::ancestors(target) {
    if store.resolve(ancestor)?.is_none() {
      return Ok(ancestor.to_string());
    }
  }
  Ok(target.to_string())
}

fn discard_staged(store: &mut dyn ResourceStore, staged: &str) {
  if let Err(e) = store.discard(staged) {
    warn!(path = %staged, error = %e, "failed to discard staged changes");
  }
}

impl<B: PackageBuilder> PackageBuilder for SharedPackageBuilder<B> {
  fn create(&self, store: &mut dyn ResourceStore, request: &ReplicationRequest) -> Result<Option<PackageBox>, BuildError> {
    Ok(SharedPackageBuilder::create(self, store, request)?.map(|p| Box::new(p) as PackageBox))
  }

  fn read(&self, store: &mut dyn ResourceStore, stream: &mut dyn Read) -> Result<Option<PackageBox>, ReadError> {
    Ok(SharedPackageBuilder::read(self, store, stream)?.map(|p| Box::new(p) as PackageBox))
  }

  fn fetch(&self, store: &mut dyn ResourceStore, id: &str) -> Result<Option<PackageBox>, ReadError> {
    Ok(SharedPackageBuilder::fetch(self, store, id)?.map(|p| Box::new(p) as PackageBox))
  }

  fn install(&self, store: &mut dyn ResourceStore, package: &dyn ReplicationPackage) -> Result<bool, ReadError> {
    SharedPackageBuilder::install(self, store, package)
  }
}
