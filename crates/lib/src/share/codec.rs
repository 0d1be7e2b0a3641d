//! Mapping between shared package records and their storage paths.
//!
//! A record name is `<prefix>_<nanos>_<uuid>`: the creation time in
//! nanoseconds since the Unix epoch and a random v4 UUID. Minting takes no
//! locks; the random part alone makes collisions between concurrent callers
//! negligible.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::SharingConfig;
use crate::consts::{NAME_SEPARATOR, PN_ORIGINAL_ID};
use crate::store::{ResourceStore, StoreError, path};

/// Parsed parts of a minted record name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedName {
  pub prefix: String,
  pub timestamp_nanos: u128,
  pub uuid: Uuid,
}

impl MintedName {
  pub fn parse(name: &str) -> Option<Self> {
    let mut parts = name.splitn(3, NAME_SEPARATOR);
    let prefix = parts.next()?;
    let timestamp_nanos = parts.next()?.parse().ok()?;
    let uuid = Uuid::parse_str(parts.next()?).ok()?;
    Some(Self {
      prefix: prefix.to_string(),
      timestamp_nanos,
      uuid,
    })
  }
}

fn now_nanos() -> u128 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_nanos())
    .unwrap_or_default()
}

/// Mint a new record name.
pub fn mint_name(config: &SharingConfig) -> String {
  format!(
    "{}{sep}{}{sep}{}",
    config.name_prefix(),
    now_nanos(),
    Uuid::new_v4(),
    sep = NAME_SEPARATOR
  )
}

/// Mint a new storage path under the configured shared root.
pub fn mint_path(config: &SharingConfig) -> String {
  let minted = format!("{}{}", config.shared_root_path(), mint_name(config));
  trace!(path = %minted, "minted shared package path");
  minted
}

/// True if `storage_path` lies under the configured shared root.
pub fn is_shared_path(config: &SharingConfig, storage_path: &str) -> bool {
  storage_path.starts_with(config.shared_root_path())
}

/// Recover the original package id recorded at `storage_path`.
///
/// Returns `Ok(None)` if the path is outside the shared root, malformed, has
/// no node, or the node has no string `original.package.id` property. Only
/// store failures are errors.
pub fn recover_id(
  store: &dyn ResourceStore,
  config: &SharingConfig,
  storage_path: &str,
) -> Result<Option<String>, StoreError> {
  if !is_shared_path(config, storage_path) {
    debug!(path = %storage_path, root = %config.shared_root_path(), "path outside shared root");
    return Ok(None);
  }
  if path::normalize(storage_path).is_err() {
    debug!(path = %storage_path, "malformed shared package path");
    return Ok(None);
  }

  let Some(resource) = store.resolve(storage_path)? else {
    debug!(path = %storage_path, "no shared package record");
    return Ok(None);
  };
  let Some(properties) = store.read_properties(&resource)? else {
    return Ok(None);
  };

  Ok(
    properties
      .get(PN_ORIGINAL_ID)
      .and_then(|value| value.as_str())
      .map(str::to_string),
  )
}
