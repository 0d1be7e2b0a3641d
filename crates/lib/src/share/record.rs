use tracing::debug;

use super::codec::{self, MintedName};
use crate::config::SharingConfig;
use crate::consts::{
  NT_UNSTRUCTURED, PN_ORIGINAL_ACTION, PN_ORIGINAL_ID, PN_ORIGINAL_PATHS, PN_RESOURCE_TYPE, REFERENCE_ROOT_NODE,
  SLING_FOLDER,
};
use crate::package::ReplicationPackage;
use crate::store::{Resource, ResourceStore, StoreError, Value, ValueMap, path};

/// Provenance metadata persisted for a shared package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedPackageRecord {
  pub path: String,
  pub original_id: String,
  /// Stored as text so records from builders with other actions still load.
  pub original_action: String,
  pub original_paths: Vec<String>,
}

impl SharedPackageRecord {
  pub fn from_package(path: String, package: &dyn ReplicationPackage) -> Self {
    Self {
      path,
      original_id: package.id().to_string(),
      original_action: package.action().to_string(),
      original_paths: package.paths().to_vec(),
    }
  }

  pub fn to_properties(&self) -> ValueMap {
    let mut props = ValueMap::new();
    props.insert(PN_ORIGINAL_ID.to_string(), Value::from(self.original_id.as_str()));
    props.insert(PN_ORIGINAL_ACTION.to_string(), Value::from(self.original_action.as_str()));
    props.insert(PN_ORIGINAL_PATHS.to_string(), Value::from(self.original_paths.clone()));
    props
  }

  /// Rebuild a record from node properties. `None` if any field is missing
  /// or has the wrong type.
  pub fn from_properties(path: &str, props: &ValueMap) -> Option<Self> {
    Some(Self {
      path: path.to_string(),
      original_id: props.get(PN_ORIGINAL_ID)?.as_str()?.to_string(),
      original_action: props.get(PN_ORIGINAL_ACTION)?.as_str()?.to_string(),
      original_paths: props.get(PN_ORIGINAL_PATHS)?.as_strings()?.to_vec(),
    })
  }

  /// Name parts of the record path, if it was minted by this layer.
  pub fn minted(&self) -> Option<MintedName> {
    MintedName::parse(path::name(&self.path))
  }

  /// Stage the record node and its reference marker. Does not commit.
  pub fn stage(&self, store: &mut dyn ResourceStore) -> Result<Resource, StoreError> {
    let resource = store.get_or_create(&self.path, NT_UNSTRUCTURED, SLING_FOLDER, false)?;
    store.write_properties(&resource, self.to_properties())?;

    let mut marker = ValueMap::new();
    marker.insert(PN_RESOURCE_TYPE.to_string(), Value::from(NT_UNSTRUCTURED));
    store.create_child(&resource, REFERENCE_ROOT_NODE, marker)?;

    debug!(path = %self.path, original_id = %self.original_id, "staged shared package record");
    Ok(resource)
  }

  /// Load a complete record, including its reference marker.
  ///
  /// Fails closed like [`codec::recover_id`]: anything that is not a valid
  /// record yields `Ok(None)`.
  pub fn load(
    store: &dyn ResourceStore,
    config: &SharingConfig,
    storage_path: &str,
  ) -> Result<Option<Self>, StoreError> {
    let Some(resource) = resolve_record_node(store, config, storage_path)? else {
      return Ok(None);
    };
    let Some(props) = store.read_properties(&resource)? else {
      return Ok(None);
    };
    Ok(Self::from_properties(resource.path(), &props))
  }
}

/// Resolve the node of a valid record: under the shared root, present, and
/// carrying a reference marker.
pub(crate) fn resolve_record_node(
  store: &dyn ResourceStore,
  config: &SharingConfig,
  storage_path: &str,
) -> Result<Option<Resource>, StoreError> {
  if !codec::is_shared_path(config, storage_path) || path::normalize(storage_path).is_err() {
    return Ok(None);
  }
  let Some(resource) = store.resolve(storage_path)? else {
    return Ok(None);
  };
  if store.resolve(&path::join(resource.path(), REFERENCE_ROOT_NODE))?.is_none() {
    debug!(path = %storage_path, "record lacks reference marker");
    return Ok(None);
  }
  Ok(Some(resource))
}
