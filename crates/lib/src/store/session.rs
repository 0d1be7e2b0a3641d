use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::changes::ChangeSet;
use super::path::{self, ROOT};
use super::types::{Resource, StoreError, Value, ValueMap};
use super::ResourceStore;
use crate::consts::{PN_PRIMARY_TYPE, PN_RESOURCE_TYPE};

/// Committed state of a node as seen by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
  /// `None` if the node exists but has no stored properties.
  pub properties: Option<ValueMap>,
}

/// Committed storage behind a [`StoreSession`].
pub trait Backend {
  /// Committed node at a normalized path, `None` if absent.
  fn load(&self, path: &str) -> Result<Option<Node>, StoreError>;

  /// Names of the committed children of a normalized path.
  fn child_names(&self, path: &str) -> Result<Vec<String>, StoreError>;

  /// Apply a change set. Must reject the whole set if any strict create
  /// already exists.
  fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError>;
}

/// A unit of work over a backend.
#[derive(Debug)]
pub struct StoreSession<B> {
  backend: B,
  changes: ChangeSet,
}

impl<B: Backend> StoreSession<B> {
  pub fn new(backend: B) -> Self {
    Self {
      backend,
      changes: ChangeSet::default(),
    }
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  pub fn changes(&self) -> &ChangeSet {
    &self.changes
  }

  fn lookup(&self, path: &str) -> Result<Option<Node>, StoreError> {
    if path == ROOT {
      return Ok(Some(Node {
        properties: Some(ValueMap::new()),
      }));
    }

    let base = if self.changes.delete_covers(path) {
      None
    } else {
      self.backend.load(path)?
    };

    let node = match (base, self.changes.upserts.get(path)) {
      (None, None) => None,
      (Some(node), None) => Some(node),
      (None, Some(delta)) => Some(Node {
        properties: Some(delta.clone()),
      }),
      (Some(node), Some(delta)) => {
        let mut properties = node.properties.unwrap_or_default();
        properties.extend(delta.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(Node {
          properties: Some(properties),
        })
      }
    };

    Ok(node)
  }

  fn require(&self, resource: &Resource) -> Result<(), StoreError> {
    match self.lookup(resource.path())? {
      Some(_) => Ok(()),
      None => Err(StoreError::NotFound(resource.path().to_string())),
    }
  }

  fn reject_root(resource: &Resource) -> Result<(), StoreError> {
    if resource.path() == ROOT {
      return Err(StoreError::InvalidPath {
        path: ROOT.to_string(),
        reason: "the root node is read-only",
      });
    }
    Ok(())
  }
}

impl<B: Backend> ResourceStore for StoreSession<B> {
  fn resolve(&self, path: &str) -> Result<Option<Resource>, StoreError> {
    let path = path::normalize(path)?;
    Ok(self.lookup(&path)?.map(|_| Resource::new(path)))
  }

  fn get_or_create(
    &mut self,
    path: &str,
    primary_type: &str,
    resource_type: &str,
    autosave: bool,
  ) -> Result<Resource, StoreError> {
    let path = path::normalize(path)?;
    if self.lookup(&path)?.is_some() {
      return Ok(Resource::new(path));
    }

    for ancestor in path::ancestors(&path) {
      if self.lookup(ancestor)?.is_none() {
        let mut props = ValueMap::new();
        props.insert(PN_PRIMARY_TYPE.to_string(), Value::from(resource_type));
        self.changes.stage(ancestor, props);
      }
    }

    let mut props = ValueMap::new();
    props.insert(PN_PRIMARY_TYPE.to_string(), Value::from(primary_type));
    props.insert(PN_RESOURCE_TYPE.to_string(), Value::from(resource_type));
    self.changes.stage(&path, props);
    debug!(path = %path, "staged resource");

    if autosave {
      self.commit()?;
    }

    Ok(Resource::new(path))
  }

  fn create_child(&mut self, parent: &Resource, name: &str, properties: ValueMap) -> Result<Resource, StoreError> {
    let child = path::join(parent.path(), name);
    path::validate_name(name).map_err(|reason| StoreError::InvalidPath {
      path: child.clone(),
      reason,
    })?;
    self.require(parent)?;

    if self.lookup(&child)?.is_some() {
      return Err(StoreError::AlreadyExists(child));
    }

    self.changes.stage(&child, properties);
    self.changes.created.insert(child.clone());
    Ok(Resource::new(child))
  }

  fn read_properties(&self, resource: &Resource) -> Result<Option<ValueMap>, StoreError> {
    Ok(self.lookup(resource.path())?.and_then(|node| node.properties))
  }

  fn write_properties(&mut self, resource: &Resource, properties: ValueMap) -> Result<(), StoreError> {
    Self::reject_root(resource)?;
    self.require(resource)?;
    self.changes.stage(resource.path(), properties);
    Ok(())
  }

  fn children(&self, resource: &Resource) -> Result<Vec<Resource>, StoreError> {
    self.require(resource)?;
    let parent = resource.path();

    let mut paths = BTreeSet::new();
    if !self.changes.delete_covers(parent) {
      for name in self.backend.child_names(parent)? {
        let child = path::join(parent, &name);
        if !self.changes.hides(&child) {
          paths.insert(child);
        }
      }
    }
    for staged in self.changes.upserts.keys() {
      if path::parent(staged) == Some(parent) {
        paths.insert(staged.clone());
      }
    }

    Ok(paths.into_iter().map(Resource::new).collect())
  }

  fn delete(&mut self, resource: &Resource) -> Result<(), StoreError> {
    Self::reject_root(resource)?;
    self.require(resource)?;
    self.changes.stage_delete(resource.path());
    Ok(())
  }

  fn commit(&mut self) -> Result<(), StoreError> {
    if self.changes.is_empty() {
      return Ok(());
    }

    self.backend.apply(&self.changes)?;
    debug!(
      upserts = self.changes.upserts.len(),
      deletes = self.changes.deleted.len(),
      "committed session"
    );
    self.changes.clear();
    Ok(())
  }

  fn revert(&mut self) {
    if !self.changes.is_empty() {
      debug!(upserts = self.changes.upserts.len(), "reverted session");
    }
    self.changes.clear();
  }

  fn discard(&mut self, path: &str) -> Result<(), StoreError> {
    let path = path::normalize(path)?;
    self.changes.discard(&path);
    trace!(path = %path, "discarded staged changes");
    Ok(())
  }

  fn has_changes(&self) -> bool {
    !self.changes.is_empty()
  }
}
