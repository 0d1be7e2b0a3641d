//! In-process store shared between sessions.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::changes::ChangeSet;
use super::path::{self, ROOT};
use super::session::{Backend, Node, StoreSession};
use super::types::{StoreError, ValueMap};

pub type MemorySession = StoreSession<MemoryRepository>;

/// A tree of nodes held in memory.
///
/// Cloning is cheap and yields a handle to the same tree, so one repository
/// can back any number of concurrent sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
  nodes: Arc<RwLock<BTreeMap<String, ValueMap>>>,
}

impl MemoryRepository {
  pub fn new() -> Self {
    Self::default()
  }

  /// Open a new session over this repository.
  pub fn session(&self) -> MemorySession {
    StoreSession::new(self.clone())
  }

  /// Number of committed nodes, excluding the root.
  pub fn len(&self) -> usize {
    self.nodes.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.read().is_empty()
  }

  fn parent_exists(nodes: &BTreeMap<String, ValueMap>, changes: &ChangeSet, child: &str) -> bool {
    match path::parent(child) {
      None => true,
      Some(ROOT) => true,
      Some(parent) => {
        changes.upserts.contains_key(parent) || (nodes.contains_key(parent) && !changes.delete_covers(parent))
      }
    }
  }
}

impl Backend for MemoryRepository {
  fn load(&self, path: &str) -> Result<Option<Node>, StoreError> {
    let nodes = self.nodes.read();
    Ok(nodes.get(path).map(|props| Node {
      properties: Some(props.clone()),
    }))
  }

  fn child_names(&self, parent: &str) -> Result<Vec<String>, StoreError> {
    let prefix = if parent == ROOT {
      ROOT.to_string()
    } else {
      format!("{}/", parent)
    };

    let nodes = self.nodes.read();
    let names = nodes
      .range(prefix.clone()..)
      .take_while(|(key, _)| key.starts_with(&prefix))
      .map(|(key, _)| &key[prefix.len()..])
      .filter(|rest| !rest.is_empty() && !rest.contains('/'))
      .map(str::to_string)
      .collect();
    Ok(names)
  }

  fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
    let mut nodes = self.nodes.write();

    if let Some(existing) = changes.strict_creates().find(|p| nodes.contains_key(p.as_str())) {
      return Err(StoreError::Conflict(existing.clone()));
    }
    if let Some(orphan) = changes
      .upserts
      .keys()
      .find(|p| !Self::parent_exists(&nodes, changes, p))
    {
      return Err(StoreError::MissingParent(orphan.clone()));
    }

    for deleted in &changes.deleted {
      nodes.retain(|key, _| !path::is_self_or_descendant(key, deleted));
    }

    for (node_path, delta) in &changes.upserts {
      if changes.replaces(node_path) {
        nodes.insert(node_path.clone(), delta.clone());
      } else {
        nodes
          .entry(node_path.clone())
          .or_default()
          .extend(delta.iter().map(|(k, v)| (k.clone(), v.clone())));
      }
    }

    Ok(())
  }
}
