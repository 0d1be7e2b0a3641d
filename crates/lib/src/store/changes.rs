//! Uncommitted changes staged by a session.

use std::collections::{BTreeMap, BTreeSet};

use super::path;
use super::types::ValueMap;

/// Changes a session has made since its last commit or revert.
///
/// `upserts` holds property deltas keyed by node path. Every node created in
/// the session has an entry, even if empty. `created` names nodes that must
/// not exist in the backend at commit time; nodes that only appear in
/// `upserts` are merged into whatever the backend holds.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
  pub(crate) upserts: BTreeMap<String, ValueMap>,
  pub(crate) created: BTreeSet<String>,
  pub(crate) deleted: BTreeSet<String>,
}

impl ChangeSet {
  pub fn is_empty(&self) -> bool {
    self.upserts.is_empty() && self.created.is_empty() && self.deleted.is_empty()
  }

  pub fn clear(&mut self) {
    self.upserts.clear();
    self.created.clear();
    self.deleted.clear();
  }

  /// True if `path` sits at or below a subtree deleted in this session.
  pub fn delete_covers(&self, path: &str) -> bool {
    self.deleted.iter().any(|d| path::is_self_or_descendant(path, d))
  }

  /// True if the backend's copy of `path` is hidden and not replaced.
  pub fn hides(&self, path: &str) -> bool {
    self.delete_covers(path) && !self.upserts.contains_key(path)
  }

  pub(crate) fn stage(&mut self, path: &str, delta: ValueMap) {
    self.upserts.entry(path.to_string()).or_default().extend(delta);
  }

  pub(crate) fn stage_delete(&mut self, path: &str) {
    self.upserts.retain(|p, _| !path::is_self_or_descendant(p, path));
    self.created.retain(|p| !path::is_self_or_descendant(p, path));
    self.deleted.insert(path.to_string());
  }

  /// Drop everything staged at or below `path`, leaving other changes alone.
  pub(crate) fn discard(&mut self, path: &str) {
    self.upserts.retain(|p, _| !path::is_self_or_descendant(p, path));
    self.created.retain(|p| !path::is_self_or_descendant(p, path));
    self.deleted.retain(|p| !path::is_self_or_descendant(p, path));
  }

  /// Created paths that must be absent from the backend at commit.
  pub(crate) fn strict_creates(&self) -> impl Iterator<Item = &String> {
    self.created.iter().filter(|p| !self.delete_covers(p))
  }

  /// Paths whose upsert replaces rather than merges with the backend node.
  pub(crate) fn replaces(&self, path: &str) -> bool {
    self.delete_covers(path)
  }
}
