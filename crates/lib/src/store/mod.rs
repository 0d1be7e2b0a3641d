//! Hierarchical resource store.
//!
//! Shared package records live as nodes in a path-addressed tree. Callers work
//! through a session implementing [`ResourceStore`]; a session stages changes
//! in memory and only makes them visible to other sessions on [`commit`].
//!
//! Two backends are provided:
//!
//! - [`MemoryRepository`]: a shared in-process tree, one session per unit of work
//! - [`FsRepository`]: one directory per node on disk
//!
//! # Layout (filesystem backend)
//!
//! ```text
//! <root>/
//! └── var/sling/replication/
//!     ├── .content.json                      # properties of the node
//!     └── replpackage_<ts>_<uuid>/
//!         ├── .content.json
//!         └── refs/
//!             └── .content.json
//! ```
//!
//! [`commit`]: ResourceStore::commit

mod changes;
mod fs;
mod memory;
pub mod path;
mod session;
mod types;

pub use changes::ChangeSet;
pub use fs::{FsRepository, FsSession};
pub use memory::{MemoryRepository, MemorySession};
pub use session::{Backend, Node, StoreSession};
pub use types::*;

/// Session over a hierarchical store.
///
/// Reads see the session's own uncommitted changes. Nothing becomes visible
/// to other sessions until [`commit`](Self::commit) succeeds.
pub trait ResourceStore {
  /// Look up the node at `path`.
  fn resolve(&self, path: &str) -> Result<Option<Resource>, StoreError>;

  /// Return the node at `path`, creating it and any missing ancestors.
  ///
  /// The node gets `primary_type` as its primary type and `resource_type` as
  /// its resource type. Missing ancestors get `resource_type` as their
  /// primary type. With `autosave` the session is committed afterwards.
  fn get_or_create(
    &mut self,
    path: &str,
    primary_type: &str,
    resource_type: &str,
    autosave: bool,
  ) -> Result<Resource, StoreError>;

  /// Create a new child node. Fails if the child already exists.
  fn create_child(&mut self, parent: &Resource, name: &str, properties: ValueMap) -> Result<Resource, StoreError>;

  /// Properties of a node, `None` if the node is gone or carries none.
  fn read_properties(&self, resource: &Resource) -> Result<Option<ValueMap>, StoreError>;

  /// Merge `properties` into the node's existing properties.
  fn write_properties(&mut self, resource: &Resource, properties: ValueMap) -> Result<(), StoreError>;

  /// Direct children of a node, ordered by path.
  fn children(&self, resource: &Resource) -> Result<Vec<Resource>, StoreError>;

  /// Delete a node and everything below it.
  fn delete(&mut self, resource: &Resource) -> Result<(), StoreError>;

  /// Persist all staged changes.
  fn commit(&mut self) -> Result<(), StoreError>;

  /// Discard all staged changes.
  fn revert(&mut self);

  /// Discard staged changes at or below `path`, keeping the rest.
  fn discard(&mut self, path: &str) -> Result<(), StoreError>;

  fn has_changes(&self) -> bool;
}
