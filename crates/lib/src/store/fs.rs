//! Directory-per-node store on the local filesystem.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;

use super::changes::ChangeSet;
use super::path::ROOT;
use super::session::{Backend, Node, StoreSession};
use super::types::{StoreError, ValueMap};

/// File holding a node's properties inside its directory.
const CONTENT_FILENAME: &str = ".content.json";

pub type FsSession = StoreSession<FsRepository>;

/// A store rooted at a directory.
///
/// Each node is a directory; its properties live in `.content.json`. Property
/// files are replaced atomically, but a commit touching several nodes is not
/// atomic as a whole.
#[derive(Debug, Clone)]
pub struct FsRepository {
  root: PathBuf,
}

impl FsRepository {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Create the root directory if needed and return the repository.
  pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let root = root.into();
    fs::create_dir_all(&root).map_err(|source| StoreError::Write {
      path: root.clone(),
      source,
    })?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn session(&self) -> FsSession {
    StoreSession::new(self.clone())
  }

  fn dir_for(&self, path: &str) -> PathBuf {
    if path == ROOT {
      return self.root.clone();
    }
    path[1..].split('/').fold(self.root.clone(), |dir, segment| dir.join(segment))
  }

  fn read_content(&self, dir: &Path) -> Result<Option<ValueMap>, StoreError> {
    let file = dir.join(CONTENT_FILENAME);
    let content = match fs::read_to_string(&file) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(source) => return Err(StoreError::Read { path: file, source }),
    };

    let props = serde_json::from_str(&content).map_err(|source| StoreError::Parse { path: file, source })?;
    Ok(Some(props))
  }

  /// Write properties via a temp file in the same directory, then rename.
  fn write_content(&self, node_path: &str, dir: &Path, props: &ValueMap) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(props).map_err(|source| StoreError::Serialize {
      path: node_path.to_string(),
      source,
    })?;

    let write_err = |source: io::Error| StoreError::Write {
      path: dir.to_path_buf(),
      source,
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(content.as_bytes()).map_err(write_err)?;
    temp
      .persist(dir.join(CONTENT_FILENAME))
      .map_err(|e| write_err(e.error))?;
    Ok(())
  }

  fn create_dir(&self, node_path: &str, dir: &Path, strict: bool) -> Result<(), StoreError> {
    match fs::create_dir(dir) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
        if strict {
          Err(StoreError::Conflict(node_path.to_string()))
        } else {
          Ok(())
        }
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::MissingParent(node_path.to_string())),
      Err(source) => Err(StoreError::Write {
        path: dir.to_path_buf(),
        source,
      }),
    }
  }
}

impl Backend for FsRepository {
  fn load(&self, path: &str) -> Result<Option<Node>, StoreError> {
    let dir = self.dir_for(path);
    match fs::metadata(&dir) {
      Ok(meta) if meta.is_dir() => Ok(Some(Node {
        properties: self.read_content(&dir)?,
      })),
      Ok(_) => Ok(None),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(StoreError::Read { path: dir, source }),
    }
  }

  fn child_names(&self, path: &str) -> Result<Vec<String>, StoreError> {
    let dir = self.dir_for(path);
    let read_err = |source: io::Error| StoreError::Read {
      path: dir.clone(),
      source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(&dir).map_err(read_err)? {
      let entry = entry.map_err(read_err)?;
      if !entry.file_type().map_err(read_err)?.is_dir() {
        continue;
      }
      let name = entry.file_name().to_string_lossy().to_string();
      if !name.starts_with('.') {
        names.push(name);
      }
    }
    names.sort();
    Ok(names)
  }

  fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
    if let Some(existing) = changes.strict_creates().find(|p| self.dir_for(p).exists()) {
      return Err(StoreError::Conflict(existing.clone()));
    }

    for deleted in &changes.deleted {
      let dir = self.dir_for(deleted);
      match fs::remove_dir_all(&dir) {
        Ok(()) => trace!(path = %deleted, "removed node directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(StoreError::Write { path: dir, source }),
      }
    }

    // BTreeMap order puts parents before their children.
    for (node_path, delta) in &changes.upserts {
      let dir = self.dir_for(node_path);
      let strict = changes.created.contains(node_path) && !changes.replaces(node_path);
      self.create_dir(node_path, &dir, strict)?;

      let props = if changes.replaces(node_path) {
        delta.clone()
      } else {
        let mut props = self.read_content(&dir)?.unwrap_or_default();
        props.extend(delta.iter().map(|(k, v)| (k.clone(), v.clone())));
        props
      };
      self.write_content(node_path, &dir, &props)?;
    }

    Ok(())
  }
}
