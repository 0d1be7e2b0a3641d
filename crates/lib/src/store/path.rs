//! Helpers for absolute, `/`-separated store paths.
//!
//! Store paths are normalized to have no trailing slash, except for the
//! root which is always `/`.

use super::types::StoreError;

pub const ROOT: &str = "/";

/// Normalize and validate an absolute store path.
pub fn normalize(path: &str) -> Result<String, StoreError> {
  if !path.starts_with('/') {
    return Err(StoreError::InvalidPath {
      path: path.to_string(),
      reason: "path must be absolute",
    });
  }

  let trimmed = path.trim_end_matches('/');
  if trimmed.is_empty() {
    return Ok(ROOT.to_string());
  }

  for segment in trimmed[1..].split('/') {
    validate_name(segment).map_err(|reason| StoreError::InvalidPath {
      path: path.to_string(),
      reason,
    })?;
  }

  Ok(trimmed.to_string())
}

/// Check a single path segment.
pub fn validate_name(name: &str) -> Result<(), &'static str> {
  if name.is_empty() {
    return Err("empty path segment");
  }
  if name == "." || name == ".." {
    return Err("relative path segment");
  }
  if name.contains('/') {
    return Err("name contains '/'");
  }
  if name.starts_with('.') {
    return Err("names starting with '.' are reserved");
  }
  Ok(())
}

/// Parent of a normalized path, `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
  if path == ROOT {
    return None;
  }
  match path.rfind('/') {
    Some(0) => Some(ROOT),
    Some(idx) => Some(&path[..idx]),
    None => None,
  }
}

/// Last segment of a normalized path. Empty for the root.
pub fn name(path: &str) -> &str {
  match path.rfind('/') {
    Some(idx) => &path[idx + 1..],
    None => path,
  }
}

pub fn join(parent: &str, name: &str) -> String {
  if parent == ROOT {
    format!("/{}", name)
  } else {
    format!("{}/{}", parent, name)
  }
}

/// True if `path` is `ancestor` or lies below it.
pub fn is_self_or_descendant(path: &str, ancestor: &str) -> bool {
  if ancestor == ROOT {
    return true;
  }
  path == ancestor || (path.starts_with(ancestor) && path[ancestor.len()..].starts_with('/'))
}

/// All proper ancestors of `path` except the root, outermost first.
pub fn ancestors(path: &str) -> Vec<&str> {
  let mut out = Vec::new();
  let mut current = parent(path);
  while let Some(p) = current {
    if p == ROOT {
      break;
    }
    out.push(p);
    current = parent(p);
  }
  out.reverse();
  out
}
