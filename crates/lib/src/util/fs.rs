//! Filesystem and path helpers.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` at the root is dropped; leading `..` of a relative path is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => match out.components().next_back() {
        Some(Component::Normal(_)) => {
          out.pop();
        }
        Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
        _ => out.push(".."),
      },
      other => out.push(other.as_os_str()),
    }
  }
  out
}

/// Relative path leading from directory `from` to `to`.
///
/// Both paths are normalized first. Returns `None` when they have different
/// roots (e.g. two Windows drives, or one absolute and one relative).
pub fn relative_path(from: &Path, to: &Path) -> Option<PathBuf> {
  let from = normalize_lexically(from);
  let to = normalize_lexically(to);
  if from.is_absolute() != to.is_absolute() {
    return None;
  }

  let from_parts: Vec<Component<'_>> = from.components().collect();
  let to_parts: Vec<Component<'_>> = to.components().collect();

  let common = from_parts.iter().zip(&to_parts).take_while(|(a, b)| a == b).count();
  if from.is_absolute() && common == 0 {
    return None;
  }

  let mut rel = PathBuf::new();
  for _ in common..from_parts.len() {
    rel.push("..");
  }
  for part in &to_parts[common..] {
    rel.push(part.as_os_str());
  }
  if rel.as_os_str().is_empty() {
    rel.push(".");
  }
  Some(rel)
}

/// Path with forward slashes, for manifests and rpath strings.
pub fn to_slash(path: &Path) -> String {
  path.to_string_lossy().replace('\\', "/")
}

/// Remove a file or symlink, treating "not found" as success.
///
/// Returns `true` if something was removed.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
  match std::fs::remove_file(path) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e),
  }
}

/// Remove a directory tree, treating "not found" as success.
pub fn remove_dir_all_if_exists(path: &Path) -> io::Result<bool> {
  match std::fs::remove_dir_all(path) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e),
  }
}
