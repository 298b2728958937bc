//! Output manifests of external sub-builds.
//!
//! A manifest is a plain text file, one path per line, sorted and without
//! duplicates. Paths inside the output root are stored relative to it.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::ExternalError;
use crate::util::fs::to_slash;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputManifest {
  entries: BTreeSet<String>,
}

impl OutputManifest {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record `path`, relative to `root` when it lies inside it.
  pub fn insert(&mut self, root: &Path, path: &Path) -> bool {
    let entry = match path.strip_prefix(root) {
      Ok(rel) if !rel.as_os_str().is_empty() => to_slash(rel),
      _ => to_slash(path),
    };
    self.entries.insert(entry)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Entries as written to disk.
  pub fn entries(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(String::as_str)
  }

  /// Entries resolved against `root`.
  pub fn paths(&self, root: &Path) -> Vec<PathBuf> {
    self
      .entries
      .iter()
      .map(|entry| {
        let path = Path::new(entry);
        if path.is_absolute() { path.to_path_buf() } else { root.join(path) }
      })
      .collect()
  }

  /// Load a manifest.
  ///
  /// Returns `Ok(None)` if the file doesn't exist.
  pub fn load(path: &Path) -> Result<Option<Self>, ExternalError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(ExternalError::Io(e)),
    };
    let entries = content
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect();
    Ok(Some(Self { entries }))
  }

  pub fn save(&self, path: &Path) -> Result<(), ExternalError> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let mut content = String::new();
    for entry in &self.entries {
      content.push_str(entry);
      content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
  }
}
