//! On-disk argument cache.
//!
//! # Cache File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "platforms": {
//!     "x86_64-linux": {
//!       "with-zlib": "/opt/zlib",
//!       "debug": "1"
//!     }
//!   }
//! }
//! ```
//!
//! Values are plain strings and nesting never goes deeper than the platform
//! level. `BTreeMap` keeps the serialized key order stable across writes.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ArgsError;
use crate::consts::ARGS_CACHE_VERSION;

/// Platform-namespaced key/value cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgCache {
  /// Cache file format version.
  pub version: u32,
  /// Cached values keyed by platform triple, then by argument name.
  pub platforms: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for ArgCache {
  fn default() -> Self {
    Self::new()
  }
}

impl ArgCache {
  pub fn new() -> Self {
    Self {
      version: ARGS_CACHE_VERSION,
      platforms: BTreeMap::new(),
    }
  }

  /// Load a cache file.
  ///
  /// Returns `Ok(None)` if the file doesn't exist.
  /// Returns `Err` if the file exists but couldn't be read or parsed.
  pub fn load(path: &Path) -> Result<Option<Self>, ArgsError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(ArgsError::Read(e)),
    };

    let cache: ArgCache = serde_json::from_str(&content).map_err(ArgsError::Parse)?;

    if cache.version != ARGS_CACHE_VERSION {
      return Err(ArgsError::UnsupportedVersion(cache.version));
    }

    Ok(Some(cache))
  }

  /// Save the cache file.
  ///
  /// Uses atomic write (write to temp, then rename) so an interrupted write
  /// never leaves a truncated cache behind.
  pub fn save(&self, path: &Path) -> Result<(), ArgsError> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(ArgsError::Write)?;
    }

    let content = serde_json::to_string_pretty(self).map_err(ArgsError::Serialize)?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content).map_err(ArgsError::Write)?;
    fs::rename(&temp_path, path).map_err(ArgsError::Write)?;
    Ok(())
  }

  pub fn get(&self, platform: &str, key: &str) -> Option<&str> {
    self.platforms.get(platform)?.get(key).map(String::as_str)
  }

  /// Insert a value, returning `true` if the stored value changed.
  pub fn insert(&mut self, platform: &str, key: &str, value: &str) -> bool {
    let entries = self.platforms.entry(platform.to_string()).or_default();
    match entries.get(key) {
      Some(existing) if existing == value => false,
      _ => {
        entries.insert(key.to_string(), value.to_string());
        true
      }
    }
  }

  /// Remove a value, returning `true` if it was present.
  pub fn remove(&mut self, platform: &str, key: &str) -> bool {
    self
      .platforms
      .get_mut(platform)
      .map(|entries| entries.remove(key).is_some())
      .unwrap_or(false)
  }

  /// All cached entries for one platform.
  pub fn entries(&self, platform: &str) -> BTreeMap<String, String> {
    self.platforms.get(platform).cloned().unwrap_or_default()
  }

  /// Replace all entries for one platform.
  pub fn replace_entries(&mut self, platform: &str, entries: BTreeMap<String, String>) {
    if entries.is_empty() {
      self.platforms.remove(platform);
    } else {
      self.platforms.insert(platform.to_string(), entries);
    }
  }
}
