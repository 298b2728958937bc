//! Precedence-based argument resolution.
//!
//! An argument is resolved from, highest to lowest precedence:
//! 1. the flag table supplied for this invocation (`key=value` on the command line)
//! 2. the on-disk cache written by previous invocations
//! 3. the environment (`with-foo-inc` is looked up as `WITH_FOO_INC`)
//! 4. the caller's default
//!
//! Flag values are mirrored into the cache so that later invocations without
//! the flag see the same answer. The cache is loaded lazily on first access
//! and written back at most once, when dirty. The `no-cache` flag disables the
//! cache entirely; the store then only consults the flag table.

mod cache;
mod scope;

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

pub use cache::ArgCache;
pub use scope::{OverrideScope, wildcard_match};

use crate::context::{Diagnostics, EnvSnapshot};

/// Flag that disables the on-disk cache for this invocation.
pub const NO_CACHE_FLAG: &str = "no-cache";

/// Errors that can occur when reading or writing the argument cache.
#[derive(Debug, Error)]
pub enum ArgsError {
  /// Failed to read the cache file.
  #[error("failed to read argument cache: {0}")]
  Read(#[source] io::Error),

  /// Failed to write the cache file.
  #[error("failed to write argument cache: {0}")]
  Write(#[source] io::Error),

  /// Failed to parse the cache file JSON.
  #[error("failed to parse argument cache: {0}")]
  Parse(#[source] serde_json::Error),

  /// Failed to serialize the cache.
  #[error("failed to serialize argument cache: {0}")]
  Serialize(#[source] serde_json::Error),

  /// Cache file version is not supported.
  #[error("unsupported argument cache version {0}")]
  UnsupportedVersion(u32),
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  Flag,
  Cache,
  Environment,
  Default,
}

impl fmt::Display for Origin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Origin::Flag => "flag",
      Origin::Cache => "cache",
      Origin::Environment => "environment",
      Origin::Default => "default",
    };
    write!(f, "{}", name)
  }
}

/// A value together with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
  pub value: String,
  pub origin: Origin,
}

/// Environment variable consulted for an argument key.
pub fn env_var_name(key: &str) -> String {
  key
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
    .collect()
}

/// Parse the boolean spellings accepted on the command line.
pub fn parse_bool(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" | "" => Some(false),
    _ => None,
  }
}

/// Key/value store with flag > cache > environment > default precedence.
#[derive(Debug)]
pub struct ArgumentStore {
  platform: String,
  flags: BTreeMap<String, String>,
  env: EnvSnapshot,
  cache_path: Option<PathBuf>,
  cache: Option<ArgCache>,
  caching: Option<bool>,
  dirty: bool,
  diagnostics: Diagnostics,
}

impl ArgumentStore {
  /// Create a store without a backing cache file.
  pub fn new(platform: impl Into<String>, flags: BTreeMap<String, String>, env: EnvSnapshot) -> Self {
    Self {
      platform: platform.into(),
      flags,
      env,
      cache_path: None,
      cache: None,
      caching: None,
      dirty: false,
      diagnostics: Diagnostics::default(),
    }
  }

  /// Warnings reported by this store and by everything sharing its context.
  pub fn diagnostics(&self) -> &Diagnostics {
    &self.diagnostics
  }

  /// Report `message` unless it was already reported.
  pub fn warn_once(&mut self, message: impl Into<String>) -> bool {
    self.diagnostics.warn_once(message)
  }

  /// Back the store with a cache file.
  pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
    self.cache_path = Some(path.into());
    self
  }

  pub fn platform(&self) -> &str {
    &self.platform
  }

  pub fn cache_path(&self) -> Option<&Path> {
    self.cache_path.as_deref()
  }

  /// The transient flag table.
  pub fn flags(&self) -> &BTreeMap<String, String> {
    &self.flags
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  /// Whether the disk cache participates in resolution.
  ///
  /// Decided once, on first access, from the `no-cache` flag.
  pub fn cache_enabled(&mut self) -> bool {
    if let Some(enabled) = self.caching {
      return enabled;
    }
    let disabled = self
      .flags
      .get(NO_CACHE_FLAG)
      .map(|v| parse_bool(v).unwrap_or(true))
      .unwrap_or(false);
    let enabled = self.cache_path.is_some() && !disabled;
    self.caching = Some(enabled);
    enabled
  }

  /// Materialize the cache from disk, discarding it if it is corrupt.
  fn cache_mut(&mut self) -> &mut ArgCache {
    if self.cache.is_none() {
      let loaded = match self.cache_path.as_deref() {
        Some(path) => match ArgCache::load(path) {
          Ok(Some(cache)) => {
            debug!(path = ?path, "loaded argument cache");
            cache
          }
          Ok(None) => ArgCache::new(),
          Err(e) => {
            let message = format!("discarding corrupted argument cache {}: {e}", path.display());
            self.diagnostics.warn_once(message);
            // Rewrite on exit so the corrupt file does not linger.
            self.dirty = true;
            ArgCache::new()
          }
        },
        None => ArgCache::new(),
      };
      self.cache = Some(loaded);
    }
    self.cache.get_or_insert_with(ArgCache::new)
  }

  /// Resolve `key` and report where the value came from.
  ///
  /// Returns `None` when no source supplies a value.
  pub fn resolve(&mut self, key: &str) -> Option<Resolved> {
    if !self.cache_enabled() {
      return self.flags.get(key).map(|value| Resolved {
        value: value.clone(),
        origin: Origin::Flag,
      });
    }

    if let Some(value) = self.flags.get(key).cloned() {
      let platform = self.platform.clone();
      if self.cache_mut().insert(&platform, key, &value) {
        debug!(key, value = %value, "mirroring flag into argument cache");
        self.dirty = true;
      }
      return Some(Resolved {
        value,
        origin: Origin::Flag,
      });
    }

    let platform = self.platform.clone();
    if let Some(value) = self.cache_mut().get(&platform, key) {
      return Some(Resolved {
        value: value.to_string(),
        origin: Origin::Cache,
      });
    }

    self.env.get(&env_var_name(key)).map(|value| Resolved {
      value: value.to_string(),
      origin: Origin::Environment,
    })
  }

  /// Resolve `key`, falling back to `default`.
  pub fn get(&mut self, key: &str, default: &str) -> String {
    self.resolve(key).map(|r| r.value).unwrap_or_else(|| default.to_string())
  }

  /// Resolve `key` and convert it, falling back to `default` (with a warning)
  /// when the value does not convert.
  pub fn get_with<T, E, F>(&mut self, key: &str, default: T, convert: F) -> T
  where
    E: fmt::Display,
    F: FnOnce(&str) -> Result<T, E>,
  {
    let Some(resolved) = self.resolve(key) else {
      return default;
    };
    match convert(&resolved.value) {
      Ok(value) => value,
      Err(e) => {
        self.diagnostics.warn_once(format!(
          "invalid value '{}' for '{key}' from {}: {e}, using default",
          resolved.value, resolved.origin
        ));
        default
      }
    }
  }

  pub fn get_bool(&mut self, key: &str, default: bool) -> bool {
    self.get_with(key, default, |v| parse_bool(v).ok_or("expected a boolean"))
  }

  pub fn get_int(&mut self, key: &str, default: i64) -> i64 {
    self.get_with(key, default, |v| v.trim().parse::<i64>())
  }

  /// Read a boolean from the flag table only.
  ///
  /// Used for one-shot switches (`reconfigure`, `show-cmds`) that must not
  /// be mirrored into the cache.
  pub fn flag_bool(&self, key: &str, default: bool) -> bool {
    self.flags.get(key).and_then(|v| parse_bool(v)).unwrap_or(default)
  }

  /// Set a value for this invocation; with `persist` it is also cached.
  pub fn set(&mut self, key: &str, value: &str, persist: bool) {
    self.flags.insert(key.to_string(), value.to_string());
    if persist && self.cache_enabled() {
      let platform = self.platform.clone();
      if self.cache_mut().insert(&platform, key, value) {
        self.dirty = true;
      }
    }
  }

  /// Remove a value from both the flag table and the cache.
  pub fn remove(&mut self, key: &str) {
    self.flags.remove(key);
    if self.cache_enabled() {
      let platform = self.platform.clone();
      if self.cache_mut().remove(&platform, key) {
        self.dirty = true;
      }
    }
  }

  /// Cached entries for the active platform.
  pub fn cached_entries(&mut self) -> BTreeMap<String, String> {
    if !self.cache_enabled() {
      return BTreeMap::new();
    }
    let platform = self.platform.clone();
    self.cache_mut().entries(&platform)
  }

  /// Write the cache to disk if it changed.
  ///
  /// Returns `true` if a file was written. A second call after a successful
  /// write is a no-op.
  pub fn flush(&mut self) -> Result<bool, ArgsError> {
    if !self.dirty {
      return Ok(false);
    }
    let (Some(path), Some(cache)) = (self.cache_path.as_deref(), self.cache.as_ref()) else {
      self.dirty = false;
      return Ok(false);
    };
    cache.save(path)?;
    debug!(path = ?path, "wrote argument cache");
    self.dirty = false;
    Ok(true)
  }
}

impl Drop for ArgumentStore {
  fn drop(&mut self) {
    if let Err(e) = self.flush() {
      warn!(error = %e, "failed to write argument cache");
    }
  }
}
