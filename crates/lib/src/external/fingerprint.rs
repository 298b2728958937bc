//! Configure-time option fingerprints.
//!
//! # Fingerprint File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "options": {
//!     "BUILD_SHARED_LIBS": false,
//!     "CMAKE_PREFIX_PATH": ["/opt/zlib", "/opt/png"]
//!   }
//! }
//! ```
//!
//! Options live in a `BTreeMap`, so equality never depends on insertion
//! order, and sequences have a single representation.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExternalError;

/// Current fingerprint format version.
pub const FINGERPRINT_VERSION: u32 = 1;

/// A configure option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
  Bool(bool),
  Int(i64),
  Str(String),
  List(Vec<OptionValue>),
  Map(BTreeMap<String, OptionValue>),
}

impl fmt::Display for OptionValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OptionValue::Bool(b) => write!(f, "{}", b),
      OptionValue::Int(i) => write!(f, "{}", i),
      OptionValue::Str(s) => write!(f, "{}", s),
      OptionValue::List(items) => {
        let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join(";"))
      }
      OptionValue::Map(map) => {
        let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(";"))
      }
    }
  }
}

impl From<&str> for OptionValue {
  fn from(value: &str) -> Self {
    OptionValue::Str(value.to_string())
  }
}

impl From<String> for OptionValue {
  fn from(value: String) -> Self {
    OptionValue::Str(value)
  }
}

impl From<bool> for OptionValue {
  fn from(value: bool) -> Self {
    OptionValue::Bool(value)
  }
}

impl From<i64> for OptionValue {
  fn from(value: i64) -> Self {
    OptionValue::Int(value)
  }
}

/// Options passed to an external configure step.
pub type ConfigOptions = BTreeMap<String, OptionValue>;

/// The option set recorded by the last successful configure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
  pub version: u32,
  pub options: ConfigOptions,
}

impl Fingerprint {
  pub fn new(options: ConfigOptions) -> Self {
    Self {
      version: FINGERPRINT_VERSION,
      options,
    }
  }

  /// Load a fingerprint.
  ///
  /// Returns `Ok(None)` if the file doesn't exist.
  pub fn load(path: &Path) -> Result<Option<Self>, ExternalError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(ExternalError::Io(e)),
    };

    let fingerprint: Fingerprint = serde_json::from_str(&content).map_err(ExternalError::ParseFingerprint)?;
    if fingerprint.version != FINGERPRINT_VERSION {
      return Err(ExternalError::UnsupportedFingerprintVersion(fingerprint.version));
    }
    Ok(Some(fingerprint))
  }

  pub fn save(&self, path: &Path) -> Result<(), ExternalError> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(self).map_err(ExternalError::SerializeFingerprint)?;
    fs::write(path, content)?;
    Ok(())
  }

  /// Keys whose value differs between the recorded and requested options,
  /// including keys present on only one side.
  pub fn changed_keys(&self, requested: &ConfigOptions) -> Vec<String> {
    let mut changed: Vec<String> = self
      .options
      .iter()
      .filter(|(k, v)| requested.get(*k) != Some(*v))
      .map(|(k, _)| k.clone())
      .collect();
    changed.extend(
      requested
        .keys()
        .filter(|k| !self.options.contains_key(*k))
        .cloned(),
    );
    changed.sort();
    changed
  }

  pub fn matches(&self, requested: &ConfigOptions) -> bool {
    self.options == *requested
  }
}
