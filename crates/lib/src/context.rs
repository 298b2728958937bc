//! Explicit build context shared by every component.
//!
//! A `BuildContext` owns the argument store, the captured environment, the
//! output root and the platform. Components borrow it instead of reading
//! process-wide globals, so two contexts never observe each other's state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::args::ArgumentStore;
use crate::consts::{ARGS_CACHE_FILENAME, OBJECTS_DIR, STATE_DIR};
use crate::locate::LibrarySpec;
use crate::platform::Platform;
use crate::util::fs::normalize_lexically;

#[derive(Debug, Error)]
pub enum ContextError {
  #[error("unsupported platform: {os}/{arch}")]
  UnsupportedPlatform { os: String, arch: String },

  #[error("invalid platform setting: {0}")]
  InvalidPlatform(String),

  #[error("failed to resolve current directory: {0}")]
  CurrentDir(#[source] std::io::Error),
}

/// Debug or release build, selected by the `debug` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildMode {
  Debug,
  Release,
}

impl BuildMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Debug => "debug",
      Self::Release => "release",
    }
  }
}

impl fmt::Display for BuildMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Immutable copy of the environment variables visible to a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot(BTreeMap<String, String>);

impl EnvSnapshot {
  /// Capture the current process environment.
  pub fn capture() -> Self {
    Self(std::env::vars().collect())
  }

  pub fn from_pairs<I, K, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
    self.0.iter()
  }
}

/// Warning sink that reports each distinct message once.
#[derive(Debug, Default)]
pub struct Diagnostics {
  seen: HashSet<String>,
  warnings: Vec<String>,
}

impl Diagnostics {
  /// Log `message` as a warning unless it was already reported.
  ///
  /// Returns `true` when the message was new.
  pub fn warn_once(&mut self, message: impl Into<String>) -> bool {
    let message = message.into();
    if !self.seen.insert(message.clone()) {
      return false;
    }
    warn!("{}", message);
    self.warnings.push(message);
    true
  }

  /// All distinct warnings, in the order they were first reported.
  pub fn warnings(&self) -> &[String] {
    &self.warnings
  }
}

/// State shared by the argument store, library locator, external driver and
/// target graph for one top-level invocation.
#[derive(Debug)]
pub struct BuildContext {
  platform: Platform,
  output_root: PathBuf,
  env: EnvSnapshot,
  pub args: ArgumentStore,
  pub(crate) libraries: HashMap<String, LibrarySpec>,
}

impl BuildContext {
  /// Create a context whose argument cache lives under `output_root`.
  pub fn new(platform: Platform, output_root: impl Into<PathBuf>, flags: BTreeMap<String, String>, env: EnvSnapshot) -> Self {
    let output_root = normalize_lexically(&output_root.into());
    let cache_path = output_root.join(STATE_DIR).join(ARGS_CACHE_FILENAME);
    let args = ArgumentStore::new(platform.triple(), flags, env.clone()).with_cache_file(cache_path);
    Self {
      platform,
      output_root,
      env,
      args,
      libraries: HashMap::new(),
    }
  }

  /// Create a context for the running platform and process environment.
  ///
  /// A `platform=<arch>-<os>` flag plans for another platform instead; it is
  /// consumed here and never reaches the argument store. A relative
  /// `output_root` is resolved against the current directory.
  pub fn detect(output_root: impl Into<PathBuf>, mut flags: BTreeMap<String, String>) -> Result<Self, ContextError> {
    let platform = match flags.remove("platform") {
      Some(triple) => triple.parse::<Platform>().map_err(ContextError::InvalidPlatform)?,
      None => Platform::current().ok_or_else(|| ContextError::UnsupportedPlatform {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
      })?,
    };
    let mut root: PathBuf = output_root.into();
    if root.is_relative() {
      root = std::env::current_dir().map_err(ContextError::CurrentDir)?.join(root);
    }
    Ok(Self::new(platform, root, flags, EnvSnapshot::capture()))
  }

  pub fn platform(&self) -> Platform {
    self.platform
  }

  pub fn output_root(&self) -> &Path {
    &self.output_root
  }

  pub fn env(&self) -> &EnvSnapshot {
    &self.env
  }

  pub fn mode(&mut self) -> BuildMode {
    if self.args.get_bool("debug", false) {
      BuildMode::Debug
    } else {
      BuildMode::Release
    }
  }

  /// Whether output paths carry an architecture segment (disabled by `no-arch`).
  pub fn arch_dir_enabled(&mut self) -> bool {
    !self.args.get_bool("no-arch", false)
  }

  fn mode_arch_path(&mut self, base: PathBuf) -> PathBuf {
    let mut path = base.join(self.mode().as_str());
    if self.arch_dir_enabled() {
      path.push(self.platform.arch.dir_name());
    }
    path
  }

  /// Root of installed artifacts: `<output>/<mode>[/<arch>]`.
  pub fn out_base(&mut self) -> PathBuf {
    let root = self.output_root.clone();
    self.mode_arch_path(root)
  }

  /// Root of intermediate objects: `<output>/.objs/<mode>[/<arch>]`.
  pub fn objects_base(&mut self) -> PathBuf {
    let root = self.output_root.join(OBJECTS_DIR);
    self.mode_arch_path(root)
  }

  /// Whether `path` lies inside this build's output tree.
  pub fn is_build_output(&self, path: &Path) -> bool {
    normalize_lexically(path).starts_with(&self.output_root)
  }

  pub fn diagnostics(&self) -> &Diagnostics {
    self.args.diagnostics()
  }

  pub fn warn_once(&mut self, message: impl Into<String>) -> bool {
    self.args.warn_once(message)
  }

  /// Run `f` with argument overrides in place, restoring them afterwards.
  ///
  /// See [`ArgumentStore::enter_scope`] for the restore rules.
  pub fn with_overrides<R>(
    &mut self,
    overrides: &[(&str, &str)],
    retain: &[&str],
    f: impl FnOnce(&mut BuildContext) -> R,
  ) -> R {
    let scope = self.args.enter_scope(overrides);
    let result = f(self);
    self.args.leave_scope(scope, retain);
    result
  }
}
