//! Sub-builds driven by external build systems.
//!
//! # Lifecycle
//!
//! ```text
//! Unconfigured --configure--> Configured --build--> Built
//!       ^             |                     |
//!       |           Failed <----------------+
//!       +------------------ clean ----------------------
//! ```
//!
//! Each sub-project `<name>` driven by tool `<tool>` owns, under the objects
//! base (`<output>/.objs/<mode>[/<arch>]/<tool>/`):
//!
//! - `<name>/`: the private working directory;
//! - `<name>.options.json`: the fingerprint of the last successful configure;
//! - `<name>.outputs`: the manifest of files the last successful build installed.
//!
//! Configure is skipped when the fingerprint matches the requested options.
//! The build log is scraped while it streams so the manifest can drive an
//! exact clean later.

pub mod fingerprint;
pub mod manifest;
pub mod runner;
pub mod scrape;
pub mod tools;

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

pub use fingerprint::{ConfigOptions, Fingerprint, OptionValue};
pub use manifest::OutputManifest;
pub use tools::{AutotoolsTool, CMakeTool, ExternalTool, Invocation};

use crate::context::BuildContext;
use crate::util::fs::{normalize_lexically, remove_dir_all_if_exists, remove_file_if_exists};
use runner::run_streaming;
use scrape::{LineScanner, ScrapedEntry};

/// Errors raised by external sub-builds.
#[derive(Debug, Error)]
pub enum ExternalError {
  #[error("io error: {0}")]
  Io(#[from] io::Error),

  #[error("failed to parse fingerprint: {0}")]
  ParseFingerprint(#[source] serde_json::Error),

  #[error("failed to serialize fingerprint: {0}")]
  SerializeFingerprint(#[source] serde_json::Error),

  #[error("unsupported fingerprint version {0}")]
  UnsupportedFingerprintVersion(u32),

  /// The tool's executable could not be found.
  #[error("external tool not found: {0}")]
  ToolNotFound(String),

  #[error("failed to start {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("configure of '{name}' failed with exit code {code:?}")]
  ConfigureFailed { name: String, code: Option<i32> },

  #[error("build of '{name}' failed with exit code {code:?}")]
  BuildFailed { name: String, code: Option<i32> },

  /// Build requested for a sub-project without a recorded configuration.
  #[error("'{0}' has not been configured")]
  NotConfigured(String),
}

/// Where a sub-project stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalState {
  Unconfigured,
  Configured,
  Built,
  Failed,
}

impl fmt::Display for ExternalState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ExternalState::Unconfigured => "unconfigured",
      ExternalState::Configured => "configured",
      ExternalState::Built => "built",
      ExternalState::Failed => "failed",
    };
    write!(f, "{}", name)
  }
}

/// On-disk locations of one sub-project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
  pub work_dir: PathBuf,
  pub fingerprint: PathBuf,
  pub manifest: PathBuf,
}

/// Configure/build/clean state machine shared by every [`ExternalTool`].
#[derive(Debug)]
pub struct ExternalBuildDriver {
  tool: Box<dyn ExternalTool>,
  failed: HashSet<String>,
}

impl ExternalBuildDriver {
  pub fn new(tool: impl ExternalTool + 'static) -> Self {
    Self {
      tool: Box::new(tool),
      failed: HashSet::new(),
    }
  }

  pub fn cmake() -> Self {
    Self::new(CMakeTool::new())
  }

  pub fn autotools() -> Self {
    Self::new(AutotoolsTool::new())
  }

  /// Driver for a built-in tool by name (`cmake`, `autotools`).
  ///
  /// The `cmake` and `make` arguments name the programs to run.
  pub fn for_tool(ctx: &mut BuildContext, name: &str) -> Option<Self> {
    match name {
      "cmake" => Some(Self::new(CMakeTool::with_program(ctx.args.get("cmake", "cmake")))),
      "autotools" => Some(Self::new(AutotoolsTool::with_make(ctx.args.get("make", "make")))),
      _ => None,
    }
  }

  pub fn tool(&self) -> &dyn ExternalTool {
    self.tool.as_ref()
  }

  pub fn paths(&self, ctx: &mut BuildContext, name: &str) -> ProjectPaths {
    let base = ctx.objects_base().join(self.tool.name());
    ProjectPaths {
      work_dir: base.join(name),
      fingerprint: base.join(format!("{name}.options.json")),
      manifest: base.join(format!("{name}.outputs")),
    }
  }

  /// Load the recorded fingerprint; an unreadable record is discarded.
  fn recorded(&self, ctx: &mut BuildContext, name: &str, path: &Path) -> Result<Option<Fingerprint>, ExternalError> {
    match Fingerprint::load(path) {
      Ok(fp) => Ok(fp),
      Err(e @ (ExternalError::ParseFingerprint(_) | ExternalError::UnsupportedFingerprintVersion(_))) => {
        ctx.warn_once(format!("{name}: discarding unreadable fingerprint '{}': {e}", path.display()));
        remove_file_if_exists(path)?;
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }

  fn invocation(&self, ctx: &mut BuildContext, name: &str, source_dir: &Path, paths: &ProjectPaths, options: ConfigOptions) -> Invocation {
    let jobs = ctx.args.get_int("jobs", 1).clamp(1, u32::MAX as i64) as u32;
    Invocation {
      name: name.to_string(),
      source_dir: source_dir.to_path_buf(),
      work_dir: paths.work_dir.clone(),
      prefix: ctx.out_base(),
      options,
      mode: ctx.mode(),
      jobs,
      verbose: ctx.args.flag_bool("show-cmds", false),
      env: tools::forwarded_env(ctx.env()),
    }
  }

  /// Whether `configure` with `options` would run the tool.
  pub fn needs_configure(&self, ctx: &mut BuildContext, name: &str, options: &ConfigOptions) -> Result<bool, ExternalError> {
    if ctx.args.flag_bool("reconfigure", false) {
      return Ok(true);
    }
    let paths = self.paths(ctx, name);
    match self.recorded(ctx, name, &paths.fingerprint)? {
      Some(fp) if fp.matches(options) => Ok(false),
      Some(fp) => {
        info!(project = %name, changed = ?fp.changed_keys(options), "configure options changed");
        Ok(true)
      }
      None => Ok(true),
    }
  }

  /// Configure `name` from `source_dir`.
  ///
  /// Returns `false` when the recorded configuration is already current.
  pub fn configure(
    &mut self,
    ctx: &mut BuildContext,
    name: &str,
    source_dir: &Path,
    options: &ConfigOptions,
  ) -> Result<bool, ExternalError> {
    if !self.needs_configure(ctx, name, options)? {
      debug!(project = %name, "configuration up to date");
      return Ok(false);
    }

    let paths = self.paths(ctx, name);
    fs::create_dir_all(&paths.work_dir)?;
    let inv = self.invocation(ctx, name, source_dir, &paths, options.clone());
    let cmd = self.tool.configure(&inv);

    info!(project = %name, tool = self.tool.name(), "configuring");
    let mut scanner = LineScanner::default();
    let mut log = |line: &str| debug!(project = %name, "{}", line);
    let result = run_streaming(&cmd, inv.verbose, |chunk| scanner.feed(chunk, &mut log));
    scanner.finish(&mut log);

    let failure = match result {
      Ok(Some(0)) => {
        Fingerprint::new(options.clone()).save(&paths.fingerprint)?;
        self.failed.remove(name);
        return Ok(true);
      }
      Ok(code) => ExternalError::ConfigureFailed {
        name: name.to_string(),
        code,
      },
      Err(e) => e,
    };

    self.failed.insert(name.to_string());
    self.discard_configuration(&paths)?;
    Err(failure)
  }

  /// Remove the records and the tool's configure artifacts.
  fn discard_configuration(&self, paths: &ProjectPaths) -> Result<(), ExternalError> {
    remove_file_if_exists(&paths.fingerprint)?;
    remove_file_if_exists(&paths.manifest)?;
    for artifact in self.tool.configure_artifacts(&paths.work_dir) {
      if artifact.is_dir() {
        remove_dir_all_if_exists(&artifact)?;
      } else {
        remove_file_if_exists(&artifact)?;
      }
    }
    Ok(())
  }

  /// Build and install `name`, recording the installed files.
  pub fn build(
    &mut self,
    ctx: &mut BuildContext,
    name: &str,
    source_dir: &Path,
    target: Option<&str>,
  ) -> Result<OutputManifest, ExternalError> {
    let paths = self.paths(ctx, name);
    let Some(fp) = self.recorded(ctx, name, &paths.fingerprint)? else {
      return Err(ExternalError::NotConfigured(name.to_string()));
    };
    let inv = self.invocation(ctx, name, source_dir, &paths, fp.options);
    let cmd = self.tool.build(&inv, target);
    let root = ctx.output_root().to_path_buf();

    info!(project = %name, tool = self.tool.name(), "building");
    let tool = self.tool.as_ref();
    let mut manifest = OutputManifest::new();
    let mut scanner = LineScanner::default();
    let mut on_line = |line: &str| {
      debug!(project = %name, "{}", line);
      for entry in tool.scrape(line) {
        let path = match entry {
          ScrapedEntry::Installed(path) => path,
          ScrapedEntry::Symlink { target, .. } => target,
        };
        let path = if path.is_relative() { inv.work_dir.join(path) } else { path };
        manifest.insert(&root, &normalize_lexically(&path));
      }
    };
    let result = run_streaming(&cmd, inv.verbose, |chunk| scanner.feed(chunk, &mut on_line));
    scanner.finish(&mut on_line);

    let failure = match result {
      Ok(Some(0)) => {
        manifest.save(&paths.manifest)?;
        info!(project = %name, files = manifest.len(), "installed");
        self.failed.remove(name);
        return Ok(manifest);
      }
      Ok(code) => ExternalError::BuildFailed {
        name: name.to_string(),
        code,
      },
      Err(e) => e,
    };

    self.failed.insert(name.to_string());
    remove_file_if_exists(&paths.manifest)?;
    remove_file_if_exists(&paths.fingerprint)?;
    Err(failure)
  }

  /// Configure when needed, then build.
  pub fn configure_and_build(
    &mut self,
    ctx: &mut BuildContext,
    name: &str,
    source_dir: &Path,
    options: &ConfigOptions,
    target: Option<&str>,
  ) -> Result<OutputManifest, ExternalError> {
    self.configure(ctx, name, source_dir, options)?;
    self.build(ctx, name, source_dir, target)
  }

  /// Files installed by the last successful build, if any.
  pub fn outputs(&self, ctx: &mut BuildContext, name: &str) -> Result<Option<Vec<PathBuf>>, ExternalError> {
    let paths = self.paths(ctx, name);
    Ok(OutputManifest::load(&paths.manifest)?.map(|m| m.paths(ctx.output_root())))
  }

  pub fn state(&self, ctx: &mut BuildContext, name: &str) -> ExternalState {
    if self.failed.contains(name) {
      return ExternalState::Failed;
    }
    let paths = self.paths(ctx, name);
    if paths.manifest.is_file() {
      ExternalState::Built
    } else if paths.fingerprint.is_file() {
      ExternalState::Configured
    } else {
      ExternalState::Unconfigured
    }
  }

  /// Remove every installed file listed in the manifest, the working
  /// directory and both records. Safe to call repeatedly.
  ///
  /// Returns the installed files that were removed.
  pub fn clean(&mut self, ctx: &mut BuildContext, name: &str) -> Result<Vec<PathBuf>, ExternalError> {
    let paths = self.paths(ctx, name);
    let mut removed = Vec::new();

    if let Some(manifest) = OutputManifest::load(&paths.manifest)? {
      for path in manifest.paths(ctx.output_root()) {
        let is_real_dir = fs::symlink_metadata(&path).map(|m| m.is_dir()).unwrap_or(false);
        if is_real_dir {
          warn!(project = %name, path = ?path, "manifest entry is a directory, leaving it");
          continue;
        }
        if remove_file_if_exists(&path)? {
          removed.push(path);
        }
      }
    }

    remove_dir_all_if_exists(&paths.work_dir)?;
    remove_file_if_exists(&paths.fingerprint)?;
    remove_file_if_exists(&paths.manifest)?;
    self.failed.remove(name);

    info!(project = %name, files = removed.len(), "cleaned");
    Ok(removed)
  }
}
