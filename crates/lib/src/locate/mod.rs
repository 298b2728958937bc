//! External library location.
//!
//! Include and library directories of a dependency `<name>` are resolved
//! independently, highest precedence first:
//!
//! 1. `with-<name>-inc` / `with-<name>-lib`
//! 2. `with-<name>` prefix joined with the conventional subdirectory
//!    (the lib subdirectory optionally arch-qualified, see [`ArchMode`])
//! 3. `<NAME>_INCLUDE` / `<NAME>_LIB` from the environment, only when the
//!    directory exists
//!
//! A directory from steps 1-2 must exist or lie inside the build's own output
//! tree (it may be produced by another target); otherwise it is discarded
//! with a warning. Resolution only reads flags, cache, environment and the
//! filesystem, so it is deterministic for a fixed set of those.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::context::BuildContext;
use crate::platform::arch::Arch;
use crate::target::naming::Naming;

/// Which directory of a dependency is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirKind {
  Include,
  Lib,
}

impl DirKind {
  fn flag_suffix(&self) -> &'static str {
    match self {
      Self::Include => "inc",
      Self::Lib => "lib",
    }
  }

  fn env_suffix(&self) -> &'static str {
    match self {
      Self::Include => "INCLUDE",
      Self::Lib => "LIB",
    }
  }
}

impl fmt::Display for DirKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Include => write!(f, "include"),
      Self::Lib => write!(f, "library"),
    }
  }
}

/// How the architecture qualifies a prefix's lib directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchMode {
  /// `<prefix>/lib`
  #[default]
  None,
  /// `<prefix>/lib/<arch>`
  Subdir,
  /// `<prefix>/lib64` on 64-bit targets, `<prefix>/lib` otherwise
  Suffix,
}

impl FromStr for ArchMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "" | "none" | "0" => Ok(Self::None),
      "subdir" => Ok(Self::Subdir),
      "suffix" => Ok(Self::Suffix),
      other => Err(format!("unknown libdir-arch mode '{other}' (expected none, subdir or suffix)")),
    }
  }
}

impl ArchMode {
  /// Apply the mode to a lib directory name under `prefix`.
  pub fn lib_dir(&self, prefix: &Path, lib_dir_name: &str, arch: Arch) -> PathBuf {
    match self {
      Self::None => prefix.join(lib_dir_name),
      Self::Subdir => prefix.join(lib_dir_name).join(arch.dir_name()),
      Self::Suffix if arch.is_64bit() => prefix.join(format!("{lib_dir_name}64")),
      Self::Suffix => prefix.join(lib_dir_name),
    }
  }
}

/// What to do when a directory cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
  #[default]
  Warn,
  Fail,
}

#[derive(Debug, Error)]
pub enum LocateError {
  #[error("{name}: {kind} directory not found (use with-{name}, with-{name}-{suffix} or {env})")]
  NotFound {
    name: String,
    kind: DirKind,
    suffix: &'static str,
    env: String,
  },
}

/// Options for [`resolve`].
#[derive(Debug, Clone)]
pub struct LocateOptions {
  pub include_dir_name: String,
  pub lib_dir_name: String,
  /// `None` uses the global `libdir-arch` flag.
  pub arch_mode: Option<ArchMode>,
  pub on_missing: MissingPolicy,
}

impl Default for LocateOptions {
  fn default() -> Self {
    Self {
      include_dir_name: "include".to_string(),
      lib_dir_name: "lib".to_string(),
      arch_mode: None,
      on_missing: MissingPolicy::Warn,
    }
  }
}

/// Resolved directories; `None` means not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocatedDirs {
  pub include_dir: Option<PathBuf>,
  pub lib_dir: Option<PathBuf>,
}

/// Fully resolved external dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibrarySpec {
  pub include_dir: Option<PathBuf>,
  pub lib_dir: Option<PathBuf>,
  pub library_name: Option<String>,
  pub library_path: Option<PathBuf>,
  pub is_static: bool,
}

fn env_prefix(name: &str) -> String {
  crate::args::env_var_name(name)
}

fn global_arch_mode(ctx: &mut BuildContext) -> ArchMode {
  ctx.args.get_with("libdir-arch", ArchMode::None, |v| v.parse::<ArchMode>())
}

/// A directory from a flag is usable if it exists or will be produced by this build.
fn accept_flag_dir(ctx: &mut BuildContext, name: &str, kind: DirKind, path: PathBuf, source: &str) -> Option<PathBuf> {
  if path.is_dir() || ctx.is_build_output(&path) {
    return Some(path);
  }
  ctx.warn_once(format!(
    "{name}: {kind} directory '{}' from {source} does not exist, ignoring it",
    path.display()
  ));
  None
}

fn resolve_dir(
  ctx: &mut BuildContext,
  name: &str,
  kind: DirKind,
  options: &LocateOptions,
  arch_mode: ArchMode,
) -> Option<PathBuf> {
  let dedicated_flag = format!("with-{name}-{}", kind.flag_suffix());
  if let Some(value) = ctx.args.resolve(&dedicated_flag).map(|r| r.value).filter(|v| !v.is_empty())
    && let Some(dir) = accept_flag_dir(ctx, name, kind, PathBuf::from(value), &dedicated_flag)
  {
    debug!(name, %kind, dir = ?dir, source = %dedicated_flag, "resolved directory");
    return Some(dir);
  }

  let prefix_flag = format!("with-{name}");
  if let Some(prefix) = ctx.args.resolve(&prefix_flag).map(|r| r.value).filter(|v| !v.is_empty()) {
    let prefix = PathBuf::from(prefix);
    let candidate = match kind {
      DirKind::Include => prefix.join(&options.include_dir_name),
      DirKind::Lib => arch_mode.lib_dir(&prefix, &options.lib_dir_name, ctx.platform().arch),
    };
    if let Some(dir) = accept_flag_dir(ctx, name, kind, candidate, &prefix_flag) {
      debug!(name, %kind, dir = ?dir, source = %prefix_flag, "resolved directory");
      return Some(dir);
    }
  }

  let env_var = format!("{}_{}", env_prefix(name), kind.env_suffix());
  let from_env = ctx.env().get(&env_var).filter(|v| !v.is_empty()).map(PathBuf::from);
  if let Some(dir) = from_env.filter(|p| p.is_dir()) {
    debug!(name, %kind, dir = ?dir, source = %env_var, "resolved directory");
    return Some(dir);
  }

  None
}

fn missing(ctx: &mut BuildContext, name: &str, kind: DirKind, policy: MissingPolicy) -> Result<(), LocateError> {
  let error = LocateError::NotFound {
    name: name.to_string(),
    kind,
    suffix: kind.flag_suffix(),
    env: format!("{}_{}", env_prefix(name), kind.env_suffix()),
  };
  match policy {
    MissingPolicy::Warn => {
      ctx.warn_once(error.to_string());
      Ok(())
    }
    MissingPolicy::Fail => Err(error),
  }
}

/// Resolve the include and lib directories of dependency `name`.
pub fn resolve(ctx: &mut BuildContext, name: &str, options: &LocateOptions) -> Result<LocatedDirs, LocateError> {
  let arch_mode = match options.arch_mode {
    Some(mode) => mode,
    None => global_arch_mode(ctx),
  };

  let include_dir = resolve_dir(ctx, name, DirKind::Include, options, arch_mode);
  let lib_dir = resolve_dir(ctx, name, DirKind::Lib, options, arch_mode);

  if include_dir.is_none() {
    missing(ctx, name, DirKind::Include, options.on_missing)?;
  }
  if lib_dir.is_none() {
    missing(ctx, name, DirKind::Lib, options.on_missing)?;
  }

  Ok(LocatedDirs { include_dir, lib_dir })
}

/// Request for [`require_external_library`].
#[derive(Debug, Clone, Default)]
pub struct LibraryRequest {
  /// Library base name when `<name>-name` is not given (defaults to `name`).
  pub default_lib_name: Option<String>,
  /// Whether the static archive is preferred when `<name>-static` is not given.
  pub default_static: bool,
  pub locate: LocateOptions,
}

/// Resolve dependency `name` into a [`LibrarySpec`].
///
/// Honors `<name>-name`, `<name>-prefix`, `<name>-suffix` and `<name>-static`.
/// The result is computed once per name for the lifetime of the context;
/// later flag changes do not invalidate it.
pub fn require_external_library(
  ctx: &mut BuildContext,
  name: &str,
  request: &LibraryRequest,
) -> Result<LibrarySpec, LocateError> {
  if let Some(spec) = ctx.libraries.get(name) {
    return Ok(spec.clone());
  }

  let dirs = resolve(ctx, name, &request.locate)?;

  let base = request.default_lib_name.clone().unwrap_or_else(|| name.to_string());
  let base = ctx.args.get(&format!("{name}-name"), &base);
  let prefix = ctx.args.get(&format!("{name}-prefix"), "");
  let suffix = ctx.args.get(&format!("{name}-suffix"), "");
  let library_name = format!("{prefix}{base}{suffix}");
  let is_static = ctx.args.get_bool(&format!("{name}-static"), request.default_static);

  let naming = Naming::for_os(ctx.platform().os);
  let file_name = if is_static {
    naming.static_lib(&library_name)
  } else {
    naming.link_lib(&library_name)
  };

  let library_path = match &dirs.lib_dir {
    Some(lib_dir) => {
      let candidate = lib_dir.join(&file_name);
      if candidate.exists() || ctx.is_build_output(&candidate) {
        Some(candidate)
      } else {
        ctx.warn_once(format!("{name}: '{}' not found in '{}'", file_name, lib_dir.display()));
        None
      }
    }
    None => None,
  };

  let spec = LibrarySpec {
    include_dir: dirs.include_dir,
    lib_dir: dirs.lib_dir,
    library_name: Some(library_name),
    library_path,
    is_static,
  };
  ctx.libraries.insert(name.to_string(), spec.clone());
  Ok(spec)
}

/// Find the static archive of `name` in one of `lib_dirs`.
pub fn find_static_library(naming: Naming, lib_dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
  let file_name = naming.static_lib(name);
  lib_dirs.iter().map(|dir| dir.join(&file_name)).find(|candidate| candidate.is_file())
}
