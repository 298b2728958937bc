//! Output locations and runtime search paths.
//!
//! Artifacts are placed under `<output>/<mode>[/<arch>]/<subdir>` where
//! `<subdir>` defaults per artifact type (`bin`, `lib`). A relative prefix
//! replaces the default subdirectory; an absolute prefix is used as is.

use std::path::{Path, PathBuf};

use crate::platform::os::Os;
use crate::util::fs::{normalize_lexically, relative_path, to_slash};

use super::types::ArtifactType;

/// Default subdirectory of an artifact type, `None` for the base itself.
pub fn default_subdir(os: Os, artifact: ArtifactType) -> Option<&'static str> {
  match artifact {
    ArtifactType::Program | ArtifactType::TestPrograms => Some("bin"),
    // DLLs live next to the programs that load them.
    ArtifactType::SharedLib if os == Os::Windows => Some("bin"),
    ArtifactType::SharedLib | ArtifactType::StaticLib | ArtifactType::DynamicModule => Some("lib"),
    ArtifactType::Install | ArtifactType::Custom => None,
  }
}

/// Directory receiving the artifact.
pub fn output_dir(out_base: &Path, os: Os, artifact: ArtifactType, prefix: Option<&Path>) -> PathBuf {
  let dir = match prefix {
    Some(prefix) if prefix.is_absolute() => prefix.to_path_buf(),
    Some(prefix) => out_base.join(prefix),
    None => match default_subdir(os, artifact) {
      Some(subdir) => out_base.join(subdir),
      None => out_base.to_path_buf(),
    },
  };
  normalize_lexically(&dir)
}

/// Directory receiving import libraries on Windows.
pub fn import_lib_dir(out_base: &Path, prefix: Option<&Path>) -> PathBuf {
  output_dir(out_base, Os::Linux, ArtifactType::StaticLib, prefix)
}

/// Runtime search path from `binary_dir` back to `lib_dir`.
///
/// Empty on Windows, which has no rpath.
pub fn runtime_search_path(os: Os, binary_dir: &Path, lib_dir: &Path) -> Vec<String> {
  if !os.has_rpath() {
    return Vec::new();
  }
  let origin = if os == Os::MacOs { "@loader_path" } else { "$ORIGIN" };
  match relative_path(binary_dir, lib_dir) {
    Some(rel) if rel == Path::new(".") => vec![origin.to_string()],
    Some(rel) => vec![format!("{origin}/{}", to_slash(&rel))],
    None => vec![to_slash(lib_dir)],
  }
}
