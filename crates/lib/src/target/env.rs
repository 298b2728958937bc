//! Per-target build environment.
//!
//! The caller hands `declare` a base environment. Every target works on its
//! own clone, so defines, paths and libraries added for one target never
//! reach its siblings.

use std::path::PathBuf;
use std::str::FromStr;

use crate::graph::ToolFlags;

use super::types::BuildSettings;

/// Compiler warning level requested by the `warnings` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningLevel {
  None,
  #[default]
  Standard,
  All,
}

impl FromStr for WarningLevel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "none" | "0" | "off" => Ok(Self::None),
      "std" | "standard" | "1" | "on" => Ok(Self::Standard),
      "all" | "2" => Ok(Self::All),
      other => Err(format!("unknown warnings level '{other}' (expected none, std or all)")),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
  pub defines: Vec<String>,
  pub include_dirs: Vec<PathBuf>,
  pub cflags: Vec<String>,
  pub lib_dirs: Vec<PathBuf>,
  pub libs: Vec<String>,
  pub link_flags: Vec<String>,
  pub warnings: WarningLevel,
  pub warnings_as_errors: bool,
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
  if !list.contains(&item) {
    list.push(item);
  }
}

impl BuildEnv {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a target's own settings.
  pub fn apply(&mut self, settings: &BuildSettings) {
    for define in &settings.defines {
      push_unique(&mut self.defines, define.clone());
    }
    for dir in &settings.include_dirs {
      push_unique(&mut self.include_dirs, dir.clone());
    }
    for dir in &settings.lib_dirs {
      push_unique(&mut self.lib_dirs, dir.clone());
    }
    self.cflags.extend(settings.cflags.iter().cloned());
    self.link_flags.extend(settings.link_flags.iter().cloned());
  }

  pub fn add_include_dir(&mut self, dir: PathBuf) {
    push_unique(&mut self.include_dirs, dir);
  }

  pub fn add_lib_dir(&mut self, dir: PathBuf) {
    push_unique(&mut self.lib_dirs, dir);
  }

  pub fn add_lib(&mut self, lib: impl Into<String>) {
    push_unique(&mut self.libs, lib.into());
  }

  /// Flags of the compile and link steps.
  pub fn tool_flags(&self) -> ToolFlags {
    ToolFlags {
      defines: self.defines.clone(),
      include_dirs: self.include_dirs.clone(),
      cflags: self.cflags.clone(),
      lib_dirs: self.lib_dirs.clone(),
      libs: self.libs.clone(),
      link_flags: self.link_flags.clone(),
    }
  }
}
