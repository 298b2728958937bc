//! Target descriptors and their validated form.
//!
//! # Descriptor Format
//!
//! ```json
//! {
//!   "name": "plugins/blur",
//!   "type": "dynamicmodule",
//!   "alias": "blur",
//!   "sources": ["src/blur.c"],
//!   "deps": ["core"],
//!   "libs": ["m"],
//!   "staticlibs": ["png"],
//!   "module": { "ext": "ofx" }
//! }
//! ```
//!
//! Descriptors arrive loosely typed. [`TargetDescriptor::validate`] turns one
//! into a [`TargetSpec`] whose [`TargetKind`] holds exactly the options of its
//! artifact type. Unknown keys land in `extra`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::external::ConfigOptions;

/// Artifact type of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
  SharedLib,
  StaticLib,
  Program,
  TestPrograms,
  DynamicModule,
  Install,
  Custom,
}

impl ArtifactType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::SharedLib => "sharedlib",
      Self::StaticLib => "staticlib",
      Self::Program => "program",
      Self::TestPrograms => "testprograms",
      Self::DynamicModule => "dynamicmodule",
      Self::Install => "install",
      Self::Custom => "custom",
    }
  }
}

impl fmt::Display for ArtifactType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for ArtifactType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "sharedlib" => Ok(Self::SharedLib),
      "staticlib" => Ok(Self::StaticLib),
      "program" => Ok(Self::Program),
      "testprograms" => Ok(Self::TestPrograms),
      "dynamicmodule" => Ok(Self::DynamicModule),
      "install" => Ok(Self::Install),
      "custom" => Ok(Self::Custom),
      other => Err(format!("unknown target type '{other}'")),
    }
  }
}

/// Shared-library options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SharedOptions {
  /// `major[.minor[.patch]]`; adds compatibility symlinks.
  pub version: Option<String>,
  /// Exported-symbol map file.
  pub symbols: Option<PathBuf>,
  /// Mach-O install name override.
  pub install_name: Option<String>,
}

/// Program options, also used by `testprograms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgramOptions {
  /// `false` links for the windowed subsystem.
  pub console: bool,
  pub stack_size: Option<u64>,
}

impl Default for ProgramOptions {
  fn default() -> Self {
    Self {
      console: true,
      stack_size: None,
    }
  }
}

/// Loadable-module options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleOptions {
  /// File extension without the dot (`ofx`, `bundle`).
  pub ext: Option<String>,
  /// Prefix of the file name, empty by default.
  pub file_prefix: Option<String>,
  pub symbols: Option<PathBuf>,
  pub version: Option<String>,
}

/// Sub-project built by an external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalSpec {
  /// `cmake` or `autotools`.
  pub tool: String,
  pub source_dir: PathBuf,
  #[serde(default)]
  pub options: ConfigOptions,
  /// Build target, `install` when absent.
  #[serde(default)]
  pub target: Option<String>,
}

/// Raw, loosely typed target description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDescriptor {
  pub name: Option<String>,
  #[serde(rename = "type")]
  pub target_type: Option<String>,
  pub alias: Option<String>,
  pub sources: Option<Vec<PathBuf>>,
  pub deps: Vec<String>,
  pub libs: Vec<String>,
  pub staticlibs: Vec<String>,
  pub prefix: Option<PathBuf>,
  pub defines: Vec<String>,
  pub incdirs: Vec<PathBuf>,
  pub libdirs: Vec<PathBuf>,
  pub cflags: Vec<String>,
  pub linkflags: Vec<String>,
  /// Install destination (relative to the target's install root) to sources.
  pub install: BTreeMap<String, Vec<PathBuf>>,
  /// Commands run after the target's outputs are built.
  pub post: Vec<String>,
  pub shared: Option<SharedOptions>,
  pub program: Option<ProgramOptions>,
  pub module: Option<ModuleOptions>,
  pub external: Option<ExternalSpec>,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
  /// Set when the entry did not match this shape; only `name` is kept.
  #[serde(skip)]
  pub malformed: Option<String>,
}

/// Parse a JSON array of descriptors entry by entry.
///
/// A malformed entry does not reject its neighbours: it comes back carrying
/// its name and the decode error, and fails validation on its own.
pub fn parse_descriptors(json: &str) -> Result<Vec<TargetDescriptor>, serde_json::Error> {
  let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
  Ok(values.into_iter().map(descriptor_from_value).collect())
}

fn descriptor_from_value(value: serde_json::Value) -> TargetDescriptor {
  let name = value.get("name").and_then(|n| n.as_str()).map(str::to_string);
  serde_json::from_value(value).unwrap_or_else(|e| TargetDescriptor {
    name,
    malformed: Some(e.to_string()),
    ..Default::default()
  })
}

/// Compile and link settings of one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSettings {
  pub defines: Vec<String>,
  pub include_dirs: Vec<PathBuf>,
  pub lib_dirs: Vec<PathBuf>,
  pub cflags: Vec<String>,
  pub link_flags: Vec<String>,
}

/// Type-specific part of a validated target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
  SharedLib(SharedOptions),
  StaticLib,
  Program(ProgramOptions),
  TestPrograms(ProgramOptions),
  DynamicModule(ModuleOptions),
  Install,
  /// A target without compile steps: an external sub-build, post commands
  /// or both.
  Custom(Option<ExternalSpec>),
}

impl TargetKind {
  pub fn artifact_type(&self) -> ArtifactType {
    match self {
      Self::SharedLib(_) => ArtifactType::SharedLib,
      Self::StaticLib => ArtifactType::StaticLib,
      Self::Program(_) => ArtifactType::Program,
      Self::TestPrograms(_) => ArtifactType::TestPrograms,
      Self::DynamicModule(_) => ArtifactType::DynamicModule,
      Self::Install => ArtifactType::Install,
      Self::Custom(_) => ArtifactType::Custom,
    }
  }
}

/// Why a descriptor was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
  MissingField(&'static str),
  InvalidType(String),
  InvalidName(String),
  Malformed(String),
}

impl fmt::Display for DescriptorError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::MissingField(field) => write!(f, "missing required field '{field}'"),
      Self::InvalidType(message) => write!(f, "{message}"),
      Self::InvalidName(name) => write!(f, "invalid target name '{name}'"),
      Self::Malformed(reason) => write!(f, "malformed descriptor: {reason}"),
    }
  }
}

/// A validated target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
  /// Leaf name, without any `/`-separated prefix.
  pub name: String,
  /// Explicit prefix merged with the prefix carried by the name.
  pub prefix: Option<PathBuf>,
  pub alias: Option<String>,
  pub kind: TargetKind,
  pub sources: Vec<PathBuf>,
  pub deps: Vec<String>,
  pub libs: Vec<String>,
  pub staticlibs: Vec<String>,
  pub settings: BuildSettings,
  pub install: BTreeMap<String, Vec<PathBuf>>,
  pub post: Vec<String>,
  pub extra: BTreeMap<String, String>,
}

impl TargetSpec {
  pub fn artifact_type(&self) -> ArtifactType {
    self.kind.artifact_type()
  }
}

/// Split `a/b/name` into `("name", Some("a/b"))`.
pub fn split_name(name: &str) -> Result<(String, Option<PathBuf>), DescriptorError> {
  let trimmed = name.trim_matches('/');
  let (prefix, leaf) = match trimmed.rsplit_once('/') {
    Some((prefix, leaf)) => (Some(PathBuf::from(prefix)), leaf),
    None => (None, trimmed),
  };
  if leaf.is_empty() || leaf == "." || leaf == ".." {
    return Err(DescriptorError::InvalidName(name.to_string()));
  }
  Ok((leaf.to_string(), prefix))
}

fn merge_prefix(explicit: Option<&Path>, from_name: Option<PathBuf>) -> Option<PathBuf> {
  match (explicit, from_name) {
    (Some(explicit), Some(from_name)) => Some(explicit.join(from_name)),
    (Some(explicit), None) => Some(explicit.to_path_buf()),
    (None, from_name) => from_name,
  }
}

fn extra_to_string(value: &serde_json::Value) -> String {
  match value {
    serde_json::Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

impl TargetDescriptor {
  /// Check required fields and build the typed form.
  pub fn validate(&self) -> Result<TargetSpec, DescriptorError> {
    if let Some(reason) = &self.malformed {
      return Err(DescriptorError::Malformed(reason.clone()));
    }
    let raw_name = self.name.as_deref().ok_or(DescriptorError::MissingField("name"))?;
    let raw_type = self.target_type.as_deref().ok_or(DescriptorError::MissingField("type"))?;
    let artifact: ArtifactType = raw_type.parse().map_err(DescriptorError::InvalidType)?;
    let (name, name_prefix) = split_name(raw_name)?;

    let kind = match artifact {
      ArtifactType::SharedLib => TargetKind::SharedLib(self.shared.clone().unwrap_or_default()),
      ArtifactType::StaticLib => TargetKind::StaticLib,
      ArtifactType::Program => TargetKind::Program(self.program.clone().unwrap_or_default()),
      ArtifactType::TestPrograms => TargetKind::TestPrograms(self.program.clone().unwrap_or_default()),
      ArtifactType::DynamicModule => TargetKind::DynamicModule(self.module.clone().unwrap_or_default()),
      ArtifactType::Install => TargetKind::Install,
      ArtifactType::Custom => TargetKind::Custom(self.external.clone()),
    };

    let sources = match (&kind, &self.sources) {
      (_, Some(sources)) => sources.clone(),
      (TargetKind::Install | TargetKind::Custom(_), None) => Vec::new(),
      (_, None) => return Err(DescriptorError::MissingField("sources")),
    };
    if matches!(kind, TargetKind::Custom(None)) && self.post.is_empty() {
      return Err(DescriptorError::MissingField("external"));
    }

    Ok(TargetSpec {
      name,
      prefix: merge_prefix(self.prefix.as_deref(), name_prefix),
      alias: self.alias.clone().filter(|a| !a.is_empty()),
      kind,
      sources,
      deps: self.deps.clone(),
      libs: self.libs.clone(),
      staticlibs: self.staticlibs.clone(),
      settings: BuildSettings {
        defines: self.defines.clone(),
        include_dirs: self.incdirs.clone(),
        lib_dirs: self.libdirs.clone(),
        cflags: self.cflags.clone(),
        link_flags: self.linkflags.clone(),
      },
      install: self.install.clone(),
      post: self.post.clone(),
      extra: self.extra.iter().map(|(k, v)| (k.clone(), extra_to_string(v))).collect(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(json: &str) -> TargetDescriptor {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn sharedlib_descriptor_validates() {
    let spec = parse(r#"{"name": "core", "type": "sharedlib", "sources": ["a.c"], "shared": {"version": "1.2"}}"#)
      .validate()
      .unwrap();
    assert_eq!(spec.name, "core");
    assert_eq!(spec.artifact_type(), ArtifactType::SharedLib);
    assert_eq!(
      spec.kind,
      TargetKind::SharedLib(SharedOptions {
        version: Some("1.2".to_string()),
        ..Default::default()
      })
    );
  }

  #[test]
  fn missing_fields_are_reported() {
    assert_eq!(
      parse(r#"{"type": "program", "sources": []}"#).validate(),
      Err(DescriptorError::MissingField("name"))
    );
    assert_eq!(
      parse(r#"{"name": "x", "sources": []}"#).validate(),
      Err(DescriptorError::MissingField("type"))
    );
    assert_eq!(
      parse(r#"{"name": "x", "type": "program"}"#).validate(),
      Err(DescriptorError::MissingField("sources"))
    );
  }

  #[test]
  fn install_and_external_targets_need_no_sources() {
    assert!(parse(r#"{"name": "headers", "type": "install"}"#).validate().is_ok());
    let spec = parse(r#"{"name": "zlib", "type": "custom", "external": {"tool": "cmake", "source_dir": "deps/zlib"}}"#)
      .validate()
      .unwrap();
    assert!(matches!(spec.kind, TargetKind::Custom(Some(_))));
    assert_eq!(
      parse(r#"{"name": "nothing", "type": "custom"}"#).validate(),
      Err(DescriptorError::MissingField("external"))
    );
  }

  #[test]
  fn unknown_type_is_rejected() {
    assert!(matches!(
      parse(r#"{"name": "x", "type": "framework", "sources": []}"#).validate(),
      Err(DescriptorError::InvalidType(_))
    ));
  }

  #[test]
  fn slash_in_name_becomes_prefix() {
    let spec = parse(r#"{"name": "plugins/fx/blur", "type": "staticlib", "sources": []}"#)
      .validate()
      .unwrap();
    assert_eq!(spec.name, "blur");
    assert_eq!(spec.prefix, Some(PathBuf::from("plugins/fx")));

    let spec = parse(r#"{"name": "fx/blur", "type": "staticlib", "sources": [], "prefix": "opt"}"#)
      .validate()
      .unwrap();
    assert_eq!(spec.prefix, Some(PathBuf::from("opt/fx")));
  }

  #[test]
  fn invalid_names_are_rejected() {
    assert_eq!(split_name("a/").unwrap(), ("a".to_string(), None));
    assert!(split_name("a/..").is_err());
    assert!(split_name("").is_err());
  }

  #[test]
  fn unknown_keys_are_kept_as_extra() {
    let spec = parse(r#"{"name": "x", "type": "staticlib", "sources": [], "openexr-half": true, "note": "hi"}"#)
      .validate()
      .unwrap();
    assert_eq!(spec.extra.get("openexr-half").map(String::as_str), Some("true"));
    assert_eq!(spec.extra.get("note").map(String::as_str), Some("hi"));
  }

  #[test]
  fn mistyped_entry_does_not_reject_its_neighbours() {
    let parsed = parse_descriptors(
      r#"[
        {"name": "bad", "type": "program", "sources": "main.c"},
        {"name": "typo", "type": "sharedlib", "sources": ["t.c"], "shared": {"verison": "1"}},
        {"type": "staticlib", "sources": 3},
        {"name": "good", "type": "program", "sources": ["main.c"]}
      ]"#,
    )
    .unwrap();
    assert_eq!(parsed.len(), 4);

    assert_eq!(parsed[0].name.as_deref(), Some("bad"));
    match parsed[0].validate() {
      Err(DescriptorError::Malformed(reason)) => assert!(reason.contains("sequence"), "{reason}"),
      other => panic!("unexpected result {other:?}"),
    }
    let typo = parsed[1].validate().unwrap_err().to_string();
    assert!(typo.contains("verison"), "{typo}");
    assert_eq!(parsed[2].name, None);
    assert!(parsed[2].validate().is_err());
    assert_eq!(parsed[3].validate().unwrap().name, "good");
  }

  #[test]
  fn descriptor_list_must_be_an_array() {
    assert!(parse_descriptors(r#"{"name": "x"}"#).is_err());
    assert!(parse_descriptors("[").is_err());
  }
}
