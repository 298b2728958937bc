//! Target graph construction.
//!
//! [`TargetGraph::declare`] turns descriptors into graph nodes, one target at
//! a time in list order:
//!
//! 1. validate the descriptor; a malformed one is reported and skipped
//! 2. split a `/`-bearing name into leaf name and prefix
//! 3. clone the base environment for the target
//! 4. resolve `staticlibs` against declared targets, then the lib dirs; a
//!    missing one abandons the target
//! 5. compute the output directory from mode, arch, type and prefix
//! 6. emit the artifact nodes of the target's type
//! 7. wire `deps`, `libs` and `staticlibs` edges; an unknown `deps` entry
//!    becomes a plain file dependency
//! 8. emit install copies and post-build commands
//! 9. rebuild the progress tracker
//! 10. register the target and its alias, merging with earlier declarations
//!
//! Outputs of external sub-builds are registered as ordinary file nodes, so
//! other targets depend on them the same way they depend on compiled ones.

pub mod clean;
pub mod env;
pub mod naming;
pub mod output;
pub mod progress;
pub mod types;
pub mod visibility;

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::context::BuildContext;
use crate::external::{ExternalBuildDriver, ExternalError};
use crate::graph::{Action, ActionGraph, GraphError, LinkDetails, LinkKind, NodeId, Visibility};
use crate::locate::{LibraryRequest, find_static_library, require_external_library};
use crate::util::fs::normalize_lexically;

pub use clean::CleanPlan;
pub use env::{BuildEnv, WarningLevel};
pub use progress::{ProgressReport, ProgressTracker};
pub use types::{ArtifactType, ExternalSpec, TargetDescriptor, TargetKind, TargetSpec, parse_descriptors};

use naming::{LibVersion, Naming};
use output::{import_lib_dir, output_dir, runtime_search_path};
use visibility::resolve_visibility;

/// Errors that abort a declare call.
#[derive(Debug, Error)]
pub enum TargetError {
  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  External(#[from] ExternalError),

  #[error("io error: {0}")]
  Io(#[from] io::Error),

  #[error("unknown external tool '{0}'")]
  UnknownTool(String),
}

/// A target that was skipped; its siblings were still declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
  pub name: String,
  pub reason: String,
}

#[derive(Debug, Default)]
pub struct DeclareOutcome {
  /// Output nodes per declared target, merged with earlier declarations.
  pub outputs: BTreeMap<String, Vec<NodeId>>,
  pub failures: Vec<TargetFailure>,
}

/// Everything the graph remembers about a declared target.
#[derive(Debug, Clone)]
pub struct TargetRecord {
  pub artifact: ArtifactType,
  pub alias: Option<String>,
  /// Files the target produces.
  pub outputs: Vec<PathBuf>,
  /// File consumers link against (archive, import library or shared object).
  pub link_file: Option<PathBuf>,
  /// Nodes dependents wait on: outputs plus post-build commands.
  pub nodes: Vec<NodeId>,
  /// `(tool, project)` of an external sub-build.
  pub external: Option<(String, String)>,
}

/// Result of [`TargetGraph::clean`].
#[derive(Debug, Default)]
pub struct CleanReport {
  pub removed: Vec<PathBuf>,
  pub preserved: usize,
  pub unknown: Vec<String>,
}

/// Per-target failure or call-wide error inside one declaration.
enum StepError {
  Skip(String),
  Fatal(TargetError),
}

impl From<TargetError> for StepError {
  fn from(e: TargetError) -> Self {
    StepError::Fatal(e)
  }
}

impl From<io::Error> for StepError {
  fn from(e: io::Error) -> Self {
    StepError::Fatal(TargetError::Io(e))
  }
}

/// Dependencies gathered before the artifact nodes exist.
#[derive(Default)]
struct LinkInputs {
  files: Vec<PathBuf>,
  nodes: Vec<NodeId>,
}

impl LinkInputs {
  fn add(&mut self, file: PathBuf, node: NodeId) {
    if !self.files.contains(&file) {
      self.files.push(file);
    }
    if !self.nodes.contains(&node) {
      self.nodes.push(node);
    }
  }
}

/// Declared targets and the graph they were turned into.
#[derive(Debug)]
pub struct TargetGraph {
  graph: ActionGraph,
  targets: BTreeMap<String, TargetRecord>,
  aliases: BTreeMap<String, String>,
  progress: ProgressTracker,
  drivers: BTreeMap<String, ExternalBuildDriver>,
  build_externals: bool,
}

impl Default for TargetGraph {
  fn default() -> Self {
    Self::new()
  }
}

/// Object file of `source` under `obj_dir`. Parent components are kept as
/// `__` so `../x.c` and `x.c` get distinct objects.
fn object_path(obj_dir: &Path, source: &Path, naming: Naming) -> PathBuf {
  let mut rel = PathBuf::new();
  for component in source.components() {
    match component {
      Component::Normal(part) => rel.push(part),
      Component::ParentDir => rel.push("__"),
      Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
    }
  }
  let stem = rel
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default();
  rel.set_file_name(naming.object_file(&stem));
  obj_dir.join(rel)
}

/// Reject a target whose distinct inputs would produce the same file.
fn ensure_distinct<'a>(pairs: impl IntoIterator<Item = (&'a Path, PathBuf)>) -> Result<(), StepError> {
  let mut seen: BTreeMap<PathBuf, &Path> = BTreeMap::new();
  for (input, output) in pairs {
    match seen.insert(output.clone(), input) {
      Some(previous) if previous != input => {
        return Err(StepError::Skip(format!(
          "sources '{}' and '{}' would both produce '{}'",
          previous.display(),
          input.display(),
          output.display()
        )));
      }
      _ => {}
    }
  }
  Ok(())
}

fn source_stem(source: &Path) -> String {
  source
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default()
}

impl TargetGraph {
  pub fn new() -> Self {
    Self {
      graph: ActionGraph::new(),
      targets: BTreeMap::new(),
      aliases: BTreeMap::new(),
      progress: ProgressTracker::new(),
      drivers: BTreeMap::new(),
      build_externals: true,
    }
  }

  /// A graph that records external sub-builds from their existing manifests
  /// instead of running them. Used to plan a clean.
  pub fn planning() -> Self {
    Self {
      build_externals: false,
      ..Self::new()
    }
  }

  /// Use `driver` for sub-projects of its tool.
  pub fn register_driver(&mut self, driver: ExternalBuildDriver) {
    self.drivers.insert(driver.tool().name().to_string(), driver);
  }

  pub fn graph(&self) -> &ActionGraph {
    &self.graph
  }

  pub fn progress(&self) -> &ProgressTracker {
    &self.progress
  }

  pub fn progress_mut(&mut self) -> &mut ProgressTracker {
    &mut self.progress
  }

  pub fn targets(&self) -> &BTreeMap<String, TargetRecord> {
    &self.targets
  }

  /// Target by name or alias.
  pub fn target(&self, name: &str) -> Option<&TargetRecord> {
    self
      .targets
      .get(name)
      .or_else(|| self.aliases.get(name).and_then(|target| self.targets.get(target)))
  }

  fn driver_entry<'a>(
    drivers: &'a mut BTreeMap<String, ExternalBuildDriver>,
    ctx: &mut BuildContext,
    tool: &str,
  ) -> Result<&'a mut ExternalBuildDriver, TargetError> {
    if !drivers.contains_key(tool) {
      let driver = ExternalBuildDriver::for_tool(ctx, tool).ok_or_else(|| TargetError::UnknownTool(tool.to_string()))?;
      drivers.insert(tool.to_string(), driver);
    }
    drivers
      .get_mut(tool)
      .ok_or_else(|| TargetError::UnknownTool(tool.to_string()))
  }

  /// Declare `descriptors` on top of `base_env`.
  ///
  /// Malformed descriptors and missing static libraries skip only the
  /// affected target. External tool failures abort the call.
  pub fn declare(
    &mut self,
    ctx: &mut BuildContext,
    base_env: &BuildEnv,
    descriptors: &[TargetDescriptor],
  ) -> Result<DeclareOutcome, TargetError> {
    let mut outcome = DeclareOutcome::default();
    let warnings = ctx
      .args
      .get_with("warnings", WarningLevel::Standard, |v| v.parse::<WarningLevel>());
    let warnings_as_errors = ctx.args.get_bool("warnings-as-errors", false);

    for (index, descriptor) in descriptors.iter().enumerate() {
      let spec = match descriptor.validate() {
        Ok(spec) => spec,
        Err(e) => {
          let name = descriptor.name.clone().unwrap_or_else(|| format!("#{index}"));
          ctx.warn_once(format!("{name}: {e}, skipping target"));
          outcome.failures.push(TargetFailure {
            name,
            reason: e.to_string(),
          });
          continue;
        }
      };

      let mut env = base_env.clone();
      env.warnings = warnings;
      env.warnings_as_errors = warnings_as_errors;
      env.apply(&spec.settings);

      match self.declare_target(ctx, env, &spec) {
        Ok(()) => {
          let nodes = self.targets.get(&spec.name).map(|r| r.nodes.clone()).unwrap_or_default();
          outcome.outputs.insert(spec.name.clone(), nodes);
        }
        Err(StepError::Skip(reason)) => {
          ctx.warn_once(format!("{}: {reason}, skipping target", spec.name));
          outcome.failures.push(TargetFailure {
            name: spec.name.clone(),
            reason,
          });
        }
        Err(StepError::Fatal(e)) => return Err(e),
      }
    }

    self.graph.verify_acyclic()?;
    self.rebuild_progress();
    info!(
      targets = outcome.outputs.len(),
      failures = outcome.failures.len(),
      nodes = self.graph.node_count(),
      "declared targets"
    );
    Ok(outcome)
  }

  /// Declare `descriptors` with argument overrides in place, restoring the
  /// arguments afterwards. Keys matching `retain` survive the scope.
  pub fn declare_nested(
    &mut self,
    ctx: &mut BuildContext,
    base_env: &BuildEnv,
    descriptors: &[TargetDescriptor],
    overrides: &[(&str, &str)],
    retain: &[&str],
  ) -> Result<DeclareOutcome, TargetError> {
    ctx.with_overrides(overrides, retain, |ctx| self.declare(ctx, base_env, descriptors))
  }

  /// Configure and build an external sub-project and register the files it
  /// installed as outputs of target `name`.
  pub fn declare_external(&mut self, ctx: &mut BuildContext, name: &str, spec: &ExternalSpec) -> Result<Vec<NodeId>, TargetError> {
    let record = self.external_record(ctx, name, spec)?;
    self.register(name, record);
    self.rebuild_progress();
    Ok(self.targets.get(name).map(|r| r.nodes.clone()).unwrap_or_default())
  }

  fn external_record(&mut self, ctx: &mut BuildContext, name: &str, spec: &ExternalSpec) -> Result<TargetRecord, TargetError> {
    let driver = Self::driver_entry(&mut self.drivers, ctx, &spec.tool)?;
    let outputs = if self.build_externals {
      let manifest = driver.configure_and_build(ctx, name, &spec.source_dir, &spec.options, spec.target.as_deref())?;
      manifest.paths(ctx.output_root())
    } else {
      driver.outputs(ctx, name)?.unwrap_or_default()
    };
    let tool = driver.tool().name().to_string();

    let nodes = outputs
      .iter()
      .map(|path| {
        self.graph.produce(
          path,
          Action::External {
            tool: tool.clone(),
            project: name.to_string(),
          },
        )
      })
      .collect();

    Ok(TargetRecord {
      artifact: ArtifactType::Custom,
      alias: None,
      outputs,
      link_file: None,
      nodes,
      external: Some((tool, name.to_string())),
    })
  }

  /// Merge `record` into the registry under `name`.
  fn register(&mut self, name: &str, record: TargetRecord) {
    if let Some(alias) = &record.alias {
      let alias_node = self.graph.alias(alias);
      for node in &record.nodes {
        self.graph.depend(alias_node, *node);
      }
      self.aliases.insert(alias.clone(), name.to_string());
    }

    match self.targets.get_mut(name) {
      Some(existing) => {
        if existing.artifact != record.artifact {
          debug!(target = %name, was = %existing.artifact, now = %record.artifact, "merging targets of different types");
        }
        for output in record.outputs {
          if !existing.outputs.contains(&output) {
            existing.outputs.push(output);
          }
        }
        for node in record.nodes {
          if !existing.nodes.contains(&node) {
            existing.nodes.push(node);
          }
        }
        if record.link_file.is_some() {
          existing.link_file = record.link_file;
        }
        if record.alias.is_some() {
          existing.alias = record.alias;
        }
        if record.external.is_some() {
          existing.external = record.external;
        }
      }
      None => {
        self.targets.insert(name.to_string(), record);
      }
    }
  }

  fn rebuild_progress(&mut self) {
    let mut progress = ProgressTracker::new();
    for (name, record) in &self.targets {
      progress.register(name, record.outputs.iter().cloned());
    }
    self.progress = progress;
  }

  /// Resolve `staticlibs`: declared targets first, then the lib dirs.
  fn resolve_static_libs(&mut self, env: &BuildEnv, spec: &TargetSpec, naming: Naming, inputs: &mut LinkInputs) -> Result<(), StepError> {
    for lib in &spec.staticlibs {
      if let Some(record) = self.target(lib) {
        let Some(file) = record.link_file.clone() else {
          return Err(StepError::Skip(format!("static dependency '{lib}' produces nothing to link")));
        };
        let node = self.graph.file(&file);
        inputs.add(file, node);
        continue;
      }
      match find_static_library(naming, &env.lib_dirs, lib) {
        Some(file) => {
          let node = self.graph.file(&file);
          inputs.add(file, node);
        }
        None => {
          return Err(StepError::Skip(format!(
            "static library '{}' not found and not a declared target",
            naming.static_lib(lib)
          )));
        }
      }
    }
    Ok(())
  }

  /// Resolve `libs`: declared targets link their file, located external
  /// libraries add their directories, anything else is a system library.
  fn resolve_libs(&mut self, ctx: &mut BuildContext, env: &mut BuildEnv, spec: &TargetSpec, inputs: &mut LinkInputs) {
    for lib in &spec.libs {
      if let Some(record) = self.target(lib) {
        if let Some(file) = record.link_file.clone() {
          let node = self.graph.file(&file);
          inputs.add(file, node);
        }
        continue;
      }

      let configured = [format!("with-{lib}"), format!("with-{lib}-inc"), format!("with-{lib}-lib")]
        .iter()
        .any(|flag| ctx.args.resolve(flag).is_some());
      if !configured {
        env.add_lib(lib.clone());
        continue;
      }

      match require_external_library(ctx, lib, &LibraryRequest::default()) {
        Ok(found) => {
          if let Some(dir) = found.include_dir {
            env.add_include_dir(dir);
          }
          if let Some(dir) = found.lib_dir {
            env.add_lib_dir(dir);
          }
          match found.library_path {
            Some(path) => {
              let node = self.graph.file(&path);
              inputs.add(path, node);
            }
            None => env.add_lib(found.library_name.unwrap_or_else(|| lib.clone())),
          }
        }
        Err(e) => {
          ctx.warn_once(format!("{}: {e}", spec.name));
          env.add_lib(lib.clone());
        }
      }
    }
  }

  /// Resolve `deps` into nodes to wait on; library targets are also linked.
  fn resolve_deps(&mut self, ctx: &mut BuildContext, spec: &TargetSpec, inputs: &mut LinkInputs) -> Vec<NodeId> {
    let mut waits = Vec::new();
    for dep in &spec.deps {
      match self.target(dep) {
        Some(record) => {
          let link = record
            .link_file
            .clone()
            .filter(|_| matches!(record.artifact, ArtifactType::StaticLib | ArtifactType::SharedLib));
          waits.extend(record.nodes.iter().copied());
          if let Some(file) = link {
            let node = self.graph.file(&file);
            inputs.add(file, node);
          }
        }
        None => {
          ctx.warn_once(format!(
            "{}: dependency '{dep}' is not a declared target, depending on the file",
            spec.name
          ));
          waits.push(self.graph.file(dep));
        }
      }
    }
    waits
  }

  fn compile(
    &mut self,
    env: &BuildEnv,
    spec: &TargetSpec,
    obj_dir: &Path,
    naming: Naming,
    visibility: Visibility,
  ) -> Result<Vec<(PathBuf, NodeId)>, StepError> {
    ensure_distinct(spec.sources.iter().map(|s| (s.as_path(), object_path(obj_dir, s, naming))))?;
    let flags = env.tool_flags();
    let objects = spec
      .sources
      .iter()
      .map(|source| {
        let object = object_path(obj_dir, source, naming);
        let source_node = self.graph.file(source);
        let node = self.graph.produce(
          &object,
          Action::Compile {
            source: source.clone(),
            flags: flags.clone(),
            visibility,
          },
        );
        self.graph.depend(node, source_node);
        (object, node)
      })
      .collect();
    Ok(objects)
  }

  fn link(
    &mut self,
    path: PathBuf,
    kind: LinkKind,
    objects: &[(PathBuf, NodeId)],
    inputs: &LinkInputs,
    env: &BuildEnv,
    details: LinkDetails,
  ) -> NodeId {
    let mut files: Vec<PathBuf> = objects.iter().map(|(p, _)| p.clone()).collect();
    files.extend(inputs.files.iter().cloned());
    let symbol_map = details.symbol_map.clone();
    let node = self.graph.produce(
      path,
      Action::Link {
        kind,
        objects: files,
        flags: env.tool_flags(),
        details,
      },
    );
    for (_, object) in objects {
      self.graph.depend(node, *object);
    }
    for input in &inputs.nodes {
      self.graph.depend(node, *input);
    }
    if let Some(map) = symbol_map {
      let map_node = self.graph.file(map);
      self.graph.depend(node, map_node);
    }
    node
  }

  fn parse_version(ctx: &mut BuildContext, name: &str, version: Option<&str>) -> Option<LibVersion> {
    let version = version?;
    let parsed = LibVersion::parse(version);
    if parsed.is_none() {
      ctx.warn_once(format!("{name}: ignoring malformed version '{version}'"));
    }
    parsed
  }

  /// Copies of `spec.install` under `install_root`, recursing into directories.
  fn install_copies(&mut self, spec: &TargetSpec, install_root: &Path) -> Result<Vec<(PathBuf, NodeId)>, StepError> {
    let mut copies = Vec::new();
    for (dest, sources) in &spec.install {
      let dest_dir = normalize_lexically(&install_root.join(dest));
      for source in sources {
        let Some(file_name) = source.file_name() else {
          return Err(StepError::Skip(format!("install source '{}' has no file name", source.display())));
        };
        if source.is_dir() {
          for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(|e| StepError::Fatal(TargetError::Io(io::Error::other(e))))?;
            if entry.file_type().is_dir() {
              continue;
            }
            let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
            let target = dest_dir.join(file_name).join(rel);
            copies.push(self.copy(entry.path(), target));
          }
        } else {
          let target = dest_dir.join(file_name);
          copies.push(self.copy(source, target));
        }
      }
    }
    Ok(copies)
  }

  fn copy(&mut self, source: &Path, target: PathBuf) -> (PathBuf, NodeId) {
    let source_node = self.graph.file(source);
    let node = self.graph.produce(
      &target,
      Action::Copy {
        source: source.to_path_buf(),
      },
    );
    self.graph.depend(node, source_node);
    (target, node)
  }

  fn declare_target(&mut self, ctx: &mut BuildContext, mut env: BuildEnv, spec: &TargetSpec) -> Result<(), StepError> {
    let artifact = spec.artifact_type();
    let os = ctx.platform().os;
    let naming = Naming::for_os(os);
    let out_base = ctx.out_base();
    let prefix = spec.prefix.as_deref();

    let mut inputs = LinkInputs::default();
    self.resolve_static_libs(&env, spec, naming, &mut inputs)?;
    self.resolve_libs(ctx, &mut env, spec, &mut inputs);
    let waits = self.resolve_deps(ctx, spec, &mut inputs);

    let out_dir = output_dir(&out_base, os, artifact, prefix);
    let obj_dir = normalize_lexically(&ctx.objects_base().join(prefix.unwrap_or(Path::new(""))).join(&spec.name));
    let visibility = resolve_visibility(&mut ctx.args, &spec.name, spec.alias.as_deref(), artifact);
    debug!(target = %spec.name, %artifact, out_dir = ?out_dir, %visibility, "declaring target");

    let mut outputs: Vec<(PathBuf, NodeId)> = Vec::new();
    let mut link_file = None;
    let mut external = None;

    match &spec.kind {
      TargetKind::SharedLib(opts) => {
        let objects = self.compile(&env, spec, &obj_dir, naming, visibility)?;
        let version = Self::parse_version(ctx, &spec.name, opts.version.as_deref());
        let names = naming.shared_lib(&spec.name, version.as_ref());
        let binary = out_dir.join(&names.binary);
        let details = LinkDetails {
          soname: opts.install_name.clone().or(names.soname.clone()),
          symbol_map: opts.symbols.clone(),
          version: version.as_ref().map(LibVersion::full),
          ..Default::default()
        };
        let binary_node = self.link(binary.clone(), LinkKind::SharedLib, &objects, &inputs, &env, details);
        outputs.push((binary.clone(), binary_node));

        for link in &names.symlinks {
          let path = out_dir.join(link);
          let node = self.graph.produce(
            &path,
            Action::Symlink {
              points_to: names.binary.clone(),
            },
          );
          self.graph.depend(node, binary_node);
          outputs.push((path, node));
        }

        link_file = Some(match &names.import_lib {
          Some(import) => {
            let path = import_lib_dir(&out_base, prefix).join(import);
            let node = self.graph.produce(&path, Action::SideOutput { primary: binary.clone() });
            self.graph.depend(node, binary_node);
            outputs.push((path.clone(), node));
            path
          }
          None => out_dir.join(naming.link_lib(&spec.name)),
        });
      }
      TargetKind::StaticLib => {
        let objects = self.compile(&env, spec, &obj_dir, naming, visibility)?;
        let archive = out_dir.join(naming.static_lib(&spec.name));
        let node = self.graph.produce(
          &archive,
          Action::Archive {
            objects: objects.iter().map(|(p, _)| p.clone()).collect(),
          },
        );
        for (_, object) in &objects {
          self.graph.depend(node, *object);
        }
        for input in &inputs.nodes {
          self.graph.depend(node, *input);
        }
        outputs.push((archive.clone(), node));
        link_file = Some(archive);
      }
      TargetKind::Program(opts) | TargetKind::TestPrograms(opts) => {
        if artifact == ArtifactType::TestPrograms {
          ensure_distinct(
            spec
              .sources
              .iter()
              .map(|s| (s.as_path(), out_dir.join(naming.program(&source_stem(s))))),
          )?;
        }
        let objects = self.compile(&env, spec, &obj_dir, naming, visibility)?;
        let global_stack = ctx
          .args
          .get_with("stack-size", None, |v| v.trim().parse::<u64>().map(Some));
        let details = LinkDetails {
          rpath: runtime_search_path(os, &out_dir, &out_base.join("lib")),
          stack_size: opts.stack_size.or(global_stack),
          windowed: !opts.console,
          ..Default::default()
        };

        if artifact == ArtifactType::TestPrograms {
          // One program per source, all sharing the link settings.
          for (source, object) in spec.sources.iter().zip(&objects) {
            let path = out_dir.join(naming.program(&source_stem(source)));
            let node = self.link(
              path.clone(),
              LinkKind::Program,
              std::slice::from_ref(object),
              &inputs,
              &env,
              details.clone(),
            );
            outputs.push((path, node));
          }
        } else {
          let path = out_dir.join(naming.program(&spec.name));
          let node = self.link(path.clone(), LinkKind::Program, &objects, &inputs, &env, details);
          outputs.push((path, node));
        }
      }
      TargetKind::DynamicModule(opts) => {
        let objects = self.compile(&env, spec, &obj_dir, naming, visibility)?;
        let file_name = format!(
          "{}{}",
          opts.file_prefix.as_deref().unwrap_or(""),
          naming.module(&spec.name, opts.ext.as_deref())
        );
        let version = Self::parse_version(ctx, &spec.name, opts.version.as_deref());
        let details = LinkDetails {
          symbol_map: opts.symbols.clone(),
          version: version.as_ref().map(LibVersion::full),
          ..Default::default()
        };
        let path = out_dir.join(file_name);
        let node = self.link(path.clone(), LinkKind::Module, &objects, &inputs, &env, details);
        outputs.push((path, node));
      }
      TargetKind::Install => {}
      TargetKind::Custom(Some(external_spec)) => {
        let record = self.external_record(ctx, &spec.name, external_spec).map_err(StepError::Fatal)?;
        outputs.extend(record.outputs.iter().cloned().zip(record.nodes.iter().copied()));
        external = record.external;
      }
      TargetKind::Custom(None) => {}
    }

    let install_root = output_dir(&out_base, os, ArtifactType::Install, prefix);
    let copies = self.install_copies(spec, &install_root)?;
    outputs.extend(copies);

    for (_, node) in &outputs {
      for wait in &waits {
        self.graph.depend(*node, *wait);
      }
    }

    let mut nodes: Vec<NodeId> = outputs.iter().map(|(_, node)| *node).collect();
    for (index, command) in spec.post.iter().enumerate() {
      let post = self.graph.produce_alias(
        &format!("{}:post{}", spec.name, index),
        Action::Command {
          command: command.clone(),
        },
      );
      for (_, node) in &outputs {
        self.graph.depend(post, *node);
      }
      for wait in &waits {
        self.graph.depend(post, *wait);
      }
      nodes.push(post);
    }

    self.register(
      &spec.name,
      TargetRecord {
        artifact,
        alias: spec.alias.clone(),
        outputs: outputs.into_iter().map(|(path, _)| path).collect(),
        link_file,
        nodes,
        external,
      },
    );
    Ok(())
  }

  /// Files a clean of `requested` would delete and preserve.
  pub fn clean_plan(&self, requested: &[&str]) -> CleanPlan {
    clean::plan(&self.targets, &self.aliases, requested)
  }

  /// Execute the clean plan of `requested`, cleaning external sub-projects
  /// through their manifests.
  pub fn clean(&mut self, ctx: &mut BuildContext, requested: &[&str]) -> Result<CleanReport, TargetError> {
    let plan = self.clean_plan(requested);
    let mut removed = plan.execute()?;
    for external in &plan.external {
      let driver = Self::driver_entry(&mut self.drivers, ctx, &external.tool)?;
      removed.extend(driver.clean(ctx, &external.project)?);
    }
    info!(removed = removed.len(), preserved = plan.preserve.len(), "cleaned");
    Ok(CleanReport {
      removed,
      preserved: plan.preserve.len(),
      unknown: plan.unknown,
    })
  }
}
