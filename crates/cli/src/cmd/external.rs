//! Implementation of the `cairn external` commands.
//!
//! Each command drives the sub-project of one `custom` target of the
//! descriptor file through its configure, build or clean step.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use serde_json::json;

use cairn_lib::external::ExternalBuildDriver;
use cairn_lib::target::{ExternalSpec, TargetKind};

use super::{finish, load_descriptors, open_context, parse_settings};
use crate::output::{OutputFormat, PathMark, print_info, print_json, print_path, print_stat, print_success};

#[derive(Args)]
pub struct ProjectArgs {
  /// Name or alias of a `custom` target with an `external` section
  target: String,

  /// JSON file holding an array of target descriptors
  #[arg(short, long, default_value = "cairn.json")]
  file: PathBuf,

  /// Build settings (`key=value`)
  settings: Vec<String>,
}

#[derive(Subcommand)]
pub enum ExternalAction {
  /// Run the configure step if the recorded options are out of date
  Configure(ProjectArgs),

  /// Configure if needed, then build and install
  Build(ProjectArgs),

  /// Remove installed files, the working directory and the records
  Clean(ProjectArgs),

  /// Show whether the sub-project is configured or built
  Status(ProjectArgs),
}

/// Find the external section of `target` in the descriptor file.
fn find_project(project: &ProjectArgs) -> Result<(String, ExternalSpec)> {
  let descriptors = load_descriptors(&project.file)?;
  for descriptor in &descriptors {
    let Ok(spec) = descriptor.validate() else {
      continue;
    };
    if spec.name != project.target && spec.alias.as_deref() != Some(project.target.as_str()) {
      continue;
    }
    return match spec.kind {
      TargetKind::Custom(Some(external)) => Ok((spec.name, external)),
      _ => bail!("'{}' is not an external target", project.target),
    };
  }
  bail!("No target named '{}' in {}", project.target, project.file.display())
}

pub fn cmd_external(output: &Path, action: ExternalAction, format: OutputFormat) -> Result<()> {
  let project = match &action {
    ExternalAction::Configure(p) | ExternalAction::Build(p) | ExternalAction::Clean(p) | ExternalAction::Status(p) => p,
  };
  let (name, spec) = find_project(project)?;
  let mut ctx = open_context(output, parse_settings(&project.settings)?)?;
  let mut driver =
    ExternalBuildDriver::for_tool(&mut ctx, &spec.tool).with_context(|| format!("Unknown external tool '{}'", spec.tool))?;

  match action {
    ExternalAction::Configure(_) => {
      let ran = driver
        .configure(&mut ctx, &name, &spec.source_dir, &spec.options)
        .with_context(|| format!("Failed to configure {name}"))?;
      if format.is_json() {
        print_json(&json!({ "project": name, "configured": ran }))?;
      } else if ran {
        print_success(&format!("Configured {name}"));
      } else {
        print_info(&format!("{name} is already configured with these options"));
      }
    }
    ExternalAction::Build(_) => {
      let started = Instant::now();
      let manifest = driver
        .configure_and_build(&mut ctx, &name, &spec.source_dir, &spec.options, spec.target.as_deref())
        .with_context(|| format!("Failed to build {name}"))?;
      let elapsed = Duration::from_secs(started.elapsed().as_secs());
      let files = manifest.paths(ctx.output_root());
      if format.is_json() {
        print_json(&json!({ "project": name, "installed": files }))?;
      } else {
        print_success(&format!(
          "Installed {} file(s) from {name} in {}",
          files.len(),
          humantime::format_duration(elapsed)
        ));
        for file in &files {
          print_path(PathMark::Installed, file);
        }
      }
    }
    ExternalAction::Clean(_) => {
      let removed = driver
        .clean(&mut ctx, &name)
        .with_context(|| format!("Failed to clean {name}"))?;
      if format.is_json() {
        print_json(&json!({ "project": name, "removed": removed }))?;
      } else {
        print_success(&format!("Removed {} installed file(s) of {name}", removed.len()));
      }
    }
    ExternalAction::Status(_) => {
      let state = driver.state(&mut ctx, &name);
      let outputs = driver.outputs(&mut ctx, &name)?.unwrap_or_default();
      let work_dir = driver.paths(&mut ctx, &name).work_dir;
      if format.is_json() {
        print_json(&json!({
          "project": name,
          "tool": spec.tool,
          "state": state.to_string(),
          "work_dir": work_dir,
          "installed": outputs,
        }))?;
      } else {
        print_info(&format!("{name} ({})", spec.tool));
        print_stat("State", &state.to_string());
        print_stat("Work dir", &work_dir.display().to_string());
        print_stat("Installed", &format!("{} file(s)", outputs.len()));
      }
    }
  }

  finish(&mut ctx)
}
