//! Implementation of the `cairn declare` command.
//!
//! Declares every target of a descriptor file, running external sub-builds
//! along the way, and prints the outputs each target contributes.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;

use cairn_lib::target::{ArtifactType, TargetGraph};

use super::{base_env, finish, load_descriptors, open_context, parse_settings};
use crate::output::{OutputFormat, PathMark, print_error, print_info, print_json, print_path, print_stat, print_success};

#[derive(Serialize)]
struct TargetSummary<'a> {
  name: &'a str,
  #[serde(rename = "type")]
  artifact: ArtifactType,
  alias: Option<&'a str>,
  outputs: &'a [PathBuf],
}

#[derive(Serialize)]
struct FailureSummary<'a> {
  name: &'a str,
  reason: &'a str,
}

#[derive(Serialize)]
struct DeclareSummary<'a> {
  targets: Vec<TargetSummary<'a>>,
  failures: Vec<FailureSummary<'a>>,
  outputs: usize,
  nodes: usize,
  edges: usize,
  warnings: &'a [String],
}

pub fn cmd_declare(output: &Path, file: &Path, settings: &[String], format: OutputFormat) -> Result<()> {
  let flags = parse_settings(settings)?;
  let descriptors = load_descriptors(file)?;
  let mut ctx = open_context(output, flags)?;
  let env = base_env(&mut ctx);

  let started = Instant::now();
  let mut targets = TargetGraph::new();
  let outcome = targets
    .declare(&mut ctx, &env, &descriptors)
    .with_context(|| format!("Failed to declare targets of {}", file.display()))?;
  let elapsed = Duration::from_millis(started.elapsed().as_millis() as u64);

  let summaries: Vec<TargetSummary> = outcome
    .outputs
    .keys()
    .filter_map(|name| {
      targets.target(name).map(|record| TargetSummary {
        name,
        artifact: record.artifact,
        alias: record.alias.as_deref(),
        outputs: &record.outputs,
      })
    })
    .collect();

  if format.is_json() {
    print_json(&DeclareSummary {
      targets: summaries,
      failures: outcome
        .failures
        .iter()
        .map(|f| FailureSummary {
          name: &f.name,
          reason: &f.reason,
        })
        .collect(),
      outputs: targets.progress().total(),
      nodes: targets.graph().node_count(),
      edges: targets.graph().edge_count(),
      warnings: ctx.diagnostics().warnings(),
    })?;
  } else {
    print_success(&format!(
      "Declared {} target(s) in {}",
      summaries.len(),
      humantime::format_duration(elapsed)
    ));
    for summary in &summaries {
      match summary.alias {
        Some(alias) => print_info(&format!("{} ({}, alias {})", summary.name, summary.artifact, alias)),
        None => print_info(&format!("{} ({})", summary.name, summary.artifact)),
      }
      for path in summary.outputs {
        print_path(PathMark::Output, path);
      }
    }
    for failure in &outcome.failures {
      print_error(&format!("{}: {}", failure.name, failure.reason));
    }
    println!();
    print_stat("Outputs", &targets.progress().total().to_string());
    print_stat(
      "Graph",
      &format!(
        "{} node(s), {} edge(s)",
        targets.graph().node_count(),
        targets.graph().edge_count()
      ),
    );
  }

  finish(&mut ctx)
}
