//! Implementation of the `cairn status` command.
//!
//! Walks the declared graph in build order and reports progress for every
//! output that already exists on disk. External sub-builds are not run;
//! their outputs come from the manifests of earlier builds.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use cairn_lib::target::TargetGraph;

use super::{base_env, finish, load_descriptors, open_context, parse_settings};
use crate::output::{OutputFormat, print_info, print_json, print_progress, print_stat};

#[derive(Serialize)]
struct TargetStatus {
  completed: usize,
  total: usize,
}

#[derive(Serialize)]
struct StatusSummary {
  completed: usize,
  total: usize,
  targets: BTreeMap<String, TargetStatus>,
}

pub fn cmd_status(output: &Path, file: &Path, settings: &[String], format: OutputFormat) -> Result<()> {
  let flags = parse_settings(settings)?;
  let descriptors = load_descriptors(file)?;
  let mut ctx = open_context(output, flags)?;
  let env = base_env(&mut ctx);

  let mut targets = TargetGraph::planning();
  targets
    .declare(&mut ctx, &env, &descriptors)
    .with_context(|| format!("Failed to declare targets of {}", file.display()))?;

  let order = targets.graph().topological_order()?;
  let built: Vec<_> = order
    .into_iter()
    .filter_map(|id| {
      let node = targets.graph().node(id);
      node.action.as_ref()?;
      let path = node.path()?;
      path.symlink_metadata().is_ok().then(|| path.to_path_buf())
    })
    .collect();

  let mut reports = Vec::new();
  for path in &built {
    if let Some(report) = targets.progress_mut().complete(path) {
      reports.push(report);
    }
  }

  if format.is_json() {
    let progress = targets.progress();
    let per_target = targets
      .targets()
      .keys()
      .filter_map(|name| {
        progress
          .target_progress(name)
          .map(|(completed, total)| (name.clone(), TargetStatus { completed, total }))
      })
      .collect();
    print_json(&StatusSummary {
      completed: progress.completed(),
      total: progress.total(),
      targets: per_target,
    })?;
  } else {
    for report in &reports {
      print_progress(report);
    }
    if reports.is_empty() {
      print_info("No declared output has been built yet.");
    }
    println!();
    print_stat(
      "Built",
      &format!("{} of {} output(s)", targets.progress().completed(), targets.progress().total()),
    );
  }

  finish(&mut ctx)
}
