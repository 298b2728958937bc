//! Implementation of the `cairn clean` command.
//!
//! With target names, only those targets' outputs are removed and every other
//! declared target's files stay, shared ones included. Without names,
//! everything declared is removed after confirmation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use cairn_lib::target::TargetGraph;

use super::{base_env, finish, load_descriptors, open_context, split_words};
use crate::output::{OutputFormat, PathMark, print_info, print_json, print_path, print_stat, print_success, print_warning};
use crate::prompts::confirm;

#[derive(Serialize)]
struct CleanSummary<'a> {
  removed: &'a [PathBuf],
  preserved: usize,
  unknown: &'a [String],
}

pub fn cmd_clean(output: &Path, file: &Path, words: &[String], force: bool, verbose: bool, format: OutputFormat) -> Result<()> {
  let (flags, names) = split_words(words);
  let descriptors = load_descriptors(file)?;
  let mut ctx = open_context(output, flags)?;
  let env = base_env(&mut ctx);

  let mut targets = TargetGraph::planning();
  targets
    .declare(&mut ctx, &env, &descriptors)
    .with_context(|| format!("Failed to declare targets of {}", file.display()))?;

  if names.is_empty() {
    let plan = targets.clean_plan(&[]);
    let question = format!(
      "Remove {} file(s) and {} external sub-project(s)?",
      plan.remove.len(),
      plan.external.len()
    );
    if !confirm(&question, force)? {
      print_info("Nothing removed.");
      return finish(&mut ctx);
    }
  }

  let requested: Vec<&str> = names.iter().map(String::as_str).collect();
  let report = targets.clean(&mut ctx, &requested).context("Clean failed")?;

  if format.is_json() {
    print_json(&CleanSummary {
      removed: &report.removed,
      preserved: report.preserved,
      unknown: &report.unknown,
    })?;
  } else {
    for name in &report.unknown {
      print_warning(&format!("No target or alias named '{name}'"));
    }
    if verbose {
      for path in &report.removed {
        print_path(PathMark::Removed, path);
      }
    }
    print_success(&format!("Removed {} file(s)", report.removed.len()));
    if report.preserved > 0 {
      print_stat("Preserved", &format!("{} file(s) of other targets", report.preserved));
    }
  }

  finish(&mut ctx)
}
