//! Build progress derived from declared outputs.
//!
//! The tracker is rebuilt from scratch on every declare; it is a view onto
//! the graph, not a record of truth.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// One progress line, rendered as `[ 42%] (3/7) target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
  pub target: String,
  pub completed: usize,
  pub total: usize,
}

impl ProgressReport {
  pub fn percent(&self) -> usize {
    if self.total == 0 { 100 } else { self.completed * 100 / self.total }
  }
}

impl fmt::Display for ProgressReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{:>3}%] ({}/{}) {}", self.percent(), self.completed, self.total, self.target)
  }
}

#[derive(Debug, Clone, Default)]
struct TargetProgress {
  outputs: BTreeSet<PathBuf>,
  completed: BTreeSet<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
  targets: BTreeMap<String, TargetProgress>,
  owners: HashMap<PathBuf, String>,
}

impl ProgressTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Track `outputs` under `target`. A file keeps its first owner.
  pub fn register(&mut self, target: &str, outputs: impl IntoIterator<Item = PathBuf>) {
    for output in outputs {
      if self.owners.contains_key(&output) {
        continue;
      }
      self.owners.insert(output.clone(), target.to_string());
      self.targets.entry(target.to_string()).or_default().outputs.insert(output);
    }
  }

  pub fn total(&self) -> usize {
    self.owners.len()
  }

  pub fn completed(&self) -> usize {
    self.targets.values().map(|t| t.completed.len()).sum()
  }

  /// Mark `output` as built. Unknown and already completed files report
  /// nothing.
  pub fn complete(&mut self, output: &Path) -> Option<ProgressReport> {
    let owner = self.owners.get(output)?.clone();
    let entry = self.targets.get_mut(&owner)?;
    if !entry.completed.insert(output.to_path_buf()) {
      return None;
    }
    Some(ProgressReport {
      target: owner,
      completed: self.completed(),
      total: self.total(),
    })
  }

  /// `(completed, total)` outputs of one target.
  pub fn target_progress(&self, target: &str) -> Option<(usize, usize)> {
    self.targets.get(target).map(|t| (t.completed.len(), t.outputs.len()))
  }

  pub fn is_target_done(&self, target: &str) -> bool {
    self
      .targets
      .get(target)
      .is_some_and(|t| t.completed.len() == t.outputs.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tracker() -> ProgressTracker {
    let mut tracker = ProgressTracker::new();
    tracker.register("core", [PathBuf::from("libcore.so"), PathBuf::from("libcore.so.1")]);
    tracker.register("app", [PathBuf::from("app"), PathBuf::from("libcore.so")]);
    tracker
  }

  #[test]
  fn reports_overall_progress() {
    let mut tracker = tracker();
    assert_eq!(tracker.total(), 3);

    let report = tracker.complete(Path::new("libcore.so")).unwrap();
    assert_eq!(report.to_string(), "[ 33%] (1/3) core");

    tracker.complete(Path::new("libcore.so.1"));
    let report = tracker.complete(Path::new("app")).unwrap();
    assert_eq!(report.to_string(), "[100%] (3/3) app");
  }

  #[test]
  fn duplicates_and_unknown_files_report_nothing() {
    let mut tracker = tracker();
    assert!(tracker.complete(Path::new("libcore.so")).is_some());
    assert!(tracker.complete(Path::new("libcore.so")).is_none());
    assert!(tracker.complete(Path::new("stray.o")).is_none());
  }

  #[test]
  fn per_target_completion() {
    let mut tracker = tracker();
    assert_eq!(tracker.target_progress("app"), Some((0, 1)));
    assert!(!tracker.is_target_done("core"));
    tracker.complete(Path::new("libcore.so"));
    tracker.complete(Path::new("libcore.so.1"));
    assert!(tracker.is_target_done("core"));
  }
}
