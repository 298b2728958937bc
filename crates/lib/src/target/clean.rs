//! Conservative cleaning.
//!
//! With no target named, every declared output is removed. When targets are
//! named, only their outputs are removed and every other declared target's
//! outputs are preserved, even when a file is shared between the two sides.
//! External sub-projects are cleaned through their manifests, never through
//! the plan's file list.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;

use crate::util::fs::remove_file_if_exists;

use super::TargetRecord;

/// External sub-project selected for cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRef {
  pub target: String,
  pub tool: String,
  pub project: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanPlan {
  /// Files to delete.
  pub remove: BTreeSet<PathBuf>,
  /// Files of targets that were not requested.
  pub preserve: BTreeSet<PathBuf>,
  pub external: Vec<ExternalRef>,
  /// Requested names that match no target or alias.
  pub unknown: Vec<String>,
}

impl CleanPlan {
  /// Delete the planned files that still exist. Directories are never removed.
  pub fn execute(&self) -> io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in &self.remove {
      if path.is_dir() && !path.is_symlink() {
        continue;
      }
      if remove_file_if_exists(path)? {
        removed.push(path.clone());
      }
    }
    Ok(removed)
  }
}

pub(super) fn plan(
  targets: &BTreeMap<String, TargetRecord>,
  aliases: &BTreeMap<String, String>,
  requested: &[&str],
) -> CleanPlan {
  let mut plan = CleanPlan::default();

  let selected: BTreeSet<&str> = if requested.is_empty() {
    targets.keys().map(String::as_str).collect()
  } else {
    let mut selected = BTreeSet::new();
    for name in requested {
      if targets.contains_key(*name) {
        selected.insert(*name);
      } else if let Some(target) = aliases.get(*name) {
        selected.insert(target.as_str());
      } else {
        plan.unknown.push(name.to_string());
      }
    }
    selected
  };

  for (name, record) in targets {
    let files = record.outputs.iter().cloned();
    if !selected.contains(name.as_str()) {
      plan.preserve.extend(files);
      continue;
    }
    match &record.external {
      Some((tool, project)) => plan.external.push(ExternalRef {
        target: name.clone(),
        tool: tool.clone(),
        project: project.clone(),
      }),
      None => plan.remove.extend(files),
    }
  }

  let preserve = &plan.preserve;
  plan.remove.retain(|path| !preserve.contains(path));
  plan
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::target::types::ArtifactType;
  use tempfile::TempDir;

  fn record(artifact: ArtifactType, outputs: &[&str]) -> TargetRecord {
    TargetRecord {
      artifact,
      alias: None,
      outputs: outputs.iter().map(PathBuf::from).collect(),
      link_file: None,
      nodes: Vec::new(),
      external: None,
    }
  }

  fn registry() -> (BTreeMap<String, TargetRecord>, BTreeMap<String, String>) {
    let mut targets = BTreeMap::new();
    targets.insert("core".to_string(), record(ArtifactType::SharedLib, &["lib/libcore.so", "include/core.h"]));
    targets.insert("app".to_string(), record(ArtifactType::Program, &["bin/app", "include/core.h"]));
    let mut zlib = record(ArtifactType::Custom, &["lib/libz.a"]);
    zlib.external = Some(("cmake".to_string(), "zlib".to_string()));
    targets.insert("zlib".to_string(), zlib);
    let aliases = BTreeMap::from([("corelib".to_string(), "core".to_string())]);
    (targets, aliases)
  }

  #[test]
  fn no_request_cleans_everything() {
    let (targets, aliases) = registry();
    let plan = plan(&targets, &aliases, &[]);
    assert_eq!(plan.remove.len(), 3);
    assert!(plan.preserve.is_empty());
    assert_eq!(plan.external.len(), 1);
    assert_eq!(plan.external[0].project, "zlib");
  }

  #[test]
  fn named_target_preserves_all_others() {
    let (targets, aliases) = registry();
    let plan = plan(&targets, &aliases, &["core"]);
    assert_eq!(plan.remove, BTreeSet::from([PathBuf::from("lib/libcore.so")]));
    assert!(plan.preserve.contains(&PathBuf::from("include/core.h")));
    assert!(plan.preserve.contains(&PathBuf::from("lib/libz.a")));
    assert!(plan.external.is_empty());
  }

  #[test]
  fn aliases_and_unknown_names() {
    let (targets, aliases) = registry();
    let plan = plan(&targets, &aliases, &["corelib", "ghost"]);
    assert!(plan.remove.contains(&PathBuf::from("lib/libcore.so")));
    assert_eq!(plan.unknown, ["ghost"]);
  }

  #[test]
  fn execute_removes_only_existing_files() {
    let temp = TempDir::new().unwrap();
    let present = temp.path().join("a.o");
    std::fs::write(&present, "").unwrap();
    let plan = CleanPlan {
      remove: BTreeSet::from([present.clone(), temp.path().join("missing.o"), temp.path().to_path_buf()]),
      ..Default::default()
    };
    assert_eq!(plan.execute().unwrap(), [present.clone()]);
    assert!(!present.exists());
    assert!(temp.path().exists());
    assert!(plan.execute().unwrap().is_empty());
  }
}
