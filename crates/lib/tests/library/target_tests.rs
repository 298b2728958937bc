use cairn_lib::graph::Action;
use cairn_lib::target::{BuildEnv, TargetGraph};
use tempfile::TempDir;

use super::common::{context, descriptors};

#[test]
fn shared_library_depends_on_static_library() {
  let temp = TempDir::new().unwrap();
  let mut ctx = context(temp.path(), &[]);
  let mut targets = TargetGraph::new();

  targets
    .declare(
      &mut ctx,
      &BuildEnv::new(),
      &descriptors(r#"[{"name": "support", "type": "staticlib", "sources": ["support/a.c"]}]"#),
    )
    .unwrap();
  let outcome = targets
    .declare(
      &mut ctx,
      &BuildEnv::new(),
      &descriptors(r#"[{"name": "widget", "type": "sharedlib", "sources": ["src/one.c", "src/two.c"], "deps": ["support"]}]"#),
    )
    .unwrap();

  let nodes = &outcome.outputs["widget"];
  assert_eq!(nodes.len(), 1);

  let lib_dir = ctx.out_base().join("lib");
  let shared = targets.graph().lookup_file(&lib_dir.join("libwidget.so")).unwrap();
  let archive = targets.graph().lookup_file(&lib_dir.join("libsupport.a")).unwrap();
  assert_eq!(nodes[0], shared);
  assert!(targets.graph().transitive_dependencies(shared).contains(&archive));

  let compiled = targets
    .graph()
    .dependencies(shared)
    .into_iter()
    .filter(|id| matches!(targets.graph().node(*id).action, Some(Action::Compile { .. })))
    .count();
  assert_eq!(compiled, 2);
  targets.graph().topological_order().unwrap();
}

#[test]
fn progress_counts_declared_outputs() {
  let temp = TempDir::new().unwrap();
  let mut ctx = context(temp.path(), &[]);
  let mut targets = TargetGraph::new();
  targets
    .declare(
      &mut ctx,
      &BuildEnv::new(),
      &descriptors(
        r#"[
          {"name": "z", "type": "sharedlib", "sources": ["z.c"], "shared": {"version": "1.2"}},
          {"name": "app", "type": "program", "sources": ["main.c"], "libs": ["z"]}
        ]"#,
      ),
    )
    .unwrap();

  assert_eq!(targets.progress().total(), 4);
  let exe = ctx.out_base().join("bin/app");
  let report = targets.progress_mut().complete(&exe).unwrap();
  assert_eq!(report.to_string(), "[ 25%] (1/4) app");
}

#[test]
fn debug_builds_land_in_their_own_tree() {
  let temp = TempDir::new().unwrap();
  let mut ctx = context(temp.path(), &[("debug", "1"), ("no-arch", "1")]);
  let mut targets = TargetGraph::new();
  targets
    .declare(
      &mut ctx,
      &BuildEnv::new(),
      &descriptors(r#"[{"name": "tool", "type": "program", "sources": ["tool.c"]}]"#),
    )
    .unwrap();

  assert_eq!(targets.target("tool").unwrap().outputs, [temp.path().join("debug/bin/tool")]);
}
