use cairn_lib::external::{ConfigOptions, ExternalBuildDriver, OptionValue};
use cairn_lib::target::{BuildEnv, ExternalSpec, TargetGraph};
use tempfile::TempDir;

use super::common::{ShellTool, context, descriptors};

const INSTALLED: &[&str] = &["include/zlib.h", "lib/libz.a", "lib/pkgconfig/zlib.pc"];

fn options() -> ConfigOptions {
  ConfigOptions::from([("X".to_string(), OptionValue::from("1"))])
}

#[test]
fn configure_build_clean_round_trip() {
  let temp = TempDir::new().unwrap();
  let mut ctx = context(&temp.path().join("out"), &[]);
  let mut driver = ExternalBuildDriver::new(ShellTool::installing("touch configured", INSTALLED));

  assert!(driver.configure(&mut ctx, "zlib", temp.path(), &options()).unwrap());
  let manifest = driver.build(&mut ctx, "zlib", temp.path(), None).unwrap();

  let prefix = ctx.out_base();
  let expected: Vec<_> = INSTALLED.iter().map(|f| prefix.join(f)).collect();
  let mut recorded = manifest.paths(ctx.output_root());
  recorded.sort();
  assert_eq!(recorded, expected);
  assert!(expected.iter().all(|p| p.is_file()));

  let manifest_file = driver.paths(&mut ctx, "zlib").manifest;
  assert!(manifest_file.is_file());

  let removed = driver.clean(&mut ctx, "zlib").unwrap();
  assert_eq!(removed.len(), 3);
  assert!(expected.iter().all(|p| !p.exists()));
  assert!(!manifest_file.exists());
  assert!(driver.clean(&mut ctx, "zlib").unwrap().is_empty());
}

#[test]
fn external_target_outputs_feed_the_graph() {
  let temp = TempDir::new().unwrap();
  let mut ctx = context(&temp.path().join("out"), &[]);
  let mut targets = TargetGraph::new();
  targets.register_driver(ExternalBuildDriver::new(ShellTool::installing("true", INSTALLED)));

  let spec = ExternalSpec {
    tool: "shell".to_string(),
    source_dir: temp.path().to_path_buf(),
    options: options(),
    target: None,
  };
  let nodes = targets.declare_external(&mut ctx, "zlib", &spec).unwrap();
  assert_eq!(nodes.len(), 3);

  targets
    .declare(
      &mut ctx,
      &BuildEnv::new(),
      &descriptors(r#"[{"name": "app", "type": "program", "sources": ["main.c"], "deps": ["zlib"]}]"#),
    )
    .unwrap();
  let exe = targets.graph().lookup_file(&ctx.out_base().join("bin/app")).unwrap();
  for node in nodes {
    assert!(targets.graph().depends_on(exe, node));
  }

  let report = targets.clean(&mut ctx, &["zlib"]).unwrap();
  assert_eq!(report.removed.len(), 3);
  assert_eq!(report.preserved, 1);
  assert!(!ctx.out_base().join("lib/libz.a").exists());
}

#[test]
fn failing_build_aborts_declare() {
  let temp = TempDir::new().unwrap();
  let mut ctx = context(&temp.path().join("out"), &[]);
  let mut targets = TargetGraph::new();
  targets.register_driver(ExternalBuildDriver::new(ShellTool {
    configure: "true".to_string(),
    build: "echo broken >&2; exit 2".to_string(),
  }));

  let json = format!(
    r#"[{{"name": "dep", "type": "custom", "external": {{"tool": "shell", "source_dir": "{}"}}}}]"#,
    temp.path().display()
  );
  let err = targets.declare(&mut ctx, &BuildEnv::new(), &descriptors(&json)).unwrap_err();
  assert!(err.to_string().contains("dep"));
  assert!(targets.target("dep").is_none());
}
