use cairn_lib::locate::{LibraryRequest, LocateOptions, MissingPolicy, require_external_library, resolve};
use tempfile::TempDir;

use super::common::{context, context_with_env, make_dirs};

#[test]
fn prefix_flag_resolves_include_and_lib() {
  let temp = TempDir::new().unwrap();
  let foo = make_dirs(&temp.path().join("opt/foo"), &["include", "lib", "lib64"]);
  let prefix = foo.display().to_string();

  let mut ctx = context(&temp.path().join("out"), &[("with-foo", prefix.as_str())]);
  let dirs = resolve(&mut ctx, "foo", &LocateOptions::default()).unwrap();
  assert_eq!(dirs.include_dir, Some(foo.join("include")));
  assert_eq!(dirs.lib_dir, Some(foo.join("lib")));

  let mut ctx = context(&temp.path().join("out"), &[("with-foo", prefix.as_str()), ("libdir-arch", "suffix")]);
  let dirs = resolve(&mut ctx, "foo", &LocateOptions::default()).unwrap();
  assert_eq!(dirs.lib_dir, Some(foo.join("lib64")));
}

#[test]
fn environment_is_the_last_resort() {
  let temp = TempDir::new().unwrap();
  let bar = make_dirs(&temp.path().join("bar"), &["inc", "lib"]);
  let include = bar.join("inc").display().to_string();
  let lib = bar.join("lib").display().to_string();

  let mut ctx = context_with_env(
    &temp.path().join("out"),
    &[],
    &[("BAR_INCLUDE", include.as_str()), ("BAR_LIB", lib.as_str())],
  );
  let dirs = resolve(&mut ctx, "bar", &LocateOptions::default()).unwrap();
  assert_eq!(dirs.include_dir, Some(bar.join("inc")));
  assert_eq!(dirs.lib_dir, Some(bar.join("lib")));
}

#[test]
fn missing_dependency_follows_policy() {
  let temp = TempDir::new().unwrap();
  let mut ctx = context(&temp.path().join("out"), &[]);
  let dirs = resolve(&mut ctx, "ghost", &LocateOptions::default()).unwrap();
  assert_eq!(dirs.include_dir, None);
  assert_eq!(ctx.diagnostics().warnings().len(), 2);

  let strict = LocateOptions {
    on_missing: MissingPolicy::Fail,
    ..Default::default()
  };
  assert!(resolve(&mut ctx, "ghost", &strict).is_err());
}

#[test]
fn library_spec_is_computed_once() {
  let temp = TempDir::new().unwrap();
  let png = make_dirs(&temp.path().join("png"), &["include", "lib"]);
  std::fs::write(png.join("lib/libpng16.a"), "").unwrap();
  let prefix = png.display().to_string();

  let mut ctx = context(
    &temp.path().join("out"),
    &[("with-png", prefix.as_str()), ("png-suffix", "16"), ("png-static", "1")],
  );
  let spec = require_external_library(&mut ctx, "png", &LibraryRequest::default()).unwrap();
  assert_eq!(spec.library_name.as_deref(), Some("png16"));
  assert_eq!(spec.library_path, Some(png.join("lib/libpng16.a")));
  assert!(spec.is_static);

  ctx.args.set("png-static", "0", false);
  let again = require_external_library(&mut ctx, "png", &LibraryRequest::default()).unwrap();
  assert_eq!(again, spec);
}
