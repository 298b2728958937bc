use cairn_lib::args::Origin;
use tempfile::TempDir;

use super::common::{context, context_with_env};

#[test]
fn flags_persist_across_invocations() {
  let temp = TempDir::new().unwrap();
  {
    let mut ctx = context(temp.path(), &[("with-foo", "/opt/foo"), ("reconfigure", "1")]);
    assert_eq!(ctx.args.get("with-foo", ""), "/opt/foo");
    assert!(ctx.args.flag_bool("reconfigure", false));
    assert!(ctx.args.flush().unwrap());
  }

  let mut ctx = context(temp.path(), &[]);
  let resolved = ctx.args.resolve("with-foo").unwrap();
  assert_eq!(resolved.value, "/opt/foo");
  assert_eq!(resolved.origin, Origin::Cache);
  assert!(!ctx.args.flag_bool("reconfigure", false));
}

#[test]
fn cache_beats_environment() {
  let temp = TempDir::new().unwrap();
  {
    let mut ctx = context(temp.path(), &[("jobs", "4")]);
    assert_eq!(ctx.args.get_int("jobs", 1), 4);
  }

  let mut ctx = context_with_env(temp.path(), &[], &[("JOBS", "16")]);
  assert_eq!(ctx.args.get_int("jobs", 1), 4);

  let mut fresh = context_with_env(&temp.path().join("other"), &[], &[("JOBS", "16")]);
  assert_eq!(fresh.args.get_int("jobs", 1), 16);
}

#[test]
fn no_cache_ignores_the_cache_file() {
  let temp = TempDir::new().unwrap();
  {
    let mut ctx = context(temp.path(), &[("debug", "1")]);
    assert!(ctx.args.get_bool("debug", false));
  }

  let mut ctx = context(temp.path(), &[("no-cache", "1")]);
  assert!(!ctx.args.get_bool("debug", false));
  assert!(!ctx.args.flush().unwrap());
}

#[test]
fn corrupt_cache_is_discarded() {
  let temp = TempDir::new().unwrap();
  let state = temp.path().join(".cairn");
  std::fs::create_dir_all(&state).unwrap();
  std::fs::write(state.join("args.json"), "{ not json").unwrap();

  let mut ctx = context(temp.path(), &[]);
  assert_eq!(ctx.args.get("with-foo", "none"), "none");
  assert!(ctx.args.flush().unwrap());
  let rewritten = std::fs::read_to_string(state.join("args.json")).unwrap();
  assert!(serde_json::from_str::<serde_json::Value>(&rewritten).is_ok());
}
