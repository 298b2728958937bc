//! Subcommand implementations and the plumbing they share.

mod arg;
mod clean;
mod declare;
mod external;
mod info;
mod locate;
mod status;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use cairn_lib::consts::OUTPUT_ROOT_ENV;
use cairn_lib::target::{BuildEnv, TargetDescriptor, parse_descriptors};
use cairn_lib::{BuildContext, BuildMode};

pub use arg::{ArgAction, cmd_arg};
pub use clean::cmd_clean;
pub use declare::cmd_declare;
pub use external::{ExternalAction, cmd_external};
pub use info::cmd_info;
pub use locate::cmd_locate;
pub use status::cmd_status;

const DEFAULT_OUTPUT: &str = "build";

/// Output root from the command line, then `$CAIRN_OUTPUT`, then `./build`.
pub fn output_root(flag: Option<PathBuf>) -> PathBuf {
  flag
    .or_else(|| std::env::var_os(OUTPUT_ROOT_ENV).map(PathBuf::from))
    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

fn parse_setting(word: &str) -> Option<(String, String)> {
  let (key, value) = word.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  Some((key.to_string(), value.to_string()))
}

/// Parse `key=value` words into a flag table.
pub fn parse_settings(words: &[String]) -> Result<BTreeMap<String, String>> {
  let mut flags = BTreeMap::new();
  for word in words {
    let Some((key, value)) = parse_setting(word) else {
      bail!("Expected a key=value setting, got '{}'", word);
    };
    flags.insert(key, value);
  }
  Ok(flags)
}

/// Separate `key=value` settings from plain names.
pub fn split_words(words: &[String]) -> (BTreeMap<String, String>, Vec<String>) {
  let mut flags = BTreeMap::new();
  let mut names = Vec::new();
  for word in words {
    match parse_setting(word) {
      Some((key, value)) => {
        flags.insert(key, value);
      }
      None => names.push(word.clone()),
    }
  }
  (flags, names)
}

pub fn open_context(output: &Path, flags: BTreeMap<String, String>) -> Result<BuildContext> {
  BuildContext::detect(output, flags).context("Failed to set up the build context")
}

/// Write the argument cache back if this invocation changed it.
pub fn finish(ctx: &mut BuildContext) -> Result<()> {
  ctx.args.flush().context("Failed to write the argument cache")?;
  Ok(())
}

/// Environment every target starts from.
pub fn base_env(ctx: &mut BuildContext) -> BuildEnv {
  let mut env = BuildEnv::new();
  let define = match ctx.mode() {
    BuildMode::Debug => "_DEBUG",
    BuildMode::Release => "NDEBUG",
  };
  env.defines.push(define.to_string());
  env
}

fn rebase(base: &Path, path: &mut PathBuf) {
  if path.is_relative() {
    *path = base.join(&*path);
  }
}

fn is_path_like(dep: &str) -> bool {
  dep.contains('/') || dep.contains('\\')
}

/// Resolve the relative paths of a descriptor against `base`.
///
/// Deps that name a declared target stay as they are; other deps with a
/// path separator are files and get rebased. `prefix` is a location under
/// the output tree and is never rebased.
fn rebase_descriptor(base: &Path, declared: &BTreeSet<String>, descriptor: &mut TargetDescriptor) {
  for dep in &mut descriptor.deps {
    if is_path_like(dep) && !declared.contains(dep.as_str()) && Path::new(dep.as_str()).is_relative() {
      *dep = base.join(dep.as_str()).to_string_lossy().into_owned();
    }
  }
  for path in descriptor.sources.iter_mut().flatten() {
    rebase(base, path);
  }
  for path in descriptor.incdirs.iter_mut().chain(descriptor.libdirs.iter_mut()) {
    rebase(base, path);
  }
  for path in descriptor.install.values_mut().flatten() {
    rebase(base, path);
  }
  if let Some(path) = descriptor.shared.as_mut().and_then(|s| s.symbols.as_mut()) {
    rebase(base, path);
  }
  if let Some(path) = descriptor.module.as_mut().and_then(|m| m.symbols.as_mut()) {
    rebase(base, path);
  }
  if let Some(external) = descriptor.external.as_mut() {
    rebase(base, &mut external.source_dir);
  }
}

/// Load a descriptor file; relative paths inside it are taken relative to
/// the file's directory.
pub fn load_descriptors(file: &Path) -> Result<Vec<TargetDescriptor>> {
  let content = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
  let mut descriptors =
    parse_descriptors(&content).with_context(|| format!("Failed to parse {}", file.display()))?;

  let full = dunce::canonicalize(file).with_context(|| format!("Failed to resolve {}", file.display()))?;
  let base = full.parent().map(Path::to_path_buf).unwrap_or_default();
  let declared: BTreeSet<String> = descriptors
    .iter()
    .flat_map(|d| d.name.iter().chain(d.alias.iter()).cloned())
    .collect();
  for descriptor in &mut descriptors {
    rebase_descriptor(&base, &declared, descriptor);
  }
  Ok(descriptors)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn settings_and_names_are_split() {
    let (flags, names) = split_words(&words(&["core", "debug=1", "with-foo=/opt/foo", "app"]));
    assert_eq!(names, ["core", "app"]);
    assert_eq!(flags["debug"], "1");
    assert_eq!(flags["with-foo"], "/opt/foo");
  }

  #[test]
  fn settings_keep_equals_in_values() {
    let flags = parse_settings(&words(&["cflags=-DX=1", "empty="])).unwrap();
    assert_eq!(flags["cflags"], "-DX=1");
    assert_eq!(flags["empty"], "");
    assert!(parse_settings(&words(&["=oops"])).is_err());
    assert!(parse_settings(&words(&["plain"])).is_err());
  }

  #[test]
  fn descriptor_paths_are_relative_to_the_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("cairn.json");
    fs::write(
      &file,
      r#"[
        {"name": "core", "type": "staticlib", "sources": ["src/a.c", "/abs/b.c"], "incdirs": ["include"]},
        {"name": "zlib", "type": "custom", "external": {"tool": "cmake", "source_dir": "third_party/zlib"}}
      ]"#,
    )
    .unwrap();

    let descriptors = load_descriptors(&file).unwrap();
    let base = dunce::canonicalize(temp.path()).unwrap();
    assert_eq!(
      descriptors[0].sources.as_deref().unwrap(),
      [base.join("src/a.c"), PathBuf::from("/abs/b.c")]
    );
    assert_eq!(descriptors[0].incdirs, [base.join("include")]);
    assert_eq!(
      descriptors[1].external.as_ref().unwrap().source_dir,
      base.join("third_party/zlib")
    );
  }

  #[test]
  fn file_deps_are_relative_to_the_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("cairn.json");
    fs::write(
      &file,
      r#"[
        {"name": "fx/blur", "type": "staticlib", "sources": ["blur.c"]},
        {"name": "app", "type": "program", "sources": ["main.c"], "prefix": "tools",
         "deps": ["blur", "fx/blur", "gen/table.h", "/abs/stamp", "zlib"]}
      ]"#,
    )
    .unwrap();

    let descriptors = load_descriptors(&file).unwrap();
    let base = dunce::canonicalize(temp.path()).unwrap();
    let table = base.join("gen/table.h").to_string_lossy().into_owned();
    assert_eq!(descriptors[1].deps, ["blur", "fx/blur", table.as_str(), "/abs/stamp", "zlib"]);
    assert_eq!(descriptors[1].prefix, Some(PathBuf::from("tools")));
  }

  #[test]
  fn mistyped_descriptor_still_loads_the_rest() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("cairn.json");
    fs::write(
      &file,
      r#"[
        {"name": "bad", "type": "program", "sources": "main.c"},
        {"name": "good", "type": "program", "sources": ["main.c"]}
      ]"#,
    )
    .unwrap();

    let descriptors = load_descriptors(&file).unwrap();
    assert_eq!(descriptors.len(), 2);
    assert!(descriptors[0].malformed.is_some());
    assert_eq!(descriptors[0].name.as_deref(), Some("bad"));
    let base = dunce::canonicalize(temp.path()).unwrap();
    assert_eq!(descriptors[1].sources.as_deref().unwrap(), [base.join("main.c")]);
  }

  #[test]
  #[serial]
  fn output_root_falls_back_to_environment() {
    temp_env::with_var(OUTPUT_ROOT_ENV, Some("/tmp/cairn-env"), || {
      assert_eq!(output_root(None), PathBuf::from("/tmp/cairn-env"));
      assert_eq!(output_root(Some(PathBuf::from("out"))), PathBuf::from("out"));
    });
    temp_env::with_var_unset(OUTPUT_ROOT_ENV, || {
      assert_eq!(output_root(None), PathBuf::from("build"));
    });
  }
}
