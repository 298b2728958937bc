//! Implementation of the `cairn locate` command.

use std::path::Path;

use anyhow::{Context, Result};

use cairn_lib::locate::{LibraryRequest, LocateOptions, MissingPolicy, require_external_library};

use super::{finish, open_context, parse_settings};
use crate::output::{OutputFormat, print_json, print_stat, print_success};

fn show(path: Option<&Path>) -> String {
  path.map(|p| p.display().to_string()).unwrap_or_else(|| "not found".to_string())
}

pub fn cmd_locate(
  output: &Path,
  name: &str,
  strict: bool,
  prefer_static: bool,
  settings: &[String],
  format: OutputFormat,
) -> Result<()> {
  let flags = parse_settings(settings)?;
  let mut ctx = open_context(output, flags)?;

  let request = LibraryRequest {
    default_static: prefer_static,
    locate: LocateOptions {
      on_missing: if strict { MissingPolicy::Fail } else { MissingPolicy::Warn },
      ..Default::default()
    },
    ..Default::default()
  };
  let spec = require_external_library(&mut ctx, name, &request).with_context(|| format!("Failed to locate {name}"))?;

  if format.is_json() {
    print_json(&spec)?;
  } else {
    print_success(&format!("Resolved {name}"));
    print_stat("Include", &show(spec.include_dir.as_deref()));
    print_stat("Lib", &show(spec.lib_dir.as_deref()));
    print_stat("Library", spec.library_name.as_deref().unwrap_or(name));
    print_stat("File", &show(spec.library_path.as_deref()));
    print_stat("Static", if spec.is_static { "yes" } else { "no" });
  }

  finish(&mut ctx)
}
