use std::path::Path;

use anyhow::Result;
use serde_json::json;

use super::{finish, open_context, parse_settings};
use crate::output::{OutputFormat, print_json, print_stat};

pub fn cmd_info(output: &Path, settings: &[String], format: OutputFormat) -> Result<()> {
  let mut ctx = open_context(output, parse_settings(settings)?)?;
  let platform = ctx.platform();
  let mode = ctx.mode();
  let out_base = ctx.out_base();
  let objects = ctx.objects_base();
  let cache = ctx.args.cache_path().map(Path::to_path_buf);

  if format.is_json() {
    print_json(&json!({
      "platform": platform.to_string(),
      "mode": mode.as_str(),
      "output_root": ctx.output_root(),
      "out_base": out_base,
      "objects_base": objects,
      "cache": cache,
    }))?;
  } else {
    println!("cairn {}", env!("CARGO_PKG_VERSION"));
    print_stat("Platform", &platform.to_string());
    print_stat("Mode", mode.as_str());
    print_stat("Outputs", &out_base.display().to_string());
    print_stat("Objects", &objects.display().to_string());
    if let Some(cache) = cache {
      print_stat("Cache", &cache.display().to_string());
    }
  }

  finish(&mut ctx)
}
