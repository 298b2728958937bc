//! Implementation of the `cairn arg` commands.

use std::path::Path;

use anyhow::{Result, bail};
use clap::Subcommand;
use serde_json::json;

use super::{finish, open_context, parse_settings};
use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success};

#[derive(Subcommand)]
pub enum ArgAction {
  /// Print the resolved value of a key and where it came from
  Get {
    key: String,

    /// Build settings (`key=value`)
    settings: Vec<String>,
  },

  /// Store a value in the argument cache
  Set { key: String, value: String },

  /// Remove a key from the argument cache
  Remove { key: String },

  /// List the cached values of this platform
  List,
}

pub fn cmd_arg(output: &Path, action: ArgAction, format: OutputFormat) -> Result<()> {
  match action {
    ArgAction::Get { key, settings } => {
      let mut ctx = open_context(output, parse_settings(&settings)?)?;
      let Some(resolved) = ctx.args.resolve(&key) else {
        bail!("'{}' is not set", key);
      };
      if format.is_json() {
        print_json(&json!({ "key": key, "value": resolved.value, "origin": resolved.origin.to_string() }))?;
      } else {
        println!("{}", resolved.value);
        print_stat("From", &resolved.origin.to_string());
      }
      finish(&mut ctx)
    }
    ArgAction::Set { key, value } => {
      let mut ctx = open_context(output, Default::default())?;
      ctx.args.set(&key, &value, true);
      finish(&mut ctx)?;
      print_success(&format!("{key}={value}"));
      Ok(())
    }
    ArgAction::Remove { key } => {
      let mut ctx = open_context(output, Default::default())?;
      ctx.args.remove(&key);
      finish(&mut ctx)?;
      print_success(&format!("Removed {key}"));
      Ok(())
    }
    ArgAction::List => {
      let mut ctx = open_context(output, Default::default())?;
      let entries = ctx.args.cached_entries();
      if format.is_json() {
        print_json(&entries)?;
      } else if entries.is_empty() {
        print_info(&format!("No cached values for {}", ctx.args.platform()));
      } else {
        for (key, value) in &entries {
          println!("{key}={value}");
        }
      }
      finish(&mut ctx)
    }
  }
}
