//! cairn: build-configuration front end.
//!
//! Settings are SCons-style `key=value` words given after the subcommand;
//! they become the transient flag table of the argument store and are
//! mirrored into `<output>/.cairn/args.json` for later invocations.

mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{ArgAction, ExternalAction};
use output::OutputFormat;

/// Turn declarative target descriptions into a dependency-ordered build graph
#[derive(Parser)]
#[command(name = "cairn")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
  format: OutputFormat,

  /// Output root (defaults to $CAIRN_OUTPUT, then ./build)
  #[arg(short, long, global = true)]
  output: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Declare the targets of a descriptor file and print their outputs
  Declare {
    /// JSON file holding an array of target descriptors
    file: PathBuf,

    /// Build settings (`key=value`)
    settings: Vec<String>,
  },

  /// Report which declared outputs are already built
  Status {
    /// JSON file holding an array of target descriptors
    file: PathBuf,

    /// Build settings (`key=value`)
    settings: Vec<String>,
  },

  /// Remove declared outputs, all of them or those of the named targets
  Clean {
    /// JSON file holding an array of target descriptors
    #[arg(short, long, default_value = "cairn.json")]
    file: PathBuf,

    /// Skip the confirmation when cleaning every target
    #[arg(long)]
    force: bool,

    /// Target names and build settings (`key=value`)
    words: Vec<String>,
  },

  /// Resolve the include and lib directories of an external library
  Locate {
    name: String,

    /// Fail instead of warning when a directory is missing
    #[arg(long)]
    strict: bool,

    /// Prefer the static archive when `<name>-static` is not set
    #[arg(long = "static")]
    prefer_static: bool,

    /// Build settings (`key=value`)
    settings: Vec<String>,
  },

  /// Inspect or edit the argument cache
  Arg {
    #[command(subcommand)]
    action: ArgAction,
  },

  /// Drive one external sub-project of a descriptor file
  External {
    #[command(subcommand)]
    action: ExternalAction,
  },

  /// Show platform and output locations
  Info {
    /// Build settings (`key=value`)
    settings: Vec<String>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .with_target(false)
    .init();

  let output = cmd::output_root(cli.output);
  let format = cli.format;

  match cli.command {
    Commands::Declare { file, settings } => cmd::cmd_declare(&output, &file, &settings, format),
    Commands::Status { file, settings } => cmd::cmd_status(&output, &file, &settings, format),
    Commands::Clean { file, force, words } => cmd::cmd_clean(&output, &file, &words, force, cli.verbose, format),
    Commands::Locate {
      name,
      strict,
      prefer_static,
      settings,
    } => cmd::cmd_locate(&output, &name, strict, prefer_static, &settings, format),
    Commands::Arg { action } => cmd::cmd_arg(&output, action, format),
    Commands::External { action } => cmd::cmd_external(&output, action, format),
    Commands::Info { settings } => cmd::cmd_info(&output, &settings, format),
  }
}
