//! Terminal output helpers.
//!
//! Status lines carry a colored symbol when the stream supports color.
//! Everything a script might parse goes to stdout; warnings and errors go
//! to stderr.

use std::path::Path;

use anyhow::Context;
use cairn_lib::target::ProgressReport;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// What happened to a file listed under a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMark {
  /// Declared output of a target.
  Output,
  /// Installed by an external sub-build.
  Installed,
  Removed,
}

impl PathMark {
  fn symbol(self) -> &'static str {
    match self {
      Self::Output => "→",
      Self::Installed => "+",
      Self::Removed => "-",
    }
  }

  fn indent(self) -> &'static str {
    match self {
      Self::Output => "    ",
      Self::Installed | Self::Removed => "  ",
    }
  }
}

pub fn print_success(message: &str) {
  println!("{} {}", "✓".if_supports_color(Stream::Stdout, |s| s.green()), message);
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    "✗".if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    "⚠".if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!("{} {}", "•".if_supports_color(Stream::Stdout, |s| s.blue()), message);
}

/// Indented `label: value` line.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn print_path(mark: PathMark, path: &Path) {
  let symbol = mark.symbol();
  let symbol = match mark {
    PathMark::Output => symbol.if_supports_color(Stream::Stdout, |s| s.dimmed()).to_string(),
    PathMark::Installed => symbol.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
    PathMark::Removed => symbol.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
  };
  println!("{}{} {}", mark.indent(), symbol, path.display());
}

/// `[ 42%] (3/7) target`, with the percentage highlighted once complete.
pub fn print_progress(report: &ProgressReport) {
  let line = report.to_string();
  if report.completed == report.total {
    println!("{}", line.if_supports_color(Stream::Stdout, |s| s.green()));
  } else {
    println!("{line}");
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
