//! Blocking execution of external tools.
//!
//! One process runs at a time. Its stdout and stderr share a single pipe that
//! is drained in fixed-size chunks until EOF, so callers can parse the log as
//! it is produced.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::ExternalError;

/// Size of each read from the child's output pipe.
pub const READ_CHUNK: usize = 8192;

/// A fully described external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCommand {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  /// Variables added to the inherited environment.
  pub env: BTreeMap<String, String>,
}

impl ToolCommand {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ..Default::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }
}

impl fmt::Display for ToolCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      if arg.is_empty() || arg.contains(char::is_whitespace) {
        write!(f, " \"{}\"", arg)?;
      } else {
        write!(f, " {}", arg)?;
      }
    }
    Ok(())
  }
}

/// Run `cmd`, passing every chunk of its combined output to `on_chunk`.
///
/// Returns the exit code, or `None` when the process was killed by a signal.
pub fn run_streaming(cmd: &ToolCommand, show_cmds: bool, mut on_chunk: impl FnMut(&[u8])) -> Result<Option<i32>, ExternalError> {
  if show_cmds {
    info!(cwd = ?cmd.cwd, "{}", cmd);
  } else {
    debug!(program = %cmd.program, cwd = ?cmd.cwd, "running external tool");
  }

  let (mut reader, writer) = io::pipe()?;
  let mut command = Command::new(&cmd.program);
  command
    .args(&cmd.args)
    .envs(&cmd.env)
    .stdin(Stdio::null())
    .stdout(writer.try_clone()?)
    .stderr(writer);
  if let Some(dir) = &cmd.cwd {
    command.current_dir(dir);
  }

  let mut child = command.spawn().map_err(|e| {
    if e.kind() == io::ErrorKind::NotFound {
      ExternalError::ToolNotFound(cmd.program.clone())
    } else {
      ExternalError::Spawn {
        program: cmd.program.clone(),
        source: e,
      }
    }
  })?;
  // The command holds the parent's copies of the write end; EOF only
  // arrives once they are closed.
  drop(command);

  let mut buf = [0u8; READ_CHUNK];
  loop {
    match reader.read(&mut buf) {
      Ok(0) => break,
      Ok(n) => on_chunk(&buf[..n]),
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(e) => {
        let _ = child.kill();
        let _ = child.wait();
        return Err(ExternalError::Io(e));
      }
    }
  }

  let status = child.wait()?;
  debug!(program = %cmd.program, code = ?status.code(), "external tool exited");
  Ok(status.code())
}
