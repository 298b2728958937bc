use std::fmt;

/// Target operating systems, each with its own toolchain file conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
  Windows,
}

impl Os {
  pub fn current() -> Option<Self> {
    Self::parse(std::env::consts::OS)
  }

  /// Accepts both the Rust target names and the triple identifiers.
  pub fn parse(value: &str) -> Option<Self> {
    match value.to_ascii_lowercase().as_str() {
      "linux" => Some(Self::Linux),
      "macos" | "darwin" => Some(Self::MacOs),
      "windows" | "win32" => Some(Self::Windows),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Windows => "windows",
    }
  }

  pub fn object_ext(&self) -> &'static str {
    match self {
      Self::Windows => "obj",
      Self::Linux | Self::MacOs => "o",
    }
  }

  /// Extension of loadable modules when the target does not pick one.
  pub fn module_ext(&self) -> &'static str {
    match self {
      Self::Linux => "so",
      Self::MacOs => "bundle",
      Self::Windows => "dll",
    }
  }

  pub fn exe_suffix(&self) -> &'static str {
    match self {
      Self::Windows => ".exe",
      Self::Linux | Self::MacOs => "",
    }
  }

  /// Whether binaries can locate their libraries through an rpath.
  pub fn has_rpath(&self) -> bool {
    !matches!(self, Self::Windows)
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
