//! Host and target platform identification.
//!
//! A platform is written as an `<arch>-<os>` triple such as `x86_64-linux`.
//! The triple names the argument cache namespace, and the two halves pick
//! output directory segments and file naming conventions.

pub mod arch;
pub mod os;

use arch::Arch;
use os::Os;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// The platform cairn itself runs on, `None` when unsupported.
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

impl FromStr for Platform {
  type Err = String;

  /// Parse `<arch>-<os>`, splitting at the first dash.
  fn from_str(value: &str) -> Result<Self, Self::Err> {
    let (arch, os) = value
      .split_once('-')
      .ok_or_else(|| format!("expected <arch>-<os>, got '{value}'"))?;
    let arch = Arch::parse(arch).ok_or_else(|| format!("unknown architecture '{arch}'"))?;
    let os = Os::parse(os).ok_or_else(|| format!("unknown operating system '{os}'"))?;
    Ok(Self { arch, os })
  }
}
