use std::fmt;

/// CPU architectures cairn can lay out outputs for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86,
  X86_64,
  Aarch64,
}

impl Arch {
  pub fn current() -> Option<Self> {
    Self::parse(std::env::consts::ARCH)
  }

  /// Accepts the canonical names plus the common aliases (`amd64`, `x64`,
  /// `i686`, `arm64`).
  pub fn parse(value: &str) -> Option<Self> {
    match value.to_ascii_lowercase().as_str() {
      "x86" | "i386" | "i686" => Some(Self::X86),
      "x86_64" | "amd64" | "x64" => Some(Self::X86_64),
      "aarch64" | "arm64" => Some(Self::Aarch64),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "aarch64",
    }
  }

  pub fn is_64bit(&self) -> bool {
    !matches!(self, Self::X86)
  }

  /// Short directory segment used in output and library paths (`x86`, `x64`, `arm64`).
  pub fn dir_name(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X86_64 => "x64",
      Self::Aarch64 => "arm64",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dir_names_are_short() {
    assert_eq!(Arch::X86.dir_name(), "x86");
    assert_eq!(Arch::X86_64.dir_name(), "x64");
    assert!(!Arch::X86.is_64bit());
    assert!(Arch::Aarch64.is_64bit());
  }

  #[test]
  fn parse_accepts_aliases() {
    assert_eq!(Arch::parse("amd64"), Some(Arch::X86_64));
    assert_eq!(Arch::parse("arm64"), Some(Arch::Aarch64));
    assert_eq!(Arch::parse("i686"), Some(Arch::X86));
    assert_eq!(Arch::parse("riscv64"), None);
  }
}
