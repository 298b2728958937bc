//! Artifact file naming, one strategy per operating system.

use crate::platform::os::Os;

/// File names making up one shared library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedLibNames {
  /// The real binary (`libfoo.so.1.2.3`, `libfoo.1.2.3.dylib`, `foo.dll`).
  pub binary: String,
  /// Import library linked against on Windows (`foo.lib`).
  pub import_lib: Option<String>,
  /// Compatibility symlinks pointing at `binary`, most specific first.
  pub symlinks: Vec<String>,
  /// ELF soname or Mach-O install name recorded in the binary.
  pub soname: Option<String>,
}

/// A parsed `major[.minor[.patch]]` library version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibVersion {
  parts: Vec<String>,
}

impl LibVersion {
  /// Parse a dotted version; empty or non-numeric components are rejected.
  pub fn parse(value: &str) -> Option<Self> {
    let parts: Vec<String> = value.trim().split('.').map(str::to_string).collect();
    if parts.is_empty() || parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
      return None;
    }
    Some(Self { parts })
  }

  pub fn major(&self) -> &str {
    &self.parts[0]
  }

  pub fn full(&self) -> String {
    self.parts.join(".")
  }

  /// `major.minor`, as accepted by the MSVC `/VERSION` linker flag.
  pub fn major_minor(&self) -> String {
    match self.parts.get(1) {
      Some(minor) => format!("{}.{}", self.parts[0], minor),
      None => format!("{}.0", self.parts[0]),
    }
  }
}

/// Naming strategy for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Naming {
  os: Os,
}

impl Naming {
  pub fn for_os(os: Os) -> Self {
    Self { os }
  }

  pub fn object_file(&self, stem: &str) -> String {
    format!("{stem}.{}", self.os.object_ext())
  }

  /// Static archive name. Windows uses a `lib` prefix so the archive never
  /// collides with a DLL's import library.
  pub fn static_lib(&self, name: &str) -> String {
    match self.os {
      Os::Windows => format!("lib{name}.lib"),
      Os::Linux | Os::MacOs => format!("lib{name}.a"),
    }
  }

  /// File a consumer links against for a shared library.
  pub fn link_lib(&self, name: &str) -> String {
    match self.os {
      Os::Linux => format!("lib{name}.so"),
      Os::MacOs => format!("lib{name}.dylib"),
      Os::Windows => format!("{name}.lib"),
    }
  }

  pub fn shared_lib(&self, name: &str, version: Option<&LibVersion>) -> SharedLibNames {
    let mut names = match (self.os, version) {
      (Os::Linux, None) => SharedLibNames {
        binary: format!("lib{name}.so"),
        import_lib: None,
        symlinks: Vec::new(),
        soname: Some(format!("lib{name}.so")),
      },
      (Os::Linux, Some(v)) => SharedLibNames {
        binary: format!("lib{name}.so.{}", v.full()),
        import_lib: None,
        symlinks: vec![format!("lib{name}.so.{}", v.major()), format!("lib{name}.so")],
        soname: Some(format!("lib{name}.so.{}", v.major())),
      },
      (Os::MacOs, None) => SharedLibNames {
        binary: format!("lib{name}.dylib"),
        import_lib: None,
        symlinks: Vec::new(),
        soname: Some(format!("@rpath/lib{name}.dylib")),
      },
      (Os::MacOs, Some(v)) => SharedLibNames {
        binary: format!("lib{name}.{}.dylib", v.full()),
        import_lib: None,
        symlinks: vec![format!("lib{name}.{}.dylib", v.major()), format!("lib{name}.dylib")],
        soname: Some(format!("@rpath/lib{name}.{}.dylib", v.major())),
      },
      (Os::Windows, _) => SharedLibNames {
        binary: format!("{name}.dll"),
        import_lib: Some(format!("{name}.lib")),
        symlinks: Vec::new(),
        soname: None,
      },
    };
    // A single-component version makes the soname equal to the binary.
    let binary = names.binary.clone();
    names.symlinks.retain(|link| *link != binary);
    names
  }

  pub fn program(&self, name: &str) -> String {
    format!("{name}{}", self.os.exe_suffix())
  }

  /// Loadable module name; `ext` overrides the platform extension (with or
  /// without a leading dot, empty for none).
  pub fn module(&self, name: &str, ext: Option<&str>) -> String {
    let ext = match ext {
      Some(ext) => ext.trim_start_matches('.'),
      None => self.os.module_ext(),
    };
    if ext.is_empty() { name.to_string() } else { format!("{name}.{ext}") }
  }
}
