//! Default symbol visibility per target.
//!
//! Shared libraries and loadable modules export by default; every other
//! artifact hides its symbols. The `force-*-symvis` flags override this,
//! most specific first:
//!
//! 1. `force-<name>-symvis`
//! 2. `force-<alias>-symvis`
//! 3. `force-<type>-symvis`
//! 4. `force-symvis`
//!
//! A true value forces default visibility, a false value forces hidden.
//! Static libraries are always hidden.

use crate::args::{ArgumentStore, parse_bool};
use crate::graph::Visibility;

use super::types::ArtifactType;

fn base_visibility(artifact: ArtifactType) -> Visibility {
  match artifact {
    ArtifactType::SharedLib | ArtifactType::DynamicModule => Visibility::Default,
    _ => Visibility::Hidden,
  }
}

/// Flag names consulted for a target, most specific first.
pub fn force_flags(name: &str, alias: Option<&str>, artifact: ArtifactType) -> Vec<String> {
  let mut flags = vec![format!("force-{name}-symvis")];
  if let Some(alias) = alias {
    flags.push(format!("force-{alias}-symvis"));
  }
  flags.push(format!("force-{artifact}-symvis"));
  flags.push("force-symvis".to_string());
  flags
}

pub fn resolve_visibility(args: &mut ArgumentStore, name: &str, alias: Option<&str>, artifact: ArtifactType) -> Visibility {
  if artifact == ArtifactType::StaticLib {
    return Visibility::Hidden;
  }
  for flag in force_flags(name, alias, artifact) {
    let Some(resolved) = args.resolve(&flag) else {
      continue;
    };
    match parse_bool(&resolved.value) {
      Some(true) => return Visibility::Default,
      Some(false) => return Visibility::Hidden,
      None => {
        args.warn_once(format!("ignoring non-boolean value '{}' of '{flag}'", resolved.value));
      }
    }
  }
  base_visibility(artifact)
}
