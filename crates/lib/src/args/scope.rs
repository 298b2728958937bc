//! Temporary argument overrides for nested sub-builds.
//!
//! A parent build hands a sub-project its own values for a handful of keys,
//! lets the nested build run, then puts everything back. Keys the nested run
//! introduced are dropped unless they match one of the retain patterns, so a
//! sub-project's flags never leak into its siblings.

use std::collections::BTreeMap;

use tracing::debug;

use super::ArgumentStore;

/// Match `name` against a pattern where `*` matches any run of characters.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
  let parts: Vec<&str> = pattern.split('*').collect();
  if parts.len() == 1 {
    return pattern == name;
  }

  let first = parts[0];
  let last = parts[parts.len() - 1];
  if !name.starts_with(first) || name.len() < first.len() + last.len() || !name.ends_with(last) {
    return false;
  }

  let mut rest = &name[first.len()..name.len() - last.len()];
  for part in &parts[1..parts.len() - 1] {
    match rest.find(part) {
      Some(idx) => rest = &rest[idx + part.len()..],
      None => return false,
    }
  }
  true
}

fn is_retained(key: &str, retain: &[&str]) -> bool {
  retain.iter().any(|pattern| wildcard_match(pattern, key))
}

/// Merge the values seen after a nested run back onto the saved ones.
///
/// Overridden keys always revert. Other keys keep their nested value only if
/// retained; otherwise they revert to the saved value or disappear.
fn restore_map(
  saved: BTreeMap<String, String>,
  current: BTreeMap<String, String>,
  overridden: &[&str],
  retain: &[&str],
) -> BTreeMap<String, String> {
  let mut restored = saved;
  for (key, value) in current {
    if overridden.contains(&key.as_str()) || !is_retained(&key, retain) {
      continue;
    }
    restored.insert(key, value);
  }
  restored
}

/// State saved on entry to an override scope.
#[derive(Debug)]
#[must_use = "an override scope must be closed with `leave_scope`"]
pub struct OverrideScope {
  saved_flags: BTreeMap<String, String>,
  saved_cache: Option<BTreeMap<String, String>>,
  overridden: Vec<String>,
}

impl ArgumentStore {
  /// Apply `overrides` to the flag table and remember what to restore.
  pub fn enter_scope(&mut self, overrides: &[(&str, &str)]) -> OverrideScope {
    let saved_flags = self.flags.clone();
    let saved_cache = self.cache_enabled().then(|| self.cached_entries());

    for (key, value) in overrides {
      self.flags.insert(key.to_string(), value.to_string());
    }
    debug!(count = overrides.len(), "entering argument override scope");

    OverrideScope {
      saved_flags,
      saved_cache,
      overridden: overrides.iter().map(|(k, _)| k.to_string()).collect(),
    }
  }

  /// Restore the state saved by `enter_scope`.
  ///
  /// Keys created inside the scope (in the flag table or the active
  /// platform's cache) are removed unless they match a `retain` pattern.
  pub fn leave_scope(&mut self, scope: OverrideScope, retain: &[&str]) {
    let overridden: Vec<&str> = scope.overridden.iter().map(String::as_str).collect();

    let current_flags = std::mem::take(&mut self.flags);
    self.flags = restore_map(scope.saved_flags, current_flags, &overridden, retain);

    if let Some(saved_cache) = scope.saved_cache {
      let current_cache = self.cached_entries();
      let restored = restore_map(saved_cache, current_cache.clone(), &overridden, retain);
      if restored != current_cache {
        let platform = self.platform.clone();
        if let Some(cache) = self.cache.as_mut() {
          cache.replace_entries(&platform, restored);
          self.dirty = true;
        }
      }
    }
    debug!("left argument override scope");
  }

  /// Run `f` with `overrides` applied to the flag table, then restore.
  ///
  /// Calls must not interleave: each scope restores exactly the state it saw
  /// on entry.
  pub fn with_overrides<R>(
    &mut self,
    overrides: &[(&str, &str)],
    retain: &[&str],
    f: impl FnOnce(&mut ArgumentStore) -> R,
  ) -> R {
    let scope = self.enter_scope(overrides);
    let result = f(self);
    self.leave_scope(scope, retain);
    result
  }
}
