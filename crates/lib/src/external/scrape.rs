//! Install-log scraping.
//!
//! External build systems announce what they install on stdout. Two pattern
//! families are recognised:
//!
//! - installed files: CMake's `-- Installing: <path>` / `-- Up-to-date: <path>`
//!   and `install [-c] [-m mode] <src>... <dest>` lines printed by automake and
//!   libtool;
//! - symlinks: `ln -s <source> <target>`, usually inside a libtool
//!   `(cd <dir> && { ln -s -f ... })` wrapper.
//!
//! Output arrives in arbitrary chunks; [`LineScanner`] reassembles complete
//! lines so the log is parsed while it streams.

use std::path::{Path, PathBuf};

/// One fact extracted from a log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapedEntry {
  Installed(PathBuf),
  Symlink { source: PathBuf, target: PathBuf },
}

/// Splits a byte stream into lines, holding back the trailing partial line.
#[derive(Debug, Default)]
pub struct LineScanner {
  pending: Vec<u8>,
}

impl LineScanner {
  /// Feed a chunk; `on_line` is called for every line it completes.
  pub fn feed(&mut self, chunk: &[u8], on_line: &mut impl FnMut(&str)) {
    let mut start = 0;
    for (idx, byte) in chunk.iter().enumerate() {
      if *byte != b'\n' {
        continue;
      }
      if self.pending.is_empty() {
        emit(&chunk[start..idx], on_line);
      } else {
        self.pending.extend_from_slice(&chunk[start..idx]);
        let line = std::mem::take(&mut self.pending);
        emit(&line, on_line);
      }
      start = idx + 1;
    }
    self.pending.extend_from_slice(&chunk[start..]);
  }

  /// Flush a final line that was not newline-terminated.
  pub fn finish(&mut self, on_line: &mut impl FnMut(&str)) {
    if !self.pending.is_empty() {
      let line = std::mem::take(&mut self.pending);
      emit(&line, on_line);
    }
  }
}

fn emit(bytes: &[u8], on_line: &mut impl FnMut(&str)) {
  let text = String::from_utf8_lossy(bytes);
  on_line(text.trim_end_matches('\r'));
}

/// Split a command line into words, honoring single and double quotes.
fn shell_words(line: &str) -> Vec<String> {
  let mut words = Vec::new();
  let mut current = String::new();
  let mut in_word = false;
  let mut quote: Option<char> = None;

  for c in line.chars() {
    match quote {
      Some(q) if c == q => quote = None,
      Some(_) => current.push(c),
      None if c == '\'' || c == '"' => {
        quote = Some(c);
        in_word = true;
      }
      None if c.is_whitespace() => {
        if in_word {
          words.push(std::mem::take(&mut current));
          in_word = false;
        }
      }
      None => {
        current.push(c);
        in_word = true;
      }
    }
  }
  if in_word {
    words.push(current);
  }
  words
}

fn is_install_program(word: &str) -> bool {
  matches!(
    Path::new(word).file_name().and_then(|n| n.to_str()),
    Some("install") | Some("ginstall")
  )
}

/// Options of `install(1)` that consume the following word.
const INSTALL_VALUE_OPTIONS: &[&str] = &["-m", "-o", "-g", "-S"];

fn scrape_install(words: &[String]) -> Vec<ScrapedEntry> {
  let mut operands: Vec<&str> = Vec::new();
  let mut target_dir: Option<&str> = None;
  let mut iter = words.iter();
  while let Some(word) = iter.next() {
    if word == "-d" || word == "--directory" {
      // Directory creation only.
      return Vec::new();
    }
    if word == "-t" || word == "--target-directory" {
      target_dir = iter.next().map(|dir| dir.trim_end_matches(';'));
      continue;
    }
    if let Some(dir) = word.strip_prefix("--target-directory=") {
      target_dir = Some(dir.trim_end_matches(';'));
      continue;
    }
    if INSTALL_VALUE_OPTIONS.contains(&word.as_str()) {
      iter.next();
      continue;
    }
    if word.starts_with('-') && word.len() > 1 {
      continue;
    }
    operands.push(word.trim_end_matches(';'));
  }

  // With -t every operand is a source.
  let (dest, sources) = match target_dir {
    Some(dir) => (dir, operands.as_slice()),
    None => match operands.split_last() {
      Some((dest, sources)) => (*dest, sources),
      None => return Vec::new(),
    },
  };
  if sources.is_empty() {
    return Vec::new();
  }

  let dest = Path::new(dest);
  let into_dir =
    target_dir.is_some() || sources.len() > 1 || dest.is_dir() || dest.to_string_lossy().ends_with('/');
  if into_dir {
    sources
      .iter()
      .filter_map(|src| Path::new(src).file_name())
      .map(|name| ScrapedEntry::Installed(dest.join(name)))
      .collect()
  } else {
    vec![ScrapedEntry::Installed(dest.to_path_buf())]
  }
}

fn scrape_symlink(words: &[String]) -> Option<ScrapedEntry> {
  let mut dir: Option<&str> = None;
  let mut idx = 0;
  while idx < words.len() {
    let word = words[idx].trim_start_matches(['(', '{']);
    if word == "cd" {
      dir = words.get(idx + 1).map(|d| d.trim_end_matches([';', ')']));
      idx += 2;
      continue;
    }
    if word == "ln" {
      let mut operands = Vec::new();
      let mut symbolic = false;
      for arg in &words[idx + 1..] {
        let arg = arg.trim_end_matches([';', ')']);
        if arg.starts_with('-') {
          symbolic |= arg.contains('s');
          continue;
        }
        if arg.is_empty() || arg == "||" || arg == "&&" || arg.starts_with(['{', '}', ')']) {
          break;
        }
        operands.push(arg);
        if operands.len() == 2 {
          break;
        }
      }
      if !symbolic || operands.len() != 2 {
        return None;
      }
      let source = PathBuf::from(operands[0]);
      let link = Path::new(operands[1]);
      let target = match dir {
        Some(dir) if link.is_relative() => Path::new(dir).join(link),
        _ => link.to_path_buf(),
      };
      return Some(ScrapedEntry::Symlink { source, target });
    }
    idx += 1;
  }
  None
}

/// Extract install facts from one log line.
pub fn scrape_line(line: &str) -> Vec<ScrapedEntry> {
  let trimmed = line.trim();

  for marker in ["-- Installing: ", "-- Up-to-date: "] {
    if let Some(path) = trimmed.strip_prefix(marker) {
      return vec![ScrapedEntry::Installed(PathBuf::from(path.trim()))];
    }
  }

  let mut words = shell_words(trimmed);
  // libtool prefixes its commands with "libtool: install: ".
  while words.first().is_some_and(|w| w.ends_with(':')) {
    words.remove(0);
  }
  if words.first().is_some_and(|w| is_install_program(w)) {
    return scrape_install(&words[1..]);
  }

  scrape_symlink(&words).into_iter().collect()
}
