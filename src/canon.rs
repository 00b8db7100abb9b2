//! canon.rs — Canonical-path normalizer.
//!
//! `canonic()` is the identity every other component in the crate keys off
//! of. Two different original path strings can collapse to the same
//! canonical key; `<...>` synthetic names (e.g. `<string>`, used for a
//! source compiled on the fly for evaluation) pass through unchanged.
//!
//! Case-sensitivity is probed once, by writing two files differing only in
//! case into a temp directory and checking whether they alias — exactly how
//! CPython's `bdb.case_sensitive_file_system` decides whether `normcase`
//! needs a trailing `.to_lowercase()` on this host.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(feature = "trace")]
use log::trace;

/// Probes the filesystem once to see whether it folds case.
///
/// Errors during the probe (no writable temp dir, odd permissions) are
/// treated as "case sensitive" — the conservative choice, since it never
/// merges two genuinely distinct files under one key.
fn case_sensitive_file_system() -> bool {
    let dir = match tempfile_dir() {
        Some(d) => d,
        None => return true,
    };
    let one = dir.join("one");
    let case_one = dir.join("ONE");
    let result = (|| -> std::io::Result<bool> {
        fs::write(&one, b"one")?;
        fs::write(&case_one, b"ONE")?;
        let readback = fs::read_to_string(&one)?;
        Ok(readback != "ONE")
    })();
    let _ = fs::remove_dir_all(&dir);
    result.unwrap_or(true)
}

fn tempfile_dir() -> Option<PathBuf> {
    let base = env::temp_dir();
    for attempt in 0..8 {
        let candidate = base.join(format!("tracecore-casefold-{}-{attempt}", std::process::id()));
        if fs::create_dir(&candidate).is_ok() {
            return Some(candidate);
        }
    }
    None
}

/// Collapses `.` / `..` components without touching the filesystem (mirrors
/// `os.path.normpath`/`os.path.abspath`: no symlink resolution, no
/// existence check).
fn normpath(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in p.components() {
        use std::path::Component::{CurDir, Normal, ParentDir, Prefix, RootDir};
        match comp {
            CurDir => {}
            ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            Prefix(_) | RootDir | Normal(_) => out.push(comp.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Normalizes any filename string into a stable identity key, memoizing
/// results in a process-wide table.
pub struct PathCanonicalizer {
    case_sensitive: bool,
    cwd: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl Default for PathCanonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCanonicalizer {
    /// Probes case-sensitivity and captures the current working directory.
    pub fn new() -> Self {
        let case_sensitive = case_sensitive_file_system();
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        #[cfg(feature = "trace")]
        trace!("path canonicalizer: case_sensitive={case_sensitive}");
        Self {
            case_sensitive,
            cwd,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the probed filesystem folds case (test/host override hook).
    pub fn with_case_sensitivity(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Returns the canonical key for `filename`, memoized.
    pub fn canonic(&self, filename: &str) -> String {
        if is_synthetic(filename) {
            return filename.to_string();
        }
        if let Some(hit) = self.cache.lock().unwrap().get(filename) {
            return hit.clone();
        }
        let abs = if Path::new(filename).is_absolute() {
            PathBuf::from(filename)
        } else {
            self.cwd.join(filename)
        };
        let mut normalized = normpath(&abs).to_string_lossy().into_owned();
        if !self.case_sensitive {
            normalized = normalized.to_lowercase();
        }
        self.cache
            .lock()
            .unwrap()
            .insert(filename.to_string(), normalized.clone());
        normalized
    }

    /// Yields `abs_path` itself plus, when applicable, its path relative to
    /// the current working directory and that relative path prefixed with
    /// `./` — the set of string forms a frame's filename field may report
    /// for the same file (mirrors `bdb.py`'s `all_pathnames`).
    pub fn related_paths(&self, abs_path: &str) -> Vec<String> {
        let mut out = vec![abs_path.to_string()];
        if is_synthetic(abs_path) {
            return out;
        }
        let abs = Path::new(abs_path);
        if let Ok(rel) = abs.strip_prefix(&self.cwd) {
            if rel.as_os_str().is_empty() {
                return out;
            }
            let rel_str = rel.to_string_lossy().into_owned();
            if Path::new(&rel_str).is_file() {
                out.push(rel_str.clone());
            }
            let dotted = format!(".{}{rel_str}", std::path::MAIN_SEPARATOR);
            if Path::new(&dotted).is_file() {
                out.push(dotted);
            }
        }
        out
    }
}

/// A `<...>`-bracketed synthetic name denotes a compile unit with no real
/// file backing it (e.g. a string compiled for `eval`/`exec`-style use).
pub fn is_synthetic(filename: &str) -> bool {
    filename.starts_with('<') && filename.ends_with('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_passes_through() {
        let c = PathCanonicalizer::new();
        assert_eq!(c.canonic("<string>"), "<string>");
        assert_eq!(c.canonic("<stdin>"), "<stdin>");
    }

    #[test]
    fn relative_paths_become_absolute() {
        let c = PathCanonicalizer::new().with_case_sensitivity(true);
        let rel = c.canonic("a/b.py");
        assert!(Path::new(&rel).is_absolute());
        assert!(rel.ends_with("a/b.py") || rel.ends_with("a\\b.py"));
    }

    #[test]
    fn memoizes_results() {
        let c = PathCanonicalizer::new();
        let first = c.canonic("x.py");
        let second = c.canonic("x.py");
        assert_eq!(first, second);
    }

    #[test]
    fn case_insensitive_host_lowercases() {
        let c = PathCanonicalizer::new().with_case_sensitivity(false);
        assert_eq!(c.canonic("/tmp/Foo.py"), c.canonic("/tmp/foo.py"));
    }

    #[test]
    fn case_sensitive_host_keeps_distinct() {
        let c = PathCanonicalizer::new().with_case_sensitivity(true);
        assert_ne!(c.canonic("/tmp/Foo.py"), c.canonic("/tmp/foo.py"));
    }

    #[test]
    fn dotdot_components_collapse() {
        let c = PathCanonicalizer::new().with_case_sensitivity(true);
        let a = c.canonic("/tmp/a/../b.py");
        assert_eq!(a, "/tmp/b.py");
    }
}
