//! codeunit.rs — Compiled code units and the host capabilities that produce
//! them.
//!
//! The core never reads a filesystem or compiles a language on its own
//! (spec.md §1 Non-goals). Two small capability traits stand in for those
//! host services, the same pattern `vitte-debugger`'s `eval::EvalEnv` and
//! `hook::SourceMapper` use for the VM's evaluator and source maps.

use crate::error::DbgError;

/// A compiled piece of source: a module body, function body, class body, or
/// comprehension, with its own first line and line table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUnit {
    /// First line of this code unit (the `def`/`class` header line, or the
    /// module's first line for the top-level unit).
    pub first_line: u32,
    /// Name of the unit ("" or a module name at top level). Names starting
    /// with `<` (e.g. `<listcomp>`) mark synthetic units and are excluded
    /// from breakpoint resolution, mirroring how CPython's own comprehension
    /// code objects are skipped by `bdb.py`'s `_distance`.
    pub name: String,
    /// Executable statement lines, ascending, with gaps for blank/comment
    /// lines. Includes `first_line` itself.
    pub executable_lines: Vec<u32>,
    /// Nested inner code units (functions/classes/comprehensions defined
    /// directly inside this one).
    pub inner: Vec<CodeUnit>,
}

impl CodeUnit {
    /// The derived generator spec.md §3 calls `executable_lines(code)`:
    /// sorted, de-duplicated executable statement lines of this unit alone
    /// (not its nested units).
    pub fn executable_lines(&self) -> Vec<u32> {
        let mut lines = self.executable_lines.clone();
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    /// Non-synthetic inner units, i.e. those eligible for breakpoint
    /// resolution (name does not start with `<`).
    pub fn resolvable_inner(&self) -> impl Iterator<Item = &CodeUnit> {
        self.inner.iter().filter(|c| !c.name.starts_with('<'))
    }
}

/// Loads a file's source lines plus an opaque identity used to detect edits
/// between `restart()` calls. Mirrors `linecache.getlines` plus the cache
/// identity comparison in `BdbModule.reset`.
pub trait SourceProvider: Send + Sync {
    /// Returns the file's lines (without trailing newlines) and an identity
    /// token that changes whenever the content changes. `None` when the
    /// file cannot be read.
    fn load(&self, canonical_path: &str) -> Option<(u64, Vec<String>)>;
}

/// Compiles joined source text into a `CodeUnit` tree. A `SourceCompiler`
/// failure becomes `DbgError::Syntax`.
pub trait SourceCompiler: Send + Sync {
    /// Compiles `source` (already newline-terminated) as `filename`.
    ///
    /// # Errors
    /// Returns `DbgError::Syntax` when the source does not compile.
    fn compile(&self, filename: &str, source: &str) -> Result<CodeUnit, DbgError>;
}
