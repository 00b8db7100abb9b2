//! module.rs — Per-file compiled index and breakpoint-line resolution.
//!
//! This is the direct port of `bdb.py`'s `BdbModule.get_actual_bp`: given a
//! requested line number, find the nearest executable statement at or after
//! it, preferring the innermost nested function/class whose body contains
//! it. The algorithm walks the `CodeUnit` tree the same way the original
//! walks nested code objects, using a binary search (`partition_point`,
//! Rust's `bisect_right`) at each level instead of scanning line tables by
//! hand.

use std::collections::BTreeMap;

use crate::codeunit::{CodeUnit, SourceCompiler, SourceProvider};
use crate::error::{DbgError, DbgResult};

/// A compiled file: its source identity, line table, and code unit tree.
pub struct ModuleIndex {
    filename: String,
    identity: u64,
    root: CodeUnit,
    functions_firstlno: BTreeMap<String, u32>,
}

impl ModuleIndex {
    fn build(filename: &str, identity: u64, root: CodeUnit) -> Self {
        let mut functions_firstlno = BTreeMap::new();
        collect_function_lines(&root, String::new(), &mut functions_firstlno);
        Self {
            filename: filename.to_string(),
            identity,
            root,
            functions_firstlno,
        }
    }

    /// The canonical filename this index was built for.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The first line number of the last-defined `funcname` function or
    /// qualified `Class.method` name.
    ///
    /// # Errors
    /// `DbgError::Source` when no such function exists.
    pub fn get_func_lno(&self, funcname: &str) -> DbgResult<u32> {
        self.functions_firstlno.get(funcname).copied().ok_or_else(|| {
            DbgError::Source(format!(
                "{}: function \"{funcname}\" not found.",
                self.filename
            ))
        })
    }

    /// Resolves a requested line number to the actual `(code_first_line,
    /// actual_line)` pair a breakpoint at that line should bind to.
    ///
    /// # Errors
    /// `DbgError::Source` when `lineno` is past the last executable
    /// statement in the file.
    pub fn get_actual_bp(&self, lineno: u32) -> DbgResult<(u32, u32)> {
        distance(&self.root, lineno, true)
            .map(|(_, pair)| pair)
            .ok_or_else(|| {
                DbgError::Source(format!(
                    "{}: line {lineno} is after the last valid statement.",
                    self.filename
                ))
            })
    }
}

/// Recursively builds the `Class.method`-qualified function/method table.
/// Later definitions of the same name win, mirroring the original's "last
/// defined `funcname`" semantics (a `def` re-executed at module scope
/// replaces the previous one's mapping).
fn collect_function_lines(unit: &CodeUnit, prefix: String, out: &mut BTreeMap<String, u32>) {
    for child in unit.resolvable_inner() {
        let qualified = if prefix.is_empty() {
            child.name.clone()
        } else {
            format!("{prefix}.{}", child.name)
        };
        out.insert(qualified.clone(), child.first_line);
        collect_function_lines(child, qualified, out);
    }
}

/// The shortest distance to the next valid statement at or after `lineno`,
/// returned as `(distance, (code_first_line, actual_line))`. `module_level`
/// suppresses matching a unit's own header line (its `def`/`class` line is
/// not a stoppable statement, except for the top-level module body).
fn distance(unit: &CodeUnit, lineno: u32, module_level: bool) -> Option<(i64, (u32, u32))> {
    let mut subcodes: BTreeMap<u32, &CodeUnit> = BTreeMap::new();
    for child in unit.resolvable_inner() {
        subcodes.insert(child.first_line, child);
    }
    let subcodes_flnos: Vec<u32> = subcodes.keys().copied().collect();

    let sub_idx = subcodes_flnos.partition_point(|&f| f <= lineno);
    let subcode_dist = if sub_idx != 0 {
        let flno = subcodes_flnos[sub_idx - 1];
        distance(subcodes[&flno], lineno, false)
    } else {
        None
    };

    let mut code_lnos = unit.executable_lines();
    if !module_level && code_lnos.len() > 1 {
        code_lnos.remove(0);
    }
    if code_lnos.binary_search(&lineno).is_ok() && subcodes_flnos.binary_search(&lineno).is_err() {
        return Some((0, (unit.first_line, lineno)));
    }

    let idx = code_lnos.partition_point(|&l| l <= lineno);
    if idx == code_lnos.len() {
        return subcode_dist;
    }
    let actual_lno = code_lnos[idx];
    let dist = i64::from(actual_lno) - i64::from(lineno);
    if let Some(sd) = subcode_dist {
        if sd.0 < dist {
            return Some(sd);
        }
    }
    if subcodes_flnos.binary_search(&actual_lno).is_err() {
        Some((dist, (unit.first_line, actual_lno)))
    } else {
        distance(subcodes[&actual_lno], lineno, false)
    }
}

/// Loads and memoizes `ModuleIndex` instances by canonical filename, and
/// re-derives them when the host reports a content change (mirrors
/// `BdbModule.reset`'s identity check against `linecache.cache`).
pub struct ModuleRegistry {
    compiler: Box<dyn SourceCompiler>,
    source: Box<dyn SourceProvider>,
    modules: BTreeMap<String, ModuleIndex>,
}

impl ModuleRegistry {
    pub fn new(compiler: Box<dyn SourceCompiler>, source: Box<dyn SourceProvider>) -> Self {
        Self {
            compiler,
            source,
            modules: BTreeMap::new(),
        }
    }

    /// Returns the index for `canonical_path`, compiling it on first use or
    /// after the host reports a new content identity.
    ///
    /// # Errors
    /// `DbgError::Source` when the file cannot be read, `DbgError::Syntax`
    /// when it fails to compile.
    pub fn get(&mut self, canonical_path: &str) -> DbgResult<&ModuleIndex> {
        let needs_reload = match self.modules.get(canonical_path) {
            Some(existing) => {
                let Some((identity, _)) = self.source.load(canonical_path) else {
                    return Err(DbgError::Source(format!(
                        "{canonical_path}: no lines in file."
                    )));
                };
                identity != existing.identity
            }
            None => true,
        };
        if needs_reload {
            let Some((identity, lines)) = self.source.load(canonical_path) else {
                return Err(DbgError::Source(format!(
                    "{canonical_path}: no lines in file."
                )));
            };
            if lines.is_empty() {
                return Err(DbgError::Source(format!(
                    "{canonical_path}: no lines in file."
                )));
            }
            let mut source = lines.join("\n");
            source.push('\n');
            let root = self.compiler.compile(canonical_path, &source)?;
            self.modules
                .insert(canonical_path.to_string(), ModuleIndex::build(canonical_path, identity, root));
        }
        Ok(self.modules.get(canonical_path).expect("just inserted"))
    }

    /// Returns the cached index for `canonical_path` without reloading it.
    /// Used by breakpoint rebinding, which always calls [`Self::get`] once
    /// up front to force a fresh compile and only needs read-only access
    /// afterward.
    pub fn peek(&self, canonical_path: &str) -> Option<&ModuleIndex> {
        self.modules.get(canonical_path)
    }

    /// Drops every cached index whose source has changed since it was
    /// compiled, so the next `get()` recompiles it. Called from
    /// `Session::restart` (per spec.md §7 "restart after edit").
    pub fn invalidate_stale(&mut self) {
        let stale: Vec<String> = self
            .modules
            .iter()
            .filter(|(path, idx)| {
                self.source
                    .load(path)
                    .is_none_or(|(identity, _)| identity != idx.identity)
            })
            .map(|(path, _)| path.clone())
            .collect();
        for path in stale {
            self.modules.remove(&path);
        }
    }
}
