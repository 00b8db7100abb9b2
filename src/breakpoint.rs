//! breakpoint.rs — The breakpoint registry.
//!
//! Ported from `bdb.py`'s `Breakpoint`/`ModuleBreakpoints` pair: a dense,
//! never-reused numbering (`bpbynumber`) for user-facing references, and a
//! per-file `(code_first_line -> actual_line -> [id])` bucket map for O(log n)
//! hit lookup. Line resolution itself (`get_actual_bp`) is `module.rs`'s job;
//! this module only ever sees already-resolved `(first_line, actual_line)`
//! pairs, handed to it by `Session`.

use std::collections::BTreeMap;

use crate::error::{DbgError, DbgResult};
use crate::frame::FrameId;

/// A resolved breakpoint location within one file.
pub type Address = (u32, u32);

/// One breakpoint. Mirrors every field of `bdb.py`'s `Breakpoint` except
/// `module`/`bpbynumber`, which are owned by the registry instead.
#[derive(Debug, Clone)]
pub struct Breakpoint {
    /// Dense, never-reused identity (`bpbynumber` index).
    pub id: u32,
    /// Canonical file this breakpoint is set in.
    pub file: String,
    /// Line number as the user requested it.
    pub requested_line: u32,
    /// Resolved `(code_first_line, actual_line)` this breakpoint is bound to.
    pub actual: Address,
    /// Deleted automatically after its next qualifying hit.
    pub temporary: bool,
    /// Stop-only-if expression text, evaluated by a `CondEval`.
    pub cond: Option<String>,
    pub enabled: bool,
    /// Hits remaining to ignore before stopping is allowed again.
    pub ignore: u32,
    /// Total times this breakpoint's line was reached while enabled.
    pub hits: u32,
}

impl Breakpoint {
    fn new(id: u32, file: String, requested_line: u32, actual: Address, temporary: bool, cond: Option<String>) -> Self {
        Self {
            id,
            file,
            requested_line,
            actual,
            temporary,
            cond,
            enabled: true,
            ignore: 0,
            hits: 0,
        }
    }
}

/// Evaluates a breakpoint's condition expression against a live frame.
/// Implemented by the host, or by this crate's built-in `eval` module for
/// the bundled mini-language (spec.md §4.0 "Host capabilities").
pub trait CondEval: Send + Sync {
    /// Evaluates `expr` as a boolean in the context of `frame`.
    ///
    /// # Errors
    /// Any evaluation failure (unknown name, type error, syntax error). Per
    /// `process_hit_event`'s documented behavior, the caller treats an
    /// evaluation error as "stop" — the conservative choice — so the error
    /// value itself is never surfaced to the user.
    fn eval_bool(&self, frame: FrameId, expr: &str) -> DbgResult<bool>;
}

type LineBuckets = BTreeMap<u32, Vec<u32>>;

#[derive(Default)]
struct FileBreaks {
    /// code_first_line -> actual_line -> breakpoint ids at that line.
    by_first_line: BTreeMap<u32, LineBuckets>,
}

/// Owns every breakpoint, indexed both by dense number and by file location.
#[derive(Default)]
pub struct BreakpointRegistry {
    next_id: u32,
    bpbynumber: Vec<Option<Breakpoint>>,
    by_file: BTreeMap<String, FileBreaks>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            bpbynumber: vec![None],
            by_file: BTreeMap::new(),
        }
    }

    /// Registers a new breakpoint at an already-resolved location.
    pub fn set_break(
        &mut self,
        file: &str,
        requested_line: u32,
        actual: Address,
        temporary: bool,
        cond: Option<String>,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let bp = Breakpoint::new(id, file.to_string(), requested_line, actual, temporary, cond);
        self.bpbynumber.push(Some(bp));
        self.by_file
            .entry(file.to_string())
            .or_default()
            .by_first_line
            .entry(actual.0)
            .or_default()
            .entry(actual.1)
            .or_default()
            .push(id);
        id
    }

    /// Deletes every breakpoint whose user-requested line is `line` in
    /// `file`.
    ///
    /// # Errors
    /// `DbgError::BadBreakpointReference` when none is set there.
    pub fn clear_break(&mut self, file: &str, line: u32) -> DbgResult<()> {
        let ids: Vec<u32> = self
            .get_breaks(file, line)
            .iter()
            .map(|bp| bp.id)
            .collect();
        if ids.is_empty() {
            return Err(DbgError::BadBreakpointReference(format!(
                "there is no breakpoint at {file}:{line}"
            )));
        }
        for id in ids {
            self.delete(id);
        }
        Ok(())
    }

    /// Deletes the breakpoint numbered `number`.
    ///
    /// # Errors
    /// `DbgError::BadBreakpointReference` when out of range or already
    /// deleted.
    pub fn clear_bpbynumber(&mut self, number: u32) -> DbgResult<()> {
        self.get_bpbynumber(number)?;
        self.delete(number);
        Ok(())
    }

    /// Deletes every breakpoint currently set.
    pub fn clear_all_breaks(&mut self) {
        let ids: Vec<u32> = self
            .bpbynumber
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, bp)| bp.as_ref().map(|_| i as u32))
            .collect();
        for id in ids {
            self.delete(id);
        }
    }

    fn delete(&mut self, id: u32) {
        let Some(slot) = self.bpbynumber.get_mut(id as usize) else {
            return;
        };
        let Some(bp) = slot.take() else { return };
        if let Some(file_breaks) = self.by_file.get_mut(&bp.file) {
            if let Some(line_bps) = file_breaks.by_first_line.get_mut(&bp.actual.0) {
                if let Some(ids) = line_bps.get_mut(&bp.actual.1) {
                    ids.retain(|&x| x != id);
                    if ids.is_empty() {
                        line_bps.remove(&bp.actual.1);
                    }
                }
                if line_bps.is_empty() {
                    file_breaks.by_first_line.remove(&bp.actual.0);
                }
            }
        }
    }

    /// Looks up a breakpoint by its dense number.
    ///
    /// # Errors
    /// `DbgError::BadBreakpointReference` when out of range or already
    /// deleted.
    pub fn get_bpbynumber(&self, number: u32) -> DbgResult<&Breakpoint> {
        self.bpbynumber
            .get(number as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                if (number as usize) < self.bpbynumber.len() {
                    DbgError::BadBreakpointReference(format!("breakpoint {number} already deleted"))
                } else {
                    DbgError::BadBreakpointReference(format!("breakpoint number {number} out of range"))
                }
            })
    }

    /// Mutable lookup, for adjusting `ignore`/`enabled`/`cond` in place.
    ///
    /// # Errors
    /// Same as [`Self::get_bpbynumber`].
    pub fn get_bpbynumber_mut(&mut self, number: u32) -> DbgResult<&mut Breakpoint> {
        let len = self.bpbynumber.len();
        self.bpbynumber
            .get_mut(number as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| {
                if (number as usize) < len {
                    DbgError::BadBreakpointReference(format!("breakpoint {number} already deleted"))
                } else {
                    DbgError::BadBreakpointReference(format!("breakpoint number {number} out of range"))
                }
            })
    }

    /// Every breakpoint whose *requested* line is `line`, sorted by number,
    /// regardless of which actual line it resolved to elsewhere on the same
    /// statement.
    pub fn get_breaks(&self, file: &str, line: u32) -> Vec<&Breakpoint> {
        let Some(file_breaks) = self.by_file.get(file) else {
            return Vec::new();
        };
        let mut out: Vec<&Breakpoint> = file_breaks
            .by_first_line
            .values()
            .flat_map(BTreeMap::values)
            .flatten()
            .filter_map(|id| self.bpbynumber.get(*id as usize).and_then(Option::as_ref))
            .filter(|bp| bp.requested_line == line)
            .collect();
        out.sort_by_key(|bp| bp.id);
        out
    }

    /// The requested lines of every breakpoint set in `file`.
    pub fn get_file_breaks(&self, file: &str) -> Vec<u32> {
        let mut out: Vec<u32> = self
            .by_file
            .get(file)
            .into_iter()
            .flat_map(|fb| fb.by_first_line.values())
            .flat_map(BTreeMap::values)
            .flatten()
            .filter_map(|id| self.bpbynumber.get(*id as usize).and_then(Option::as_ref))
            .map(|bp| bp.requested_line)
            .collect();
        out.sort_unstable();
        out
    }

    /// Whether any breakpoint is currently set anywhere.
    pub fn has_breaks(&self) -> bool {
        self.by_file.values().any(|fb| !fb.by_first_line.is_empty())
    }

    /// Whether `file` has a breakpoint whose code unit starts at
    /// `first_line` — used by `break_at_function` to decide whether a
    /// `call` event is worth tracing at all.
    pub fn has_break_in_unit(&self, file: &str, first_line: u32) -> bool {
        self.by_file
            .get(file)
            .is_some_and(|fb| fb.by_first_line.contains_key(&first_line))
    }

    /// Evaluates every breakpoint bound to exactly `(file, first_line,
    /// actual_line)` against `frame`, deleting qualifying temporaries
    /// immediately. Returns the sorted ids that should stop execution, or
    /// `None` when no breakpoint is bound there at all (as distinct from one
    /// bound there but not currently firing).
    pub fn process_hit(
        &mut self,
        file: &str,
        addr: Address,
        frame: FrameId,
        cond_eval: &dyn CondEval,
    ) -> Option<Vec<u32>> {
        let ids = self
            .by_file
            .get(file)?
            .by_first_line
            .get(&addr.0)?
            .get(&addr.1)?
            .clone();
        if ids.is_empty() {
            return None;
        }
        let mut effective = Vec::new();
        let mut to_delete = Vec::new();
        for id in ids {
            let Some(bp) = self.bpbynumber.get_mut(id as usize).and_then(Option::as_mut) else {
                continue;
            };
            if !bp.enabled {
                continue;
            }
            bp.hits += 1;
            if let Some(cond) = bp.cond.clone() {
                match cond_eval.eval_bool(frame, &cond) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => {
                        // Conservative: stop, but never auto-delete on a
                        // condition evaluation error.
                        effective.push(id);
                        continue;
                    }
                }
            }
            if bp.ignore > 0 {
                bp.ignore -= 1;
                continue;
            }
            effective.push(id);
            if bp.temporary {
                to_delete.push(id);
            }
        }
        for id in &to_delete {
            self.delete(*id);
        }
        effective.sort_unstable();
        Some(effective)
    }

    /// After a source file changes, re-resolves every breakpoint set in it
    /// against freshly computed `(first_line, actual_line)` pairs. A
    /// breakpoint whose line no longer resolves (`resolve` returns `None`)
    /// is dropped, mirroring `ModuleBreakpoints.reset`'s `bp.deleteMe()` on
    /// `BdbSourceError`. Every other field (`enabled`, `temporary`, `cond`,
    /// `ignore`, `hits`) survives the rebind unchanged — only the address
    /// moves.
    pub fn rebind_file(&mut self, file: &str, resolve: impl Fn(u32) -> Option<Address>) {
        let ids: Vec<u32> = self
            .by_file
            .get(file)
            .into_iter()
            .flat_map(|fb| fb.by_first_line.values())
            .flat_map(BTreeMap::values)
            .flatten()
            .copied()
            .collect();
        for id in ids {
            let Some(bp) = self.bpbynumber.get(id as usize).and_then(Option::as_ref) else {
                continue;
            };
            let requested_line = bp.requested_line;
            match resolve(requested_line) {
                Some(new_addr) => {
                    let mut updated = bp.clone();
                    updated.actual = new_addr;
                    self.delete(id);
                    if let Some(slot) = self.bpbynumber.get_mut(id as usize) {
                        *slot = Some(updated);
                    }
                    self.by_file
                        .entry(file.to_string())
                        .or_default()
                        .by_first_line
                        .entry(new_addr.0)
                        .or_default()
                        .entry(new_addr.1)
                        .or_default()
                        .push(id);
                }
                None => self.delete(id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysTrue;
    impl CondEval for AlwaysTrue {
        fn eval_bool(&self, _frame: FrameId, _expr: &str) -> DbgResult<bool> {
            Ok(true)
        }
    }

    struct AlwaysFalse;
    impl CondEval for AlwaysFalse {
        fn eval_bool(&self, _frame: FrameId, _expr: &str) -> DbgResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn set_and_hit_plain_breakpoint() {
        let mut reg = BreakpointRegistry::new();
        reg.set_break("f.py", 3, (1, 3), false, None);
        let hits = reg.process_hit("f.py", (1, 3), 1, &AlwaysTrue).unwrap();
        assert_eq!(hits, vec![1]);
        assert_eq!(reg.get_bpbynumber(1).unwrap().hits, 1);
    }

    #[test]
    fn temporary_deleted_after_one_hit() {
        let mut reg = BreakpointRegistry::new();
        reg.set_break("f.py", 3, (1, 3), true, None);
        let hits = reg.process_hit("f.py", (1, 3), 1, &AlwaysTrue).unwrap();
        assert_eq!(hits, vec![1]);
        assert!(reg.get_bpbynumber(1).is_err());
    }

    #[test]
    fn ignore_count_suppresses_then_survives() {
        let mut reg = BreakpointRegistry::new();
        reg.set_break("f.py", 3, (1, 3), false, None);
        reg.get_bpbynumber_mut(1).unwrap().ignore = 2;
        assert!(reg.process_hit("f.py", (1, 3), 1, &AlwaysTrue).unwrap().is_empty());
        assert!(reg.process_hit("f.py", (1, 3), 1, &AlwaysTrue).unwrap().is_empty());
        let hits = reg.process_hit("f.py", (1, 3), 1, &AlwaysTrue).unwrap();
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn disabled_breakpoint_never_counts_or_stops() {
        let mut reg = BreakpointRegistry::new();
        reg.set_break("f.py", 3, (1, 3), false, None);
        reg.get_bpbynumber_mut(1).unwrap().enabled = false;
        assert!(reg.process_hit("f.py", (1, 3), 1, &AlwaysTrue).unwrap().is_empty());
        assert_eq!(reg.get_bpbynumber(1).unwrap().hits, 0);
    }

    #[test]
    fn condition_false_skips_stop() {
        let mut reg = BreakpointRegistry::new();
        reg.set_break("f.py", 3, (1, 3), false, Some("x > 0".into()));
        assert!(reg.process_hit("f.py", (1, 3), 1, &AlwaysFalse).unwrap().is_empty());
        assert_eq!(reg.get_bpbynumber(1).unwrap().hits, 1);
    }

    #[test]
    fn clear_break_removes_all_at_line() {
        let mut reg = BreakpointRegistry::new();
        reg.set_break("f.py", 3, (1, 3), false, None);
        reg.set_break("f.py", 3, (1, 3), false, None);
        reg.clear_break("f.py", 3).unwrap();
        assert!(reg.get_bpbynumber(1).is_err());
        assert!(reg.get_bpbynumber(2).is_err());
        assert!(!reg.has_breaks());
    }

    #[test]
    fn clear_break_missing_is_an_error() {
        let mut reg = BreakpointRegistry::new();
        assert!(reg.clear_break("f.py", 3).is_err());
    }

    #[test]
    fn numbers_never_reused() {
        let mut reg = BreakpointRegistry::new();
        let a = reg.set_break("f.py", 3, (1, 3), false, None);
        reg.clear_bpbynumber(a).unwrap();
        let b = reg.set_break("f.py", 3, (1, 3), false, None);
        assert_ne!(a, b);
    }

    #[test]
    fn rebind_drops_breakpoints_whose_line_vanished() {
        let mut reg = BreakpointRegistry::new();
        reg.set_break("f.py", 3, (1, 3), false, None);
        reg.rebind_file("f.py", |_| None);
        assert!(reg.get_bpbynumber(1).is_err());
        assert!(!reg.has_breaks());
    }

    #[test]
    fn rebind_moves_breakpoint_to_new_address() {
        let mut reg = BreakpointRegistry::new();
        reg.set_break("f.py", 3, (1, 3), false, None);
        reg.rebind_file("f.py", |_| Some((1, 4)));
        assert!(reg.process_hit("f.py", (1, 3), 1, &AlwaysTrue).unwrap_or_default().is_empty());
        assert_eq!(reg.process_hit("f.py", (1, 4), 1, &AlwaysTrue).unwrap(), vec![1]);
    }

    #[test]
    fn rebind_preserves_condition_and_disabled_state() {
        let mut reg = BreakpointRegistry::new();
        reg.set_break("f.py", 3, (1, 3), false, Some("x > 0".into()));
        reg.get_bpbynumber_mut(1).unwrap().enabled = false;
        reg.get_bpbynumber_mut(1).unwrap().ignore = 2;
        reg.rebind_file("f.py", |_| Some((1, 4)));
        let bp = reg.get_bpbynumber(1).unwrap();
        assert_eq!(bp.actual, (1, 4));
        assert_eq!(bp.cond.as_deref(), Some("x > 0"));
        assert!(!bp.enabled);
        assert_eq!(bp.ignore, 2);
    }
}
