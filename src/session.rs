//! session.rs — The trace dispatcher and session state.
//!
//! `Session` is the direct port of `bdb.py`'s `Bdb` class: it owns the
//! canonical-path table, the module index, the breakpoint registry, and the
//! stepping state, and exposes the trace dispatch entry points plus the
//! stepping/breakpoint mutator methods a UI drives it with. It is
//! deliberately `!Sync` — per spec.md §5, multi-thread hosting is an outer
//! concern; one `Session` belongs to one traced thread.

use crate::breakpoint::{Address, BreakpointRegistry, CondEval};
use crate::canon::PathCanonicalizer;
use crate::codeunit::{SourceCompiler, SourceProvider};
use crate::config::DebuggerConfig;
use crate::error::{DbgError, DbgResult};
use crate::frame::{Frame, FrameId};
use crate::module::ModuleRegistry;
use crate::step::SteppingState;
use crate::trace::TraceSlots;

#[cfg(feature = "trace")]
use log::{debug, trace};

/// The list of breakpoint numbers that fired at a `line` event, and the
/// subset of those that were temporary and have already been deleted.
pub type BreakpointHits = (Vec<u32>, Vec<u32>);

/// An event delivered by the host's trace callback (spec.md §6).
pub enum TraceEvent<'a> {
    Line,
    Call,
    Return { return_value: Option<&'a str> },
    /// `info` is whatever textual rendering of the exception the host
    /// chooses to pass through; the core does not interpret it (Non-goal:
    /// the core does not itself interpret any language).
    Exception { info: &'a str },
}

/// What the host should do with its per-frame trace slot after a dispatch
/// call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceControl {
    /// Keep delivering events for this frame.
    Continue,
    /// Stop delivering events for this frame (the dispatcher returned nil).
    StopTracing,
}

/// The four user-facing stop callbacks a UI implements (spec.md §6).
/// All are synchronous: the call blocks the traced thread until it returns,
/// per the cooperative single-threaded model (spec.md §5).
pub trait UserHooks {
    fn user_call(&mut self, frame: &Frame);
    fn user_line(&mut self, frame: &Frame, hits: Option<&BreakpointHits>);
    fn user_return(&mut self, frame: &Frame, return_value: Option<&str>);
    fn user_exception(&mut self, frame: &Frame, info: &str);
}

/// The debugger core: canonical paths, module index, breakpoints, stepping
/// state, and the dispatch loop that ties them together.
pub struct Session {
    canon: PathCanonicalizer,
    modules: ModuleRegistry,
    breakpoints: BreakpointRegistry,
    step: SteppingState,
    trace_slots: TraceSlots,
    config: DebuggerConfig,
    cond_eval: Box<dyn CondEval>,

    quitting: bool,
    /// False when the session was started by `set_trace` — per spec.md
    /// §4.4, a `set_trace` session must let the program continue after
    /// `set_quit` rather than raising `Quit` all the way out, since there is
    /// no runner frame above it to catch the unwind.
    quit_raises: bool,
    ignore_first_call_armed: bool,
    tracing_enabled: bool,
    botframe: Option<FrameId>,
    topframe: Option<FrameId>,
}

impl Session {
    pub fn new(compiler: Box<dyn SourceCompiler>, source: Box<dyn SourceProvider>, cond_eval: Box<dyn CondEval>, config: DebuggerConfig) -> Self {
        let ignore_first_call_armed = config.ignore_first_call_event;
        Self {
            canon: PathCanonicalizer::new(),
            modules: ModuleRegistry::new(compiler, source),
            breakpoints: BreakpointRegistry::new(),
            step: SteppingState::default(),
            trace_slots: TraceSlots::new(),
            config,
            cond_eval,
            quitting: false,
            quit_raises: false,
            ignore_first_call_armed,
            tracing_enabled: false,
            botframe: None,
            topframe: None,
        }
    }

    fn canonic(&self, path: &str) -> String {
        self.canon.canonic(path)
    }

    // ---- lifecycle -------------------------------------------------

    /// Resets stepping state for a fresh `run`/`runeval`/`runcall` entry.
    /// `bottom` is the frame tracing starts from (the runner's entry
    /// frame); `ignore_first_call_event` matches spec.md §6's table
    /// (`true` for `run`/`runeval`, `false` for `runcall`).
    pub(crate) fn reset_for_run(&mut self, bottom: FrameId, ignore_first_call_event: bool) {
        self.quitting = false;
        self.quit_raises = true;
        self.ignore_first_call_armed = ignore_first_call_event;
        self.botframe = Some(bottom);
        self.topframe = None;
        self.tracing_enabled = true;
        self.trace_slots.enable(bottom);
        self.step.set_step();
        #[cfg(feature = "trace")]
        trace!("session reset for run, bottom frame {bottom}");
    }

    /// Starts debugging from an already-running call chain (`set_trace`).
    /// `chain` is top-first; its last element is the oldest frame tracing
    /// extends to.
    pub fn set_trace(&mut self, chain: &[Frame]) {
        self.quitting = false;
        self.quit_raises = false;
        self.ignore_first_call_armed = false;
        self.tracing_enabled = true;
        self.topframe = chain.first().map(|f| f.id);
        self.botframe = chain.last().map(|f| f.id);
        for f in chain {
            self.trace_slots.enable(f.id);
        }
        self.step.set_step();
        #[cfg(feature = "trace")]
        debug!("set_trace: tracing {} frame(s)", chain.len());
    }

    /// Stops tracing entirely: clears the host's trace callback (the
    /// caller's responsibility) and every per-frame trace slot.
    pub(crate) fn stop_tracing(&mut self) {
        self.tracing_enabled = false;
        self.trace_slots.clear();
        #[cfg(feature = "trace")]
        trace!("tracing stopped");
    }

    // ---- stepping commands (spec.md §4.3) ---------------------------

    pub fn set_step(&mut self) {
        self.step.set_step();
    }

    pub fn set_next(&mut self, frame: FrameId) {
        self.step.set_next(frame);
        self.trace_slots.enable(frame);
    }

    pub fn set_return(&mut self, frame: FrameId) {
        self.step.set_return(frame);
        self.trace_slots.enable(frame);
    }

    pub fn set_until(&mut self, frame: FrameId, current_line: u32, lineno: Option<u32>) {
        self.step.set_until(frame, lineno.unwrap_or(current_line + 1));
        self.trace_slots.enable(frame);
    }

    /// Don't stop except at breakpoints, or when finished. Tears down
    /// tracing entirely if no breakpoint is left anywhere, for zero
    /// overhead.
    pub fn set_continue(&mut self) {
        self.step.set_continue();
        if !self.breakpoints.has_breaks() {
            self.stop_tracing();
        }
    }

    pub fn set_quit(&mut self) {
        self.quitting = true;
        self.stop_tracing();
        #[cfg(feature = "trace")]
        trace!("set_quit");
    }

    // ---- breakpoint commands (spec.md §4.6) -------------------------

    /// # Errors
    /// `DbgError::Source` if the file/function can't be resolved,
    /// `DbgError::Syntax` if the file doesn't compile.
    pub fn set_break(
        &mut self,
        file: &str,
        line: u32,
        temporary: bool,
        cond: Option<String>,
        funcname: Option<&str>,
        current_chain: &[Frame],
    ) -> DbgResult<u32> {
        let canonical = self.canonic(file);
        let resolve_line = if let Some(name) = funcname {
            self.modules.get(&canonical)?.get_func_lno(name)?
        } else {
            line
        };
        let addr = self.modules.get(&canonical)?.get_actual_bp(resolve_line)?;
        let id = self.breakpoints.set_break(&canonical, line, addr, temporary, cond);
        for f in current_chain {
            if self.canonic(&f.source_path) == canonical && f.code_first_line == addr.0 {
                self.trace_slots.enable(f.id);
            }
        }
        #[cfg(feature = "trace")]
        debug!("breakpoint {id} set at {canonical}:{line} (resolved {addr:?})");
        Ok(id)
    }

    /// # Errors
    /// `DbgError::BadBreakpointReference` if none is set at that line.
    pub fn clear_break(&mut self, file: &str, line: u32) -> DbgResult<()> {
        let canonical = self.canonic(file);
        self.breakpoints.clear_break(&canonical, line)
    }

    /// # Errors
    /// `DbgError::BadBreakpointReference` if out of range or already deleted.
    pub fn clear_bpbynumber(&mut self, number: u32) -> DbgResult<()> {
        self.breakpoints.clear_bpbynumber(number)
    }

    pub fn clear_all_breaks(&mut self) {
        self.breakpoints.clear_all_breaks();
    }

    pub fn get_breaks(&self, file: &str, line: u32) -> Vec<&crate::breakpoint::Breakpoint> {
        let canonical = self.canonic(file);
        self.breakpoints.get_breaks(&canonical, line)
    }

    pub fn get_file_breaks(&self, file: &str) -> Vec<u32> {
        let canonical = self.canonic(file);
        self.breakpoints.get_file_breaks(&canonical)
    }

    pub fn has_breaks(&self) -> bool {
        self.breakpoints.has_breaks()
    }

    pub fn get_bpbynumber(&self, number: u32) -> DbgResult<&crate::breakpoint::Breakpoint> {
        self.breakpoints.get_bpbynumber(number)
    }

    pub fn get_bpbynumber_mut(&mut self, number: u32) -> DbgResult<&mut crate::breakpoint::Breakpoint> {
        self.breakpoints.get_bpbynumber_mut(number)
    }

    /// Drops every stale compiled module so the next access recompiles it.
    /// A host calls this once after a batch of source edits, then calls
    /// [`Self::restart_file`] for each file it knows had live breakpoints.
    pub fn restart(&mut self) {
        self.modules.invalidate_stale();
        #[cfg(feature = "trace")]
        trace!("restart: stale modules invalidated");
    }

    /// Rebinds every breakpoint set in `file` against its freshly compiled
    /// form, dropping the ones that no longer resolve.
    ///
    /// # Errors
    /// Propagates a `DbgError::Syntax` if `file` fails to recompile.
    pub fn restart_file(&mut self, file: &str) -> DbgResult<()> {
        let canonical = self.canonic(file);
        self.modules.get(&canonical)?;
        let modules = &self.modules;
        self.breakpoints
            .rebind_file(&canonical, |line| modules.peek(&canonical).and_then(|m| m.get_actual_bp(line).ok()));
        #[cfg(feature = "trace")]
        debug!("restart_file: rebound breakpoints in {canonical}");
        Ok(())
    }

    // ---- stack inspection (spec.md §6) ------------------------------

    /// Walks from the bottom frame up through `chain`, then appends
    /// `traceback_tail` in order, returning `(stack, focus_index)`.
    pub fn get_stack(&self, chain: &[Frame], traceback_tail: &[Frame]) -> (Vec<(FrameId, u32)>, usize) {
        let mut collected = Vec::new();
        for f in chain {
            collected.push((f.id, f.line));
            if Some(f.id) == self.botframe {
                break;
            }
        }
        collected.reverse();
        let focus = collected.len().saturating_sub(1);
        for f in traceback_tail {
            collected.push((f.id, f.line));
        }
        (collected, focus)
    }

    // ---- trace dispatch (spec.md §4.4) ------------------------------

    fn stop_here(&self, frame: &Frame) -> bool {
        if self.config.is_skipped_module(frame.module_name.as_deref()) {
            return false;
        }
        self.step.stop_here(frame.id, frame.line)
    }

    fn break_here(&mut self, frame: &Frame) -> Option<BreakpointHits> {
        let canonical = self.canonic(&frame.source_path);
        let addr: Address = (frame.code_first_line, frame.line);
        let effective = self.breakpoints.process_hit(&canonical, addr, frame.id, self.cond_eval.as_ref())?;
        let temporaries: Vec<u32> = effective
            .iter()
            .copied()
            .filter(|id| self.breakpoints.get_bpbynumber(*id).is_err())
            .collect();
        Some((effective, temporaries))
    }

    fn break_at_function(&self, frame: &Frame) -> bool {
        let canonical = self.canonic(&frame.source_path);
        self.breakpoints.has_break_in_unit(&canonical, frame.code_first_line)
    }

    fn get_trace_function(&self) -> DbgResult<TraceControl> {
        if self.quitting {
            if self.quit_raises {
                #[cfg(feature = "trace")]
                trace!("quitting: raising Quit");
                return Err(DbgError::Quit);
            }
            return Ok(TraceControl::StopTracing);
        }
        if !self.tracing_enabled {
            return Ok(TraceControl::StopTracing);
        }
        Ok(TraceControl::Continue)
    }

    /// The single entry point a host's trace callback calls for every
    /// event. `chain` is the current call stack, top frame (the one the
    /// event concerns) first.
    ///
    /// Checked before any event-specific logic runs: once tracing has been
    /// torn down (`set_continue` with no breakpoints left, bottom frame
    /// returned, explicit quit) every subsequent event is refused outright,
    /// per spec.md §5's "quitting poisons the dispatcher" and "tears down
    /// host tracing" properties — a host must stop receiving `Continue`
    /// immediately, not only after the next stop/break would have fired.
    ///
    /// # Errors
    /// `DbgError::Quit` when the session is unwinding after `set_quit`.
    pub fn dispatch(&mut self, chain: &[Frame], event: TraceEvent<'_>, hooks: &mut dyn UserHooks) -> DbgResult<TraceControl> {
        if self.get_trace_function()? == TraceControl::StopTracing {
            return Ok(TraceControl::StopTracing);
        }
        let Some(top) = chain.first() else {
            return Ok(TraceControl::StopTracing);
        };
        match event {
            TraceEvent::Line => self.dispatch_line(top, hooks),
            TraceEvent::Call => self.dispatch_call(top, hooks),
            TraceEvent::Return { return_value } => self.dispatch_return(chain, return_value, hooks),
            TraceEvent::Exception { info } => self.dispatch_exception(top, info, hooks),
        }
    }

    fn enter_user_callback(&mut self, frame: &Frame) {
        if self.botframe.is_none() {
            self.botframe = Some(frame.id);
        }
        self.topframe = Some(frame.id);
    }

    fn leave_user_callback(&mut self) {
        self.topframe = None;
    }

    fn dispatch_line(&mut self, top: &Frame, hooks: &mut dyn UserHooks) -> DbgResult<TraceControl> {
        if self.stop_here(top) {
            self.enter_user_callback(top);
            hooks.user_line(top, None);
            self.leave_user_callback();
            return self.get_trace_function();
        }
        if let Some(hits) = self.break_here(top) {
            if !hits.0.is_empty() {
                self.enter_user_callback(top);
                hooks.user_line(top, Some(&hits));
                self.leave_user_callback();
                return self.get_trace_function();
            }
        }
        Ok(TraceControl::Continue)
    }

    fn dispatch_call(&mut self, top: &Frame, hooks: &mut dyn UserHooks) -> DbgResult<TraceControl> {
        if self.ignore_first_call_armed {
            self.ignore_first_call_armed = false;
            return Ok(TraceControl::Continue);
        }
        let stop = self.stop_here(top);
        if !stop && !self.break_at_function(top) {
            return Ok(TraceControl::StopTracing);
        }
        if stop {
            self.enter_user_callback(top);
            hooks.user_call(top);
            self.leave_user_callback();
            return self.get_trace_function();
        }
        Ok(TraceControl::Continue)
    }

    fn dispatch_return(&mut self, chain: &[Frame], return_value: Option<&str>, hooks: &mut dyn UserHooks) -> DbgResult<TraceControl> {
        let top = &chain[0];
        if self.stop_here(top) || self.step.stop_on_return(top.id) {
            self.enter_user_callback(top);
            hooks.user_return(top, return_value);
            self.leave_user_callback();
            let control = self.get_trace_function()?;
            if control == TraceControl::StopTracing {
                return Ok(control);
            }
            let resets_to_step = self.step.is_step_sentinel() || self.step.stopframe() == Some(top.id);
            if Some(top.id) != self.botframe && resets_to_step {
                if let Some(caller) = chain.get(1) {
                    if !self.trace_slots.is_traced(caller.id) {
                        self.trace_slots.enable(caller.id);
                    }
                }
                self.step.set_step();
            }
        }
        if Some(top.id) == self.botframe {
            self.stop_tracing();
            return Ok(TraceControl::StopTracing);
        }
        Ok(TraceControl::Continue)
    }

    fn dispatch_exception(&mut self, top: &Frame, info: &str, hooks: &mut dyn UserHooks) -> DbgResult<TraceControl> {
        if self.stop_here(top) {
            self.enter_user_callback(top);
            hooks.user_exception(top, info);
            self.leave_user_callback();
            return self.get_trace_function();
        }
        Ok(TraceControl::Continue)
    }
}
