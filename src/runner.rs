//! runner.rs — Entry points that start a fresh debugging session.
//!
//! Ported from `bdb.py`'s `run`/`runeval`/`runcall`: each resets the
//! session's stepping state, installs tracing on the entry frame, invokes
//! the host-provided `body`, and tears tracing down again on every exit path
//! — including an early `Quit` — per spec.md §5's resource-discipline note.
//!
//! `bdb.py`'s own `run`/`runeval`/`runcall` only do `finally:
//! sys.settrace(None)` here — plain teardown, never `self.quitting = True`.
//! Setting `quitting` is reserved for an explicit, UI-driven `set_quit()`
//! call. This mirrors that: teardown uses the same internal primitive
//! `set_quit` itself uses to stop tracing, without also marking the session
//! as quit.

use crate::error::{DbgError, DbgResult};
use crate::frame::FrameId;
use crate::session::Session;

/// Runs `body` under the session's tracing discipline, resetting stepping
/// state first and guaranteeing the trace callback is uninstalled
/// afterward regardless of how `body` returns.
///
/// `entry_frame` identifies the frame the host will report as `chain[0]` for
/// every event `body` triggers; it becomes the session's bottom frame.
/// `ignore_first_call_event` matches spec.md §6's table: `true` for `run`
/// and `runeval`, `false` for `runcall` (whose entry frame already belongs
/// to the callee being debugged, not a wrapper).
///
/// A `DbgError::Quit` raised from inside `body` (via the session's own
/// dispatch calls) is swallowed here and turned into `Ok(None)`: per
/// `bdb.py`'s `run`, reaching the end of the run loop after `set_quit` is
/// not a reportable failure.
///
/// # Errors
/// Propagates any error `body` returns other than `DbgError::Quit`.
pub fn run<T>(
    session: &mut Session,
    entry_frame: FrameId,
    ignore_first_call_event: bool,
    body: impl FnOnce(&mut Session) -> DbgResult<T>,
) -> DbgResult<Option<T>> {
    session.reset_for_run(entry_frame, ignore_first_call_event);
    let result = body(session);
    session.stop_tracing();
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DbgError::Quit) => Ok(None),
        Err(other) => Err(other),
    }
}

/// `bdb.py`'s `run`: executes top-level code under tracing.
///
/// # Errors
/// See [`run`].
pub fn run_script<T>(session: &mut Session, entry_frame: FrameId, body: impl FnOnce(&mut Session) -> DbgResult<T>) -> DbgResult<Option<T>> {
    run(session, entry_frame, true, body)
}

/// `bdb.py`'s `runeval`: evaluates an expression under tracing, in the
/// caller's existing scope. Shares `run`'s reset/teardown discipline; the
/// distinction from [`run_script`] is purely in what the host's `body`
/// closure does (evaluate rather than execute a whole program).
///
/// # Errors
/// See [`run`].
pub fn run_eval<T>(session: &mut Session, entry_frame: FrameId, body: impl FnOnce(&mut Session) -> DbgResult<T>) -> DbgResult<Option<T>> {
    run(session, entry_frame, true, body)
}

/// `bdb.py`'s `runcall`: debugs a single call whose entry frame is the
/// callee itself, so the first `call` event delivered must not be skipped.
///
/// # Errors
/// See [`run`].
pub fn run_call<T>(session: &mut Session, entry_frame: FrameId, body: impl FnOnce(&mut Session) -> DbgResult<T>) -> DbgResult<Option<T>> {
    run(session, entry_frame, false, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codeunit::fixtures::{MemSource, ToyCompiler};
    use crate::config::DebuggerConfig;
    use crate::eval::{BuiltinCondEval, EvalEnvSource, Value};
    use crate::frame::Frame;
    use crate::session::{TraceControl, TraceEvent, UserHooks};
    use std::sync::Arc;

    struct ArcSource(Arc<MemSource>);
    impl crate::codeunit::SourceProvider for ArcSource {
        fn load(&self, canonical_path: &str) -> Option<(u64, Vec<String>)> {
            self.0.load(canonical_path)
        }
    }

    struct NoVars;
    impl EvalEnvSource for NoVars {
        fn get_var(&self, _frame: FrameId, _name: &str) -> Option<Value> {
            None
        }
    }

    struct NoopHooks;
    impl UserHooks for NoopHooks {
        fn user_call(&mut self, _frame: &Frame) {}
        fn user_line(&mut self, _frame: &Frame, _hits: Option<&crate::session::BreakpointHits>) {}
        fn user_return(&mut self, _frame: &Frame, _return_value: Option<&str>) {}
        fn user_exception(&mut self, _frame: &Frame, _info: &str) {}
    }

    fn session() -> (Session, Arc<MemSource>) {
        let src = Arc::new(MemSource::new());
        let session = Session::new(
            Box::new(ToyCompiler),
            Box::new(ArcSource(src.clone())),
            Box::new(BuiltinCondEval::new(NoVars)),
            DebuggerConfig::default(),
        );
        (session, src)
    }

    #[test]
    fn run_quit_is_swallowed_not_propagated() {
        let (mut session, src) = session();
        src.put("f.py", 1, &["x = 1"]);
        let result = run_script(&mut session, 1, |s| {
            s.set_quit();
            let f = Frame::new(1, 1, "f.py", 1, "<module>");
            let mut hooks = NoopHooks;
            s.dispatch(&[f], TraceEvent::Line, &mut hooks)?;
            Ok(())
        });
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn run_propagates_non_quit_errors() {
        let (mut session, _src) = session();
        let result: DbgResult<Option<()>> = run_script(&mut session, 1, |_s| Err(DbgError::Source("boom".into())));
        assert!(matches!(result, Err(DbgError::Source(_))));
    }

    #[test]
    fn run_returns_body_value_on_success() {
        let (mut session, _src) = session();
        let result = run_script(&mut session, 1, |_s| Ok(42));
        assert_eq!(result.unwrap(), Some(42));
    }

    #[test]
    fn runcall_does_not_ignore_first_call_event() {
        let (mut session, src) = session();
        src.put("f.py", 1, &["def foo():", "    a = 1"]);
        let mut calls = 0;
        let result = run_call(&mut session, 2, |s| {
            struct CountingHooks<'a>(&'a mut i32);
            impl UserHooks for CountingHooks<'_> {
                fn user_call(&mut self, _frame: &Frame) {
                    *self.0 += 1;
                }
                fn user_line(&mut self, _frame: &Frame, _hits: Option<&crate::session::BreakpointHits>) {}
                fn user_return(&mut self, _frame: &Frame, _return_value: Option<&str>) {}
                fn user_exception(&mut self, _frame: &Frame, _info: &str) {}
            }
            let f = Frame::new(2, 1, "f.py", 1, "foo");
            let mut hooks = CountingHooks(&mut calls);
            let control = s.dispatch(&[f], TraceEvent::Call, &mut hooks)?;
            assert_eq!(control, TraceControl::Continue);
            Ok(())
        });
        result.unwrap();
        assert_eq!(calls, 1);
    }
}
