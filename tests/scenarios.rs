//! End-to-end scenarios from spec.md §8, driven purely through tracecore's
//! public API (`Session`, `run_script`, the host capability traits). Each
//! test plays the host: it hands `Session::dispatch` a sequence of frames
//! and events the way a real interpreter's trace callback would, inside the
//! `run_script` entry point a real host uses to start a session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracecore::{
    run_script, BreakpointHits, CodeUnit, DbgError, DebuggerConfig, Frame, FrameId, Session,
    SourceCompiler, SourceProvider, TraceControl, TraceEvent, UserHooks,
};
use tracecore::eval::{BuiltinCondEval, EvalEnvSource, Value};

/// A `SourceProvider` backed by an in-memory map of canonical path to
/// (content identity, lines). Content is never actually parsed by the
/// paired `MapCompiler`; only its identity and non-emptiness matter.
#[derive(Default)]
struct MemSource {
    files: Mutex<HashMap<String, (u64, Vec<String>)>>,
}

impl MemSource {
    fn put(&self, path: &str, identity: u64, line_count: usize) {
        let lines = vec![String::new(); line_count.max(1)];
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (identity, lines));
    }
}

impl SourceProvider for MemSource {
    fn load(&self, canonical_path: &str) -> Option<(u64, Vec<String>)> {
        self.files.lock().unwrap().get(canonical_path).cloned()
    }
}

/// A `SourceCompiler` that returns a pre-built `CodeUnit` tree per filename,
/// set up directly by each test rather than parsed from text -- this lets a
/// scenario pin down the exact line table and nesting spec.md's resolver
/// algorithm has to handle, without needing a real language front end.
#[derive(Default)]
struct MapCompiler {
    units: Mutex<HashMap<String, CodeUnit>>,
}

impl MapCompiler {
    fn set(&self, path: &str, unit: CodeUnit) {
        self.units.lock().unwrap().insert(path.to_string(), unit);
    }
}

impl SourceCompiler for MapCompiler {
    fn compile(&self, filename: &str, _source: &str) -> Result<CodeUnit, DbgError> {
        self.units
            .lock()
            .unwrap()
            .get(filename)
            .cloned()
            .ok_or_else(|| DbgError::Syntax {
                file: filename.to_string(),
                message: "no unit registered".into(),
            })
    }
}

fn module(first_line: u32, executable_lines: &[u32], inner: Vec<CodeUnit>) -> CodeUnit {
    CodeUnit {
        first_line,
        name: String::new(),
        executable_lines: executable_lines.to_vec(),
        inner,
    }
}

fn function(name: &str, first_line: u32, executable_lines: &[u32]) -> CodeUnit {
    CodeUnit {
        first_line,
        name: name.to_string(),
        executable_lines: executable_lines.to_vec(),
        inner: Vec::new(),
    }
}

#[derive(Default)]
struct Recorder {
    lines: Vec<(FrameId, u32)>,
    hits: Vec<BreakpointHits>,
    returns: Vec<FrameId>,
}

impl UserHooks for Recorder {
    fn user_call(&mut self, _frame: &Frame) {}
    fn user_line(&mut self, frame: &Frame, hits: Option<&BreakpointHits>) {
        self.lines.push((frame.id, frame.line));
        if let Some(h) = hits {
            self.hits.push(h.clone());
        }
    }
    fn user_return(&mut self, frame: &Frame, _return_value: Option<&str>) {
        self.returns.push(frame.id);
    }
    fn user_exception(&mut self, _frame: &Frame, _info: &str) {}
}

struct NoCond;
impl EvalEnvSource for NoCond {
    fn get_var(&self, _frame: FrameId, _name: &str) -> Option<Value> {
        None
    }
}

fn plain_session(compiler: MapCompiler, source: MemSource) -> Session {
    Session::new(
        Box::new(compiler),
        Box::new(source),
        Box::new(BuiltinCondEval::new(NoCond)),
        DebuggerConfig::default(),
    )
}

/// Scenario 1 -- plain step visits every line in program order.
#[test]
fn scenario_plain_step_visits_lines_in_order() {
    let compiler = MapCompiler::default();
    let source = MemSource::default();
    source.put("/s1.py", 1, 3);
    compiler.set("/s1.py", module(1, &[1, 2, 3], Vec::new()));
    let mut session = plain_session(compiler, source);

    let mut rec = Recorder::default();
    run_script(&mut session, 100, |s| {
        s.set_step();
        for line in 1..=3 {
            let f = Frame::new(100, line, "/s1.py", 1, "<module>");
            s.dispatch(&[f], TraceEvent::Line, &mut rec)?;
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(rec.lines, vec![(100, 1), (100, 2), (100, 3)]);
}

/// Scenario 2 -- a breakpoint set on a comment line resolves to the next
/// real statement, and the single hit reports that breakpoint's number.
#[test]
fn scenario_break_on_comment_resolves_forward() {
    let compiler = MapCompiler::default();
    let source = MemSource::default();
    source.put("/s2.py", 1, 3);
    // line 1 blank, line 2 a comment, line 3 `x = 1` -- only line 3 is
    // executable.
    compiler.set("/s2.py", module(1, &[3], Vec::new()));
    let mut session = plain_session(compiler, source);
    let id = session.set_break("/s2.py", 2, false, None, None, &[]).unwrap();
    assert_eq!(id, 1);

    let mut rec = Recorder::default();
    run_script(&mut session, 100, |s| {
        s.set_continue();
        let f = Frame::new(100, 3, "/s2.py", 1, "<module>");
        s.dispatch(&[f], TraceEvent::Line, &mut rec)
    })
    .unwrap();

    assert_eq!(rec.lines, vec![(100, 3)]);
    assert_eq!(rec.hits, vec![(vec![1], vec![])]);
}

/// Scenario 3 -- a temporary and a regular breakpoint coexist at the same
/// address; the first hit fires both and deletes the temporary, the second
/// hit fires only the survivor.
#[test]
fn scenario_temporary_and_regular_coexist() {
    let compiler = MapCompiler::default();
    let source = MemSource::default();
    source.put("/s3.py", 1, 12);
    let foo = function("foo", 10, &[10, 11, 12]);
    compiler.set("/s3.py", module(1, &[1], vec![foo]));
    let mut session = plain_session(compiler, source);
    let regular = session.set_break("/s3.py", 11, false, None, None, &[]).unwrap();
    let temporary = session.set_break("/s3.py", 11, true, None, None, &[]).unwrap();
    assert_eq!((regular, temporary), (1, 2));

    let mut rec = Recorder::default();
    run_script(&mut session, 1, |s| {
        s.set_continue();
        let first_call = Frame::new(200, 11, "/s3.py", 10, "foo");
        s.dispatch(&[first_call], TraceEvent::Line, &mut rec)?;
        let second_call = Frame::new(201, 11, "/s3.py", 10, "foo");
        s.dispatch(&[second_call], TraceEvent::Line, &mut rec)
    })
    .unwrap();

    assert_eq!(rec.hits[0], (vec![1, 2], vec![2]));
    assert_eq!(rec.hits[1], (vec![1], vec![]));
    assert!(session.get_bpbynumber(2).is_err());
}

struct VarEnv {
    values: Arc<Mutex<HashMap<FrameId, i64>>>,
}

impl EvalEnvSource for VarEnv {
    fn get_var(&self, frame: FrameId, name: &str) -> Option<Value> {
        if name == "a" {
            self.values.lock().unwrap().get(&frame).map(|v| Value::Int(*v))
        } else {
            None
        }
    }
}

/// Scenario 4 -- a conditional breakpoint evaluated against three calls with
/// `a` in {0, 1, 2} stops exactly once, but its hit counter tracks all three
/// qualifying reaches regardless of the condition's truth.
#[test]
fn scenario_conditional_breakpoint_skips_false_hits() {
    let compiler = MapCompiler::default();
    let source = MemSource::default();
    source.put("/s4.py", 1, 12);
    let foo = function("foo", 10, &[10, 11, 12]);
    compiler.set("/s4.py", module(1, &[1], vec![foo]));

    let values: Arc<Mutex<HashMap<FrameId, i64>>> = Arc::new(Mutex::new(HashMap::new()));
    let mut session = Session::new(
        Box::new(compiler),
        Box::new(source),
        Box::new(BuiltinCondEval::new(VarEnv { values: values.clone() })),
        DebuggerConfig::default(),
    );
    session
        .set_break("/s4.py", 11, false, Some("a == 2".into()), None, &[])
        .unwrap();

    let mut rec = Recorder::default();
    run_script(&mut session, 1, |s| {
        s.set_continue();
        for (call_id, a) in [(300u64, 0i64), (301, 1), (302, 2)] {
            values.lock().unwrap().insert(call_id, a);
            let f = Frame::new(call_id, 11, "/s4.py", 10, "foo");
            s.dispatch(&[f], TraceEvent::Line, &mut rec)?;
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(rec.lines.len(), 1);
    assert_eq!(rec.lines[0].0, 302);
    assert_eq!(session.get_bpbynumber(1).unwrap().hits, 3);
}

/// Scenario 5 -- an ignore count keeps suppressing a breakpoint across a
/// disable/re-enable cycle: while disabled the count is untouched, and once
/// re-enabled it is consumed by exactly one more suppressed hit before the
/// breakpoint starts firing again.
#[test]
fn scenario_ignore_count_survives_disable() {
    let compiler = MapCompiler::default();
    let source = MemSource::default();
    source.put("/s5.py", 1, 12);
    let foo = function("foo", 10, &[10, 11, 12]);
    compiler.set("/s5.py", module(1, &[1], vec![foo]));
    let mut session = plain_session(compiler, source);
    session.set_break("/s5.py", 11, false, None, None, &[]).unwrap(); // #1
    session.set_break("/s5.py", 11, false, None, None, &[]).unwrap(); // #2
    session.get_bpbynumber_mut(1).unwrap().ignore = 1;
    session.get_bpbynumber_mut(1).unwrap().enabled = false;

    let mut rec = Recorder::default();
    run_script(&mut session, 1, |s| {
        s.set_continue();
        s.dispatch(&[Frame::new(1, 11, "/s5.py", 10, "foo")], TraceEvent::Line, &mut rec)?;
        Ok(())
    })
    .unwrap();
    assert_eq!(rec.hits[0], (vec![2], vec![]));
    assert_eq!(session.get_bpbynumber(1).unwrap().ignore, 1, "untouched while disabled");

    session.get_bpbynumber_mut(1).unwrap().enabled = true;
    run_script(&mut session, 1, |s| {
        s.set_continue();
        s.dispatch(&[Frame::new(2, 11, "/s5.py", 10, "foo")], TraceEvent::Line, &mut rec)?;
        s.dispatch(&[Frame::new(3, 11, "/s5.py", 10, "foo")], TraceEvent::Line, &mut rec)
    })
    .unwrap();
    assert_eq!(rec.hits[1], (vec![2], vec![]), "bp#1 still suppressed, consuming its ignore count");
    assert_eq!(session.get_bpbynumber(1).unwrap().ignore, 0);
    assert_eq!(rec.hits[2], (vec![1, 2], vec![]), "ignore consumed, both fire");
}

/// Scenario 6 -- `restart` re-resolves a breakpoint after a source edit:
/// kept (at its new address) when the line still resolves, dropped when it
/// no longer does.
#[test]
fn scenario_restart_preserves_or_drops_breakpoints() {
    let compiler = Arc::new(MapCompiler::default());
    let source = Arc::new(MemSource::default());
    source.put("/s6.py", 1, 3);
    compiler.set("/s6.py", module(1, &[3], Vec::new()));

    struct ArcCompiler(Arc<MapCompiler>);
    impl SourceCompiler for ArcCompiler {
        fn compile(&self, filename: &str, source: &str) -> Result<CodeUnit, DbgError> {
            self.0.compile(filename, source)
        }
    }
    struct ArcSource(Arc<MemSource>);
    impl SourceProvider for ArcSource {
        fn load(&self, canonical_path: &str) -> Option<(u64, Vec<String>)> {
            self.0.load(canonical_path)
        }
    }

    let mut session = Session::new(
        Box::new(ArcCompiler(compiler.clone())),
        Box::new(ArcSource(source.clone())),
        Box::new(BuiltinCondEval::new(NoCond)),
        DebuggerConfig::default(),
    );
    let id = session.set_break("/s6.py", 3, false, None, None, &[]).unwrap();
    assert_eq!(session.get_bpbynumber(id).unwrap().actual, (1, 3));

    // Edit: the statement moves to line 4.
    source.put("/s6.py", 2, 4);
    compiler.set("/s6.py", module(1, &[4], Vec::new()));
    session.restart();
    session.restart_file("/s6.py").unwrap();
    assert_eq!(session.get_bpbynumber(id).unwrap().actual, (1, 4));

    // Edit again: the statement is gone entirely.
    source.put("/s6.py", 3, 1);
    compiler.set("/s6.py", module(1, &[], Vec::new()));
    session.restart();
    session.restart_file("/s6.py").unwrap();
    assert!(session.get_bpbynumber(id).is_err());
}

/// Scenario 7 -- after a `next` target frame returns, the caller is tagged
/// for tracing and its very next line fires `user_line`, even though the
/// caller had received no trace events of its own up to that point.
#[test]
fn scenario_return_tags_untraced_caller() {
    let compiler = MapCompiler::default();
    let source = MemSource::default();
    source.put("/s7.py", 1, 12);
    let foo = function("foo", 10, &[10, 11, 12]);
    compiler.set("/s7.py", module(1, &[1, 2, 6], vec![foo]));
    let mut session = plain_session(compiler, source);
    session.set_break("/s7.py", 11, false, None, None, &[]).unwrap();

    const MAIN: FrameId = 1;
    const BAR: FrameId = 2;
    const FOO: FrameId = 3;

    let mut rec = Recorder::default();
    run_script(&mut session, MAIN, |s| {
        s.set_continue();
        let chain = [
            Frame::new(FOO, 11, "/s7.py", 10, "foo"),
            Frame::new(BAR, 5, "/s7.py", 1, "<module>"),
            Frame::new(MAIN, 1, "/s7.py", 1, "<module>"),
        ];
        s.dispatch(&chain, TraceEvent::Line, &mut rec)?;

        // UI issues "next" targeting the stopped frame.
        s.set_next(FOO);

        let chain = [
            Frame::new(FOO, 12, "/s7.py", 10, "foo"),
            Frame::new(BAR, 5, "/s7.py", 1, "<module>"),
            Frame::new(MAIN, 1, "/s7.py", 1, "<module>"),
        ];
        let control = s.dispatch(&chain, TraceEvent::Return { return_value: None }, &mut rec)?;
        assert_eq!(control, TraceControl::Continue);

        // The caller (bar) was never tagged before -- it becomes observable
        // right after the return, on the statement following the call site.
        let bar_next_line = Frame::new(BAR, 6, "/s7.py", 1, "<module>");
        s.dispatch(&[bar_next_line], TraceEvent::Line, &mut rec)
    })
    .unwrap();

    assert_eq!(rec.hits, vec![(vec![1], vec![])]);
    assert_eq!(rec.returns, vec![FOO]);
    assert_eq!(rec.lines.last(), Some(&(BAR, 6)));
}

/// Idempotence: calling `set_quit` twice, then emitting any event, is safe
/// and still reports `Quit` rather than panicking.
#[test]
fn set_quit_is_idempotent() {
    let compiler = MapCompiler::default();
    let source = MemSource::default();
    source.put("/s8.py", 1, 1);
    compiler.set("/s8.py", module(1, &[1], Vec::new()));
    let mut session = plain_session(compiler, source);

    let mut rec = Recorder::default();
    run_script(&mut session, 1, |s| {
        s.set_quit();
        s.set_quit();
        let f = Frame::new(1, 1, "/s8.py", 1, "<module>");
        let result = s.dispatch(&[f], TraceEvent::Line, &mut rec);
        assert!(matches!(result, Err(DbgError::Quit)));
        Ok(())
    })
    .unwrap();
}

/// `set_continue` with no live breakpoints anywhere tears down tracing
/// entirely -- observable as the dispatcher refusing to deliver any further
/// events.
#[test]
fn set_continue_with_no_breakpoints_tears_down_tracing() {
    let compiler = MapCompiler::default();
    let source = MemSource::default();
    source.put("/s9.py", 1, 2);
    compiler.set("/s9.py", module(1, &[1, 2], Vec::new()));
    let mut session = plain_session(compiler, source);

    let mut rec = Recorder::default();
    run_script(&mut session, 1, |s| {
        s.set_continue();
        let f = Frame::new(1, 1, "/s9.py", 1, "<module>");
        let control = s.dispatch(&[f], TraceEvent::Line, &mut rec)?;
        assert_eq!(control, TraceControl::StopTracing);
        Ok(())
    })
    .unwrap();
    assert!(rec.lines.is_empty());
}
