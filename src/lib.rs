//! tracecore — the core of a source-level debugger.
//!
//! This crate is the part of a debugger that has no opinion about a UI, a
//! wire protocol, or a runtime: given a stream of trace events (call, line,
//! return, exception) for a running program, it decides when to stop,
//! resolves breakpoint locations against compiled source, and tracks
//! stepping intent (`step`/`next`/`until`/`return`/`continue`) across calls.
//! A host supplies the event stream, a way to read and compile source
//! files, and a way to evaluate expressions; everything else — the actual
//! execution, pretty-printing values, a command line — lives outside this
//! crate (see the module docs for the precise boundary).
//!
//! The design follows Python's `bdb.py` module closely: the dispatch loop,
//! the stepping sentinel encoding, and the breakpoint numbering scheme are
//! all direct ports. [`session::Session`] is the `Bdb` class; [`runner`]
//! is its `run`/`runeval`/`runcall` entry points.

#![forbid(unsafe_code)]

pub mod breakpoint;
pub mod canon;
pub mod codeunit;
pub mod config;
pub mod error;
pub mod eval;
pub mod frame;
pub mod module;
pub mod runner;
pub mod session;
pub mod step;
pub mod trace;

pub use breakpoint::{Address, Breakpoint, BreakpointRegistry, CondEval};
pub use canon::PathCanonicalizer;
pub use codeunit::{CodeUnit, SourceCompiler, SourceProvider};
pub use config::DebuggerConfig;
pub use error::{DbgError, DbgResult};
pub use eval::{BuiltinCondEval, EvalEnvSource, Value};
pub use frame::{Frame, FrameChain, FrameId};
pub use module::{ModuleIndex, ModuleRegistry};
pub use runner::{run_call, run_eval, run_script};
pub use session::{BreakpointHits, Session, TraceControl, TraceEvent, UserHooks};
pub use step::SteppingState;
pub use trace::TraceSlots;
