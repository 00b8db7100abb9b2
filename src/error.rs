//! error.rs — Error taxonomy of the debugger core.
//!
//! Five kinds, one per row of the error taxonomy: `Quit` unwinds a debugging
//! session cleanly and is never shown to a user; the rest are ordinary
//! reportable failures a UI surfaces however it likes. `StackNavigation` is
//! never constructed by this crate: `Session::get_stack` returns the whole
//! frame list plus a focus index in one call rather than exposing a
//! stateful cursor, so "moved past the oldest/newest frame" is a bounds
//! check the host performs itself over that list. The variant exists so a
//! host can report that failure through the same error type it already
//! matches on, without inventing its own.

use thiserror::Error;

/// Errors produced by the debugger core.
#[derive(Debug, Error)]
pub enum DbgError {
    /// The UI requested termination of the debugging session (`set_quit`).
    /// Unwinds cleanly out of the runner; never shown to the user.
    #[error("debugging session quit")]
    Quit,

    /// The requested file has no readable lines, or a named function/method
    /// cannot be found, or the requested line is past the last executable
    /// statement.
    #[error("{0}")]
    Source(String),

    /// The file exists but does not compile.
    #[error("{file}: {message}")]
    Syntax {
        /// Canonical path of the file that failed to compile.
        file: String,
        /// Compiler-reported message, passed through verbatim.
        message: String,
    },

    /// A numeric breakpoint argument is missing, non-numeric, out of range,
    /// or refers to an already-deleted entry.
    #[error("{0}")]
    BadBreakpointReference(String),

    /// The UI moved above the oldest frame or below the newest while
    /// navigating the stack returned by `Session::get_stack`. Not raised by
    /// this crate; provided for a host's own cursor to report through.
    #[error("{0}")]
    StackNavigation(String),

    /// A condition expression failed to parse or evaluate. Breakpoint
    /// conditions treat this as "stop" per
    /// `BreakpointRegistry::process_hit`; evaluation requested directly by
    /// the UI (e.g. a watch expression) surfaces it as-is.
    #[error("{0}")]
    Eval(String),
}

/// Result alias used throughout the crate.
pub type DbgResult<T> = Result<T, DbgError>;
