//! step.rs — The stepping state machine.
//!
//! Ported from `bdb.py`'s `stopframe_lno` pair and its four derived
//! commands. `lineno` is sentinel-encoded exactly as the original documents
//! it:
//!
//! ```text
//! (None,  0):   always stop              -- step
//! (None, -1):   never stop               -- continue, no breakpoints left
//! (Some(f), 0): stop on next line in f    -- next
//! (Some(f), -1): stop only on return from f -- return
//! (Some(f), n): stop when current line in f is >= n -- until
//! ```
//!
//! `stop_here` additionally honors a frame's own line number, so "stop when
//! returning from frame" is really "stop never, until the `return` event
//! notices `frame is stopframe`" — that half lives in `dispatch.rs`, which
//! is the only place that sees which event fired.

use crate::frame::FrameId;

/// The sentinel line number meaning "never stop here on a `line` event"
/// (only a matching `return` event stops).
pub const NEVER: i64 = -1;
/// The sentinel line number meaning "stop unconditionally".
pub const ALWAYS: i64 = 0;

/// The debugger's current stepping intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteppingState {
    stopframe: Option<FrameId>,
    lineno: i64,
}

impl Default for SteppingState {
    fn default() -> Self {
        Self {
            stopframe: None,
            lineno: ALWAYS,
        }
    }
}

impl SteppingState {
    /// Stop after one line of code, in any frame (`step`).
    pub fn set_step(&mut self) {
        *self = Self {
            stopframe: None,
            lineno: ALWAYS,
        };
    }

    /// Stop on the next line in or below `frame` (`next`).
    pub fn set_next(&mut self, frame: FrameId) {
        *self = Self {
            stopframe: Some(frame),
            lineno: ALWAYS,
        };
    }

    /// Stop only when returning from `frame` (`return`).
    pub fn set_return(&mut self, frame: FrameId) {
        *self = Self {
            stopframe: Some(frame),
            lineno: NEVER,
        };
    }

    /// Stop when the current line in `frame` is greater than `lineno`, or
    /// when returning from `frame`. `lineno` defaults to one past the
    /// frame's current line when not given (`until`).
    pub fn set_until(&mut self, frame: FrameId, lineno: u32) {
        *self = Self {
            stopframe: Some(frame),
            lineno: i64::from(lineno),
        };
    }

    /// Don't stop except at breakpoints, or when finished (`continue`).
    pub fn set_continue(&mut self) {
        *self = Self {
            stopframe: None,
            lineno: NEVER,
        };
    }

    /// Whether a `line` event in `frame` at `current_line` should stop
    /// execution, per `bdb.py`'s `stop_here`.
    pub fn stop_here(&self, frame: FrameId, current_line: u32) -> bool {
        match self.stopframe {
            Some(stopframe) if stopframe != frame => false,
            _ => {
                if self.lineno == NEVER {
                    false
                } else {
                    i64::from(current_line) >= self.lineno
                }
            }
        }
    }

    /// Whether a `return` event in `frame` should stop execution even
    /// though `stop_here` said no — the `(frame, -1)` and `(frame, 0)` "stop
    /// on any return from this frame" cases.
    pub fn stop_on_return(&self, frame: FrameId) -> bool {
        self.stopframe == Some(frame)
    }

    /// Whether the current sentinel is `(None, 0)`, the state a `return`
    /// event resets to in the caller after a step/next/until/return command
    /// completes (per `dispatch_return`'s comment).
    pub fn is_step_sentinel(&self) -> bool {
        self.stopframe.is_none() && self.lineno == ALWAYS
    }

    /// The frame stepping is currently anchored to, if any.
    pub fn stopframe(&self) -> Option<FrameId> {
        self.stopframe
    }
}
