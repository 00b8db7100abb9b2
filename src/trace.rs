//! trace.rs — Per-frame trace-enable side table.
//!
//! `bdb.py` marks a frame as traced by setting its own `f_trace` attribute.
//! A host frame here is an immutable snapshot (`frame.rs`), so the same bit
//! lives in a side table keyed by [`FrameId`] instead — the redesign spec.md
//! §9 calls for explicitly. A host asks "should I keep sending me events for
//! this frame" via [`TraceSlots::is_traced`] before forwarding each event.

use std::collections::HashSet;

use crate::frame::FrameId;

/// Tracks which frames the debugger currently wants trace events from.
#[derive(Debug, Default)]
pub struct TraceSlots {
    traced: HashSet<FrameId>,
}

impl TraceSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `frame` as traced, if not already.
    pub fn enable(&mut self, frame: FrameId) {
        self.traced.insert(frame);
    }

    /// Whether `frame` currently receives trace events.
    pub fn is_traced(&self, frame: FrameId) -> bool {
        self.traced.contains(&frame)
    }

    /// Stops tracing `frame` (mirrors `del frame.f_trace`).
    pub fn disable(&mut self, frame: FrameId) {
        self.traced.remove(&frame);
    }

    /// Stops tracing every frame (mirrors `_stop_tracing`'s walk up to
    /// `botframe`, applied to whatever the host chooses to pass).
    pub fn clear(&mut self) {
        self.traced.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_then_query() {
        let mut t = TraceSlots::new();
        assert!(!t.is_traced(1));
        t.enable(1);
        assert!(t.is_traced(1));
        t.disable(1);
        assert!(!t.is_traced(1));
    }

    #[test]
    fn clear_drops_everything() {
        let mut t = TraceSlots::new();
        t.enable(1);
        t.enable(2);
        t.clear();
        assert!(!t.is_traced(1));
        assert!(!t.is_traced(2));
    }
}
