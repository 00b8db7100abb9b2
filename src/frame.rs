//! frame.rs — The host-provided stack frame snapshot.
//!
//! Frames are immutable to the core: the host hands over a snapshot of the
//! current call chain (top frame first) on every event. The core never
//! mutates a frame directly; the only mutable "per-frame" state it needs
//! (whether a frame should keep receiving events) lives in a side table
//! (`trace::TraceSlots`) keyed by `FrameId`, per spec.md §9's redesign note.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque frame identity, assigned and owned by the host.
pub type FrameId = u64;

/// A snapshot of one stack frame at the moment of a trace event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Host-assigned identity, stable for the frame's lifetime.
    pub id: FrameId,
    /// Current line number being executed in this frame.
    pub line: u32,
    /// Source file name as reported by the host (pre-canonicalization).
    pub source_path: String,
    /// First line of the code unit this frame is executing.
    pub code_first_line: u32,
    /// Name of the code unit (function, method, or module).
    pub code_name: String,
    /// Logical module name, used for `skip` pattern matching. `None` when
    /// the host has no notion of modules (e.g. a top-level script).
    pub module_name: Option<String>,
}

impl Frame {
    /// Convenience constructor for hosts and tests.
    pub fn new(
        id: FrameId,
        line: u32,
        source_path: impl Into<String>,
        code_first_line: u32,
        code_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            line,
            source_path: source_path.into(),
            code_first_line,
            code_name: code_name.into(),
            module_name: None,
        }
    }

    /// Builder-style setter for `module_name`.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module_name = Some(module.into());
        self
    }
}

/// A call chain snapshot, top frame first (index 0), bottom frame last.
pub type FrameChain = [Frame];

/// Find a frame by identity within a chain.
pub fn find<'a>(chain: &'a FrameChain, id: FrameId) -> Option<&'a Frame> {
    chain.iter().find(|f| f.id == id)
}
