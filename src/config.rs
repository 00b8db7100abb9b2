//! config.rs — Session configuration.

use glob::Pattern;

#[cfg(feature = "trace")]
use log::warn;

/// Options a host may set when constructing a [`crate::session::Session`].
/// Mirrors spec.md §6's configuration table.
pub struct DebuggerConfig {
    skip: Vec<Pattern>,
    /// When set, a host's signal handler may re-enter the debugger at the
    /// currently running frame. The core never installs a handler itself
    /// (spec.md §1 Non-goals); this flag is stored purely for the host to
    /// consult.
    pub sigint_trampoline: bool,
    /// Whether the very first `call` event delivered to `dispatch_call`
    /// should be ignored (it belongs to the runner's own entry frame).
    /// Default `true`; `Runner::runcall` and `Session::set_trace` override
    /// it to `false`.
    pub ignore_first_call_event: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            skip: Vec::new(),
            sigint_trampoline: false,
            ignore_first_call_event: true,
        }
    }
}

impl DebuggerConfig {
    /// Sets the glob patterns matched against a frame's module name.
    /// Patterns that fail to parse are logged and dropped rather than
    /// rejected outright, since a single typo in a skip-list should not
    /// abort session construction.
    #[must_use]
    pub fn with_skip(mut self, patterns: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.skip = patterns
            .into_iter()
            .filter_map(|p| match Pattern::new(p.as_ref()) {
                Ok(pat) => Some(pat),
                Err(_err) => {
                    #[cfg(feature = "trace")]
                    warn!("ignoring invalid skip pattern: {}", p.as_ref());
                    None
                }
            })
            .collect();
        self
    }

    #[must_use]
    pub fn with_sigint_trampoline(mut self, enabled: bool) -> Self {
        self.sigint_trampoline = enabled;
        self
    }

    /// Whether `module_name` matches any configured skip pattern.
    pub fn is_skipped_module(&self, module_name: Option<&str>) -> bool {
        let Some(name) = module_name else { return false };
        self.skip.iter().any(|p| p.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_skip_matches_nothing() {
        let cfg = DebuggerConfig::default();
        assert!(!cfg.is_skipped_module(Some("anything")));
    }

    #[test]
    fn glob_pattern_matches() {
        let cfg = DebuggerConfig::default().with_skip(["importlib.*", "encodings"]);
        assert!(cfg.is_skipped_module(Some("importlib.util")));
        assert!(cfg.is_skipped_module(Some("encodings")));
        assert!(!cfg.is_skipped_module(Some("myapp")));
    }

    #[test]
    fn invalid_pattern_is_dropped_not_fatal() {
        let cfg = DebuggerConfig::default().with_skip(["[unterminated"]);
        assert!(!cfg.is_skipped_module(Some("[unterminated")));
    }
}
