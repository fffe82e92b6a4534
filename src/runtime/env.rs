/// Per-invocation environment overlay
///
/// Handlers observe their descriptor's environment overrides through the
/// process-wide variable set, the same way they would when deployed. The
/// overlay captures the ambient environment, applies the overrides, and
/// restores the snapshot after the invocation's asynchronous completion.
///
/// The process environment is shared mutable state: overlapping concurrent
/// invocations each overwrite it with their own overlay, so a handler's
/// visible environment is whichever overlay was applied most recently by any
/// in-flight invocation. Restoration happens on the success path only; a
/// failing invocation leaves its overlay in place.

use std::collections::HashMap;
use std::ffi::OsString;

/// Snapshot of the ambient environment taken before an overlay was applied
#[derive(Debug)]
pub struct EnvOverlay {
    snapshot: HashMap<OsString, OsString>,
}

impl EnvOverlay {
    /// Capture the ambient environment, then apply the overrides on top
    ///
    /// Overrides win over ambient values on key collision.
    pub fn apply(overrides: &HashMap<String, String>) -> Self {
        let snapshot: HashMap<OsString, OsString> = std::env::vars_os().collect();

        for (key, value) in overrides {
            std::env::set_var(key, value);
        }

        Self { snapshot }
    }

    /// Put the captured snapshot back as the ambient environment
    ///
    /// Keys introduced since the capture are removed, values changed since
    /// the capture are reset.
    pub fn restore(self) {
        let current: Vec<OsString> = std::env::vars_os().map(|(key, _)| key).collect();
        for key in current {
            if !self.snapshot.contains_key(&key) {
                std::env::remove_var(&key);
            }
        }

        for (key, value) in &self.snapshot {
            std::env::set_var(key, value);
        }
    }
}

/// Merged environment view for one invocation: ambient variables plus the
/// descriptor's overrides
///
/// This is the value threaded into the handler's context table, giving the
/// handler a per-invocation view that cannot be clobbered by a concurrent
/// sibling's overlay. Variables that are not valid UTF-8 are skipped.
pub fn merged_env(overrides: &HashMap<String, String>) -> HashMap<String, String> {
    let mut view: HashMap<String, String> = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();
    view.extend(overrides.iter().map(|(key, value)| (key.clone(), value.clone())));
    view
}
