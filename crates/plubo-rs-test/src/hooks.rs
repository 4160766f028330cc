//! A hook sink that records every fired action.

use std::sync::Mutex;

use plubo_rs_core::ArgumentMap;
use plubo_rs_routes::HookSink;

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredHook {
    /// Hook name.
    pub hook: String,
    /// Arguments passed with it.
    pub args: ArgumentMap,
}

/// Records hook invocations in firing order.
///
/// # Examples
///
/// ```
/// use plubo_rs_core::ArgumentMap;
/// use plubo_rs_routes::HookSink;
/// use plubo_rs_test::RecordingHooks;
///
/// let hooks = RecordingHooks::new();
/// hooks.do_action("plubo/route_home", &ArgumentMap::new());
/// assert_eq!(hooks.count("plubo/route_home"), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingHooks {
    fired: Mutex<Vec<FiredHook>>,
}

impl RecordingHooks {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded invocations.
    pub fn fired(&self) -> Vec<FiredHook> {
        self.fired.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Recorded hook names, in order.
    pub fn names(&self) -> Vec<String> {
        self.fired().into_iter().map(|f| f.hook).collect()
    }

    /// How often `hook` fired.
    pub fn count(&self, hook: &str) -> usize {
        self.fired().iter().filter(|f| f.hook == hook).count()
    }

    /// Arguments of the most recent invocation of `hook`.
    pub fn last(&self, hook: &str) -> Option<ArgumentMap> {
        self.fired()
            .into_iter()
            .rev()
            .find(|f| f.hook == hook)
            .map(|f| f.args)
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut fired) = self.fired.lock() {
            fired.clear();
        }
    }
}

impl HookSink for RecordingHooks {
    fn do_action(&self, hook: &str, args: &ArgumentMap) {
        tracing::trace!(hook, "recorded hook");
        if let Ok(mut fired) = self.fired.lock() {
            fired.push(FiredHook {
                hook: hook.to_string(),
                args: args.clone(),
            });
        }
    }
}
