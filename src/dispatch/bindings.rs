//! Gesture bindings
//!
//! Matches a gesture against the user's bindings, honouring per-application
//! scope, and hands matching actions to an `ActionRunner`. How bindings are
//! stored and how actions execute is up to the caller.

use crate::dispatch::GestureHandler;
use crate::processing::gesture::{Gesture, GestureEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "app")]
pub enum BindingScope {
    Global,
    /// Only while an application whose name contains this string is frontmost
    App(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureBinding {
    pub gesture: Gesture,
    pub scope: BindingScope,
    /// Opaque action string, e.g. `open example.com` or `run say hi`
    pub action: String,
}

impl GestureBinding {
    pub fn global(gesture: Gesture, action: impl Into<String>) -> Self {
        Self {
            gesture,
            scope: BindingScope::Global,
            action: action.into(),
        }
    }

    pub fn for_app(gesture: Gesture, app: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            gesture,
            scope: BindingScope::App(app.into()),
            action: action.into(),
        }
    }

    /// True if this binding should fire for `gesture` with `active_app` frontmost
    pub fn matches(&self, gesture: Gesture, active_app: Option<&str>) -> bool {
        if self.gesture != gesture {
            return false;
        }
        match &self.scope {
            BindingScope::Global => true,
            BindingScope::App(app) if app.is_empty() => true,
            BindingScope::App(app) => active_app.is_some_and(|active| active.contains(app.as_str())),
        }
    }
}

/// Executes bound actions. Implementations must return quickly.
pub trait ActionRunner: Send + Sync {
    fn run(&self, action: &str);
}

/// Runner that only records the action in the log
#[derive(Debug, Default)]
pub struct LogRunner;

impl ActionRunner for LogRunner {
    fn run(&self, action: &str) {
        tracing::info!("Action requested: {}", action);
    }
}

type ActiveAppFn = dyn Fn() -> Option<String> + Send + Sync;

/// Runs the actions bound to each gesture.
///
/// App-scoped bindings are checked against `active_app` when a lookup is
/// installed; without one they fire like global bindings.
pub struct BindingHandler {
    bindings: Vec<GestureBinding>,
    active_app: Option<Box<ActiveAppFn>>,
    runner: Arc<dyn ActionRunner>,
}

impl BindingHandler {
    pub fn new(bindings: Vec<GestureBinding>, runner: Arc<dyn ActionRunner>) -> Self {
        Self {
            bindings,
            active_app: None,
            runner,
        }
    }

    /// Install the frontmost-application lookup used for app-scoped bindings
    pub fn with_active_app(
        mut self,
        lookup: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.active_app = Some(Box::new(lookup));
        self
    }

    pub fn bindings(&self) -> &[GestureBinding] {
        &self.bindings
    }

    fn should_fire(&self, binding: &GestureBinding, gesture: Gesture, active_app: Option<&str>) -> bool {
        if self.active_app.is_none() {
            return binding.gesture == gesture;
        }
        binding.matches(gesture, active_app)
    }
}

impl GestureHandler for BindingHandler {
    fn handle(&self, event: &GestureEvent) {
        let needs_app = self.bindings.iter().any(|b| {
            b.gesture == event.gesture && matches!(&b.scope, BindingScope::App(a) if !a.is_empty())
        });
        let active_app = match &self.active_app {
            Some(lookup) if needs_app => lookup(),
            _ => None,
        };

        let mut fired = 0;
        for binding in &self.bindings {
            if self.should_fire(binding, event.gesture, active_app.as_deref()) {
                self.runner.run(&binding.action);
                fired += 1;
            }
        }

        if fired == 0 {
            tracing::debug!("No binding for {} (active app: {:?})", event.gesture, active_app);
        }
    }
}
