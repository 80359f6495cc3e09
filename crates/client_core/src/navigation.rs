//! Two-step navigation after a create mutation: the mutation is submitted
//! first, the route transition happens once navigation reports ready.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use shared::domain::PolicyId;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    WorkspaceInitial(PolicyId),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::WorkspaceInitial(policy_id) => format!("workspace/{policy_id}"),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

pub trait NavigationSink: Send + Sync {
    fn dismiss_modal(&self);
    fn navigate(&self, route: &Route);
}

/// Sink for headless callers; transitions are only logged.
pub struct NoopNavigation;

impl NavigationSink for NoopNavigation {
    fn dismiss_modal(&self) {}

    fn navigate(&self, route: &Route) {
        debug!(route = %route, "navigation: no sink attached");
    }
}

#[derive(Default)]
struct GateState {
    ready: bool,
    pending: Vec<Route>,
}

pub struct NavigationGate {
    sink: Arc<dyn NavigationSink>,
    state: Mutex<GateState>,
}

impl NavigationGate {
    pub fn new(sink: Arc<dyn NavigationSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(GateState::default()),
        }
    }

    pub fn headless() -> Self {
        Self::new(Arc::new(NoopNavigation))
    }

    pub fn is_ready(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ready
    }

    pub fn pending_routes(&self) -> Vec<Route> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .clone()
    }

    /// Transitions now if navigation is ready, otherwise once it becomes so.
    pub fn request(&self, route: Route) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.ready {
                debug!(route = %route, "navigation: queued until ready");
                state.pending.push(route);
                return;
            }
        }
        self.transition(&route);
    }

    /// Flushes queued transitions in the order they were requested.
    pub fn mark_ready(&self) {
        let pending = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.ready = true;
            std::mem::take(&mut state.pending)
        };
        for route in &pending {
            self.transition(route);
        }
    }

    fn transition(&self, route: &Route) {
        info!(route = %route, "navigation: transition");
        self.sink.dismiss_modal();
        self.sink.navigate(route);
    }
}
