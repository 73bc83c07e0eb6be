use std::sync::Arc;
use crate::throttle::{LoadpointId, ThrottleGuard};
use crate::upstream::EvccClient;
// app's shared state

pub struct AppState {
    pub upstream: Arc<EvccClient>,
    pub guard: ThrottleGuard,    // per loadpoint mode cooldown
    pub default_lp: LoadpointId, // used when ?lp= is missing
}

impl AppState {
    pub fn new(upstream: Arc<EvccClient>, guard: ThrottleGuard, default_lp: LoadpointId) -> Self {
        Self {
            upstream,
            guard,
            default_lp,
        }
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.guard.window().as_secs()
    }
}
