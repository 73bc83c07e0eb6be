use dashmap::DashMap;
use std::time::{Duration, Instant};

pub type LoadpointId = u32;

// Last confirmed mode change for one loadpoint
#[derive(Debug, Clone, Default)]
pub struct LoadpointThrottleState {
    pub last_mode: Option<String>,
    pub last_change: Option<Instant>,
}

// Outcome of asking whether a loadpoint may switch mode now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Throttled { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Decision::Allowed => 0,
            Decision::Throttled { retry_after_secs } => *retry_after_secs,
        }
    }
}

// Cooldown view of a loadpoint, read under one lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownSnapshot {
    pub remaining_secs: u64,
    pub last_mode: Option<String>,
}

/// Per-loadpoint cooldown between distinct mode changes.
///
/// Checking (`can_change`) never mutates anything. Only `record_confirmed`
/// writes, and callers invoke it after the upstream device accepted the
/// change, so failed or rejected attempts never restart the window.
pub struct ThrottleGuard {
    window: Duration,
    loadpoints: DashMap<LoadpointId, LoadpointThrottleState>,
}

impl ThrottleGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            loadpoints: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn can_change(&self, lp: LoadpointId, mode: &str) -> Decision {
        self.can_change_at(lp, mode, Instant::now())
    }

    pub fn can_change_at(&self, lp: LoadpointId, mode: &str, now: Instant) -> Decision {
        let Some(state) = self.loadpoints.get(&lp) else {
            return Decision::Allowed;
        };
        let Some(last_change) = state.last_change else {
            return Decision::Allowed;
        };

        // same mode again can't cycle the hardware
        if state.last_mode.as_deref() == Some(mode) {
            return Decision::Allowed;
        }

        match self.remaining_since(last_change, now) {
            0 => Decision::Allowed,
            secs => Decision::Throttled {
                retry_after_secs: secs.max(1),
            },
        }
    }

    pub fn record_confirmed(&self, lp: LoadpointId, mode: &str) {
        self.record_confirmed_at(lp, mode, Instant::now());
    }

    pub fn record_confirmed_at(&self, lp: LoadpointId, mode: &str, now: Instant) {
        let mut state = self.loadpoints.entry(lp).or_default();
        // never move the window start backwards
        let stamp = match state.last_change {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        state.last_mode = Some(mode.to_string());
        state.last_change = Some(stamp);
    }

    pub fn remaining(&self, lp: LoadpointId) -> u64 {
        self.remaining_at(lp, Instant::now())
    }

    pub fn remaining_at(&self, lp: LoadpointId, now: Instant) -> u64 {
        self.loadpoints
            .get(&lp)
            .and_then(|state| state.last_change)
            .map(|last_change| self.remaining_since(last_change, now))
            .unwrap_or(0)
    }

    pub fn last_mode(&self, lp: LoadpointId) -> Option<String> {
        self.loadpoints
            .get(&lp)
            .and_then(|state| state.last_mode.clone())
    }

    pub fn status(&self, lp: LoadpointId) -> CooldownSnapshot {
        self.status_at(lp, Instant::now())
    }

    pub fn status_at(&self, lp: LoadpointId, now: Instant) -> CooldownSnapshot {
        match self.loadpoints.get(&lp) {
            Some(state) => CooldownSnapshot {
                remaining_secs: state
                    .last_change
                    .map(|last_change| self.remaining_since(last_change, now))
                    .unwrap_or(0),
                last_mode: state.last_mode.clone(),
            },
            None => CooldownSnapshot {
                remaining_secs: 0,
                last_mode: None,
            },
        }
    }

    // Whole seconds left in the window, rounded up
    fn remaining_since(&self, last_change: Instant, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(last_change);
        let left = self.window.saturating_sub(elapsed);
        left.as_secs() + u64::from(left.subsec_nanos() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const WINDOW: Duration = Duration::from_secs(120);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn unknown_loadpoint_allows_any_mode() {
        let guard = ThrottleGuard::new(WINDOW);
        let now = Instant::now();
        for mode in ["now", "off", "pv", "minpv", "anything"] {
            let decision = guard.can_change_at(7, mode, now);
            assert_eq!(decision, Decision::Allowed);
            assert_eq!(decision.retry_after_secs(), 0);
        }
        assert_eq!(guard.remaining_at(7, now), 0);
        assert_eq!(guard.last_mode(7), None);
    }

    #[test]
    fn scenario_pv_then_now() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "pv", t0);

        assert_eq!(
            guard.can_change_at(1, "now", t0 + secs(30)),
            Decision::Throttled { retry_after_secs: 90 }
        );
        assert_eq!(guard.can_change_at(1, "pv", t0 + secs(30)), Decision::Allowed);
        assert_eq!(guard.can_change_at(1, "now", t0 + secs(121)), Decision::Allowed);
    }

    #[test]
    fn same_mode_is_never_throttled() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "minpv", t0);
        for offset in [0, 1, 59, 119, 120, 500] {
            assert!(guard.can_change_at(1, "minpv", t0 + secs(offset)).is_allowed());
        }
    }

    #[test]
    fn fresh_confirmation_blocks_other_modes_for_full_window() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(3, "now", t0);

        assert_eq!(
            guard.can_change_at(3, "off", t0),
            Decision::Throttled { retry_after_secs: 120 }
        );
        assert_eq!(guard.remaining_at(3, t0), 120);
    }

    #[test]
    fn retry_hint_rounds_up_and_never_hits_zero() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "pv", t0);

        let almost = t0 + WINDOW - Duration::from_millis(1);
        assert_eq!(
            guard.can_change_at(1, "off", almost),
            Decision::Throttled { retry_after_secs: 1 }
        );
        assert_eq!(guard.remaining_at(1, almost), 1);

        let mid = t0 + Duration::from_millis(30_400);
        assert_eq!(guard.can_change_at(1, "off", mid).retry_after_secs(), 90);
        assert_eq!(guard.remaining_at(1, mid), 90);
    }

    #[test]
    fn remaining_counts_down_and_agrees_with_decision() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "pv", t0);

        let mut previous = u64::MAX;
        for step in (0..=130).step_by(5) {
            let at = t0 + secs(step);
            let remaining = guard.remaining_at(1, at);
            assert!(remaining < previous || remaining == 0);
            previous = remaining;

            let decision = guard.can_change_at(1, "now", at);
            assert_eq!(decision.is_allowed(), remaining == 0, "at t={step}");
            assert_eq!(decision.retry_after_secs(), remaining);
        }
        assert_eq!(guard.remaining_at(1, t0 + WINDOW), 0);
    }

    #[test]
    fn loadpoints_are_independent() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "now", t0);

        assert!(guard.can_change_at(2, "off", t0 + secs(1)).is_allowed());
        assert_eq!(guard.remaining_at(2, t0 + secs(1)), 0);
        assert_eq!(guard.status_at(2, t0).last_mode, None);
    }

    #[test]
    fn checking_does_not_mutate_state() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "pv", t0);

        for _ in 0..10 {
            assert!(!guard.can_change_at(1, "now", t0 + secs(10)).is_allowed());
        }
        assert_eq!(guard.remaining_at(1, t0 + secs(10)), 110);
        assert_eq!(guard.last_mode(1).as_deref(), Some("pv"));
    }

    #[test]
    fn confirmation_restarts_window() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "pv", t0);
        guard.record_confirmed_at(1, "now", t0 + secs(200));

        assert_eq!(guard.remaining_at(1, t0 + secs(230)), 90);
        assert!(guard.can_change_at(1, "now", t0 + secs(230)).is_allowed());
        assert!(!guard.can_change_at(1, "pv", t0 + secs(230)).is_allowed());
    }

    #[test]
    fn backdated_confirmation_keeps_latest_timestamp() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "pv", t0 + secs(60));
        guard.record_confirmed_at(1, "off", t0);

        assert_eq!(guard.last_mode(1).as_deref(), Some("off"));
        assert_eq!(guard.remaining_at(1, t0 + secs(60)), 120);
    }

    #[test]
    fn clock_reading_before_last_change_counts_as_zero_elapsed() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "pv", t0 + secs(10));
        assert_eq!(guard.remaining_at(1, t0), 120);
    }

    #[test]
    fn zero_window_never_throttles() {
        let guard = ThrottleGuard::new(Duration::ZERO);
        let t0 = Instant::now();
        guard.record_confirmed_at(1, "pv", t0);
        assert!(guard.can_change_at(1, "now", t0).is_allowed());
        assert_eq!(guard.remaining_at(1, t0), 0);
    }

    #[test]
    fn status_reads_remaining_and_mode_together() {
        let guard = ThrottleGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.record_confirmed_at(4, "minpv", t0);
        assert_eq!(
            guard.status_at(4, t0 + secs(20)),
            CooldownSnapshot {
                remaining_secs: 100,
                last_mode: Some("minpv".to_string()),
            }
        );
    }

    #[test]
    fn concurrent_confirmations_on_many_loadpoints() {
        let guard = Arc::new(ThrottleGuard::new(WINDOW));
        let handles: Vec<_> = (1..=8)
            .map(|lp| {
                let guard = Arc::clone(&guard);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = guard.can_change(lp, "pv");
                        guard.record_confirmed(lp, "pv");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for lp in 1..=8 {
            assert_eq!(guard.last_mode(lp).as_deref(), Some("pv"));
            assert!(!guard.can_change(lp, "off").is_allowed());
            assert!(guard.remaining(lp) > 0);
        }
    }
}
