//! Cooldown gate for motion triggers

use std::time::{Duration, Instant};

/// Suppresses repeated triggers within a fixed window
///
/// A trigger is permitted when none was ever accepted or when at least
/// `cooldown` has elapsed since the last accepted one. Denied attempts leave
/// the gate untouched, so a burst of motion does not extend the window.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown: Duration,
    last_trigger: Option<Instant>,
}

impl CooldownGate {
    /// Create a gate that has never triggered
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_trigger: None,
        }
    }

    /// Cooldown window
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Instant of the last accepted trigger
    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }

    /// Accept a trigger at `now` if the window has passed
    pub fn try_trigger(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_trigger {
            if now.saturating_duration_since(last) < self.cooldown {
                return false;
            }
        }
        self.last_trigger = Some(now);
        true
    }

    /// Time left before a trigger at `now` would be accepted
    pub fn remaining(&self, now: Instant) -> Duration {
        self.last_trigger
            .map(|last| self.cooldown.saturating_sub(now.saturating_duration_since(last)))
            .unwrap_or(Duration::ZERO)
    }

    /// Forget the last trigger
    pub fn reset(&mut self) {
        self.last_trigger = None;
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_trigger_permitted() {
        let mut gate = CooldownGate::default();
        assert!(gate.try_trigger(Instant::now()));
    }

    #[test]
    fn test_window_denies_without_updating() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(Duration::from_secs(10));
        assert!(gate.try_trigger(t0));

        for secs in [1, 5, 9] {
            assert!(!gate.try_trigger(t0 + Duration::from_secs(secs)));
            assert_eq!(gate.last_trigger(), Some(t0));
        }
        assert!(!gate.try_trigger(t0 + Duration::from_millis(9_999)));

        assert!(gate.try_trigger(t0 + Duration::from_secs(10)));
        assert_eq!(gate.last_trigger(), Some(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_remaining() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(Duration::from_secs(10));
        assert_eq!(gate.remaining(t0), Duration::ZERO);

        gate.try_trigger(t0);
        assert_eq!(gate.remaining(t0 + Duration::from_secs(4)), Duration::from_secs(6));
        assert_eq!(gate.remaining(t0 + Duration::from_secs(30)), Duration::ZERO);
    }

    #[test]
    fn test_reset_permits_immediately() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(Duration::from_secs(10));
        gate.try_trigger(t0);

        gate.reset();
        assert!(gate.last_trigger().is_none());
        assert!(gate.try_trigger(t0 + Duration::from_secs(1)));
    }
}
