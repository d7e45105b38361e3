//! Time-driven scheduling: the settings debounce and the reconciliation
//! cadence. Every entry point takes `now` explicitly so behaviour does not
//! depend on the wall clock.

use std::time::Duration;

use tracing::{debug, trace};

use crate::{
    mapping::{ChangeSet, Invalidation},
    SettingsPatch, VisualizerSettings,
};

/// Monotonic engine time, advanced by the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineClock {
    elapsed: Duration,
}

impl EngineClock {
    pub fn now(&self) -> Duration {
        self.elapsed
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    pub fn advance(&mut self, delta: Duration) -> Duration {
        self.elapsed += delta;
        self.elapsed
    }
}

#[derive(Debug, Clone)]
struct PendingUpdate {
    patch: SettingsPatch,
    deadline: Duration,
}

/// A settings snapshot that left the debounce window.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedChange {
    pub settings: VisualizerSettings,
    pub changes: ChangeSet,
    pub invalidation: Invalidation,
}

/// Coalesces bursts of partial settings updates and classifies the net
/// change against the last applied snapshot.
///
/// The debounce is trailing: every submission pushes the deadline out by
/// one window and later keys overwrite earlier ones.
#[derive(Debug, Clone)]
pub struct InvalidationScheduler {
    last_applied: VisualizerSettings,
    pending: Option<PendingUpdate>,
    debounce: Duration,
}

impl InvalidationScheduler {
    pub fn new(initial: VisualizerSettings, debounce: Duration) -> Self {
        Self {
            last_applied: initial,
            pending: None,
            debounce,
        }
    }

    pub fn last_applied(&self) -> &VisualizerSettings {
        &self.last_applied
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending update, if any.
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    pub fn submit(&mut self, patch: SettingsPatch, now: Duration) {
        let deadline = now + self.debounce;
        match self.pending.as_mut() {
            Some(pending) => {
                pending.patch.coalesce(&patch);
                pending.deadline = deadline;
                trace!(?deadline, "coalesced settings update");
            }
            None => {
                self.pending = Some(PendingUpdate { patch, deadline });
            }
        }
    }

    /// Applies the pending update once its window has closed.
    pub fn poll(&mut self, now: Duration) -> Option<AppliedChange> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => self.flush(),
            _ => None,
        }
    }

    /// Applies the pending update regardless of its deadline.
    pub fn flush(&mut self) -> Option<AppliedChange> {
        let pending = self.pending.take()?;
        Some(self.apply_now(&pending.patch))
    }

    /// Merges `patch` over the last applied snapshot immediately, bypassing
    /// the debounce window.
    pub fn apply_now(&mut self, patch: &SettingsPatch) -> AppliedChange {
        let settings = self.last_applied.merged(patch);
        let changes = ChangeSet::between(&self.last_applied, &settings);
        let invalidation = changes.invalidation();
        debug!(changed = changes.len(), ?invalidation, "applied settings");
        self.last_applied = settings.clone();
        AppliedChange {
            settings,
            changes,
            invalidation,
        }
    }

    /// Drops the pending update without applying it.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Cancels any pending update and restarts from `settings`.
    pub fn reset(&mut self, settings: VisualizerSettings) {
        self.pending = None;
        self.last_applied = settings;
    }
}

/// Fixed-cadence timer for the reconciliation loop, decoupled from the
/// render frame rate.
#[derive(Debug, Clone)]
pub struct ReconcileTimer {
    interval: Duration,
    next_due: Option<Duration>,
    stopped: bool,
}

impl ReconcileTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            stopped: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The first call is always due.
    pub fn due(&self, now: Duration) -> bool {
        !self.stopped && self.next_due.map_or(true, |next| now >= next)
    }

    /// Schedules the next tick one interval after `now`. Late ticks are not
    /// replayed.
    pub fn advance(&mut self, now: Duration) {
        self.next_due = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn scheduler() -> InvalidationScheduler {
        InvalidationScheduler::new(VisualizerSettings::default(), ms(16))
    }

    #[test]
    fn clock_advances_and_resets() {
        let mut clock = EngineClock::default();
        clock.advance(ms(10));
        assert_eq!(clock.advance(ms(5)), ms(15));
        clock.reset();
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn update_waits_for_the_window() {
        let mut scheduler = scheduler();
        scheduler.submit(
            SettingsPatch {
                ring_count: Some(7.0),
                ..Default::default()
            },
            ms(0),
        );
        assert!(scheduler.poll(ms(15)).is_none());
        let applied = scheduler.poll(ms(16)).unwrap();
        assert_eq!(applied.settings.ring_count, 7);
        assert!(matches!(applied.invalidation, Invalidation::Regenerate { .. }));
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn burst_applies_only_the_last_value() {
        let mut scheduler = scheduler();
        for (step, opacity) in [0.1, 0.2, 0.3, 0.4].into_iter().enumerate() {
            scheduler.submit(
                SettingsPatch {
                    ring_opacity: Some(opacity),
                    ..Default::default()
                },
                ms(step as u64 * 10),
            );
        }
        assert!(scheduler.poll(ms(40)).is_none());
        let applied = scheduler.poll(ms(46)).unwrap();
        assert_eq!(applied.settings.ring_opacity, 0.4);
        assert_eq!(applied.invalidation, Invalidation::PatchMaterials);
        assert!(scheduler.poll(ms(100)).is_none());
    }

    #[test]
    fn burst_keeps_keys_from_earlier_calls() {
        let mut scheduler = scheduler();
        scheduler.submit(
            SettingsPatch {
                ring_opacity: Some(0.3),
                ..Default::default()
            },
            ms(0),
        );
        scheduler.submit(
            SettingsPatch {
                organic_noise: Some(0.9),
                ..Default::default()
            },
            ms(5),
        );
        let applied = scheduler.flush().unwrap();
        assert_eq!(applied.settings.ring_opacity, 0.3);
        assert_eq!(applied.settings.organic_noise, 0.9);
        assert_eq!(applied.changes.len(), 2);
    }

    #[test]
    fn no_net_change_only_renders() {
        let mut scheduler = scheduler();
        let current = SettingsPatch::from(scheduler.last_applied());
        let applied = scheduler.apply_now(&current);
        assert!(applied.changes.is_empty());
        assert_eq!(applied.invalidation, Invalidation::RenderOnly);
    }

    #[test]
    fn cancel_and_reset_drop_pending_work() {
        let mut scheduler = scheduler();
        scheduler.submit(
            SettingsPatch {
                ring_count: Some(3.0),
                ..Default::default()
            },
            ms(0),
        );
        assert!(scheduler.cancel());
        assert!(scheduler.poll(ms(100)).is_none());
        assert_eq!(scheduler.last_applied().ring_count, VisualizerSettings::default().ring_count);

        scheduler.submit(SettingsPatch::default(), ms(0));
        scheduler.reset(VisualizerSettings::default());
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn timer_ticks_at_its_own_cadence() {
        let mut timer = ReconcileTimer::new(ms(66));
        assert!(timer.due(ms(0)));
        timer.advance(ms(0));
        assert!(!timer.due(ms(16)));
        assert!(!timer.due(ms(65)));
        assert!(timer.due(ms(66)));
        timer.stop();
        assert!(!timer.due(ms(1000)));
    }
}
