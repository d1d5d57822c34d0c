//! Motion State Machine
//!
//! Owns the item's position and phase and advances them one tick at a time.
//! The machine is driver-agnostic: an external loop calls
//! [`Conveyor::advance`] with the elapsed time at whatever cadence it likes,
//! and reads back a [`TickReport`] describing what happened.
//!
//! # Phases
//!
//! ```text
//! Approaching ──(end reached AND capture fired; verdict read here)──▶ Diverting
//!      ▲                                                                 │
//!      └────────────(branch reached; instantaneous reset)────────────────┘
//! ```
//!
//! The verdict is read exactly once per pass, at the `Approaching →
//! Diverting` transition. A verdict arriving after that read cannot change
//! the branch already chosen. If the item reaches the end of travel before
//! any capture fired (cooldown starvation) the machine stays in
//! `Approaching`, parked at the end point.

use std::time::Duration;

use glam::Vec3;
use rand::Rng;

use crate::classify::VerdictSlot;
use crate::config::LineConfig;
use crate::trigger::{self, TriggerParams};

/// Move `from` toward `to` by at most `max_step`, never overshooting
#[must_use]
pub fn move_towards(from: Vec3, to: Vec3, max_step: f32) -> Vec3 {
    let delta = to - from;
    let distance = delta.length();
    if distance <= max_step || distance <= f32::EPSILON {
        to
    } else {
        from + delta * (max_step / distance)
    }
}

/// Phase of the item's traversal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Moving from the start position toward the end of travel
    Approaching,
    /// Moving laterally toward the chosen branch target
    Diverting,
}

/// Diversion branch chosen at the end of travel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    /// Verdict was "not defective" (or never arrived): accept side
    Accept,
    /// Verdict was "defective": reject side
    Reject,
}

/// The moving entity
///
/// Created once and reset in place at the end of every full traversal.
#[derive(Clone, Debug)]
pub struct Item {
    /// Current position, mutated each tick
    pub position: Vec3,
    /// Per-pass random orientation around the vertical axis, in degrees
    pub orientation_deg: f32,
    /// Whether a capture has been launched for the current pass
    pub captured_this_pass: bool,
    /// Monotonic time of the last capture; survives resets so the cooldown
    /// spans passes
    pub last_capture_at: Option<Duration>,
}

/// What happened during one call to [`Conveyor::advance`]
#[derive(Clone, Copy, Debug, Default)]
pub struct TickReport {
    /// The capture trigger fired this tick; launch the pipeline now
    pub capture_fired: bool,
    /// The item entered the diverting phase, with the chosen branch
    pub diverted: Option<Branch>,
    /// The item was reset for a new pass this tick
    pub reset: bool,
}

/// The conveyor state machine
pub struct Conveyor {
    config: LineConfig,
    item: Item,
    phase: Phase,
    branch_target: Option<Vec3>,
    pending_reset: bool,
    clock: Duration,
    verdict: VerdictSlot,
}

impl Conveyor {
    /// Create a conveyor with its item seated at the start position
    pub fn new(config: LineConfig, verdict: VerdictSlot) -> Self {
        let mut conveyor = Self {
            item: Item {
                position: config.start(),
                orientation_deg: 0.0,
                captured_this_pass: false,
                last_capture_at: None,
            },
            config,
            phase: Phase::Approaching,
            branch_target: None,
            pending_reset: false,
            clock: Duration::ZERO,
            verdict,
        };
        conveyor.reset();
        conveyor
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The item being moved
    #[must_use]
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Current item position
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.item.position
    }

    /// Monotonic simulation clock, total elapsed time fed to `advance`
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Re-initialize all per-pass state in place
    ///
    /// Seats the item back at the start position with a fresh random
    /// orientation, clears the capture guard, resets the verdict to "not
    /// defective", and re-enters `Approaching`. The last-capture timestamp
    /// is deliberately kept so the cooldown spans passes. Idempotent apart
    /// from the random orientation.
    pub fn reset(&mut self) {
        self.item.position = self.config.start();
        self.item.orientation_deg = rand::thread_rng().gen_range(-5.0..5.0);
        self.item.captured_this_pass = false;
        self.branch_target = None;
        self.phase = Phase::Approaching;
        self.verdict.reset();
        tracing::debug!(orientation_deg = self.item.orientation_deg, "pass reset");
    }

    /// Advance the simulation by `dt`
    ///
    /// Moves the item toward its active target (clamped, never
    /// overshooting), evaluates the capture trigger, and performs phase
    /// transitions. A tick that applies a pending reset does only that.
    pub fn advance(&mut self, dt: Duration) -> TickReport {
        let mut report = TickReport::default();

        if self.pending_reset {
            self.pending_reset = false;
            self.reset();
            report.reset = true;
            return report;
        }

        self.clock += dt;
        let step = self.config.speed * dt.as_secs_f32();

        match self.phase {
            Phase::Approaching => {
                let start = self.config.start();
                let end = self.config.end();
                let target = Vec3::new(start.x, start.y, end.z);
                self.item.position = move_towards(self.item.position, target, step);

                let distance = trigger::gate_distance(self.item.position);
                let params = TriggerParams {
                    radius: self.config.trigger_radius,
                    cooldown: self.config.cooldown(),
                };
                if trigger::should_capture(
                    params,
                    distance,
                    self.clock,
                    self.item.last_capture_at,
                    self.item.captured_this_pass,
                ) {
                    self.item.captured_this_pass = true;
                    self.item.last_capture_at = Some(self.clock);
                    report.capture_fired = true;
                    tracing::info!(distance, t = ?self.clock, "capture trigger fired");
                }

                let at_end = (self.item.position.z - end.z).abs() < self.config.arrival_epsilon;
                if at_end && self.item.captured_this_pass {
                    // The single verdict read point of the pass.
                    let verdict = self.verdict.load();
                    let branch = if verdict.is_defective {
                        Branch::Reject
                    } else {
                        Branch::Accept
                    };
                    let lateral = match branch {
                        Branch::Accept => self.config.accept_offset,
                        Branch::Reject => self.config.reject_offset,
                    };
                    self.branch_target = Some(Vec3::new(lateral, self.item.position.y, end.z));
                    self.phase = Phase::Diverting;
                    report.diverted = Some(branch);
                    tracing::info!(
                        ?branch,
                        is_defective = verdict.is_defective,
                        defect_type = verdict.defect_type.as_deref().unwrap_or(""),
                        "end of travel reached, diverting"
                    );
                }
            }
            Phase::Diverting => {
                if let Some(target) = self.branch_target {
                    self.item.position = move_towards(self.item.position, target, step);
                    if (self.item.position.x - target.x).abs() < self.config.arrival_epsilon {
                        self.pending_reset = true;
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use crate::classify::Verdict;

    use super::*;

    const DT: Duration = Duration::from_millis(50);

    fn test_config() -> LineConfig {
        LineConfig::default()
    }

    fn new_conveyor(config: LineConfig) -> (Conveyor, VerdictSlot) {
        let slot = VerdictSlot::default();
        (Conveyor::new(config, slot.clone()), slot)
    }

    /// Step until a predicate holds, with a tick budget to catch hangs
    fn step_until(
        conveyor: &mut Conveyor,
        max_ticks: usize,
        mut pred: impl FnMut(&Conveyor, TickReport) -> bool,
    ) -> bool {
        for _ in 0..max_ticks {
            let report = conveyor.advance(DT);
            if pred(conveyor, report) {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_move_towards_clamps_at_target() {
        let from = Vec3::new(0.0, 0.0, 0.0);
        let to = Vec3::new(0.0, 0.0, 1.0);
        assert_eq!(move_towards(from, to, 10.0), to);
        assert_eq!(move_towards(from, to, 0.25), Vec3::new(0.0, 0.0, 0.25));
        assert_eq!(move_towards(to, to, 0.25), to);
    }

    #[test]
    fn test_position_monotonically_approaches_target() {
        let (mut conveyor, _slot) = new_conveyor(test_config());
        let end_z = conveyor.config.end().z;
        let mut previous = (conveyor.position().z - end_z).abs();

        for _ in 0..100 {
            conveyor.advance(DT);
            let remaining = (conveyor.position().z - end_z).abs();
            assert!(remaining <= previous, "overshot or moved away from target");
            previous = remaining;
        }
    }

    #[test]
    fn test_exactly_one_capture_per_pass() {
        let (mut conveyor, _slot) = new_conveyor(test_config());
        let mut fired = 0;

        // A full pass takes ~4.2s of travel; 200 ticks of 50ms covers it
        // well past the divert transition.
        for _ in 0..200 {
            if conveyor.advance(DT).capture_fired {
                fired += 1;
            }
            if conveyor.phase() == Phase::Diverting {
                break;
            }
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_default_verdict_diverts_to_accept_side() {
        let (mut conveyor, _slot) = new_conveyor(test_config());

        let mut branch = None;
        assert!(step_until(&mut conveyor, 200, |_, r| {
            branch = branch.or(r.diverted);
            branch.is_some()
        }));
        assert_eq!(branch, Some(Branch::Accept));

        // Keep going: lateral motion heads toward the positive offset.
        assert!(step_until(&mut conveyor, 200, |c, _| c.position().x > 1.0));
    }

    #[test]
    fn test_defective_verdict_diverts_to_reject_side() {
        let (mut conveyor, slot) = new_conveyor(test_config());
        slot.store(Verdict {
            is_defective: true,
            defect_type: Some("crack".to_string()),
            defect_percentage: 0.42,
            threshold: 0.3,
            message: None,
        });

        let mut branch = None;
        assert!(step_until(&mut conveyor, 200, |_, r| {
            branch = branch.or(r.diverted);
            branch.is_some()
        }));
        assert_eq!(branch, Some(Branch::Reject));
        assert!(step_until(&mut conveyor, 200, |c, _| c.position().x < -1.0));
    }

    #[test]
    fn test_verdict_arriving_after_transition_is_ignored() {
        let (mut conveyor, slot) = new_conveyor(test_config());

        assert!(step_until(&mut conveyor, 200, |_, r| r.diverted.is_some()));

        // Late write from a slow pipeline; the branch is already chosen.
        slot.store(Verdict {
            is_defective: true,
            ..Verdict::default()
        });
        assert!(step_until(&mut conveyor, 200, |c, _| c.position().x > 1.0));
    }

    #[test]
    fn test_full_cycle_resets_for_a_new_pass() {
        let (mut conveyor, _slot) = new_conveyor(test_config());

        assert!(step_until(&mut conveyor, 400, |_, r| r.reset));
        assert_eq!(conveyor.phase(), Phase::Approaching);
        assert_eq!(conveyor.position(), conveyor.config.start());
        assert!(!conveyor.item().captured_this_pass);
        // The cooldown reference point survives the reset.
        assert!(conveyor.item().last_capture_at.is_some());
    }

    #[test]
    fn test_cooldown_starvation_parks_item_at_end_of_travel() {
        let mut config = test_config();
        config.cooldown_secs = 1000.0;
        let (mut conveyor, _slot) = new_conveyor(config);

        // First pass captures (no previous timestamp) and completes.
        assert!(step_until(&mut conveyor, 400, |_, r| r.reset));

        // Second pass: cooldown blocks the trigger, so the item reaches the
        // end of travel and never diverts.
        let mut fired = false;
        for _ in 0..400 {
            let report = conveyor.advance(DT);
            fired |= report.capture_fired;
            assert!(report.diverted.is_none());
        }
        assert!(!fired);
        assert_eq!(conveyor.phase(), Phase::Approaching);
        let end_z = conveyor.config.end().z;
        assert!((conveyor.position().z - end_z).abs() < 1e-3);
    }

    #[test]
    fn test_reset_is_idempotent_apart_from_orientation() {
        let (mut conveyor, slot) = new_conveyor(test_config());
        assert!(step_until(&mut conveyor, 200, |_, r| r.capture_fired));
        slot.store(Verdict {
            is_defective: true,
            ..Verdict::default()
        });

        conveyor.reset();
        let once = (
            conveyor.position(),
            conveyor.phase(),
            conveyor.item().captured_this_pass,
            slot.load(),
        );
        conveyor.reset();
        let twice = (
            conveyor.position(),
            conveyor.phase(),
            conveyor.item().captured_this_pass,
            slot.load(),
        );

        assert_eq!(once, twice);
        assert_eq!(slot.load(), Verdict::default());
    }
}
