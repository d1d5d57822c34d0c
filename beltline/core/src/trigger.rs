//! Capture Trigger Evaluation
//!
//! Decides when a snapshot of the item should be taken: the first tick of a
//! pass where the item is inside the trigger radius of the gate point and
//! the cooldown since the previous capture has elapsed.
//!
//! The evaluator is a pure predicate over state owned by the item; the
//! caller commits the side effects (`captured_this_pass`,
//! `last_capture_at`) in the same tick it fires, so the item staying inside
//! the radius on subsequent ticks cannot re-fire it.

use std::time::Duration;

use glam::Vec3;

/// Fixed trigger parameters
#[derive(Clone, Copy, Debug)]
pub struct TriggerParams {
    /// Capture fires once the gate distance drops to this radius
    pub radius: f32,
    /// Minimum time since the last capture before another may fire
    pub cooldown: Duration,
}

/// Distance from the item to the gate point at the origin, with the lateral
/// (diversion) axis ignored
///
/// Only height and travel-axis components count, so an item parked on a
/// branch does not read as "at the gate".
#[must_use]
pub fn gate_distance(position: Vec3) -> f32 {
    Vec3::new(0.0, position.y, position.z).length()
}

/// Decide whether a capture should fire this tick
///
/// Fires when all of the following hold:
/// - `gate_distance <= radius`
/// - strictly more than `cooldown` has passed since `last_capture_at`
///   (a `None` timestamp never blocks)
/// - no capture has fired yet this pass
///
/// At most one `true` per pass: the caller must record the capture in the
/// same tick, and the `captured_this_pass` guard covers even a radius wider
/// than the travel path.
#[must_use]
pub fn should_capture(
    params: TriggerParams,
    gate_distance: f32,
    now: Duration,
    last_capture_at: Option<Duration>,
    captured_this_pass: bool,
) -> bool {
    if captured_this_pass || gate_distance > params.radius {
        return false;
    }
    match last_capture_at {
        Some(last) => now.saturating_sub(last) > params.cooldown,
        None => true,
    }
}
