//! Tunable gesture thresholds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for gesture arbitration and momentum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Travel (px) before a single-finger contact becomes a pan.
    pub pan_min_distance: f64,
    /// Longest contact that still counts as a tap.
    pub tap_max_duration: Duration,
    /// Furthest travel (px) that still counts as a tap.
    pub tap_max_distance: f64,
    /// Release speed (px/s) below which a pan stops dead.
    pub min_fling_velocity: f64,
    /// Release speed (px/s) is capped to this.
    pub max_fling_velocity: f64,
    /// Velocity multiplier applied once per nominal frame of momentum.
    pub decay_per_frame: f64,
    /// Nominal frame length the decay factor refers to.
    pub frame_interval: Duration,
    /// Momentum ends once speed (px/s) drops below this.
    pub stop_velocity: f64,
    /// How far back release velocity is measured.
    pub velocity_window: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pan_min_distance: 10.0,
            tap_max_duration: Duration::from_millis(200),
            tap_max_distance: 15.0,
            min_fling_velocity: 50.0,
            max_fling_velocity: 8_000.0,
            decay_per_frame: 0.995,
            frame_interval: Duration::from_micros(16_667),
            stop_velocity: 5.0,
            velocity_window: Duration::from_millis(100),
        }
    }
}
