//! Release velocity estimation and inertial decay.

use std::collections::VecDeque;

use kurbo::{Point, Vec2};

use super::GestureConfig;

/// Upper bound on retained samples; the time window usually trims first.
const MAX_SAMPLES: usize = 32;

/// Estimates release velocity from recent contact positions.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    samples: VecDeque<(u64, Point)>,
}

impl VelocityTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all samples.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Record a position at a timestamp (ms). Out-of-order samples are dropped.
    pub fn add(&mut self, timestamp_ms: u64, position: Point) {
        if self
            .samples
            .back()
            .is_some_and(|&(last, _)| timestamp_ms < last)
        {
            return;
        }
        if self.samples.len() == MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back((timestamp_ms, position));
    }

    /// Velocity in px/s over the trailing `window`.
    ///
    /// Zero when fewer than two samples fall inside the window, which is
    /// the case when the finger rested before lifting.
    #[must_use]
    pub fn velocity(&self, window: std::time::Duration) -> Vec2 {
        let Some(&(last_ms, last_pos)) = self.samples.back() else {
            return Vec2::ZERO;
        };
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        let cutoff = last_ms.saturating_sub(window_ms);
        let Some(&(first_ms, first_pos)) = self.samples.iter().find(|(t, _)| *t >= cutoff) else {
            return Vec2::ZERO;
        };
        if first_ms >= last_ms {
            return Vec2::ZERO;
        }
        #[allow(clippy::cast_precision_loss)]
        let dt = (last_ms - first_ms) as f64 / 1000.0;
        (last_pos - first_pos) / dt
    }
}

/// Result of advancing momentum by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumStep {
    /// Screen-space displacement to add to the pan.
    pub displacement: Vec2,
    /// Whether the motion has come to rest.
    pub settled: bool,
}

/// Post-release pan motion whose velocity shrinks geometrically per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Momentum {
    velocity: Vec2,
    last_ms: u64,
}

impl Momentum {
    /// Start momentum from a release velocity (px/s) at `timestamp_ms`.
    ///
    /// The velocity is capped to `max_fling_velocity`. Returns `None` when it
    /// is below `min_fling_velocity`.
    #[must_use]
    pub fn launch(velocity: Vec2, timestamp_ms: u64, config: &GestureConfig) -> Option<Self> {
        let speed = velocity.length();
        if !speed.is_finite() || speed < config.min_fling_velocity {
            return None;
        }
        let velocity = if speed > config.max_fling_velocity {
            velocity * (config.max_fling_velocity / speed)
        } else {
            velocity
        };
        Some(Self {
            velocity,
            last_ms: timestamp_ms,
        })
    }

    /// Current velocity in px/s.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Advance to `timestamp_ms`.
    ///
    /// The decay factor applies per nominal frame and is scaled to the real
    /// elapsed time, so uneven frame pacing covers the same distance.
    pub fn step(&mut self, timestamp_ms: u64, config: &GestureConfig) -> MomentumStep {
        let elapsed_ms = timestamp_ms.saturating_sub(self.last_ms);
        self.last_ms = self.last_ms.max(timestamp_ms);

        #[allow(clippy::cast_precision_loss)]
        let dt = elapsed_ms as f64 / 1000.0;
        let frame = config.frame_interval.as_secs_f64();
        let decay = config.decay_per_frame;

        let displacement = if dt <= 0.0 {
            Vec2::ZERO
        } else if decay >= 1.0 || decay <= 0.0 || frame <= 0.0 {
            self.velocity * dt
        } else {
            // v(t) = v0 * decay^(t / frame); integrate over [0, dt].
            let lambda = -decay.ln() / frame;
            let factor = (-lambda * dt).exp();
            let moved = self.velocity * ((1.0 - factor) / lambda);
            self.velocity *= factor;
            moved
        };

        MomentumStep {
            displacement,
            settled: self.velocity.length() < config.stop_velocity,
        }
    }
}
