//! Single-finger pan of the camera.

use kurbo::{Point, Vec2};

use super::momentum::{Momentum, VelocityTracker};
use super::GestureConfig;
use crate::Transform;

/// One pan gesture, from activation to release.
///
/// Pan follows the raw screen translation of the finger, so the board
/// moves exactly with the finger whatever the zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct PanSession {
    start_screen: Point,
    baseline: Vec2,
}

impl PanSession {
    /// Begin a pan from the contact's down-point and the camera's pan at that moment.
    #[must_use]
    pub fn begin(start_screen: Point, transform: &Transform) -> Self {
        Self {
            start_screen,
            baseline: transform.pan(),
        }
    }

    /// Apply a new contact position.
    pub fn update(&self, current_screen: Point, transform: &mut Transform) {
        transform.set_pan(self.baseline + (current_screen - self.start_screen));
    }

    /// Finish the pan and hand back momentum if the flick was fast enough.
    ///
    /// Release velocity is divided by `max(scale, 1)`: zoomed in, a flick
    /// carries proportionally less, zoomed out it is never amplified.
    #[must_use]
    pub fn release(
        &self,
        tracker: &VelocityTracker,
        transform: &Transform,
        timestamp_ms: u64,
        config: &GestureConfig,
    ) -> Option<Momentum> {
        let effective_scale = transform.scale.max(1.0);
        let velocity = tracker.velocity(config.velocity_window) / effective_scale;
        Momentum::launch(velocity, timestamp_ms, config)
    }
}
