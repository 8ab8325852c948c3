//! Two-finger pinch zoom anchored at the focal point.

use kurbo::{Point, Vec2};

use crate::transform::clamp_scale;
use crate::{Transform, Viewport};

/// Finger spreads below this (px) give no usable ratio.
const MIN_PINCH_DISTANCE: f64 = 1.0;

/// One pinch gesture, from the second finger down to either finger up.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomSession {
    baseline_scale: f64,
    baseline_pan: Vec2,
    focal: Point,
    initial_distance: f64,
    factor: f64,
}

impl ZoomSession {
    /// Begin a pinch between two contacts.
    ///
    /// The focal point is their midpoint at this moment and stays fixed for
    /// the rest of the gesture.
    #[must_use]
    pub fn begin(a: Point, b: Point, transform: &Transform) -> Self {
        Self {
            baseline_scale: clamp_scale(transform.scale),
            baseline_pan: transform.pan(),
            focal: a.midpoint(b),
            initial_distance: a.distance(b),
            factor: 1.0,
        }
    }

    /// Screen-space focal point.
    #[must_use]
    pub fn focal(&self) -> Point {
        self.focal
    }

    /// Apply new contact positions.
    pub fn update(&mut self, a: Point, b: Point, transform: &mut Transform, viewport: &Viewport) {
        let factor = if self.initial_distance < MIN_PINCH_DISTANCE {
            1.0
        } else {
            a.distance(b) / self.initial_distance
        };
        self.apply_factor(factor, transform, viewport);
    }

    /// Apply a raw pinch scale factor relative to the gesture start.
    ///
    /// Sets `scale = clamp(baseline * factor)` and moves the pan so the world
    /// point under the focal point stays under it:
    /// `pan = (focal - center) * (1 - r) + baseline_pan * r` with
    /// `r = scale / baseline`.
    pub fn apply_factor(&mut self, factor: f64, transform: &mut Transform, viewport: &Viewport) {
        if !factor.is_finite() || factor <= 0.0 {
            tracing::trace!("Ignoring pinch factor {factor}");
            return;
        }
        self.factor = factor;
        self.apply(transform, viewport);
    }

    /// Shift the pre-zoom pan, e.g. by momentum still running under the pinch.
    pub fn shift_baseline(&mut self, delta: Vec2, transform: &mut Transform, viewport: &Viewport) {
        self.baseline_pan += delta;
        self.apply(transform, viewport);
    }

    fn apply(&self, transform: &mut Transform, viewport: &Viewport) {
        let scale = clamp_scale(self.baseline_scale * self.factor);
        let ratio = scale / self.baseline_scale;
        let focal_offset = self.focal - viewport.center();
        transform.set_pan(focal_offset * (1.0 - ratio) + self.baseline_pan * ratio);
        transform.scale = scale;
    }
}
