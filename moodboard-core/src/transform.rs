//! Camera transform state and viewport geometry.

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest allowed camera scale.
pub const MIN_SCALE: f64 = 0.1;

/// Largest allowed camera scale.
pub const MAX_SCALE: f64 = 10.0;

/// Scales at or below this are treated as degenerate.
pub const SCALE_EPSILON: f64 = 1e-9;

/// Clamp a scale into `[MIN_SCALE, MAX_SCALE]`. NaN maps to 1.0.
#[must_use]
pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// The camera: pan offset in screen pixels and a uniform scale.
///
/// Applied about the viewport center, see [`crate::coords`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Horizontal pan in screen pixels.
    pub pan_x: f64,
    /// Vertical pan in screen pixels.
    pub pan_y: f64,
    /// Zoom factor (1.0 = 100%).
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// No pan, unit scale.
    pub const IDENTITY: Self = Self {
        pan_x: 0.0,
        pan_y: 0.0,
        scale: 1.0,
    };

    /// Create a transform, clamping the scale into range.
    #[must_use]
    pub fn new(pan_x: f64, pan_y: f64, scale: f64) -> Self {
        Self {
            pan_x,
            pan_y,
            scale: clamp_scale(scale),
        }
    }

    /// The pan as a vector.
    #[must_use]
    pub fn pan(&self) -> Vec2 {
        Vec2::new(self.pan_x, self.pan_y)
    }

    /// Replace the pan.
    pub fn set_pan(&mut self, pan: Vec2) {
        self.pan_x = pan.x;
        self.pan_y = pan.y;
    }

    /// Whether the scale is usable for inverse mapping.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !self.scale.is_finite() || self.scale.abs() <= SCALE_EPSILON
    }
}

/// Size of the on-screen canvas in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport {
    /// Create a viewport of the given size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// The point the camera scales about.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Viewport size.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}
