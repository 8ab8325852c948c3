//! Screen/world coordinate conversion.
//!
//! There is exactly one forward definition, used by rendering:
//!
//! ```text
//! screen = center + pan + (world - center) * scale
//! ```
//!
//! and its algebraic inverse, used by hit-testing and dragging:
//!
//! ```text
//! world = (screen - center - pan) / scale + center
//! ```
//!
//! Everything that maps between the two spaces goes through this module.

use kurbo::{Affine, Point, Vec2};

use crate::{CanvasError, CanvasResult, Transform, Viewport};

/// Map a world-space point to screen space.
#[must_use]
pub fn screen_from_world(world: Point, transform: &Transform, viewport: &Viewport) -> Point {
    let center = viewport.center();
    center + transform.pan() + (world - center) * transform.scale
}

/// Map a screen-space point to world space.
///
/// # Errors
///
/// Returns [`CanvasError::DegenerateTransform`] if the scale is zero or not finite.
pub fn world_from_screen(
    screen: Point,
    transform: &Transform,
    viewport: &Viewport,
) -> CanvasResult<Point> {
    if transform.is_degenerate() {
        return Err(CanvasError::DegenerateTransform(transform.scale));
    }
    let center = viewport.center();
    Ok(center + (screen - center - transform.pan()) / transform.scale)
}

/// Convert a screen-space displacement to world space.
///
/// # Errors
///
/// Returns [`CanvasError::DegenerateTransform`] if the scale is zero or not finite.
pub fn world_delta(screen_delta: Vec2, transform: &Transform) -> CanvasResult<Vec2> {
    if transform.is_degenerate() {
        return Err(CanvasError::DegenerateTransform(transform.scale));
    }
    Ok(screen_delta / transform.scale)
}

/// The world-to-screen mapping as an affine matrix, for draw calls.
#[must_use]
pub fn board_affine(transform: &Transform, viewport: &Viewport) -> Affine {
    let center = viewport.center().to_vec2();
    Affine::translate(center + transform.pan())
        * Affine::scale(transform.scale)
        * Affine::translate(-center)
}
