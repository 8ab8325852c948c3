//! Render projection: turns the scene and camera into screen-space draw data.
//!
//! Pure and synchronous; recomputed whenever the transform or an item moves.

use kurbo::{Affine, Point, Rect, Vec2};
use serde::Serialize;

use crate::coords::{board_affine, world_from_screen};
use crate::{Item, ItemId, Scene};

/// Selection outline width in screen pixels.
pub const SELECTED_BORDER_WIDTH: f64 = 3.0;

/// Default grid spacing in world units.
pub const GRID_SPACING: f64 = 20.0;

/// The grid covers `max(width, height) * WORLD_SIZE_MULTIPLIER` world units
/// in every direction from the origin.
pub const WORLD_SIZE_MULTIPLIER: f64 = 8.0;

/// Grid lines closer than this on screen (px) are not drawn.
pub const MIN_GRID_SCREEN_SPACING: f64 = 2.0;

/// Grid background options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStyle {
    /// Distance between lines in world units.
    pub spacing: f64,
    /// Whether to emit grid lines at all.
    pub visible: bool,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            spacing: GRID_SPACING,
            visible: true,
        }
    }
}

/// One item ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDraw {
    /// Item ID.
    pub id: ItemId,
    /// Image source.
    pub uri: String,
    /// Maps item-local coordinates `(0,0)..(width,height)` to screen space,
    /// including rotation about the item center and horizontal flip.
    pub affine: Affine,
    /// Screen-space bounding box.
    pub screen_rect: Rect,
    /// Selection outline, present only for the selected item.
    pub selection_border: Option<Rect>,
}

/// A grid line segment in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridLine {
    /// Start point.
    pub start: Point,
    /// End point.
    pub end: Point,
}

/// Everything a renderer needs for one frame, bottom-most first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawList {
    /// World-to-screen matrix shared by the whole board.
    pub board: Affine,
    /// Visible grid lines.
    pub grid: Vec<GridLine>,
    /// Items in draw order.
    pub items: Vec<ItemDraw>,
}

/// Item-local to world: rotate and flip about the item center, then place.
#[must_use]
pub fn item_affine(item: &Item) -> Affine {
    let half = Vec2::new(item.width / 2.0, item.height / 2.0);
    let flip = if item.flip_horizontal { -1.0 } else { 1.0 };
    Affine::translate(item.origin().to_vec2() + half)
        * Affine::rotate(item.rotation.radians())
        * Affine::scale_non_uniform(flip, 1.0)
        * Affine::translate(-half)
}

/// Project the whole scene.
#[must_use]
pub fn project(scene: &Scene, grid: GridStyle) -> DrawList {
    let board = board_affine(&scene.transform, &scene.viewport);
    let selected = scene.selected();
    let items = scene
        .items()
        .map(|item| {
            let affine = board * item_affine(item);
            let screen_rect = affine.transform_rect_bbox(Rect::new(0.0, 0.0, item.width, item.height));
            ItemDraw {
                id: item.id,
                uri: item.uri.clone(),
                affine,
                screen_rect,
                selection_border: (selected == Some(item.id))
                    .then(|| screen_rect.inflate(SELECTED_BORDER_WIDTH, SELECTED_BORDER_WIDTH)),
            }
        })
        .collect();

    DrawList {
        board,
        grid: if grid.visible {
            grid_lines(scene, grid.spacing)
        } else {
            Vec::new()
        },
        items,
    }
}

/// Grid lines that intersect the viewport, in screen space.
#[must_use]
pub fn grid_lines(scene: &Scene, spacing: f64) -> Vec<GridLine> {
    if !spacing.is_finite() || spacing * scene.transform.scale < MIN_GRID_SCREEN_SPACING {
        tracing::trace!(spacing, scale = scene.transform.scale, "Grid too dense to draw");
        return Vec::new();
    }
    let viewport = &scene.viewport;
    let extent = viewport.width.max(viewport.height) * WORLD_SIZE_MULTIPLIER;

    let corners = (
        world_from_screen(Point::ZERO, &scene.transform, viewport),
        world_from_screen(
            Point::new(viewport.width, viewport.height),
            &scene.transform,
            viewport,
        ),
    );
    let (Ok(top_left), Ok(bottom_right)) = corners else {
        tracing::debug!("Grid skipped: degenerate transform");
        return Vec::new();
    };
    let visible = Rect::from_points(top_left, bottom_right)
        .intersect(Rect::new(-extent, -extent, extent, extent));
    if visible.width() <= 0.0 || visible.height() <= 0.0 {
        return Vec::new();
    }

    let board = board_affine(&scene.transform, viewport);
    let mut lines = Vec::new();
    for x in grid_positions(-extent, extent, visible.x0, visible.x1, spacing) {
        lines.push(GridLine {
            start: board * Point::new(x, visible.y0),
            end: board * Point::new(x, visible.y1),
        });
    }
    for y in grid_positions(-extent, extent, visible.y0, visible.y1, spacing) {
        lines.push(GridLine {
            start: board * Point::new(visible.x0, y),
            end: board * Point::new(visible.x1, y),
        });
    }
    lines
}

/// Positions `origin + k * spacing` within `[lo, hi]`, also bounded by `limit`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn grid_positions(origin: f64, limit: f64, lo: f64, hi: f64, spacing: f64) -> impl Iterator<Item = f64> {
    let first = ((lo - origin) / spacing).ceil().max(0.0);
    let last = ((hi.min(limit) - origin) / spacing).floor();
    let (first, last) = (first as i64, last as i64);
    (first..=last).map(move |k| origin + k as f64 * spacing)
}
