//! Dragging the selected item.

use kurbo::Point;

use crate::coords::world_delta;
use crate::{BoardEvent, ItemId, Scene};

/// One item drag, from the down-point on the selected item to release.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    item: ItemId,
    start_screen: Point,
    start_origin: Point,
}

impl DragSession {
    /// Start dragging if `screen` lands on the currently selected item.
    ///
    /// Returns `None` when nothing is selected or the point misses it; the
    /// contact is then free to become a pan or a tap.
    #[must_use]
    pub fn begin(scene: &Scene, screen: Point) -> Option<Self> {
        let item = scene.selected_item()?;
        if !scene.hits_item(item.id, screen) {
            return None;
        }
        Some(Self {
            item: item.id,
            start_screen: screen,
            start_origin: item.origin(),
        })
    }

    /// The item being dragged.
    #[must_use]
    pub fn item(&self) -> ItemId {
        self.item
    }

    /// Move the item to follow the contact.
    ///
    /// The screen delta is divided by the current scale so the item stays
    /// under the finger at any zoom.
    pub fn update(&self, scene: &mut Scene, current_screen: Point) {
        let delta = match world_delta(current_screen - self.start_screen, &scene.transform) {
            Ok(delta) => delta,
            Err(e) => {
                tracing::trace!("Drag step skipped: {e}");
                return;
            }
        };
        if let Err(e) = scene.set_item_position(self.item, self.start_origin + delta) {
            tracing::debug!("Dragged item vanished: {e}");
        }
    }

    /// Finish the drag, reporting the final position.
    #[must_use]
    pub fn finish(&self, scene: &Scene) -> Option<BoardEvent> {
        let item = scene.get_item(self.item)?;
        Some(BoardEvent::ItemMoved {
            id: item.id,
            x: item.x,
            y: item.y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Item, Transform};

    fn scene_with_selected() -> (Scene, ItemId) {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add_item(Item::new("a.png", 100.0, 100.0, 200.0, 200.0));
        scene.select(id).expect("select");
        (scene, id)
    }

    #[test]
    fn test_begin_requires_selection() {
        let mut scene = Scene::new(800.0, 600.0);
        scene.add_item(Item::new("a.png", 100.0, 100.0, 200.0, 200.0));
        assert!(DragSession::begin(&scene, Point::new(150.0, 150.0)).is_none());
    }

    #[test]
    fn test_begin_requires_hit_on_selected() {
        let (scene, id) = scene_with_selected();
        assert!(DragSession::begin(&scene, Point::new(50.0, 50.0)).is_none());
        let session = DragSession::begin(&scene, Point::new(150.0, 150.0)).expect("hit");
        assert_eq!(session.item(), id);
    }

    #[test]
    fn test_drag_divides_by_scale() {
        let (mut scene, id) = scene_with_selected();
        scene.transform = Transform::new(0.0, 0.0, 2.0);
        // World (150, 150) is on screen at (-100, 0) at 2x about (400, 300).
        let start = Point::new(-100.0, 0.0);
        let session = DragSession::begin(&scene, start).expect("hit");
        session.update(&mut scene, Point::new(-60.0, 20.0));

        let item = scene.get_item(id).expect("item");
        assert!((item.x - 120.0).abs() < 1e-9);
        assert!((item.y - 110.0).abs() < 1e-9);

        match session.finish(&scene) {
            Some(BoardEvent::ItemMoved { id: moved, x, y }) => {
                assert_eq!(moved, id);
                assert!((x - 120.0).abs() < 1e-9);
                assert!((y - 110.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_drag_is_absolute_from_start() {
        let (mut scene, id) = scene_with_selected();
        let session = DragSession::begin(&scene, Point::new(150.0, 150.0)).expect("hit");
        session.update(&mut scene, Point::new(250.0, 250.0));
        session.update(&mut scene, Point::new(150.0, 150.0));
        let item = scene.get_item(id).expect("item");
        assert!((item.x - 100.0).abs() < 1e-9);
        assert!((item.y - 100.0).abs() < 1e-9);
    }
}
