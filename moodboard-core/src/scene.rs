//! The board scene: items in z order, the selection and the camera.

use kurbo::Point;

use crate::coords;
use crate::{CanvasError, CanvasResult, Item, ItemId, Transform, Viewport};

/// Everything on one board that gestures read and write.
///
/// `items` is kept sorted by ascending `z_index`; ties keep their relative
/// (creation) order because every re-sort is stable.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Items, bottom-most first.
    items: Vec<Item>,
    /// The selected item, if any.
    selected: Option<ItemId>,
    /// On-screen canvas size.
    pub viewport: Viewport,
    /// Camera pan and scale.
    pub transform: Transform,
}

impl Scene {
    /// Create a new empty scene with the given viewport size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            viewport: Viewport::new(width, height),
            transform: Transform::IDENTITY,
        }
    }

    /// Replace all items, ordering them by z-index then creation time.
    #[must_use]
    pub fn with_items(mut self, mut items: Vec<Item>) -> Self {
        items.sort_by(|a, b| {
            a.z_index
                .cmp(&b.z_index)
                .then(a.created_at.cmp(&b.created_at))
        });
        self.items = items;
        self.selected = None;
        self
    }

    /// Set the camera transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Add an item to the scene, keeping z order.
    pub fn add_item(&mut self, item: Item) -> ItemId {
        let id = item.id;
        self.items.push(item);
        self.sort();
        id
    }

    /// Append freshly imported items on top of everything already present.
    ///
    /// The first gets `max + 1`, the next `max + 2` and so on, preserving
    /// the order given. On an empty board numbering starts at 0.
    pub fn add_imported(&mut self, items: Vec<Item>) -> Vec<ItemId> {
        let mut next = self.max_z_index().map_or(0, |z| z.saturating_add(1));
        let mut ids = Vec::with_capacity(items.len());
        for mut item in items {
            item.z_index = next;
            next = next.saturating_add(1);
            ids.push(item.id);
            self.items.push(item);
        }
        self.sort();
        ids
    }

    /// Get an item by ID.
    #[must_use]
    pub fn get_item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Current position of an item in draw order, resolved fresh each call.
    #[must_use]
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Move an item's top-left corner to a world-space point.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is not found or `origin` is not finite.
    pub fn set_item_position(&mut self, id: ItemId, origin: Point) -> CanvasResult<()> {
        if !origin.is_finite() {
            return Err(CanvasError::InvalidOperation(format!(
                "non-finite position {origin:?}"
            )));
        }
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| CanvasError::ItemNotFound(id.to_string()))?;
        item.x = origin.x;
        item.y = origin.y;
        Ok(())
    }

    /// Items in draw order, bottom-most first.
    pub fn items(&self) -> impl DoubleEndedIterator<Item = &Item> {
        self.items.iter()
    }

    /// Highest z-index on the board.
    #[must_use]
    pub fn max_z_index(&self) -> Option<i32> {
        self.items.last().map(|item| item.z_index)
    }

    /// Set the viewport dimensions.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Viewport::new(width, height);
    }

    /// Find the topmost item under a screen point.
    ///
    /// Returns `None` when nothing is hit or the transform is degenerate.
    #[must_use]
    pub fn hit_test(&self, screen: Point) -> Option<ItemId> {
        let world = match coords::world_from_screen(screen, &self.transform, &self.viewport) {
            Ok(world) => world,
            Err(e) => {
                tracing::debug!("Hit test skipped: {e}");
                return None;
            }
        };
        self.items
            .iter()
            .rev()
            .find(|item| item.contains_point(world))
            .map(|item| item.id)
    }

    /// Check whether a screen point lands on one specific item.
    #[must_use]
    pub fn hits_item(&self, id: ItemId, screen: Point) -> bool {
        let Some(item) = self.get_item(id) else {
            return false;
        };
        coords::world_from_screen(screen, &self.transform, &self.viewport)
            .is_ok_and(|world| item.contains_point(world))
    }

    /// Select an item and raise it above everything else.
    ///
    /// Returns the new z-index if the item had to be promoted. An item that
    /// is already strictly on top keeps its z-index.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is not found.
    pub fn select(&mut self, id: ItemId) -> CanvasResult<Option<i32>> {
        let index = self
            .index_of(id)
            .ok_or_else(|| CanvasError::ItemNotFound(id.to_string()))?;
        self.selected = Some(id);

        let max = self.max_z_index().unwrap_or(0);
        let z = self.items[index].z_index;
        let sole_top = z == max && self.items.iter().filter(|item| item.z_index == max).count() == 1;
        if sole_top {
            return Ok(None);
        }

        let promoted = max.saturating_add(1);
        self.items[index].z_index = promoted;
        self.sort();
        Ok(Some(promoted))
    }

    /// Clear the selection.
    pub fn deselect_all(&mut self) {
        self.selected = None;
    }

    /// The selected item ID.
    #[must_use]
    pub fn selected(&self) -> Option<ItemId> {
        self.selected
    }

    /// The selected item.
    #[must_use]
    pub fn selected_item(&self) -> Option<&Item> {
        self.selected.and_then(|id| self.get_item(id))
    }

    /// Get the number of items in the scene.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn sort(&mut self) {
        self.items.sort_by_key(|item| item.z_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64, z: i32) -> Item {
        Item::new("test.png", x, y, size, size).with_z_index(z)
    }

    #[test]
    fn test_scene_add_item() {
        let mut scene = Scene::new(800.0, 600.0);
        assert!(scene.is_empty());

        let id = scene.add_item(square(0.0, 0.0, 10.0, 0));
        assert_eq!(scene.item_count(), 1);
        assert!(scene.get_item(id).is_some());
        assert!(scene.get_item(ItemId::new()).is_none());
    }

    #[test]
    fn test_hit_test_prefers_higher_z() {
        let mut scene = Scene::new(800.0, 600.0);
        let low = scene.add_item(square(100.0, 100.0, 100.0, 0));
        let high = scene.add_item(square(100.0, 100.0, 100.0, 1));

        assert_eq!(scene.hit_test(Point::new(150.0, 150.0)), Some(high));
        assert_ne!(scene.hit_test(Point::new(150.0, 150.0)), Some(low));
    }

    #[test]
    fn test_hit_test_tie_goes_to_later_item() {
        let mut scene = Scene::new(800.0, 600.0);
        let _first = scene.add_item(square(0.0, 0.0, 50.0, 2));
        let second = scene.add_item(square(0.0, 0.0, 50.0, 2));
        assert_eq!(scene.hit_test(Point::new(10.0, 10.0)), Some(second));
    }

    #[test]
    fn test_hit_test_miss() {
        let mut scene = Scene::new(800.0, 600.0);
        assert!(scene.hit_test(Point::new(10.0, 10.0)).is_none());

        scene.add_item(square(100.0, 100.0, 100.0, 0));
        scene.add_item(square(300.0, 300.0, 50.0, 3));
        assert!(scene.hit_test(Point::new(50.0, 50.0)).is_none());
        assert!(scene.hit_test(Point::new(700.0, 500.0)).is_none());
    }

    #[test]
    fn test_hit_test_respects_camera() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add_item(square(400.0, 300.0, 10.0, 0));
        // Zoom 2x about the center: world (405, 305) lands on screen (410, 310).
        scene.transform = Transform::new(0.0, 0.0, 2.0);
        assert_eq!(scene.hit_test(Point::new(410.0, 310.0)), Some(id));
        assert!(scene.hit_test(Point::new(425.0, 325.0)).is_none());

        scene.transform = Transform::new(100.0, 0.0, 1.0);
        assert_eq!(scene.hit_test(Point::new(505.0, 305.0)), Some(id));
        assert!(scene.hit_test(Point::new(405.0, 305.0)).is_none());
    }

    #[test]
    fn test_hit_test_degenerate_transform_is_a_miss() {
        let mut scene = Scene::new(800.0, 600.0);
        scene.add_item(square(0.0, 0.0, 1000.0, 0));
        scene.transform.scale = 0.0;
        assert!(scene.hit_test(Point::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn test_select_promotes_to_front() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_item(square(0.0, 0.0, 10.0, 0));
        let b = scene.add_item(square(20.0, 0.0, 10.0, 1));
        let c = scene.add_item(square(40.0, 0.0, 10.0, 3));

        let promoted = scene.select(a).expect("select");
        assert_eq!(promoted, Some(4));
        assert_eq!(scene.selected(), Some(a));
        assert_eq!(scene.get_item(a).map(|i| i.z_index), Some(4));
        assert_eq!(scene.get_item(b).map(|i| i.z_index), Some(1));
        assert_eq!(scene.get_item(c).map(|i| i.z_index), Some(3));
        assert_eq!(scene.items().last().map(|i| i.id), Some(a));
    }

    #[test]
    fn test_select_sole_top_keeps_z() {
        let mut scene = Scene::new(800.0, 600.0);
        scene.add_item(square(0.0, 0.0, 10.0, 0));
        let top = scene.add_item(square(20.0, 0.0, 10.0, 5));
        assert_eq!(scene.select(top).expect("select"), None);
        assert_eq!(scene.get_item(top).map(|i| i.z_index), Some(5));
    }

    #[test]
    fn test_add_imported_assigns_sequential_z() {
        let mut scene = Scene::new(800.0, 600.0);
        scene.add_item(square(0.0, 0.0, 10.0, 4));
        scene.add_item(square(0.0, 0.0, 10.0, 1));

        let ids = scene.add_imported(vec![square(0.0, 0.0, 5.0, 0), square(0.0, 0.0, 5.0, 0)]);
        assert_eq!(ids.len(), 2);
        assert_eq!(scene.get_item(ids[0]).map(|i| i.z_index), Some(5));
        assert_eq!(scene.get_item(ids[1]).map(|i| i.z_index), Some(6));
    }

    #[test]
    fn test_with_items_orders_by_z_then_creation() {
        let mut a = square(0.0, 0.0, 1.0, 1);
        a.created_at = 20;
        let mut b = square(0.0, 0.0, 1.0, 1);
        b.created_at = 10;
        let c = square(0.0, 0.0, 1.0, 0);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);

        let scene = Scene::new(800.0, 600.0).with_items(vec![a, b, c]);
        let order: Vec<_> = scene.items().map(|i| i.id).collect();
        assert_eq!(order, vec![c_id, b_id, a_id]);
    }

    #[test]
    fn test_set_item_position_rejects_non_finite() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add_item(square(0.0, 0.0, 10.0, 0));
        assert!(matches!(
            scene.set_item_position(id, Point::new(f64::NAN, 0.0)),
            Err(CanvasError::InvalidOperation(_))
        ));
        scene
            .set_item_position(id, Point::new(5.0, 6.0))
            .expect("move");
        assert_eq!(scene.get_item(id).map(Item::origin), Some(Point::new(5.0, 6.0)));
    }

    #[test]
    fn test_loaded_items_in_reverse_z_still_hit_topmost() {
        let top = square(100.0, 100.0, 100.0, 5);
        let bottom = square(100.0, 100.0, 100.0, 0);
        let top_id = top.id;

        let scene = Scene::new(800.0, 600.0).with_items(vec![top, bottom]);
        assert_eq!(scene.hit_test(Point::new(150.0, 150.0)), Some(top_id));
        let z: Vec<_> = scene.items().map(|i| i.z_index).collect();
        assert_eq!(z, vec![0, 5]);
    }
}
