//! Persisted record shapes.
//!
//! Field names are camelCase on disk and `flipHorizontal` is stored as
//! `0`/`1`, so documents stay readable by older tooling.

use serde::{Deserialize, Serialize};

use crate::{Item, ItemId, Rotation, Transform};

/// One item row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    /// Item identifier. Generated when absent.
    #[serde(default)]
    pub id: ItemId,
    /// Owning board.
    pub board_id: String,
    /// Image source.
    pub uri: String,
    /// Left edge in world units.
    pub x: f64,
    /// Top edge in world units.
    pub y: f64,
    /// Width in world units.
    pub width: f64,
    /// Height in world units.
    pub height: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Horizontal flip as `0` or `1`.
    #[serde(default)]
    pub flip_horizontal: u8,
    /// Layering key.
    #[serde(default)]
    pub z_index: i32,
    /// Creation time in milliseconds since the epoch.
    pub created_at: u64,
}

impl ItemRecord {
    /// Build a record for `item` on `board_id`.
    #[must_use]
    pub fn from_item(item: &Item, board_id: impl Into<String>) -> Self {
        Self {
            id: item.id,
            board_id: board_id.into(),
            uri: item.uri.clone(),
            x: item.x,
            y: item.y,
            width: item.width,
            height: item.height,
            rotation: f64::from(item.rotation.degrees()),
            flip_horizontal: u8::from(item.flip_horizontal),
            z_index: item.z_index,
            created_at: item.created_at,
        }
    }

    /// Convert to the runtime item.
    #[must_use]
    pub fn to_item(&self) -> Item {
        Item {
            id: self.id,
            uri: self.uri.clone(),
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            rotation: Rotation::from_degrees(self.rotation),
            flip_horizontal: self.flip_horizontal != 0,
            z_index: self.z_index,
            created_at: self.created_at,
        }
    }
}

/// Partial update of an item; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    /// New left edge.
    pub x: Option<f64>,
    /// New top edge.
    pub y: Option<f64>,
    /// New width.
    pub width: Option<f64>,
    /// New height.
    pub height: Option<f64>,
    /// New rotation.
    pub rotation: Option<Rotation>,
    /// New flip state.
    pub flip_horizontal: Option<bool>,
    /// New z-index.
    pub z_index: Option<i32>,
}

impl ItemPatch {
    /// Patch that only moves an item.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that only changes the z-index.
    #[must_use]
    pub fn z_index(z_index: i32) -> Self {
        Self {
            z_index: Some(z_index),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to a record.
    pub fn apply(&self, record: &mut ItemRecord) {
        if let Some(x) = self.x {
            record.x = x;
        }
        if let Some(y) = self.y {
            record.y = y;
        }
        if let Some(width) = self.width {
            record.width = width;
        }
        if let Some(height) = self.height {
            record.height = height;
        }
        if let Some(rotation) = self.rotation {
            record.rotation = f64::from(rotation.degrees());
        }
        if let Some(flip) = self.flip_horizontal {
            record.flip_horizontal = u8::from(flip);
        }
        if let Some(z_index) = self.z_index {
            record.z_index = z_index;
        }
    }
}

/// One board row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRecord {
    /// Board identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Creation time in milliseconds since the epoch.
    pub created_at: u64,
    /// Last modification time in milliseconds since the epoch.
    pub updated_at: u64,
}

/// Cached camera position for one board.
///
/// Older entries carry only the pan; their scale reads as `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportRecord {
    /// Horizontal pan.
    pub x: f64,
    /// Vertical pan.
    pub y: f64,
    /// Zoom level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl From<&Transform> for ViewportRecord {
    fn from(transform: &Transform) -> Self {
        Self {
            x: transform.pan_x,
            y: transform.pan_y,
            scale: Some(transform.scale),
        }
    }
}

impl ViewportRecord {
    /// Rebuild the camera transform, clamping the scale.
    #[must_use]
    pub fn to_transform(&self) -> Transform {
        Transform::new(self.x, self.y, self.scale.unwrap_or(1.0))
    }
}

/// Everything stored for one board: one JSON file per board on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDocument {
    /// The board row.
    pub board: BoardRecord,
    /// Its items, in no particular order.
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    /// Cached camera position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportRecord>,
}

impl BoardDocument {
    /// An empty board.
    #[must_use]
    pub fn new(board: BoardRecord) -> Self {
        Self {
            board,
            items: Vec::new(),
            viewport: None,
        }
    }

    /// Items in load order: ascending z-index, then creation time.
    #[must_use]
    pub fn ordered_items(&self) -> Vec<Item> {
        let mut records: Vec<&ItemRecord> = self.items.iter().collect();
        records.sort_by(|a, b| {
            a.z_index
                .cmp(&b.z_index)
                .then(a.created_at.cmp(&b.created_at))
        });
        records.into_iter().map(ItemRecord::to_item).collect()
    }
}
