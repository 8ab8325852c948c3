//! Input events into the board, and notifications out of it.

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::{Item, ItemId, Transform};

/// Phase of a touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Touch started (finger down).
    Start,
    /// Touch moved (finger dragging).
    Move,
    /// Touch ended (finger up).
    End,
    /// Touch cancelled (e.g., palm rejection).
    Cancel,
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Touch identifier (for multi-touch).
    pub id: u32,
    /// X position in screen coordinates.
    pub x: f64,
    /// Y position in screen coordinates.
    pub y: f64,
}

impl TouchPoint {
    /// Create a touch point.
    #[must_use]
    pub const fn new(id: u32, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    /// Position in screen space.
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A touch event for the contacts that changed.
///
/// `touches` lists only the contacts this event is about: the ones put down
/// for [`TouchPhase::Start`], moved for [`TouchPhase::Move`] and lifted for
/// [`TouchPhase::End`] / [`TouchPhase::Cancel`], each at its latest position.
/// The gesture arbiter tracks the full set of contacts itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Phase of this touch event.
    pub phase: TouchPhase,
    /// Contacts that changed.
    pub touches: Vec<TouchPoint>,
    /// Timestamp in milliseconds since canvas start.
    pub timestamp_ms: u64,
}

impl TouchEvent {
    /// Create a new touch event.
    #[must_use]
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            touches,
            timestamp_ms,
        }
    }

    /// Single-contact shorthand.
    #[must_use]
    pub fn single(phase: TouchPhase, id: u32, x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::new(phase, vec![TouchPoint::new(id, x, y)], timestamp_ms)
    }
}

/// All input the canvas can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Raw touch event.
    Touch(TouchEvent),

    /// Display refresh tick; advances momentum.
    Frame {
        /// Timestamp in milliseconds since canvas start.
        timestamp_ms: u64,
    },

    /// The canvas was resized.
    Resize {
        /// New width in pixels.
        width: f64,
        /// New height in pixels.
        height: f64,
    },
}

/// Terminal results handed from the gesture loop to the application side.
///
/// Item drags report only their final position on release. Camera changes
/// are reported on every mutation; the persistence side debounces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum BoardEvent {
    /// The selection changed (to `None` when cleared).
    SelectionChanged {
        /// Newly selected item.
        selected: Option<ItemId>,
    },

    /// An item was raised to the front.
    ItemPromoted {
        /// Item ID.
        id: ItemId,
        /// New z-index.
        z_index: i32,
    },

    /// A drag finished with the item at its final position.
    ItemMoved {
        /// Item ID.
        id: ItemId,
        /// Final left edge in world units.
        x: f64,
        /// Final top edge in world units.
        y: f64,
    },

    /// Items were imported onto the board.
    ItemsAdded {
        /// The new items, with z-indices assigned.
        items: Vec<Item>,
    },

    /// The camera changed (pan, zoom or a momentum step).
    ViewportChanged {
        /// Latest camera transform.
        transform: Transform,
    },
}
