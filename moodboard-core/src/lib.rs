//! # Moodboard Core
//!
//! Viewport, gesture and persistence logic for a pannable, zoomable board
//! of images.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        fast side (per input event)          │
//! ├─────────────────────────────────────────────┤
//! │  CanvasState     │  GestureArbiter          │
//! │  - Scene         │  - tap / pan / drag      │
//! │  - Snapshot      │  - pinch zoom            │
//! │                  │  - momentum              │
//! ├──────────── BoardEvent channel ─────────────┤
//! │        slow side (async tasks)              │
//! ├─────────────────────────────────────────────┤
//! │  Persister       │  Import                  │
//! │  - debounce      │  - image sources         │
//! │  - BoardStore    │  - placement             │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod coords;
pub mod error;
pub mod event;
pub mod gesture;
pub mod import;
pub mod item;
pub mod persist;
pub mod projector;
pub mod scene;
pub mod schema;
pub mod settings;
pub mod state;
pub mod store;
pub mod transform;

pub use coords::{board_affine, screen_from_world, world_delta, world_from_screen};
pub use error::{CanvasError, CanvasResult};
pub use event::{BoardEvent, InputEvent, TouchEvent, TouchPhase, TouchPoint};
pub use gesture::{GestureArbiter, GestureConfig, GesturePhase};
pub use item::{Item, ItemId, Rotation};
pub use persist::{spawn_persister, PersistConfig, PersistHandle, PersistStats};
pub use projector::{DrawList, GridStyle};
pub use scene::Scene;
pub use settings::Settings;
pub use state::{CanvasState, Snapshot};
pub use store::{BoardStore, ItemStore, StoreError, ViewportCache};
pub use transform::{Transform, Viewport, MAX_SCALE, MIN_SCALE};

/// Moodboard core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
