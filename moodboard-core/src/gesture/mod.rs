//! Gesture arbitration.
//!
//! Two branches run side by side:
//!
//! - the single-finger branch, where exactly one of drag-item, pan or tap
//!   owns a contact from touch-down to release;
//! - the zoom branch, active whenever two or more contacts are down.
//!
//! Drag-item eligibility is decided once, at touch-down. Pan and tap then
//! race on travel distance; tap resolves to a hit test only at release.

mod config;
mod drag;
mod momentum;
mod pan;
mod zoom;

use std::collections::BTreeMap;

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

pub use config::GestureConfig;
pub use drag::DragSession;
pub use momentum::{Momentum, MomentumStep, VelocityTracker};
pub use pan::PanSession;
pub use zoom::ZoomSession;

use crate::{BoardEvent, Scene, TouchEvent, TouchPhase};

/// What the single-finger branch is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhase {
    /// No contact owned.
    Idle,
    /// Contact down, not yet moved far enough to pan.
    TapPending,
    /// Panning the camera.
    PanActive,
    /// Dragging the selected item.
    DragItemActive,
    /// Contact blocked by a pinch; ignored until all fingers lift.
    Blocked,
}

#[derive(Debug, Clone)]
enum SingleFinger {
    Idle,
    Pending {
        contact: u32,
        start: Point,
        start_ms: u64,
        travel: f64,
    },
    Pan {
        contact: u32,
        session: PanSession,
    },
    Drag {
        contact: u32,
        session: DragSession,
    },
    Blocked,
}

#[derive(Debug, Clone)]
struct Pinch {
    contacts: [u32; 2],
    session: ZoomSession,
}

/// Routes touch input to the pan, zoom and drag controllers.
///
/// Owns all gesture-session state. Only mutates the [`Scene`] it is handed
/// and reports terminal results as [`BoardEvent`]s.
#[derive(Debug, Clone)]
pub struct GestureArbiter {
    config: GestureConfig,
    contacts: BTreeMap<u32, Point>,
    single: SingleFinger,
    pinch: Option<Pinch>,
    momentum: Option<Momentum>,
    tracker: VelocityTracker,
}

impl Default for GestureArbiter {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureArbiter {
    /// Create an arbiter with the given thresholds.
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            contacts: BTreeMap::new(),
            single: SingleFinger::Idle,
            pinch: None,
            momentum: None,
            tracker: VelocityTracker::new(),
        }
    }

    /// The thresholds in use.
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Current state of the single-finger branch.
    #[must_use]
    pub fn phase(&self) -> GesturePhase {
        match self.single {
            SingleFinger::Idle => GesturePhase::Idle,
            SingleFinger::Pending { .. } => GesturePhase::TapPending,
            SingleFinger::Pan { .. } => GesturePhase::PanActive,
            SingleFinger::Drag { .. } => GesturePhase::DragItemActive,
            SingleFinger::Blocked => GesturePhase::Blocked,
        }
    }

    /// Whether a pinch is in progress.
    #[must_use]
    pub fn is_zooming(&self) -> bool {
        self.pinch.is_some()
    }

    /// Whether inertial pan motion is still running.
    #[must_use]
    pub fn has_momentum(&self) -> bool {
        self.momentum.is_some()
    }

    /// Number of contacts currently down.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Drop every session and contact, e.g. when the board is switched.
    pub fn reset(&mut self) {
        self.contacts.clear();
        self.single = SingleFinger::Idle;
        self.pinch = None;
        self.momentum = None;
        self.tracker.reset();
    }

    /// Process one touch event, mutating the scene and appending notifications.
    pub fn handle_touch(&mut self, scene: &mut Scene, event: &TouchEvent, out: &mut Vec<BoardEvent>) {
        match event.phase {
            TouchPhase::Start => self.touch_down(scene, event),
            TouchPhase::Move => self.touch_move(scene, event, out),
            TouchPhase::End | TouchPhase::Cancel => self.touch_up(scene, event, out),
        }
    }

    /// Advance momentum to `timestamp_ms`.
    pub fn tick(&mut self, scene: &mut Scene, timestamp_ms: u64, out: &mut Vec<BoardEvent>) {
        let Some(momentum) = self.momentum.as_mut() else {
            return;
        };
        let step = momentum.step(timestamp_ms, &self.config);
        if step.settled {
            tracing::debug!("Momentum settled");
            self.momentum = None;
        }
        if step.displacement == Vec2::ZERO {
            return;
        }
        match self.pinch.as_mut() {
            // The pinch owns the pan; fold the glide into its baseline.
            Some(pinch) => {
                pinch
                    .session
                    .shift_baseline(step.displacement, &mut scene.transform, &scene.viewport);
            }
            None => {
                let pan = scene.transform.pan() + step.displacement;
                scene.transform.set_pan(pan);
            }
        }
        out.push(viewport_changed(scene));
    }

    fn touch_down(&mut self, scene: &Scene, event: &TouchEvent) {
        let was_empty = self.contacts.is_empty();
        for touch in &event.touches {
            self.contacts.insert(touch.id, touch.position());
        }

        if was_empty && self.contacts.len() == 1 {
            if self.momentum.take().is_some() {
                tracing::debug!("Momentum cancelled by touch-down");
            }
            if let Some((&contact, &start)) = self.contacts.iter().next() {
                self.begin_single(scene, contact, start, event.timestamp_ms);
            }
            return;
        }

        if self.contacts.len() >= 2 && self.pinch.is_none() {
            self.begin_pinch(scene);
        }
    }

    fn begin_single(&mut self, scene: &Scene, contact: u32, start: Point, timestamp_ms: u64) {
        self.tracker.reset();
        self.tracker.add(timestamp_ms, start);
        self.single = match DragSession::begin(scene, start) {
            Some(session) => {
                tracing::debug!(item = %session.item(), "Drag started");
                SingleFinger::Drag { contact, session }
            }
            None => SingleFinger::Pending {
                contact,
                start,
                start_ms: timestamp_ms,
                travel: 0.0,
            },
        };
    }

    fn begin_pinch(&mut self, scene: &Scene) {
        let mut ids = self.contacts.iter();
        let (Some((&a_id, &a)), Some((&b_id, &b))) = (ids.next(), ids.next()) else {
            return;
        };
        tracing::debug!("Pinch started");
        self.pinch = Some(Pinch {
            contacts: [a_id, b_id],
            session: ZoomSession::begin(a, b, &scene.transform),
        });

        // A drag already owns its item and keeps going; pan and tap yield.
        match self.single {
            SingleFinger::Drag { .. } => {}
            SingleFinger::Pan { .. } | SingleFinger::Pending { .. } => {
                tracing::debug!("Single-finger gesture blocked by pinch");
                self.single = SingleFinger::Blocked;
            }
            SingleFinger::Idle | SingleFinger::Blocked => self.single = SingleFinger::Blocked,
        }
    }

    fn touch_move(&mut self, scene: &mut Scene, event: &TouchEvent, out: &mut Vec<BoardEvent>) {
        let mut moved = false;
        for touch in &event.touches {
            if let Some(position) = self.contacts.get_mut(&touch.id) {
                *position = touch.position();
                moved = true;
            }
        }
        if !moved {
            return;
        }

        if let Some(pinch) = self.pinch.as_mut() {
            let [a_id, b_id] = pinch.contacts;
            if let (Some(&a), Some(&b)) = (self.contacts.get(&a_id), self.contacts.get(&b_id)) {
                pinch
                    .session
                    .update(a, b, &mut scene.transform, &scene.viewport);
                tracing::trace!(scale = scene.transform.scale, "Pinch update");
                out.push(viewport_changed(scene));
            }
        }

        let Some(contact) = self.single_contact() else {
            return;
        };
        let Some(&current) = self.contacts.get(&contact) else {
            return;
        };
        self.tracker.add(event.timestamp_ms, current);

        let mut promote = None;
        match &mut self.single {
            SingleFinger::Pending { start, travel, .. } => {
                let distance = current.distance(*start);
                *travel = travel.max(distance);
                if distance > self.config.pan_min_distance {
                    promote = Some(*start);
                }
            }
            SingleFinger::Pan { session, .. } => {
                session.update(current, &mut scene.transform);
                out.push(viewport_changed(scene));
            }
            SingleFinger::Drag { session, .. } => session.update(scene, current),
            SingleFinger::Idle | SingleFinger::Blocked => {}
        }

        // Travel passed the threshold: pan wins and the tap is off.
        if let Some(start) = promote {
            let session = PanSession::begin(start, &scene.transform);
            session.update(current, &mut scene.transform);
            tracing::debug!("Pan started");
            self.single = SingleFinger::Pan { contact, session };
            out.push(viewport_changed(scene));
        }
    }

    fn touch_up(&mut self, scene: &mut Scene, event: &TouchEvent, out: &mut Vec<BoardEvent>) {
        let single_contact = self.single_contact();
        let mut release = None;

        for touch in &event.touches {
            if self.contacts.remove(&touch.id).is_none() {
                continue;
            }
            if self
                .pinch
                .as_ref()
                .is_some_and(|pinch| pinch.contacts.contains(&touch.id))
            {
                tracing::debug!("Pinch ended");
                self.pinch = None;
            }
            if single_contact == Some(touch.id) {
                release = Some(touch.position());
            }
        }

        if let Some(position) = release {
            self.tracker.add(event.timestamp_ms, position);
            let single = std::mem::replace(&mut self.single, SingleFinger::Blocked);
            self.release_single(scene, single, position, event, out);
        }

        if self.contacts.is_empty() {
            self.single = SingleFinger::Idle;
            self.tracker.reset();
        } else if self.contacts.len() >= 2 && self.pinch.is_none() {
            // A pinch finger lifted with two or more still down.
            self.begin_pinch(scene);
        }
    }

    fn release_single(
        &mut self,
        scene: &mut Scene,
        single: SingleFinger,
        position: Point,
        event: &TouchEvent,
        out: &mut Vec<BoardEvent>,
    ) {
        let cancelled = event.phase == TouchPhase::Cancel;
        let timestamp_ms = event.timestamp_ms;
        match single {
            SingleFinger::Pending {
                start,
                start_ms,
                travel,
                ..
            } => {
                let duration = timestamp_ms.saturating_sub(start_ms);
                let travel = travel.max(position.distance(start));
                let max_ms = u64::try_from(self.config.tap_max_duration.as_millis())
                    .unwrap_or(u64::MAX);
                if !cancelled && duration <= max_ms && travel <= self.config.tap_max_distance {
                    resolve_tap(scene, position, out);
                } else {
                    tracing::debug!(duration, travel, "Contact released without a tap");
                }
            }
            SingleFinger::Pan { session, .. } => {
                if !cancelled {
                    self.momentum =
                        session.release(&self.tracker, &scene.transform, timestamp_ms, &self.config);
                }
                tracing::debug!(momentum = self.momentum.is_some(), "Pan ended");
            }
            SingleFinger::Drag { session, .. } => {
                tracing::debug!(item = %session.item(), "Drag ended");
                out.extend(session.finish(scene));
            }
            SingleFinger::Idle | SingleFinger::Blocked => {}
        }
    }

    fn single_contact(&self) -> Option<u32> {
        match self.single {
            SingleFinger::Pending { contact, .. }
            | SingleFinger::Pan { contact, .. }
            | SingleFinger::Drag { contact, .. } => Some(contact),
            SingleFinger::Idle | SingleFinger::Blocked => None,
        }
    }
}

/// Select whatever is under a tap, or clear the selection on empty canvas.
fn resolve_tap(scene: &mut Scene, position: Point, out: &mut Vec<BoardEvent>) {
    match scene.hit_test(position) {
        Some(id) => {
            let previous = scene.selected();
            match scene.select(id) {
                Ok(promoted) => {
                    tracing::debug!(item = %id, "Tap selected item");
                    if previous != Some(id) {
                        out.push(BoardEvent::SelectionChanged { selected: Some(id) });
                    }
                    if let Some(z_index) = promoted {
                        out.push(BoardEvent::ItemPromoted { id, z_index });
                    }
                }
                Err(e) => tracing::debug!("Tap selection failed: {e}"),
            }
        }
        None => {
            if scene.selected().is_some() {
                tracing::debug!("Tap on empty canvas cleared selection");
                scene.deselect_all();
                out.push(BoardEvent::SelectionChanged { selected: None });
            }
        }
    }
}

fn viewport_changed(scene: &Scene) -> BoardEvent {
    BoardEvent::ViewportChanged {
        transform: scene.transform,
    }
}
