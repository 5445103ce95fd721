use std::collections::BTreeMap;
use std::sync::Arc;

use crate::capture::{CaptureFlag, PointerCapture};
use crate::commit::translate;
use crate::config::EditorConfig;
use crate::hit::{hit_test, HitContext, SelectionBounds};
use crate::host::{EditorHost, PreviewSink};
use crate::input::{EditModes, Key, PointerButton, PointerEvent, PointerId, PointerKind, WheelEvent};
use crate::interaction::{self, GestureContext, GestureOrigin, InteractionState, StretchSource, StretchState};
use crate::layout::{GridLayout, Point};
use crate::model::{Grid, RowConfig, Selection};
use crate::preview::{PreviewBridge, PreviewCue};
use crate::snap::Snap;
use crate::snapshot::{EditorSnapshot, Playback, SharedSnapshot};

#[derive(Clone, Copy, Debug)]
struct TrackedPointer {
    kind: PointerKind,
    position: Point,
}

/// Gesture front end for one grid surface. Owns the interaction state and
/// the published snapshot; the grid and selection stay with the host.
pub struct Editor {
    config: EditorConfig,
    snapshot: EditorSnapshot,
    shared: SharedSnapshot,
    capture_flag: CaptureFlag,
    capture: Option<PointerCapture>,
    pointers: BTreeMap<PointerId, TrackedPointer>,
    preview: PreviewBridge,
    held: EditModes,
    sticky: EditModes,
}

impl Editor {
    pub fn new(config: EditorConfig, grid: Arc<Grid>, rows: Arc<Vec<RowConfig>>) -> Self {
        let width = config.gutter_width + config.min_step_width * grid.steps() as f32;
        let height = config.min_row_height * grid.row_count() as f32;
        let layout = GridLayout::fit(width, height, grid.row_count(), grid.steps(), &config);
        let snapshot = EditorSnapshot::new(grid, rows, layout, config.snap);
        let shared = SharedSnapshot::new(snapshot.clone());
        Self {
            config,
            snapshot,
            shared,
            capture_flag: CaptureFlag::default(),
            capture: None,
            pointers: BTreeMap::new(),
            preview: PreviewBridge::default(),
            held: EditModes::default(),
            sticky: EditModes::default(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &EditorSnapshot {
        &self.snapshot
    }

    pub fn shared(&self) -> SharedSnapshot {
        self.shared.clone()
    }

    pub fn capture_flag(&self) -> CaptureFlag {
        self.capture_flag.clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn captured_pointer(&self) -> Option<PointerId> {
        self.capture.as_ref().map(PointerCapture::pointer)
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.snapshot.interaction
    }

    pub fn modes(&self) -> EditModes {
        self.held.merged(self.sticky)
    }

    pub fn snap(&self) -> Snap {
        self.snapshot.snap
    }

    pub fn sync(&mut self, grid: Arc<Grid>, selection: &Selection) {
        self.snapshot.grid = grid;
        self.snapshot.selection = selection.clone();
        self.publish();
    }

    pub fn set_rows(&mut self, rows: Arc<Vec<RowConfig>>) {
        self.snapshot.rows = rows;
        self.publish();
    }

    pub fn set_snap(&mut self, snap: Snap) {
        self.snapshot.snap = snap;
        self.publish();
    }

    pub fn cycle_snap(&mut self) -> Snap {
        let snap = self.snapshot.snap.next();
        self.set_snap(snap);
        snap
    }

    pub fn set_playback(&mut self, playback: Playback) {
        self.snapshot.playback = playback;
        self.publish();
    }

    /// Refits the layout to a new surface size, abandoning any gesture.
    pub fn resize(&mut self, width: f32, height: f32, host: &mut impl PreviewSink) {
        self.abandon("surface resized", host);
        let grid = &self.snapshot.grid;
        let old = self.snapshot.layout;
        let mut layout = GridLayout::fit(width, height, grid.row_count(), grid.steps(), &self.config);
        layout.scroll_by(old.scroll_x, old.scroll_y, grid.row_count(), grid.steps());
        self.snapshot.layout = layout;
        self.publish();
    }

    pub fn pointer_down(&mut self, event: &PointerEvent, host: &mut impl EditorHost) {
        self.pointers.insert(
            event.id,
            TrackedPointer {
                kind: event.kind,
                position: event.position,
            },
        );
        if event.button != PointerButton::Primary {
            return;
        }
        if !self.snapshot.interaction.is_idle() {
            self.try_begin_pinch(event, host);
            return;
        }

        let hit = hit_test(&self.hit_context(), event.position);
        let modes = self.modes();
        let (state, cue) = {
            let ctx = self.gesture_context();
            interaction::begin(hit, event, &ctx, &self.snapshot.selection, modes)
        };
        if state.is_idle() {
            return;
        }
        log::debug!("gesture start: {} (pointer {})", state.name(), event.id);
        self.capture = Some(self.capture_flag.acquire(event.id));
        self.snapshot.interaction = state;
        self.snapshot.hover = None;
        if let Some(cue) = cue {
            self.preview.cue(cue, host);
        }
        self.publish();
    }

    fn try_begin_pinch(&mut self, event: &PointerEvent, host: &mut impl EditorHost) {
        let Some(first) = self
            .snapshot
            .interaction
            .origin()
            .filter(|origin| origin.kind == PointerKind::Touch)
            .map(|origin| origin.pointer)
        else {
            return;
        };
        if event.kind != PointerKind::Touch
            || matches!(self.snapshot.interaction, InteractionState::Stretching(_))
        {
            return;
        }
        let Some(first_position) = self.pointers.get(&first).map(|p| p.position) else {
            return;
        };
        let grid = &self.snapshot.grid;
        let Some(bounds) =
            SelectionBounds::of(grid, &self.snapshot.selection).filter(|b| b.count >= 2)
        else {
            return;
        };
        let members = self
            .snapshot
            .selection
            .resolved(grid)
            .map(|(cell, note)| interaction::GroupMember {
                cell,
                note: note.clone(),
            })
            .collect();

        self.abandon("second touch starts a pinch", host);
        let origin = GestureOrigin::from_event(event);
        let distance = first_position.distance(event.position);
        let state = StretchState::from_pinch(origin, (first, event.id), distance, bounds, members);
        log::debug!("gesture start: pinch (pointers {first}, {})", event.id);
        self.capture = Some(self.capture_flag.acquire(first));
        self.snapshot.interaction = InteractionState::Stretching(state);
        self.publish();
    }

    pub fn pointer_move(&mut self, event: &PointerEvent, host: &mut impl EditorHost) {
        if let Some(tracked) = self.pointers.get_mut(&event.id) {
            tracked.position = event.position;
        }
        if self.snapshot.interaction.is_idle() {
            let hover = hit_test(&self.hit_context(), event.position);
            if self.snapshot.hover.as_ref() != Some(&hover) {
                self.snapshot.hover = Some(hover);
                self.publish();
            }
            return;
        }
        if !self.snapshot.interaction.owned_by(event.id) {
            return;
        }
        if !self.snapshot.interaction.targets_present(&self.snapshot.grid) {
            self.abandon("target note vanished", host);
            self.publish();
            return;
        }

        let mut state = std::mem::take(&mut self.snapshot.interaction);
        let pinch = match &state {
            InteractionState::Stretching(s) if s.is_pinch() => Some(self.pinch_distance(s)),
            _ => None,
        };
        let cue = if let Some(distance) = pinch {
            if let (InteractionState::Stretching(s), Some(distance)) = (&mut state, distance) {
                s.update_pinch(distance);
            }
            None
        } else {
            state.update(event.position, &self.gesture_context())
        };
        self.snapshot.interaction = state;
        if let Some(cue) = cue {
            self.preview.cue(cue, host);
        }
        self.publish();
    }

    fn pinch_distance(&self, state: &StretchState) -> Option<f32> {
        let StretchSource::Pinch { pointers, .. } = state.source else {
            return None;
        };
        let a = self.pointers.get(&pointers.0)?;
        let b = self.pointers.get(&pointers.1)?;
        Some(a.position.distance(b.position))
    }

    pub fn pointer_up(&mut self, event: &PointerEvent, host: &mut impl EditorHost) {
        self.pointers.remove(&event.id);
        if self.snapshot.interaction.is_idle() || !self.snapshot.interaction.owned_by(event.id) {
            return;
        }
        let mut state = std::mem::take(&mut self.snapshot.interaction);
        self.capture = None;
        self.preview.stop(host);
        if !state.targets_present(&self.snapshot.grid) {
            log::debug!("abandoned {} gesture: target note vanished", state.name());
            self.publish();
            return;
        }

        let name = state.name();
        let outcome = {
            let ctx = self.gesture_context();
            let pinch = matches!(&state, InteractionState::Stretching(s) if s.is_pinch());
            if !pinch {
                state.update(event.position, &ctx);
            }
            translate(state, event, &ctx, &self.snapshot.selection)
        };
        match &outcome.request {
            Some(request) => log::debug!("{name} gesture commits {}", request.name()),
            None => log::debug!("{name} gesture ends without an edit"),
        }
        outcome.dispatch(host);
        self.publish();
    }

    /// The host lost the pointer (capture lost, device gone).
    pub fn pointer_cancel(&mut self, pointer: PointerId, host: &mut impl PreviewSink) {
        self.pointers.remove(&pointer);
        if self.snapshot.interaction.owned_by(pointer) {
            self.abandon("pointer cancelled", host);
            self.publish();
        }
    }

    pub fn wheel(&mut self, event: &WheelEvent, host: &mut impl EditorHost) {
        if self.snapshot.interaction.is_idle() {
            let (dx, dy) = if event.modifiers.shift {
                (event.delta_y, event.delta_x)
            } else {
                (event.delta_x, event.delta_y)
            };
            let grid = &self.snapshot.grid;
            self.snapshot
                .layout
                .scroll_by(dx, dy, grid.row_count(), grid.steps());
            self.publish();
            return;
        }
        let cue: Option<PreviewCue> = self
            .snapshot
            .interaction
            .apply_wheel(event.octave_notches(), &self.snapshot.grid);
        if let Some(cue) = cue {
            self.preview.cue(cue, host);
            self.publish();
        }
    }

    pub fn key_down(&mut self, key: Key, host: &mut impl EditorHost) {
        match key {
            Key::Razor => self.held.razor = true,
            Key::Pen => self.held.pen = true,
            Key::Escape => self.cancel_gesture(host),
            Key::Delete => {
                if !self.snapshot.interaction.is_idle() {
                    return;
                }
                let cells = self
                    .snapshot
                    .selection
                    .resolved(&self.snapshot.grid)
                    .map(|(cell, _)| cell)
                    .collect::<Vec<_>>();
                if cells.is_empty() {
                    return;
                }
                log::debug!("deleting {} selected notes", cells.len());
                host.delete_notes(&cells);
                host.select_notes(&[]);
            }
        }
        self.publish();
    }

    pub fn key_up(&mut self, key: Key) {
        match key {
            Key::Razor => self.held.razor = false,
            Key::Pen => self.held.pen = false,
            Key::Delete | Key::Escape => return,
        }
        self.publish();
    }

    /// Flips a sticky mode; returns whether it is now on.
    pub fn toggle_mode(&mut self, key: Key) -> bool {
        let enabled = match key {
            Key::Razor => {
                self.sticky.razor = !self.sticky.razor;
                self.sticky.razor
            }
            Key::Pen => {
                self.sticky.pen = !self.sticky.pen;
                self.sticky.pen
            }
            Key::Delete | Key::Escape => return false,
        };
        self.publish();
        enabled
    }

    pub fn cancel_gesture(&mut self, host: &mut impl PreviewSink) {
        self.abandon("cancelled", host);
        self.publish();
    }

    fn abandon(&mut self, reason: &str, host: &mut impl PreviewSink) {
        if self.snapshot.interaction.is_idle() {
            return;
        }
        log::debug!(
            "abandoned {} gesture: {reason}",
            self.snapshot.interaction.name()
        );
        self.snapshot.interaction = InteractionState::Idle;
        self.capture = None;
        self.preview.stop(host);
    }

    fn hit_context(&self) -> HitContext<'_> {
        HitContext {
            grid: &self.snapshot.grid,
            selection: &self.snapshot.selection,
            layout: &self.snapshot.layout,
            snap: self.snapshot.snap,
            edge_threshold_px: self.config.edge_threshold_px,
            handle_radius_px: self.config.handle_radius_px,
        }
    }

    fn gesture_context(&self) -> GestureContext<'_> {
        GestureContext {
            grid: &self.snapshot.grid,
            layout: &self.snapshot.layout,
            snap: self.snapshot.snap,
            config: &self.config,
        }
    }

    fn publish(&mut self) {
        self.snapshot.version += 1;
        self.snapshot.modes = self.modes();
        self.shared.publish(Arc::new(self.snapshot.clone()));
    }
}
