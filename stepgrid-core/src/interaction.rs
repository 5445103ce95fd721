use crate::config::EditorConfig;
use crate::hit::{clamp_index, HandleSide, Hit, SelectionBounds};
use crate::input::{EditModes, Modifiers, PointerEvent, PointerId, PointerKind};
use crate::layout::{GridLayout, Point, Rect};
use crate::model::{clamp_octave, CellRef, Grid, Note, NoteMove, Selection};
use crate::preview::PreviewCue;
use crate::snap::Snap;

pub const MIN_STRETCH_RATIO: f32 = 0.125;
pub const MAX_STRETCH_RATIO: f32 = 8.0;
const MAX_GROUP_OCTAVE_DELTA: i32 = 6;

pub struct GestureContext<'a> {
    pub grid: &'a Grid,
    pub layout: &'a GridLayout,
    pub snap: Snap,
    pub config: &'a EditorConfig,
}

pub(crate) fn clamp_span(value: i64, lo: i64, hi: i64) -> i64 {
    if hi < lo {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureOrigin {
    pub pointer: PointerId,
    pub kind: PointerKind,
    pub start: Point,
    pub start_ms: u64,
    pub travel: f32,
    pub modified: bool,
    pub modifiers: Modifiers,
}

impl GestureOrigin {
    pub fn from_event(event: &PointerEvent) -> Self {
        Self {
            pointer: event.id,
            kind: event.kind,
            start: event.position,
            start_ms: event.time_ms,
            travel: 0.0,
            modified: false,
            modifiers: event.modifiers,
        }
    }

    pub fn track(&mut self, position: Point) {
        self.travel = self.travel.max(self.start.distance(position));
    }

    pub fn is_quick_click(&self, release_ms: u64, config: &EditorConfig) -> bool {
        !self.modified
            && release_ms.saturating_sub(self.start_ms) < config.quick_click_ms
            && self.travel < config.drag_threshold_px
    }

    fn delta(&self, position: Point) -> (f32, f32) {
        (position.x - self.start.x, position.y - self.start.y)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupMember {
    pub cell: CellRef,
    pub note: Note,
}

fn selected_members(grid: &Grid, selection: &Selection) -> Vec<GroupMember> {
    selection
        .resolved(grid)
        .map(|(cell, note)| GroupMember {
            cell,
            note: note.clone(),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawingState {
    pub origin: GestureOrigin,
    pub cell: CellRef,
    pub duration: usize,
    pub octave_shift: i8,
}

impl DrawingState {
    pub fn preview_note(&self) -> Note {
        Note::new(self.duration).with_octave_shift(self.octave_shift as i32)
    }
}

/// Span of a drawn note from `cell` to the pointer column, rounded up to
/// the snap and capped by the next note and the grid end.
pub fn draw_duration(grid: &Grid, cell: CellRef, pointer_column: usize, snap: Snap) -> usize {
    let span = (pointer_column as i64 - cell.column as i64 + 1).max(1) as usize;
    let room = grid
        .free_end(cell.row, cell.column, None)
        .saturating_sub(cell.column)
        .max(1);
    snap.ceil_len(span).min(room)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResizeState {
    pub origin: GestureOrigin,
    pub cell: CellRef,
    pub note: Note,
    pub column: usize,
    pub duration: usize,
}

impl ResizeState {
    fn new(origin: GestureOrigin, cell: CellRef, note: Note) -> Self {
        Self {
            origin,
            cell,
            column: cell.column,
            duration: note.duration,
            note,
        }
    }

    fn end(&self) -> usize {
        self.note.end(self.cell.column)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveState {
    pub origin: GestureOrigin,
    pub cell: CellRef,
    pub note: Note,
    pub target: CellRef,
    pub octave_shift: i8,
}

impl MoveState {
    pub fn moved_note(&self) -> Note {
        Note {
            octave_shift: self.octave_shift,
            ..self.note.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupMoveState {
    pub origin: GestureOrigin,
    pub anchor: CellRef,
    pub members: Vec<GroupMember>,
    pub row_delta: i64,
    pub column_delta: i64,
    pub octave_delta: i32,
    pub clone: bool,
}

impl GroupMoveState {
    pub fn targets(&self, grid: &Grid) -> Vec<NoteMove> {
        self.members
            .iter()
            .map(|member| {
                let row = clamp_index(member.cell.row as i64 + self.row_delta, grid.row_count());
                let max_column = grid.steps().saturating_sub(member.note.duration) as i64;
                let column =
                    clamp_span(member.cell.column as i64 + self.column_delta, 0, max_column);
                NoteMove {
                    from: member.cell,
                    to: CellRef::new(row, column as usize),
                    note: Note {
                        octave_shift: clamp_octave(
                            member.note.octave_shift as i32 + self.octave_delta,
                        ),
                        ..member.note.clone()
                    },
                }
            })
            .collect()
    }

    fn anchor_member(&self) -> Option<&GroupMember> {
        self.members.iter().find(|member| member.cell == self.anchor)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupResizeState {
    pub origin: GestureOrigin,
    pub anchor: CellRef,
    pub members: Vec<GroupMember>,
    pub delta: i64,
}

impl GroupResizeState {
    pub fn targets(&self, side: HandleSide, grid: &Grid) -> Vec<NoteMove> {
        self.members
            .iter()
            .map(|member| {
                let start = member.cell.column as i64;
                let end = member.note.end(member.cell.column) as i64;
                let (column, duration) = match side {
                    HandleSide::Right => {
                        let max = grid.steps() as i64 - start;
                        (start, clamp_span(member.note.duration as i64 + self.delta, 1, max))
                    }
                    HandleSide::Left => {
                        let column = clamp_span(start + self.delta, 0, end - 1);
                        (column, end - column)
                    }
                };
                NoteMove {
                    from: member.cell,
                    to: CellRef::new(member.cell.row, column as usize),
                    note: Note {
                        duration: duration as usize,
                        ..member.note.clone()
                    },
                }
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StretchSource {
    Handle(HandleSide),
    Pinch {
        pointers: (PointerId, PointerId),
        initial_distance: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct StretchState {
    pub origin: GestureOrigin,
    pub members: Vec<GroupMember>,
    pub bounds: SelectionBounds,
    pub source: StretchSource,
    pub pivot: f32,
    pub ratio: f32,
}

impl StretchState {
    pub fn from_handle(
        origin: GestureOrigin,
        side: HandleSide,
        bounds: SelectionBounds,
        members: Vec<GroupMember>,
    ) -> Self {
        let pivot = match side {
            HandleSide::Right => bounds.start_column,
            HandleSide::Left => bounds.end_column,
        };
        Self {
            origin,
            members,
            bounds,
            source: StretchSource::Handle(side),
            pivot: pivot as f32,
            ratio: 1.0,
        }
    }

    pub fn from_pinch(
        origin: GestureOrigin,
        pointers: (PointerId, PointerId),
        initial_distance: f32,
        bounds: SelectionBounds,
        members: Vec<GroupMember>,
    ) -> Self {
        Self {
            origin,
            members,
            bounds,
            source: StretchSource::Pinch {
                pointers,
                initial_distance: initial_distance.max(1.0),
            },
            pivot: bounds.start_column as f32,
            ratio: 1.0,
        }
    }

    pub fn is_pinch(&self) -> bool {
        matches!(self.source, StretchSource::Pinch { .. })
    }

    pub fn uses_pointer(&self, pointer: PointerId) -> bool {
        match self.source {
            StretchSource::Handle(_) => self.origin.pointer == pointer,
            StretchSource::Pinch { pointers, .. } => pointers.0 == pointer || pointers.1 == pointer,
        }
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        if ratio.is_finite() {
            self.ratio = ratio.clamp(MIN_STRETCH_RATIO, MAX_STRETCH_RATIO);
        }
    }

    pub fn update_pinch(&mut self, distance: f32) {
        if let StretchSource::Pinch {
            initial_distance, ..
        } = self.source
        {
            self.origin.travel = self.origin.travel.max((distance - initial_distance).abs());
            self.set_ratio(distance / initial_distance);
        }
    }

    /// Unquantized `(column, duration)` of a member at the current ratio.
    pub fn provisional(&self, member: &GroupMember) -> (f32, f32) {
        let column = self.pivot + (member.cell.column as f32 - self.pivot) * self.ratio;
        (column, member.note.duration as f32 * self.ratio)
    }

    pub fn targets(&self, snap: Snap, grid: &Grid) -> Vec<NoteMove> {
        let steps = grid.steps() as i64;
        self.members
            .iter()
            .map(|member| {
                let (column, duration) = self.provisional(member);
                let duration = clamp_span(snap.round(duration), 1, steps.max(1));
                let column = clamp_span(snap.round(column), 0, steps - duration);
                NoteMove {
                    from: member.cell,
                    to: CellRef::new(member.cell.row, column as usize),
                    note: Note {
                        duration: duration as usize,
                        ..member.note.clone()
                    },
                }
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RollingEditState {
    pub origin: GestureOrigin,
    pub row: usize,
    pub left: GroupMember,
    pub right: GroupMember,
    pub boundary: usize,
}

impl RollingEditState {
    fn right_end(&self) -> usize {
        self.right.note.end(self.right.cell.column)
    }

    pub fn targets(&self) -> [NoteMove; 2] {
        let left_column = self.left.cell.column;
        [
            NoteMove {
                from: self.left.cell,
                to: self.left.cell,
                note: Note {
                    duration: self.boundary - left_column,
                    ..self.left.note.clone()
                },
            },
            NoteMove {
                from: self.right.cell,
                to: CellRef::new(self.row, self.boundary),
                note: Note {
                    duration: self.right_end() - self.boundary,
                    ..self.right.note.clone()
                },
            },
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectingState {
    pub origin: GestureOrigin,
    pub current: Point,
    pub additive: bool,
}

impl SelectingState {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.origin.start, self.current)
    }
}

/// Notes whose on-screen rectangle overlaps the marquee.
pub fn marquee_cells(rect: &Rect, grid: &Grid, layout: &GridLayout) -> Vec<CellRef> {
    grid.notes()
        .filter(|(cell, note)| {
            layout
                .note_rect(cell.row, cell.column as f32, note.duration as f32)
                .intersects(rect)
        })
        .map(|(cell, _)| cell)
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrumState {
    pub origin: GestureOrigin,
    pub row: usize,
    pub octave_shift: i8,
}

impl StrumState {
    fn cue(&self) -> PreviewCue {
        PreviewCue::new(
            self.row,
            Note::new(1).with_octave_shift(self.octave_shift as i32),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaintState {
    pub origin: GestureOrigin,
    pub cells: Vec<CellRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RazorTarget {
    Split { cell: CellRef, note: Note, at: usize },
    Merge { row: usize, left: usize, right: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RazorState {
    pub origin: GestureOrigin,
    pub target: RazorTarget,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum InteractionState {
    #[default]
    Idle,
    Drawing(DrawingState),
    ResizingLeft(ResizeState),
    ResizingRight(ResizeState),
    Moving(MoveState),
    MovingGroup(GroupMoveState),
    ResizingLeftGroup(GroupResizeState),
    ResizingRightGroup(GroupResizeState),
    Stretching(StretchState),
    RollingEdit(RollingEditState),
    Selecting(SelectingState),
    Strumming(StrumState),
    Painting(PaintState),
    Razor(RazorState),
}

/// Starts a gesture from a pointer-down and the hit under it. Returns the
/// new state and the preview to sound, if any.
pub fn begin(
    hit: Hit,
    event: &PointerEvent,
    ctx: &GestureContext<'_>,
    selection: &Selection,
    modes: EditModes,
) -> (InteractionState, Option<PreviewCue>) {
    use InteractionState::*;

    let origin = GestureOrigin::from_event(event);
    if event.modifiers.marquee() {
        let state = SelectingState {
            origin,
            current: event.position,
            additive: event.modifiers.shift,
        };
        return (Selecting(state), None);
    }

    let grid = ctx.grid;
    let selected = selection.resolved_len(grid);
    let in_group = |cell: CellRef| selected >= 2 && selection.contains(cell);

    match hit {
        Hit::TransformHandle { side, bounds } => {
            let members = selected_members(grid, selection);
            (
                Stretching(StretchState::from_handle(origin, side, bounds, members)),
                None,
            )
        }
        Hit::Gutter { row } => {
            let state = StrumState {
                origin,
                row,
                octave_shift: 0,
            };
            let cue = state.cue();
            (Strumming(state), Some(cue))
        }
        hit if modes.razor => (begin_razor(hit, event, ctx, origin), None),
        Hit::Empty { cell } => {
            if selected >= 2 {
                let state = SelectingState {
                    origin,
                    current: event.position,
                    additive: false,
                };
                (Selecting(state), None)
            } else if modes.pen {
                let cells = if grid.is_free(cell.row, cell.column, 1, &[]) {
                    vec![cell]
                } else {
                    Vec::new()
                };
                let cue = (!cells.is_empty()).then(|| PreviewCue::new(cell.row, Note::new(1)));
                (Painting(PaintState { origin, cells }), cue)
            } else if grid.note_covering(cell.row, cell.column).is_some() {
                (Idle, None)
            } else {
                let state = DrawingState {
                    origin,
                    cell,
                    duration: 1,
                    octave_shift: 0,
                };
                let cue = PreviewCue::new(cell.row, state.preview_note());
                (Drawing(state), Some(cue))
            }
        }
        Hit::NoteEdgeLeft { cell, .. } if in_group(cell) => {
            let state = GroupResizeState {
                origin,
                anchor: cell,
                members: selected_members(grid, selection),
                delta: 0,
            };
            (ResizingLeftGroup(state), None)
        }
        Hit::NoteEdgeRight { cell, .. } if in_group(cell) => {
            let state = GroupResizeState {
                origin,
                anchor: cell,
                members: selected_members(grid, selection),
                delta: 0,
            };
            (ResizingRightGroup(state), None)
        }
        Hit::NoteEdgeLeft { cell, note } => {
            (ResizingLeft(ResizeState::new(origin, cell, note)), None)
        }
        Hit::NoteEdgeRight { cell, note } => {
            (ResizingRight(ResizeState::new(origin, cell, note)), None)
        }
        Hit::NoteBody { cell, note, .. } => {
            let cue = PreviewCue::new(cell.row, note.clone());
            if in_group(cell) {
                let state = GroupMoveState {
                    origin,
                    anchor: cell,
                    members: selected_members(grid, selection),
                    row_delta: 0,
                    column_delta: 0,
                    octave_delta: 0,
                    clone: event.modifiers.alt,
                };
                (MovingGroup(state), Some(cue))
            } else {
                let state = MoveState {
                    origin,
                    cell,
                    octave_shift: note.octave_shift,
                    note,
                    target: cell,
                };
                (Moving(state), Some(cue))
            }
        }
        Hit::Boundary {
            row,
            left,
            right,
            column,
        } => {
            let state = RollingEditState {
                origin,
                row,
                left: GroupMember {
                    cell: CellRef::new(row, left.0),
                    note: left.1,
                },
                right: GroupMember {
                    cell: CellRef::new(row, right.0),
                    note: right.1,
                },
                boundary: column,
            };
            (RollingEdit(state), None)
        }
    }
}

fn begin_razor(
    hit: Hit,
    event: &PointerEvent,
    ctx: &GestureContext<'_>,
    origin: GestureOrigin,
) -> InteractionState {
    let target = match hit {
        Hit::Boundary {
            row, left, right, ..
        } => Some(RazorTarget::Merge {
            row,
            left: left.0,
            right: right.0,
        }),
        Hit::NoteBody { cell, note, .. }
        | Hit::NoteEdgeLeft { cell, note }
        | Hit::NoteEdgeRight { cell, note } => {
            let at = ctx.snap.round(ctx.layout.column_f(event.position.x));
            let inside = at > cell.column as i64 && at < note.end(cell.column) as i64;
            inside.then(|| RazorTarget::Split {
                cell,
                note,
                at: at as usize,
            })
        }
        _ => None,
    };
    match target {
        Some(target) => InteractionState::Razor(RazorState { origin, target }),
        None => InteractionState::Idle,
    }
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Drawing(_) => "drawing",
            InteractionState::ResizingLeft(_) => "resizing-left",
            InteractionState::ResizingRight(_) => "resizing-right",
            InteractionState::Moving(_) => "moving",
            InteractionState::MovingGroup(_) => "moving-group",
            InteractionState::ResizingLeftGroup(_) => "resizing-left-group",
            InteractionState::ResizingRightGroup(_) => "resizing-right-group",
            InteractionState::Stretching(_) => "stretching",
            InteractionState::RollingEdit(_) => "rolling-edit",
            InteractionState::Selecting(_) => "selecting",
            InteractionState::Strumming(_) => "strumming",
            InteractionState::Painting(_) => "painting",
            InteractionState::Razor(_) => "razor",
        }
    }

    pub fn origin(&self) -> Option<&GestureOrigin> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Drawing(s) => Some(&s.origin),
            InteractionState::ResizingLeft(s) | InteractionState::ResizingRight(s) => {
                Some(&s.origin)
            }
            InteractionState::Moving(s) => Some(&s.origin),
            InteractionState::MovingGroup(s) => Some(&s.origin),
            InteractionState::ResizingLeftGroup(s) | InteractionState::ResizingRightGroup(s) => {
                Some(&s.origin)
            }
            InteractionState::Stretching(s) => Some(&s.origin),
            InteractionState::RollingEdit(s) => Some(&s.origin),
            InteractionState::Selecting(s) => Some(&s.origin),
            InteractionState::Strumming(s) => Some(&s.origin),
            InteractionState::Painting(s) => Some(&s.origin),
            InteractionState::Razor(s) => Some(&s.origin),
        }
    }

    fn origin_mut(&mut self) -> Option<&mut GestureOrigin> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Drawing(s) => Some(&mut s.origin),
            InteractionState::ResizingLeft(s) | InteractionState::ResizingRight(s) => {
                Some(&mut s.origin)
            }
            InteractionState::Moving(s) => Some(&mut s.origin),
            InteractionState::MovingGroup(s) => Some(&mut s.origin),
            InteractionState::ResizingLeftGroup(s) | InteractionState::ResizingRightGroup(s) => {
                Some(&mut s.origin)
            }
            InteractionState::Stretching(s) => Some(&mut s.origin),
            InteractionState::RollingEdit(s) => Some(&mut s.origin),
            InteractionState::Selecting(s) => Some(&mut s.origin),
            InteractionState::Strumming(s) => Some(&mut s.origin),
            InteractionState::Painting(s) => Some(&mut s.origin),
            InteractionState::Razor(s) => Some(&mut s.origin),
        }
    }

    /// Whether `pointer` drives this gesture.
    pub fn owned_by(&self, pointer: PointerId) -> bool {
        match self {
            InteractionState::Stretching(s) => s.uses_pointer(pointer),
            other => other.origin().is_some_and(|origin| origin.pointer == pointer),
        }
    }

    /// Whether every note this gesture edits still starts where it did, and
    /// a drawn cell is still free.
    pub fn targets_present(&self, grid: &Grid) -> bool {
        let present = |cell: CellRef| grid.note_at(cell).is_some();
        let all_present = |members: &[GroupMember]| members.iter().all(|m| present(m.cell));
        match self {
            InteractionState::Drawing(s) => grid.note_covering(s.cell.row, s.cell.column).is_none(),
            InteractionState::Idle
            | InteractionState::Selecting(_)
            | InteractionState::Strumming(_)
            | InteractionState::Painting(_) => true,
            InteractionState::ResizingLeft(s) | InteractionState::ResizingRight(s) => present(s.cell),
            InteractionState::Moving(s) => present(s.cell),
            InteractionState::MovingGroup(s) => all_present(&s.members),
            InteractionState::ResizingLeftGroup(s) | InteractionState::ResizingRightGroup(s) => {
                all_present(&s.members)
            }
            InteractionState::Stretching(s) => all_present(&s.members),
            InteractionState::RollingEdit(s) => present(s.left.cell) && present(s.right.cell),
            InteractionState::Razor(s) => match &s.target {
                RazorTarget::Split { cell, .. } => present(*cell),
                RazorTarget::Merge { row, left, right } => {
                    present(CellRef::new(*row, *left)) && present(CellRef::new(*row, *right))
                }
            },
        }
    }

    /// Cells whose committed rendering is replaced by this gesture's preview.
    pub fn hidden_cells(&self) -> Vec<CellRef> {
        match self {
            InteractionState::Moving(s) => vec![s.cell],
            InteractionState::ResizingLeft(s) | InteractionState::ResizingRight(s) => vec![s.cell],
            InteractionState::MovingGroup(s) if !s.clone => {
                s.members.iter().map(|m| m.cell).collect()
            }
            InteractionState::ResizingLeftGroup(s) | InteractionState::ResizingRightGroup(s) => {
                s.members.iter().map(|m| m.cell).collect()
            }
            InteractionState::Stretching(s) => s.members.iter().map(|m| m.cell).collect(),
            InteractionState::RollingEdit(s) => vec![s.left.cell, s.right.cell],
            _ => Vec::new(),
        }
    }

    /// Applies a pointer move from the owning pointer.
    pub fn update(&mut self, position: Point, ctx: &GestureContext<'_>) -> Option<PreviewCue> {
        if let Some(origin) = self.origin_mut() {
            origin.track(position);
        }
        let grid = ctx.grid;
        let layout = ctx.layout;
        let snap = ctx.snap;
        match self {
            InteractionState::Idle | InteractionState::Razor(_) => None,
            InteractionState::Drawing(s) => {
                let column = clamp_index(layout.raw_column(position.x), grid.steps());
                s.duration = draw_duration(grid, s.cell, column, snap);
                None
            }
            InteractionState::ResizingRight(s) => {
                let start = s.cell.column as i64;
                let limit = grid.free_end(s.cell.row, s.cell.column, Some(s.cell.column)) as i64;
                let end = clamp_span(snap.round(layout.column_f(position.x)), start + 1, limit);
                s.duration = (end - start) as usize;
                None
            }
            InteractionState::ResizingLeft(s) => {
                let end = s.end() as i64;
                let lo = grid.free_start(s.cell.row, s.cell.column, Some(s.cell.column)) as i64;
                let column = clamp_span(snap.round(layout.column_f(position.x)), lo, end - 1);
                s.column = column as usize;
                s.duration = (end - column) as usize;
                None
            }
            InteractionState::Moving(s) => {
                let (dx, dy) = s.origin.delta(position);
                let rows = (dy / layout.row_height).round() as i64;
                let columns = snap.round(dx / layout.step_width);
                let row = clamp_index(s.cell.row as i64 + rows, grid.row_count());
                let max_column = grid.steps().saturating_sub(s.note.duration) as i64;
                let column = clamp_span(s.cell.column as i64 + columns, 0, max_column) as usize;
                let row_changed = row != s.target.row;
                s.target = CellRef::new(row, column);
                row_changed.then(|| PreviewCue::new(row, s.moved_note()))
            }
            InteractionState::MovingGroup(s) => {
                let (dx, dy) = s.origin.delta(position);
                let row_delta = (dy / layout.row_height).round() as i64;
                s.column_delta = snap.round(dx / layout.step_width);
                if row_delta == s.row_delta {
                    return None;
                }
                s.row_delta = row_delta;
                group_cue(s, grid)
            }
            InteractionState::ResizingLeftGroup(s) | InteractionState::ResizingRightGroup(s) => {
                let (dx, _) = s.origin.delta(position);
                s.delta = snap.round(dx / layout.step_width);
                None
            }
            InteractionState::Stretching(s) => {
                if let StretchSource::Handle(side) = s.source {
                    let column = layout.column_f(position.x);
                    let span = s.bounds.span().max(1) as f32;
                    let new_span = match side {
                        HandleSide::Right => column - s.bounds.start_column as f32,
                        HandleSide::Left => s.bounds.end_column as f32 - column,
                    };
                    s.set_ratio(new_span / span);
                }
                None
            }
            InteractionState::RollingEdit(s) => {
                let lo = s.left.cell.column as i64 + 1;
                let hi = s.right_end() as i64 - 1;
                s.boundary = clamp_span(snap.round(layout.column_f(position.x)), lo, hi) as usize;
                None
            }
            InteractionState::Selecting(s) => {
                s.current = position;
                None
            }
            InteractionState::Strumming(s) => {
                let row = clamp_index(layout.row_index(position.y), grid.row_count());
                if row == s.row {
                    return None;
                }
                s.row = row;
                Some(s.cue())
            }
            InteractionState::Painting(s) => {
                if grid.is_empty() {
                    return None;
                }
                let row = clamp_index(layout.row_index(position.y), grid.row_count());
                let raw = clamp_index(layout.raw_column(position.x), grid.steps());
                let cell = CellRef::new(row, snap.floor(raw));
                let fresh = !s.cells.contains(&cell) && grid.is_free(row, cell.column, 1, &[]);
                if !fresh {
                    return None;
                }
                s.cells.push(cell);
                Some(PreviewCue::new(row, Note::new(1)))
            }
        }
    }

    /// Shifts the octave of the gesture's note(s) by `notches`.
    pub fn apply_wheel(&mut self, notches: i32, grid: &Grid) -> Option<PreviewCue> {
        if notches == 0 {
            return None;
        }
        match self {
            InteractionState::Drawing(s) => {
                s.octave_shift = clamp_octave(s.octave_shift as i32 + notches);
                s.origin.modified = true;
                Some(PreviewCue::new(s.cell.row, s.preview_note()))
            }
            InteractionState::Moving(s) => {
                s.octave_shift = clamp_octave(s.octave_shift as i32 + notches);
                s.origin.modified = true;
                Some(PreviewCue::new(s.target.row, s.moved_note()))
            }
            InteractionState::MovingGroup(s) => {
                s.octave_delta = (s.octave_delta + notches)
                    .clamp(-MAX_GROUP_OCTAVE_DELTA, MAX_GROUP_OCTAVE_DELTA);
                s.origin.modified = true;
                group_cue(s, grid)
            }
            InteractionState::Strumming(s) => {
                s.octave_shift = clamp_octave(s.octave_shift as i32 + notches);
                s.origin.modified = true;
                Some(s.cue())
            }
            _ => None,
        }
    }
}

fn group_cue(state: &GroupMoveState, grid: &Grid) -> Option<PreviewCue> {
    let anchor = state.anchor_member()?;
    let row = clamp_index(anchor.cell.row as i64 + state.row_delta, grid.row_count());
    let note = Note {
        octave_shift: clamp_octave(anchor.note.octave_shift as i32 + state.octave_delta),
        ..anchor.note.clone()
    };
    Some(PreviewCue::new(row, note))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::{hit_test, HitContext};
    use crate::model::STEPS_PER_PATTERN;

    const LAYOUT: GridLayout = GridLayout {
        row_height: 20.0,
        step_width: 30.0,
        gutter_width: 60.0,
        scroll_x: 0.0,
        scroll_y: 0.0,
        width: 540.0,
        height: 160.0,
    };

    fn grid_with(notes: &[(usize, usize, usize)]) -> Grid {
        let mut grid = Grid::new(8, STEPS_PER_PATTERN);
        for (row, column, duration) in notes {
            grid.insert(CellRef::new(*row, *column), Note::new(*duration))
                .expect("insert note");
        }
        grid
    }

    fn x_of(column: f32) -> f32 {
        LAYOUT.column_x(column)
    }

    fn y_of(row: f32) -> f32 {
        LAYOUT.row_y(row) + 10.0
    }

    fn start(
        grid: &Grid,
        selection: &Selection,
        snap: Snap,
        event: PointerEvent,
        modes: EditModes,
    ) -> (InteractionState, Option<PreviewCue>) {
        let config = EditorConfig::default();
        let hit_ctx = HitContext {
            grid,
            selection,
            layout: &LAYOUT,
            snap,
            edge_threshold_px: config.edge_threshold_px,
            handle_radius_px: config.handle_radius_px,
        };
        let hit = hit_test(&hit_ctx, event.position);
        let ctx = GestureContext {
            grid,
            layout: &LAYOUT,
            snap,
            config: &config,
        };
        begin(hit, &event, &ctx, selection, modes)
    }

    fn drag(state: &mut InteractionState, grid: &Grid, snap: Snap, x: f32, y: f32) -> Option<PreviewCue> {
        let config = EditorConfig::default();
        let ctx = GestureContext {
            grid,
            layout: &LAYOUT,
            snap,
            config: &config,
        };
        state.update(Point::new(x, y), &ctx)
    }

    #[test]
    fn test_draw_duration_rounds_up_to_snap() {
        let grid = grid_with(&[]);
        assert_eq!(draw_duration(&grid, CellRef::new(0, 5), 10, Snap::Four), 8);
        assert_eq!(draw_duration(&grid, CellRef::new(0, 5), 2, Snap::One), 1);
        assert_eq!(draw_duration(&grid, CellRef::new(0, 12), 15, Snap::Four), 4);
        assert_eq!(draw_duration(&grid, CellRef::new(0, 14), 15, Snap::Four), 2);
    }

    #[test]
    fn test_drawing_is_capped_by_next_note() {
        let grid = grid_with(&[(1, 6, 2)]);
        let (mut state, cue) = start(
            &grid,
            &Selection::default(),
            Snap::One,
            PointerEvent::mouse(x_of(2.5), y_of(1.0), 0),
            EditModes::default(),
        );
        assert_eq!(cue.map(|c| c.row), Some(1));
        drag(&mut state, &grid, Snap::One, x_of(12.5), y_of(1.0));
        match state {
            InteractionState::Drawing(s) => {
                assert_eq!(s.cell, CellRef::new(1, 2));
                assert_eq!(s.duration, 4);
            }
            other => panic!("expected drawing, got {other:?}"),
        }
    }

    #[test]
    fn test_resize_right_clamps_to_neighbour() {
        let grid = grid_with(&[(0, 2, 2), (0, 7, 1)]);
        let (mut state, _) = start(
            &grid,
            &Selection::default(),
            Snap::One,
            PointerEvent::mouse(x_of(4.0) - 3.0, y_of(0.0), 0),
            EditModes::default(),
        );
        assert_eq!(state.name(), "resizing-right");
        drag(&mut state, &grid, Snap::One, x_of(11.0), y_of(0.0));
        let InteractionState::ResizingRight(s) = &state else {
            panic!("expected resize");
        };
        assert_eq!(s.duration, 5);
        drag(&mut state, &grid, Snap::One, x_of(0.0), y_of(0.0));
        let InteractionState::ResizingRight(s) = &state else {
            panic!("expected resize");
        };
        assert_eq!(s.duration, 1);
    }

    #[test]
    fn test_resize_left_keeps_end_fixed() {
        let grid = grid_with(&[(0, 0, 2), (0, 6, 3)]);
        let (mut state, _) = start(
            &grid,
            &Selection::default(),
            Snap::One,
            PointerEvent::mouse(x_of(6.0) + 3.0, y_of(0.0), 0),
            EditModes::default(),
        );
        drag(&mut state, &grid, Snap::One, x_of(0.2), y_of(0.0));
        let InteractionState::ResizingLeft(s) = &state else {
            panic!("expected resize");
        };
        assert_eq!((s.column, s.duration), (2, 7));
    }

    #[test]
    fn test_move_uses_snapped_delta_and_clamps() {
        let grid = grid_with(&[(2, 4, 2)]);
        let (mut state, _) = start(
            &grid,
            &Selection::default(),
            Snap::Two,
            PointerEvent::mouse(x_of(5.0), y_of(2.0), 0),
            EditModes::default(),
        );
        let cue = drag(&mut state, &grid, Snap::Two, x_of(8.2), y_of(3.0));
        assert_eq!(cue.map(|c| c.row), Some(3));
        let InteractionState::Moving(s) = &state else {
            panic!("expected move");
        };
        assert_eq!(s.target, CellRef::new(3, 8));
        drag(&mut state, &grid, Snap::Two, x_of(40.0), y_of(40.0));
        let InteractionState::Moving(s) = &state else {
            panic!("expected move");
        };
        assert_eq!(s.target, CellRef::new(7, 14));
    }

    #[test]
    fn test_rolling_edit_conserves_span() {
        let grid = grid_with(&[(0, 2, 3), (0, 5, 3)]);
        let (mut state, _) = start(
            &grid,
            &Selection::default(),
            Snap::One,
            PointerEvent::mouse(x_of(5.0), y_of(0.0), 0),
            EditModes::default(),
        );
        for target in [0.0, 3.4, 7.0, 15.0] {
            drag(&mut state, &grid, Snap::One, x_of(target), y_of(0.0));
            let InteractionState::RollingEdit(s) = &state else {
                panic!("expected rolling edit");
            };
            let [left, right] = s.targets();
            assert!(left.note.duration >= 1 && right.note.duration >= 1);
            assert_eq!(left.note.duration + right.note.duration, 6);
            assert_eq!(right.to.column, s.boundary);
        }
    }

    #[test]
    fn test_stretch_targets_scale_from_pivot() {
        let grid = grid_with(&[(0, 4, 1), (1, 8, 1)]);
        let selection = Selection::new([CellRef::new(0, 4), CellRef::new(1, 8)]);
        let bounds = SelectionBounds::of(&grid, &selection).expect("bounds");
        let members = vec![
            GroupMember {
                cell: CellRef::new(0, 4),
                note: Note::new(1),
            },
            GroupMember {
                cell: CellRef::new(1, 8),
                note: Note::new(1),
            },
        ];
        let origin = GestureOrigin::from_event(&PointerEvent::mouse(0.0, 0.0, 0));
        let mut state = StretchState::from_handle(origin, HandleSide::Right, bounds, members);
        state.set_ratio(2.0);
        let targets = state.targets(Snap::One, &grid);
        assert_eq!(targets[0].to, CellRef::new(0, 4));
        assert_eq!(targets[1].to, CellRef::new(1, 12));
        assert!(targets.iter().all(|t| t.note.duration == 2));
        state.set_ratio(100.0);
        assert_eq!(state.ratio, MAX_STRETCH_RATIO);
    }

    #[test]
    fn test_marquee_selects_overlapping_notes() {
        let grid = grid_with(&[(2, 4, 2), (5, 8, 1)]);
        let rect = Rect::from_corners(
            Point::new(x_of(3.0), LAYOUT.row_y(1.0)),
            Point::new(x_of(8.0), LAYOUT.row_y(4.0)),
        );
        assert_eq!(marquee_cells(&rect, &grid, &LAYOUT), vec![CellRef::new(2, 4)]);
    }

    #[test]
    fn test_modifier_and_mode_dispatch() {
        let grid = grid_with(&[(0, 2, 4)]);
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::default()
        };
        let (state, _) = start(
            &grid,
            &Selection::default(),
            Snap::One,
            PointerEvent::mouse(x_of(3.5), y_of(0.0), 0).with_modifiers(ctrl),
            EditModes::default(),
        );
        assert_eq!(state.name(), "selecting");

        let razor = EditModes {
            razor: true,
            pen: false,
        };
        let (state, _) = start(
            &grid,
            &Selection::default(),
            Snap::One,
            PointerEvent::mouse(x_of(4.1), y_of(0.0), 0),
            razor,
        );
        match state {
            InteractionState::Razor(RazorState {
                target: RazorTarget::Split { at, .. },
                ..
            }) => assert_eq!(at, 4),
            other => panic!("expected split, got {other:?}"),
        }

        let pen = EditModes {
            razor: false,
            pen: true,
        };
        let (mut state, _) = start(
            &grid,
            &Selection::default(),
            Snap::One,
            PointerEvent::mouse(x_of(0.5), y_of(0.0), 0),
            pen,
        );
        drag(&mut state, &grid, Snap::One, x_of(1.5), y_of(0.0));
        drag(&mut state, &grid, Snap::One, x_of(2.5), y_of(0.0));
        drag(&mut state, &grid, Snap::One, x_of(1.5), y_of(1.0));
        let InteractionState::Painting(s) = &state else {
            panic!("expected painting");
        };
        assert_eq!(
            s.cells,
            vec![CellRef::new(0, 0), CellRef::new(0, 1), CellRef::new(1, 1)]
        );
    }

    #[test]
    fn test_wheel_shifts_octave_and_marks_modified() {
        let grid = grid_with(&[]);
        let (mut state, _) = start(
            &grid,
            &Selection::default(),
            Snap::One,
            PointerEvent::mouse(x_of(1.5), y_of(0.0), 0),
            EditModes::default(),
        );
        for _ in 0..5 {
            state.apply_wheel(1, &grid);
        }
        let InteractionState::Drawing(s) = &state else {
            panic!("expected drawing");
        };
        assert_eq!(s.octave_shift, 3);
        assert!(s.origin.modified);
        let mut idle = InteractionState::Idle;
        assert!(idle.apply_wheel(1, &grid).is_none());
    }

    #[test]
    fn test_vanished_target_is_detected() {
        let grid = grid_with(&[(0, 2, 2)]);
        let (state, _) = start(
            &grid,
            &Selection::default(),
            Snap::One,
            PointerEvent::mouse(x_of(3.0), y_of(0.0), 0),
            EditModes::default(),
        );
        assert!(state.targets_present(&grid));
        let empty = grid_with(&[]);
        assert!(!state.targets_present(&empty));
    }
}
