use serde::{Deserialize, Serialize};

use crate::host::GridHost;
use crate::input::{PointerEvent, PointerKind};
use crate::hit::HandleSide;
use crate::interaction::{
    marquee_cells, GestureContext, GestureOrigin, GroupResizeState, InteractionState,
    RazorTarget,
};
use crate::model::{CellRef, Grid, GridError, Note, NoteMove, Rgb, Selection};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub octave_shift: Option<i8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

impl NoteOverrides {
    pub fn apply(&self, note: Note) -> Note {
        Note {
            octave_shift: self.octave_shift.unwrap_or(note.octave_shift),
            color: self.color.or(note.color),
            ..note
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub octave_shift: Option<i8>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.duration.is_none() && self.octave_shift.is_none()
    }

    pub fn apply(&self, note: &Note) -> Note {
        Note {
            duration: self.duration.unwrap_or(note.duration).max(1),
            octave_shift: self.octave_shift.unwrap_or(note.octave_shift),
            ..note.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditRequest {
    Toggle {
        cell: CellRef,
    },
    Add {
        cell: CellRef,
        duration: usize,
        overrides: NoteOverrides,
    },
    Commit {
        from: CellRef,
        to: CellRef,
        changes: NoteChanges,
    },
    CommitMulti {
        moves: Vec<NoteMove>,
    },
    CopyMulti {
        moves: Vec<NoteMove>,
    },
    Split {
        cell: CellRef,
        at: usize,
    },
    Merge {
        row: usize,
        left: usize,
        right: usize,
    },
    AddNotes {
        cells: Vec<CellRef>,
    },
    DeleteNotes {
        cells: Vec<CellRef>,
    },
}

impl EditRequest {
    pub fn name(&self) -> &'static str {
        match self {
            EditRequest::Toggle { .. } => "toggle",
            EditRequest::Add { .. } => "add",
            EditRequest::Commit { .. } => "commit",
            EditRequest::CommitMulti { .. } => "commit-multi",
            EditRequest::CopyMulti { .. } => "copy-multi",
            EditRequest::Split { .. } => "split",
            EditRequest::Merge { .. } => "merge",
            EditRequest::AddNotes { .. } => "add-notes",
            EditRequest::DeleteNotes { .. } => "delete-notes",
        }
    }

    pub fn dispatch(&self, host: &mut impl GridHost) {
        match self {
            EditRequest::Toggle { cell } => host.toggle_note(*cell),
            EditRequest::Add {
                cell,
                duration,
                overrides,
            } => host.add_note(*cell, *duration, overrides),
            EditRequest::Commit { from, to, changes } => host.commit_note(*from, *to, changes),
            EditRequest::CommitMulti { moves } => host.commit_multi_note(moves),
            EditRequest::CopyMulti { moves } => host.copy_multi_note(moves),
            EditRequest::Split { cell, at } => host.split_note(*cell, *at),
            EditRequest::Merge { row, left, right } => host.merge_notes(*row, *left, *right),
            EditRequest::AddNotes { cells } => host.add_notes(cells),
            EditRequest::DeleteNotes { cells } => host.delete_notes(cells),
        }
    }

    /// Checks the request against `grid` without mutating it.
    pub fn validate(&self, grid: &Grid) -> Result<(), GridError> {
        let mut scratch = grid.clone();
        apply_request(&mut scratch, self)
    }
}

/// Removes every source (unless `keep_sources`) and then places every
/// target. Fails without a partial guarantee; callers apply to a copy.
pub fn apply_moves(grid: &mut Grid, moves: &[NoteMove], keep_sources: bool) -> Result<(), GridError> {
    if !keep_sources {
        for mv in moves {
            grid.take(mv.from)?;
        }
    }
    for mv in moves {
        grid.insert(mv.to, mv.note.clone())?;
    }
    Ok(())
}

pub fn apply_request(grid: &mut Grid, request: &EditRequest) -> Result<(), GridError> {
    match request {
        EditRequest::Toggle { cell } => {
            if grid.remove(*cell).is_none() {
                grid.insert(*cell, Note::new(1))?;
            }
            Ok(())
        }
        EditRequest::Add {
            cell,
            duration,
            overrides,
        } => grid.insert(*cell, overrides.apply(Note::new(*duration))),
        EditRequest::Commit { from, to, changes } => {
            let note = grid.take(*from)?;
            grid.insert(*to, changes.apply(&note))
        }
        EditRequest::CommitMulti { moves } => apply_moves(grid, moves, false),
        EditRequest::CopyMulti { moves } => apply_moves(grid, moves, true),
        EditRequest::Split { cell, at } => {
            let note = grid.take(*cell)?;
            let end = note.end(cell.column);
            if *at <= cell.column || *at >= end {
                return Err(GridError::OutOfBounds {
                    row: cell.row,
                    column: *at,
                    rows: grid.row_count(),
                    steps: grid.steps(),
                });
            }
            let left = Note {
                duration: at - cell.column,
                ..note.clone()
            };
            let right = Note {
                duration: end - at,
                ..note
            };
            grid.insert(*cell, left)?;
            grid.insert(CellRef::new(cell.row, *at), right)
        }
        EditRequest::Merge { row, left, right } => {
            let left_cell = CellRef::new(*row, *left);
            let right_cell = CellRef::new(*row, *right);
            let left_end = grid
                .note_at(left_cell)
                .map(|note| note.end(*left))
                .ok_or(GridError::Missing {
                    row: *row,
                    column: *left,
                })?;
            if left_end != *right {
                return Err(GridError::Missing {
                    row: *row,
                    column: left_end,
                });
            }
            let absorbed = grid.take(right_cell)?;
            let mut merged = grid.take(left_cell)?;
            merged.duration += absorbed.duration;
            grid.insert(left_cell, merged)
        }
        EditRequest::AddNotes { cells } => {
            for cell in cells {
                grid.insert(*cell, Note::new(1))?;
            }
            Ok(())
        }
        EditRequest::DeleteNotes { cells } => {
            for cell in cells {
                grid.remove(*cell);
            }
            Ok(())
        }
    }
}

/// What a finished gesture asks of the owner: at most one edit plus an
/// optional selection replacement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GestureOutcome {
    pub request: Option<EditRequest>,
    pub selection: Option<Vec<CellRef>>,
}

impl GestureOutcome {
    fn request(request: EditRequest) -> Self {
        Self {
            request: Some(request),
            selection: None,
        }
    }

    fn select(cells: Vec<CellRef>) -> Self {
        Self {
            request: None,
            selection: Some(cells),
        }
    }

    fn with_selection(mut self, cells: Vec<CellRef>) -> Self {
        self.selection = Some(cells);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_none() && self.selection.is_none()
    }

    pub fn dispatch(&self, host: &mut impl GridHost) {
        if let Some(request) = &self.request {
            request.dispatch(host);
        }
        if let Some(cells) = &self.selection {
            host.select_notes(cells);
        }
    }
}

fn membership_click(origin: &GestureOrigin, cell: CellRef, selection: &Selection) -> Vec<CellRef> {
    if origin.modifiers.shift {
        selection.toggled(cell).cells().to_vec()
    } else if selection.len() == 1 && selection.contains(cell) {
        Vec::new()
    } else {
        vec![cell]
    }
}

fn note_click(origin: &GestureOrigin, cell: CellRef, selection: &Selection) -> GestureOutcome {
    if origin.kind == PointerKind::Touch {
        let outcome = GestureOutcome::request(EditRequest::Toggle { cell });
        if selection.contains(cell) {
            return outcome.with_selection(selection.toggled(cell).cells().to_vec());
        }
        return outcome;
    }
    GestureOutcome::select(membership_click(origin, cell, selection))
}

fn moves_change_anything(moves: &[NoteMove], grid: &Grid) -> bool {
    moves
        .iter()
        .any(|mv| mv.from != mv.to || grid.note_at(mv.from) != Some(&mv.note))
}

fn checked(request: EditRequest, grid: &Grid) -> Option<EditRequest> {
    match request.validate(grid) {
        Ok(()) => Some(request),
        Err(err) => {
            log::warn!("dropping {} request: {err}", request.name());
            None
        }
    }
}

fn targets_of(moves: &[NoteMove]) -> Vec<CellRef> {
    moves.iter().map(|mv| mv.to).collect()
}

fn group_resize_outcome(
    state: &GroupResizeState,
    side: HandleSide,
    quick: bool,
    grid: &Grid,
    selection: &Selection,
) -> GestureOutcome {
    if quick {
        return GestureOutcome::select(membership_click(&state.origin, state.anchor, selection));
    }
    let moves = state.targets(side, grid);
    if !moves_change_anything(&moves, grid) {
        return GestureOutcome::default();
    }
    let targets = targets_of(&moves);
    match checked(EditRequest::CommitMulti { moves }, grid) {
        Some(request) => GestureOutcome::request(request).with_selection(targets),
        None => GestureOutcome::default(),
    }
}

/// Turns the final state of a gesture into the edit it completes.
pub fn translate(
    state: InteractionState,
    release: &PointerEvent,
    ctx: &GestureContext<'_>,
    selection: &Selection,
) -> GestureOutcome {
    let grid = ctx.grid;
    let quick = state
        .origin()
        .is_some_and(|origin| origin.is_quick_click(release.time_ms, ctx.config));

    match state {
        InteractionState::Idle | InteractionState::Strumming(_) => GestureOutcome::default(),
        InteractionState::Drawing(s) => {
            let request = if quick {
                checked(EditRequest::Toggle { cell: s.cell }, grid)
            } else {
                let overrides = NoteOverrides {
                    octave_shift: (s.octave_shift != 0).then_some(s.octave_shift),
                    color: None,
                };
                checked(
                    EditRequest::Add {
                        cell: s.cell,
                        duration: s.duration.max(1),
                        overrides,
                    },
                    grid,
                )
            };
            GestureOutcome {
                request,
                selection: Some(Vec::new()),
            }
        }
        InteractionState::Moving(s) => {
            if quick {
                return note_click(&s.origin, s.cell, selection);
            }
            let changes = NoteChanges {
                duration: None,
                octave_shift: (s.octave_shift != s.note.octave_shift).then_some(s.octave_shift),
            };
            if s.target == s.cell && changes.is_empty() {
                return GestureOutcome::default();
            }
            let request = checked(
                EditRequest::Commit {
                    from: s.cell,
                    to: s.target,
                    changes,
                },
                grid,
            );
            GestureOutcome {
                request,
                selection: None,
            }
        }
        InteractionState::ResizingLeft(s) | InteractionState::ResizingRight(s) => {
            if quick {
                return note_click(&s.origin, s.cell, selection);
            }
            let to = CellRef::new(s.cell.row, s.column);
            if to == s.cell && s.duration == s.note.duration {
                return GestureOutcome::default();
            }
            let changes = NoteChanges {
                duration: Some(s.duration.max(1)),
                octave_shift: None,
            };
            let request = checked(
                EditRequest::Commit {
                    from: s.cell,
                    to,
                    changes,
                },
                grid,
            );
            GestureOutcome {
                request,
                selection: None,
            }
        }
        InteractionState::MovingGroup(s) => {
            if quick {
                return GestureOutcome::select(membership_click(&s.origin, s.anchor, selection));
            }
            let moves = s.targets(grid);
            if !s.clone && !moves_change_anything(&moves, grid) {
                return GestureOutcome::default();
            }
            let targets = targets_of(&moves);
            let request = if s.clone {
                EditRequest::CopyMulti { moves }
            } else {
                EditRequest::CommitMulti { moves }
            };
            match checked(request, grid) {
                Some(request) => GestureOutcome::request(request).with_selection(targets),
                None => GestureOutcome::default(),
            }
        }
        InteractionState::ResizingLeftGroup(s) => {
            group_resize_outcome(&s, HandleSide::Left, quick, grid, selection)
        }
        InteractionState::ResizingRightGroup(s) => {
            group_resize_outcome(&s, HandleSide::Right, quick, grid, selection)
        }
        InteractionState::Stretching(s) => {
            if quick {
                return GestureOutcome::default();
            }
            let moves = s.targets(ctx.snap, grid);
            if !moves_change_anything(&moves, grid) {
                return GestureOutcome::default();
            }
            let targets = targets_of(&moves);
            match checked(EditRequest::CommitMulti { moves }, grid) {
                Some(request) => GestureOutcome::request(request).with_selection(targets),
                None => GestureOutcome::default(),
            }
        }
        InteractionState::RollingEdit(s) => {
            let moves = s.targets().to_vec();
            if quick || !moves_change_anything(&moves, grid) {
                return GestureOutcome::default();
            }
            GestureOutcome {
                request: checked(EditRequest::CommitMulti { moves }, grid),
                selection: None,
            }
        }
        InteractionState::Selecting(s) => {
            let cells = marquee_cells(&s.rect(), grid, ctx.layout);
            if s.additive {
                GestureOutcome::select(selection.union(&cells).cells().to_vec())
            } else {
                GestureOutcome::select(cells)
            }
        }
        InteractionState::Painting(s) => {
            if s.cells.is_empty() {
                return GestureOutcome::default();
            }
            GestureOutcome {
                request: checked(EditRequest::AddNotes { cells: s.cells }, grid),
                selection: None,
            }
        }
        InteractionState::Razor(s) => {
            let request = match s.target {
                RazorTarget::Split { cell, at, .. } => EditRequest::Split { cell, at },
                RazorTarget::Merge { row, left, right } => EditRequest::Merge { row, left, right },
            };
            GestureOutcome {
                request: checked(request, grid),
                selection: None,
            }
        }
    }
}
