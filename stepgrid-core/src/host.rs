use crate::commit::{NoteChanges, NoteOverrides};
use crate::model::{CellRef, Note, NoteMove};

/// Owner of the grid and the selection. The editor never mutates either
/// directly; every completed gesture ends in at most one of these calls
/// (plus `select_notes`), and the owner hands the new grid back through
/// `Editor::sync`.
pub trait GridHost {
    fn toggle_note(&mut self, cell: CellRef);
    fn add_note(&mut self, cell: CellRef, duration: usize, overrides: &NoteOverrides);
    fn commit_note(&mut self, from: CellRef, to: CellRef, changes: &NoteChanges);
    fn commit_multi_note(&mut self, moves: &[NoteMove]);
    fn copy_multi_note(&mut self, moves: &[NoteMove]);
    fn select_notes(&mut self, cells: &[CellRef]);
    fn split_note(&mut self, cell: CellRef, at: usize);
    fn merge_notes(&mut self, row: usize, left: usize, right: usize);
    fn add_notes(&mut self, cells: &[CellRef]);
    fn delete_notes(&mut self, cells: &[CellRef]);
}

pub trait PreviewSink {
    fn preview_note(&mut self, row: usize, note: &Note);
    fn stop_preview_note(&mut self);
}

pub trait EditorHost: GridHost + PreviewSink {}

impl<T: GridHost + PreviewSink> EditorHost for T {}

/// Pairs a grid owner with a separate preview sink.
pub struct SplitHost<'a, G, P> {
    pub grid: &'a mut G,
    pub preview: &'a mut P,
}

impl<'a, G, P> SplitHost<'a, G, P> {
    pub fn new(grid: &'a mut G, preview: &'a mut P) -> Self {
        Self { grid, preview }
    }
}

impl<G: GridHost, P> GridHost for SplitHost<'_, G, P> {
    fn toggle_note(&mut self, cell: CellRef) {
        self.grid.toggle_note(cell);
    }

    fn add_note(&mut self, cell: CellRef, duration: usize, overrides: &NoteOverrides) {
        self.grid.add_note(cell, duration, overrides);
    }

    fn commit_note(&mut self, from: CellRef, to: CellRef, changes: &NoteChanges) {
        self.grid.commit_note(from, to, changes);
    }

    fn commit_multi_note(&mut self, moves: &[NoteMove]) {
        self.grid.commit_multi_note(moves);
    }

    fn copy_multi_note(&mut self, moves: &[NoteMove]) {
        self.grid.copy_multi_note(moves);
    }

    fn select_notes(&mut self, cells: &[CellRef]) {
        self.grid.select_notes(cells);
    }

    fn split_note(&mut self, cell: CellRef, at: usize) {
        self.grid.split_note(cell, at);
    }

    fn merge_notes(&mut self, row: usize, left: usize, right: usize) {
        self.grid.merge_notes(row, left, right);
    }

    fn add_notes(&mut self, cells: &[CellRef]) {
        self.grid.add_notes(cells);
    }

    fn delete_notes(&mut self, cells: &[CellRef]) {
        self.grid.delete_notes(cells);
    }
}

impl<G, P: PreviewSink> PreviewSink for SplitHost<'_, G, P> {
    fn preview_note(&mut self, row: usize, note: &Note) {
        self.preview.preview_note(row, note);
    }

    fn stop_preview_note(&mut self) {
        self.preview.stop_preview_note();
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SilentPreview;

impl PreviewSink for SilentPreview {
    fn preview_note(&mut self, _row: usize, _note: &Note) {}

    fn stop_preview_note(&mut self) {}
}
