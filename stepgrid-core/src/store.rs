use std::sync::Arc;

use crate::commit::{apply_request, EditRequest, NoteChanges, NoteOverrides};
use crate::host::GridHost;
use crate::model::{CellRef, Grid, NoteMove, PatternFile, RowConfig, Selection};

const DEFAULT_HISTORY: usize = 64;

/// In-memory owner of a pattern. Every edit is applied to a copy of the
/// grid and swapped in only when the whole edit succeeds.
#[derive(Debug)]
pub struct PatternStore {
    grid: Arc<Grid>,
    rows: Arc<Vec<RowConfig>>,
    selection: Selection,
    version: u64,
    undo: Vec<Arc<Grid>>,
    redo: Vec<Arc<Grid>>,
    history_limit: usize,
}

impl PatternStore {
    pub fn new(grid: Grid, rows: Vec<RowConfig>) -> Self {
        Self {
            grid: Arc::new(grid),
            rows: Arc::new(rows),
            selection: Selection::default(),
            version: 0,
            undo: Vec::new(),
            redo: Vec::new(),
            history_limit: DEFAULT_HISTORY,
        }
    }

    pub fn from_pattern(file: &PatternFile) -> Result<Self, crate::model::GridError> {
        Ok(Self::new(file.to_grid()?, file.row_configs_or_default()))
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn grid(&self) -> Arc<Grid> {
        self.grid.clone()
    }

    pub fn rows(&self) -> Arc<Vec<RowConfig>> {
        self.rows.clone()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn to_pattern(&self) -> PatternFile {
        PatternFile::from_grid(&self.grid, &self.rows)
    }

    pub fn apply(&mut self, request: &EditRequest) -> bool {
        let mut next = (*self.grid).clone();
        if let Err(err) = apply_request(&mut next, request) {
            log::warn!("rejected {} edit: {err}", request.name());
            return false;
        }
        if next == *self.grid {
            return false;
        }
        let previous = std::mem::replace(&mut self.grid, Arc::new(next));
        self.undo.push(previous);
        if self.undo.len() > self.history_limit {
            self.undo.remove(0);
        }
        self.redo.clear();
        self.bump();
        log::debug!("applied {} edit (version {})", request.name(), self.version);
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.grid, previous);
        self.redo.push(current);
        self.bump();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.grid, next);
        self.undo.push(current);
        self.bump();
        true
    }

    fn bump(&mut self) {
        self.version += 1;
        self.selection.retain_resolved(&self.grid);
    }
}

impl GridHost for PatternStore {
    fn toggle_note(&mut self, cell: CellRef) {
        self.apply(&EditRequest::Toggle { cell });
    }

    fn add_note(&mut self, cell: CellRef, duration: usize, overrides: &NoteOverrides) {
        self.apply(&EditRequest::Add {
            cell,
            duration,
            overrides: overrides.clone(),
        });
    }

    fn commit_note(&mut self, from: CellRef, to: CellRef, changes: &NoteChanges) {
        self.apply(&EditRequest::Commit {
            from,
            to,
            changes: changes.clone(),
        });
    }

    fn commit_multi_note(&mut self, moves: &[NoteMove]) {
        self.apply(&EditRequest::CommitMulti {
            moves: moves.to_vec(),
        });
    }

    fn copy_multi_note(&mut self, moves: &[NoteMove]) {
        self.apply(&EditRequest::CopyMulti {
            moves: moves.to_vec(),
        });
    }

    fn select_notes(&mut self, cells: &[CellRef]) {
        self.selection = Selection::new(cells.iter().copied());
        self.selection.retain_resolved(&self.grid);
    }

    fn split_note(&mut self, cell: CellRef, at: usize) {
        self.apply(&EditRequest::Split { cell, at });
    }

    fn merge_notes(&mut self, row: usize, left: usize, right: usize) {
        self.apply(&EditRequest::Merge { row, left, right });
    }

    fn add_notes(&mut self, cells: &[CellRef]) {
        self.apply(&EditRequest::AddNotes {
            cells: cells.to_vec(),
        });
    }

    fn delete_notes(&mut self, cells: &[CellRef]) {
        self.apply(&EditRequest::DeleteNotes {
            cells: cells.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Note, STEPS_PER_PATTERN};

    fn new_store() -> PatternStore {
        PatternStore::new(Grid::new(4, STEPS_PER_PATTERN), RowConfig::default_rows(4))
    }

    #[test]
    fn test_toggle_twice_restores_grid() {
        let mut store = new_store();
        let before = store.grid();
        store.toggle_note(CellRef::new(1, 3));
        assert_eq!(store.grid().note_count(), 1);
        store.toggle_note(CellRef::new(1, 3));
        assert_eq!(*store.grid(), *before);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let mut store = new_store();
        store.add_notes(&[CellRef::new(0, 0), CellRef::new(0, 4)]);
        let before = store.grid();
        let moves = vec![
            NoteMove {
                from: CellRef::new(0, 0),
                to: CellRef::new(1, 0),
                note: Note::new(1),
            },
            NoteMove {
                from: CellRef::new(0, 4),
                to: CellRef::new(1, 0),
                note: Note::new(1),
            },
        ];
        store.commit_multi_note(&moves);
        assert_eq!(*store.grid(), *before);
    }

    #[test]
    fn test_undo_redo() {
        let mut store = new_store().with_history_limit(2);
        store.add_notes(&[CellRef::new(0, 0)]);
        store.add_notes(&[CellRef::new(0, 1)]);
        store.add_notes(&[CellRef::new(0, 2)]);
        assert!(store.undo());
        assert!(store.undo());
        assert!(!store.undo());
        assert_eq!(store.grid().note_count(), 1);
        assert!(store.redo());
        assert_eq!(store.grid().note_count(), 2);
    }

    #[test]
    fn test_selection_drops_deleted_notes() {
        let mut store = new_store();
        store.add_notes(&[CellRef::new(0, 0), CellRef::new(2, 5)]);
        store.select_notes(&[CellRef::new(0, 0), CellRef::new(2, 5), CellRef::new(3, 3)]);
        assert_eq!(store.selection().len(), 2);
        store.delete_notes(&[CellRef::new(0, 0)]);
        assert_eq!(store.selection().cells(), &[CellRef::new(2, 5)]);
    }
}
