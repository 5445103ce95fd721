use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STEPS_PER_PATTERN: usize = 16;
pub const MIN_OCTAVE_SHIFT: i8 = -3;
pub const MAX_OCTAVE_SHIFT: i8 = 3;

pub fn clamp_octave(value: i32) -> i8 {
    value.clamp(MIN_OCTAVE_SHIFT as i32, MAX_OCTAVE_SHIFT as i32) as i8
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    pub fn hex(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub duration: usize,
    #[serde(default)]
    pub offset: f32,
    #[serde(default)]
    pub octave_shift: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

impl Default for Note {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Note {
    pub fn new(duration: usize) -> Self {
        Self {
            duration: duration.max(1),
            offset: 0.0,
            octave_shift: 0,
            color: None,
        }
    }

    pub fn with_octave_shift(mut self, octave_shift: i32) -> Self {
        self.octave_shift = clamp_octave(octave_shift);
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn end(&self, column: usize) -> usize {
        column.saturating_add(self.duration)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub column: usize,
}

impl CellRef {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// A note relocated from `from` to `to`, carrying its final attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteMove {
    pub from: CellRef,
    pub to: CellRef,
    pub note: Note,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RowConfig {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub is_root: bool,
}

impl RowConfig {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: None,
            is_root: false,
        }
    }

    pub fn default_rows(count: usize) -> Vec<RowConfig> {
        (0..count)
            .map(|row| RowConfig {
                label: format!("Row {}", row + 1),
                color: None,
                is_root: row % 12 == 0,
            })
            .collect()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("cell ({row}, {column}) is outside a {rows}x{steps} grid")]
    OutOfBounds {
        row: usize,
        column: usize,
        rows: usize,
        steps: usize,
    },
    #[error("note at ({row}, {column}) with duration {duration} overlaps another note")]
    Overlap {
        row: usize,
        column: usize,
        duration: usize,
    },
    #[error("no note starts at ({row}, {column})")]
    Missing { row: usize, column: usize },
}

/// Sparse pattern grid. Only start cells hold a note; the cells a note
/// covers after its start are empty and not addressable.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    steps: usize,
    rows: Vec<Vec<Option<Note>>>,
}

impl Grid {
    pub fn new(row_count: usize, steps: usize) -> Self {
        Self {
            steps,
            rows: vec![vec![None; steps]; row_count],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.steps == 0
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row < self.rows.len() && cell.column < self.steps
    }

    pub fn note_at(&self, cell: CellRef) -> Option<&Note> {
        self.rows.get(cell.row)?.get(cell.column)?.as_ref()
    }

    pub fn note_covering(&self, row: usize, column: usize) -> Option<(usize, &Note)> {
        let cells = self.rows.get(row)?;
        if column >= self.steps {
            return None;
        }
        let (start, note) = (0..=column)
            .rev()
            .find_map(|col| cells[col].as_ref().map(|note| (col, note)))?;
        if note.end(start) > column {
            Some((start, note))
        } else {
            None
        }
    }

    pub fn note_ending_at(&self, row: usize, boundary: usize) -> Option<(usize, &Note)> {
        if boundary == 0 {
            return None;
        }
        let (start, note) = self.note_covering(row, boundary - 1)?;
        (note.end(start) == boundary).then_some((start, note))
    }

    pub fn notes_in_row(&self, row: usize) -> impl Iterator<Item = (usize, &Note)> + '_ {
        self.rows
            .get(row)
            .into_iter()
            .flat_map(|cells| cells.iter().enumerate())
            .filter_map(|(column, cell)| cell.as_ref().map(|note| (column, note)))
    }

    pub fn notes(&self) -> impl Iterator<Item = (CellRef, &Note)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(column, cell)| {
                    cell.as_ref().map(|note| (CellRef::new(row, column), note))
                })
        })
    }

    pub fn note_count(&self) -> usize {
        self.notes().count()
    }

    /// Pairs of notes in `row` where the first ends exactly where the second starts.
    pub fn adjacent_pairs(&self, row: usize) -> Vec<(usize, usize)> {
        self.notes_in_row(row)
            .tuple_windows()
            .filter(|((left, left_note), (right, _))| left_note.end(*left) == *right)
            .map(|((left, _), (right, _))| (left, right))
            .collect()
    }

    pub fn is_free(&self, row: usize, start: usize, duration: usize, ignore: &[usize]) -> bool {
        if row >= self.rows.len() || duration == 0 || duration > self.steps.saturating_sub(start) {
            return false;
        }
        let end = start + duration;
        !self
            .notes_in_row(row)
            .filter(|(column, _)| !ignore.contains(column))
            .any(|(column, note)| column < end && note.end(column) > start)
    }

    /// First column after `start` that is blocked by another note, or the grid end.
    pub fn free_end(&self, row: usize, start: usize, ignore: Option<usize>) -> usize {
        self.notes_in_row(row)
            .filter(|(column, _)| Some(*column) != ignore)
            .map(|(column, _)| column)
            .find(|column| *column > start)
            .unwrap_or(self.steps)
    }

    /// End of the closest note that starts before `column`, or 0.
    pub fn free_start(&self, row: usize, column: usize, ignore: Option<usize>) -> usize {
        self.notes_in_row(row)
            .filter(|(start, _)| Some(*start) != ignore && *start < column)
            .map(|(start, note)| note.end(start))
            .max()
            .unwrap_or(0)
            .min(column)
    }

    pub fn insert(&mut self, cell: CellRef, note: Note) -> Result<(), GridError> {
        if !self.contains(cell) || note.duration == 0 || note.duration > self.steps - cell.column {
            return Err(GridError::OutOfBounds {
                row: cell.row,
                column: cell.column,
                rows: self.rows.len(),
                steps: self.steps,
            });
        }
        if !self.is_free(cell.row, cell.column, note.duration, &[]) {
            return Err(GridError::Overlap {
                row: cell.row,
                column: cell.column,
                duration: note.duration,
            });
        }
        self.rows[cell.row][cell.column] = Some(note);
        Ok(())
    }

    pub fn remove(&mut self, cell: CellRef) -> Option<Note> {
        self.rows.get_mut(cell.row)?.get_mut(cell.column)?.take()
    }

    pub fn take(&mut self, cell: CellRef) -> Result<Note, GridError> {
        self.remove(cell).ok_or(GridError::Missing {
            row: cell.row,
            column: cell.column,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    cells: Vec<CellRef>,
}

impl Selection {
    pub fn new(cells: impl IntoIterator<Item = CellRef>) -> Self {
        let mut cells = cells.into_iter().collect::<Vec<_>>();
        cells.sort();
        cells.dedup();
        Self { cells }
    }

    pub fn cells(&self) -> &[CellRef] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        self.cells.binary_search(&cell).is_ok()
    }

    pub fn toggled(&self, cell: CellRef) -> Selection {
        let mut cells = self.cells.clone();
        match cells.binary_search(&cell) {
            Ok(index) => {
                cells.remove(index);
            }
            Err(index) => cells.insert(index, cell),
        }
        Selection { cells }
    }

    pub fn union(&self, other: &[CellRef]) -> Selection {
        Selection::new(self.cells.iter().chain(other.iter()).copied())
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Entries that still resolve to a note; stale entries are skipped.
    pub fn resolved<'a>(&'a self, grid: &'a Grid) -> impl Iterator<Item = (CellRef, &'a Note)> + 'a {
        self.cells
            .iter()
            .filter_map(move |cell| grid.note_at(*cell).map(|note| (*cell, note)))
    }

    pub fn resolved_len(&self, grid: &Grid) -> usize {
        self.resolved(grid).count()
    }

    pub fn retain_resolved(&mut self, grid: &Grid) {
        self.cells.retain(|cell| grid.note_at(*cell).is_some());
    }
}

fn default_steps() -> usize {
    STEPS_PER_PATTERN
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedNote {
    pub row: usize,
    pub column: usize,
    #[serde(flatten)]
    pub note: Note,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternFile {
    pub rows: usize,
    #[serde(default = "default_steps")]
    pub steps: usize,
    #[serde(default)]
    pub row_configs: Vec<RowConfig>,
    #[serde(default)]
    pub notes: Vec<PlacedNote>,
}

impl PatternFile {
    pub fn from_grid(grid: &Grid, row_configs: &[RowConfig]) -> Self {
        Self {
            rows: grid.row_count(),
            steps: grid.steps(),
            row_configs: row_configs.to_vec(),
            notes: grid
                .notes()
                .map(|(cell, note)| PlacedNote {
                    row: cell.row,
                    column: cell.column,
                    note: note.clone(),
                })
                .collect(),
        }
    }

    pub fn to_grid(&self) -> Result<Grid, GridError> {
        let mut grid = Grid::new(self.rows, self.steps);
        for placed in &self.notes {
            grid.insert(CellRef::new(placed.row, placed.column), placed.note.clone())?;
        }
        Ok(grid)
    }

    pub fn row_configs_or_default(&self) -> Vec<RowConfig> {
        let mut rows = self.row_configs.clone();
        let defaults = RowConfig::default_rows(self.rows);
        if rows.len() < self.rows {
            rows.extend(defaults.into_iter().skip(rows.len()));
        }
        rows.truncate(self.rows);
        rows
    }
}
