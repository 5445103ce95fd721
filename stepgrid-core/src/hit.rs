use itertools::{Itertools, MinMaxResult};

use crate::layout::{GridLayout, Point, Rect};
use crate::model::{CellRef, Grid, Note, Selection};
use crate::snap::Snap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleSide {
    Left,
    Right,
}

/// Bounding box of the notes a selection still resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionBounds {
    pub first_row: usize,
    pub last_row: usize,
    pub start_column: usize,
    pub end_column: usize,
    pub count: usize,
}

impl SelectionBounds {
    pub fn of(grid: &Grid, selection: &Selection) -> Option<SelectionBounds> {
        let members = selection.resolved(grid).collect::<Vec<_>>();
        let (first_row, last_row) = match members.iter().map(|(cell, _)| cell.row).minmax() {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(row) => (row, row),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        let start_column = members.iter().map(|(cell, _)| cell.column).min()?;
        let end_column = members
            .iter()
            .map(|(cell, note)| note.end(cell.column))
            .max()?;
        Some(SelectionBounds {
            first_row,
            last_row,
            start_column,
            end_column,
            count: members.len(),
        })
    }

    pub fn span(&self) -> usize {
        self.end_column - self.start_column
    }

    pub fn rect(&self, layout: &GridLayout) -> Rect {
        layout.cells_rect(
            self.first_row,
            self.last_row,
            self.start_column as f32,
            self.end_column as f32,
        )
    }

    pub fn handle_point(&self, side: HandleSide, layout: &GridLayout) -> Point {
        let rect = self.rect(layout);
        match side {
            HandleSide::Left => Point::new(rect.x, rect.center_y()),
            HandleSide::Right => Point::new(rect.right(), rect.center_y()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Hit {
    TransformHandle {
        side: HandleSide,
        bounds: SelectionBounds,
    },
    Gutter {
        row: usize,
    },
    Boundary {
        row: usize,
        left: (usize, Note),
        right: (usize, Note),
        column: usize,
    },
    NoteEdgeLeft {
        cell: CellRef,
        note: Note,
    },
    NoteEdgeRight {
        cell: CellRef,
        note: Note,
    },
    NoteBody {
        cell: CellRef,
        note: Note,
        column: usize,
    },
    Empty {
        cell: CellRef,
    },
}

impl Hit {
    pub fn note_cell(&self) -> Option<CellRef> {
        match self {
            Hit::NoteEdgeLeft { cell, .. }
            | Hit::NoteEdgeRight { cell, .. }
            | Hit::NoteBody { cell, .. } => Some(*cell),
            _ => None,
        }
    }
}

pub struct HitContext<'a> {
    pub grid: &'a Grid,
    pub selection: &'a Selection,
    pub layout: &'a GridLayout,
    pub snap: Snap,
    pub edge_threshold_px: f32,
    pub handle_radius_px: f32,
}

pub(crate) fn clamp_index(value: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    value.clamp(0, len as i64 - 1) as usize
}

pub fn hit_test(ctx: &HitContext<'_>, position: Point) -> Hit {
    let grid = ctx.grid;
    let layout = ctx.layout;
    if grid.is_empty() {
        return Hit::Empty {
            cell: CellRef::new(0, 0),
        };
    }

    if let Some(bounds) = SelectionBounds::of(grid, ctx.selection).filter(|b| b.count >= 2) {
        for side in [HandleSide::Left, HandleSide::Right] {
            if position.distance(bounds.handle_point(side, layout)) <= ctx.handle_radius_px {
                return Hit::TransformHandle { side, bounds };
            }
        }
    }

    let row = clamp_index(layout.row_index(position.y), grid.row_count());
    if layout.in_gutter(position.x) {
        return Hit::Gutter { row };
    }

    let raw = clamp_index(layout.raw_column(position.x), grid.steps());
    let Some((start, note)) = grid.note_covering(row, raw) else {
        return Hit::Empty {
            cell: CellRef::new(row, ctx.snap.floor(raw)),
        };
    };

    let cell = CellRef::new(row, start);
    let rect = layout.note_rect(row, start as f32, note.duration as f32);
    let band = ctx.edge_threshold_px.min(rect.w / 3.0);

    if position.x - rect.x < band {
        if let Some((left, left_note)) = grid.note_ending_at(row, start) {
            return Hit::Boundary {
                row,
                left: (left, left_note.clone()),
                right: (start, note.clone()),
                column: start,
            };
        }
        return Hit::NoteEdgeLeft {
            cell,
            note: note.clone(),
        };
    }

    if rect.right() - position.x < band {
        let end = note.end(start);
        if let Some(right_note) = grid.note_at(CellRef::new(row, end)) {
            return Hit::Boundary {
                row,
                left: (start, note.clone()),
                right: (end, right_note.clone()),
                column: end,
            };
        }
        return Hit::NoteEdgeRight {
            cell,
            note: note.clone(),
        };
    }

    Hit::NoteBody {
        cell,
        note: note.clone(),
        column: raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn hit(grid: &Grid, selection: &Selection, snap: Snap, x: f32, y: f32) -> Hit {
        let ctx = HitContext {
            grid,
            selection,
            layout: &LAYOUT,
            snap,
            edge_threshold_px: 15.0,
            handle_radius_px: 8.0,
        };
        hit_test(&ctx, Point::new(x, y))
    }

    fn x_of(column: f32) -> f32 {
        LAYOUT.column_x(column)
    }

    #[test]
    fn test_empty_cell_is_snapped_down() {
        let grid = grid_with(&[]);
        let result = hit(&grid, &Selection::default(), Snap::Four, x_of(6.5), 30.0);
        assert_eq!(
            result,
            Hit::Empty {
                cell: CellRef::new(1, 4)
            }
        );
    }

    #[test]
    fn test_off_grid_note_is_not_empty() {
        // Note starts at 5, snap 4 would floor the pointer to 4.
        let grid = grid_with(&[(0, 5, 2)]);
        let result = hit(&grid, &Selection::default(), Snap::Four, x_of(5.5), 10.0);
        assert!(matches!(result, Hit::NoteBody { cell, .. } if cell == CellRef::new(0, 5)));
    }

    #[test]
    fn test_edges_and_body() {
        let grid = grid_with(&[(0, 2, 3)]);
        let selection = Selection::default();
        assert!(matches!(
            hit(&grid, &selection, Snap::One, x_of(2.0) + 4.0, 10.0),
            Hit::NoteEdgeLeft { .. }
        ));
        assert!(matches!(
            hit(&grid, &selection, Snap::One, x_of(5.0) - 4.0, 10.0),
            Hit::NoteEdgeRight { .. }
        ));
        assert!(matches!(
            hit(&grid, &selection, Snap::One, x_of(3.5), 10.0),
            Hit::NoteBody { column: 3, .. }
        ));
    }

    #[test]
    fn test_narrow_note_keeps_a_body() {
        let grid = grid_with(&[(0, 2, 1)]);
        let result = hit(&grid, &Selection::default(), Snap::One, x_of(2.5), 10.0);
        assert!(matches!(result, Hit::NoteBody { .. }));
    }

    #[test]
    fn test_shared_edge_is_boundary() {
        let grid = grid_with(&[(0, 0, 2), (0, 2, 2)]);
        let result = hit(&grid, &Selection::default(), Snap::One, x_of(2.0) + 2.0, 10.0);
        match result {
            Hit::Boundary { left, right, column, .. } => {
                assert_eq!(left.0, 0);
                assert_eq!(right.0, 2);
                assert_eq!(column, 2);
            }
            other => panic!("expected boundary, got {other:?}"),
        }
    }

    #[test]
    fn test_transform_handle_shadows_note() {
        let grid = grid_with(&[(0, 0, 2), (1, 4, 2)]);
        let selection = Selection::new([CellRef::new(0, 0), CellRef::new(1, 4)]);
        let result = hit(&grid, &selection, Snap::One, x_of(0.0), 20.0);
        assert!(matches!(
            result,
            Hit::TransformHandle {
                side: HandleSide::Left,
                ..
            }
        ));
        let single = Selection::new([CellRef::new(0, 0)]);
        assert!(!matches!(
            hit(&grid, &single, Snap::One, x_of(0.0), 20.0),
            Hit::TransformHandle { .. }
        ));
    }

    #[test]
    fn test_gutter_and_empty_grid() {
        let grid = grid_with(&[]);
        assert_eq!(
            hit(&grid, &Selection::default(), Snap::One, 10.0, 45.0),
            Hit::Gutter { row: 2 }
        );
        let empty = Grid::new(0, 0);
        assert_eq!(
            hit(&empty, &Selection::default(), Snap::One, 200.0, 45.0),
            Hit::Empty {
                cell: CellRef::new(0, 0)
            }
        );
    }
}
