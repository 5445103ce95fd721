use stepgrid_app::{GridEditorView, UiNotify};
use stepgrid_core::{
    CellRef, EditorConfig, Grid, Key, Note, PatternStore, PointerEvent, RowConfig, WheelEvent,
    STEPS_PER_PATTERN,
};

struct CountingNotify(usize);

impl UiNotify for CountingNotify {
    fn notify(&mut self) {
        self.0 += 1;
    }
}

fn view_with(notes: &[(usize, usize, usize)]) -> GridEditorView {
    let mut grid = Grid::new(8, STEPS_PER_PATTERN);
    for &(row, column, duration) in notes {
        grid.insert(CellRef::new(row, column), Note::new(duration))
            .expect("seed note");
    }
    let store = PatternStore::new(grid, RowConfig::default_rows(8));
    GridEditorView::new_state(EditorConfig::default(), store)
}

fn x(column: f32) -> f32 {
    72.0 + column * 24.0
}

fn y(row: usize) -> f32 {
    row as f32 * 18.0 + 9.0
}

#[test]
fn test_drag_moves_note_through_the_view() {
    let mut view = view_with(&[(1, 2, 2)]);
    let mut notify = CountingNotify(0);
    view.pointer_down(PointerEvent::mouse(x(3.0), y(1), 0), &mut notify);
    view.pointer_move(PointerEvent::mouse(x(5.0), y(3), 120), &mut notify);
    view.pointer_up(PointerEvent::mouse(x(5.0), y(3), 300), &mut notify);
    let grid = view.store().grid();
    assert!(grid.note_at(CellRef::new(1, 2)).is_none());
    assert_eq!(grid.note_at(CellRef::new(3, 4)).map(|n| n.duration), Some(2));
    assert_eq!(view.editor().snapshot().grid.note_count(), 1);
}

#[test]
fn test_wheel_during_draw_shifts_octave() {
    let mut view = view_with(&[]);
    let mut notify = CountingNotify(0);
    view.pointer_down(PointerEvent::mouse(x(0.5), y(0), 0), &mut notify);
    view.wheel(
        WheelEvent {
            delta_x: 0.0,
            delta_y: -18.0,
            modifiers: Default::default(),
        },
        &mut notify,
    );
    view.pointer_up(PointerEvent::mouse(x(0.5), y(0), 100), &mut notify);
    let note = view.store().grid().note_at(CellRef::new(0, 0)).cloned();
    assert_eq!(note.map(|n| n.octave_shift), Some(1));
}

#[test]
fn test_delete_selection_clears_notes() {
    let mut view = view_with(&[(0, 0, 1), (2, 4, 1)]);
    let mut notify = CountingNotify(0);
    view.pointer_down(PointerEvent::mouse(x(0.5), y(0), 0), &mut notify);
    view.pointer_up(PointerEvent::mouse(x(0.5), y(0), 40), &mut notify);
    assert_eq!(view.store().selection().len(), 1);
    view.delete_selection(&mut notify);
    assert_eq!(view.store().grid().note_count(), 1);
    assert!(view.store().selection().is_empty());
}

#[test]
fn test_undo_is_ignored_mid_gesture() {
    let mut view = view_with(&[(0, 0, 1)]);
    let mut notify = CountingNotify(0);
    view.toggle_mode(Key::Pen, &mut notify);
    view.pointer_down(PointerEvent::mouse(x(3.5), y(2), 0), &mut notify);
    view.undo(&mut notify);
    assert!(!view.editor().interaction().is_idle());
    view.pointer_up(PointerEvent::mouse(x(3.5), y(2), 60), &mut notify);
    assert!(view.store().grid().note_at(CellRef::new(2, 3)).is_some());
}
