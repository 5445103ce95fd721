use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use static_assertions::assert_impl_all;

use crate::hit::Hit;
use crate::input::EditModes;
use crate::interaction::InteractionState;
use crate::layout::GridLayout;
use crate::model::{CellRef, Grid, Note, RowConfig, Selection};
use crate::snap::Snap;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Playback {
    /// Playhead in fractional steps.
    pub position: f32,
    pub playing: bool,
}

#[derive(Clone, Debug)]
pub struct EditorSnapshot {
    pub version: u64,
    pub grid: Arc<Grid>,
    pub rows: Arc<Vec<RowConfig>>,
    pub selection: Selection,
    pub interaction: InteractionState,
    pub hover: Option<Hit>,
    pub layout: GridLayout,
    pub snap: Snap,
    pub playback: Playback,
    pub modes: EditModes,
}

impl EditorSnapshot {
    pub fn new(grid: Arc<Grid>, rows: Arc<Vec<RowConfig>>, layout: GridLayout, snap: Snap) -> Self {
        Self {
            version: 0,
            grid,
            rows,
            selection: Selection::default(),
            interaction: InteractionState::Idle,
            hover: None,
            layout,
            snap,
            playback: Playback::default(),
            modes: EditModes::default(),
        }
    }

    /// Selected notes as they should be drawn. A non-additive marquee hides
    /// the current selection until it is replaced on release.
    pub fn displayed_selection(&self) -> Vec<(CellRef, &Note)> {
        match &self.interaction {
            InteractionState::Selecting(s) if !s.additive => Vec::new(),
            _ => self.selection.resolved(&self.grid).collect(),
        }
    }
}

/// Latest published snapshot, readable from any thread.
#[derive(Clone, Debug)]
pub struct SharedSnapshot {
    current: Arc<RwLock<Arc<EditorSnapshot>>>,
    version: Arc<AtomicU64>,
}

assert_impl_all!(SharedSnapshot: Send, Sync);
assert_impl_all!(EditorSnapshot: Send, Sync);

impl SharedSnapshot {
    pub fn new(snapshot: EditorSnapshot) -> Self {
        let version = snapshot.version;
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
            version: Arc::new(AtomicU64::new(version)),
        }
    }

    pub fn publish(&self, snapshot: Arc<EditorSnapshot>) {
        let version = snapshot.version;
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = snapshot;
        drop(slot);
        self.version.store(version, Ordering::Release);
    }

    pub fn load(&self) -> Arc<EditorSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// The current snapshot when it is newer than `seen`.
    pub fn load_if_newer(&self, seen: u64) -> Option<Arc<EditorSnapshot>> {
        if self.version() == seen {
            return None;
        }
        Some(self.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Point;
    use crate::interaction::{GestureOrigin, SelectingState};
    use crate::input::PointerEvent;

    fn snapshot() -> EditorSnapshot {
        let mut grid = Grid::new(4, 16);
        grid.insert(CellRef::new(1, 2), Note::new(2)).expect("insert");
        EditorSnapshot::new(
            Arc::new(grid),
            Arc::new(RowConfig::default_rows(4)),
            GridLayout::default(),
            Snap::One,
        )
    }

    #[test]
    fn test_publish_and_load_across_threads() {
        let shared = SharedSnapshot::new(snapshot());
        let reader = shared.clone();
        let mut next = snapshot();
        next.version = 3;
        shared.publish(Arc::new(next));
        let seen = std::thread::spawn(move || reader.load().version)
            .join()
            .expect("reader thread");
        assert_eq!(seen, 3);
        assert!(shared.load_if_newer(3).is_none());
        assert!(shared.load_if_newer(2).is_some());
    }

    #[test]
    fn test_marquee_hides_selection() {
        let mut snap = snapshot();
        snap.selection = Selection::new([CellRef::new(1, 2), CellRef::new(3, 3)]);
        assert_eq!(snap.displayed_selection().len(), 1);
        snap.interaction = InteractionState::Selecting(SelectingState {
            origin: GestureOrigin::from_event(&PointerEvent::mouse(0.0, 0.0, 0)),
            current: Point::new(5.0, 5.0),
            additive: false,
        });
        assert!(snap.displayed_selection().is_empty());
    }
}
