pub use crate::commit::{EditRequest, GestureOutcome, NoteChanges, NoteOverrides};
pub use crate::config::{ConfigError, EditorConfig};
pub use crate::editor::Editor;
pub use crate::hit::{Hit, HandleSide};
pub use crate::host::{EditorHost, GridHost, PreviewSink, SilentPreview, SplitHost};
pub use crate::input::{EditModes, Key, Modifiers, PointerButton, PointerEvent, PointerKind, WheelEvent};
pub use crate::interaction::InteractionState;
pub use crate::layout::{GridLayout, Point, Rect};
pub use crate::model::{
    CellRef, Grid, GridError, Note, NoteMove, PatternFile, Rgb, RowConfig, Selection,
    STEPS_PER_PATTERN,
};
pub use crate::render::{render_frame, Color, DisplayList, DrawCmd, Theme};
pub use crate::snap::Snap;
pub use crate::snapshot::{EditorSnapshot, Playback, SharedSnapshot};
pub use crate::store::PatternStore;

pub mod capture;
pub mod commit;
pub mod config;
pub mod editor;
pub mod hit;
pub mod host;
pub mod input;
pub mod interaction;
pub mod layout;
pub mod model;
pub mod preview;
pub mod render;
pub mod snap;
pub mod snapshot;
pub mod store;
