use gpui::{actions, App, KeyBinding};

actions!(
    stepgrid_app,
    [
        ToggleRazor,
        TogglePen,
        DeleteSelection,
        CancelGesture,
        CycleSnap,
        Undo,
        Redo,
        TogglePlay,
        SavePattern
    ]
);

pub fn bind_keys(cx: &mut App) {
    cx.bind_keys([
        KeyBinding::new("r", ToggleRazor, None),
        KeyBinding::new("p", TogglePen, None),
        KeyBinding::new("backspace", DeleteSelection, None),
        KeyBinding::new("delete", DeleteSelection, None),
        KeyBinding::new("escape", CancelGesture, None),
        KeyBinding::new("g", CycleSnap, None),
        KeyBinding::new("cmd-z", Undo, None),
        KeyBinding::new("cmd-shift-z", Redo, None),
        KeyBinding::new("space", TogglePlay, None),
        KeyBinding::new("cmd-s", SavePattern, None),
    ]);
}
