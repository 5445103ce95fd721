use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context as AnyhowContext, Result};
use gpui::{
    div, px, rgb, size, App, Application, Bounds, Context, SharedString, Timer, Window,
    WindowBounds, WindowOptions, prelude::*,
};
use itertools::Itertools;

use stepgrid_core::{
    Editor, EditorConfig, Grid, Key, Note, PatternFile, PatternStore, PointerEvent, PreviewSink,
    RowConfig, SplitHost, Theme, WheelEvent,
};

use crate::actions::{
    self, CancelGesture, CycleSnap, DeleteSelection, Redo, SavePattern, TogglePen, TogglePlay,
    ToggleRazor, Undo,
};
use crate::transport::Transport;

pub const PATTERN_ENV: &str = "STEPGRID_PATTERN";
const DEFAULT_PATTERN_FILE: &str = "pattern.json";
const TOAST_MS: u64 = 1200;

pub trait UiNotify {
    fn notify(&mut self);
}

/// Preview sink for the desktop app: remembers what is sounding so the
/// status bar can show it.
#[derive(Debug, Default)]
pub struct PreviewLog {
    pub sounding: Option<(usize, i8)>,
    pub started: u64,
}

impl PreviewSink for PreviewLog {
    fn preview_note(&mut self, row: usize, note: &Note) {
        log::debug!("preview row {row} octave {:+}", note.octave_shift);
        self.sounding = Some((row, note.octave_shift));
        self.started += 1;
    }

    fn stop_preview_note(&mut self) {
        self.sounding = None;
    }
}

pub struct GridEditorView {
    pub(crate) editor: Editor,
    pub(crate) store: PatternStore,
    pub(crate) preview: PreviewLog,
    pub(crate) transport: Transport,
    pub(crate) theme: Theme,
    pub(crate) pattern_path: Option<PathBuf>,
    pub(crate) surface_origin: (f32, f32),
    pub(crate) surface_size: (f32, f32),
    pub(crate) painted_version: u64,
    pub(crate) status: SharedString,
    pub(crate) toast_message: Option<String>,
    toast_deadline: Option<u64>,
    synced_version: u64,
    started: Instant,
}

impl GridEditorView {
    fn new(config: EditorConfig, store: PatternStore, pattern_path: Option<PathBuf>) -> Self {
        let mut view = Self::new_state(config, store);
        view.pattern_path = pattern_path;
        view
    }

    pub fn new_state(config: EditorConfig, store: PatternStore) -> Self {
        let editor = Editor::new(config.clone(), store.grid(), store.rows());
        let transport = Transport::new(&config, store.grid().steps());
        Self {
            editor,
            synced_version: store.version(),
            store,
            preview: PreviewLog::default(),
            transport,
            theme: Theme::default(),
            pattern_path: None,
            surface_origin: (0.0, 0.0),
            surface_size: (0.0, 0.0),
            painted_version: 0,
            status: "ready".into(),
            toast_message: None,
            toast_deadline: None,
            started: Instant::now(),
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn sync_editor(&mut self) {
        let selection_changed = self.store.selection() != &self.editor.snapshot().selection;
        if self.store.version() == self.synced_version && !selection_changed {
            return;
        }
        self.synced_version = self.store.version();
        self.editor.sync(self.store.grid(), self.store.selection());
        self.refresh_status();
    }

    fn refresh_status(&mut self) {
        let modes = self.editor.modes();
        let mut parts = vec![
            format!("snap {}", self.editor.snap().steps()),
            format!("{} notes", self.store.grid().note_count()),
        ];
        let selected = self.store.selection().len();
        if selected > 0 {
            parts.push(format!("{selected} selected"));
        }
        if modes.razor {
            parts.push("razor".to_string());
        }
        if modes.pen {
            parts.push("pen".to_string());
        }
        self.status = parts.iter().join(" | ").into();
    }

    pub(crate) fn show_toast(&mut self, message: &str, cx: &mut impl UiNotify) {
        self.toast_message = Some(message.to_string());
        self.toast_deadline = Some(self.now_ms() + TOAST_MS);
        cx.notify();
    }

    pub(crate) fn place_surface(&mut self, origin: (f32, f32), size: (f32, f32), cx: &mut impl UiNotify) {
        self.surface_origin = origin;
        if self.surface_size == size {
            return;
        }
        self.surface_size = size;
        self.editor.resize(size.0, size.1, &mut self.preview);
        cx.notify();
    }

    pub fn pointer_down(&mut self, event: PointerEvent, cx: &mut impl UiNotify) {
        let mut host = SplitHost::new(&mut self.store, &mut self.preview);
        self.editor.pointer_down(&event, &mut host);
        self.sync_editor();
        cx.notify();
    }

    pub fn pointer_move(&mut self, event: PointerEvent, cx: &mut impl UiNotify) {
        let before = self.editor.shared().version();
        let mut host = SplitHost::new(&mut self.store, &mut self.preview);
        self.editor.pointer_move(&event, &mut host);
        if self.editor.shared().version() != before {
            cx.notify();
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent, cx: &mut impl UiNotify) {
        let mut host = SplitHost::new(&mut self.store, &mut self.preview);
        self.editor.pointer_up(&event, &mut host);
        self.sync_editor();
        cx.notify();
    }

    /// The window lost the pointer mid-gesture (deactivated, capture lost).
    pub fn pointer_lost(&mut self, cx: &mut impl UiNotify) {
        let Some(pointer) = self.editor.captured_pointer() else {
            return;
        };
        self.editor.pointer_cancel(pointer, &mut self.preview);
        cx.notify();
    }

    pub fn wheel(&mut self, event: WheelEvent, cx: &mut impl UiNotify) {
        let mut host = SplitHost::new(&mut self.store, &mut self.preview);
        self.editor.wheel(&event, &mut host);
        cx.notify();
    }

    pub fn toggle_mode(&mut self, key: Key, cx: &mut impl UiNotify) {
        let enabled = self.editor.toggle_mode(key);
        let name = match key {
            Key::Razor => "Razor",
            Key::Pen => "Pen",
            Key::Delete | Key::Escape => return,
        };
        self.refresh_status();
        self.show_toast(&format!("{name} {}", if enabled { "on" } else { "off" }), cx);
    }

    pub fn delete_selection(&mut self, cx: &mut impl UiNotify) {
        let mut host = SplitHost::new(&mut self.store, &mut self.preview);
        self.editor.key_down(Key::Delete, &mut host);
        self.sync_editor();
        cx.notify();
    }

    pub fn cancel_gesture(&mut self, cx: &mut impl UiNotify) {
        if self.editor.interaction().is_idle() {
            return;
        }
        self.editor.cancel_gesture(&mut self.preview);
        cx.notify();
    }

    pub fn cycle_snap(&mut self, cx: &mut impl UiNotify) {
        let snap = self.editor.cycle_snap();
        self.refresh_status();
        self.show_toast(&format!("Snap: {} step(s)", snap.steps()), cx);
    }

    pub fn undo(&mut self, cx: &mut impl UiNotify) {
        if !self.editor.interaction().is_idle() {
            return;
        }
        if self.store.undo() {
            self.sync_editor();
            cx.notify();
        } else {
            self.show_toast("Nothing to undo", cx);
        }
    }

    pub fn redo(&mut self, cx: &mut impl UiNotify) {
        if !self.editor.interaction().is_idle() {
            return;
        }
        if self.store.redo() {
            self.sync_editor();
            cx.notify();
        } else {
            self.show_toast("Nothing to redo", cx);
        }
    }

    pub fn toggle_play(&mut self, cx: &mut impl UiNotify) {
        let playback = self.transport.toggle(self.now_ms());
        self.editor.set_playback(playback);
        cx.notify();
    }

    pub fn save_pattern(&mut self, cx: &mut impl UiNotify) {
        match self.write_pattern() {
            Ok(path) => {
                log::info!("saved pattern to {}", path.display());
                self.show_toast(&format!("Saved {}", path.display()), cx);
            }
            Err(err) => {
                log::warn!("{err:#}");
                self.show_toast(&format!("Save failed: {err}"), cx);
            }
        }
    }

    fn write_pattern(&self) -> Result<PathBuf> {
        let path = self
            .pattern_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PATTERN_FILE));
        let json = serde_json::to_string_pretty(&self.store.to_pattern())
            .context("failed to encode pattern")?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Frame-loop step: advances the demo transport and repaints when the
    /// published snapshot moved on.
    pub fn tick(&mut self, cx: &mut impl UiNotify) {
        let now = self.now_ms();
        let mut dirty = false;
        if self.transport.is_playing() {
            let playback = self.transport.advance(now);
            self.editor.set_playback(playback);
            dirty = true;
        }
        if self.toast_deadline.is_some_and(|deadline| now > deadline) {
            self.toast_deadline = None;
            self.toast_message = None;
            dirty = true;
        }
        if self.editor.shared().version() != self.painted_version {
            dirty = true;
        }
        if dirty {
            cx.notify();
        }
    }
}

impl UiNotify for Context<'_, GridEditorView> {
    fn notify(&mut self) {
        Context::notify(self);
    }
}

impl Render for GridEditorView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.painted_version = self.editor.shared().version();
        div()
            .relative()
            .flex()
            .flex_col()
            .bg(rgb(0x0f161c))
            .text_color(rgb(0xe6eef5))
            .font_family("Menlo")
            .size_full()
            .child(self.render_grid(cx))
            .child(self.render_status_bar(cx))
            .child(self.render_toast(cx))
    }
}

fn load_store(config: &EditorConfig) -> Result<(PatternStore, Option<PathBuf>)> {
    let Ok(path) = std::env::var(PATTERN_ENV) else {
        log::info!("{PATTERN_ENV} not set, starting with an empty pattern");
        let grid = Grid::new(config.rows, config.steps);
        return Ok((PatternStore::new(grid, RowConfig::default_rows(config.rows)), None));
    };
    let path = PathBuf::from(path);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read pattern {}", path.display()))?;
    let file: PatternFile = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse pattern {}", path.display()))?;
    let store = PatternStore::from_pattern(&file)
        .with_context(|| format!("pattern {} violates grid invariants", path.display()))?;
    log::info!("loaded pattern {} ({} notes)", path.display(), file.notes.len());
    Ok((store, Some(path)))
}

pub fn run_app() -> Result<()> {
    let config = EditorConfig::load().context("failed to load editor config")?;
    let (store, pattern_path) = load_store(&config)?;
    let frame_interval = Duration::from_millis(config.frame_interval_ms);

    Application::new().run(move |cx: &mut App| {
        actions::bind_keys(cx);

        let bounds = Bounds::centered(None, size(px(1100.0), px(640.0)), cx);
        let window = match cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                ..Default::default()
            },
            |window, cx| {
                cx.new(|cx| {
                    cx.observe_window_activation(window, |view: &mut GridEditorView, window, cx| {
                        if !window.is_window_active() {
                            view.pointer_lost(cx);
                        }
                    })
                    .detach();
                    GridEditorView::new(config, store, pattern_path)
                })
            },
        ) {
            Ok(window) => window,
            Err(err) => {
                log::error!("failed to open window: {err:#}");
                cx.quit();
                return;
            }
        };
        let view = match window.update(cx, |_, _, cx| cx.entity()) {
            Ok(view) => view,
            Err(err) => {
                log::error!("window closed before start: {err:#}");
                cx.quit();
                return;
            }
        };

        cx.on_action({
            let view = view.clone();
            move |_: &ToggleRazor, cx| {
                view.update(cx, |view, cx| view.toggle_mode(Key::Razor, cx));
            }
        });
        cx.on_action({
            let view = view.clone();
            move |_: &TogglePen, cx| {
                view.update(cx, |view, cx| view.toggle_mode(Key::Pen, cx));
            }
        });
        cx.on_action({
            let view = view.clone();
            move |_: &DeleteSelection, cx| {
                view.update(cx, |view, cx| view.delete_selection(cx));
            }
        });
        cx.on_action({
            let view = view.clone();
            move |_: &CancelGesture, cx| {
                view.update(cx, |view, cx| view.cancel_gesture(cx));
            }
        });
        cx.on_action({
            let view = view.clone();
            move |_: &CycleSnap, cx| {
                view.update(cx, |view, cx| view.cycle_snap(cx));
            }
        });
        cx.on_action({
            let view = view.clone();
            move |_: &Undo, cx| {
                view.update(cx, |view, cx| view.undo(cx));
            }
        });
        cx.on_action({
            let view = view.clone();
            move |_: &Redo, cx| {
                view.update(cx, |view, cx| view.redo(cx));
            }
        });
        cx.on_action({
            let view = view.clone();
            move |_: &TogglePlay, cx| {
                view.update(cx, |view, cx| view.toggle_play(cx));
            }
        });
        cx.on_action({
            let view = view.clone();
            move |_: &SavePattern, cx| {
                view.update(cx, |view, cx| view.save_pattern(cx));
            }
        });

        cx.spawn(move |cx: &mut gpui::AsyncApp| {
            let async_cx = cx.clone();
            async move {
                let mut async_cx = async_cx;
                loop {
                    Timer::after(frame_interval).await;
                    if window
                        .update(&mut async_cx, |view, _, cx| view.tick(cx))
                        .is_err()
                    {
                        break;
                    }
                }
            }
        })
        .detach();

        cx.activate(true);
    });
    Ok(())
}
