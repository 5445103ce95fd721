use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use stepgrid_core::input::PointerId;
use stepgrid_core::{
    CellRef, EditRequest, Editor, EditorConfig, GridHost, Key, Note, NoteChanges, NoteMove,
    NoteOverrides, PatternFile, PatternStore, PointerEvent, PreviewSink, Snap, WheelEvent,
};

/// One input in a replay script.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ScriptStep {
    Down(PointerEvent),
    Move(PointerEvent),
    Up(PointerEvent),
    Cancel { pointer: PointerId },
    Wheel(WheelEvent),
    KeyDown { key: Key },
    KeyUp { key: Key },
    ToggleMode { key: Key },
    Resize { width: f32, height: f32 },
    Snap { snap: Snap },
    Undo,
    Redo,
}

/// Applies every request to a store and echoes it as a JSON line.
struct ReplayHost {
    store: PatternStore,
    dispatched: usize,
}

impl ReplayHost {
    fn record(&mut self, request: EditRequest) {
        match serde_json::to_string(&request) {
            Ok(line) => println!("{line}"),
            Err(err) => log::warn!("failed to encode {} request: {err}", request.name()),
        }
        self.dispatched += 1;
        if !self.store.apply(&request) {
            log::info!("{} request left the grid unchanged", request.name());
        }
    }
}

impl GridHost for ReplayHost {
    fn toggle_note(&mut self, cell: CellRef) {
        self.record(EditRequest::Toggle { cell });
    }

    fn add_note(&mut self, cell: CellRef, duration: usize, overrides: &NoteOverrides) {
        self.record(EditRequest::Add {
            cell,
            duration,
            overrides: overrides.clone(),
        });
    }

    fn commit_note(&mut self, from: CellRef, to: CellRef, changes: &NoteChanges) {
        self.record(EditRequest::Commit {
            from,
            to,
            changes: changes.clone(),
        });
    }

    fn commit_multi_note(&mut self, moves: &[NoteMove]) {
        self.record(EditRequest::CommitMulti {
            moves: moves.to_vec(),
        });
    }

    fn copy_multi_note(&mut self, moves: &[NoteMove]) {
        self.record(EditRequest::CopyMulti {
            moves: moves.to_vec(),
        });
    }

    fn select_notes(&mut self, cells: &[CellRef]) {
        let labels = cells
            .iter()
            .map(|cell| format!("({},{})", cell.row, cell.column))
            .collect::<Vec<_>>();
        println!("select [{}]", labels.join(" "));
        self.store.select_notes(cells);
    }

    fn split_note(&mut self, cell: CellRef, at: usize) {
        self.record(EditRequest::Split { cell, at });
    }

    fn merge_notes(&mut self, row: usize, left: usize, right: usize) {
        self.record(EditRequest::Merge { row, left, right });
    }

    fn add_notes(&mut self, cells: &[CellRef]) {
        self.record(EditRequest::AddNotes {
            cells: cells.to_vec(),
        });
    }

    fn delete_notes(&mut self, cells: &[CellRef]) {
        self.record(EditRequest::DeleteNotes {
            cells: cells.to_vec(),
        });
    }
}

impl PreviewSink for ReplayHost {
    fn preview_note(&mut self, row: usize, note: &Note) {
        println!("preview row={row} octave={}", note.octave_shift);
    }

    fn stop_preview_note(&mut self) {
        println!("preview stop");
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(pattern_path), Some(script_path)) = (args.next(), args.next()) else {
        bail!("usage: stepgrid-cli <pattern.json> <script.json> [config.json]");
    };
    let config = match args.next() {
        Some(path) => EditorConfig::load_from(Path::new(&path))?,
        None => EditorConfig::load()?,
    };

    let pattern: PatternFile = read_json(&PathBuf::from(pattern_path))?;
    let steps: Vec<ScriptStep> = read_json(&PathBuf::from(script_path))?;
    let store = PatternStore::from_pattern(&pattern).context("pattern violates grid invariants")?;

    let mut editor = Editor::new(config, store.grid(), store.rows());
    let mut host = ReplayHost {
        store,
        dispatched: 0,
    };
    log::info!("replaying {} steps", steps.len());
    for step in &steps {
        replay(step, &mut editor, &mut host);
        editor.sync(host.store.grid(), host.store.selection());
    }

    let output = serde_json::to_string_pretty(&host.store.to_pattern())
        .context("failed to encode final pattern")?;
    println!("{output}");
    log::info!("{} requests dispatched", host.dispatched);
    Ok(())
}

fn replay(step: &ScriptStep, editor: &mut Editor, host: &mut ReplayHost) {
    match step {
        ScriptStep::Down(event) => editor.pointer_down(event, host),
        ScriptStep::Move(event) => editor.pointer_move(event, host),
        ScriptStep::Up(event) => editor.pointer_up(event, host),
        ScriptStep::Cancel { pointer } => editor.pointer_cancel(*pointer, host),
        ScriptStep::Wheel(event) => editor.wheel(event, host),
        ScriptStep::KeyDown { key } => editor.key_down(*key, host),
        ScriptStep::KeyUp { key } => editor.key_up(*key),
        ScriptStep::ToggleMode { key } => {
            let enabled = editor.toggle_mode(*key);
            log::info!("{key:?} mode {}", if enabled { "on" } else { "off" });
        }
        ScriptStep::Resize { width, height } => editor.resize(*width, *height, host),
        ScriptStep::Snap { snap } => editor.set_snap(*snap),
        ScriptStep::Undo => {
            if !host.store.undo() {
                log::info!("nothing to undo");
            }
        }
        ScriptStep::Redo => {
            if !host.store.redo() {
                log::info!("nothing to redo");
            }
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}
