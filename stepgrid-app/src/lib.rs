pub fn run_app() -> anyhow::Result<()> {
    crate::app::run_app()
}

pub use crate::app::{GridEditorView, PreviewLog, UiNotify, PATTERN_ENV};
pub use crate::transport::Transport;

mod actions;
mod app;
mod transport;
mod ui;
