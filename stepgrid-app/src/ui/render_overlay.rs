use gpui::{div, px, rgb, Context, IntoElement};
use gpui::prelude::*;

use crate::app::GridEditorView;

impl GridEditorView {
    fn sounding_label(&self) -> Option<String> {
        let (row, octave) = self.preview.sounding?;
        let rows = self.store.rows();
        let label = rows.get(row).map(|config| config.label.clone())?;
        if octave == 0 {
            Some(label)
        } else {
            Some(format!("{label} {octave:+}"))
        }
    }

    pub(crate) fn render_status_bar(&self, _cx: &mut Context<Self>) -> impl IntoElement {
        let transport = if self.transport.is_playing() {
            "playing"
        } else {
            "stopped"
        };
        let mut bar = div()
            .flex()
            .flex_row()
            .gap_3()
            .h(px(24.0))
            .px_2()
            .items_center()
            .bg(rgb(0x151d25))
            .border_t_1()
            .border_color(rgb(0x2a3242))
            .text_color(rgb(0x9fb0bf))
            .text_sm()
            .child(self.status.clone())
            .child(transport);
        if let Some(label) = self.sounding_label() {
            bar = bar.child(div().text_color(rgb(0xd6dee6)).child(format!("\u{266a} {label}")));
        }
        bar
    }

    pub(crate) fn render_toast(&self, _cx: &mut Context<Self>) -> impl IntoElement {
        let Some(message) = self.toast_message.as_ref() else {
            return div();
        };
        div()
            .absolute()
            .bottom(px(34.0))
            .left(px(12.0))
            .bg(rgb(0x1b242e))
            .text_color(rgb(0xd6dee6))
            .border_1()
            .border_color(rgb(0x2a3242))
            .px_2()
            .py_1()
            .text_sm()
            .child(message.clone())
    }
}
