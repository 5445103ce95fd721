use gpui::{
    canvas, div, fill, point, px, rgba, size, Bounds, Context, DispatchPhase, Hsla, IntoElement,
    MouseButton, MouseDownEvent, MouseMoveEvent, MouseUpEvent, ScrollWheelEvent,
};
use gpui::prelude::*;

use stepgrid_core::{render_frame, Color, Modifiers, PointerEvent, WheelEvent};

use crate::app::{GridEditorView, UiNotify};

fn to_hsla(color: Color) -> Hsla {
    Hsla::from(rgba(color.rgba_u32()))
}

fn pointer_modifiers(modifiers: &gpui::Modifiers) -> Modifiers {
    Modifiers {
        ctrl: modifiers.control,
        meta: modifiers.platform,
        alt: modifiers.alt,
        shift: modifiers.shift,
    }
}

impl GridEditorView {
    fn mouse_event(
        &self,
        position: gpui::Point<gpui::Pixels>,
        modifiers: &gpui::Modifiers,
    ) -> PointerEvent {
        let x = f32::from(position.x) - self.surface_origin.0;
        let y = f32::from(position.y) - self.surface_origin.1;
        PointerEvent::mouse(x, y, self.now_ms()).with_modifiers(pointer_modifiers(modifiers))
    }

    fn inside_surface(&self, event: &PointerEvent) -> bool {
        let (w, h) = self.surface_size;
        event.position.x >= 0.0 && event.position.y >= 0.0 && event.position.x < w && event.position.y < h
    }

    pub(crate) fn handle_mouse_down(&mut self, event: &MouseDownEvent, cx: &mut impl UiNotify) {
        let pointer = self.mouse_event(event.position, &event.modifiers);
        self.pointer_down(pointer, cx);
    }

    /// Window-wide: outside the surface only a captured gesture listens.
    pub(crate) fn handle_mouse_move(&mut self, event: &MouseMoveEvent, cx: &mut impl UiNotify) {
        let pointer = self.mouse_event(event.position, &event.modifiers);
        if !self.editor.is_capturing() && !self.inside_surface(&pointer) {
            return;
        }
        self.pointer_move(pointer, cx);
    }

    pub(crate) fn handle_mouse_up(&mut self, event: &MouseUpEvent, cx: &mut impl UiNotify) {
        if event.button != MouseButton::Left || !self.editor.is_capturing() {
            return;
        }
        let pointer = self.mouse_event(event.position, &event.modifiers);
        self.pointer_up(pointer, cx);
    }

    pub(crate) fn handle_scroll_wheel(&mut self, event: &ScrollWheelEvent, cx: &mut impl UiNotify) {
        let row_height = self.editor.snapshot().layout.row_height;
        let delta = event.delta.pixel_delta(px(row_height));
        // gpui reports positive y when the content should move down.
        let wheel = WheelEvent {
            delta_x: -f32::from(delta.x),
            delta_y: -f32::from(delta.y),
            modifiers: pointer_modifiers(&event.modifiers),
        };
        if wheel.delta_x == 0.0 && wheel.delta_y == 0.0 {
            return;
        }
        self.wheel(wheel, cx);
    }

    pub(crate) fn render_grid(&self, cx: &mut Context<Self>) -> impl IntoElement {
        let snapshot = self.editor.shared().load();
        let list = render_frame(&snapshot, &self.theme, self.now_ms());
        let quads = list.quads();
        let labels = list
            .texts()
            .map(|(origin, text, color, size)| {
                div()
                    .absolute()
                    .left(px(origin.x))
                    .top(px(origin.y))
                    .text_size(px(size))
                    .text_color(to_hsla(color))
                    .child(text.to_string())
            })
            .collect::<Vec<_>>();

        let place_handle = cx.weak_entity();
        let move_handle = cx.weak_entity();
        let up_handle = cx.weak_entity();
        let surface = canvas(
            move |bounds, _window, cx| {
                let origin = (f32::from(bounds.origin.x), f32::from(bounds.origin.y));
                let extent = (f32::from(bounds.size.width), f32::from(bounds.size.height));
                let _ = place_handle.update(cx, |view, cx| {
                    view.place_surface(origin, extent, cx);
                });
            },
            move |bounds, _state, window, _cx| {
                for (rect, color) in &quads {
                    let quad = Bounds::new(
                        point(bounds.origin.x + px(rect.x), bounds.origin.y + px(rect.y)),
                        size(px(rect.w), px(rect.h)),
                    );
                    window.paint_quad(fill(quad, to_hsla(*color)));
                }
                window.on_mouse_event(move |event: &MouseMoveEvent, phase, _window, cx| {
                    if phase != DispatchPhase::Bubble {
                        return;
                    }
                    let _ = move_handle.update(cx, |view, cx| view.handle_mouse_move(event, cx));
                });
                window.on_mouse_event(move |event: &MouseUpEvent, phase, _window, cx| {
                    if phase != DispatchPhase::Bubble {
                        return;
                    }
                    let _ = up_handle.update(cx, |view, cx| view.handle_mouse_up(event, cx));
                });
            },
        )
        .size_full();

        div()
            .relative()
            .flex_1()
            .overflow_hidden()
            .child(surface)
            .children(labels)
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(|view, event: &MouseDownEvent, _, cx| {
                    view.handle_mouse_down(event, cx);
                }),
            )
            .on_scroll_wheel(cx.listener(|view, event: &ScrollWheelEvent, _, cx| {
                view.handle_scroll_wheel(event, cx);
            }))
    }
}
