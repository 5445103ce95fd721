use serde::{Deserialize, Serialize};

use crate::layout::Point;

pub type PointerId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub fn marquee(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub id: PointerId,
    #[serde(default)]
    pub kind: PointerKind,
    pub position: Point,
    #[serde(default)]
    pub button: PointerButton,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub time_ms: u64,
}

impl PointerEvent {
    pub fn mouse(x: f32, y: f32, time_ms: u64) -> Self {
        Self {
            id: 0,
            kind: PointerKind::Mouse,
            position: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::default(),
            time_ms,
        }
    }

    pub fn touch(id: PointerId, x: f32, y: f32, time_ms: u64) -> Self {
        Self {
            id,
            kind: PointerKind::Touch,
            ..Self::mouse(x, y, time_ms)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Negative `delta_y` is wheel-up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelEvent {
    #[serde(default)]
    pub delta_x: f32,
    pub delta_y: f32,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl WheelEvent {
    pub fn octave_notches(&self) -> i32 {
        if self.delta_y < 0.0 {
            1
        } else if self.delta_y > 0.0 {
            -1
        } else {
            0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Razor,
    Pen,
    Delete,
    Escape,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditModes {
    pub razor: bool,
    pub pen: bool,
}

impl EditModes {
    pub fn merged(self, other: EditModes) -> EditModes {
        EditModes {
            razor: self.razor || other.razor,
            pen: self.pen || other.pen,
        }
    }
}
