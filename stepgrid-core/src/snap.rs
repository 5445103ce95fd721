use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("snap must be 1, 2 or 4 (got {0})")]
pub struct InvalidSnap(pub u8);

/// Quantization denominator in steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Snap {
    #[default]
    One,
    Two,
    Four,
}

impl Snap {
    pub const ALL: [Snap; 3] = [Snap::One, Snap::Two, Snap::Four];

    pub fn steps(self) -> usize {
        match self {
            Snap::One => 1,
            Snap::Two => 2,
            Snap::Four => 4,
        }
    }

    pub fn floor(self, column: usize) -> usize {
        column - column % self.steps()
    }

    pub fn ceil_len(self, len: usize) -> usize {
        let s = self.steps();
        len.max(1).div_ceil(s) * s
    }

    pub fn round(self, value: f32) -> i64 {
        let s = self.steps() as f32;
        ((value / s).round() * s) as i64
    }

    pub fn is_boundary(self, column: usize) -> bool {
        column % self.steps() == 0
    }

    pub fn next(self) -> Snap {
        match self {
            Snap::One => Snap::Two,
            Snap::Two => Snap::Four,
            Snap::Four => Snap::One,
        }
    }
}

impl TryFrom<u8> for Snap {
    type Error = InvalidSnap;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Snap::One),
            2 => Ok(Snap::Two),
            4 => Ok(Snap::Four),
            other => Err(InvalidSnap(other)),
        }
    }
}

impl From<Snap> for u8 {
    fn from(snap: Snap) -> u8 {
        snap.steps() as u8
    }
}
