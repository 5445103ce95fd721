use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            w: (a.x - b.x).abs(),
            h: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h * 0.5
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn inset(&self, amount: f32) -> Rect {
        Rect {
            x: self.x + amount,
            y: self.y + amount,
            w: (self.w - amount * 2.0).max(0.0),
            h: (self.h - amount * 2.0).max(0.0),
        }
    }
}

/// Surface-local geometry of the grid: a row-label gutter on the left,
/// then `steps` columns scrolled by `scroll_x`/`scroll_y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    pub row_height: f32,
    pub step_width: f32,
    pub gutter_width: f32,
    pub scroll_x: f32,
    pub scroll_y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        let config = EditorConfig::default();
        Self {
            row_height: config.min_row_height,
            step_width: config.min_step_width,
            gutter_width: config.gutter_width,
            scroll_x: 0.0,
            scroll_y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

impl GridLayout {
    pub fn fit(width: f32, height: f32, rows: usize, steps: usize, config: &EditorConfig) -> Self {
        let usable = (width - config.gutter_width).max(0.0);
        let step_width = if steps == 0 {
            config.min_step_width
        } else {
            (usable / steps as f32).max(config.min_step_width)
        };
        let row_height = if rows == 0 {
            config.min_row_height
        } else {
            (height / rows as f32).max(config.min_row_height)
        };
        Self {
            row_height,
            step_width,
            gutter_width: config.gutter_width,
            scroll_x: 0.0,
            scroll_y: 0.0,
            width,
            height,
        }
    }

    pub fn content_x(&self, x: f32) -> f32 {
        x - self.gutter_width + self.scroll_x
    }

    pub fn content_y(&self, y: f32) -> f32 {
        y + self.scroll_y
    }

    pub fn column_f(&self, x: f32) -> f32 {
        self.content_x(x) / self.step_width
    }

    pub fn raw_column(&self, x: f32) -> i64 {
        self.column_f(x).floor() as i64
    }

    pub fn row_index(&self, y: f32) -> i64 {
        (self.content_y(y) / self.row_height).floor() as i64
    }

    pub fn column_x(&self, column: f32) -> f32 {
        self.gutter_width + column * self.step_width - self.scroll_x
    }

    pub fn row_y(&self, row: f32) -> f32 {
        row * self.row_height - self.scroll_y
    }

    pub fn note_rect(&self, row: usize, column: f32, duration: f32) -> Rect {
        Rect::new(
            self.column_x(column),
            self.row_y(row as f32),
            duration * self.step_width,
            self.row_height,
        )
    }

    pub fn cells_rect(&self, first_row: usize, last_row: usize, start: f32, end: f32) -> Rect {
        let top = self.row_y(first_row as f32);
        let bottom = self.row_y(last_row as f32 + 1.0);
        Rect::new(
            self.column_x(start),
            top,
            (end - start) * self.step_width,
            bottom - top,
        )
    }

    pub fn in_gutter(&self, x: f32) -> bool {
        x < self.gutter_width
    }

    /// Visible column range `[start, end)` in fractional steps.
    pub fn visible_columns(&self) -> (f32, f32) {
        let start = self.scroll_x / self.step_width;
        let end = start + (self.width - self.gutter_width).max(0.0) / self.step_width;
        (start, end)
    }

    pub fn scroll_by(&mut self, dx: f32, dy: f32, rows: usize, steps: usize) {
        let max_x = (steps as f32 * self.step_width - (self.width - self.gutter_width)).max(0.0);
        let max_y = (rows as f32 * self.row_height - self.height).max(0.0);
        self.scroll_x = (self.scroll_x + dx).clamp(0.0, max_x);
        self.scroll_y = (self.scroll_y + dy).clamp(0.0, max_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> GridLayout {
        GridLayout {
            row_height: 20.0,
            step_width: 30.0,
            gutter_width: 60.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            width: 540.0,
            height: 160.0,
        }
    }

    #[test]
    fn test_pointer_to_cell() {
        let layout = layout();
        assert_eq!(layout.raw_column(60.0), 0);
        assert_eq!(layout.raw_column(119.0), 1);
        assert_eq!(layout.raw_column(10.0), -2);
        assert_eq!(layout.row_index(45.0), 2);
        assert_eq!(layout.column_x(2.0), 120.0);
    }

    #[test]
    fn test_fit_respects_minimums() {
        let config = EditorConfig::default();
        let layout = GridLayout::fit(200.0, 100.0, 24, 16, &config);
        assert_eq!(layout.step_width, config.min_step_width);
        assert_eq!(layout.row_height, config.min_row_height);
        let roomy = GridLayout::fit(config.gutter_width + 1600.0, 960.0, 24, 16, &config);
        assert_eq!(roomy.step_width, 100.0);
        assert_eq!(roomy.row_height, 40.0);
    }

    #[test]
    fn test_scroll_is_clamped_to_content() {
        let mut layout = layout();
        layout.scroll_by(1000.0, 1000.0, 16, 32);
        assert_eq!(layout.scroll_x, 32.0 * 30.0 - 480.0);
        assert_eq!(layout.scroll_y, 16.0 * 20.0 - 160.0);
        layout.scroll_by(-5000.0, -5000.0, 16, 32);
        assert_eq!(layout.scroll_x, 0.0);
        assert_eq!(layout.scroll_y, 0.0);
    }

    #[test]
    fn test_marquee_rect_from_corners() {
        let rect = Rect::from_corners(Point::new(10.0, 40.0), Point::new(0.0, 20.0));
        assert_eq!(rect, Rect::new(0.0, 20.0, 10.0, 20.0));
        assert!(rect.intersects(&Rect::new(5.0, 30.0, 1.0, 1.0)));
        assert!(!rect.intersects(&Rect::new(10.0, 30.0, 1.0, 1.0)));
    }
}
