use std::f32::consts::TAU;

use crate::hit::{HandleSide, SelectionBounds};
use crate::interaction::{InteractionState, RazorTarget};
use crate::layout::{GridLayout, Point, Rect};
use crate::model::{CellRef, Note, NoteMove, RowConfig};
use crate::snapshot::EditorSnapshot;

const DASH: f32 = 4.0;
const GAP: f32 = 3.0;
const LABEL_SIZE: f32 = 11.0;
const BADGE_SIZE: f32 = 9.0;
const INDICATOR_WIDTH: f32 = 6.0;
const MIN_PULSE_HZ: f32 = 1.0;
const MAX_PULSE_HZ: f32 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub hex: u32,
    pub alpha: f32,
}

impl Color {
    pub const fn rgb(hex: u32) -> Self {
        Self { hex, alpha: 1.0 }
    }

    pub const fn rgba(hex: u32, alpha: f32) -> Self {
        Self { hex, alpha }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            ..self
        }
    }

    /// `0xRRGGBBAA` for hosts that take packed colors.
    pub fn rgba_u32(self) -> u32 {
        (self.hex << 8) | (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCmd {
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f32,
        dashed: bool,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f32,
        dashed: bool,
    },
    Text {
        origin: Point,
        text: String,
        color: Color,
        size: f32,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    cmds: Vec<DrawCmd>,
}

impl DisplayList {
    pub fn cmds(&self) -> &[DrawCmd] {
        &self.cmds
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    fn fill(&mut self, rect: Rect, color: Color) {
        self.cmds.push(DrawCmd::FillRect { rect, color });
    }

    fn stroke(&mut self, rect: Rect, color: Color, width: f32, dashed: bool) {
        self.cmds.push(DrawCmd::StrokeRect {
            rect,
            color,
            width,
            dashed,
        });
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width: f32, dashed: bool) {
        self.cmds.push(DrawCmd::Line {
            from,
            to,
            color,
            width,
            dashed,
        });
    }

    fn text(&mut self, origin: Point, text: impl Into<String>, color: Color, size: f32) {
        self.cmds.push(DrawCmd::Text {
            origin,
            text: text.into(),
            color,
            size,
        });
    }

    pub fn texts(&self) -> impl Iterator<Item = (Point, &str, Color, f32)> + '_ {
        self.cmds.iter().filter_map(|cmd| match cmd {
            DrawCmd::Text {
                origin,
                text,
                color,
                size,
            } => Some((*origin, text.as_str(), *color, *size)),
            _ => None,
        })
    }

    /// Every non-text command as axis-aligned filled rectangles.
    pub fn quads(&self) -> Vec<(Rect, Color)> {
        let mut quads = Vec::with_capacity(self.cmds.len() * 2);
        for cmd in &self.cmds {
            match cmd {
                DrawCmd::FillRect { rect, color } => quads.push((*rect, *color)),
                DrawCmd::StrokeRect {
                    rect,
                    color,
                    width,
                    dashed,
                } => {
                    let top_left = Point::new(rect.x, rect.y);
                    let top_right = Point::new(rect.right(), rect.y);
                    let bottom_left = Point::new(rect.x, rect.bottom());
                    let bottom_right = Point::new(rect.right(), rect.bottom());
                    for (from, to) in [
                        (top_left, top_right),
                        (bottom_left, bottom_right),
                        (top_left, bottom_left),
                        (top_right, bottom_right),
                    ] {
                        line_quads(&mut quads, from, to, *color, *width, *dashed);
                    }
                }
                DrawCmd::Line {
                    from,
                    to,
                    color,
                    width,
                    dashed,
                } => line_quads(&mut quads, *from, *to, *color, *width, *dashed),
                DrawCmd::Text { .. } => {}
            }
        }
        quads
    }
}

fn line_quads(out: &mut Vec<(Rect, Color)>, from: Point, to: Point, color: Color, width: f32, dashed: bool) {
    let horizontal = (to.y - from.y).abs() <= (to.x - from.x).abs();
    let (start, end) = if horizontal {
        (from.x.min(to.x), from.x.max(to.x))
    } else {
        (from.y.min(to.y), from.y.max(to.y))
    };
    let half = width * 0.5;
    let mut push = |a: f32, b: f32| {
        let rect = if horizontal {
            Rect::new(a, from.y - half, b - a, width)
        } else {
            Rect::new(from.x - half, a, width, b - a)
        };
        out.push((rect, color));
    };
    if !dashed {
        push(start, end.max(start + width));
        return;
    }
    let mut at = start;
    while at < end {
        push(at, (at + DASH).min(end));
        at += DASH + GAP;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub row_band: Color,
    pub row_band_alt: Color,
    pub root_row: Color,
    pub gutter: Color,
    pub gutter_text: Color,
    pub gutter_active: Color,
    pub grid_line: Color,
    pub beat_line: Color,
    pub snap_line: Color,
    pub note: Color,
    pub note_selected: Color,
    pub badge_text: Color,
    pub ghost: Color,
    pub group_preview: Color,
    pub marquee: Color,
    pub rolling: Color,
    pub stretch: Color,
    pub razor: Color,
    pub handle: Color,
    pub playhead: Color,
    pub indicator: Color,
    pub handle_size: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::rgb(0x0f161c),
            row_band: Color::rgb(0x141b22),
            row_band_alt: Color::rgb(0x161e26),
            root_row: Color::rgb(0x1c2530),
            gutter: Color::rgb(0x1a1f2b),
            gutter_text: Color::rgb(0x93a1ad),
            gutter_active: Color::rgb(0x2b3a4a),
            grid_line: Color::rgb(0x222b35),
            beat_line: Color::rgb(0x3a4555),
            snap_line: Color::rgb(0x2e3845),
            note: Color::rgb(0x6fb27f),
            note_selected: Color::rgb(0xe6eef5),
            badge_text: Color::rgb(0x0f161c),
            ghost: Color::rgba(0x7fa0c0, 0.45),
            group_preview: Color::rgb(0x6ca1ff),
            marquee: Color::rgba(0x6ca1ff, 0.18),
            rolling: Color::rgb(0xd28b5f),
            stretch: Color::rgb(0xc9a8ff),
            razor: Color::rgb(0xff6b6b),
            handle: Color::rgb(0xe6eef5),
            playhead: Color::rgb(0xf2d16b),
            indicator: Color::rgb(0xf2d16b),
            handle_size: 10.0,
        }
    }
}

struct Frame<'a> {
    snapshot: &'a EditorSnapshot,
    theme: &'a Theme,
    layout: &'a GridLayout,
    content: Rect,
    out: DisplayList,
}

impl Frame<'_> {
    fn clip(&self, rect: Rect) -> Option<Rect> {
        let x = rect.x.max(self.content.x);
        let y = rect.y.max(self.content.y);
        let right = rect.right().min(self.content.right());
        let bottom = rect.bottom().min(self.content.bottom());
        (right > x && bottom > y).then(|| Rect::new(x, y, right - x, bottom - y))
    }

    fn note_rect(&self, cell: CellRef, duration: f32) -> Option<Rect> {
        self.clip(
            self.layout
                .note_rect(cell.row, cell.column as f32, duration)
                .inset(1.0),
        )
    }

    fn row_color(&self, row: usize) -> Option<Color> {
        self.snapshot
            .rows
            .get(row)
            .and_then(|config: &RowConfig| config.color)
            .map(|rgb| Color::rgb(rgb.hex()))
    }

    fn note_color(&self, cell: CellRef, note: &Note) -> Color {
        note.color
            .map(|rgb| Color::rgb(rgb.hex()))
            .or_else(|| self.row_color(cell.row))
            .unwrap_or(self.theme.note)
    }

    fn badge(&mut self, rect: Rect, shift: i32) {
        if shift == 0 {
            return;
        }
        let text = format!("{shift:+}");
        let origin = Point::new(rect.x + 2.0, rect.y + 1.0);
        self.out.text(origin, text, self.theme.badge_text, BADGE_SIZE);
    }

    fn moves(&mut self, moves: &[NoteMove], color: Color) {
        for mv in moves {
            if let Some(rect) = self.note_rect(mv.to, mv.note.duration as f32) {
                self.out.fill(rect, color);
            }
        }
    }
}

/// Builds the display list for one frame. `now_ms` only drives animation.
pub fn render_frame(snapshot: &EditorSnapshot, theme: &Theme, now_ms: u64) -> DisplayList {
    let layout = &snapshot.layout;
    let content = Rect::new(
        layout.gutter_width,
        0.0,
        (layout.width - layout.gutter_width).max(0.0),
        layout.height,
    );
    let mut frame = Frame {
        snapshot,
        theme,
        layout,
        content,
        out: DisplayList::default(),
    };

    paint_rows(&mut frame);
    paint_grid_lines(&mut frame);
    paint_notes(&mut frame);
    paint_gesture(&mut frame);
    paint_transform_overlay(&mut frame);
    paint_playhead(&mut frame, now_ms);
    frame.out
}

fn visible_rows(layout: &GridLayout, rows: usize) -> std::ops::Range<usize> {
    if rows == 0 {
        return 0..0;
    }
    let first = (layout.scroll_y / layout.row_height).floor().max(0.0) as usize;
    let last = ((layout.scroll_y + layout.height) / layout.row_height).ceil() as usize;
    first.min(rows)..last.min(rows)
}

fn paint_rows(frame: &mut Frame<'_>) {
    let layout = frame.layout;
    let theme = frame.theme;
    let grid = &frame.snapshot.grid;
    frame
        .out
        .fill(Rect::new(0.0, 0.0, layout.width, layout.height), theme.background);
    let strummed = match &frame.snapshot.interaction {
        InteractionState::Strumming(s) => Some(s.row),
        _ => None,
    };
    frame.out.fill(
        Rect::new(0.0, 0.0, layout.gutter_width, layout.height),
        theme.gutter,
    );
    for row in visible_rows(layout, grid.row_count()) {
        let config = frame.snapshot.rows.get(row);
        let y = layout.row_y(row as f32);
        let band = if config.is_some_and(|c| c.is_root) {
            theme.root_row
        } else if row % 2 == 0 {
            theme.row_band
        } else {
            theme.row_band_alt
        };
        if let Some(rect) = frame.clip(Rect::new(layout.gutter_width, y, layout.width, layout.row_height)) {
            frame.out.fill(rect, band);
        }
        let gutter = Rect::new(0.0, y, layout.gutter_width, layout.row_height);
        if strummed == Some(row) {
            frame.out.fill(gutter, theme.gutter_active);
        }
        if let Some(color) = frame.row_color(row) {
            frame.out.fill(
                Rect::new(layout.gutter_width - 5.0, y + 1.0, 3.0, layout.row_height - 2.0),
                color,
            );
        }
        if let Some(config) = config {
            let origin = Point::new(6.0, y + (layout.row_height - LABEL_SIZE) * 0.5);
            frame
                .out
                .text(origin, config.label.clone(), theme.gutter_text, LABEL_SIZE);
        }
    }
}

fn paint_grid_lines(frame: &mut Frame<'_>) {
    let layout = frame.layout;
    let theme = frame.theme;
    let grid = &frame.snapshot.grid;
    let snap = frame.snapshot.snap;
    let bottom = layout.row_y(grid.row_count() as f32).min(layout.height);
    let top = layout.row_y(0.0).max(0.0);
    for column in 0..=grid.steps() {
        let x = layout.column_x(column as f32);
        if x < layout.gutter_width || x > layout.width {
            continue;
        }
        let (color, width, dashed) = if column % 4 == 0 {
            (theme.beat_line, 1.5, false)
        } else if snap.steps() > 1 && snap.is_boundary(column) {
            (theme.snap_line, 1.0, true)
        } else {
            (theme.grid_line, 1.0, false)
        };
        frame
            .out
            .line(Point::new(x, top), Point::new(x, bottom), color, width, dashed);
    }
    let right = layout.column_x(grid.steps() as f32).min(layout.width);
    for row in visible_rows(layout, grid.row_count()) {
        let y = layout.row_y(row as f32 + 1.0);
        frame.out.line(
            Point::new(layout.gutter_width, y),
            Point::new(right, y),
            theme.grid_line,
            1.0,
            false,
        );
    }
}

fn paint_notes(frame: &mut Frame<'_>) {
    let snapshot = frame.snapshot;
    let hidden = snapshot.interaction.hidden_cells();
    let selected = snapshot
        .displayed_selection()
        .into_iter()
        .map(|(cell, _)| cell)
        .collect::<Vec<_>>();
    for (cell, note) in snapshot.grid.notes() {
        if hidden.contains(&cell) {
            continue;
        }
        let Some(rect) = frame.note_rect(cell, note.duration as f32) else {
            continue;
        };
        let color = frame.note_color(cell, note);
        frame.out.fill(rect, color);
        if selected.contains(&cell) {
            frame
                .out
                .stroke(rect, frame.theme.note_selected, 2.0, false);
        }
        frame.badge(rect, note.octave_shift as i32);
    }
}

fn paint_gesture(frame: &mut Frame<'_>) {
    let snapshot = frame.snapshot;
    let theme = frame.theme;
    let grid = &snapshot.grid;
    match &snapshot.interaction {
        InteractionState::Idle | InteractionState::Strumming(_) => {}
        InteractionState::Drawing(s) => {
            if let Some(rect) = frame.note_rect(s.cell, s.duration as f32) {
                frame.out.fill(rect, theme.ghost);
                frame.badge(rect, s.octave_shift as i32);
            }
        }
        InteractionState::Moving(s) => {
            if let Some(rect) = frame.note_rect(s.target, s.note.duration as f32) {
                frame.out.fill(rect, theme.ghost);
                frame.badge(rect, s.octave_shift as i32);
            }
        }
        InteractionState::ResizingLeft(s) | InteractionState::ResizingRight(s) => {
            let cell = CellRef::new(s.cell.row, s.column);
            if let Some(rect) = frame.note_rect(cell, s.duration as f32) {
                frame.out.fill(rect, theme.ghost);
            }
        }
        InteractionState::MovingGroup(s) => {
            let moves = s.targets(grid);
            frame.moves(&moves, theme.group_preview);
            let anchor = moves.iter().find(|mv| mv.from == s.anchor);
            if let Some(rect) = anchor.and_then(|mv| frame.note_rect(mv.to, mv.note.duration as f32)) {
                frame.badge(rect, s.octave_delta);
            }
        }
        InteractionState::ResizingLeftGroup(s) => {
            frame.moves(&s.targets(HandleSide::Left, grid), theme.group_preview);
        }
        InteractionState::ResizingRightGroup(s) => {
            frame.moves(&s.targets(HandleSide::Right, grid), theme.group_preview);
        }
        InteractionState::Stretching(s) => {
            for member in &s.members {
                let (column, duration) = s.provisional(member);
                let rect = frame.layout.note_rect(member.cell.row, column, duration);
                if let Some(rect) = frame.clip(rect) {
                    frame.out.stroke(rect, theme.stretch, 1.0, true);
                }
            }
            frame.moves(&s.targets(snapshot.snap, grid), theme.stretch.with_alpha(0.8));
        }
        InteractionState::RollingEdit(s) => {
            for mv in s.targets() {
                if let Some(rect) = frame.note_rect(mv.to, mv.note.duration as f32) {
                    let color = frame.note_color(mv.from, &mv.note);
                    frame.out.fill(rect, color);
                    frame.out.stroke(rect, theme.rolling, 2.0, false);
                }
            }
        }
        InteractionState::Selecting(s) => {
            let rect = s.rect();
            frame.out.fill(rect, theme.marquee);
            frame
                .out
                .stroke(rect, theme.marquee.with_alpha(1.0), 1.0, true);
        }
        InteractionState::Painting(s) => {
            for cell in &s.cells {
                if let Some(rect) = frame.note_rect(*cell, 1.0) {
                    frame.out.fill(rect, theme.ghost);
                }
            }
        }
        InteractionState::Razor(s) => match &s.target {
            RazorTarget::Split { cell, at, .. } => {
                let x = frame.layout.column_x(*at as f32);
                let y = frame.layout.row_y(cell.row as f32);
                frame.out.line(
                    Point::new(x, y),
                    Point::new(x, y + frame.layout.row_height),
                    theme.razor,
                    2.0,
                    false,
                );
            }
            RazorTarget::Merge { row, left, right } => {
                for column in [*left, *right] {
                    let cell = CellRef::new(*row, column);
                    let duration = grid.note_at(cell).map(|note| note.duration);
                    if let Some(rect) = duration.and_then(|d| frame.note_rect(cell, d as f32)) {
                        frame.out.stroke(rect, theme.razor, 2.0, false);
                    }
                }
            }
        },
    }
}

fn paint_transform_overlay(frame: &mut Frame<'_>) {
    let snapshot = frame.snapshot;
    if matches!(&snapshot.interaction, InteractionState::Selecting(s) if !s.additive) {
        return;
    }
    let Some(bounds) = SelectionBounds::of(&snapshot.grid, &snapshot.selection) else {
        return;
    };
    if bounds.count < 2 {
        return;
    }
    let theme = frame.theme;
    let rect = bounds.rect(frame.layout);
    frame.out.stroke(rect, theme.handle.with_alpha(0.6), 1.0, true);
    let size = theme.handle_size;
    for side in [HandleSide::Left, HandleSide::Right] {
        let center = bounds.handle_point(side, frame.layout);
        frame.out.fill(
            Rect::new(center.x - size * 0.5, center.y - size * 0.5, size, size),
            theme.handle,
        );
    }
}

/// Pulse frequency for an off-screen playhead `distance` steps away from
/// re-entering a view of a `steps`-long pattern.
pub fn indicator_frequency(distance: f32, steps: usize) -> f32 {
    let closeness = 1.0 - (distance / steps.max(1) as f32).clamp(0.0, 1.0);
    MIN_PULSE_HZ + (MAX_PULSE_HZ - MIN_PULSE_HZ) * closeness
}

fn paint_playhead(frame: &mut Frame<'_>, now_ms: u64) {
    let snapshot = frame.snapshot;
    let layout = frame.layout;
    let playback = snapshot.playback;
    let steps = snapshot.grid.steps();
    let x = layout.column_x(playback.position);
    let bottom = layout.row_y(snapshot.grid.row_count() as f32).min(layout.height);
    if x >= layout.gutter_width && x <= layout.width {
        frame.out.line(
            Point::new(x, 0.0),
            Point::new(x, bottom),
            frame.theme.playhead,
            2.0,
            false,
        );
        return;
    }
    if !playback.playing || steps == 0 {
        return;
    }
    // Forward playback always re-enters the view from its left edge.
    let (visible_start, _) = layout.visible_columns();
    let distance = if playback.position < visible_start {
        visible_start - playback.position
    } else {
        steps as f32 - playback.position + visible_start
    };
    let hz = indicator_frequency(distance, steps);
    let t = now_ms as f32 / 1000.0;
    let alpha = 0.35 + 0.65 * (0.5 + 0.5 * (TAU * hz * t).sin());
    frame.out.fill(
        Rect::new(layout.gutter_width, 0.0, INDICATOR_WIDTH, bottom),
        frame.theme.indicator.with_alpha(alpha),
    );
}
