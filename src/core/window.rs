//! Window buffers
//!
//! Rectangular character buffers with per-line damage tracking. The session
//! code only talks to the [`WindowEngine`] trait; [`BufferEngine`] is the
//! in-memory implementation used by default.

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;
use thiserror::Error;
use unicode_width::UnicodeWidthChar;

/// Handle to a window owned by an engine
pub type WindowId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("invalid window size {rows}x{cols}")]
    InvalidSize { rows: u16, cols: u16 },

    #[error("unknown window {0}")]
    UnknownWindow(WindowId),

    #[error("out of buffer memory: {requested} cells requested, {available} available")]
    OutOfMemory { requested: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, WindowError>;

/// Position and size of a window, in terminal cells
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub y: u16,
    pub x: u16,
    pub rows: u16,
    pub cols: u16,
}

impl Rect {
    /// Last row covered by this rectangle (inclusive)
    pub fn bottom(&self) -> u16 {
        self.y + self.rows.saturating_sub(1)
    }
}

/// Operations the session lifecycle needs from a window buffer engine.
pub trait WindowEngine {
    /// Create a `rows` x `cols` window with its origin at (`y`, `x`).
    fn create_window(&mut self, rows: u16, cols: u16, y: u16, x: u16) -> Result<WindowId>;

    /// Resize a window in place, keeping its origin.
    fn resize_window(&mut self, id: WindowId, rows: u16, cols: u16) -> Result<()>;

    /// Move a window's origin.
    fn move_window(&mut self, id: WindowId, y: u16, x: u16) -> Result<()>;

    /// Blank every cell with the window's current attributes.
    fn erase(&mut self, id: WindowId) -> Result<()>;

    /// Blank from the cursor to the end of the window.
    fn clear_to_bottom(&mut self, id: WindowId) -> Result<()>;

    /// Set the attributes used for subsequent writes and erases.
    fn set_attrs(&mut self, id: WindowId, attrs: CellAttrs) -> Result<()>;

    /// Write text at (`y`, `x`) without wrapping.
    fn put_str(&mut self, id: WindowId, y: u16, x: u16, text: &str) -> Result<()>;

    /// Flag every line as needing redraw.
    fn mark_dirty(&mut self, id: WindowId) -> Result<()>;

    /// Forget all pending damage.
    fn mark_clean(&mut self, id: WindowId) -> Result<()>;

    /// Request (or cancel) a full clear before the next redraw.
    fn set_clear(&mut self, id: WindowId, clear: bool) -> Result<()>;

    /// Release a window.
    fn destroy_window(&mut self, id: WindowId) -> Result<()>;

    /// Current geometry, if the window exists.
    fn geometry(&self, id: WindowId) -> Option<Rect>;
}

/// In-memory window engine
///
/// An optional cell budget caps the total number of cells across all live
/// windows; exceeding it makes creation and resizing fail the way an
/// allocator would.
#[derive(Default)]
pub struct BufferEngine {
    windows: HashMap<WindowId, Window>,
    next_id: WindowId,
    cell_budget: Option<usize>,
}

impl BufferEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that refuses to hold more than `cells` cells in total
    pub fn with_cell_budget(cells: usize) -> Self {
        Self {
            cell_budget: Some(cells),
            ..Self::default()
        }
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    /// Number of live windows
    pub fn live_windows(&self) -> usize {
        self.windows.len()
    }

    fn cells_in_use(&self) -> usize {
        self.windows.values().map(Window::cell_count).sum()
    }

    /// Check that replacing `releasing` cells with `requested` stays in budget
    fn reserve(&self, requested: usize, releasing: usize) -> Result<()> {
        if let Some(budget) = self.cell_budget {
            let available = budget.saturating_sub(self.cells_in_use() - releasing);
            if requested > available {
                return Err(WindowError::OutOfMemory { requested, available });
            }
        }
        Ok(())
    }

    fn get_mut(&mut self, id: WindowId) -> Result<&mut Window> {
        self.windows.get_mut(&id).ok_or(WindowError::UnknownWindow(id))
    }
}

impl WindowEngine for BufferEngine {
    fn create_window(&mut self, rows: u16, cols: u16, y: u16, x: u16) -> Result<WindowId> {
        if rows == 0 || cols == 0 {
            return Err(WindowError::InvalidSize { rows, cols });
        }
        self.reserve(rows as usize * cols as usize, 0)?;

        let id = self.next_id;
        self.next_id += 1;
        self.windows.insert(id, Window::new(rows, cols, y, x));
        Ok(id)
    }

    fn resize_window(&mut self, id: WindowId, rows: u16, cols: u16) -> Result<()> {
        if rows == 0 || cols == 0 {
            return Err(WindowError::InvalidSize { rows, cols });
        }
        let current = self
            .windows
            .get(&id)
            .ok_or(WindowError::UnknownWindow(id))?
            .cell_count();
        self.reserve(rows as usize * cols as usize, current)?;
        self.get_mut(id)?.resize(rows, cols);
        Ok(())
    }

    fn move_window(&mut self, id: WindowId, y: u16, x: u16) -> Result<()> {
        let window = self.get_mut(id)?;
        if (window.begy, window.begx) != (y, x) {
            window.begy = y;
            window.begx = x;
            window.mark_all_dirty();
        }
        Ok(())
    }

    fn erase(&mut self, id: WindowId) -> Result<()> {
        self.get_mut(id)?.erase();
        Ok(())
    }

    fn clear_to_bottom(&mut self, id: WindowId) -> Result<()> {
        self.get_mut(id)?.clear_to_bottom();
        Ok(())
    }

    fn set_attrs(&mut self, id: WindowId, attrs: CellAttrs) -> Result<()> {
        self.get_mut(id)?.attrs = attrs;
        Ok(())
    }

    fn put_str(&mut self, id: WindowId, y: u16, x: u16, text: &str) -> Result<()> {
        self.get_mut(id)?.put_str(y, x, text);
        Ok(())
    }

    fn mark_dirty(&mut self, id: WindowId) -> Result<()> {
        self.get_mut(id)?.mark_all_dirty();
        Ok(())
    }

    fn mark_clean(&mut self, id: WindowId) -> Result<()> {
        self.get_mut(id)?.clear_dirty();
        Ok(())
    }

    fn set_clear(&mut self, id: WindowId, clear: bool) -> Result<()> {
        self.get_mut(id)?.clear = clear;
        Ok(())
    }

    fn destroy_window(&mut self, id: WindowId) -> Result<()> {
        self.windows
            .remove(&id)
            .map(|_| ())
            .ok_or(WindowError::UnknownWindow(id))
    }

    fn geometry(&self, id: WindowId) -> Option<Rect> {
        self.windows.get(&id).map(Window::rect)
    }
}

/// A window buffer
pub struct Window {
    /// Origin row on the terminal
    pub begy: u16,
    /// Origin column on the terminal
    pub begx: u16,
    pub cols: u16,
    pub lines: Vec<Row>,
    /// Attributes applied to writes and erases
    pub attrs: CellAttrs,
    pub cury: u16,
    pub curx: u16,
    pub dirty_lines: HashSet<usize>,
    pub full_redraw: bool,
    /// Clear the whole terminal before the next redraw
    pub clear: bool,
}

impl Window {
    pub fn new(rows: u16, cols: u16, begy: u16, begx: u16) -> Self {
        Self {
            begy,
            begx,
            cols,
            lines: (0..rows).map(|_| Row::new(cols)).collect(),
            attrs: CellAttrs::default(),
            cury: 0,
            curx: 0,
            dirty_lines: HashSet::new(),
            full_redraw: true,
            clear: false,
        }
    }

    pub fn rows(&self) -> u16 {
        self.lines.len() as u16
    }

    pub fn rect(&self) -> Rect {
        Rect {
            y: self.begy,
            x: self.begx,
            rows: self.rows(),
            cols: self.cols,
        }
    }

    fn cell_count(&self) -> usize {
        self.lines.len() * self.cols as usize
    }

    pub fn resize(&mut self, new_rows: u16, new_cols: u16) {
        while self.lines.len() < new_rows as usize {
            self.lines.push(Row::new(new_cols));
        }
        self.lines.truncate(new_rows as usize);

        for row in &mut self.lines {
            row.resize(new_cols);
        }
        self.cols = new_cols;

        self.cury = self.cury.min(new_rows.saturating_sub(1));
        self.curx = self.curx.min(new_cols.saturating_sub(1));
        self.mark_all_dirty();
    }

    pub fn erase(&mut self) {
        let attrs = self.attrs.clone();
        for row in &mut self.lines {
            row.clear(&attrs);
        }
        self.cury = 0;
        self.curx = 0;
        self.mark_all_dirty();
    }

    /// Blank the rest of the cursor line and every line below it
    pub fn clear_to_bottom(&mut self) {
        let attrs = self.attrs.clone();
        let (y, x) = (self.cury as usize, self.curx as usize);
        for (idx, row) in self.lines.iter_mut().enumerate().skip(y) {
            let from = if idx == y { x } else { 0 };
            for cell in row.cells.iter_mut().skip(from) {
                cell.clear(&attrs);
            }
            self.dirty_lines.insert(idx);
        }
    }

    pub fn put_str(&mut self, y: u16, x: u16, text: &str) {
        let Some(row) = self.lines.get_mut(y as usize) else {
            return;
        };
        let cols = self.cols as usize;
        let mut col = x as usize;

        for ch in text.chars() {
            let width = ch.width().unwrap_or(0);
            if width == 0 {
                continue;
            }
            if col + width > cols {
                break;
            }
            row.cells[col] = Cell {
                grapheme: ch.to_string(),
                width: width as u8,
                attrs: self.attrs.clone(),
            };
            if width == 2 {
                row.cells[col + 1] = Cell::continuation(&self.attrs);
            }
            col += width;
        }

        self.cury = y;
        self.curx = col.min(cols.saturating_sub(1)) as u16;
        self.dirty_lines.insert(y as usize);
    }

    /// Text of a line with trailing blanks removed
    pub fn line_text(&self, y: u16) -> String {
        let Some(row) = self.lines.get(y as usize) else {
            return String::new();
        };
        let text: String = row
            .cells
            .iter()
            .filter(|cell| !cell.is_continuation())
            .map(Cell::display_char)
            .collect();
        text.trim_end().to_string()
    }

    pub fn cell(&self, y: u16, x: u16) -> Option<&Cell> {
        self.lines.get(y as usize)?.cells.get(x as usize)
    }

    pub fn is_line_dirty(&self, line: usize) -> bool {
        self.full_redraw || self.dirty_lines.contains(&line)
    }

    /// True when any line is waiting to be redrawn
    pub fn is_touched(&self) -> bool {
        self.full_redraw || !self.dirty_lines.is_empty()
    }

    pub fn mark_all_dirty(&mut self) {
        self.full_redraw = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty_lines.clear();
        self.full_redraw = false;
    }
}

/// A single row
#[derive(Clone)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cols: u16) -> Self {
        Self {
            cells: vec![Cell::default(); cols as usize],
        }
    }

    pub fn resize(&mut self, new_cols: u16) {
        self.cells.resize(new_cols as usize, Cell::default());
    }

    pub fn clear(&mut self, attrs: &CellAttrs) {
        for cell in &mut self.cells {
            cell.clear(attrs);
        }
    }
}

/// A single cell
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub grapheme: String,
    pub width: u8,
    pub attrs: CellAttrs,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            grapheme: String::new(),
            width: 1,
            attrs: CellAttrs::default(),
        }
    }
}

impl Cell {
    pub fn clear(&mut self, attrs: &CellAttrs) {
        self.grapheme.clear();
        self.width = 1;
        self.attrs = attrs.clone();
    }

    pub fn continuation(attrs: &CellAttrs) -> Self {
        Self {
            grapheme: String::new(),
            width: 0,
            attrs: attrs.clone(),
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    /// Get the display character (space if empty)
    pub fn display_char(&self) -> &str {
        if self.grapheme.is_empty() {
            " "
        } else {
            &self.grapheme
        }
    }
}

/// Cell attributes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellAttrs {
    pub fg: Color,
    pub bg: Color,
    pub flags: AttrFlags,
}

impl CellAttrs {
    /// Attribute no real write ever produces. A buffer erased with it
    /// differs from every rendered cell, forcing a full redraw.
    pub fn sentinel() -> Self {
        Self {
            fg: Color::Indexed(u8::MAX),
            bg: Color::Indexed(u8::MAX),
            flags: AttrFlags::all(),
        }
    }

    pub fn with_flags(flags: AttrFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }
}

/// Color definition
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Convert to crossterm color
    pub fn to_crossterm(self) -> crossterm::style::Color {
        match self {
            Color::Default => crossterm::style::Color::Reset,
            Color::Indexed(n) => crossterm::style::Color::AnsiValue(n),
            Color::Rgb(r, g, b) => crossterm::style::Color::Rgb { r, g, b },
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct AttrFlags: u16 {
        const BOLD          = 0b0000_0000_0001;
        const DIM           = 0b0000_0000_0010;
        const ITALIC        = 0b0000_0000_0100;
        const UNDERLINE     = 0b0000_0000_1000;
        const BLINK         = 0b0000_0001_0000;
        const INVERSE       = 0b0000_0010_0000;
        const HIDDEN        = 0b0000_0100_0000;
        const STRIKETHROUGH = 0b0000_1000_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_geometry() {
        let mut engine = BufferEngine::new();
        let id = engine.create_window(21, 80, 2, 0).unwrap();

        assert_eq!(
            engine.geometry(id),
            Some(Rect { y: 2, x: 0, rows: 21, cols: 80 })
        );
        assert_eq!(engine.geometry(id).unwrap().bottom(), 22);
        assert!(engine.window(id).unwrap().is_touched());
    }

    #[test]
    fn test_zero_sized_window_rejected() {
        let mut engine = BufferEngine::new();
        assert_eq!(
            engine.create_window(0, 80, 0, 0),
            Err(WindowError::InvalidSize { rows: 0, cols: 80 })
        );
    }

    #[test]
    fn test_cell_budget() {
        let mut engine = BufferEngine::with_cell_budget(100);
        let a = engine.create_window(5, 10, 0, 0).unwrap();
        let _b = engine.create_window(5, 10, 5, 0).unwrap();

        assert!(matches!(
            engine.create_window(1, 1, 0, 0),
            Err(WindowError::OutOfMemory { requested: 1, available: 0 })
        ));

        // Shrinking frees room, growing back past the budget fails
        engine.resize_window(a, 2, 10).unwrap();
        assert!(engine.create_window(3, 10, 0, 0).is_ok());
        assert!(engine.resize_window(a, 5, 10).is_err());
    }

    #[test]
    fn test_put_str_and_line_text() {
        let mut engine = BufferEngine::new();
        let id = engine.create_window(2, 10, 0, 0).unwrap();
        engine.mark_clean(id).unwrap();

        engine.put_str(id, 1, 2, "hello world").unwrap();
        let window = engine.window(id).unwrap();

        assert_eq!(window.line_text(1), "  hello wo");
        assert!(window.is_line_dirty(1));
        assert!(!window.is_line_dirty(0));
    }

    #[test]
    fn test_put_str_wide_chars() {
        let mut window = Window::new(1, 5, 0, 0);
        window.put_str(0, 0, "日本語");

        // Third wide char does not fit in the remaining column
        assert_eq!(window.line_text(0), "日本");
        assert!(window.cell(0, 1).unwrap().is_continuation());
    }

    #[test]
    fn test_erase_uses_window_attrs() {
        let mut engine = BufferEngine::new();
        let id = engine.create_window(3, 4, 0, 0).unwrap();
        engine.put_str(id, 0, 0, "abcd").unwrap();

        engine.set_attrs(id, CellAttrs::sentinel()).unwrap();
        engine.erase(id).unwrap();

        let window = engine.window(id).unwrap();
        assert_eq!(window.line_text(0), "");
        assert!(window
            .lines
            .iter()
            .flat_map(|row| row.cells.iter())
            .all(|cell| cell.attrs == CellAttrs::sentinel()));
    }

    #[test]
    fn test_clear_to_bottom_from_cursor() {
        let mut window = Window::new(3, 4, 0, 0);
        window.put_str(0, 0, "abcd");
        window.put_str(1, 0, "ef");
        window.put_str(2, 0, "ghij");

        window.cury = 1;
        window.curx = 1;
        window.clear_to_bottom();

        assert_eq!(window.line_text(0), "abcd");
        assert_eq!(window.line_text(1), "e");
        assert_eq!(window.line_text(2), "");
    }

    #[test]
    fn test_resize_clamps_cursor_and_marks_dirty() {
        let mut engine = BufferEngine::new();
        let id = engine.create_window(10, 10, 0, 0).unwrap();
        engine.put_str(id, 9, 0, "xyz").unwrap();
        engine.mark_clean(id).unwrap();

        engine.resize_window(id, 4, 2).unwrap();
        let window = engine.window(id).unwrap();

        assert_eq!((window.rows(), window.cols), (4, 2));
        assert_eq!((window.cury, window.curx), (3, 1));
        assert!(window.full_redraw);
    }

    #[test]
    fn test_destroy_unknown_window() {
        let mut engine = BufferEngine::new();
        let id = engine.create_window(1, 1, 0, 0).unwrap();

        engine.destroy_window(id).unwrap();
        assert_eq!(engine.destroy_window(id), Err(WindowError::UnknownWindow(id)));
        assert_eq!(engine.live_windows(), 0);
    }
}
