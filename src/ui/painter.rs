//! Paints session windows onto a terminal
//!
//! Only dirty lines are written. A pending clear on the physical window
//! wipes the terminal first and repaints every visible window.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::{Attribute, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use crate::core::session::WindowSet;
use crate::core::window::{AttrFlags, BufferEngine, CellAttrs, Window};

/// Write every pending change in `windows` to `out`
pub fn paint<W: Write>(out: &mut W, engine: &mut BufferEngine, windows: &WindowSet) -> io::Result<()> {
    queue!(out, Hide)?;

    let full = engine.window(windows.physical).is_some_and(|w| w.clear);
    if full {
        queue!(out, Clear(ClearType::All))?;
    }

    for id in windows.visible() {
        let Some(window) = engine.window_mut(id) else {
            continue;
        };
        if full {
            window.mark_all_dirty();
        }
        paint_window(out, window)?;
        window.clear_dirty();
    }

    if let Some(physical) = engine.window_mut(windows.physical) {
        physical.clear = false;
        physical.clear_dirty();
    }

    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
    if let Some(display) = engine.window(windows.display) {
        queue!(out, MoveTo(display.begx + display.curx, display.begy + display.cury), Show)?;
    }
    out.flush()
}

fn paint_window<W: Write>(out: &mut W, window: &Window) -> io::Result<()> {
    let mut line_buffer = String::with_capacity(256);

    for (y, row) in window.lines.iter().enumerate() {
        if !window.is_line_dirty(y) {
            continue;
        }
        queue!(out, MoveTo(window.begx, window.begy + y as u16))?;
        line_buffer.clear();
        let mut current_attrs: Option<&CellAttrs> = None;

        for cell in row.cells.iter().filter(|cell| !cell.is_continuation()) {
            if current_attrs != Some(&cell.attrs) {
                if let Some(attrs) = current_attrs {
                    apply_attrs(out, attrs)?;
                    write!(out, "{}", line_buffer)?;
                    line_buffer.clear();
                }
                current_attrs = Some(&cell.attrs);
            }
            line_buffer.push_str(cell.display_char());
        }

        if let Some(attrs) = current_attrs {
            apply_attrs(out, attrs)?;
            write!(out, "{}", line_buffer)?;
        }
    }
    Ok(())
}

fn apply_attrs<W: Write>(out: &mut W, attrs: &CellAttrs) -> io::Result<()> {
    queue!(out, SetAttribute(Attribute::Reset))?;

    const STYLES: [(AttrFlags, Attribute); 8] = [
        (AttrFlags::BOLD, Attribute::Bold),
        (AttrFlags::DIM, Attribute::Dim),
        (AttrFlags::ITALIC, Attribute::Italic),
        (AttrFlags::UNDERLINE, Attribute::Underlined),
        (AttrFlags::BLINK, Attribute::SlowBlink),
        (AttrFlags::INVERSE, Attribute::Reverse),
        (AttrFlags::HIDDEN, Attribute::Hidden),
        (AttrFlags::STRIKETHROUGH, Attribute::CrossedOut),
    ];
    for (flag, attribute) in STYLES {
        if attrs.flags.contains(flag) {
            queue!(out, SetAttribute(attribute))?;
        }
    }

    let fg = attrs.fg.to_crossterm();
    if fg != crossterm::style::Color::Reset {
        queue!(out, SetForegroundColor(fg))?;
    }
    let bg = attrs.bg.to_crossterm();
    if bg != crossterm::style::Color::Reset {
        queue!(out, SetBackgroundColor(bg))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::WindowEngine;

    fn windows(engine: &mut BufferEngine) -> WindowSet {
        let physical = engine.create_window(4, 20, 0, 0).unwrap();
        let snapshot = engine.create_window(4, 20, 0, 0).unwrap();
        let display = engine.create_window(4, 20, 0, 0).unwrap();
        WindowSet {
            display,
            physical,
            snapshot,
            reserved: Vec::new(),
            slk: None,
        }
    }

    fn painted(engine: &mut BufferEngine, windows: &WindowSet) -> String {
        let mut out = Vec::new();
        paint(&mut out, engine, windows).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_paint_writes_dirty_text_once() {
        let mut engine = BufferEngine::new();
        let windows = windows(&mut engine);
        engine.put_str(windows.display, 1, 2, "hello").unwrap();

        let first = painted(&mut engine, &windows);
        assert!(first.contains("hello"));
        assert!(!engine.window(windows.display).unwrap().is_touched());

        let second = painted(&mut engine, &windows);
        assert!(!second.contains("hello"));
    }

    #[test]
    fn test_pending_clear_repaints_everything() {
        let mut engine = BufferEngine::new();
        let windows = windows(&mut engine);
        engine.put_str(windows.display, 0, 0, "kept").unwrap();
        painted(&mut engine, &windows);

        engine.set_clear(windows.physical, true).unwrap();
        let out = painted(&mut engine, &windows);

        assert!(out.contains("\x1b[2J"));
        assert!(out.contains("kept"));
        assert!(!engine.window(windows.physical).unwrap().clear);
    }

    #[test]
    fn test_inverse_attribute_emitted() {
        let mut engine = BufferEngine::new();
        let windows = windows(&mut engine);
        engine
            .set_attrs(windows.display, CellAttrs::with_flags(AttrFlags::INVERSE))
            .unwrap();
        engine.put_str(windows.display, 0, 0, "slk").unwrap();

        let out = painted(&mut engine, &windows);
        assert!(out.contains("\x1b[7m"));
    }
}
