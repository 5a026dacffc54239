//! Soft label keys
//!
//! A strip of labels describing the function keys, reserved at the top or
//! bottom of the terminal. The strip's height depends on the label format
//! picked with [`SoftLabels::slk_init`].

use thiserror::Error;
use unicode_width::UnicodeWidthChar;

use super::window::{AttrFlags, CellAttrs, WindowEngine, WindowError, WindowId};

/// Longest label text, in display columns
pub const MAX_LABEL_WIDTH: usize = 8;

/// Widest slot a single label may occupy
const MAX_SLOT_WIDTH: u16 = 31;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlkError {
    #[error("unknown soft label format {0}")]
    UnknownFormat(u8),

    #[error("label {index} out of range (1..={count})")]
    NoSuchLabel { index: usize, count: usize },

    #[error("soft labels are not initialized")]
    NotInitialized,
}

/// Label arrangement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlkFormat {
    /// 3-2-3, eight labels
    ThreeTwoThree,
    /// 4-4, eight labels
    FourFour,
    /// 4-4-4, twelve labels
    FourFourFour,
    /// 4-4-4 with a line of key names above the labels
    FourFourFourIndexed,
    /// 5-5, ten labels
    FiveFive,
}

impl SlkFormat {
    pub fn from_code(code: u8) -> Result<Self, SlkError> {
        match code {
            0 => Ok(Self::ThreeTwoThree),
            1 => Ok(Self::FourFour),
            2 => Ok(Self::FourFourFour),
            3 => Ok(Self::FourFourFourIndexed),
            55 => Ok(Self::FiveFive),
            other => Err(SlkError::UnknownFormat(other)),
        }
    }

    /// Labels per group, left to right
    fn groups(self) -> &'static [u16] {
        match self {
            Self::ThreeTwoThree => &[3, 2, 3],
            Self::FourFour => &[4, 4],
            Self::FourFourFour | Self::FourFourFourIndexed => &[4, 4, 4],
            Self::FiveFive => &[5, 5],
        }
    }

    pub fn label_count(self) -> usize {
        self.groups().iter().map(|&n| n as usize).sum()
    }

    pub fn line_count(self) -> u16 {
        match self {
            Self::FourFourFourIndexed => 2,
            _ => 1,
        }
    }
}

/// Label text alignment within its slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Justify {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Debug, Default)]
struct Label {
    text: String,
    justify: Justify,
    start_col: u16,
}

/// Soft label key state for one session
#[derive(Debug, Default)]
pub struct SoftLabels {
    format: Option<SlkFormat>,
    labels: Vec<Label>,
    label_width: u16,
    window: Option<WindowId>,
}

impl SoftLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a label format. Existing label text is discarded.
    pub fn slk_init(&mut self, code: u8) -> Result<(), SlkError> {
        let format = SlkFormat::from_code(code)?;
        self.format = Some(format);
        self.labels = vec![Label::default(); format.label_count()];
        self.label_width = 0;
        Ok(())
    }

    /// Drop the labels. Returns the strip's window so the caller can
    /// destroy it.
    pub fn slk_free(&mut self) -> Option<WindowId> {
        self.format = None;
        self.labels.clear();
        self.label_width = 0;
        self.window.take()
    }

    /// Rows the strip needs; 0 when not initialized
    pub fn slk_line_count(&self) -> u16 {
        self.format.map_or(0, SlkFormat::line_count)
    }

    pub fn is_initialized(&self) -> bool {
        self.format.is_some()
    }

    pub fn format(&self) -> Option<SlkFormat> {
        self.format
    }

    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    pub(crate) fn attach(&mut self, window: WindowId) {
        self.window = Some(window);
    }

    /// Set label `index` (1-based). Control characters are dropped and the
    /// text is cut to [`MAX_LABEL_WIDTH`] display columns.
    pub fn set_label(&mut self, index: usize, text: &str, justify: Justify) -> Result<(), SlkError> {
        if self.format.is_none() {
            return Err(SlkError::NotInitialized);
        }
        let count = self.labels.len();
        let label = index
            .checked_sub(1)
            .and_then(|i| self.labels.get_mut(i))
            .ok_or(SlkError::NoSuchLabel { index, count })?;

        let printable: String = text.chars().filter(|ch| !ch.is_control()).collect();
        label.text = truncate_to_width(printable.trim(), MAX_LABEL_WIDTH);
        label.justify = justify;
        Ok(())
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        let i = index.checked_sub(1)?;
        self.labels.get(i).map(|l| l.text.as_str())
    }

    /// Starting column of every label, in label order
    pub fn label_columns(&self) -> Vec<u16> {
        self.labels.iter().map(|l| l.start_col).collect()
    }

    /// Columns available to each label's text
    pub fn label_width(&self) -> u16 {
        self.label_width
    }

    /// Spread the labels over `cols` columns: the first group hugs the left
    /// edge, the last group the right edge, and a middle group is centered.
    pub fn layout(&mut self, cols: u16) {
        let Some(format) = self.format else {
            return;
        };
        let slot = (cols / format.label_count() as u16).min(MAX_SLOT_WIDTH);
        let groups = format.groups();
        let last = groups.len() - 1;

        let mut index = 0;
        for (g, &len) in groups.iter().enumerate() {
            let span = slot * len;
            let start = if g == 0 {
                0
            } else if g == last {
                cols.saturating_sub(span)
            } else {
                cols.saturating_sub(span) / 2
            };
            for i in 0..len {
                self.labels[index].start_col = start + i * slot;
                index += 1;
            }
        }

        // One column between neighbouring labels
        self.label_width = slot.saturating_sub(1).min(MAX_LABEL_WIDTH as u16);
    }

    /// Paint the strip into its window
    pub fn draw<E: WindowEngine>(&self, engine: &mut E) -> Result<(), WindowError> {
        let (Some(format), Some(window)) = (self.format, self.window) else {
            return Ok(());
        };
        let label_line = format.line_count() - 1;
        let width = self.label_width as usize;

        engine.set_attrs(window, CellAttrs::with_flags(AttrFlags::INVERSE))?;
        engine.erase(window)?;
        if width == 0 {
            return Ok(());
        }

        for (i, label) in self.labels.iter().enumerate() {
            if label_line > 0 {
                let name = truncate_to_width(&format!("F{}", i + 1), width);
                engine.put_str(window, 0, label.start_col, &name)?;
            }
            let text = justify_text(&label.text, width, label.justify);
            engine.put_str(window, label_line, label.start_col, &text)?;
        }
        Ok(())
    }
}

/// Columns `text` takes in a cell grid; characters without a width take none
fn text_width(text: &str) -> usize {
    text.chars().map(|ch| ch.width().unwrap_or(0)).sum()
}

fn truncate_to_width(text: &str, max: usize) -> String {
    let mut width = 0;
    text.chars()
        .take_while(|ch| {
            width += ch.width().unwrap_or(0);
            width <= max
        })
        .collect()
}

fn justify_text(text: &str, width: usize, justify: Justify) -> String {
    let text = truncate_to_width(text, width);
    let pad = width.saturating_sub(text_width(&text));
    let left = match justify {
        Justify::Left => 0,
        Justify::Center => pad / 2,
        Justify::Right => pad,
    };
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::BufferEngine;

    #[test]
    fn test_formats() {
        assert_eq!(SlkFormat::from_code(0).unwrap().label_count(), 8);
        assert_eq!(SlkFormat::from_code(2).unwrap().label_count(), 12);
        assert_eq!(SlkFormat::from_code(55).unwrap().label_count(), 10);
        assert_eq!(SlkFormat::from_code(3).unwrap().line_count(), 2);
        assert_eq!(SlkFormat::from_code(7), Err(SlkError::UnknownFormat(7)));
    }

    #[test]
    fn test_line_count_follows_init_and_free() {
        let mut slk = SoftLabels::new();
        assert_eq!(slk.slk_line_count(), 0);

        slk.slk_init(3).unwrap();
        assert_eq!(slk.slk_line_count(), 2);

        slk.attach(7);
        assert_eq!(slk.slk_free(), Some(7));
        assert_eq!(slk.slk_line_count(), 0);
        assert!(!slk.is_initialized());
    }

    #[test]
    fn test_set_label() {
        let mut slk = SoftLabels::new();
        assert_eq!(
            slk.set_label(1, "Help", Justify::Left),
            Err(SlkError::NotInitialized)
        );

        slk.slk_init(1).unwrap();
        slk.set_label(1, "  Help  ", Justify::Left).unwrap();
        slk.set_label(8, "Much too long", Justify::Right).unwrap();

        assert_eq!(slk.label(1), Some("Help"));
        assert_eq!(slk.label(8), Some("Much too"));
        assert_eq!(
            slk.set_label(0, "x", Justify::Left),
            Err(SlkError::NoSuchLabel { index: 0, count: 8 })
        );
        assert_eq!(
            slk.set_label(9, "x", Justify::Left),
            Err(SlkError::NoSuchLabel { index: 9, count: 8 })
        );
    }

    #[test]
    fn test_layout_four_four() {
        let mut slk = SoftLabels::new();
        slk.slk_init(1).unwrap();
        slk.layout(80);

        assert_eq!(slk.label_columns(), vec![0, 10, 20, 30, 40, 50, 60, 70]);
        assert_eq!(slk.label_width(), 8);
    }

    #[test]
    fn test_layout_three_two_three() {
        let mut slk = SoftLabels::new();
        slk.slk_init(0).unwrap();
        slk.layout(80);

        assert_eq!(slk.label_columns(), vec![0, 10, 20, 30, 40, 50, 60, 70]);

        slk.layout(100);
        // slot 12: left group 0..36, centered pair at 38, right group from 64
        assert_eq!(slk.label_columns(), vec![0, 12, 24, 38, 50, 64, 76, 88]);
    }

    #[test]
    fn test_draw_indexed() {
        let mut engine = BufferEngine::new();
        let window = engine.create_window(2, 100, 22, 0).unwrap();

        let mut slk = SoftLabels::new();
        slk.slk_init(3).unwrap();
        slk.attach(window);
        slk.layout(100);
        slk.set_label(1, "Quit", Justify::Right).unwrap();
        slk.draw(&mut engine).unwrap();

        let win = engine.window(window).unwrap();
        assert_eq!(slk.label_width(), 7);
        assert!(win.line_text(0).starts_with("F1      F2"));
        assert!(win.line_text(1).starts_with("   Quit"));
        assert!(win.cell(1, 0).unwrap().attrs.flags.contains(AttrFlags::INVERSE));
    }

    #[test]
    fn test_control_characters_dropped() {
        let mut slk = SoftLabels::new();
        slk.slk_init(1).unwrap();
        slk.set_label(1, "a\u{1}\u{1}\u{1}\u{1}\u{1}\u{1}\u{1}\u{1}b", Justify::Left)
            .unwrap();

        assert_eq!(slk.label(1), Some("ab"));
    }

    #[test]
    fn test_justify_zero_width_text() {
        // Zero-width characters never make the padding negative
        assert_eq!(justify_text("a\u{1}\u{1}b", 3, Justify::Right), " a\u{1}\u{1}b");
        assert_eq!(justify_text("\u{200b}\u{200b}", 1, Justify::Left), "\u{200b}\u{200b} ");
    }

    #[test]
    fn test_justify() {
        assert_eq!(justify_text("ab", 6, Justify::Left), "ab    ");
        assert_eq!(justify_text("ab", 6, Justify::Center), "  ab  ");
        assert_eq!(justify_text("ab", 6, Justify::Right), "    ab");
        assert_eq!(justify_text("abcdefgh", 4, Justify::Center), "abcd");
    }
}
