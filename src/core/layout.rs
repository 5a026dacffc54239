//! Reserved-region allocation
//!
//! Works out which rows go to ripped-off lines and the soft-label strip, and
//! which rows remain for the display window. Pure: the caller passes the
//! registrations in and gets a [`Layout`] back.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Edge of the terminal a reserved region is attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("usable area {rows}x{cols} is smaller than 2x2")]
    TooSmall { rows: u16, cols: u16 },
}

/// Where the soft-label strip goes and how tall it is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlkPlacement {
    pub rows: u16,
    pub anchor: Side,
}

impl SlkPlacement {
    pub fn disabled() -> Self {
        Self {
            rows: 0,
            anchor: Side::Bottom,
        }
    }
}

/// Row assigned to one ripped-off line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservedLine {
    pub side: Side,
    pub row: u16,
}

/// Result of an allocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub terminal_rows: u16,
    pub terminal_cols: u16,
    pub usable_rows: u16,
    pub usable_cols: u16,
    /// First row of the display window
    pub display_top: u16,
    /// One entry per registration, in registration order
    pub reserved: Vec<ReservedLine>,
    pub top_count: u16,
    pub bottom_count: u16,
    pub slk: SlkPlacement,
    /// First row of the soft-label strip, if there is one
    pub slk_top: Option<u16>,
}

impl Layout {
    /// Sides of the reserved lines, in registration order
    pub fn sides(&self) -> Vec<Side> {
        self.reserved.iter().map(|line| line.side).collect()
    }

    /// Rows spanned by the display window
    pub fn display_rows(&self) -> std::ops::Range<u16> {
        self.display_top..self.display_top + self.usable_rows
    }

    /// Every terminal row is accounted for exactly once
    pub fn is_consistent(&self) -> bool {
        self.terminal_rows == self.usable_rows + self.top_count + self.bottom_count + self.slk.rows
    }
}

/// Lay out a `terminal_rows` x `terminal_cols` screen.
///
/// Registrations are handled in order. Top lines stack downward from row 0;
/// bottom lines stack upward from the lowest free row. A bottom-anchored
/// soft-label strip takes the last rows of the terminal, so bottom lines sit
/// above it; a top-anchored strip sits right below the top lines.
pub fn allocate(
    terminal_rows: u16,
    terminal_cols: u16,
    registrations: &[Side],
    slk: SlkPlacement,
) -> Result<Layout, LayoutError> {
    let top_count = registrations.iter().filter(|s| **s == Side::Top).count() as u32;
    let bottom_count = registrations.len() as u32 - top_count;
    let claimed = top_count + bottom_count + u32::from(slk.rows);
    let usable_rows = u32::from(terminal_rows).saturating_sub(claimed);

    if usable_rows < 2 || terminal_cols < 2 {
        return Err(LayoutError::TooSmall {
            rows: usable_rows as u16,
            cols: terminal_cols,
        });
    }

    let bottom_edge = match slk.anchor {
        Side::Bottom => terminal_rows - slk.rows,
        Side::Top => terminal_rows,
    };
    let mut next_top = 0u16;
    let mut next_bottom = bottom_edge;

    let reserved = registrations
        .iter()
        .map(|&side| {
            let row = match side {
                Side::Top => {
                    next_top += 1;
                    next_top - 1
                }
                Side::Bottom => {
                    next_bottom -= 1;
                    next_bottom
                }
            };
            ReservedLine { side, row }
        })
        .collect();

    let (slk_top, display_top) = match (slk.rows, slk.anchor) {
        (0, _) => (None, next_top),
        (_, Side::Bottom) => (Some(bottom_edge), next_top),
        (rows, Side::Top) => (Some(next_top), next_top + rows),
    };

    Ok(Layout {
        terminal_rows,
        terminal_cols,
        usable_rows: usable_rows as u16,
        usable_cols: terminal_cols,
        display_top,
        reserved,
        top_count: top_count as u16,
        bottom_count: bottom_count as u16,
        slk,
        slk_top,
    })
}
