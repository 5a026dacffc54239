//! Session state
//!
//! The record describing one terminal UI session: its geometry, its mode
//! flags and the windows backing the screen. Only [`Screen`] creates and
//! mutates sessions; everything here is read through accessors.
//!
//! [`Screen`]: super::screen::Screen

use bitflags::bitflags;

use super::driver::CursorShape;
use super::layout::{Layout, Side};
use super::window::WindowId;

/// Where a context is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// No session has been created yet
    Uncreated,
    Alive,
    /// Terminal released, buffers kept
    Suspended,
    Destroyed,
}

bitflags! {
    /// Input/output translation modes
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InputModes: u8 {
        const AUTO_CR              = 0b0000_0001;
        const RAW_INPUT            = 0b0000_0010;
        const RAW_OUTPUT           = 0b0000_0100;
        const CBREAK               = 0b0000_1000;
        const ECHO                 = 0b0001_0000;
        const SAVE_KEY_MODIFIERS   = 0b0010_0000;
        const RETURN_KEY_MODIFIERS = 0b0100_0000;
    }
}

impl Default for InputModes {
    fn default() -> Self {
        Self::AUTO_CR | Self::CBREAK | Self::ECHO
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ButtonState {
    #[default]
    Released,
    Pressed,
}

/// Last known mouse position and button states
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MouseStatus {
    /// -1 until the first mouse event
    pub x: i32,
    pub y: i32,
    pub buttons: [ButtonState; 3],
    pub changes: u32,
}

impl Default for MouseStatus {
    fn default() -> Self {
        Self {
            x: -1,
            y: -1,
            buttons: [ButtonState::Released; 3],
            changes: 0,
        }
    }
}

/// One ripped-off line's window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservedWindow {
    pub side: Side,
    pub window: WindowId,
}

/// Windows owned by a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowSet {
    /// Main content area
    pub display: WindowId,
    /// What is on the terminal right now
    pub physical: WindowId,
    /// Last fully rendered frame
    pub snapshot: WindowId,
    /// Ripped-off lines, in registration order
    pub reserved: Vec<ReservedWindow>,
    pub slk: Option<WindowId>,
}

impl WindowSet {
    /// Windows an application draws into, in paint order: reserved lines,
    /// the display, then the soft-label strip
    pub fn visible(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.reserved
            .iter()
            .map(|r| r.window)
            .chain(std::iter::once(self.display))
            .chain(self.slk)
    }

    pub fn count(&self) -> usize {
        3 + self.reserved.len() + usize::from(self.slk.is_some())
    }
}

/// A terminal UI session
#[derive(Debug)]
pub struct Session {
    pub(crate) alive: bool,
    /// False once a resize failed part way through
    pub(crate) consistent: bool,
    pub(crate) layout: Layout,
    pub(crate) windows: WindowSet,
    pub(crate) modes: InputModes,
    /// Cursor visibility: 0 hidden, 1 normal, 2 very visible
    pub(crate) visibility: u8,
    pub(crate) delay_tenths: u32,
    pub(crate) line_color: Option<i16>,
    pub(crate) preserve_existing_content: bool,
    pub(crate) resized_pending: bool,
    pub(crate) original_cursor_mode: CursorShape,
    pub(crate) description: String,
    pub(crate) mouse: MouseStatus,
}

impl Session {
    pub(crate) fn new(
        layout: Layout,
        windows: WindowSet,
        preserve_existing_content: bool,
        original_cursor_mode: CursorShape,
        description: String,
    ) -> Self {
        Self {
            alive: false,
            consistent: true,
            layout,
            windows,
            modes: InputModes::default(),
            visibility: 1,
            delay_tenths: 0,
            line_color: None,
            preserve_existing_content,
            resized_pending: false,
            original_cursor_mode,
            description,
            mouse: MouseStatus::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// False after a resize failed part way; such a session can only be
    /// destroyed
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    pub fn terminal_rows(&self) -> u16 {
        self.layout.terminal_rows
    }

    pub fn terminal_cols(&self) -> u16 {
        self.layout.terminal_cols
    }

    pub fn usable_rows(&self) -> u16 {
        self.layout.usable_rows
    }

    pub fn usable_cols(&self) -> u16 {
        self.layout.usable_cols
    }

    pub fn reserved_top_count(&self) -> u16 {
        self.layout.top_count
    }

    pub fn reserved_bottom_count(&self) -> u16 {
        self.layout.bottom_count
    }

    pub fn slk_row_count(&self) -> u16 {
        self.layout.slk.rows
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn windows(&self) -> &WindowSet {
        &self.windows
    }

    pub fn modes(&self) -> InputModes {
        self.modes
    }

    /// Replace the mode flags. They survive resizes.
    pub fn set_modes(&mut self, modes: InputModes) {
        self.modes = modes;
    }

    pub fn visibility(&self) -> u8 {
        self.visibility
    }

    pub fn delay_tenths(&self) -> u32 {
        self.delay_tenths
    }

    pub fn line_color(&self) -> Option<i16> {
        self.line_color
    }

    pub fn preserve_existing_content(&self) -> bool {
        self.preserve_existing_content
    }

    pub fn is_resized(&self) -> bool {
        self.resized_pending
    }

    pub fn original_cursor_mode(&self) -> CursorShape {
        self.original_cursor_mode
    }

    /// Terminal description, e.g. `termscreen|termscreen for linux`
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mouse(&self) -> &MouseStatus {
        &self.mouse
    }
}
