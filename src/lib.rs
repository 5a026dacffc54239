//! termscreen - terminal session and screen-buffer lifecycle management
//!
//! A [`Screen`] owns one terminal UI session at a time. It opens the
//! terminal, lays out ripped-off lines and the soft-label strip, and keeps
//! the window buffers backing the screen in step with the terminal size
//! across suspend, resume and resize.
//!
//! # Quick Start
//!
//! ```no_run
//! use termscreen::{CrosstermDriver, Screen};
//!
//! let mut screen = Screen::with_driver(CrosstermDriver::new(true));
//! let session = screen.create(&[])?;
//! println!("{}x{} usable", session.usable_rows(), session.usable_cols());
//! screen.destroy();
//! # Ok::<(), termscreen::ScreenError>(())
//! ```

pub mod config;
pub mod core;
pub mod ui;

pub use crate::config::ScreenConfig;
pub use crate::core::driver::{CursorShape, DriverError, HeadlessDriver, TerminalDriver};
pub use crate::core::layout::{allocate, Layout, Side, SlkPlacement};
pub use crate::core::screen::{Screen, ScreenError, MAX_RIPPED_LINES};
pub use crate::core::session::{InputModes, LifecycleState, Session, WindowSet};
pub use crate::core::slk::{Justify, SoftLabels};
pub use crate::core::window::{BufferEngine, WindowEngine, WindowId};
pub use crate::ui::CrosstermDriver;

/// Library name and version, e.g. `termscreen 0.1.0`
pub fn version() -> &'static str {
    concat!("termscreen ", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(version().starts_with("termscreen "));
        assert!(version().ends_with(env!("CARGO_PKG_VERSION")));
    }
}
