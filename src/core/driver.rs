//! Platform terminal driver interface
//!
//! The session core never touches the real terminal directly. Everything it
//! needs (opening, closing, size queries, tty mode bookkeeping and cursor
//! shape) goes through [`TerminalDriver`]. [`HeadlessDriver`] is an
//! in-memory terminal for tests and hosts without a tty; the crossterm
//! implementation lives in `ui::driver`.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("terminal unavailable: {0}")]
    Unavailable(String),

    #[error("terminal reported invalid size {rows}x{cols}")]
    InvalidSize { rows: i32, cols: i32 },

    #[error("programmatic resize is not supported")]
    ResizeUnsupported,
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Cursor shape
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorShape {
    /// Default (terminal dependent)
    #[default]
    Default,
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    /// Blinking bar (|)
    BlinkingBar,
    /// Steady bar (|)
    SteadyBar,
}

/// Narrow interface to the platform terminal.
pub trait TerminalDriver {
    /// Acquire the terminal and put it in program mode.
    fn open(&mut self, args: &[String]) -> Result<()>;

    /// Re-acquire the terminal after [`close`](Self::close), restoring the
    /// mode saved by [`save_program_mode`](Self::save_program_mode).
    fn reopen(&mut self) -> Result<()>;

    /// Release the terminal. Best effort.
    fn close(&mut self) -> Result<()>;

    /// Physical rows. Anything below 1 is a driver fault.
    fn rows(&self) -> i32;

    /// Physical columns. Anything below 1 is a driver fault.
    fn columns(&self) -> i32;

    /// Ask the platform to change the terminal size. The platform may grant
    /// a different size than requested.
    fn resize_physical(&mut self, rows: u16, cols: u16) -> Result<()>;

    /// Remember the tty mode the shell had.
    fn save_shell_mode(&mut self);

    /// Remember the tty mode the program is using.
    fn save_program_mode(&mut self);

    fn cursor_mode(&self) -> CursorShape;

    fn set_cursor_mode(&mut self, shape: CursorShape) -> Result<()>;

    /// Platform name, e.g. "linux"
    fn sysname(&self) -> String;
}

/// A recorded driver interaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverCall {
    Open,
    Reopen,
    Close,
    ResizePhysical(u16, u16),
    SaveShellMode,
    SaveProgramMode,
    SetCursorMode(CursorShape),
}

/// In-memory terminal
///
/// The reported size can be changed at any time with
/// [`set_size`](Self::set_size) to simulate a user resizing the window.
#[derive(Debug, Clone)]
pub struct HeadlessDriver {
    rows: i32,
    cols: i32,
    open: bool,
    resizable: bool,
    fail_open: bool,
    size_limit: Option<(u16, u16)>,
    cursor: CursorShape,
    calls: Vec<DriverCall>,
}

impl HeadlessDriver {
    pub fn new(rows: i32, cols: i32) -> Self {
        Self {
            rows,
            cols,
            open: false,
            resizable: true,
            fail_open: false,
            size_limit: None,
            cursor: CursorShape::Default,
            calls: Vec::new(),
        }
    }

    pub fn set_size(&mut self, rows: i32, cols: i32) {
        self.rows = rows;
        self.cols = cols;
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        self.resizable = resizable;
    }

    /// Make every subsequent open/reopen fail
    pub fn set_fail_open(&mut self, fail: bool) {
        self.fail_open = fail;
    }

    /// Largest size a programmatic resize will grant
    pub fn set_size_limit(&mut self, rows: u16, cols: u16) {
        self.size_limit = Some((rows, cols));
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    fn acquire(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(DriverError::Unavailable("headless terminal refused".into()));
        }
        self.open = true;
        Ok(())
    }
}

impl TerminalDriver for HeadlessDriver {
    fn open(&mut self, _args: &[String]) -> Result<()> {
        self.calls.push(DriverCall::Open);
        self.acquire()
    }

    fn reopen(&mut self) -> Result<()> {
        self.calls.push(DriverCall::Reopen);
        self.acquire()
    }

    fn close(&mut self) -> Result<()> {
        self.calls.push(DriverCall::Close);
        self.open = false;
        Ok(())
    }

    fn rows(&self) -> i32 {
        self.rows
    }

    fn columns(&self) -> i32 {
        self.cols
    }

    fn resize_physical(&mut self, rows: u16, cols: u16) -> Result<()> {
        self.calls.push(DriverCall::ResizePhysical(rows, cols));
        if !self.resizable {
            return Err(DriverError::ResizeUnsupported);
        }
        let (rows, cols) = match self.size_limit {
            Some((max_rows, max_cols)) => (rows.min(max_rows), cols.min(max_cols)),
            None => (rows, cols),
        };
        self.rows = rows.into();
        self.cols = cols.into();
        Ok(())
    }

    fn save_shell_mode(&mut self) {
        self.calls.push(DriverCall::SaveShellMode);
    }

    fn save_program_mode(&mut self) {
        self.calls.push(DriverCall::SaveProgramMode);
    }

    fn cursor_mode(&self) -> CursorShape {
        self.cursor
    }

    fn set_cursor_mode(&mut self, shape: CursorShape) -> Result<()> {
        self.calls.push(DriverCall::SetCursorMode(shape));
        self.cursor = shape;
        Ok(())
    }

    fn sysname(&self) -> String {
        "headless".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_open_close() {
        let mut driver = HeadlessDriver::new(24, 80);
        driver.open(&[]).unwrap();
        assert!(driver.is_open());

        driver.close().unwrap();
        assert!(!driver.is_open());
        assert_eq!(driver.calls(), &[DriverCall::Open, DriverCall::Close]);
    }

    #[test]
    fn test_headless_resize_respects_limit() {
        let mut driver = HeadlessDriver::new(24, 80);
        driver.set_size_limit(40, 120);

        driver.resize_physical(50, 100).unwrap();
        assert_eq!((driver.rows(), driver.columns()), (40, 100));
    }

    #[test]
    fn test_headless_resize_unsupported() {
        let mut driver = HeadlessDriver::new(24, 80);
        driver.set_resizable(false);

        assert!(matches!(
            driver.resize_physical(30, 100),
            Err(DriverError::ResizeUnsupported)
        ));
        assert_eq!((driver.rows(), driver.columns()), (24, 80));
    }
}
