//! Platform terminal driver using crossterm

use std::io::{self, Write};

use crossterm::{
    cursor::{SetCursorStyle, Show},
    execute,
    style::{Attribute, ResetColor, SetAttribute},
    terminal::{
        self, DisableLineWrap, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen, SetSize,
    },
};
use tracing::{debug, warn};

use crate::core::driver::{CursorShape, DriverError, Result, TerminalDriver};

/// Terminal settings the driver switches between
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TtyMode {
    raw: bool,
}

impl TtyMode {
    fn current() -> Self {
        Self {
            raw: terminal::is_raw_mode_enabled().unwrap_or(false),
        }
    }

    fn apply(self) -> io::Result<()> {
        if self.raw {
            terminal::enable_raw_mode()
        } else {
            terminal::disable_raw_mode()
        }
    }
}

/// The controlling terminal, driven through crossterm
pub struct CrosstermDriver {
    alternate_screen: bool,
    open: bool,
    cursor: CursorShape,
    /// Mode found when the terminal was last opened
    entry_mode: TtyMode,
    /// Mode restored on close
    shell_mode: TtyMode,
    /// Mode re-entered on reopen
    program_mode: TtyMode,
}

impl CrosstermDriver {
    pub fn new(alternate_screen: bool) -> Self {
        Self {
            alternate_screen,
            open: false,
            cursor: CursorShape::Default,
            entry_mode: TtyMode { raw: false },
            shell_mode: TtyMode { raw: false },
            program_mode: TtyMode { raw: true },
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn enter(&mut self) -> Result<()> {
        self.program_mode.apply()?;

        let mut stdout = io::stdout();
        if self.alternate_screen {
            execute!(stdout, EnterAlternateScreen)?;
        }
        execute!(stdout, DisableLineWrap)?;
        stdout.flush()?;
        self.open = true;
        Ok(())
    }
}

impl TerminalDriver for CrosstermDriver {
    fn open(&mut self, args: &[String]) -> Result<()> {
        debug!(?args, alternate_screen = self.alternate_screen, "opening terminal");
        if self.open {
            return Err(DriverError::Unavailable("terminal already open".into()));
        }
        self.entry_mode = TtyMode::current();
        self.enter()
    }

    fn reopen(&mut self) -> Result<()> {
        debug!("reopening terminal");
        if self.open {
            return Ok(());
        }
        self.enter()
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        let mut stdout = io::stdout();
        let _ = execute!(stdout, ResetColor, SetAttribute(Attribute::Reset));
        let _ = execute!(stdout, Show);
        let _ = execute!(stdout, EnableLineWrap);
        if self.alternate_screen {
            let _ = execute!(stdout, LeaveAlternateScreen);
        }
        let _ = stdout.flush();

        // Leaving raw mode matters most; report only this failure
        self.shell_mode.apply()?;
        Ok(())
    }

    fn rows(&self) -> i32 {
        match terminal::size() {
            Ok((_, rows)) => i32::from(rows),
            Err(e) => {
                warn!("failed to query terminal size: {}", e);
                0
            }
        }
    }

    fn columns(&self) -> i32 {
        match terminal::size() {
            Ok((cols, _)) => i32::from(cols),
            Err(e) => {
                warn!("failed to query terminal size: {}", e);
                0
            }
        }
    }

    fn resize_physical(&mut self, rows: u16, cols: u16) -> Result<()> {
        execute!(io::stdout(), SetSize(cols, rows)).map_err(|e| {
            debug!("SetSize failed: {}", e);
            DriverError::ResizeUnsupported
        })
    }

    fn save_shell_mode(&mut self) {
        self.shell_mode = self.entry_mode;
    }

    fn save_program_mode(&mut self) {
        if self.open {
            self.program_mode = TtyMode::current();
        }
    }

    fn cursor_mode(&self) -> CursorShape {
        self.cursor
    }

    fn set_cursor_mode(&mut self, shape: CursorShape) -> Result<()> {
        execute!(io::stdout(), cursor_style(shape))?;
        self.cursor = shape;
        Ok(())
    }

    fn sysname(&self) -> String {
        std::env::consts::OS.to_string()
    }
}

impl Drop for CrosstermDriver {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn cursor_style(shape: CursorShape) -> SetCursorStyle {
    match shape {
        CursorShape::Default => SetCursorStyle::DefaultUserShape,
        CursorShape::BlinkingBlock => SetCursorStyle::BlinkingBlock,
        CursorShape::SteadyBlock => SetCursorStyle::SteadyBlock,
        CursorShape::BlinkingUnderline => SetCursorStyle::BlinkingUnderScore,
        CursorShape::SteadyUnderline => SetCursorStyle::SteadyUnderScore,
        CursorShape::BlinkingBar => SetCursorStyle::BlinkingBar,
        CursorShape::SteadyBar => SetCursorStyle::SteadyBar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_style_mapping() {
        assert!(matches!(
            cursor_style(CursorShape::Default),
            SetCursorStyle::DefaultUserShape
        ));
        assert!(matches!(
            cursor_style(CursorShape::SteadyUnderline),
            SetCursorStyle::SteadyUnderScore
        ));
        assert!(matches!(cursor_style(CursorShape::BlinkingBar), SetCursorStyle::BlinkingBar));
    }

    #[test]
    fn test_new_driver_is_closed() {
        let mut driver = CrosstermDriver::new(true);
        assert!(!driver.is_open());
        assert_eq!(driver.cursor_mode(), CursorShape::Default);
        assert_eq!(driver.sysname(), std::env::consts::OS);

        // Nothing to release yet
        driver.close().unwrap();
        driver.save_program_mode();
        assert_eq!(driver.program_mode, TtyMode { raw: true });
    }
}
