//! Session lifecycle controller
//!
//! [`Screen`] is one independent terminal UI context. It owns the platform
//! driver, the window engine, the soft-label state, the queue of ripped-off
//! line registrations and at most one [`Session`]:
//!
//! ```text
//! Uncreated ──create──▶ Alive ──suspend──▶ Suspended
//!                       ▲  │ ◀───resume──────┘
//!               resize ─┘  └──destroy──▶ Destroyed ──create──▶ Alive
//! ```
//!
//! All operations take `&mut self`; callers sharing a context across threads
//! must serialize access themselves.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::driver::{DriverError, TerminalDriver};
use super::layout::{allocate, Layout, LayoutError, Side};
use super::session::{LifecycleState, ReservedWindow, Session, WindowSet};
use super::slk::{Justify, SlkError, SoftLabels};
use super::window::{BufferEngine, CellAttrs, WindowEngine, WindowError, WindowId};
use crate::config::ScreenConfig;

/// Most ripped-off lines that may be queued before a create
pub const MAX_RIPPED_LINES: usize = 5;

#[derive(Error, Debug)]
pub enum ScreenError {
    #[error("unable to open terminal: {0}")]
    PlatformOpen(#[source] DriverError),

    #[error("terminal too small: {rows}x{cols} (need at least 2x2)")]
    TerminalTooSmall { rows: u16, cols: u16 },

    #[error("failed to allocate screen buffer: {0}")]
    BufferAllocation(#[source] WindowError),

    #[error("terminal cannot be resized: {0}")]
    ResizeUnsupported(#[source] DriverError),

    #[error("no active session")]
    NoActiveSession,

    #[error("a session is already active")]
    AlreadyActive,

    #[error("at most {0} lines can be ripped off")]
    TooManyRippedLines(usize),

    #[error("soft label keys: {0}")]
    SoftLabels(#[from] SlkError),
}

impl From<LayoutError> for ScreenError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::TooSmall { rows, cols } => ScreenError::TerminalTooSmall { rows, cols },
        }
    }
}

pub type Result<T> = std::result::Result<T, ScreenError>;

/// Callback run once a ripped-off line's window exists. Receives the
/// engine, the new window and the terminal width.
pub type RipoffInit<E> = Box<dyn FnOnce(&mut E, WindowId, u16)>;

struct Registration<E> {
    side: Side,
    init: RipoffInit<E>,
}

/// A terminal UI context
pub struct Screen<D: TerminalDriver, E: WindowEngine = BufferEngine> {
    driver: D,
    engine: E,
    config: ScreenConfig,
    slk: SoftLabels,
    pending: Vec<Registration<E>>,
    session: Option<Session>,
    state: LifecycleState,
}

impl<D: TerminalDriver> Screen<D, BufferEngine> {
    /// Context with the in-memory engine and default configuration
    pub fn with_driver(driver: D) -> Self {
        Self {
            driver,
            engine: BufferEngine::new(),
            config: ScreenConfig::default(),
            slk: SoftLabels::new(),
            pending: Vec::new(),
            session: None,
            state: LifecycleState::Uncreated,
        }
    }
}

impl<D: TerminalDriver, E: WindowEngine> Screen<D, E> {
    /// Build a context. Fails if the configured soft-label format is unknown.
    pub fn new(driver: D, engine: E, config: ScreenConfig) -> Result<Self> {
        let mut slk = SoftLabels::new();
        if config.slk.enabled {
            slk.slk_init(config.slk.format)?;
        }
        Ok(Self {
            driver,
            engine,
            config,
            slk,
            pending: Vec::new(),
            session: None,
            state: LifecycleState::Uncreated,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn soft_labels(&self) -> &SoftLabels {
        &self.slk
    }

    /// Set soft label `index` (1-based). A live strip is redrawn.
    pub fn set_label(&mut self, index: usize, text: &str, justify: Justify) -> Result<()> {
        self.slk.set_label(index, text, justify)?;
        if self.session.is_some() {
            self.slk
                .draw(&mut self.engine)
                .map_err(ScreenError::BufferAllocation)?;
        }
        Ok(())
    }

    /// Pick a soft-label format for the next create
    pub fn slk_init(&mut self, format: u8) -> Result<()> {
        if self.session.is_some() {
            return Err(ScreenError::AlreadyActive);
        }
        self.slk.slk_init(format)?;
        Ok(())
    }

    /// Queue a ripped-off line for the next create
    pub fn rip_off_line<F>(&mut self, side: Side, init: F) -> Result<()>
    where
        F: FnOnce(&mut E, WindowId, u16) + 'static,
    {
        if self.pending.len() >= MAX_RIPPED_LINES {
            return Err(ScreenError::TooManyRippedLines(MAX_RIPPED_LINES));
        }
        self.pending.push(Registration {
            side,
            init: Box::new(init),
        });
        Ok(())
    }

    pub fn pending_registrations(&self) -> usize {
        self.pending.len()
    }

    /// Start a session on the platform terminal.
    pub fn create(&mut self, args: &[String]) -> Result<&Session> {
        debug!("create() called");
        match self.state {
            LifecycleState::Alive => return Err(ScreenError::AlreadyActive),
            LifecycleState::Suspended => self.destroy(),
            LifecycleState::Uncreated | LifecycleState::Destroyed => {}
        }

        self.driver.open(args).map_err(ScreenError::PlatformOpen)?;

        let (layout, windows) = match self.build() {
            Ok(built) => built,
            Err(err) => {
                self.release_terminal();
                self.state = LifecycleState::Uncreated;
                warn!("create failed: {}", err);
                return Err(err);
            }
        };

        let cols = layout.terminal_cols;
        for (registration, reserved) in self.pending.drain(..).zip(&windows.reserved) {
            (registration.init)(&mut self.engine, reserved.window, cols);
        }

        let original_cursor_mode = self.driver.cursor_mode();
        if let Some(shape) = self.config.cursor {
            if let Err(e) = self.driver.set_cursor_mode(shape) {
                warn!("failed to set cursor shape: {}", e);
            }
        }
        self.driver.save_shell_mode();

        let description = format!("termscreen|termscreen for {}", self.driver.sysname());
        let mut session = Session::new(
            layout,
            windows,
            self.config.preserve_screen,
            original_cursor_mode,
            description,
        );
        session.alive = true;
        self.state = LifecycleState::Alive;

        info!(
            rows = session.terminal_rows(),
            cols = session.terminal_cols(),
            usable_rows = session.usable_rows(),
            reserved = session.windows.reserved.len(),
            slk_rows = session.slk_row_count(),
            "session created"
        );
        Ok(&*self.session.insert(session))
    }

    /// Lay out the screen and materialize its windows. Nothing built here
    /// survives a failure.
    fn build(&mut self) -> Result<(Layout, WindowSet)> {
        let (rows, cols) = Self::read_size(&self.driver)?;
        let sides: Vec<Side> = self.pending.iter().map(|r| r.side).collect();
        let placement = self.config.slk_placement(self.slk.slk_line_count());
        let layout = allocate(rows, cols, &sides, placement)?;

        let mut created = Vec::new();
        match self.materialize(&layout, &mut created) {
            Ok(windows) => Ok((layout, windows)),
            Err(err) => {
                for id in created.into_iter().rev() {
                    let _ = self.engine.destroy_window(id);
                }
                Err(ScreenError::BufferAllocation(err))
            }
        }
    }

    fn materialize(
        &mut self,
        layout: &Layout,
        created: &mut Vec<WindowId>,
    ) -> std::result::Result<WindowSet, WindowError> {
        let engine = &mut self.engine;
        let (rows, cols) = (layout.terminal_rows, layout.terminal_cols);

        let physical = engine.create_window(rows, cols, 0, 0)?;
        created.push(physical);

        let snapshot = engine.create_window(rows, cols, 0, 0)?;
        created.push(snapshot);
        engine.set_attrs(snapshot, CellAttrs::sentinel())?;
        engine.erase(snapshot)?;

        let slk = match layout.slk_top {
            Some(top) => {
                let window = engine.create_window(layout.slk.rows, cols, top, 0)?;
                created.push(window);
                Some(window)
            }
            None => None,
        };

        let mut reserved = Vec::with_capacity(layout.reserved.len());
        for line in &layout.reserved {
            let window = engine.create_window(1, cols, line.row, 0)?;
            created.push(window);
            reserved.push(ReservedWindow {
                side: line.side,
                window,
            });
        }

        let display =
            engine.create_window(layout.usable_rows, layout.usable_cols, layout.display_top, 0)?;
        created.push(display);
        engine.clear_to_bottom(display)?;

        if self.config.preserve_screen {
            engine.mark_clean(physical)?;
            engine.mark_clean(display)?;
            engine.set_clear(physical, false)?;
            engine.set_clear(display, false)?;
        } else {
            engine.set_clear(physical, true)?;
        }

        if let Some(window) = slk {
            self.slk.attach(window);
            self.slk.layout(cols);
            self.slk.draw(engine)?;
        }

        Ok(WindowSet {
            display,
            physical,
            snapshot,
            reserved,
            slk,
        })
    }

    /// Current physical size, validated
    fn read_size(driver: &D) -> Result<(u16, u16)> {
        let (rows, cols) = (driver.rows(), driver.columns());
        if rows <= 0 || cols <= 0 {
            return Err(ScreenError::PlatformOpen(DriverError::InvalidSize { rows, cols }));
        }
        let (Ok(rows), Ok(cols)) = (u16::try_from(rows), u16::try_from(cols)) else {
            return Err(ScreenError::PlatformOpen(DriverError::InvalidSize { rows, cols }));
        };
        if rows < 2 || cols < 2 {
            return Err(ScreenError::TerminalTooSmall { rows, cols });
        }
        Ok((rows, cols))
    }

    /// Temporarily leave the UI, keeping every buffer.
    pub fn suspend(&mut self) -> Result<()> {
        debug!("suspend() called");
        if self.state != LifecycleState::Alive {
            return Err(ScreenError::NoActiveSession);
        }
        self.driver.save_program_mode();
        self.release_terminal();
        if let Some(session) = self.session.as_mut() {
            session.alive = false;
        }
        self.state = LifecycleState::Suspended;
        Ok(())
    }

    /// Return to the UI after [`suspend`](Self::suspend).
    pub fn resume(&mut self) -> Result<()> {
        debug!("resume() called");
        match self.state {
            LifecycleState::Alive => return Ok(()),
            LifecycleState::Suspended => {}
            LifecycleState::Uncreated | LifecycleState::Destroyed => {
                return Err(ScreenError::NoActiveSession)
            }
        }
        let session = self.session.as_mut().ok_or(ScreenError::NoActiveSession)?;
        if !session.consistent {
            return Err(ScreenError::NoActiveSession);
        }

        self.driver.reopen().map_err(ScreenError::PlatformOpen)?;

        // The terminal showed something else while we were away
        if let Err(e) = self.engine.set_clear(session.windows.physical, true) {
            warn!("failed to schedule redraw after resume: {}", e);
        }
        session.alive = true;
        self.state = LifecycleState::Alive;
        Ok(())
    }

    /// Adapt the session to a new terminal size.
    ///
    /// With `(0, 0)` the current platform size is re-read, which is how an
    /// out-of-band resize by the user is picked up. Any other request is
    /// passed to the platform first.
    ///
    /// If the size the platform ends up with cannot be laid out, the error
    /// is returned and the session keeps its previous layout while the
    /// terminal may already have changed. The session stays alive with
    /// [`is_resized`](Self::is_resized) set, so a later `resize(0, 0)` can
    /// catch up once the terminal is usable again.
    pub fn resize(&mut self, new_rows: u16, new_cols: u16) -> Result<&Session> {
        debug!(new_rows, new_cols, "resize() called");
        if self.state != LifecycleState::Alive {
            return Err(ScreenError::NoActiveSession);
        }

        if (new_rows, new_cols) != (0, 0) {
            if new_rows < 2 || new_cols < 2 {
                return Err(ScreenError::TerminalTooSmall {
                    rows: new_rows,
                    cols: new_cols,
                });
            }
            self.driver
                .resize_physical(new_rows, new_cols)
                .map_err(ScreenError::ResizeUnsupported)?;
        }

        let session = self.session.as_mut().ok_or(ScreenError::NoActiveSession)?;
        let layout = Self::read_size(&self.driver).and_then(|(rows, cols)| {
            allocate(rows, cols, &session.layout.sides(), session.layout.slk).map_err(Into::into)
        });
        let layout = match layout {
            Ok(layout) => layout,
            Err(err) => {
                session.resized_pending = true;
                warn!("terminal size cannot be laid out, keeping previous layout: {}", err);
                return Err(err);
            }
        };
        let (rows, cols) = (layout.terminal_rows, layout.terminal_cols);

        if let Err(err) = apply_layout(&mut self.engine, &mut self.slk, &session.windows, &layout) {
            // Some buffers may already have their new size
            session.alive = false;
            session.consistent = false;
            self.state = LifecycleState::Suspended;
            warn!("resize to {}x{} failed, session unusable: {}", rows, cols, err);
            return Err(ScreenError::BufferAllocation(err));
        }

        session.layout = layout;
        session.resized_pending = false;
        info!(rows, cols, usable_rows = session.usable_rows(), "session resized");
        Ok(&*session)
    }

    /// Tear the session down. Safe to call without a session.
    pub fn destroy(&mut self) {
        debug!("destroy() called");
        let Some(mut session) = self.session.take() else {
            return;
        };

        self.slk.slk_free();
        let mut doomed: Vec<WindowId> = session.windows.slk.into_iter().collect();
        doomed.extend(session.windows.reserved.iter().map(|r| r.window));
        doomed.extend([
            session.windows.display,
            session.windows.physical,
            session.windows.snapshot,
        ]);
        for id in doomed {
            if let Err(e) = self.engine.destroy_window(id) {
                warn!("failed to destroy window {}: {}", id, e);
            }
        }

        if let Err(e) = self.driver.set_cursor_mode(session.original_cursor_mode) {
            warn!("failed to restore cursor shape: {}", e);
        }
        if session.alive {
            self.release_terminal();
        }
        session.alive = false;

        // Labels are per session; the next create starts from configuration
        if self.config.slk.enabled {
            if let Err(e) = self.slk.slk_init(self.config.slk.format) {
                warn!("failed to reinitialize soft labels: {}", e);
            }
        }

        self.state = LifecycleState::Destroyed;
        info!("session destroyed");
    }

    /// Record that the user resized the terminal behind our back
    pub fn mark_resized(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.resized_pending = true;
        }
    }

    pub fn is_resized(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_resized)
    }

    /// True while a session exists but is not alive
    pub fn is_suspended(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.alive)
    }

    fn release_terminal(&mut self) {
        if let Err(e) = self.driver.close() {
            warn!("failed to close terminal: {}", e);
        }
    }
}

impl<D: TerminalDriver, E: WindowEngine> Drop for Screen<D, E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Resize and reposition every session window for `layout`
fn apply_layout<E: WindowEngine>(
    engine: &mut E,
    slk: &mut SoftLabels,
    windows: &WindowSet,
    layout: &Layout,
) -> std::result::Result<(), WindowError> {
    let (rows, cols) = (layout.terminal_rows, layout.terminal_cols);

    engine.resize_window(windows.physical, rows, cols)?;
    engine.resize_window(windows.display, layout.usable_rows, layout.usable_cols)?;
    engine.move_window(windows.display, layout.display_top, 0)?;
    engine.resize_window(windows.snapshot, rows, cols)?;

    if let (Some(window), Some(top)) = (windows.slk, layout.slk_top) {
        engine.resize_window(window, layout.slk.rows, cols)?;
        engine.move_window(window, top, 0)?;
        slk.layout(cols);
        slk.draw(engine)?;
    }

    for (reserved, line) in windows.reserved.iter().zip(&layout.reserved) {
        engine.resize_window(reserved.window, 1, cols)?;
        engine.move_window(reserved.window, line.row, 0)?;
    }

    engine.erase(windows.snapshot)?;
    engine.set_clear(windows.physical, true)?;
    engine.mark_dirty(windows.physical)?;
    engine.mark_dirty(windows.display)?;
    Ok(())
}
