//! Terminal output.
//!
//! - **driver**: [`TerminalDriver`](crate::core::driver::TerminalDriver) for
//!   the real terminal, built on crossterm
//! - **painter**: writes dirty window lines to the terminal

pub mod driver;
pub mod painter;

pub use driver::CrosstermDriver;
pub use painter::paint;
