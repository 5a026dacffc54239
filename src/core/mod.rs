//! Core session and screen-buffer components.
//!
//! - **driver**: platform terminal interface and an in-memory implementation
//! - **window**: window buffers and the engine that owns them
//! - **layout**: reserved-region allocation
//! - **slk**: soft label keys
//! - **session**: per-session state
//! - **screen**: the lifecycle controller tying everything together
//!
//! # Architecture
//!
//! ```text
//! Screen
//! ├── TerminalDriver (open/close, size, tty modes)
//! ├── WindowEngine
//! │   ├── physical / snapshot / display
//! │   ├── ripped-off lines
//! │   └── soft-label strip
//! └── Session (geometry, modes, window set)
//! ```

pub mod driver;
pub mod layout;
pub mod screen;
pub mod session;
pub mod slk;
pub mod window;
