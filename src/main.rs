//! termscreen demo
//!
//! Opens a session on the current terminal with a ripped-off title line and,
//! when enabled in `~/.termscreen/config.toml`, a soft-label strip.
//!
//! | Key | Action |
//! |-----|--------|
//! | s | Suspend for two seconds, then resume |
//! | q | Quit |

use std::env;
use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use termscreen::core::window::{AttrFlags, CellAttrs};
use termscreen::{
    version, BufferEngine, CrosstermDriver, Justify, Screen, ScreenConfig, ScreenError, Side,
    WindowEngine,
};

type DemoScreen = Screen<CrosstermDriver>;

fn print_help() {
    eprintln!("{} - terminal session lifecycle demo", version());
    eprintln!();
    eprintln!("Usage: termscreen [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  s                     Suspend for two seconds, then resume");
    eprintln!("  q                     Quit");
    eprintln!();
    eprintln!("Configuration: ~/.termscreen/config.toml");
    eprintln!("Log file:      ~/.termscreen/termscreen.log (filter with TERMSCREEN_LOG)");
}

fn init_logging() {
    let log_path = ScreenConfig::config_dir()
        .map(|dir| dir.join("termscreen.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("termscreen.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env("TERMSCREEN_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    for arg in &args[1..] {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-v" | "--version" => {
                eprintln!("{}", version());
                return Ok(());
            }
            _ => {}
        }
    }

    init_logging();
    info!("{} starting", version());

    let config = ScreenConfig::load();
    let driver = CrosstermDriver::new(config.alternate_screen);
    let mut screen = Screen::new(driver, BufferEngine::new(), config)?;

    screen.rip_off_line(Side::Top, |engine, window, cols| {
        let title = format!(" {} ({} columns)", version(), cols);
        let attrs = CellAttrs::with_flags(AttrFlags::INVERSE | AttrFlags::BOLD);
        let drawn = engine
            .set_attrs(window, attrs)
            .and_then(|()| engine.erase(window))
            .and_then(|()| engine.put_str(window, 0, 0, &title));
        if let Err(e) = drawn {
            warn!("failed to draw title line: {}", e);
        }
    })?;

    if screen.soft_labels().is_initialized() {
        screen.set_label(1, "Suspend", Justify::Center)?;
        screen.set_label(2, "Quit", Justify::Center)?;
    }

    screen.create(&args)?;
    let result = run(&mut screen);
    screen.destroy();

    info!("termscreen exiting");
    result
}

fn run(screen: &mut DemoScreen) -> anyhow::Result<()> {
    draw_status(screen)?;

    loop {
        refresh(screen)?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        match event::read()? {
            Event::Resize(cols, rows) => {
                info!("terminal resized to {}x{}", cols, rows);
                screen.mark_resized();
                follow_terminal_size(screen)?;
            }
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::F(2) => return Ok(()),
                KeyCode::Char('s') | KeyCode::F(1) => {
                    screen.suspend()?;
                    println!("Suspended. Resuming in two seconds...");
                    let _ = io::stdout().flush();
                    std::thread::sleep(Duration::from_secs(2));
                    screen.resume()?;
                    follow_terminal_size(screen)?;
                }
                _ => {}
            },
            _ => {}
        }
    }
}

/// Re-read the terminal size. A terminal shrunk below the minimum keeps the
/// old layout until it grows again.
fn follow_terminal_size(screen: &mut DemoScreen) -> anyhow::Result<()> {
    match screen.resize(0, 0) {
        Ok(_) => {}
        Err(ScreenError::TerminalTooSmall { rows, cols }) => {
            warn!("terminal too small ({}x{}), keeping previous layout", rows, cols);
        }
        Err(e) => return Err(e.into()),
    }
    draw_status(screen)
}

fn draw_status(screen: &mut DemoScreen) -> anyhow::Result<()> {
    let Some(session) = screen.session() else {
        return Ok(());
    };
    let display = session.windows().display;
    let lines = [
        format!("terminal     {}x{}", session.terminal_rows(), session.terminal_cols()),
        format!("display      {}x{}", session.usable_rows(), session.usable_cols()),
        format!(
            "reserved     {} top, {} bottom, {} soft-label rows",
            session.reserved_top_count(),
            session.reserved_bottom_count(),
            session.slk_row_count()
        ),
        format!("description  {}", session.description()),
        String::new(),
        "s: suspend   q: quit".to_string(),
    ];

    let engine = screen.engine_mut();
    engine.erase(display)?;
    for (y, line) in lines.iter().enumerate() {
        engine.put_str(display, y as u16 + 1, 2, line)?;
    }
    Ok(())
}

fn refresh(screen: &mut DemoScreen) -> io::Result<()> {
    let Some(windows) = screen.session().map(|s| s.windows().clone()) else {
        return Ok(());
    };
    let stdout = io::stdout();
    let mut stdout = io::BufWriter::with_capacity(65536, stdout.lock());
    termscreen::ui::paint(&mut stdout, screen.engine_mut(), &windows)
}
