//! A library for building `top`-like process monitors that show every process as a tree.
//!
//! The [`app`] module holds the process store, the refresh engine, and the UI state that
//! keys act on. [`collection`] reads processes from the platform (or from a captured
//! listing), and [`canvas`] draws everything with ratatui. The `utop` binary wires them
//! to a terminal through [`run`].

pub mod app;
pub mod canvas;
pub mod collection;
pub mod constants;
pub mod options;

pub mod utils {
    pub mod data_units;
    pub mod error;
    pub mod logging;
    pub mod strings;
}

use std::{
    io::{Stdout, stdout},
    panic::PanicHookInfo,
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use crossterm::{
    event::{Event, poll, read},
    execute,
    style::Print,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use tui::{Terminal, backend::CrosstermBackend};

use crate::{
    app::{App, EventResult, actions::Launch},
    canvas::Painter,
    utils::error::Result,
};

pub type UtopTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The user quit.
    Quit,
    /// A termination signal arrived.
    Terminated,
}

/// Restores the terminal to how it was before we took it over.
pub fn cleanup_terminal(terminal: &mut UtopTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

/// Based on https://github.com/Rigellute/spotify-tui/blob/master/src/main.rs
pub fn panic_hook(panic_info: &PanicHookInfo<'_>) {
    let mut stdout = stdout();

    let msg = match panic_info.payload().downcast_ref::<&'static str>() {
        Some(s) => *s,
        None => match panic_info.payload().downcast_ref::<String>() {
            Some(s) => &s[..],
            None => "Box<Any>",
        },
    };

    let stacktrace: String = format!("{:?}", backtrace::Backtrace::new());

    let _ = disable_raw_mode();
    let _ = execute!(stdout, LeaveAlternateScreen);

    // Print stack trace. Must be done after!
    let location = panic_info
        .location()
        .map(|location| location.to_string())
        .unwrap_or_default();
    let _ = execute!(
        stdout,
        Print(format!(
            "thread '<unnamed>' panicked at '{msg}', {location}\n\r{stacktrace}",
        )),
    );
}

/// Hands the terminal to an external program until it exits.
fn run_in_foreground(
    terminal: &mut UtopTerminal, launch: &Launch, is_terminated: &AtomicBool,
) -> Result<Result<()>> {
    cleanup_terminal(terminal)?;

    let result = launch.run(is_terminated);

    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    enable_raw_mode()?;
    terminal.hide_cursor()?;
    terminal.clear()?;

    Ok(result)
}

/// The main loop: wait for a key or the next refresh, whichever comes first, then
/// redraw. Returns once the user quits or `is_terminated` is set.
pub fn run(
    terminal: &mut UtopTerminal, app: &mut App, painter: &Painter, is_terminated: &AtomicBool,
) -> Result<Exit> {
    app.prime(Instant::now())?;
    terminal.draw(|f| painter.draw(f, app))?;

    while !is_terminated.load(Ordering::SeqCst) {
        let mut redraw = false;

        if poll(app.poll_duration(Instant::now()))? {
            match read()? {
                Event::Key(event) => {
                    redraw = true;
                    match app.handle_key_event(event) {
                        EventResult::Continue => {}
                        EventResult::Clear => terminal.clear()?,
                        EventResult::Quit => return Ok(Exit::Quit),
                        EventResult::Launch(launch) => {
                            let result = run_in_foreground(terminal, &launch, is_terminated)?;
                            app.finish_launch(result);
                        }
                    }
                }
                Event::Resize(..) => {
                    terminal.autoresize()?;
                    redraw = true;
                }
                _ => {}
            }
        }

        if app.update(Instant::now())? {
            redraw = true;
        }

        if redraw {
            terminal.draw(|f| painter.draw(f, app))?;
        }
    }

    Ok(Exit::Terminated)
}
