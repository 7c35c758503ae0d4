use std::{
    io::stdout,
    panic,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, enable_raw_mode},
};
use time::UtcOffset;
use tui::{Terminal, backend::CrosstermBackend};
use utop::{
    Exit,
    app::App,
    canvas::{Painter, styling::Styles},
    cleanup_terminal,
    collection::create_collector,
    options::{UtopArgs, get_config_path, get_or_default_config, init_app_config},
    panic_hook, run,
    utils::logging::{debug_log_path, init_logger},
};

fn main() -> Result<()> {
    // The local offset can only be read while we are the only thread.
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let args = UtopArgs::parse();

    if args.general.debug {
        init_logger(log::LevelFilter::Debug, &debug_log_path())
            .context("Unable to initialize the debug log.")?;
    }

    let config_path = get_config_path(args.general.config_location.as_deref().map(Path::new));
    let config = get_or_default_config(config_path.as_deref())
        .context("Unable to properly parse the config file.")?;
    let app_config = init_app_config(&args, &config)
        .context("Found an issue while trying to build the app config.")?;

    log::debug!("Starting with {app_config:?}");

    let collector = create_collector(app_config.listing.as_deref());
    let mut app = App::new(app_config, collector);
    let painter = Painter::init(Styles::default(), local_offset);

    // Set up up tui and crossterm
    let mut stdout_val = stdout();
    execute!(stdout_val, EnterAlternateScreen)?;
    enable_raw_mode()?;

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout_val))?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    // Set panic hook
    panic::set_hook(Box::new(|info| panic_hook(info)));

    // Set termination hook
    let is_terminated = Arc::new(AtomicBool::new(false));
    {
        let is_terminated = is_terminated.clone();
        ctrlc::set_handler(move || {
            is_terminated.store(true, Ordering::SeqCst);
        })?;
    }

    let result = run(&mut terminal, &mut app, &painter, &is_terminated);
    cleanup_terminal(&mut terminal)?;

    match result? {
        Exit::Quit => Ok(()),
        Exit::Terminated => {
            eprintln!("utop was terminated by a signal.");
            std::process::exit(1);
        }
    }
}
