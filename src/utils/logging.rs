use std::path::{Path, PathBuf};

/// The name of the debug log, placed in the system's temporary directory.
pub const DEBUG_LOG_NAME: &str = "utop_debug.log";

/// Returns where the debug log is written to.
pub fn debug_log_path() -> PathBuf {
    std::env::temp_dir().join(DEBUG_LOG_NAME)
}

pub fn init_logger(min_level: log::LevelFilter, debug_file_name: &Path) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            // Note we aren't using local time since it only works on single-threaded processes,
            // and the ctrlc handler gives us a second thread.
            let offset = time::OffsetDateTime::now_utc();
            let timestamp = offset
                .format(&time::macros::format_description!(
                    // The weird "[[[" is because we need to escape a bracket ("[[") to show one "[".
                    // See https://time-rs.github.io/book/api/format-description.html
                    "[[[year]-[month]-[day]][[[hour]:[minute]:[second][subsecond digits:9]]"
                ))
                .unwrap_or_default();

            out.finish(format_args!(
                "{}[{}][{}] {}",
                timestamp,
                record.target(),
                record.level(),
                message
            ))
        })
        .level(min_level)
        .chain(fern::log_file(debug_file_name)?)
        .apply()?;

    Ok(())
}
