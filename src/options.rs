//! How we handle config files and arguments, and turn them into an [`AppConfig`].

/// Argument parsing via clap.
pub mod args;
pub mod config;
pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub use args::UtopArgs;
pub use config::Config;
use config::StringOrNum;
pub(crate) use error::{OptionError, OptionResult};

use crate::{
    app::actions::ToolCommands,
    constants::{
        DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE_NAME, DEFAULT_REFRESH_RATE_IN_MILLISECONDS,
        DEFAULT_RESCAN_MULTIPLIER, MIN_REFRESH_RATE_IN_MILLISECONDS,
    },
};

/// Returns whether a boolean flag is set, either on the command line or in the config.
macro_rules! is_flag_enabled {
    ($flag_name:ident, $arg:expr, $config:expr) => {
        if $arg.$flag_name {
            true
        } else if let Some(flags) = &$config.flags {
            flags.$flag_name.unwrap_or(false)
        } else {
            false
        }
    };
}

/// Everything the app needs from the arguments and config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub force: bool,
    pub thin: bool,
    pub show_kernel_threads: bool,
    pub basename_only: bool,
    pub debug: bool,
    pub listing: Option<PathBuf>,
    pub refresh_rate: Duration,
    pub rescan_rate: Duration,
    pub tools: ToolCommands,
}

/// Returns the config path to use. If `override_config_path` is specified, then we will
/// use that. If not, the default location is used, but only if a file is there.
pub fn get_config_path(override_config_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(conf_loc) = override_config_path {
        return Some(conf_loc.to_path_buf());
    }

    dirs::config_dir()
        .map(|path| path.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Reads the config file at `config_path`, if any. The file is never created.
pub fn get_or_default_config(config_path: Option<&Path>) -> OptionResult<Config> {
    let Some(path) = config_path else {
        return Ok(Config::default());
    };

    let config_string = fs::read_to_string(path).map_err(|err| {
        OptionError::other(format!(
            "could not read the config file at '{}': {err}",
            path.display()
        ))
    })?;

    Ok(toml_edit::de::from_str(&config_string)?)
}

/// Combines the arguments and config file. Arguments win.
pub fn init_app_config(args: &UtopArgs, config: &Config) -> OptionResult<AppConfig> {
    let flags = config.flags.as_ref();

    let refresh_rate = get_refresh_rate(
        args.general.rate.as_deref(),
        flags.and_then(|f| f.rate.as_ref()),
    )?;
    let rescan_rate = get_rescan_rate(
        args.general.rescan_rate.as_deref(),
        flags.and_then(|f| f.rescan_rate.as_ref()),
        refresh_rate,
    )?;

    Ok(AppConfig {
        force: is_flag_enabled!(force, args.process, config),
        thin: is_flag_enabled!(thin, args.general, config),
        show_kernel_threads: is_flag_enabled!(kernel_threads, args.process, config),
        basename_only: is_flag_enabled!(basename, args.process, config),
        debug: args.general.debug,
        listing: args.process.listing.as_ref().map(PathBuf::from),
        refresh_rate,
        rescan_rate,
        tools: get_tools(config),
    })
}

/// Parses a duration given as milliseconds or as a human-readable duration.
fn try_parse_ms(s: &str) -> Result<u64, ()> {
    if let Ok(val) = s.parse::<u64>() {
        Ok(val)
    } else if let Ok(val) = humantime::parse_duration(s) {
        Ok(val.as_millis().try_into().map_err(|_| ())?)
    } else {
        Err(())
    }
}

/// Resolves a duration from the argument first, then the config. `name` is used for error
/// messages.
fn get_duration(
    arg: Option<&str>, config: Option<&StringOrNum>, name: &str,
) -> OptionResult<Option<u64>> {
    if let Some(rate) = arg {
        try_parse_ms(rate)
            .map(Some)
            .map_err(|_| OptionError::invalid_arg_value(name))
    } else if let Some(rate) = config {
        match rate {
            StringOrNum::String(s) => try_parse_ms(s)
                .map(Some)
                .map_err(|_| OptionError::invalid_config_value(name)),
            StringOrNum::Num(n) => Ok(Some(*n)),
        }
    } else {
        Ok(None)
    }
}

fn get_refresh_rate(arg: Option<&str>, config: Option<&StringOrNum>) -> OptionResult<Duration> {
    let rate =
        get_duration(arg, config, "rate")?.unwrap_or(DEFAULT_REFRESH_RATE_IN_MILLISECONDS);

    if rate < MIN_REFRESH_RATE_IN_MILLISECONDS {
        return Err(OptionError::config(format!(
            "set your refresh rate to be at least {MIN_REFRESH_RATE_IN_MILLISECONDS} ms."
        )));
    }

    Ok(Duration::from_millis(rate))
}

fn get_rescan_rate(
    arg: Option<&str>, config: Option<&StringOrNum>, refresh_rate: Duration,
) -> OptionResult<Duration> {
    match get_duration(arg, config, "rescan_rate")? {
        Some(rate) => {
            let rate = Duration::from_millis(rate);
            if rate < refresh_rate {
                Err(OptionError::config("set your rescan rate to be at least the refresh rate."))
            } else {
                Ok(rate)
            }
        }
        None => Ok(refresh_rate * DEFAULT_RESCAN_MULTIPLIER),
    }
}

fn get_tools(config: &Config) -> ToolCommands {
    let mut tools = ToolCommands::default();

    if let Some(overrides) = &config.tools {
        if let Some(cmd) = &overrides.list_open_files {
            tools.list_open_files = cmd.clone();
        }
        if let Some(cmd) = &overrides.trace {
            tools.trace = cmd.clone();
        }
        if let Some(cmd) = &overrides.debugger {
            tools.debugger = cmd.clone();
        }
    }

    tools
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;
    use crate::options::config::{ConfigFlags, ToolsConfig};

    fn args(list: &[&str]) -> UtopArgs {
        UtopArgs::parse_from(std::iter::once("utop").chain(list.iter().copied()))
    }

    #[test]
    fn defaults() {
        let config = init_app_config(&args(&[]), &Config::default()).unwrap();

        assert!(!config.force);
        assert!(!config.show_kernel_threads);
        assert_eq!(config.refresh_rate, Duration::from_millis(500));
        assert_eq!(config.rescan_rate, Duration::from_secs(30));
        assert_eq!(config.tools, ToolCommands::default());
        assert_eq!(config.listing, None);
    }

    #[test]
    fn rates_parse() {
        assert_eq!(try_parse_ms("1000"), Ok(1000));
        assert_eq!(try_parse_ms("2s"), Ok(2000));
        assert_eq!(try_parse_ms("1min 30s"), Ok(90_000));
        assert_eq!(try_parse_ms("soon"), Err(()));

        let config =
            init_app_config(&args(&["-r", "1s", "--rescan_rate", "1m"]), &Config::default())
                .unwrap();
        assert_eq!(config.refresh_rate, Duration::from_secs(1));
        assert_eq!(config.rescan_rate, Duration::from_secs(60));

        // The default rescan follows the refresh rate.
        let config = init_app_config(&args(&["-r", "200"]), &Config::default()).unwrap();
        assert_eq!(config.rescan_rate, Duration::from_secs(12));
    }

    #[test]
    fn bad_rates() {
        assert_eq!(
            init_app_config(&args(&["-r", "often"]), &Config::default()),
            Err(OptionError::invalid_arg_value("rate"))
        );
        assert!(init_app_config(&args(&["-r", "50ms"]), &Config::default()).is_err());
        assert!(
            init_app_config(&args(&["-r", "1s", "--rescan_rate", "500"]), &Config::default())
                .is_err()
        );
    }

    #[test]
    fn config_fills_in_and_args_win() {
        let config = Config {
            flags: Some(ConfigFlags {
                thin: Some(true),
                kernel_threads: Some(true),
                rate: Some(StringOrNum::String("2s".to_string())),
                ..Default::default()
            }),
            tools: Some(ToolsConfig {
                debugger: Some("lldb -p {pid}".to_string()),
                ..Default::default()
            }),
        };

        let app_config = init_app_config(&args(&["-b"]), &config).unwrap();
        assert!(app_config.thin);
        assert!(app_config.show_kernel_threads);
        assert!(app_config.basename_only);
        assert!(!app_config.force);
        assert_eq!(app_config.refresh_rate, Duration::from_secs(2));
        assert_eq!(app_config.tools.debugger, "lldb -p {pid}");
        assert_eq!(app_config.tools.trace, ToolCommands::default().trace);

        let app_config = init_app_config(&args(&["-r", "300"]), &config).unwrap();
        assert_eq!(app_config.refresh_rate, Duration::from_millis(300));
    }

    #[test]
    fn bad_config_rate() {
        let config = Config {
            flags: Some(ConfigFlags {
                rate: Some(StringOrNum::String("whenever".to_string())),
                ..Default::default()
            }),
            tools: None,
        };

        assert_eq!(
            init_app_config(&args(&[]), &config),
            Err(OptionError::invalid_config_value("rate"))
        );
    }

    #[test]
    fn explicit_config_paths() {
        let path = Path::new("/some/where/utop.toml");

        assert_eq!(get_config_path(Some(path)), Some(path.to_path_buf()));
        assert!(get_or_default_config(Some(path)).is_err());
        assert!(get_or_default_config(None).unwrap().flags.is_none());
    }
}
