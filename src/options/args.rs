// Argument parsing via clap.
//
// The build script pulls this file in with `include!`, so it stays a single file and
// sticks to plain comments; an inner doc comment there is a hard error.

use clap::*;
use indoc::indoc;

const TEMPLATE: &str = indoc! {
    "{name} {version}

    {about}

    {usage-heading} {usage}

    {all-args}"
};

const USAGE: &str = "utop [OPTIONS]";

/// The arguments for utop.
#[derive(Parser, Debug, Default)]
#[command(
    name = crate_name!(),
    version = crate_version!(),
    about = crate_description!(),
    disable_help_flag = true,
    disable_version_flag = true,
    color = ColorChoice::Auto,
    help_template = TEMPLATE,
    override_usage = USAGE,
)]
pub struct UtopArgs {
    #[command(flatten)]
    pub general: GeneralArgs,

    #[command(flatten)]
    pub process: ProcessArgs,

    #[command(flatten)]
    pub other: OtherArgs,
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "General Options", rename_all = "snake_case")]
pub struct GeneralArgs {
    #[arg(
        short = 'C',
        long,
        value_name = "PATH",
        value_hint = ValueHint::AnyPath,
        help = "Sets the location of the config file.",
        long_help = "Sets the location of the config file. Expects a config file in the TOML format. \
                    The file is only ever read, never created."
    )]
    pub config_location: Option<String>,

    #[arg(
        short = 'd',
        long,
        help = "Writes a debug log to the temporary directory.",
        long_help = "Writes a debug log named 'utop_debug.log' to the system's temporary directory."
    )]
    pub debug: bool,

    #[arg(
        short = 'r',
        long,
        value_name = "TIME",
        help = "Sets how often data is refreshed.",
        long_help = "Sets how often data is refreshed. Takes a number in milliseconds or a human-readable duration \
                    (e.g. 2s). The minimum is 100ms, and defaults to 500ms."
    )]
    pub rate: Option<String>,

    #[arg(
        long,
        value_name = "TIME",
        help = "Sets how often command lines are fully re-read.",
        long_help = "Sets how often every process' argument vector is re-read and its display strings rebuilt. \
                    Takes a number in milliseconds or a human-readable duration (e.g. 1m). It must not be smaller \
                    than the refresh rate, and defaults to 60 refreshes."
    )]
    pub rescan_rate: Option<String>,

    #[arg(
        short = 't',
        long,
        help = "Uses a thinner layout.",
        long_help = "Uses a thinner layout that drops the user and nice columns."
    )]
    pub thin: bool,
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "Process Options", rename_all = "snake_case")]
pub struct ProcessArgs {
    #[arg(
        short = 'b',
        long,
        help = "Shows only the basename of each command.",
        long_help = "Shows only the basename of each command instead of the full command line."
    )]
    pub basename: bool,

    #[arg(
        short = 'f',
        long,
        help = "Skips confirmation before launching external tools.",
        long_help = "Skips the confirmation prompt before listing open files, tracing, or attaching a debugger."
    )]
    pub force: bool,

    #[arg(
        short = 'k',
        long,
        help = "Shows kernel threads.",
        long_help = "Shows kernel threads in the tree. They are hidden by default, but still counted."
    )]
    pub kernel_threads: bool,

    #[arg(
        short = 'l',
        long,
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        help = "Reads processes from a captured ps listing.",
        long_help = indoc! {
            "Reads processes from a captured ps listing instead of the live system. The
            file is re-read on every refresh. It must start with a header line naming
            at least the PID, PPID and COMMAND columns, for example the output of:

            ps -e -o pid,ppid,user,stat,tty,nice,pcpu,args"
        }
    )]
    pub listing: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "Other Options", rename_all = "snake_case")]
pub struct OtherArgs {
    #[arg(short = 'h', long, action = ArgAction::Help, help = "Prints help info (for more details use '--help'.)")]
    help: (),

    #[arg(short = 'v', long, action = ArgAction::Version, help = "Prints version information.")]
    version: (),
}

/// Returns a [`Command`] based off of [`UtopArgs`].
#[cfg(test)]
pub(crate) fn build_cmd() -> Command {
    UtopArgs::command()
}
