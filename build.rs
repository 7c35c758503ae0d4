//! Generates shell completions and a man page when `UTOP_GENERATE` is set.

use std::{
    env, fs,
    io::Result,
    path::{Path, PathBuf},
};

use clap::CommandFactory;
use clap_complete::{Shell, generate_to};

include!("src/options/args.rs");

fn create_dir(dir: &Path) -> Result<()> {
    let res = fs::create_dir_all(dir);
    match &res {
        Ok(()) => {}
        Err(err) => {
            eprintln!(
                "Failed to create a directory at location {dir:?}, encountered error {err:?}.  Aborting...",
            );
        }
    }

    res
}

fn generate_completions() -> Result<()> {
    const COMPLETION_DIR: &str = "./target/tmp/utop/completion/";
    const MANPAGE_DIR: &str = "./target/tmp/utop/manpage/";

    let completion_out_dir = PathBuf::from(COMPLETION_DIR);
    let manpage_out_dir = PathBuf::from(MANPAGE_DIR);

    create_dir(&completion_out_dir)?;
    create_dir(&manpage_out_dir)?;

    let mut app = UtopArgs::command();
    generate_to(Shell::Bash, &mut app, "utop", &completion_out_dir)?;
    generate_to(Shell::Zsh, &mut app, "utop", &completion_out_dir)?;
    generate_to(Shell::Fish, &mut app, "utop", &completion_out_dir)?;
    generate_to(Shell::Elvish, &mut app, "utop", &completion_out_dir)?;

    let app = app.name("utop");
    let man = clap_mangen::Man::new(app);
    let mut buffer: Vec<u8> = Default::default();
    man.render(&mut buffer)?;
    fs::write(manpage_out_dir.join("utop.1"), buffer)?;

    Ok(())
}

fn main() -> Result<()> {
    match env::var_os("UTOP_GENERATE") {
        Some(var) if !var.is_empty() => generate_completions()?,
        _ => {}
    }

    println!("cargo:rerun-if-env-changed=UTOP_GENERATE");

    Ok(())
}
