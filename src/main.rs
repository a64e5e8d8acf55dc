//! `fatsh`: an interactive shell working directly on FAT32 disk images.
#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]

mod commands;
mod config;
mod logging;

use commands::Flow;
use config::{Config, ConfigError};
use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
};
use storage::{BlockDevice, VolumeSession};

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(ConfigError::HelpRequested) => {
            print!("{}", config::USAGE);
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("Error: {err}");
            eprint!("{}", config::USAGE);
            return ExitCode::from(2);
        }
    };
    logging::init(config.log_level());

    let mut session = match VolumeSession::mount(config.image()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Error: failed to mount image: {err}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    if let Err(err) = run_shell(&mut session, stdin.lock(), &mut io::stdout()) {
        log::error!("shell stopped: {err}");
    }

    match session.unmount() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: failed to unmount image: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Reads commands until `exit` or end of input. Command errors are reported and
/// the shell carries on.
fn run_shell<D: BlockDevice>(
    session: &mut VolumeSession<D>,
    mut input: impl BufRead,
    out: &mut impl Write,
) -> io::Result<()> {
    let mut line = String::new();
    loop {
        write!(out, "{}", commands::prompt(session))?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }

        let (command, args) = commands::parse_command_line(&line);
        match commands::execute_command(&command, &args, session, out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => return Ok(()),
            Err(msg) => eprintln!("Error: {msg}"),
        }
    }
}
