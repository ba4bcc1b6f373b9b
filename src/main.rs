#[cfg(not(unix))]
compile_error!("pish drives fork/exec directly and only builds on Unix");

mod ast;
mod commands;
mod config;
mod error;
mod executor;
mod input;
mod job_control;
mod parser;
mod pipes;
mod prompt;
mod redirect;
mod spawn;
mod status;

use std::io::{self, Write};

use crossterm::tty::IsTty;
use tracing::debug;

use crate::error::ShellError;
use crate::input::Line;

fn init_logging(config: &config::Config) {
    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter())
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn main() {
    let args: config::Args = argh::from_env();
    let config = config::Config::new(args, io::stdout().is_tty());
    init_logging(&config);

    ctrlc::set_handler(|| {
        println!();
        let _ = io::stdout().flush();
    })
    .expect("Failed to set Ctrl-C handler");
    // Ctrl-Z at the prompt must not suspend the interpreter; children reset this.
    unsafe { libc::signal(libc::SIGTSTP, libc::SIG_IGN) };

    debug!(?config, pid = std::process::id(), "interpreter started");

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let mut last_status: i32 = 0;

    loop {
        if prompt::render(&mut stdout, last_status, config.color).is_err() {
            break;
        }

        match input::read_line(&mut reader, config.max_line) {
            Ok(Line::Eof) => {
                println!();
                break;
            }
            Ok(Line::Text(line)) => {
                last_status = commands::execute_line(&line, &mut stdout, &mut stderr);
            }
            Ok(Line::TooLong) => {
                let err = ShellError::LineTooLong { limit: config.max_line };
                let _ = writeln!(stderr, "pish: {err}");
                last_status = 1;
            }
            Err(e) => {
                eprintln!("pish: error reading input: {e}");
                break;
            }
        }
    }
}
