use argh::FromArgs;
use tracing_subscriber::EnvFilter;

use crate::input::DEFAULT_MAX_LINE;

/// Environment variable holding the log filter when `--debug` is not given.
pub const LOG_ENV: &str = "PISH_LOG";

#[derive(FromArgs, Debug)]
/// Run programs, pipelines and redirections line by line; send job-control
/// signals with kill, stop and continue.
pub struct Args {
    /// log every spawn, wait and signal to stderr
    #[argh(switch)]
    pub debug: bool,

    /// never color the prompt
    #[argh(switch)]
    pub no_color: bool,

    /// longest accepted input line, in bytes (default 4096)
    #[argh(option, default = "DEFAULT_MAX_LINE", from_str_fn(parse_max_line))]
    pub max_line: usize,
}

fn parse_max_line(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("--max-line must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("--max-line: {e}")),
    }
}

/// Settings for one interpreter session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub debug: bool,
    pub color: bool,
    pub max_line: usize,
}

impl Config {
    /// Colors are only used when stdout is a terminal.
    pub fn new(args: Args, stdout_is_tty: bool) -> Self {
        Self {
            debug: args.debug,
            color: stdout_is_tty && !args.no_color,
            max_line: args.max_line,
        }
    }

    pub fn log_filter(&self) -> EnvFilter {
        if self.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    }
}
