use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

const PROMPT: &str = "$ ";

/// Draw the working directory on its own line, then `$ `: green after a
/// successful command, red otherwise.
pub fn render(out: &mut impl Write, last_status: i32, color: bool) -> io::Result<()> {
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "?".to_string());

    if color {
        let marker = if last_status == 0 { Color::Green } else { Color::Red };
        queue!(
            out,
            SetForegroundColor(Color::Blue),
            Print(&cwd),
            ResetColor,
            Print("\n"),
            SetForegroundColor(marker),
            Print(PROMPT),
            ResetColor
        )?;
    } else {
        write!(out, "{cwd}\n{PROMPT}")?;
    }
    out.flush()
}
