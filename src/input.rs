use std::io::{self, BufRead, Read};

/// Default bound on an input line, in bytes.
pub const DEFAULT_MAX_LINE: usize = 4096;

#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Text(String),
    /// The line exceeded the bound; it was consumed and dropped.
    TooLong,
    Eof,
}

/// Read one line of at most `limit` bytes, not counting the newline.
///
/// An over-long line is read through to its newline and discarded rather
/// than split into several commands. Invalid UTF-8 is replaced.
pub fn read_line<R: BufRead>(reader: &mut R, limit: usize) -> io::Result<Line> {
    let mut buf = Vec::new();
    let read = reader
        .by_ref()
        .take((limit as u64).saturating_add(1))
        .read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(Line::Eof);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > limit {
        reader.skip_until(b'\n')?;
        return Ok(Line::TooLong);
    }

    Ok(Line::Text(String::from_utf8_lossy(&buf).into_owned()))
}
