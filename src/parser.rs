use crate::ast::{Pipeline, Stage};
use crate::error::{Result, ShellError};

/// A classified word of an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    /// `<path` or `< path`
    Input(String),
    /// `>path` or `> path`
    Output(String),
    Pipe,
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

/// Split a line on whitespace and classify each word.
///
/// Classification only looks at the first character: `<x`, `>x` carry their
/// path attached, `|x` is a stage break followed by the word `x` (each leading
/// `|` is its own break, so `||` yields an empty stage). A bare `<`
/// or `>` takes the next word verbatim as its path, whatever it looks like.
/// Characters elsewhere in a word (`a>b`) are ordinary text.
pub fn tokenize(line: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut words = line.split(is_separator).filter(|w| !w.is_empty());

    while let Some(word) = words.next() {
        match word {
            "<" => {
                let path = words.next().ok_or(ShellError::MissingRedirectTarget('<'))?;
                tokens.push(Token::Input(path.to_string()));
            }
            ">" => {
                let path = words.next().ok_or(ShellError::MissingRedirectTarget('>'))?;
                tokens.push(Token::Output(path.to_string()));
            }
            _ => {
                if let Some(path) = word.strip_prefix('<') {
                    tokens.push(Token::Input(path.to_string()));
                } else if let Some(path) = word.strip_prefix('>') {
                    tokens.push(Token::Output(path.to_string()));
                } else if word.starts_with('|') {
                    let rest = word.trim_start_matches('|');
                    let pipes = word.len() - rest.len();
                    tokens.extend(std::iter::repeat_n(Token::Pipe, pipes));
                    if !rest.is_empty() {
                        tokens.push(Token::Word(rest.to_string()));
                    }
                } else {
                    tokens.push(Token::Word(word.to_string()));
                }
            }
        }
    }

    Ok(tokens)
}

/// Group tokens into stages, one per `|`-separated segment.
///
/// A redirect attaches to the stage that is open when it appears; a repeated
/// redirect for the same slot replaces the earlier one.
pub fn build_pipeline(tokens: Vec<Token>) -> Result<Pipeline> {
    let mut stages = Vec::new();
    let mut current = Stage::default();

    for token in tokens {
        match token {
            Token::Word(word) => current.argv.push(word),
            Token::Input(path) => current.input = Some(path),
            Token::Output(path) => current.output = Some(path),
            Token::Pipe => {
                if current.argv.is_empty() {
                    return Err(ShellError::EmptyStage);
                }
                stages.push(std::mem::take(&mut current));
            }
        }
    }

    if current.argv.is_empty() {
        return Err(ShellError::EmptyStage);
    }
    stages.push(current);

    Ok(Pipeline { stages })
}

/// Parse one input line. A blank line yields `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Pipeline>> {
    let tokens = tokenize(line)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    build_pipeline(tokens).map(Some)
}
