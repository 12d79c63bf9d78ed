//! Line tokenizer: whitespace splitting with single/double quotes and
//! backslash escapes.

use termcore_types::error::{Result, TermError};

/// A tokenized input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput {
    /// The line exactly as submitted.
    pub raw: String,
    /// First token; empty for blank input.
    pub command: String,
    pub args: Vec<String>,
}

impl ParsedInput {
    /// Blank input: nothing to dispatch.
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }

    pub fn arg_refs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

/// Split a line into a command name and arguments.
pub fn tokenize(raw: &str) -> Result<ParsedInput> {
    let mut tokens = split_tokens(raw)?.into_iter();
    let command = tokens.next().unwrap_or_default();
    Ok(ParsedInput {
        raw: raw.to_string(),
        command,
        args: tokens.collect(),
    })
}

/// Split on whitespace outside quotes.
///
/// Quotes are stripped; `""` yields an empty token. Inside double quotes
/// a backslash escapes `"`, `\` and `$`; elsewhere it is literal. Outside
/// quotes a backslash escapes any character.
pub fn split_tokens(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // Distinguishes `""` (an empty token) from no token at all.
    let mut in_token = false;
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            match ch {
                '"' => in_double = false,
                '\\' => match chars.peek() {
                    Some(&next @ ('"' | '\\' | '$')) => {
                        current.push(next);
                        chars.next();
                    },
                    _ => current.push('\\'),
                },
                _ => current.push(ch),
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    in_token = true;
                },
                '"' => {
                    in_double = true;
                    in_token = true;
                },
                '\\' => {
                    current.push(chars.next().unwrap_or('\\'));
                    in_token = true;
                },
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                },
                _ => {
                    current.push(ch);
                    in_token = true;
                },
            }
        }
    }

    if in_single {
        return Err(TermError::MalformedInput(
            "unterminated single quote".to_string(),
        ));
    }
    if in_double {
        return Err(TermError::MalformedInput(
            "unterminated double quote".to_string(),
        ));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Quote a token so that [`split_tokens`] reads it back unchanged.
pub fn quote(token: &str) -> String {
    let plain = !token.is_empty()
        && !token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if plain {
        return token.to_string();
    }
    let mut out = String::with_capacity(token.len() + 2);
    out.push('"');
    for c in token.chars() {
        if matches!(c, '"' | '\\' | '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Join a command and its arguments into a line, quoting where needed.
pub fn join_line(command: &str, args: &[String]) -> String {
    std::iter::once(quote(command))
        .chain(args.iter().map(|a| quote(a)))
        .collect::<Vec<_>>()
        .join(" ")
}
