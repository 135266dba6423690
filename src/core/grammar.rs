//! Purpose: Tokenize accumulated record buffers and escape values for writing.
//! Exports: `Grammar`, `Tokenized`.
//! Role: Pure policy used by the line assembler (read side) and the writer (write side).
//! Invariants: `Incomplete` only ever means "append the next physical line and retry".
//! Invariants: `Malformed` buffers cannot be repaired by any further input.
//! Invariants: Bytes inside enclosed fields, line breaks included, are preserved verbatim.
use std::borrow::Cow;

use crate::core::dialect::{Dialect, EscapeStyle};
use crate::core::writer::WriterOptions;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Tokenized {
    Complete(Vec<String>),
    Incomplete,
    Malformed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Grammar {
    Doubled { separator: char, enclosure: char },
    Backslash { separator: char, enclosure: char },
    Unenclosed { separator: char, enclosure: char },
    NoQuoting { separator: char },
}

impl Grammar {
    pub fn for_dialect(dialect: &Dialect) -> Self {
        let separator = dialect.separator;
        match (dialect.enclosure, dialect.escape) {
            (None, _) => Grammar::NoQuoting { separator },
            (Some(enclosure), EscapeStyle::Doubled) => Grammar::Doubled {
                separator,
                enclosure,
            },
            (Some(enclosure), EscapeStyle::Backslash) => Grammar::Backslash {
                separator,
                enclosure,
            },
            (Some(enclosure), EscapeStyle::Unenclosed) => Grammar::Unenclosed {
                separator,
                enclosure,
            },
        }
    }

    pub fn separator(&self) -> char {
        match *self {
            Grammar::Doubled { separator, .. }
            | Grammar::Backslash { separator, .. }
            | Grammar::Unenclosed { separator, .. }
            | Grammar::NoQuoting { separator } => separator,
        }
    }

    pub fn enclosure(&self) -> Option<char> {
        match *self {
            Grammar::Doubled { enclosure, .. }
            | Grammar::Backslash { enclosure, .. }
            | Grammar::Unenclosed { enclosure, .. } => Some(enclosure),
            Grammar::NoQuoting { .. } => None,
        }
    }

    pub fn tokenize(&self, buffer: &str) -> Tokenized {
        let body = strip_terminator(buffer);
        match (*self, body) {
            (Grammar::NoQuoting { separator }, _) => Tokenized::Complete(
                body.unwrap_or(buffer)
                    .split(separator)
                    .map(str::to_string)
                    .collect(),
            ),
            (_, None) => Tokenized::Incomplete,
            (
                Grammar::Doubled {
                    separator,
                    enclosure,
                },
                Some(body),
            ) => scan_fields(body, separator, enclosure, false),
            (
                Grammar::Backslash {
                    separator,
                    enclosure,
                },
                Some(body),
            ) => scan_fields(body, separator, enclosure, true),
            (Grammar::Unenclosed { enclosure, .. }, Some(body)) => scan_single(body, enclosure),
        }
    }

    /// Render one cell for output; `None` is a null value.
    pub fn escape<'a>(&self, value: Option<&'a str>, options: &'a WriterOptions) -> Cow<'a, str> {
        let Some(value) = value else {
            let token = options.null_token.as_deref().unwrap_or("");
            if let Grammar::Unenclosed { enclosure, .. } = *self {
                return Cow::Owned(format!("{enclosure}{token}{enclosure}"));
            }
            return Cow::Borrowed(token);
        };
        let (separator, enclosure) = match *self {
            Grammar::NoQuoting { .. } => return Cow::Borrowed(value),
            Grammar::Unenclosed { enclosure, .. } => {
                return Cow::Owned(format!("{enclosure}{value}{enclosure}"));
            }
            Grammar::Doubled {
                separator,
                enclosure,
            }
            | Grammar::Backslash {
                separator,
                enclosure,
            } => (separator, enclosure),
        };

        let forced = options.wrap_whitespace && has_outer_whitespace(value);
        if value.is_empty() && !forced {
            return Cow::Borrowed("");
        }
        let needs_quotes = value
            .chars()
            .any(|c| c == separator || c == enclosure || c == '\r' || c == '\n');
        if options.lazy_wrap && !needs_quotes && !forced {
            return Cow::Borrowed(value);
        }

        let mut out = String::with_capacity(value.len() + 2);
        out.push(enclosure);
        for c in value.chars() {
            match self {
                Grammar::Doubled { .. } if c == enclosure => {
                    out.push(enclosure);
                }
                Grammar::Backslash { .. } if c == enclosure || c == '\\' => {
                    out.push('\\');
                }
                _ => {}
            }
            out.push(c);
        }
        out.push(enclosure);
        Cow::Owned(out)
    }
}

fn has_outer_whitespace(value: &str) -> bool {
    value.is_empty()
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
}

fn strip_terminator(buffer: &str) -> Option<&str> {
    let body = buffer.strip_suffix('\n')?;
    Some(body.strip_suffix('\r').unwrap_or(body))
}

fn scan_fields(body: &str, separator: char, enclosure: char, backslash: bool) -> Tokenized {
    let mut fields = Vec::new();
    let mut chars = body.chars().peekable();
    loop {
        let mut field = String::new();
        if chars.peek() == Some(&enclosure) {
            chars.next();
            loop {
                match chars.next() {
                    // the stripped terminator belongs to the open field
                    None => return Tokenized::Incomplete,
                    Some('\\') if backslash => match chars.peek() {
                        Some(&next) if next == enclosure || next == '\\' => {
                            field.push(next);
                            chars.next();
                        }
                        None => return Tokenized::Incomplete,
                        Some(_) => field.push('\\'),
                    },
                    Some(c) if c == enclosure => {
                        if !backslash && chars.peek() == Some(&enclosure) {
                            chars.next();
                            field.push(enclosure);
                            continue;
                        }
                        break;
                    }
                    Some(c) => field.push(c),
                }
            }
            fields.push(field);
            match chars.next() {
                None => return Tokenized::Complete(fields),
                Some(c) if c == separator => continue,
                Some(_) => return Tokenized::Malformed,
            }
        }

        loop {
            match chars.next() {
                None => {
                    fields.push(field);
                    return Tokenized::Complete(fields);
                }
                Some(c) if c == separator => {
                    fields.push(field);
                    break;
                }
                Some(c) if c == enclosure => return Tokenized::Malformed,
                Some(c) => field.push(c),
            }
        }
    }
}

fn scan_single(body: &str, enclosure: char) -> Tokenized {
    let Some(rest) = body.strip_prefix(enclosure) else {
        return Tokenized::Malformed;
    };
    match rest.strip_suffix(enclosure) {
        Some(value) => Tokenized::Complete(vec![value.to_string()]),
        None => Tokenized::Incomplete,
    }
}
