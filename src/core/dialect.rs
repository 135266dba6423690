//! Purpose: Describe how a delimited text file is laid out.
//! Exports: `Dialect`, `EscapeStyle`, `TableConfig`.
//! Role: Immutable configuration consumed by cursors and writers; presets cover CSV/TSV/PSV.
//! Invariants: A validated dialect never uses CR/LF as separator or enclosure.
//! Invariants: Separator and enclosure are always distinct single characters.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, fs_error, invalid_argument};
use crate::core::grammar::Grammar;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeStyle {
    /// RFC 4180: a literal enclosure is written twice.
    #[default]
    Doubled,
    /// A literal enclosure is written as `\<enclosure>`.
    Backslash,
    /// Each line is one raw enclosed value; nothing is escaped.
    Unenclosed,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dialect {
    pub separator: char,
    pub enclosure: Option<char>,
    pub escape: EscapeStyle,
    pub header: bool,
    pub skip_lines: usize,
    pub ignore_blank_lines: bool,
    pub keys: Vec<String>,
    pub override_keys: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::csv()
    }
}

impl Dialect {
    pub fn csv() -> Self {
        Self::with_separator_char(',')
    }

    pub fn tsv() -> Self {
        Self::with_separator_char('\t')
    }

    pub fn psv() -> Self {
        Self::with_separator_char('|')
    }

    fn with_separator_char(separator: char) -> Self {
        Self {
            separator,
            enclosure: Some('"'),
            escape: EscapeStyle::Doubled,
            header: false,
            skip_lines: 0,
            ignore_blank_lines: false,
            keys: Vec::new(),
            override_keys: false,
        }
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn enclosure(mut self, enclosure: Option<char>) -> Self {
        self.enclosure = enclosure;
        self
    }

    pub fn escape(mut self, escape: EscapeStyle) -> Self {
        self.escape = escape;
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn skip_lines(mut self, skip_lines: usize) -> Self {
        self.skip_lines = skip_lines;
        self
    }

    pub fn ignore_blank_lines(mut self, ignore: bool) -> Self {
        self.ignore_blank_lines = ignore;
        self
    }

    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn override_keys(mut self, override_keys: bool) -> Self {
        self.override_keys = override_keys;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if is_line_break(self.separator) {
            return Err(invalid_argument("separator must not be a line break"));
        }
        if let Some(enclosure) = self.enclosure {
            if is_line_break(enclosure) {
                return Err(invalid_argument("enclosure must not be a line break"));
            }
            if enclosure == self.separator {
                return Err(invalid_argument("enclosure must differ from separator"));
            }
            if self.escape == EscapeStyle::Backslash && (enclosure == '\\' || self.separator == '\\')
            {
                return Err(invalid_argument(
                    "backslash escaping cannot use a backslash separator or enclosure",
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn grammar(&self) -> Grammar {
        Grammar::for_dialect(self)
    }
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Configuration record as handed over by external collaborators.
///
/// Every field is optional; absent fields fall back to [`Dialect::default`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TableConfig {
    pub file_name: Option<PathBuf>,
    pub separator: Option<String>,
    pub enclosure: Option<String>,
    pub escape_style: Option<EscapeStyle>,
    pub header: Option<bool>,
    pub skip_lines: Option<usize>,
    pub ignore_whitespace: Option<bool>,
    pub keys: Option<Vec<String>>,
    pub override_keys: Option<bool>,
}

impl TableConfig {
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::InvalidArgument)
                .with_message("invalid table configuration")
                .with_source(err)
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| fs_error(err, "failed to read table configuration", path))?;
        Self::from_json(&text).map_err(|err| err.with_path(path))
    }

    pub fn file_name(&self) -> Result<&Path, Error> {
        self.file_name
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| invalid_argument("fileName is required"))
    }

    /// Overlay the configured fields on `base` and validate the result.
    pub fn apply(&self, base: Dialect) -> Result<Dialect, Error> {
        let mut dialect = base;
        if let Some(separator) = &self.separator {
            dialect.separator = single_char(separator, "separator")?
                .ok_or_else(|| invalid_argument("separator must not be empty"))?;
        }
        if let Some(enclosure) = &self.enclosure {
            dialect.enclosure = single_char(enclosure, "enclosure")?;
        }
        if let Some(escape) = self.escape_style {
            dialect.escape = escape;
        }
        if let Some(header) = self.header {
            dialect.header = header;
        }
        if let Some(skip_lines) = self.skip_lines {
            dialect.skip_lines = skip_lines;
        }
        if let Some(ignore) = self.ignore_whitespace {
            dialect.ignore_blank_lines = ignore;
        }
        if let Some(keys) = &self.keys {
            dialect.keys = keys.clone();
        }
        if let Some(override_keys) = self.override_keys {
            dialect.override_keys = override_keys;
        }
        dialect.validate()?;
        Ok(dialect)
    }

    pub fn dialect(&self) -> Result<Dialect, Error> {
        self.apply(Dialect::default())
    }
}

fn single_char(value: &str, field: &str) -> Result<Option<char>, Error> {
    let mut chars = value.chars();
    let first = chars.next();
    if chars.next().is_some() {
        return Err(invalid_argument(format!(
            "{field} must be a single character"
        )));
    }
    Ok(first)
}
