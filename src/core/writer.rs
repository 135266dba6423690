//! Purpose: Serialize record sequences into a delimited text file.
//! Exports: `Writer`, `WriterOptions`.
//! Role: Write half of the engine; independent of any cursor.
//! Invariants: Line breaks separate lines; the file never ends in a trailing break.
//! Invariants: Every physical write is length-checked; short writes are fatal, never retried.
//! Invariants: The header is emitted exactly once, even for zero-row output.
//! Invariants: A row never serializes to an empty line when the dialect has an enclosure.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::dialect::{Dialect, EscapeStyle, TableConfig};
use crate::core::error::{Error, ErrorKind, fs_error};
use crate::core::grammar::Grammar;
use crate::core::record::Record;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WriterOptions {
    pub line_break: String,
    pub null_token: Option<String>,
    pub lazy_wrap: bool,
    pub wrap_whitespace: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            line_break: "\n".to_string(),
            null_token: None,
            lazy_wrap: true,
            wrap_whitespace: false,
        }
    }
}

pub struct Writer {
    path: PathBuf,
    dialect: Dialect,
    grammar: Grammar,
    options: WriterOptions,
    sink: Option<BufWriter<File>>,
    rows_written: u64,
    lines_written: u64,
    header_written: bool,
}

impl Writer {
    pub fn create(path: impl AsRef<Path>, dialect: Dialect) -> Result<Self, Error> {
        Self::create_with_options(path, dialect, WriterOptions::default())
    }

    pub fn create_with_options(
        path: impl AsRef<Path>,
        dialect: Dialect,
        options: WriterOptions,
    ) -> Result<Self, Error> {
        dialect.validate()?;
        let path = path.as_ref().to_path_buf();
        if dialect.escape == EscapeStyle::Unenclosed
            && dialect.enclosure.is_some()
            && dialect.keys.len() > 1
        {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message(format!(
                    "unenclosed dialect holds one value per line, got {} keys",
                    dialect.keys.len()
                ))
                .with_path(&path));
        }
        let file = File::create(&path)
            .map_err(|err| fs_error(err, "failed to create output file", &path))?;
        tracing::debug!(path = %path.display(), "opened writer");
        Ok(Self {
            grammar: dialect.grammar(),
            path,
            dialect,
            options,
            sink: Some(BufWriter::new(file)),
            rows_written: 0,
            lines_written: 0,
            header_written: false,
        })
    }

    pub fn from_config(config: &TableConfig, options: WriterOptions) -> Result<Self, Error> {
        let path = config.file_name()?;
        Self::create_with_options(path, config.dialect()?, options)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Write one row; `None` cells are nulls.
    ///
    /// With keys configured, cells are matched to keys by position: missing cells
    /// become nulls and surplus cells are dropped.
    pub fn write_row<'a, I>(&mut self, row: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        self.ensure_open()?;
        let mut cells: Vec<Option<&str>> = row.into_iter().collect();
        let width = self.dialect.keys.len();
        if width > 0 {
            cells.resize(width, None);
        }
        self.check_unenclosed(&cells)?;
        if !self.header_written {
            self.write_header()?;
        }

        let line = self.serialize(cells.into_iter());
        self.write_line(&line)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn write_record(&mut self, record: &Record) -> Result<(), Error> {
        self.write_row(record.cells())
    }

    /// Flush and release the file; returns the number of data rows written.
    pub fn close(&mut self) -> Result<u64, Error> {
        if self.sink.is_none() {
            return Ok(self.rows_written);
        }
        if !self.header_written {
            self.write_header()?;
        }
        let Some(sink) = self.sink.take() else {
            return Ok(self.rows_written);
        };
        let file = sink
            .into_inner()
            .map_err(|err| fs_error(err.into_error(), "failed to flush output file", &self.path))?;
        drop(file);
        tracing::debug!(
            path = %self.path.display(),
            rows = self.rows_written,
            lines = self.lines_written,
            "closed writer"
        );
        Ok(self.rows_written)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.sink.is_none() {
            return Err(Error::new(ErrorKind::FileSystem)
                .with_message("writer is closed")
                .with_path(&self.path));
        }
        Ok(())
    }

    fn write_header(&mut self) -> Result<(), Error> {
        self.header_written = true;
        if !self.dialect.header || self.dialect.keys.is_empty() {
            return Ok(());
        }
        let keys: Vec<Option<&str>> = self
            .dialect
            .keys
            .iter()
            .map(|key| Some(key.as_str()))
            .collect();
        self.check_unenclosed(&keys)?;
        let line = self.serialize(keys.into_iter());
        self.write_line(&line)
    }

    /// One-value-per-line output cannot hold several cells, nor an enclosure that
    /// lands right before a line break.
    fn check_unenclosed(&self, cells: &[Option<&str>]) -> Result<(), Error> {
        let Grammar::Unenclosed { enclosure, .. } = self.grammar else {
            return Ok(());
        };
        if cells.len() > 1 {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message(format!(
                    "unenclosed dialect holds one value per line, got {} cells",
                    cells.len()
                ))
                .with_path(&self.path)
                .with_row(self.rows_written + 1));
        }
        let value = match cells.first() {
            Some(Some(value)) => *value,
            _ => self.options.null_token.as_deref().unwrap_or(""),
        };
        if closes_line_early(value, enclosure) {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("value has an enclosure right before a line break")
                .with_hint("Use the doubled or backslash escape style for such values.")
                .with_path(&self.path)
                .with_row(self.rows_written + 1));
        }
        Ok(())
    }

    fn serialize<'a>(&self, cells: impl Iterator<Item = Option<&'a str>>) -> String {
        let separator = self.grammar.separator().to_string();
        let line = cells
            .map(|cell| self.grammar.escape(cell, &self.options))
            .collect::<Vec<_>>()
            .join(&separator);
        // a bare empty last line would read back as end of file
        match self.grammar.enclosure() {
            Some(enclosure) if line.is_empty() => format!("{enclosure}{enclosure}"),
            _ => line,
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), Error> {
        let row = self.rows_written + 1;
        let Some(sink) = self.sink.as_mut() else {
            return Err(Error::new(ErrorKind::FileSystem)
                .with_message("writer is closed")
                .with_path(&self.path));
        };

        let mut payload = String::with_capacity(line.len() + self.options.line_break.len());
        if self.lines_written > 0 {
            payload.push_str(&self.options.line_break);
        }
        payload.push_str(line);

        write_checked(sink, &payload, &self.path, row)?;
        self.lines_written += 1;
        Ok(())
    }
}

fn write_checked<W: Write>(
    sink: &mut W,
    payload: &str,
    path: &Path,
    row: u64,
) -> Result<(), Error> {
    let written = sink
        .write(payload.as_bytes())
        .map_err(|err| fs_error(err, "failed to write output file", path).with_row(row))?;
    if written != payload.len() {
        return Err(Error::new(ErrorKind::FileSystem)
            .with_message(format!(
                "short write: {written} of {} bytes",
                payload.len()
            ))
            .with_path(path)
            .with_row(row));
    }
    Ok(())
}

fn closes_line_early(value: &str, enclosure: char) -> bool {
    value.match_indices(enclosure).any(|(at, _)| {
        let rest = &value[at + enclosure.len_utf8()..];
        rest.starts_with('\n') || rest.starts_with("\r\n")
    })
}

impl Drop for Writer {
    fn drop(&mut self) {
        if self.sink.is_some() {
            if let Err(err) = self.close() {
                tracing::warn!(error = %err, "failed to close writer on drop");
            }
        }
    }
}
