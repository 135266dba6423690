//! Purpose: Read physical lines and assemble them into complete records.
//! Exports: `LineAssembler`, `LineTransform`.
//! Role: Owns the file handle for one pass of a cursor.
//! Invariants: A record buffer grows only while the grammar reports it incomplete.
//! Invariants: A byte order mark is dropped from the first physical line only.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use bstr::ByteSlice;

use crate::core::error::{Error, ErrorKind, fs_error};
use crate::core::grammar::{Grammar, Tokenized};

/// Optional hook applied to every physical line before it is accumulated.
pub type LineTransform = Box<dyn Fn(&str) -> String>;

const UTF8_BOM: &str = "\u{feff}";

pub(crate) struct LineAssembler {
    reader: BufReader<File>,
    path: PathBuf,
    grammar: Grammar,
    ignore_blank_lines: bool,
    line: Vec<u8>,
    lines_read: u64,
    last_buffer: String,
}

impl LineAssembler {
    pub(crate) fn open(
        path: &Path,
        grammar: Grammar,
        ignore_blank_lines: bool,
    ) -> Result<Self, Error> {
        let file = File::open(path).map_err(|err| fs_error(err, "failed to open file", path))?;
        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            grammar,
            ignore_blank_lines,
            line: Vec::new(),
            lines_read: 0,
            last_buffer: String::new(),
        })
    }

    /// Discard up to `count` physical lines; stops early at EOF.
    pub(crate) fn skip(&mut self, count: usize) -> Result<(), Error> {
        for _ in 0..count {
            if !self.fill_line()? {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn last_buffer(&self) -> &str {
        &self.last_buffer
    }

    /// Pull the next complete record; `row` only labels errors.
    pub(crate) fn next_record(
        &mut self,
        row: u64,
        transform: Option<&LineTransform>,
    ) -> Result<Option<Vec<String>>, Error> {
        let mut buffer = String::new();
        loop {
            if !self.fill_line()? {
                return self.finish(buffer, row);
            }
            let raw = self.decode_line(row)?;
            let line = match transform {
                Some(transform) => transform(raw),
                None => raw.to_string(),
            };
            if buffer.is_empty() && self.ignore_blank_lines && line.trim().is_empty() {
                continue;
            }
            buffer.push_str(&line);
            match self.grammar.tokenize(&buffer) {
                Tokenized::Complete(fields) => {
                    tracing::trace!(row, fields = fields.len(), "assembled record");
                    self.last_buffer = buffer;
                    return Ok(Some(fields));
                }
                Tokenized::Incomplete => continue,
                Tokenized::Malformed => {
                    self.last_buffer = buffer;
                    return Err(self.record_error("malformed record", row));
                }
            }
        }
    }

    fn finish(&mut self, mut buffer: String, row: u64) -> Result<Option<Vec<String>>, Error> {
        if buffer.is_empty() {
            return Ok(None);
        }
        if !buffer.ends_with('\n') {
            buffer.push('\n');
            if let Tokenized::Complete(fields) = self.grammar.tokenize(&buffer) {
                self.last_buffer = buffer;
                return Ok(Some(fields));
            }
        }
        self.last_buffer = buffer;
        Err(self
            .record_error("unterminated record at end of file", row)
            .with_hint("Check for an unbalanced enclosure character."))
    }

    fn fill_line(&mut self) -> Result<bool, Error> {
        self.line.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.line)
            .map_err(|err| fs_error(err, "failed to read file", &self.path))?;
        if read == 0 {
            return Ok(false);
        }
        self.lines_read += 1;
        Ok(true)
    }

    fn decode_line(&self, row: u64) -> Result<&str, Error> {
        let text = self.line.to_str().map_err(|err| {
            Error::new(ErrorKind::FileSystem)
                .with_message("invalid UTF-8 in record")
                .with_path(&self.path)
                .with_row(row)
                .with_source(err)
        })?;
        if self.lines_read == 1 {
            return Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text));
        }
        Ok(text)
    }

    fn record_error(&self, message: &str, row: u64) -> Error {
        Error::new(ErrorKind::FileSystem)
            .with_message(message)
            .with_path(&self.path)
            .with_row(row)
    }
}
