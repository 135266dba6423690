//! Purpose: Restartable, forward-moving cursor over the records of a delimited file.
//! Exports: `Cursor`, `Records`.
//! Role: Owns the line assembler and key configuration; the read half of the engine.
//! Invariants: The row id only advances past a valid record and is 1 right after any header.
//! Invariants: Once end-of-stream is reached `current` yields nothing until `rewind`.
//! Invariants: `rewind` drops the previous file handle before reopening.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::assembler::{LineAssembler, LineTransform};
use crate::core::dialect::{Dialect, TableConfig};
use crate::core::error::{Error, ErrorKind};
use crate::core::grammar::Grammar;
use crate::core::record::Record;

pub struct Cursor {
    path: PathBuf,
    dialect: Dialect,
    grammar: Grammar,
    transform: Option<LineTransform>,
    assembler: Option<LineAssembler>,
    keys: Option<Arc<[String]>>,
    row: u64,
    eof: bool,
    rewound: bool,
    current: Option<Record>,
    raw_buffer: Option<String>,
}

impl Cursor {
    pub fn open(path: impl AsRef<Path>, dialect: Dialect) -> Result<Self, Error> {
        dialect.validate()?;
        let path = path.as_ref().to_path_buf();
        let grammar = dialect.grammar();
        let assembler = LineAssembler::open(&path, grammar, dialect.ignore_blank_lines)?;
        tracing::debug!(path = %path.display(), ?grammar, "opened cursor");
        Ok(Self {
            path,
            dialect,
            grammar,
            transform: None,
            assembler: Some(assembler),
            keys: None,
            row: 1,
            eof: false,
            rewound: false,
            current: None,
            raw_buffer: None,
        })
    }

    pub fn from_config(config: &TableConfig) -> Result<Self, Error> {
        let path = config.file_name()?;
        Self::open(path, config.dialect()?)
    }

    /// Install a pure transform applied to each physical line before tokenizing.
    pub fn with_line_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn rewind(&mut self) -> Result<(), Error> {
        self.assembler = None;
        self.current = None;
        self.keys = None;
        self.rewound = false;
        self.eof = true;

        let mut assembler =
            LineAssembler::open(&self.path, self.grammar, self.dialect.ignore_blank_lines)?;
        assembler.skip(self.dialect.skip_lines)?;

        let configured = (!self.dialect.keys.is_empty())
            .then(|| Arc::<[String]>::from(self.dialect.keys.clone()));
        let keys = if self.dialect.header {
            let header = assembler.next_record(0, self.transform.as_ref())?;
            if self.dialect.override_keys {
                configured
            } else {
                header.map(Arc::<[String]>::from)
            }
        } else {
            configured
        };

        self.keys = keys;
        self.assembler = Some(assembler);
        self.row = 1;
        self.eof = false;
        self.rewound = true;
        tracing::debug!(
            path = %self.path.display(),
            skip_lines = self.dialect.skip_lines,
            header = self.dialect.header,
            keys = self.keys.as_ref().map_or(0, |keys| keys.len()),
            "rewound cursor"
        );
        Ok(())
    }

    pub fn current(&mut self) -> Result<Option<&Record>, Error> {
        if !self.rewound {
            self.rewind()?;
        }
        if self.current.is_none() && !self.eof {
            self.load()?;
        }
        Ok(self.current.as_ref())
    }

    fn load(&mut self) -> Result<(), Error> {
        let Some(assembler) = self.assembler.as_mut() else {
            self.eof = true;
            return Ok(());
        };
        let next = assembler.next_record(self.row, self.transform.as_ref());
        self.raw_buffer = Some(assembler.last_buffer().to_string());
        match next {
            Ok(Some(fields)) => {
                self.current = Some(Record::zip(self.keys.clone(), fields));
            }
            Ok(None) => {
                tracing::debug!(path = %self.path.display(), rows = self.row - 1, "end of stream");
                self.assembler = None;
                self.eof = true;
            }
            Err(err) => {
                self.assembler = None;
                self.eof = true;
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn next(&mut self) -> Result<(), Error> {
        if self.current()?.is_some() {
            self.current = None;
            self.row += 1;
        }
        Ok(())
    }

    pub fn valid(&mut self) -> Result<bool, Error> {
        Ok(self.current()?.is_some())
    }

    /// Row id of the current position, 1-based.
    pub fn key(&self) -> u64 {
        self.row
    }

    /// Position the cursor on `row`, rewinding first; costs `row - 1` reads.
    pub fn seek(&mut self, row: i64) -> Result<(), Error> {
        if row < 1 {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("seek target must be at least 1, got {row}"))
                .with_path(&self.path));
        }
        let target = row as u64;
        self.rewind()?;
        while self.row < target && self.valid()? {
            self.next()?;
        }
        if !self.valid()? {
            return Err(Error::new(ErrorKind::OutOfBounds)
                .with_message("seek target is beyond the last record")
                .with_path(&self.path)
                .with_row(target));
        }
        Ok(())
    }

    pub fn keys(&mut self) -> Result<&[String], Error> {
        if !self.rewound {
            self.rewind()?;
        }
        Ok(self.keys.as_deref().unwrap_or(&[]))
    }

    /// Return the current record and advance past it.
    pub fn read_record(&mut self) -> Result<Option<Record>, Error> {
        if self.current()?.is_none() {
            return Ok(None);
        }
        self.row += 1;
        Ok(self.current.take())
    }

    /// Iterate every record from the start of the file.
    pub fn records(&mut self) -> Records<'_> {
        Records {
            cursor: self,
            started: false,
            done: false,
        }
    }

    /// Raw text of the most recently assembled buffer, for diagnostics.
    pub fn raw_buffer(&self) -> Option<&str> {
        self.raw_buffer.as_deref()
    }
}

pub struct Records<'a> {
    cursor: &'a mut Cursor,
    started: bool,
    done: bool,
}

impl Iterator for Records<'_> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            if let Err(err) = self.cursor.rewind() {
                self.done = true;
                return Some(Err(err));
            }
        }
        match self.cursor.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
