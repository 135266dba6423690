//! Purpose: Define the stable public Rust API boundary for tabio.
//! Exports: Cursor, writer, dialect, record, and error types consumed by callers and the CLI.
//! Role: Public, additive-only surface; hides the assembler and grammar internals.
//! Invariants: This module is the only public path to the reading and writing engine.
//! Invariants: Internal modules remain private and are not directly exposed.

pub use crate::core::assembler::LineTransform;
pub use crate::core::cursor::{Cursor, Records};
pub use crate::core::dialect::{Dialect, EscapeStyle, TableConfig};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::grammar::{Grammar, Tokenized};
pub use crate::core::record::Record;
pub use crate::core::writer::{Writer, WriterOptions};
