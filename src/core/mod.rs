// Core modules implementing dialects, tokenizing, record assembly, and error modeling.
pub mod assembler;
pub mod cursor;
pub mod dialect;
pub mod error;
pub mod grammar;
pub mod record;
pub mod writer;
