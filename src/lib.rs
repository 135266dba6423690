//! Purpose: Streaming reader/writer for delimiter-separated tabular text (CSV/TSV/PSV).
//! Exports: `api` (cursor, writer, dialect, record, errors).
//! Role: Library backing the `tabio` binary and any caller that supplies file paths.
//! Invariants: Single-threaded and blocking; each cursor or writer owns one file handle.
//! Invariants: Nothing is retried internally; every failure surfaces as `api::Error`.
pub mod api;
mod core;
