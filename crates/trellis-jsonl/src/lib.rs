//! JSON Lines reading and writing for trellis portfolio snapshots.
//!
//! This library provides buffered record-at-a-time reading with an optional
//! resilient mode that skips malformed lines while collecting warnings, and
//! crash-safe whole-file writes using the temp-file-then-rename pattern.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
pub mod error;
pub mod reader;
pub mod warning;
pub mod writer;

pub use atomic::{write_jsonl_atomic, write_jsonl_atomic_iter};
pub use error::{Error, Result};
pub use reader::{JsonlReader, read_jsonl_resilient};
pub use warning::Warning;
pub use writer::JsonlWriter;
