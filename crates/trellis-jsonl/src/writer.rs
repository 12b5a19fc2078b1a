//! JSONL writing operations.
//!
//! This module provides async, buffered writing of JSONL data: one JSON
//! value per line, each line terminated by a newline character.

use crate::error::Result;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Async writer for JSONL (JSON Lines) data.
///
/// Wraps an async writer in a [`BufWriter`]. Records are serialized with
/// `serde_json` and written as single lines; call [`flush`](Self::flush)
/// before dropping the writer to make sure buffered data reaches the
/// underlying writer.
pub struct JsonlWriter<W> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> JsonlWriter<W> {
    /// Creates a new `JsonlWriter` wrapping the given async writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Creates a new `JsonlWriter` with a custom buffer capacity.
    #[must_use]
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, writer),
        }
    }

    /// Serializes one value and writes it as a single line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    pub async fn write_record<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let mut json = serde_json::to_vec(value)?;
        json.push(b'\n');
        self.writer.write_all(&json).await?;
        Ok(())
    }

    /// Writes every value from an iterator, one line each.
    ///
    /// # Errors
    ///
    /// Returns the first serialization or IO error; earlier records may
    /// already be buffered when that happens.
    pub async fn write_all<T, I>(&mut self, values: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        for value in values {
            self.write_record(&value).await?;
        }
        Ok(())
    }

    /// Flushes buffered data to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying flush fails.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying buffered writer.
    ///
    /// Does not flush; call [`flush`](Self::flush) first.
    #[must_use]
    pub fn into_inner(self) -> BufWriter<W> {
        self.writer
    }
}
