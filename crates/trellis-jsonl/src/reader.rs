//! JSONL reading operations.
//!
//! This module provides async, buffered, record-at-a-time reading of JSONL
//! data with line number tracking for error reporting, plus a resilient
//! whole-file loader that skips malformed lines and reports them as warnings.

use crate::error::Result;
use crate::warning::Warning;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Async reader for JSONL (JSON Lines) data.
///
/// Wraps an async reader in a [`BufReader`] and deserializes one record per
/// line. Blank lines are skipped. The reader tracks 1-based line numbers so
/// parse failures can be located in the source file.
///
/// # Examples
///
/// ```no_run
/// use trellis_jsonl::JsonlReader;
/// use tokio::fs::File;
///
/// # #[derive(serde::Deserialize)]
/// # struct Record { id: u32 }
/// # async fn example() -> trellis_jsonl::Result<()> {
/// let file = File::open("data.jsonl").await?;
/// let mut reader = JsonlReader::new(file);
/// while let Some(record) = reader.read_record::<Record>().await? {
///     // ...
/// }
/// # Ok(())
/// # }
/// ```
pub struct JsonlReader<R> {
    reader: BufReader<R>,
    /// 1-based once reading starts; 0 before any line has been consumed.
    line_number: usize,
}

impl<R: AsyncRead + Unpin> JsonlReader<R> {
    /// Creates a new `JsonlReader` wrapping the given async reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
        }
    }

    /// Creates a new `JsonlReader` with a custom buffer capacity.
    ///
    /// Useful when the typical line length is known and the default buffer
    /// size would be wasteful or too small.
    #[must_use]
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
        }
    }

    /// Returns the line number of the most recently consumed line.
    ///
    /// Returns 0 before any lines have been read.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Reads the next record, skipping blank lines.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or if a non-empty line is not valid
    /// JSON for `T`. Parsing stops at the first bad line; use
    /// [`read_all_resilient`](Self::read_all_resilient) to skip bad lines
    /// instead.
    pub async fn read_record<T>(&mut self) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        loop {
            let Some(line) = self.next_line().await? else {
                return Ok(None);
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(trimmed)?));
        }
    }

    /// Reads all remaining records, failing on the first malformed line.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or any line is not valid JSON for `T`.
    pub async fn read_all<T>(&mut self) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut records = Vec::new();
        while let Some(record) = self.read_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Reads all remaining records, skipping lines that fail to parse.
    ///
    /// Each skipped line produces a [`Warning::MalformedJson`] carrying its
    /// line number. Blank lines are ignored without a warning.
    ///
    /// # Errors
    ///
    /// Returns an error only for IO failures; parse failures never abort the
    /// read.
    pub async fn read_all_resilient<T>(&mut self) -> Result<(Vec<T>, Vec<Warning>)>
    where
        T: DeserializeOwned,
    {
        let mut records = Vec::new();
        let mut warnings = Vec::new();
        while let Some(line) = self.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str(trimmed) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(
                        line = self.line_number,
                        error = %err,
                        "skipping malformed JSONL line"
                    );
                    warnings.push(Warning::MalformedJson {
                        line_number: self.line_number,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok((records, warnings))
    }

    /// Reads one physical line, updating the line counter.
    async fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line).await?;
        if bytes == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        Ok(Some(line))
    }

    /// Consumes the reader, returning the underlying buffered reader.
    #[must_use]
    pub fn into_inner(self) -> BufReader<R> {
        self.reader
    }
}

/// Opens `path` and reads every record in it, skipping malformed lines.
///
/// Convenience wrapper over [`JsonlReader::read_all_resilient`] for the
/// common load-a-whole-snapshot case.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or an IO failure occurs
/// while reading. Malformed lines are reported as warnings, not errors.
pub async fn read_jsonl_resilient<T, P>(path: P) -> Result<(Vec<T>, Vec<Warning>)>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref()).await?;
    let mut reader = JsonlReader::new(file);
    reader.read_all_resilient().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        id: u32,
        name: String,
    }

    #[test]
    fn new_reader_starts_at_line_zero() {
        let reader = JsonlReader::new(Cursor::new(b""));
        assert_eq!(reader.line_number(), 0);
    }

    #[tokio::test]
    async fn reads_records_in_order() {
        let data = b"{\"id\":1,\"name\":\"a\"}\n{\"id\":2,\"name\":\"b\"}\n";
        let mut reader = JsonlReader::new(Cursor::new(data.as_slice()));

        let first: Record = reader.read_record().await.unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(reader.line_number(), 1);

        let second: Record = reader.read_record().await.unwrap().unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(reader.line_number(), 2);

        let eof: Option<Record> = reader.read_record().await.unwrap();
        assert!(eof.is_none());
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let data = b"\n{\"id\":1,\"name\":\"a\"}\n\n   \n{\"id\":2,\"name\":\"b\"}\n";
        let mut reader = JsonlReader::new(Cursor::new(data.as_slice()));

        let records: Vec<Record> = reader.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn read_record_fails_on_malformed_line() {
        let data = b"{not json}\n";
        let mut reader = JsonlReader::new(Cursor::new(data.as_slice()));

        let result: Result<Option<Record>> = reader.read_record().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn resilient_read_collects_warnings_with_line_numbers() {
        let data = b"{\"id\":1,\"name\":\"a\"}\n{broken\n{\"id\":3,\"name\":\"c\"}\n";
        let mut reader = JsonlReader::new(Cursor::new(data.as_slice()));

        let (records, warnings) = reader.read_all_resilient::<Record>().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, 3);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line_number(), 2);
    }

    #[tokio::test]
    async fn resilient_read_of_empty_input() {
        let mut reader = JsonlReader::new(Cursor::new(b"".as_slice()));
        let (records, warnings) = reader.read_all_resilient::<Record>().await.unwrap();
        assert!(records.is_empty());
        assert!(warnings.is_empty());
    }
}
