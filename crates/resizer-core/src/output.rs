//! Run report output in JSON or JSON Lines format.
//!
//! Each task result is flattened into a [`ResultRecord`]. JSONL reports are
//! streamed one record per line as results arrive; JSON reports are written
//! once as an array.

use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::pool::{Outcome, TaskResult};
use crate::types::TaskId;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializable view of a [`TaskResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub id: TaskId,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub panicked: bool,
    pub duration_ms: u64,
    pub worker: usize,
}

impl From<&TaskResult> for ResultRecord {
    fn from(result: &TaskResult) -> Self {
        let (status, reason, panicked) = match &result.outcome {
            Outcome::Success => ("success", None, false),
            Outcome::Failure { reason, panicked } => ("failure", Some(reason.clone()), *panicked),
        };
        Self {
            id: result.id,
            source: result.task.source().to_path_buf(),
            destination: result.task.destination().to_path_buf(),
            status,
            reason,
            panicked,
            duration_ms: result.duration.as_millis() as u64,
            worker: result.worker,
        }
    }
}

/// A writer that serializes report records.
///
/// In JSONL mode every record goes straight to the underlying writer. In JSON
/// mode records are buffered and written as one array by [`finish`](Self::finish).
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    pending: Vec<ResultRecord>,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects the JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            pending: Vec::new(),
            items_written: 0,
        }
    }

    /// Record a single task result.
    pub fn write(&mut self, result: &TaskResult) -> io::Result<()> {
        let record = ResultRecord::from(result);
        match self.format {
            OutputFormat::Json => self.pending.push(record),
            OutputFormat::JsonLines => {
                // JSONL is never pretty-printed (one object per line)
                serde_json::to_writer(&mut self.writer, &record).map_err(io::Error::other)?;
                writeln!(self.writer)?;
                self.items_written += 1;
            }
        }
        Ok(())
    }

    /// Write any buffered records and flush the underlying writer.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            let records = std::mem::take(&mut self.pending);
            if self.pretty {
                serde_json::to_writer_pretty(&mut self.writer, &records)
                    .map_err(io::Error::other)?;
            } else {
                serde_json::to_writer(&mut self.writer, &records).map_err(io::Error::other)?;
            }
            writeln!(self.writer)?;
            self.items_written += records.len();
        }
        self.writer.flush()
    }

    /// Get the number of records written so far.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
