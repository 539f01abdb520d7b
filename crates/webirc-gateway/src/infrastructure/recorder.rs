//! Per-session trace files.
//!
//! When a recording directory is configured, every session writes one file
//! describing each frame it relayed, in the format defined by
//! [`webirc_core::protocol::trace`].  The file is opened when the session
//! starts and finished with an `EOF` line when it ends.
//!
//! Recording is a debugging aid: a failing disk must never take a live
//! session down.  Write errors are logged once and further events are
//! dropped; the session keeps relaying.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::warn;
use uuid::Uuid;

use webirc_core::protocol::trace::{format_event, Direction, TRACE_FOOTER, TRACE_HEADER};

/// Errors creating or closing a trace file.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The trace file could not be created.
    #[error("failed to create recording {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the trace file failed.
    #[error("failed to write recording {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Builds the trace file name for a session started at `now`.
///
/// The timestamp is ISO-8601 with `:` replaced by `_` so the name is valid on
/// every file system; the session-id suffix keeps two sessions that start in
/// the same millisecond apart.
pub fn recording_file_name(now: DateTime<Utc>, session_id: Uuid) -> String {
    let stamp = now.format("%Y-%m-%dT%H_%M_%S%.3fZ");
    let id = session_id.simple().to_string();
    format!("{stamp}-{}", &id[..8])
}

/// An open trace file for one session.
///
/// Only the owning session writes to it.  [`SessionRecorder::finalize`]
/// consumes the recorder, so the `EOF` line is written at most once.
pub struct SessionRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    failed: bool,
}

impl SessionRecorder {
    /// Creates a new trace file in `dir` and writes its header.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError`] if the file cannot be created or the header
    /// cannot be written.
    pub async fn create(dir: &Path, session_id: Uuid) -> Result<Self, RecorderError> {
        let path = dir.join(recording_file_name(Utc::now(), session_id));

        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| RecorderError::Create {
                path: path.clone(),
                source,
            })?;

        let mut writer = BufWriter::new(file);
        if let Err(source) = write_line(&mut writer, TRACE_HEADER).await {
            return Err(RecorderError::Write { path, source });
        }

        Ok(Self {
            path,
            writer,
            failed: false,
        })
    }

    /// Path of the trace file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one frame.
    ///
    /// After the first write error the recorder stops writing and logs a
    /// single warning.
    pub async fn record(&mut self, direction: Direction, payload: &[u8], elapsed_ms: u64) {
        if self.failed {
            return;
        }
        let line = format_event(direction, elapsed_ms, payload);
        if let Err(e) = write_line(&mut self.writer, &line).await {
            warn!(
                "recording {} failed, no further frames will be recorded: {e}",
                self.path.display()
            );
            self.failed = true;
        }
    }

    /// Writes the terminating `EOF` line and closes the file.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Write`] if the final write or flush fails.
    pub async fn finalize(mut self) -> Result<PathBuf, RecorderError> {
        let result = async {
            self.writer.write_all(TRACE_FOOTER.as_bytes()).await?;
            self.writer.shutdown().await
        }
        .await;

        match result {
            Ok(()) => Ok(self.path),
            Err(source) => Err(RecorderError::Write {
                path: self.path,
                source,
            }),
        }
    }
}

/// Writes and flushes one line so the trace survives a crash mid-session.
async fn write_line(writer: &mut BufWriter<File>, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
