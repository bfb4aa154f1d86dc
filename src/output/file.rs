//! File output
//!
//! Writes frames to a headerless `.bin` stream, one `write_all` per frame.

use crate::error::{Error, Result};
use crate::types::{Frame, Resolution};
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{check_frame, OutputSink};

/// Binary frame stream on disk
pub struct BinaryFileOutput {
    path: PathBuf,
    resolution: Resolution,
    file: Option<File>,
    bytes_written: u64,
    frame_count: u64,
}

impl BinaryFileOutput {
    /// Create (or truncate) the output file, creating its directory if needed
    pub fn create(path: impl Into<PathBuf>, resolution: Resolution) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::OutputInit(format!("Failed to create directory {}: {}", parent.display(), e))
                })?;
            }
        }

        let file = File::create(&path).map_err(|e| {
            Error::OutputInit(format!("Failed to create {}: {}", path.display(), e))
        })?;

        tracing::info!("File output initialized: {} ({} RGB24)", path.display(), resolution);

        Ok(Self {
            path,
            resolution,
            file: Some(file),
            bytes_written: 0,
            frame_count: 0,
        })
    }

    /// Get the output path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Storage that can be cut back to a given length
trait Truncate {
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Append one frame at `committed`, leaving the stream at that boundary if
/// the write fails part way
fn append_frame<W>(out: &mut W, data: &[u8], committed: u64) -> io::Result<()>
where
    W: Write + Seek + Truncate,
{
    let result = out.write_all(data);
    if result.is_err() {
        if let Err(e) = rollback(out, committed) {
            tracing::error!("Failed to roll back partial frame: {}", e);
        }
    }
    result
}

/// Cut back to the last complete frame and continue writing from there
fn rollback<W: Seek + Truncate>(out: &mut W, committed: u64) -> io::Result<()> {
    out.truncate_to(committed)?;
    out.seek(SeekFrom::Start(committed))?;
    Ok(())
}

impl OutputSink for BinaryFileOutput {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        check_frame(frame, self.resolution)?;

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::FileOutput("Output already finished".into()))?;

        if let Err(e) = append_frame(file, frame.data(), self.bytes_written) {
            return Err(Error::FileOutput(format!(
                "Failed to write frame {}: {}",
                self.frame_count, e
            )));
        }

        self.frame_count += 1;
        self.bytes_written += frame.size_bytes() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        file.flush()
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::FileOutput(format!("Failed to flush: {}", e)))?;

        tracing::info!(
            "File output finished: {} ({} frames, {} bytes, {:.2} MB)",
            self.path.display(),
            self.frame_count,
            self.bytes_written,
            self.bytes_written as f64 / 1_000_000.0
        );
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn frames_written(&self) -> u64 {
        self.frame_count
    }
}
