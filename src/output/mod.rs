//! Output module
//!
//! Serializes finished frames as a flat RGB24 stream:
//! - Binary file (`<name>.bin`)
//! - In-memory buffer (tests, previews)
//!
//! Each frame is written as one unit, so the stream length is always a
//! multiple of the frame size.

mod file;

pub use file::BinaryFileOutput;

use crate::error::{Error, Result};
use crate::types::{Frame, Resolution};

/// Trait for frame sinks
pub trait OutputSink {
    /// Append one frame
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close
    fn finish(&mut self) -> Result<()>;

    /// Total bytes written
    fn bytes_written(&self) -> u64;

    /// Whole frames written
    fn frames_written(&self) -> u64;
}

/// Reject frames that do not match the stream layout
pub(crate) fn check_frame(frame: &Frame, expected: Resolution) -> Result<()> {
    if frame.resolution() != expected || frame.size_bytes() != expected.frame_bytes() {
        return Err(Error::InvalidFrame(format!(
            "expected {} RGB24 frame, got {} ({} bytes)",
            expected,
            frame.resolution(),
            frame.size_bytes()
        )));
    }
    Ok(())
}

/// Collects the stream in memory
#[derive(Debug, Default)]
pub struct MemoryOutput {
    resolution: Resolution,
    buffer: Vec<u8>,
    frames: u64,
    finished: bool,
}

impl MemoryOutput {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl OutputSink for MemoryOutput {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        check_frame(frame, self.resolution)?;
        self.buffer.extend_from_slice(frame.data());
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_output_appends_raw_bytes() {
        let mut out = MemoryOutput::new(Resolution::new(2, 1));
        out.write_frame(&Frame::from_data(vec![1, 2, 3, 4, 5, 6], 2, 1).unwrap())
            .unwrap();
        out.write_frame(&Frame::filled(2, 1, [7, 8, 9])).unwrap();
        assert_eq!(out.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 7, 8, 9]);
        assert_eq!(out.frames_written(), 2);
        assert_eq!(out.bytes_written(), 12);
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let mut out = MemoryOutput::new(Resolution::LED_MATRIX);
        assert!(out.write_frame(&Frame::new(96, 40)).is_err());
        assert_eq!(out.bytes_written(), 0);
        out.write_frame(&Frame::new(40, 96)).unwrap();
        assert_eq!(out.bytes_written() % 11520, 0);
    }
}
