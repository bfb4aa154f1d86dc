//! Common types used throughout ledframe

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bytes per RGB24 pixel
pub const CHANNELS: usize = 3;

/// Frame resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// LED matrix panel: 40 columns, 96 rows
    pub const LED_MATRIX: Self = Self::new(40, 96);

    /// Calculate total pixels
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of one RGB24 frame at this resolution
    pub fn frame_bytes(&self) -> usize {
        self.pixels() * CHANNELS
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::LED_MATRIX
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An RGB24 video frame
///
/// Pixels are stored row-major, row 0 first, each pixel as `R, G, B`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Create a black frame
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * CHANNELS],
            width,
            height,
        }
    }

    /// Create a frame filled with a single colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self {
            data,
            width,
            height,
        }
    }

    /// Wrap existing RGB24 data, checking the buffer length
    pub fn from_data(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(Error::InvalidFrame(format!(
                "{}x{} RGB24 needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get resolution
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Iterate over pixels as `[R, G, B]` slices
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(CHANNELS)
    }

    pub fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        self.data.chunks_exact_mut(CHANNELS)
    }

    /// Pixel at column `x`, row `y`
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[idx..idx + CHANNELS].copy_from_slice(&rgb);
    }

    /// Calculate frame size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Properties of the decoded stream, read once when the source opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// Source frame rate, truncated to whole frames per second
    pub source_fps: u32,
    /// Frame count reported by the container (0 if unknown)
    pub total_frames: u64,
    /// Decoded frame size
    pub resolution: Resolution,
    /// Human-readable name of the source
    pub name: String,
}

impl StreamMetadata {
    pub fn new(source_fps: u32, total_frames: u64, resolution: Resolution) -> Self {
        Self {
            source_fps,
            total_frames,
            resolution,
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Run statistics
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Frames pulled from the source
    pub frames_decoded: u64,
    /// Frames that passed the rate gate
    pub frames_kept: u64,
    /// Frames written to the output
    pub frames_written: u64,
    /// Total bytes written
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led_matrix_frame_bytes() {
        assert_eq!(Resolution::LED_MATRIX.frame_bytes(), 11520);
        assert_eq!(Resolution::LED_MATRIX.to_string(), "40x96");
    }

    #[test]
    fn test_from_data_checks_length() {
        assert!(Frame::from_data(vec![0; 12], 2, 2).is_ok());
        assert!(matches!(
            Frame::from_data(vec![0; 11], 2, 2),
            Err(Error::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_filled_and_pixel_access() {
        let mut frame = Frame::filled(3, 2, [10, 20, 30]);
        assert_eq!(frame.size_bytes(), 18);
        assert_eq!(frame.pixel(2, 1), [10, 20, 30]);
        frame.set_pixel(1, 0, [1, 2, 3]);
        assert_eq!(frame.pixel(1, 0), [1, 2, 3]);
        assert_eq!(&frame.data()[3..6], &[1, 2, 3]);
    }
}
