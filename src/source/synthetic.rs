//! Synthetic frame source

use crate::error::{Error, Result};
use crate::types::{Frame, Resolution, StreamMetadata};

use super::FrameSource;

/// Picture drawn into every synthetic frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Every pixel the same colour
    Solid([u8; 3]),
    /// Diagonal gradient that scrolls one step per frame
    Gradient,
}

/// Generates a fixed number of frames without decoding anything
pub struct SyntheticSource {
    metadata: StreamMetadata,
    pattern: Pattern,
    emitted: u64,
    /// Report a decode failure instead of this frame index
    fail_at: Option<u64>,
}

impl SyntheticSource {
    pub fn new(fps: u32, frames: u64, resolution: Resolution, pattern: Pattern) -> Self {
        Self {
            metadata: StreamMetadata::new(fps, frames, resolution).with_name("synthetic"),
            pattern,
            emitted: 0,
            fail_at: None,
        }
    }

    /// Uniform colour stream
    pub fn solid(fps: u32, frames: u64, resolution: Resolution, rgb: [u8; 3]) -> Self {
        Self::new(fps, frames, resolution, Pattern::Solid(rgb))
    }

    /// Simulate a corrupt stream that breaks at `index`
    pub fn with_decode_error_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }

    fn render(&self, index: u64) -> Frame {
        let res = self.metadata.resolution;
        match self.pattern {
            Pattern::Solid(rgb) => Frame::filled(res.width, res.height, rgb),
            Pattern::Gradient => {
                let mut frame = Frame::new(res.width, res.height);
                let shift = index as u32;
                for y in 0..res.height {
                    for x in 0..res.width {
                        let v = ((x + y + shift) % 256) as u8;
                        frame.set_pixel(x, y, [v, v.wrapping_mul(3), 255 - v]);
                    }
                }
                frame
            }
        }
    }
}

impl FrameSource for SyntheticSource {
    fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.emitted >= self.metadata.total_frames {
            return Ok(None);
        }
        if self.fail_at == Some(self.emitted) {
            return Err(Error::Decode(format!(
                "synthetic decode failure at frame {}",
                self.emitted
            )));
        }
        let frame = self.render(self.emitted);
        self.emitted += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emits_exact_count() {
        let mut source = SyntheticSource::solid(60, 3, Resolution::new(8, 4), [1, 2, 3]);
        let mut n = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.pixel(7, 3), [1, 2, 3]);
            n += 1;
        }
        assert_eq!(n, 3);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_gradient_moves() {
        let mut source = SyntheticSource::new(30, 2, Resolution::new(16, 16), Pattern::Gradient);
        let a = source.next_frame().unwrap().unwrap();
        let b = source.next_frame().unwrap().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_decode_error() {
        let mut source =
            SyntheticSource::solid(30, 5, Resolution::new(2, 2), [9, 9, 9]).with_decode_error_at(1);
        assert!(source.next_frame().unwrap().is_some());
        assert!(matches!(source.next_frame(), Err(Error::Decode(_))));
    }
}
