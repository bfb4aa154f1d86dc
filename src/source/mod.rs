//! Frame sources
//!
//! Provides decoded RGB24 frames in presentation order:
//! - Video files decoded with FFmpeg
//! - Synthetic test patterns

mod file;
mod synthetic;

pub use file::FileSource;
pub use synthetic::{Pattern, SyntheticSource};

use crate::error::Result;
use crate::types::{Frame, StreamMetadata};

/// Trait for sequential frame sources
pub trait FrameSource {
    /// Stream properties, fixed once the source is open
    fn metadata(&self) -> &StreamMetadata;

    /// Next decoded frame, or `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn metadata(&self) -> &StreamMetadata {
        (**self).metadata()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}
