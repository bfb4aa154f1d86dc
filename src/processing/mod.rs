//! Frame processing module
//!
//! The per-frame transform chain for the LED panel:
//! - Black-level suppression
//! - Resolution scaling
//! - Local contrast enhancement

pub mod clahe;
pub mod color;
mod contrast;
mod scale;
mod threshold;

pub use contrast::ContrastEnhancer;
pub use scale::{scale_frame, Scaler};
pub use threshold::{apply_black_threshold, is_dark, BrightnessThresholder};

use crate::config::ConvertConfig;
use crate::error::Result;
use crate::types::Frame;

/// Threshold, scale and enhance, in that order
///
/// Stateless apart from precomputed tables, so one instance can be shared
/// across worker threads.
pub struct FrameProcessor {
    thresholder: BrightnessThresholder,
    scaler: Scaler,
    enhancer: ContrastEnhancer,
}

impl FrameProcessor {
    pub fn new(config: &ConvertConfig) -> Self {
        let params = config.params();
        Self {
            thresholder: BrightnessThresholder::new(params),
            scaler: Scaler::new(config.resolution()),
            enhancer: ContrastEnhancer::new(&params),
        }
    }

    /// Process a decoded RGB24 frame into an output-ready frame
    pub fn process(&self, mut frame: Frame) -> Result<Frame> {
        self.thresholder.apply(&mut frame);
        let mut scaled = self.scaler.scale(&frame)?;
        self.enhancer.apply(&mut scaled);
        Ok(scaled)
    }
}

/// Process a single frame with a one-off processor
pub fn process_frame(frame: Frame, config: &ConvertConfig) -> Result<Frame> {
    FrameProcessor::new(config).process(frame)
}
