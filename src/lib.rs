//! ledframe: video to LED matrix frame stream
//!
//! Converts a video into a flat RGB24 stream for a 40x96 LED panel at 30 fps.
//!
//! # Features
//!
//! - **Rate**: decimates the source to roughly 30 fps
//! - **Black level**: suppresses dim pixels, with an optional high contrast mode
//! - **Scale**: bilinear resize to the panel resolution
//! - **Contrast**: CLAHE on L*a*b* lightness
//! - **Output**: headerless `.bin` stream, 11520 bytes per frame
//!
//! # Example
//!
//! ```rust,no_run
//! use ledframe::{ConvertConfig, Mode, Pipeline};
//! use std::path::Path;
//!
//! fn main() -> ledframe::Result<()> {
//!     let config = ConvertConfig::default()
//!         .with_mode(Mode::HighContrast)
//!         .with_output_dir("media");
//!
//!     let mut pipeline = Pipeline::new(config);
//!     let summary = pipeline.convert_file(Path::new("intro.mov"), None)?;
//!     println!("{} frames written", summary.stats.frames_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod source;
pub mod types;

// Re-exports for convenience
pub use config::{ConvertConfig, Mode, ModeParams, TARGET_FPS};
pub use error::{Error, Result};
pub use output::{BinaryFileOutput, MemoryOutput, OutputSink};
pub use pipeline::{Pipeline, PipelineState, RateDecimator, RunSummary};
pub use processing::FrameProcessor;
pub use source::{FileSource, FrameSource, SyntheticSource};
pub use types::{Frame, Resolution, StreamMetadata};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
