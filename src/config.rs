//! Configuration types for ledframe

use crate::error::{Error, Result};
use crate::types::Resolution;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output frame rate of the LED display
pub const TARGET_FPS: u32 = 30;

/// Kept frames between progress reports
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 30;

/// Linear channel stretch: `clamp(round(v * alpha + beta), 0, 255)`
///
/// Evaluated in double precision, ties to even.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearStretch {
    pub alpha: f64,
    pub beta: f64,
}

impl LinearStretch {
    pub const fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    #[inline]
    pub fn apply(&self, v: u8) -> u8 {
        (v as f64 * self.alpha + self.beta)
            .round_ties_even()
            .clamp(0.0, 255.0) as u8
    }

    /// Precomputed lookup table for all 256 inputs
    pub fn lut(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        for (i, out) in lut.iter_mut().enumerate() {
            *out = self.apply(i as u8);
        }
        lut
    }
}

/// Tone mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Plain black suppression and mild equalization
    #[default]
    Normal,
    /// Darker blacks, stronger equalization and stretch
    HighContrast,
}

impl Mode {
    /// Parameter set for this mode
    pub fn params(&self) -> ModeParams {
        match self {
            Mode::Normal => ModeParams {
                threshold: 0.10,
                value_gamma: None,
                pre_mask_stretch: None,
                clip_limit: 2.0,
                tile_grid: (2, 2),
                post_equalize_stretch: None,
            },
            Mode::HighContrast => ModeParams {
                threshold: 0.20,
                value_gamma: Some(1.5),
                pre_mask_stretch: Some(LinearStretch::new(1.4, -20.0)),
                clip_limit: 3.0,
                tile_grid: (2, 2),
                post_equalize_stretch: Some(LinearStretch::new(1.3, -10.0)),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::HighContrast => "high_contrast",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric policy shared by the threshold and contrast stages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeParams {
    /// Normalized value below which a pixel is blacked out
    pub threshold: f32,
    /// Exponent applied to the value channel before thresholding
    pub value_gamma: Option<f32>,
    /// Channel stretch applied before the dark mask is written
    pub pre_mask_stretch: Option<LinearStretch>,
    /// CLAHE clip limit
    pub clip_limit: f32,
    /// CLAHE tiles (columns, rows)
    pub tile_grid: (u32, u32),
    /// Lightness stretch applied after equalization
    pub post_equalize_stretch: Option<LinearStretch>,
}

/// Conversion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Tone mode
    pub mode: Mode,
    /// Transform worker threads (1 = run inline)
    pub workers: usize,
    /// Kept frames between progress reports
    pub progress_interval: u64,
    /// Directory receiving `<name>.bin`
    pub output_dir: PathBuf,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            workers: default_workers(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            output_dir: PathBuf::from("media"),
        }
    }
}

impl ConvertConfig {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_high_contrast(mut self, enabled: bool) -> Self {
        if enabled {
            self.mode = Mode::HighContrast;
        }
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Output frame rate, fixed by the display
    pub fn target_fps(&self) -> u32 {
        TARGET_FPS
    }

    /// Output resolution, fixed by the display
    pub fn resolution(&self) -> Resolution {
        Resolution::LED_MATRIX
    }

    /// Parameter set of the configured mode
    pub fn params(&self) -> ModeParams {
        self.mode.params()
    }

    /// Path of the binary stream for an output name
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.bin", name))
    }

    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ConvertConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".into()));
        }
        Ok(())
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
