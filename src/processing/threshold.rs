//! Black-level suppression
//!
//! Pixels whose value channel (`max(R, G, B) / 255`) falls below the mode
//! threshold are forced to black. High contrast mode darkens midtones with a
//! gamma curve before the comparison and stretches the surviving pixels.

use crate::config::ModeParams;
use crate::types::Frame;

/// Whether a normalized value counts as black under `params`
#[inline]
pub fn is_dark(value: f32, params: &ModeParams) -> bool {
    let v = match params.value_gamma {
        Some(gamma) => value.powf(gamma),
        None => value,
    };
    v < params.threshold
}

/// Per-pixel black threshold
pub struct BrightnessThresholder {
    params: ModeParams,
    /// Dark decision for every possible value byte
    dark: [bool; 256],
    stretch: Option<[u8; 256]>,
}

impl BrightnessThresholder {
    pub fn new(params: ModeParams) -> Self {
        let mut dark = [false; 256];
        for (v, d) in dark.iter_mut().enumerate() {
            *d = is_dark(v as f32 / 255.0, &params);
        }
        Self {
            params,
            dark,
            stretch: params.pre_mask_stretch.map(|s| s.lut()),
        }
    }

    pub fn params(&self) -> &ModeParams {
        &self.params
    }

    /// Apply the threshold in place
    ///
    /// The mask comes from the incoming pixel; the stretch only changes the
    /// pixels that survive it.
    pub fn apply(&self, frame: &mut Frame) {
        for px in frame.pixels_mut() {
            let v = px[0].max(px[1]).max(px[2]);
            if self.dark[v as usize] {
                px.fill(0);
            } else if let Some(lut) = &self.stretch {
                for c in px.iter_mut() {
                    *c = lut[*c as usize];
                }
            }
        }
    }
}

/// Threshold a frame in place with the given mode parameters
pub fn apply_black_threshold(frame: &mut Frame, params: &ModeParams) {
    BrightnessThresholder::new(*params).apply(frame);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    #[test]
    fn test_normal_boundary_is_strict() {
        let params = Mode::Normal.params();
        assert!(is_dark(0.0999, &params));
        assert!(!is_dark(0.10, &params));
        assert!(!is_dark(0.5, &params));
    }

    #[test]
    fn test_normal_pixels() {
        let params = Mode::Normal.params();
        let mut frame = Frame::new(4, 1);
        frame.set_pixel(0, 0, [25, 10, 3]); // v = 0.098
        frame.set_pixel(1, 0, [3, 26, 10]); // v = 0.102
        frame.set_pixel(2, 0, [200, 100, 50]);
        frame.set_pixel(3, 0, [0, 0, 24]);
        apply_black_threshold(&mut frame, &params);
        assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
        assert_eq!(frame.pixel(1, 0), [3, 26, 10]);
        assert_eq!(frame.pixel(2, 0), [200, 100, 50]);
        assert_eq!(frame.pixel(3, 0), [0, 0, 0]);
    }

    #[test]
    fn test_high_contrast_gamma_boundary() {
        let params = Mode::HighContrast.params();
        // (87/255)^1.5 = 0.1993, (88/255)^1.5 = 0.2027
        assert!(is_dark(87.0 / 255.0, &params));
        assert!(!is_dark(88.0 / 255.0, &params));
        // 0.3 would survive the normal threshold but not the gamma curve
        assert!(is_dark(0.3, &params));
        assert!(!is_dark(0.3, &Mode::Normal.params()));
    }

    #[test]
    fn test_high_contrast_stretches_survivors() {
        let params = Mode::HighContrast.params();
        let mut frame = Frame::new(3, 1);
        frame.set_pixel(0, 0, [87, 40, 10]);
        frame.set_pixel(1, 0, [100, 10, 200]);
        frame.set_pixel(2, 0, [88, 88, 88]);
        apply_black_threshold(&mut frame, &params);
        assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
        // 10 * 1.4 - 20 clamps to 0, 200 * 1.4 - 20 clamps to 255
        assert_eq!(frame.pixel(1, 0), [120, 0, 255]);
        // 88 * 1.4 - 20 = 103.2
        assert_eq!(frame.pixel(2, 0), [103, 103, 103]);
    }

    #[test]
    fn test_black_frame_is_fixed_point() {
        for mode in [Mode::Normal, Mode::HighContrast] {
            let thresholder = BrightnessThresholder::new(mode.params());
            let mut frame = Frame::new(40, 96);
            thresholder.apply(&mut frame);
            thresholder.apply(&mut frame);
            assert_eq!(frame, Frame::new(40, 96));
        }
    }
}
