//! Frame scaling

use crate::error::{Error, Result};
use crate::types::{Frame, Resolution, CHANNELS};

/// Source taps for one output coordinate
#[derive(Debug, Clone, Copy)]
struct Tap {
    i0: usize,
    i1: usize,
    w1: f32,
}

/// Bilinear frame scaler with a fixed output resolution
pub struct Scaler {
    target: Resolution,
}

impl Scaler {
    pub fn new(target: Resolution) -> Self {
        Self { target }
    }

    pub fn target(&self) -> Resolution {
        self.target
    }

    /// Scale a frame to the target resolution
    pub fn scale(&self, frame: &Frame) -> Result<Frame> {
        let data = scale_frame(
            frame.data(),
            frame.width(),
            frame.height(),
            self.target.width,
            self.target.height,
        )?;
        Frame::from_data(data, self.target.width, self.target.height)
    }
}

impl Default for Scaler {
    fn default() -> Self {
        Self::new(Resolution::LED_MATRIX)
    }
}

/// Map each destination index onto the source axis (half-pixel centres)
fn taps(src_len: usize, dst_len: usize) -> Vec<Tap> {
    let scale = src_len as f32 / dst_len as f32;
    let last = src_len - 1;
    (0..dst_len)
        .map(|d| {
            let pos = (d as f32 + 0.5) * scale - 0.5;
            let floor = pos.floor();
            let frac = pos - floor;
            if floor < 0.0 {
                Tap { i0: 0, i1: 0, w1: 0.0 }
            } else if floor as usize >= last {
                Tap { i0: last, i1: last, w1: 0.0 }
            } else {
                let i0 = floor as usize;
                Tap { i0, i1: i0 + 1, w1: frac }
            }
        })
        .collect()
}

/// Bilinear scale of RGB24 frame data
pub fn scale_frame(
    input: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Result<Vec<u8>> {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(Error::InvalidFrame(format!(
            "Cannot scale {}x{} to {}x{}",
            src_width, src_height, dst_width, dst_height
        )));
    }

    let src_w = src_width as usize;
    let src_h = src_height as usize;
    let dst_w = dst_width as usize;
    let dst_h = dst_height as usize;

    if input.len() < src_w * src_h * CHANNELS {
        return Err(Error::InvalidFrame("Input buffer too small".into()));
    }

    if src_w == dst_w && src_h == dst_h {
        return Ok(input[..src_w * src_h * CHANNELS].to_vec());
    }

    let xs = taps(src_w, dst_w);
    let ys = taps(src_h, dst_h);
    let mut output = vec![0u8; dst_w * dst_h * CHANNELS];

    for (y, ty) in ys.iter().enumerate() {
        let row0 = &input[ty.i0 * src_w * CHANNELS..(ty.i0 + 1) * src_w * CHANNELS];
        let row1 = &input[ty.i1 * src_w * CHANNELS..(ty.i1 + 1) * src_w * CHANNELS];
        let wy1 = ty.w1;
        let wy0 = 1.0 - wy1;

        for (x, tx) in xs.iter().enumerate() {
            let wx1 = tx.w1;
            let wx0 = 1.0 - wx1;
            let a = tx.i0 * CHANNELS;
            let b = tx.i1 * CHANNELS;
            let dst = (y * dst_w + x) * CHANNELS;

            for c in 0..CHANNELS {
                let top = row0[a + c] as f32 * wx0 + row0[b + c] as f32 * wx1;
                let bottom = row1[a + c] as f32 * wx0 + row1[b + c] as f32 * wx1;
                let v = top * wy0 + bottom * wy1;
                output[dst + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut frame = Frame::new(width, height);
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(x, y, [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]);
            }
        }
        frame
    }

    #[test]
    fn test_full_hd_to_led_matrix() {
        let scaler = Scaler::default();
        let out = scaler.scale(&gradient(1920, 1080)).unwrap();
        assert_eq!(out.width(), 40);
        assert_eq!(out.height(), 96);
        assert_eq!(out.size_bytes(), 11520);
    }

    #[test]
    fn test_upscale_small_input() {
        let out = Scaler::default().scale(&gradient(3, 2)).unwrap();
        assert_eq!(out.resolution(), Resolution::LED_MATRIX);
    }

    #[test]
    fn test_deterministic() {
        let scaler = Scaler::default();
        let src = gradient(640, 360);
        let a = scaler.scale(&src).unwrap();
        let b = scaler.scale(&src).unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_uniform_colour_preserved() {
        let out = Scaler::default()
            .scale(&Frame::filled(333, 77, [128, 64, 7]))
            .unwrap();
        assert!(out.pixels().all(|px| px == [128, 64, 7]));
    }

    #[test]
    fn test_exact_halving_averages_pairs() {
        // 4x1 -> 2x1: sample points fall exactly between source pixels
        let src = Frame::from_data(vec![0, 0, 0, 100, 100, 100, 200, 200, 200, 250, 250, 250], 4, 1)
            .unwrap();
        let out = scale_frame(src.data(), 4, 1, 2, 1).unwrap();
        assert_eq!(out, vec![50, 50, 50, 225, 225, 225]);
    }

    #[test]
    fn test_rejects_short_buffer() {
        assert!(scale_frame(&[0; 5], 2, 1, 1, 1).is_err());
    }
}
