//! sRGB <-> CIE L*a*b* conversion in the 8-bit encoding
//!
//! `L` is scaled to `0..=255` (`L * 255 / 100`), `a` and `b` are offset by 128.
//! White point is D65. Every output channel is rounded and clamped to `0..=255`.

use crate::types::{Frame, CHANNELS};

const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;

const RGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

const XYZ_TO_RGB: [[f32; 3]; 3] = [
    [3.240479, -1.53715, -0.498535],
    [-0.969256, 1.875991, 0.041556],
    [0.055648, -0.204043, 1.057311],
];

const EPSILON: f32 = 0.008856;
const KAPPA: f32 = 903.3;
const F_OFFSET: f32 = 16.0 / 116.0;
const F_SLOPE: f32 = 7.787;
/// `L` at which the cube-root segment takes over
const L_KNEE: f32 = 7.999_625;
/// `f(EPSILON)`
const F_KNEE: f32 = 0.206_893;

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        F_SLOPE * t + F_OFFSET
    }
}

#[inline]
fn lab_f_inv(f: f32) -> f32 {
    if f <= F_KNEE {
        (f - F_OFFSET) / F_SLOPE
    } else {
        f * f * f
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Linearized value of every sRGB byte
fn linear_table() -> [f32; 256] {
    let mut table = [0.0f32; 256];
    for (i, v) in table.iter_mut().enumerate() {
        *v = srgb_to_linear(i as f32 / 255.0);
    }
    table
}

/// Pixel-level converter with a cached linearization table
pub struct LabConverter {
    linear: [f32; 256],
}

impl LabConverter {
    pub fn new() -> Self {
        Self {
            linear: linear_table(),
        }
    }

    /// One RGB pixel to 8-bit `[L, a, b]`
    pub fn rgb_to_lab(&self, rgb: [u8; 3]) -> [u8; 3] {
        let r = self.linear[rgb[0] as usize];
        let g = self.linear[rgb[1] as usize];
        let b = self.linear[rgb[2] as usize];

        let m = &RGB_TO_XYZ;
        let x = (m[0][0] * r + m[0][1] * g + m[0][2] * b) / XN;
        let y = m[1][0] * r + m[1][1] * g + m[1][2] * b;
        let z = (m[2][0] * r + m[2][1] * g + m[2][2] * b) / ZN;

        let fx = lab_f(x);
        let fy = lab_f(y);
        let fz = lab_f(z);

        let l = if y > EPSILON { 116.0 * fy - 16.0 } else { KAPPA * y };
        let a = 500.0 * (fx - fy);
        let bb = 200.0 * (fy - fz);

        [to_u8(l * 255.0 / 100.0), to_u8(a + 128.0), to_u8(bb + 128.0)]
    }

    /// One 8-bit `[L, a, b]` pixel back to RGB
    pub fn lab_to_rgb(&self, lab: [u8; 3]) -> [u8; 3] {
        let l = lab[0] as f32 * 100.0 / 255.0;
        let a = lab[1] as f32 - 128.0;
        let b = lab[2] as f32 - 128.0;

        let (y, fy) = if l <= L_KNEE {
            let y = l / KAPPA;
            (y, F_SLOPE * y + F_OFFSET)
        } else {
            let fy = (l + 16.0) / 116.0;
            (fy * fy * fy, fy)
        };
        let x = lab_f_inv(fy + a / 500.0) * XN;
        let z = lab_f_inv(fy - b / 200.0) * ZN;

        let m = &XYZ_TO_RGB;
        let mut out = [0u8; 3];
        for (c, row) in out.iter_mut().zip(m.iter()) {
            let lin = (row[0] * x + row[1] * y + row[2] * z).clamp(0.0, 1.0);
            *c = to_u8(linear_to_srgb(lin) * 255.0);
        }
        out
    }

    /// Split a frame into planar L, a and b channels
    pub fn split(&self, frame: &Frame) -> [Vec<u8>; 3] {
        let n = frame.size_bytes() / CHANNELS;
        let mut planes = [Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n)];
        for px in frame.pixels() {
            let lab = self.rgb_to_lab([px[0], px[1], px[2]]);
            for (plane, v) in planes.iter_mut().zip(lab) {
                plane.push(v);
            }
        }
        planes
    }

    /// Recombine planar L, a and b channels into the frame's RGB buffer
    pub fn merge_into(&self, planes: &[Vec<u8>; 3], frame: &mut Frame) {
        for (i, px) in frame.pixels_mut().enumerate() {
            let rgb = self.lab_to_rgb([planes[0][i], planes[1][i], planes[2][i]]);
            px.copy_from_slice(&rgb);
        }
    }
}

impl Default for LabConverter {
    fn default() -> Self {
        Self::new()
    }
}
