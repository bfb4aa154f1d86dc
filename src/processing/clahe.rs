//! Contrast-limited adaptive histogram equalization on a single 8-bit plane

const BINS: usize = 256;

/// CLAHE settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    /// Clip limit, relative to a flat histogram
    pub clip_limit: f32,
    /// Tiles across
    pub tiles_x: usize,
    /// Tiles down
    pub tiles_y: usize,
}

impl Clahe {
    pub fn new(clip_limit: f32, tiles_x: u32, tiles_y: u32) -> Self {
        Self {
            clip_limit,
            tiles_x: tiles_x.max(1) as usize,
            tiles_y: tiles_y.max(1) as usize,
        }
    }

    /// Equalize `plane` (row-major, `width * height` bytes) in place
    pub fn apply(&self, plane: &mut [u8], width: usize, height: usize) {
        if width == 0 || height == 0 {
            return;
        }
        debug_assert_eq!(plane.len(), width * height);

        // Tiles cover the image padded up to a multiple of the grid
        let tile_w = width.div_ceil(self.tiles_x);
        let tile_h = height.div_ceil(self.tiles_y);
        let tile_area = tile_w * tile_h;

        let luts = self.tile_luts(plane, width, height, tile_w, tile_h, tile_area);

        let xs: Vec<Blend> = (0..width)
            .map(|x| Blend::new(x, tile_w, self.tiles_x))
            .collect();

        for y in 0..height {
            let by = Blend::new(y, tile_h, self.tiles_y);
            let row = &mut plane[y * width..(y + 1) * width];
            for (px, bx) in row.iter_mut().zip(&xs) {
                let v = *px as usize;
                let lut = |tx: usize, ty: usize| luts[ty * self.tiles_x + tx][v] as f32;
                let top = lut(bx.t0, by.t0) * bx.w0 + lut(bx.t1, by.t0) * bx.w1;
                let bottom = lut(bx.t0, by.t1) * bx.w0 + lut(bx.t1, by.t1) * bx.w1;
                *px = (top * by.w0 + bottom * by.w1).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    /// Bin count at which a tile histogram is clipped
    pub fn clip_count(&self, tile_area: usize) -> u32 {
        if self.clip_limit <= 0.0 {
            return u32::MAX;
        }
        ((self.clip_limit * tile_area as f32 / BINS as f32) as u32).max(1)
    }

    fn tile_luts(
        &self,
        plane: &[u8],
        width: usize,
        height: usize,
        tile_w: usize,
        tile_h: usize,
        tile_area: usize,
    ) -> Vec<[u8; BINS]> {
        let clip = self.clip_count(tile_area);
        let scale = (BINS - 1) as f32 / tile_area as f32;
        let mut luts = Vec::with_capacity(self.tiles_x * self.tiles_y);

        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                let mut hist = [0u32; BINS];
                for y in ty * tile_h..(ty + 1) * tile_h {
                    let sy = reflect_101(y, height);
                    for x in tx * tile_w..(tx + 1) * tile_w {
                        let sx = reflect_101(x, width);
                        hist[plane[sy * width + sx] as usize] += 1;
                    }
                }

                clip_histogram(&mut hist, clip);

                let mut lut = [0u8; BINS];
                let mut sum = 0u32;
                for (out, &count) in lut.iter_mut().zip(hist.iter()) {
                    sum += count;
                    *out = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
                }
                luts.push(lut);
            }
        }

        luts
    }
}

/// Clip bins at `clip` and hand the excess back evenly
fn clip_histogram(hist: &mut [u32; BINS], clip: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    if excess == 0 {
        return;
    }

    let batch = excess / BINS as u32;
    let mut residual = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

/// Mirror an index past the end without repeating the edge sample
fn reflect_101(i: usize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = i % period;
    if m < len {
        m
    } else {
        period - m
    }
}

/// Neighbouring tiles and weights along one axis
#[derive(Debug, Clone, Copy)]
struct Blend {
    t0: usize,
    t1: usize,
    w0: f32,
    w1: f32,
}

impl Blend {
    fn new(pos: usize, tile_len: usize, tiles: usize) -> Self {
        let f = pos as f32 / tile_len as f32 - 0.5;
        let fl = f.floor();
        let w1 = f - fl;
        let t0 = fl as isize;
        let t1 = t0 + 1;
        Self {
            t0: t0.max(0) as usize,
            t1: (t1 as usize).min(tiles - 1),
            w0: 1.0 - w1,
            w1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_count() {
        // 40x96 frame in a 2x2 grid -> 20x48 tiles
        assert_eq!(Clahe::new(2.0, 2, 2).clip_count(960), 7);
        assert_eq!(Clahe::new(3.0, 2, 2).clip_count(960), 11);
        assert_eq!(Clahe::new(0.01, 2, 2).clip_count(960), 1);
    }

    #[test]
    fn test_clip_histogram_conserves_mass() {
        let mut hist = [0u32; BINS];
        hist[137] = 960;
        clip_histogram(&mut hist, 7);
        assert_eq!(hist.iter().sum::<u32>(), 960);
        // 953 excess: 3 per bin, 185 leftover spread one per bin from 0
        assert_eq!(hist[0], 4);
        assert_eq!(hist[137], 11);
        assert_eq!(hist[184], 4);
        assert_eq!(hist[185], 3);
    }

    #[test]
    fn test_uniform_plane_maps_to_single_value() {
        let clahe = Clahe::new(2.0, 2, 2);
        let mut plane = vec![137u8; 40 * 96];
        clahe.apply(&mut plane, 40, 96);
        // cumulative count up to bin 137 is 559, 559 * 255 / 960 = 148.48
        assert!(plane.iter().all(|&v| v == 148));
    }

    #[test]
    fn test_spreads_low_contrast_ramp() {
        let clahe = Clahe::new(3.0, 2, 2);
        let mut plane: Vec<u8> = (0..40 * 96).map(|i| 100 + (i % 40) as u8 / 4).collect();
        let before_span = 9;
        clahe.apply(&mut plane, 40, 96);
        let min = *plane.iter().min().unwrap();
        let max = *plane.iter().max().unwrap();
        assert!(max - min > before_span);
    }

    #[test]
    fn test_non_divisible_size() {
        let clahe = Clahe::new(2.0, 2, 2);
        let mut plane: Vec<u8> = (0..7 * 5).map(|i| (i * 7) as u8).collect();
        clahe.apply(&mut plane, 7, 5);
        assert_eq!(plane.len(), 35);
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(0, 5), 0);
        assert_eq!(reflect_101(4, 5), 4);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 1), 0);
    }
}
