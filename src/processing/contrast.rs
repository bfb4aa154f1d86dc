//! Local contrast enhancement on the lightness channel

use super::clahe::Clahe;
use super::color::LabConverter;
use crate::config::ModeParams;
use crate::types::Frame;

/// CLAHE on L*, chroma untouched, optional lightness stretch
pub struct ContrastEnhancer {
    clahe: Clahe,
    stretch: Option<[u8; 256]>,
    lab: LabConverter,
}

impl ContrastEnhancer {
    pub fn new(params: &ModeParams) -> Self {
        let (tiles_x, tiles_y) = params.tile_grid;
        Self {
            clahe: Clahe::new(params.clip_limit, tiles_x, tiles_y),
            stretch: params.post_equalize_stretch.map(|s| s.lut()),
            lab: LabConverter::new(),
        }
    }

    /// Enhance a frame in place
    pub fn apply(&self, frame: &mut Frame) {
        let width = frame.width() as usize;
        let height = frame.height() as usize;

        let mut planes = self.lab.split(frame);
        self.clahe.apply(&mut planes[0], width, height);
        if let Some(lut) = &self.stretch {
            for l in planes[0].iter_mut() {
                *l = lut[*l as usize];
            }
        }
        self.lab.merge_into(&planes, frame);
    }
}
