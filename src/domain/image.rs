// ============================================================
// Layer 3 — NormalizedImage Domain Type
// ============================================================
// One scan after the full preprocessing pipeline:
//
//   DICOM pixels → VOI LUT → min-max [0,1] → resize → 3 channels
//
// Pixels are stored height × width × channels (HWC), which is the
// layout the preprocessing code works in. The batcher converts to
// Burn's channels-first layout when building tensors.

use ndarray::{Array3, Axis};
use std::path::PathBuf;

/// Number of channels every normalized image carries.
/// The single grayscale channel is replicated so the model sees
/// the conventional RGB-shaped input.
pub const CHANNELS: usize = 3;

/// Spatial size of a normalized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageSize {
    pub height: usize,
    pub width:  usize,
}

impl ImageSize {
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Square size, e.g. `ImageSize::square(224)` for 224×224.
    pub const fn square(side: usize) -> Self {
        Self::new(side, side)
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::square(224)
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// A preprocessed scan ready to be batched.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// The file this image was read from
    pub source: PathBuf,

    /// Shape: [height, width, 3], values in [0, 1]
    pub pixels: Array3<f32>,
}

impl NormalizedImage {
    pub fn new(source: impl Into<PathBuf>, pixels: Array3<f32>) -> Self {
        debug_assert_eq!(pixels.dim().2, CHANNELS);
        Self { source: source.into(), pixels }
    }

    pub fn size(&self) -> ImageSize {
        let (height, width, _) = self.pixels.dim();
        ImageSize::new(height, width)
    }

    pub fn min(&self) -> f32 {
        self.pixels.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max(&self) -> f32 {
        self.pixels.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn mean(&self) -> f32 {
        self.pixels.mean().unwrap_or(0.0)
    }

    /// True when all three channels hold the same values.
    pub fn channels_identical(&self) -> bool {
        let first = self.pixels.index_axis(Axis(2), 0);
        (1..CHANNELS).all(|c| self.pixels.index_axis(Axis(2), c) == first)
    }

    /// Pixel values flattened channels-first: [3, height, width].
    pub fn to_chw_vec(&self) -> Vec<f32> {
        let mut chw = self.pixels.view();
        chw.swap_axes(0, 2); // [c, w, h]
        chw.swap_axes(1, 2); // [c, h, w]
        chw.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_chw_layout() {
        // 1x2 image where channel c of pixel (0, x) = 10*c + x
        let pixels = Array3::from_shape_fn((1, 2, 3), |(_, x, c)| (10 * c + x) as f32);
        let img    = NormalizedImage::new("a.dcm", pixels);
        assert_eq!(img.to_chw_vec(), vec![0.0, 1.0, 10.0, 11.0, 20.0, 21.0]);
    }

    #[test]
    fn test_channels_identical() {
        let same = NormalizedImage::new("a.dcm", Array3::from_elem((2, 2, 3), 0.5));
        assert!(same.channels_identical());

        let mut pixels = Array3::from_elem((2, 2, 3), 0.5);
        pixels[[0, 0, 2]] = 0.1;
        assert!(!NormalizedImage::new("b.dcm", pixels).channels_identical());
    }

    #[test]
    fn test_size_and_stats() {
        let mut pixels = Array3::zeros((4, 6, 3));
        pixels[[1, 1, 0]] = 1.0;
        let img = NormalizedImage::new("c.dcm", pixels);
        assert_eq!(img.size(), ImageSize::new(4, 6));
        assert_eq!(img.min(), 0.0);
        assert_eq!(img.max(), 1.0);
        assert_eq!(ImageSize::default(), ImageSize::square(224));
    }
}
