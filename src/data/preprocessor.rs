// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns the raw pixel grid of one DICOM file into a model-ready
// NormalizedImage.
//
// Steps (applied in order):
//   1. VOI LUT      — the file's display transform (window or table)
//   2. Normalise    — (x - min) / (max - min) over the whole image
//   3. Resize       — Gaussian anti-aliasing + bilinear sampling,
//                     edges reflected (d c b | a b c d | c b a)
//   4. Channels     — grayscale replicated into 3 identical channels
//
// Step 2 is fallible: a constant image has max == min, so the
// division is undefined. The DegeneratePolicy decides whether such
// an image is skipped, replaced by zeros, or aborts the run.
//
// Window formulas follow DICOM PS3.3 C.11.2.1.2 with the output
// range fixed to [0, 1]; the absolute range is irrelevant because
// min-max normalisation follows.

use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::error::{ScanError, ScanResult};
use crate::domain::image::{ImageSize, NormalizedImage, CHANNELS};

/// Gaussian kernels are truncated at this many standard deviations.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

// ─── VOI LUT ──────────────────────────────────────────────────────────────────

/// Shape of the window function, from the VOI LUT Function attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiFunction {
    Linear,
    LinearExact,
    Sigmoid,
}

impl VoiFunction {
    /// Parse the attribute value; unknown or missing values mean LINEAR.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_uppercase()) {
            Some(v) if v == "LINEAR_EXACT" => Self::LinearExact,
            Some(v) if v == "SIGMOID"      => Self::Sigmoid,
            _                              => Self::Linear,
        }
    }
}

/// The display lookup transform embedded in a DICOM file.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiTransform {
    Identity,
    Window {
        center:   f64,
        width:    f64,
        function: VoiFunction,
    },
    /// Explicit lookup table from the VOI LUT Sequence.
    Table {
        first_mapped: f64,
        entries:      Vec<f32>,
    },
}

impl VoiTransform {
    /// Build a window transform, falling back to identity when the
    /// width is outside the range its function allows.
    pub fn window(center: f64, width: f64, function: VoiFunction) -> Self {
        let min_width = match function {
            VoiFunction::Linear => 1.0,
            VoiFunction::LinearExact | VoiFunction::Sigmoid => f64::MIN_POSITIVE,
        };
        if !center.is_finite() || !width.is_finite() || width < min_width {
            tracing::warn!(
                "Ignoring invalid VOI window (center={}, width={}, {:?})",
                center, width, function
            );
            return Self::Identity;
        }
        Self::Window { center, width, function }
    }

    pub fn apply(&self, pixels: &mut Array2<f32>) {
        match self {
            Self::Identity => {}
            Self::Window { center, width, function } => {
                let (c, w) = (*center, *width);
                pixels.mapv_inplace(|v| window_value(v as f64, c, w, *function) as f32);
            }
            Self::Table { first_mapped, entries } => {
                if entries.is_empty() {
                    return;
                }
                let last = (entries.len() - 1) as f64;
                pixels.mapv_inplace(|v| {
                    let idx = (v as f64 - first_mapped).round().clamp(0.0, last);
                    entries[idx as usize]
                });
            }
        }
    }
}

fn window_value(x: f64, c: f64, w: f64, function: VoiFunction) -> f64 {
    match function {
        VoiFunction::Linear => {
            let lower = c - 0.5 - (w - 1.0) / 2.0;
            let upper = c - 0.5 + (w - 1.0) / 2.0;
            if x <= lower {
                0.0
            } else if x > upper {
                1.0
            } else {
                (x - (c - 0.5)) / (w - 1.0) + 0.5
            }
        }
        VoiFunction::LinearExact => {
            if x <= c - w / 2.0 {
                0.0
            } else if x > c + w / 2.0 {
                1.0
            } else {
                (x - c) / w + 0.5
            }
        }
        VoiFunction::Sigmoid => 1.0 / (1.0 + (-4.0 * (x - c) / w).exp()),
    }
}

// ─── Normalisation ────────────────────────────────────────────────────────────

/// Signal returned when an image has no intensity range to normalise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Degenerate {
    /// The (constant) minimum intensity found
    pub value: f32,
}

/// Min-max normalise to [0, 1].
/// Returns `Degenerate` instead of producing non-finite values.
pub fn normalize_min_max(pixels: &Array2<f32>) -> Result<Array2<f32>, Degenerate> {
    let (min, max) = pixels
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        return Err(Degenerate { value: min });
    }
    Ok(pixels.mapv(|v| (v - min) / range))
}

// ─── Resizing ─────────────────────────────────────────────────────────────────

/// Resize with anti-aliasing and reflected edges.
///
/// When shrinking, each axis is first smoothed with a Gaussian of
/// `sigma = (scale - 1) / 2` so that high frequencies do not alias.
/// Samples are then taken bilinearly at pixel centres. The output is
/// clipped to the input's value range.
pub fn resize_antialiased(src: &Array2<f32>, size: ImageSize) -> Array2<f32> {
    let (in_h, in_w) = src.dim();
    if in_h == 0 || in_w == 0 || size.height == 0 || size.width == 0 {
        return Array2::zeros((size.height, size.width));
    }
    if (in_h, in_w) == (size.height, size.width) {
        return src.clone();
    }

    let scale_y = in_h as f64 / size.height as f64;
    let scale_x = in_w as f64 / size.width as f64;

    let mut smoothed = src.clone();
    let sigma_y = ((scale_y - 1.0) / 2.0).max(0.0);
    let sigma_x = ((scale_x - 1.0) / 2.0).max(0.0);
    if sigma_y > 0.0 {
        smoothed = convolve_axis(&smoothed, &gaussian_kernel(sigma_y), Axis(0));
    }
    if sigma_x > 0.0 {
        smoothed = convolve_axis(&smoothed, &gaussian_kernel(sigma_x), Axis(1));
    }

    let (lo, hi) = src
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    Array2::from_shape_fn((size.height, size.width), |(r, c)| {
        let y = (r as f64 + 0.5) * scale_y - 0.5;
        let x = (c as f64 + 0.5) * scale_x - 0.5;
        bilinear(&smoothed, y, x).clamp(lo, hi)
    })
}

/// Reflect an out-of-range index back into `0..n` without repeating
/// the edge sample.
fn mirror(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let i = i.rem_euclid(period);
    if i >= n as isize {
        (period - i) as usize
    } else {
        i as usize
    }
}

fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| (w / total) as f32).collect()
}

fn convolve_axis(src: &Array2<f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let radius = (kernel.len() / 2) as isize;
    let mut out = Array2::zeros(src.dim());

    for (src_lane, mut out_lane) in src.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        let n = src_lane.len();
        for i in 0..n {
            out_lane[i] = kernel
                .iter()
                .enumerate()
                .map(|(k, &w)| w * src_lane[mirror(i as isize + k as isize - radius, n)])
                .sum();
        }
    }
    out
}

fn bilinear(img: &Array2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = img.dim();
    let (y0, x0) = (y.floor(), x.floor());
    let (fy, fx) = ((y - y0) as f32, (x - x0) as f32);
    let (y0, x0) = (y0 as isize, x0 as isize);

    let (r0, r1) = (mirror(y0, h), mirror(y0 + 1, h));
    let (c0, c1) = (mirror(x0, w), mirror(x0 + 1, w));

    let top    = img[[r0, c0]] * (1.0 - fx) + img[[r0, c1]] * fx;
    let bottom = img[[r1, c0]] * (1.0 - fx) + img[[r1, c1]] * fx;
    top * (1.0 - fy) + bottom * fy
}

// ─── Channels ─────────────────────────────────────────────────────────────────

/// Broadcast a grayscale image to `[height, width, 3]`.
pub fn replicate_channels(gray: &Array2<f32>) -> Array3<f32> {
    let (h, w) = gray.dim();
    Array3::from_shape_fn((h, w, CHANNELS), |(r, c, _)| gray[[r, c]])
}

// ─── Preprocessor ─────────────────────────────────────────────────────────────

/// What to do with an image whose intensity is constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Drop the image with a warning
    #[default]
    Skip,
    /// Keep it as an all-zero image
    Zero,
    /// Abort with ScanError::DegenerateImage
    Fail,
}

/// Pixel data and display transform as read from one file.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Shape: [rows, columns], modality rescale already applied
    pub pixels: Array2<f32>,
    pub voi:    VoiTransform,
}

/// Runs the four preprocessing steps for a fixed output size.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    target:        ImageSize,
    on_degenerate: DegeneratePolicy,
}

impl Preprocessor {
    pub fn new(target: ImageSize, on_degenerate: DegeneratePolicy) -> Self {
        Self { target, on_degenerate }
    }

    pub fn target(&self) -> ImageSize {
        self.target
    }

    /// Preprocess one raw image.
    /// Returns `Ok(None)` when a degenerate image is skipped.
    pub fn process(&self, source: &Path, raw: RawImage) -> ScanResult<Option<NormalizedImage>> {
        let RawImage { mut pixels, voi } = raw;
        voi.apply(&mut pixels);

        let gray = match normalize_min_max(&pixels) {
            Ok(normalized) => resize_antialiased(&normalized, self.target),
            Err(Degenerate { value }) => match self.on_degenerate {
                DegeneratePolicy::Skip => {
                    tracing::warn!(
                        "Skipping '{}': constant intensity {}",
                        source.display(), value
                    );
                    return Ok(None);
                }
                DegeneratePolicy::Zero => {
                    tracing::warn!(
                        "'{}' has constant intensity {}; using an all-zero image",
                        source.display(), value
                    );
                    Array2::zeros((self.target.height, self.target.width))
                }
                DegeneratePolicy::Fail => {
                    return Err(ScanError::DegenerateImage {
                        path: source.to_path_buf(),
                        value,
                    });
                }
            },
        };

        Ok(Some(NormalizedImage::new(source, replicate_channels(&gray))))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ramp(h: usize, w: usize) -> Array2<f32> {
        Array2::from_shape_fn((h, w), |(r, c)| (r * w + c) as f32)
    }

    #[test]
    fn test_normalize_hits_both_ends() {
        let n = normalize_min_max(&array![[10.0, 20.0], [30.0, 50.0]]).unwrap();
        assert_eq!(n[[0, 0]], 0.0);
        assert_eq!(n[[1, 1]], 1.0);
        assert!((n[[0, 1]] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_constant_is_degenerate() {
        let err = normalize_min_max(&Array2::from_elem((3, 3), 7.0)).unwrap_err();
        assert_eq!(err, Degenerate { value: 7.0 });
    }

    #[test]
    fn test_normalize_rejects_infinite_range() {
        let img = array![[0.0, f32::INFINITY]];
        assert!(normalize_min_max(&img).is_err());
    }

    #[test]
    fn test_linear_window_edges() {
        // center 50, width 11 → lower = 44.5, upper = 54.5
        let c = 50.0;
        let w = 11.0;
        assert_eq!(window_value(44.5, c, w, VoiFunction::Linear), 0.0);
        assert_eq!(window_value(54.6, c, w, VoiFunction::Linear), 1.0);
        assert!((window_value(49.5, c, w, VoiFunction::Linear) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_linear_exact_and_sigmoid() {
        assert_eq!(window_value(40.0, 50.0, 20.0, VoiFunction::LinearExact), 0.0);
        assert!((window_value(55.0, 50.0, 20.0, VoiFunction::LinearExact) - 0.75).abs() < 1e-9);
        assert!((window_value(50.0, 50.0, 20.0, VoiFunction::Sigmoid) - 0.5).abs() < 1e-9);
        assert!(window_value(100.0, 50.0, 20.0, VoiFunction::Sigmoid) > 0.99);
    }

    #[test]
    fn test_invalid_window_falls_back_to_identity() {
        assert_eq!(VoiTransform::window(40.0, 0.5, VoiFunction::Linear), VoiTransform::Identity);
        assert_ne!(VoiTransform::window(40.0, 0.5, VoiFunction::LinearExact), VoiTransform::Identity);
    }

    #[test]
    fn test_function_parsing() {
        assert_eq!(VoiFunction::from_attribute(Some("SIGMOID ")), VoiFunction::Sigmoid);
        assert_eq!(VoiFunction::from_attribute(Some("linear_exact")), VoiFunction::LinearExact);
        assert_eq!(VoiFunction::from_attribute(None), VoiFunction::Linear);
    }

    #[test]
    fn test_table_lookup_clamps() {
        let lut = VoiTransform::Table { first_mapped: 10.0, entries: vec![0.0, 5.0, 9.0] };
        let mut px = array![[0.0, 10.0, 11.0, 12.0, 99.0]];
        lut.apply(&mut px);
        assert_eq!(px, array![[0.0, 0.0, 5.0, 9.0, 9.0]]);
    }

    #[test]
    fn test_mirror_reflects_without_repeating_edge() {
        // d c b | a b c d | c b a
        assert_eq!(mirror(-1, 4), 1);
        assert_eq!(mirror(-3, 4), 3);
        assert_eq!(mirror(4, 4), 2);
        assert_eq!(mirror(6, 4), 0);
        assert_eq!(mirror(5, 1), 0);
    }

    #[test]
    fn test_gaussian_kernel_is_normalised() {
        let k = gaussian_kernel(1.5);
        assert_eq!(k.len(), 2 * 6 + 1);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(k[6] > k[5] && k[5] > k[0]);
    }

    #[test]
    fn test_resize_shape_and_range() {
        let src = normalize_min_max(&ramp(37, 53)).unwrap();
        let out = resize_antialiased(&src, ImageSize::new(16, 20));
        assert_eq!(out.dim(), (16, 20));
        assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_resize_to_empty_target() {
        let src = Array2::from_shape_fn((4, 4), |(r, c)| (r + c) as f32);
        assert_eq!(resize_antialiased(&src, ImageSize::new(0, 0)).dim(), (0, 0));
        assert_eq!(resize_antialiased(&src, ImageSize::new(2, 0)).dim(), (2, 0));
    }

    #[test]
    fn test_resize_preserves_constant() {
        let out = resize_antialiased(&Array2::from_elem((50, 30), 0.25), ImageSize::new(8, 8));
        assert!(out.iter().all(|&v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_upscale_interpolates_between_neighbours() {
        let src = array![[0.0, 1.0]];
        let out = resize_antialiased(&src, ImageSize::new(1, 4));
        // sample positions: -0.25, 0.25, 0.75, 1.25 → mirrored
        assert!((out[[0, 0]] - 0.25).abs() < 1e-6);
        assert!((out[[0, 1]] - 0.25).abs() < 1e-6);
        assert!((out[[0, 2]] - 0.75).abs() < 1e-6);
        assert!((out[[0, 3]] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_same_size_is_unchanged() {
        let src = normalize_min_max(&ramp(4, 4)).unwrap();
        assert_eq!(resize_antialiased(&src, ImageSize::square(4)), src);
    }

    #[test]
    fn test_process_produces_three_identical_channels() {
        let p   = Preprocessor::new(ImageSize::square(8), DegeneratePolicy::Fail);
        let raw = RawImage { pixels: ramp(20, 20), voi: VoiTransform::Identity };
        let img = p.process(Path::new("x.dcm"), raw).unwrap().unwrap();
        assert_eq!(img.pixels.dim(), (8, 8, 3));
        assert!(img.channels_identical());
        assert!(img.min() >= 0.0 && img.max() <= 1.0);
    }

    #[test]
    fn test_degenerate_policies() {
        let constant = || RawImage { pixels: Array2::from_elem((4, 4), 3.0), voi: VoiTransform::Identity };
        let path     = Path::new("flat.dcm");

        let skip = Preprocessor::new(ImageSize::square(4), DegeneratePolicy::Skip);
        assert!(skip.process(path, constant()).unwrap().is_none());

        let zero = Preprocessor::new(ImageSize::square(4), DegeneratePolicy::Zero);
        let img  = zero.process(path, constant()).unwrap().unwrap();
        assert_eq!(img.max(), 0.0);

        let fail = Preprocessor::new(ImageSize::square(4), DegeneratePolicy::Fail);
        assert!(matches!(
            fail.process(path, constant()),
            Err(ScanError::DegenerateImage { value, .. }) if value == 3.0
        ));
    }

    #[test]
    fn test_window_saturation_becomes_degenerate() {
        // every pixel far below the window → all 0 after VOI → degenerate
        let raw = RawImage {
            pixels: ramp(4, 4),
            voi:    VoiTransform::window(1000.0, 10.0, VoiFunction::Linear),
        };
        let p = Preprocessor::new(ImageSize::square(4), DegeneratePolicy::Skip);
        assert!(p.process(Path::new("dark.dcm"), raw).unwrap().is_none());
    }
}
