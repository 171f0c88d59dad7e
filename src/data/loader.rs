// ============================================================
// Layer 4 — DICOM Loader
// ============================================================
// Reads .dcm files from a directory using the dicom-rs crates.
//
// How a DICOM file is read here:
//   open_file()           → parses the file meta + data set
//   decode_pixel_data()   → native or encapsulated pixel data
//   to_ndarray()          → [frames, rows, columns, samples] f32,
//                           modality rescale applied
//
// Only the first frame is used; multi-sample pixels are averaged
// into one grayscale channel. The display transform (VOI LUT) is
// read from the data set and handed to the Preprocessor together
// with the pixels:
//
//   VOI LUT Sequence present        → Table (first item)
//   Window Center + Window Width    → Window (first values)
//   neither                         → Identity
//
// Any read failure aborts the whole load: there is no per-file
// retry and no partial dataset.

use std::{fs, path::{Path, PathBuf}};

use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::{open_file, InMemDicomObject};
use dicom_pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption};
use ndarray::Axis;

use crate::data::preprocessor::{Preprocessor, RawImage, VoiFunction, VoiTransform};
use crate::domain::error::{ScanError, ScanResult};
use crate::domain::image::NormalizedImage;
use crate::domain::traits::ImageSource;

/// File extension of DICOM files, compared case-insensitively.
pub const DICOM_EXTENSION: &str = "dcm";

/// Loads every .dcm file directly inside a directory.
/// Implements the ImageSource trait from Layer 3.
pub struct DicomDirectoryLoader {
    dir:          PathBuf,
    preprocessor: Preprocessor,
}

impl DicomDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>, preprocessor: Preprocessor) -> Self {
        Self { dir: dir.into(), preprocessor }
    }
}

impl ImageSource for DicomDirectoryLoader {
    fn load_all(&self) -> ScanResult<Vec<NormalizedImage>> {
        let paths = list_dicom_files(&self.dir)?;
        tracing::info!(
            "Found {} DICOM file(s) in '{}'",
            paths.len(),
            self.dir.display()
        );

        let mut images = Vec::with_capacity(paths.len());
        for path in &paths {
            if let Some(image) = load_dicom_image(path, &self.preprocessor)? {
                tracing::debug!(
                    "Loaded: {} (mean={:.4})",
                    path.display(),
                    image.mean()
                );
                images.push(image);
            }
        }

        let skipped = paths.len() - images.len();
        if skipped > 0 {
            tracing::warn!("Skipped {} degenerate image(s)", skipped);
        }
        tracing::info!("Successfully loaded {} images", images.len());
        Ok(images)
    }
}

/// List the DICOM files in `dir` (not recursive), sorted by path so the
/// dataset order does not depend on the filesystem.
pub fn list_dicom_files(dir: &Path) -> ScanResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ScanError::read(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ScanError::read(dir, e))?.path();
        if path.is_file() && has_dicom_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn has_dicom_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(DICOM_EXTENSION))
}

/// Read and preprocess one file.
/// Returns `Ok(None)` when the preprocessor skips a degenerate image.
pub fn load_dicom_image(path: &Path, preprocessor: &Preprocessor) -> ScanResult<Option<NormalizedImage>> {
    let raw = read_raw_image(path)?;
    preprocessor.process(path, raw)
}

/// Decode the first frame of a DICOM file plus its VOI transform.
pub fn read_raw_image(path: &Path) -> ScanResult<RawImage> {
    let obj = open_file(path).map_err(|e| ScanError::read(path, e))?;

    let decoded = obj
        .decode_pixel_data()
        .map_err(|e| ScanError::read(path, e))?;

    // The VOI transform is applied by the Preprocessor, not here.
    let options = ConvertOptions::new()
        .with_modality_lut(ModalityLutOption::Default)
        .with_voi_lut(VoiLutOption::Identity);
    let frames = decoded
        .to_ndarray_with_options::<f32>(&options)
        .map_err(|e| ScanError::read(path, e))?;

    // frames: [frames, rows, columns, samples]
    let shape = frames.shape();
    if shape.iter().any(|&d| d == 0) {
        return Err(ScanError::read(path, format!("empty pixel data (shape {shape:?})")));
    }
    let pixels = frames
        .index_axis(Axis(0), 0)
        .mean_axis(Axis(2))
        .ok_or_else(|| ScanError::read(path, "pixel data has no samples"))?;

    Ok(RawImage { pixels, voi: voi_transform(&obj) })
}

fn voi_transform(obj: &InMemDicomObject) -> VoiTransform {
    if let Some(table) = voi_lut_table(obj) {
        return table;
    }

    match (first_float(obj, tags::WINDOW_CENTER), first_float(obj, tags::WINDOW_WIDTH)) {
        (Some(center), Some(width)) => {
            let function = obj
                .element(tags::VOILUT_FUNCTION)
                .ok()
                .and_then(|e| e.to_str().ok())
                .map(|s| s.into_owned());
            VoiTransform::window(center, width, VoiFunction::from_attribute(function.as_deref()))
        }
        _ => VoiTransform::Identity,
    }
}

fn first_float(obj: &InMemDicomObject, tag: Tag) -> Option<f64> {
    obj.element(tag).ok()?.to_multi_float64().ok()?.first().copied()
}

/// First item of the VOI LUT Sequence, if it holds a usable table.
fn voi_lut_table(obj: &InMemDicomObject) -> Option<VoiTransform> {
    let item = obj.element(tags::VOILUT_SEQUENCE).ok()?.items()?.first()?;

    // LUT Descriptor: [entry count, first mapped value, bits per entry]
    let descriptor = item.element(tags::LUT_DESCRIPTOR).ok()?.to_multi_float64().ok()?;
    let first_mapped = *descriptor.get(1)?;

    let entries: Vec<f32> = item
        .element(tags::LUT_DATA)
        .ok()?
        .to_multi_float64()
        .ok()?
        .into_iter()
        .map(|v| v as f32)
        .collect();
    if entries.is_empty() {
        return None;
    }
    Some(VoiTransform::Table { first_mapped, entries })
}
