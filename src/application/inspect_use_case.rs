// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Runs only the loading half of the pipeline: every .dcm file is
// read and preprocessed exactly as training would, and a short
// summary per image is returned. Useful to check a directory
// before spending time on a training run.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::data::{
    loader::DicomDirectoryLoader,
    preprocessor::{DegeneratePolicy, Preprocessor},
};
use crate::domain::error::ScanError;
use crate::domain::image::{ImageSize, NormalizedImage};
use crate::domain::traits::ImageSource;

/// Statistics of one preprocessed image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSummary {
    pub source: PathBuf,
    pub size:   ImageSize,
    pub min:    f32,
    pub max:    f32,
    pub mean:   f32,
}

impl From<&NormalizedImage> for ImageSummary {
    fn from(img: &NormalizedImage) -> Self {
        Self {
            source: img.source.clone(),
            size:   img.size(),
            min:    img.min(),
            max:    img.max(),
            mean:   img.mean(),
        }
    }
}

pub struct InspectUseCase {
    data_dir:     PathBuf,
    preprocessor: Preprocessor,
}

impl InspectUseCase {
    pub fn new(data_dir: impl Into<PathBuf>, size: ImageSize, on_degenerate: DegeneratePolicy) -> Self {
        Self {
            data_dir:     data_dir.into(),
            preprocessor: Preprocessor::new(size, on_degenerate),
        }
    }

    pub fn execute(&self) -> Result<Vec<ImageSummary>> {
        let size = self.preprocessor.target();
        if size.height == 0 || size.width == 0 {
            return Err(ScanError::InvalidConfig(format!("image size {size} must be positive")).into());
        }
        let loader = DicomDirectoryLoader::new(&self.data_dir, self.preprocessor.clone());
        let images = loader
            .load_all()
            .with_context(|| format!("Cannot load DICOM images from '{}'", self.data_dir.display()))?;
        Ok(images.iter().map(ImageSummary::from).collect())
    }
}
