// ============================================================
// Layer 4 — Image Dataset
// ============================================================
// Implements Burn's Dataset trait over the preprocessed scans so
// BatchSequence can hand it to a DataLoader.

use burn::data::dataset::Dataset;

use crate::domain::image::NormalizedImage;

/// An ordered collection of preprocessed scans.
/// All images share one size.
#[derive(Debug, Clone, Default)]
pub struct ImageDataset {
    images: Vec<NormalizedImage>,
}

impl ImageDataset {
    pub fn new(images: Vec<NormalizedImage>) -> Self {
        debug_assert!(
            images.windows(2).all(|w| w[0].size() == w[1].size()),
            "all images in a dataset must share one size"
        );
        Self { images }
    }

    pub fn image_count(&self) -> usize { self.images.len() }

    pub fn images(&self) -> &[NormalizedImage] { &self.images }
}

impl Dataset<NormalizedImage> for ImageDataset {
    fn get(&self, index: usize) -> Option<NormalizedImage> {
        self.images.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}
