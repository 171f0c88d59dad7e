// ============================================================
// Layer 4 — Reconstruction Batcher and Batch Sequence
// ============================================================
// ImageBatcher implements Burn's Batcher trait: it stacks a Vec of
// NormalizedImages into one channels-first tensor.
//
//   Input:  N images, each [H, W, 3]
//   Output: tensor [N, 3, H, W]
//
// For an autoencoder the target is the input itself, so every
// ReconstructionBatch carries the same tensor twice.
//
// BatchSequence wraps a Burn DataLoader (no shuffle, so dataset
// order is kept) and slices the dataset into consecutive batches:
//
//   N = 10, batch_size = 4  →  [0..4] [4..8] [8..10]
//
// One epoch is `iter()`, an exact-size iterator of ceil(N / B)
// batches. `cycle()` wraps around forever for callers that drive
// the number of steps themselves.

use std::sync::Arc;

use burn::{
    data::{
        dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder, DataLoaderIterator},
        dataset::Dataset,
    },
    tensor::TensorData,
    prelude::*,
};

use crate::data::dataset::ImageDataset;
use crate::domain::image::{NormalizedImage, CHANNELS};

// ─── ReconstructionBatch ─────────────────────────────────────────────────────
/// A batch of images paired with its reconstruction target.
#[derive(Debug, Clone)]
pub struct ReconstructionBatch<B: Backend> {
    /// Shape: [batch_size, 3, height, width]
    pub inputs: Tensor<B, 4>,

    /// Same values as `inputs`
    pub targets: Tensor<B, 4>,
}

impl<B: Backend> ReconstructionBatch<B> {
    /// Number of images in this batch (the last batch may be short).
    pub fn len(&self) -> usize {
        self.inputs.dims()[0]
    }
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack images into a [N, 3, H, W] tensor.
    pub fn stack(&self, items: &[NormalizedImage]) -> Tensor<B, 4> {
        let batch_size = items.len();
        let size       = items.first().map(|i| i.size()).unwrap_or_default();

        let flat: Vec<f32> = items.iter().flat_map(|img| img.to_chw_vec()).collect();
        let data = TensorData::new(flat, [batch_size, CHANNELS, size.height, size.width]);
        Tensor::<B, 4>::from_data(data, &self.device)
    }
}

impl<B: Backend> Batcher<NormalizedImage, ReconstructionBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<NormalizedImage>) -> ReconstructionBatch<B> {
        let inputs = self.stack(&items);
        ReconstructionBatch { targets: inputs.clone(), inputs }
    }
}

// ─── BatchSequence ────────────────────────────────────────────────────────────
/// Indexable, sized sequence of reconstruction batches over a dataset.
pub struct BatchSequence<B: Backend> {
    dataset:    Arc<ImageDataset>,
    batcher:    ImageBatcher<B>,
    batch_size: usize,
    loader:     Arc<dyn DataLoader<ReconstructionBatch<B>>>,
}

impl<B: Backend> BatchSequence<B> {
    /// # Panics
    /// If `batch_size` is zero.
    pub fn new(dataset: ImageDataset, batch_size: usize, device: B::Device) -> Self {
        assert!(batch_size > 0, "batch_size must be positive");
        let dataset = Arc::new(dataset);
        let batcher = ImageBatcher::new(device);
        let loader  = DataLoaderBuilder::new(batcher.clone())
            .batch_size(batch_size)
            .build(Arc::clone(&dataset));
        Self { dataset, batcher, batch_size, loader }
    }

    /// Batches per epoch: ceil(N / batch_size).
    pub fn len(&self) -> usize {
        self.loader.num_items().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dataset(&self) -> &ImageDataset {
        &self.dataset
    }

    /// The `index`-th batch of an epoch, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<ReconstructionBatch<B>> {
        let total = self.dataset.len();
        let start = index.checked_mul(self.batch_size)?;
        if start >= total {
            return None;
        }
        let end   = (start + self.batch_size).min(total);
        let items = (start..end).filter_map(|i| self.dataset.get(i)).collect();
        Some(self.batcher.batch(items))
    }

    /// One epoch of batches, in dataset order.
    pub fn iter(&self) -> EpochBatches<'_, B> {
        EpochBatches { inner: self.loader.iter(), remaining: self.len() }
    }

    /// Batches forever, restarting from the first batch after the last.
    /// Yields nothing for an empty dataset.
    pub fn cycle(&self) -> impl Iterator<Item = ReconstructionBatch<B>> + '_ {
        let epochs = if self.is_empty() { 0 } else { usize::MAX };
        (0..epochs).flat_map(move |_| self.iter())
    }
}

/// Iterator over one epoch of a BatchSequence.
pub struct EpochBatches<'a, B: Backend> {
    inner:     Box<dyn DataLoaderIterator<ReconstructionBatch<B>> + 'a>,
    remaining: usize,
}

impl<B: Backend> Iterator for EpochBatches<'_, B> {
    type Item = ReconstructionBatch<B>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.inner.next()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<B: Backend> ExactSizeIterator for EpochBatches<'_, B> {}
