// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles samples with a seeded RNG and splits them into:
//   - Training set:   used to update model weights
//   - Validation set: drives early stopping
//
// Sizes: n_val = ceil(val_fraction * N), n_train = N - n_val.
// The same seed on the same input always gives the same split.
//
// The partitions are disjoint and together hold every sample.
// Either side may be empty for tiny inputs; the caller decides
// whether that is acceptable.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Seed used when none is configured.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Number of validation samples for `total` samples.
pub fn validation_count(total: usize, val_fraction: f64) -> usize {
    ((total as f64) * val_fraction).ceil().clamp(0.0, total as f64) as usize
}

/// Shuffle `samples` deterministically and split into (train, validation).
///
/// # Arguments
/// * `samples`      - All available samples (consumed by this function)
/// * `val_fraction` - Proportion for validation, e.g. 0.2 = 20%
/// * `seed`         - RNG seed for the shuffle
pub fn split_train_val<T>(mut samples: Vec<T>, val_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total   = samples.len();
    let n_val   = validation_count(total, val_fraction);
    let n_train = total - n_val;

    // After this: samples = [0..n_train], val = [n_train..total]
    let val = samples.split_off(n_train);

    tracing::debug!(
        "Dataset split (seed {}): {} training, {} validation",
        seed,
        samples.len(),
        val.len(),
    );

    (samples, val)
}
