// ============================================================
// Layer 5 — Convolutional Autoencoder
// ============================================================
// Symmetric encoder/decoder over [N, 3, H, W] images:
//
//   encoder: conv 3→32 → pool /2 → conv 32→16 → pool /2
//   decoder: conv 16→16 → up ×2 → conv 16→32 → up ×2 → conv 32→3
//
// ReLU between layers, sigmoid on the output so reconstructions
// live in [0, 1] like the inputs. Trained with binary cross-entropy.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        interpolate::{Interpolate2d, Interpolate2dConfig, InterpolateMode},
        pool::{MaxPool2d, MaxPool2dConfig},
        Initializer, PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::data::batcher::ReconstructionBatch;
use crate::domain::image::{ImageSize, CHANNELS};

/// Predictions are clamped to [EPSILON, 1 - EPSILON] before taking logs.
pub const BCE_EPSILON: f64 = 1e-7;

/// Spatial downsampling between input and bottleneck (two 2×2 pools).
pub const DOWNSAMPLE_FACTOR: usize = 4;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct AutoencoderConfig {
    #[config(default = 224)]
    pub input_height: usize,
    #[config(default = 224)]
    pub input_width: usize,
    #[config(default = 3)]
    pub channels: usize,
    /// Filters of the outer encoder/decoder convolutions.
    #[config(default = 32)]
    pub outer_filters: usize,
    /// Filters at the bottleneck.
    #[config(default = 16)]
    pub bottleneck_filters: usize,
    #[config(default = 3)]
    pub kernel_size: usize,
}

impl AutoencoderConfig {
    pub fn for_image_size(size: ImageSize) -> Self {
        Self::new()
            .with_input_height(size.height)
            .with_input_width(size.width)
            .with_channels(CHANNELS)
    }

    /// Input spatial dims must survive two 2×2 pools and two ×2 upsamples.
    pub fn validate(&self) -> Result<(), String> {
        for (name, dim) in [("height", self.input_height), ("width", self.input_width)] {
            if dim == 0 || dim % DOWNSAMPLE_FACTOR != 0 {
                return Err(format!(
                    "input {name} {dim} must be a positive multiple of {DOWNSAMPLE_FACTOR}"
                ));
            }
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Autoencoder<B> {
        let outer      = self.outer_filters;
        let bottleneck = self.bottleneck_filters;
        Autoencoder {
            enc_conv1: self.conv([self.channels, outer], device),
            enc_pool1: Self::pool(),
            enc_conv2: self.conv([outer, bottleneck], device),
            enc_pool2: Self::pool(),
            dec_conv1: self.conv([bottleneck, bottleneck], device),
            dec_up1:   Self::upsample(),
            dec_conv2: self.conv([bottleneck, outer], device),
            dec_up2:   Self::upsample(),
            output:    self.conv([outer, self.channels], device),
            activation: Relu::new(),
        }
    }

    /// 3×3 convolution, "same" padding, Glorot-uniform weights.
    fn conv<B: Backend>(&self, channels: [usize; 2], device: &B::Device) -> Conv2d<B> {
        Conv2dConfig::new(channels, [self.kernel_size, self.kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device)
    }

    fn pool() -> MaxPool2d {
        MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init()
    }

    fn upsample() -> Interpolate2d {
        Interpolate2dConfig::new()
            .with_scale_factor(Some([2.0, 2.0]))
            .with_mode(InterpolateMode::Nearest)
            .init()
    }
}

/// Convolutional autoencoder:
///
/// ```text
/// [N,3,H,W] → conv32 → pool → conv16 → pool          (encoder, [N,16,H/4,W/4])
///           → conv16 → up×2 → conv32 → up×2 → conv3   (decoder, sigmoid)
/// ```
#[derive(Module, Debug)]
pub struct Autoencoder<B: Backend> {
    pub enc_conv1:  Conv2d<B>,
    pub enc_pool1:  MaxPool2d,
    pub enc_conv2:  Conv2d<B>,
    pub enc_pool2:  MaxPool2d,
    pub dec_conv1:  Conv2d<B>,
    pub dec_up1:    Interpolate2d,
    pub dec_conv2:  Conv2d<B>,
    pub dec_up2:    Interpolate2d,
    pub output:     Conv2d<B>,
    pub activation: Relu,
}

impl<B: Backend> Autoencoder<B> {
    /// images: [N, 3, H, W] → bottleneck code [N, 16, H/4, W/4]
    pub fn encode(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.activation.forward(self.enc_conv1.forward(images));
        let x = self.enc_pool1.forward(x);
        let x = self.activation.forward(self.enc_conv2.forward(x));
        self.enc_pool2.forward(x)
    }

    /// code: [N, 16, H/4, W/4] → reconstruction [N, 3, H, W] in (0, 1)
    pub fn decode(&self, code: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.activation.forward(self.dec_conv1.forward(code));
        let x = self.dec_up1.forward(x);
        let x = self.activation.forward(self.dec_conv2.forward(x));
        let x = self.dec_up2.forward(x);
        sigmoid(self.output.forward(x))
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.decode(self.encode(images))
    }

    /// Reconstruction loss of one batch.
    pub fn forward_loss(&self, batch: ReconstructionBatch<B>) -> Tensor<B, 1> {
        binary_cross_entropy(self.forward(batch.inputs), batch.targets)
    }

    /// Per-image mean squared reconstruction error: [N].
    /// Higher means the image is less like the training data.
    pub fn reconstruction_errors(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        let [n, c, h, w] = images.dims();
        let diff = self.forward(images.clone()) - images;
        diff.powf_scalar(2.0)
            .reshape([n, c * h * w])
            .mean_dim(1)
            .reshape([n])
    }

    /// Total number of trainable scalars.
    pub fn parameter_count(&self) -> usize {
        self.num_params()
    }
}

/// Element-wise binary cross-entropy averaged over every value.
/// `targets` are soft labels in [0, 1].
pub fn binary_cross_entropy<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    targets:     Tensor<B, D>,
) -> Tensor<B, 1> {
    let p = predictions.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
    let positive = targets.clone() * p.clone().log();
    let negative = (targets.neg() + 1.0) * (p.neg() + 1.0).log();
    (positive + negative).neg().mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_output_shape_matches_input() {
        let device = Default::default();
        let model: Autoencoder<TestBackend> = AutoencoderConfig::new().init(&device);
        let input  = Tensor::<TestBackend, 4>::ones([2, 3, 8, 12], &device) * 0.5;

        assert_eq!(model.encode(input.clone()).dims(), [2, 16, 2, 3]);
        let out = model.forward(input).into_data().to_vec::<f32>().unwrap();
        assert_eq!(out.len(), 2 * 3 * 8 * 12);
        assert!(out.iter().all(|&v| v > 0.0 && v < 1.0));
    }

    #[test]
    fn test_reconstruction_errors_per_image() {
        let device = Default::default();
        let model: Autoencoder<TestBackend> = AutoencoderConfig::new().init(&device);
        let input  = Tensor::<TestBackend, 4>::zeros([3, 3, 4, 4], &device);
        let errors = model.reconstruction_errors(input);
        assert_eq!(errors.dims(), [3]);
        let v = errors.into_data().to_vec::<f32>().unwrap();
        assert!(v.iter().all(|&e| e > 0.0 && e < 1.0));
    }

    #[test]
    fn test_bce_of_perfect_prediction_is_small() {
        let device = Default::default();
        let t = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0], [1.0, 0.0]], &device);
        let loss = scalar(binary_cross_entropy(t.clone(), t));
        assert!(loss < 1e-5, "loss = {loss}");
    }

    #[test]
    fn test_bce_of_half_is_ln2() {
        let device = Default::default();
        let p = Tensor::<TestBackend, 2>::from_floats([[0.5, 0.5]], &device);
        let t = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0]], &device);
        let loss = scalar(binary_cross_entropy(p, t));
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_bce_is_finite_at_saturation() {
        let device = Default::default();
        let p = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0]], &device);
        let t = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device);
        assert!(scalar(binary_cross_entropy(p, t)).is_finite());
    }

    #[test]
    fn test_config_validation() {
        assert!(AutoencoderConfig::new().validate().is_ok());
        assert!(AutoencoderConfig::for_image_size(ImageSize::new(8, 12)).validate().is_ok());
        assert!(AutoencoderConfig::for_image_size(ImageSize::new(10, 12)).validate().is_err());
        assert!(AutoencoderConfig::for_image_size(ImageSize::new(0, 0)).validate().is_err());
    }

    #[test]
    fn test_parameter_count() {
        let device = Default::default();
        let model: Autoencoder<TestBackend> = AutoencoderConfig::new().init(&device);
        // conv weights + biases: 3→32, 32→16, 16→16, 16→32, 32→3
        let expected = (3 * 32 * 9 + 32) + (32 * 16 * 9 + 16) + (16 * 16 * 9 + 16)
            + (16 * 32 * 9 + 32) + (32 * 3 * 9 + 3);
        assert_eq!(model.parameter_count(), expected);
    }
}
