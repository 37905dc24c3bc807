//! Image preprocessing for classifier inference
//!
//! Mirrors the evaluation transform used at training time: a direct resize to
//! 224x224 (aspect ratio is not preserved), scaling to [0, 1], then per-channel
//! ImageNet normalization. Output layout is NCHW with a batch of one.

use candle_core::{Device, Tensor};
use cropguard_core::{Error, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};

/// Square input resolution expected by the network
pub const INPUT_SIZE: u32 = 224;

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Converts encoded images into normalized input tensors
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    size: u32,
    mean: [f32; 3],
    std: [f32; 3],
    filter: FilterType,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            size: INPUT_SIZE,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            // Bilinear, as in the training-time resize.
            filter: FilterType::Triangle,
        }
    }
}

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output side length
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Shape of the produced tensor
    pub fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 3, self.size as usize, self.size as usize)
    }

    /// Decode raw bytes (JPEG, PNG, BMP, ...) into an RGB image
    pub fn decode(&self, bytes: &[u8]) -> Result<RgbImage> {
        if bytes.is_empty() {
            return Err(Error::preprocess("Image data is empty"));
        }

        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::preprocess(format!("Failed to decode image: {}", e)))?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::preprocess("Image has zero width or height"));
        }

        Ok(image.to_rgb8())
    }

    /// Resize and normalize an RGB image into a flat CHW buffer
    pub fn normalize(&self, image: &RgbImage) -> Vec<f32> {
        let resized = imageops::resize(image, self.size, self.size, self.filter);
        let plane = (self.size * self.size) as usize;

        let mut data = vec![0.0f32; 3 * plane];
        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                let value = f32::from(pixel[c]) / 255.0;
                data[c * plane + i] = (value - self.mean[c]) / self.std[c];
            }
        }
        data
    }

    /// Bytes to a `[1, 3, size, size]` tensor on `device`
    pub fn preprocess(&self, bytes: &[u8], device: &Device) -> Result<Tensor> {
        let image = self.decode(bytes)?;
        self.to_tensor(&image, device)
    }

    /// Already-decoded image to a `[1, 3, size, size]` tensor on `device`
    pub fn preprocess_image(&self, image: &DynamicImage, device: &Device) -> Result<Tensor> {
        self.to_tensor(&image.to_rgb8(), device)
    }

    fn to_tensor(&self, image: &RgbImage, device: &Device) -> Result<Tensor> {
        let data = self.normalize(image);
        Tensor::from_vec(data, self.input_shape(), device)
            .map_err(|e| Error::preprocess(format!("Failed to build input tensor: {}", e)))
    }
}
