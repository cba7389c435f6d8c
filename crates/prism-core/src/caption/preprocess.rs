//! Image preprocessing for the VGG16 feature encoder.
//!
//! The encoder was exported from Keras and expects:
//! - Input size: 224×224 pixels, nearest-neighbour resize
//! - Channel order: BGR
//! - Normalization: per-channel ImageNet mean subtracted, no scaling
//! - Tensor layout: NHWC [batch, height, width, channels]

use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels.
const CHANNELS: usize = 3;

/// ImageNet channel means in BGR order.
const BGR_MEAN: [f32; CHANNELS] = [103.939, 116.779, 123.68];

/// Preprocess an image for VGG16 inference.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let resized = image.resize_exact(
        image_size,
        image_size,
        image::imageops::FilterType::Nearest,
    );
    let rgb = resized.to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, CHANNELS));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (x, y) = (x as usize, y as usize);
        tensor[[0, y, x, 0]] = b as f32 - BGR_MEAN[0];
        tensor[[0, y, x, 1]] = g as f32 - BGR_MEAN[1];
        tensor[[0, y, x, 2]] = r as f32 - BGR_MEAN[2];
    }

    tensor
}
