//! Request input handling: path validation, image decoding, and running
//! the blocking models on a decoded image.

pub(crate) mod analyze;
pub(crate) mod decode;
pub(crate) mod validate;

pub use analyze::{caption_image, color_outcome, extract_palette};
pub use decode::ImageDecoder;
pub use validate::Validator;
