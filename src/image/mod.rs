pub mod loader;
pub mod preprocessing;

pub use loader::{ImageLoader, MAX_IMAGE_BYTES};
pub use preprocessing::ImagePreprocessor;
