pub mod error;
pub mod filename;

pub use error::ClassifyError;
pub use filename::secure_filename;
