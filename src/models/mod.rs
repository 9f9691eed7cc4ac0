pub mod classifier;
pub mod labels;
pub mod manager;

pub use classifier::{Classifier, InferenceEngine};
pub use labels::{ClassLabelTable, DEFAULT_CLASS_NAMES};
pub use manager::{ModelManager, ModelStats};
