pub mod types;
pub mod decision;
pub mod pipeline;

pub use types::{InputTensor, Outcome, PredictionResult, ScoreVector};
pub use decision::{decide, GUIDANCE_MESSAGE, LOW_CONFIDENCE_LABEL};
pub use pipeline::ClassificationPipeline;
