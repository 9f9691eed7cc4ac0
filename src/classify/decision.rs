use crate::classify::types::{Outcome, PredictionResult, ScoreVector};
use crate::models::ClassLabelTable;
use crate::utils::error::ClassifyError;
use crate::Result;

/// 低置信度时展示的类别名
pub const LOW_CONFIDENCE_LABEL: &str = "Low Confidence";

/// 低置信度时的提示信息
pub const GUIDANCE_MESSAGE: &str = "Please upload a proper image of a coconut tree.";

/// Turn a score vector into a user facing prediction.
///
/// The top score is the confidence. Anything strictly below `threshold` (or a
/// NaN top score) is reported as [`LOW_CONFIDENCE_LABEL`] and the predicted
/// class name is dropped; otherwise the label at the argmax index is returned.
pub fn decide(
    scores: &ScoreVector,
    labels: &ClassLabelTable,
    threshold: f32,
) -> Result<PredictionResult> {
    if scores.len() != labels.len() {
        return Err(ClassifyError::Inference(format!(
            "Score vector has {} entries but the label table has {}",
            scores.len(),
            labels.len()
        )));
    }

    let (predicted_index, confidence) = scores.argmax();
    let confidence_percent = format_percent(confidence);

    if confidence.is_nan() || confidence < threshold {
        return Ok(PredictionResult {
            label: LOW_CONFIDENCE_LABEL.to_string(),
            confidence,
            confidence_percent,
            message: Some(GUIDANCE_MESSAGE.to_string()),
            outcome: Outcome::LowConfidence,
        });
    }

    let label = labels.get(predicted_index).ok_or_else(|| {
        ClassifyError::Inference(format!("No label for class index {}", predicted_index))
    })?;

    Ok(PredictionResult {
        label: label.to_string(),
        confidence,
        confidence_percent,
        message: None,
        outcome: Outcome::Confident {
            index: predicted_index,
        },
    })
}

fn format_percent(confidence: f32) -> String {
    format!("{:.2}%", f64::from(confidence) * 100.0)
}
