use crate::utils::error::ClassifyError;
use crate::Result;
use ndarray::{Array4, ArrayView4};
use serde::Serialize;

/// 模型输入高度
pub const INPUT_HEIGHT: usize = 224;
/// 模型输入宽度
pub const INPUT_WIDTH: usize = 224;
/// 模型输入通道数 (RGB)
pub const INPUT_CHANNELS: usize = 3;

/// Model input: NHWC `f32` tensor of shape `(1, 224, 224, 3)` with values in `[0, 1]`.
///
/// The shape is checked when the tensor is built, so a malformed tensor never
/// reaches the inference session.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor(Array4<f32>);

impl InputTensor {
    pub const SHAPE: [usize; 4] = [1, INPUT_HEIGHT, INPUT_WIDTH, INPUT_CHANNELS];

    pub fn new(data: Array4<f32>) -> Result<Self> {
        if data.shape() != Self::SHAPE {
            return Err(ClassifyError::Inference(format!(
                "Input tensor shape {:?} does not match expected {:?}",
                data.shape(),
                Self::SHAPE
            )));
        }
        Ok(Self(data))
    }

    /// 全零输入，用于启动时的预热推理
    pub fn zeros() -> Self {
        Self(Array4::zeros((1, INPUT_HEIGHT, INPUT_WIDTH, INPUT_CHANNELS)))
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }

    pub fn into_inner(self) -> Array4<f32> {
        self.0
    }
}

/// 单次推理输出的类别分数，与标签表按下标对齐
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScoreVector(Vec<f32>);

impl ScoreVector {
    pub fn new(scores: Vec<f32>) -> Result<Self> {
        if scores.is_empty() {
            return Err(ClassifyError::Inference(
                "Model produced an empty score vector".to_string(),
            ));
        }
        Ok(Self(scores))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Index and value of the highest score. Ties resolve to the first
    /// occurrence; NaN entries never win over a real number.
    pub fn argmax(&self) -> (usize, f32) {
        let mut max_idx = 0;
        let mut max_val = self.0[0];

        for (i, &score) in self.0.iter().enumerate().skip(1) {
            if score > max_val || (max_val.is_nan() && !score.is_nan()) {
                max_val = score;
                max_idx = i;
            }
        }

        (max_idx, max_val)
    }
}

/// 判定结果的两种终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Confident { index: usize },
    LowConfidence,
}

/// 单次请求的分类结果（只读，不持久化）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// 预测类别名，低置信度时为 "Low Confidence"
    pub label: String,
    /// 最高分数 (0.0 - 1.0)
    pub confidence: f32,
    /// 百分比形式，保留两位小数，如 "85.00%"
    pub confidence_percent: String,
    /// 低置信度时的提示信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub outcome: Outcome,
}

impl PredictionResult {
    pub fn is_confident(&self) -> bool {
        matches!(self.outcome, Outcome::Confident { .. })
    }
}
