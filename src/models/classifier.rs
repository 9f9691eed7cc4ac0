use crate::classify::{InputTensor, ScoreVector};
use crate::utils::error::ClassifyError;
use crate::{Config, Result};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    tensor::TensorElementType,
    value::{Tensor, ValueType},
};
use parking_lot::Mutex;

/// 推理引擎抽象：输入固定形状张量，输出类别分数
///
/// Implementations must be safe to share between request handlers; the ONNX
/// backed [`Classifier`] serializes calls internally.
pub trait InferenceEngine: Send + Sync {
    fn run(&self, tensor: InputTensor) -> Result<ScoreVector>;

    /// Input dimensions declared by the model, `-1` for dynamic axes.
    fn input_shape(&self) -> Vec<i64>;

    /// Class count when the model declares a static output dimension.
    fn output_classes(&self) -> Option<usize>;
}

pub struct Classifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String, // 动态发现的输出名称
    input_shape: Vec<i64>,
    output_classes: Option<usize>,
}

impl Classifier {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = &config.model_path;

        if !model_path.exists() {
            return Err(ClassifyError::ModelLoad(format!(
                "Classification model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(optimization_level(config.onnx_config.optimization_level))?
            .with_intra_threads(config.onnx_config.intra_threads)?
            .commit_from_file(model_path)
            .map_err(|e| {
                ClassifyError::ModelLoad(format!(
                    "Failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        // 动态发现输入名称并校验输入签名
        let input = session.inputs.first().ok_or_else(|| {
            ClassifyError::ModelLoad("Classification model has no inputs".to_string())
        })?;
        let input_name = input.name.clone();
        let input_shape = match &input.input_type {
            ValueType::Tensor { ty, shape, .. } => {
                if *ty != TensorElementType::Float32 {
                    return Err(ClassifyError::ModelLoad(format!(
                        "Model input '{}' has element type {:?}, expected f32",
                        input_name, ty
                    )));
                }
                shape.iter().copied().collect::<Vec<i64>>()
            }
            other => {
                return Err(ClassifyError::ModelLoad(format!(
                    "Model input '{}' is not a tensor: {:?}",
                    input_name, other
                )));
            }
        };
        check_input_signature(&input_shape)?;
        tracing::info!("Classification model input: '{}' {:?}", input_name, input_shape);

        // 动态发现输出名称
        let output = session.outputs.first().ok_or_else(|| {
            ClassifyError::ModelLoad("Classification model has no outputs".to_string())
        })?;
        let output_name = output.name.clone();
        let output_classes = match &output.output_type {
            ValueType::Tensor { shape, .. } => shape
                .iter()
                .last()
                .and_then(|&dim| usize::try_from(dim).ok())
                .filter(|&dim| dim > 0),
            _ => None,
        };
        tracing::info!(
            "Classification model output: '{}' (classes: {:?})",
            output_name,
            output_classes
        );

        // 记录所有可用输出用于调试
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Classification output[{}]: '{}'", i, output.name);
        }

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            input_shape,
            output_classes,
        })
    }
}

impl InferenceEngine for Classifier {
    fn run(&self, tensor: InputTensor) -> Result<ScoreVector> {
        let input_tensor = Tensor::from_array(tensor.into_inner())?;

        let predictions: Vec<f32> = {
            // 会话不保证可重入，串行执行
            let mut session = self.session.lock();
            let outputs = session
                .run(inputs![self.input_name.as_str() => input_tensor])
                .map_err(|e| ClassifyError::Inference(format!("Model execution failed: {}", e)))?;

            match outputs.get(self.output_name.as_str()) {
                Some(output) => {
                    let array = output.try_extract_array::<f32>()?;
                    let shape = array.shape();
                    let batch = if shape.len() > 1 { shape[0] } else { 1 };
                    if batch != 1 {
                        return Err(ClassifyError::Inference(format!(
                            "Expected batch size 1 in output, got shape {:?}",
                            shape
                        )));
                    }
                    array.iter().copied().collect()
                }
                None => {
                    // 提供详细的错误诊断信息
                    let available_outputs: Vec<String> =
                        outputs.keys().map(|s| s.to_string()).collect();
                    return Err(ClassifyError::Inference(format!(
                        "Classification output '{}' not found. Available outputs: {:?}",
                        self.output_name, available_outputs
                    )));
                }
            }
        };

        ScoreVector::new(predictions)
    }

    fn input_shape(&self) -> Vec<i64> {
        self.input_shape.clone()
    }

    fn output_classes(&self) -> Option<usize> {
        self.output_classes
    }
}

fn optimization_level(level: i32) -> GraphOptimizationLevel {
    match level {
        i32::MIN..=0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

/// 模型必须接受 NHWC (1, 224, 224, 3) 输入，动态维度 (-1) 视为兼容
fn check_input_signature(shape: &[i64]) -> Result<()> {
    let expected = InputTensor::SHAPE;
    let compatible = shape.len() == expected.len()
        && shape
            .iter()
            .zip(expected.iter())
            .all(|(&dim, &want)| dim < 0 || dim as usize == want);

    if compatible {
        Ok(())
    } else {
        Err(ClassifyError::ModelLoad(format!(
            "Model input shape {:?} is incompatible with {:?}",
            shape, expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_static_and_dynamic_batch_signatures() {
        assert!(check_input_signature(&[1, 224, 224, 3]).is_ok());
        assert!(check_input_signature(&[-1, 224, 224, 3]).is_ok());
    }

    #[test]
    fn rejects_nchw_and_wrong_rank() {
        assert!(check_input_signature(&[1, 3, 224, 224]).is_err());
        assert!(check_input_signature(&[224, 224, 3]).is_err());
        assert!(check_input_signature(&[1, 299, 299, 3]).is_err());
    }

    #[test]
    fn missing_model_is_a_load_error() {
        let config = Config::new("127.0.0.1:0".to_string(), "/nonexistent/model.onnx", false);
        match Classifier::new(&config) {
            Err(ClassifyError::ModelLoad(msg)) => assert!(msg.contains("not found")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("model should not load"),
        }
    }

    #[test]
    fn maps_optimization_levels() {
        assert!(matches!(optimization_level(0), GraphOptimizationLevel::Disable));
        assert!(matches!(optimization_level(2), GraphOptimizationLevel::Level2));
        assert!(matches!(optimization_level(9), GraphOptimizationLevel::Level3));
    }
}
