use crate::classify::InputTensor;
use crate::models::{ClassLabelTable, Classifier, InferenceEngine};
use crate::utils::error::ClassifyError;
use crate::{Config, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// 启动时加载的模型句柄，之后只读，通过 `Arc` 在请求间共享
pub struct ModelManager {
    engine: Arc<dyn InferenceEngine>,
    labels: Arc<ClassLabelTable>,
    model_path: PathBuf,
    intra_threads: usize,
}

impl ModelManager {
    /// 加载模型和标签表，任一失败则服务不能启动
    pub fn load(config: &Config) -> Result<Self> {
        tracing::info!("Initializing model manager...");

        let labels = match &config.labels_path {
            Some(path) => ClassLabelTable::load(path)?,
            None => {
                tracing::info!("No label file configured, using built-in class table");
                ClassLabelTable::default()
            }
        };

        let classifier = Classifier::new(config)?;

        let manager = Self::from_parts(Arc::new(classifier), labels)?
            .with_model_path(config.model_path.clone())
            .with_intra_threads(config.onnx_config.intra_threads);

        manager.warm_up()?;

        tracing::info!(
            "Model manager initialized successfully ({} classes)",
            manager.labels.len()
        );
        Ok(manager)
    }

    /// 由任意推理引擎构建，校验标签数量与模型输出维度一致
    pub fn from_parts(engine: Arc<dyn InferenceEngine>, labels: ClassLabelTable) -> Result<Self> {
        match engine.output_classes() {
            Some(classes) if classes != labels.len() => {
                return Err(ClassifyError::ModelLoad(format!(
                    "Model produces {} classes but the label table has {} entries",
                    classes,
                    labels.len()
                )));
            }
            Some(_) => {}
            None => {
                tracing::warn!("Model output dimension is dynamic, label count checked on warm-up");
            }
        }

        Ok(Self {
            engine,
            labels: Arc::new(labels),
            model_path: PathBuf::new(),
            intra_threads: 0,
        })
    }

    fn with_model_path(mut self, path: PathBuf) -> Self {
        self.model_path = path;
        self
    }

    fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads;
        self
    }

    /// 用全零输入执行一次推理，确认输出长度与标签表一致
    pub fn warm_up(&self) -> Result<()> {
        tracing::debug!("Running warm-up inference...");

        let scores = self.engine.run(InputTensor::zeros()).map_err(|e| {
            ClassifyError::ModelLoad(format!("Warm-up inference failed: {}", e))
        })?;

        if scores.len() != self.labels.len() {
            return Err(ClassifyError::ModelLoad(format!(
                "Model produced {} scores but the label table has {} entries",
                scores.len(),
                self.labels.len()
            )));
        }

        tracing::debug!("Warm-up inference completed");
        Ok(())
    }

    /// 获取推理引擎引用
    pub fn engine(&self) -> Arc<dyn InferenceEngine> {
        Arc::clone(&self.engine)
    }

    /// 获取标签表引用
    pub fn labels(&self) -> Arc<ClassLabelTable> {
        Arc::clone(&self.labels)
    }

    /// 模型健康检查
    pub fn health_check(&self) -> Result<()> {
        tracing::debug!("Performing model health check...");

        if let Some(classes) = self.engine.output_classes() {
            if classes != self.labels.len() {
                return Err(ClassifyError::Internal(
                    "Label table no longer matches model output".to_string(),
                ));
            }
        }

        tracing::debug!("Model health check passed");
        Ok(())
    }

    /// 获取模型统计信息
    pub fn get_stats(&self) -> ModelStats {
        ModelStats {
            model_path: self.model_path.display().to_string(),
            input_shape: self.engine.input_shape(),
            num_classes: self.labels.len(),
            labels: self.labels.iter().map(str::to_string).collect(),
            intra_threads: self.intra_threads,
        }
    }
}

/// 模型统计信息
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub model_path: String,
    pub input_shape: Vec<i64>,
    pub num_classes: usize,
    pub labels: Vec<String>,
    pub intra_threads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ScoreVector;

    struct FixedEngine {
        scores: Vec<f32>,
        declared: Option<usize>,
    }

    impl InferenceEngine for FixedEngine {
        fn run(&self, _tensor: InputTensor) -> Result<ScoreVector> {
            ScoreVector::new(self.scores.clone())
        }

        fn input_shape(&self) -> Vec<i64> {
            vec![1, 224, 224, 3]
        }

        fn output_classes(&self) -> Option<usize> {
            self.declared
        }
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let engine = Arc::new(FixedEngine { scores: vec![0.5; 3], declared: Some(3) });
        let err = ModelManager::from_parts(engine, ClassLabelTable::default()).err();
        assert!(matches!(err, Some(ClassifyError::ModelLoad(_))));
    }

    #[test]
    fn warm_up_catches_dynamic_output_mismatch() {
        let engine = Arc::new(FixedEngine { scores: vec![0.5; 4], declared: None });
        let manager = ModelManager::from_parts(engine, ClassLabelTable::default()).unwrap();
        assert!(manager.warm_up().is_err());
    }

    #[test]
    fn stats_report_labels_and_shape() {
        let engine = Arc::new(FixedEngine { scores: vec![0.2; 5], declared: Some(5) });
        let manager = ModelManager::from_parts(engine, ClassLabelTable::default()).unwrap();
        manager.warm_up().unwrap();
        manager.health_check().unwrap();

        let stats = manager.get_stats();
        assert_eq!(stats.num_classes, 5);
        assert_eq!(stats.input_shape, vec![1, 224, 224, 3]);
        assert_eq!(stats.labels[2], "Gray Leaf Spot");
    }
}
