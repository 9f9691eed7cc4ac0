use crate::{
    classify::{decide, InputTensor, PredictionResult},
    image::{ImageLoader, ImagePreprocessor},
    models::ModelManager,
    utils::error::ClassifyError,
    Config, Result,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 分类流水线：预处理 -> 推理 -> 置信度判定
#[derive(Clone)]
pub struct ClassificationPipeline {
    models: Arc<ModelManager>,
    threshold: f32,
    inference_timeout: Duration,
}

impl ClassificationPipeline {
    pub fn new(models: Arc<ModelManager>, threshold: f32, inference_timeout: Duration) -> Self {
        Self {
            models,
            threshold,
            inference_timeout,
        }
    }

    pub fn from_config(models: Arc<ModelManager>, config: &Config) -> Self {
        Self::new(models, config.confidence_threshold, config.inference_timeout())
    }

    pub fn models(&self) -> &Arc<ModelManager> {
        &self.models
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// 处理内存中的图像字节
    pub async fn classify_bytes(&self, bytes: Vec<u8>) -> Result<PredictionResult> {
        tracing::debug!("Classifying in-memory image: {} bytes", bytes.len());
        self.run_blocking(move || {
            let image = ImageLoader::from_bytes(&bytes)?;
            ImagePreprocessor::preprocess(&image)
        })
        .await
    }

    /// 预处理和推理都是CPU密集型操作，放到阻塞线程池执行，并限制总耗时
    async fn run_blocking<F>(&self, load: F) -> Result<PredictionResult>
    where
        F: FnOnce() -> Result<InputTensor> + Send + 'static,
    {
        let engine = self.models.engine();
        let labels = self.models.labels();
        let threshold = self.threshold;
        let start_time = Instant::now();

        let task = tokio::task::spawn_blocking(move || {
            let tensor = load()?;
            let preprocessing_time = start_time.elapsed();

            let inference_start = Instant::now();
            let scores = engine.run(tensor)?;
            let inference_time = inference_start.elapsed();

            tracing::debug!(
                "Scores: {:?} (preprocess={:.3}s, inference={:.3}s)",
                scores.as_slice(),
                preprocessing_time.as_secs_f32(),
                inference_time.as_secs_f32()
            );

            decide(&scores, &labels, threshold)
        });

        let result = match tokio::time::timeout(self.inference_timeout, task).await {
            Ok(joined) => joined.map_err(|e| {
                ClassifyError::Internal(format!("Classification task failed: {}", e))
            })??,
            Err(_) => {
                tracing::error!(
                    "Classification exceeded {:?}, returning timeout",
                    self.inference_timeout
                );
                return Err(ClassifyError::InferenceTimeout(self.inference_timeout));
            }
        };

        tracing::info!(
            "Classification completed: label={}, confidence={}, time={:.3}s",
            result.label,
            result.confidence_percent,
            start_time.elapsed().as_secs_f32()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Outcome, ScoreVector, LOW_CONFIDENCE_LABEL};
    use crate::models::{ClassLabelTable, InferenceEngine};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubEngine {
        scores: Vec<f32>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StubEngine {
        fn new(scores: &[f32]) -> Self {
            Self {
                scores: scores.to_vec(),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl InferenceEngine for StubEngine {
        fn run(&self, tensor: InputTensor) -> Result<ScoreVector> {
            assert_eq!(tensor.shape(), &InputTensor::SHAPE);
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            ScoreVector::new(self.scores.clone())
        }

        fn input_shape(&self) -> Vec<i64> {
            vec![1, 224, 224, 3]
        }

        fn output_classes(&self) -> Option<usize> {
            Some(self.scores.len())
        }
    }

    fn pipeline(engine: Arc<StubEngine>, timeout: Duration) -> ClassificationPipeline {
        let models = ModelManager::from_parts(engine, ClassLabelTable::default()).unwrap();
        ClassificationPipeline::new(Arc::new(models), 0.60, timeout)
    }

    fn jpeg_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(300, 120, Rgb([34, 139, 34]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn classifies_jpeg_bytes() {
        let engine = Arc::new(StubEngine::new(&[0.02, 0.02, 0.02, 0.9, 0.04]));
        let pipeline = pipeline(engine.clone(), Duration::from_secs(5));

        let result = pipeline.classify_bytes(jpeg_bytes()).await.unwrap();
        assert_eq!(result.label, "Leaf Rot");
        assert_eq!(result.outcome, Outcome::Confident { index: 3 });
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn low_scores_are_reported_as_low_confidence() {
        let engine = Arc::new(StubEngine::new(&[0.3, 0.2, 0.2, 0.2, 0.1]));
        let pipeline = pipeline(engine, Duration::from_secs(5));

        let result = pipeline.classify_bytes(jpeg_bytes()).await.unwrap();
        assert_eq!(result.label, LOW_CONFIDENCE_LABEL);
        assert_eq!(result.confidence_percent, "30.00%");
    }

    #[tokio::test]
    async fn decode_failure_skips_inference() {
        let engine = Arc::new(StubEngine::new(&[0.9, 0.1, 0.0, 0.0, 0.0]));
        let pipeline = pipeline(engine.clone(), Duration::from_secs(5));

        let err = pipeline
            .classify_bytes(b"GIF? no, just text".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifyError::ImageDecode(_)));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_inference_times_out() {
        let mut stub = StubEngine::new(&[0.9, 0.1, 0.0, 0.0, 0.0]);
        stub.delay = Duration::from_millis(500);
        let pipeline = pipeline(Arc::new(stub), Duration::from_millis(50));

        let err = pipeline.classify_bytes(jpeg_bytes()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::InferenceTimeout(_)));
    }
}
