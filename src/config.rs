use crate::utils::error::ClassifyError;
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;

/// 默认置信度阈值 (60%)
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.60;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型文件路径
    pub model_path: PathBuf,

    /// 类别标签文件路径，未设置时使用内置标签表
    pub labels_path: Option<PathBuf>,

    /// 上传文件目录
    pub upload_dir: PathBuf,

    /// 置信度阈值
    pub confidence_threshold: f32,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 单次推理超时时间（秒）
    pub inference_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

impl Config {
    pub fn new(bind_addr: String, model_path: impl Into<PathBuf>, dev_mode: bool) -> Self {
        let cpu_cores = num_cpus::get();

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 }, // 开发模式更长超时
            inference_timeout: 30,
            max_request_size: 50 * 1024 * 1024, // 50MB
        };

        Self {
            bind_addr,
            model_path: model_path.into(),
            labels_path: None,
            upload_dir: PathBuf::from("static/uploads"),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            dev_mode,
            onnx_config,
            server_config,
        }
    }

    pub fn with_labels_path(mut self, path: Option<PathBuf>) -> Self {
        self.labels_path = path;
        self
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_inference_timeout(mut self, secs: u64) -> Self {
        self.server_config.inference_timeout = secs;
        self
    }

    pub fn with_intra_threads(mut self, threads: Option<usize>) -> Self {
        if let Some(threads) = threads {
            self.onnx_config.intra_threads = threads.max(1);
        }
        self
    }

    /// 启动前校验配置，所有值在进程生命周期内固定
    pub fn validate(&self) -> Result<()> {
        let threshold = self.confidence_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ClassifyError::Config(format!(
                "Confidence threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        if self.server_config.inference_timeout == 0 {
            return Err(ClassifyError::Config(
                "Inference timeout must be greater than zero".to_string(),
            ));
        }

        if self.upload_dir.as_os_str().is_empty() {
            return Err(ClassifyError::Config("Upload directory is empty".to_string()));
        }

        Ok(())
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.server_config.inference_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server_config.request_timeout)
    }
}
