use anyhow::Result;
use clap::Parser;
use coconut_classifier::{config::Config, web::serve};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coconut-classifier")]
#[command(about = "Coconut tree disease classification web service")]
struct Args {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listening port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// ONNX model artifact path
    #[arg(long, env = "MODEL_PATH", default_value = "models/coconut_model.onnx")]
    model_path: PathBuf,

    /// Class label file, one label per line in training order
    #[arg(long, env = "LABELS_PATH")]
    labels_path: Option<PathBuf>,

    /// Directory where uploaded images are saved
    #[arg(long, env = "UPLOAD_DIR", default_value = "static/uploads")]
    upload_dir: PathBuf,

    /// Minimum top score for a confident prediction
    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = 0.60)]
    confidence_threshold: f32,

    /// Inference timeout in seconds
    #[arg(long, env = "INFERENCE_TIMEOUT_SECS", default_value_t = 30)]
    inference_timeout: u64,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INTRA_THREADS")]
    intra_threads: Option<usize>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Enable development mode
    #[arg(long, env = "DEV_MODE")]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志系统
    let default_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| if args.dev { "debug" } else { "info" }.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting coconut classifier service...");
    tracing::info!("Model path: {}", args.model_path.display());
    tracing::info!("Upload directory: {}", args.upload_dir.display());
    if args.dev {
        tracing::warn!("Development mode enabled");
    }

    // 创建配置
    let config = Config::new(format!("{}:{}", args.host, args.port), args.model_path, args.dev)
        .with_labels_path(args.labels_path)
        .with_upload_dir(args.upload_dir)
        .with_confidence_threshold(args.confidence_threshold)
        .with_inference_timeout(args.inference_timeout)
        .with_intra_threads(args.intra_threads);
    config.validate()?;

    // 启动服务器
    serve(config).await?;

    Ok(())
}
