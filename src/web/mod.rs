pub mod handlers;
pub mod middleware;
pub mod extractors;
pub mod ui;
pub mod uploads;

use crate::{
    classify::ClassificationPipeline, models::ModelManager, utils::error::ClassifyError, Config,
    Result,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, timeout::TimeoutLayer,
};
use uploads::{UploadStore, UPLOAD_URL_PREFIX};

/// 请求处理器共享的状态，启动时构建一次
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: ClassificationPipeline,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(config: Config, models: Arc<ModelManager>) -> Self {
        let pipeline = ClassificationPipeline::from_config(models, &config);
        let uploads = UploadStore::new(
            config.upload_dir.clone(),
            config.server_config.max_request_size,
        );

        Self {
            config: Arc::new(config),
            pipeline,
            uploads,
        }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    // 加载模型，失败则不启动服务
    let models = Arc::new(ModelManager::load(&config)?);

    let state = AppState::new(config.clone(), models);
    state.uploads.init().await?;

    // 构建应用路由
    let app = create_app(state);

    // 解析绑定地址
    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        ClassifyError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /                     - Upload form");
    tracing::info!("  POST /                     - Form upload");
    tracing::info!("  POST /api/classify         - JSON base64 upload");
    tracing::info!("  POST /api/classify/upload  - Multipart file upload");
    tracing::info!("  GET  /health               - Health check");
    tracing::info!("  GET  /api/info             - Service information");

    // 启动服务器
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        ClassifyError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ClassifyError::Internal(format!("Server failed: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    let max_request_size = config.server_config.max_request_size;

    let app = Router::new()
        // Web UI路由
        .route("/", get(ui::index_handler).post(ui::upload_handler))
        // 分类API路由
        .route("/api/classify", post(handlers::classify_json_handler))
        .route("/api/classify/upload", post(handlers::classify_upload_handler))
        // 系统路由
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        // 已上传图片
        .nest_service(UPLOAD_URL_PREFIX, ServeDir::new(&config.upload_dir))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(RequestBodyLimitLayer::new(max_request_size))
        .layer(TimeoutLayer::new(config.request_timeout()));

    // 开发模式使用宽松CORS
    let app = if config.dev_mode {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    app.with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// 健康检查端点
async fn health_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    state.pipeline.models().health_check()?;

    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// 服务信息端点
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.pipeline.models().get_stats();

    Json(json!({
        "service": "Coconut Classifier Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "model": stats,
        "confidence_threshold": state.pipeline.threshold(),
        "upload_dir": state.uploads.dir().display().to_string(),
        "dev_mode": state.config.dev_mode,
    }))
}
