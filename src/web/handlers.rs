use crate::{
    classify::PredictionResult,
    image::ImageLoader,
    utils::error::ClassifyError,
    web::{
        extractors::{RequestId, ValidatedJson},
        ui::IMAGE_FIELD,
        AppState,
    },
    Result,
};
use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// JSON请求体（base64模式）
#[derive(Debug, Deserialize)]
pub struct ClassifyJsonRequest {
    /// Base64编码的图像数据，可带数据URL前缀
    pub image: String,

    /// 原始文件名，仅用于日志
    #[serde(default)]
    pub filename: Option<String>,
}

/// JSON响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// JSON base64上传处理器
pub async fn classify_json_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ValidatedJson(request): ValidatedJson<ClassifyJsonRequest>,
) -> Result<Json<ApiResponse<PredictionResult>>> {
    let start_time = Instant::now();

    tracing::info!(
        "Processing JSON classify request: request_id={}, filename={:?}",
        request_id,
        request.filename
    );

    let image_bytes = ImageLoader::decode_base64(&request.image)?;
    let result = state.pipeline.classify_bytes(image_bytes).await?;

    tracing::info!(
        "JSON classify completed: request_id={}, label={}, time={:.3}s",
        request_id,
        result.label,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(result, request_id)))
}

/// Multipart文件上传处理器
pub async fn classify_upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<PredictionResult>>> {
    let start_time = Instant::now();

    tracing::info!("Processing multipart classify request: request_id={}", request_id);

    let mut image_data: Option<Vec<u8>> = None;

    // 解析multipart数据
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ClassifyError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        if field_name != IMAGE_FIELD {
            tracing::debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        // 验证内容类型
        if let Some(content_type) = field.content_type() {
            if !content_type.starts_with("image/") {
                return Err(ClassifyError::UnsupportedFormat(content_type.to_string()));
            }
        }

        let data = field.bytes().await.map_err(|e| {
            ClassifyError::InvalidInput(format!("Failed to read file data: {}", e))
        })?;

        if data.is_empty() {
            return Err(ClassifyError::InvalidInput("Empty file".to_string()));
        }

        tracing::debug!("Received file: {} bytes", data.len());
        image_data = Some(data.to_vec());
        break;
    }

    let image_data =
        image_data.ok_or_else(|| ClassifyError::InvalidInput("No image uploaded".to_string()))?;

    let result = state.pipeline.classify_bytes(image_data).await?;

    tracing::info!(
        "Upload classify completed: request_id={}, label={}, time={:.3}s",
        request_id,
        result.label,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(result, request_id)))
}
