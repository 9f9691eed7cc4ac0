use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Inference timed out after {0:?}")]
    InferenceTimeout(Duration),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ClassifyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClassifyError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ClassifyError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            ClassifyError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ClassifyError::ImageDecode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ClassifyError::Base64(_) => StatusCode::BAD_REQUEST,
            ClassifyError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            ClassifyError::InferenceTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ClassifyError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            ClassifyError::ImageProcessing(_) => "IMAGE_PROCESSING_ERROR",
            ClassifyError::Inference(_) => "INFERENCE_ERROR",
            ClassifyError::InferenceTimeout(_) => "INFERENCE_TIMEOUT",
            ClassifyError::InvalidInput(_) => "INVALID_INPUT",
            ClassifyError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            ClassifyError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ClassifyError::Config(_) => "CONFIG_ERROR",
            ClassifyError::Io(_) => "IO_ERROR",
            ClassifyError::Base64(_) => "BASE64_DECODE_ERROR",
            ClassifyError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            ClassifyError::Ort(_) => "ORT_ERROR",
            ClassifyError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 用户可以自行纠正的错误（重新上传即可），其余错误只向用户展示通用提示
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ClassifyError::InvalidInput(_)
                | ClassifyError::FileTooLarge(_, _)
                | ClassifyError::UnsupportedFormat(_)
                | ClassifyError::ImageDecode(_)
                | ClassifyError::Base64(_)
        )
    }

    /// 页面上展示给用户的错误信息
    pub fn user_message(&self) -> String {
        match self {
            ClassifyError::InvalidInput(msg) => msg.clone(),
            ClassifyError::ImageDecode(_) => {
                "The uploaded file is not a valid image. Please upload a JPEG or PNG photo."
                    .to_string()
            }
            ClassifyError::FileTooLarge(_, max) => {
                format!("The uploaded file is too large (limit {} MB).", max / (1024 * 1024))
            }
            ClassifyError::UnsupportedFormat(format) => {
                format!("Unsupported file type: {}", format)
            }
            _ => "Something went wrong while classifying the image. Please try again later."
                .to_string(),
        }
    }
}

impl IntoResponse for ClassifyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if status.is_server_error() {
            tracing::error!("Request failed: {} ({})", self, status);
        } else {
            tracing::warn!("Request rejected: {} ({})", self, status);
        }

        (status, axum::Json(error_response)).into_response()
    }
}
