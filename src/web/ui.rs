use crate::{
    classify::PredictionResult,
    utils::error::ClassifyError,
    web::{extractors::RequestId, AppState},
    Result,
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{Html, IntoResponse, Response},
};
use std::time::Instant;

/// 表单中文件字段的名称
pub const IMAGE_FIELD: &str = "image";

/// 结果页展示的数据
#[derive(Debug, Clone)]
pub struct ResultView {
    pub image_url: String,
    pub prediction: PredictionResult,
}

/// 首页处理器
pub async fn index_handler() -> Html<String> {
    Html(render_index(None))
}

/// 表单上传处理器：保存 -> 分类 -> 渲染结果
pub async fn upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let start_time = Instant::now();
    tracing::info!("Processing form upload: request_id={}", request_id);

    let outcome = match multipart {
        Ok(multipart) => classify_upload(&state, multipart).await,
        Err(rejection) => {
            tracing::debug!("Form body is not multipart: {}", rejection.body_text());
            Err(ClassifyError::InvalidInput("No image uploaded".to_string()))
        }
    };

    match outcome {
        Ok(view) => {
            tracing::info!(
                "Form upload completed: request_id={}, label={}, confidence={}, time={:.3}s",
                request_id,
                view.prediction.label,
                view.prediction.confidence_percent,
                start_time.elapsed().as_secs_f32()
            );
            Html(render_result(&view)).into_response()
        }
        Err(err) => error_page(&request_id, err),
    }
}

async fn classify_upload(state: &AppState, mut multipart: Multipart) -> Result<ResultView> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ClassifyError::InvalidInput(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        // 没有filename的同名字段是普通表单值，不算上传文件
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ClassifyError::InvalidInput(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, data.to_vec()));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| ClassifyError::InvalidInput("No image uploaded".to_string()))?;

    if file_name.is_empty() {
        return Err(ClassifyError::InvalidInput("No image selected".to_string()));
    }

    let stored = state.uploads.save(&file_name, &data).await?;
    // 同名上传会互相覆盖，分类只使用本请求内存中的字节
    let prediction = state.pipeline.classify_bytes(data).await?;

    Ok(ResultView {
        image_url: stored.url,
        prediction,
    })
}

/// 用户错误回到表单并提示；其他错误记录日志，只展示通用提示
fn error_page(request_id: &str, err: ClassifyError) -> Response {
    let status = err.status_code();
    if err.is_user_error() {
        tracing::warn!("Form upload rejected: request_id={}, {}", request_id, err);
    } else {
        tracing::error!("Form upload failed: request_id={}, {}", request_id, err);
    }

    (status, Html(render_index(Some(&err.user_message())))).into_response()
}

/// 渲染上传表单，可带错误提示
pub fn render_index(error: Option<&str>) -> String {
    let error_html = error
        .map(|msg| format!(r#"<p class="error">{}</p>"#, escape_html(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Coconut Tree Disease Classifier</title>
    <style>{style}</style>
</head>
<body>
    <div class="container">
        <h1>Coconut Tree Disease Classifier</h1>
        <p class="subtitle">Upload a photo of a coconut tree to identify its condition.</p>
        {error_html}
        <form method="post" action="/" enctype="multipart/form-data">
            <input type="file" name="{field}" accept="image/*">
            <button type="submit" class="btn">Classify</button>
        </form>
    </div>
</body>
</html>"#,
        style = STYLE,
        error_html = error_html,
        field = IMAGE_FIELD,
    )
}

/// 渲染分类结果
pub fn render_result(view: &ResultView) -> String {
    let prediction = &view.prediction;
    let message_html = prediction
        .message
        .as_deref()
        .map(|msg| format!(r#"<p class="message">{}</p>"#, escape_html(msg)))
        .unwrap_or_default();
    let label_class = if prediction.is_confident() {
        "label"
    } else {
        "label low"
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Classification Result</title>
    <style>{style}</style>
</head>
<body>
    <div class="container">
        <h1>Classification Result</h1>
        <img class="preview" src="{image_url}" alt="Uploaded image">
        <p class="{label_class}">Prediction: <strong>{label}</strong></p>
        <p class="confidence">Confidence: {confidence}</p>
        {message_html}
        <a class="btn" href="/">Classify another image</a>
    </div>
</body>
</html>"#,
        style = STYLE,
        image_url = escape_html(&view.image_url),
        label_class = label_class,
        label = escape_html(&prediction.label),
        confidence = escape_html(&prediction.confidence_percent),
        message_html = message_html,
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #2f855a 0%, #276749 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            color: #333;
        }
        .container {
            background: white;
            border-radius: 20px;
            padding: 40px;
            box-shadow: 0 20px 60px rgba(0, 0, 0, 0.1);
            max-width: 640px;
            width: 90%;
            text-align: center;
        }
        h1 { color: #276749; margin-bottom: 10px; }
        .subtitle { color: #666; margin-bottom: 30px; }
        form { display: flex; flex-direction: column; gap: 20px; align-items: center; }
        .btn {
            display: inline-block;
            background: #2f855a;
            color: white;
            border: none;
            padding: 12px 28px;
            border-radius: 10px;
            font-size: 1em;
            cursor: pointer;
            text-decoration: none;
            margin-top: 20px;
        }
        .error { color: #c53030; background: #fff5f5; padding: 10px; border-radius: 8px; margin-bottom: 20px; }
        .preview { max-width: 100%; max-height: 320px; border-radius: 12px; margin: 20px 0; }
        .label { font-size: 1.4em; margin-bottom: 8px; }
        .label.low strong { color: #c05621; }
        .confidence { color: #4a5568; }
        .message { color: #c05621; margin-top: 12px; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Outcome;

    #[test]
    fn index_shows_escaped_error() {
        let html = render_index(Some("<No image uploaded>"));
        assert!(html.contains("&lt;No image uploaded&gt;"));
        assert!(html.contains(r#"name="image""#));
        assert!(html.contains("multipart/form-data"));
    }

    #[test]
    fn index_without_error_has_no_error_block() {
        assert!(!render_index(None).contains(r#"class="error""#));
    }

    #[test]
    fn result_page_shows_prediction_and_message() {
        let view = ResultView {
            image_url: "/static/uploads/tree.jpg".to_string(),
            prediction: PredictionResult {
                label: "Low Confidence".to_string(),
                confidence: 0.5,
                confidence_percent: "50.00%".to_string(),
                message: Some("Please upload a proper image of a coconut tree.".to_string()),
                outcome: Outcome::LowConfidence,
            },
        };

        let html = render_result(&view);
        assert!(html.contains(r#"src="/static/uploads/tree.jpg""#));
        assert!(html.contains("<strong>Low Confidence</strong>"));
        assert!(html.contains("50.00%"));
        assert!(html.contains("Please upload a proper image of a coconut tree."));
    }

    #[test]
    fn confident_result_has_no_message() {
        let view = ResultView {
            image_url: "/static/uploads/leaf.png".to_string(),
            prediction: PredictionResult {
                label: "Leaf Rot".to_string(),
                confidence: 0.91,
                confidence_percent: "91.00%".to_string(),
                message: None,
                outcome: Outcome::Confident { index: 3 },
            },
        };

        let html = render_result(&view);
        assert!(html.contains("<strong>Leaf Rot</strong>"));
        assert!(!html.contains(r#"class="message""#));
    }
}
