use crate::config::{ModelConfig, ModelRole};
use crate::providers::{decode_snippet, TEXT_FILE_SNIPPET_LIMIT};
use crate::types::UploadedFile;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// 获取全局 HTTP 客户端
fn get_http_client() -> &'static Client {
    use once_cell::sync::Lazy;
    static CLIENT: Lazy<Client> = Lazy::new(|| {
        Client::builder()
            .timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap()
    });
    &CLIENT
}

/// Gemini 适配器内部错误分类
///
/// 内容安全拦截与传输层失败分开表达，各自有独立的提示文案。
#[derive(Debug, Error)]
enum GeminiError {
    #[error("Google API 连接失败 - {0}")]
    Connection(reqwest::Error),

    #[error("Google API 参数无效 - {0}")]
    InvalidArgument(String),

    #[error("Google API 拒绝访问 - {0}，请确认 GOOGLE_API_KEY 有效且已启用 Generative Language API")]
    PermissionDenied(String),

    #[error("Google API 配额已用尽 - {0}")]
    QuotaExhausted(String),

    #[error("Google API 错误 (状态码 {status}) - {message}")]
    Api { status: u16, message: String },

    #[error("提示词被 Google API 安全策略拦截，原因: {0}")]
    Blocked(String),

    #[error("Google Gemini 未返回内容，结束原因: {0}")]
    NoContent(String),

    #[error("Google Gemini 返回了空响应")]
    Empty,

    #[error("上传文件缺少文件名或 MIME 类型，Google Gemini 需要两者")]
    MissingFileMetadata,

    #[error("Google Gemini 返回的响应结构无法解析")]
    MalformedResponse,
}

/// Gemini API 请求格式
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Gemini API 响应格式
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

/// 根据文件类型选择模型并组装请求内容
///
/// 图片走视觉模型，提示词和图片字节作为两个有序 part（文本在前）；
/// 其他文件解码为文本并带文件头信息附加在提示词之后；无文件时只发提示词。
fn build_request<'a>(
    models: &'a ModelConfig,
    text: &str,
    file: Option<&UploadedFile>,
) -> Result<(&'a str, GeminiRequest), GeminiError> {
    let (model, parts) = match file {
        Some(f) => {
            let (filename, mime) = match (f.filename.as_deref(), f.mime_type.as_deref()) {
                (Some(name), Some(mime)) => (name, mime),
                _ => return Err(GeminiError::MissingFileMetadata),
            };

            if f.is_image() {
                let parts = vec![
                    GeminiPart::Text {
                        text: text.to_string(),
                    },
                    GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: mime.to_string(),
                            data: BASE64.encode(&f.bytes),
                        },
                    },
                ];
                (models.model(ModelRole::Vision), parts)
            } else {
                let snippet = decode_snippet(&f.bytes, TEXT_FILE_SNIPPET_LIMIT);
                let combined = format!(
                    "{}\n\n--- User Uploaded File: {} (MIME type: {}) ---\n{}\n--- End of File Content ---",
                    text, filename, mime, snippet
                );
                (
                    models.model(ModelRole::Default),
                    vec![GeminiPart::Text { text: combined }],
                )
            }
        }
        None => (
            models.model(ModelRole::Default),
            vec![GeminiPart::Text {
                text: text.to_string(),
            }],
        ),
    };

    Ok((
        model,
        GeminiRequest {
            contents: vec![GeminiContent { parts }],
        },
    ))
}

/// 从响应中提取生成文本
///
/// 先检查安全拦截，再检查候选内容；空文本且非正常结束时带上结束原因。
fn extract_text(resp: GeminiResponse) -> Result<String, GeminiError> {
    if let Some(feedback) = &resp.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Err(GeminiError::Blocked(reason.clone()));
        }
    }

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or(GeminiError::Empty)?;

    let finish_reason = candidate.finish_reason.unwrap_or_else(|| "STOP".to_string());
    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let trimmed = text.trim();
    if trimmed.is_empty() {
        if finish_reason != "STOP" {
            return Err(GeminiError::NoContent(finish_reason));
        }
        return Err(GeminiError::Empty);
    }
    Ok(trimmed.to_string())
}

/// 按状态码归类上游失败
fn classify_failure(status: u16, message: String) -> GeminiError {
    match status {
        400 => GeminiError::InvalidArgument(message),
        401 | 403 => GeminiError::PermissionDenied(message),
        429 => GeminiError::QuotaExhausted(message),
        _ => GeminiError::Api { status, message },
    }
}

/// 调用 Google Gemini 生成接口
///
/// 所有失败都折叠为 "Error: ..." 文本返回，绝不向上抛出。
pub async fn generate(
    models: &ModelConfig,
    api_key: &str,
    text: &str,
    file: Option<&UploadedFile>,
) -> String {
    match request_generation(models, api_key, text, file).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Google Gemini 调用失败: {}", e);
            format!("Error: {}", e)
        }
    }
}

async fn request_generation(
    models: &ModelConfig,
    api_key: &str,
    text: &str,
    file: Option<&UploadedFile>,
) -> Result<String, GeminiError> {
    let client = get_http_client();

    let (model, gemini_req) = build_request(models, text, file)?;

    // 构建 URL（密钥通过 HTTP 头传递，不出现在 URL 中）
    let api_base = if models.api_base.is_empty() {
        "https://generativelanguage.googleapis.com"
    } else {
        &models.api_base
    };
    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        api_base.trim_end_matches('/'),
        model
    );

    info!("向 Google Gemini 模型 {} 发送请求，提示词长度 {}", model, text.len());

    // 发送请求
    let response = client
        .post(&url)
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", api_key)
        .json(&gemini_req)
        .send()
        .await
        .map_err(GeminiError::Connection)?;

    // 检查状态码
    let status = response.status();
    if !status.is_success() {
        // 限制错误响应体大小
        let error_body = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(4096)
            .collect::<String>();
        return Err(classify_failure(status.as_u16(), error_body));
    }

    let gemini_resp: GeminiResponse = response
        .json()
        .await
        .map_err(|_| GeminiError::MalformedResponse)?;
    extract_text(gemini_resp)
}
