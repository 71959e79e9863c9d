use crate::config::{ModelConfig, ModelRole};
use crate::providers::{decode_snippet, CHAT_SNIPPET_LIMIT};
use crate::types::UploadedFile;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// 单次补全的输出上限
const MAX_COMPLETION_TOKENS: u32 = 1024;

/// 获取全局 HTTP 客户端（连接池复用）
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

/// OpenAI 适配器内部错误分类
///
/// reqwest / 上游 API 的细节在本模块内收敛，对外只暴露 "Error: ..." 文本。
#[derive(Debug, Error)]
enum OpenAiError {
    #[error("OpenAI API 连接失败 - {0}")]
    Connection(reqwest::Error),

    #[error("OpenAI API 认证失败 - {0}，请确认 OPENAI_API_KEY 有效")]
    Auth(String),

    #[error("OpenAI API 触发限流 - {0}")]
    RateLimit(String),

    #[error("OpenAI API 错误 (状态码 {status}) - {message}")]
    Api { status: u16, message: String },

    #[error("OpenAI 返回了空响应")]
    Empty,

    #[error("OpenAI 返回的响应结构不完整")]
    MalformedResponse,
}

/// 聊天补全请求格式
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// 聊天补全响应格式
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// 构建两条消息的对话：system + user
///
/// 有文件时 system 消息携带文件名和内容片段，否则使用通用 system 消息；
/// user 消息始终只含原始提示词。
fn build_messages(text: &str, file: Option<&UploadedFile>) -> Vec<ChatMessage> {
    let system = match file {
        Some(f) => {
            let snippet = decode_snippet(&f.bytes, CHAT_SNIPPET_LIMIT);
            match f.filename.as_deref() {
                Some(name) => format!(
                    "The user has uploaded a file named '{}'. Its content (first {} characters) is: {}",
                    name, CHAT_SNIPPET_LIMIT, snippet
                ),
                None => format!(
                    "The user has uploaded a file (name not provided). Its content (first {} characters) is: {}",
                    CHAT_SNIPPET_LIMIT, snippet
                ),
            }
        }
        None => "You are a helpful assistant.".to_string(),
    };

    vec![
        ChatMessage {
            role: "system",
            content: system,
        },
        ChatMessage {
            role: "user",
            content: text.to_string(),
        },
    ]
}

/// 按状态码归类上游失败
fn classify_failure(status: u16, message: String) -> OpenAiError {
    match status {
        401 => OpenAiError::Auth(message),
        429 => OpenAiError::RateLimit(message),
        _ => OpenAiError::Api { status, message },
    }
}

/// 调用 OpenAI 聊天补全接口
///
/// 所有失败都折叠为 "Error: ..." 文本返回，绝不向上抛出。
pub async fn generate(
    models: &ModelConfig,
    api_key: &str,
    text: &str,
    file: Option<&UploadedFile>,
) -> String {
    match request_completion(models, api_key, text, file).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("OpenAI 调用失败: {}", e);
            format!("Error: {}", e)
        }
    }
}

async fn request_completion(
    models: &ModelConfig,
    api_key: &str,
    text: &str,
    file: Option<&UploadedFile>,
) -> Result<String, OpenAiError> {
    let client = get_http_client();

    // 构建 URL
    let api_base = if models.api_base.is_empty() {
        "https://api.openai.com/v1"
    } else {
        &models.api_base
    };
    let url = format!("{}/chat/completions", api_base.trim_end_matches('/'));

    let model = models.model(ModelRole::Default);
    let payload = ChatCompletionRequest {
        model,
        messages: build_messages(text, file),
        max_tokens: MAX_COMPLETION_TOKENS,
    };

    info!("向 OpenAI 模型 {} 发送请求，提示词长度 {}", model, text.len());

    // 发送请求
    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await
        .map_err(OpenAiError::Connection)?;

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

    // 解析响应，取第一条补全
    let completion: ChatCompletionResponse = response
        .json()
        .await
        .map_err(|_| OpenAiError::MalformedResponse)?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or(OpenAiError::MalformedResponse)?;

    let content = choice.message.content.unwrap_or_default();
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(OpenAiError::Empty);
    }
    Ok(trimmed.to_string())
}
