use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptGateError {
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP 请求错误: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("无效的请求: {0}")]
    InvalidRequest(String),

    #[error("不支持的 AI 提供商: '{0}'，请选择 'openai' 或 'google'")]
    UnsupportedProvider(String),

    #[error("{0} 未配置，请在 .env 文件或环境变量中设置")]
    MissingCredential(&'static str),

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl PromptGateError {
    pub fn config(msg: impl Into<String>) -> Self {
        PromptGateError::ConfigError(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        PromptGateError::InvalidRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PromptGateError::InternalError(msg.into())
    }
}
