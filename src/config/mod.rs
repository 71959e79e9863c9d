use crate::error::PromptGateError;
use crate::types::Provider;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// 配置缺失时的内置回退模型
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const OPENAI_VISION_MODEL: &str = "gpt-4-turbo";
pub const GOOGLE_DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
pub const GOOGLE_VISION_MODEL: &str = "gemini-1.5-flash-latest";

/// 模型角色：普通文本生成或视觉
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Default,
    Vision,
}

/// 单个提供商的模型配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub default_model: String,
    #[serde(default)]
    pub vision_model: String,
    /// 为空时使用提供商官方地址
    #[serde(default)]
    pub api_base: String,
}

impl ModelConfig {
    pub fn model(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Default => &self.default_model,
            ModelRole::Vision => &self.vision_model,
        }
    }
}

/// API 凭证，进程启动时从环境变量读取一次
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var(Provider::OpenAi.env_key())
                .ok()
                .filter(|k| !k.is_empty()),
            google_api_key: std::env::var(Provider::Google.env_key())
                .ok()
                .filter(|k| !k.is_empty()),
        }
    }
}

/// 主配置结构（加载后不可变）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub openai: ModelConfig,
    #[serde(default)]
    pub google: ModelConfig,
    #[serde(skip)]
    pub credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            openai: ModelConfig {
                default_model: OPENAI_DEFAULT_MODEL.to_string(),
                vision_model: OPENAI_VISION_MODEL.to_string(),
                api_base: String::new(),
            },
            google: ModelConfig {
                default_model: GOOGLE_DEFAULT_MODEL.to_string(),
                vision_model: GOOGLE_VISION_MODEL.to_string(),
                api_base: String::new(),
            },
            credentials: Credentials::default(),
        }
    }
}

impl Config {
    /// 从 YAML 文件加载配置
    ///
    /// 文件缺失、不可读或格式错误都不是致命的：回退到内置默认模型并告警。
    /// 部分缺失的键逐项补齐。
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Config>(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("配置文件 {} 解析失败: {}，使用内置默认模型", path.display(), e);
                    Config::default()
                }
            },
            Err(e) => {
                warn!("无法读取配置文件 {}: {}，使用内置默认模型", path.display(), e);
                Config::default()
            }
        };
        config.fill_missing();
        config
    }

    /// 补齐缺失的模型名
    fn fill_missing(&mut self) {
        if self.openai.default_model.is_empty() {
            warn!("openai.default_model 未配置，回退到 {}", OPENAI_DEFAULT_MODEL);
            self.openai.default_model = OPENAI_DEFAULT_MODEL.to_string();
        }
        if self.openai.vision_model.is_empty() {
            warn!("openai.vision_model 未配置，回退到 {}", OPENAI_VISION_MODEL);
            self.openai.vision_model = OPENAI_VISION_MODEL.to_string();
        }
        if self.google.default_model.is_empty() {
            warn!("google.default_model 未配置，回退到 {}", GOOGLE_DEFAULT_MODEL);
            self.google.default_model = GOOGLE_DEFAULT_MODEL.to_string();
        }
        if self.google.vision_model.is_empty() {
            warn!("google.vision_model 未配置，回退到 {}", GOOGLE_VISION_MODEL);
            self.google.vision_model = GOOGLE_VISION_MODEL.to_string();
        }
    }

    /// 从环境变量读取 API 凭证
    pub fn with_env_credentials(mut self) -> Self {
        self.credentials = Credentials::from_env();
        self
    }

    pub fn provider_config(&self, provider: Provider) -> &ModelConfig {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::Google => &self.google,
        }
    }

    /// 按提供商与角色查找模型标识
    pub fn model(&self, provider: Provider, role: ModelRole) -> &str {
        self.provider_config(provider).model(role)
    }

    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAi => self.credentials.openai_api_key.as_deref(),
            Provider::Google => self.credentials.google_api_key.as_deref(),
        }
    }

    /// 校验凭证存在，缺失时返回 MissingCredential
    pub fn require_api_key(&self, provider: Provider) -> Result<&str> {
        self.api_key(provider)
            .ok_or(PromptGateError::MissingCredential(provider.env_key()))
    }
}
