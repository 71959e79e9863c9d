use crate::error::PromptGateError;
use hyper::body::Bytes;
use std::fmt;
use std::str::FromStr;

/// 支持的 AI 提供商
///
/// 封闭枚举：新增提供商时在此处扩展，由编译器保证各分发点同步更新。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Google => "google",
        }
    }

    /// 对应 API 密钥的环境变量名
    pub fn env_key(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Google => "GOOGLE_API_KEY",
        }
    }
}

impl FromStr for Provider {
    type Err = PromptGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Provider::OpenAi),
            "google" => Ok(Provider::Google),
            other => Err(PromptGateError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 上传的文件（仅在单个请求的生命周期内存在）
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// MIME 类型以 image/ 开头即视为图片
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .map(|m| m.to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }
}

/// 一次生成请求：提供商 + 提示词 + 可选文件
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub provider: Provider,
    pub text: String,
    pub file: Option<UploadedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_valid() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
    }

    #[test]
    fn test_provider_parse_invalid() {
        let err = "deepseek".parse::<Provider>().unwrap_err();
        assert!(matches!(err, PromptGateError::UnsupportedProvider(_)));
        assert!(err.to_string().contains("deepseek"));

        // 大小写敏感，与表单取值严格一致
        assert!("OpenAI".parse::<Provider>().is_err());
        assert!("".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_as_str_round_trip() {
        for provider in [Provider::OpenAi, Provider::Google] {
            assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn test_provider_env_key() {
        assert_eq!(Provider::OpenAi.env_key(), "OPENAI_API_KEY");
        assert_eq!(Provider::Google.env_key(), "GOOGLE_API_KEY");
    }

    #[test]
    fn test_uploaded_file_is_image() {
        let file = UploadedFile {
            filename: Some("cat.png".to_string()),
            mime_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(b"\x89PNG"),
        };
        assert!(file.is_image());

        let file = UploadedFile {
            filename: Some("notes.txt".to_string()),
            mime_type: Some("text/plain".to_string()),
            bytes: Bytes::from_static(b"hello"),
        };
        assert!(!file.is_image());

        // MIME 大写也应识别
        let file = UploadedFile {
            filename: Some("cat.JPG".to_string()),
            mime_type: Some("IMAGE/JPEG".to_string()),
            bytes: Bytes::new(),
        };
        assert!(file.is_image());

        let file = UploadedFile {
            filename: Some("unknown".to_string()),
            mime_type: None,
            bytes: Bytes::new(),
        };
        assert!(!file.is_image());
    }
}
