use crate::config::Config;
use crate::providers::{gemini, openai};
use crate::types::{GenerateRequest, Provider};
use crate::Result;
use std::sync::Arc;

/// 分发请求到对应的提供商适配器
///
/// 凭证校验在任何外部调用之前完成，缺失即返回 Err；
/// 适配器自身的失败以 "Error: ..." 文本作为 Ok 返回，不会成为 Err。
pub async fn route_request(config: Arc<Config>, req: GenerateRequest) -> Result<String> {
    let api_key = config.require_api_key(req.provider)?;
    let models = config.provider_config(req.provider);

    let reply = match req.provider {
        Provider::OpenAi => openai::generate(models, api_key, &req.text, req.file.as_ref()).await,
        Provider::Google => gemini::generate(models, api_key, &req.text, req.file.as_ref()).await,
    };

    Ok(reply)
}
