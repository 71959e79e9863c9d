use crate::config::Config;
use crate::metrics;
use crate::providers::routing;
use crate::types::{GenerateRequest, Provider, UploadedFile};
use crate::PromptGateError;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type BoxBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// 处理 HTTP 请求的主路由
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    config: Arc<Config>,
) -> Result<Response<BoxBody>, BoxError> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => Ok(health_check()),
        (&Method::GET, "/api/models") => Ok(list_models(config)),
        (&Method::GET, "/metrics") => Ok(metrics_endpoint()),
        (&Method::POST, "/api/generate") => generate(req, config).await,
        (&Method::OPTIONS, _) => Ok(cors_preflight()),
        _ => Ok(not_found()),
    }
}

/// 构造带 CORS 头的 JSON 响应
fn json_response(status: StatusCode, body: serde_json::Value) -> Response<BoxBody> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            Full::new(Bytes::from(body.to_string()))
                .map_err(|e| Box::new(e) as BoxError)
                .boxed(),
        )
        .unwrap()
}

/// 400 响应，detail 字段说明原因
fn bad_request(detail: impl Into<String>) -> Response<BoxBody> {
    json_response(StatusCode::BAD_REQUEST, json!({ "detail": detail.into() }))
}

/// 健康检查端点
fn health_check() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        json!({
            "status": "ok",
            "service": "promptgate"
        }),
    )
}

/// 列出各提供商当前配置的模型
fn list_models(config: Arc<Config>) -> Response<BoxBody> {
    let body = json!({
        "openai": {
            "default_model": config.openai.default_model,
            "vision_model": config.openai.vision_model
        },
        "google": {
            "default_model": config.google.default_model,
            "vision_model": config.google.vision_model
        }
    });
    json_response(StatusCode::OK, body)
}

/// 指标端点
fn metrics_endpoint() -> Response<BoxBody> {
    let metrics = metrics::global_metrics();
    let body = metrics.export_prometheus();

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            Full::new(Bytes::from(body))
                .map_err(|e| Box::new(e) as BoxError)
                .boxed(),
        )
        .unwrap()
}

/// CORS 预检响应，供浏览器表单跨域调用
fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "*")
        .body(
            Full::new(Bytes::new())
                .map_err(|e| Box::new(e) as BoxError)
                .boxed(),
        )
        .unwrap()
}

/// 404 响应
fn not_found() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Access-Control-Allow-Origin", "*")
        .body(
            Full::new(Bytes::from("Not Found"))
                .map_err(|e| Box::new(e) as BoxError)
                .boxed(),
        )
        .unwrap()
}

/// multipart 表单解析出的原始字段
struct RawForm {
    provider: Option<String>,
    text: Option<String>,
    file: Option<UploadedFile>,
}

/// 解析 multipart 表单字段
async fn parse_form(body: Bytes, boundary: String) -> Result<RawForm, String> {
    let stream =
        futures_util::stream::once(async move { Ok::<Bytes, std::convert::Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = RawForm {
        provider: None,
        text: None,
        file: None,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(format!("解析上传表单失败: {}", e)),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("provider") => {
                form.provider = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| format!("读取 provider 字段失败: {}", e))?,
                );
            }
            Some("text") => {
                form.text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| format!("读取 text 字段失败: {}", e))?,
                );
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.is_empty());
                let mime_type = field.content_type().map(|m| m.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("读取上传文件失败: {}", e))?;

                // 浏览器未选择文件时会提交空 part，视同未上传
                if !bytes.is_empty() {
                    form.file = Some(UploadedFile {
                        filename,
                        mime_type,
                        bytes,
                    });
                }
            }
            _ => {
                // 跳过未知字段
                let _ = field.bytes().await;
            }
        }
    }

    Ok(form)
}

/// 文本生成端点：解析 multipart 表单，校验后分发到适配器
async fn generate(
    req: Request<hyper::body::Incoming>,
    config: Arc<Config>,
) -> Result<Response<BoxBody>, BoxError> {
    let metrics = metrics::global_metrics();

    // 从 Content-Type 提取 multipart 边界
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok());
    let boundary = match boundary {
        Some(b) => b,
        None => {
            metrics.record_failure();
            return Ok(bad_request("请求必须为 multipart/form-data 格式"));
        }
    };

    // 读取请求体并解析表单
    let whole_body = req.collect().await?.to_bytes();
    let form = match parse_form(whole_body, boundary).await {
        Ok(form) => form,
        Err(detail) => {
            warn!("表单解析失败: {}", detail);
            metrics.record_failure();
            return Ok(bad_request(detail));
        }
    };

    // 校验必填字段
    let provider_raw = match form.provider {
        Some(p) => p,
        None => {
            metrics.record_failure();
            return Ok(bad_request("缺少必填字段: provider"));
        }
    };
    let text = match form.text {
        Some(t) => t,
        None => {
            metrics.record_failure();
            return Ok(bad_request("缺少必填字段: text"));
        }
    };

    // 校验提供商取值（未知提供商不会触达任何适配器）
    let provider = match Provider::from_str(&provider_raw) {
        Ok(p) => p,
        Err(e) => {
            warn!("请求校验失败: {}", e);
            metrics.record_failure();
            return Ok(bad_request(e.to_string()));
        }
    };

    let request_id = Uuid::new_v4();
    info!(
        "[{}] 收到生成请求: provider={}, 文本长度={}, 文件={}",
        request_id,
        provider,
        text.len(),
        form.file
            .as_ref()
            .map(|f| f.filename.as_deref().unwrap_or("(未命名)"))
            .unwrap_or("无")
    );
    metrics.record_provider(provider);

    let gen_req = GenerateRequest {
        provider,
        text,
        file: form.file,
    };

    match routing::route_request(config, gen_req).await {
        Ok(reply) => {
            // 适配器级失败以 "Error: ..." 文本随 200 返回，前端按前缀识别
            if reply.starts_with("Error:") {
                warn!("[{}] 适配器返回错误: {}", request_id, reply);
                metrics.record_failure();
            } else {
                info!("[{}] 生成成功，响应长度 {}", request_id, reply.len());
                metrics.record_success();
            }
            Ok(json_response(StatusCode::OK, json!({ "response": reply })))
        }
        Err(e) => {
            warn!("[{}] 请求被拒绝: {}", request_id, e);
            metrics.record_failure();

            let status = match e {
                PromptGateError::UnsupportedProvider(_)
                | PromptGateError::MissingCredential(_)
                | PromptGateError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };

            Ok(json_response(status, json!({ "detail": e.to_string() })))
        }
    }
}
