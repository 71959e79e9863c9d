use clap::Parser;
use promptgate::config::Config;
use promptgate::server;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "promptgate")]
#[command(about = "文本生成 API 服务：统一转发 OpenAI / Google Gemini 请求", long_about = None)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "promptgate.yaml")]
    config: String,

    /// 监听地址
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载 .env（不存在时忽略）
    dotenvy::dotenv().ok();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // 解析命令行参数
    let args = Args::parse();

    // 加载配置（文件缺失或损坏时回退到内置默认模型）并读取凭证
    let config = Config::load(&args.config).with_env_credentials();
    info!(
        "OpenAI 密钥已加载: {}",
        if config.credentials.openai_api_key.is_some() {
            "是"
        } else {
            "否（需要时请设置 OPENAI_API_KEY）"
        }
    );
    info!(
        "Google 密钥已加载: {}",
        if config.credentials.google_api_key.is_some() {
            "是"
        } else {
            "否（需要时请设置 GOOGLE_API_KEY）"
        }
    );
    let config = Arc::new(config);

    // 解析监听地址
    let addr: SocketAddr = args.bind.parse()?;

    // 启动服务器
    server::start_server(config, addr).await?;

    Ok(())
}
