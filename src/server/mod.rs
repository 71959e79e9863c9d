pub mod handlers;

use crate::config::Config;
use crate::Result;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// 启动 HTTP 服务器（带优雅关闭）
pub async fn start_server(config: Arc<Config>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("promptgate 服务器运行在 http://{}", addr);

    // 终止信号通过 watch 通道通知接受循环
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(());
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    loop {
        tokio::select! {
            // 等待新连接
            result = listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let io = TokioIo::new(stream);
                        let config = Arc::clone(&config);

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let config = Arc::clone(&config);
                                handlers::handle_request(req, config)
                            });

                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                error!("服务连接错误: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("接受连接失败: {}", e);
                    }
                }
            }
            // 等待关闭信号
            _ = shutdown_rx.changed() => {
                info!("收到关闭信号，停止接受新连接");
                break;
            }
        }
    }

    info!("服务器已优雅关闭");
    Ok(())
}

/// 等待 SIGTERM / Ctrl+C
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("设置 SIGTERM 信号处理失败");

        tokio::select! {
            _ = sigterm.recv() => {
                warn!("收到 SIGTERM 信号，开始优雅关闭...");
            }
            _ = signal::ctrl_c() => {
                warn!("收到 Ctrl+C 信号，开始优雅关闭...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("设置 Ctrl+C 信号处理失败");
        warn!("收到 Ctrl+C 信号，开始优雅关闭...");
    }
}

/// 启动 HTTP 服务器（仅用于测试，不监听关闭信号）
pub async fn start_server_test(config: Arc<Config>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("promptgate 测试服务器运行在 http://{}", addr);

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("接受连接失败: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let config = Arc::clone(&config);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let config = Arc::clone(&config);
                handlers::handle_request(req, config)
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("服务连接错误: {}", e);
            }
        });
    }
}
