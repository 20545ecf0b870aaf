//! ライブネスエンドポイントとシグナル処理

use crate::shutdown::ShutdownController;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// ライブネスルーターを作成
///
/// 指定パスへのGETに `200 OK` と空ボディ（`application/json`）を返す。
pub fn liveness_router(endpoint: &str) -> Router {
    let path = if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{}", endpoint)
    };
    Router::new().route(&path, get(liveness))
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")])
}

/// ライブネスサーバーを起動
///
/// バインドに失敗してもプロセスは停止せず、エラーログのみ出力する。
pub async fn run_liveness(port: u16, endpoint: String, shutdown: ShutdownController) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Failed to bind the liveness endpoint");
            return;
        }
    };

    info!(addr = %addr, endpoint = %endpoint, "Liveness endpoint listening");

    let app = liveness_router(&endpoint);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await;

    if let Err(e) = result {
        error!(error = %e, "Liveness endpoint error");
    }
    info!("Liveness endpoint stopped");
}

/// ライブネスサーバーをバックグラウンドで起動
pub fn spawn_liveness(port: u16, endpoint: String, shutdown: ShutdownController) -> JoinHandle<()> {
    tokio::spawn(run_liveness(port, endpoint, shutdown))
}

/// シャットダウンシグナルを待機
///
/// Ctrl+C・SIGTERM・`ShutdownController` のいずれかで完了する。
pub async fn shutdown_signal(shutdown: ShutdownController) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = shutdown.wait() => {
            info!("Shutdown requested, shutting down...");
        }
    }
}
