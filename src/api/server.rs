use crate::api::{create_routes, AppState};
use crate::config::ServerConfig;
use crate::error::DashboardError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, RwLock};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// API 服务器
pub struct ApiServer {
    /// 服务器配置
    config: ServerConfig,
    /// 应用状态
    state: AppState,
    /// 服务器任务句柄
    server_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
    /// 关闭信号
    shutdown_tx: Arc<RwLock<Option<oneshot::Sender<()>>>>,
    /// 实际监听地址
    local_addr: Arc<RwLock<Option<SocketAddr>>>,
    /// 运行状态
    running: Arc<RwLock<bool>>,
}

impl ApiServer {
    /// 创建新的 API 服务器
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            server_handle: Arc::new(RwLock::new(None)),
            shutdown_tx: Arc::new(RwLock::new(None)),
            local_addr: Arc::new(RwLock::new(None)),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// 带中间件的完整路由
    pub fn router(&self) -> axum::Router {
        create_routes(self.state.clone()).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(self.config.request_timeout_secs)))
                .layer(self.create_cors_layer()),
        )
    }

    /// 启动 API 服务器
    pub async fn start(&self) -> Result<SocketAddr, DashboardError> {
        if *self.running.read().await {
            warn!("API server is already running");
            if let Some(addr) = *self.local_addr.read().await {
                return Ok(addr);
            }
        }

        let addr = self.get_address();
        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DashboardError::System(format!("Failed to bind to {}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| DashboardError::System(format!("Failed to read listener address: {}", e)))?;

        let app = self.router();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let running = self.running.clone();
        *running.write().await = true;

        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                error!("API server error: {}", e);
            }
            *running.write().await = false;
        });

        *self.server_handle.write().await = Some(handle);
        *self.shutdown_tx.write().await = Some(shutdown_tx);
        *self.local_addr.write().await = Some(local_addr);

        info!("🌐 Dashboard available at http://{}", local_addr);
        Ok(local_addr)
    }

    /// 停止 API 服务器，等待进行中的请求结束
    pub async fn stop(&self) -> Result<(), DashboardError> {
        if !*self.running.read().await {
            warn!("API server is not running");
            return Ok(());
        }

        info!("Stopping API server");
        if let Some(shutdown_tx) = self.shutdown_tx.write().await.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.server_handle.write().await.take() {
            if let Err(e) = handle.await {
                warn!("API server task ended abnormally: {}", e);
            }
        }

        *self.running.write().await = false;
        *self.local_addr.write().await = None;
        info!("API server stopped");
        Ok(())
    }

    /// 检查服务器是否在运行
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// 配置的监听地址
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.config.bind_address, self.config.port)
    }

    /// 创建 CORS 层
    fn create_cors_layer(&self) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
                axum::http::header::ACCEPT,
            ]);

        // 配置允许的来源
        if self.config.allow_origins.iter().any(|origin| origin == "*") {
            cors.allow_origin(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .config
                .allow_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            cors.allow_origin(origins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedDeviceTransport;
    use crate::mining_core::SimulatedMiningCoreTransport;
    use crate::storage::MemoryDocumentStore;
    use crate::store::ConfigStore;

    fn server() -> ApiServer {
        let store = ConfigStore::open(Arc::new(MemoryDocumentStore::new())).unwrap();
        let state = AppState {
            store: Arc::new(store),
            devices: Arc::new(SimulatedDeviceTransport::new()),
            mining_core: Arc::new(SimulatedMiningCoreTransport),
            static_dir: None,
        };
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        };
        ApiServer::new(config, state)
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let server = server();
        assert!(!server.is_running().await);

        let addr = server.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.is_running().await);

        let response = reqwest::get(format!("http://{}/api/config", addr)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "{}");

        server.stop().await.unwrap();
        assert!(!server.is_running().await);
        assert!(server.stop().await.is_ok());
    }
}
