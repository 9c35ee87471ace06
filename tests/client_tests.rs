use bitaxe_dashboard::api::{ApiServer, AppState};
use bitaxe_dashboard::auth::password::hash_password_with_cost;
use bitaxe_dashboard::client::{run_status, DashboardClient, LocalSession, RouteState, StatusOptions};
use bitaxe_dashboard::config::ServerConfig;
use bitaxe_dashboard::device::SimulatedDeviceTransport;
use bitaxe_dashboard::error::ClientError;
use bitaxe_dashboard::mining_core::SimulatedMiningCoreTransport;
use bitaxe_dashboard::storage::MemoryDocumentStore;
use bitaxe_dashboard::store::ConfigStore;
use serde_json::json;
use std::sync::Arc;

async fn start_server() -> (ApiServer, String) {
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
    let server = ApiServer::new(config, state);
    let addr = server.start().await.unwrap();
    (server, format!("http://{}", addr))
}

fn bootstrap(auth_enabled: bool) -> serde_json::Value {
    json!({
        "applicationTitle": "Garage Farm",
        "authentication": {
            "enabled": auth_enabled,
            "username": "admin",
            "passwordHash": hash_password_with_cost("hunter2", 4).unwrap(),
            "jwtSecret": "client-secret"
        },
        "devices": [
            { "id": "bitaxe1", "name": "Bitaxe 1", "url": "http://10.0.0.2" },
            { "id": "bitaxe2", "name": "Bitaxe 2", "url": "http://10.0.0.3" }
        ],
        "miningCore": { "enabled": true, "url": "http://pool.local:4000" }
    })
}

/// 测试状态面板走完引导、登录、就绪三个状态
#[tokio::test]
async fn test_status_follows_route_state() {
    let (server, url) = start_server().await;
    let mut client = DashboardClient::new(&url).unwrap();

    let mut out = Vec::new();
    let state = run_status(&mut client, &StatusOptions::default(), &mut out).await.unwrap();
    assert_eq!(state, RouteState::Unconfigured);
    assert!(String::from_utf8(out).unwrap().contains("not configured"));

    let config = client.create_config(&bootstrap(true)).await.unwrap();
    assert_eq!(config.devices.len(), 2);

    let mut out = Vec::new();
    let state = run_status(&mut client, &StatusOptions::default(), &mut out).await.unwrap();
    assert_eq!(state, RouteState::NeedsLogin);

    let options = StatusOptions {
        username: Some("admin".to_string()),
        password: Some("hunter2".to_string()),
        device: None,
    };
    let mut out = Vec::new();
    let state = run_status(&mut client, &options, &mut out).await.unwrap();
    assert_eq!(state, RouteState::Ready);
    assert!(client.session().unwrap().is_valid());

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Garage Farm"));
    assert!(text.contains("== Bitaxe 1 [online] =="));
    assert!(text.contains("== Bitaxe 2 [online] =="));
    assert!(text.contains("Mining Metrics"));
    assert!(text.contains("== Mining Core [online] =="));

    server.stop().await.unwrap();
}

/// 测试只显示单台设备
#[tokio::test]
async fn test_status_single_device() {
    let (server, url) = start_server().await;
    let mut client = DashboardClient::new(&url).unwrap();
    client.create_config(&bootstrap(false)).await.unwrap();

    let options = StatusOptions {
        device: Some("bitaxe2".to_string()),
        ..StatusOptions::default()
    };
    let mut out = Vec::new();
    let state = run_status(&mut client, &options, &mut out).await.unwrap();
    assert_eq!(state, RouteState::Ready);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Bitaxe 2"));
    assert!(!text.contains("Bitaxe 1"));
    assert!(!text.contains("Mining Core"));

    server.stop().await.unwrap();
}

/// 测试客户端覆盖的接口
#[tokio::test]
async fn test_client_endpoints() {
    let (server, url) = start_server().await;
    let mut client = DashboardClient::new(&url).unwrap();
    assert!(client.get_config().await.unwrap().is_none());

    client.create_config(&bootstrap(true)).await.unwrap();

    let error = client.list_devices().await.unwrap_err();
    assert_eq!(error.status(), Some(401));
    assert_eq!(
        error,
        ClientError::Api {
            status: 401,
            message: "Access token required".to_string()
        }
    );

    let error = client.login("admin", "wrong").await.unwrap_err();
    assert_eq!(error.status(), Some(401));
    assert!(client.session().is_none());

    let response = client.login("admin", "hunter2").await.unwrap();
    assert_eq!(response.user.id, 1);

    let devices = client.list_devices().await.unwrap();
    assert_eq!(devices.len(), 2);

    let data = client.device_data("Bitaxe 1").await.unwrap();
    assert_eq!(data.device_id, "Bitaxe 1");
    assert!(data.categories.get("General Information").is_some());

    let chart = client.chart("bitaxe1", 48).await.unwrap();
    assert_eq!(chart.hours, 48);
    assert_eq!(chart.total_points, chart.data_points.len());

    assert!(client.restart("bitaxe1").await.unwrap().success);
    client
        .update_device_config("bitaxe1", &json!({ "frequency": 600 }))
        .await
        .unwrap();
    assert_eq!(client.device_config("bitaxe1").await.unwrap()["frequency"], 600);

    let snapshot = client.mining_core().await.unwrap();
    assert_eq!(snapshot.data.keys().next(), Some("networkHashrate"));

    let catalog = client.device_mappings().await.unwrap();
    assert_eq!(catalog.categories()[0].name, "Mining Metrics");
    let types = client.mining_mappings().await.unwrap();
    assert_eq!(types.iter().next().unwrap().0, "networkHashrate");

    assert_eq!(client.generate_secret().await.unwrap().len(), 64);

    let updated = client.update_config(&json!({ "refreshInterval": 5 })).await.unwrap();
    assert_eq!(updated.refresh_interval, 5);

    let error = client.device_data("ghost").await.unwrap_err();
    assert_eq!(error.status(), Some(404));

    server.stop().await.unwrap();
}

/// 测试被服务端拒绝的旧令牌
#[tokio::test]
async fn test_stale_session_is_rejected() {
    let (server, url) = start_server().await;
    let mut client = DashboardClient::new(&url).unwrap();
    client.create_config(&bootstrap(true)).await.unwrap();

    let forged = bitaxe_dashboard::auth::issue_token(
        "admin",
        "some-other-secret",
        &bitaxe_dashboard::auth::JwtExpiration::Seconds(3600),
    )
    .unwrap();
    let mut client = client.with_session(LocalSession::new(forged));

    // 本地看来有效，服务端校验签名失败
    let (state, _) = client.route().await.unwrap();
    assert_eq!(state, RouteState::Ready);
    assert_eq!(client.list_devices().await.unwrap_err().status(), Some(403));

    server.stop().await.unwrap();
}
