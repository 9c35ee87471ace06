use super::*;
use std::io::Write;

#[test]
fn test_config_default() {
    let config = Config::default();

    // 测试默认值
    assert_eq!(config.server.bind_address, "0.0.0.0");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.allow_origins, vec!["*".to_string()]);
    assert_eq!(config.server.request_timeout_secs, 30);

    assert_eq!(config.storage.data_dir, PathBuf::from("config"));

    assert_eq!(config.transport.mode, TransportMode::Strict);
    assert_eq!(config.transport.read_timeout(), Duration::from_secs(5));
    assert_eq!(config.transport.write_timeout(), Duration::from_secs(10));

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.rotation, "daily");
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();

    // 测试有效配置
    assert!(config.is_valid());

    // 测试无效端口
    config.server.port = 0;
    assert!(!config.is_valid());

    // 恢复有效端口
    config.server.port = 8080;
    assert!(config.is_valid());

    // 测试无效超时
    config.transport.read_timeout_secs = 0;
    assert!(!config.is_valid());
    config.transport.read_timeout_secs = 5;

    config.server.bind_address = " ".to_string();
    assert!(!config.is_valid());
    config.server.bind_address = "127.0.0.1".to_string();

    config.storage.data_dir = PathBuf::new();
    assert!(!config.is_valid());
    config.storage.data_dir = PathBuf::from("data");

    config.logging.rotation = "weekly".to_string();
    assert!(!config.is_valid());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 8080
allow_origins = ["http://localhost:5173"]

[transport]
mode = "simulated"

[storage]
data_dir = "/var/lib/bitaxe-dashboard"
"#
    )
    .unwrap();

    let config = Config::load(file.path().to_str().unwrap()).unwrap();

    if std::env::var("PORT").is_err() {
        assert_eq!(config.server.port, 8080);
    }
    assert_eq!(config.server.allow_origins, vec!["http://localhost:5173".to_string()]);
    assert_eq!(config.transport.mode, TransportMode::Simulated);
    assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/bitaxe-dashboard"));
    // 未出现在文件中的字段取默认值
    assert_eq!(config.server.bind_address, "0.0.0.0");
    assert_eq!(config.transport.read_timeout_secs, 5);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let config = Config::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.storage, StorageConfig::default());
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn test_invalid_file_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[transport]\nmode = \"telepathy\"").unwrap();
    assert!(Config::load(file.path().to_str().unwrap()).is_err());
}

#[test]
fn test_save_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.toml");
    let path = path.to_str().unwrap();

    let mut config = Config::default();
    config.server.request_timeout_secs = 45;
    config.logging.file = Some(PathBuf::from("logs/dashboard.log"));
    config.save(path).unwrap();

    let content = std::fs::read_to_string(path).unwrap();
    let parsed: Config = toml::from_str(&content).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_args_override_config() {
    let args = Args::parse_from([
        "bitaxe-dashboard",
        "--port",
        "9000",
        "--data-dir",
        "/tmp/data",
        "--simulated",
        "--debug",
        "serve",
    ]);
    assert_eq!(args.command, Some(Command::Serve));

    let mut config = Config::default();
    config.apply_args(&args);
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/data"));
    assert_eq!(config.transport.mode, TransportMode::Simulated);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_status_subcommand() {
    let args = Args::parse_from(["bitaxe-dashboard", "status", "--device", "bitaxe1", "-u", "admin"]);
    match args.command {
        Some(Command::Status { url, username, password, device }) => {
            assert_eq!(url, "http://127.0.0.1:3000");
            assert_eq!(username.as_deref(), Some("admin"));
            assert_eq!(password, None);
            assert_eq!(device.as_deref(), Some("bitaxe1"));
        }
        other => panic!("unexpected command {:?}", other),
    }
}
