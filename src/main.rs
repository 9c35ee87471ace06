use anyhow::{Context, Result};
use bitaxe_dashboard::auth::{self, password};
use bitaxe_dashboard::client::{run_status, DashboardClient, RouteState, StatusOptions};
use bitaxe_dashboard::config::{Args, Command, Config};
use bitaxe_dashboard::logging::{init_logging, LogConfig};
use bitaxe_dashboard::{build_app_state, ApiServer, NAME, VERSION};
use clap::Parser;
use std::io::Read;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let args = Args::parse();

    // 加载配置
    let (mut config, load_error) = match Config::load(&args.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_args(&args);

    // 初始化日志系统
    let log_guard = match init_logging(LogConfig::from(&config.logging)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    if let Some(e) = load_error {
        warn!("Failed to load config from {}: {:#}, using defaults", args.config, e);
    }

    let command = args.command.clone().unwrap_or(Command::Serve);
    let exit_code = match run(command, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            1
        }
    };
    // exit 不会运行析构，先刷出日志
    drop(log_guard);
    std::process::exit(exit_code);
}

async fn run(command: Command, config: Config) -> Result<i32> {
    match command {
        Command::Serve => serve(config).await.map(|_| 0),
        Command::HashPassword { password } => {
            let password = match password {
                Some(password) => password,
                None => read_password_from_stdin()?,
            };
            let hash = password::hash_password(&password).context("Failed to hash password")?;
            println!("{}", hash);
            Ok(0)
        }
        Command::GenerateSecret => {
            println!("{}", auth::generate_secret());
            Ok(0)
        }
        Command::Status {
            url,
            username,
            password,
            device,
        } => {
            let mut client = DashboardClient::new(&url)?;
            let options = StatusOptions {
                username,
                password,
                device,
            };
            let mut stdout = std::io::stdout();
            let state = run_status(&mut client, &options, &mut stdout).await?;
            Ok(if state == RouteState::Ready { 0 } else { 2 })
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("🚀 Starting {} v{}", NAME, VERSION);
    info!(
        "📋 Data directory: {}, transport: {:?}",
        config.storage.data_dir.display(),
        config.transport.mode
    );

    let state = build_app_state(&config).context("Failed to open configuration store")?;
    if !state.store.is_configured().await {
        info!("🧭 No configuration yet, open the dashboard to run the bootstrap form");
    }

    let server = ApiServer::new(config.server.clone(), state);
    server.start().await.context("Failed to start API server")?;

    tokio::signal::ctrl_c()
        .await
        .context("Error waiting for shutdown signal")?;
    info!("🛑 Received shutdown signal");

    server.stop().await.context("Error during shutdown")?;
    info!("👋 Dashboard stopped gracefully");
    Ok(())
}

fn read_password_from_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read password from stdin")?;
    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(password)
}
