// src/bin/oxgen.rs

// 标准库导入
use std::process::exit;

// 第三方库导入
use clap::Parser;
use mimalloc::MiMalloc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use tracing_subscriber::{prelude::*, EnvFilter, fmt};

// 本地模块导入
use oxide_xgen::server::args::CliArgs;
use oxide_xgen::server::config::ServerConfig;
use oxide_xgen::server::signal;
use oxide_xgen::server::XgenServer;

// 使用 mimalloc 作为全局内存分配器
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Initialize logging system
fn init_logging(args: &CliArgs) {
    let filter = if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else if args.debug {
        EnvFilter::new("oxide_xgen=debug,tower_http=debug,info")
    } else {
        EnvFilter::new("oxide_xgen=info")
    };

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(args.debug)
        .with_thread_names(args.debug);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    if args.debug {
        debug!("Debug logging level enabled");
    }
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    if let Err(e) = args.validate() {
        eprintln!("Parameter validation error: {}", e);
        exit(1);
    }

    init_logging(&args);

    // from_file 已包含配置校验
    let config = match ServerConfig::from_file(&args.config) {
        Ok(config) => {
            info!(
                config_path = ?args.config,
                listen_addr = %config.http.listen_addr,
                store_path = %config.store.path.display(),
                rate_limit = config.http.rate_limit.enabled,
                "Configuration loaded successfully"
            );
            config
        }
        Err(e) => {
            error!(
                config_path = ?args.config,
                error = %e,
                "Failed to load configuration file"
            );
            exit(1);
        }
    };

    if args.test_config {
        info!("Configuration test successful");
        exit(0);
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let signal_handler = signal::setup_signal_handlers(shutdown_tx).await;

    info!("Starting Oxide XGen server...");
    let server = XgenServer::new(config);

    if let Err(e) = server.start(shutdown_rx).await {
        error!(error = %e, "Server failed to run");
        signal_handler.abort();
        exit(1);
    }

    info!("Server shutdown completed");
}
