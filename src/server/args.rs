// src/server/args.rs

use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, ArgAction};
use crate::common::consts::DEFAULT_CONFIG_PATH;

// Oxide XGen 命令行参数
#[derive(Parser, Debug)]
#[command(
    name = "oxgen",
    author,
    version,
    about = "Xray client configuration generator for Cloudflare-fronted VLESS/Trojan and Warp tunnels\n\n\
             Key Features:\n\
             - Per address/port/protocol VLESS and Trojan documents over WebSocket\n\
             - Best Ping load-balanced documents with observatory probing\n\
             - TLS hello fragmentation: Best Fragment sweep and Workerless documents\n\
             - Chain proxy support (socks, http, vless with tls/reality/ws/grpc/tcp)\n\
             - Warp and Warp-on-Warp WireGuard documents for xray and nikang clients\n\
             - Remote/local DNS policy with fake DNS, geo bypass and IP pinning\n\
             - Built-in IP-based rate limiting, Prometheus metrics and health probe\n\
             - Structured logging (Tracing) and graceful shutdown"
)]
pub struct CliArgs {
    // 配置文件路径
    #[arg(
        short = 'c',
        long = "config",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Server configuration file path (YAML format)"
    )]
    pub config: PathBuf,

    // 测试配置
    #[arg(
        short = 't',
        long = "test",
        action = ArgAction::SetTrue,
        help = "Test configuration file for validity and exit"
    )]
    pub test_config: bool,

    // 启用调试日志
    #[arg(
        short = 'd',
        long = "debug",
        action = ArgAction::SetTrue,
        help = "Enable debug level logging for detailed output"
    )]
    pub debug: bool,
}

impl CliArgs {
    // 验证命令行参数
    pub fn validate(&self) -> Result<()> {
        if !self.config.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                self.config.display()
            ));
        }

        Ok(())
    }
}
