// src/server/signal.rs

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

// 广播关闭通知；没有订阅者时忽略发送失败
fn notify_shutdown(shutdown_tx: &broadcast::Sender<()>, signal_name: &str) {
    info!(signal = signal_name, "Received shutdown signal");
    let _ = shutdown_tx.send(());
}

// Windows 平台：Ctrl+C 或 Ctrl+Break 触发关闭
#[cfg(windows)]
pub async fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>) -> JoinHandle<()> {
    use tokio::signal::windows::{ctrl_break, ctrl_c};

    let (mut ctrl_c, mut ctrl_break) = match (ctrl_c(), ctrl_break()) {
        (Ok(c), Ok(b)) => (c, b),
        (Err(err), _) | (_, Err(err)) => {
            error!(error = %err, "Failed to install console signal handlers");
            return tokio::spawn(async {});
        }
    };

    tokio::spawn(async move {
        tokio::select! {
            _ = ctrl_c.recv() => notify_shutdown(&shutdown_tx, "ctrl_c"),
            _ = ctrl_break.recv() => notify_shutdown(&shutdown_tx, "ctrl_break"),
        }
    })
}

// Unix 平台(Linux/macOS)：SIGINT、SIGTERM、SIGHUP 触发关闭
#[cfg(unix)]
pub async fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>) -> JoinHandle<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let handlers = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    );
    let (mut sigint, mut sigterm, mut sighup) = match handlers {
        (Ok(i), Ok(t), Ok(h)) => (i, t, h),
        (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
            error!(error = %err, "Failed to install unix signal handlers");
            return tokio::spawn(async {});
        }
    };

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => notify_shutdown(&shutdown_tx, "SIGINT"),
            _ = sigterm.recv() => notify_shutdown(&shutdown_tx, "SIGTERM"),
            _ = sighup.recv() => notify_shutdown(&shutdown_tx, "SIGHUP"),
        }
    })
}
