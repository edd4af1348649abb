//! 信号处理：收到 SIGINT（Ctrl+C）或 SIGTERM 时清除会话密钥后退出。
//!
//! 主流程是同步阻塞的，因此信号监听运行在独立线程里的单线程 tokio 运行时上。
//! 正常退出路径仍由 `SessionKey` 的 drop 负责清零；这里只覆盖被信号打断的情况。
//! 进程被强制杀死（SIGKILL）时无法保证清零。

use std::io;
use std::process;
use std::thread;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::{debug, warn};

use crate::crypto::KeyWipeHandle;

/// 被信号中断时的退出码（128 + SIGINT）
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// 安装 SIGINT / SIGTERM 处理器。
///
/// 运行时与两个信号监听在返回前完成注册，失败直接返回错误。
pub fn install_signal_handler(wipe: KeyWipeHandle) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    #[cfg(unix)]
    let waiter = {
        let _guard = runtime.enter();
        wait_for_signal(
            signal(SignalKind::interrupt())?,
            signal(SignalKind::terminate())?,
        )
    };
    #[cfg(not(unix))]
    let waiter = wait_for_signal();

    thread::Builder::new()
        .name("credvault-signals".into())
        .spawn(move || match runtime.block_on(waiter) {
            Ok(name) => {
                wipe.wipe();
                warn!(signal = name, "interrupted, session key wiped");
                process::exit(INTERRUPTED_EXIT_CODE);
            }
            Err(e) => {
                warn!(error = %e, "signal listener stopped, key wiping on interrupt unavailable");
            }
        })?;

    debug!("signal handler installed");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal(mut sigint: Signal, mut sigterm: Signal) -> io::Result<&'static str> {
    tokio::select! {
        _ = sigint.recv() => Ok("SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Ctrl+C")
}
