use anyhow::Result;
use render_parity::utils::logging;
use render_parity::{App, Config, RunState};
use std::sync::atomic::Ordering;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化应用
    let app = App::initialize(config).await?;

    // Ctrl-C 只设置取消标志，当前条目处理完后停止
    let cancel = app.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 收到 Ctrl-C，将在当前条目完成后停止");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    // 运行
    let outcome = app.run().await?;

    match outcome.state {
        RunState::Complete => Ok(()),
        RunState::Cancelled => std::process::exit(130),
        RunState::Aborted { reason } => anyhow::bail!("运行中止: {}", reason),
    }
}
