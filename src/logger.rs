use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 设置了 `RUST_LOG` 时以其为准，否则为 `info`（详细模式下为 `debug`）。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("deal_scraper={}", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
