use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use deal_scraper::{logger, ChromeLauncher, Config, CsvExporter, FileFailureLog, Fleet};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(config.verbose_logging);

    config.validate()?;

    // 初始化失败日志
    let failure_log = Arc::new(FileFailureLog::new(config.failure_log_file.clone()));
    failure_log
        .init()
        .with_context(|| format!("无法创建失败日志: {}", config.failure_log_file))?;

    let exporter = Arc::new(CsvExporter::new(config.output_csv.clone()));
    let launcher = Arc::new(ChromeLauncher::new(&config));
    let incremental = config.export_incrementally;

    let mut fleet = Fleet::new(config, launcher, failure_log);
    if incremental {
        exporter.reset()?;
        fleet = fleet.with_incremental_export(Arc::clone(&exporter));
    }

    let report = fleet.run_full_crawl().await?;

    if report.deals.is_empty() {
        warn!("⚠️ 没有抓取到任何优惠，不生成 CSV");
    } else if incremental {
        info!("💾 结果已追加到 {}", exporter.path());
    } else {
        exporter.write_all(&report.deals)?;
    }

    Ok(())
}
