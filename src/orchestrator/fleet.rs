//! 多 worker 抓取编排 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个抓取的入口，负责分批、并发和结果汇总。
//!
//! ## 核心流程
//!
//! 1. **分类发现**：调用 `discovery` 得到全部分类地址（失败即终止）
//! 2. **分批**：按 `batch_size` 连续切分
//! 3. **并发控制**：Semaphore 限制同时运行的 worker 数量
//! 4. **隔离执行**：每个 worker 启动自己的浏览器，运行 `BatchCoordinator`
//! 5. **汇总**：worker 结果经 channel 回传，边到达边合并
//!
//! ## 设计特点
//!
//! - 一个批次失败只记录日志和批次内的分类地址，不影响其他批次
//! - 浏览器在 worker 结束时关闭（包括失败路径）

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::browser::BrowserLauncher;
use crate::config::Config;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{CategoryFilters, Deal, SiteSelectors};
use crate::orchestrator::batch_coordinator::BatchCoordinator;
use crate::orchestrator::discovery;
use crate::services::{CsvExporter, FailureLog};
use crate::utils::{create_batches, logging};

/// 一次完整抓取的结果
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub deals: Vec<Deal>,
    /// 发现的分类数量
    pub categories: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub elapsed: Duration,
}

/// 单个批次的结果
struct BatchOutcome {
    batch_num: usize,
    urls: Vec<String>,
    result: ScrapeResult<Vec<Deal>>,
}

/// 抓取编排器
pub struct Fleet {
    config: Arc<Config>,
    selectors: Arc<SiteSelectors>,
    filters: CategoryFilters,
    launcher: Arc<dyn BrowserLauncher>,
    failure_log: Arc<dyn FailureLog>,
    exporter: Option<Arc<CsvExporter>>,
}

impl Fleet {
    pub fn new(
        config: Config,
        launcher: Arc<dyn BrowserLauncher>,
        failure_log: Arc<dyn FailureLog>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            selectors: Arc::new(SiteSelectors::default()),
            filters: CategoryFilters::default(),
            launcher,
            failure_log,
            exporter: None,
        }
    }

    pub fn with_selectors(mut self, selectors: SiteSelectors) -> Self {
        self.selectors = Arc::new(selectors);
        self
    }

    pub fn with_filters(mut self, filters: CategoryFilters) -> Self {
        self.filters = filters;
        self
    }

    /// 每个批次完成后立即追加到 CSV
    pub fn with_incremental_export(mut self, exporter: Arc<CsvExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// 运行完整抓取
    ///
    /// 只有分类发现失败时返回错误；批次、分类、页面的失败都被吸收。
    pub async fn run_full_crawl(&self) -> Result<CrawlReport> {
        let started = Instant::now();
        logging::log_startup(&self.config);

        let urls =
            discovery::fetch_category_links(self.launcher.as_ref(), &self.config, &self.selectors)
                .await?;

        if urls.is_empty() {
            warn!("⚠️ 没有发现任何分类，程序结束");
            return Ok(CrawlReport {
                elapsed: started.elapsed(),
                ..Default::default()
            });
        }

        let batches = create_batches(&urls, self.config.batch_size);
        let total_batches = batches.len();
        let workers = self.config.effective_workers();
        logging::log_categories_discovered(urls.len(), total_batches, workers);

        let (deals, failed_batches) = self.run_batches(batches, workers).await;

        let report = CrawlReport {
            deals,
            categories: urls.len(),
            batches: total_batches,
            failed_batches,
            elapsed: started.elapsed(),
        };
        logging::print_final_stats(
            report.deals.len(),
            report.categories,
            report.batches,
            report.failed_batches,
            report.elapsed,
            &self.config.failure_log_file,
        );
        Ok(report)
    }

    /// 并发运行所有批次，返回 (全部优惠, 失败批次数)
    async fn run_batches(&self, batches: Vec<Vec<String>>, workers: usize) -> (Vec<Deal>, usize) {
        let semaphore = Arc::new(Semaphore::new(workers));
        let total_batches = batches.len();
        let (tx, mut rx) = mpsc::unbounded_channel::<BatchOutcome>();

        let mut handles = Vec::with_capacity(total_batches);
        for (idx, urls) in batches.into_iter().enumerate() {
            let batch_num = idx + 1;
            let semaphore = semaphore.clone();
            let launcher = Arc::clone(&self.launcher);
            let coordinator = BatchCoordinator::new(
                Arc::clone(&self.config),
                Arc::clone(&self.selectors),
                self.filters,
                Arc::clone(&self.failure_log),
            );
            let tx = tx.clone();
            let batch_urls = urls.clone();

            let handle = tokio::spawn(async move {
                // 许可在任务内获取，避免阻塞派发循环
                let _permit = semaphore.acquire_owned().await;
                logging::log_batch_start(batch_num, total_batches, urls.len());
                let result = run_worker(launcher.as_ref(), &coordinator, urls.clone()).await;
                let _ = tx.send(BatchOutcome {
                    batch_num,
                    urls,
                    result,
                });
            });
            handles.push((batch_num, batch_urls, handle));
        }
        drop(tx);

        let mut deals = Vec::new();
        let mut failed = 0;
        while let Some(outcome) = rx.recv().await {
            match outcome.result {
                Ok(batch_deals) => {
                    logging::log_batch_complete(outcome.batch_num, total_batches, batch_deals.len());
                    self.export_batch(outcome.batch_num, &batch_deals);
                    deals.extend(batch_deals);
                }
                Err(e) => {
                    failed += 1;
                    self.report_batch_failure(outcome.batch_num, &outcome.urls, &e.to_string());
                }
            }
        }

        // worker 任务 panic 时不会回传结果
        for (batch_num, urls, handle) in handles {
            if let Err(e) = handle.await {
                error!("[批次 {}] 任务执行失败: {}", batch_num, e);
                failed += 1;
                self.report_batch_failure(batch_num, &urls, &e.to_string());
            }
        }

        (deals, failed)
    }

    fn export_batch(&self, batch_num: usize, deals: &[Deal]) {
        let Some(exporter) = &self.exporter else {
            return;
        };
        if deals.is_empty() {
            return;
        }
        if let Err(e) = exporter.append(deals) {
            warn!("[批次 {}] ⚠️ 追加 CSV 失败: {}", batch_num, e);
        }
    }

    fn report_batch_failure(&self, batch_num: usize, urls: &[String], reason: &str) {
        logging::log_batch_failed(batch_num, urls, reason);
        self.failure_log.record(
            &format!("batch {} [{}]", batch_num, urls.join(", ")),
            reason,
        );
    }
}

/// 一个 worker：启动独立浏览器，抓取整个批次，然后关闭浏览器
async fn run_worker(
    launcher: &dyn BrowserLauncher,
    coordinator: &BatchCoordinator,
    urls: Vec<String>,
) -> ScrapeResult<Vec<Deal>> {
    let context = launcher.launch().await.map_err(|e| ScrapeError::Batch {
        urls: urls.clone(),
        reason: e.to_string(),
    })?;

    let deals = coordinator
        .scrape_all_categories(Arc::clone(&context), urls)
        .await;

    if let Err(e) = context.shutdown().await {
        warn!("关闭浏览器失败: {}", e);
    }
    info!("worker 完成: {} 条优惠", deals.len());
    Ok(deals)
}
