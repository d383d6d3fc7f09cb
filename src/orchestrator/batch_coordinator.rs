//! 批次内分类调度器 - 编排层
//!
//! ## 职责
//!
//! 在一个 worker 内并发抓取一组分类。
//!
//! ## 设计特点
//!
//! - **固定大小的通道池**：`min(max_concurrent_categories, 分类数)` 个通道，
//!   每个通道独占一个会话，从共享队列中依次领取分类
//! - **故障隔离**：单个分类出错（包括 panic）只记录日志，不影响其他分类
//! - **完成顺序汇总**：结果按分类完成的先后追加

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::browser::{BrowserContext, BrowserSession};
use crate::config::Config;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{CategoryFilters, Deal, SiteSelectors};
use crate::services::FailureLog;
use crate::workflow::{CategoryScraper, SessionSource};

/// 单个分类的抓取结果
struct CategoryOutcome {
    url: String,
    result: ScrapeResult<Vec<Deal>>,
}

/// 批次内分类调度器
#[derive(Clone)]
pub struct BatchCoordinator {
    config: Arc<Config>,
    selectors: Arc<SiteSelectors>,
    filters: CategoryFilters,
    failure_log: Arc<dyn FailureLog>,
}

impl BatchCoordinator {
    pub fn new(
        config: Arc<Config>,
        selectors: Arc<SiteSelectors>,
        filters: CategoryFilters,
        failure_log: Arc<dyn FailureLog>,
    ) -> Self {
        Self {
            config,
            selectors,
            filters,
            failure_log,
        }
    }

    /// 并发抓取所有分类，返回成功分类的全部优惠
    pub async fn scrape_all_categories(
        &self,
        context: Arc<dyn BrowserContext>,
        urls: Vec<String>,
    ) -> Vec<Deal> {
        if urls.is_empty() {
            return Vec::new();
        }

        let lanes = self.config.max_concurrent_categories.min(urls.len()).max(1);
        let queue = Arc::new(Mutex::new(VecDeque::from(urls)));
        let (tx, mut rx) = mpsc::unbounded_channel::<CategoryOutcome>();

        let mut handles = Vec::with_capacity(lanes);
        for lane in 1..=lanes {
            let lane_runner = LaneRunner {
                lane,
                context: Arc::clone(&context),
                queue: Arc::clone(&queue),
                config: Arc::clone(&self.config),
                selectors: Arc::clone(&self.selectors),
                filters: self.filters,
                tx: tx.clone(),
            };
            handles.push((lane, tokio::spawn(lane_runner.run())));
        }
        drop(tx);

        let mut results = Vec::new();
        while let Some(outcome) = rx.recv().await {
            match outcome.result {
                Ok(deals) => results.extend(deals),
                Err(e) => self.report_failure(&outcome.url, &e),
            }
        }

        for (lane, handle) in handles {
            if let Err(e) = handle.await {
                error!("[通道 {}] 任务执行失败: {}", lane, e);
            }
        }

        // 所有通道都无法打开会话时，队列中会剩下未处理的分类
        for url in drain_queue(&queue) {
            self.report_failure(&url, &ScrapeError::browser("没有可用的浏览器会话"));
        }

        results
    }

    fn report_failure(&self, url: &str, error: &ScrapeError) {
        error!("[分类 {}] ❌ 抓取失败: {}", url, error);
        self.failure_log.record(url, &error.to_string());
    }
}

/// 独占一个会话的调度通道
struct LaneRunner {
    lane: usize,
    context: Arc<dyn BrowserContext>,
    queue: Arc<Mutex<VecDeque<String>>>,
    config: Arc<Config>,
    selectors: Arc<SiteSelectors>,
    filters: CategoryFilters,
    tx: mpsc::UnboundedSender<CategoryOutcome>,
}

impl LaneRunner {
    async fn run(self) {
        let session = match self.context.open_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("[通道 {}] ⚠️ 无法打开会话: {}", self.lane, e);
                return;
            }
        };
        debug!("[通道 {}] 会话已打开", self.lane);

        while let Some(url) = next_category(&self.queue) {
            let result = self.scrape_category(session.as_ref(), &url).await;
            if self.tx.send(CategoryOutcome { url, result }).is_err() {
                break;
            }
        }

        if let Err(e) = session.close().await {
            warn!("[通道 {}] 关闭会话失败: {}", self.lane, e);
        }
        debug!("[通道 {}] 会话已关闭", self.lane);
    }

    async fn scrape_category(
        &self,
        session: &dyn BrowserSession,
        url: &str,
    ) -> ScrapeResult<Vec<Deal>> {
        let scraper = CategoryScraper::new(
            url,
            &self.config,
            &self.selectors,
            SessionSource::Shared(session),
        );

        match AssertUnwindSafe(scraper.scrape_all(&self.filters))
            .catch_unwind()
            .await
        {
            Ok(Ok(deals)) => Ok(deals),
            Ok(Err(e)) => Err(ScrapeError::Category {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(panic) => Err(ScrapeError::Category {
                url: url.to_string(),
                reason: panic_message(panic.as_ref()),
            }),
        }
    }
}

fn next_category(queue: &Mutex<VecDeque<String>>) -> Option<String> {
    queue
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .pop_front()
}

fn drain_queue(queue: &Mutex<VecDeque<String>>) -> Vec<String> {
    queue
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .drain(..)
        .collect()
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::snapshot::SnapshotStats;
    use crate::browser::{BrowserLauncher, SnapshotSite};
    use crate::services::MemoryFailureLog;
    use crate::workflow::category_scraper::build_request_url;

    const BASE: &str = "https://www.dealabs.com/groupe";

    fn category_url(name: &str) -> String {
        format!("{}/{}", BASE, name)
    }

    fn first_page(name: &str) -> String {
        build_request_url(&category_url(name), &CategoryFilters::default())
    }

    fn page_html(name: &str, count: usize) -> String {
        let cards: String = (0..count)
            .map(|i| {
                format!(
                    r#"<article class="thread--deal" id="{name}-{i}">
                         <strong class="thread-title"><a href="/bons-plans/{name}-{i}">t</a></strong>
                       </article>"#
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", cards)
    }

    fn coordinator(log: Arc<MemoryFailureLog>, lanes: usize) -> BatchCoordinator {
        let config = Config {
            max_concurrent_categories: lanes,
            wait_timeout_ms: 10,
            ..Config::default()
        };
        BatchCoordinator::new(
            Arc::new(config),
            Arc::new(SiteSelectors::default()),
            CategoryFilters::default(),
            log,
        )
    }

    #[tokio::test]
    async fn test_crash_is_isolated_to_its_category() {
        let site = SnapshotSite::new()
            .with_page(first_page("a"), page_html("a", 2))
            .with_page(first_page("b"), page_html("b", 3))
            .with_crashing_page(first_page("boom"))
            .with_page(first_page("c"), page_html("c", 1));
        let log = Arc::new(MemoryFailureLog::new());
        let context = site.launch().await.unwrap();

        let urls = vec![
            category_url("a"),
            category_url("boom"),
            category_url("b"),
            category_url("c"),
        ];
        let deals = coordinator(log.clone(), 2)
            .scrape_all_categories(context, urls)
            .await;

        assert_eq!(deals.len(), 6);
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, category_url("boom"));
        assert!(entries[0].1.contains("panic"));
    }

    #[tokio::test]
    async fn test_unreachable_category_contributes_nothing() {
        let site = SnapshotSite::new()
            .with_page(first_page("a"), page_html("a", 2))
            .with_page(first_page("b"), page_html("b", 2));
        let log = Arc::new(MemoryFailureLog::new());
        let context = site.launch().await.unwrap();

        let urls = vec![category_url("a"), category_url("missing"), category_url("b")];
        let deals = coordinator(log.clone(), 4)
            .scrape_all_categories(context, urls)
            .await;

        assert_eq!(deals.len(), 4);
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_lane_pool_size_and_session_release() {
        let names: Vec<String> = (0..7).map(|i| format!("cat{}", i)).collect();
        let site = names.iter().fold(SnapshotSite::new(), |site, name| {
            site.with_page(first_page(name), page_html(name, 1))
        });
        let context = site.launch().await.unwrap();
        let log = Arc::new(MemoryFailureLog::new());

        let urls = names.iter().map(|n| category_url(n)).collect();
        let deals = coordinator(log, 3)
            .scrape_all_categories(context, urls)
            .await;

        assert_eq!(deals.len(), 7);
        let stats = site.stats();
        // 每个通道一个会话，而不是每个分类一个
        assert_eq!(SnapshotStats::get(&stats.sessions_opened), 3);
        assert_eq!(SnapshotStats::get(&stats.sessions_closed), 3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let site = SnapshotSite::new();
        let context = site.launch().await.unwrap();
        let deals = coordinator(Arc::new(MemoryFailureLog::new()), 2)
            .scrape_all_categories(context, Vec::new())
            .await;
        assert!(deals.is_empty());
        assert_eq!(SnapshotStats::get(&site.stats().sessions_opened), 0);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "panic: boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "panic: bang");
    }
}
