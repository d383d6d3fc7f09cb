//! 分类抓取流程 - 流程层
//!
//! 核心职责：定义"一个分类"的完整抓取流程
//!
//! 流程顺序：
//! 1. 打开第 1 页 → 提取优惠
//! 2. 读取“最后一页”按钮得到总页数（读取失败视为 1 页）
//! 3. 依次打开第 2..N 页 → 提取优惠并追加

use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{BrowserContext, BrowserSession};
use crate::config::Config;
use crate::error::ScrapeResult;
use crate::models::{CategoryFilters, Deal, SiteSelectors};
use crate::services::field_extractor;
use crate::services::DealExtractor;

/// 会话来源
pub enum SessionSource<'a> {
    /// 外部提供的会话，由调用方负责关闭
    Shared(&'a dyn BrowserSession),
    /// 在抓取时从上下文中打开，抓取结束后关闭
    Owned(Arc<dyn BrowserContext>),
}

/// 分类抓取器
///
/// - 整个生命周期内独占一个会话
/// - 翻页严格串行
/// - 单页加载失败只会让这一页没有结果
pub struct CategoryScraper<'a> {
    category_url: String,
    config: &'a Config,
    selectors: &'a SiteSelectors,
    source: SessionSource<'a>,
}

impl<'a> CategoryScraper<'a> {
    pub fn new(
        category_url: impl Into<String>,
        config: &'a Config,
        selectors: &'a SiteSelectors,
        source: SessionSource<'a>,
    ) -> Self {
        Self {
            category_url: category_url.into(),
            config,
            selectors,
            source,
        }
    }

    pub fn category_url(&self) -> &str {
        &self.category_url
    }

    /// 分类名称：URL 的最后一段
    pub fn category(&self) -> String {
        category_name(&self.category_url)
    }

    /// 根据过滤参数构造请求 URL
    pub fn build_request_url(&self, filters: &CategoryFilters) -> String {
        build_request_url(&self.category_url, filters)
    }

    /// 抓取该分类的所有优惠
    pub async fn scrape_all(&self, filters: &CategoryFilters) -> ScrapeResult<Vec<Deal>> {
        match &self.source {
            SessionSource::Shared(session) => self.scrape_with(*session, filters).await,
            SessionSource::Owned(context) => {
                let session = context.open_session().await?;
                let result = self.scrape_with(session.as_ref(), filters).await;
                // 无论成功与否都要释放会话
                if let Err(e) = session.close().await {
                    warn!("[分类 {}] 关闭会话失败: {}", self.category_url, e);
                }
                result
            }
        }
    }

    async fn scrape_with(
        &self,
        session: &dyn BrowserSession,
        filters: &CategoryFilters,
    ) -> ScrapeResult<Vec<Deal>> {
        let category = self.category();
        let extractor = DealExtractor::new(self.selectors);

        let Some(mut deals) = self.scrape_page(session, &extractor, &category, filters).await
        else {
            // 第一页都打不开时，页面上残留的是上一次的内容，不能读取分页
            return Ok(Vec::new());
        };

        let total_pages = self.total_pages(session).await;
        let pages = page_range(total_pages, self.config.max_pages_per_category);
        debug!(
            "[分类 {}] 共 {} 页，将抓取到第 {} 页",
            category,
            total_pages,
            (*pages.end()).max(1)
        );

        for page in pages {
            let page_filters = filters.with_page(page);
            if let Some(page_deals) = self
                .scrape_page(session, &extractor, &category, &page_filters)
                .await
            {
                deals.extend(page_deals);
            }
        }

        info!("[分类 {}] ✓ 抓取完成，共 {} 条", category, deals.len());
        Ok(deals)
    }

    /// 打开一页并提取，加载失败返回 `None`
    async fn scrape_page(
        &self,
        session: &dyn BrowserSession,
        extractor: &DealExtractor<'_>,
        category: &str,
        filters: &CategoryFilters,
    ) -> Option<Vec<Deal>> {
        let url = self.build_request_url(filters);
        if let Err(e) = session.navigate(&url).await {
            warn!("[分类 {}] ⚠️ 第 {} 页加载失败: {}", category, filters.page, e);
            return None;
        }
        let deals = extractor.extract_page(session, category).await;
        debug!("[分类 {}] 第 {} 页: {} 条", category, filters.page, deals.len());
        Some(deals)
    }

    /// 读取总页数，找不到分页控件时为 1
    async fn total_pages(&self, session: &dyn BrowserSession) -> usize {
        let Some(button) = session
            .wait_for_element(&self.selectors.last_page, self.config.wait_timeout())
            .await
        else {
            return 1;
        };
        let text = button.text_content().await.ok().flatten();
        let total = field_extractor::extract_number(text.as_deref(), 1.0);
        if total.is_finite() && total >= 1.0 {
            total as usize
        } else {
            1
        }
    }
}

/// 第 2 页到最后一页（受 `max_pages` 限制）
pub fn page_range(total_pages: usize, max_pages: Option<usize>) -> RangeInclusive<usize> {
    let last = match max_pages {
        Some(max) => total_pages.min(max),
        None => total_pages,
    };
    2..=last
}

pub fn build_request_url(category_url: &str, filters: &CategoryFilters) -> String {
    match Url::parse(category_url) {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(filters.query_pairs());
            url.to_string()
        }
        Err(_) => {
            let query = filters
                .query_pairs()
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            format!("{}?{}", category_url, query)
        }
    }
}

pub fn category_name(category_url: &str) -> String {
    let path = match Url::parse(category_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => category_url.split('?').next().unwrap_or_default().to_string(),
    };
    path.rsplit('/').next().unwrap_or_default().to_string()
}
