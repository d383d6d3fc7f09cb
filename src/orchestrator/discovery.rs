//! 分类发现 - 编排层
//!
//! 串行访问 hub 索引页和每个 hub，得到全部分类地址。
//! 这一阶段不做并发，也不做故障隔离：任何错误都会终止整个运行。

use tracing::{debug, info};

use crate::browser::{collect_attributes, BrowserLauncher, BrowserSession};
use crate::config::Config;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::SiteSelectors;

/// 获取所有分类地址（保持页面顺序）
pub async fn fetch_category_links(
    launcher: &dyn BrowserLauncher,
    config: &Config,
    selectors: &SiteSelectors,
) -> ScrapeResult<Vec<String>> {
    info!("\n🔍 正在发现分类: {}", config.hubs_url);

    let context = launcher.launch().await.map_err(discovery_error)?;
    let result = match context.open_session().await {
        Ok(session) => {
            let links = walk_hubs(session.as_ref(), config, selectors).await;
            if let Err(e) = session.close().await {
                debug!("关闭发现会话失败: {}", e);
            }
            links
        }
        Err(e) => Err(e),
    };
    if let Err(e) = context.shutdown().await {
        debug!("关闭发现浏览器失败: {}", e);
    }

    result.map_err(discovery_error)
}

async fn walk_hubs(
    session: &dyn BrowserSession,
    config: &Config,
    selectors: &SiteSelectors,
) -> ScrapeResult<Vec<String>> {
    let mut hubs = links_on_page(session, &config.hubs_url, &selectors.hub_links, config).await?;
    truncate(&mut hubs, config.max_hubs);
    info!("✓ 找到 {} 个 hub", hubs.len());

    let mut categories = Vec::new();
    for (idx, hub) in hubs.iter().enumerate() {
        let links = links_on_page(session, hub, &selectors.category_links, config).await?;
        debug!("[hub {}/{}] {}: {} 个分类", idx + 1, hubs.len(), hub, links.len());
        categories.extend(links);
    }

    truncate(&mut categories, config.max_categories);
    Ok(categories)
}

async fn links_on_page(
    session: &dyn BrowserSession,
    url: &str,
    selector: &str,
    config: &Config,
) -> ScrapeResult<Vec<String>> {
    session.navigate(url).await?;
    let nodes = session
        .wait_for_all_elements(selector, config.wait_timeout())
        .await;
    Ok(collect_attributes(&nodes, "href")
        .await
        .into_iter()
        .filter(|href| !href.trim().is_empty())
        .collect())
}

/// 只截断，不改变顺序
fn truncate(links: &mut Vec<String>, max: Option<usize>) {
    if let Some(max) = max {
        links.truncate(max);
    }
}

fn discovery_error(err: ScrapeError) -> ScrapeError {
    match err {
        ScrapeError::Discovery(_) => err,
        other => ScrapeError::Discovery(other.to_string()),
    }
}
