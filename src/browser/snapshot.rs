//! HTML 快照浏览器
//!
//! 以 URL → HTML 的映射代替真实浏览器，页面用 `scraper` 解析。
//! 用于离线回放已保存的页面，以及在没有浏览器的环境下测试整个抓取流程。
//! 未登记的 URL 在导航时返回 `PageFetch` 错误。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::browser::{BrowserContext, BrowserLauncher, BrowserSession, DomNode, NodeRef};
use crate::error::{ScrapeError, ScrapeResult};

/// 会解析成绝对地址的属性
const URL_ATTRIBUTES: [&str; 2] = ["href", "src"];

/// 快照运行统计
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub launches: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub navigations: AtomicUsize,
}

impl SnapshotStats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// 一组页面快照
///
/// 除页面外还可以登记故障：`with_crashing_page` 让导航 panic，
/// `with_failing_launch` 让某次启动失败。二者只在显式登记时生效。
#[derive(Clone, Default)]
pub struct SnapshotSite {
    pages: Arc<HashMap<String, String>>,
    crashing: Arc<HashSet<String>>,
    failing_launch: Option<usize>,
    stats: Arc<SnapshotStats>,
}

impl SnapshotSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个页面
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.into(), html.into());
        self
    }

    /// 导航到该 URL 时会话崩溃（panic），模拟浏览器异常
    ///
    /// 这里的 panic 是有意的：用于验证分类和 worker 层能捕获崩溃。
    /// 不登记崩溃页面时 `SnapshotSite` 不会 panic。
    pub fn with_crashing_page(mut self, url: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.crashing).insert(url.into());
        self
    }

    /// 让第 `n` 次（从 1 开始）启动浏览器失败
    pub fn with_failing_launch(mut self, n: usize) -> Self {
        self.failing_launch = Some(n);
        self
    }

    pub fn stats(&self) -> Arc<SnapshotStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl BrowserLauncher for SnapshotSite {
    async fn launch(&self) -> ScrapeResult<Arc<dyn BrowserContext>> {
        let n = self.stats.launches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_launch == Some(n) {
            return Err(ScrapeError::browser(format!("第 {} 次启动浏览器失败", n)));
        }
        Ok(Arc::new(SnapshotContext {
            pages: Arc::clone(&self.pages),
            crashing: Arc::clone(&self.crashing),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct SnapshotContext {
    pages: Arc<HashMap<String, String>>,
    crashing: Arc<HashSet<String>>,
    stats: Arc<SnapshotStats>,
}

#[async_trait]
impl BrowserContext for SnapshotContext {
    async fn open_session(&self) -> ScrapeResult<Box<dyn BrowserSession>> {
        self.stats.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SnapshotSession {
            pages: Arc::clone(&self.pages),
            crashing: Arc::clone(&self.crashing),
            stats: Arc::clone(&self.stats),
            current: Mutex::new(None),
        }))
    }

    async fn shutdown(&self) -> ScrapeResult<()> {
        self.stats.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 当前打开的页面
#[derive(Clone)]
struct LoadedPage {
    url: String,
    html: String,
}

struct SnapshotSession {
    pages: Arc<HashMap<String, String>>,
    crashing: Arc<HashSet<String>>,
    stats: Arc<SnapshotStats>,
    current: Mutex<Option<LoadedPage>>,
}

impl SnapshotSession {
    fn current_page(&self) -> ScrapeResult<LoadedPage> {
        let current = self
            .current
            .lock()
            .map_err(|_| ScrapeError::browser("会话状态已损坏"))?;
        current
            .clone()
            .ok_or_else(|| ScrapeError::browser("尚未打开任何页面"))
    }
}

#[async_trait]
impl BrowserSession for SnapshotSession {
    async fn navigate(&self, url: &str) -> ScrapeResult<()> {
        self.stats.navigations.fetch_add(1, Ordering::SeqCst);
        if self.crashing.contains(url) {
            panic!("浏览器在加载 {} 时崩溃", url);
        }
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| ScrapeError::page_fetch(url, "404 页面不存在"))?;

        let mut current = self
            .current
            .lock()
            .map_err(|_| ScrapeError::browser("会话状态已损坏"))?;
        *current = Some(LoadedPage {
            url: url.to_string(),
            html: html.clone(),
        });
        Ok(())
    }

    async fn query(&self, selector: &str) -> ScrapeResult<Option<NodeRef>> {
        let page = self.current_page()?;
        let nodes = select_in_document(&page.html, &page.url, selector, Some(1))?;
        Ok(nodes.into_iter().next().map(|n| Box::new(n) as NodeRef))
    }

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<NodeRef>> {
        let page = self.current_page()?;
        let nodes = select_in_document(&page.html, &page.url, selector, None)?;
        Ok(nodes.into_iter().map(|n| Box::new(n) as NodeRef).collect())
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.stats.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 快照中的一个元素，保存其外层 HTML
#[derive(Debug, Clone)]
pub struct SnapshotNode {
    outer_html: String,
    base_url: String,
    text: String,
    attributes: HashMap<String, String>,
}

impl SnapshotNode {
    fn from_element(element: ElementRef<'_>, base_url: &str) -> Self {
        Self {
            outer_html: element.html(),
            base_url: base_url.to_string(),
            text: element.text().collect(),
            attributes: element
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl DomNode for SnapshotNode {
    async fn query(&self, selector: &str) -> ScrapeResult<Option<NodeRef>> {
        let node = select_in_fragment(&self.outer_html, &self.base_url, selector)?;
        Ok(node.map(|n| Box::new(n) as NodeRef))
    }

    async fn attribute(&self, name: &str) -> ScrapeResult<Option<String>> {
        let Some(raw) = self.attributes.get(name) else {
            return Ok(None);
        };
        if URL_ATTRIBUTES.contains(&name) {
            if let Ok(absolute) = Url::parse(&self.base_url).and_then(|base| base.join(raw)) {
                return Ok(Some(absolute.to_string()));
            }
        }
        Ok(Some(raw.clone()))
    }

    async fn text_content(&self) -> ScrapeResult<Option<String>> {
        Ok(Some(self.text.clone()))
    }
}

fn parse_selector(selector: &str) -> ScrapeResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::element_lookup(format!("{} ({:?})", selector, e)))
}

fn select_in_document(
    html: &str,
    base_url: &str,
    selector: &str,
    limit: Option<usize>,
) -> ScrapeResult<Vec<SnapshotNode>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let matches = document
        .select(&selector)
        .map(|element| SnapshotNode::from_element(element, base_url));
    Ok(match limit {
        Some(n) => matches.take(n).collect(),
        None => matches.collect(),
    })
}

/// 只在元素的后代中查找，不匹配元素自身
fn select_in_fragment(
    outer_html: &str,
    base_url: &str,
    selector: &str,
) -> ScrapeResult<Option<SnapshotNode>> {
    let selector = parse_selector(selector)?;
    let fragment = Html::parse_fragment(outer_html);
    let Some(element) = fragment
        .root_element()
        .children()
        .find_map(ElementRef::wrap)
    else {
        return Ok(None);
    };
    Ok(element
        .select(&selector)
        .next()
        .map(|found| SnapshotNode::from_element(found, base_url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <div class="list">
                <a class="item" href="/a">A</a>
                <a class="item" href="https://other.example/b">B</a>
            </div>
            <article id="x"><span class="inner">bonjour&nbsp;monde</span></article>
        </body></html>
    "#;

    fn site() -> SnapshotSite {
        SnapshotSite::new().with_page("https://site.example/list", PAGE)
    }

    #[tokio::test]
    async fn test_query_all_resolves_relative_href() {
        let context = site().launch().await.unwrap();
        let session = context.open_session().await.unwrap();
        session.navigate("https://site.example/list").await.unwrap();

        let links = session.query_all("a.item").await.unwrap();
        assert_eq!(links.len(), 2);
        let hrefs = crate::browser::collect_attributes(&links, "href").await;
        assert_eq!(
            hrefs,
            vec![
                "https://site.example/a".to_string(),
                "https://other.example/b".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_node_query_only_descendants() {
        let context = site().launch().await.unwrap();
        let session = context.open_session().await.unwrap();
        session.navigate("https://site.example/list").await.unwrap();

        let article = session.query("article").await.unwrap().unwrap();
        assert!(article.query("article").await.unwrap().is_none());
        let inner = article.query("span.inner").await.unwrap().unwrap();
        assert_eq!(
            inner.text_content().await.unwrap().as_deref(),
            Some("bonjour\u{a0}monde")
        );
        assert_eq!(article.attribute("id").await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_unknown_url_fails_navigation() {
        let context = site().launch().await.unwrap();
        let session = context.open_session().await.unwrap();
        let result = session.navigate("https://site.example/missing").await;
        assert!(matches!(result, Err(ScrapeError::PageFetch { .. })));
    }

    #[tokio::test]
    async fn test_wait_for_missing_element_times_out() {
        let context = site().launch().await.unwrap();
        let session = context.open_session().await.unwrap();
        session.navigate("https://site.example/list").await.unwrap();

        let waited = session
            .wait_for_element("button.nope", std::time::Duration::from_millis(50))
            .await;
        assert!(waited.is_none());
    }

    #[tokio::test]
    async fn test_failing_launch() {
        let site = site().with_failing_launch(2);
        assert!(site.launch().await.is_ok());
        assert!(site.launch().await.is_err());
        assert!(site.launch().await.is_ok());
        assert_eq!(SnapshotStats::get(&site.stats().launches), 3);
    }
}
