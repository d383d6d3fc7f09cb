//! 页面会话 - 基础设施层
//!
//! 持有稀缺资源（Browser / Page），只暴露查询能力

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, Page};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::browser::{BrowserContext, BrowserSession, DomNode, NodeRef};
use crate::error::{ScrapeError, ScrapeResult};

/// 一个浏览器进程
///
/// 每个会话对应其中一个标签页，标签页之间互不共享状态。
pub struct ChromeContext {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromeContext {
    pub fn new(browser: Browser, handler: JoinHandle<()>, navigation_timeout: Duration) -> Self {
        Self {
            browser: Mutex::new(browser),
            handler,
            navigation_timeout,
        }
    }
}

#[async_trait]
impl BrowserContext for ChromeContext {
    async fn open_session(&self) -> ScrapeResult<Box<dyn BrowserSession>> {
        let page = self.browser.lock().await.new_page("about:blank").await?;
        Ok(Box::new(ChromeSession {
            page,
            navigation_timeout: self.navigation_timeout,
        }))
    }

    async fn shutdown(&self) -> ScrapeResult<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        if let Err(e) = browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }
        self.handler.abort();
        debug!("浏览器已关闭");
        Ok(())
    }
}

impl Drop for ChromeContext {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// 独占一个标签页的会话
pub struct ChromeSession {
    page: Page,
    navigation_timeout: Duration,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> ScrapeResult<()> {
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScrapeError::page_fetch(url, e)),
            Err(_) => Err(ScrapeError::page_fetch(
                url,
                format!("导航超时 ({:?})", self.navigation_timeout),
            )),
        }
    }

    async fn query(&self, selector: &str) -> ScrapeResult<Option<NodeRef>> {
        // 找不到元素时 chromiumoxide 返回错误，这里视为不存在
        Ok(self
            .page
            .find_element(selector)
            .await
            .ok()
            .map(|element| Box::new(ChromeNode { element }) as NodeRef))
    }

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<NodeRef>> {
        let elements = self.page.find_elements(selector).await?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromeNode { element }) as NodeRef)
            .collect())
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.page.close().await?;
        Ok(())
    }
}

/// 页面中的一个 DOM 元素
pub struct ChromeNode {
    element: Element,
}

impl ChromeNode {
    async fn string_property(&self, name: &str) -> ScrapeResult<Option<String>> {
        let value = self.element.property(name).await?;
        Ok(match value {
            Some(JsonValue::String(s)) => Some(s),
            _ => None,
        })
    }
}

#[async_trait]
impl DomNode for ChromeNode {
    async fn query(&self, selector: &str) -> ScrapeResult<Option<NodeRef>> {
        Ok(self
            .element
            .find_element(selector)
            .await
            .ok()
            .map(|element| Box::new(ChromeNode { element }) as NodeRef))
    }

    async fn attribute(&self, name: &str) -> ScrapeResult<Option<String>> {
        // href / src 优先取浏览器解析后的绝对地址，其余属性读取原始值
        if reads_resolved_property(name) {
            if let Some(value) = non_empty(self.string_property(name).await?) {
                return Ok(Some(value));
            }
        }
        Ok(self.element.attribute(name).await?)
    }

    async fn text_content(&self) -> ScrapeResult<Option<String>> {
        self.string_property("textContent").await
    }
}

/// 浏览器会解析成绝对地址的属性
const RESOLVED_PROPERTIES: [&str; 2] = ["href", "src"];

fn reads_resolved_property(name: &str) -> bool {
    RESOLVED_PROPERTIES.contains(&name)
}

/// DOM 属性缺失时返回空字符串，视为不存在
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
