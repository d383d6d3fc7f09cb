//! 浏览器协作者接口
//!
//! 抓取代码只依赖这里定义的能力集合，不关心具体的自动化实现：
//!
//! ```text
//! BrowserLauncher  ──launch()──▶  BrowserContext (一个隔离的浏览器进程)
//!                                     │ open_session()
//!                                     ▼
//!                                BrowserSession (独占的标签页)
//!                                     │ query() / query_all()
//!                                     ▼
//!                                  DomNode
//! ```
//!
//! 实现：
//! - `headless` / `crate::infrastructure::ChromeSession` - 基于 chromiumoxide 的真实浏览器
//! - `snapshot` - 内存中的 HTML 快照，用于离线回放和测试

pub mod headless;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::error::ScrapeResult;

pub use headless::{launch_headless_browser, ChromeLauncher};
pub use snapshot::SnapshotSite;

/// 等待元素时的轮询间隔
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub type NodeRef = Box<dyn DomNode>;

/// 可查询的页面节点
#[async_trait]
pub trait DomNode: Send + Sync {
    /// 在当前节点下查找第一个匹配的子节点
    async fn query(&self, selector: &str) -> ScrapeResult<Option<NodeRef>>;

    /// 读取属性（优先读取浏览器解析后的属性值，如绝对 href）
    async fn attribute(&self, name: &str) -> ScrapeResult<Option<String>>;

    /// 读取 textContent
    async fn text_content(&self) -> ScrapeResult<Option<String>>;
}

/// 一个独占的浏览会话
///
/// 同一时间只能被一个任务使用。
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> ScrapeResult<()>;

    async fn query(&self, selector: &str) -> ScrapeResult<Option<NodeRef>>;

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<NodeRef>>;

    /// 轮询直到元素出现，超时返回 `None`
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Option<NodeRef> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(Some(node)) = self.query(selector).await {
                return Some(node);
            }
            if Instant::now() >= deadline {
                return None;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// 轮询直到至少有一个元素出现，超时返回空列表
    async fn wait_for_all_elements(&self, selector: &str, timeout: Duration) -> Vec<NodeRef> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(nodes) = self.query_all(selector).await {
                if !nodes.is_empty() {
                    return nodes;
                }
            }
            if Instant::now() >= deadline {
                return Vec::new();
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// 关闭会话
    async fn close(self: Box<Self>) -> ScrapeResult<()>;
}

/// 一个隔离的浏览器上下文（对应一个 worker）
#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn open_session(&self) -> ScrapeResult<Box<dyn BrowserSession>>;

    async fn shutdown(&self) -> ScrapeResult<()>;
}

/// 启动新的浏览器上下文
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> ScrapeResult<Arc<dyn BrowserContext>>;
}

/// 读取一组节点的属性，忽略读取失败和空值
pub async fn collect_attributes(nodes: &[NodeRef], name: &str) -> Vec<String> {
    let mut values = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Ok(Some(value)) = node.attribute(name).await {
            values.push(value);
        }
    }
    values
}
