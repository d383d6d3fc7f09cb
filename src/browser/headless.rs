use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::browser::{BrowserContext, BrowserLauncher};
use crate::config::Config;
use crate::error::{ScrapeError, ScrapeResult};
use crate::infrastructure::ChromeContext;

/// 启动浏览器进程
///
/// 返回浏览器以及后台事件处理任务的句柄。
pub async fn launch_headless_browser(config: &Config) -> ScrapeResult<(Browser, JoinHandle<()>)> {
    info!("🚀 启动浏览器 (headless: {})...", config.headless);

    let mut builder = BrowserConfig::builder()
        .window_size(1920, 1080)
        .request_timeout(config.navigation_timeout())
        .args(vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-extensions".to_string(),
            // 避免被识别为自动化浏览器
            "--disable-blink-features=AutomationControlled".to_string(),
            // 不加载图片
            "--blink-settings=imagesEnabled=false".to_string(),
            format!("--user-agent={}", config.user_agent),
        ]);

    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    if let Some(executable) = &config.chrome_executable {
        debug!("使用浏览器: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        ScrapeError::browser(format!("配置浏览器失败: {}", e))
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        ScrapeError::browser(format!("启动浏览器失败: {}", e))
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok((browser, handler_task))
}

/// 基于 chromiumoxide 的浏览器启动器
///
/// 每次 `launch` 都会启动一个独立的浏览器进程。
pub struct ChromeLauncher {
    config: Config,
}

impl ChromeLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> ScrapeResult<Arc<dyn BrowserContext>> {
        let (browser, handler) = launch_headless_browser(&self.config).await?;
        Ok(Arc::new(ChromeContext::new(
            browser,
            handler,
            self.config.navigation_timeout(),
        )))
    }
}
