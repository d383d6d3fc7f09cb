use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ScrapeError;

/// 默认配置文件
const DEFAULT_CONFIG_FILE: &str = "scraper.toml";

/// 程序配置（运行选项）
///
/// 启动时构造一次，之后以只读方式在所有 worker 之间共享。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 分组（hub）索引页
    pub hubs_url: String,
    /// 是否无头模式
    pub headless: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 等待元素出现的超时（毫秒）
    pub wait_timeout_ms: u64,
    /// 页面导航超时（毫秒）
    pub navigation_timeout_ms: u64,
    /// 每个分类最多抓取的页数
    pub max_pages_per_category: Option<usize>,
    /// 最多抓取的分类数量
    pub max_categories: Option<usize>,
    /// 最多访问的 hub 数量
    pub max_hubs: Option<usize>,
    /// 单个 worker 内同时抓取的分类数量
    pub max_concurrent_categories: usize,
    /// 同时运行的 worker 数量上限
    pub max_workers: usize,
    /// 每个批次的分类数量
    pub batch_size: usize,
    /// 浏览器可执行文件（为空时自动查找）
    pub chrome_executable: Option<PathBuf>,
    /// 浏览器 User-Agent
    pub user_agent: String,
    /// 输出 CSV 文件
    pub output_csv: String,
    /// 失败日志文件
    pub failure_log_file: String,
    /// 每个批次完成后立即追加到 CSV
    pub export_incrementally: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hubs_url: "https://www.dealabs.com/groupe".to_string(),
            headless: true,
            verbose_logging: false,
            wait_timeout_ms: 500,
            navigation_timeout_ms: 30_000,
            max_pages_per_category: None,
            max_categories: None,
            max_hubs: None,
            max_concurrent_categories: 4,
            max_workers: available_parallelism(),
            batch_size: 10,
            chrome_executable: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.6723.116 Safari/537.3".to_string(),
            output_csv: "deals_complete.csv".to_string(),
            failure_log_file: "logs.txt".to_string(),
            export_incrementally: false,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的字段使用默认值
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 读取配置文件（如果存在），再应用环境变量覆盖
    ///
    /// 配置文件路径取自 `SCRAPER_CONFIG`，未设置时尝试当前目录下的 `scraper.toml`。
    pub fn load() -> Result<Self> {
        let explicit = std::env::var("SCRAPER_CONFIG").ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let base = if path.exists() {
            Self::from_file(&path)?
        } else if let Some(missing) = explicit {
            anyhow::bail!("配置文件不存在: {}", missing.display());
        } else {
            Self::default()
        };

        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            hubs_url: env_string("HUBS_URL").unwrap_or(self.hubs_url),
            headless: env_parse("HEADLESS").unwrap_or(self.headless),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            wait_timeout_ms: env_parse("WAIT_TIMEOUT_MS").unwrap_or(self.wait_timeout_ms),
            navigation_timeout_ms: env_parse("NAVIGATION_TIMEOUT_MS")
                .unwrap_or(self.navigation_timeout_ms),
            max_pages_per_category: env_parse("MAX_PAGES_PER_CATEGORY")
                .or(self.max_pages_per_category),
            max_categories: env_parse("MAX_CATEGORIES").or(self.max_categories),
            max_hubs: env_parse("MAX_HUBS").or(self.max_hubs),
            max_concurrent_categories: env_parse("MAX_CONCURRENT_CATEGORIES")
                .unwrap_or(self.max_concurrent_categories),
            max_workers: env_parse("MAX_WORKERS").unwrap_or(self.max_workers),
            batch_size: env_parse("BATCH_SIZE").unwrap_or(self.batch_size),
            chrome_executable: env_string("CHROME_EXECUTABLE")
                .map(PathBuf::from)
                .or(self.chrome_executable),
            user_agent: env_string("USER_AGENT").unwrap_or(self.user_agent),
            output_csv: env_string("OUTPUT_CSV").unwrap_or(self.output_csv),
            failure_log_file: env_string("FAILURE_LOG_FILE").unwrap_or(self.failure_log_file),
            export_incrementally: env_parse("EXPORT_INCREMENTALLY")
                .unwrap_or(self.export_incrementally),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.max_concurrent_categories == 0 {
            return Err(ScrapeError::Config(
                "max_concurrent_categories 必须大于 0".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(ScrapeError::Config("max_workers 必须大于 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ScrapeError::Config("batch_size 必须大于 0".to_string()));
        }
        if self.wait_timeout_ms == 0 || self.navigation_timeout_ms == 0 {
            return Err(ScrapeError::Config("超时时间必须大于 0".to_string()));
        }
        if self.hubs_url.trim().is_empty() {
            return Err(ScrapeError::Config("hubs_url 不能为空".to_string()));
        }
        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// 实际同时运行的 worker 数量：min(max_workers, 可用并行度)
    pub fn effective_workers(&self) -> usize {
        self.max_workers.min(available_parallelism()).max(1)
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.wait_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_toml_partial_override() {
        let config = Config::from_toml_str(
            r#"
            max_hubs = 1
            max_categories = 10
            max_concurrent_categories = 2
            headless = false
            "#,
        )
        .unwrap();

        assert_eq!(config.max_hubs, Some(1));
        assert_eq!(config.max_categories, Some(10));
        assert_eq!(config.max_concurrent_categories, 2);
        assert!(!config.headless);
        // 未出现的字段保持默认值
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.hubs_url, "https://www.dealabs.com/groupe");
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ScrapeError::Config(_))));
    }

    #[test]
    fn test_effective_workers_is_capped() {
        let config = Config {
            max_workers: 10_000,
            ..Config::default()
        };
        assert!(config.effective_workers() <= available_parallelism());
        assert!(config.effective_workers() >= 1);
    }
}
