use thiserror::Error;

/// 抓取过程中的错误类型
///
/// 按照发生的粒度划分：字段 → 元素 → 页面 → 分类 → 批次。
/// 除 `Discovery` 和 `Config` 外，其余错误都会在对应层级被吸收，
/// 只留下日志，不会让整个运行失败。
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// 标量文本解析失败（数字、日期等）
    #[error("字段解析失败: {0}")]
    FieldParse(String),

    /// 期望的子元素不存在
    #[error("元素未找到: {selector}")]
    ElementLookup { selector: String },

    /// 页面导航或分页控件读取失败
    #[error("页面加载失败 ({url}): {reason}")]
    PageFetch { url: String, reason: String },

    /// 单个分类的完整抓取失败
    #[error("分类抓取失败 ({url}): {reason}")]
    Category { url: String, reason: String },

    /// 一个批次（隔离 worker）整体失败
    #[error("批次抓取失败 {urls:?}: {reason}")]
    Batch { urls: Vec<String>, reason: String },

    /// 入口发现阶段失败（致命）
    #[error("分类发现失败: {0}")]
    Discovery(String),

    /// 浏览器启动/会话错误
    #[error("浏览器错误: {0}")]
    Browser(String),

    /// 导出失败
    #[error("导出失败 ({path}): {reason}")]
    Export { path: String, reason: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn field_parse(text: impl Into<String>) -> Self {
        ScrapeError::FieldParse(text.into())
    }

    pub fn element_lookup(selector: impl Into<String>) -> Self {
        ScrapeError::ElementLookup {
            selector: selector.into(),
        }
    }

    pub fn page_fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ScrapeError::PageFetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn browser(reason: impl std::fmt::Display) -> Self {
        ScrapeError::Browser(reason.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(err.to_string())
    }
}

/// 抓取结果类型
pub type ScrapeResult<T> = Result<T, ScrapeError>;
