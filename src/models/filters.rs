use std::fmt;

/// 排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    New,
    HighestPrice,
    LowestPrice,
    Temperature,
    Discussions,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::New => "new",
            SortBy::HighestPrice => "highest_price",
            SortBy::LowestPrice => "lowest_price",
            SortBy::Temperature => "temp",
            SortBy::Discussions => "discussion",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 时间范围（天数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFrame {
    All,
    #[default]
    Week,
    Month,
    Year,
}

impl TimeFrame {
    pub fn days(&self) -> u32 {
        match self {
            TimeFrame::All => 0,
            TimeFrame::Week => 7,
            TimeFrame::Month => 30,
            TimeFrame::Year => 365,
        }
    }
}

/// 分类请求的过滤参数
///
/// 不可变；翻页时通过 [`CategoryFilters::with_page`] 派生新的实例。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryFilters {
    pub hide_expired: bool,
    pub hide_local: bool,
    pub time_frame: TimeFrame,
    pub sort_by: SortBy,
    /// 页码，从 1 开始
    pub page: usize,
}

impl Default for CategoryFilters {
    fn default() -> Self {
        Self {
            hide_expired: true,
            hide_local: true,
            time_frame: TimeFrame::default(),
            sort_by: SortBy::default(),
            page: 1,
        }
    }
}

impl CategoryFilters {
    /// 复制当前过滤参数并替换页码
    pub fn with_page(&self, page: usize) -> Self {
        Self { page, ..*self }
    }

    /// 按固定顺序生成查询参数
    pub fn query_pairs(&self) -> [(&'static str, String); 5] {
        [
            ("hide_expired", self.hide_expired.to_string()),
            ("hide_local", self.hide_local.to_string()),
            ("time_frame", self.time_frame.days().to_string()),
            ("sort", self.sort_by.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}
