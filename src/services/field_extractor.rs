//! 字段解析 - 业务能力层
//!
//! 所有函数都是“尝试解析，失败返回默认值”，解析错误不会越过这里。

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::{ScrapeError, ScrapeResult};

/// 执行解析，失败时返回默认值
pub fn try_extract<T>(parse: impl FnOnce() -> ScrapeResult<T>, default: T) -> T {
    parse().unwrap_or(default)
}

/// 解析数字
///
/// `,` 视为小数点，文本中任意位置出现 `-` 即为负数，只保留数字和 `.`。
pub fn parse_number(text: &str) -> ScrapeResult<f64> {
    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let sign = if normalized.contains('-') { -1.0 } else { 1.0 };
    let digits: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    digits
        .parse::<f64>()
        .map(|n| sign * n)
        .map_err(|_| ScrapeError::field_parse(text))
}

/// 清理文本：去掉换行、把不换行空格换成普通空格、去掉首尾空白
pub fn clean(text: &str) -> String {
    text.replace(['\n', '\r'], "")
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{2}/\d{2}/\d{4}).*?(\d{2}:\d{2})").expect("日期正则无效")
    })
}

/// 在文本中查找 `DD/MM/YYYY ... HH:MM` 并组合成时间
pub fn parse_date(text: &str) -> ScrapeResult<NaiveDateTime> {
    let captures = date_pattern()
        .captures(text)
        .ok_or_else(|| ScrapeError::field_parse(text))?;

    let combined = format!("{} {}", &captures[1], &captures[2]);
    NaiveDateTime::parse_from_str(&combined, "%d/%m/%Y %H:%M")
        .map_err(|_| ScrapeError::field_parse(text))
}

fn require(text: Option<&str>) -> ScrapeResult<&str> {
    text.ok_or_else(|| ScrapeError::field_parse("<缺失>"))
}

pub fn extract_number(text: Option<&str>, default: f64) -> f64 {
    try_extract(|| parse_number(require(text)?), default)
}

/// 元素缺失（或文本为空）时为 `None`；有文本但无法解析（如 "GRATUIT"）时为 `Some(0.0)`
pub fn extract_optional_number(text: Option<&str>) -> Option<f64> {
    let text = text.filter(|t| !t.trim().is_empty())?;
    Some(extract_number(Some(text), 0.0))
}

pub fn clean_text(text: Option<&str>, default: &str) -> String {
    try_extract(|| require(text).map(clean), default.to_string())
}

pub fn extract_date(text: Option<&str>, default: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    try_extract(|| parse_date(require(text)?).map(Some), default)
}

/// 提取非负整数（评论数等）
pub fn extract_count(text: Option<&str>) -> u32 {
    let n = extract_number(text, 0.0);
    if n.is_finite() && n > 0.0 {
        n.min(u32::MAX as f64) as u32
    } else {
        0
    }
}
