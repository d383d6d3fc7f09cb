use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

/// 一条抓取到的优惠信息
///
/// 由 `DealExtractor` 针对每个页面元素构造一次，之后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deal {
    pub track_id: Option<String>,
    pub category: String,
    pub image_url: String,
    /// 温度，可以为负
    pub current_temperature: f64,
    #[serde(serialize_with = "serialize_datetime")]
    pub expiration_date: Option<NaiveDateTime>,
    pub url: String,
    pub title: String,
    pub price: Option<f64>,
    pub initial_price: Option<f64>,
    pub shipping: Option<f64>,
    pub merchant: String,
    pub description: String,
    pub comments_count: u32,
}

fn serialize_datetime<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(dt) => serializer.serialize_str(&dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        None => serializer.serialize_none(),
    }
}
