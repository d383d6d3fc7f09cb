//! 优惠信息提取 - 业务能力层
//!
//! 把一个页面元素转换成 [`Deal`]，每个字段独立提取，
//! 某个子元素缺失只会让对应字段取默认值。

use tracing::debug;

use crate::browser::{BrowserSession, DomNode, NodeRef};
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{Deal, SiteSelectors};
use crate::services::field_extractor as fields;

/// 优惠信息提取器
pub struct DealExtractor<'a> {
    selectors: &'a SiteSelectors,
}

impl<'a> DealExtractor<'a> {
    pub fn new(selectors: &'a SiteSelectors) -> Self {
        Self { selectors }
    }

    /// 提取当前页面上的所有优惠
    ///
    /// 单个元素提取失败时跳过该元素，不影响同页的其他元素。
    pub async fn extract_page(&self, session: &dyn BrowserSession, category: &str) -> Vec<Deal> {
        let cards = match session.query_all(&self.selectors.deal_card).await {
            Ok(cards) => cards,
            Err(e) => {
                debug!("[分类 {}] 读取优惠列表失败: {}", category, e);
                return Vec::new();
            }
        };

        let mut deals = Vec::with_capacity(cards.len());
        for card in &cards {
            match self.extract(card.as_ref(), category).await {
                Ok(deal) => deals.push(deal),
                Err(e) => debug!("[分类 {}] 跳过无效元素: {}", category, e),
            }
        }
        deals
    }

    /// 提取单个优惠
    ///
    /// 只有缺少链接时整条记录无效。
    pub async fn extract(&self, card: &dyn DomNode, category: &str) -> ScrapeResult<Deal> {
        let s = self.selectors;

        let track_id = attribute(Some(card), "id").await;
        let image_url = attribute(find(card, &s.image).await.as_deref(), "src").await;
        // 格式: -12° 或 12°
        let temperature = text(find(card, &s.temperature).await.as_deref()).await;
        // 格式: JJ/MM/AAAA à HH:MM
        let expiration = text(find(card, &s.expiration).await.as_deref()).await;
        let url = attribute(find(card, &s.title_link).await.as_deref(), "href").await;
        let title = text(find(card, &s.title).await.as_deref()).await;
        let description = text(find(card, &s.description).await.as_deref()).await;
        let comments = text(find(card, &s.comments).await.as_deref()).await;

        let characteristics = find(card, &s.characteristics).await;
        let container = characteristics.as_deref();
        let price = text(find_in(container, &s.price).await.as_deref()).await;
        let initial_price = text(find_in(container, &s.initial_price).await.as_deref()).await;
        let shipping = text(find_in(container, &s.shipping).await.as_deref()).await;
        let merchant = text(find_in(container, &s.merchant).await.as_deref()).await;

        let url = fields::clean_text(url.as_deref(), "");
        if url.is_empty() {
            return Err(ScrapeError::element_lookup(&s.title_link));
        }

        Ok(Deal {
            track_id,
            category: category.to_string(),
            image_url: fields::clean_text(image_url.as_deref(), ""),
            current_temperature: fields::extract_number(temperature.as_deref(), 0.0),
            expiration_date: fields::extract_date(expiration.as_deref(), None),
            url,
            title: fields::clean_text(title.as_deref(), ""),
            price: fields::extract_optional_number(price.as_deref()),
            initial_price: fields::extract_optional_number(initial_price.as_deref()),
            shipping: fields::extract_optional_number(shipping.as_deref()),
            merchant: fields::clean_text(merchant.as_deref(), ""),
            description: fields::clean_text(description.as_deref(), ""),
            comments_count: fields::extract_count(comments.as_deref()),
        })
    }
}

async fn find(node: &dyn DomNode, selector: &str) -> Option<NodeRef> {
    node.query(selector).await.ok().flatten()
}

async fn find_in(container: Option<&dyn DomNode>, selector: &str) -> Option<NodeRef> {
    find(container?, selector).await
}

async fn attribute(node: Option<&dyn DomNode>, name: &str) -> Option<String> {
    node?.attribute(name).await.ok().flatten()
}

async fn text(node: Option<&dyn DomNode>) -> Option<String> {
    node?.text_content().await.ok().flatten()
}
