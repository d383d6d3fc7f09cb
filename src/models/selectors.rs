/// 站点结构选择器
///
/// 所有抓取代码只依赖这里的选择器，默认值对应 Dealabs 的页面结构。
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    /// 分组索引页上的 hub 链接
    pub hub_links: String,
    /// hub 页面上的分类链接
    pub category_links: String,
    /// 分类列表中的单条优惠
    pub deal_card: String,
    /// 分页控件中的“最后一页”按钮
    pub last_page: String,

    pub image: String,
    pub temperature: String,
    pub expiration: String,
    pub title: String,
    pub title_link: String,
    /// 价格、商家等信息所在的容器
    pub characteristics: String,
    pub price: String,
    pub initial_price: String,
    pub shipping: String,
    pub merchant: String,
    pub description: String,
    pub comments: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            hub_links: "div.listLayout-main a.button--type-secondary".to_string(),
            category_links: "div#pageContent div.listLayout-main a".to_string(),
            deal_card: "article.thread--deal".to_string(),
            last_page: r#"button[aria-label="Dernière page"]"#.to_string(),
            image: "div.threadGrid-image span.imgFrame img".to_string(),
            temperature: "div.threadGrid-headerMeta button.vote-temp".to_string(),
            expiration:
                "div.threadGrid-headerMeta span.metaRibbon svg.icon--hourglass + span".to_string(),
            title: "strong.thread-title".to_string(),
            title_link: "strong.thread-title a".to_string(),
            characteristics: "div.threadGrid-title > span.overflow--fade".to_string(),
            price: "span.thread-price".to_string(),
            initial_price: "span.text--lineThrough".to_string(),
            shipping: "span:has(svg.icon--truck) + span".to_string(),
            merchant: "a[data-t=merchantLink]".to_string(),
            description: "div.threadGrid-body".to_string(),
            comments: "div.threadGrid-footerMeta a[title=Commentaires]".to_string(),
        }
    }
}
