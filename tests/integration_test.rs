use std::sync::Arc;

use deal_scraper::browser::snapshot::SnapshotStats;
use deal_scraper::workflow::category_scraper::build_request_url;
use deal_scraper::{
    fetch_category_links, CategoryFilters, Config, CrawlReport, Fleet, MemoryFailureLog,
    ScrapeError, SiteSelectors, SnapshotSite,
};
use tokio_test::{assert_err, assert_ok};

const INDEX: &str = "https://www.dealabs.com/groupe";

/// 每页 3 张卡片，其中 1 张没有链接
fn listing_html(category: &str, page: usize, last_page: usize) -> String {
    let mut cards = String::new();
    for i in 0..2 {
        cards.push_str(&format!(
            r#"<article class="thread--deal" id="{category}-{page}-{i}">
                 <div class="threadGrid-headerMeta"><button class="vote-temp">{temp}°</button></div>
                 <div class="threadGrid-title">
                   <strong class="thread-title"><a href="/bons-plans/{category}-{page}-{i}">Deal {i}</a></strong>
                   <span class="overflow--fade"><span class="thread-price">{price},99€</span></span>
                 </div>
               </article>"#,
            temp = 100 + i,
            price = 10 + i,
        ));
    }
    cards.push_str(
        r#"<article class="thread--deal"><strong class="thread-title">Sans lien</strong></article>"#,
    );
    format!(
        r#"<html><body>{cards}<nav><button aria-label="Dernière page">{last_page}</button></nav></body></html>"#
    )
}

/// 构造一个 hub × 分类 × 页 的站点
fn dealabs_site(hubs: &[(&str, &[&str])], pages: usize) -> SnapshotSite {
    let hub_links: String = hubs
        .iter()
        .map(|(hub, _)| format!(r#"<a class="button--type-secondary" href="/groupe/{hub}">{hub}</a>"#))
        .collect();
    let mut site = SnapshotSite::new().with_page(
        INDEX,
        format!(r#"<div class="listLayout-main">{hub_links}</div>"#),
    );

    for (hub, categories) in hubs {
        let links: String = categories
            .iter()
            .map(|c| format!(r#"<a href="/groupe/{c}">{c}</a>"#))
            .collect();
        site = site.with_page(
            format!("{INDEX}/{hub}"),
            format!(r#"<div id="pageContent"><div class="listLayout-main">{links}</div></div>"#),
        );
        for category in categories.iter() {
            for page in 1..=pages {
                let url = build_request_url(
                    &format!("{INDEX}/{category}"),
                    &CategoryFilters::default().with_page(page),
                );
                site = site.with_page(url, listing_html(category, page, pages));
            }
        }
    }
    site
}

fn test_config() -> Config {
    Config {
        hubs_url: INDEX.to_string(),
        wait_timeout_ms: 20,
        max_concurrent_categories: 2,
        max_workers: 2,
        batch_size: 10,
        ..Config::default()
    }
}

async fn crawl(site: &SnapshotSite, config: Config, log: Arc<MemoryFailureLog>) -> CrawlReport {
    let fleet = Fleet::new(config, Arc::new(site.clone()), log);
    assert_ok!(fleet.run_full_crawl().await)
}

#[tokio::test]
async fn test_full_crawl_collects_every_valid_card() {
    let site = dealabs_site(&[("hub1", &["a", "b"]), ("hub2", &["c", "d"])], 2);
    let log = Arc::new(MemoryFailureLog::new());

    let report = crawl(&site, test_config(), log.clone()).await;

    // 2 hub × 2 分类 × 2 页 × 2 条有效卡片
    assert_eq!(report.deals.len(), 16);
    assert_eq!(report.categories, 4);
    assert_eq!(report.batches, 1);
    assert_eq!(report.failed_batches, 0);
    assert!(log.entries().is_empty());

    for category in ["a", "b", "c", "d"] {
        let deals: Vec<_> = report.deals.iter().filter(|d| d.category == category).collect();
        assert_eq!(deals.len(), 4);
        // 同一分类内保持页面顺序
        let ids: Vec<_> = deals.iter().filter_map(|d| d.track_id.as_deref()).collect();
        let expected: Vec<String> = (1..=2)
            .flat_map(|p| (0..2).map(move |i| format!("{category}-{p}-{i}")))
            .collect();
        assert_eq!(ids, expected);
    }

    let deal = &report.deals[0];
    assert!(deal.url.starts_with("https://www.dealabs.com/bons-plans/"));
    assert!(deal.price.is_some());
    assert!(deal.current_temperature >= 100.0);
}

#[tokio::test]
async fn test_batches_partition_categories() {
    let site = dealabs_site(
        &[("hub1", &["a", "b", "c"]), ("hub2", &["d", "e"])],
        1,
    );
    let config = Config {
        batch_size: 2,
        ..test_config()
    };

    let report = crawl(&site, config, Arc::new(MemoryFailureLog::new())).await;

    assert_eq!(report.batches, 3);
    assert_eq!(report.deals.len(), 10);

    let mut categories: Vec<_> = report.deals.iter().map(|d| d.category.clone()).collect();
    categories.sort();
    categories.dedup();
    assert_eq!(categories, vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_bad_category_does_not_affect_siblings() {
    let site = dealabs_site(&[("hub1", &["a", "b"])], 2)
        .with_page(
            format!("{INDEX}/hub2"),
            r#"<div id="pageContent"><div class="listLayout-main"><a href="/groupe/ghost">ghost</a><a href="/groupe/crash">crash</a></div></div>"#,
        )
        .with_page(
            INDEX,
            r#"<div class="listLayout-main">
                 <a class="button--type-secondary" href="/groupe/hub1">1</a>
                 <a class="button--type-secondary" href="/groupe/hub2">2</a>
               </div>"#,
        )
        .with_crashing_page(build_request_url(
            &format!("{INDEX}/crash"),
            &CategoryFilters::default(),
        ));
    let log = Arc::new(MemoryFailureLog::new());

    let report = crawl(&site, test_config(), log.clone()).await;

    // ghost 无法加载，crash 崩溃，两者都没有贡献
    assert_eq!(report.categories, 4);
    assert_eq!(report.deals.len(), 8);
    assert_eq!(report.failed_batches, 0);

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, format!("{INDEX}/crash"));
}

#[tokio::test]
async fn test_worker_failure_keeps_other_batches() {
    // 第 1 次启动用于发现，第 2 次启动的 worker 失败
    let site = dealabs_site(&[("hub1", &["a", "b"]), ("hub2", &["c", "d"])], 1)
        .with_failing_launch(2);
    let config = Config {
        batch_size: 2,
        ..test_config()
    };
    let log = Arc::new(MemoryFailureLog::new());

    let report = crawl(&site, config, log.clone()).await;

    assert_eq!(report.batches, 2);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.deals.len(), 4);

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    // 失败记录中带有批次内的分类地址
    let failed_batch = &entries[0].0;
    assert!(
        failed_batch.contains(&format!("{INDEX}/a")) || failed_batch.contains(&format!("{INDEX}/c"))
    );
}

#[tokio::test]
async fn test_discovery_failure_is_fatal() {
    let site = SnapshotSite::new();
    let fleet = Fleet::new(
        test_config(),
        Arc::new(site.clone()),
        Arc::new(MemoryFailureLog::new()),
    );

    let err = assert_err!(fleet.run_full_crawl().await);
    assert!(matches!(
        err.downcast_ref::<ScrapeError>(),
        Some(ScrapeError::Discovery(_))
    ));
    // 没有启动任何 worker
    assert_eq!(SnapshotStats::get(&site.stats().launches), 1);
}

#[tokio::test]
async fn test_discovery_caps() {
    let site = dealabs_site(
        &[("hub1", &["a", "b"]), ("hub2", &["c", "d"]), ("hub3", &["e"])],
        1,
    );
    let selectors = SiteSelectors::default();

    let config = Config {
        max_hubs: Some(1),
        ..test_config()
    };
    let links = assert_ok!(fetch_category_links(&site, &config, &selectors).await);
    assert_eq!(links, vec![format!("{INDEX}/a"), format!("{INDEX}/b")]);

    let config = Config {
        max_categories: Some(3),
        ..test_config()
    };
    let links = assert_ok!(fetch_category_links(&site, &config, &selectors).await);
    assert_eq!(
        links,
        vec![format!("{INDEX}/a"), format!("{INDEX}/b"), format!("{INDEX}/c")]
    );
}

#[tokio::test]
async fn test_max_pages_per_category() {
    let site = dealabs_site(&[("hub1", &["a"])], 3);
    let config = Config {
        max_pages_per_category: Some(2),
        ..test_config()
    };

    let report = crawl(&site, config, Arc::new(MemoryFailureLog::new())).await;
    assert_eq!(report.deals.len(), 4);
}

#[tokio::test]
async fn test_browser_resources_released() {
    let site = dealabs_site(&[("hub1", &["a", "b", "c"]), ("hub2", &["d"])], 2);
    let config = Config {
        batch_size: 2,
        max_concurrent_categories: 4,
        ..test_config()
    };

    crawl(&site, config, Arc::new(MemoryFailureLog::new())).await;

    let stats = site.stats();
    // 发现 + 2 个 worker
    assert_eq!(SnapshotStats::get(&stats.launches), 3);
    assert_eq!(SnapshotStats::get(&stats.shutdowns), 3);
    // 发现 1 个会话，每个 worker min(4, 2) = 2 个
    assert_eq!(SnapshotStats::get(&stats.sessions_opened), 5);
    assert_eq!(SnapshotStats::get(&stats.sessions_closed), 5);
}
