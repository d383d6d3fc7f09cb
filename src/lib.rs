//! # Deal Scraper
//!
//! 一个并发抓取 Dealabs 优惠列表的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 浏览器与基础设施层（Browser / Infrastructure）
//! - `browser/` - 浏览器协作者接口（启动器 → 上下文 → 会话 → 节点）
//! - `ChromeLauncher` - 基于 chromiumoxide 的真实浏览器
//! - `SnapshotSite` - 基于 HTML 快照的离线浏览器
//! - `infrastructure/` - chromiumoxide 的会话实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单页或单条记录
//! - `field_extractor` - 容错的字段解析
//! - `DealExtractor` - 从优惠卡片提取记录
//! - `FailureLog` - 记录被吸收的失败
//! - `CsvExporter` - 导出 CSV
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个分类"的完整抓取流程
//! - `CategoryScraper` - 第 1 页 → 读取总页数 → 第 2..N 页
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/discovery` - 串行发现所有分类
//! - `orchestrator/fleet` - 分批、限制 worker 数量、汇总结果
//! - `orchestrator/batch_coordinator` - 批次内的分类并发
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{BrowserContext, BrowserLauncher, BrowserSession, ChromeLauncher, SnapshotSite};
pub use config::Config;
pub use error::{ScrapeError, ScrapeResult};
pub use models::{CategoryFilters, Deal, SiteSelectors, SortBy, TimeFrame};
pub use orchestrator::{fetch_category_links, BatchCoordinator, CrawlReport, Fleet};
pub use services::{CsvExporter, FailureLog, FileFailureLog, MemoryFailureLog};
pub use workflow::{CategoryScraper, SessionSource};
