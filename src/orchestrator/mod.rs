//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责分类发现、分批和两级并发调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `discovery` - 分类发现
//! - 串行访问 hub 索引页和每个 hub
//! - 按配置截断 hub 列表和分类列表
//! - 失败即终止运行
//!
//! ### `fleet` - 多 worker 编排
//! - 将分类列表连续切分为批次
//! - 控制同时运行的 worker 数量（Semaphore）
//! - 每个 worker 持有独立的浏览器
//! - 汇总结果，记录失败批次，输出全局统计
//!
//! ### `batch_coordinator` - 批次内调度
//! - 固定数量的通道，每个通道独占一个会话
//! - 捕获单个分类的错误和 panic
//!
//! ## 层次关系
//!
//! ```text
//! fleet (处理 Vec<批次>)
//!     ↓
//! batch_coordinator (处理一个批次内的 Vec<分类>)
//!     ↓
//! workflow::CategoryScraper (处理单个分类的所有页)
//!     ↓
//! services (能力层：DealExtractor / FailureLog / CsvExporter)
//!     ↓
//! browser / infrastructure (浏览器会话)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：fleet 管批次，batch_coordinator 管分类
//! 2. **资源隔离**：浏览器上下文只在编排层启动和关闭
//! 3. **故障吸收**：下层失败在这里变成日志，不向上传播

pub mod batch_coordinator;
pub mod discovery;
pub mod fleet;

// 重新导出主要类型
pub use batch_coordinator::BatchCoordinator;
pub use discovery::fetch_category_links;
pub use fleet::{CrawlReport, Fleet};
