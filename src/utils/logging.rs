/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::time::Duration;

use tracing::{error, info};

use crate::config::Config;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多 worker 分类抓取模式");
    info!("🌐 入口: {}", config.hubs_url);
    info!(
        "📊 worker 上限: {} | 每个 worker 并发分类: {} | 批次大小: {}",
        config.effective_workers(),
        config.max_concurrent_categories,
        config.batch_size
    );
    info!("{}", "=".repeat(60));
}

/// 记录分类发现结果
pub fn log_categories_discovered(total: usize, batches: usize, workers: usize) {
    info!("✓ 找到 {} 个待抓取的分类", total);
    info!("📋 分成 {} 个批次，最多 {} 个 worker 同时运行\n", batches, workers);
}

/// 记录批次开始信息
pub fn log_batch_start(batch_num: usize, total_batches: usize, size: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批 ({} 个分类)", batch_num, total_batches, size);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, total_batches: usize, deals: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {}/{} 批完成: {} 条优惠", batch_num, total_batches, deals);
    info!("{}", "─".repeat(60));
}

/// 记录批次失败信息
pub fn log_batch_failed(batch_num: usize, urls: &[String], reason: &str) {
    error!("[批次 {}] ❌ 处理失败: {}", batch_num, reason);
    error!("[批次 {}] 涉及分类: {:?}", batch_num, urls);
}

/// 打印最终统计信息
pub fn print_final_stats(
    deals: usize,
    categories: usize,
    batches: usize,
    failed_batches: usize,
    elapsed: Duration,
    failure_log: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 优惠: {} (分类 {})", deals, categories);
    info!("📦 批次: 成功 {}/{}", batches.saturating_sub(failed_batches), batches);
    info!("❌ 失败批次: {}", failed_batches);
    info!("⏱️ 耗时: {:.2} 秒", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    info!("\n失败日志: {}", failure_log);
}
