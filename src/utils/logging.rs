use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// 初始化 tracing
///
/// 优先使用 `RUST_LOG`；未设置时默认 info，详细模式下为 debug
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// 初始化运行日志文件（覆盖旧内容，写入文件头）
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n夹具报告生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入运行日志: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 夹具测量报告生成");
    info!("📁 输入目录: {}", config.input_dir);
    info!("📂 输出目录: {}", config.output_dir().display());
    info!("{}", "=".repeat(60));
}

/// 记录分组结果
///
/// # 参数
/// - `total`: 夹具总数
pub fn log_groups_found(total: usize) {
    info!("✓ 找到 {} 个夹具", total);
    info!("💡 按编号顺序逐个处理\n");
}

/// 记录单个夹具开始处理
pub fn log_group_start(label: &str, file_count: usize) {
    info!("\n{}", "─".repeat(60));
    info!("{} 📦 开始处理（{} 个文件）", label, file_count);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `total`: 夹具总数
/// - `succeeded`: 成功数量（含摘要）
/// - `summarized`: 含摘要的数量
/// - `skipped`: 跳过数量
/// - `failed`: 失败数量
/// - `log_file_path`: 运行日志路径
pub fn print_final_stats(
    total: usize,
    succeeded: usize,
    summarized: usize,
    skipped: usize,
    failed: usize,
    log_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{} (含摘要 {})", succeeded, total, summarized);
    info!("⏭️ 跳过: {}", skipped);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
