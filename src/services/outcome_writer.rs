//! 运行日志写入服务 - 业务能力层
//!
//! 只负责"往运行日志追加一行结果"，不关心流程

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::FixtureCode;

/// 运行日志写入服务
///
/// 职责：
/// - 每个夹具一行：编号 | 状态 | 原因或输出文件
/// - 只追加，不截断（文件头由启动时写入）
pub struct OutcomeWriter {
    log_file_path: PathBuf,
}

impl OutcomeWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.log_file_path
    }

    /// 追加一行结果
    ///
    /// # 参数
    /// - `code`: 夹具编号
    /// - `status`: 状态（成功 / 跳过 / 失败）
    /// - `detail`: 输出文件或原因
    pub async fn write(&self, code: &FixtureCode, status: &str, detail: &str) -> Result<()> {
        debug!("写入运行日志: {} | {}", code, status);

        let line = format!(
            "[{}] 夹具 {} | {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            code,
            status,
            detail.replace('\n', " ")
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .await
            .with_context(|| format!("无法打开运行日志: {}", self.log_file_path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
