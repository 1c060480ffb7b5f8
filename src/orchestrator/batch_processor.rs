//! 批量夹具处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次运行的资源和调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写运行日志文件头、准备输出目录、创建摘要服务
//! 2. **扫描分组**：扫描输入目录并按夹具编号分组
//! 3. **顺序处理**：按编号顺序逐个交给 `FixtureFlow`，一个夹具完成后才开始下一个
//! 4. **故障隔离**：每个夹具在独立任务中运行，出错或 panic 都只记为该夹具失败
//! 5. **全局统计**：汇总成功/跳过/失败数量，并逐行写入运行日志

use crate::config::Config;
use crate::error::{ReportError, ReportResult};
use crate::services::{FileGrouper, OutcomeWriter, SummaryGenerator};
use crate::utils::logging;
use crate::workflow::{FixtureCtx, FixtureFlow, GroupOutcome};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 运行统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub succeeded: usize,
    pub summarized: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: &GroupOutcome) {
        match outcome {
            GroupOutcome::Done { summarized, .. } => {
                self.succeeded += 1;
                if *summarized {
                    self.summarized += 1;
                }
            }
            GroupOutcome::Skipped(_) => self.skipped += 1,
            GroupOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    grouper: FileGrouper,
    flow: Arc<FixtureFlow>,
    outcome_writer: OutcomeWriter,
}

impl App {
    /// 初始化应用（摘要服务由配置决定）
    pub fn initialize(config: Config) -> ReportResult<Self> {
        let summary_generator = SummaryGenerator::from_config(&config);
        Self::with_summary_generator(config, summary_generator)
    }

    /// 使用指定的摘要生成器初始化
    pub fn with_summary_generator(
        config: Config,
        summary_generator: SummaryGenerator,
    ) -> ReportResult<Self> {
        logging::init_log_file(&config.output_log_file).map_err(|e| ReportError::Setup {
            reason: format!("{:#}", e),
        })?;

        logging::log_startup(&config);

        let output_dir = config.output_dir();
        std::fs::create_dir_all(&output_dir).map_err(|e| ReportError::Setup {
            reason: format!("无法创建输出目录 {}: {}", output_dir.display(), e),
        })?;

        let grouper = FileGrouper::from_config(&config)?;
        let flow = Arc::new(FixtureFlow::new(&config, summary_generator));
        let outcome_writer = OutcomeWriter::new(&config.output_log_file);

        Ok(Self {
            config,
            grouper,
            flow,
            outcome_writer,
        })
    }

    /// 运行应用主逻辑
    ///
    /// # 返回
    /// 只有启动类错误（如输入目录不存在）才返回 Err
    pub async fn run(&self) -> ReportResult<RunStats> {
        info!("\n📁 正在扫描: {}", self.config.input_dir);
        let groups = self
            .grouper
            .scan(std::path::Path::new(&self.config.input_dir))
            .await?;

        let mut stats = RunStats {
            total: groups.len(),
            ..Default::default()
        };

        if groups.is_empty() {
            warn!("⚠️ 没有找到带 {} 标记的文件，程序结束", self.config.fixture_marker);
            return Ok(stats);
        }
        logging::log_groups_found(stats.total);

        // BTreeMap 按编号排序，保证每次运行的日志顺序一致
        for (index, (code, group)) in groups.into_iter().enumerate() {
            let ctx = FixtureCtx::new(code.clone(), index + 1, stats.total);
            logging::log_group_start(&ctx.to_string(), group.len());

            let flow = self.flow.clone();
            let task_ctx = ctx.clone();
            let handle = tokio::spawn(async move { flow.run(&group, &task_ctx).await });

            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("{} 任务执行失败: {}", ctx, e);
                    GroupOutcome::Failed(format!("任务执行失败: {}", e))
                }
            };

            match &outcome {
                GroupOutcome::Done { .. } => info!("{} ✅ {}", ctx, outcome.detail()),
                _ => warn!("{} {}: {}", ctx, outcome.status(), outcome.detail()),
            }
            if let Err(e) = self
                .outcome_writer
                .write(&code, outcome.status(), &outcome.detail())
                .await
            {
                warn!(
                    "{} 写入运行日志失败 ({}): {:#}",
                    ctx,
                    self.outcome_writer.path().display(),
                    e
                );
            }

            stats.record(&outcome);
        }

        logging::print_final_stats(
            stats.total,
            stats.succeeded,
            stats.summarized,
            stats.skipped,
            stats.failed,
            &self.config.output_log_file,
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_stats_record() {
        let mut stats = RunStats::default();
        stats.record(&GroupOutcome::Done {
            output: PathBuf::from("a.pdf"),
            summarized: true,
        });
        stats.record(&GroupOutcome::Done {
            output: PathBuf::from("b.pdf"),
            summarized: false,
        });
        stats.record(&GroupOutcome::Skipped("x".into()));
        stats.record(&GroupOutcome::Failed("y".into()));

        assert_eq!(
            stats,
            RunStats {
                total: 0,
                succeeded: 2,
                summarized: 1,
                skipped: 1,
                failed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_missing_input_dir_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            input_dir: dir.path().join("missing").display().to_string(),
            output_dir: Some(dir.path().display().to_string()),
            output_log_file: dir.path().join("run.log").display().to_string(),
            ..Config::default()
        };

        let app = App::with_summary_generator(config, SummaryGenerator::disabled()).unwrap();
        assert!(matches!(app.run().await, Err(ReportError::Setup { .. })));
    }

    #[test]
    fn test_unwritable_log_is_setup_error() {
        let config = Config {
            output_log_file: "/definitely/not/here/run.log".to_string(),
            ..Config::default()
        };
        let result = App::with_summary_generator(config, SummaryGenerator::disabled());
        assert!(matches!(result, Err(ReportError::Setup { .. })));
    }
}
