//! 夹具处理流程 - 流程层
//!
//! 核心职责：定义"一个夹具"的完整处理流程
//!
//! 流程顺序：
//! 1. 检查文件组是否完整（不完整则跳过）
//! 2. 按固定顺序合并四个源文件
//! 3. 生成合规摘要（可选，失败不影响报告）
//! 4. 把摘要页插到报告最前面
//!
//! 任何一步出错都只结束当前夹具，返回 `GroupOutcome`，不会向上传播。

use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::models::{FixtureGroup, RoleRule};
use crate::services::{ReportMerger, SummaryGenerator, SummaryInput, SummaryPrepender};
use crate::utils::logging::truncate_text;
use crate::workflow::fixture_ctx::FixtureCtx;

/// 夹具处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureState {
    Discovered,
    Eligible,
    Skipped,
    Assembled,
    Summarized,
    Done,
    Failed,
}

impl fmt::Display for FixtureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FixtureState::Discovered => "已发现",
            FixtureState::Eligible => "可处理",
            FixtureState::Skipped => "已跳过",
            FixtureState::Assembled => "已合并",
            FixtureState::Summarized => "已摘要",
            FixtureState::Done => "完成",
            FixtureState::Failed => "失败",
        };
        f.write_str(name)
    }
}

/// 单个夹具的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    /// 报告已生成
    Done { output: PathBuf, summarized: bool },
    /// 文件组不完整，未生成任何文件
    Skipped(String),
    /// 处理中途出错
    Failed(String),
}

impl GroupOutcome {
    /// 运行日志中的状态文字
    pub fn status(&self) -> &'static str {
        match self {
            GroupOutcome::Done {
                summarized: true, ..
            } => "成功（含摘要）",
            GroupOutcome::Done { .. } => "成功",
            GroupOutcome::Skipped(_) => "跳过",
            GroupOutcome::Failed(_) => "失败",
        }
    }

    /// 输出文件或原因
    pub fn detail(&self) -> String {
        match self {
            GroupOutcome::Done { output, .. } => output.display().to_string(),
            GroupOutcome::Skipped(reason) | GroupOutcome::Failed(reason) => reason.clone(),
        }
    }
}

/// 夹具处理流程
///
/// - 编排完整的夹具处理流程
/// - 决定何时跳过、何时降级为无摘要
/// - 不持有跨夹具的可变状态
pub struct FixtureFlow {
    expected_group_size: usize,
    roles: Vec<RoleRule>,
    merger: ReportMerger,
    summary_generator: SummaryGenerator,
    prepender: SummaryPrepender,
    verbose_logging: bool,
}

impl FixtureFlow {
    pub fn new(config: &Config, summary_generator: SummaryGenerator) -> Self {
        Self {
            expected_group_size: config.expected_group_size,
            roles: config.roles.clone(),
            merger: ReportMerger::new(config.output_dir()),
            summary_generator,
            prepender: SummaryPrepender::new(),
            verbose_logging: config.verbose_logging,
        }
    }

    pub async fn run(&self, group: &FixtureGroup, ctx: &FixtureCtx) -> GroupOutcome {
        let mut state = FixtureState::Discovered;
        debug!("{} 状态: {}", ctx, state);

        // ========== 1. 检查文件组 ==========
        let assignment = match group.check_complete(self.expected_group_size, &self.roles) {
            Ok(assignment) => {
                transition(ctx, &mut state, FixtureState::Eligible);
                assignment
            }
            Err(e) => {
                transition(ctx, &mut state, FixtureState::Skipped);
                warn!("{} ⏭️ 跳过: {}", ctx, e);
                return GroupOutcome::Skipped(e.to_string());
            }
        };

        if self.verbose_logging {
            for (role, path) in assignment.in_report_order() {
                info!("{}   {} ← {}", ctx, role, path.display());
            }
        }

        // ========== 2. 合并报告 ==========
        let report = match self.merger.merge(&group.code, &assignment) {
            Ok(report) => {
                transition(ctx, &mut state, FixtureState::Assembled);
                report
            }
            Err(e) => {
                transition(ctx, &mut state, FixtureState::Failed);
                error!("{} ❌ 合并失败: {}", ctx, e);
                return GroupOutcome::Failed(e.to_string());
            }
        };

        // ========== 3. 生成摘要 ==========
        let input = SummaryInput {
            code: group.code.clone(),
            report: report.path.clone(),
            table: report.table.clone(),
        };
        let summary = self.summary_generator.generate(&input).await;

        // ========== 4. 插入摘要页 ==========
        let mut summarized = false;
        if let Some(summary) = summary {
            if self.verbose_logging {
                info!("{} 摘要: {}", ctx, truncate_text(&summary.text, 80));
            }
            match self.prepender.prepend(&report.path, Some(&summary.text)) {
                Ok(_) => {
                    transition(ctx, &mut state, FixtureState::Summarized);
                    summarized = true;
                }
                Err(e) => {
                    // 已合并的报告保持原样
                    transition(ctx, &mut state, FixtureState::Failed);
                    error!("{} ❌ 插入摘要失败: {}", ctx, e);
                    return GroupOutcome::Failed(format!(
                        "{}（未含摘要的报告已保留: {}）",
                        e,
                        report.path.display()
                    ));
                }
            }
        }

        transition(ctx, &mut state, FixtureState::Done);
        GroupOutcome::Done {
            output: report.path,
            summarized,
        }
    }
}

fn transition(ctx: &FixtureCtx, state: &mut FixtureState, next: FixtureState) {
    debug!("{} 状态: {} → {}", ctx, state, next);
    *state = next;
}
