//! # Fixture Report
//!
//! 把灯具测光测量文件（照片、光谱图、色温图、测量表）合并为每个夹具一份 PDF 报告，
//! 并可选地在报告前插入由外部模型生成的合规摘要。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 PDF 文档和临时文件，只暴露能力
//! - `PdfBuilder` - 构建单页/多页文档
//! - `DocumentConcat` - 按顺序拼接文档
//! - `write_atomically` - 写临时文件后一次性替换
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个夹具
//! - `FileGrouper` - 扫描目录并按编号分组
//! - `PageAssembler` / `ReportMerger` - 生成页面并按固定顺序合并
//! - `SummaryGenerator` - 摘要策略链（上传完整报告 → 测量表片段）
//! - `SummaryPrepender` - 把摘要页插到报告最前面
//! - `OutcomeWriter` - 写运行日志
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个夹具"的完整处理流程
//! - `FixtureCtx` - 上下文封装（编号 + 序号）
//! - `FixtureFlow` - 流程编排（检查 → 合并 → 摘要 → 插入）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 扫描、顺序处理、统计
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{ReportError, ReportResult};
pub use models::{FixtureCode, FixtureGroup, Role, RoleRule};
pub use orchestrator::{App, RunStats};
pub use services::{SummaryBackend, SummaryGenerator};
pub use workflow::{FixtureCtx, FixtureFlow, GroupOutcome};
