//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的调度和统计，是整个系统的"指挥中心"。
//!
//! ### `batch_processor` - 批量夹具处理器
//! - 管理应用生命周期（初始化、运行）
//! - 扫描输入目录并分组（BTreeMap<FixtureCode, FixtureGroup>）
//! - 按编号顺序逐个处理，隔离单个夹具的失败
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理全部夹具)
//!     ↓
//! workflow::FixtureFlow (处理单个夹具)
//!     ↓
//! services (能力层：分组 / 页面 / 合并 / 摘要 / 运行日志)
//!     ↓
//! infrastructure (基础设施：PDF 构建、拼接、原子写)
//! ```

pub mod batch_processor;

pub use batch_processor::{App, RunStats};
