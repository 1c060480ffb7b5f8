//! 夹具处理上下文
//!
//! 封装"我正在处理第几个夹具、编号是什么"这一信息

use std::fmt::Display;

use crate::models::FixtureCode;

/// 夹具处理上下文
#[derive(Debug, Clone)]
pub struct FixtureCtx {
    pub code: FixtureCode,

    /// 在本次运行中的序号（从 1 开始，仅用于日志显示）
    pub index: usize,

    /// 本次运行的夹具总数
    pub total: usize,
}

impl FixtureCtx {
    pub fn new(code: FixtureCode, index: usize, total: usize) -> Self {
        Self { code, index, total }
    }
}

impl Display for FixtureCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[夹具 #{}/{} {}]", self.index, self.total, self.code)
    }
}
