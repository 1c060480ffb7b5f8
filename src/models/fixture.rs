use crate::error::{ReportError, ReportResult};
use crate::models::role::{RoleAssignment, RoleRule};
use std::fmt;
use std::path::PathBuf;

/// 夹具编号（文件名中标记之后的定长字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureCode(String);

impl FixtureCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 合并报告的文件名
    pub fn report_file_name(&self) -> String {
        format!("Merged_{}.pdf", self.0)
    }
}

impl fmt::Display for FixtureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 属于某个夹具的单个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFile {
    pub path: PathBuf,
    pub file_name: String,
    /// 去掉标记和编号后的文件名剩余部分，用于角色匹配
    pub descriptor: String,
}

/// 夹具文件组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureGroup {
    pub code: FixtureCode,
    /// 按目录列表顺序保存
    pub files: Vec<FixtureFile>,
}

impl FixtureGroup {
    pub fn new(code: FixtureCode) -> Self {
        Self {
            code,
            files: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 按声明表分配角色
    pub fn assign_roles(&self, rules: &[RoleRule]) -> RoleAssignment {
        RoleAssignment::assign(
            rules,
            self.files
                .iter()
                .map(|f| (f.descriptor.as_str(), f.path.as_path())),
        )
    }

    /// 检查文件组是否完整：文件数等于期望值，且每个角色恰好一个文件
    ///
    /// # 返回
    /// 完整时返回角色映射，否则返回 `GroupingIncomplete`
    pub fn check_complete(
        &self,
        expected_size: usize,
        rules: &[RoleRule],
    ) -> ReportResult<RoleAssignment> {
        if self.len() != expected_size {
            return Err(ReportError::grouping_incomplete(
                self.code.as_str(),
                format!(
                    "找到 {} 个文件，需要 {} 个 ({})",
                    self.len(),
                    expected_size,
                    self.file_names().join(", ")
                ),
            ));
        }

        let assignment = self.assign_roles(rules);
        let missing = assignment.missing();
        if !missing.is_empty() {
            let missing: Vec<String> = missing.iter().map(|r| r.to_string()).collect();
            let extra: Vec<String> = assignment
                .unassigned()
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            return Err(ReportError::grouping_incomplete(
                self.code.as_str(),
                format!(
                    "缺少 {}；未识别的文件: [{}]",
                    missing.join(", "),
                    extra.join(", ")
                ),
            ));
        }

        Ok(assignment)
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.file_name.as_str()).collect()
    }
}
