use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 报告生成错误类型
///
/// 除 `Setup` 外，所有错误都在单个夹具的处理边界被捕获，不会中断整批处理。
#[derive(Debug, Error)]
pub enum ReportError {
    /// 夹具文件组成不完整（跳过该组）
    #[error("夹具 {code} 文件组不完整: {reason}")]
    GroupingIncomplete { code: String, reason: String },

    /// 合并时缺少必需角色的文件
    #[error("夹具 {code} 缺少必需文件: {role}")]
    MissingRole { code: String, role: String },

    /// 源文件无法解码/解析（中止该组）
    #[error("页面生成失败 ({path}): {source}")]
    PageAssembly {
        path: String,
        #[source]
        source: BoxError,
    },

    /// 未配置摘要服务，或所有策略均失败（降级为无摘要）
    #[error("摘要不可用: {reason}")]
    SummarizationUnavailable { reason: String },

    /// 输出文件写入失败（中止该组，原文件保持不变）
    #[error("写入报告失败 ({path}): {source}")]
    ReportWrite {
        path: String,
        #[source]
        source: BoxError,
    },

    /// 不可恢复的启动错误（中止整个运行）
    #[error("启动失败: {reason}")]
    Setup { reason: String },
}

// ========== 便捷构造函数 ==========

impl ReportError {
    /// 创建页面生成错误
    pub fn page_assembly(
        path: impl AsRef<std::path::Path>,
        source: impl Into<BoxError>,
    ) -> Self {
        ReportError::PageAssembly {
            path: path.as_ref().display().to_string(),
            source: source.into(),
        }
    }

    /// 创建报告写入错误
    pub fn report_write(
        path: impl AsRef<std::path::Path>,
        source: impl Into<BoxError>,
    ) -> Self {
        ReportError::ReportWrite {
            path: path.as_ref().display().to_string(),
            source: source.into(),
        }
    }

    /// 创建文件组不完整错误
    pub fn grouping_incomplete(code: impl Into<String>, reason: impl Into<String>) -> Self {
        ReportError::GroupingIncomplete {
            code: code.into(),
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 报告生成结果类型
pub type ReportResult<T> = Result<T, ReportError>;
