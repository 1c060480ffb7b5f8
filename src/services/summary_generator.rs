//! 摘要生成服务 - 业务能力层
//!
//! 按顺序尝试各个摘要策略，第一个成功的结果即为摘要。
//! 摘要是锦上添花：任何失败都只记录日志，不会中断流程。
//! 时限由各策略自己对远程调用施加，这样超时后策略仍能清理已上传的文档。

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ReportError, ReportResult};
use crate::services::summary_backend::{OpenAiBackend, SummaryBackend};
use crate::services::summary_strategy::{
    CompliancePrompt, DocumentUploadStrategy, SummaryInput, SummaryStrategy, TableSnippetStrategy,
};

/// 摘要文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryText {
    pub text: String,
    /// 产生该摘要的策略名称
    pub strategy: &'static str,
}

/// 摘要生成器
pub struct SummaryGenerator {
    strategies: Vec<Box<dyn SummaryStrategy>>,
}

impl SummaryGenerator {
    /// 使用指定的策略链创建
    pub fn new(strategies: Vec<Box<dyn SummaryStrategy>>) -> Self {
        Self { strategies }
    }

    /// 不生成摘要
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    /// 根据配置创建：有 API Key 时使用 OpenAI 兼容服务，否则禁用
    pub fn from_config(config: &Config) -> Self {
        match OpenAiBackend::new(config) {
            Some(backend) => {
                info!("🤖 摘要服务已启用，模型: {}", config.llm_model_name);
                Self::with_backend(Arc::new(backend), config)
            }
            None => {
                info!("未配置 OPENAI_API_KEY，跳过摘要生成");
                Self::disabled()
            }
        }
    }

    /// 使用指定服务构建默认策略链：上传完整报告 → 测量表片段
    pub fn with_backend(backend: Arc<dyn SummaryBackend>, config: &Config) -> Self {
        let prompt = CompliancePrompt::from_config(config);
        let timeout = Duration::from_secs(config.llm_timeout_secs);
        let strategies: Vec<Box<dyn SummaryStrategy>> = vec![
            Box::new(DocumentUploadStrategy::new(
                backend.clone(),
                prompt.clone(),
                timeout,
            )),
            Box::new(TableSnippetStrategy::new(
                backend,
                prompt,
                config.snippet_rows,
                timeout,
            )),
        ];
        Self::new(strategies)
    }

    pub fn is_enabled(&self) -> bool {
        !self.strategies.is_empty()
    }

    /// 生成摘要
    ///
    /// # 返回
    /// 任一策略成功时返回摘要；未启用或全部失败时返回 None
    pub async fn generate(&self, input: &SummaryInput) -> Option<SummaryText> {
        match self.try_generate(input).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                if self.is_enabled() {
                    warn!("[夹具 {}] ⚠️ {}", input.code, e);
                } else {
                    debug!("[夹具 {}] {}", input.code, e);
                }
                None
            }
        }
    }

    /// 依次尝试每个策略，返回第一个非空结果
    pub async fn try_generate(&self, input: &SummaryInput) -> ReportResult<SummaryText> {
        if !self.is_enabled() {
            return Err(ReportError::SummarizationUnavailable {
                reason: "未配置摘要服务".to_string(),
            });
        }

        let mut failures = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            info!("[夹具 {}] 🤖 尝试摘要策略: {}", input.code, strategy.name());

            let outcome = match strategy.attempt(input).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(
                        "[夹具 {}] ✓ 摘要生成成功 ({}，{} 字符)",
                        input.code,
                        strategy.name(),
                        text.chars().count()
                    );
                    return Ok(SummaryText {
                        text: text.trim().to_string(),
                        strategy: strategy.name(),
                    });
                }
                Ok(_) => "返回内容为空".to_string(),
                Err(e) => format!("{:#}", e),
            };

            warn!(
                "[夹具 {}] 摘要策略 {} 失败: {}",
                input.code,
                strategy.name(),
                outcome
            );
            failures.push(format!("{}: {}", strategy.name(), outcome));
        }

        Err(ReportError::SummarizationUnavailable {
            reason: failures.join("; "),
        })
    }
}
