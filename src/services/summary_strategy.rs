//! 摘要策略 - 业务能力层
//!
//! 每个策略只做一次尝试：成功返回文本，失败返回错误，不做重试和兜底。
//! 尝试顺序由 `SummaryGenerator` 决定。
//! 每次远程调用都受 `timeout` 限制；超时只取消该调用，已上传的文档照常清理。

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::FixtureCode;
use crate::services::summary_backend::{CompletionRequest, SummaryBackend};

/// 摘要输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryInput {
    pub code: FixtureCode,
    /// 已合并的报告
    pub report: PathBuf,
    /// 测量表（备用策略使用）
    pub table: Option<PathBuf>,
}

/// 合规评估提示词
#[derive(Debug, Clone, PartialEq)]
pub struct CompliancePrompt {
    pub jurisdiction: String,
    pub blue_ratio_threshold: f64,
    pub max_tokens: u32,
}

impl CompliancePrompt {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jurisdiction: config.jurisdiction.clone(),
            blue_ratio_threshold: config.blue_ratio_threshold,
            max_tokens: config.llm_max_tokens,
        }
    }

    /// 固定的角色与评估要求
    pub fn system_message(&self) -> String {
        format!(
            "You are a lighting compliance expert for {}. Provide a concise one-page summary \
             evaluating shielding, downward direction, and the spectral ratio 400-500nm to \
             400-700nm (threshold {}).",
            self.jurisdiction, self.blue_ratio_threshold
        )
    }

    /// 评估问题
    pub fn question(&self) -> String {
        format!(
            "Analyze the attached measurement report and state whether the fixture meets the \
             {} outdoor lighting ordinance. Provide a short compliance recommendation and the \
             key supporting numbers.",
            self.jurisdiction
        )
    }

    fn request(&self, user_message: String) -> CompletionRequest {
        CompletionRequest {
            system_message: self.system_message(),
            user_message,
            attachment: None,
            max_tokens: self.max_tokens,
        }
    }
}

/// 摘要策略
#[async_trait]
pub trait SummaryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, input: &SummaryInput) -> Result<String>;
}

/// 给一次远程调用加上时限
async fn within<T>(
    timeout: Duration,
    action: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| anyhow::anyhow!("{}超时 ({:?})", action, timeout))?
}

/// 主策略：上传完整报告，请求中直接引用该文档
pub struct DocumentUploadStrategy {
    backend: Arc<dyn SummaryBackend>,
    prompt: CompliancePrompt,
    timeout: Duration,
}

impl DocumentUploadStrategy {
    pub fn new(
        backend: Arc<dyn SummaryBackend>,
        prompt: CompliancePrompt,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            prompt,
            timeout,
        }
    }
}

#[async_trait]
impl SummaryStrategy for DocumentUploadStrategy {
    fn name(&self) -> &'static str {
        "上传完整报告"
    }

    async fn attempt(&self, input: &SummaryInput) -> Result<String> {
        let document = within(
            self.timeout,
            "上传报告",
            self.backend.upload_document(&input.report),
        )
        .await?;

        let mut request = self.prompt.request(format!(
            "Attached file id: {}. {}",
            document.id,
            self.prompt.question()
        ));
        request.attachment = Some(document.clone());

        let result = within(self.timeout, "生成摘要", self.backend.complete(&request)).await;

        // 无论成败（包括超时）都清理服务端文件，失败只记录
        let discarded = within(
            self.timeout,
            "清理已上传文档",
            self.backend.discard_document(&document),
        )
        .await;
        if let Err(e) = discarded {
            warn!("[夹具 {}] 清理已上传文档失败: {}", input.code, e);
        }

        result
    }
}

/// 备用策略：把测量表前若干行作为文本片段直接发送
pub struct TableSnippetStrategy {
    backend: Arc<dyn SummaryBackend>,
    prompt: CompliancePrompt,
    rows: usize,
    timeout: Duration,
}

impl TableSnippetStrategy {
    pub fn new(
        backend: Arc<dyn SummaryBackend>,
        prompt: CompliancePrompt,
        rows: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            prompt,
            rows,
            timeout,
        }
    }
}

#[async_trait]
impl SummaryStrategy for TableSnippetStrategy {
    fn name(&self) -> &'static str {
        "测量表片段"
    }

    async fn attempt(&self, input: &SummaryInput) -> Result<String> {
        let table = input
            .table
            .as_deref()
            .context("没有可用的测量表")?;
        let snippet = read_snippet(table, self.rows)?;
        debug!(
            "[夹具 {}] 表格片段 {} 字节",
            input.code,
            snippet.len()
        );

        let request = self.prompt.request(format!(
            "{}\n\nCSV_SNIPPET:\n{}",
            self.prompt.question(),
            snippet
        ));
        within(self.timeout, "生成摘要", self.backend.complete(&request)).await
    }
}

/// 读取表格前 `rows` 行（不区分表头），原样输出为 CSV 文本
pub fn read_snippet(path: &Path, rows: usize) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("无法读取测量表: {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut count = 0;
    for record in reader.byte_records().take(rows) {
        let record = record.with_context(|| format!("测量表解析失败: {}", path.display()))?;
        writer.write_byte_record(&record)?;
        count += 1;
    }
    if count == 0 {
        anyhow::bail!("测量表为空: {}", path.display());
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("写入表格片段失败: {}", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::summary_backend::UploadedDocument;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// 记录调用的假服务
    #[derive(Default)]
    struct RecordingBackend {
        fail_upload: bool,
        /// 生成回复前的等待时间
        reply_delay: Duration,
        uploads: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
        discarded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SummaryBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        async fn upload_document(&self, path: &Path) -> Result<UploadedDocument> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            if self.fail_upload {
                anyhow::bail!("upload rejected");
            }
            Ok(UploadedDocument {
                id: "file-123".to_string(),
                file_name: path.display().to_string(),
            })
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            if !self.reply_delay.is_zero() {
                tokio::time::sleep(self.reply_delay).await;
            }
            Ok("Compliant.".to_string())
        }

        async fn discard_document(&self, document: &UploadedDocument) -> Result<()> {
            self.discarded.lock().unwrap().push(document.id.clone());
            Ok(())
        }
    }

    fn prompt() -> CompliancePrompt {
        CompliancePrompt::from_config(&Config::default())
    }

    fn input(table: Option<PathBuf>) -> SummaryInput {
        SummaryInput {
            code: FixtureCode::new("ABCDEFGHIJKLM"),
            report: PathBuf::from("Merged_ABCDEFGHIJKLM.pdf"),
            table,
        }
    }

    #[test]
    fn test_prompt_mentions_threshold_and_checks() {
        let system = prompt().system_message();
        assert!(system.contains("Maui County"));
        assert!(system.contains("0.02"));
        assert!(system.contains("shielding"));
        assert!(system.contains("400-500nm"));
    }

    #[test]
    fn test_read_snippet_limits_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut content = String::from("Item,Value\n");
        for i in 0..100 {
            content.push_str(&format!("{}nm,{}\n", 380 + i, i));
        }
        fs::write(&path, content).unwrap();

        let snippet = read_snippet(&path, 60).unwrap();
        let lines: Vec<&str> = snippet.lines().collect();
        assert_eq!(lines.len(), 60);
        assert_eq!(lines[0], "Item,Value");
        assert_eq!(lines[59], "438nm,58");
    }

    #[test]
    fn test_read_snippet_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(read_snippet(&path, 60).is_err());
    }

    #[tokio::test]
    async fn test_upload_strategy_references_document_and_cleans_up() {
        let backend = Arc::new(RecordingBackend::default());
        let strategy = DocumentUploadStrategy::new(backend.clone(), prompt(), TIMEOUT);

        let text = strategy.attempt(&input(None)).await.unwrap();
        assert_eq!(text, "Compliant.");

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].attachment.as_ref().unwrap().id, "file-123");
        assert!(requests[0].user_message.contains("file-123"));
        assert_eq!(requests[0].max_tokens, 800);
        assert_eq!(*backend.discarded.lock().unwrap(), vec!["file-123".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_failure_sends_nothing() {
        let backend = Arc::new(RecordingBackend {
            fail_upload: true,
            ..Default::default()
        });
        let strategy = DocumentUploadStrategy::new(backend.clone(), prompt(), TIMEOUT);

        assert!(strategy.attempt(&input(None)).await.is_err());
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snippet_strategy_inlines_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "Item,Value\n% BLUE,1.2345\n").unwrap();

        let backend = Arc::new(RecordingBackend::default());
        let strategy = TableSnippetStrategy::new(backend.clone(), prompt(), 60, TIMEOUT);
        strategy.attempt(&input(Some(path))).await.unwrap();

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].attachment.is_none());
        assert!(requests[0].user_message.contains("CSV_SNIPPET:\nItem,Value\n% BLUE,1.2345"));
    }

    #[tokio::test]
    async fn test_snippet_strategy_without_table_fails_before_request() {
        let backend = Arc::new(RecordingBackend::default());
        let strategy = TableSnippetStrategy::new(backend.clone(), prompt(), 60, TIMEOUT);

        assert!(strategy.attempt(&input(None)).await.is_err());
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_reply_still_discards_upload() {
        let backend = Arc::new(RecordingBackend {
            reply_delay: Duration::from_secs(5),
            ..Default::default()
        });
        let strategy =
            DocumentUploadStrategy::new(backend.clone(), prompt(), Duration::from_millis(50));

        let err = strategy.attempt(&input(None)).await.unwrap_err();
        assert!(err.to_string().contains("超时"));
        assert_eq!(backend.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(*backend.discarded.lock().unwrap(), vec!["file-123".to_string()]);
    }

    #[tokio::test]
    async fn test_slow_snippet_reply_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "Item,Value\n").unwrap();

        let backend = Arc::new(RecordingBackend {
            reply_delay: Duration::from_secs(5),
            ..Default::default()
        });
        let strategy =
            TableSnippetStrategy::new(backend.clone(), prompt(), 60, Duration::from_millis(50));

        let err = strategy.attempt(&input(Some(path))).await.unwrap_err();
        assert!(err.to_string().contains("超时"));
        assert_eq!(backend.requests.lock().unwrap().len(), 1);
    }
}
