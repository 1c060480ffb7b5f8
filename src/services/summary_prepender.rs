//! 摘要前置服务 - 业务能力层
//!
//! 把摘要文本排成若干页，放在已合并报告的最前面。
//! 新文档先写临时文件，成功后才替换原报告；任何一步失败原报告都保持原样。

use crate::error::{ReportError, ReportResult};
use crate::infrastructure::pdf_canvas::{self, PdfBuilder, PAGE_HEIGHT};
use crate::infrastructure::{concat_documents, save_document_atomically};
use lopdf::Document;
use std::path::Path;
use tracing::{debug, info};

/// 每行最多字符数
pub const WRAP_WIDTH: usize = 90;
const MARGIN: f32 = 72.0;
const FONT_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 12.0;

/// 摘要前置器
#[derive(Debug, Default, Clone, Copy)]
pub struct SummaryPrepender;

impl SummaryPrepender {
    pub fn new() -> Self {
        Self
    }

    /// 把摘要页插到报告最前面
    ///
    /// # 参数
    /// - `report`: 已合并的报告，原地替换
    /// - `summary`: 摘要文本；为 None 时不做任何事
    ///
    /// # 返回
    /// 返回插入的摘要页数
    pub fn prepend(&self, report: &Path, summary: Option<&str>) -> ReportResult<usize> {
        match summary {
            Some(text) => self.prepend_with(report, text, save_document_atomically),
            None => {
                debug!("无摘要，保持报告不变: {}", report.display());
                Ok(0)
            }
        }
    }

    fn prepend_with<F>(&self, report: &Path, text: &str, save: F) -> ReportResult<usize>
    where
        F: FnOnce(&mut Document, &Path) -> ReportResult<()>,
    {
        let summary = render_summary(text)?;
        let summary_pages = summary.get_pages().len();

        let original = Document::load(report).map_err(|e| ReportError::report_write(report, e))?;
        let original_pages = original.get_pages().len();

        let mut combined = concat_documents(vec![summary, original])
            .map_err(|e| ReportError::report_write(report, e))?;

        save(&mut combined, report)?;

        info!(
            "📝 已插入摘要 {} 页 (原报告 {} 页): {}",
            summary_pages,
            original_pages,
            report.display()
        );
        Ok(summary_pages)
    }
}

/// 按段落折行
///
/// 按空白断词，单词超过行宽时强制截断；空段落保留为空行。
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed <= width {
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.extend(word.iter());
                current_len += word.len();
                continue;
            }

            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
            }
            while word.len() > width {
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            current_len = word.len();
            current = word.into_iter().collect();
        }

        if current_len > 0 || paragraph.trim().is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// 把摘要排成 PDF 页面
///
/// 从上边距开始逐行书写，剩余空间不足一行时换页；至少生成一页。
pub fn render_summary(text: &str) -> ReportResult<Document> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut builder = PdfBuilder::new();
    let mut ops = Vec::new();
    let mut y = top;
    let lines = wrap_text(text, WRAP_WIDTH);
    let line_count = lines.len();

    for line in lines {
        if y < MARGIN + LINE_HEIGHT {
            builder
                .add_page(std::mem::take(&mut ops), &[])
                .map_err(|e| ReportError::report_write("summary", e))?;
            y = top;
        }
        if !line.is_empty() {
            ops.extend(pdf_canvas::text(MARGIN, y, FONT_SIZE, &line));
        }
        y -= LINE_HEIGHT;
    }
    builder
        .add_page(ops, &[])
        .map_err(|e| ReportError::report_write("summary", e))?;
    debug!("摘要 {} 行，排版为 {} 页", line_count, builder.page_count());

    Ok(builder.finish())
}
