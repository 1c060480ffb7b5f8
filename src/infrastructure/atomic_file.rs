//! 原子写文件
//!
//! 先写同目录下的临时文件，完整写入并落盘后再一次性 rename 覆盖目标。
//! 任何一步失败，临时文件随 `NamedTempFile` 析构被删除，目标文件保持原样。

use crate::error::{ReportError, ReportResult};
use lopdf::Document;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// 原子写入目标文件
///
/// # 参数
/// - `target`: 最终路径
/// - `write`: 向临时文件写入内容的闭包
pub fn write_atomically<F>(target: &Path, write: F) -> ReportResult<()>
where
    F: FnOnce(&mut File) -> anyhow::Result<()>,
{
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".fixture_report_")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ReportError::report_write(target, e))?;
    debug!("临时文件: {}", temp.path().display());

    write(temp.as_file_mut()).map_err(|e| ReportError::report_write(target, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| ReportError::report_write(target, e))?;
    temp.persist(target)
        .map_err(|e| ReportError::report_write(target, e.error))?;

    Ok(())
}

/// 原子保存 PDF 文档
pub fn save_document_atomically(doc: &mut Document, target: &Path) -> ReportResult<()> {
    write_atomically(target, |file| {
        let mut writer = BufWriter::new(file);
        doc.save_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    })
}
