//! 页面生成服务 - 业务能力层
//!
//! 只负责"把一个源文件变成一页 PDF"：图片页或表格页。
//! 不关心页面顺序，也不写磁盘。

use crate::error::{ReportError, ReportResult};
use crate::infrastructure::pdf_canvas::{
    self, PdfBuilder, PAGE_HEIGHT, PAGE_WIDTH,
};
use crate::models::Role;
use image::codecs::jpeg::JpegEncoder;
use lopdf::content::Operation;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 图片页边距（pt）
const IMAGE_MARGIN: f32 = 36.0;
/// 嵌入图片的 JPEG 质量
const JPEG_QUALITY: u8 = 90;

/// 表格页边距（pt）
const TABLE_MARGIN: f32 = 72.0;
/// 第一列固定宽度，足够显示最长的测量项名称
const FIRST_COLUMN_WIDTH: f32 = 200.0;
const TABLE_FONT_SIZE: f32 = 8.0;
const ROW_HEIGHT: f32 = 12.0;
const CELL_PADDING: f32 = 3.0;

/// 单页片段
///
/// 由 `PageAssembler` 生成，合并后即被丢弃。
#[derive(Debug)]
pub struct PageFragment {
    pub role: Role,
    pub source: PathBuf,
    pub document: Document,
}

/// 页面生成器
#[derive(Debug, Default, Clone, Copy)]
pub struct PageAssembler;

impl PageAssembler {
    pub fn new() -> Self {
        Self
    }

    /// 按角色生成单页片段
    ///
    /// # 返回
    /// 源文件无法解码/解析时返回 `PageAssembly` 错误
    pub fn assemble(&self, role: Role, path: &Path) -> ReportResult<PageFragment> {
        debug!("生成页面: {} <- {}", role, path.display());
        let document = if role.is_image() {
            self.image_page(path)?
        } else {
            self.table_page(path)?
        };
        Ok(PageFragment {
            role,
            source: path.to_path_buf(),
            document,
        })
    }

    /// 图片页：统一转为 RGB，按原始像素嵌入，缩放到页面内居中
    pub fn image_page(&self, path: &Path) -> ReportResult<Document> {
        let img = image::open(path).map_err(|e| ReportError::page_assembly(path, e))?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
            .encode_image(&rgb)
            .map_err(|e| ReportError::page_assembly(path, e))?;

        let (x, y, draw_w, draw_h) = fit_image(width, height);

        let mut builder = PdfBuilder::new();
        let image_id = builder.add_jpeg_image(width, height, jpeg);
        builder
            .add_page(
                pdf_canvas::draw_image("Im1", x, y, draw_w, draw_h),
                &[("Im1", image_id)],
            )
            .map_err(|e| ReportError::page_assembly(path, e))?;

        Ok(builder.finish())
    }

    /// 表格页：首行为表头，网格绘制，只输出一页
    pub fn table_page(&self, path: &Path) -> ReportResult<Document> {
        let table = read_table(path)?;
        let layout = TableLayout::new(&table);

        if layout.omitted_rows > 0 {
            debug!(
                "{} 有 {} 行超出单页，未显示",
                path.display(),
                layout.omitted_rows
            );
        }

        let mut builder = PdfBuilder::new();
        builder
            .add_page(layout.render(&table), &[])
            .map_err(|e| ReportError::page_assembly(path, e))?;
        Ok(builder.finish())
    }
}

/// 计算图片位置和显示尺寸 (x, y, w, h)，不放大
fn fit_image(width: u32, height: u32) -> (f32, f32, f32, f32) {
    let avail_w = PAGE_WIDTH - 2.0 * IMAGE_MARGIN;
    let avail_h = PAGE_HEIGHT - 2.0 * IMAGE_MARGIN;
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let scale = (avail_w / w).min(avail_h / h).min(1.0);
    let (draw_w, draw_h) = (w * scale, h * scale);
    (
        (PAGE_WIDTH - draw_w) / 2.0,
        (PAGE_HEIGHT - draw_h) / 2.0,
        draw_w,
        draw_h,
    )
}

/// 解析后的表格（保持源顺序）
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// 列数取表头和所有行中的最大值
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }
}

/// 读取 CSV（首行为表头，允许行长度不一，非 UTF-8 字节按有损方式转换）
pub fn read_table(path: &Path) -> ReportResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ReportError::page_assembly(path, e))?;

    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(|e| ReportError::page_assembly(path, e))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ReportError::page_assembly(path, "表格为空或缺少表头"));
    }

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|e| ReportError::page_assembly(path, e))?;
        rows.push(
            record
                .iter()
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect(),
        );
    }

    Ok(Table { headers, rows })
}

/// 表格排版结果
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub column_widths: Vec<f32>,
    pub left: f32,
    pub visible_rows: usize,
    pub omitted_rows: usize,
}

impl TableLayout {
    pub fn new(table: &Table) -> Self {
        let column_widths = column_widths(table);
        let total: f32 = column_widths.iter().sum();
        let left = ((PAGE_WIDTH - total) / 2.0).max(TABLE_MARGIN);

        // 表头占一行
        let capacity = ((PAGE_HEIGHT - 2.0 * TABLE_MARGIN) / ROW_HEIGHT).floor() as usize;
        let visible_rows = table.rows.len().min(capacity.saturating_sub(1));

        Self {
            column_widths,
            left,
            visible_rows,
            omitted_rows: table.rows.len() - visible_rows,
        }
    }

    fn render(&self, table: &Table) -> Vec<Operation> {
        let top = PAGE_HEIGHT - TABLE_MARGIN;
        let total_width: f32 = self.column_widths.iter().sum();
        let row_count = self.visible_rows + 1;
        let bottom = top - row_count as f32 * ROW_HEIGHT;

        let mut ops = Vec::new();

        // 表头底色
        ops.push(pdf_canvas::fill_color(0.5, 0.5, 0.5));
        ops.push(pdf_canvas::rect(self.left, top - ROW_HEIGHT, total_width, ROW_HEIGHT));
        ops.push(pdf_canvas::fill());

        // 表头文字
        ops.push(pdf_canvas::fill_color(0.96, 0.96, 0.96));
        self.push_row(&mut ops, &table.headers, top);

        // 数据行
        ops.push(pdf_canvas::fill_color(0.0, 0.0, 0.0));
        for (i, row) in table.rows.iter().take(self.visible_rows).enumerate() {
            self.push_row(&mut ops, row, top - (i + 1) as f32 * ROW_HEIGHT);
        }

        // 网格
        ops.push(pdf_canvas::stroke_color(0.0, 0.0, 0.0));
        ops.push(pdf_canvas::line_width(1.0));
        for i in 0..=row_count {
            let y = top - i as f32 * ROW_HEIGHT;
            ops.extend(pdf_canvas::line(self.left, y, self.left + total_width, y));
        }
        let mut x = self.left;
        ops.extend(pdf_canvas::line(x, top, x, bottom));
        for width in &self.column_widths {
            x += width;
            ops.extend(pdf_canvas::line(x, top, x, bottom));
        }

        ops
    }

    fn push_row(&self, ops: &mut Vec<Operation>, cells: &[String], row_top: f32) {
        let baseline = row_top - ROW_HEIGHT + CELL_PADDING + 0.5;
        let mut x = self.left;
        for (i, width) in self.column_widths.iter().enumerate() {
            if let Some(cell) = cells.get(i).filter(|c| !c.is_empty()) {
                let shown =
                    pdf_canvas::truncate_to_width(cell, width - 2.0 * CELL_PADDING, TABLE_FONT_SIZE);
                ops.extend(pdf_canvas::text(x + CELL_PADDING, baseline, TABLE_FONT_SIZE, &shown));
            }
            x += width;
        }
    }
}

/// 计算列宽：第一列固定，其余列按最宽单元格，超出版心时按比例收缩
pub fn column_widths(table: &Table) -> Vec<f32> {
    let columns = table.column_count();
    if columns == 0 {
        return Vec::new();
    }

    let mut widths = vec![FIRST_COLUMN_WIDTH];
    for col in 1..columns {
        let widest = std::iter::once(&table.headers)
            .chain(table.rows.iter())
            .filter_map(|row| row.get(col))
            .map(|cell| pdf_canvas::text_width(cell, TABLE_FONT_SIZE))
            .fold(0.0_f32, f32::max);
        widths.push(widest + 2.0 * CELL_PADDING);
    }

    let frame = PAGE_WIDTH - 2.0 * TABLE_MARGIN;
    let rest: f32 = widths[1..].iter().sum();
    let available = frame - FIRST_COLUMN_WIDTH;
    if rest > available && rest > 0.0 {
        let factor = available / rest;
        for width in widths[1..].iter_mut() {
            *width *= factor;
        }
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_first_column_fixed_width() {
        let t = table(&["Item", "Value"], &[&["Illuminance", "123.4"]]);
        let widths = column_widths(&t);
        assert_eq!(widths.len(), 2);
        assert_eq!(widths[0], FIRST_COLUMN_WIDTH);
        assert!(widths[1] > 2.0 * CELL_PADDING);
    }

    #[test]
    fn test_wide_table_shrinks_to_frame() {
        let long = "x".repeat(200);
        let t = table(&["a", "b", "c"], &[&["1", &long, &long]]);
        let widths = column_widths(&t);
        let total: f32 = widths.iter().sum();
        assert!(total <= PAGE_WIDTH - 2.0 * TABLE_MARGIN + 0.01);
        assert_eq!(widths[0], FIRST_COLUMN_WIDTH);
    }

    #[test]
    fn test_layout_cuts_rows_at_page_bottom() {
        let rows: Vec<Vec<String>> = (0..500).map(|i| vec![format!("{}nm", i), "0.1".into()]).collect();
        let t = Table {
            headers: vec!["Wavelength".into(), "Value".into()],
            rows,
        };
        let layout = TableLayout::new(&t);
        assert_eq!(layout.visible_rows + layout.omitted_rows, 500);
        assert!(layout.visible_rows > 0);
        assert!(layout.omitted_rows > 0);
    }

    #[test]
    fn test_read_table_flexible_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SL_X_data.csv");
        fs::write(&path, "Item,Value\nCCT,3000\n% BLUE,1.2345,extra\nLux\n").unwrap();

        let t = read_table(&path).unwrap();
        assert_eq!(t.headers, vec!["Item", "Value"]);
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[1], vec!["% BLUE", "1.2345", "extra"]);
        assert_eq!(t.column_count(), 3);
    }

    #[test]
    fn test_table_page_single_page_with_header_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SL_X_data.csv");
        fs::write(&path, "Measurement,Result\nCCT,2700\n").unwrap();

        let fragment = PageAssembler::new()
            .assemble(Role::MeasurementTable, &path)
            .unwrap();
        assert_eq!(fragment.role, Role::MeasurementTable);
        assert_eq!(fragment.source, path);
        let pages = fragment.document.get_pages();
        assert_eq!(pages.len(), 1);

        let page_id = *pages.values().next().unwrap();
        let content = fragment.document.get_page_content(page_id).unwrap();
        let content = String::from_utf8_lossy(&content);
        assert!(content.contains("(Measurement)"));
        assert!(content.contains("(2700)"));
    }

    #[test]
    fn test_empty_table_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        let err = PageAssembler::new().table_page(&path).unwrap_err();
        assert!(matches!(err, ReportError::PageAssembly { .. }));
    }

    #[test]
    fn test_image_page_embeds_full_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SL_X_fixture.jpg");
        write_jpeg(&path, 1200, 300);

        let doc = PageAssembler::new().image_page(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let image = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .find(|s| s.dict.get(b"Subtype").and_then(|v| v.as_name()).ok() == Some(b"Image".as_slice()))
            .unwrap();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 1200);
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 300);
    }

    #[test]
    fn test_fit_image_never_upscales() {
        let (x, y, w, h) = fit_image(100, 50);
        assert_eq!((w, h), (100.0, 50.0));
        assert_eq!(x, (PAGE_WIDTH - 100.0) / 2.0);
        assert_eq!(y, (PAGE_HEIGHT - 50.0) / 2.0);

        let (_, _, w, h) = fit_image(4000, 3000);
        assert!(w <= PAGE_WIDTH - 2.0 * IMAGE_MARGIN + 0.01);
        assert!((w / h - 4.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn test_corrupt_image_is_page_assembly_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SL_X_spd.jpg");
        fs::write(&path, b"not really a jpeg").unwrap();

        let err = PageAssembler::new()
            .assemble(Role::SpectralImage, &path)
            .unwrap_err();
        assert!(matches!(err, ReportError::PageAssembly { .. }));
        assert!(err.to_string().contains("SL_X_spd.jpg"));
    }
}
