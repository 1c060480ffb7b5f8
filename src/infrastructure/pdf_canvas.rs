//! PDF 页面构建器 - 基础设施层
//!
//! 持有一个正在构建的 `lopdf::Document`，只暴露"加一页"的能力。
//! 所有页面使用 US Letter 尺寸和内置 Helvetica 字体（WinAnsi 编码）。

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// US Letter 页面宽度（pt）
pub const PAGE_WIDTH: f32 = 612.0;
/// US Letter 页面高度（pt）
pub const PAGE_HEIGHT: f32 = 792.0;
/// 页面资源中的字体名
pub const FONT_NAME: &str = "F1";

/// PDF 构建器
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    resources_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { FONT_NAME => font_id },
        });

        Self {
            doc,
            pages_id,
            font_id,
            resources_id,
            page_ids: Vec::new(),
        }
    }

    /// 添加一张 JPEG 图片（DCTDecode，不再压缩）
    ///
    /// # 返回
    /// 返回图片对象 ID，供 `add_page` 引用
    pub fn add_jpeg_image(&mut self, width: u32, height: u32, jpeg: Vec<u8>) -> ObjectId {
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            jpeg,
        );
        stream.allows_compression = false;
        self.doc.add_object(stream)
    }

    /// 添加一页
    ///
    /// # 参数
    /// - `operations`: 页面内容操作序列
    /// - `images`: 页面引用的图片（资源名, 对象 ID）
    pub fn add_page(
        &mut self,
        operations: Vec<Operation>,
        images: &[(&str, ObjectId)],
    ) -> lopdf::Result<()> {
        let content = Content { operations };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));

        let resources: Object = if images.is_empty() {
            self.resources_id.into()
        } else {
            let mut xobjects = lopdf::Dictionary::new();
            for (name, id) in images {
                xobjects.set(name.as_bytes().to_vec(), *id);
            }
            dictionary! {
                "Font" => dictionary! { FONT_NAME => self.font_id },
                "XObject" => xobjects,
            }
            .into()
        };

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0_i64.into(), 0_i64.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// 完成构建，写入页面树和目录
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.page_ids.len() as i64,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 绘图操作 ==========

/// 在 (x, y) 处绘制一行文字（y 为基线）
pub fn text(x: f32, y: f32, size: f32, content: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![FONT_NAME.into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(content))]),
        Operation::new("ET", vec![]),
    ]
}

/// 设置填充色（RGB，0-1）
pub fn fill_color(r: f32, g: f32, b: f32) -> Operation {
    Operation::new("rg", vec![r.into(), g.into(), b.into()])
}

/// 设置描边色（RGB，0-1）
pub fn stroke_color(r: f32, g: f32, b: f32) -> Operation {
    Operation::new("RG", vec![r.into(), g.into(), b.into()])
}

pub fn line_width(width: f32) -> Operation {
    Operation::new("w", vec![width.into()])
}

/// 矩形路径（需后接 `f` 或 `S`）
pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Operation {
    Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()])
}

pub fn fill() -> Operation {
    Operation::new("f", vec![])
}

pub fn stroke() -> Operation {
    Operation::new("S", vec![])
}

/// 直线段
pub fn line(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<Operation> {
    vec![
        Operation::new("m", vec![x1.into(), y1.into()]),
        Operation::new("l", vec![x2.into(), y2.into()]),
        stroke(),
    ]
}

/// 以给定位置和尺寸绘制图片
pub fn draw_image(name: &str, x: f32, y: f32, width: f32, height: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![width.into(), 0_i64.into(), 0_i64.into(), height.into(), x.into(), y.into()],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

// ========== 文字度量 ==========

/// Helvetica 字宽（1/1000 em），覆盖 ASCII 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

fn char_width(c: char) -> u16 {
    match c as u32 {
        code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => 556,
    }
}

/// 估算文字宽度（pt）
pub fn text_width(content: &str, size: f32) -> f32 {
    content.chars().map(|c| char_width(c) as f32).sum::<f32>() * size / 1000.0
}

/// 截断文字使其不超过给定宽度
pub fn truncate_to_width(content: &str, max_width: f32, size: f32) -> String {
    let mut width = 0.0;
    let mut out = String::new();
    for c in content.chars() {
        width += char_width(c) as f32 * size / 1000.0;
        if width > max_width {
            break;
        }
        out.push(c);
    }
    out
}

/// 转为 WinAnsi 字节；Latin-1 以外的字符折叠为 ASCII 或 `?`
///
/// WinAnsi 的 0x80-0x9F 是 `€`、`‚` 等可见字符，不是 C1 控制符，
/// 所以 U+0080-U+009F 输出 `?`，`€` 输出 0x80。
pub fn encode_win_ansi(content: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => bytes.push(b'\''),
            '\u{201C}' | '\u{201D}' => bytes.push(b'"'),
            '\u{2013}' | '\u{2014}' => bytes.push(b'-'),
            '\u{2026}' => bytes.extend_from_slice(b"..."),
            '\u{20AC}' => bytes.push(0x80),
            '\t' => bytes.push(b' '),
            c if (c as u32) < 0x20 => {}
            '\u{80}'..='\u{9F}' => bytes.push(b'?'),
            c if (c as u32) <= 0xFF => bytes.push(c as u32 as u8),
            _ => bytes.push(b'?'),
        }
    }
    bytes
}
