//! 基础设施层
//!
//! 持有 PDF 文档和临时文件这类资源，只暴露能力，不含业务判断。

pub mod atomic_file;
pub mod pdf_canvas;
pub mod pdf_merge;

pub use atomic_file::{save_document_atomically, write_atomically};
pub use pdf_canvas::PdfBuilder;
pub use pdf_merge::{concat_documents, DocumentConcat};
