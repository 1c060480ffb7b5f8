//! PDF 拼接
//!
//! 把若干文档的全部页面按顺序拼成一个新文档。

use lopdf::{dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

/// 增量拼接器
///
/// 每追加一个文档，先把它的对象重新编号以避免冲突，丢弃其目录/页面树，
/// 其余对象原样保留；`finish` 时用新页面树按追加顺序挂上所有页面。
pub struct DocumentConcat {
    next_id: u32,
    page_ids: Vec<ObjectId>,
    objects: BTreeMap<ObjectId, Object>,
}

impl DocumentConcat {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            page_ids: Vec::new(),
            objects: BTreeMap::new(),
        }
    }

    /// 追加一个文档的全部页面（按页码顺序），文档随即被消耗
    pub fn append(&mut self, mut doc: Document) {
        doc.renumber_objects_with(self.next_id);
        self.next_id = doc.max_id + 1;
        self.page_ids.extend(doc.get_pages().into_values());

        for (id, object) in doc.objects {
            match object.type_name().unwrap_or("") {
                "Catalog" | "Pages" | "Outlines" | "Outline" => {}
                _ => {
                    self.objects.insert(id, object);
                }
            }
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn finish(self) -> lopdf::Result<Document> {
        let mut merged = Document::with_version("1.5");
        let pages_id = (self.next_id, 0);
        let catalog_id = (self.next_id + 1, 0);

        for (id, object) in self.objects {
            if object.type_name().ok() == Some("Page") {
                let mut dict = object.as_dict()?.clone();
                dict.set("Parent", pages_id);
                merged.objects.insert(id, Object::Dictionary(dict));
            } else {
                merged.objects.insert(id, object);
            }
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        merged.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.page_ids.len() as i64,
            }),
        );
        merged.objects.insert(
            catalog_id,
            Object::Dictionary(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            }),
        );
        merged.trailer.set("Root", catalog_id);
        merged.max_id = catalog_id.0;

        Ok(merged)
    }
}

impl Default for DocumentConcat {
    fn default() -> Self {
        Self::new()
    }
}

/// 按顺序拼接文档
pub fn concat_documents(documents: Vec<Document>) -> lopdf::Result<Document> {
    let mut concat = DocumentConcat::new();
    for doc in documents {
        concat.append(doc);
    }
    concat.finish()
}
