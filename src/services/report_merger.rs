//! 报告合并服务 - 业务能力层
//!
//! 只负责"按固定顺序把四个源文件合成一份报告"：
//! 夹具照片 → 光谱图 → 色温图 → 测量表，与文件名和输入顺序无关。

use crate::error::{ReportError, ReportResult};
use crate::infrastructure::{save_document_atomically, DocumentConcat};
use crate::models::{FixtureCode, Role, RoleAssignment};
use crate::services::page_assembler::PageAssembler;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 合并结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedReport {
    pub path: PathBuf,
    pub page_count: usize,
    /// 报告对应的测量表（供备用摘要策略读取）
    pub table: Option<PathBuf>,
}

/// 报告合并器
pub struct ReportMerger {
    assembler: PageAssembler,
    output_dir: PathBuf,
}

impl ReportMerger {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            assembler: PageAssembler::new(),
            output_dir: output_dir.into(),
        }
    }

    /// 报告输出路径：`<output_dir>/Merged_<code>.pdf`
    pub fn output_path(&self, code: &FixtureCode) -> PathBuf {
        self.output_dir.join(code.report_file_name())
    }

    /// 合并报告
    ///
    /// 每个角色的页面在追加前才生成，追加后即释放。
    /// 缺少任何必需角色或任一页面生成失败时，不写出任何文件。
    pub fn merge(
        &self,
        code: &FixtureCode,
        assignment: &RoleAssignment,
    ) -> ReportResult<MergedReport> {
        let output = self.output_path(code);
        let mut concat = DocumentConcat::new();

        for role in Role::REPORT_ORDER {
            let source = assignment.get(role).ok_or_else(|| ReportError::MissingRole {
                code: code.to_string(),
                role: role.to_string(),
            })?;
            let fragment = self.assembler.assemble(role, source)?;
            debug!(
                "[夹具 {}] 追加 {}: {}",
                code,
                fragment.role,
                display_name(&fragment.source)
            );
            concat.append(fragment.document);
        }

        let page_count = concat.page_count();
        let mut merged = concat
            .finish()
            .map_err(|e| ReportError::report_write(&output, e))?;
        save_document_atomically(&mut merged, &output)?;

        info!(
            "[夹具 {}] 📄 已生成 {} ({} 页)",
            code,
            display_name(&output),
            page_count
        );

        Ok(MergedReport {
            path: output,
            page_count,
            table: assignment
                .get(Role::MeasurementTable)
                .map(Path::to_path_buf),
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document;
    use std::fs;

    fn write_image(path: &Path, width: u32) {
        image::RgbImage::from_pixel(width, 20, image::Rgb([10, 20, 30]))
            .save(path)
            .unwrap();
    }

    /// 每页图片的宽度，表格页为 None
    fn page_image_widths(doc: &Document) -> Vec<Option<i64>> {
        doc.get_pages()
            .into_values()
            .map(|page_id| {
                let page = doc.get_dictionary(page_id).ok()?;
                let resources = match page.get(b"Resources").ok()? {
                    lopdf::Object::Reference(id) => doc.get_dictionary(*id).ok()?,
                    obj => obj.as_dict().ok()?,
                };
                let xobjects = resources.get(b"XObject").ok()?.as_dict().ok()?;
                let image_id = xobjects.get(b"Im1").ok()?.as_reference().ok()?;
                let stream = doc.get_object(image_id).ok()?.as_stream().ok()?;
                stream.dict.get(b"Width").ok()?.as_i64().ok()
            })
            .collect()
    }

    fn complete_assignment(dir: &Path) -> RoleAssignment {
        let mut assignment = RoleAssignment::default();
        // 插入顺序故意打乱
        let table = dir.join("SL_X_data.csv");
        fs::write(&table, "Item,Value\nCCT,3000\n").unwrap();
        assignment.insert(Role::MeasurementTable, table);
        for (role, name, width) in [
            (Role::ColorTemperatureImage, "SL_X_cct.jpg", 30),
            (Role::PrimaryImage, "SL_X_fixture.jpg", 10),
            (Role::SpectralImage, "SL_X_spd.jpg", 20),
        ] {
            let path = dir.join(name);
            write_image(&path, width);
            assignment.insert(role, path);
        }
        assignment
    }

    #[test]
    fn test_merge_fixed_page_order() {
        let dir = tempfile::tempdir().unwrap();
        let assignment = complete_assignment(dir.path());
        let merger = ReportMerger::new(dir.path());
        let code = FixtureCode::new("ABCDEFGHIJKLM");

        let report = merger.merge(&code, &assignment).unwrap();
        assert_eq!(report.page_count, 4);
        assert_eq!(report.path, dir.path().join("Merged_ABCDEFGHIJKLM.pdf"));
        assert_eq!(report.table, Some(dir.path().join("SL_X_data.csv")));

        let doc = Document::load(&report.path).unwrap();
        assert_eq!(
            page_image_widths(&doc),
            vec![Some(10), Some(20), Some(30), None]
        );
    }

    #[test]
    fn test_merge_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let assignment = complete_assignment(dir.path());
        let merger = ReportMerger::new(dir.path());
        let code = FixtureCode::new("ABCDEFGHIJKLM");

        let first = fs::read(merger.merge(&code, &assignment).unwrap().path).unwrap();
        let second = fs::read(merger.merge(&code, &assignment).unwrap().path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_role_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut assignment = RoleAssignment::default();
        let path = dir.path().join("SL_X_fixture.jpg");
        write_image(&path, 10);
        assignment.insert(Role::PrimaryImage, path);

        let merger = ReportMerger::new(dir.path());
        let code = FixtureCode::new("ABCDEFGHIJKLM");
        let err = merger.merge(&code, &assignment).unwrap_err();

        assert!(matches!(err, ReportError::MissingRole { .. }));
        assert!(!merger.output_path(&code).exists());
    }

    #[test]
    fn test_bad_table_keeps_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut assignment = complete_assignment(dir.path());
        let merger = ReportMerger::new(dir.path());
        let code = FixtureCode::new("ABCDEFGHIJKLM");
        let good = fs::read(merger.merge(&code, &assignment).unwrap().path).unwrap();

        let broken = dir.path().join("SL_X_broken.jpg");
        fs::write(&broken, b"garbage").unwrap();
        assignment = {
            let mut a = RoleAssignment::default();
            a.insert(Role::PrimaryImage, broken);
            for role in [Role::SpectralImage, Role::ColorTemperatureImage, Role::MeasurementTable] {
                a.insert(role, assignment.get(role).unwrap().to_path_buf());
            }
            a
        };

        let err = merger.merge(&code, &assignment).unwrap_err();
        assert!(matches!(err, ReportError::PageAssembly { .. }));
        assert_eq!(fs::read(merger.output_path(&code)).unwrap(), good);
    }
}
