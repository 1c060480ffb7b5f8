//! 文件分组服务 - 业务能力层
//!
//! 只负责"扫描目录并按夹具编号分组"，不判断文件组是否可处理。

use crate::config::Config;
use crate::error::{ReportError, ReportResult};
use crate::models::{FixtureCode, FixtureFile, FixtureGroup};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// 文件分组器
pub struct FileGrouper {
    pattern: Regex,
}

impl FileGrouper {
    /// 创建新的分组器
    ///
    /// # 参数
    /// - `marker`: 编号前的标记（如 `SL_`）
    /// - `code_len`: 编号长度（字符数）
    pub fn new(marker: &str, code_len: usize) -> ReportResult<Self> {
        let pattern = Regex::new(&format!("{}(.{{{}}})", regex::escape(marker), code_len))
            .map_err(|e| ReportError::Setup {
                reason: format!("无效的文件名标记 '{}': {}", marker, e),
            })?;
        Ok(Self { pattern })
    }

    pub fn from_config(config: &Config) -> ReportResult<Self> {
        Self::new(&config.fixture_marker, config.fixture_code_len)
    }

    /// 从文件名提取夹具编号
    ///
    /// # 返回
    /// 返回 (编号, 去掉标记和编号后的剩余部分)；无标记或编号长度不足时返回 None
    pub fn extract_code(&self, file_name: &str) -> Option<(FixtureCode, String)> {
        let caps = self.pattern.captures(file_name)?;
        let whole = caps.get(0)?;
        let code = caps.get(1)?.as_str();

        let mut descriptor = String::with_capacity(file_name.len());
        descriptor.push_str(&file_name[..whole.start()]);
        descriptor.push_str(&file_name[whole.end()..]);

        Some((FixtureCode::new(code), descriptor))
    }

    /// 按编号分组
    ///
    /// 文件名按字典序排列后再分组，组内保持该顺序。
    pub fn group<I, P>(&self, paths: I) -> BTreeMap<FixtureCode, FixtureGroup>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut files: Vec<(String, PathBuf)> = paths
            .into_iter()
            .map(Into::<PathBuf>::into)
            .filter_map(|p| {
                let name = p.file_name()?.to_str()?.to_string();
                Some((name, p))
            })
            .collect();
        files.sort();

        let mut groups: BTreeMap<FixtureCode, FixtureGroup> = BTreeMap::new();
        for (file_name, path) in files {
            let Some((code, descriptor)) = self.extract_code(&file_name) else {
                debug!("跳过非夹具文件: {}", file_name);
                continue;
            };
            groups
                .entry(code.clone())
                .or_insert_with(|| FixtureGroup::new(code))
                .files
                .push(FixtureFile {
                    path,
                    file_name,
                    descriptor,
                });
        }
        groups
    }

    /// 扫描目录并分组
    ///
    /// 目录不存在或无法读取时返回 `Setup` 错误（中止整个运行）。
    pub async fn scan(&self, dir: &Path) -> ReportResult<BTreeMap<FixtureCode, FixtureGroup>> {
        if !dir.is_dir() {
            return Err(ReportError::Setup {
                reason: format!("目录不存在: {}", dir.display()),
            });
        }

        let mut entries = fs::read_dir(dir).await.map_err(|e| ReportError::Setup {
            reason: format!("无法读取目录 {}: {}", dir.display(), e),
        })?;

        let mut paths = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(ReportError::Setup {
                        reason: format!("读取目录 {} 失败: {}", dir.display(), e),
                    })
                }
            };
            match entry.file_type().await {
                Ok(t) if t.is_file() => paths.push(entry.path()),
                _ => debug!("忽略非普通文件: {}", entry.path().display()),
            }
        }

        Ok(self.group(paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouper() -> FileGrouper {
        FileGrouper::new("SL_", 13).unwrap()
    }

    #[test]
    fn test_extract_code() {
        let (code, descriptor) = grouper()
            .extract_code("SL_ABCDEFGHIJKLM_fixture.jpg")
            .unwrap();
        assert_eq!(code.as_str(), "ABCDEFGHIJKLM");
        assert_eq!(descriptor, "_fixture.jpg");
    }

    #[test]
    fn test_extract_code_with_prefix() {
        let (code, descriptor) = grouper()
            .extract_code("2024-05-01 SL_0000000000001_cct.JPG")
            .unwrap();
        assert_eq!(code.as_str(), "0000000000001");
        assert_eq!(descriptor, "2024-05-01 _cct.JPG");
    }

    #[test]
    fn test_extract_code_rejects_short_and_unmarked() {
        assert!(grouper().extract_code("SL_SHORT.csv").is_none());
        assert!(grouper().extract_code("notes.txt").is_none());
        assert!(grouper().extract_code("Merged_ABCDEFGHIJKLM.pdf").is_none());
    }

    #[test]
    fn test_marker_is_literal() {
        let g = FileGrouper::new("S.L", 3).unwrap();
        assert!(g.extract_code("SXL123.csv").is_none());
        assert_eq!(g.extract_code("S.L123.csv").unwrap().0.as_str(), "123");
    }

    #[test]
    fn test_group_buckets_and_sorts() {
        let groups = grouper().group(vec![
            "dir/SL_BBBBBBBBBBBBB_spd.jpg",
            "dir/SL_AAAAAAAAAAAAA_fixture.jpg",
            "dir/SL_BBBBBBBBBBBBB_data.csv",
            "dir/readme.md",
            "dir/SL_AAAAAAAAAAAAA_cct.jpg",
        ]);

        assert_eq!(groups.len(), 2);
        let codes: Vec<&str> = groups.keys().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["AAAAAAAAAAAAA", "BBBBBBBBBBBBB"]);

        let a = &groups[&FixtureCode::new("AAAAAAAAAAAAA")];
        assert_eq!(
            a.file_names(),
            vec!["SL_AAAAAAAAAAAAA_cct.jpg", "SL_AAAAAAAAAAAAA_fixture.jpg"]
        );
    }

    #[tokio::test]
    async fn test_scan_missing_directory() {
        let result = grouper().scan(Path::new("/definitely/not/here")).await;
        assert!(matches!(result, Err(ReportError::Setup { .. })));
    }

    #[tokio::test]
    async fn test_scan_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("SL_ABCDEFGHIJKLM_dir")).unwrap();
        std::fs::write(dir.path().join("SL_ABCDEFGHIJKLM_data.csv"), "a,b\n").unwrap();

        let groups = grouper().scan(dir.path()).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&FixtureCode::new("ABCDEFGHIJKLM")].len(), 1);
    }
}
