use serde::Deserialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// 文件在夹具组中的角色
///
/// 枚举顺序即报告中的页面顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 夹具照片
    PrimaryImage,
    /// 光谱分布图（SPD）
    SpectralImage,
    /// 色温图（CCT）
    ColorTemperatureImage,
    /// 测量数据表（CSV）
    MeasurementTable,
}

impl Role {
    /// 报告中的固定页面顺序
    pub const REPORT_ORDER: [Role; 4] = [
        Role::PrimaryImage,
        Role::SpectralImage,
        Role::ColorTemperatureImage,
        Role::MeasurementTable,
    ];

    /// 配置文件中使用的键名
    pub fn key(self) -> &'static str {
        match self {
            Role::PrimaryImage => "primary_image",
            Role::SpectralImage => "spectral_image",
            Role::ColorTemperatureImage => "color_temperature_image",
            Role::MeasurementTable => "measurement_table",
        }
    }

    /// 获取显示名称
    pub fn name(self) -> &'static str {
        match self {
            Role::PrimaryImage => "夹具照片",
            Role::SpectralImage => "光谱图",
            Role::ColorTemperatureImage => "色温图",
            Role::MeasurementTable => "测量表",
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, Role::MeasurementTable)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.key())
    }
}

/// 角色声明规则
///
/// 扩展名与关键字都不区分大小写；关键字为空表示只按扩展名匹配。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleRule {
    pub role: Role,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

impl RoleRule {
    pub fn new(role: Role, keywords: &[&str], extensions: &[&str]) -> Self {
        Self {
            role,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 默认声明表（顺序即匹配优先级）
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(Role::MeasurementTable, &[], &["csv"]),
            Self::new(Role::PrimaryImage, &["fixture"], &IMAGE_EXTENSIONS),
            Self::new(Role::SpectralImage, &["spd", "spectral"], &IMAGE_EXTENSIONS),
            Self::new(Role::ColorTemperatureImage, &["cct"], &IMAGE_EXTENSIONS),
        ]
    }

    /// 判断文件是否符合本规则
    ///
    /// # 参数
    /// - `descriptor`: 去掉标记和夹具编号后的文件名部分
    /// - `path`: 文件路径（用于取扩展名）
    pub fn matches(&self, descriptor: &str, path: &Path) -> bool {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let ext_ok = self.extensions.is_empty()
            || self
                .extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(extension));
        if !ext_ok {
            return false;
        }

        let lowered = descriptor.to_lowercase();
        self.keywords.is_empty()
            || self
                .keywords
                .iter()
                .any(|k| lowered.contains(&k.to_lowercase()))
    }
}

/// 角色到文件的映射，每个角色至多一个文件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAssignment {
    slots: BTreeMap<Role, PathBuf>,
    /// 未匹配任何角色，或因先到先得落选的文件
    unassigned: Vec<PathBuf>,
}

impl RoleAssignment {
    /// 按给定顺序分配文件
    ///
    /// 每个文件取第一个匹配的规则；同一角色出现多个文件时，先出现的获胜。
    pub fn assign<'a, I>(rules: &[RoleRule], files: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Path)>,
    {
        let mut assignment = Self::default();
        for (descriptor, path) in files {
            let claimed = match rules.iter().find(|r| r.matches(descriptor, path)) {
                Some(rule) => assignment.insert(rule.role, path),
                None => false,
            };
            if !claimed {
                assignment.unassigned.push(path.to_path_buf());
            }
        }
        assignment
    }

    pub fn get(&self, role: Role) -> Option<&Path> {
        self.slots.get(&role).map(PathBuf::as_path)
    }

    /// 占用角色槽位；槽位已被占用时不覆盖，返回 false
    pub fn insert(&mut self, role: Role, path: impl Into<PathBuf>) -> bool {
        match self.slots.entry(role) {
            Entry::Vacant(slot) => {
                slot.insert(path.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// 缺失的角色（按报告顺序）
    pub fn missing(&self) -> Vec<Role> {
        Role::REPORT_ORDER
            .iter()
            .copied()
            .filter(|r| !self.slots.contains_key(r))
            .collect()
    }

    pub fn unassigned(&self) -> &[PathBuf] {
        &self.unassigned
    }

    /// 按报告顺序遍历已分配的文件
    pub fn in_report_order(&self) -> impl Iterator<Item = (Role, &Path)> + '_ {
        Role::REPORT_ORDER
            .iter()
            .filter_map(move |r| self.get(*r).map(|p| (*r, p)))
    }
}
