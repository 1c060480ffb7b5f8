//! 程序配置
//!
//! 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量

use crate::error::{ReportError, ReportResult};
use crate::models::role::RoleRule;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 默认配置文件名（位于当前工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "fixture_report.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 待扫描的测量文件目录
    pub input_dir: String,
    /// 报告输出目录（为空时与输入目录相同）
    pub output_dir: Option<String>,
    /// 文件名中夹具编号前的标记
    pub fixture_marker: String,
    /// 夹具编号长度（字符数）
    pub fixture_code_len: usize,
    /// 每个夹具应有的文件数量
    pub expected_group_size: usize,
    /// 角色声明表，按声明顺序匹配
    pub roles: Vec<RoleRule>,
    /// 运行日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    /// 为空时跳过摘要生成
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
    /// 单次摘要请求超时（秒）
    pub llm_timeout_secs: u64,
    // --- 合规摘要 ---
    /// 备用策略发送的表格行数
    pub snippet_rows: usize,
    pub jurisdiction: String,
    /// 400-500nm 与 400-700nm 光谱比值阈值
    pub blue_ratio_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: ".".to_string(),
            output_dir: None,
            fixture_marker: "SL_".to_string(),
            fixture_code_len: 13,
            expected_group_size: 4,
            roles: RoleRule::defaults(),
            output_log_file: "fixture_report.log".to_string(),
            verbose_logging: false,
            llm_api_key: None,
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
            llm_max_tokens: 800,
            llm_temperature: 0.3,
            llm_timeout_secs: 120,
            snippet_rows: 60,
            jurisdiction: "Maui County".to_string(),
            blue_ratio_threshold: 0.02,
        }
    }
}

impl Config {
    /// 加载完整配置
    ///
    /// 配置文件路径取 `FIXTURE_REPORT_CONFIG`，否则使用当前目录下的
    /// `fixture_report.toml`（不存在时直接使用默认值）。
    pub fn load() -> ReportResult<Self> {
        let explicit = std::env::var("FIXTURE_REPORT_CONFIG").ok().map(PathBuf::from);
        let base = match explicit {
            Some(path) => Self::from_toml_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        Ok(base.with_env())
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> ReportResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ReportError::Setup {
            reason: format!("无法读取配置文件 {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content).map_err(|e| ReportError::Setup {
            reason: format!("配置文件 {} 解析失败: {}", path.display(), e),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 仅使用默认值 + 环境变量
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// 用环境变量覆盖当前配置
    pub fn with_env(self) -> Self {
        let base = self;
        Self {
            input_dir: std::env::var("REPORT_INPUT_DIR").unwrap_or(base.input_dir),
            output_dir: std::env::var("REPORT_OUTPUT_DIR").ok().or(base.output_dir),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(base.output_log_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(base.verbose_logging),
            llm_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()).or(base.llm_api_key),
            llm_api_base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(base.llm_api_base_url),
            llm_model_name: std::env::var("OPENAI_MODEL").unwrap_or(base.llm_model_name),
            llm_max_tokens: std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.llm_max_tokens),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.llm_timeout_secs),
            ..base
        }
    }

    /// 报告输出目录
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(self.output_dir.as_deref().unwrap_or(&self.input_dir))
    }
}
