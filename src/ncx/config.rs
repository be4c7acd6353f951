//! NCX生成配置模块
//!
//! 提供NCX生成行为的配置管理功能，支持从YAML文件加载配置。

use crate::ncx::error::{NcxError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "ncx.yaml";

/// 输入校验模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// 宽松模式：无效输入被静默忽略或修复，生成时永不报错
    #[default]
    Lenient,
    /// 严格模式：遇到第一个无效输入即返回错误
    Strict,
}

/// NCX生成配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NcxConfig {
    /// 校验模式
    pub mode: ValidationMode,
    /// 根元素的 xml:lang 属性
    pub language: String,
    /// 自动生成导航点ID时使用的前缀
    pub id_prefix: String,
    /// 是否对文本和属性值进行XML转义
    pub escape_text: bool,
}

impl Default for NcxConfig {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Lenient,
            language: "en".to_string(),
            id_prefix: "navpoint-".to_string(),
            escape_text: false,
        }
    }
}

impl NcxConfig {
    /// 创建严格模式的配置，其余选项取默认值
    pub fn strict() -> Self {
        Self {
            mode: ValidationMode::Strict,
            ..Self::default()
        }
    }

    /// 是否为严格模式
    pub fn is_strict(&self) -> bool {
        self.mode == ValidationMode::Strict
    }

    /// 从YAML字符串解析配置
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| NcxError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 从指定的配置文件中加载配置
    ///
    /// 文件中缺失的字段使用默认值。
    ///
    /// # 示例
    ///
    /// ```rust,no_run
    /// use ncxforge::NcxConfig;
    /// let config = NcxConfig::from_file("ncx.yaml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| NcxError::ConfigError(format!("无法读取配置文件: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    /// 序列化为YAML字符串
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yml::to_string(self)
            .map_err(|e| NcxError::ConfigError(format!("序列化配置失败: {}", e)))
    }

    /// 将默认配置写入指定路径
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = Self::default().to_yaml_string()?;

        let content_with_header = format!(
            "# NCX生成配置文件\n# mode: lenient 或 strict\n\n{}",
            yaml_content
        );

        fs::write(path.as_ref(), content_with_header)
            .map_err(|e| NcxError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 尝试从配置文件加载，文件不存在或无效时返回默认配置
    ///
    /// 通常传入 [`DEFAULT_CONFIG_PATH`]。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(error = %e, "使用默认NCX配置");
                Self::default()
            }
        }
    }
}
