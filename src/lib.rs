pub mod ncx;

// === 核心API重新导出 ===

/// NCX文档（主要接口）
pub use ncx::Ncx;

/// 错误处理
pub use ncx::{NcxError, Result};

/// 配置
pub use ncx::{NcxConfig, ValidationMode};

// === 导航树 ===

pub use ncx::{NavMap, NavPoint, NavPointId, NavPointNode, NavTarget};

/// NCX文件的媒体类型，供打包时写入OPF清单
pub use ncx::MIMETYPE;

// === 库信息 ===

/// NcxForge库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// NcxForge库的描述
pub const DESCRIPTION: &str = "一个用于生成EPUB NCX导航文件的库";

// === 便捷函数 ===

/// 快速解析NCX文件内容
///
/// 这是 `Ncx::parse_xml` 的便捷包装函数。
///
/// # 示例
///
/// ```rust
/// let xml = ncxforge::Ncx::new("uid1", "书名", "作者").finalize()?;
/// let ncx = ncxforge::parse(&xml)?;
/// assert_eq!(ncx.uid(), Some("uid1"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse(xml_content: &str) -> Result<Ncx> {
    Ncx::parse_xml(xml_content)
}
