//! NCX（Navigation Control file for XML）文件生成模块
//!
//! 此模块提供EPUB文件中NCX导航控制文件的构建与生成功能，包括导航树、层级游标、
//! 元数据以及生成后的解析回读。

pub mod config;
pub mod document;
pub mod error;
pub mod navigation;
pub mod parser;

// 重新导出公共类型
pub use config::{NcxConfig, ValidationMode, DEFAULT_CONFIG_PATH};
pub use document::{MIMETYPE, Ncx};
pub use error::{NcxError, Result};
pub use navigation::{NavMap, NavPoint, NavPointId, NavPointNode, NavTarget};
