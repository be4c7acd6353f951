use thiserror::Error;

pub type Result<T> = std::result::Result<T, NcxError>;

/// NCX相关的错误类型
#[derive(Error, Debug)]
pub enum NcxError {
    #[error("XML解析错误: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("NCX文件解析错误: {0}")]
    NcxParseError(String),

    #[error("配置文件错误: {0}")]
    ConfigError(String),

    #[error("缺少唯一标识符(dtb:uid)")]
    MissingUid,

    #[error("导航点标签为空 (playOrder: {play_order})")]
    EmptyLabel { play_order: u32 },

    #[error("导航点内容引用为空 (playOrder: {play_order})")]
    EmptyContentSrc { play_order: u32 },

    #[error("导航点ID重复: {0}")]
    DuplicateId(String),

    #[error("无效的meta条目: name={name:?}, content={content:?}")]
    InvalidMetaEntry { name: String, content: String },
}
