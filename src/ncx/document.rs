//! NCX文档模块
//!
//! 管理NCX文档的元数据，持有唯一的导航地图，并提供基于层级游标的构建接口：
//! 调用者只需"在当前层级添加导航点"和"进入/退出一层"，无需自己维护父节点引用。

use crate::ncx::config::NcxConfig;
use crate::ncx::error::{NcxError, Result};
use crate::ncx::navigation::{NavMap, NavPoint, NavTarget, xml_text};

/// NCX文件的媒体类型
pub const MIMETYPE: &str = "application/x-dtbncx+xml";

fn normalize(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// NCX文档
#[derive(Debug, Clone)]
pub struct Ncx {
    /// 唯一标识符（dtb:uid）
    uid: Option<String>,
    /// 文档标题
    doc_title: Option<String>,
    /// 文档作者
    doc_author: Option<String>,
    /// 附加的meta条目，按添加顺序保存，允许重复
    meta: Vec<(String, String)>,
    /// 导航地图
    nav_map: NavMap,
    /// 当前接收新导航点的位置
    current: NavTarget,
    /// 最近一次添加或离开的位置，供 descend 使用
    last: Option<NavTarget>,
    /// 生成配置
    config: NcxConfig,
}

impl Default for Ncx {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

impl Ncx {
    /// 创建新的NCX文档，游标位于导航地图根部
    ///
    /// # 示例
    ///
    /// ```rust
    /// use ncxforge::{Ncx, NavPoint};
    ///
    /// let mut ncx = Ncx::new("uid1", "书名", "作者");
    /// ncx.add_nav_point(NavPoint::new("第一章", "ch1.html"));
    /// ncx.descend();
    /// ncx.add_nav_point(NavPoint::new("第一节", "ch1.html#s1"));
    /// let xml = ncx.finalize()?;
    /// assert!(xml.contains("<meta name=\"dtb:depth\" content=\"3\" />"));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new<'a>(
        uid: impl Into<Option<&'a str>>,
        doc_title: impl Into<Option<&'a str>>,
        doc_author: impl Into<Option<&'a str>>,
    ) -> Self {
        Self {
            uid: normalize(uid.into()),
            doc_title: normalize(doc_title.into()),
            doc_author: normalize(doc_author.into()),
            meta: Vec::new(),
            nav_map: NavMap::new(),
            current: NavTarget::Root,
            last: None,
            config: NcxConfig::default(),
        }
    }

    /// 使用指定配置
    pub fn with_config(mut self, config: NcxConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &NcxConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: NcxConfig) {
        self.config = config;
    }

    pub fn set_uid<'a>(&mut self, uid: impl Into<Option<&'a str>>) {
        self.uid = normalize(uid.into());
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn set_doc_title<'a>(&mut self, doc_title: impl Into<Option<&'a str>>) {
        self.doc_title = normalize(doc_title.into());
    }

    pub fn doc_title(&self) -> Option<&str> {
        self.doc_title.as_deref()
    }

    pub fn set_doc_author<'a>(&mut self, doc_author: impl Into<Option<&'a str>>) {
        self.doc_author = normalize(doc_author.into());
    }

    pub fn doc_author(&self) -> Option<&str> {
        self.doc_author.as_deref()
    }

    pub fn nav_map(&self) -> &NavMap {
        &self.nav_map
    }

    /// 获取导航地图的可变引用，可用于修改已挂载导航点的内容
    ///
    /// 若通过它整体替换了导航地图，游标会在下一次移动或添加时回到根部。
    pub fn nav_map_mut(&mut self) -> &mut NavMap {
        &mut self.nav_map
    }

    /// 替换导航地图，游标回到根部
    pub fn set_nav_map(&mut self, nav_map: NavMap) {
        self.nav_map = nav_map;
        self.current = NavTarget::Root;
        self.last = None;
    }

    /// 在当前层级添加导航点
    ///
    /// 返回新添加的导航点，并记录为 descend 的目标。游标位置不变。
    pub fn add_nav_point(&mut self, nav_point: NavPoint) -> NavTarget {
        self.sync_cursor();
        let added = self.nav_map.add_child(self.current, nav_point);
        self.last = Some(added);
        added
    }

    /// 进入下一层级：后续导航点将作为最近添加的导航点的子导航点
    ///
    /// 尚未添加任何导航点时不做任何操作。
    pub fn descend(&mut self) {
        self.sync_cursor();
        match self.last {
            Some(last) => self.current = last,
            None => tracing::debug!("尚未添加导航点，忽略 descend"),
        }
    }

    /// 返回上一层级：后续导航点将添加到当前位置的父节点下
    ///
    /// 已在根部时保持不变。
    pub fn ascend(&mut self) {
        self.sync_cursor();
        self.last = Some(self.current);
        self.current = self.nav_map.parent_of(self.current);
    }

    /// 返回根层级
    pub fn to_root(&mut self) {
        self.last = Some(self.current);
        self.current = NavTarget::Root;
    }

    /// 返回到指定层级
    ///
    /// 小于等于1时等同于 [`Ncx::to_root`]；只会向上移动，不会进入更深的层级。
    pub fn set_level(&mut self, level: usize) {
        if level <= 1 {
            self.to_root();
        } else {
            while self.nav_map.level_of(self.current) > level {
                self.ascend();
            }
        }
    }

    /// 游标指向的位置已不属于当前导航地图时（导航地图被整体替换），回到根部
    fn sync_cursor(&mut self) {
        if !self.nav_map.contains(self.current) {
            tracing::debug!(cursor = ?self.current, "游标位置已失效，回到根部");
            self.current = NavTarget::Root;
        }
        if self.last.is_some_and(|last| !self.nav_map.contains(last)) {
            self.last = None;
        }
    }

    /// 当前层级，根部为1
    pub fn current_level(&self) -> usize {
        self.nav_map.level_of(self.current)
    }

    /// 当前接收新导航点的位置
    pub fn current_target(&self) -> NavTarget {
        self.current
    }

    /// 添加meta条目
    ///
    /// 去除空白后name和content都不能为空。宽松模式下无效条目被静默丢弃，
    /// 严格模式下返回 [`NcxError::InvalidMetaEntry`]。
    pub fn add_meta_entry(&mut self, name: &str, content: &str) -> Result<()> {
        let name = name.trim();
        let content = content.trim();

        if name.is_empty() || content.is_empty() {
            if self.config.is_strict() {
                tracing::warn!(name, content, "无效的meta条目");
                return Err(NcxError::InvalidMetaEntry {
                    name: name.to_string(),
                    content: content.to_string(),
                });
            }
            tracing::debug!(name, content, "丢弃无效的meta条目");
            return Ok(());
        }

        self.meta.push((name.to_string(), content.to_string()));
        Ok(())
    }

    pub fn meta_entries(&self) -> &[(String, String)] {
        &self.meta
    }

    /// 生成完整的NCX文档
    ///
    /// 会为没有ID的导航点生成ID并计算导航深度，应在文档构建完成后只调用一次。
    /// 宽松模式下不会返回错误。
    pub fn finalize(&mut self) -> Result<String> {
        if self.config.is_strict() {
            self.validate().inspect_err(|e| {
                tracing::warn!(error = %e, "NCX严格校验失败");
            })?;
        }

        let escape = self.config.escape_text;
        let nav = self
            .nav_map
            .finalize_with(&self.config.id_prefix, escape);

        let mut ncx = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE ncx PUBLIC \"-//NISO//DTD ncx 2005-1//EN\"\n  \
             \"http://www.daisy.org/z3986/2005/ncx-2005-1.dtd\">\n",
        );
        ncx.push_str(&format!(
            "<ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\" xml:lang=\"{}\">\n",
            xml_text(Some(self.config.language.as_str()), escape)
        ));
        ncx.push_str("\t<head>\n");
        ncx.push_str(&format!(
            "\t\t<meta name=\"dtb:uid\" content=\"{}\" />\n",
            xml_text(self.uid.as_deref(), escape)
        ));
        ncx.push_str(&format!(
            "\t\t<meta name=\"dtb:depth\" content=\"{}\" />\n",
            self.nav_map.nav_levels()
        ));
        ncx.push_str("\t\t<meta name=\"dtb:totalPageCount\" content=\"0\" />\n");
        ncx.push_str("\t\t<meta name=\"dtb:maxPageNumber\" content=\"0\" />\n");

        for (name, content) in &self.meta {
            ncx.push_str(&format!(
                "\t\t<meta name=\"{}\" content=\"{}\" />\n",
                xml_text(Some(name.as_str()), escape),
                xml_text(Some(content.as_str()), escape)
            ));
        }

        ncx.push_str(&format!(
            "\t</head>\n\n\t<docTitle>\n\t\t<text>{}</text>\n\t</docTitle>\n\n",
            xml_text(self.doc_title.as_deref(), escape)
        ));
        ncx.push_str(&format!(
            "\t<docAuthor>\n\t\t<text>{}</text>\n\t</docAuthor>\n\n",
            xml_text(self.doc_author.as_deref(), escape)
        ));
        ncx.push_str(&nav);
        ncx.push_str("</ncx>\n");

        Ok(ncx)
    }

    fn validate(&self) -> Result<()> {
        if self.uid.as_deref().is_none_or(str::is_empty) {
            return Err(NcxError::MissingUid);
        }
        self.nav_map.validate(&self.config.id_prefix)
    }
}
