//! NCX解析器模块
//!
//! 将NCX文件的XML内容解析回 [`Ncx`] 文档，导航点保留原有ID和嵌套结构。
//! playOrder 和 dtb:depth 不会被保留，下一次生成时会重新计算。

use crate::ncx::document::Ncx;
use crate::ncx::error::{NcxError, Result};
use crate::ncx::navigation::NavPoint;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// 生成时固定输出的meta名称，解析时不作为附加meta条目保存
const FIXED_META_NAMES: [&str; 3] = ["dtb:depth", "dtb:totalPageCount", "dtb:maxPageNumber"];

/// 空字符串视为缺失值
fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// 当前所在的文档区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Head,
    DocTitle,
    DocAuthor,
    NavMap,
}

impl Ncx {
    /// 解析NCX文件内容
    ///
    /// # 参数
    /// * `xml_content` - NCX文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Ncx>` - 解析后的NCX文档，使用默认配置（xml:lang取自文档）
    pub fn parse_xml(xml_content: &str) -> Result<Ncx> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut ncx = Ncx::default();
        let mut found_root = false;

        let mut buf = Vec::new();
        let mut section = Section::None;
        let mut text_content = String::new();

        // 尚未闭合的导航点，栈顶为最内层
        let mut nav_point_stack: Vec<NavPoint> = Vec::new();
        let mut in_nav_label = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local_name = e.local_name();

                    match local_name.as_ref() {
                        b"ncx" => {
                            found_root = true;
                            if let Some(lang) = Self::parse_lang(e)? {
                                let mut config = ncx.config().clone();
                                config.language = lang;
                                ncx.set_config(config);
                            }
                        }
                        b"head" => section = Section::Head,
                        b"docTitle" => section = Section::DocTitle,
                        b"docAuthor" => section = Section::DocAuthor,
                        b"navMap" => section = Section::NavMap,
                        b"meta" if section == Section::Head => {
                            Self::parse_meta_element(e, &mut ncx)?;
                        }
                        b"navPoint" if section == Section::NavMap => {
                            let id = Self::parse_attribute(e, b"id")?;
                            nav_point_stack.push(NavPoint::new(None, None).with_id(id.as_deref()));
                        }
                        b"navLabel" if section == Section::NavMap => {
                            in_nav_label = true;
                        }
                        b"content" if section == Section::NavMap => {
                            let src = Self::parse_attribute(e, b"src")?;
                            if let Some(nav_point) = nav_point_stack.last_mut() {
                                nav_point.set_content_src(src.as_deref());
                            }
                        }
                        _ => {}
                    }
                    text_content.clear();
                }
                Event::End(ref e) => {
                    let local_name = e.local_name();

                    match local_name.as_ref() {
                        b"head" | b"docTitle" | b"docAuthor" | b"navMap" => {
                            section = Section::None;
                        }
                        b"text" => match section {
                            Section::DocTitle => ncx.set_doc_title(non_empty(&text_content)),
                            Section::DocAuthor => ncx.set_doc_author(non_empty(&text_content)),
                            Section::NavMap if in_nav_label => {
                                if let Some(nav_point) = nav_point_stack.last_mut() {
                                    nav_point.set_label(text_content.as_str());
                                }
                            }
                            _ => {}
                        },
                        b"navLabel" => {
                            in_nav_label = false;
                        }
                        b"navPoint" if section == Section::NavMap => {
                            if let Some(nav_point) = nav_point_stack.pop() {
                                match nav_point_stack.last_mut() {
                                    Some(parent) => {
                                        parent.add_child(nav_point);
                                    }
                                    None => {
                                        ncx.add_nav_point(nav_point);
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !found_root {
            return Err(NcxError::NcxParseError("没有找到ncx根元素".to_string()));
        }
        if !nav_point_stack.is_empty() {
            return Err(NcxError::NcxParseError("navPoint元素未闭合".to_string()));
        }

        Ok(ncx)
    }

    /// 解析NCX根元素的 xml:lang 属性
    fn parse_lang(e: &BytesStart) -> Result<Option<String>> {
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| NcxError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.as_ref() == b"xml:lang" {
                return Ok(Some(attr.unescape_value()?.to_string()));
            }
        }
        Ok(None)
    }

    /// 解析meta元素
    fn parse_meta_element(e: &BytesStart, ncx: &mut Ncx) -> Result<()> {
        let name = Self::parse_attribute(e, b"name")?.unwrap_or_default();
        let content = Self::parse_attribute(e, b"content")?.unwrap_or_default();

        match name.as_str() {
            "dtb:uid" => ncx.set_uid(non_empty(&content)),
            fixed if FIXED_META_NAMES.contains(&fixed) => {}
            _ => ncx.add_meta_entry(&name, &content)?,
        }

        Ok(())
    }

    /// 读取指定属性的值
    fn parse_attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| NcxError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.local_name().as_ref() == key {
                return Ok(Some(attr.unescape_value()?.to_string()));
            }
        }
        Ok(None)
    }
}
