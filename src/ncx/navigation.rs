//! NCX导航树数据结构定义
//!
//! 定义导航点（NavPoint）和导航地图（NavMap）。导航点先以独立值的形式创建，
//! 挂载时整棵子树被移入NavMap持有的节点池，每个节点获得一个 `NavPointId`，
//! 父节点引用在挂载时一次性设定，之后不再改变。

use crate::ncx::error::{NcxError, Result};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// 为每个新建的导航地图分配唯一标记
static NEXT_MAP_TOKEN: AtomicU64 = AtomicU64::new(1);

/// 对可选字符串去除首尾空白
fn normalize(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// 输出文本，缺失值输出为空字符串
pub(crate) fn xml_text(value: Option<&str>, escape: bool) -> Cow<'_, str> {
    match value {
        Some(v) if escape => quick_xml::escape::escape(v),
        Some(v) => Cow::Borrowed(v),
        None => Cow::Borrowed(""),
    }
}

/// 导航点在NavMap节点池中的索引
///
/// 同时记录所属导航地图的标记，其他导航地图不会接受该ID。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NavPointId {
    map: u64,
    index: usize,
}

impl NavPointId {
    /// 节点池中的下标
    pub fn index(&self) -> usize {
        self.index
    }
}

/// 可以接收新导航点的位置：导航地图根部或某个已挂载的导航点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavTarget {
    /// 导航地图根部（层级1）
    Root,
    /// 已挂载的导航点
    Point(NavPointId),
}

impl NavTarget {
    /// 若为导航点则返回其ID
    pub fn point(&self) -> Option<NavPointId> {
        match self {
            NavTarget::Root => None,
            NavTarget::Point(id) => Some(*id),
        }
    }

    /// 是否为导航地图根部
    pub fn is_root(&self) -> bool {
        matches!(self, NavTarget::Root)
    }
}

/// 尚未挂载的导航点
///
/// 可以先在独立的导航点上添加子导航点，再整体挂载到文档中。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavPoint {
    label: Option<String>,
    content_src: Option<String>,
    id: Option<String>,
    children: Vec<NavPoint>,
}

impl NavPoint {
    /// 创建新的导航点
    ///
    /// 传入 `None` 表示缺失值；字符串会被去除首尾空白。
    pub fn new<'a>(
        label: impl Into<Option<&'a str>>,
        content_src: impl Into<Option<&'a str>>,
    ) -> Self {
        Self {
            label: normalize(label.into()),
            content_src: normalize(content_src.into()),
            id: None,
            children: Vec::new(),
        }
    }

    /// 指定显式ID
    pub fn with_id<'a>(mut self, id: impl Into<Option<&'a str>>) -> Self {
        self.set_id(id);
        self
    }

    pub fn set_label<'a>(&mut self, label: impl Into<Option<&'a str>>) {
        self.label = normalize(label.into());
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_content_src<'a>(&mut self, content_src: impl Into<Option<&'a str>>) {
        self.content_src = normalize(content_src.into());
    }

    pub fn content_src(&self) -> Option<&str> {
        self.content_src.as_deref()
    }

    pub fn set_id<'a>(&mut self, id: impl Into<Option<&'a str>>) {
        self.id = normalize(id.into());
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// 添加子导航点，返回新添加的子导航点
    pub fn add_child(&mut self, child: NavPoint) -> &mut NavPoint {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn children(&self) -> &[NavPoint] {
        &self.children
    }
}

/// 已挂载到NavMap中的导航点
#[derive(Debug, Clone, PartialEq)]
pub struct NavPointNode {
    label: Option<String>,
    content_src: Option<String>,
    id: Option<String>,
    children: Vec<NavPointId>,
    parent: NavTarget,
}

impl NavPointNode {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label<'a>(&mut self, label: impl Into<Option<&'a str>>) {
        self.label = normalize(label.into());
    }

    pub fn content_src(&self) -> Option<&str> {
        self.content_src.as_deref()
    }

    pub fn set_content_src<'a>(&mut self, content_src: impl Into<Option<&'a str>>) {
        self.content_src = normalize(content_src.into());
    }

    /// 显式设置的ID，或上一次生成时自动分配的ID
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id<'a>(&mut self, id: impl Into<Option<&'a str>>) {
        self.id = normalize(id.into());
    }

    /// 子导航点，按添加顺序排列
    pub fn children(&self) -> &[NavPointId] {
        &self.children
    }

    /// 父节点（根导航点的父节点为导航地图）
    pub fn parent(&self) -> NavTarget {
        self.parent
    }
}

/// 导航地图
///
/// 克隆得到的导航地图沿用原有标记，克隆前取得的 `NavPointId` 在两者中都有效。
#[derive(Debug, Clone)]
pub struct NavMap {
    /// 本导航地图的唯一标记
    token: u64,
    /// 节点池
    nodes: Vec<NavPointNode>,
    /// 顶层导航点
    roots: Vec<NavPointId>,
    /// 生成时得到的最大嵌套层数，仅在 finalize 之后有效
    nav_levels: usize,
    /// 已执行 finalize 的次数
    finalize_count: usize,
}

impl Default for NavMap {
    fn default() -> Self {
        Self::new()
    }
}

impl NavMap {
    /// 创建新的导航地图
    pub fn new() -> Self {
        Self {
            token: NEXT_MAP_TOKEN.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            roots: Vec::new(),
            nav_levels: 0,
            finalize_count: 0,
        }
    }

    /// 已挂载的导航点总数
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 顶层导航点
    pub fn roots(&self) -> &[NavPointId] {
        &self.roots
    }

    pub fn get(&self, id: NavPointId) -> Option<&NavPointNode> {
        if id.map != self.token {
            return None;
        }
        self.nodes.get(id.index)
    }

    pub fn get_mut(&mut self, id: NavPointId) -> Option<&mut NavPointNode> {
        if id.map != self.token {
            return None;
        }
        self.nodes.get_mut(id.index)
    }

    /// 判断目标位置是否属于本导航地图
    pub fn contains(&self, target: NavTarget) -> bool {
        match target {
            NavTarget::Root => true,
            NavTarget::Point(id) => self.get(id).is_some(),
        }
    }

    /// 添加顶层导航点
    pub fn add_nav_point(&mut self, nav_point: NavPoint) -> NavTarget {
        self.add_child(NavTarget::Root, nav_point)
    }

    /// 将导航点（连同其子导航点）挂载到目标位置下
    ///
    /// 返回新挂载的导航点；目标位置不属于本导航地图时不做任何修改，原样返回目标位置。
    pub fn add_child(&mut self, target: NavTarget, nav_point: NavPoint) -> NavTarget {
        if !self.contains(target) {
            tracing::debug!(position = ?target, "目标位置不存在，忽略导航点");
            return target;
        }
        NavTarget::Point(self.attach(target, nav_point))
    }

    fn attach(&mut self, parent: NavTarget, nav_point: NavPoint) -> NavPointId {
        let NavPoint {
            label,
            content_src,
            id,
            children,
        } = nav_point;

        let node_id = NavPointId {
            map: self.token,
            index: self.nodes.len(),
        };
        self.nodes.push(NavPointNode {
            label,
            content_src,
            id,
            children: Vec::new(),
            parent,
        });

        match parent {
            NavTarget::Root => self.roots.push(node_id),
            NavTarget::Point(parent_id) => self.nodes[parent_id.index].children.push(node_id),
        }

        for child in children {
            self.attach(NavTarget::Point(node_id), child);
        }

        node_id
    }

    /// 获取目标位置的子导航点
    pub fn children_of(&self, target: NavTarget) -> &[NavPointId] {
        match target {
            NavTarget::Root => &self.roots,
            NavTarget::Point(id) => self.get(id).map(|node| node.children()).unwrap_or(&[]),
        }
    }

    /// 获取目标位置的父节点
    ///
    /// 导航地图根部的父节点是它自身。
    pub fn parent_of(&self, target: NavTarget) -> NavTarget {
        match target {
            NavTarget::Root => NavTarget::Root,
            NavTarget::Point(id) => self.get(id).map(|node| node.parent).unwrap_or(NavTarget::Root),
        }
    }

    /// 获取目标位置的层级：导航地图为1，顶层导航点为2，依次递增
    pub fn level_of(&self, target: NavTarget) -> usize {
        let mut level = 1;
        let mut current = target;
        while let NavTarget::Point(id) = current {
            let Some(node) = self.get(id) else {
                break;
            };
            level += 1;
            current = node.parent;
        }
        level
    }

    /// 先序遍历所有导航点（即playOrder顺序）
    pub fn iter_pre_order(&self) -> Vec<NavPointId> {
        fn collect(map: &NavMap, id: NavPointId, out: &mut Vec<NavPointId>) {
            out.push(id);
            for child in map.children_of(NavTarget::Point(id)) {
                collect(map, *child, out);
            }
        }

        let mut ids = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            collect(self, *root, &mut ids);
        }
        ids
    }

    /// 根据ID查找导航点
    pub fn find_by_id(&self, id: &str) -> Option<NavPointId> {
        self.iter_pre_order()
            .into_iter()
            .find(|node_id| self.nodes[node_id.index].id.as_deref() == Some(id))
    }

    /// 导航深度，用于 "dtb:depth" 元数据
    ///
    /// 等于所有导航点中的最大层级（顶层导航点为2），没有导航点时为1。
    /// 例如只有一个顶层导航点时为2，顶层导航点带一个子导航点时为3。
    /// 仅在 finalize 之后有效；之前调用总是返回1。
    pub fn nav_levels(&self) -> usize {
        self.nav_levels + 1
    }

    /// 检查导航树能否生成完整的文档
    ///
    /// 按playOrder顺序检查空标签、空内容引用以及重复ID（包括将要自动生成的ID）。
    pub fn validate(&self, id_prefix: &str) -> Result<()> {
        let mut seen = HashSet::new();

        for (index, node_id) in self.iter_pre_order().into_iter().enumerate() {
            let play_order = index as u32 + 1;
            let node = &self.nodes[node_id.index];

            if node.label.as_deref().is_none_or(str::is_empty) {
                return Err(NcxError::EmptyLabel { play_order });
            }
            if node.content_src.as_deref().is_none_or(str::is_empty) {
                return Err(NcxError::EmptyContentSrc { play_order });
            }

            let effective_id = match node.id.as_deref() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => format!("{}{}", id_prefix, play_order),
            };
            if !seen.insert(effective_id.clone()) {
                return Err(NcxError::DuplicateId(effective_id));
            }
        }

        Ok(())
    }

    /// 使用默认选项生成 `<navMap>` 片段
    pub fn finalize(&mut self) -> String {
        self.finalize_with("navpoint-", false)
    }

    /// 生成 `<navMap>` 片段
    ///
    /// 按先序遍历分配从1开始的playOrder，为没有ID的导航点生成 `id_prefix + playOrder`，
    /// 并记录最大嵌套层数。该方法应在导航树构建完成后只调用一次。
    pub fn finalize_with(&mut self, id_prefix: &str, escape: bool) -> String {
        if self.finalize_count > 0 {
            tracing::warn!(count = self.finalize_count, "导航地图被重复生成");
        }
        self.finalize_count += 1;

        let mut play_order = 0u32;
        let mut max_level = 0;
        self.nav_levels = 0;

        let mut nav = String::from("\t<navMap>\n");

        let roots = self.roots.clone();
        for root in roots {
            let ret_level =
                self.finalize_point(root, &mut nav, &mut play_order, 0, id_prefix, escape);
            max_level = max_level.max(ret_level);
        }

        // 根部本身占据层级1
        self.nav_levels = max_level.saturating_sub(1);

        tracing::debug!(
            nav_points = play_order,
            depth = self.nav_levels(),
            "导航地图生成完成"
        );

        nav.push_str("\t</navMap>\n");
        nav
    }

    /// 生成单个导航点及其子导航点，返回子树中的最大层级
    fn finalize_point(
        &mut self,
        node_id: NavPointId,
        nav: &mut String,
        play_order: &mut u32,
        indent: usize,
        id_prefix: &str,
        escape: bool,
    ) -> usize {
        *play_order += 1;
        // 顶层导航点的层级为2
        let level = indent + 2;
        let mut max_level = level;

        let node = &mut self.nodes[node_id.index];
        if node.id.as_deref().is_none_or(str::is_empty) {
            node.id = Some(format!("{}{}", id_prefix, play_order));
        }

        let tabs = "\t".repeat(indent);
        nav.push_str(&format!(
            "{tabs}\t\t<navPoint id=\"{}\" playOrder=\"{}\">\n",
            xml_text(node.id.as_deref(), escape),
            play_order
        ));
        nav.push_str(&format!("{tabs}\t\t\t<navLabel>\n"));
        nav.push_str(&format!(
            "{tabs}\t\t\t\t<text>{}</text>\n",
            xml_text(node.label.as_deref(), escape)
        ));
        nav.push_str(&format!("{tabs}\t\t\t</navLabel>\n"));
        nav.push_str(&format!(
            "{tabs}\t\t\t<content src=\"{}\" />\n",
            xml_text(node.content_src.as_deref(), escape)
        ));

        let children = node.children.clone();
        for child in children {
            let ret_level =
                self.finalize_point(child, nav, play_order, indent + 1, id_prefix, escape);
            max_level = max_level.max(ret_level);
        }

        nav.push_str(&format!("{tabs}\t\t</navPoint>\n"));

        max_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> (NavMap, NavPointId, NavPointId, NavPointId) {
        let mut map = NavMap::new();
        let ch1 = map.add_nav_point(NavPoint::new("Ch1", "ch1.html")).point().unwrap();
        let s1 = map
            .add_child(NavTarget::Point(ch1), NavPoint::new("Ch1.1", "ch1.html#s1"))
            .point()
            .unwrap();
        let ch2 = map.add_nav_point(NavPoint::new("Ch2", "ch2.html")).point().unwrap();
        (map, ch1, s1, ch2)
    }

    #[test]
    fn test_nav_point_trims_input() {
        let mut point = NavPoint::new("  第一章 ", "\ttext/ch1.xhtml\n").with_id(" c1 ");
        assert_eq!(point.label(), Some("第一章"));
        assert_eq!(point.content_src(), Some("text/ch1.xhtml"));
        assert_eq!(point.id(), Some("c1"));

        point.set_id(None);
        assert_eq!(point.id(), None);
        point.set_label("   ");
        assert_eq!(point.label(), Some(""));
    }

    #[test]
    fn test_detached_children_returned() {
        let mut point = NavPoint::new("Part", "part.html");
        let child = point.add_child(NavPoint::new("Sub", "sub.html"));
        child.add_child(NavPoint::new("Leaf", "leaf.html"));

        assert_eq!(point.children().len(), 1);
        assert_eq!(point.children()[0].children()[0].label(), Some("Leaf"));
    }

    #[test]
    fn test_levels_and_parents() {
        let (map, ch1, s1, ch2) = sample_map();

        assert_eq!(map.level_of(NavTarget::Root), 1);
        assert_eq!(map.level_of(NavTarget::Point(ch1)), 2);
        assert_eq!(map.level_of(NavTarget::Point(s1)), 3);
        assert_eq!(map.level_of(NavTarget::Point(ch2)), 2);

        assert_eq!(map.parent_of(NavTarget::Root), NavTarget::Root);
        assert_eq!(map.parent_of(NavTarget::Point(ch1)), NavTarget::Root);
        assert_eq!(map.parent_of(NavTarget::Point(s1)), NavTarget::Point(ch1));
        assert_eq!(map.get(s1).unwrap().parent(), NavTarget::Point(ch1));
    }

    #[test]
    fn test_attach_detached_subtree() {
        let mut map = NavMap::new();
        let mut part = NavPoint::new("Part", "part.html");
        part.add_child(NavPoint::new("A", "a.html"))
            .add_child(NavPoint::new("A.1", "a.html#1"));
        part.add_child(NavPoint::new("B", "b.html"));

        let part_id = map.add_nav_point(part).point().unwrap();
        assert_eq!(map.len(), 4);

        let labels: Vec<_> = map
            .iter_pre_order()
            .into_iter()
            .map(|id| map.get(id).unwrap().label().unwrap().to_string())
            .collect();
        assert_eq!(labels, vec!["Part", "A", "A.1", "B"]);
        assert_eq!(map.children_of(NavTarget::Point(part_id)).len(), 2);

        assert!(map.find_by_id("missing").is_none());
    }

    #[test]
    fn test_add_child_to_foreign_target_is_noop() {
        let (big, _, s1, _) = sample_map();
        let mut small = NavMap::new();

        let target = NavTarget::Point(s1);
        assert!(big.contains(target));
        let returned = small.add_child(target, NavPoint::new("X", "x.html"));

        assert_eq!(returned, target);
        assert!(small.is_empty());
    }

    #[test]
    fn test_foreign_target_with_index_in_range_is_rejected() {
        let mut first = NavMap::new();
        first.add_nav_point(NavPoint::new("A1", "a1.html"));
        first.add_nav_point(NavPoint::new("A2", "a2.html"));
        let foreign = first.add_nav_point(NavPoint::new("A3", "a3.html"));

        let mut second = NavMap::new();
        for label in ["B1", "B2", "B3"] {
            second.add_nav_point(NavPoint::new(label, "b.html"));
        }

        assert!(!second.contains(foreign));
        assert!(second.get(foreign.point().unwrap()).is_none());
        assert_eq!(second.level_of(foreign), 1);
        assert_eq!(second.parent_of(foreign), NavTarget::Root);

        let returned = second.add_child(foreign, NavPoint::new("X", "x.html"));
        assert_eq!(returned, foreign);
        assert_eq!(second.len(), 3);
        assert!(second.children_of(NavTarget::Point(second.roots()[2])).is_empty());
    }

    #[test]
    fn test_cloned_map_accepts_earlier_ids() {
        let (map, ch1, ..) = sample_map();
        let mut copy = map.clone();

        let added = copy.add_child(NavTarget::Point(ch1), NavPoint::new("Ch1.2", "ch1.html#s2"));
        assert_eq!(copy.parent_of(added), NavTarget::Point(ch1));
        assert_eq!(map.len(), 3);
        assert_eq!(copy.len(), 4);
    }

    #[test]
    fn test_nav_levels_stale_until_finalized() {
        let (mut map, ..) = sample_map();
        assert_eq!(map.nav_levels(), 1);

        map.finalize();
        assert_eq!(map.nav_levels(), 3);
    }

    #[test]
    fn test_finalize_empty_map() {
        let mut map = NavMap::new();
        assert_eq!(map.finalize(), "\t<navMap>\n\t</navMap>\n");
        assert_eq!(map.nav_levels(), 1);
    }

    #[test]
    fn test_finalize_single_leaf_depth() {
        let mut map = NavMap::new();
        map.add_nav_point(NavPoint::new("Only", "only.html"));
        map.finalize();
        assert_eq!(map.nav_levels(), 2);
    }

    #[test]
    fn test_finalize_output_and_play_order() {
        let (mut map, ch1, s1, ch2) = sample_map();
        map.get_mut(ch2).unwrap().set_id("chapter-two");

        let nav = map.finalize();
        let expected = "\t<navMap>\n\
\t\t<navPoint id=\"navpoint-1\" playOrder=\"1\">\n\
\t\t\t<navLabel>\n\
\t\t\t\t<text>Ch1</text>\n\
\t\t\t</navLabel>\n\
\t\t\t<content src=\"ch1.html\" />\n\
\t\t\t<navPoint id=\"navpoint-2\" playOrder=\"2\">\n\
\t\t\t\t<navLabel>\n\
\t\t\t\t\t<text>Ch1.1</text>\n\
\t\t\t\t</navLabel>\n\
\t\t\t\t<content src=\"ch1.html#s1\" />\n\
\t\t\t</navPoint>\n\
\t\t</navPoint>\n\
\t\t<navPoint id=\"chapter-two\" playOrder=\"3\">\n\
\t\t\t<navLabel>\n\
\t\t\t\t<text>Ch2</text>\n\
\t\t\t</navLabel>\n\
\t\t\t<content src=\"ch2.html\" />\n\
\t\t</navPoint>\n\
\t</navMap>\n";
        assert_eq!(nav, expected);

        assert_eq!(map.get(ch1).unwrap().id(), Some("navpoint-1"));
        assert_eq!(map.get(s1).unwrap().id(), Some("navpoint-2"));
        assert_eq!(map.get(ch2).unwrap().id(), Some("chapter-two"));
        assert_eq!(map.find_by_id("navpoint-2"), Some(s1));
    }

    #[test]
    fn test_finalize_escapes_when_requested() {
        let mut map = NavMap::new();
        map.add_nav_point(NavPoint::new("Tom & Jerry <1>", "a.html?x=1&y=2"));

        let nav = map.finalize_with("np", true);
        assert!(nav.contains("<text>Tom &amp; Jerry &lt;1&gt;</text>"));
        assert!(nav.contains("src=\"a.html?x=1&amp;y=2\""));
        assert!(nav.contains("id=\"np1\""));
    }

    #[test]
    fn test_validate() {
        let (map, ..) = sample_map();
        assert!(map.validate("navpoint-").is_ok());

        let mut bad = NavMap::new();
        bad.add_nav_point(NavPoint::new("A", "a.html"));
        bad.add_nav_point(NavPoint::new(None, "b.html"));
        assert!(matches!(
            bad.validate("navpoint-"),
            Err(NcxError::EmptyLabel { play_order: 2 })
        ));

        let mut bad = NavMap::new();
        bad.add_nav_point(NavPoint::new("A", " "));
        assert!(matches!(
            bad.validate("navpoint-"),
            Err(NcxError::EmptyContentSrc { play_order: 1 })
        ));

        // 显式ID与自动生成的ID冲突
        let mut bad = NavMap::new();
        bad.add_nav_point(NavPoint::new("A", "a.html"));
        bad.add_nav_point(NavPoint::new("B", "b.html").with_id("navpoint-1"));
        assert!(matches!(
            bad.validate("navpoint-"),
            Err(NcxError::DuplicateId(id)) if id == "navpoint-1"
        ));
    }
}
