//! 应用条目
//!
//! 导出时调用方选中的对象：整个文档、文档条目，或 XDE 装配树中的某个节点。

use crate::document::{Document, DocumentItem, DocumentItemId, WholeShapeItem};
use partview_core::shape::Shape;
use partview_core::xde::Label;

/// XDE 装配树中的节点
#[derive(Debug, Clone, Copy)]
pub struct XdeAssemblyNode<'a> {
    pub owner: &'a WholeShapeItem,
    pub label: Label,
}

impl<'a> XdeAssemblyNode<'a> {
    pub fn shape(&self) -> Option<Shape> {
        self.owner.xde().shape(self.label)
    }

    /// 节点名，无名时退回所属条目的名称
    pub fn name(&self) -> &'a str {
        match self.owner.xde().name(self.label) {
            Some(name) if !name.is_empty() => name,
            _ => self.owner.label(),
        }
    }
}

/// 选中的对象
#[derive(Debug, Clone, Copy)]
pub enum ApplicationItem<'a> {
    Document(&'a Document),
    DocumentItem(&'a DocumentItem),
    XdeAssemblyNode(XdeAssemblyNode<'a>),
}

impl<'a> ApplicationItem<'a> {
    pub fn is_document(&self) -> bool {
        matches!(self, ApplicationItem::Document(_))
    }

    pub fn is_document_item(&self) -> bool {
        matches!(self, ApplicationItem::DocumentItem(_))
    }

    pub fn is_xde_assembly_node(&self) -> bool {
        matches!(self, ApplicationItem::XdeAssemblyNode(_))
    }

    pub fn document(&self) -> Option<&'a Document> {
        match self {
            ApplicationItem::Document(doc) => Some(*doc),
            _ => None,
        }
    }

    pub fn document_item(&self) -> Option<&'a DocumentItem> {
        match self {
            ApplicationItem::DocumentItem(item) => Some(*item),
            _ => None,
        }
    }

    pub fn xde_assembly_node(&self) -> Option<XdeAssemblyNode<'a>> {
        match self {
            ApplicationItem::XdeAssemblyNode(node) => Some(*node),
            _ => None,
        }
    }
}

impl<'a> From<&'a Document> for ApplicationItem<'a> {
    fn from(doc: &'a Document) -> Self {
        ApplicationItem::Document(doc)
    }
}

impl<'a> From<&'a DocumentItem> for ApplicationItem<'a> {
    fn from(item: &'a DocumentItem) -> Self {
        ApplicationItem::DocumentItem(item)
    }
}

impl<'a> From<XdeAssemblyNode<'a>> for ApplicationItem<'a> {
    fn from(node: XdeAssemblyNode<'a>) -> Self {
        ApplicationItem::XdeAssemblyNode(node)
    }
}

/// 去重后的 XDE 导出对象
#[derive(Debug, Clone, Copy)]
pub enum XdeExportItem<'a> {
    WholeShape(&'a WholeShapeItem),
    Node(XdeAssemblyNode<'a>),
}

/// 把选择归约到带 XDE 文档的对象
///
/// 文档展开为其中的全部整体形状条目，网格条目被忽略。
/// 所属条目已被选中的装配节点会被丢弃，以免同一形状导出两次。
/// 结果中装配节点在前，整体形状条目在后，各自保持选择顺序。
pub fn xde_export_items<'a>(selection: &[ApplicationItem<'a>]) -> Vec<XdeExportItem<'a>> {
    let mut whole_shapes: Vec<&'a WholeShapeItem> = Vec::new();
    let mut nodes: Vec<XdeAssemblyNode<'a>> = Vec::new();

    for app_item in selection {
        match app_item {
            ApplicationItem::Document(doc) => {
                for item in doc.root_items().iter().filter_map(DocumentItem::as_whole_shape) {
                    insert_unique(&mut whole_shapes, item);
                }
            }
            ApplicationItem::DocumentItem(item) => {
                if let Some(item) = item.as_whole_shape() {
                    insert_unique(&mut whole_shapes, item);
                }
            }
            ApplicationItem::XdeAssemblyNode(node) => nodes.push(*node),
        }
    }

    let selected: Vec<DocumentItemId> = whole_shapes.iter().map(|item| item.id()).collect();
    nodes
        .into_iter()
        .filter(|node| !selected.contains(&node.owner.id()))
        .map(XdeExportItem::Node)
        .chain(whole_shapes.into_iter().map(XdeExportItem::WholeShape))
        .collect()
}

fn insert_unique<'a>(items: &mut Vec<&'a WholeShapeItem>, item: &'a WholeShapeItem) {
    if !items.iter().any(|known| known.id() == item.id()) {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MeshItem;
    use partview_core::math::Point3;
    use partview_core::shape::Solid;
    use partview_core::triangulation::Triangulation;
    use partview_core::xde::XdeDocument;

    fn assembly_document() -> Document {
        let mut xde = XdeDocument::new();
        xde.new_shape(Shape::Solid(Solid::make_box(Point3::origin(), 1.0, 1.0, 1.0)), "a");
        xde.new_shape(Shape::Solid(Solid::make_box(Point3::new(2.0, 0.0, 0.0), 1.0, 1.0, 1.0)), "b");
        let mut doc = Document::new();
        doc.add_root_item(WholeShapeItem::new("asm", xde));
        doc.add_root_item(MeshItem::new("mesh", Triangulation::default()));
        doc
    }

    fn node_of<'a>(doc: &'a Document, index: usize) -> XdeAssemblyNode<'a> {
        let owner = doc.root_items()[0].as_whole_shape().expect("whole shape");
        let root = owner.xde().free_shapes()[0];
        XdeAssemblyNode {
            owner,
            label: owner.xde().components(root)[index],
        }
    }

    #[test]
    fn test_discrimination() {
        let doc = assembly_document();
        let item = ApplicationItem::from(&doc.root_items()[0]);
        assert!(item.is_document_item());
        assert!(!item.is_document());
        assert!(ApplicationItem::from(&doc).is_document());
        let node = ApplicationItem::from(node_of(&doc, 1));
        assert!(node.is_xde_assembly_node());
        assert_eq!(node.xde_assembly_node().map(|n| n.name().to_string()), Some("b".to_string()));
    }

    #[test]
    fn test_document_and_its_item_exported_once() {
        let doc = assembly_document();
        let selection = [
            ApplicationItem::from(&doc),
            ApplicationItem::from(&doc.root_items()[0]),
        ];
        let items = xde_export_items(&selection);
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], XdeExportItem::WholeShape(item) if item.label() == "asm"));
    }

    #[test]
    fn test_node_dropped_when_owner_selected() {
        let doc = assembly_document();
        let selection = [
            ApplicationItem::from(node_of(&doc, 0)),
            ApplicationItem::from(&doc.root_items()[0]),
        ];
        let items = xde_export_items(&selection);
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], XdeExportItem::WholeShape(_)));
    }

    #[test]
    fn test_nodes_come_first() {
        let doc = assembly_document();
        let other = assembly_document();
        let selection = [
            ApplicationItem::from(&other.root_items()[0]),
            ApplicationItem::from(node_of(&doc, 0)),
            ApplicationItem::from(node_of(&doc, 1)),
            ApplicationItem::from(&doc.root_items()[1]),
        ];
        let items = xde_export_items(&selection);
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], XdeExportItem::Node(node) if node.name() == "a"));
        assert!(matches!(items[1], XdeExportItem::Node(node) if node.name() == "b"));
        assert!(matches!(items[2], XdeExportItem::WholeShape(_)));
    }
}
