//! XDE 文档
//!
//! 带名称的形状标签树。标签要么是简单形状，要么是装配体；
//! 装配体的组件引用其他标签。没有被任何装配体引用的标签称为顶层自由形状。

use crate::shape::Shape;
use serde::{Deserialize, Serialize};

/// 标签句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label(usize);

impl Label {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// 标签内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LabelKind {
    /// 简单形状
    Simple(Shape),
    /// 装配体，保存被引用的组件标签
    Assembly(Vec<Label>),
}

/// 形状标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeLabel {
    pub name: String,
    pub kind: LabelKind,
}

/// XDE 文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XdeDocument {
    labels: Vec<ShapeLabel>,
}

impl XdeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn nb_labels(&self) -> usize {
        self.labels.len()
    }

    /// 新增简单形状标签
    pub fn new_shape(&mut self, shape: Shape, name: impl Into<String>) -> Label {
        self.push(ShapeLabel {
            name: name.into(),
            kind: LabelKind::Simple(shape),
        })
    }

    /// 新增空装配体标签
    pub fn new_assembly(&mut self, name: impl Into<String>) -> Label {
        self.push(ShapeLabel {
            name: name.into(),
            kind: LabelKind::Assembly(Vec::new()),
        })
    }

    fn push(&mut self, label: ShapeLabel) -> Label {
        self.labels.push(label);
        Label(self.labels.len() - 1)
    }

    /// 把 `component` 加入装配体 `assembly`
    ///
    /// 两个标签都必须存在、`assembly` 必须是装配体，且不能形成环。
    pub fn add_component(&mut self, assembly: Label, component: Label) -> bool {
        if component.0 >= self.labels.len() || self.reaches(component, assembly) {
            return false;
        }
        match self.labels.get_mut(assembly.0).map(|l| &mut l.kind) {
            Some(LabelKind::Assembly(components)) => {
                components.push(component);
                true
            }
            _ => false,
        }
    }

    fn reaches(&self, from: Label, target: Label) -> bool {
        if from == target {
            return true;
        }
        self.components(from)
            .iter()
            .any(|&child| self.reaches(child, target))
    }

    pub fn label(&self, label: Label) -> Option<&ShapeLabel> {
        self.labels.get(label.0)
    }

    pub fn name(&self, label: Label) -> Option<&str> {
        self.label(label).map(|l| l.name.as_str())
    }

    pub fn is_assembly(&self, label: Label) -> bool {
        matches!(
            self.label(label).map(|l| &l.kind),
            Some(LabelKind::Assembly(_))
        )
    }

    /// 装配体的组件，非装配体返回空
    pub fn components(&self, label: Label) -> &[Label] {
        match self.label(label).map(|l| &l.kind) {
            Some(LabelKind::Assembly(components)) => components,
            _ => &[],
        }
    }

    /// 标签对应的形状；装配体展开为组件形状的组合，空装配体没有形状
    pub fn shape(&self, label: Label) -> Option<Shape> {
        match &self.label(label)?.kind {
            LabelKind::Simple(shape) => Some(shape.clone()),
            LabelKind::Assembly(components) => {
                let shapes: Vec<Shape> =
                    components.iter().filter_map(|&c| self.shape(c)).collect();
                if shapes.is_empty() {
                    None
                } else {
                    Some(Shape::Compound(shapes))
                }
            }
        }
    }

    /// 顶层自由形状
    pub fn free_shapes(&self) -> Vec<Label> {
        let mut referenced = vec![false; self.labels.len()];
        for label in &self.labels {
            if let LabelKind::Assembly(components) = &label.kind {
                for c in components {
                    referenced[c.0] = true;
                }
            }
        }
        (0..self.labels.len())
            .filter(|&i| !referenced[i])
            .map(Label)
            .collect()
    }

    /// 有多个顶层自由形状时，新建一个装配体根节点把它们作为组件
    pub fn create_root_assembly(&mut self, name: impl Into<String>) -> Option<Label> {
        let free = self.free_shapes();
        if free.len() <= 1 {
            return None;
        }
        let root = self.new_assembly(name);
        for label in free {
            self.add_component(root, label);
        }
        Some(root)
    }

    /// 所有顶层自由形状的整体形状（多于一个时为组合）
    pub fn whole_shape(&self) -> Option<Shape> {
        let shapes = self
            .free_shapes()
            .into_iter()
            .filter_map(|l| self.shape(l))
            .collect();
        Shape::from_shapes(shapes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Point3, Vector3};
    use crate::shape::{ShapeType, Solid};

    fn cube(x: f64) -> Shape {
        Shape::Solid(Solid::make_box(Point3::origin(), 1.0, 1.0, 1.0))
            .translated(&Vector3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_free_shapes_and_root_assembly() {
        let mut doc = XdeDocument::new();
        let a = doc.new_shape(cube(0.0), "a");
        let b = doc.new_shape(cube(3.0), "b");
        assert_eq!(doc.free_shapes(), vec![a, b]);

        let root = doc.create_root_assembly("part").expect("two free shapes");
        assert_eq!(doc.free_shapes(), vec![root]);
        assert_eq!(doc.components(root), &[a, b]);
        assert_eq!(doc.name(root), Some("part"));

        let whole = doc.whole_shape().expect("whole shape");
        assert_eq!(whole.shape_type(), ShapeType::Compound);
        assert_eq!(whole.solids().len(), 2);
    }

    #[test]
    fn test_single_free_shape_has_no_root_assembly() {
        let mut doc = XdeDocument::new();
        doc.new_shape(cube(0.0), "a");
        assert!(doc.create_root_assembly("part").is_none());
        assert_eq!(doc.whole_shape().map(|s| s.shape_type()), Some(ShapeType::Solid));
    }

    #[test]
    fn test_add_component_rejects_cycles() {
        let mut doc = XdeDocument::new();
        let outer = doc.new_assembly("outer");
        let inner = doc.new_assembly("inner");
        let leaf = doc.new_shape(cube(0.0), "leaf");
        assert!(doc.add_component(outer, inner));
        assert!(doc.add_component(inner, leaf));
        assert!(!doc.add_component(inner, outer));
        assert!(!doc.add_component(leaf, inner));
        assert!(doc.is_assembly(outer));
        assert_eq!(doc.free_shapes(), vec![outer]);
    }

    #[test]
    fn test_empty_assembly_has_no_shape() {
        let mut doc = XdeDocument::new();
        let asm = doc.new_assembly("empty");
        assert!(doc.shape(asm).is_none());
        assert!(doc.whole_shape().is_none());
    }
}
