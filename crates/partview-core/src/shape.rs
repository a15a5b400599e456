//! 形状拓扑
//!
//! 内核只处理平面多边形面构成的边界表示：
//! - 面 (Face)：一个平面多边形，顶点按右手法则朝外
//! - 壳 (Shell)：一组面
//! - 实体 (Solid)：由闭合壳围成的体
//! - 组合 (Compound)：任意形状的集合

use crate::math::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 形状类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Compound,
    Solid,
    Shell,
    Face,
}

impl ShapeType {
    /// 类型名称
    pub fn name(&self) -> &'static str {
        match self {
            ShapeType::Compound => "compound",
            ShapeType::Solid => "solid",
            ShapeType::Shell => "shell",
            ShapeType::Face => "face",
        }
    }

    /// 从类型名称解析
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "compound" => Some(ShapeType::Compound),
            "solid" => Some(ShapeType::Solid),
            "shell" => Some(ShapeType::Shell),
            "face" => Some(ShapeType::Face),
            _ => None,
        }
    }
}

/// 平面多边形面
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    vertices: Vec<Point3>,
}

impl Face {
    /// 创建面，至少需要三个顶点
    pub fn new(vertices: Vec<Point3>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        Some(Self { vertices })
    }

    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Newell 法向量，模长为面积的两倍
    fn newell(&self) -> Vector3 {
        let n = self.vertices.len();
        (0..n).fold(Vector3::zeros(), |acc, i| {
            let a = &self.vertices[i].coords;
            let b = &self.vertices[(i + 1) % n].coords;
            acc + a.cross(b)
        })
    }

    /// 单位法向量，退化面返回 `None`
    pub fn normal(&self) -> Option<Vector3> {
        self.newell().try_normalize(f64::EPSILON)
    }

    /// 面积
    pub fn area(&self) -> f64 {
        0.5 * self.newell().norm()
    }

    /// 相对原点的有向体积贡献（散度定理）
    pub fn signed_volume(&self) -> f64 {
        self.vertices[0].coords.dot(&self.newell()) / 6.0
    }

    /// 扇形三角剖分（假定面为凸多边形）
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        let p0 = self.vertices[0];
        self.vertices
            .windows(2)
            .skip(1)
            .map(move |w| [p0, w[0], w[1]])
    }

    /// 所有顶点平移
    pub fn translated(&self, offset: &Vector3) -> Self {
        Self {
            vertices: self.vertices.iter().map(|p| p + offset).collect(),
        }
    }
}

/// 壳
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shell {
    faces: Vec<Face>,
}

impl Shell {
    pub fn new(faces: Vec<Face>) -> Self {
        Self { faces }
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// 检查壳是否闭合：每条有向边都有且仅有一条反向边与之配对
    ///
    /// 顶点在 `tolerance` 网格上合并后比较。
    pub fn is_closed(&self, tolerance: f64) -> bool {
        if self.faces.is_empty() {
            return false;
        }

        let tolerance = tolerance.max(f64::EPSILON);
        let key = |p: &Point3| {
            [
                (p.x / tolerance).round() as i64,
                (p.y / tolerance).round() as i64,
                (p.z / tolerance).round() as i64,
            ]
        };

        let mut edges: HashMap<([i64; 3], [i64; 3]), i32> = HashMap::new();
        for face in &self.faces {
            let n = face.vertices.len();
            for i in 0..n {
                let a = key(&face.vertices[i]);
                let b = key(&face.vertices[(i + 1) % n]);
                if a == b {
                    continue;
                }
                *edges.entry((a, b)).or_insert(0) += 1;
            }
        }

        edges
            .iter()
            .all(|((a, b), count)| *count == 1 && edges.get(&(*b, *a)) == Some(&1))
    }
}

/// 实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    shell: Shell,
}

impl Solid {
    pub fn new(shell: Shell) -> Self {
        Self { shell }
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// 长方体，一个角点在 `origin`
    pub fn make_box(origin: Point3, dx: f64, dy: f64, dz: f64) -> Self {
        let p = |x: f64, y: f64, z: f64| origin + Vector3::new(x, y, z);
        let quad = |a, b, c, d| Face {
            vertices: vec![a, b, c, d],
        };
        let faces = vec![
            quad(p(0., 0., 0.), p(0., dy, 0.), p(dx, dy, 0.), p(dx, 0., 0.)),
            quad(p(0., 0., dz), p(dx, 0., dz), p(dx, dy, dz), p(0., dy, dz)),
            quad(p(0., 0., 0.), p(dx, 0., 0.), p(dx, 0., dz), p(0., 0., dz)),
            quad(p(0., dy, 0.), p(0., dy, dz), p(dx, dy, dz), p(dx, dy, 0.)),
            quad(p(0., 0., 0.), p(0., 0., dz), p(0., dy, dz), p(0., dy, 0.)),
            quad(p(dx, 0., 0.), p(dx, dy, 0.), p(dx, dy, dz), p(dx, 0., dz)),
        ];
        Self::new(Shell::new(faces))
    }
}

/// 形状
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Face(Face),
    Shell(Shell),
    Solid(Solid),
    Compound(Vec<Shape>),
}

impl Shape {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Face(_) => ShapeType::Face,
            Shape::Shell(_) => ShapeType::Shell,
            Shape::Solid(_) => ShapeType::Solid,
            Shape::Compound(_) => ShapeType::Compound,
        }
    }

    /// 把多个形状合并成一个：没有形状返回 `None`，一个形状原样返回，多个形状组成组合
    pub fn from_shapes(mut shapes: Vec<Shape>) -> Option<Shape> {
        match shapes.len() {
            0 => None,
            1 => shapes.pop(),
            _ => Some(Shape::Compound(shapes)),
        }
    }

    /// 递归收集所有面
    pub fn faces(&self) -> Vec<&Face> {
        let mut faces = Vec::new();
        self.collect_faces(&mut faces);
        faces
    }

    fn collect_faces<'a>(&'a self, out: &mut Vec<&'a Face>) {
        match self {
            Shape::Face(face) => out.push(face),
            Shape::Shell(shell) => out.extend(shell.faces()),
            Shape::Solid(solid) => out.extend(solid.shell().faces()),
            Shape::Compound(children) => {
                for child in children {
                    child.collect_faces(out);
                }
            }
        }
    }

    /// 递归收集所有实体
    pub fn solids(&self) -> Vec<&Solid> {
        match self {
            Shape::Solid(solid) => vec![solid],
            Shape::Compound(children) => children.iter().flat_map(|c| c.solids()).collect(),
            Shape::Face(_) | Shape::Shell(_) => Vec::new(),
        }
    }

    pub fn nb_faces(&self) -> usize {
        self.faces().len()
    }

    /// 整体平移
    pub fn translated(&self, offset: &Vector3) -> Self {
        let shell = |s: &Shell| Shell::new(s.faces().iter().map(|f| f.translated(offset)).collect());
        match self {
            Shape::Face(face) => Shape::Face(face.translated(offset)),
            Shape::Shell(s) => Shape::Shell(shell(s)),
            Shape::Solid(solid) => Shape::Solid(Solid::new(shell(solid.shell()))),
            Shape::Compound(children) => {
                Shape::Compound(children.iter().map(|c| c.translated(offset)).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    #[test]
    fn test_face_area_and_normal() {
        let face = Face::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 3.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
        ])
        .expect("valid face");
        assert!(approx_eq(face.area(), 6.0));
        let normal = face.normal().expect("non degenerate");
        assert!(approx_eq(normal.z, 1.0));
        assert_eq!(face.triangles().count(), 2);
    }

    #[test]
    fn test_face_requires_three_vertices() {
        assert!(Face::new(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)]).is_none());
    }

    #[test]
    fn test_box_shell_is_closed() {
        let solid = Solid::make_box(Point3::new(1.0, 2.0, 3.0), 1.0, 2.0, 3.0);
        assert!(solid.shell().is_closed(1e-7));

        let mut faces = solid.shell().faces().to_vec();
        faces.pop();
        assert!(!Shell::new(faces).is_closed(1e-7));
    }

    #[test]
    fn test_from_shapes() {
        let a = Shape::Solid(Solid::make_box(Point3::origin(), 1.0, 1.0, 1.0));
        let b = a.translated(&Vector3::new(5.0, 0.0, 0.0));

        assert!(Shape::from_shapes(Vec::new()).is_none());
        let single = Shape::from_shapes(vec![a.clone()]).expect("one shape");
        assert_eq!(single.shape_type(), ShapeType::Solid);

        let compound = Shape::from_shapes(vec![a, b]).expect("two shapes");
        assert_eq!(compound.shape_type(), ShapeType::Compound);
        assert_eq!(compound.nb_faces(), 12);
        assert_eq!(compound.solids().len(), 2);
    }
}
