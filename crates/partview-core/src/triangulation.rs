//! 三角网格

use crate::math::{Point3, Vector3};
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 三角网格：共享节点 + 索引三角形
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Triangulation {
    nodes: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
}

impl Triangulation {
    pub fn new(nodes: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
        Self { nodes, triangles }
    }

    pub fn nodes(&self) -> &[Point3] {
        &self.nodes
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nb_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// 三角形的三个顶点
    pub fn triangle_points(&self, index: usize) -> Option<[Point3; 3]> {
        let [a, b, c] = *self.triangles.get(index)?;
        Some([
            *self.nodes.get(a as usize)?,
            *self.nodes.get(b as usize)?,
            *self.nodes.get(c as usize)?,
        ])
    }

    /// 三角形单位法向量，退化三角形返回零向量
    pub fn triangle_normal(&self, index: usize) -> Vector3 {
        self.triangle_points(index)
            .and_then(|[a, b, c]| (b - a).cross(&(c - a)).try_normalize(f64::EPSILON))
            .unwrap_or_else(Vector3::zeros)
    }

    /// 表面积
    pub fn area(&self) -> f64 {
        (0..self.triangles.len())
            .filter_map(|i| self.triangle_points(i))
            .map(|[a, b, c]| 0.5 * (b - a).cross(&(c - a)).norm())
            .sum()
    }

    /// 有向体积，对开放网格没有几何意义
    pub fn volume(&self) -> f64 {
        (0..self.triangles.len())
            .filter_map(|i| self.triangle_points(i))
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)) / 6.0)
            .sum()
    }

    /// 形状所有面的扇形三角剖分
    pub fn from_shape(shape: &Shape) -> Self {
        let mut builder = TriangulationBuilder::default();
        for face in shape.faces() {
            for tri in face.triangles() {
                builder.add_triangle(tri);
            }
        }
        builder.build()
    }
}

/// 逐个三角形构建网格，完全相同的顶点合并为一个节点
#[derive(Debug, Default)]
pub struct TriangulationBuilder {
    nodes: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
    index: HashMap<[u64; 3], u32>,
}

impl TriangulationBuilder {
    pub fn with_capacity(nb_triangles: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nb_triangles / 2),
            triangles: Vec::with_capacity(nb_triangles),
            index: HashMap::with_capacity(nb_triangles / 2),
        }
    }

    fn node(&mut self, p: Point3) -> u32 {
        let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.nodes.len() as u32;
        self.nodes.push(p);
        self.index.insert(key, i);
        i
    }

    pub fn add_triangle(&mut self, [a, b, c]: [Point3; 3]) {
        let tri = [self.node(a), self.node(b), self.node(c)];
        self.triangles.push(tri);
    }

    pub fn nb_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn build(self) -> Triangulation {
        Triangulation::new(self.nodes, self.triangles)
    }
}
