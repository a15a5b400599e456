//! 质量属性
//!
//! 面积与体积都是可加的：组合形状的结果等于各子形状结果之和。

use crate::shape::{Face, Shape};
use rayon::prelude::*;

/// 超过该面数时并行求和
const PARALLEL_THRESHOLD: usize = 1024;

/// 表面积
pub fn surface_area(shape: &Shape) -> f64 {
    let faces = shape.faces();
    if faces.len() >= PARALLEL_THRESHOLD {
        faces.par_iter().map(|f| f.area()).sum()
    } else {
        faces.iter().map(|f| f.area()).sum()
    }
}

/// 体积，只统计实体
///
/// 朝向错误的实体会得到负值，调用方自行决定是否截断。
pub fn volume(shape: &Shape) -> f64 {
    shape
        .solids()
        .iter()
        .map(|solid| faces_volume(solid.shell().faces()))
        .sum()
}

fn faces_volume(faces: &[Face]) -> f64 {
    if faces.len() >= PARALLEL_THRESHOLD {
        faces.par_iter().map(Face::signed_volume).sum()
    } else {
        faces.iter().map(Face::signed_volume).sum()
    }
}
