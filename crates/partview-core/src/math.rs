//! 数学基础类型
//!
//! 基于 nalgebra 提供的向量和点类型的别名。

use nalgebra as na;

/// 3D点类型
pub type Point3 = na::Point3<f64>;

/// 3D向量类型
pub type Vector3 = na::Vector3<f64>;

/// 数值容差，用于几何比较
pub const EPSILON: f64 = 1e-10;

/// 判断两个浮点数是否近似相等
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// 在给定容差下判断两个3D点是否重合
#[inline]
pub fn points_coincide(a: &Point3, b: &Point3, tolerance: f64) -> bool {
    (a - b).norm() <= tolerance
}

/// 将 `[src_min, src_max]` 区间内的值线性映射到 `[dst_min, dst_max]`
pub fn mapped_value(value: f64, src_min: f64, src_max: f64, dst_min: f64, dst_max: f64) -> f64 {
    let src_span = src_max - src_min;
    if src_span.abs() < EPSILON {
        return dst_min;
    }
    dst_min + (value - src_min) * (dst_max - dst_min) / src_span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_value() {
        assert!(approx_eq(mapped_value(0.25, 0.0, 1.0, 0.0, 100.0), 25.0));
        assert!(approx_eq(mapped_value(5.0, 0.0, 10.0, 30.0, 100.0), 65.0));
        assert!(approx_eq(mapped_value(3.0, 1.0, 1.0, 0.0, 100.0), 0.0));
    }
}
