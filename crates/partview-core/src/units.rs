//! 长度单位
//!
//! 内核内部统一使用毫米存储坐标，只在交换格式读写时转换。
//! IGES 全局段用整数单位标志和单位名称描述文件单位（IGES 5.3 第 2.2.4.3 节）。

use serde::{Deserialize, Serialize};

/// 长度单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LengthUnit {
    /// 英寸
    Inch,
    /// 毫米 (默认)
    #[default]
    Millimeter,
    /// 英尺
    Foot,
    /// 英里
    Mile,
    /// 米
    Meter,
    /// 千米
    Kilometer,
    /// 密尔 (0.001 英寸)
    Mil,
    /// 微米
    Micron,
    /// 厘米
    Centimeter,
    /// 微英寸
    Microinch,
}

impl LengthUnit {
    /// 全部单位
    pub const ALL: [LengthUnit; 10] = [
        LengthUnit::Inch,
        LengthUnit::Millimeter,
        LengthUnit::Foot,
        LengthUnit::Mile,
        LengthUnit::Meter,
        LengthUnit::Kilometer,
        LengthUnit::Mil,
        LengthUnit::Micron,
        LengthUnit::Centimeter,
        LengthUnit::Microinch,
    ];

    /// 获取单位到毫米的转换因子
    pub fn to_mm_factor(&self) -> f64 {
        match self {
            LengthUnit::Inch => 25.4,
            LengthUnit::Millimeter => 1.0,
            LengthUnit::Foot => 304.8,
            LengthUnit::Mile => 1_609_344.0,
            LengthUnit::Meter => 1000.0,
            LengthUnit::Kilometer => 1_000_000.0,
            LengthUnit::Mil => 0.0254,
            LengthUnit::Micron => 0.001,
            LengthUnit::Centimeter => 10.0,
            LengthUnit::Microinch => 0.0000254,
        }
    }

    /// IGES 单位标志
    pub fn iges_flag(&self) -> i32 {
        match self {
            LengthUnit::Inch => 1,
            LengthUnit::Millimeter => 2,
            LengthUnit::Foot => 4,
            LengthUnit::Mile => 5,
            LengthUnit::Meter => 6,
            LengthUnit::Kilometer => 7,
            LengthUnit::Mil => 8,
            LengthUnit::Micron => 9,
            LengthUnit::Centimeter => 10,
            LengthUnit::Microinch => 11,
        }
    }

    /// IGES 单位名称，同时也是 `write.iges.unit` 静态变量的取值
    pub fn iges_name(&self) -> &'static str {
        match self {
            LengthUnit::Inch => "IN",
            LengthUnit::Millimeter => "MM",
            LengthUnit::Foot => "FT",
            LengthUnit::Mile => "MI",
            LengthUnit::Meter => "M",
            LengthUnit::Kilometer => "KM",
            LengthUnit::Mil => "MIL",
            LengthUnit::Micron => "UM",
            LengthUnit::Centimeter => "CM",
            LengthUnit::Microinch => "UIN",
        }
    }

    /// 从 IGES 单位标志解析
    pub fn from_iges_flag(flag: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.iges_flag() == flag)
    }

    /// 从 IGES 单位名称解析（忽略大小写）
    pub fn from_iges_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|u| u.iges_name().eq_ignore_ascii_case(name))
    }
}

/// 单位转换
pub fn convert(value: f64, from: LengthUnit, to: LengthUnit) -> f64 {
    if from == to {
        return value;
    }
    value * from.to_mm_factor() / to.to_mm_factor()
}
