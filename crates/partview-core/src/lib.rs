//! PartView 几何内核
//!
//! 提供面片化边界表示（B-Rep）、三角网格、XDE 装配文档以及各交换格式的读写器。
//!
//! # 架构设计
//!
//! - `shape`: 面、壳、实体和复合体组成的形状树
//! - `xde`: 带名称和装配结构的形状文档
//! - `statics`: 交换格式的全局调参变量
//! - `message`: 读写过程的进度报告接口
//! - `exchange`: STEP / IGES / BREP / STL 编解码
//!
//! # 示例
//!
//! ```rust
//! use partview_core::prelude::*;
//!
//! let solid = Solid::make_box(Point3::origin(), 10.0, 20.0, 30.0);
//! let shape = Shape::Solid(solid);
//! println!("Volume: {}", partview_core::props::volume(&shape));
//! ```

pub mod exchange;
pub mod math;
pub mod message;
pub mod props;
pub mod shape;
pub mod statics;
pub mod triangulation;
pub mod units;
pub mod xde;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::exchange::{CafReader, CafWriter, ReaderModes, ReturnStatus};
    pub use crate::math::{Point3, Vector3};
    pub use crate::message::{
        NullProgressIndicator, ProgressIndicator, ProgressRange, ProgressScope, ProgressSentry,
        ScopeIndicator,
    };
    pub use crate::shape::{Face, Shape, ShapeType, Shell, Solid};
    pub use crate::statics::{InterfaceStatic, StaticValue};
    pub use crate::triangulation::Triangulation;
    pub use crate::units::LengthUnit;
    pub use crate::xde::{Label, XdeDocument};
}
