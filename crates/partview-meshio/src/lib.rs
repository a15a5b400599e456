//! PartView 流式网格编解码
//!
//! 面向大网格的 STL 读写：
//! - 一个流中连续存放的多个实体逐个读取
//! - 文本格式可控制浮点数写法和精度
//! - 通过 [`TaskIface`] 报告进度并响应停止请求
//! - 错误带稳定的数值代码（[`Error::code`]）

pub mod error;
pub mod stl;
pub mod task;

pub use error::{Error, Result};
pub use task::TaskIface;
