//! 交换格式编解码
//!
//! - [`step`]：ISO 10303-21 物理文件，面片化边界表示
//! - [`iges`]：IGES 5.3 固定 80 列文件
//! - [`brep`]：内核原生文本格式
//! - [`stl`]：单网格 STL 读写
//!
//! STEP 与 IGES 读写器都带 XDE 文档转换，接口为 [`CafReader`] / [`CafWriter`]，
//! 结果以 [`ReturnStatus`] 报告。它们读取 [`InterfaceStatic`] 中的调参变量，
//! 进度通过轮询式 [`ProgressIndicator`] 报告。

pub mod brep;
pub mod iges;
pub mod step;
pub mod stl;

use crate::message::ProgressIndicator;
use crate::statics::InterfaceStatic;
use crate::xde::{Label, XdeDocument};
use std::path::Path;

/// 读写操作状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnStatus {
    /// 没有可处理的数据
    Void,
    /// 成功
    Done,
    /// 数据错误（语法或结构）
    Error,
    /// 执行失败（文件无法打开、转换失败）
    Fail,
    /// 被中断
    Stop,
}

/// 读取时转换哪些附加属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderModes {
    /// 产品或实体名称写入 XDE 标签
    pub name: bool,
}

impl Default for ReaderModes {
    fn default() -> Self {
        Self { name: true }
    }
}

/// 读取文件并转换到 XDE 文档
pub trait CafReader {
    fn set_modes(&mut self, modes: ReaderModes);

    /// 加载并解析文件
    fn read_file(
        &mut self,
        path: &Path,
        statics: &InterfaceStatic,
        indicator: &mut dyn ProgressIndicator,
    ) -> ReturnStatus;

    /// 把已加载的模型转换到文档，没有任何形状被转换时返回 `false`
    fn transfer(
        &mut self,
        doc: &mut XdeDocument,
        statics: &InterfaceStatic,
        indicator: &mut dyn ProgressIndicator,
    ) -> bool;
}

/// 从 XDE 文档构建模型并写入文件
pub trait CafWriter {
    /// 转换单个标签
    fn transfer_label(
        &mut self,
        doc: &XdeDocument,
        label: Label,
        statics: &InterfaceStatic,
        indicator: &mut dyn ProgressIndicator,
    ) -> bool;

    /// 转换文档的全部顶层自由形状
    fn transfer_document(
        &mut self,
        doc: &XdeDocument,
        statics: &InterfaceStatic,
        indicator: &mut dyn ProgressIndicator,
    ) -> bool {
        doc.free_shapes()
            .into_iter()
            .all(|label| self.transfer_label(doc, label, statics, indicator))
    }

    /// 写出模型
    fn write(
        &mut self,
        path: &Path,
        statics: &InterfaceStatic,
        indicator: &mut dyn ProgressIndicator,
    ) -> ReturnStatus;
}

/// 转换到写出模型的一个形状
#[derive(Debug, Clone)]
pub(crate) struct ModelShape {
    pub name: String,
    pub shape: crate::shape::Shape,
}

/// 把形状分解为面片化的实体、壳和面
pub(crate) enum Piece<'a> {
    Closed(&'a [crate::shape::Face]),
    Open(&'a [crate::shape::Face]),
}

pub(crate) fn pieces(shape: &crate::shape::Shape) -> Vec<Piece<'_>> {
    use crate::shape::Shape;
    match shape {
        Shape::Solid(solid) => vec![Piece::Closed(solid.shell().faces())],
        Shape::Shell(shell) => vec![Piece::Open(shell.faces())],
        Shape::Face(face) => vec![Piece::Open(std::slice::from_ref(face))],
        Shape::Compound(children) => children.iter().flat_map(pieces).collect(),
    }
}
