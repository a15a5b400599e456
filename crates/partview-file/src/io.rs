//! 读写适配器接口
//!
//! 每种格式一个适配器，对调用方暴露相同的读写约定：
//! 读取把零个或多个条目追加到文档，写出把选中对象写入文件，
//! 外部编解码器的失败都在适配器内转换为 [`IoError`]。

use crate::application_item::{xde_export_items, ApplicationItem, XdeExportItem};
use crate::bridge::OccProgress;
use crate::document::{base_name, Document, WholeShapeItem};
use crate::error::{IoError, IoResult};
use crate::progress::TaskProgress;
use partview_core::exchange::{CafReader, CafWriter, ReaderModes, ReturnStatus};
use partview_core::message::ProgressIndicator;
use partview_core::statics::InterfaceStatic;
use partview_core::xde::XdeDocument;
use std::path::Path;
use tracing::{debug, warn};

/// 读取适配器
pub trait Reader {
    fn read(
        &self,
        doc: &mut Document,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult;
}

/// 写出适配器
pub trait Writer {
    fn write(
        &self,
        selection: &[ApplicationItem<'_>],
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult;
}

/// 用 XDE 读取器导入文件
///
/// 加载占 30%，转换占 70%。成功时文档增加一个整体形状条目。
pub(crate) fn import_xde<R: CafReader>(
    reader: &mut R,
    doc: &mut Document,
    path: &Path,
    statics: &InterfaceStatic,
    progress: Option<&dyn TaskProgress>,
) -> IoResult {
    let mut indicator = OccProgress::new(progress);
    let mut xde = XdeDocument::new();
    reader.set_modes(ReaderModes::default());

    indicator.new_scope(30.0, "Loading file");
    let mut status = reader.read_file(path, statics, &mut indicator);
    indicator.end_scope();

    if status == ReturnStatus::Done {
        indicator.new_scope(70.0, "Translating file");
        if !reader.transfer(&mut xde, statics, &mut indicator) {
            status = ReturnStatus::Fail;
        }
        indicator.end_scope();
    }

    if status != ReturnStatus::Done {
        warn!("Cannot import {}: {:?}", path.display(), status);
        return Err(IoError::Status(status));
    }

    let item = WholeShapeItem::new(base_name(path), xde);
    debug!(
        "Imported {} (area {:.3}, volume {:.3})",
        item.label(),
        item.area(),
        item.volume()
    );
    doc.add_root_item(item);
    Ok(())
}

/// 用 XDE 写出器导出选中对象
pub(crate) fn export_xde<W: CafWriter>(
    writer: &mut W,
    selection: &[ApplicationItem<'_>],
    path: &Path,
    statics: &InterfaceStatic,
    progress: Option<&dyn TaskProgress>,
) -> IoResult {
    let mut indicator = OccProgress::new(progress);
    for item in xde_export_items(selection) {
        let transferred = match item {
            XdeExportItem::WholeShape(item) => {
                writer.transfer_document(item.xde(), statics, &mut indicator)
            }
            XdeExportItem::Node(node) => {
                writer.transfer_label(node.owner.xde(), node.label, statics, &mut indicator)
            }
        };
        if !transferred {
            warn!("Cannot transfer item to {}", path.display());
            return Err(IoError::Transfer);
        }
    }

    let status = writer.write(path, statics, &mut indicator);
    if status != ReturnStatus::Done {
        warn!("Cannot write {}: {:?}", path.display(), status);
        return Err(IoError::Status(status));
    }
    Ok(())
}
