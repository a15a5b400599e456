//! 内核原生 BREP 导入导出
//!
//! 内核只返回成功与否，所有失败都报告为 [`IoError::Unknown`]。

use crate::application_item::{xde_export_items, ApplicationItem, XdeExportItem};
use crate::bridge::OccProgressIndicator;
use crate::document::{base_name, Document, WholeShapeItem};
use crate::error::{IoError, IoResult};
use crate::io::{Reader, Writer};
use crate::progress::TaskProgress;
use crate::session::TransferSession;
use partview_core::exchange::brep;
use partview_core::message::ProgressRange;
use partview_core::shape::Shape;
use partview_core::xde::XdeDocument;
use std::path::Path;
use tracing::{info, warn};

/// BREP 适配器，读写期间独占转换会话
#[derive(Debug, Clone, Default)]
pub struct OccBrepIo {
    session: TransferSession,
}

impl OccBrepIo {
    pub fn new(session: TransferSession) -> Self {
        Self { session }
    }
}

impl Reader for OccBrepIo {
    fn read(
        &self,
        doc: &mut Document,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        info!("Importing BREP file {}", path.display());
        let _guard = self.session.lock();
        let mut indicator = OccProgressIndicator::new(progress);
        let Some(shape) = brep::read(path, ProgressRange::new(&mut indicator)) else {
            warn!("Cannot read BREP file {}", path.display());
            return Err(IoError::Unknown);
        };

        let label = base_name(path);
        let mut xde = XdeDocument::new();
        xde.new_shape(shape, label.clone());
        doc.add_root_item(WholeShapeItem::new(label, xde));
        Ok(())
    }
}

impl Writer for OccBrepIo {
    fn write(
        &self,
        selection: &[ApplicationItem<'_>],
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        info!("Exporting BREP file {}", path.display());
        let _guard = self.session.lock();

        let mut shapes = Vec::new();
        for item in xde_export_items(selection) {
            match item {
                XdeExportItem::WholeShape(item) => shapes.extend(
                    item.xde()
                        .free_shapes()
                        .into_iter()
                        .filter_map(|label| item.xde().shape(label)),
                ),
                XdeExportItem::Node(node) => shapes.extend(node.shape()),
            }
        }
        let shape = Shape::from_shapes(shapes);

        let mut indicator = OccProgressIndicator::new(progress);
        if brep::write(shape.as_ref(), path, ProgressRange::new(&mut indicator)) {
            Ok(())
        } else {
            warn!("Cannot write BREP file {}", path.display());
            Err(IoError::Unknown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{find_part_format, PartFormat};
    use crate::progress::Progress;
    use partview_core::math::Point3;
    use partview_core::shape::Solid;

    fn two_boxes() -> Document {
        let mut xde = XdeDocument::new();
        xde.new_shape(Shape::Solid(Solid::make_box(Point3::origin(), 1.0, 2.0, 3.0)), "a");
        xde.new_shape(Shape::Solid(Solid::make_box(Point3::new(4.0, 0.0, 0.0), 1.0, 1.0, 1.0)), "b");
        let mut doc = Document::new();
        doc.add_root_item(WholeShapeItem::new("pair", xde));
        doc
    }

    #[test]
    fn test_brep_roundtrip_keeps_metrics() {
        let path = std::env::temp_dir().join("partview_io_brep_roundtrip.brep");
        let source = two_boxes();
        let original = source.root_items()[0].clone();

        let brep = OccBrepIo::default();
        let progress = Progress::new();
        brep.write(&[ApplicationItem::from(&original)], &path, Some(&progress))
            .expect("write");
        assert_eq!(progress.value(), 100);
        assert_eq!(find_part_format(&path), PartFormat::OccBrep);

        let mut doc = Document::new();
        brep.read(&mut doc, &path, Some(&progress)).expect("read");
        let item = &doc.root_items()[0];
        assert_eq!(item.label(), "partview_io_brep_roundtrip");
        assert!((item.area() - original.area()).abs() < 1e-9);
        assert!((item.volume() - original.volume()).abs() < 1e-9);
        assert_eq!(progress.step(), "Reading BREP");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_failure_is_unknown_error() {
        let path = std::env::temp_dir().join("partview_io_brep_bad.brep");
        std::fs::write(&path, "DBRep_DrawableShape\ngarbage").expect("write");
        let mut doc = Document::new();
        let err = OccBrepIo::default().read(&mut doc, &path, None).unwrap_err();
        assert_eq!(err.to_string(), "Unknown Error");
        assert!(doc.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_empty_selection_writes_null_shape() {
        let path = std::env::temp_dir().join("partview_io_brep_null.brep");
        let brep = OccBrepIo::default();
        brep.write(&[], &path, None).expect("write");
        let mut doc = Document::new();
        assert!(brep.read(&mut doc, &path, None).is_err());
        std::fs::remove_file(&path).ok();
    }
}
