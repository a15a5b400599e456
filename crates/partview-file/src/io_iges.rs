//! IGES 导入导出

use crate::application_item::ApplicationItem;
use crate::document::Document;
use crate::error::IoResult;
use crate::io::{export_xde, import_xde, Reader, Writer};
use crate::options::{IgesReadOptions, IgesWriteOptions};
use crate::progress::TaskProgress;
use crate::session::TransferSession;
use partview_core::exchange::iges::{self, IgesCafReader, IgesCafWriter};
use std::path::Path;
use tracing::info;

/// IGES 适配器，读写期间独占转换会话
#[derive(Debug, Clone, Default)]
pub struct IgesIo {
    session: TransferSession,
    pub read_options: IgesReadOptions,
    pub write_options: IgesWriteOptions,
}

impl IgesIo {
    pub fn new(session: TransferSession) -> Self {
        Self {
            session,
            read_options: IgesReadOptions::default(),
            write_options: IgesWriteOptions::default(),
        }
    }
}

impl Reader for IgesIo {
    fn read(
        &self,
        doc: &mut Document,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        info!("Importing IGES file {}", path.display());
        let mut guard = self.session.lock();
        iges::init_statics(guard.statics_mut());
        let mut rollback = guard.rollback();
        self.read_options.apply(&mut rollback);

        let mut reader = IgesCafReader::new();
        import_xde(&mut reader, doc, path, rollback.statics(), progress)
    }
}

impl Writer for IgesIo {
    fn write(
        &self,
        selection: &[ApplicationItem<'_>],
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        info!("Exporting IGES file {}", path.display());
        let mut guard = self.session.lock();
        iges::init_statics(guard.statics_mut());
        let mut rollback = guard.rollback();
        self.write_options.apply(&mut rollback);

        let mut writer = IgesCafWriter::new();
        export_xde(&mut writer, selection, path, rollback.statics(), progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_item::XdeAssemblyNode;
    use crate::document::WholeShapeItem;
    use crate::error::IoError;
    use crate::format::{find_part_format, PartFormat};
    use crate::progress::Progress;
    use partview_core::exchange::ReturnStatus;
    use partview_core::math::Point3;
    use partview_core::shape::{Shape, Solid};
    use partview_core::units::LengthUnit;
    use partview_core::xde::XdeDocument;

    fn boxes_document() -> Document {
        let mut xde = XdeDocument::new();
        xde.new_shape(Shape::Solid(Solid::make_box(Point3::origin(), 1.0, 2.0, 3.0)), "first");
        xde.new_shape(Shape::Solid(Solid::make_box(Point3::new(5.0, 0.0, 0.0), 2.0, 2.0, 2.0)), "second");
        let mut doc = Document::new();
        doc.add_root_item(WholeShapeItem::new("boxes", xde));
        doc
    }

    #[test]
    fn test_iges_roundtrip_in_inches() {
        let path = std::env::temp_dir().join("partview_io_iges_roundtrip.igs");
        let source = boxes_document();

        let mut iges = IgesIo::default();
        iges.write_options.length_unit = LengthUnit::Inch;
        iges.write(&[ApplicationItem::from(&source)], &path, None)
            .expect("write");
        assert_eq!(find_part_format(&path), PartFormat::Iges);

        let progress = Progress::new();
        let mut doc = Document::new();
        iges.read(&mut doc, &path, Some(&progress)).expect("read");
        let item = doc.root_items()[0].as_whole_shape().expect("whole shape");
        assert!((item.volume() - 14.0).abs() < 1e-6);
        assert_eq!(progress.value(), 100);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_export_assembly_node() {
        let path = std::env::temp_dir().join("partview_io_iges_node.igs");
        let source = boxes_document();
        let owner = source.root_items()[0].as_whole_shape().expect("whole shape");
        let root = owner.xde().free_shapes()[0];
        let node = XdeAssemblyNode {
            owner,
            label: owner.xde().components(root)[1],
        };

        let iges = IgesIo::default();
        iges.write(&[ApplicationItem::from(node)], &path, None).expect("write");

        let mut doc = Document::new();
        iges.read(&mut doc, &path, None).expect("read");
        assert!((doc.root_items()[0].volume() - 8.0).abs() < 1e-6);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_structure_error() {
        let path = std::env::temp_dir().join("partview_io_iges_bad.igs");
        std::fs::write(&path, "not an iges file\n").expect("write");
        let mut doc = Document::new();
        let err = IgesIo::default().read(&mut doc, &path, None).unwrap_err();
        assert!(matches!(err, IoError::Status(ReturnStatus::Error)));
        assert_eq!(err.to_string(), "Syntax or structure error in file");
        assert!(doc.is_empty());
        std::fs::remove_file(&path).ok();
    }
}
