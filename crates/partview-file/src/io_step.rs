//! STEP 导入导出

use crate::application_item::ApplicationItem;
use crate::document::Document;
use crate::error::IoResult;
use crate::io::{export_xde, import_xde, Reader, Writer};
use crate::options::{StepReadOptions, StepWriteOptions};
use crate::progress::TaskProgress;
use crate::session::TransferSession;
use partview_core::exchange::step::{self, StepCafReader, StepCafWriter};
use std::path::Path;
use tracing::info;

/// STEP 适配器，读写期间独占转换会话
#[derive(Debug, Clone, Default)]
pub struct StepIo {
    session: TransferSession,
    pub read_options: StepReadOptions,
    pub write_options: StepWriteOptions,
}

impl StepIo {
    pub fn new(session: TransferSession) -> Self {
        Self {
            session,
            read_options: StepReadOptions::default(),
            write_options: StepWriteOptions::default(),
        }
    }
}

impl Reader for StepIo {
    fn read(
        &self,
        doc: &mut Document,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        info!("Importing STEP file {}", path.display());
        let mut guard = self.session.lock();
        step::init_statics(guard.statics_mut());
        let mut rollback = guard.rollback();
        self.read_options.apply(&mut rollback);

        let mut reader = StepCafReader::new();
        import_xde(&mut reader, doc, path, rollback.statics(), progress)
    }
}

impl Writer for StepIo {
    fn write(
        &self,
        selection: &[ApplicationItem<'_>],
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        info!("Exporting STEP file {}", path.display());
        let mut guard = self.session.lock();
        step::init_statics(guard.statics_mut());
        let mut rollback = guard.rollback();
        self.write_options.apply(&mut rollback);

        let mut writer = StepCafWriter::new();
        export_xde(&mut writer, selection, path, rollback.statics(), progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::WholeShapeItem;
    use crate::error::IoError;
    use crate::options::{StepEncoding, StepSchema};
    use crate::progress::Progress;
    use partview_core::exchange::ReturnStatus;
    use partview_core::math::Point3;
    use partview_core::shape::{Shape, Solid};
    use partview_core::xde::XdeDocument;

    fn boxes_item() -> WholeShapeItem {
        let mut xde = XdeDocument::new();
        xde.new_shape(Shape::Solid(Solid::make_box(Point3::origin(), 1.0, 2.0, 3.0)), "first");
        xde.new_shape(Shape::Solid(Solid::make_box(Point3::new(5.0, 0.0, 0.0), 2.0, 2.0, 2.0)), "second");
        WholeShapeItem::new("boxes", xde)
    }

    #[test]
    fn test_step_roundtrip() {
        let path = std::env::temp_dir().join("partview_io_step_roundtrip.step");
        let mut source = Document::new();
        source.add_root_item(boxes_item());

        let step = StepIo::default();
        let progress = Progress::new();
        step.write(&[ApplicationItem::from(&source)], &path, Some(&progress))
            .expect("write");

        let mut doc = Document::new();
        step.read(&mut doc, &path, Some(&progress)).expect("read");
        assert_eq!(doc.nb_root_items(), 1);
        let item = doc.root_items()[0].as_whole_shape().expect("whole shape");
        assert_eq!(item.label(), "partview_io_step_roundtrip");
        assert!((item.volume() - 14.0).abs() < 1e-6);
        assert_eq!(progress.value(), 100);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_options_restored_after_call() {
        let path = std::env::temp_dir().join("partview_io_step_options.step");
        let mut source = Document::new();
        source.add_root_item(boxes_item());

        let session = TransferSession::new();
        let mut step = StepIo::new(session.clone());
        step.write_options.schema = StepSchema::Ap203;
        step.read_options.encoding = StepEncoding::Sjis;
        step.write(&[ApplicationItem::from(&source)], &path, None).expect("write");
        let contents = std::fs::read_to_string(&path).expect("read back");
        assert!(contents.contains("CONFIG_CONTROL_DESIGN"));

        let mut doc = Document::new();
        step.read(&mut doc, &path, None).expect("read");

        let guard = session.lock();
        assert_eq!(guard.statics().ival("write.step.schema"), Some(1));
        assert_eq!(guard.statics().cval("read.step.codepage"), Some("UTF8"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_missing_file() {
        let mut doc = Document::new();
        let err = StepIo::default()
            .read(&mut doc, Path::new("/nonexistent/part.step"), None)
            .unwrap_err();
        assert!(matches!(err, IoError::Status(ReturnStatus::Fail)));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_read_aborted() {
        let path = std::env::temp_dir().join("partview_io_step_abort.step");
        let mut source = Document::new();
        source.add_root_item(boxes_item());
        let step = StepIo::default();
        step.write(&[ApplicationItem::from(&source)], &path, None).expect("write");

        let progress = Progress::new();
        progress.request_abort();
        let mut doc = Document::new();
        let err = step.read(&mut doc, &path, Some(&progress)).unwrap_err();
        assert_eq!(err.to_string(), "Translation stopped");
        assert!(doc.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_empty_selection() {
        let path = std::env::temp_dir().join("partview_io_step_empty.step");
        let err = StepIo::default().write(&[], &path, None).unwrap_err();
        assert_eq!(err.to_string(), "Nothing to translate");
        std::fs::remove_file(&path).ok();
    }
}
