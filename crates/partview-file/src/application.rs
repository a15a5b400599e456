//! 导入导出入口
//!
//! 按格式把调用分派给对应的适配器。应用本身只保存选项和共享的转换会话，
//! 每次调用都用当前选项构造一个新的适配器。

use crate::application_item::ApplicationItem;
use crate::document::Document;
use crate::error::{IoError, IoResult};
use crate::format::{find_part_format, PartFormat};
use crate::io::{Reader, Writer};
use crate::io_iges::IgesIo;
use crate::io_occ_brep::OccBrepIo;
use crate::io_step::StepIo;
use crate::io_stl::StlIo;
use crate::options::{ExportOptions, Options};
use crate::progress::TaskProgress;
use crate::session::TransferSession;
use std::path::Path;
use tracing::info;

/// 导入导出分派器
#[derive(Debug, Clone, Default)]
pub struct Application {
    session: TransferSession,
    options: Options,
}

impl Application {
    pub fn new(options: Options) -> Self {
        Self {
            session: TransferSession::new(),
            options,
        }
    }

    /// 与其他应用共用同一个转换会话
    pub fn with_session(session: TransferSession, options: Options) -> Self {
        Self { session, options }
    }

    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// 把文件导入文档
    ///
    /// 成功时追加零个或多个根条目；失败时文档中已加入的条目保留。
    pub fn import_in_document(
        &self,
        doc: &mut Document,
        format: PartFormat,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        set_file_step(path, progress);
        info!("Import {} as {}", path.display(), format);
        let result = match format {
            PartFormat::Iges => self.iges().read(doc, path, progress),
            PartFormat::Step => self.step().read(doc, path, progress),
            PartFormat::OccBrep => self.occ_brep().read(doc, path, progress),
            PartFormat::Stl => self.stl(&self.options.export).read(doc, path, progress),
            PartFormat::Unknown => Err(IoError::UnknownFormat),
        };
        if result.is_ok() {
            doc.set_file_path(path);
        }
        result
    }

    /// 识别文件格式后导入
    pub fn import_file(
        &self,
        doc: &mut Document,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult<PartFormat> {
        let format = find_part_format(path);
        self.import_in_document(doc, format, path, progress)?;
        Ok(format)
    }

    /// 把选中对象导出到文件
    pub fn export_document_items(
        &self,
        selection: &[ApplicationItem<'_>],
        format: PartFormat,
        export_options: &ExportOptions,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        set_file_step(path, progress);
        info!(
            "Export {} item(s) to {} as {}",
            selection.len(),
            path.display(),
            format
        );
        match format {
            PartFormat::Iges => self.iges().write(selection, path, progress),
            PartFormat::Step => self.step().write(selection, path, progress),
            PartFormat::OccBrep => self.occ_brep().write(selection, path, progress),
            PartFormat::Stl => self.stl(export_options).write(selection, path, progress),
            PartFormat::Unknown => Err(IoError::UnknownFormat),
        }
    }

    fn iges(&self) -> IgesIo {
        let mut io = IgesIo::new(self.session.clone());
        io.read_options = self.options.iges_read;
        io.write_options = self.options.iges_write;
        io
    }

    fn step(&self) -> StepIo {
        let mut io = StepIo::new(self.session.clone());
        io.read_options = self.options.step_read;
        io.write_options = self.options.step_write;
        io
    }

    fn occ_brep(&self) -> OccBrepIo {
        OccBrepIo::new(self.session.clone())
    }

    fn stl(&self, export_options: &ExportOptions) -> StlIo {
        StlIo::new(self.options.stl_io_library, export_options.clone())
    }
}

fn set_file_step(path: &Path, progress: Option<&dyn TaskProgress>) {
    if let Some(progress) = progress {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        progress.set_step(&name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MeshItem;
    use crate::options::{StlFormat, StlIoLibrary};
    use crate::progress::Progress;
    use partview_core::math::Point3;
    use partview_core::shape::{Shape, Solid};
    use partview_core::triangulation::Triangulation;

    fn mesh_document() -> Document {
        let shape = Shape::Solid(Solid::make_box(Point3::origin(), 1.0, 2.0, 3.0));
        let mut doc = Document::new();
        doc.add_root_item(MeshItem::new("block", Triangulation::from_shape(&shape)));
        doc
    }

    #[test]
    fn test_unknown_format() {
        let app = Application::default();
        let progress = Progress::new();
        let path = Path::new("/nonexistent/part.xyz");
        let mut doc = Document::new();

        let err = app
            .import_in_document(&mut doc, PartFormat::Unknown, path, Some(&progress))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown error");
        assert_eq!(progress.step(), "part.xyz");
        assert!(doc.is_empty());

        let err = app
            .export_document_items(&[], PartFormat::Unknown, &ExportOptions::default(), path, None)
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown error");
    }

    #[test]
    fn test_import_file_sniffs_format() {
        let doc = mesh_document();
        let path = std::env::temp_dir().join("partview_application_sniff.data");
        let mut app = Application::default();
        app.options_mut().stl_io_library = StlIoLibrary::Kernel;
        let export = ExportOptions {
            stl_format: StlFormat::Ascii,
            ..Default::default()
        };
        app.export_document_items(&[ApplicationItem::from(&doc)], PartFormat::Stl, &export, &path, None)
            .expect("export");

        let mut target = Document::new();
        let format = app.import_file(&mut target, &path, None).expect("import");
        assert_eq!(format, PartFormat::Stl);
        assert_eq!(target.nb_root_items(), 1);
        assert_eq!(target.file_path(), Some(path.as_path()));
        assert_eq!(target.root_items()[0].label(), "partview_application_sniff");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_export_options_passed_per_call() {
        let doc = mesh_document();
        let path = std::env::temp_dir().join("partview_application_options.stl");
        let mut app = Application::default();
        app.options_mut().stl_io_library = StlIoLibrary::Kernel;

        for (format, ascii) in [(StlFormat::Ascii, true), (StlFormat::Binary, false)] {
            let export = ExportOptions {
                stl_format: format,
                ..Default::default()
            };
            app.export_document_items(&[ApplicationItem::from(&doc)], PartFormat::Stl, &export, &path, None)
                .expect("export");
            let bytes = std::fs::read(&path).expect("read back");
            assert_eq!(bytes.starts_with(b"solid"), ascii);
        }
        std::fs::remove_file(&path).ok();
    }
}
