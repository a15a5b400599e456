//! STL 导入导出
//!
//! 两种实现，由 [`StlIoLibrary`] 选择：
//! - 内核读写器：每个文件一个网格，只返回成功与否，一次只导出一个对象
//! - 流式网格库：一个文件可以连续存放多个实体，每读出一个实体立即加入文档，
//!   遇到第一个错误即停止，已加入的条目保留
//!
//! STL 读写不使用转换会话，可以与其他格式并发执行。

use crate::application_item::ApplicationItem;
use crate::bridge::OccProgressIndicator;
use crate::document::{base_name, Document, DocumentItem, DocumentItemId, MeshItem};
use crate::error::{IoError, IoResult};
use crate::io::{Reader, Writer};
use crate::options::{ExportOptions, StlFormat, StlIoLibrary};
use crate::progress::TaskProgress;
use partview_core::exchange::stl;
use partview_core::message::ProgressRange;
use partview_core::shape::Shape;
use partview_core::triangulation::Triangulation;
use std::path::Path;
use tracing::{info, warn};

/// STL 适配器
#[derive(Debug, Clone, Default)]
pub struct StlIo {
    pub library: StlIoLibrary,
    pub export_options: ExportOptions,
}

impl StlIo {
    pub fn new(library: StlIoLibrary, export_options: ExportOptions) -> Self {
        Self {
            library,
            export_options,
        }
    }
}

impl Reader for StlIo {
    fn read(
        &self,
        doc: &mut Document,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        info!("Importing STL file {} ({:?})", path.display(), self.library);
        let result = match self.library {
            StlIoLibrary::Kernel => read_kernel(doc, path, progress),
            StlIoLibrary::MeshIo => meshio::read(doc, path, progress),
        };
        if let Err(e) = &result {
            warn!("Cannot import {}: {}", path.display(), e);
        }
        result
    }
}

impl Writer for StlIo {
    fn write(
        &self,
        selection: &[ApplicationItem<'_>],
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        info!("Exporting STL file {} ({:?})", path.display(), self.library);
        let sources = stl_sources(selection);
        let result = match self.library {
            StlIoLibrary::Kernel => write_kernel(&sources, self.export_options.stl_format, path, progress),
            StlIoLibrary::MeshIo => meshio::write(&sources, &self.export_options, path, progress),
        };
        if let Err(e) = &result {
            warn!("Cannot export {}: {}", path.display(), e);
        }
        result
    }
}

/// 待写出的一个对象
enum StlSource<'a> {
    /// 整体形状或装配节点，空装配没有形状
    Shape { label: &'a str, shape: Option<Shape> },
    Mesh(&'a MeshItem),
}

impl StlSource<'_> {
    fn label(&self) -> &str {
        match self {
            StlSource::Shape { label, .. } => *label,
            StlSource::Mesh(item) => item.label(),
        }
    }

    fn triangulation(&self) -> Triangulation {
        match self {
            StlSource::Shape { shape, .. } => shape
                .as_ref()
                .map(Triangulation::from_shape)
                .unwrap_or_default(),
            StlSource::Mesh(item) => item.triangulation().clone(),
        }
    }
}

/// 把选择归约到可写出的对象，按选择顺序
///
/// 文档展开为其全部根条目；同一条目只出现一次；
/// 所属条目已被选中的装配节点被丢弃。
fn stl_sources<'a>(selection: &[ApplicationItem<'a>]) -> Vec<StlSource<'a>> {
    let mut selected: Vec<DocumentItemId> = Vec::new();
    for app_item in selection {
        match app_item {
            ApplicationItem::Document(doc) => {
                selected.extend(doc.root_items().iter().map(DocumentItem::id))
            }
            ApplicationItem::DocumentItem(item) => selected.push(item.id()),
            ApplicationItem::XdeAssemblyNode(_) => {}
        }
    }

    let mut seen: Vec<DocumentItemId> = Vec::new();
    let mut sources = Vec::new();
    let mut push_item = |item: &'a DocumentItem, sources: &mut Vec<StlSource<'a>>| {
        if seen.contains(&item.id()) {
            return;
        }
        seen.push(item.id());
        sources.push(match item {
            DocumentItem::WholeShape(item) => StlSource::Shape {
                label: item.label(),
                shape: item.whole_shape(),
            },
            DocumentItem::Mesh(item) => StlSource::Mesh(item),
        });
    };

    for app_item in selection {
        match app_item {
            ApplicationItem::Document(doc) => {
                for item in doc.root_items() {
                    push_item(item, &mut sources);
                }
            }
            ApplicationItem::DocumentItem(item) => push_item(item, &mut sources),
            ApplicationItem::XdeAssemblyNode(node) => {
                if !selected.contains(&node.owner.id()) {
                    sources.push(StlSource::Shape {
                        label: node.name(),
                        shape: node.shape(),
                    });
                }
            }
        }
    }
    sources
}

fn read_kernel(doc: &mut Document, path: &Path, progress: Option<&dyn TaskProgress>) -> IoResult {
    let mut indicator = OccProgressIndicator::new(progress);
    match stl::read_file(path, ProgressRange::new(&mut indicator)) {
        Some(mesh) => {
            doc.add_root_item(MeshItem::new(base_name(path), mesh));
            Ok(())
        }
        None => Err(IoError::NullMesh),
    }
}

fn write_kernel(
    sources: &[StlSource<'_>],
    format: StlFormat,
    path: &Path,
    progress: Option<&dyn TaskProgress>,
) -> IoResult {
    let source = match sources {
        [] => return Err(IoError::NoInputItem),
        [source] => source,
        _ => {
            return Err(IoError::Unsupported(
                "Only one item can be exported to STL at a time".to_string(),
            ))
        }
    };

    let ascii = format == StlFormat::Ascii;
    let mut indicator = OccProgressIndicator::new(progress);
    match source {
        StlSource::Shape { shape: None, .. } => Err(IoError::NoInputItem),
        StlSource::Shape {
            shape: Some(shape), ..
        } => {
            let mut writer = stl::StlWriter::new();
            writer.set_ascii_mode(ascii);
            if writer.write(shape, path, ProgressRange::new(&mut indicator)) {
                Ok(())
            } else {
                Err(IoError::Write("Unknown StlAPI_Writer failure"))
            }
        }
        StlSource::Mesh(item) => {
            let range = ProgressRange::new(&mut indicator);
            let written = if ascii {
                stl::write_ascii(item.triangulation(), path, range)
            } else {
                stl::write_binary(item.triangulation(), path, range)
            };
            if written {
                Ok(())
            } else {
                Err(IoError::Write("Unknown error"))
            }
        }
    }
}

#[cfg(feature = "meshio")]
mod meshio {
    use super::StlSource;
    use crate::bridge::task_iface;
    use crate::document::{base_name, Document, MeshItem};
    use crate::error::{IoError, IoResult};
    use crate::options::{ExportOptions, StlFloat32Format, StlFormat};
    use crate::progress::TaskProgress;
    use partview_core::math::{Point3, Vector3};
    use partview_core::triangulation::{Triangulation, TriangulationBuilder};
    use partview_meshio::stl::{
        self as codec, Float32Format, Mesh, MeshCreator, ReadOptions, SolidInfos, Triangle,
        WriteOptions,
    };
    use partview_meshio::Error;
    use std::fs::File;
    use std::path::Path;

    /// 把读出的三角形收集为网格
    #[derive(Default)]
    struct TriangulationCreator {
        builder: TriangulationBuilder,
    }

    impl MeshCreator for TriangulationCreator {
        fn begin_solid(&mut self, infos: &SolidInfos) {
            let capacity = infos.facet_count.unwrap_or(0) as usize;
            self.builder = TriangulationBuilder::with_capacity(capacity);
        }

        fn add_triangle(&mut self, _index: u32, triangle: &Triangle) {
            let point = |v: [f32; 3]| Point3::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2]));
            self.builder
                .add_triangle([point(triangle.v1), point(triangle.v2), point(triangle.v3)]);
        }
    }

    /// 网格的只读视图
    struct TriangulationMesh<'m>(&'m Triangulation);

    impl Mesh for TriangulationMesh<'_> {
        fn triangle_count(&self) -> u32 {
            u32::try_from(self.0.nb_triangles()).unwrap_or(u32::MAX)
        }

        fn get_triangle(&self, index: u32) -> Triangle {
            let index = index as usize;
            let [v1, v2, v3] = self
                .0
                .triangle_points(index)
                .unwrap_or([Point3::origin(); 3]);
            Triangle {
                n: vector3f(&self.0.triangle_normal(index)),
                v1: vector3f(&v1.coords),
                v2: vector3f(&v2.coords),
                v3: vector3f(&v3.coords),
                attribute_byte_count: 0,
            }
        }
    }

    fn vector3f(v: &Vector3) -> [f32; 3] {
        [v.x as f32, v.y as f32, v.z as f32]
    }

    pub(super) fn read(
        doc: &mut Document,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        let mut file = File::open(path).map_err(|_| IoError::MeshIo(Error::STDIO))?;
        let options = ReadOptions {
            format: None,
            task: task_iface(progress),
        };
        let label = base_name(path);
        while codec::has_remaining_data(&mut file)? {
            let mut creator = TriangulationCreator::default();
            codec::read(&mut file, &mut creator, &options)?;
            doc.add_root_item(MeshItem::new(label.clone(), creator.builder.build()));
        }
        Ok(())
    }

    pub(super) fn write(
        sources: &[StlSource<'_>],
        export: &ExportOptions,
        path: &Path,
        progress: Option<&dyn TaskProgress>,
    ) -> IoResult {
        let mut file = File::create(path).map_err(|_| IoError::MeshIo(Error::STDIO))?;
        let format = match export.stl_format {
            StlFormat::Ascii => codec::StlFormat::Ascii,
            StlFormat::Binary => codec::StlFormat::BinaryLe,
        };
        let options = WriteOptions {
            ascii_solid_name: export.stl_ascii_solid_name.clone(),
            float32_format: match export.stl_ascii_float32_format {
                StlFloat32Format::Decimal => Float32Format::Decimal,
                StlFloat32Format::ScientificLower => Float32Format::ScientificLowercase,
                StlFloat32Format::ScientificUpper => Float32Format::ScientificUppercase,
                StlFloat32Format::Shortest => Float32Format::Shortest,
            },
            float32_prec: export.stl_ascii_float32_precision,
            binary_header: None,
            task: task_iface(progress),
        };

        for source in sources {
            if let Some(progress) = progress {
                progress.set_step(&format!("Writing item {}", source.label()));
            }
            let mesh = source.triangulation();
            codec::write(format, &mut file, &TriangulationMesh(&mesh), &options)?;
        }
        Ok(())
    }
}

#[cfg(not(feature = "meshio"))]
mod meshio {
    use super::StlSource;
    use crate::document::Document;
    use crate::error::{IoError, IoResult};
    use crate::options::ExportOptions;
    use crate::progress::TaskProgress;
    use std::path::Path;

    const UNAVAILABLE: &str = "STL streaming library is not available";

    pub(super) fn read(_: &mut Document, _: &Path, _: Option<&dyn TaskProgress>) -> IoResult {
        Err(IoError::Unsupported(UNAVAILABLE.to_string()))
    }

    pub(super) fn write(
        _: &[StlSource<'_>],
        _: &ExportOptions,
        _: &Path,
        _: Option<&dyn TaskProgress>,
    ) -> IoResult {
        Err(IoError::Unsupported(UNAVAILABLE.to_string()))
    }
}
