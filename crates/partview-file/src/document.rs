//! 文档数据模型
//!
//! 文档按顺序保存导入得到的根条目。条目分两种：
//! - [`WholeShapeItem`]：一个 XDE 文档，源文件有多个顶层自由形状时带合成的根装配
//! - [`MeshItem`]：一个三角网格

use chrono::{DateTime, Utc};
use partview_core::props;
use partview_core::shape::Shape;
use partview_core::triangulation::Triangulation;
use partview_core::xde::XdeDocument;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// 全局条目ID生成器
static ITEM_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 文档条目唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentItemId(u64);

impl DocumentItemId {
    pub fn new() -> Self {
        Self(ITEM_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for DocumentItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// 文件的基本名：文件名第一个 `.` 之前的部分
pub fn base_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    file_name
        .split_once('.')
        .map_or(&*file_name, |(base, _)| base)
        .to_string()
}

/// 文档元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// 文档唯一标识
    pub id: Uuid,

    /// 文档标题
    pub title: String,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 最后修改时间
    pub modified_at: DateTime<Utc>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: "Untitled".to_string(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }
}

/// 由 XDE 文档构成的条目
#[derive(Debug, Clone)]
pub struct WholeShapeItem {
    id: DocumentItemId,
    label: String,
    xde: XdeDocument,
    area: f64,
    volume: f64,
}

impl WholeShapeItem {
    /// 多个顶层自由形状会被包进以 `label` 命名的根装配
    pub fn new(label: impl Into<String>, mut xde: XdeDocument) -> Self {
        let label = label.into();
        xde.create_root_assembly(label.clone());
        let (area, volume) = match xde.whole_shape() {
            Some(shape) => (
                props::surface_area(&shape).max(0.0),
                props::volume(&shape).max(0.0),
            ),
            None => (0.0, 0.0),
        };
        Self {
            id: DocumentItemId::new(),
            label,
            xde,
            area,
            volume,
        }
    }

    pub fn id(&self) -> DocumentItemId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn xde(&self) -> &XdeDocument {
        &self.xde
    }

    /// 所有顶层自由形状，多于一个时为组合
    pub fn whole_shape(&self) -> Option<Shape> {
        self.xde.whole_shape()
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// 由三角网格构成的条目
#[derive(Debug, Clone)]
pub struct MeshItem {
    id: DocumentItemId,
    label: String,
    triangulation: Triangulation,
    area: f64,
    volume: f64,
}

impl MeshItem {
    pub fn new(label: impl Into<String>, triangulation: Triangulation) -> Self {
        let area = triangulation.area();
        let volume = triangulation.volume().max(0.0);
        Self {
            id: DocumentItemId::new(),
            label: label.into(),
            triangulation,
            area,
            volume,
        }
    }

    pub fn id(&self) -> DocumentItemId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    pub fn nb_nodes(&self) -> usize {
        self.triangulation.nb_nodes()
    }

    pub fn nb_triangles(&self) -> usize {
        self.triangulation.nb_triangles()
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// 文档条目
#[derive(Debug, Clone)]
pub enum DocumentItem {
    WholeShape(WholeShapeItem),
    Mesh(MeshItem),
}

impl DocumentItem {
    pub fn id(&self) -> DocumentItemId {
        match self {
            DocumentItem::WholeShape(item) => item.id(),
            DocumentItem::Mesh(item) => item.id(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DocumentItem::WholeShape(item) => item.label(),
            DocumentItem::Mesh(item) => item.label(),
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            DocumentItem::WholeShape(item) => item.area(),
            DocumentItem::Mesh(item) => item.area(),
        }
    }

    pub fn volume(&self) -> f64 {
        match self {
            DocumentItem::WholeShape(item) => item.volume(),
            DocumentItem::Mesh(item) => item.volume(),
        }
    }

    pub fn as_whole_shape(&self) -> Option<&WholeShapeItem> {
        match self {
            DocumentItem::WholeShape(item) => Some(item),
            DocumentItem::Mesh(_) => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshItem> {
        match self {
            DocumentItem::Mesh(item) => Some(item),
            DocumentItem::WholeShape(_) => None,
        }
    }
}

impl From<WholeShapeItem> for DocumentItem {
    fn from(item: WholeShapeItem) -> Self {
        DocumentItem::WholeShape(item)
    }
}

impl From<MeshItem> for DocumentItem {
    fn from(item: MeshItem) -> Self {
        DocumentItem::Mesh(item)
    }
}

/// 文档
#[derive(Debug, Default)]
pub struct Document {
    /// 元数据
    pub metadata: DocumentMetadata,

    /// 根条目，按加入顺序
    items: Vec<DocumentItem>,

    /// 是否已修改
    modified: bool,

    /// 最近一次导入或导出的文件
    file_path: Option<PathBuf>,
}

impl Document {
    /// 创建新文档
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加根条目，文档从此拥有该条目
    pub fn add_root_item(&mut self, item: impl Into<DocumentItem>) -> DocumentItemId {
        let item = item.into();
        let id = item.id();
        tracing::debug!("Document item added: {}", item.label());
        self.items.push(item);
        self.modified = true;
        self.metadata.modified_at = Utc::now();
        id
    }

    pub fn root_items(&self) -> &[DocumentItem] {
        &self.items
    }

    pub fn root_item(&self, id: DocumentItemId) -> Option<&DocumentItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// 删除根条目
    pub fn remove_root_item(&mut self, id: DocumentItemId) -> Option<DocumentItem> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        self.modified = true;
        Some(self.items.remove(index))
    }

    pub fn nb_root_items(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 是否已修改
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// 标记为已保存
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    /// 获取文件路径
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// 设置文件路径
    pub fn set_file_path(&mut self, path: impl AsRef<Path>) {
        self.file_path = Some(path.as_ref().to_path_buf());
    }
}
