//! PartView 文件导入导出
//!
//! 支持：
//! - IGES、STEP 通过 XDE 读写器导入导出，期间独占转换会话
//! - OpenCascade BREP 原生格式
//! - STL：内核读写器或流式网格库（`meshio` 特性）
//!
//! 调用方通过 [`Application`] 按格式分派，进度经 [`TaskProgress`] 报告，
//! 失败以 [`IoError`] 返回，其显示文本可直接展示给用户。

pub mod application;
pub mod application_item;
pub mod bridge;
pub mod document;
pub mod error;
pub mod format;
pub mod io;
pub mod io_iges;
pub mod io_occ_brep;
pub mod io_step;
pub mod io_stl;
pub mod options;
pub mod progress;
pub mod session;

pub use application::Application;
pub use application_item::{ApplicationItem, XdeAssemblyNode};
pub use document::{Document, DocumentItem, DocumentItemId, MeshItem, WholeShapeItem};
pub use error::{IoError, IoResult};
pub use format::{find_part_format, find_part_format_from_contents, PartFormat};
pub use io::{Reader, Writer};
pub use options::{ExportOptions, Options};
pub use progress::{Progress, TaskProgress};
pub use session::TransferSession;
