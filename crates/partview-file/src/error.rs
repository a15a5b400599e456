//! 导入导出错误定义
//!
//! 错误的 `Display` 文本直接用于界面显示。

use partview_core::exchange::ReturnStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    /// 格式未识别
    #[error("Unknown error")]
    UnknownFormat,

    /// 读写器返回的状态不是完成
    #[error("{}", status_text(.0))]
    Status(ReturnStatus),

    /// 文档或标签无法转换到写出模型
    #[error("Transfer error")]
    Transfer,

    /// 只返回成功与否的内核调用失败
    #[error("Unknown Error")]
    Unknown,

    #[error("{0}")]
    Write(&'static str),

    #[error("Imported STL mesh is null")]
    NullMesh,

    /// 流式网格编解码错误代码
    #[error("{}", meshio_error_text(.0))]
    MeshIo(i32),

    #[error("{0}")]
    Unsupported(String),

    #[error("No input item")]
    NoInputItem,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type IoResult<T = ()> = Result<T, IoError>;

/// 读写状态的显示文本
pub fn status_text(status: &ReturnStatus) -> &'static str {
    match status {
        ReturnStatus::Void => "Nothing to translate",
        ReturnStatus::Done => "Done",
        ReturnStatus::Error => "Syntax or structure error in file",
        ReturnStatus::Fail => "Translation failed",
        ReturnStatus::Stop => "Translation stopped",
    }
}

/// 流式网格编解码错误代码的显示文本
#[cfg(feature = "meshio")]
pub fn meshio_error_text(code: &i32) -> &'static str {
    use partview_meshio::Error;
    match *code {
        Error::OK => "",
        Error::UNKNOWN => "Unknown mesh codec error",
        Error::STREAM => "Stream error",
        Error::TASK_STOPPED => "Task stopped",
        Error::STDIO => "Cannot open file",
        Error::STL_UNKNOWN_FORMAT => "Unknown STL format",
        Error::STL_PARSING => "STL parsing error",
        Error::STL_INVALID_FLOAT32_PREC => "Invalid float32 precision",
        Error::STL_HEADER_WRONG_SIZE => "Binary STL header has wrong size",
        Error::STL_FACET_COUNT => "Binary STL facet count mismatch",
        _ => "Unknown mesh codec error",
    }
}

#[cfg(not(feature = "meshio"))]
pub fn meshio_error_text(_code: &i32) -> &'static str {
    "Unknown mesh codec error"
}

#[cfg(feature = "meshio")]
impl From<partview_meshio::Error> for IoError {
    fn from(error: partview_meshio::Error) -> Self {
        IoError::MeshIo(error.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_texts() {
        assert_eq!(IoError::UnknownFormat.to_string(), "Unknown error");
        assert_eq!(IoError::Unknown.to_string(), "Unknown Error");
        assert_eq!(IoError::Transfer.to_string(), "Transfer error");
        assert_eq!(IoError::NoInputItem.to_string(), "No input item");
        assert_eq!(
            IoError::Status(ReturnStatus::Fail).to_string(),
            "Translation failed"
        );
    }

    #[cfg(feature = "meshio")]
    #[test]
    fn test_meshio_error_text() {
        let err: IoError = partview_meshio::Error::StlUnknownFormat.into();
        assert_eq!(err.to_string(), "Unknown STL format");
        assert_eq!(IoError::MeshIo(-42).to_string(), "Unknown mesh codec error");
    }
}
