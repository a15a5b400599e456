//! 编解码错误
//!
//! 每个错误都有稳定的数值代码，调用方可据此查表得到显示文本。

use thiserror::Error;

/// 核心错误代码起点
const CORE_BASE: i32 = 0x0000_0000;
/// STL 错误代码起点
const STL_BASE: i32 = 0x0100_0000;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown error")]
    Unknown,

    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("task stopped")]
    TaskStopped,

    #[error("cannot open file: {0}")]
    Stdio(std::io::Error),

    #[error("unknown STL format")]
    StlUnknownFormat,

    #[error("STL parsing error at line {line}: {message}")]
    StlParsing { line: usize, message: String },

    #[error("invalid float32 precision {0}, expected 1..=9")]
    StlInvalidFloat32Prec(u8),

    #[error("binary STL header is shorter than 84 bytes")]
    StlHeaderWrongSize,

    #[error("binary STL announces {announced} facets but only {available} are present")]
    StlFacetCount { announced: u32, available: u64 },
}

impl Error {
    pub const OK: i32 = CORE_BASE;
    pub const UNKNOWN: i32 = CORE_BASE + 1;
    pub const STREAM: i32 = CORE_BASE + 4;
    pub const TASK_STOPPED: i32 = CORE_BASE + 5;
    pub const STDIO: i32 = CORE_BASE + 6;
    pub const STL_UNKNOWN_FORMAT: i32 = STL_BASE + 1;
    pub const STL_PARSING: i32 = STL_BASE + 3;
    pub const STL_INVALID_FLOAT32_PREC: i32 = STL_BASE + 4;
    pub const STL_HEADER_WRONG_SIZE: i32 = STL_BASE + 6;
    pub const STL_FACET_COUNT: i32 = STL_BASE + 7;

    /// 数值错误代码
    pub fn code(&self) -> i32 {
        match self {
            Error::Unknown => Self::UNKNOWN,
            Error::Stream(_) => Self::STREAM,
            Error::TaskStopped => Self::TASK_STOPPED,
            Error::Stdio(_) => Self::STDIO,
            Error::StlUnknownFormat => Self::STL_UNKNOWN_FORMAT,
            Error::StlParsing { .. } => Self::STL_PARSING,
            Error::StlInvalidFloat32Prec(_) => Self::STL_INVALID_FLOAT32_PREC,
            Error::StlHeaderWrongSize => Self::STL_HEADER_WRONG_SIZE,
            Error::StlFacetCount { .. } => Self::STL_FACET_COUNT,
        }
    }

    pub(crate) fn parsing(line: usize, message: impl Into<String>) -> Self {
        Error::StlParsing {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
