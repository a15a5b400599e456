//! STEP (ISO 10303-21) 读写
//!
//! 只支持面片化边界表示：`FACETED_BREP` / `MANIFOLD_SOLID_BREP` 构成实体，
//! `SHELL_BASED_SURFACE_MODEL` 构成开放壳，面由 `POLY_LOOP` 围成。

mod lexer;
mod parser;
mod reader;
mod writer;

pub use parser::{StepEntity, StepModel, StepValue};
pub use reader::StepCafReader;
pub use writer::StepCafWriter;

use crate::statics::InterfaceStatic;
use thiserror::Error;

/// STEP 解析错误
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Lexer error at line {line}: {message}")]
    Lexer { line: usize, message: String },

    #[error("Parser error{}: {message}", entity_id.map(|id| format!(" at entity #{}", id)).unwrap_or_default())]
    Parser {
        entity_id: Option<u64>,
        message: String,
    },
}

impl StepError {
    pub fn lexer(line: usize, message: impl Into<String>) -> Self {
        Self::Lexer {
            line,
            message: message.into(),
        }
    }

    pub fn parser(entity_id: Option<u64>, message: impl Into<String>) -> Self {
        Self::Parser {
            entity_id,
            message: message.into(),
        }
    }
}

/// 注册 STEP 相关静态变量的默认值，可重复调用
pub fn init_statics(statics: &mut InterfaceStatic) {
    statics.init("read.step.product.context", 1);
    statics.init("read.step.assembly.level", 1);
    statics.init("read.step.shape.repr", 1);
    statics.init("read.step.shape.aspect", 1);
    statics.init("read.step.codepage", "UTF8");
    statics.init("write.step.schema", 1);
    statics.init("write.step.assembly", 0);
    statics.init("write.surfacecurve.mode", 1);
    statics.init("write.step.vertex.mode", 0);
    statics.init("write.precision.mode", 0);
    statics.init("write.precision.val", 1e-4);
}

/// `write.step.schema` 对应的 `FILE_SCHEMA` 名称
pub fn schema_name(value: i32) -> &'static str {
    match value {
        2 => "AUTOMOTIVE_DESIGN { 1 2 10303 214 0 1 1 1 }",
        3 => "CONFIG_CONTROL_DESIGN",
        4 => "AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }",
        5 => "AP242_MANAGED_MODEL_BASED_3D_ENGINEERING_MIM_LF { 1 0 10303 442 1 1 4 }",
        _ => "AUTOMOTIVE_DESIGN_CC2 { 1 2 10303 214 -1 1 5 4 }",
    }
}

/// `read.step.codepage` 对应的字符编码
pub(crate) fn codepage_encoding(codepage: &str) -> &'static encoding_rs::Encoding {
    let upper = codepage.to_ascii_uppercase();
    let label = match upper.as_str() {
        "SJIS" => "shift_jis".to_string(),
        "EUC" => "euc-jp".to_string(),
        "GB" => "gb18030".to_string(),
        "ANSI" => "windows-1252".to_string(),
        cp if cp.starts_with("CP125") => format!("windows-{}", &cp[2..]),
        iso if iso.starts_with("ISO8859-") => format!("iso-8859-{}", &iso[8..]),
        _ => "utf-8".to_string(),
    };
    encoding_rs::Encoding::for_label(label.as_bytes()).unwrap_or(encoding_rs::UTF_8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codepage_encoding() {
        assert_eq!(codepage_encoding("UTF8"), encoding_rs::UTF_8);
        assert_eq!(codepage_encoding("SJIS"), encoding_rs::SHIFT_JIS);
        assert_eq!(codepage_encoding("CP1251"), encoding_rs::WINDOWS_1251);
        assert_eq!(codepage_encoding("iso8859-2"), encoding_rs::ISO_8859_2);
        assert_eq!(codepage_encoding("bogus"), encoding_rs::UTF_8);
    }

    #[test]
    fn test_schema_names() {
        assert_eq!(schema_name(3), "CONFIG_CONTROL_DESIGN");
        assert!(schema_name(1).starts_with("AUTOMOTIVE_DESIGN_CC2"));
        assert!(schema_name(5).starts_with("AP242"));
    }
}
