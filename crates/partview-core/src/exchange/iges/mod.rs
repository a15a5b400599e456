//! IGES 5.3 读写
//!
//! 文件由 80 列定长行组成，第 73 列为段标识（S/G/D/P/T），74-80 列为段内序号。
//! 面以实体 106 form 12（三维折线，IP=2）表示的闭合边界写出，
//! 实体和壳以实体 402 form 7（无反向指针的无序组）把面组织起来。

mod reader;
mod writer;

pub use reader::IgesCafReader;
pub use writer::IgesCafWriter;

use crate::statics::InterfaceStatic;

/// 数据列宽
pub(crate) const DATA_COLUMNS: usize = 72;
/// 参数段数据列宽（65-72 列为目录条目指针）
pub(crate) const PARAM_COLUMNS: usize = 64;

pub(crate) const COPIOUS_DATA: i32 = 106;
pub(crate) const ASSOCIATIVITY: i32 = 402;

/// 注册 IGES 相关静态变量的默认值，可重复调用
pub fn init_statics(statics: &mut InterfaceStatic) {
    statics.init("read.iges.bspline.continuity", 1);
    statics.init("read.surfacecurve.mode", 0);
    statics.init("read.precision.mode", 0);
    statics.init("read.precision.val", 1e-4);
    statics.init("read.iges.faulty.entities", 0);
    statics.init("read.iges.onlyvisible", 0);
    statics.init("write.iges.brep.mode", 0);
    statics.init("write.iges.plane.mode", 0);
    statics.init("write.iges.unit", "MM");
    statics.init("write.precision.mode", 0);
    statics.init("write.precision.val", 1e-4);
}

/// 段标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Start,
    Global,
    Directory,
    Parameter,
    Terminate,
}

impl Section {
    pub fn letter(&self) -> char {
        match self {
            Section::Start => 'S',
            Section::Global => 'G',
            Section::Directory => 'D',
            Section::Parameter => 'P',
            Section::Terminate => 'T',
        }
    }

    pub fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'S' => Some(Section::Start),
            b'G' => Some(Section::Global),
            b'D' => Some(Section::Directory),
            b'P' => Some(Section::Parameter),
            b'T' => Some(Section::Terminate),
            _ => None,
        }
    }
}

/// 格式化一行：数据左对齐到 72 列，随后是段标识和 7 位序号
pub(crate) fn format_line(data: &str, section: Section, sequence: usize) -> String {
    format!("{:<72.72}{}{:>7}\n", data, section.letter(), sequence)
}

/// Hollerith 字符串 `nHxxxx`
pub(crate) fn hollerith(text: &str) -> String {
    format!("{}H{}", text.chars().count(), text)
}

/// 解析自由格式参数：字段以 `param_delim` 分隔，以 `record_delim` 结束
///
/// Hollerith 字符串中的分隔符不生效，返回去掉 `nH` 前缀后的字段文本。
pub(crate) fn split_params(data: &str, param_delim: char, record_delim: char) -> Result<Vec<String>, String> {
    let chars: Vec<char> = data.chars().collect();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == param_delim || c == record_delim {
            fields.push(current.trim().to_string());
            current.clear();
            if c == record_delim {
                return Ok(fields);
            }
            i += 1;
            continue;
        }

        if (c == 'H' || c == 'h') && !current.trim().is_empty() && current.trim().chars().all(|d| d.is_ascii_digit()) {
            let len: usize = current
                .trim()
                .parse()
                .map_err(|_| format!("invalid Hollerith length '{}'", current.trim()))?;
            if i + 1 + len > chars.len() {
                return Err(format!("Hollerith string of length {len} exceeds data"));
            }
            current = chars[i + 1..i + 1 + len].iter().collect();
            fields.push(std::mem::take(&mut current));
            i += 1 + len;
            // 跳过字符串后的分隔符
            while i < chars.len() && chars[i] == ' ' {
                i += 1;
            }
            match chars.get(i) {
                Some(&d) if d == param_delim => i += 1,
                Some(&d) if d == record_delim => return Ok(fields),
                None => return Ok(fields),
                Some(&d) => return Err(format!("unexpected '{d}' after Hollerith string")),
            }
            continue;
        }

        current.push(c);
        i += 1;
    }

    if !current.trim().is_empty() {
        fields.push(current.trim().to_string());
    }
    Ok(fields)
}

/// IGES 实数：`D` 指数也接受
pub(crate) fn parse_real(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.replace(['D', 'd'], "E").parse().ok()
}

pub(crate) fn parse_int(field: &str) -> Option<i64> {
    field.trim().parse().ok()
}

/// IGES 实数输出
pub(crate) fn format_real(value: f64) -> String {
    let text = format!("{value:?}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{mantissa}E{exponent}"),
        Some((mantissa, exponent)) => format!("{mantissa}.E{exponent}"),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let line = format_line("hello", Section::Start, 1);
        assert_eq!(line.len(), 81);
        assert_eq!(&line[72..80], "S      1");
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_split_params_with_hollerith() {
        let fields = split_params("1H,,1H;,4Ha,b;,12,1.5D1;", ',', ';').expect("split");
        assert_eq!(fields, vec![",", ";", "a,b;", "12", "1.5D1"]);
        assert_eq!(parse_real(&fields[4]), Some(15.0));
    }

    #[test]
    fn test_split_params_empty_fields() {
        let fields = split_params("402,2,,3;", ',', ';').expect("split");
        assert_eq!(fields, vec!["402", "2", "", "3"]);
    }

    #[test]
    fn test_split_params_bad_hollerith() {
        assert!(split_params("9Habc;", ',', ';').is_err());
    }

    #[test]
    fn test_hollerith() {
        assert_eq!(hollerith("MM"), "2HMM");
        assert_eq!(hollerith(""), "0H");
    }
}
