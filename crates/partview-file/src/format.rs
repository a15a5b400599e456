//! 文件格式识别
//!
//! 只根据文件内容判断格式，从不看扩展名。检查顺序固定，先匹配者胜出：
//!
//! 1. 二进制 STL：偏移 80 处的小端三角形数满足 `84 + 50 * n == 文件大小`
//! 2. IGES：第 73 列为 `S`，74-80 列为空格或数字且值为 1，随后是换行
//! 3. 跳过开头空白后：`ISO-10303-21 ; HEADER` 为 STEP
//! 4. `DBRep_DrawableShape` 为原生 BREP
//! 5. `solid` 为文本 STL

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// 识别格式时最多读取的字节数
pub const SNIFF_SIZE: usize = 2048;

const BINARY_STL_HEADER_SIZE: usize = 84;
const BINARY_STL_FACET_SIZE: u64 = 12 * 4 + 2;

/// 零件文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartFormat {
    Iges,
    Step,
    OccBrep,
    Stl,
    Unknown,
}

impl PartFormat {
    /// 支持的全部格式
    pub const ALL: [PartFormat; 4] = [
        PartFormat::Iges,
        PartFormat::Step,
        PartFormat::OccBrep,
        PartFormat::Stl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PartFormat::Iges => "IGES",
            PartFormat::Step => "STEP",
            PartFormat::OccBrep => "OpenCascade BREP",
            PartFormat::Stl => "STL",
            PartFormat::Unknown => "Unknown",
        }
    }

    /// 文件对话框过滤器
    pub fn filter(&self) -> &'static str {
        match self {
            PartFormat::Iges => "IGES files(*.iges *.igs)",
            PartFormat::Step => "STEP files(*.step *.stp)",
            PartFormat::OccBrep => "OpenCascade BREP files(*.brep *.occ)",
            PartFormat::Stl => "STL files(*.stl *.stla)",
            PartFormat::Unknown => "",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            PartFormat::Iges => &["iges", "igs"],
            PartFormat::Step => &["step", "stp"],
            PartFormat::OccBrep => &["brep", "occ"],
            PartFormat::Stl => &["stl", "stla"],
            PartFormat::Unknown => &[],
        }
    }

    /// 导出时是否有可调选项
    pub fn has_export_options(&self) -> bool {
        *self == PartFormat::Stl
    }

    /// 按扩展名选择导出格式
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&extension.as_str()))
    }
}

impl std::fmt::Display for PartFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// C `isspace`：空格、`\t`、`\n`、`\v`、`\f`、`\r`
fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

fn skip_spaces(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| !is_space(b)).unwrap_or(bytes.len());
    &bytes[start..]
}

fn is_binary_stl(contents: &[u8], full_size_hint: u64) -> bool {
    if contents.len() < BINARY_STL_HEADER_SIZE {
        return false;
    }
    let count = u32::from_le_bytes([contents[80], contents[81], contents[82], contents[83]]);
    BINARY_STL_FACET_SIZE * u64::from(count) + BINARY_STL_HEADER_SIZE as u64 == full_size_hint
}

fn is_iges(contents: &[u8]) -> bool {
    if contents.len() <= 80 || contents[72] != b'S' {
        return false;
    }
    let sequence = &contents[73..80];
    if !sequence.iter().all(|&b| b == b' ' || b.is_ascii_digit()) {
        return false;
    }
    if !matches!(contents[80], b'\n' | b'\r' | 0x0c) {
        return false;
    }
    // 同 atoi：跳过前导空格后读取连续数字
    let digits: Vec<u8> = skip_spaces(sequence)
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .copied()
        .collect();
    std::str::from_utf8(&digits)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        == Some(1)
}

fn is_step(contents: &[u8]) -> bool {
    let Some(rest) = contents.strip_prefix(b"ISO-10303-21") else {
        return false;
    };
    let Some(rest) = skip_spaces(rest).strip_prefix(b";") else {
        return false;
    };
    skip_spaces(rest).starts_with(b"HEADER")
}

/// 根据文件开头内容和文件大小识别格式
///
/// 最多检查 `contents` 的前 [`SNIFF_SIZE`] 字节，不做任何 I/O。
pub fn find_part_format_from_contents(contents: &[u8], full_size_hint: u64) -> PartFormat {
    let contents = &contents[..contents.len().min(SNIFF_SIZE)];

    if is_binary_stl(contents, full_size_hint) {
        return PartFormat::Stl;
    }
    if is_iges(contents) {
        return PartFormat::Iges;
    }

    let text = skip_spaces(contents);
    if is_step(text) {
        PartFormat::Step
    } else if text.starts_with(b"DBRep_DrawableShape") {
        PartFormat::OccBrep
    } else if text.starts_with(b"solid") {
        PartFormat::Stl
    } else {
        PartFormat::Unknown
    }
}

/// 识别文件格式，文件无法读取时返回 [`PartFormat::Unknown`]
pub fn find_part_format(path: &Path) -> PartFormat {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!("Cannot open {}: {}", path.display(), e);
            return PartFormat::Unknown;
        }
    };

    #[cfg(feature = "meshio")]
    {
        use partview_meshio::stl::{probe_format_file, StlFormat};
        if probe_format_file(path) != StlFormat::Unknown {
            return PartFormat::Stl;
        }
    }

    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    let mut contents = Vec::with_capacity(SNIFF_SIZE);
    if let Err(e) = file.take(SNIFF_SIZE as u64).read_to_end(&mut contents) {
        tracing::debug!("Cannot read {}: {}", path.display(), e);
        return PartFormat::Unknown;
    }
    find_part_format_from_contents(&contents, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn iges_start_line(sequence: &str) -> Vec<u8> {
        format!("{:<72}S{:>7}\n", "start", sequence).into_bytes()
    }

    #[test]
    fn test_all_zero_buffer_is_unknown() {
        assert_eq!(find_part_format_from_contents(&[0u8; 2048], 0), PartFormat::Unknown);
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(find_part_format_from_contents(&[], 0), PartFormat::Unknown);
        // 空的二进制 STL 需要完整的 84 字节头
        assert_eq!(find_part_format_from_contents(&[], 84), PartFormat::Unknown);
    }

    #[test]
    fn test_iges() {
        assert_eq!(find_part_format_from_contents(&iges_start_line("1"), 81), PartFormat::Iges);
        let mut crlf = iges_start_line("0000001");
        crlf.insert(80, b'\r');
        assert_eq!(find_part_format_from_contents(&crlf, 82), PartFormat::Iges);
    }

    #[test]
    fn test_iges_rejects() {
        assert_eq!(find_part_format_from_contents(&iges_start_line("2"), 81), PartFormat::Unknown);

        let mut wrong_section = iges_start_line("1");
        wrong_section[72] = b'G';
        assert_eq!(find_part_format_from_contents(&wrong_section, 81), PartFormat::Unknown);

        let mut letter = iges_start_line("1");
        letter[74] = b'x';
        assert_eq!(find_part_format_from_contents(&letter, 81), PartFormat::Unknown);

        // 第 81 个字节缺失
        let line = iges_start_line("1");
        assert_eq!(find_part_format_from_contents(&line[..80], 80), PartFormat::Unknown);
    }

    #[test]
    fn test_step() {
        let contents = b"ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION((''),'2;1');";
        assert_eq!(find_part_format_from_contents(contents, 1000), PartFormat::Step);
        assert_eq!(find_part_format_from_contents(b"ISO-10303-21 \x0b; \tHEADER", 100), PartFormat::Step);
        assert_eq!(find_part_format_from_contents(b"ISO-10303-21;DATA", 100), PartFormat::Unknown);
        assert_eq!(find_part_format_from_contents(b"ISO-10303-21", 100), PartFormat::Unknown);
    }

    #[test]
    fn test_brep_and_ascii_stl() {
        assert_eq!(
            find_part_format_from_contents(b"\n\nDBRep_DrawableShape\n", 1000),
            PartFormat::OccBrep
        );
        assert_eq!(find_part_format_from_contents(b"  solid part\n", 1000), PartFormat::Stl);
        assert_eq!(find_part_format_from_contents(b"SOLID", 5), PartFormat::Unknown);
    }

    #[test]
    fn test_binary_stl_checked_before_text() {
        // 以 "solid" 开头但大小符合二进制公式的文件也是 STL
        let mut contents = vec![b' '; 84];
        contents[..5].copy_from_slice(b"solid");
        contents[80..84].copy_from_slice(&2u32.to_le_bytes());
        assert_eq!(find_part_format_from_contents(&contents, 184), PartFormat::Stl);
    }

    #[test]
    fn test_only_first_bytes_are_examined() {
        let mut contents = vec![b' '; SNIFF_SIZE];
        contents.extend_from_slice(b"solid");
        assert_eq!(find_part_format_from_contents(&contents, 0), PartFormat::Unknown);
    }

    #[test]
    fn test_catalogue() {
        assert_eq!(PartFormat::ALL.len(), 4);
        assert_eq!(PartFormat::Step.filter(), "STEP files(*.step *.stp)");
        assert_eq!(PartFormat::from_extension("IGS"), Some(PartFormat::Iges));
        assert_eq!(PartFormat::from_extension("occ"), Some(PartFormat::OccBrep));
        assert_eq!(PartFormat::from_extension("txt"), None);
        assert!(PartFormat::Stl.has_export_options());
        assert!(!PartFormat::Step.has_export_options());
    }

    #[test]
    fn test_find_part_format_missing_file() {
        assert_eq!(find_part_format(Path::new("/nonexistent/part.step")), PartFormat::Unknown);
    }

    #[test]
    fn test_find_part_format_file() {
        let path = std::env::temp_dir().join("partview_sniff.dat");
        std::fs::write(&path, "   DBRep_DrawableShape\n").expect("write");
        assert_eq!(find_part_format(&path), PartFormat::OccBrep);
        std::fs::remove_file(&path).ok();
    }

    proptest! {
        #[test]
        fn prop_binary_stl_size_formula(header in proptest::collection::vec(any::<u8>(), 80), count in 0u32..100_000) {
            let mut contents = header;
            contents.extend_from_slice(&count.to_le_bytes());
            let size = 84 + 50 * u64::from(count);
            prop_assert_eq!(find_part_format_from_contents(&contents, size), PartFormat::Stl);
        }

        #[test]
        fn prop_step_after_any_whitespace(prefix in "[ \t\r\n]{0,200}") {
            let contents = format!("{prefix}ISO-10303-21;HEADER;");
            prop_assert_eq!(find_part_format_from_contents(contents.as_bytes(), 10_000), PartFormat::Step);
        }

        #[test]
        fn prop_classify_is_idempotent(contents in proptest::collection::vec(any::<u8>(), 0..4096), size in any::<u64>()) {
            let first = find_part_format_from_contents(&contents, size);
            prop_assert_eq!(first, find_part_format_from_contents(&contents, size));
        }
    }
}
