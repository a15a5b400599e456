//! STL 流式读写
//!
//! 一个流中可以连续存放多个实体（文本或二进制），[`read()`] 每次读取一个，
//! 读完后流位置正好停在该实体之后。

mod read;
mod write;

pub use read::{has_remaining_data, read, ReadOptions};
pub use write::{write, Float32Format, WriteOptions};

use crate::error::Result;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// 二进制头长度（80 字节注释 + 4 字节三角形数）
pub const BINARY_HEADER_SIZE: u64 = 84;
/// 二进制三角形记录长度
pub const BINARY_FACET_SIZE: u64 = 50;
/// 探测格式时读取的最大字节数
pub const PROBE_SIZE: usize = 512;

pub type Vec3f = [f32; 3];

/// STL 格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StlFormat {
    #[default]
    Unknown,
    Ascii,
    /// 小端二进制
    BinaryLe,
    /// 大端二进制
    BinaryBe,
}

/// 三角形记录
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Triangle {
    pub n: Vec3f,
    pub v1: Vec3f,
    pub v2: Vec3f,
    pub v3: Vec3f,
    /// 仅二进制格式
    pub attribute_byte_count: u16,
}

/// 实体开始时的信息
#[derive(Debug, Clone, PartialEq)]
pub struct SolidInfos {
    pub format: StlFormat,
    /// 文本格式 `solid` 行上的名称
    pub solid_name: String,
    /// 二进制格式声明的三角形数
    pub facet_count: Option<u32>,
}

/// 接收读取结果
pub trait MeshCreator {
    fn begin_solid(&mut self, infos: &SolidInfos);

    fn add_triangle(&mut self, index: u32, triangle: &Triangle);

    fn end_solid(&mut self) {}
}

/// 提供待写出的三角形
pub trait Mesh {
    fn triangle_count(&self) -> u32;

    fn get_triangle(&self, index: u32) -> Triangle;
}

impl Mesh for [Triangle] {
    fn triangle_count(&self) -> u32 {
        u32::try_from(self.len()).unwrap_or(u32::MAX)
    }

    fn get_triangle(&self, index: u32) -> Triangle {
        self[index as usize]
    }
}

/// 由流开头的若干字节和流的剩余长度判断格式
pub fn probe_format_bytes(head: &[u8], stream_size: u64) -> StlFormat {
    if head.len() >= BINARY_HEADER_SIZE as usize {
        let count_bytes = &head[80..84];
        let expected = |count: u32| BINARY_HEADER_SIZE + BINARY_FACET_SIZE * u64::from(count);
        if expected(LittleEndian::read_u32(count_bytes)) == stream_size {
            return StlFormat::BinaryLe;
        }
        if expected(BigEndian::read_u32(count_bytes)) == stream_size {
            return StlFormat::BinaryBe;
        }
    }

    let text = skip_ascii_space(head);
    if text.len() >= 5 && text[..5].eq_ignore_ascii_case(b"solid") {
        return StlFormat::Ascii;
    }
    StlFormat::Unknown
}

/// 从流的当前位置探测格式，探测后恢复流位置
pub fn probe_format<R: Read + Seek>(stream: &mut R) -> Result<StlFormat> {
    let start = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(start))?;

    let mut head = Vec::with_capacity(PROBE_SIZE);
    stream.by_ref().take(PROBE_SIZE as u64).read_to_end(&mut head)?;
    stream.seek(SeekFrom::Start(start))?;
    Ok(probe_format_bytes(&head, end - start))
}

/// 探测文件格式，文件无法打开时返回 [`StlFormat::Unknown`]
pub fn probe_format_file(path: &Path) -> StlFormat {
    match std::fs::File::open(path) {
        Ok(mut file) => probe_format(&mut file).unwrap_or(StlFormat::Unknown),
        Err(_) => StlFormat::Unknown,
    }
}

fn skip_ascii_space(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_binary() {
        let mut bytes = vec![0u8; 84 + 50];
        LittleEndian::write_u32(&mut bytes[80..84], 1);
        assert_eq!(probe_format_bytes(&bytes, 134), StlFormat::BinaryLe);

        BigEndian::write_u32(&mut bytes[80..84], 1);
        assert_eq!(probe_format_bytes(&bytes, 134), StlFormat::BinaryBe);
    }

    #[test]
    fn test_probe_ascii() {
        assert_eq!(probe_format_bytes(b"  \n solid cube\n", 16), StlFormat::Ascii);
        assert_eq!(probe_format_bytes(b"SOLID", 5), StlFormat::Ascii);
        assert_eq!(probe_format_bytes(b"soli", 4), StlFormat::Unknown);
        assert_eq!(probe_format_bytes(b"", 0), StlFormat::Unknown);
    }

    #[test]
    fn test_probe_stream_restores_position() {
        let mut cursor = std::io::Cursor::new(b"xxsolid a\nendsolid a\n".to_vec());
        cursor.set_position(2);
        assert_eq!(probe_format(&mut cursor).expect("probe"), StlFormat::Ascii);
        assert_eq!(cursor.position(), 2);
    }
}
