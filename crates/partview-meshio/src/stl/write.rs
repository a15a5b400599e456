//! STL 写出

use super::{Mesh, StlFormat, Triangle};
use crate::error::{Error, Result};
use crate::task::TaskIface;
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{BufWriter, Write};

const TASK_CHECK_INTERVAL: u32 = 512;

/// 文本格式中浮点数的写法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Float32Format {
    /// `123.456`
    Decimal,
    /// `1.23456e2`
    #[default]
    ScientificLowercase,
    /// `1.23456E2`
    ScientificUppercase,
    /// 可无损读回的最短写法，忽略精度
    Shortest,
}

/// 写出选项
pub struct WriteOptions<'a, C: ?Sized> {
    /// 文本格式 `solid` 行上的名称
    pub ascii_solid_name: String,
    pub float32_format: Float32Format,
    /// 有效位数 1..=9
    pub float32_prec: u8,
    /// 二进制头（80 字节注释），`None` 时写零
    pub binary_header: Option<[u8; 80]>,
    pub task: TaskIface<'a, C>,
}

impl<C: ?Sized> Default for WriteOptions<'_, C> {
    fn default() -> Self {
        Self {
            ascii_solid_name: String::new(),
            float32_format: Float32Format::default(),
            float32_prec: 9,
            binary_header: None,
            task: TaskIface::default(),
        }
    }
}

/// 把网格作为一个实体写入流
pub fn write<W, M, C>(format: StlFormat, stream: &mut W, mesh: &M, options: &WriteOptions<'_, C>) -> Result<()>
where
    W: Write,
    M: Mesh + ?Sized,
    C: ?Sized,
{
    let mut out = BufWriter::new(stream);
    match format {
        StlFormat::Ascii => write_ascii(&mut out, mesh, options)?,
        StlFormat::BinaryLe => write_binary::<LittleEndian, _, _, _>(&mut out, mesh, options)?,
        StlFormat::BinaryBe => write_binary::<BigEndian, _, _, _>(&mut out, mesh, options)?,
        StlFormat::Unknown => return Err(Error::StlUnknownFormat),
    }
    out.flush()?;
    Ok(())
}

fn check_task<C: ?Sized>(task: &TaskIface<'_, C>, index: u32, count: u32) -> Result<()> {
    if index % TASK_CHECK_INTERVAL == 0 {
        if task.is_stop_requested() {
            return Err(Error::TaskStopped);
        }
        task.handle_progress(u64::from(index), u64::from(count));
    }
    Ok(())
}

fn write_ascii<W, M, C>(out: &mut W, mesh: &M, options: &WriteOptions<'_, C>) -> Result<()>
where
    W: Write,
    M: Mesh + ?Sized,
    C: ?Sized,
{
    if !(1..=9).contains(&options.float32_prec) {
        return Err(Error::StlInvalidFloat32Prec(options.float32_prec));
    }
    let prec = usize::from(options.float32_prec);
    let format = options.float32_format;
    let coords = |v: [f32; 3]| -> String {
        v.iter()
            .map(|&c| format_f32(c, format, prec))
            .collect::<Vec<_>>()
            .join(" ")
    };

    writeln!(out, "solid {}", options.ascii_solid_name)?;
    let count = mesh.triangle_count();
    for index in 0..count {
        check_task(&options.task, index, count)?;
        let Triangle { n, v1, v2, v3, .. } = mesh.get_triangle(index);
        writeln!(out, "facet normal {}", coords(n))?;
        writeln!(out, " outer loop")?;
        for v in [v1, v2, v3] {
            writeln!(out, "  vertex {}", coords(v))?;
        }
        writeln!(out, " endloop")?;
        writeln!(out, "endfacet")?;
    }
    writeln!(out, "endsolid {}", options.ascii_solid_name)?;
    options.task.handle_progress(u64::from(count), u64::from(count));
    Ok(())
}

fn format_f32(value: f32, format: Float32Format, prec: usize) -> String {
    // 精度为有效位数，小数位数比它少一
    let decimals = prec.saturating_sub(1);
    match format {
        Float32Format::Decimal => format!("{value:.decimals$}"),
        Float32Format::ScientificLowercase => format!("{value:.decimals$e}"),
        Float32Format::ScientificUppercase => format!("{value:.decimals$E}"),
        Float32Format::Shortest => format!("{value}"),
    }
}

fn write_binary<B, W, M, C>(out: &mut W, mesh: &M, options: &WriteOptions<'_, C>) -> Result<()>
where
    B: ByteOrder,
    W: Write,
    M: Mesh + ?Sized,
    C: ?Sized,
{
    out.write_all(&options.binary_header.unwrap_or([0u8; 80]))?;
    let count = mesh.triangle_count();
    out.write_u32::<B>(count)?;
    for index in 0..count {
        check_task(&options.task, index, count)?;
        let triangle = mesh.get_triangle(index);
        for v in [triangle.n, triangle.v1, triangle.v2, triangle.v3] {
            for c in v {
                out.write_f32::<B>(c)?;
            }
        }
        out.write_u16::<B>(triangle.attribute_byte_count)?;
    }
    options.task.handle_progress(u64::from(count), u64::from(count));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stl::{has_remaining_data, read, MeshCreator, ReadOptions, SolidInfos};
    use std::io::Cursor;

    fn triangles() -> Vec<Triangle> {
        vec![
            Triangle {
                n: [0.0, 0.0, 1.0],
                v1: [0.0, 0.0, 0.0],
                v2: [1.5, 0.0, 0.0],
                v3: [0.0, 2.25, 0.0],
                attribute_byte_count: 0,
            },
            Triangle {
                n: [0.0, 0.0, -1.0],
                v1: [0.0, 0.0, 0.0],
                v2: [0.0, 2.25, 0.0],
                v3: [1.5, 0.0, 0.0],
                attribute_byte_count: 0,
            },
        ]
    }

    #[derive(Default)]
    struct Collector {
        names: Vec<String>,
        triangles: Vec<Triangle>,
    }

    impl MeshCreator for Collector {
        fn begin_solid(&mut self, infos: &SolidInfos) {
            self.names.push(infos.solid_name.clone());
        }

        fn add_triangle(&mut self, _index: u32, triangle: &Triangle) {
            self.triangles.push(*triangle);
        }
    }

    #[test]
    fn test_format_f32() {
        assert_eq!(format_f32(1.5, Float32Format::Decimal, 3), "1.50");
        assert_eq!(format_f32(150.0, Float32Format::ScientificLowercase, 2), "1.5e2");
        assert_eq!(format_f32(150.0, Float32Format::ScientificUppercase, 2), "1.5E2");
        assert_eq!(format_f32(0.1, Float32Format::Shortest, 2), "0.1");
    }

    #[test]
    fn test_ascii_two_solids_roundtrip() {
        let mesh = triangles();
        let mut bytes = Vec::new();
        for name in ["a", "b"] {
            let options: WriteOptions<'_, ()> = WriteOptions {
                ascii_solid_name: name.to_string(),
                ..Default::default()
            };
            write(StlFormat::Ascii, &mut bytes, mesh.as_slice(), &options).expect("write");
        }

        let text = String::from_utf8(bytes.clone()).expect("utf8");
        assert!(text.starts_with("solid a\nfacet normal"));

        let mut cursor = Cursor::new(bytes);
        let mut collector = Collector::default();
        let options: ReadOptions<'_, ()> = ReadOptions::default();
        while has_remaining_data(&mut cursor).expect("stream") {
            read(&mut cursor, &mut collector, &options).expect("read");
        }
        assert_eq!(collector.names, vec!["a", "b"]);
        assert_eq!(collector.triangles.len(), 4);
        assert_eq!(collector.triangles[3], mesh[1]);
    }

    #[test]
    fn test_binary_be_roundtrip() {
        let mesh = triangles();
        let mut bytes = Vec::new();
        let options: WriteOptions<'_, ()> = WriteOptions::default();
        write(StlFormat::BinaryBe, &mut bytes, mesh.as_slice(), &options).expect("write");
        assert_eq!(bytes.len(), 84 + 2 * 50);

        let mut collector = Collector::default();
        let read_options: ReadOptions<'_, ()> = ReadOptions::default();
        read(&mut Cursor::new(bytes), &mut collector, &read_options).expect("read");
        assert_eq!(collector.triangles, mesh);
    }

    #[test]
    fn test_invalid_precision() {
        let options: WriteOptions<'_, ()> = WriteOptions {
            float32_prec: 0,
            ..Default::default()
        };
        let err = write(StlFormat::Ascii, &mut Vec::<u8>::new(), triangles().as_slice(), &options)
            .expect_err("precision");
        assert_eq!(err.code(), Error::STL_INVALID_FLOAT32_PREC);
    }

    #[test]
    fn test_unknown_format() {
        let options: WriteOptions<'_, ()> = WriteOptions::default();
        let err = write(StlFormat::Unknown, &mut Vec::<u8>::new(), triangles().as_slice(), &options)
            .expect_err("format");
        assert!(matches!(err, Error::StlUnknownFormat));
    }
}
