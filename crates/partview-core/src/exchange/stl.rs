//! 单网格 STL 读写
//!
//! 读取时只取文件中的第一个网格；二进制与文本格式由文件长度区分：
//! 二进制文件长度恰为 `84 + 50 * 三角形数`。

use crate::math::{Point3, Vector3};
use crate::message::ProgressRange;
use crate::shape::Shape;
use crate::triangulation::{Triangulation, TriangulationBuilder};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;
use tracing::debug;

/// 二进制头长度（80 字节注释 + 4 字节三角形数）
pub const BINARY_HEADER_SIZE: u64 = 84;
/// 二进制三角形记录长度
pub const BINARY_FACET_SIZE: u64 = 50;

/// 读取 STL 文件中的第一个网格
///
/// 文件不可读或格式错误时返回 `None`；没有三角形的合法文件得到空网格。
pub fn read_file(path: &Path, range: ProgressRange<'_>) -> Option<Triangulation> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Cannot read STL file {}: {}", path.display(), e);
            return None;
        }
    };

    if is_binary(&bytes) {
        read_binary(&bytes, range)
    } else {
        read_ascii(&String::from_utf8_lossy(&bytes), range)
    }
}

fn is_binary(bytes: &[u8]) -> bool {
    if (bytes.len() as u64) < BINARY_HEADER_SIZE {
        return false;
    }
    let mut cursor = Cursor::new(&bytes[80..84]);
    match cursor.read_u32::<LittleEndian>() {
        Ok(count) => BINARY_HEADER_SIZE + BINARY_FACET_SIZE * u64::from(count) == bytes.len() as u64,
        Err(_) => false,
    }
}

fn read_binary(bytes: &[u8], range: ProgressRange<'_>) -> Option<Triangulation> {
    let mut cursor = Cursor::new(bytes);
    cursor.set_position(80);
    let count = cursor.read_u32::<LittleEndian>().ok()? as usize;
    let mut sentry = range.sentry("Reading STL", count as f64);
    let mut builder = TriangulationBuilder::with_capacity(count);

    let read_point = |cursor: &mut Cursor<&[u8]>| -> std::io::Result<Point3> {
        let x = cursor.read_f32::<LittleEndian>()?;
        let y = cursor.read_f32::<LittleEndian>()?;
        let z = cursor.read_f32::<LittleEndian>()?;
        Ok(Point3::new(f64::from(x), f64::from(y), f64::from(z)))
    };

    for _ in 0..count {
        if !sentry.more() {
            return None;
        }
        // 法向量由顶点重新计算
        read_point(&mut cursor).ok()?;
        let a = read_point(&mut cursor).ok()?;
        let b = read_point(&mut cursor).ok()?;
        let c = read_point(&mut cursor).ok()?;
        cursor.read_u16::<LittleEndian>().ok()?;
        builder.add_triangle([a, b, c]);
        sentry.next();
    }
    Some(builder.build())
}

fn read_ascii(text: &str, range: ProgressRange<'_>) -> Option<Triangulation> {
    let lines: Vec<&str> = text.lines().collect();
    let mut sentry = range.sentry("Reading STL", lines.len() as f64);
    let mut builder = TriangulationBuilder::default();
    let mut vertices: Vec<Point3> = Vec::with_capacity(3);
    let mut in_solid = false;

    for line in &lines {
        if !sentry.more() {
            return None;
        }
        sentry.next();

        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            continue;
        };
        match keyword.to_ascii_lowercase().as_str() {
            "solid" if !in_solid => in_solid = true,
            "endsolid" if in_solid => return Some(builder.build()),
            "vertex" if in_solid => {
                let mut coord = || words.next().and_then(|w| w.parse::<f64>().ok());
                let (x, y, z) = (coord()?, coord()?, coord()?);
                vertices.push(Point3::new(x, y, z));
            }
            "endloop" if in_solid => {
                if vertices.len() != 3 {
                    debug!("STL facet with {} vertices", vertices.len());
                    return None;
                }
                builder.add_triangle([vertices[0], vertices[1], vertices[2]]);
                vertices.clear();
            }
            "facet" | "outer" | "endfacet" if in_solid => {}
            _ => {
                debug!("Unexpected STL keyword '{}'", keyword);
                return None;
            }
        }
    }

    // 缺少 endsolid 的文件也接受，只要确实出现过 solid
    in_solid.then(|| builder.build())
}

/// 以文本格式写出网格
pub fn write_ascii(mesh: &Triangulation, path: &Path, range: ProgressRange<'_>) -> bool {
    let mut sentry = range.sentry("Writing STL", mesh.nb_triangles() as f64);
    let result = write_to(path, |out| {
        writeln!(out, "solid")?;
        for i in 0..mesh.nb_triangles() {
            if !sentry.more() {
                return Ok(false);
            }
            let Some(points) = mesh.triangle_points(i) else {
                continue;
            };
            let n = mesh.triangle_normal(i);
            writeln!(out, " facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
            writeln!(out, "   outer loop")?;
            for p in points {
                writeln!(out, "     vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
            }
            writeln!(out, "   endloop")?;
            writeln!(out, " endfacet")?;
            sentry.next();
        }
        writeln!(out, "endsolid")?;
        Ok(true)
    });
    finish(path, result)
}

/// 以二进制格式写出网格
pub fn write_binary(mesh: &Triangulation, path: &Path, range: ProgressRange<'_>) -> bool {
    let Ok(count) = u32::try_from(mesh.nb_triangles()) else {
        debug!("Too many triangles for binary STL: {}", mesh.nb_triangles());
        return false;
    };
    let mut sentry = range.sentry("Writing STL", f64::from(count));
    let result = write_to(path, |out| {
        let mut header = [b' '; 80];
        let comment = b"STL binary file written by PartView";
        header[..comment.len()].copy_from_slice(comment);
        out.write_all(&header)?;
        out.write_u32::<LittleEndian>(count)?;

        let write_vec = |out: &mut BufWriter<std::fs::File>, v: Vector3| -> std::io::Result<()> {
            out.write_f32::<LittleEndian>(v.x as f32)?;
            out.write_f32::<LittleEndian>(v.y as f32)?;
            out.write_f32::<LittleEndian>(v.z as f32)
        };

        for i in 0..mesh.nb_triangles() {
            if !sentry.more() {
                return Ok(false);
            }
            let points = mesh.triangle_points(i).unwrap_or([Point3::origin(); 3]);
            write_vec(out, mesh.triangle_normal(i))?;
            for p in points {
                write_vec(out, p.coords)?;
            }
            out.write_u16::<LittleEndian>(0)?;
            sentry.next();
        }
        Ok(true)
    });
    finish(path, result)
}

fn write_to(
    path: &Path,
    body: impl FnOnce(&mut BufWriter<std::fs::File>) -> std::io::Result<bool>,
) -> std::io::Result<bool> {
    let mut out = BufWriter::new(std::fs::File::create(path)?);
    let completed = body(&mut out)?;
    out.flush()?;
    Ok(completed)
}

fn finish(path: &Path, result: std::io::Result<bool>) -> bool {
    match result {
        Ok(completed) => completed,
        Err(e) => {
            debug!("Cannot write STL file {}: {}", path.display(), e);
            false
        }
    }
}

/// 把形状三角化后写为 STL
#[derive(Debug, Clone, Default)]
pub struct StlWriter {
    ascii_mode: bool,
}

impl StlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ascii_mode(&mut self, ascii: bool) {
        self.ascii_mode = ascii;
    }

    pub fn ascii_mode(&self) -> bool {
        self.ascii_mode
    }

    /// 写出形状，形状没有任何面时失败
    pub fn write(&self, shape: &Shape, path: &Path, range: ProgressRange<'_>) -> bool {
        let mesh = Triangulation::from_shape(shape);
        if mesh.nb_triangles() == 0 {
            debug!("Shape has no faces to write as STL");
            return false;
        }
        if self.ascii_mode {
            write_ascii(&mesh, path, range)
        } else {
            write_binary(&mesh, path, range)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Solid;

    fn cube() -> Shape {
        Shape::Solid(Solid::make_box(Point3::new(1.0, 2.0, 3.0), 2.0, 0.5, 4.0))
    }

    #[test]
    fn test_binary_roundtrip() {
        let path = std::env::temp_dir().join("partview_stl_binary.stl");
        assert!(StlWriter::new().write(&cube(), &path, ProgressRange::none()));

        let size = std::fs::metadata(&path).expect("metadata").len();
        assert_eq!(size, BINARY_HEADER_SIZE + 12 * BINARY_FACET_SIZE);

        let mesh = read_file(&path, ProgressRange::none()).expect("read");
        assert_eq!(mesh.nb_triangles(), 12);
        assert_eq!(mesh.nb_nodes(), 8);
        assert!((mesh.volume() - 4.0).abs() < 1e-9);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_ascii_roundtrip() {
        let path = std::env::temp_dir().join("partview_stl_ascii.stl");
        let mut writer = StlWriter::new();
        writer.set_ascii_mode(true);
        assert!(writer.write(&cube(), &path, ProgressRange::none()));

        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.starts_with("solid"));

        let mesh = read_file(&path, ProgressRange::none()).expect("read");
        assert_eq!(mesh.nb_triangles(), 12);
        assert!((mesh.area() - 2.0 * (1.0 + 8.0 + 2.0)).abs() < 1e-9);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_ascii_reads_first_solid_only() {
        let path = std::env::temp_dir().join("partview_stl_two_solids.stl");
        let facet = "facet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendloop\nendfacet\n";
        let text = format!("solid a\n{facet}{facet}endsolid a\nsolid b\n{facet}endsolid b\n");
        std::fs::write(&path, text).expect("write");

        let mesh = read_file(&path, ProgressRange::none()).expect("read");
        assert_eq!(mesh.nb_triangles(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_empty_solid_gives_empty_mesh() {
        let path = std::env::temp_dir().join("partview_stl_empty.stl");
        std::fs::write(&path, "solid empty\nendsolid empty\n").expect("write");
        let mesh = read_file(&path, ProgressRange::none()).expect("read");
        assert_eq!(mesh.nb_triangles(), 0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_garbage_is_rejected() {
        let path = std::env::temp_dir().join("partview_stl_garbage.stl");
        std::fs::write(&path, "this is not an stl file\n").expect("write");
        assert!(read_file(&path, ProgressRange::none()).is_none());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_empty_shape_fails() {
        let path = std::env::temp_dir().join("partview_stl_no_faces.stl");
        let shape = Shape::Compound(Vec::new());
        assert!(!StlWriter::new().write(&shape, &path, ProgressRange::none()));
    }
}
