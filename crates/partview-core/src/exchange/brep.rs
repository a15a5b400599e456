//! 内核原生 BREP 文本格式
//!
//! ```text
//! DBRep_DrawableShape
//!
//! PartView Topology V1
//! compound 2
//! solid
//! shell 6
//! face 4
//! 0 0 0
//! ...
//! ```
//!
//! 读写只返回成功与否，不提供详细状态。

use crate::math::Point3;
use crate::message::{ProgressRange, ProgressSentry};
use crate::shape::{Face, Shape, ShapeType, Shell, Solid};
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// 文件魔数
pub const MAGIC: &str = "DBRep_DrawableShape";
const VERSION_LINE: &str = "PartView Topology V1";

/// 写出形状，`None` 写出空形状
pub fn write(shape: Option<&Shape>, path: &Path, range: ProgressRange<'_>) -> bool {
    let nb_faces = shape.map_or(0, |s| s.nb_faces());
    let mut sentry = range.sentry("Writing BREP", nb_faces as f64);

    let mut out = format!("{MAGIC}\n\n{VERSION_LINE}\n");
    match shape {
        Some(shape) => {
            if !write_shape(&mut out, shape, &mut sentry) {
                debug!("BREP write interrupted");
                return false;
            }
        }
        None => out.push_str("null\n"),
    }

    match std::fs::write(path, out) {
        Ok(()) => true,
        Err(e) => {
            debug!("Cannot write BREP file {}: {}", path.display(), e);
            false
        }
    }
}

fn write_shape(out: &mut String, shape: &Shape, sentry: &mut ProgressSentry<'_>) -> bool {
    match shape {
        Shape::Compound(children) => {
            let _ = writeln!(out, "compound {}", children.len());
            children.iter().all(|c| write_shape(out, c, sentry))
        }
        Shape::Solid(solid) => {
            out.push_str("solid\n");
            write_shell(out, solid.shell(), sentry)
        }
        Shape::Shell(shell) => write_shell(out, shell, sentry),
        Shape::Face(face) => write_face(out, face, sentry),
    }
}

fn write_shell(out: &mut String, shell: &Shell, sentry: &mut ProgressSentry<'_>) -> bool {
    let _ = writeln!(out, "shell {}", shell.faces().len());
    shell.faces().iter().all(|f| write_face(out, f, sentry))
}

fn write_face(out: &mut String, face: &Face, sentry: &mut ProgressSentry<'_>) -> bool {
    if !sentry.more() {
        return false;
    }
    let _ = writeln!(out, "face {}", face.vertices().len());
    for p in face.vertices() {
        // f64 的 Display 输出可无损读回
        let _ = writeln!(out, "{} {} {}", p.x, p.y, p.z);
    }
    sentry.next();
    true
}

/// 读取形状，文件不可读、格式错误或空形状时返回 `None`
pub fn read(path: &Path, range: ProgressRange<'_>) -> Option<Shape> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            debug!("Cannot read BREP file {}: {}", path.display(), e);
            return None;
        }
    };

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let header: Vec<&str> = std::iter::once(MAGIC)
        .chain(VERSION_LINE.split_whitespace())
        .collect();
    if tokens.len() < header.len() || tokens[..header.len()] != header[..] {
        debug!("Not a BREP file: {}", path.display());
        return None;
    }

    let mut parser = Parser {
        tokens: &tokens[header.len()..],
        pos: 0,
        sentry: range.sentry("Reading BREP", (tokens.len() - header.len()) as f64),
    };
    let shape = parser.shape()?;
    if parser.pos != parser.tokens.len() {
        debug!("Trailing data in BREP file {}", path.display());
        return None;
    }
    Some(shape)
}

struct Parser<'t, 'p> {
    tokens: &'t [&'t str],
    pos: usize,
    sentry: ProgressSentry<'p>,
}

impl Parser<'_, '_> {
    fn token(&mut self) -> Option<&str> {
        let token = self.tokens.get(self.pos).copied()?;
        self.pos += 1;
        Some(token)
    }

    fn count(&mut self) -> Option<usize> {
        self.token()?.parse().ok()
    }

    fn real(&mut self) -> Option<f64> {
        self.token()?.parse().ok()
    }

    fn shape(&mut self) -> Option<Shape> {
        let keyword = self.token()?;
        if keyword == "null" {
            return None;
        }
        match ShapeType::from_name(keyword)? {
            ShapeType::Compound => {
                let n = self.count()?;
                let children = (0..n).map(|_| self.shape()).collect::<Option<Vec<_>>>()?;
                Some(Shape::Compound(children))
            }
            ShapeType::Solid => {
                if self.token()? != "shell" {
                    return None;
                }
                Some(Shape::Solid(Solid::new(self.shell_body()?)))
            }
            ShapeType::Shell => Some(Shape::Shell(self.shell_body()?)),
            ShapeType::Face => Some(Shape::Face(self.face_body()?)),
        }
    }

    fn shell_body(&mut self) -> Option<Shell> {
        let n = self.count()?;
        let faces = (0..n)
            .map(|_| {
                if self.token()? != "face" {
                    return None;
                }
                self.face_body()
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Shell::new(faces))
    }

    fn face_body(&mut self) -> Option<Face> {
        if !self.sentry.more() {
            return None;
        }
        let start = self.pos;
        let n = self.count()?;
        let mut vertices = Vec::with_capacity(n.min(4096));
        for _ in 0..n {
            vertices.push(Point3::new(self.real()?, self.real()?, self.real()?));
        }
        self.sentry.next_by((self.pos - start + 1) as f64);
        Face::new(vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use crate::props;

    fn sample() -> Shape {
        let a = Shape::Solid(Solid::make_box(Point3::new(0.1, 0.2, 0.3), 1.5, 2.25, 3.125));
        let b = Shape::Solid(Solid::make_box(Point3::origin(), 1.0, 1.0, 1.0))
            .translated(&Vector3::new(-7.0, 1.0 / 3.0, 0.0));
        Shape::Compound(vec![a, b])
    }

    #[test]
    fn test_roundtrip() {
        let path = std::env::temp_dir().join("partview_brep_roundtrip.brep");
        let shape = sample();
        assert!(write(Some(&shape), &path, ProgressRange::none()));

        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.starts_with(MAGIC));

        let read_back = read(&path, ProgressRange::none()).expect("parse");
        assert_eq!(read_back, shape);
        assert_eq!(props::volume(&read_back), props::volume(&shape));
        assert_eq!(props::surface_area(&read_back), props::surface_area(&shape));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_null_shape_reads_as_none() {
        let path = std::env::temp_dir().join("partview_brep_null.brep");
        assert!(write(None, &path, ProgressRange::none()));
        assert!(read(&path, ProgressRange::none()).is_none());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_truncated_file_fails() {
        let path = std::env::temp_dir().join("partview_brep_truncated.brep");
        let shape = sample();
        assert!(write(Some(&shape), &path, ProgressRange::none()));
        let text = std::fs::read_to_string(&path).expect("read back");
        std::fs::write(&path, &text[..text.len() / 2]).expect("truncate");
        assert!(read(&path, ProgressRange::none()).is_none());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(read(Path::new("/nonexistent/partview.brep"), ProgressRange::none()).is_none());
    }
}
