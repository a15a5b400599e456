//! IGES 读取与 XDE 转换

use super::{parse_int, parse_real, split_params, Section, ASSOCIATIVITY, COPIOUS_DATA, PARAM_COLUMNS};
use crate::exchange::{CafReader, ReaderModes, ReturnStatus};
use crate::math::{points_coincide, Point3};
use crate::message::ProgressIndicator;
use crate::shape::{Face, Shape, Shell, Solid};
use crate::statics::InterfaceStatic;
use crate::units::LengthUnit;
use crate::xde::XdeDocument;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// 目录条目及其参数
#[derive(Debug, Clone)]
struct DirectoryEntry {
    entity_type: i32,
    form: i32,
    label: String,
    blanked: bool,
    params: Vec<String>,
}

/// 已加载的 IGES 模型
#[derive(Debug, Clone)]
struct IgesModel {
    unit: LengthUnit,
    resolution: f64,
    entries: Vec<DirectoryEntry>,
}

/// IGES 读取器
#[derive(Debug, Default)]
pub struct IgesCafReader {
    modes: ReaderModes,
    model: Option<IgesModel>,
}

impl IgesCafReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已加载的实体数
    pub fn nb_entities(&self) -> usize {
        self.model.as_ref().map_or(0, |m| m.entries.len())
    }
}

impl CafReader for IgesCafReader {
    fn set_modes(&mut self, modes: ReaderModes) {
        self.modes = modes;
    }

    fn read_file(
        &mut self,
        path: &Path,
        _statics: &InterfaceStatic,
        indicator: &mut dyn ProgressIndicator,
    ) -> ReturnStatus {
        self.model = None;
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Cannot read IGES file {}: {}", path.display(), e);
                return ReturnStatus::Fail;
            }
        };
        if !indicator.report(0.3) {
            return ReturnStatus::Stop;
        }

        match load(&String::from_utf8_lossy(&bytes)) {
            Ok(model) if model.entries.is_empty() => ReturnStatus::Void,
            Ok(model) => {
                self.model = Some(model);
                indicator.report(1.0);
                ReturnStatus::Done
            }
            Err(message) => {
                debug!("IGES structure error in {}: {}", path.display(), message);
                ReturnStatus::Error
            }
        }
    }

    fn transfer(
        &mut self,
        doc: &mut XdeDocument,
        statics: &InterfaceStatic,
        indicator: &mut dyn ProgressIndicator,
    ) -> bool {
        let Some(model) = &self.model else {
            return false;
        };

        let factor = model.unit.to_mm_factor();
        let file_tolerance = if statics.ival("read.precision.mode") == Some(1) {
            statics.rval("read.precision.val").unwrap_or(1e-4)
        } else if model.resolution > 0.0 {
            model.resolution
        } else {
            1e-6
        };
        let tolerance = file_tolerance * factor;
        let only_visible = statics.ival("read.iges.onlyvisible") == Some(1);

        let mut referenced = HashSet::new();
        for entry in &model.entries {
            if entry.entity_type == ASSOCIATIVITY {
                referenced.extend(group_members(entry));
            }
        }

        let roots: Vec<usize> = model
            .entries
            .iter()
            .enumerate()
            .filter(|(i, e)| {
                (e.entity_type == ASSOCIATIVITY || e.entity_type == COPIOUS_DATA)
                    && !referenced.contains(i)
                    && !(only_visible && e.blanked)
            })
            .map(|(i, _)| i)
            .collect();

        let mut nb_transferred = 0;
        for (n, &root) in roots.iter().enumerate() {
            if !indicator.report(n as f64 / roots.len() as f64) {
                debug!("IGES transfer stopped after {} roots", nb_transferred);
                return false;
            }

            let entry = &model.entries[root];
            let shape = if entry.entity_type == COPIOUS_DATA {
                face(entry, factor, tolerance).map(Shape::Face)
            } else {
                let mut faces = Vec::new();
                let mut visited = HashSet::new();
                collect_faces(model, root, factor, tolerance, &mut visited, &mut faces);
                if faces.is_empty() {
                    None
                } else {
                    let shell = Shell::new(faces);
                    if shell.is_closed(tolerance) {
                        Some(Shape::Solid(Solid::new(shell)))
                    } else {
                        Some(Shape::Shell(shell))
                    }
                }
            };

            match shape {
                Some(shape) => {
                    let name = if self.modes.name { entry.label.clone() } else { String::new() };
                    doc.new_shape(shape, name);
                    nb_transferred += 1;
                }
                None => debug!("Skipped IGES entity {} (type {})", 2 * root + 1, entry.entity_type),
            }
        }
        indicator.report(1.0);

        nb_transferred > 0
    }
}

/// 402 组引用的成员（实体序号）
fn group_members(entry: &DirectoryEntry) -> Vec<usize> {
    let count = entry.params.get(1).and_then(|f| parse_int(f)).unwrap_or(0).max(0) as usize;
    entry
        .params
        .iter()
        .skip(2)
        .take(count)
        .filter_map(|f| parse_int(f))
        .filter(|&de| de > 0)
        .map(|de| (de as usize - 1) / 2)
        .collect()
}

fn collect_faces(
    model: &IgesModel,
    index: usize,
    factor: f64,
    tolerance: f64,
    visited: &mut HashSet<usize>,
    faces: &mut Vec<Face>,
) {
    if !visited.insert(index) {
        return;
    }
    let Some(entry) = model.entries.get(index) else {
        return;
    };
    match entry.entity_type {
        COPIOUS_DATA => faces.extend(face(entry, factor, tolerance)),
        ASSOCIATIVITY => {
            for member in group_members(entry) {
                collect_faces(model, member, factor, tolerance, visited, faces);
            }
        }
        _ => {}
    }
}

/// 106 实体的闭合折线转换为面
fn face(entry: &DirectoryEntry, factor: f64, tolerance: f64) -> Option<Face> {
    if !matches!(entry.form, 11 | 12 | 63) {
        return None;
    }
    let p = &entry.params;
    let ip = parse_int(p.get(1)?)?;
    let n = parse_int(p.get(2)?)?.max(0) as usize;
    let real = |i: usize| p.get(i).and_then(|f| parse_real(f));

    let mut points = Vec::with_capacity(n.min(4096));
    match ip {
        1 => {
            let z = real(3)?;
            for k in 0..n {
                points.push(Point3::new(real(4 + 2 * k)?, real(5 + 2 * k)?, z));
            }
        }
        2 | 3 => {
            let stride = if ip == 2 { 3 } else { 6 };
            for k in 0..n {
                let base = 3 + stride * k;
                points.push(Point3::new(real(base)?, real(base + 1)?, real(base + 2)?));
            }
        }
        _ => return None,
    }
    for point in &mut points {
        *point = Point3::from(point.coords * factor);
    }

    if points.len() > 1 && points_coincide(&points[0], &points[points.len() - 1], tolerance) {
        points.pop();
    }
    Face::new(points)
}

/// 全局段开头的 `1Hx` 形式分隔符定义
fn leading_delimiter(chars: &mut std::str::Chars<'_>, default: char) -> char {
    let mut lookahead = chars.clone();
    if lookahead.next() == Some('1') && matches!(lookahead.next(), Some('H') | Some('h')) {
        if let Some(d) = lookahead.next() {
            *chars = lookahead;
            return d;
        }
    }
    default
}

/// 全局段的参数分隔符和记录分隔符
fn detect_delimiters(global: &str) -> (char, char) {
    let mut chars = global.chars();
    let param = leading_delimiter(&mut chars, ',');
    // 跳过第一个字段后的分隔符
    let _ = chars.next();
    let record = leading_delimiter(&mut chars, ';');
    (param, record)
}

fn field(line: &str, index: usize) -> &str {
    line.get(index * 8..index * 8 + 8).unwrap_or("").trim()
}

fn load(text: &str) -> Result<IgesModel, String> {
    let mut global = String::new();
    let mut directory = Vec::new();
    let mut parameters = Vec::new();

    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let bytes = line.as_bytes();
        if bytes.len() < 73 {
            return Err(format!("line {} is shorter than 73 columns", number + 1));
        }
        let section = Section::from_letter(bytes[72])
            .ok_or_else(|| format!("line {} has no section letter", number + 1))?;
        let data = line.get(..72).ok_or_else(|| format!("line {} is not ASCII", number + 1))?;
        match section {
            Section::Start | Section::Terminate => {}
            Section::Global => global.push_str(data),
            Section::Directory => directory.push(data.to_string()),
            Section::Parameter => {
                let columns = data
                    .get(..PARAM_COLUMNS)
                    .ok_or_else(|| format!("line {} is not ASCII", number + 1))?;
                parameters.push(columns.to_string());
            }
        }
    }

    if directory.len() % 2 != 0 {
        return Err("directory section has an odd number of lines".to_string());
    }

    let (param_delim, record_delim) = detect_delimiters(&global);
    let globals = split_params(&global, param_delim, record_delim)?;
    let unit = globals
        .get(13)
        .and_then(|f| parse_int(f))
        .and_then(|flag| LengthUnit::from_iges_flag(flag as i32))
        .or_else(|| globals.get(14).and_then(|name| LengthUnit::from_iges_name(name)))
        .unwrap_or_default();
    let resolution = globals.get(18).and_then(|f| parse_real(f)).unwrap_or(0.0);

    let mut entries = Vec::with_capacity(directory.len() / 2);
    for pair in directory.chunks(2) {
        let (first, second) = (&pair[0], &pair[1]);
        let entity_type = parse_int(field(first, 0))
            .ok_or_else(|| format!("invalid entity type '{}'", field(first, 0)))? as i32;
        let pointer = parse_int(field(first, 1)).unwrap_or(0).max(0) as usize;
        let status = field(first, 8);
        let count = parse_int(field(second, 3)).unwrap_or(0).max(0) as usize;
        let form = parse_int(field(second, 4)).unwrap_or(0) as i32;

        let params = if pointer == 0 || count == 0 {
            Vec::new()
        } else {
            let lines = parameters
                .get(pointer - 1..pointer - 1 + count)
                .ok_or_else(|| format!("parameter pointer {pointer} out of range"))?;
            split_params(&lines.concat(), param_delim, record_delim)?
        };
        if params.first().and_then(|f| parse_int(f)).is_some_and(|t| t != i64::from(entity_type)) {
            return Err(format!("parameter data at {pointer} does not match entity type {entity_type}"));
        }

        entries.push(DirectoryEntry {
            entity_type,
            form,
            label: field(second, 7).to_string(),
            blanked: status.len() == 8 && status.starts_with("01"),
            params,
        });
    }

    debug!(
        "Loaded IGES model: {} entities, unit {}",
        entries.len(),
        unit.iges_name()
    );
    Ok(IgesModel {
        unit,
        resolution,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::iges::{init_statics, IgesCafWriter};
    use crate::exchange::CafWriter;
    use crate::math::Vector3;
    use crate::message::NullProgressIndicator;
    use crate::props;
    use crate::shape::ShapeType;

    #[test]
    fn test_detect_delimiters() {
        assert_eq!(detect_delimiters("1H,,1H;,4Htest"), (',', ';'));
        assert_eq!(detect_delimiters("1H/,1H#/"), ('/', '#'));
        assert_eq!(detect_delimiters(",,4Htest"), (',', ';'));
    }

    #[test]
    fn test_write_read_roundtrip_in_inches() {
        let path = std::env::temp_dir().join("partview_iges_roundtrip.igs");
        let mut statics = InterfaceStatic::new();
        init_statics(&mut statics);
        statics.set("write.iges.unit", "IN");
        let mut indicator = NullProgressIndicator::default();

        let mut source = XdeDocument::new();
        source.new_shape(
            Shape::Solid(Solid::make_box(Point3::origin(), 25.4, 50.8, 76.2)),
            "BLOCK",
        );
        let quad = Solid::make_box(Point3::origin(), 1.0, 1.0, 1.0)
            .shell()
            .faces()[0]
            .clone();
        source.new_shape(
            Shape::Face(quad).translated(&Vector3::new(100.0, 0.0, 0.0)),
            "PLATE",
        );

        let mut writer = IgesCafWriter::new();
        assert!(writer.transfer_document(&source, &statics, &mut indicator));
        assert_eq!(writer.write(&path, &statics, &mut indicator), ReturnStatus::Done);

        let text = std::fs::read_to_string(&path).expect("read back");
        let first = text.lines().next().expect("start line");
        assert_eq!(first.len(), 80);
        assert_eq!(&first[72..], "S      1");

        let mut reader = IgesCafReader::new();
        assert_eq!(reader.read_file(&path, &statics, &mut indicator), ReturnStatus::Done);
        assert_eq!(reader.nb_entities(), 8);

        let mut target = XdeDocument::new();
        assert!(reader.transfer(&mut target, &statics, &mut indicator));
        let free = target.free_shapes();
        assert_eq!(free.len(), 2);

        let block = target.shape(free[0]).expect("block");
        assert_eq!(block.shape_type(), ShapeType::Solid);
        assert_eq!(target.name(free[0]), Some("BLOCK"));
        let expected = 25.4 * 50.8 * 76.2;
        assert!((props::volume(&block) - expected).abs() / expected < 1e-9);

        let plate = target.shape(free[1]).expect("plate");
        assert_eq!(plate.shape_type(), ShapeType::Face);
        assert!((props::surface_area(&plate) - 1.0).abs() < 1e-9);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_short_line_is_structure_error() {
        let path = std::env::temp_dir().join("partview_iges_short.igs");
        std::fs::write(&path, "not an iges file\n").expect("write");
        let mut reader = IgesCafReader::new();
        let status = reader.read_file(
            &path,
            &InterfaceStatic::new(),
            &mut NullProgressIndicator::default(),
        );
        assert_eq!(status, ReturnStatus::Error);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_multibyte_parameter_line_is_structure_error() {
        let path = std::env::temp_dir().join("partview_iges_multibyte.igs");
        let line = format!("{}é{:>7}P{:>7}\n", "a".repeat(63), 1, 1);
        assert_eq!(line.as_bytes()[72], b'P');
        std::fs::write(&path, line).expect("write");
        let mut reader = IgesCafReader::new();
        let status = reader.read_file(
            &path,
            &InterfaceStatic::new(),
            &mut NullProgressIndicator::default(),
        );
        assert_eq!(status, ReturnStatus::Error);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_group_becomes_shell() {
        let path = std::env::temp_dir().join("partview_iges_open.igs");
        let mut statics = InterfaceStatic::new();
        init_statics(&mut statics);
        let mut indicator = NullProgressIndicator::default();

        let faces = Solid::make_box(Point3::origin(), 1.0, 1.0, 1.0).shell().faces()[..3].to_vec();
        let mut source = XdeDocument::new();
        source.new_shape(Shape::Shell(Shell::new(faces)), "OPEN");

        let mut writer = IgesCafWriter::new();
        writer.transfer_document(&source, &statics, &mut indicator);
        assert_eq!(writer.write(&path, &statics, &mut indicator), ReturnStatus::Done);

        let mut reader = IgesCafReader::new();
        assert_eq!(reader.read_file(&path, &statics, &mut indicator), ReturnStatus::Done);
        let mut target = XdeDocument::new();
        assert!(reader.transfer(&mut target, &statics, &mut indicator));
        let free = target.free_shapes();
        assert_eq!(free.len(), 1);
        assert_eq!(target.shape(free[0]).map(|s| s.shape_type()), Some(ShapeType::Shell));

        std::fs::remove_file(&path).ok();
    }
}
