//! STEP 写出

use super::schema_name;
use crate::exchange::{pieces, CafWriter, ModelShape, Piece, ReturnStatus};
use crate::message::ProgressIndicator;
use crate::shape::Face;
use crate::statics::InterfaceStatic;
use crate::xde::{Label, XdeDocument};
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// STEP 写出器
#[derive(Debug, Default)]
pub struct StepCafWriter {
    shapes: Vec<ModelShape>,
}

impl StepCafWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已转换的形状数
    pub fn nb_shapes(&self) -> usize {
        self.shapes.len()
    }
}

impl CafWriter for StepCafWriter {
    fn transfer_label(
        &mut self,
        doc: &XdeDocument,
        label: Label,
        _statics: &InterfaceStatic,
        _indicator: &mut dyn ProgressIndicator,
    ) -> bool {
        match doc.shape(label) {
            Some(shape) => {
                self.shapes.push(ModelShape {
                    name: doc.name(label).unwrap_or_default().to_string(),
                    shape,
                });
                true
            }
            None => false,
        }
    }

    fn write(
        &mut self,
        path: &Path,
        statics: &InterfaceStatic,
        indicator: &mut dyn ProgressIndicator,
    ) -> ReturnStatus {
        if self.shapes.is_empty() {
            return ReturnStatus::Void;
        }

        let schema = schema_name(statics.ival("write.step.schema").unwrap_or(1));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S");

        let mut out = String::new();
        out.push_str("ISO-10303-21;\nHEADER;\n");
        out.push_str("FILE_DESCRIPTION(('PartView model'),'2;1');\n");
        let _ = writeln!(
            out,
            "FILE_NAME('{}','{}',(''),(''),'PartView','PartView','');",
            escape(&file_name),
            timestamp
        );
        let _ = writeln!(out, "FILE_SCHEMA(('{schema}'));");
        out.push_str("ENDSEC;\nDATA;\n");

        let mut data = DataSection::default();
        for (i, model_shape) in self.shapes.iter().enumerate() {
            if !indicator.report(i as f64 / self.shapes.len() as f64) {
                return ReturnStatus::Stop;
            }
            for piece in pieces(&model_shape.shape) {
                data.piece(&model_shape.name, &piece);
            }
        }
        out.push_str(&data.text);
        out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");

        match std::fs::write(path, out) {
            Ok(()) => {
                indicator.report(1.0);
                ReturnStatus::Done
            }
            Err(e) => {
                debug!("Cannot write STEP file {}: {}", path.display(), e);
                ReturnStatus::Fail
            }
        }
    }
}

/// 数据段实例生成
#[derive(Default)]
struct DataSection {
    text: String,
    next_id: u64,
}

impl DataSection {
    fn add(&mut self, body: std::fmt::Arguments<'_>) -> u64 {
        self.next_id += 1;
        let _ = writeln!(self.text, "#{}={};", self.next_id, body);
        self.next_id
    }

    fn face(&mut self, face: &Face) -> u64 {
        let points: Vec<String> = face
            .vertices()
            .iter()
            .map(|p| {
                let id = self.add(format_args!(
                    "CARTESIAN_POINT('',({},{},{}))",
                    real(p.x),
                    real(p.y),
                    real(p.z)
                ));
                format!("#{id}")
            })
            .collect();
        let poly_loop = self.add(format_args!("POLY_LOOP('',({}))", points.join(",")));
        let bound = self.add(format_args!("FACE_OUTER_BOUND('',#{poly_loop},.T.)"));
        self.add(format_args!("FACE('',(#{bound}))"))
    }

    fn shell(&mut self, keyword: &str, faces: &[Face]) -> u64 {
        let ids: Vec<String> = faces.iter().map(|f| format!("#{}", self.face(f))).collect();
        self.add(format_args!("{keyword}('',({}))", ids.join(",")))
    }

    fn piece(&mut self, name: &str, piece: &Piece<'_>) {
        let name = escape(name);
        match piece {
            Piece::Closed(faces) => {
                let shell = self.shell("CLOSED_SHELL", faces);
                self.add(format_args!("FACETED_BREP('{name}',#{shell})"));
            }
            Piece::Open(faces) => {
                let shell = self.shell("OPEN_SHELL", faces);
                self.add(format_args!("SHELL_BASED_SURFACE_MODEL('{name}',(#{shell}))"));
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\'', "''")
}

/// Part 21 实数：必须带小数点
fn real(value: f64) -> String {
    let text = format!("{value:?}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{mantissa}E{exponent}"),
        Some((mantissa, exponent)) => format!("{mantissa}.E{exponent}"),
        None => text,
    }
}
