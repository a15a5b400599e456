//! IGES 写出

use super::{
    format_line, format_real, hollerith, Section, ASSOCIATIVITY, COPIOUS_DATA, DATA_COLUMNS,
    PARAM_COLUMNS,
};
use crate::exchange::{pieces, CafWriter, ModelShape, Piece, ReturnStatus};
use crate::message::ProgressIndicator;
use crate::shape::Face;
use crate::statics::InterfaceStatic;
use crate::units::LengthUnit;
use crate::xde::{Label, XdeDocument};
use std::path::Path;
use tracing::debug;

/// IGES 写出器
#[derive(Debug, Default)]
pub struct IgesCafWriter {
    shapes: Vec<ModelShape>,
}

impl IgesCafWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nb_shapes(&self) -> usize {
        self.shapes.len()
    }
}

impl CafWriter for IgesCafWriter {
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

        let unit = statics
            .cval("write.iges.unit")
            .and_then(LengthUnit::from_iges_name)
            .unwrap_or_default();
        let scale = 1.0 / unit.to_mm_factor();

        let mut model = EntityList::default();
        for (i, model_shape) in self.shapes.iter().enumerate() {
            if !indicator.report(0.8 * i as f64 / self.shapes.len() as f64) {
                return ReturnStatus::Stop;
            }
            for piece in pieces(&model_shape.shape) {
                model.piece(&model_shape.name, &piece, scale);
            }
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let global = GlobalParams {
            product: self.shapes[0].name.clone(),
            file_name,
            unit,
            resolution: statics.rval("write.precision.val").unwrap_or(1e-4),
            max_coordinate: model.max_coordinate,
        };

        let text = model.to_text(&global);
        match std::fs::write(path, text) {
            Ok(()) => {
                indicator.report(1.0);
                ReturnStatus::Done
            }
            Err(e) => {
                debug!("Cannot write IGES file {}: {}", path.display(), e);
                ReturnStatus::Fail
            }
        }
    }
}

struct GlobalParams {
    product: String,
    file_name: String,
    unit: LengthUnit,
    resolution: f64,
    max_coordinate: f64,
}

impl GlobalParams {
    fn fields(&self) -> Vec<String> {
        let timestamp = chrono::Utc::now().format("%Y%m%d.%H%M%S").to_string();
        let product = if self.product.is_empty() {
            "PartView".to_string()
        } else {
            self.product.clone()
        };
        vec![
            hollerith(","),
            hollerith(";"),
            hollerith(&product),
            hollerith(&self.file_name),
            hollerith("PartView"),
            hollerith(env!("CARGO_PKG_VERSION")),
            "32".into(),
            "38".into(),
            "6".into(),
            "308".into(),
            "15".into(),
            hollerith(&product),
            "1.0".into(),
            self.unit.iges_flag().to_string(),
            hollerith(self.unit.iges_name()),
            "1".into(),
            "0.01".into(),
            hollerith(&timestamp),
            format_real(self.resolution),
            format_real(self.max_coordinate),
            String::new(),
            String::new(),
            "11".into(),
            "0".into(),
            hollerith(&timestamp),
        ]
    }
}

struct Entity {
    entity_type: i32,
    form: i32,
    label: String,
    dependent: bool,
    params: Vec<String>,
}

#[derive(Default)]
struct EntityList {
    entities: Vec<Entity>,
    max_coordinate: f64,
}

impl EntityList {
    /// 目录条目指针（第一行的序号）
    fn de_pointer(index: usize) -> usize {
        2 * index + 1
    }

    fn face(&mut self, face: &Face, label: &str, dependent: bool, scale: f64) -> usize {
        let vertices = face.vertices();
        let mut params = vec![
            COPIOUS_DATA.to_string(),
            "2".into(),
            (vertices.len() + 1).to_string(),
        ];
        for p in vertices.iter().chain(std::iter::once(&vertices[0])) {
            for c in [p.x, p.y, p.z] {
                let c = c * scale;
                self.max_coordinate = self.max_coordinate.max(c.abs());
                params.push(format_real(c));
            }
        }
        self.entities.push(Entity {
            entity_type: COPIOUS_DATA,
            form: 12,
            label: label.to_string(),
            dependent,
            params,
        });
        self.entities.len() - 1
    }

    fn piece(&mut self, name: &str, piece: &Piece<'_>, scale: f64) {
        let faces = match piece {
            Piece::Closed(faces) => faces,
            Piece::Open(faces) if faces.len() == 1 => {
                self.face(&faces[0], name, false, scale);
                return;
            }
            Piece::Open(faces) => faces,
        };

        let members: Vec<usize> = faces
            .iter()
            .map(|f| self.face(f, "", true, scale))
            .collect();
        let mut params = vec![ASSOCIATIVITY.to_string(), members.len().to_string()];
        params.extend(members.iter().map(|&i| Self::de_pointer(i).to_string()));
        self.entities.push(Entity {
            entity_type: ASSOCIATIVITY,
            form: 7,
            label: name.to_string(),
            dependent: false,
            params,
        });
    }

    fn to_text(&self, global: &GlobalParams) -> String {
        let mut out = String::new();

        out.push_str(&format_line("PartView IGES export", Section::Start, 1));
        let start_count = 1;

        let global_lines = wrap_params(&global.fields(), DATA_COLUMNS);
        for (i, line) in global_lines.iter().enumerate() {
            out.push_str(&format_line(line, Section::Global, i + 1));
        }

        // 参数段先排版，目录条目需要其起始序号和行数
        let mut param_lines = Vec::new();
        let mut layout = Vec::with_capacity(self.entities.len());
        for (index, entity) in self.entities.iter().enumerate() {
            let lines = wrap_params(&entity.params, PARAM_COLUMNS);
            layout.push((param_lines.len() + 1, lines.len()));
            for line in lines {
                param_lines.push(format!("{:<64.64}{:>8}", line, Self::de_pointer(index)));
            }
        }

        for (index, (entity, (pointer, count))) in self.entities.iter().zip(&layout).enumerate() {
            let status = if entity.dependent { "00010000" } else { "00000000" };
            let label: String = entity.label.chars().take(8).collect();
            let first = format!(
                "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
                entity.entity_type, pointer, 0, 0, 0, 0, 0, 0, status
            );
            let second = format!(
                "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
                entity.entity_type, 0, 0, count, entity.form, "", "", label, 0
            );
            out.push_str(&format_line(&first, Section::Directory, Self::de_pointer(index)));
            out.push_str(&format_line(&second, Section::Directory, Self::de_pointer(index) + 1));
        }

        for (i, line) in param_lines.iter().enumerate() {
            out.push_str(&format_line(line, Section::Parameter, i + 1));
        }

        let terminate = format!(
            "S{:>7}G{:>7}D{:>7}P{:>7}",
            start_count,
            global_lines.len(),
            2 * self.entities.len(),
            param_lines.len()
        );
        out.push_str(&format_line(&terminate, Section::Terminate, 1));
        out
    }
}

/// 自由格式参数排版到定宽行，只在分隔符后断行
fn wrap_params(fields: &[String], width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for (i, field) in fields.iter().enumerate() {
        let delimiter = if i + 1 == fields.len() { ';' } else { ',' };
        let item = format!("{field}{delimiter}");
        if !current.is_empty() && current.len() + item.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if item.len() > width {
            let chars: Vec<char> = item.chars().collect();
            for chunk in chars.chunks(width) {
                lines.push(chunk.iter().collect());
            }
            continue;
        }
        current.push_str(&item);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
