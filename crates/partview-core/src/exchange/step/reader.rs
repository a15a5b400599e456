//! STEP 读取与 XDE 转换

use super::parser::{StepEntity, StepModel, StepValue};
use super::codepage_encoding;
use crate::exchange::{CafReader, ReaderModes, ReturnStatus};
use crate::math::Point3;
use crate::message::ProgressIndicator;
use crate::shape::{Face, Shape, Shell, Solid};
use crate::statics::InterfaceStatic;
use crate::xde::XdeDocument;
use std::path::Path;
use tracing::debug;

const SOLID_TYPES: [&str; 3] = ["MANIFOLD_SOLID_BREP", "FACETED_BREP", "BREP_WITH_VOIDS"];
const FACE_TYPES: [&str; 3] = ["FACE", "FACE_SURFACE", "ADVANCED_FACE"];

/// STEP 读取器
#[derive(Debug, Default)]
pub struct StepCafReader {
    modes: ReaderModes,
    model: Option<StepModel>,
}

impl StepCafReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已加载的模型
    pub fn model(&self) -> Option<&StepModel> {
        self.model.as_ref()
    }
}

impl CafReader for StepCafReader {
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
                debug!("Cannot read STEP file {}: {}", path.display(), e);
                return ReturnStatus::Fail;
            }
        };
        if !indicator.report(0.5) {
            return ReturnStatus::Stop;
        }

        match StepModel::parse(&bytes) {
            Ok(model) if model.entities.is_empty() => ReturnStatus::Void,
            Ok(model) => {
                self.model = Some(model);
                indicator.report(1.0);
                ReturnStatus::Done
            }
            Err(e) => {
                debug!("STEP parse error in {}: {}", path.display(), e);
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
        let encoding = codepage_encoding(statics.cval("read.step.codepage").unwrap_or("UTF8"));

        let roots: Vec<&StepEntity> = model
            .entities
            .values()
            .filter(|e| {
                SOLID_TYPES.contains(&e.type_name.as_str())
                    || e.type_name == "SHELL_BASED_SURFACE_MODEL"
            })
            .collect();

        let mut nb_transferred = 0;
        for (i, root) in roots.iter().enumerate() {
            if !indicator.report(i as f64 / roots.len() as f64) {
                debug!("STEP transfer stopped after {} roots", nb_transferred);
                return false;
            }

            let name = if self.modes.name {
                root.arg(0)
                    .and_then(StepValue::as_bytes)
                    .map(|raw| encoding.decode(raw).0.into_owned())
                    .unwrap_or_default()
            } else {
                String::new()
            };

            match transfer_root(model, root) {
                Some(shape) => {
                    doc.new_shape(shape, name);
                    nb_transferred += 1;
                }
                None => debug!("Skipped STEP root #{} ({})", root.id, root.type_name),
            }
        }
        indicator.report(1.0);

        nb_transferred > 0
    }
}

fn transfer_root(model: &StepModel, root: &StepEntity) -> Option<Shape> {
    if root.type_name == "SHELL_BASED_SURFACE_MODEL" {
        let shells: Vec<Shape> = root
            .arg(1)?
            .as_list()?
            .iter()
            .filter_map(|v| shell(model, v.as_entity_ref()?))
            .map(Shape::Shell)
            .collect();
        return Shape::from_shapes(shells);
    }
    let outer = root.arg(1)?.as_entity_ref()?;
    Some(Shape::Solid(Solid::new(shell(model, outer)?)))
}

fn shell(model: &StepModel, id: u64) -> Option<Shell> {
    let entity = model.get(id)?;
    if entity.type_name != "CLOSED_SHELL" && entity.type_name != "OPEN_SHELL" {
        return None;
    }
    let faces: Vec<Face> = entity
        .arg(1)?
        .as_list()?
        .iter()
        .filter_map(|v| face(model, v.as_entity_ref()?))
        .collect();
    if faces.is_empty() {
        None
    } else {
        Some(Shell::new(faces))
    }
}

fn face(model: &StepModel, id: u64) -> Option<Face> {
    let entity = model.get(id)?;
    if !FACE_TYPES.contains(&entity.type_name.as_str()) {
        return None;
    }
    let bounds: Vec<&StepEntity> = entity
        .arg(1)?
        .as_list()?
        .iter()
        .filter_map(|v| model.get(v.as_entity_ref()?))
        .collect();
    let bound = bounds
        .iter()
        .find(|b| b.type_name == "FACE_OUTER_BOUND")
        .or_else(|| bounds.first())?;

    let poly_loop = model.get(bound.arg(1)?.as_entity_ref()?)?;
    if poly_loop.type_name != "POLY_LOOP" {
        return None;
    }
    let mut points: Vec<Point3> = poly_loop
        .arg(1)?
        .as_list()?
        .iter()
        .map(|v| point(model, v.as_entity_ref()?))
        .collect::<Option<_>>()?;
    if bound.arg(2).and_then(StepValue::as_enum) == Some("F") {
        points.reverse();
    }
    Face::new(points)
}

fn point(model: &StepModel, id: u64) -> Option<Point3> {
    let entity = model.get(id)?;
    if entity.type_name != "CARTESIAN_POINT" {
        return None;
    }
    let coords = entity.arg(1)?.as_list()?;
    let c = |i: usize| coords.get(i).and_then(StepValue::as_real);
    Some(Point3::new(c(0)?, c(1)?, c(2).unwrap_or(0.0)))
}
