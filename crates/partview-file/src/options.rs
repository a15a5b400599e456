//! 导入导出选项
//!
//! STEP/IGES 的选项在调用期间写入内核静态变量（见 [`crate::session`]），
//! STL 的选项直接交给写出器。整组选项可以保存为 JSON。

use crate::error::IoResult;
use crate::session::StaticVariablesRollback;
use partview_core::units::LengthUnit;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// STL 读写实现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StlIoLibrary {
    /// 内核自带读写器，每个文件一个网格
    Kernel,
    /// 流式网格库，一个文件可有多个实体
    #[default]
    MeshIo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StlFormat {
    Ascii,
    #[default]
    Binary,
}

/// 文本 STL 中浮点数的写法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StlFloat32Format {
    Decimal,
    #[default]
    ScientificLower,
    ScientificUpper,
    Shortest,
}

/// 导出选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub stl_format: StlFormat,
    pub stl_ascii_solid_name: String,
    pub stl_ascii_float32_format: StlFloat32Format,
    /// 有效位数 1..=9
    pub stl_ascii_float32_precision: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            stl_format: StlFormat::default(),
            stl_ascii_solid_name: String::new(),
            stl_ascii_float32_format: StlFloat32Format::default(),
            stl_ascii_float32_precision: 9,
        }
    }
}

/// STEP 读取时使用的产品上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProductContext {
    #[default]
    Both,
    Design,
    Analysis,
}

impl ProductContext {
    fn code(self) -> i32 {
        match self {
            ProductContext::Both => 1,
            ProductContext::Design => 2,
            ProductContext::Analysis => 3,
        }
    }
}

/// STEP 读取时把哪一层当作装配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssemblyLevel {
    #[default]
    All,
    Assembly,
    Structure,
    Shape,
}

impl AssemblyLevel {
    fn code(self) -> i32 {
        match self {
            AssemblyLevel::All => 1,
            AssemblyLevel::Assembly => 2,
            AssemblyLevel::Structure => 3,
            AssemblyLevel::Shape => 4,
        }
    }
}

/// 优先读取的形状表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapeRepresentation {
    #[default]
    All,
    AdvancedBRep,
    ManifoldSurface,
    GeometricallyBoundedSurface,
    FacettedBRep,
    EdgeBasedWireframe,
    GeometricallyBoundedWireframe,
}

impl ShapeRepresentation {
    fn code(self) -> i32 {
        match self {
            ShapeRepresentation::All => 1,
            ShapeRepresentation::AdvancedBRep => 2,
            ShapeRepresentation::ManifoldSurface => 3,
            ShapeRepresentation::GeometricallyBoundedSurface => 4,
            ShapeRepresentation::FacettedBRep => 5,
            ShapeRepresentation::EdgeBasedWireframe => 6,
            ShapeRepresentation::GeometricallyBoundedWireframe => 7,
        }
    }
}

/// STEP 字符串字面量的编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepEncoding {
    Sjis,
    Euc,
    Ansi,
    Gb,
    #[default]
    Utf8,
    Cp1250,
    Cp1251,
    Cp1252,
    Cp1253,
    Cp1254,
    Cp1255,
    Cp1256,
    Cp1257,
    Cp1258,
    Iso8859_1,
    Iso8859_2,
    Iso8859_3,
    Iso8859_4,
    Iso8859_5,
    Iso8859_6,
    Iso8859_7,
    Iso8859_8,
    Iso8859_9,
}

impl StepEncoding {
    /// `read.step.codepage` 的取值
    pub fn codepage(self) -> &'static str {
        match self {
            StepEncoding::Sjis => "SJIS",
            StepEncoding::Euc => "EUC",
            StepEncoding::Ansi => "ANSI",
            StepEncoding::Gb => "GB",
            StepEncoding::Utf8 => "UTF8",
            StepEncoding::Cp1250 => "CP1250",
            StepEncoding::Cp1251 => "CP1251",
            StepEncoding::Cp1252 => "CP1252",
            StepEncoding::Cp1253 => "CP1253",
            StepEncoding::Cp1254 => "CP1254",
            StepEncoding::Cp1255 => "CP1255",
            StepEncoding::Cp1256 => "CP1256",
            StepEncoding::Cp1257 => "CP1257",
            StepEncoding::Cp1258 => "CP1258",
            StepEncoding::Iso8859_1 => "ISO8859-1",
            StepEncoding::Iso8859_2 => "ISO8859-2",
            StepEncoding::Iso8859_3 => "ISO8859-3",
            StepEncoding::Iso8859_4 => "ISO8859-4",
            StepEncoding::Iso8859_5 => "ISO8859-5",
            StepEncoding::Iso8859_6 => "ISO8859-6",
            StepEncoding::Iso8859_7 => "ISO8859-7",
            StepEncoding::Iso8859_8 => "ISO8859-8",
            StepEncoding::Iso8859_9 => "ISO8859-9",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepReadOptions {
    pub product_context: ProductContext,
    pub assembly_level: AssemblyLevel,
    pub preferred_shape_representation: ShapeRepresentation,
    pub read_shape_aspect: bool,
    pub encoding: StepEncoding,
}

impl Default for StepReadOptions {
    fn default() -> Self {
        Self {
            product_context: ProductContext::default(),
            assembly_level: AssemblyLevel::default(),
            preferred_shape_representation: ShapeRepresentation::default(),
            read_shape_aspect: true,
            encoding: StepEncoding::default(),
        }
    }
}

impl StepReadOptions {
    pub fn apply(&self, rollback: &mut StaticVariablesRollback<'_>) {
        rollback.change("read.step.product.context", self.product_context.code());
        rollback.change("read.step.assembly.level", self.assembly_level.code());
        rollback.change("read.step.shape.repr", self.preferred_shape_representation.code());
        rollback.change("read.step.shape.aspect", self.read_shape_aspect);
        rollback.change("read.step.codepage", self.encoding.codepage());
    }
}

/// STEP 应用协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepSchema {
    #[default]
    Ap214Cd,
    Ap214Dis,
    Ap203,
    Ap214Is,
    Ap242Dis,
}

impl StepSchema {
    fn code(self) -> i32 {
        match self {
            StepSchema::Ap214Cd => 1,
            StepSchema::Ap214Dis => 2,
            StepSchema::Ap203 => 3,
            StepSchema::Ap214Is => 4,
            StepSchema::Ap242Dis => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssemblyMode {
    #[default]
    Skip,
    Write,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FreeVertexMode {
    /// 所有自由顶点放在一个组合中
    #[default]
    Compound,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepWriteOptions {
    pub schema: StepSchema,
    pub assembly_mode: AssemblyMode,
    pub free_vertex_mode: FreeVertexMode,
    pub write_parametric_curves: bool,
}

impl Default for StepWriteOptions {
    fn default() -> Self {
        Self {
            schema: StepSchema::default(),
            assembly_mode: AssemblyMode::default(),
            free_vertex_mode: FreeVertexMode::default(),
            write_parametric_curves: true,
        }
    }
}

impl StepWriteOptions {
    pub fn apply(&self, rollback: &mut StaticVariablesRollback<'_>) {
        rollback.change("write.step.schema", self.schema.code());
        let assembly = match self.assembly_mode {
            AssemblyMode::Skip => 0,
            AssemblyMode::Write => 1,
            AssemblyMode::Auto => 2,
        };
        rollback.change("write.step.assembly", assembly);
        let vertex = match self.free_vertex_mode {
            FreeVertexMode::Compound => 0,
            FreeVertexMode::Single => 1,
        };
        rollback.change("write.step.vertex.mode", vertex);
        rollback.change("write.surfacecurve.mode", self.write_parametric_curves);
    }
}

/// IGES B 样条曲线按连续性拆分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BSplineContinuity {
    NoChange,
    #[default]
    BreakIntoC1,
    BreakIntoC2,
}

/// 曲面上曲线优先使用二维还是三维表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SurfaceCurveMode {
    #[default]
    Default,
    Prefer2d,
    Force2d,
    Prefer3d,
    Force3d,
}

impl SurfaceCurveMode {
    fn code(self) -> i32 {
        match self {
            SurfaceCurveMode::Default => 0,
            SurfaceCurveMode::Prefer2d => 2,
            SurfaceCurveMode::Force2d => -2,
            SurfaceCurveMode::Prefer3d => 3,
            SurfaceCurveMode::Force3d => -3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadPrecisionMode {
    /// 使用文件中的最小分辨率
    #[default]
    File,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgesReadOptions {
    pub bspline_continuity: BSplineContinuity,
    pub surface_curve_mode: SurfaceCurveMode,
    pub precision_mode: ReadPrecisionMode,
    pub precision_value: f64,
    pub read_faulty_entities: bool,
    pub read_only_visible: bool,
}

impl Default for IgesReadOptions {
    fn default() -> Self {
        Self {
            bspline_continuity: BSplineContinuity::default(),
            surface_curve_mode: SurfaceCurveMode::default(),
            precision_mode: ReadPrecisionMode::default(),
            precision_value: 1e-4,
            read_faulty_entities: false,
            read_only_visible: false,
        }
    }
}

impl IgesReadOptions {
    pub fn apply(&self, rollback: &mut StaticVariablesRollback<'_>) {
        let continuity = match self.bspline_continuity {
            BSplineContinuity::NoChange => 0,
            BSplineContinuity::BreakIntoC1 => 1,
            BSplineContinuity::BreakIntoC2 => 2,
        };
        rollback.change("read.iges.bspline.continuity", continuity);
        rollback.change("read.surfacecurve.mode", self.surface_curve_mode.code());
        let precision_mode = match self.precision_mode {
            ReadPrecisionMode::File => 0,
            ReadPrecisionMode::User => 1,
        };
        rollback.change("read.precision.mode", precision_mode);
        rollback.change("read.precision.val", self.precision_value);
        rollback.change("read.iges.faulty.entities", self.read_faulty_entities);
        rollback.change("read.iges.onlyvisible", self.read_only_visible);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BRepMode {
    #[default]
    Faces,
    BRep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaneMode {
    #[default]
    Plane,
    BSpline,
}

/// 写出精度取法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WritePrecisionMode {
    Least,
    #[default]
    Average,
    Greatest,
    Session,
}

impl WritePrecisionMode {
    fn code(self) -> i32 {
        match self {
            WritePrecisionMode::Least => -1,
            WritePrecisionMode::Average => 0,
            WritePrecisionMode::Greatest => 1,
            WritePrecisionMode::Session => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgesWriteOptions {
    pub brep_mode: BRepMode,
    pub plane_mode: PlaneMode,
    pub length_unit: LengthUnit,
    pub precision_mode: WritePrecisionMode,
    pub precision_value: f64,
}

impl Default for IgesWriteOptions {
    fn default() -> Self {
        Self {
            brep_mode: BRepMode::default(),
            plane_mode: PlaneMode::default(),
            length_unit: LengthUnit::Millimeter,
            precision_mode: WritePrecisionMode::default(),
            precision_value: 1e-4,
        }
    }
}

impl IgesWriteOptions {
    pub fn apply(&self, rollback: &mut StaticVariablesRollback<'_>) {
        let brep_mode = match self.brep_mode {
            BRepMode::Faces => 0,
            BRepMode::BRep => 1,
        };
        rollback.change("write.iges.brep.mode", brep_mode);
        let plane_mode = match self.plane_mode {
            PlaneMode::Plane => 0,
            PlaneMode::BSpline => 1,
        };
        rollback.change("write.iges.plane.mode", plane_mode);
        rollback.change("write.iges.unit", self.length_unit.iges_name());
        rollback.change("write.precision.mode", self.precision_mode.code());
        rollback.change("write.precision.val", self.precision_value);
    }
}

/// 全部选项
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub stl_io_library: StlIoLibrary,
    pub export: ExportOptions,
    pub step_read: StepReadOptions,
    pub step_write: StepWriteOptions,
    pub iges_read: IgesReadOptions,
    pub iges_write: IgesWriteOptions,
}

impl Options {
    /// 从 JSON 文件加载，缺失的字段取默认值
    pub fn load(path: &Path) -> IoResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> IoResult {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
