use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const ROLE_POSITIONS: &str = "positions";
pub const ROLE_VERTICES: &str = "vertices";
pub const ROLE_FACES: &str = "faces";
pub const ROLE_VALUES: &str = "values";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
    /// `0xRRGGBB`, fully opaque.
    pub const fn hex(rgb: u32) -> Self {
        Self::rgb(
            ((rgb >> 16) & 0xff) as f32 / 255.0,
            ((rgb >> 8) & 0xff) as f32 / 255.0,
            (rgb & 0xff) as f32 / 255.0,
        )
    }

    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
}

impl From<Color> for bevy::prelude::Color {
    #[inline]
    fn from(c: Color) -> Self {
        bevy::prelude::Color::srgba(c.r, c.g, c.b, c.a)
    }
}

/// Element type of a flat numeric buffer.
///
/// Unknown names are kept so the failure surfaces when the buffer is resolved,
/// not when the scene JSON is parsed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Dtype {
    Float32,
    Float64,
    Int32,
    Uint32,
    Int16,
    Uint16,
    Int8,
    Uint8,
    Unsupported(String),
}

impl Dtype {
    pub fn name(&self) -> &str {
        match self {
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
            Dtype::Int32 => "int32",
            Dtype::Uint32 => "uint32",
            Dtype::Int16 => "int16",
            Dtype::Uint16 => "uint16",
            Dtype::Int8 => "int8",
            Dtype::Uint8 => "uint8",
            Dtype::Unsupported(name) => name,
        }
    }

    /// Size of one element in bytes, `None` for unsupported types.
    pub fn element_size(&self) -> Option<usize> {
        match self {
            Dtype::Float64 => Some(8),
            Dtype::Float32 | Dtype::Int32 | Dtype::Uint32 => Some(4),
            Dtype::Int16 | Dtype::Uint16 => Some(2),
            Dtype::Int8 | Dtype::Uint8 => Some(1),
            Dtype::Unsupported(_) => None,
        }
    }
}

impl From<String> for Dtype {
    fn from(s: String) -> Self {
        match s.as_str() {
            "float32" => Dtype::Float32,
            "float64" => Dtype::Float64,
            "int32" => Dtype::Int32,
            "uint32" => Dtype::Uint32,
            "int16" => Dtype::Int16,
            "uint16" => Dtype::Uint16,
            "int8" => Dtype::Int8,
            "uint8" => Dtype::Uint8,
            _ => Dtype::Unsupported(s),
        }
    }
}

impl From<Dtype> for String {
    fn from(d: Dtype) -> Self {
        d.name().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BufferSpec {
    pub dtype: Dtype,
    /// Advisory only, never enforced when decoding.
    #[serde(default)]
    pub shape: Vec<usize>,
}

impl BufferSpec {
    pub fn new(dtype: Dtype, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            dtype,
            shape: shape.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    Points,
    Line,
    Mesh,
    SurfaceGrid,
    Unsupported(String),
}

impl ObjectKind {
    pub fn name(&self) -> &str {
        match self {
            ObjectKind::Points => "points",
            ObjectKind::Line => "line",
            ObjectKind::Mesh => "mesh",
            ObjectKind::SurfaceGrid => "surface_grid",
            ObjectKind::Unsupported(name) => name,
        }
    }

    /// Geometry roles in lookup order; the first one present is used and the
    /// first one listed names the error when none is. Meshes accept
    /// `positions` in place of `vertices`.
    pub fn required_roles(&self) -> &'static [&'static str] {
        match self {
            ObjectKind::Points | ObjectKind::Line | ObjectKind::SurfaceGrid => &[ROLE_POSITIONS],
            ObjectKind::Mesh => &[ROLE_VERTICES, ROLE_POSITIONS],
            ObjectKind::Unsupported(_) => &[],
        }
    }

    pub fn is_triangulated(&self) -> bool {
        matches!(self, ObjectKind::Mesh | ObjectKind::SurfaceGrid)
    }
}

impl From<String> for ObjectKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "points" => ObjectKind::Points,
            "line" => ObjectKind::Line,
            "mesh" => ObjectKind::Mesh,
            "surface_grid" => ObjectKind::SurfaceGrid,
            _ => ObjectKind::Unsupported(s),
        }
    }
}

impl From<ObjectKind> for String {
    fn from(k: ObjectKind) -> Self {
        k.name().to_string()
    }
}

/// Row-major `Nu x Nv` layout of a surface grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridShape {
    pub nu: usize,
    pub nv: usize,
}

impl GridShape {
    pub fn vertex_count(&self) -> usize {
        self.nu * self.nv
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneObjectSpec {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    #[serde(default)]
    pub name: Option<String>,
    /// Logical role ("positions", "vertices", "faces", "values") to buffer key.
    pub buffers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
}

impl SceneObjectSpec {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            name: None,
            buffers: BTreeMap::new(),
            style: Map::new(),
            metadata: Map::new(),
        }
    }

    pub fn buffer_key(&self, role: &str) -> Option<&str> {
        self.buffers.get(role).map(String::as_str)
    }

    /// Key of the buffer that carries vertex positions for bounds scanning.
    pub fn position_key(&self) -> Option<&str> {
        self.buffer_key(ROLE_POSITIONS)
            .or_else(|| self.buffer_key(ROLE_VERTICES))
    }

    /// `metadata.grid = {Nu, Nv}` with both dimensions at least 2.
    pub fn grid_shape(&self) -> Option<GridShape> {
        let grid = self.metadata.get("grid")?;
        let nu = grid.get("Nu")?.as_u64()? as usize;
        let nv = grid.get("Nv")?.as_u64()? as usize;
        (nu >= 2 && nv >= 2).then_some(GridShape { nu, nv })
    }

    /// Uniform color hint `style.color = [r, g, b]`.
    pub fn style_color(&self) -> Option<Color> {
        let rgb = self.style.get("color")?.as_array()?;
        let channel = |i: usize| rgb.get(i).and_then(Value::as_f64).map(|v| v as f32);
        Some(Color::rgb(channel(0)?, channel(1)?, channel(2)?))
    }

    /// Legend text: the object's name, else its type.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridSpace {
    #[default]
    Cartesian,
    Cylindrical,
    Spherical,
}

impl GridSpace {
    pub fn next(self) -> Self {
        match self {
            GridSpace::Cartesian => GridSpace::Cylindrical,
            GridSpace::Cylindrical => GridSpace::Spherical,
            GridSpace::Spherical => GridSpace::Cartesian,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridDisplay {
    pub space: GridSpace,
    pub visible: bool,
    /// Explicit per-axis division counts; derived from the data when absent.
    pub divisions: Option<[u32; 3]>,
}

impl Default for GridDisplay {
    fn default() -> Self {
        Self {
            space: GridSpace::Cartesian,
            visible: true,
            divisions: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toggle {
    pub visible: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self { visible: true }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Theme-dependent constants, swapped as a whole when the theme changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub grid_major: Color,
    pub grid_minor: Color,
    /// Color of points/lines drawn without a scalar field.
    pub primitive: Color,
    pub tick_label: Color,
    pub plane_label: Color,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: Color::hex(0x0b0f1a),
                grid_major: Color::hex(0x3b4566),
                grid_minor: Color::hex(0x2b324f),
                primitive: Color::WHITE,
                tick_label: Color::hex(0x8b95ad),
                plane_label: Color::hex(0x9fb3ff),
            },
            Theme::Light => Palette {
                background: Color::WHITE,
                grid_major: Color::hex(0x111111),
                grid_minor: Color::hex(0x555555),
                primitive: Color::hex(0x111111),
                tick_label: Color::hex(0x555555),
                plane_label: Color::hex(0x3050c0),
            },
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    pub theme: Theme,
    /// Multiplier applied to every light's base intensity (0..=2).
    pub lighting: f32,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            lighting: 1.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Legend {
    pub visible: bool,
    pub items: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSpec {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSpec {
    fn default() -> Self {
        Self {
            position: [3.0, 3.0, 3.0],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 45.0,
            near: 0.01,
            far: 1000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LightSpec {
    Ambient { intensity: f32 },
    Directional { intensity: f32, position: [f32; 3] },
}

pub fn default_lights() -> Vec<LightSpec> {
    vec![
        LightSpec::Ambient { intensity: 0.7 },
        LightSpec::Directional {
            intensity: 0.8,
            position: [5.0, 5.0, 5.0],
        },
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSpec {
    pub fps: f32,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub frame_count: Option<usize>,
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self {
            fps: 30.0,
            looping: true,
            frame_count: None,
        }
    }
}

/// Declarative description of one renderable scene version.
///
/// There is no diffing between versions: a new spec replaces the previous
/// scene graph wholesale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneSpec {
    #[serde(default = "default_version")]
    pub version: String,
    pub objects: Vec<SceneObjectSpec>,
    pub buffers: BTreeMap<String, BufferSpec>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub camera: CameraSpec,
    #[serde(default = "default_lights", deserialize_with = "lights_or_default")]
    pub lights: Vec<LightSpec>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub axes: Toggle,
    #[serde(default, deserialize_with = "null_as_default")]
    pub grid: GridDisplay,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gizmo: Toggle,
    #[serde(default, deserialize_with = "null_as_default")]
    pub controls: Controls,
    #[serde(default, deserialize_with = "null_as_default")]
    pub legend: Legend,
    #[serde(default)]
    pub animation: Option<AnimationSpec>,
}

/// Widget payloads may carry `null` for absent sections; treat that like a missing key.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn lights_or_default<'de, D>(d: D) -> Result<Vec<LightSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<LightSpec>>::deserialize(d)?
        .filter(|lights| !lights.is_empty())
        .unwrap_or_else(default_lights))
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for SceneSpec {
    fn default() -> Self {
        Self {
            version: default_version(),
            objects: vec![],
            buffers: BTreeMap::new(),
            camera: CameraSpec::default(),
            lights: default_lights(),
            axes: Toggle::default(),
            grid: GridDisplay::default(),
            gizmo: Toggle::default(),
            controls: Controls::default(),
            legend: Legend::default(),
            animation: None,
        }
    }
}

impl SceneSpec {
    /// Legend entries: explicit items, else one per object.
    pub fn legend_items(&self) -> Vec<String> {
        self.legend.items.clone().unwrap_or_else(|| {
            self.objects
                .iter()
                .map(|o| o.label().to_string())
                .collect()
        })
    }
}

/// One base64-encoded buffer as delivered over the widget transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireBuffer {
    pub dtype: Dtype,
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
    pub data: String,
}

/// `{scene, buffers, frames?}` payload of the notebook widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WirePayload {
    pub scene: SceneSpec,
    pub buffers: BTreeMap<String, WireBuffer>,
    #[serde(default)]
    pub frames: Vec<BTreeMap<String, WireBuffer>>,
}
