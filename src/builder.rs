use crate::buffers::{BufferMap, DecodedPayload, FrameBuffers, TypedView};
use crate::core::{
    AnimationSpec, BufferSpec, CameraSpec, Color, GridSpace, LightSpec, ObjectKind,
    ROLE_FACES, ROLE_POSITIONS, ROLE_VALUES, ROLE_VERTICES, SceneObjectSpec, SceneSpec, Theme,
};
use bevy_math::Vec3;
use serde_json::json;

pub fn scene() -> SceneBuilder {
    SceneBuilder {
        spec: SceneSpec::default(),
        buffers: BufferMap::new(),
        frames: vec![],
    }
}

/// Key under which the builder stores `role` of object `index`.
pub fn buffer_key(index: usize, role: &str) -> String {
    format!("obj{index}_{role}")
}

fn flatten(points: &[Vec3]) -> Vec<f32> {
    points.iter().flat_map(|p| p.to_array()).collect()
}

pub struct SceneBuilder {
    spec: SceneSpec,
    buffers: BufferMap,
    frames: Vec<FrameBuffers>,
}

impl SceneBuilder {
    fn push(mut self, object: ObjectBuilder, geometry: Vec<(&str, TypedView, Vec<usize>)>) -> Self {
        let index = self.spec.objects.len();
        let mut spec = object.spec;
        let roles = geometry
            .into_iter()
            .chain(object.values.map(|v| {
                let n = v.len();
                (ROLE_VALUES, TypedView::F32(v), vec![n])
            }));
        for (role, view, shape) in roles {
            let key = buffer_key(index, role);
            self.spec
                .buffers
                .insert(key.clone(), BufferSpec::new(view.dtype(), shape));
            self.buffers.insert(key.clone(), view);
            spec.buffers.insert(role.to_string(), key);
        }
        self.spec.objects.push(spec);
        self
    }

    pub fn add_points<F>(self, positions: &[Vec3], f: F) -> Self
    where
        F: FnOnce(ObjectBuilder) -> ObjectBuilder,
    {
        let b = f(ObjectBuilder::new(ObjectKind::Points));
        let shape = vec![positions.len(), 3];
        self.push(b, vec![(ROLE_POSITIONS, TypedView::F32(flatten(positions)), shape)])
    }

    pub fn add_line<F>(self, positions: &[Vec3], f: F) -> Self
    where
        F: FnOnce(ObjectBuilder) -> ObjectBuilder,
    {
        let b = f(ObjectBuilder::new(ObjectKind::Line));
        let shape = vec![positions.len(), 3];
        self.push(b, vec![(ROLE_POSITIONS, TypedView::F32(flatten(positions)), shape)])
    }

    /// Indexed triangle mesh. Without `faces`, consecutive vertex triples form
    /// the triangles.
    pub fn add_mesh<F>(self, vertices: &[Vec3], faces: Option<&[[u32; 3]]>, f: F) -> Self
    where
        F: FnOnce(ObjectBuilder) -> ObjectBuilder,
    {
        let b = f(ObjectBuilder::new(ObjectKind::Mesh));
        let mut geometry = vec![(
            ROLE_VERTICES,
            TypedView::F32(flatten(vertices)),
            vec![vertices.len(), 3],
        )];
        if let Some(faces) = faces {
            geometry.push((
                ROLE_FACES,
                TypedView::U32(faces.iter().flatten().copied().collect()),
                vec![faces.len(), 3],
            ));
        }
        self.push(b, geometry)
    }

    /// Row-major `nu x nv` surface; `positions` must hold `nu * nv` points.
    pub fn add_surface<F>(self, nu: usize, nv: usize, positions: &[Vec3], f: F) -> Self
    where
        F: FnOnce(ObjectBuilder) -> ObjectBuilder,
    {
        let mut b = f(ObjectBuilder::new(ObjectKind::SurfaceGrid));
        b.spec
            .metadata
            .insert("grid".into(), json!({"Nu": nu, "Nv": nv}));
        let shape = vec![nu, nv, 3];
        self.push(b, vec![(ROLE_POSITIONS, TypedView::F32(flatten(positions)), shape)])
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.spec.controls.theme = theme;
        self
    }

    pub fn lighting(mut self, lighting: f32) -> Self {
        self.spec.controls.lighting = lighting;
        self
    }

    pub fn lights(mut self, lights: Vec<LightSpec>) -> Self {
        self.spec.lights = lights;
        self
    }

    pub fn grid_space(mut self, space: GridSpace) -> Self {
        self.spec.grid.space = space;
        self
    }

    pub fn grid_divisions(mut self, x: u32, y: u32, z: u32) -> Self {
        self.spec.grid.divisions = Some([x, y, z]);
        self
    }

    pub fn show_grid(mut self, visible: bool) -> Self {
        self.spec.grid.visible = visible;
        self
    }

    pub fn show_axes(mut self, visible: bool) -> Self {
        self.spec.axes.visible = visible;
        self
    }

    pub fn show_gizmo(mut self, visible: bool) -> Self {
        self.spec.gizmo.visible = visible;
        self
    }

    pub fn legend(mut self, items: Option<Vec<String>>) -> Self {
        self.spec.legend.visible = true;
        self.spec.legend.items = items;
        self
    }

    pub fn camera(mut self, position: Vec3, target: Vec3) -> Self {
        self.spec.camera = CameraSpec {
            position: position.to_array(),
            target: target.to_array(),
            ..self.spec.camera
        };
        self
    }

    pub fn animation(mut self, fps: f32, looping: bool) -> Self {
        self.spec.animation = Some(AnimationSpec {
            fps,
            looping,
            frame_count: None,
        });
        self
    }

    /// Append an animation frame addressed by object index.
    pub fn frame<F>(mut self, f: F) -> Self
    where
        F: FnOnce(FrameBuilder) -> FrameBuilder,
    {
        self.frames.push(f(FrameBuilder::default()).frame);
        if let Some(anim) = self.spec.animation.as_mut() {
            anim.frame_count = Some(self.frames.len());
        }
        self
    }

    pub fn build(self) -> DecodedPayload {
        DecodedPayload {
            scene: self.spec,
            buffers: self.buffers,
            frames: self.frames,
        }
    }
}

pub struct ObjectBuilder {
    spec: SceneObjectSpec,
    values: Option<Vec<f32>>,
}

impl ObjectBuilder {
    fn new(kind: ObjectKind) -> Self {
        Self {
            spec: SceneObjectSpec::new(kind),
            values: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.spec.name = Some(name.into());
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.spec
            .style
            .insert("color".into(), json!([color.r, color.g, color.b]));
        self
    }

    /// One scalar per vertex, mapped through the colormap.
    pub fn values(mut self, values: Vec<f32>) -> Self {
        self.values = Some(values);
        self
    }
}

#[derive(Default)]
pub struct FrameBuilder {
    frame: FrameBuffers,
}

impl FrameBuilder {
    /// New positions for object `index` (its `positions` or `vertices` buffer).
    pub fn positions(mut self, index: usize, kind: &ObjectKind, points: &[Vec3]) -> Self {
        let role = match kind {
            ObjectKind::Mesh => ROLE_VERTICES,
            _ => ROLE_POSITIONS,
        };
        self.frame
            .insert(buffer_key(index, role), TypedView::F32(flatten(points)));
        self
    }

    pub fn values(mut self, index: usize, values: Vec<f32>) -> Self {
        self.frame
            .insert(buffer_key(index, ROLE_VALUES), TypedView::F32(values));
        self
    }
}
