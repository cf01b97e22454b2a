//! Shared pieces of the primitive builders: buffer role lookup, attribute
//! conversion, normals and the scalar vertex attribute.

use crate::buffers::{BufferMap, TypedView, resolve};
use crate::colormap::{colorize, rgb_to_rgba};
use crate::core::{Color, ROLE_VALUES, SceneObjectSpec, SceneSpec};
use crate::render::components::{LabelSet, WorldLabel};
use crate::{Result, SceneError};
use bevy::prelude::{
    Commands, Entity, Node, PositionType, Text, TextColor, TextFont, Visibility, default,
};
use bevy::render::render_resource::VertexFormat;
use bevy_asset::RenderAssetUsages;
use bevy_math::Vec3;
use bevy_mesh::{Mesh, MeshVertexAttribute, PrimitiveTopology};
use error_stack::{Report, ResultExt};
use std::borrow::Cow;

/// Raw scalar per vertex, kept next to the derived colors for hover readouts.
pub const ATTRIBUTE_SCALAR: MeshVertexAttribute =
    MeshVertexAttribute::new("Vertex_Scalar", 988_540_917, VertexFormat::Float32);

/// Resolve the buffer bound to `role` on `obj`, if the object names one.
///
/// A key that the object references but the scene does not declare is a
/// missing buffer, the same as a key absent from the buffer map.
pub fn resolve_role<'a>(
    obj: &SceneObjectSpec,
    role: &str,
    scene: &SceneSpec,
    buffers: &'a BufferMap,
) -> Result<Option<(String, Cow<'a, TypedView>)>> {
    let Some(key) = obj.buffer_key(role) else {
        return Ok(None);
    };
    let Some(spec) = scene.buffers.get(key) else {
        return Err(Report::new(SceneError::MissingBuffer(key.to_string())))
            .attach(format!("{role} buffer is not declared by the scene"));
    };
    let view = resolve(key, spec, buffers).attach(format!("{role} buffer of {}", obj.label()))?;
    Ok(Some((key.to_string(), view)))
}

/// First of `roles` the object provides; the first role names the error.
pub fn require_role<'a>(
    obj: &SceneObjectSpec,
    roles: &[&str],
    scene: &SceneSpec,
    buffers: &'a BufferMap,
) -> Result<(String, Cow<'a, TypedView>)> {
    for role in roles {
        if let Some(found) = resolve_role(obj, role, scene, buffers)? {
            return Ok(found);
        }
    }
    Err(Report::new(SceneError::MissingGeometryInput {
        kind: obj.kind.name().to_string(),
        role: roles.first().copied().unwrap_or_default().to_string(),
    }))
}

/// Interpret a flat buffer as xyz triples.
pub fn to_positions(key: &str, view: &TypedView) -> Result<Vec<[f32; 3]>> {
    if view.len() % 3 != 0 {
        return Err(Report::new(SceneError::MalformedPositions(key.to_string())))
            .attach(format!("{} elements", view.len()));
    }
    let flat = view.to_f32_cow();
    Ok(flat.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect())
}

/// Scalar field bound to one object, already colorized.
pub struct VertexValues {
    pub key: String,
    pub scalars: Vec<f32>,
    pub colors: Vec<[f32; 4]>,
}

impl VertexValues {
    /// Insert the color and scalar attributes into `mesh`.
    pub fn attach(self, mesh: &mut Mesh) -> String {
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, self.colors);
        mesh.insert_attribute(ATTRIBUTE_SCALAR, self.scalars);
        self.key
    }
}

/// Resolve and colorize the object's `values` buffer.
///
/// The value count must equal `vertices`; anything else is rejected here
/// rather than producing partial coloring.
pub fn vertex_values(
    obj: &SceneObjectSpec,
    scene: &SceneSpec,
    buffers: &BufferMap,
    vertices: usize,
) -> Result<Option<VertexValues>> {
    let Some((key, view)) = resolve_role(obj, ROLE_VALUES, scene, buffers)? else {
        return Ok(None);
    };
    if view.len() != vertices {
        return Err(Report::new(SceneError::ValueCountMismatch {
            key,
            values: view.len(),
            vertices,
        }));
    }
    let scalars = view.to_f32_vec();
    let colors = rgb_to_rgba(&colorize(&scalars));
    Ok(Some(VertexValues {
        key,
        scalars,
        colors,
    }))
}

/// Smooth vertex normals of a triangle list.
///
/// `indices` are flat triples; without them consecutive vertex triples form
/// the triangles and a trailing partial triple is ignored.
pub fn compute_normals(positions: &[[f32; 3]], indices: Option<&[u32]>) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0; 3]; positions.len()];
    recompute_normals_into(positions, indices, &mut normals);
    normals
}

/// [`compute_normals`] into existing storage of the same length.
pub fn recompute_normals_into(
    positions: &[[f32; 3]],
    indices: Option<&[u32]>,
    normals: &mut [[f32; 3]],
) {
    normals.fill([0.0; 3]);
    let n = positions.len().min(normals.len());
    let pos = |i: usize| Vec3::from_array(positions[i]);

    let mut accumulate = |a: usize, b: usize, c: usize| {
        if a >= n || b >= n || c >= n {
            return;
        }
        let face = (pos(b) - pos(a)).cross(pos(c) - pos(a));
        for v in [a, b, c] {
            normals[v] = (Vec3::from_array(normals[v]) + face).to_array();
        }
    };

    match indices {
        Some(indices) => {
            for tri in indices.chunks_exact(3) {
                accumulate(tri[0] as usize, tri[1] as usize, tri[2] as usize);
            }
        }
        None => {
            for start in (0..n / 3).map(|t| t * 3) {
                accumulate(start, start + 1, start + 2);
            }
        }
    }

    for normal in normals.iter_mut() {
        *normal = Vec3::from_array(*normal).normalize_or_zero().to_array();
    }
}

/// Segment pairs as a single line-list mesh.
pub fn line_list(segments: Vec<[f32; 3]>) -> Mesh {
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, segments)
}

/// Screen-space text pinned to `anchor`. Hidden until the label system has
/// projected it once.
pub fn spawn_label(
    commands: &mut Commands,
    set: LabelSet,
    text: impl Into<String>,
    anchor: Vec3,
    size: f32,
    color: Color,
) -> Entity {
    commands
        .spawn((
            Text::new(text),
            TextFont {
                font_size: 12.0,
                ..default()
            },
            TextColor(color.into()),
            Node {
                position_type: PositionType::Absolute,
                ..default()
            },
            Visibility::Hidden,
            WorldLabel { anchor, size },
            set,
        ))
        .id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BufferSpec, Dtype, ObjectKind, ROLE_POSITIONS, ROLE_VERTICES};

    fn scene_with(obj: &SceneObjectSpec, keys: &[(&str, Dtype)]) -> SceneSpec {
        let mut scene = SceneSpec {
            objects: vec![obj.clone()],
            ..SceneSpec::default()
        };
        for (key, dtype) in keys {
            scene
                .buffers
                .insert(key.to_string(), BufferSpec::new(dtype.clone(), vec![]));
        }
        scene
    }

    #[test]
    fn quad_normals_point_up() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0]];
        let normals = compute_normals(&positions, Some(&[0, 2, 1, 1, 2, 3][..]));
        for n in normals {
            assert_eq!(n, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn unindexed_triples_and_unused_vertices() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [5.0, 5.0, 5.0]];
        let normals = compute_normals(&positions, None);
        assert_eq!(normals[0], [0.0, 0.0, 1.0]);
        assert_eq!(normals[3], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_range_triangles_are_skipped() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals = compute_normals(&positions, Some(&[0, 1, 7][..]));
        assert!(normals.iter().all(|n| *n == [0.0; 3]));
    }

    #[test]
    fn mesh_falls_back_to_positions_role() {
        let mut obj = SceneObjectSpec::new(ObjectKind::Mesh);
        obj.buffers.insert(ROLE_POSITIONS.into(), "p".into());
        let scene = scene_with(&obj, &[("p", Dtype::Float32)]);
        let buffers = BufferMap::new().with("p", TypedView::F32(vec![0.0; 9]));

        let (key, view) =
            require_role(&obj, &[ROLE_VERTICES, ROLE_POSITIONS], &scene, &buffers).unwrap();
        assert_eq!(key, "p");
        assert!(matches!(view, Cow::Borrowed(_)));
    }

    #[test]
    fn missing_role_names_the_primary_role() {
        let obj = SceneObjectSpec::new(ObjectKind::Mesh);
        let scene = scene_with(&obj, &[]);
        let err = require_role(&obj, &[ROLE_VERTICES, ROLE_POSITIONS], &scene, &BufferMap::new())
            .unwrap_err();
        assert_eq!(
            err.current_context(),
            &SceneError::MissingGeometryInput {
                kind: "mesh".into(),
                role: "vertices".into()
            }
        );
    }

    #[test]
    fn undeclared_key_is_a_missing_buffer() {
        let mut obj = SceneObjectSpec::new(ObjectKind::Points);
        obj.buffers.insert(ROLE_POSITIONS.into(), "p".into());
        let scene = scene_with(&obj, &[]);
        let buffers = BufferMap::new().with("p", TypedView::F32(vec![0.0; 3]));
        let err = resolve_role(&obj, ROLE_POSITIONS, &scene, &buffers).unwrap_err();
        assert_eq!(err.current_context(), &SceneError::MissingBuffer("p".into()));
    }

    #[test]
    fn positions_must_be_triples() {
        let err = to_positions("p", &TypedView::F32(vec![0.0; 4])).unwrap_err();
        assert_eq!(err.current_context(), &SceneError::MalformedPositions("p".into()));
        let ok = to_positions("p", &TypedView::I16(vec![1, 2, 3])).unwrap();
        assert_eq!(ok, vec![[1.0, 2.0, 3.0]]);
    }

    #[test]
    fn value_count_must_match_vertices() {
        let mut obj = SceneObjectSpec::new(ObjectKind::Points);
        obj.buffers.insert(ROLE_VALUES.into(), "v".into());
        let scene = scene_with(&obj, &[("v", Dtype::Float64)]);
        let buffers = BufferMap::new().with("v", TypedView::F64(vec![0.0, 1.0]));

        let err = vertex_values(&obj, &scene, &buffers, 3).err().unwrap();
        assert_eq!(
            err.current_context(),
            &SceneError::ValueCountMismatch {
                key: "v".into(),
                values: 2,
                vertices: 3
            }
        );

        let values = vertex_values(&obj, &scene, &buffers, 2).unwrap().unwrap();
        assert_eq!(values.colors.len(), 2);
        assert_eq!(values.colors[0], [0.1, 0.2, 0.6, 1.0]);
        assert_eq!(values.scalars, vec![0.0, 1.0]);
    }
}
