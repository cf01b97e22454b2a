use super::RenderedNode;
use super::common::{compute_normals, require_role, resolve_role, to_positions, vertex_values};
use crate::buffers::BufferMap;
use crate::core::{ROLE_FACES, SceneObjectSpec, SceneSpec};
use crate::{Result, SceneError};
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, Mesh, PrimitiveTopology};
use error_stack::{Report, ResultExt};
use std::sync::Arc;

/// Triangle mesh from `vertices` (or `positions`) and optional `faces`.
///
/// Without faces, consecutive vertex triples are the triangles.
pub fn build_mesh(
    obj: &Arc<SceneObjectSpec>,
    scene: &SceneSpec,
    buffers: &BufferMap,
) -> Result<RenderedNode> {
    let (key, view) = require_role(obj, obj.kind.required_roles(), scene, buffers)?;
    let positions = to_positions(&key, &view)?;
    let count = positions.len();

    let faces = match resolve_role(obj, ROLE_FACES, scene, buffers)? {
        Some((faces_key, faces)) => Some(
            validate_faces(faces.to_u32_indices(), count)
                .ok_or_else(|| Report::new(SceneError::InvalidFaces(faces_key.clone())))
                .attach(format!("{} entries for {count} vertices", faces.len()))?,
        ),
        None => None,
    };

    let normals = compute_normals(&positions, faces.as_deref());
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    if let Some(faces) = faces {
        mesh.insert_indices(Indices::U32(faces));
    }
    let values_key = vertex_values(obj, scene, buffers, count)?.map(|v| v.attach(&mut mesh));

    Ok(RenderedNode::new(obj.clone(), mesh, Some(key), values_key))
}

fn validate_faces(indices: Option<Vec<u32>>, vertices: usize) -> Option<Vec<u32>> {
    let indices = indices?;
    let in_range = indices.iter().all(|&i| (i as usize) < vertices);
    (indices.len() % 3 == 0 && in_range).then_some(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::TypedView;
    use crate::core::{BufferSpec, Color, Dtype, ObjectKind, ROLE_POSITIONS, ROLE_VERTICES};
    use crate::render::draw::MaterialMode;
    use bevy_mesh::VertexAttributeValues;

    fn tetra_scene(faces: TypedView) -> (Arc<SceneObjectSpec>, SceneSpec, BufferMap) {
        let mut obj = SceneObjectSpec::new(ObjectKind::Mesh);
        obj.buffers.insert(ROLE_VERTICES.into(), "v".into());
        obj.buffers.insert(ROLE_FACES.into(), "f".into());
        let mut scene = SceneSpec::default();
        scene
            .buffers
            .insert("v".into(), BufferSpec::new(Dtype::Float32, vec![4, 3]));
        scene
            .buffers
            .insert("f".into(), BufferSpec::new(faces.dtype(), vec![4, 3]));
        let buffers = BufferMap::new()
            .with(
                "v",
                TypedView::F32(vec![
                    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
                ]),
            )
            .with("f", faces);
        (Arc::new(obj), scene, buffers)
    }

    #[test]
    fn indexed_mesh_has_normals_and_lit_material() {
        let (obj, scene, buffers) =
            tetra_scene(TypedView::U32(vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3]));
        let node = build_mesh(&obj, &scene, &buffers).unwrap();

        assert_eq!(node.mesh.primitive_topology(), PrimitiveTopology::TriangleList);
        assert_eq!(node.mesh.indices().map(Indices::len), Some(12));
        let normals = node
            .mesh
            .attribute(Mesh::ATTRIBUTE_NORMAL)
            .and_then(VertexAttributeValues::as_float3)
            .unwrap();
        assert_eq!(normals.len(), 4);
        assert!(normals.iter().all(|n| (bevy_math::Vec3::from_array(*n).length() - 1.0).abs() < 1e-5));
        assert_eq!(node.material, MaterialMode::Uniform(Color::WHITE));
        assert!(node.is_lit());
    }

    #[test]
    fn signed_face_buffers_are_accepted_when_non_negative() {
        let (obj, scene, buffers) = tetra_scene(TypedView::I32(vec![0, 1, 2]));
        assert!(build_mesh(&obj, &scene, &buffers).is_ok());
    }

    #[test]
    fn bad_faces_are_rejected() {
        for faces in [
            TypedView::U32(vec![0, 1, 9]),
            TypedView::U32(vec![0, 1]),
            TypedView::I32(vec![0, -1, 2]),
            TypedView::F32(vec![0.0, 1.0, 2.0]),
        ] {
            let (obj, scene, buffers) = tetra_scene(faces);
            let err = build_mesh(&obj, &scene, &buffers).unwrap_err();
            assert_eq!(err.current_context(), &SceneError::InvalidFaces("f".into()));
        }
    }

    #[test]
    fn unindexed_mesh_uses_vertex_triples() {
        let mut obj = SceneObjectSpec::new(ObjectKind::Mesh);
        obj.buffers.insert(ROLE_POSITIONS.into(), "p".into());
        let mut scene = SceneSpec::default();
        scene
            .buffers
            .insert("p".into(), BufferSpec::new(Dtype::Float32, vec![3, 3]));
        let buffers = BufferMap::new().with(
            "p",
            TypedView::F32(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
        );
        let node = build_mesh(&Arc::new(obj), &scene, &buffers).unwrap();
        assert!(node.mesh.indices().is_none());
        let normals = node
            .mesh
            .attribute(Mesh::ATTRIBUTE_NORMAL)
            .and_then(VertexAttributeValues::as_float3)
            .unwrap();
        assert_eq!(normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn mesh_without_geometry_names_vertices() {
        let obj = Arc::new(SceneObjectSpec::new(ObjectKind::Mesh));
        let err = build_mesh(&obj, &SceneSpec::default(), &BufferMap::new()).unwrap_err();
        assert_eq!(
            err.current_context(),
            &SceneError::MissingGeometryInput {
                kind: "mesh".into(),
                role: ROLE_VERTICES.into(),
            }
        );
    }
}
