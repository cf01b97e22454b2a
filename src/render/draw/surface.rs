use super::RenderedNode;
use super::common::{compute_normals, require_role, to_positions, vertex_values};
use crate::buffers::BufferMap;
use crate::core::{SceneObjectSpec, SceneSpec};
use crate::{Result, SceneError};
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, Mesh, PrimitiveTopology};
use error_stack::Report;
use std::sync::Arc;

/// Two triangles per cell of a row-major `nu x nv` vertex grid.
///
/// For cell `(i, j)` with `a = i * nv + j`, `b = a + 1`, `c = a + nv`,
/// `d = c + 1` the triangles are `(a, c, b)` and `(b, c, d)`.
pub fn grid_indices(nu: usize, nv: usize) -> Vec<u32> {
    let cells = nu.saturating_sub(1) * nv.saturating_sub(1);
    let mut indices = Vec::with_capacity(cells * 6);
    for i in 0..nu.saturating_sub(1) {
        for j in 0..nv.saturating_sub(1) {
            let a = (i * nv + j) as u32;
            let b = a + 1;
            let c = a + nv as u32;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    indices
}

/// Structured surface from a flattened grid of positions and its
/// `metadata.grid` shape.
pub fn build_surface_grid(
    obj: &Arc<SceneObjectSpec>,
    scene: &SceneSpec,
    buffers: &BufferMap,
) -> Result<RenderedNode> {
    let shape = obj
        .grid_shape()
        .ok_or_else(|| Report::new(SceneError::MissingGridMetadata))?;
    let (key, view) = require_role(obj, obj.kind.required_roles(), scene, buffers)?;
    let positions = to_positions(&key, &view)?;
    if positions.len() != shape.vertex_count() {
        return Err(Report::new(SceneError::GridShapeMismatch {
            nu: shape.nu,
            nv: shape.nv,
            vertices: positions.len(),
        }));
    }
    let count = positions.len();

    let indices = grid_indices(shape.nu, shape.nv);
    let normals = compute_normals(&positions, Some(indices.as_slice()));
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(indices));
    let values_key = vertex_values(obj, scene, buffers, count)?.map(|v| v.attach(&mut mesh));

    Ok(RenderedNode::new(obj.clone(), mesh, Some(key), values_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::TypedView;
    use crate::core::{BufferSpec, Dtype, ObjectKind, ROLE_POSITIONS, ROLE_VALUES};
    use bevy_mesh::VertexAttributeValues;
    use std::collections::HashSet;

    #[test]
    fn index_count_and_range() {
        for (nu, nv) in [(2, 2), (2, 5), (4, 3), (7, 7)] {
            let indices = grid_indices(nu, nv);
            assert_eq!(indices.len(), (nu - 1) * (nv - 1) * 6);
            assert!(indices.iter().all(|&i| (i as usize) < nu * nv));
        }
    }

    #[test]
    fn winding_is_acb_then_bcd() {
        // 2 x 3 grid: a=1, b=2, c=4, d=5 for cell (0, 1).
        let indices = grid_indices(2, 3);
        assert_eq!(&indices[..6], &[0, 3, 1, 1, 3, 4]);
        assert_eq!(&indices[6..], &[1, 4, 2, 2, 4, 5]);
    }

    #[test]
    fn no_triangle_spans_the_a_d_diagonal() {
        let (nu, nv) = (3, 4);
        let indices = grid_indices(nu, nv);
        for (cell, tris) in indices.chunks_exact(6).enumerate() {
            let a = ((cell / (nv - 1)) * nv + cell % (nv - 1)) as u32;
            let d = a + nv as u32 + 1;
            for tri in tris.chunks_exact(3) {
                let set: HashSet<u32> = tri.iter().copied().collect();
                assert!(!(set.contains(&a) && set.contains(&d)));
            }
        }
    }

    fn surface(nu: u64, nv: u64, vertices: usize) -> (Arc<SceneObjectSpec>, SceneSpec, BufferMap) {
        let mut obj = SceneObjectSpec::new(ObjectKind::SurfaceGrid);
        obj.buffers.insert(ROLE_POSITIONS.into(), "s".into());
        obj.buffers.insert(ROLE_VALUES.into(), "h".into());
        obj.metadata
            .insert("grid".into(), serde_json::json!({"Nu": nu, "Nv": nv}));
        let mut scene = SceneSpec::default();
        scene
            .buffers
            .insert("s".into(), BufferSpec::new(Dtype::Float32, vec![vertices, 3]));
        scene
            .buffers
            .insert("h".into(), BufferSpec::new(Dtype::Float32, vec![vertices]));
        let mut positions = Vec::new();
        for k in 0..vertices {
            let (i, j) = (k / nv as usize, k % nv as usize);
            positions.extend_from_slice(&[j as f32, 0.0, i as f32]);
        }
        let heights = (0..vertices).map(|k| k as f32).collect();
        let buffers = BufferMap::new()
            .with("s", TypedView::F32(positions))
            .with("h", TypedView::F32(heights));
        (Arc::new(obj), scene, buffers)
    }

    #[test]
    fn flat_surface_faces_up() {
        let (obj, scene, buffers) = surface(3, 3, 9);
        let node = build_surface_grid(&obj, &scene, &buffers).unwrap();
        assert_eq!(node.mesh.indices().map(Indices::len), Some(24));
        let normals = node
            .mesh
            .attribute(Mesh::ATTRIBUTE_NORMAL)
            .and_then(VertexAttributeValues::as_float3)
            .unwrap();
        // Columns run along +x and rows along +z, so (a, c, b) winds towards +y.
        assert!(normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
        assert_eq!(node.values_key.as_deref(), Some("h"));
    }

    #[test]
    fn grid_metadata_is_required() {
        let (obj, scene, buffers) = surface(3, 3, 9);
        let mut bare = (*obj).clone();
        bare.metadata.clear();
        let err = build_surface_grid(&Arc::new(bare), &scene, &buffers).unwrap_err();
        assert_eq!(err.current_context(), &SceneError::MissingGridMetadata);

        let (obj, scene, buffers) = surface(1, 9, 9);
        let err = build_surface_grid(&obj, &scene, &buffers).unwrap_err();
        assert_eq!(err.current_context(), &SceneError::MissingGridMetadata);
    }

    #[test]
    fn vertex_count_must_match_shape() {
        let (obj, scene, buffers) = surface(3, 3, 8);
        let err = build_surface_grid(&obj, &scene, &buffers).unwrap_err();
        assert_eq!(
            err.current_context(),
            &SceneError::GridShapeMismatch {
                nu: 3,
                nv: 3,
                vertices: 8
            }
        );
    }
}
