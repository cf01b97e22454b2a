use super::RenderedNode;
use super::common::{require_role, to_positions, vertex_values};
use crate::buffers::BufferMap;
use crate::core::{SceneObjectSpec, SceneSpec};
use crate::Result;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Mesh, PrimitiveTopology};
use std::sync::Arc;

/// Unconnected vertices, one per position triple.
pub fn build_points(
    obj: &Arc<SceneObjectSpec>,
    scene: &SceneSpec,
    buffers: &BufferMap,
) -> Result<RenderedNode> {
    build_vertices(obj, PrimitiveTopology::PointList, scene, buffers)
}

/// Points and lines share everything but the topology.
pub(super) fn build_vertices(
    obj: &Arc<SceneObjectSpec>,
    topology: PrimitiveTopology,
    scene: &SceneSpec,
    buffers: &BufferMap,
) -> Result<RenderedNode> {
    let (key, view) = require_role(obj, obj.kind.required_roles(), scene, buffers)?;
    let positions = to_positions(&key, &view)?;
    let count = positions.len();

    let mut mesh = Mesh::new(topology, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    let values_key = vertex_values(obj, scene, buffers, count)?.map(|v| v.attach(&mut mesh));

    Ok(RenderedNode::new(obj.clone(), mesh, Some(key), values_key))
}
