use super::RenderedNode;
use super::points::build_vertices;
use crate::buffers::BufferMap;
use crate::core::{SceneObjectSpec, SceneSpec};
use crate::Result;
use bevy_mesh::PrimitiveTopology;
use std::sync::Arc;

/// Connected polyline through the positions in buffer order.
pub fn build_line(
    obj: &Arc<SceneObjectSpec>,
    scene: &SceneSpec,
    buffers: &BufferMap,
) -> Result<RenderedNode> {
    build_vertices(obj, PrimitiveTopology::LineStrip, scene, buffers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::TypedView;
    use crate::core::{BufferSpec, Color, Dtype, ObjectKind, ROLE_POSITIONS};
    use crate::render::draw::MaterialMode;
    use bevy_mesh::{Mesh, VertexAttributeValues};

    #[test]
    fn keeps_vertex_order_and_style_color() {
        let mut obj = SceneObjectSpec::new(ObjectKind::Line);
        obj.buffers.insert(ROLE_POSITIONS.into(), "helix".into());
        obj.style
            .insert("color".into(), serde_json::json!([1.0, 0.5, 0.0]));
        let mut scene = SceneSpec::default();
        scene
            .buffers
            .insert("helix".into(), BufferSpec::new(Dtype::Float64, vec![3, 3]));
        let buffers = BufferMap::new().with(
            "helix",
            TypedView::F64(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]),
        );

        let node = build_line(&Arc::new(obj), &scene, &buffers).unwrap();
        assert_eq!(node.mesh.primitive_topology(), PrimitiveTopology::LineStrip);
        assert_eq!(node.material, MaterialMode::Uniform(Color::rgb(1.0, 0.5, 0.0)));
        let positions = node
            .mesh
            .attribute(Mesh::ATTRIBUTE_POSITION)
            .and_then(VertexAttributeValues::as_float3)
            .unwrap();
        assert_eq!(positions[2], [1.0, 1.0, 0.0]);
    }
}
