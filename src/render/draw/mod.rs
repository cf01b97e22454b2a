//! Geometry construction and spawning.
//!
//! - `common`: buffer roles, normals, scalar attribute
//! - `points`, `line`, `mesh`, `surface`: one builder per object kind
//! - `grid_lines`, `axes`, `gizmo`: reference geometry spawned next to the scene
//!
//! Builders only produce [`RenderedNode`]s; nothing touches the world until
//! [`spawn_scene`].

pub mod axes;
pub mod common;
pub mod gizmo;
pub mod grid_lines;
mod line;
mod mesh;
mod points;
mod surface;

pub use axes::spawn_axes;
pub use gizmo::spawn_gizmo;
pub use grid_lines::spawn_grid;
pub use line::build_line;
pub use mesh::build_mesh;
pub use points::build_points;
pub use surface::{build_surface_grid, grid_indices};

use super::animation::AttributeBindings;
use super::components::{ObjectsRoot, SceneNode, ThemedMaterial};
use crate::buffers::BufferMap;
use crate::core::{Color, ObjectKind, Palette, SceneObjectSpec, SceneSpec};
use crate::{Result, SceneError};
use bevy::log::debug;
use bevy::prelude::{
    Assets, Commands, Entity, Mesh, Mesh3d, MeshMaterial3d, StandardMaterial, Transform,
    Visibility, default,
};
use error_stack::{Report, ResultExt};
use std::sync::Arc;

/// How a node is shaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaterialMode {
    /// Per-vertex colors from a scalar field.
    VertexColors,
    /// A fixed color from the object's style, or white for surfaces.
    Uniform(Color),
    /// Follows the theme's primitive color; used by points and lines without
    /// values or a style color.
    Themed,
}

/// One built object, ready to be spawned.
#[derive(Clone, Debug)]
pub struct RenderedNode {
    /// The object this node was built from, for hover correlation.
    pub spec: Arc<SceneObjectSpec>,
    pub mesh: Mesh,
    pub material: MaterialMode,
    /// Buffer keys that animation frames address this node by.
    pub position_key: Option<String>,
    pub values_key: Option<String>,
}

impl RenderedNode {
    pub fn new(
        spec: Arc<SceneObjectSpec>,
        mesh: Mesh,
        position_key: Option<String>,
        values_key: Option<String>,
    ) -> Self {
        let material = match (values_key.is_some(), spec.style_color()) {
            (true, _) => MaterialMode::VertexColors,
            (false, Some(color)) => MaterialMode::Uniform(color),
            (false, None) if spec.kind.is_triangulated() => MaterialMode::Uniform(Color::WHITE),
            (false, None) => MaterialMode::Themed,
        };
        Self {
            spec,
            mesh,
            material,
            position_key,
            values_key,
        }
    }

    /// Triangle geometry is lit and double sided; points and lines are unlit.
    pub fn is_lit(&self) -> bool {
        self.spec.kind.is_triangulated()
    }

    pub fn standard_material(&self, palette: &Palette) -> StandardMaterial {
        let base = match self.material {
            MaterialMode::VertexColors => Color::WHITE,
            MaterialMode::Uniform(color) => color,
            MaterialMode::Themed => palette.primitive,
        };
        let lit = self.is_lit();
        StandardMaterial {
            base_color: base.into(),
            unlit: !lit,
            double_sided: lit,
            cull_mode: None,
            perceptual_roughness: 0.6,
            metallic: 0.05,
            ..default()
        }
    }
}

/// Every node of one scene version, in object order.
#[derive(Clone, Debug, Default)]
pub struct BuiltScene {
    pub nodes: Vec<RenderedNode>,
}

impl BuiltScene {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Dispatch one object to the builder for its kind.
pub fn build_object(
    obj: &Arc<SceneObjectSpec>,
    scene: &SceneSpec,
    buffers: &BufferMap,
) -> Result<RenderedNode> {
    match &obj.kind {
        ObjectKind::Points => build_points(obj, scene, buffers),
        ObjectKind::Line => build_line(obj, scene, buffers),
        ObjectKind::Mesh => build_mesh(obj, scene, buffers),
        ObjectKind::SurfaceGrid => build_surface_grid(obj, scene, buffers),
        ObjectKind::Unsupported(name) => {
            Err(Report::new(SceneError::UnsupportedObjectType(name.clone())))
        }
    }
}

/// Build every object of `scene`. The first failing object fails the whole
/// build.
pub fn build_scene(scene: &SceneSpec, buffers: &BufferMap) -> Result<BuiltScene> {
    let nodes = scene
        .objects
        .iter()
        .enumerate()
        .map(|(i, obj)| {
            build_object(&Arc::new(obj.clone()), scene, buffers)
                .attach(format!("object {i} ({})", obj.label()))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("built {} scene nodes", nodes.len());
    Ok(BuiltScene { nodes })
}

/// Spawn `built` under a fresh [`ObjectsRoot`] and record the attribute
/// bindings animation frames will write through.
pub fn spawn_scene(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    built: BuiltScene,
    palette: &Palette,
    bindings: &mut AttributeBindings,
) -> Entity {
    let root = commands
        .spawn((ObjectsRoot, Transform::default(), Visibility::default()))
        .id();

    for node in built.nodes {
        let material = materials.add(node.standard_material(palette));
        let RenderedNode {
            spec,
            mesh,
            material: mode,
            position_key,
            values_key,
        } = node;

        let handle = meshes.add(mesh);
        if let Some(key) = position_key {
            bindings.bind_positions(key, handle.clone());
        }
        if let Some(key) = &values_key {
            bindings.bind_values(key.clone(), handle.clone());
        }

        let mut entity = commands.spawn((
            Mesh3d(handle),
            MeshMaterial3d(material),
            Transform::IDENTITY,
            SceneNode { spec },
        ));
        if mode == MaterialMode::Themed {
            entity.insert(ThemedMaterial);
        }
        let child = entity.id();
        commands.entity(root).add_child(child);
    }
    root
}
