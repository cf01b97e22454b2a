//! Data-anchored axis lines with their X/Y/Z labels.

use super::common::{line_list, spawn_label};
use crate::render::bounds::AxisLines;
use crate::render::components::{AxesRoot, LabelSet};
use crate::render::gizmo::GizmoAxis;
use bevy::prelude::*;

const AXIS_LABEL_SIZE: f32 = 0.35;

pub fn spawn_axes(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    axes: &AxisLines,
    visible: bool,
) -> Entity {
    let visibility = if visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    let root = commands
        .spawn((AxesRoot, Transform::default(), visibility))
        .id();

    for ((start, end), axis) in axes.segments().into_iter().zip(GizmoAxis::ALL) {
        let material = materials.add(StandardMaterial {
            base_color: axis.color().into(),
            unlit: true,
            ..default()
        });
        let line = commands
            .spawn((
                Mesh3d(meshes.add(line_list(vec![start.to_array(), end.to_array()]))),
                MeshMaterial3d(material),
                Transform::IDENTITY,
            ))
            .id();
        commands.entity(root).add_child(line);
        spawn_label(
            commands,
            LabelSet::Axes,
            axis.label(),
            end,
            AXIS_LABEL_SIZE,
            axis.color(),
        );
    }
    root
}
