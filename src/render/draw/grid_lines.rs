//! Spawning of a [`GridLayout`] into the world.

use super::common::{line_list, spawn_label};
use crate::core::Palette;
use crate::render::components::{GridRoot, LabelSet};
use crate::render::grid::{GridLayout, LineWeight};
use bevy::prelude::*;

/// Plane labels are drawn at a fixed size.
const PLANE_LABEL_SIZE: f32 = 0.35;

/// Spawn every grid line as one line-list mesh per weight, plus tick and
/// plane labels. Returns the grid root; labels live outside it under
/// [`LabelSet::Grid`].
pub fn spawn_grid(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    layout: &GridLayout,
    palette: &Palette,
    visible: bool,
) -> Entity {
    let visibility = if visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    let root = commands
        .spawn((GridRoot, Transform::default(), visibility))
        .id();

    for (weight, color) in [
        (LineWeight::Major, palette.grid_major),
        (LineWeight::Minor, palette.grid_minor),
    ] {
        let segments = layout.segments(weight);
        if segments.is_empty() {
            continue;
        }
        let material = materials.add(StandardMaterial {
            base_color: color.into(),
            unlit: true,
            ..default()
        });
        let lines = commands
            .spawn((
                Mesh3d(meshes.add(line_list(segments))),
                MeshMaterial3d(material),
                Transform::IDENTITY,
            ))
            .id();
        commands.entity(root).add_child(lines);
    }

    for tick in &layout.ticks {
        spawn_label(
            commands,
            LabelSet::Grid,
            tick.text.clone(),
            tick.position,
            tick.scale,
            palette.tick_label,
        );
    }
    for label in &layout.plane_labels {
        spawn_label(
            commands,
            LabelSet::Grid,
            label.plane.name(),
            label.position,
            PLANE_LABEL_SIZE,
            palette.plane_label,
        );
    }
    root
}
