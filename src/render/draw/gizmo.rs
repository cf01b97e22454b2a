//! Ball-and-arrows visual of the reference origin. Picking is analytic (see
//! `render::gizmo`), so no hit meshes are spawned.

use super::common::spawn_label;
use crate::render::components::{GizmoLabel, GizmoRoot, LabelSet};
use crate::render::gizmo::{
    BALL_COLOR, BALL_RADIUS, GizmoAxis, GizmoController, LABEL_OFFSET, SHAFT_LENGTH, SHAFT_RADIUS,
    TIP_LENGTH, TIP_OFFSET, TIP_RADIUS,
};
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

const LABEL_SIZE: f32 = 0.35;

/// Arrows are modelled along +Y and rotated onto their axis.
fn arrow_rotation(axis: GizmoAxis) -> Quat {
    match axis {
        GizmoAxis::X => Quat::from_rotation_z(-FRAC_PI_2),
        GizmoAxis::Y => Quat::IDENTITY,
        GizmoAxis::Z => Quat::from_rotation_x(FRAC_PI_2),
    }
}

pub fn spawn_gizmo(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    gizmo: &GizmoController,
    visible: bool,
) -> Entity {
    let visibility = if visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    let root = commands
        .spawn((
            GizmoRoot,
            Transform::from_translation(gizmo.position).with_scale(Vec3::splat(gizmo.scale)),
            visibility,
        ))
        .id();

    let ball = commands
        .spawn((
            Mesh3d(meshes.add(Sphere::new(BALL_RADIUS))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: BALL_COLOR.into(),
                perceptual_roughness: 0.4,
                ..default()
            })),
            Transform::IDENTITY,
        ))
        .id();
    commands.entity(root).add_child(ball);

    let shaft = meshes.add(Cylinder::new(SHAFT_RADIUS, SHAFT_LENGTH));
    let tip = meshes.add(Cone::new(TIP_RADIUS, TIP_LENGTH));
    for axis in GizmoAxis::ALL {
        let material = materials.add(StandardMaterial {
            base_color: axis.color().into(),
            emissive: LinearRgba::from(Color::from(axis.color())) * 0.2,
            ..default()
        });
        let arrow = commands
            .spawn((
                Transform::from_rotation(arrow_rotation(axis)),
                Visibility::Inherited,
            ))
            .id();
        let parts = [
            commands
                .spawn((
                    Mesh3d(shaft.clone()),
                    MeshMaterial3d(material.clone()),
                    Transform::from_xyz(0.0, SHAFT_LENGTH * 0.5, 0.0),
                ))
                .id(),
            commands
                .spawn((
                    Mesh3d(tip.clone()),
                    MeshMaterial3d(material),
                    Transform::from_xyz(0.0, TIP_OFFSET, 0.0),
                ))
                .id(),
        ];
        commands.entity(arrow).add_children(&parts);
        commands.entity(root).add_child(arrow);

        let label = spawn_label(
            commands,
            LabelSet::Gizmo,
            axis.label(),
            gizmo.position + axis.direction() * LABEL_OFFSET * gizmo.scale,
            LABEL_SIZE * gizmo.scale,
            axis.color(),
        );
        commands.entity(label).insert(GizmoLabel(axis));
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_point_along_their_axis() {
        for axis in GizmoAxis::ALL {
            let tip = arrow_rotation(axis) * Vec3::Y;
            assert!((tip - axis.direction()).length() < 1e-6, "{axis:?}");
        }
    }
}
