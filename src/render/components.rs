use super::gizmo::GizmoAxis;
use crate::core::SceneObjectSpec;
use bevy::prelude::*;
use std::sync::Arc;

/// Parent of every node of the current scene version.
#[derive(Component)]
pub struct ObjectsRoot;

/// A spawned scene object, carrying the spec it was built from.
#[derive(Component, Clone, Debug)]
pub struct SceneNode {
    pub spec: Arc<SceneObjectSpec>,
}

/// Material that takes the theme's primitive color.
#[derive(Component)]
pub struct ThemedMaterial;

#[derive(Component)]
pub struct GridRoot;

#[derive(Component)]
pub struct AxesRoot;

#[derive(Component)]
pub struct GizmoRoot;

/// Which overlay a screen-space label belongs to; labels are despawned and
/// respawned per set.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelSet {
    Grid,
    Axes,
    Gizmo,
}

/// UI text pinned to a world position.
#[derive(Component, Clone, Copy, Debug)]
pub struct WorldLabel {
    pub anchor: Vec3,
    /// Glyph height in world units.
    pub size: f32,
}

/// Gizmo labels follow the gizmo along their axis.
#[derive(Component, Clone, Copy, Debug)]
pub struct GizmoLabel(pub GizmoAxis);

/// Orbit camera state, driven by mouse drag and wheel.
#[derive(Component, Clone, Copy, Debug)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Cleared while the gizmo is being dragged.
    pub enabled: bool,
    pub orbit_speed: f32,
    pub pan_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            radius: 12.0,
            yaw: 0.8,
            pitch: 0.4,
            enabled: true,
            orbit_speed: 0.01,
            pan_speed: 0.005,
        }
    }
}

impl OrbitCamera {
    /// Orbit state that reproduces a camera placed at `eye` looking at `target`.
    pub fn looking_from(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let radius = offset.length().max(1e-3);
        let dir = offset / radius;
        Self {
            target,
            radius,
            yaw: dir.x.atan2(dir.z),
            pitch: dir.y.clamp(-1.0, 1.0).asin(),
            ..default()
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vec3::new(sy * cp, sp, cy * cp) * self.radius
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.target, Vec3::Y)
    }
}

/// Directional or point light whose intensity follows the lighting control.
#[derive(Component, Clone, Copy, Debug)]
pub struct SceneLight {
    /// Intensity at lighting multiplier 1.
    pub base: f32,
}

#[derive(Component)]
pub struct HoverReadout;

#[derive(Component)]
pub struct GizmoReadout;

#[derive(Component)]
pub struct LegendPanel;

/// Message line for the last scene build failure.
#[derive(Component)]
pub struct ErrorBanner;
