//! Axis-constrained translation of the movable reference origin.
//!
//! The controller is independent from the ECS: systems feed it pointer rays,
//! device mouse deltas and the camera matrix, and copy `position` back onto the
//! gizmo entity.

use super::picking::{ray_segment, ray_sphere};
use crate::core::Color;
use bevy::prelude::Resource;
use bevy_math::{Mat4, Ray3d, Vec2, Vec3};

/// World units per projected pixel of pointer motion.
pub const DRAG_SENSITIVITY: f32 = 0.005;

// Arrow geometry in gizmo-local units, scaled by the gizmo scale.
pub const BALL_RADIUS: f32 = 0.12;
pub const SHAFT_RADIUS: f32 = 0.02;
pub const SHAFT_LENGTH: f32 = 0.6;
pub const TIP_RADIUS: f32 = 0.06;
pub const TIP_LENGTH: f32 = 0.2;
/// Center of the tip cone and of the invisible hit sphere.
pub const TIP_OFFSET: f32 = 0.7;
pub const HIT_RADIUS: f32 = 0.12;
pub const LABEL_OFFSET: f32 = 0.9;

pub const BALL_COLOR: Color = Color::hex(0xffc857);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GizmoAxis {
    X,
    Y,
    Z,
}

impl GizmoAxis {
    pub const ALL: [GizmoAxis; 3] = [GizmoAxis::X, GizmoAxis::Y, GizmoAxis::Z];

    pub fn direction(self) -> Vec3 {
        match self {
            GizmoAxis::X => Vec3::X,
            GizmoAxis::Y => Vec3::Y,
            GizmoAxis::Z => Vec3::Z,
        }
    }

    pub fn color(self) -> Color {
        match self {
            GizmoAxis::X => Color::hex(0xff6b6b),
            GizmoAxis::Y => Color::hex(0x6be675),
            GizmoAxis::Z => Color::hex(0x7aa2ff),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GizmoAxis::X => "X",
            GizmoAxis::Y => "Y",
            GizmoAxis::Z => "Z",
        }
    }
}

#[derive(Resource, Clone, Debug, PartialEq)]
pub struct GizmoController {
    pub position: Vec3,
    pub scale: f32,
    active: Option<GizmoAxis>,
}

impl Default for GizmoController {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: 1.0,
            active: None,
        }
    }
}

impl GizmoController {
    pub fn new(position: Vec3, scale: f32) -> Self {
        Self {
            position,
            scale,
            active: None,
        }
    }

    pub fn active_axis(&self) -> Option<GizmoAxis> {
        self.active
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Nearest arrow hit by `ray`. Only the arrows are tested, never the ball
    /// or the rest of the scene.
    pub fn pick(&self, ray: Ray3d) -> Option<GizmoAxis> {
        let s = self.scale;
        GizmoAxis::ALL
            .into_iter()
            .filter_map(|axis| {
                let dir = axis.direction();
                let tip = self.position + dir * TIP_OFFSET * s;
                let sphere = ray_sphere(ray, tip, HIT_RADIUS * s);
                let (gap, t, _) =
                    ray_segment(ray, self.position, self.position + dir * (SHAFT_LENGTH * s));
                let shaft = (gap <= SHAFT_RADIUS * s).then_some(t);
                let (gap, t, _) = ray_segment(
                    ray,
                    self.position + dir * (SHAFT_LENGTH * s),
                    self.position + dir * ((SHAFT_LENGTH + TIP_LENGTH) * s),
                );
                let cone = (gap <= TIP_RADIUS * s).then_some(t);
                [sphere, shaft, cone]
                    .into_iter()
                    .flatten()
                    .min_by(f32::total_cmp)
                    .map(|t| (axis, t))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(axis, _)| axis)
    }

    /// Start a drag if `ray` hits an arrow. Returns whether a drag started.
    pub fn pointer_down(&mut self, ray: Ray3d) -> bool {
        self.active = self.pick(ray);
        self.active.is_some()
    }

    /// Ends any drag unconditionally.
    pub fn pointer_up(&mut self) {
        self.active = None;
    }

    /// Translate along the active axis by the pointer delta projected onto the
    /// axis' on-screen direction. Returns the signed world distance moved.
    pub fn drag_by(&mut self, delta_px: Vec2, clip_from_world: Mat4) -> f32 {
        let Some(axis) = self.active else {
            return 0.0;
        };
        let dir = axis.direction();
        let Some(screen) = axis_screen_direction(clip_from_world, self.position, dir) else {
            return 0.0;
        };
        // Pointer y grows downwards, NDC y upwards.
        let amount = (delta_px.x * screen.x - delta_px.y * screen.y) * DRAG_SENSITIVITY;
        self.position += dir * amount;
        amount
    }

    pub fn readout(&self) -> String {
        let p = self.position;
        format!("Gizmo: x={:.2} y={:.2} z={:.2}", p.x, p.y, p.z)
    }
}

fn to_ndc(clip_from_world: Mat4, p: Vec3) -> Option<Vec2> {
    let clip = clip_from_world * p.extend(1.0);
    (clip.w > f32::EPSILON).then(|| Vec2::new(clip.x / clip.w, clip.y / clip.w))
}

/// Normalized direction in which `axis` runs on screen at `origin`, in NDC
/// orientation (y up). `None` when the axis points straight at the camera or
/// either end is behind it.
pub fn axis_screen_direction(clip_from_world: Mat4, origin: Vec3, axis: Vec3) -> Option<Vec2> {
    let from = to_ndc(clip_from_world, origin)?;
    let to = to_ndc(clip_from_world, origin + axis)?;
    (to - from).try_normalize()
}
