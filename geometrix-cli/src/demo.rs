//! Built-in demo scene: a helix, a wave surface and a point cloud.

use bevy_math::Vec3;
use geometrix::buffers::DecodedPayload;
use geometrix::builder::scene;
use geometrix::core::{Color, GridSpace, ObjectKind};

const SURFACE_N: usize = 32;
const HELIX_SAMPLES: usize = 200;

fn wave(phase: f32) -> (Vec<Vec3>, Vec<f32>) {
    let mut positions = Vec::with_capacity(SURFACE_N * SURFACE_N);
    let mut heights = Vec::with_capacity(SURFACE_N * SURFACE_N);
    for i in 0..SURFACE_N {
        for j in 0..SURFACE_N {
            let x = -2.0 + 4.0 * i as f32 / (SURFACE_N - 1) as f32;
            let z = -2.0 + 4.0 * j as f32 / (SURFACE_N - 1) as f32;
            let y = 0.5 * (x * 1.5 + phase).sin() * (z * 1.5).cos();
            positions.push(Vec3::new(x, y, z));
            heights.push(y);
        }
    }
    (positions, heights)
}

fn helix() -> Vec<Vec3> {
    (0..HELIX_SAMPLES)
        .map(|i| {
            let t = i as f32 / (HELIX_SAMPLES - 1) as f32 * 6.0 * std::f32::consts::PI;
            Vec3::new(t.cos() * 1.5, 1.0 + t / 10.0, t.sin() * 1.5)
        })
        .collect()
}

fn cloud() -> Vec<Vec3> {
    // Deterministic golden-angle spiral on a sphere.
    let n = 400;
    let golden = std::f32::consts::PI * (3.0 - 5f32.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            Vec3::new(r * theta.cos(), y, r * theta.sin()) * 0.6 + Vec3::new(0.0, -1.2, 0.0)
        })
        .collect()
}

pub fn demo_scene(animate: bool, frames: usize, space: GridSpace) -> DecodedPayload {
    let (surface, heights) = wave(0.0);
    let points = cloud();
    let point_values: Vec<f32> = points.iter().map(|p| p.y).collect();

    let mut builder = scene()
        .add_surface(SURFACE_N, SURFACE_N, &surface, |o| o.name("wave").values(heights))
        .add_line(&helix(), |o| o.name("helix").color(Color::hex(0xffc857)))
        .add_points(&points, |o| o.name("cloud").values(point_values))
        .grid_space(space)
        .legend(None)
        .camera(Vec3::new(5.0, 4.0, 5.0), Vec3::ZERO);

    if animate && frames > 0 {
        builder = builder.animation(30.0, true);
        for k in 0..frames {
            let phase = k as f32 / frames as f32 * std::f32::consts::TAU;
            let (positions, heights) = wave(phase);
            builder = builder.frame(|f| {
                f.positions(0, &ObjectKind::SurfaceGrid, &positions)
                    .values(0, heights)
            });
        }
    }
    builder.build()
}
