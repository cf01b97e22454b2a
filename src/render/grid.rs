//! Reference grid layout in cartesian, cylindrical and spherical space.
//!
//! Everything here is plain geometry; spawning the result into the world is
//! done by `draw::grid_lines`. A layout is always produced from scratch, there
//! is no incremental update.

use super::bounds::GridConfig;
use crate::core::GridSpace;
use bevy_math::Vec3;
use std::f32::consts::{PI, TAU};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineWeight {
    Major,
    Minor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Plane {
    XY,
    XZ,
    YZ,
}

impl Plane {
    pub fn name(self) -> &'static str {
        match self {
            Plane::XY => "XY",
            Plane::XZ => "XZ",
            Plane::YZ => "YZ",
        }
    }
}

/// Which structural part of the grid a line belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineGroup {
    /// One of the three cartesian coordinate planes.
    Plane(Plane),
    /// A z level of the cylindrical grid.
    Level(u32),
    /// A spherical shell, counted from 1.
    Shell(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct GridLine {
    pub points: Vec<Vec3>,
    pub weight: LineWeight,
    pub group: LineGroup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickAxis {
    X,
    Y,
    Z,
    R,
    Theta,
    Phi,
}

/// A numeric tick label anchored in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub axis: TickAxis,
    pub value: f32,
    pub text: String,
    pub position: Vec3,
    pub scale: f32,
}

impl Tick {
    fn new(axis: TickAxis, value: f32, position: Vec3, scale: f32) -> Self {
        Self {
            axis,
            value,
            text: format!("{value:.2}"),
            position,
            scale,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaneLabel {
    pub plane: Plane,
    pub position: Vec3,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridLayout {
    pub lines: Vec<GridLine>,
    pub ticks: Vec<Tick>,
    pub plane_labels: Vec<PlaneLabel>,
}

impl GridLayout {
    pub fn lines_in(&self, group: LineGroup) -> impl Iterator<Item = &GridLine> {
        self.lines.iter().filter(move |l| l.group == group)
    }

    /// Every line of `weight` flattened into segment pairs for a line-list mesh.
    pub fn segments(&self, weight: LineWeight) -> Vec<[f32; 3]> {
        let mut out = Vec::new();
        for line in self.lines.iter().filter(|l| l.weight == weight) {
            for pair in line.points.windows(2) {
                out.push(pair[0].to_array());
                out.push(pair[1].to_array());
            }
        }
        out
    }

    fn line(&mut self, points: Vec<Vec3>, weight: LineWeight, group: LineGroup) {
        self.lines.push(GridLine {
            points,
            weight,
            group,
        });
    }
}

/// Glyph scale for tick labels: denser grids get smaller labels.
pub fn label_scale_for(step: f32, span: f32) -> f32 {
    if span <= 0.0 {
        return 0.22;
    }
    (0.3 - (step / span) * 1.2).clamp(0.12, 0.3)
}

/// Upper bound on divisions per axis, whatever the scene asks for.
pub const MAX_DIVISIONS: u32 = 200;

pub fn build_grid(space: GridSpace, config: &GridConfig) -> GridLayout {
    let config = GridConfig {
        divisions: config.divisions.min(bevy_math::UVec3::splat(MAX_DIVISIONS)),
        ..*config
    };
    match space {
        GridSpace::Cartesian => cartesian(&config),
        GridSpace::Cylindrical => cylindrical(&config),
        GridSpace::Spherical => spherical(&config),
    }
}

fn weight_if(major: bool) -> LineWeight {
    if major {
        LineWeight::Major
    } else {
        LineWeight::Minor
    }
}

fn cartesian(config: &GridConfig) -> GridLayout {
    let GridConfig { min, max, divisions, .. } = *config;
    let span = max - min;
    let div = divisions.as_vec3();
    let step = Vec3::new(
        if divisions.x > 0 { span.x / div.x } else { span.x },
        if divisions.y > 0 { span.y / div.y } else { span.y },
        if divisions.z > 0 { span.z / div.z } else { span.z },
    );
    let stride = (divisions / 10).max(bevy_math::UVec3::ONE);
    let offset = span * 0.04;

    let mut layout = GridLayout::default();
    let at = |axis: usize, i: u32| min[axis] + step[axis] * i as f32;

    // XY at z = min
    let group = LineGroup::Plane(Plane::XY);
    for yi in 0..=divisions.y {
        let y = at(1, yi);
        let pts = vec![Vec3::new(min.x, y, min.z), Vec3::new(max.x, y, min.z)];
        layout.line(pts, weight_if(yi % stride.y == 0), group);
    }
    for xi in 0..=divisions.x {
        let x = at(0, xi);
        let pts = vec![Vec3::new(x, min.y, min.z), Vec3::new(x, max.y, min.z)];
        layout.line(pts, weight_if(xi % stride.x == 0), group);
    }

    // XZ at y = min
    let group = LineGroup::Plane(Plane::XZ);
    for xi in 0..=divisions.x {
        let x = at(0, xi);
        let pts = vec![Vec3::new(x, min.y, min.z), Vec3::new(x, min.y, max.z)];
        layout.line(pts, weight_if(xi % stride.x == 0), group);
    }
    for zi in 0..=divisions.z {
        let z = at(2, zi);
        let pts = vec![Vec3::new(min.x, min.y, z), Vec3::new(max.x, min.y, z)];
        layout.line(pts, weight_if(zi % stride.z == 0), group);
    }

    // YZ at x = min
    let group = LineGroup::Plane(Plane::YZ);
    for yi in 0..=divisions.y {
        let y = at(1, yi);
        let pts = vec![Vec3::new(min.x, y, min.z), Vec3::new(min.x, y, max.z)];
        layout.line(pts, weight_if(yi % stride.y == 0), group);
    }
    for zi in 0..=divisions.z {
        let z = at(2, zi);
        let pts = vec![Vec3::new(min.x, min.y, z), Vec3::new(min.x, max.y, z)];
        layout.line(pts, weight_if(zi % stride.z == 0), group);
    }

    layout.plane_labels = vec![
        PlaneLabel {
            plane: Plane::XY,
            position: Vec3::new(max.x, max.y, min.z),
        },
        PlaneLabel {
            plane: Plane::XZ,
            position: Vec3::new(max.x, min.y, max.z),
        },
        PlaneLabel {
            plane: Plane::YZ,
            position: Vec3::new(min.x, max.y, max.z),
        },
    ];

    let scale = Vec3::new(
        label_scale_for(step.x, span.x),
        label_scale_for(step.y, span.y),
        label_scale_for(step.z, span.z),
    );
    for i in (0..=divisions.x).filter(|i| i % stride.x == 0) {
        let v = at(0, i);
        let pos = Vec3::new(v, min.y - offset.y, min.z - offset.z);
        layout.ticks.push(Tick::new(TickAxis::X, v, pos, scale.x));
    }
    for i in (0..=divisions.y).filter(|i| i % stride.y == 0) {
        let v = at(1, i);
        let pos = Vec3::new(min.x - offset.x, v, min.z - offset.z);
        layout.ticks.push(Tick::new(TickAxis::Y, v, pos, scale.y));
    }
    for i in (0..=divisions.z).filter(|i| i % stride.z == 0) {
        let v = at(2, i);
        let pos = Vec3::new(max.x + offset.x, min.y - offset.y, v);
        layout.ticks.push(Tick::new(TickAxis::Z, v, pos, scale.z));
    }
    layout
}

fn major_ring(ri: u32, r_div: u32) -> bool {
    ri % (r_div / 3).max(1) == 0
}

fn cylindrical(config: &GridConfig) -> GridLayout {
    let GridConfig {
        min, max, size, divisions, ..
    } = *config;
    let r_max = [
        (min.x, min.y),
        (min.x, max.y),
        (max.x, min.y),
        (max.x, max.y),
    ]
    .into_iter()
    .map(|(x, y)| x.hypot(y))
    .fold(0.0, f32::max);
    let r_div = divisions.x.max(4);
    let phi_div = divisions.y.max(12);
    let z_div = divisions.z.max(4);
    let radius = |ri: u32| r_max * ri as f32 / r_div as f32;
    let angle = |pi: u32, n: u32| TAU * pi as f32 / n as f32;

    let mut layout = GridLayout::default();
    for zi in 0..=z_div {
        let z = min.z + size.z * zi as f32 / z_div as f32;
        let group = LineGroup::Level(zi);
        for ri in 1..=r_div {
            let r = radius(ri);
            let pts = (0..=phi_div)
                .map(|pi| {
                    let phi = angle(pi, phi_div);
                    Vec3::new(r * phi.cos(), r * phi.sin(), z)
                })
                .collect();
            layout.line(pts, weight_if(major_ring(ri, r_div)), group);
        }
        for pi in 0..phi_div {
            let phi = angle(pi, phi_div);
            let pts = (0..=r_div)
                .map(|ri| {
                    let r = radius(ri);
                    Vec3::new(r * phi.cos(), r * phi.sin(), z)
                })
                .collect();
            layout.line(pts, LineWeight::Minor, group);
        }
    }

    let z_ticks = z_div.min(6);
    let z_scale = label_scale_for(size.z / z_div as f32, size.z);
    for i in 0..=z_ticks {
        let z = min.z + size.z * i as f32 / z_ticks as f32;
        let pos = Vec3::new(r_max * 0.2, -r_max * 1.05, z);
        layout.ticks.push(Tick::new(TickAxis::Z, z, pos, z_scale));
    }
    let below = min.z - size.z * 0.05;
    let r_ticks = r_div.min(6);
    let r_scale = label_scale_for(r_max / r_div as f32, r_max);
    for i in 0..=r_ticks {
        let r = r_max * i as f32 / r_ticks as f32;
        layout
            .ticks
            .push(Tick::new(TickAxis::R, r, Vec3::new(r, 0.0, below), r_scale));
    }
    let phi_ticks = phi_div.min(8);
    let phi_scale = label_scale_for(TAU / phi_div as f32, TAU);
    for i in 0..phi_ticks {
        let phi = angle(i, phi_ticks);
        let pos = Vec3::new(r_max * phi.cos(), r_max * phi.sin(), below);
        layout.ticks.push(Tick::new(TickAxis::Phi, phi, pos, phi_scale));
    }
    layout
}

fn spherical(config: &GridConfig) -> GridLayout {
    let GridConfig {
        min, max, divisions, ..
    } = *config;
    let mut r_max = 0.0f32;
    for x in [min.x, max.x] {
        for y in [min.y, max.y] {
            for z in [min.z, max.z] {
                r_max = r_max.max(Vec3::new(x, y, z).length());
            }
        }
    }
    let r_div = divisions.x.max(4);
    let theta_div = divisions.y.max(8);
    let phi_div = divisions.z.max(12);
    let sphere = |r: f32, theta: f32, phi: f32| {
        Vec3::new(
            r * theta.sin() * phi.cos(),
            r * theta.sin() * phi.sin(),
            r * theta.cos(),
        )
    };
    let theta_at = |ti: u32| PI * ti as f32 / theta_div as f32;
    let phi_at = |pi: u32| TAU * pi as f32 / phi_div as f32;

    let mut layout = GridLayout::default();
    for ri in 1..=r_div {
        let r = r_max * ri as f32 / r_div as f32;
        let group = LineGroup::Shell(ri);
        let weight = weight_if(major_ring(ri, r_div));
        for ti in 1..theta_div {
            let theta = theta_at(ti);
            let pts = (0..=phi_div).map(|pi| sphere(r, theta, phi_at(pi))).collect();
            layout.line(pts, weight, group);
        }
        for pi in 0..phi_div {
            let phi = phi_at(pi);
            let pts = (0..=theta_div)
                .map(|ti| sphere(r, theta_at(ti), phi))
                .collect();
            layout.line(pts, LineWeight::Minor, group);
        }
    }

    let r_ticks = r_div.min(6);
    let r_scale = label_scale_for(r_max / r_div as f32, r_max);
    for i in 0..=r_ticks {
        let r = r_max * i as f32 / r_ticks as f32;
        layout
            .ticks
            .push(Tick::new(TickAxis::R, r, Vec3::new(r, 0.0, 0.0), r_scale));
    }
    let theta_ticks = theta_div.min(6);
    let theta_scale = label_scale_for(PI / theta_div as f32, PI);
    for i in 1..theta_ticks {
        let theta = PI * i as f32 / theta_ticks as f32;
        let pos = Vec3::new(r_max * theta.sin(), 0.0, r_max * theta.cos());
        layout
            .ticks
            .push(Tick::new(TickAxis::Theta, theta, pos, theta_scale));
    }
    let phi_ticks = phi_div.min(8);
    let phi_scale = label_scale_for(TAU / phi_div as f32, TAU);
    for i in 0..phi_ticks {
        let phi = TAU * i as f32 / phi_ticks as f32;
        let pos = Vec3::new(r_max * phi.cos(), r_max * phi.sin(), 0.0);
        layout.ticks.push(Tick::new(TickAxis::Phi, phi, pos, phi_scale));
    }
    layout
}
