//! CPU ray casting against scene meshes and gizmo hit volumes.
//!
//! Scene nodes are spawned with identity transforms, so mesh positions are
//! already world coordinates.

use super::draw::common::ATTRIBUTE_SCALAR;
use bevy_math::{Ray3d, Vec3};
use bevy_mesh::{Indices, Mesh, PrimitiveTopology, VertexAttributeValues};

/// World-space slack for picking points and line segments.
pub const PICK_THRESHOLD: f32 = 0.05;

/// Nearest intersection of a ray with one mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Distance along the ray.
    pub distance: f32,
    pub point: Vec3,
    /// Vertex closest to the hit, used for readouts.
    pub vertex: usize,
}

/// Ray parameter of the first intersection with a sphere, if any.
pub fn ray_sphere(ray: Ray3d, center: Vec3, radius: f32) -> Option<f32> {
    let dir = *ray.direction;
    let oc = ray.origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t0 = -b - sq;
    let t1 = -b + sq;
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(0.0)
    } else {
        None
    }
}

/// Distance from `p` to the ray, and the ray parameter of the closest point.
pub fn ray_point(ray: Ray3d, p: Vec3) -> (f32, f32) {
    let t = (p - ray.origin).dot(*ray.direction).max(0.0);
    (ray.get_point(t).distance(p), t)
}

/// Closest approach between the ray and the segment `a..b`.
///
/// Returns `(distance, ray_t, segment_s)` with `segment_s` in `[0, 1]`.
pub fn ray_segment(ray: Ray3d, a: Vec3, b: Vec3) -> (f32, f32, f32) {
    let d1 = *ray.direction;
    let d2 = b - a;
    let r = ray.origin - a;
    let e = d2.length_squared();
    if e <= f32::EPSILON {
        let (dist, t) = ray_point(ray, a);
        return (dist, t, 0.0);
    }
    let dd = d1.dot(d2);
    let c = d1.dot(r);
    let f = d2.dot(r);
    // The ray direction is unit length, so this vanishes only for parallel lines.
    let denom = e - dd * dd;
    let mut t = if denom > f32::EPSILON {
        ((dd * f - c * e) / denom).max(0.0)
    } else {
        0.0
    };
    let mut s = (dd * t + f) / e;
    if s < 0.0 {
        s = 0.0;
        t = (-c).max(0.0);
    } else if s > 1.0 {
        s = 1.0;
        t = (dd - c).max(0.0);
    }
    let closest_ray = ray.origin + d1 * t;
    let closest_seg = a + d2 * s;
    (closest_ray.distance(closest_seg), t, s)
}

/// Möller–Trumbore, both faces.
pub fn ray_triangle(ray: Ray3d, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let dir = *ray.direction;
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-8 {
        return None;
    }
    let inv = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}

fn closer(best: &mut Option<Hit>, hit: Hit) {
    if best.is_none_or(|b| hit.distance < b.distance) {
        *best = Some(hit);
    }
}

/// Cast `ray` against one scene mesh according to its topology.
pub fn pick_mesh(ray: Ray3d, mesh: &Mesh, threshold: f32) -> Option<Hit> {
    let positions = mesh
        .attribute(Mesh::ATTRIBUTE_POSITION)
        .and_then(VertexAttributeValues::as_float3)?;
    let at = |i: usize| Vec3::from_array(positions[i]);
    let mut best = None;

    match mesh.primitive_topology() {
        PrimitiveTopology::PointList => {
            for (i, p) in positions.iter().enumerate() {
                let (dist, t) = ray_point(ray, Vec3::from_array(*p));
                if dist <= threshold {
                    closer(&mut best, Hit { distance: t, point: ray.get_point(t), vertex: i });
                }
            }
        }
        topology @ (PrimitiveTopology::LineStrip | PrimitiveTopology::LineList) => {
            let step = if topology == PrimitiveTopology::LineStrip { 1 } else { 2 };
            let mut i = 0;
            while i + 1 < positions.len() {
                let (dist, t, s) = ray_segment(ray, at(i), at(i + 1));
                if dist <= threshold {
                    let vertex = if s < 0.5 { i } else { i + 1 };
                    closer(&mut best, Hit { distance: t, point: ray.get_point(t), vertex });
                }
                i += step;
            }
        }
        PrimitiveTopology::TriangleList => {
            let mut test = |tri: [usize; 3]| {
                if tri.iter().any(|&v| v >= positions.len()) {
                    return;
                }
                let [a, b, c] = tri.map(at);
                if let Some(t) = ray_triangle(ray, a, b, c) {
                    let point = ray.get_point(t);
                    let vertex = tri
                        .into_iter()
                        .min_by(|&x, &y| at(x).distance_squared(point).total_cmp(&at(y).distance_squared(point)))
                        .unwrap_or(tri[0]);
                    closer(&mut best, Hit { distance: t, point, vertex });
                }
            };
            match mesh.indices() {
                Some(Indices::U32(ix)) => {
                    for tri in ix.chunks_exact(3) {
                        test([tri[0] as usize, tri[1] as usize, tri[2] as usize]);
                    }
                }
                Some(Indices::U16(ix)) => {
                    for tri in ix.chunks_exact(3) {
                        test([tri[0] as usize, tri[1] as usize, tri[2] as usize]);
                    }
                }
                None => {
                    for start in (0..positions.len() / 3).map(|t| t * 3) {
                        test([start, start + 1, start + 2]);
                    }
                }
            }
        }
        _ => {}
    }
    best
}

/// Scalar value carried by `vertex`, when the mesh was built from a values buffer.
pub fn scalar_at(mesh: &Mesh, vertex: usize) -> Option<f32> {
    match mesh.attribute(ATTRIBUTE_SCALAR)? {
        VertexAttributeValues::Float32(values) => values.get(vertex).copied(),
        _ => None,
    }
}

/// `x=1.00, y=2.00, z=3.00 | v=0.50`
pub fn hover_readout(point: Vec3, value: Option<f32>) -> String {
    let mut text = format!("x={:.2}, y={:.2}, z={:.2}", point.x, point.y, point.z);
    if let Some(v) = value {
        text.push_str(&format!(" | v={v:.2}"));
    }
    text
}
