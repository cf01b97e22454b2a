//! Scalar field to RGB mapping over a fixed three-stop gradient.

/// Gradient stops as `(t, [r, g, b])`, sorted by `t`.
pub const STOPS: [(f32, [f32; 3]); 3] = [
    (0.0, [0.1, 0.2, 0.6]),
    (0.5, [0.3, 0.8, 0.6]),
    (1.0, [0.95, 0.9, 0.2]),
];

const FALLBACK: [f32; 3] = [0.8, 0.8, 0.8];

/// Sample the gradient at `t`, linearly interpolating between the bracketing
/// stops. `t` outside `[0, 1]` is clamped.
pub fn gradient(t: f32) -> [f32; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    for pair in STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t >= t0 && t <= t1 {
            let local = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            let lerp = |a: f32, b: f32| a * (1.0 - local) + b * local;
            return [lerp(c0[0], c1[0]), lerp(c0[1], c1[1]), lerp(c0[2], c1[2])];
        }
    }
    FALLBACK
}

/// `(min, max)` of `values` in one pass; `(0, 1)` when empty.
pub fn value_range(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn normalizer(values: &[f32]) -> impl Fn(f32) -> f32 {
    let (min, max) = value_range(values);
    let range = if max - min != 0.0 { max - min } else { 1.0 };
    move |v| (v - min) / range
}

/// Map each scalar to an RGB triple, returning a flat `3 * n` vector.
///
/// Values are normalized by the buffer's own min/max; a constant field maps
/// uniformly to the first stop.
pub fn colorize(values: &[f32]) -> Vec<f32> {
    let norm = normalizer(values);
    let mut out = Vec::with_capacity(values.len() * 3);
    for &v in values {
        out.extend_from_slice(&gradient(norm(v)));
    }
    out
}

/// Like [`colorize`] but writes opaque RGBA into an existing per-vertex color
/// attribute. Entries past `values.len()` are left untouched.
pub fn colorize_into(values: &[f32], colors: &mut [[f32; 4]]) {
    let norm = normalizer(values);
    for (dst, &v) in colors.iter_mut().zip(values) {
        let [r, g, b] = gradient(norm(v));
        *dst = [r, g, b, 1.0];
    }
}

/// Expand a flat RGB vector into the RGBA layout of a vertex color attribute.
pub fn rgb_to_rgba(rgb: &[f32]) -> Vec<[f32; 4]> {
    rgb.chunks_exact(3)
        .map(|c| [c[0], c[1], c[2], 1.0])
        .collect()
}
