//! Data-driven bounding volume and grid parameters.

use crate::buffers::{BufferMap, resolve};
use crate::core::{ObjectKind, SceneSpec};
use bevy_math::{UVec3, Vec3};

/// Smallest span an axis may collapse to.
pub const MIN_SPAN: f32 = 1e-3;
/// Fraction of each span added on both sides.
pub const PADDING: f32 = 0.1;

/// Placement and density of the reference grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    pub center: Vec3,
    pub size: Vec3,
    pub divisions: UVec3,
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            size: Vec3::splat(5.0),
            divisions: UVec3::splat(10),
            min: Vec3::splat(-2.5),
            max: Vec3::splat(2.5),
        }
    }
}

/// Result of scanning a scene: the new grid and the matching gizmo scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fit {
    pub config: GridConfig,
    pub gizmo_scale: f32,
}

impl GridConfig {
    /// Fit the grid around every position buffer in `scene`.
    ///
    /// Returns `None` when no object contributes a vertex; the caller keeps
    /// its current configuration in that case. Objects whose positions cannot
    /// be resolved are skipped here, the builders report them.
    pub fn fit_to_scene(&self, scene: &SceneSpec, buffers: &BufferMap) -> Option<Fit> {
        let mut lo = Vec3::splat(f32::INFINITY);
        let mut hi = Vec3::splat(f32::NEG_INFINITY);
        let mut any = false;

        for obj in &scene.objects {
            let Some(key) = obj.position_key() else {
                continue;
            };
            let Some(spec) = scene.buffers.get(key) else {
                continue;
            };
            let Ok(view) = resolve(key, spec, buffers) else {
                continue;
            };
            let values = view.to_f32_vec();
            for p in values.chunks_exact(3) {
                let p = Vec3::new(p[0], p[1], p[2]);
                lo = lo.min(p);
                hi = hi.max(p);
                any = true;
            }
        }
        if !any {
            return None;
        }

        let span = (hi - lo).max(Vec3::splat(MIN_SPAN));
        let pad = span * PADDING;
        let min = lo - pad;
        let max = hi + pad;
        let size = (max - min).max(Vec3::splat(MIN_SPAN));

        let config = GridConfig {
            center: (min + max) * 0.5,
            size,
            divisions: self.divisions_for(scene),
            min,
            max,
        };
        Some(Fit {
            config,
            gizmo_scale: gizmo_scale(size.max_element()),
        })
    }

    fn divisions_for(&self, scene: &SceneSpec) -> UVec3 {
        if let Some([x, y, z]) = scene.grid.divisions {
            return UVec3::new(x, y, z);
        }
        // The last surface grid in the scene sets the density.
        scene
            .objects
            .iter()
            .filter(|o| o.kind == ObjectKind::SurfaceGrid)
            .filter_map(|o| o.grid_shape())
            .last()
            .map(|shape| {
                let u = (shape.nu as u32).saturating_sub(1).max(1);
                let v = (shape.nv as u32).saturating_sub(1).max(1);
                UVec3::new(u, v, u.max(v))
            })
            .unwrap_or(self.divisions)
    }
}

pub fn gizmo_scale(max_span: f32) -> f32 {
    (max_span * 0.08).clamp(0.25, 1.25)
}

/// The three axis segments drawn from a shared origin corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisLines {
    pub origin: Vec3,
    /// End points of the x, y and z axes; also where their labels sit.
    pub ends: [Vec3; 3],
}

impl AxisLines {
    pub fn from_config(config: &GridConfig) -> Self {
        let start = |lo: f32, hi: f32| if hi > 0.0 { lo.max(0.0) } else { lo };
        let origin = Vec3::new(
            start(config.min.x, config.max.x),
            start(config.min.y, config.max.y),
            start(config.min.z, config.max.z),
        );
        let end = config.max.max(origin);
        Self {
            origin,
            ends: [
                Vec3::new(end.x, origin.y, origin.z),
                Vec3::new(origin.x, end.y, origin.z),
                Vec3::new(origin.x, origin.y, end.z),
            ],
        }
    }

    pub fn segments(&self) -> [(Vec3, Vec3); 3] {
        self.ends.map(|end| (self.origin, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::TypedView;
    use crate::core::{BufferSpec, Dtype, SceneObjectSpec};

    fn points_scene(key: &str) -> SceneSpec {
        let mut obj = SceneObjectSpec::new(ObjectKind::Points);
        obj.buffers.insert("positions".into(), key.into());
        let mut scene = SceneSpec {
            objects: vec![obj],
            ..SceneSpec::default()
        };
        scene
            .buffers
            .insert(key.into(), BufferSpec::new(Dtype::Float32, vec![2, 3]));
        scene
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn pads_each_axis_by_ten_percent() {
        let scene = points_scene("p");
        let map = BufferMap::new().with("p", TypedView::F32(vec![0.0, 0.0, 0.0, 10.0, 2.0, 4.0]));
        let fit = GridConfig::default().fit_to_scene(&scene, &map).unwrap();
        assert!(approx(fit.config.min, Vec3::new(-1.0, -0.2, -0.4)));
        assert!(approx(fit.config.max, Vec3::new(11.0, 2.2, 4.4)));
        assert!(approx(fit.config.size, Vec3::new(12.0, 2.4, 4.8)));
        assert!(approx(fit.config.center, Vec3::new(5.0, 1.0, 2.0)));
        assert!((fit.gizmo_scale - 0.96).abs() < 1e-5);
        assert_eq!(fit.config.divisions, UVec3::splat(10));
    }

    #[test]
    fn degenerate_axes_keep_a_minimum_span() {
        let scene = points_scene("p");
        let map = BufferMap::new().with("p", TypedView::F32(vec![1.0, 1.0, 1.0]));
        let fit = GridConfig::default().fit_to_scene(&scene, &map).unwrap();
        assert!(fit.config.size.min_element() >= MIN_SPAN);
        assert_eq!(fit.gizmo_scale, 0.25);
    }

    #[test]
    fn scene_without_positions_leaves_config_alone() {
        let scene = SceneSpec::default();
        assert!(GridConfig::default().fit_to_scene(&scene, &BufferMap::new()).is_none());

        // A referenced but absent buffer contributes nothing either.
        let scene = points_scene("missing");
        assert!(GridConfig::default().fit_to_scene(&scene, &BufferMap::new()).is_none());
    }

    #[test]
    fn fitting_twice_is_idempotent() {
        let scene = points_scene("p");
        let map = BufferMap::new().with("p", TypedView::F64(vec![-3.0, 2.0, 0.5, 4.0, -1.0, 7.0]));
        let first = GridConfig::default().fit_to_scene(&scene, &map).unwrap();
        let second = first.config.fit_to_scene(&scene, &map).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn surface_grid_sets_divisions_unless_overridden() {
        let mut scene = points_scene("p");
        let mut surf = SceneObjectSpec::new(ObjectKind::SurfaceGrid);
        surf.buffers.insert("positions".into(), "p".into());
        surf.metadata
            .insert("grid".into(), serde_json::json!({"Nu": 5, "Nv": 3}));
        scene.objects.push(surf);
        let map = BufferMap::new().with("p", TypedView::F32(vec![0.0; 6]));

        let fit = GridConfig::default().fit_to_scene(&scene, &map).unwrap();
        assert_eq!(fit.config.divisions, UVec3::new(4, 2, 4));

        scene.grid.divisions = Some([6, 7, 8]);
        let fit = GridConfig::default().fit_to_scene(&scene, &map).unwrap();
        assert_eq!(fit.config.divisions, UVec3::new(6, 7, 8));
    }

    #[test]
    fn axis_origin_clamps_to_zero_inside_the_span() {
        let config = GridConfig {
            min: Vec3::new(-2.0, 1.0, -5.0),
            max: Vec3::new(3.0, 4.0, -1.0),
            ..GridConfig::default()
        };
        let axes = AxisLines::from_config(&config);
        assert_eq!(axes.origin, Vec3::new(0.0, 1.0, -5.0));
        assert_eq!(axes.ends[0], Vec3::new(3.0, 1.0, -5.0));
        assert_eq!(axes.ends[1], Vec3::new(0.0, 4.0, -5.0));
        assert_eq!(axes.ends[2], Vec3::new(0.0, 1.0, -1.0));
    }
}
