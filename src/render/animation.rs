//! In-place application of animation frames to already built meshes.
//!
//! Bindings are captured once when a scene is spawned; frames only ever
//! overwrite the existing attribute storage. Topology and vertex counts are
//! never changed, and a frame buffer whose length disagrees with the bound
//! attribute is rejected rather than truncated or resized.

use super::draw::common::{ATTRIBUTE_SCALAR, recompute_normals_into};
use crate::buffers::{FrameBuffers, TypedView};
use crate::colormap::colorize_into;
use crate::core::AnimationSpec;
use bevy::log::{debug, warn};
use bevy::prelude::*;
use bevy_mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Buffer key to the meshes whose attributes were built from it.
#[derive(Resource, Default, Debug)]
pub struct AttributeBindings {
    positions: HashMap<String, Vec<Handle<Mesh>>>,
    values: HashMap<String, Vec<Handle<Mesh>>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub positions_updated: usize,
    pub colors_updated: usize,
    /// Buffer keys skipped because their length did not match the binding.
    pub rejected: Vec<String>,
    /// Bindings whose mesh no longer exists.
    pub stale: usize,
}

impl AttributeBindings {
    pub fn bind_positions(&mut self, key: impl Into<String>, mesh: Handle<Mesh>) {
        self.positions.entry(key.into()).or_default().push(mesh);
    }

    pub fn bind_values(&mut self, key: impl Into<String>, mesh: Handle<Mesh>) {
        self.values.entry(key.into()).or_default().push(mesh);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.values.is_empty()
    }

    /// Copy every bound buffer present in `frame` into its mesh attributes.
    pub fn apply_frame(&self, frame: &FrameBuffers, meshes: &mut Assets<Mesh>) -> FrameReport {
        let mut report = FrameReport::default();

        for (key, handles) in &self.positions {
            let Some(view) = frame.get(key) else {
                continue;
            };
            for handle in handles {
                let Some(mesh) = meshes.get_mut(handle) else {
                    report.stale += 1;
                    continue;
                };
                if write_positions(mesh, view) {
                    report.positions_updated += 1;
                } else {
                    warn!("frame buffer {key}: {} elements do not match the bound positions, skipped", view.len());
                    report.rejected.push(key.clone());
                }
            }
        }

        for (key, handles) in &self.values {
            let Some(view) = frame.get(key) else {
                continue;
            };
            let values = view.to_f32_cow();
            for handle in handles {
                let Some(mesh) = meshes.get_mut(handle) else {
                    report.stale += 1;
                    continue;
                };
                if write_values(mesh, &values) {
                    report.colors_updated += 1;
                } else {
                    warn!("frame buffer {key}: {} values do not match the bound colors, skipped", values.len());
                    report.rejected.push(key.clone());
                }
            }
        }

        if report.stale > 0 {
            debug!("{} animation bindings point at released meshes", report.stale);
        }
        report
    }
}

fn write_positions(mesh: &mut Mesh, view: &TypedView) -> bool {
    let Some(VertexAttributeValues::Float32x3(positions)) =
        mesh.attribute_mut(Mesh::ATTRIBUTE_POSITION)
    else {
        return false;
    };
    if positions.len() * 3 != view.len() {
        return false;
    }
    view.write_f32(bytemuck::cast_slice_mut(positions.as_mut_slice()));

    if mesh.primitive_topology() == PrimitiveTopology::TriangleList {
        refresh_normals(mesh);
    }
    true
}

/// Recompute normals into the mesh's existing normal storage.
fn refresh_normals(mesh: &mut Mesh) {
    // Taking the attribute out moves the vector, it does not reallocate.
    let Some(VertexAttributeValues::Float32x3(mut normals)) =
        mesh.remove_attribute(Mesh::ATTRIBUTE_NORMAL)
    else {
        return;
    };
    if let Some(positions) = mesh
        .attribute(Mesh::ATTRIBUTE_POSITION)
        .and_then(VertexAttributeValues::as_float3)
    {
        let indices = match mesh.indices() {
            Some(Indices::U32(ix)) => Some(ix.as_slice()),
            _ => None,
        };
        recompute_normals_into(positions, indices, &mut normals);
    }
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
}

fn write_values(mesh: &mut Mesh, values: &[f32]) -> bool {
    let Some(VertexAttributeValues::Float32x4(colors)) = mesh.attribute_mut(Mesh::ATTRIBUTE_COLOR)
    else {
        return false;
    };
    if colors.len() != values.len() {
        return false;
    }
    colorize_into(values, colors);

    if let Some(VertexAttributeValues::Float32(scalars)) = mesh.attribute_mut(ATTRIBUTE_SCALAR) {
        if scalars.len() == values.len() {
            scalars.copy_from_slice(values);
        }
    }
    true
}

/// Fixed-rate frame sequencer driven by the app clock.
#[derive(Resource, Debug)]
pub struct FramePlayer {
    frames: Arc<Vec<FrameBuffers>>,
    timer: Timer,
    looping: bool,
    index: usize,
    playing: bool,
}

impl Default for FramePlayer {
    fn default() -> Self {
        Self::new(Arc::new(Vec::new()), None)
    }
}

impl FramePlayer {
    /// Plays only when the scene declares an animation and frames were sent.
    pub fn new(frames: Arc<Vec<FrameBuffers>>, spec: Option<&AnimationSpec>) -> Self {
        let defaults = AnimationSpec::default();
        let anim = spec.unwrap_or(&defaults);
        let fps = if anim.fps > 0.0 { anim.fps } else { defaults.fps };
        Self {
            playing: spec.is_some() && !frames.is_empty(),
            frames,
            timer: Timer::from_seconds(1.0 / fps, TimerMode::Repeating),
            looping: anim.looping,
            index: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Number of frames handed out so far.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Advance the clock and return the frame due now, if any.
    ///
    /// When several intervals elapsed in one call only the latest frame is
    /// returned.
    pub fn tick(&mut self, delta: Duration) -> Option<&FrameBuffers> {
        if !self.playing {
            return None;
        }
        self.timer.tick(delta);
        let mut due = None;
        for _ in 0..self.timer.times_finished_this_tick() {
            if !self.looping && self.index >= self.frames.len() {
                self.playing = false;
                break;
            }
            due = Some(self.index % self.frames.len());
            self.index += 1;
        }
        due.and_then(|i| self.frames.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::draw::common::compute_normals;
    use bevy_asset::RenderAssetUsages;

    fn triangle_mesh() -> Mesh {
        let positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals = compute_normals(&positions, None);
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
            .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
            .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, vec![[0.0f32; 4]; 3])
            .with_inserted_attribute(ATTRIBUTE_SCALAR, vec![0.0f32; 3])
    }

    fn positions_of(mesh: &Mesh) -> Vec<[f32; 3]> {
        mesh.attribute(Mesh::ATTRIBUTE_POSITION)
            .and_then(VertexAttributeValues::as_float3)
            .unwrap()
            .to_vec()
    }

    fn setup() -> (Assets<Mesh>, Handle<Mesh>, AttributeBindings) {
        let mut meshes = Assets::<Mesh>::default();
        let handle = meshes.add(triangle_mesh());
        let mut bindings = AttributeBindings::default();
        bindings.bind_positions("p", handle.clone());
        bindings.bind_values("v", handle.clone());
        (meshes, handle, bindings)
    }

    #[test]
    fn positions_are_overwritten_in_place() {
        let (mut meshes, handle, bindings) = setup();
        let mut frame = FrameBuffers::new();
        frame.insert(
            "p".into(),
            TypedView::F32(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0]),
        );
        let report = bindings.apply_frame(&frame, &mut meshes);
        assert_eq!(report.positions_updated, 1);
        assert!(report.rejected.is_empty());

        let mesh = meshes.get(&handle).unwrap();
        assert_eq!(positions_of(mesh)[1], [0.0, 0.0, 1.0]);
        // Triangle now lies in the YZ plane, so its normal points along -X.
        let normals = mesh
            .attribute(Mesh::ATTRIBUTE_NORMAL)
            .and_then(VertexAttributeValues::as_float3)
            .unwrap();
        assert_eq!(normals[0], [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn short_frame_buffer_is_rejected_without_resizing() {
        let (mut meshes, handle, bindings) = setup();
        let before = positions_of(meshes.get(&handle).unwrap());
        let mut frame = FrameBuffers::new();
        frame.insert("p".into(), TypedView::F32(vec![9.0; 6]));

        let report = bindings.apply_frame(&frame, &mut meshes);
        assert_eq!(report.rejected, vec!["p".to_string()]);
        assert_eq!(report.positions_updated, 0);
        let after = positions_of(meshes.get(&handle).unwrap());
        assert_eq!(after.len(), 3);
        assert_eq!(after, before);
    }

    #[test]
    fn values_recolor_and_update_scalars() {
        let (mut meshes, handle, bindings) = setup();
        let mut frame = FrameBuffers::new();
        frame.insert("v".into(), TypedView::F64(vec![0.0, 0.5, 1.0]));

        let report = bindings.apply_frame(&frame, &mut meshes);
        assert_eq!(report.colors_updated, 1);
        let mesh = meshes.get(&handle).unwrap();
        let Some(VertexAttributeValues::Float32x4(colors)) = mesh.attribute(Mesh::ATTRIBUTE_COLOR)
        else {
            panic!("color attribute missing");
        };
        assert_eq!(colors[0], [0.1, 0.2, 0.6, 1.0]);
        assert_eq!(colors[2], [0.95, 0.9, 0.2, 1.0]);
        let Some(VertexAttributeValues::Float32(scalars)) = mesh.attribute(ATTRIBUTE_SCALAR) else {
            panic!("scalar attribute missing");
        };
        assert_eq!(scalars, &vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn released_meshes_are_ignored() {
        let (mut meshes, handle, bindings) = setup();
        meshes.remove(&handle);
        let mut frame = FrameBuffers::new();
        frame.insert("p".into(), TypedView::F32(vec![0.0; 9]));
        let report = bindings.apply_frame(&frame, &mut meshes);
        assert_eq!(report.stale, 1);
        assert_eq!(report.positions_updated, 0);
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let (mut meshes, _, bindings) = setup();
        let mut frame = FrameBuffers::new();
        frame.insert("other".into(), TypedView::F32(vec![1.0]));
        assert_eq!(bindings.apply_frame(&frame, &mut meshes), FrameReport::default());
    }

    fn frames(n: usize) -> Arc<Vec<FrameBuffers>> {
        Arc::new(
            (0..n)
                .map(|i| {
                    let mut f = FrameBuffers::new();
                    f.insert("p".into(), TypedView::F32(vec![i as f32]));
                    f
                })
                .collect(),
        )
    }

    fn frame_id(frame: &FrameBuffers) -> f32 {
        frame["p"].get_f32(0).unwrap()
    }

    #[test]
    fn player_needs_both_frames_and_animation() {
        assert!(!FramePlayer::new(frames(3), None).is_playing());
        assert!(!FramePlayer::new(frames(0), Some(&AnimationSpec::default())).is_playing());
        assert!(FramePlayer::new(frames(3), Some(&AnimationSpec::default())).is_playing());
    }

    #[test]
    fn looping_player_wraps_around() {
        let spec = AnimationSpec {
            fps: 4.0,
            ..AnimationSpec::default()
        };
        let mut player = FramePlayer::new(frames(2), Some(&spec));
        let step = Duration::from_millis(250);
        let seen: Vec<f32> = (0..5)
            .filter_map(|_| player.tick(step).map(frame_id))
            .collect();
        assert_eq!(seen, vec![0.0, 1.0, 0.0, 1.0, 0.0]);
        assert!(player.is_playing());
    }

    #[test]
    fn one_shot_player_stops_after_last_frame() {
        let spec = AnimationSpec {
            fps: 4.0,
            looping: false,
            frame_count: None,
        };
        let mut player = FramePlayer::new(frames(2), Some(&spec));
        let step = Duration::from_millis(250);
        assert_eq!(player.tick(step).map(frame_id), Some(0.0));
        assert_eq!(player.tick(step).map(frame_id), Some(1.0));
        assert!(player.tick(step).is_none());
        assert!(!player.is_playing());
        assert_eq!(player.position(), 2);
    }

    #[test]
    fn long_stall_jumps_to_latest_frame() {
        let spec = AnimationSpec {
            fps: 4.0,
            ..AnimationSpec::default()
        };
        let mut player = FramePlayer::new(frames(5), Some(&spec));
        let frame = player.tick(Duration::from_millis(875)).map(frame_id);
        assert_eq!(frame, Some(2.0));
        assert_eq!(player.position(), 3);
    }
}
