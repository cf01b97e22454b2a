pub mod animation;
pub mod bounds;
pub mod components;
pub mod draw;
pub mod gizmo;
pub mod grid;
pub mod picking;
pub mod resources;
pub mod systems;

pub use animation::{AttributeBindings, FramePlayer};
pub use bounds::{AxisLines, GridConfig};
pub use draw::{BuiltScene, RenderedNode, build_scene};
pub use gizmo::{GizmoAxis, GizmoController};
pub use grid::{GridLayout, build_grid};
pub use resources::*;
use systems::*;

use bevy::prelude::*;

/// Scene building, reference overlays and interaction for one viewer.
///
/// Expects a [`SceneRes`] to be inserted before the app starts.
#[derive(Default)]
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewerState>()
            .init_resource::<ViewerCommands>()
            .init_resource::<HoverState>()
            .init_resource::<HoverObserver>()
            .init_resource::<AmbientBase>()
            .init_resource::<AttributeBindings>()
            .init_resource::<FramePlayer>()
            .init_resource::<GizmoController>()
            .add_systems(Startup, setup_viewer)
            .add_systems(
                Update,
                (
                    drain_commands,
                    rebuild_scene,
                    keyboard_toggles,
                    apply_theme,
                    apply_lighting,
                    rebuild_overlays,
                    sync_overlay_visibility,
                    gizmo_input,
                    orbit_camera,
                    hover_pick,
                    animate_frames,
                    project_labels,
                    update_panels,
                )
                    .chain(),
            );
    }
}
