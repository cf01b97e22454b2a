use super::bounds::GridConfig;
use crate::buffers::{BufferMap, FrameBuffers};
use crate::core::{Color, GridSpace, SceneObjectSpec, SceneSpec, Theme};
use bevy::prelude::*;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// The scene version currently requested by the host.
#[derive(Resource, Clone, Debug)]
pub struct SceneRes {
    pub scene: Arc<SceneSpec>,
    pub buffers: Arc<BufferMap>,
    pub frames: Arc<Vec<FrameBuffers>>,
    /// Bumped on every replacement; the rebuild system compares it with
    /// [`ViewerState::built_version`].
    pub version: u64,
}

impl SceneRes {
    pub fn new(scene: SceneSpec, buffers: BufferMap, frames: Vec<FrameBuffers>) -> Self {
        Self {
            scene: Arc::new(scene),
            buffers: Arc::new(buffers),
            frames: Arc::new(frames),
            version: 1,
        }
    }

    pub fn replace(&mut self, scene: SceneSpec, buffers: BufferMap, frames: Vec<FrameBuffers>) {
        self.scene = Arc::new(scene);
        self.buffers = Arc::new(buffers);
        self.frames = Arc::new(frames);
        self.version += 1;
    }
}

/// Display state owned by one viewer.
#[derive(Resource, Clone, Debug)]
pub struct ViewerState {
    pub theme: Theme,
    pub space: GridSpace,
    pub grid: GridConfig,
    pub show_grid: bool,
    pub show_axes: bool,
    pub show_gizmo: bool,
    pub show_legend: bool,
    /// Multiplier on every light's base intensity, 0..=2.
    pub lighting: f32,
    /// Grid, ticks and axes need a rebuild.
    pub grid_dirty: bool,
    /// Theme-dependent colors need reapplying.
    pub theme_dirty: bool,
    pub lights_dirty: bool,
    pub built_version: Option<u64>,
    pub last_error: Option<String>,
    /// Host-chosen clear color; wins over the theme background.
    pub background: Option<Color>,
    /// Set once by a dispose request; later commands are dropped.
    pub disposed: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            space: GridSpace::Cartesian,
            grid: GridConfig::default(),
            show_grid: true,
            show_axes: true,
            show_gizmo: true,
            show_legend: false,
            lighting: 1.0,
            grid_dirty: true,
            theme_dirty: true,
            lights_dirty: true,
            built_version: None,
            last_error: None,
            background: None,
            disposed: false,
        }
    }
}

pub const MAX_LIGHTING: f32 = 2.0;

impl ViewerState {
    /// Take over the display sections of a freshly received scene. The grid
    /// configuration is kept; bounds fitting updates it separately.
    pub fn apply_display(&mut self, scene: &SceneSpec) {
        self.theme = scene.controls.theme;
        self.space = scene.grid.space;
        self.show_grid = scene.grid.visible;
        self.show_axes = scene.axes.visible;
        self.show_gizmo = scene.gizmo.visible;
        self.show_legend = scene.legend.visible;
        self.lighting = scene.controls.lighting.clamp(0.0, MAX_LIGHTING);
        self.grid_dirty = true;
        self.theme_dirty = true;
        self.lights_dirty = true;
    }

    pub fn set_space(&mut self, space: GridSpace) {
        if self.space != space {
            self.space = space;
            self.grid_dirty = true;
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme != theme {
            self.theme = theme;
            self.theme_dirty = true;
            self.grid_dirty = true;
        }
    }

    pub fn clear_color(&self) -> Color {
        self.background.unwrap_or(self.theme.palette().background)
    }

    pub fn set_lighting(&mut self, lighting: f32) {
        let lighting = lighting.clamp(0.0, MAX_LIGHTING);
        if self.lighting != lighting {
            self.lighting = lighting;
            self.lights_dirty = true;
        }
    }
}

/// Callback told about the object under the pointer.
pub type HoverCallback = dyn Fn(Option<&SceneObjectSpec>) + Send + Sync;

/// Hover observer; fires only when the hovered object changes.
#[derive(Resource, Default)]
pub struct HoverObserver {
    callback: Option<Arc<HoverCallback>>,
}

impl HoverObserver {
    pub fn new(callback: Arc<HoverCallback>) -> Self {
        Self {
            callback: Some(callback),
        }
    }
}

/// Identity of the hovered scene node and the last readout.
#[derive(Resource, Default, Debug)]
pub struct HoverState {
    pub entity: Option<Entity>,
    pub readout: Option<String>,
}

impl HoverState {
    /// Record the new hover target and notify `observer` if it changed.
    /// Returns whether it changed.
    pub fn update(
        &mut self,
        hit: Option<(Entity, &SceneObjectSpec)>,
        observer: &HoverObserver,
    ) -> bool {
        let entity = hit.map(|(e, _)| e);
        if entity == self.entity {
            return false;
        }
        self.entity = entity;
        if let Some(callback) = &observer.callback {
            callback(hit.map(|(_, spec)| spec));
        }
        true
    }
}

/// Requests from outside the app loop, drained once per frame.
pub enum ViewerCommand {
    UpdateScene {
        scene: SceneSpec,
        buffers: BufferMap,
        frames: Vec<FrameBuffers>,
    },
    Dispose,
}

#[derive(Resource, Clone, Default)]
pub struct ViewerCommands(pub Arc<Mutex<VecDeque<ViewerCommand>>>);

impl ViewerCommands {
    pub fn push(&self, command: ViewerCommand) {
        self.0.lock().push_back(command);
    }

    pub fn drain(&self) -> Vec<ViewerCommand> {
        self.0.lock().drain(..).collect()
    }
}

/// Ambient light level at lighting multiplier 1, taken from the scene's lights.
#[derive(Resource, Clone, Copy, Debug)]
pub struct AmbientBase(pub f32);

impl Default for AmbientBase {
    fn default() -> Self {
        Self(0.7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ObjectKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hover_callback_fires_on_identity_change_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let nulls = Arc::new(AtomicUsize::new(0));
        let observer = {
            let (calls, nulls) = (calls.clone(), nulls.clone());
            HoverObserver::new(Arc::new(move |spec: Option<&SceneObjectSpec>| {
                calls.fetch_add(1, Ordering::SeqCst);
                if spec.is_none() {
                    nulls.fetch_add(1, Ordering::SeqCst);
                }
            }))
        };
        let spec = SceneObjectSpec::new(ObjectKind::Points);
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let mut state = HoverState::default();

        assert!(!state.update(None, &observer));
        assert!(state.update(Some((a, &spec)), &observer));
        assert!(!state.update(Some((a, &spec)), &observer));
        assert!(state.update(Some((b, &spec)), &observer));
        assert!(state.update(None, &observer));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(nulls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn display_sections_drive_state() {
        let mut scene = SceneSpec::default();
        scene.grid.space = GridSpace::Spherical;
        scene.legend.visible = true;
        scene.controls.lighting = 5.0;
        let mut state = ViewerState::default();
        state.grid_dirty = false;
        state.apply_display(&scene);
        assert_eq!(state.space, GridSpace::Spherical);
        assert!(state.show_legend);
        assert_eq!(state.lighting, MAX_LIGHTING);
        assert!(state.grid_dirty);
    }

    #[test]
    fn theme_change_dirties_grid() {
        let mut state = ViewerState {
            grid_dirty: false,
            theme_dirty: false,
            ..ViewerState::default()
        };
        state.set_theme(Theme::Dark);
        assert!(!state.grid_dirty);
        state.set_theme(Theme::Light);
        assert!(state.grid_dirty && state.theme_dirty);
    }

    #[test]
    fn command_queue_drains_in_order() {
        let commands = ViewerCommands::default();
        let handle = commands.clone();
        handle.push(ViewerCommand::Dispose);
        handle.push(ViewerCommand::UpdateScene {
            scene: SceneSpec::default(),
            buffers: BufferMap::new(),
            frames: vec![],
        });
        let drained = commands.drain();
        assert!(matches!(drained[0], ViewerCommand::Dispose));
        assert!(matches!(drained[1], ViewerCommand::UpdateScene { .. }));
        assert!(commands.drain().is_empty());
    }
}
