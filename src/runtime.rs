use bevy::prelude::*;
use std::sync::Arc;

use crate::buffers::{BufferMap, DecodedPayload, FrameBuffers};
use crate::core::{self, SceneObjectSpec, SceneSpec};
use crate::render::{
    HoverCallback, HoverObserver, SceneRes, ScenePlugin, ViewerCommand, ViewerCommands, ViewerState,
};

/// Window and host integration settings for one viewer.
#[derive(Clone)]
pub struct ViewerOptions {
    pub title: String,
    /// HTML canvas element id (without `#`) to render into on the web.
    pub canvas: Option<String>,
    pub on_hover: Option<Arc<HoverCallback>>,
    /// Clear color; the theme background is used when unset.
    pub background: Option<core::Color>,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title: "geometrix".to_string(),
            canvas: None,
            on_hover: None,
            background: None,
        }
    }
}

impl ViewerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn canvas(mut self, id: impl Into<String>) -> Self {
        self.canvas = Some(id.into());
        self
    }

    pub fn background(mut self, color: core::Color) -> Self {
        self.background = Some(color);
        self
    }

    /// Called with the hovered object whenever it changes, and with `None`
    /// when the pointer leaves every object.
    pub fn on_hover<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&SceneObjectSpec>) + Send + Sync + 'static,
    {
        self.on_hover = Some(Arc::new(f));
        self
    }
}

/// Host side of a running viewer. Cloneable; every clone talks to the same app.
#[derive(Clone)]
pub struct ViewerHandle {
    commands: ViewerCommands,
}

impl ViewerHandle {
    /// Replace the displayed scene. The previous scene graph, its bindings and
    /// its animation are discarded on the next frame.
    pub fn update_scene(&self, scene: SceneSpec, buffers: BufferMap, frames: Vec<FrameBuffers>) {
        self.commands.push(ViewerCommand::UpdateScene {
            scene,
            buffers,
            frames,
        });
    }

    pub fn update_payload(&self, payload: DecodedPayload) {
        self.update_scene(payload.scene, payload.buffers, payload.frames);
    }

    /// Stop the app loop and release its resources.
    pub fn dispose(&self) {
        self.commands.push(ViewerCommand::Dispose);
    }
}

/// Insert the scene, display state and host queue for `payload`.
fn insert_viewer_resources(
    app: &mut App,
    payload: DecodedPayload,
    background: Option<core::Color>,
) -> ViewerHandle {
    let state = ViewerState {
        theme: payload.scene.controls.theme,
        background,
        ..default()
    };
    let commands = ViewerCommands::default();
    app.insert_resource(ClearColor(state.clear_color().into()))
        .insert_resource(state)
        .insert_resource(SceneRes::new(payload.scene, payload.buffers, payload.frames))
        .insert_resource(commands.clone());
    ViewerHandle { commands }
}

/// Assemble a viewer app for `payload` without running it.
pub fn build_viewer(payload: DecodedPayload, options: ViewerOptions) -> (App, ViewerHandle) {
    let mut app = App::new();
    let handle = insert_viewer_resources(&mut app, payload, options.background);
    app.add_plugins((
        DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: options.title,
                fit_canvas_to_parent: options.canvas.is_some(),
                canvas: options.canvas.map(|id| format!("#{id}")),
                ..default()
            }),
            ..default()
        }),
        ScenePlugin,
    ));
    if let Some(callback) = options.on_hover {
        app.insert_resource(HoverObserver::new(callback));
    }
    (app, handle)
}

/// Open a window and block until it is closed.
#[cfg(not(target_arch = "wasm32"))]
pub fn run_viewer(payload: DecodedPayload, options: ViewerOptions) -> AppExit {
    let (mut app, _handle) = build_viewer(payload, options);
    app.run()
}

/// Start rendering into `canvas_id`; returns immediately with a handle for
/// later updates.
#[cfg(target_arch = "wasm32")]
pub fn run_viewer(payload: DecodedPayload, canvas_id: &str, options: ViewerOptions) -> ViewerHandle {
    let (mut app, handle) = build_viewer(payload, options.canvas(canvas_id));
    app.run();
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::scene;
    use crate::core::Theme;
    use crate::render::systems::apply_theme;

    #[test]
    fn background_option_wins_over_theme() {
        let background = core::Color::hex(0x102030);
        let mut app = App::new();
        insert_viewer_resources(&mut app, scene().theme(Theme::Dark).build(), Some(background));
        assert_eq!(app.world().resource::<ClearColor>().0, Color::from(background));

        app.init_resource::<Assets<StandardMaterial>>()
            .add_systems(Update, apply_theme);
        app.world_mut()
            .resource_mut::<ViewerState>()
            .set_theme(Theme::Light);
        app.update();
        assert_eq!(app.world().resource::<ClearColor>().0, Color::from(background));
    }

    #[test]
    fn theme_background_without_option() {
        let mut app = App::new();
        insert_viewer_resources(&mut app, scene().theme(Theme::Light).build(), None);
        let expected = Theme::Light.palette().background;
        assert_eq!(app.world().resource::<ClearColor>().0, Color::from(expected));
    }
}
