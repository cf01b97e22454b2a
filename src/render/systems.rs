use super::animation::{AttributeBindings, FramePlayer};
use super::bounds::AxisLines;
use super::components::*;
use super::draw::{build_scene, spawn_axes, spawn_gizmo, spawn_grid, spawn_scene};
use super::gizmo::{GizmoController, LABEL_OFFSET};
use super::grid::build_grid;
use super::picking::{Hit, PICK_THRESHOLD, hover_readout, pick_mesh, scalar_at};
use super::resources::*;
use crate::core::{LightSpec, Palette};
use bevy::app::AppExit;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::log::{debug, warn};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_camera::{PerspectiveProjection, Projection};

/// Ambient brightness per unit of scene ambient intensity.
const AMBIENT_BRIGHTNESS: f32 = 400.0;
/// Directional illuminance (lux) per unit of scene light intensity.
const DIRECTIONAL_ILLUMINANCE: f32 = 4_000.0;

const ZOOM_STEP: f32 = 0.1;
const MIN_RADIUS: f32 = 0.5;
const MAX_RADIUS: f32 = 500.0;
const MAX_PITCH: f32 = 1.5;

const MIN_FONT_PX: f32 = 6.0;
const MAX_FONT_PX: f32 = 48.0;
const PANEL_FONT_PX: f32 = 13.0;
const LIGHTING_STEP: f32 = 0.1;

/// Camera, light and overlay text entities that live for the whole app.
pub fn setup_viewer(mut commands: Commands, scene: Res<SceneRes>, state: Res<ViewerState>) {
    let cam = &scene.scene.camera;
    let orbit = OrbitCamera::looking_from(Vec3::from_array(cam.position), Vec3::from_array(cam.target));
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: cam.fov_degrees.to_radians(),
            near: cam.near,
            far: cam.far,
            ..default()
        }),
        orbit.transform(),
        orbit,
    ));
    commands.insert_resource(AmbientLight {
        brightness: 0.0,
        ..default()
    });

    let palette = state.theme.palette();
    let panel = |commands: &mut Commands, node: Node| {
        commands
            .spawn((
                Text::new(""),
                TextFont {
                    font_size: PANEL_FONT_PX,
                    ..default()
                },
                TextColor(palette.tick_label.into()),
                node,
            ))
            .id()
    };
    let hover = panel(
        &mut commands,
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            bottom: Val::Px(12.0),
            ..default()
        },
    );
    commands.entity(hover).insert(HoverReadout);
    let readout = panel(
        &mut commands,
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            bottom: Val::Px(32.0),
            ..default()
        },
    );
    commands.entity(readout).insert(GizmoReadout);
    let legend = panel(
        &mut commands,
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(12.0),
            top: Val::Px(12.0),
            ..default()
        },
    );
    commands.entity(legend).insert(LegendPanel);
    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: PANEL_FONT_PX,
            ..default()
        },
        TextColor(Color::srgb(1.0, 0.42, 0.42)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(12.0),
            ..default()
        },
        Visibility::Hidden,
        ErrorBanner,
    ));
}

type DisposedRoots = Or<(
    With<ObjectsRoot>,
    With<GridRoot>,
    With<AxesRoot>,
    With<GizmoRoot>,
)>;

/// Apply requests queued by host handles.
///
/// Dispose stops playback, clears the scene graph and overlays, and exits;
/// anything queued after it is dropped.
#[allow(clippy::too_many_arguments)]
pub fn drain_commands(
    mut commands: Commands,
    queue: Res<ViewerCommands>,
    mut scene: ResMut<SceneRes>,
    mut state: ResMut<ViewerState>,
    mut player: ResMut<FramePlayer>,
    mut bindings: ResMut<AttributeBindings>,
    roots: Query<Entity, DisposedRoots>,
    labels: Query<Entity, With<LabelSet>>,
    mut exit: MessageWriter<AppExit>,
) {
    if state.disposed {
        return;
    }
    for command in queue.drain() {
        match command {
            ViewerCommand::UpdateScene {
                scene: spec,
                buffers,
                frames,
            } => scene.replace(spec, buffers, frames),
            ViewerCommand::Dispose => {
                player.stop();
                bindings.clear();
                for entity in roots.iter().chain(labels.iter()) {
                    commands.entity(entity).try_despawn();
                }
                state.disposed = true;
                state.grid_dirty = false;
                debug!("viewer disposed at scene version {}", scene.version);
                exit.write(AppExit::Success);
                return;
            }
        }
    }
}

/// Replace the whole scene graph when a new scene version arrives.
#[allow(clippy::too_many_arguments)]
pub fn rebuild_scene(
    mut commands: Commands,
    scene: Res<SceneRes>,
    mut state: ResMut<ViewerState>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut bindings: ResMut<AttributeBindings>,
    mut player: ResMut<FramePlayer>,
    mut gizmo: ResMut<GizmoController>,
    mut ambient_base: ResMut<AmbientBase>,
    roots: Query<Entity, With<ObjectsRoot>>,
    lights: Query<Entity, With<SceneLight>>,
) {
    if state.built_version == Some(scene.version) {
        return;
    }
    state.built_version = Some(scene.version);

    for root in &roots {
        commands.entity(root).try_despawn();
    }
    for light in &lights {
        commands.entity(light).try_despawn();
    }
    bindings.clear();
    state.apply_display(&scene.scene);
    ambient_base.0 = spawn_lights(&mut commands, &scene.scene.lights, state.lighting);

    match build_scene(&scene.scene, &scene.buffers) {
        Ok(built) => {
            let nodes = built.len();
            spawn_scene(
                &mut commands,
                &mut meshes,
                &mut materials,
                built,
                &state.theme.palette(),
                &mut bindings,
            );
            if let Some(fit) = state.grid.fit_to_scene(&scene.scene, &scene.buffers) {
                state.grid = fit.config;
                gizmo.scale = fit.gizmo_scale;
            }
            *player = FramePlayer::new(scene.frames.clone(), scene.scene.animation.as_ref());
            state.last_error = None;
            debug!("scene version {} spawned with {nodes} nodes", scene.version);
        }
        Err(report) => {
            warn!("scene version {} failed to build: {report:?}", scene.version);
            *player = FramePlayer::default();
            state.last_error = Some(report.current_context().to_string());
        }
    }
}

/// Spawn directional lights; returns the summed ambient intensity.
fn spawn_lights(commands: &mut Commands, lights: &[LightSpec], lighting: f32) -> f32 {
    let mut ambient = 0.0;
    for light in lights {
        match light {
            LightSpec::Ambient { intensity } => ambient += intensity,
            LightSpec::Directional {
                intensity,
                position,
            } => {
                commands.spawn((
                    DirectionalLight {
                        illuminance: intensity * lighting * DIRECTIONAL_ILLUMINANCE,
                        ..default()
                    },
                    Transform::from_translation(Vec3::from_array(*position))
                        .looking_at(Vec3::ZERO, Vec3::Y),
                    SceneLight { base: *intensity },
                ));
            }
        }
    }
    ambient
}

/// G grid, A axes, Z gizmo, L legend, T theme, C grid space, +/- lighting.
pub fn keyboard_toggles(keys: Res<ButtonInput<KeyCode>>, mut state: ResMut<ViewerState>) {
    if keys.just_pressed(KeyCode::KeyG) {
        state.show_grid = !state.show_grid;
    }
    if keys.just_pressed(KeyCode::KeyA) {
        state.show_axes = !state.show_axes;
    }
    if keys.just_pressed(KeyCode::KeyZ) {
        state.show_gizmo = !state.show_gizmo;
    }
    if keys.just_pressed(KeyCode::KeyL) {
        state.show_legend = !state.show_legend;
    }
    if keys.just_pressed(KeyCode::KeyT) {
        let theme = state.theme.toggled();
        state.set_theme(theme);
    }
    if keys.just_pressed(KeyCode::KeyC) {
        let space = state.space.next();
        state.set_space(space);
    }
    if keys.any_just_pressed([KeyCode::Equal, KeyCode::NumpadAdd]) {
        let lighting = state.lighting + LIGHTING_STEP;
        state.set_lighting(lighting);
    }
    if keys.any_just_pressed([KeyCode::Minus, KeyCode::NumpadSubtract]) {
        let lighting = state.lighting - LIGHTING_STEP;
        state.set_lighting(lighting);
    }
}

pub fn apply_theme(
    mut state: ResMut<ViewerState>,
    mut clear: ResMut<ClearColor>,
    themed: Query<&MeshMaterial3d<StandardMaterial>, With<ThemedMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut panels: Query<&mut TextColor, Or<(With<HoverReadout>, With<GizmoReadout>, With<LegendPanel>)>>,
) {
    if !state.theme_dirty {
        return;
    }
    state.theme_dirty = false;
    let palette: Palette = state.theme.palette();
    clear.0 = state.clear_color().into();
    for handle in &themed {
        if let Some(material) = materials.get_mut(&handle.0) {
            material.base_color = palette.primitive.into();
        }
    }
    for mut color in &mut panels {
        color.0 = palette.tick_label.into();
    }
}

pub fn apply_lighting(
    mut state: ResMut<ViewerState>,
    base: Res<AmbientBase>,
    mut ambient: ResMut<AmbientLight>,
    mut lights: Query<(&SceneLight, &mut DirectionalLight)>,
) {
    if !state.lights_dirty {
        return;
    }
    state.lights_dirty = false;
    ambient.brightness = base.0 * state.lighting * AMBIENT_BRIGHTNESS;
    for (light, mut directional) in &mut lights {
        directional.illuminance = light.base * state.lighting * DIRECTIONAL_ILLUMINANCE;
    }
}

/// Respawn grid, axes and gizmo visuals with their labels.
#[allow(clippy::too_many_arguments)]
pub fn rebuild_overlays(
    mut commands: Commands,
    mut state: ResMut<ViewerState>,
    gizmo: Res<GizmoController>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    roots: Query<Entity, Or<(With<GridRoot>, With<AxesRoot>, With<GizmoRoot>)>>,
    labels: Query<Entity, With<LabelSet>>,
) {
    if !state.grid_dirty {
        return;
    }
    state.grid_dirty = false;
    for entity in roots.iter().chain(labels.iter()) {
        commands.entity(entity).try_despawn();
    }

    let palette = state.theme.palette();
    let layout = build_grid(state.space, &state.grid);
    spawn_grid(
        &mut commands,
        &mut meshes,
        &mut materials,
        &layout,
        &palette,
        state.show_grid,
    );
    spawn_axes(
        &mut commands,
        &mut meshes,
        &mut materials,
        &AxisLines::from_config(&state.grid),
        state.show_axes,
    );
    spawn_gizmo(
        &mut commands,
        &mut meshes,
        &mut materials,
        &gizmo,
        state.show_gizmo,
    );
    debug!(
        "{:?} grid rebuilt: {} lines, {} ticks",
        state.space,
        layout.lines.len(),
        layout.ticks.len()
    );
}

type OverlayRoots = Or<(With<GridRoot>, With<AxesRoot>, With<GizmoRoot>)>;

pub fn sync_overlay_visibility(
    state: Res<ViewerState>,
    mut roots: Query<(&mut Visibility, Has<GridRoot>, Has<AxesRoot>), OverlayRoots>,
) {
    if !state.is_changed() {
        return;
    }
    for (mut visibility, is_grid, is_axes) in &mut roots {
        let shown = if is_grid {
            state.show_grid
        } else if is_axes {
            state.show_axes
        } else {
            state.show_gizmo
        };
        visibility.set_if_neq(if shown {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        });
    }
}

fn cursor_ray(window: &Window, camera: &Camera, transform: &GlobalTransform) -> Option<Ray3d> {
    let cursor = window.cursor_position()?;
    camera.viewport_to_world(transform, cursor).ok()
}

/// Cursor movement in logical window pixels since the previous sample.
/// Zero when either sample is missing.
pub fn pointer_delta(last: &mut Option<Vec2>, cursor: Option<Vec2>) -> Vec2 {
    let delta = match (*last, cursor) {
        (Some(from), Some(to)) => to - from,
        _ => Vec2::ZERO,
    };
    *last = cursor;
    delta
}

/// Press on an arrow starts a drag, motion moves the origin along that axis,
/// release ends it. Orbiting is suspended while dragging.
#[allow(clippy::too_many_arguments)]
pub fn gizmo_input(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut cameras: Query<(&Camera, &GlobalTransform, &mut OrbitCamera)>,
    state: Res<ViewerState>,
    mut gizmo: ResMut<GizmoController>,
    mut roots: Query<&mut Transform, With<GizmoRoot>>,
    mut labels: Query<(&GizmoLabel, &mut WorldLabel)>,
    mut last_cursor: Local<Option<Vec2>>,
) {
    let window = windows.single().ok();
    let delta = pointer_delta(&mut last_cursor, window.and_then(Window::cursor_position));
    let Ok((camera, transform, mut orbit)) = cameras.single_mut() else {
        return;
    };

    if mouse.just_pressed(MouseButton::Left) && state.show_gizmo {
        let ray = window.and_then(|window| cursor_ray(window, camera, transform));
        if let Some(ray) = ray {
            if gizmo.pointer_down(ray) {
                orbit.enabled = false;
            }
        }
    }
    if !gizmo.is_dragging() {
        return;
    }
    if mouse.just_released(MouseButton::Left) || !mouse.pressed(MouseButton::Left) {
        gizmo.pointer_up();
        orbit.enabled = true;
        return;
    }
    if delta == Vec2::ZERO {
        return;
    }

    let clip_from_world = camera.clip_from_view() * Mat4::from(transform.affine().inverse());
    gizmo.drag_by(delta, clip_from_world);
    for mut root in &mut roots {
        root.translation = gizmo.position;
    }
    for (label, mut anchor) in &mut labels {
        anchor.anchor = gizmo.position + label.0.direction() * LABEL_OFFSET * gizmo.scale;
    }
}

/// Left drag orbits, right drag pans, the wheel zooms.
pub fn orbit_camera(
    mouse: Res<ButtonInput<MouseButton>>,
    mut motion: MessageReader<MouseMotion>,
    mut wheel: MessageReader<MouseWheel>,
    mut cameras: Query<(&mut OrbitCamera, &mut Transform)>,
) {
    // Collect events first (they can only be read once)
    let mut zoom = 0.0;
    for event in wheel.read() {
        zoom += match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / 100.0,
        };
    }
    let delta: Vec2 = motion.read().map(|m| m.delta).sum();

    for (mut orbit, mut transform) in &mut cameras {
        if !orbit.enabled {
            continue;
        }
        let mut changed = false;
        if delta != Vec2::ZERO && mouse.pressed(MouseButton::Left) {
            orbit.yaw -= delta.x * orbit.orbit_speed;
            orbit.pitch = (orbit.pitch + delta.y * orbit.orbit_speed).clamp(-MAX_PITCH, MAX_PITCH);
            changed = true;
        } else if delta != Vec2::ZERO && mouse.pressed(MouseButton::Right) {
            let right = transform.right();
            let up = transform.up();
            let scale = orbit.pan_speed * orbit.radius;
            orbit.target += (-delta.x * *right + delta.y * *up) * scale;
            changed = true;
        }
        if zoom != 0.0 {
            orbit.radius = (orbit.radius * (1.0 - zoom * ZOOM_STEP)).clamp(MIN_RADIUS, MAX_RADIUS);
            changed = true;
        }
        if changed {
            *transform = orbit.transform();
        }
    }
}

/// Pick the nearest scene node under the pointer and report it.
#[allow(clippy::too_many_arguments)]
pub fn hover_pick(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    nodes: Query<(Entity, &SceneNode, &Mesh3d, &InheritedVisibility)>,
    meshes: Res<Assets<Mesh>>,
    gizmo: Res<GizmoController>,
    observer: Res<HoverObserver>,
    mut hover: ResMut<HoverState>,
    mut readouts: Query<&mut Text, With<HoverReadout>>,
) {
    if gizmo.is_dragging() {
        return;
    }
    let ray = match (windows.single(), cameras.single()) {
        (Ok(window), Ok((camera, transform))) => cursor_ray(window, camera, transform),
        _ => None,
    };

    let mut best: Option<(Entity, &SceneNode, Hit, Option<f32>)> = None;
    if let Some(ray) = ray {
        for (entity, node, mesh, visible) in &nodes {
            if !visible.get() {
                continue;
            }
            let Some(mesh) = meshes.get(&mesh.0) else {
                continue;
            };
            let Some(hit) = pick_mesh(ray, mesh, PICK_THRESHOLD) else {
                continue;
            };
            if best.as_ref().is_none_or(|(_, _, b, _)| hit.distance < b.distance) {
                best = Some((entity, node, hit, scalar_at(mesh, hit.vertex)));
            }
        }
    }

    hover.update(
        best.as_ref().map(|(entity, node, _, _)| (*entity, node.spec.as_ref())),
        &observer,
    );
    let text = best
        .map(|(_, node, hit, value)| format!("{}: {}", node.spec.label(), hover_readout(hit.point, value)));
    if hover.readout != text {
        for mut readout in &mut readouts {
            readout.0 = text.clone().unwrap_or_default();
        }
        hover.readout = text;
    }
}

pub fn animate_frames(
    time: Res<Time>,
    mut player: ResMut<FramePlayer>,
    bindings: Res<AttributeBindings>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    if !player.is_playing() {
        return;
    }
    if let Some(frame) = player.tick(time.delta()) {
        bindings.apply_frame(frame, &mut meshes);
    }
}

/// Font size in logical pixels for a glyph `size` world units tall at `distance`.
pub fn label_font_px(size: f32, distance: f32, fov: f32, viewport_height: f32) -> f32 {
    let visible_height = 2.0 * distance.max(1e-3) * (fov * 0.5).tan();
    (size * viewport_height / visible_height).clamp(MIN_FONT_PX, MAX_FONT_PX)
}

type LabelItem<'a> = (
    &'a WorldLabel,
    &'a LabelSet,
    &'a ComputedNode,
    &'a mut Node,
    &'a mut TextFont,
    &'a mut Visibility,
);

/// Pin every world label over its anchor and size it by distance.
pub fn project_labels(
    state: Res<ViewerState>,
    cameras: Query<(&Camera, &GlobalTransform, &Projection), With<OrbitCamera>>,
    mut labels: Query<LabelItem>,
) {
    let Ok((camera, transform, projection)) = cameras.single() else {
        return;
    };
    let fov = match projection {
        Projection::Perspective(p) => p.fov,
        _ => std::f32::consts::FRAC_PI_4,
    };
    let viewport_height = camera.logical_viewport_size().map_or(600.0, |s| s.y);
    let eye = transform.translation();

    for (label, set, computed, mut node, mut font, mut visibility) in &mut labels {
        let enabled = match set {
            LabelSet::Grid => state.show_grid,
            LabelSet::Axes => state.show_axes,
            LabelSet::Gizmo => state.show_gizmo,
        };
        let screen = if enabled {
            camera.world_to_viewport(transform, label.anchor).ok()
        } else {
            None
        };
        let Some(screen) = screen else {
            visibility.set_if_neq(Visibility::Hidden);
            continue;
        };

        let px = label_font_px(label.size, eye.distance(label.anchor), fov, viewport_height);
        if (font.font_size - px).abs() > 0.5 {
            font.font_size = px;
        }
        let half = computed.size() * computed.inverse_scale_factor() * 0.5;
        node.left = Val::Px(screen.x - half.x);
        node.top = Val::Px(screen.y - half.y);
        visibility.set_if_neq(Visibility::Inherited);
    }
}

type PanelItem<'a> = (
    &'a mut Text,
    &'a mut Visibility,
    Has<GizmoReadout>,
    Has<LegendPanel>,
);

/// Gizmo readout, legend and error banner.
pub fn update_panels(
    state: Res<ViewerState>,
    gizmo: Res<GizmoController>,
    scene: Res<SceneRes>,
    mut panels: Query<PanelItem, Or<(With<GizmoReadout>, With<LegendPanel>, With<ErrorBanner>)>>,
) {
    if !(state.is_changed() || gizmo.is_changed() || scene.is_changed()) {
        return;
    }
    for (mut text, mut visibility, is_readout, is_legend) in &mut panels {
        let (content, shown) = if is_readout {
            (gizmo.readout(), state.show_gizmo)
        } else if is_legend {
            let items = scene.scene.legend_items();
            let shown = state.show_legend && !items.is_empty();
            (items.join("\n"), shown)
        } else {
            let error = state.last_error.clone().unwrap_or_default();
            let shown = !error.is_empty();
            (error, shown)
        };
        if text.0 != content {
            text.0 = content;
        }
        visibility.set_if_neq(if shown {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_font_scales_with_distance() {
        let fov = 45f32.to_radians();
        let near = label_font_px(0.35, 2.0, fov, 800.0);
        let far = label_font_px(0.35, 8.0, fov, 800.0);
        assert!(near > far);
        assert!((near - 0.35 * 800.0 / (4.0 * (fov * 0.5).tan())).abs() < 1e-3);
    }

    #[test]
    fn label_font_is_clamped() {
        let fov = 45f32.to_radians();
        assert_eq!(label_font_px(0.35, 1e-6, fov, 800.0), MAX_FONT_PX);
        assert_eq!(label_font_px(0.35, 1e4, fov, 800.0), MIN_FONT_PX);
    }

    #[test]
    fn ambient_sums_and_directionals_spawn() {
        let mut world = World::new();
        let mut queue = bevy::ecs::world::CommandQueue::default();
        let ambient = {
            let mut commands = Commands::new(&mut queue, &world);
            spawn_lights(&mut commands, &crate::core::default_lights(), 1.0)
        };
        queue.apply(&mut world);
        assert!((ambient - 0.7).abs() < 1e-6);
        let mut q = world.query::<(&SceneLight, &DirectionalLight)>();
        let lights: Vec<_> = q.iter(&world).collect();
        assert_eq!(lights.len(), 1);
        assert!((lights[0].0.base - 0.8).abs() < 1e-6);
        assert!((lights[0].1.illuminance - 0.8 * DIRECTIONAL_ILLUMINANCE).abs() < 1e-2);
    }

    #[test]
    fn pointer_delta_follows_cursor_samples() {
        let mut last = None;
        assert_eq!(pointer_delta(&mut last, Some(Vec2::new(10.0, 10.0))), Vec2::ZERO);
        assert_eq!(
            pointer_delta(&mut last, Some(Vec2::new(14.0, 7.0))),
            Vec2::new(4.0, -3.0)
        );
        // Leaving the window drops the reference point.
        assert_eq!(pointer_delta(&mut last, None), Vec2::ZERO);
        assert_eq!(pointer_delta(&mut last, Some(Vec2::new(0.0, 0.0))), Vec2::ZERO);
    }

    #[test]
    fn dispose_stops_playback_and_clears_the_scene() {
        use crate::buffers::{BufferMap, FrameBuffers};
        use crate::core::{AnimationSpec, SceneSpec};
        use std::sync::Arc;

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(SceneRes::new(SceneSpec::default(), BufferMap::new(), vec![]))
            .init_resource::<ViewerState>()
            .init_resource::<ViewerCommands>()
            .init_resource::<AttributeBindings>()
            .insert_resource(FramePlayer::new(
                Arc::new(vec![FrameBuffers::new()]),
                Some(&AnimationSpec::default()),
            ))
            .add_systems(Update, drain_commands);
        app.world_mut().spawn((ObjectsRoot, Transform::default()));
        app.world_mut().spawn((GridRoot, Transform::default()));
        assert!(app.world().resource::<FramePlayer>().is_playing());

        let queue = app.world().resource::<ViewerCommands>().clone();
        queue.push(ViewerCommand::Dispose);
        queue.push(ViewerCommand::UpdateScene {
            scene: SceneSpec::default(),
            buffers: BufferMap::new(),
            frames: vec![],
        });
        app.update();

        assert!(!app.world().resource::<FramePlayer>().is_playing());
        assert!(app.world().resource::<AttributeBindings>().is_empty());
        assert_eq!(app.world().resource::<SceneRes>().version, 1);
        assert!(app.world().resource::<ViewerState>().disposed);
        let world = app.world_mut();
        assert_eq!(world.query::<&ObjectsRoot>().iter(world).count(), 0);
        assert_eq!(world.query::<&GridRoot>().iter(world).count(), 0);
        assert_eq!(app.should_exit(), Some(AppExit::Success));
    }
}
