//! GrainTwin Viewer - Bevy-based visualization of the silo twin
//!
//! Usage: `graintwin-viewer [config.json]`
//!
//! Keys: 1-4 scenario, A analyze, Esc close report, +/- time scale, 0 pause.
//! Drag with the left mouse button to orbit, scroll to zoom.

use std::f32::consts::FRAC_PI_2;

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy::render::mesh::PrimitiveTopology;
use bevy::render::render_asset::RenderAssetUsages;
use graintwin_core::config::load_config;
use graintwin_core::engine::TwinEngine;
use graintwin_logic::color::{palette, Rgb};
use graintwin_logic::config::TwinConfig;
use graintwin_logic::environment::{ScenarioMode, SENSOR_MIDDLE};
use graintwin_logic::history::sparkline;
use graintwin_logic::status::{assess, pest_sector_label, sensor_label, sensor_name, Hazard};

/// Opacity of the grain points.
const PARTICLE_ALPHA: f32 = 0.85;
/// Scene offset that puts the middle of the silo at the orbit focus.
const SILO_OFFSET_Y: f32 = -2.0;
/// Optional CJK-capable font for the report panel, relative to `assets/`.
const REPORT_FONT: &str = "fonts/report.ttf";

const MIN_ZOOM: f32 = 5.0;
const MAX_ZOOM: f32 = 15.0;

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}; using defaults", path, e);
                TwinConfig::default()
            }
        },
        None => TwinConfig::default(),
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "GrainTwin - Silo Digital Twin".to_string(),
                resolution: (1280.0, 720.0).into(),
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.06, 0.09, 0.16)))
        .insert_resource(TwinWrapper(TwinEngine::new(config)))
        .add_systems(Startup, (setup_scene, setup_ui))
        .add_systems(
            Update,
            (
                (update_twin, recolor_field).chain(),
                scenario_keys,
                report_keys,
                camera_controls,
                render_silo,
                update_probe_labels,
                update_status_text,
                update_report_panel,
            ),
        )
        .run();
}

#[derive(Resource)]
struct TwinWrapper(TwinEngine);

/// Handle of the particle point-cloud mesh, rewritten every frame.
#[derive(Resource)]
struct ParticleMesh(Handle<Mesh>);

#[derive(Component)]
struct OrbitCamera {
    focus: Vec3,
    radius: f32,
    azimuth: f32,
    elevation: f32,
}

impl OrbitCamera {
    fn from_position(position: Vec3, focus: Vec3) -> Self {
        let offset = position - focus;
        let radius = offset.length();
        Self {
            focus,
            radius: radius.clamp(MIN_ZOOM, MAX_ZOOM),
            azimuth: offset.x.atan2(offset.z),
            elevation: (offset.y / radius).asin(),
        }
    }

    fn translation(&self) -> Vec3 {
        self.focus
            + Vec3::new(
                self.radius * self.elevation.cos() * self.azimuth.sin(),
                self.radius * self.elevation.sin(),
                self.radius * self.elevation.cos() * self.azimuth.cos(),
            )
    }
}

// Marker components for UI elements
#[derive(Component)]
struct ProbeLabel(usize);

#[derive(Component)]
struct PestLabel;

#[derive(Component)]
struct StatusText;

#[derive(Component)]
struct ReportPanel;

#[derive(Component)]
struct ReportText;

fn to_bevy(v: graintwin_logic::geometry::Vec3) -> Vec3 {
    Vec3::from_array(v.to_array())
}

fn to_color(c: Rgb) -> Color {
    Color::srgb(c.r, c.g, c.b)
}

fn hazard_color(hazard: Hazard) -> Color {
    match hazard {
        Hazard::Safe => to_color(palette::PROBE_OK),
        Hazard::Warning => Color::srgb(0.98, 0.75, 0.14),
        Hazard::Danger => to_color(palette::PROBE_HOT),
    }
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    twin: Res<TwinWrapper>,
) {
    let start = Vec3::new(6.0, 4.0, 8.0);
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 45f32.to_radians(),
            ..default()
        }),
        Transform::from_translation(start).looking_at(Vec3::ZERO, Vec3::Y),
        OrbitCamera::from_position(start, Vec3::ZERO),
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
    });
    commands.spawn((
        PointLight {
            intensity: 2_000_000.0,
            range: 30.0,
            ..default()
        },
        Transform::from_xyz(10.0, 10.0, 10.0),
    ));
    commands.spawn((
        PointLight {
            intensity: 1_000_000.0,
            range: 20.0,
            color: Color::srgb(0.23, 0.51, 0.96),
            ..default()
        },
        Transform::from_xyz(-5.0, 5.0, -5.0),
    ));

    let engine = &twin.0;
    let silo = &engine.config().silo;
    let field = engine.particles();

    // Grain point cloud with per-vertex colors
    let mesh = Mesh::new(PrimitiveTopology::PointList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, field.position_buffer())
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, field.color_buffer(PARTICLE_ALPHA));
    let handle = meshes.add(mesh);
    commands.spawn((
        Mesh3d(handle.clone()),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            ..default()
        })),
        Transform::from_xyz(0.0, SILO_OFFSET_Y, 0.0),
    ));
    commands.insert_resource(ParticleMesh(handle));

    // Glass shell
    let shell = palette::SHELL;
    commands.spawn((
        Mesh3d(meshes.add(Cylinder::new(silo.shell_radius, silo.shell_height))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(shell.r, shell.g, shell.b, 0.1),
            alpha_mode: AlphaMode::Blend,
            metallic: 0.9,
            perceptual_roughness: 0.1,
            double_sided: true,
            cull_mode: None,
            ..default()
        })),
        Transform::from_xyz(0.0, SILO_OFFSET_Y + silo.shell_height / 2.0, 0.0),
    ));

    info!(
        "Silo ready: {} particles in r={} h={}",
        field.len(),
        silo.radius,
        silo.height
    );
}

fn setup_ui(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.spawn((
        Text::new("GrainTwin"),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(12.0),
            ..default()
        },
        StatusText,
    ));

    for i in 0..3 {
        commands.spawn((
            Text::new(""),
            TextFont {
                font_size: 12.0,
                ..default()
            },
            TextColor(Color::WHITE),
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
            Node {
                position_type: PositionType::Absolute,
                padding: UiRect::axes(Val::Px(6.0), Val::Px(2.0)),
                ..default()
            },
            ProbeLabel(i),
        ));
    }

    commands.spawn((
        Text::new("PEST DETECTED"),
        TextFont {
            font_size: 13.0,
            ..default()
        },
        TextColor(Color::WHITE),
        BackgroundColor(Color::srgba(0.86, 0.15, 0.15, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            padding: UiRect::axes(Val::Px(8.0), Val::Px(3.0)),
            ..default()
        },
        Visibility::Hidden,
        PestLabel,
    ));

    // The default font has no CJK glyphs; use a bundled one when present.
    let report_font = if std::path::Path::new("assets").join(REPORT_FONT).exists() {
        asset_server.load(REPORT_FONT)
    } else {
        Handle::default()
    };

    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(12.0),
                top: Val::Px(12.0),
                width: Val::Px(420.0),
                padding: UiRect::all(Val::Px(12.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(0.06, 0.09, 0.16, 0.92)),
            Visibility::Hidden,
            ReportPanel,
        ))
        .with_children(|panel| {
            panel.spawn((
                Text::new(""),
                TextFont {
                    font: report_font,
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::srgb(0.89, 0.91, 0.94)),
                ReportText,
            ));
        });
}

fn update_twin(
    time: Res<Time>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut twin: ResMut<TwinWrapper>,
) {
    // Time scale controls: +/= to speed up, - to slow down, 0 to pause/resume
    if keyboard.just_pressed(KeyCode::Equal) || keyboard.just_pressed(KeyCode::NumpadAdd) {
        let current = twin.0.time_scale();
        twin.0.set_time_scale((current * 2.0).min(16.0));
    }
    if keyboard.just_pressed(KeyCode::Minus) || keyboard.just_pressed(KeyCode::NumpadSubtract) {
        let current = twin.0.time_scale();
        twin.0.set_time_scale((current / 2.0).max(0.25));
    }
    if keyboard.just_pressed(KeyCode::Digit0) || keyboard.just_pressed(KeyCode::Numpad0) {
        let current = twin.0.time_scale();
        twin.0.set_time_scale(if current > 0.0 { 0.0 } else { 1.0 });
    }

    twin.0.update(time.delta_secs());
}

/// Frame driver: recolor the field and upload the new color buffer.
fn recolor_field(
    mut twin: ResMut<TwinWrapper>,
    particle_mesh: Res<ParticleMesh>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    twin.0.render_frame();
    if let Some(mesh) = meshes.get_mut(&particle_mesh.0) {
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_COLOR,
            twin.0.particles().color_buffer(PARTICLE_ALPHA),
        );
    }
}

fn scenario_keys(keyboard: Res<ButtonInput<KeyCode>>, mut twin: ResMut<TwinWrapper>) {
    let keys = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
    ];
    for (key, mode) in keys.into_iter().zip(ScenarioMode::ALL) {
        if keyboard.just_pressed(key) {
            twin.0.set_scenario(mode);
        }
    }
}

fn report_keys(keyboard: Res<ButtonInput<KeyCode>>, mut twin: ResMut<TwinWrapper>) {
    if keyboard.just_pressed(KeyCode::KeyA) {
        let ticket = twin.0.request_report();
        info!("Requested analysis #{}", ticket.0);
    }
    if keyboard.just_pressed(KeyCode::Escape) {
        twin.0.dismiss_report();
    }
}

fn camera_controls(
    mut camera_query: Query<(&mut OrbitCamera, &mut Transform)>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut scroll_events: EventReader<MouseWheel>,
    mut motion_events: EventReader<MouseMotion>,
) {
    let Ok((mut orbit, mut transform)) = camera_query.get_single_mut() else {
        return;
    };

    if mouse_buttons.pressed(MouseButton::Left) {
        for motion in motion_events.read() {
            orbit.azimuth -= motion.delta.x * 0.005;
            orbit.elevation += motion.delta.y * 0.005;
        }
    } else {
        motion_events.clear();
    }

    if keyboard.pressed(KeyCode::ArrowLeft) {
        orbit.azimuth += 0.02;
    }
    if keyboard.pressed(KeyCode::ArrowRight) {
        orbit.azimuth -= 0.02;
    }
    if keyboard.pressed(KeyCode::ArrowUp) {
        orbit.elevation += 0.02;
    }
    if keyboard.pressed(KeyCode::ArrowDown) {
        orbit.elevation -= 0.02;
    }

    for scroll in scroll_events.read() {
        orbit.radius *= 1.0 - scroll.y * 0.1;
    }

    // Stay above the horizon and within the zoom range
    orbit.elevation = orbit.elevation.clamp(0.0, FRAC_PI_2 - 0.01);
    orbit.radius = orbit.radius.clamp(MIN_ZOOM, MAX_ZOOM);

    *transform = Transform::from_translation(orbit.translation()).looking_at(orbit.focus, Vec3::Y);
}

fn render_silo(twin: Res<TwinWrapper>, mut gizmos: Gizmos) {
    let engine = &twin.0;
    let silo = &engine.config().silo;
    let state = engine.state();
    let status = assess(state);
    let offset = Vec3::new(0.0, SILO_OFFSET_Y, 0.0);
    let flat = Quat::from_rotation_x(FRAC_PI_2);

    // Cap ring
    gizmos.circle(
        Isometry3d::new(offset + Vec3::Y * silo.shell_height, flat),
        silo.shell_radius,
        Color::srgb(0.28, 0.33, 0.41),
    );

    // Floor grid
    gizmos.grid(
        Isometry3d::new(offset, flat),
        UVec2::splat(20),
        Vec2::splat(1.0),
        Color::srgb(0.12, 0.16, 0.23),
    );

    // Sensor probes
    for (i, &height) in silo.sensor_heights.iter().enumerate() {
        let color = if status.hot_sensors[i] {
            palette::PROBE_HOT
        } else {
            palette::PROBE_OK
        };
        gizmos.sphere(
            Isometry3d::from_translation(offset + Vec3::Y * height),
            0.15,
            to_color(color),
        );
    }

    // Pest marker
    if let Some(pest) = state.pest_position.filter(|_| state.has_pest()) {
        let position = offset + to_bevy(silo.pest_marker_position(&pest));
        gizmos.sphere(
            Isometry3d::from_translation(position),
            0.25,
            to_color(palette::PROBE_HOT),
        );
    }
}

/// Pin the probe and pest labels to their 3D anchors.
fn update_probe_labels(
    twin: Res<TwinWrapper>,
    camera_query: Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    mut probe_query: Query<(&ProbeLabel, &mut Text, &mut Node), Without<PestLabel>>,
    mut pest_query: Query<(&mut Node, &mut Visibility), (With<PestLabel>, Without<ProbeLabel>)>,
) {
    let Ok((camera, camera_transform)) = camera_query.get_single() else {
        return;
    };
    let engine = &twin.0;
    let silo = &engine.config().silo;
    let state = engine.state();
    let offset = Vec3::new(0.0, SILO_OFFSET_Y, 0.0);

    for (label, mut text, mut node) in &mut probe_query {
        let anchor = offset + Vec3::new(0.2, silo.sensor_heights[label.0], 0.0);
        **text = sensor_label(label.0, state.temperatures[label.0]);
        if let Ok(screen) = camera.world_to_viewport(camera_transform, anchor) {
            node.left = Val::Px(screen.x + 8.0);
            node.top = Val::Px(screen.y - 8.0);
        }
    }

    for (mut node, mut visibility) in &mut pest_query {
        match state.pest_position.filter(|_| state.has_pest()) {
            Some(pest) => {
                let anchor = offset + to_bevy(silo.pest_marker_position(&pest)) + Vec3::Y * 0.4;
                if let Ok(screen) = camera.world_to_viewport(camera_transform, anchor) {
                    node.left = Val::Px(screen.x - 50.0);
                    node.top = Val::Px(screen.y - 12.0);
                }
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

fn update_status_text(
    twin: Res<TwinWrapper>,
    mut query: Query<(&mut Text, &mut TextColor), With<StatusText>>,
) {
    let engine = &twin.0;
    let state = engine.state();
    let status = assess(state);
    let history = engine.history();

    let pest = match state.pest_position.filter(|_| state.has_pest()) {
        Some(pos) => format!("{} at {}", state.pest_count, pest_sector_label(&pos)),
        None => "none".to_string(),
    };
    let speed = if engine.time_scale() == 0.0 {
        "PAUSED".to_string()
    } else {
        format!("{}x", engine.time_scale())
    };
    let analyzing = if engine.is_analyzing() {
        "\nAnalyzing..."
    } else {
        ""
    };

    for (mut text, mut color) in &mut query {
        **text = format!(
            "GrainTwin | {} | {:?}\n\
             Scenario: {}  [1-4]\n\
             Humidity: {:.1}%{}\n\
             Pests: {}\n\
             {:<7} {}{}\n\
             Humid   {}\n\
             Tick {} ({:.0}s) | Speed {} | A: analyze{}",
            engine.config().silo.particle_count,
            status.hazard,
            engine.scenario(),
            state.humidity,
            if status.mold_risk { "  (mold risk)" } else { "" },
            pest,
            sensor_name(SENSOR_MIDDLE),
            sparkline(&history.temperature_series(SENSOR_MIDDLE)),
            if status.any_hot() { "  (hot spot)" } else { "" },
            sparkline(&history.humidity_series()),
            engine.tick_count(),
            engine.sim_time(),
            speed,
            analyzing,
        );
        color.0 = hazard_color(status.hazard);
    }
}

fn update_report_panel(
    twin: Res<TwinWrapper>,
    mut panel_query: Query<&mut Visibility, With<ReportPanel>>,
    mut text_query: Query<&mut Text, With<ReportText>>,
) {
    let engine = &twin.0;
    let content = match (engine.report_text(), engine.is_analyzing()) {
        (Some(report), _) => Some(format!("{}\n\n[Esc] close", report)),
        (None, true) => Some("Analyzing...".to_string()),
        (None, false) => None,
    };

    for mut visibility in &mut panel_query {
        *visibility = if content.is_some() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
    if let Some(content) = content {
        for mut text in &mut text_query {
            if **text != content {
                **text = content.clone();
            }
        }
    }
}
