//! demo: drive a car down an endless road through music‑shaped dunes
//!
//! W/S/A/D drive, 1‑3 mute instruments, F3 debug colours, F11 fullscreen,
//! F12 dumps the vertex map.

use bevy::diagnostic::{
    EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin,
    LogDiagnosticsPlugin,
};
use bevy::input::ButtonInput;
use bevy::prelude::*;
use bevy::window::{MonitorSelection, PrimaryWindow, WindowMode};

use music_terrain::audio::{instrument_toggle_system, synth_spectrum_system, SpectrumFrames};
use music_terrain::camera::{camera_follow_system, setup_camera};
use music_terrain::player::{car_input_system, ride_terrain_system, spawn_car};
use music_terrain::plugin::stream_terrain_system;
use music_terrain::road::{extend_road_system, setup_road};
use music_terrain::TerrainPlugin;

/* ------------------------------------------------------------------------ */
/* light                                                                    */
/* ------------------------------------------------------------------------ */
fn setup_light(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            illuminance: 12_000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(200.0, 400.0, 150.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/* ------------------------------------------------------------------------ */
/* F11 borderless‑fullscreen toggle                                         */
/* ------------------------------------------------------------------------ */
fn toggle_fullscreen(
    keys: Res<ButtonInput<KeyCode>>,
    mut window_q: Query<&mut Window, With<PrimaryWindow>>,
) {
    if keys.just_pressed(KeyCode::F11) {
        let Ok(mut window) = window_q.get_single_mut() else { return };
        window.mode = match window.mode {
            WindowMode::Windowed => {
                WindowMode::BorderlessFullscreen(MonitorSelection::Primary)
            }
            _ => WindowMode::Windowed,
        };
    }
}

/* ------------------------------------------------------------------------ */
/* main                                                                     */
/* ------------------------------------------------------------------------ */
fn main() {
    App::new()
        /* diagnostics ----------------------------------------------------- */
        .add_plugins((
            LogDiagnosticsPlugin::default(),
            FrameTimeDiagnosticsPlugin::default(),
            EntityCountDiagnosticsPlugin::default(),
        ))

        /* bevy core ------------------------------------------------------- */
        .insert_resource(ClearColor(Color::srgb(0.98, 0.72, 0.45)))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                resolution: (1280., 720.).into(),
                mode: WindowMode::Windowed,
                ..default()
            }),
            ..default()
        }))

        /* terrain --------------------------------------------------------- */
        .add_plugins(TerrainPlugin {
            config_path: Some("assets/terrain.toml".into()),
        })
        .init_resource::<SpectrumFrames>()

        /* startup systems ------------------------------------------------- */
        .add_systems(Startup, (setup_camera, setup_light, spawn_car, setup_road))

        /* frame‑update systems ------------------------------------------- */
        .add_systems(
            Update,
            (
                /* audio --------------------------------------------------- */
                synth_spectrum_system,         // advance the synthetic mix
                instrument_toggle_system,      // 1/2/3 mute

                /* car ----------------------------------------------------- */
                car_input_system.before(stream_terrain_system),
                ride_terrain_system.after(stream_terrain_system),

                /* road ---------------------------------------------------- */
                extend_road_system.after(stream_terrain_system),

                /* misc ---------------------------------------------------- */
                toggle_fullscreen,
            ),
        )

        /* post‑update (camera) -------------------------------------------- */
        .add_systems(PostUpdate, camera_follow_system)
        .run();
}
