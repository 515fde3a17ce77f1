//! the demo car: arcade steering, glued to the terrain surface

use bevy::input::ButtonInput;
use bevy::prelude::*;

use crate::components::*;
use crate::constants::*;
use crate::streamer::DynamicTerrain;

pub fn spawn_car(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(2.0, 1.2, 4.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.85, 0.15, 0.1))),
        Transform::from_xyz(0.0, CAR_RIDE_HEIGHT, 0.0),
        Player::default(),
        TerrainFocus,
    ));
}

/* ===========================================================
   input (W/S throttle, A/D steer)
   =========================================================== */
pub fn car_input_system(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mut q: Query<(&mut Player, &mut Transform)>,
) {
    let dt = time.delta_secs();
    let Ok((mut car, mut tf)) = q.get_single_mut() else { return };

    let throttle = match (keys.pressed(KeyCode::KeyW), keys.pressed(KeyCode::KeyS)) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => -car.speed.signum() * 0.5, // coast down
    };
    car.speed = (car.speed + throttle * CAR_ACCEL * dt).clamp(-CAR_MAX_SPEED * 0.3, CAR_MAX_SPEED);
    if car.speed.abs() < 0.5 && throttle.abs() < 1.0 {
        car.speed = 0.0;
    }

    let steer = match (keys.pressed(KeyCode::KeyA), keys.pressed(KeyCode::KeyD)) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    };
    car.heading += steer * CAR_TURN_RATE * dt;

    let forward = Vec3::new(car.heading.sin(), 0.0, car.heading.cos());
    tf.translation += forward * car.speed * dt;
    tf.rotation = Quat::from_rotation_y(car.heading);
}

/* ===========================================================
   keep the car on the ground
   =========================================================== */
pub fn ride_terrain_system(terrain: Res<DynamicTerrain>, mut q: Query<&mut Transform, With<Player>>) {
    let Ok(mut tf) = q.get_single_mut() else { return };
    let ground = terrain.ground_height(tf.translation.x, tf.translation.z).unwrap_or(0.0);
    tf.translation.y = ground + CAR_RIDE_HEIGHT;
}
