use bevy::prelude::*;

use crate::components::Player;
use crate::constants::*;

pub fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, CAMERA_HEIGHT, -CAMERA_DISTANCE).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// chase camera: eases towards a point behind the car and looks at it
///
/// Runs in **PostUpdate** so the car has already moved this frame.
pub fn camera_follow_system(
    time: Res<Time>,
    mut cam_q: Query<&mut Transform, (With<Camera>, Without<Player>)>,
    player_q: Query<(&Transform, &Player)>,
) {
    let Ok(mut cam_tf) = cam_q.get_single_mut() else { return };
    let Ok((car_tf, car)) = player_q.get_single() else { return };

    let behind = Vec3::new(-car.heading.sin(), 0.0, -car.heading.cos()) * CAMERA_DISTANCE;
    let target = car_tf.translation + behind + Vec3::Y * CAMERA_HEIGHT;
    let t = (CAMERA_LERP * time.delta_secs()).min(1.0);

    cam_tf.translation = cam_tf.translation.lerp(target, t);
    cam_tf.look_at(car_tf.translation, Vec3::Y);
}
