use std::f32::consts::PI;

use bevy::input::mouse::MouseMotion;
use bevy::math::EulerRot;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, MonitorSelection, PrimaryWindow, WindowMode};

/// Pitch stays inside ±72° so the view never flips over the poles.
pub const PITCH_LIMIT: f32 = PI * 0.4;

/// Fly-through camera: WASD to move, Q/E down/up, Shift for speed, mouse to
/// look while the cursor is grabbed (G) or the middle button is held.
#[derive(Component, Debug, Clone, Copy)]
pub struct FreeCam {
    pub yaw: f32,
    pub pitch: f32,
    /// Units per second.
    pub speed: f32,
    pub boost_multiplier: f32,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
}

impl Default for FreeCam {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            speed: 5.0,
            boost_multiplier: 5.0,
            sensitivity: 0.003,
        }
    }
}

impl FreeCam {
    /// Picks up yaw and pitch from an existing orientation.
    pub fn from_transform(transform: &Transform) -> Self {
        let (yaw, pitch, _) = transform.rotation.to_euler(EulerRot::YXZ);
        Self {
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            ..default()
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn look(&mut self, mouse_delta: Vec2) {
        self.yaw -= mouse_delta.x * self.sensitivity;
        self.pitch = (self.pitch - mouse_delta.y * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

/// Local-space movement intent from the keyboard; x right, y up, z back.
pub fn movement_input(keyboard: &ButtonInput<KeyCode>) -> Vec3 {
    let mut input = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        input.z -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        input.z += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        input.x += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        input.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyE) {
        input.y += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyQ) {
        input.y -= 1.0;
    }
    input
}

pub fn free_cam_controller(
    mut cameras: Query<(&mut Transform, &mut FreeCam)>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
) {
    let mouse_delta: Vec2 = mouse_motion.read().map(|motion| motion.delta).sum();
    let grabbed = windows
        .single()
        .is_ok_and(|window| window.cursor_options.grab_mode != CursorGrabMode::None);
    let looking = grabbed || mouse_button.pressed(MouseButton::Middle);

    let input = movement_input(&keyboard);
    let boosted = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);

    for (mut transform, mut free_cam) in &mut cameras {
        if looking && mouse_delta != Vec2::ZERO {
            free_cam.look(mouse_delta);
        }
        transform.rotation = free_cam.rotation();

        if input != Vec3::ZERO {
            let mut speed = free_cam.speed;
            if boosted {
                speed *= free_cam.boost_multiplier;
            }
            let world_delta = transform.rotation * input.normalize();
            transform.translation += world_delta * speed * time.delta_secs();
        }
    }
}

pub fn toggle_cursor_grab(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyG) {
        return;
    }
    let Ok(mut window) = windows.single_mut() else {
        return;
    };

    let grab = window.cursor_options.grab_mode == CursorGrabMode::None;
    window.cursor_options.grab_mode = if grab {
        CursorGrabMode::Locked
    } else {
        CursorGrabMode::None
    };
    window.cursor_options.visible = !grab;
    info!("Cursor grab {}", if grab { "on" } else { "off" });
}

pub fn toggle_fullscreen(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    if !keyboard.just_pressed(KeyCode::F11) {
        return;
    }
    let Ok(mut window) = windows.single_mut() else {
        return;
    };

    window.mode = match window.mode {
        WindowMode::Windowed => WindowMode::BorderlessFullscreen(MonitorSelection::Current),
        _ => WindowMode::Windowed,
    };
}
