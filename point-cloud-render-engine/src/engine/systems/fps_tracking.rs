use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;

use crate::engine::point_cloud::{PointCloud, ScannedPointCloud};

#[derive(Component)]
pub struct DebugText;

pub fn spawn_debug_text(mut commands: Commands) {
    commands.spawn((
        Text::new("FPS: "),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::srgb(1., 0., 0.)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
        DebugText,
    ));
}

pub fn debug_text_update_system(
    diagnostics: Res<DiagnosticsStore>,
    scanned: Query<&PointCloud, With<ScannedPointCloud>>,
    mut query: Query<&mut Text, With<DebugText>>,
) {
    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|fps| fps.smoothed());
    let scanned_points: usize = scanned.iter().map(PointCloud::len).sum();

    for mut text in &mut query {
        text.0 = debug_text(scanned_points, fps);
    }
}

fn debug_text(scanned_points: usize, fps: Option<f64>) -> String {
    match fps {
        Some(value) => format!("Points: {scanned_points}\nFPS: {value:.1}"),
        None => format!("Points: {scanned_points}\nFPS: -"),
    }
}
