use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum AppState {
    #[default]
    Loading,
    Running,
}

pub fn log_running(state: Res<State<AppState>>) {
    info!("→ Scene spawned, state is now {:?}", state.get());
}
