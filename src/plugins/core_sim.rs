use bevy::prelude::*;
use bevy::app::AppExit;
use bevy::time::Fixed;

// Core simulation timing, turn-pipeline ordering & shared run configuration.
#[derive(Resource, Default, Debug)]
pub struct SimState {
    pub tick: u64,
    pub elapsed_seconds: f32,
}
impl SimState {
    pub const TICK_HZ: f64 = 60.0;
    pub const TICK_SECONDS: f32 = 1.0 / 60.0;

    pub fn advance_fixed(&mut self) {
        self.tick += 1;
        self.elapsed_seconds = self.tick as f32 * Self::TICK_SECONDS;
    }
}

/// Order of the turn pipeline inside each fixed step.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnSet {
    /// Physics side samples the ball and pins.
    Sense,
    /// Pin falls accumulate for the current throw.
    Track,
    /// Resets, ball signals and grace timers.
    Arbitrate,
    /// Resolved throws advance the game.
    Sequence,
    /// Physics side returns the ball and sets up the rack.
    Respond,
}

#[derive(Resource)]
pub struct AutoConfig {
    pub enabled: bool,
    pub run_duration_seconds: f32,
    pub swing_interval_seconds: f32,
    pub power: f32,
    pub max_aim_jitter_deg: f32,
}
impl Default for AutoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            run_duration_seconds: f32::INFINITY,
            swing_interval_seconds: 1.5,
            power: 0.8,
            max_aim_jitter_deg: 3.0,
        }
    }
}
impl AutoConfig {
    /// `--autoplay` turns scripted throws on, `--runtime=<secs>` bounds the run.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut cfg = Self::default();
        for arg in args {
            if arg == "--autoplay" {
                cfg.enabled = true;
            } else if let Some(v) = arg.strip_prefix("--runtime=") {
                match v.parse::<f32>() {
                    Ok(secs) if secs > 0.0 => cfg.run_duration_seconds = secs,
                    _ => warn!("CONFIG ignoring bad --runtime value={v}"),
                }
            }
        }
        cfg
    }
}

#[derive(Resource, Default)]
pub struct ExitState { pub triggered: bool }

pub struct CoreSimPlugin;
impl Plugin for CoreSimPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SimState::default())
            .init_resource::<AutoConfig>() // respect pre-inserted AutoConfig (e.g. from --runtime flag)
            .insert_resource(ExitState::default())
            .insert_resource(Time::<Fixed>::from_hz(SimState::TICK_HZ))
            .configure_sets(
                FixedUpdate,
                (TurnSet::Sense, TurnSet::Track, TurnSet::Arbitrate, TurnSet::Sequence, TurnSet::Respond).chain(),
            )
            .add_systems(FixedUpdate, tick_state.before(TurnSet::Sense))
            .add_systems(Update, exit_after_runtime);
    }
}

fn tick_state(mut sim: ResMut<SimState>) {
    sim.advance_fixed();
}

fn exit_after_runtime(
    sim: Res<SimState>,
    auto: Res<AutoConfig>,
    mut exit_state: ResMut<ExitState>,
    mut ev_exit: EventWriter<AppExit>,
) {
    if exit_state.triggered { return; }
    if sim.elapsed_seconds >= auto.run_duration_seconds {
        info!("EXIT runtime reached seconds={}", sim.elapsed_seconds);
        exit_state.triggered = true;
        ev_exit.send(AppExit::Success);
    }
}
