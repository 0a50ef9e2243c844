use bevy::prelude::*;
use rand::Rng;

use crate::plugins::arbiter::{GameResetRequest, ThrowArbiter, ThrowRequest};
use crate::plugins::core_sim::{AutoConfig, SimState, TurnSet};
use crate::plugins::game_state::GameState;

/// Next scripted action, in fixed ticks.
#[derive(Resource, Default, Debug)]
pub struct AutoRuntime {
    pub next_throw_tick: u64,
}

pub struct AutoplayPlugin;
impl Plugin for AutoplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AutoRuntime>()
            .add_systems(FixedUpdate, scripted_autoplay.before(TurnSet::Sense));
    }
}

// Throws once per interval while the arbiter is idle; starts a new game after the last frame.
fn scripted_autoplay(
    sim: Res<SimState>,
    cfg: Res<AutoConfig>,
    game: Res<GameState>,
    mut runtime: ResMut<AutoRuntime>,
    mut arbiter: ResMut<ThrowArbiter>,
    mut ev_throw: EventWriter<ThrowRequest>,
    mut ev_reset: EventWriter<GameResetRequest>,
) {
    if !cfg.enabled || sim.tick < runtime.next_throw_tick || !arbiter.is_idle() {
        return;
    }
    let interval_ticks = ((cfg.swing_interval_seconds as f64 * SimState::TICK_HZ) as u64).max(1);
    runtime.next_throw_tick = sim.tick + interval_ticks;

    if game.game_over() {
        info!("AUTOPLAY new game previous_total={}", game.total());
        ev_reset.send(GameResetRequest);
        return;
    }

    let mut rng = rand::thread_rng();
    let aim = rng.gen_range(-cfg.max_aim_jitter_deg..=cfg.max_aim_jitter_deg).to_radians();
    let direction = Vec3::new(aim.sin(), 0.0, -aim.cos());
    let power = cfg.power.clamp(0.0, 1.0);
    if arbiter.begin_charge().and_then(|_| arbiter.release()).is_ok() {
        info!(
            "AUTOPLAY throw t={:.2}s tick={} frame={} power={:.2} aim={:.1}",
            sim.elapsed_seconds, sim.tick, game.current_frame(), power, aim.to_degrees()
        );
        ev_throw.send(ThrowRequest { direction, power });
    }
}
