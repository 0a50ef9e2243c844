// Ball components & the physics-facing half of a throw: launch impulse,
// boundary/stop detection, and returning the ball to the lane head.
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use rand::Rng;

use crate::plugins::arbiter::{BallResetRequest, ThrowRequest, ThrowSignal, ThrowSignalKind};
use crate::plugins::core_sim::{SimState, TurnSet};
use crate::plugins::level::{BoundsDef, LaneDef};
use crate::plugins::throwing::ThrowConfig;

/// Fixed steps after release before a slow ball may count as stopped.
const MIN_FLIGHT_TICKS: u32 = 10;

#[derive(Component)]
pub struct Ball;

/// Per-throw latches so each signal is reported at most once.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BallKinematic {
    pub thrown: bool,
    pub flight_ticks: u32,
    pub lost_reported: bool,
    pub pit_reported: bool,
    pub stop_reported: bool,
}

impl BallKinematic {
    /// Signals this sample produces, given the ball's position and speed.
    pub fn observe(&mut self, pos: Vec3, speed: f32, bounds: &BoundsDef) -> Vec<ThrowSignalKind> {
        let mut out = Vec::new();
        if !self.thrown {
            return out;
        }
        self.flight_ticks += 1;
        if pos.y < bounds.lost_below_y && !self.lost_reported {
            self.lost_reported = true;
            out.push(ThrowSignalKind::BallLost);
        }
        if pos.z < bounds.pit_z && !self.pit_reported {
            self.pit_reported = true;
            out.push(ThrowSignalKind::BallReachedPit);
        }
        if speed < bounds.stop_speed && self.flight_ticks >= MIN_FLIGHT_TICKS && !self.stop_reported {
            self.stop_reported = true;
            out.push(ThrowSignalKind::BallStopped);
        }
        out
    }
}

pub struct BallPlugin;
impl Plugin for BallPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(FixedUpdate, (launch_ball, sample_ball).chain().in_set(TurnSet::Sense))
            .add_systems(FixedUpdate, reset_ball.in_set(TurnSet::Respond));
    }
}

fn launch_ball(
    mut ev_throw: EventReader<ThrowRequest>,
    cfg: Res<ThrowConfig>,
    mut q: Query<(&mut Velocity, &mut BallKinematic), With<Ball>>,
) {
    let Ok((mut vel, mut kin)) = q.get_single_mut() else { return; };
    for ev in ev_throw.read() {
        let speed = cfg.speed_for(ev.power);
        let dir = Vec3::new(ev.direction.x, 0.0, ev.direction.z).normalize_or_zero();
        let mut rng = rand::thread_rng();
        let spin = cfg.spin * speed;
        vel.linvel = dir * speed;
        // Roll forward plus a little random wobble.
        vel.angvel = Vec3::new(-dir.z * spin, 0.0, dir.x * spin)
            + Vec3::new(rng.gen_range(-0.05..0.05), rng.gen_range(-0.05..0.05), rng.gen_range(-0.05..0.05));
        *kin = BallKinematic { thrown: true, ..default() };
        info!("BALL launch power={:.2} speed={:.2} dir=({:.2},{:.2})", ev.power, speed, dir.x, dir.z);
    }
}

fn sample_ball(
    sim: Res<SimState>,
    lane: Res<LaneDef>,
    mut q: Query<(&Transform, &Velocity, &mut BallKinematic), With<Ball>>,
    mut ev_signal: EventWriter<ThrowSignal>,
) {
    let Ok((t, vel, mut kin)) = q.get_single_mut() else { return; };
    for kind in kin.observe(t.translation, vel.linvel.length(), &lane.bounds) {
        ev_signal.send(ThrowSignal { kind, at: sim.elapsed_seconds });
    }
}

fn reset_ball(
    mut ev_reset: EventReader<BallResetRequest>,
    lane: Res<LaneDef>,
    mut q: Query<(&mut Transform, &mut Velocity, &mut BallKinematic), With<Ball>>,
) {
    if ev_reset.read().last().is_none() {
        return;
    }
    let Ok((mut t, mut vel, mut kin)) = q.get_single_mut() else { return; };
    t.translation = lane.ball.spawn.to_vec3();
    t.rotation = Quat::IDENTITY;
    *vel = Velocity::zero();
    *kin = BallKinematic::default();
}
