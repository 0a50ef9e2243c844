// Pin components, tilt detection while a throw is live, and sweep/re-rack between throws.
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::plugins::arbiter::BallResetRequest;
use crate::plugins::ball::{Ball, BallKinematic};
use crate::plugins::core_sim::TurnSet;
use crate::plugins::game_state::GameState;
use crate::plugins::level::LaneDef;
use crate::plugins::pin_tracker::PinTiltEvent;

/// Where swept pins are parked, well below the lane and out of the way.
const PARKING_Y: f32 = -50.0;

#[derive(Component, Debug, Clone, Copy)]
pub struct Pin {
    pub index: usize,
    pub home: Vec3,
}

#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PinTilt {
    pub down: bool,
    pub swept: bool,
}

/// Angle in radians between the pin's up axis and world up.
pub fn tilt_angle(rotation: Quat) -> f32 {
    let up = rotation * Vec3::Y;
    up.dot(Vec3::Y).clamp(-1.0, 1.0).acos()
}

pub struct PinsPlugin;
impl Plugin for PinsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(FixedUpdate, detect_pin_tilt.in_set(TurnSet::Sense))
            .add_systems(FixedUpdate, rack_pins.in_set(TurnSet::Respond));
    }
}

fn detect_pin_tilt(
    lane: Res<LaneDef>,
    q_ball: Query<&BallKinematic, With<Ball>>,
    mut q_pins: Query<(&Pin, &Transform, &mut PinTilt)>,
    mut ev_tilt: EventWriter<PinTiltEvent>,
) {
    // Pins only count while a throw is live.
    let Ok(kin) = q_ball.get_single() else { return; };
    if !kin.thrown {
        return;
    }
    for (pin, t, mut tilt) in &mut q_pins {
        if tilt.down || tilt.swept {
            continue;
        }
        let knocked_off = t.translation.y < lane.bounds.lost_below_y;
        if knocked_off || tilt_angle(t.rotation) > lane.pins.tilt_threshold {
            tilt.down = true;
            ev_tilt.send(PinTiltEvent { index: pin.index });
        }
    }
}

fn rack_pins(
    mut commands: Commands,
    mut ev_reset: EventReader<BallResetRequest>,
    game: Res<GameState>,
    mut q_pins: Query<(Entity, &Pin, &mut Transform, &mut Velocity, &mut PinTilt)>,
) {
    if ev_reset.read().last().is_none() {
        return;
    }
    let (standing, fresh) = game.rack();
    if fresh {
        for (entity, pin, mut t, mut vel, mut tilt) in &mut q_pins {
            *t = Transform::from_translation(pin.home);
            *vel = Velocity::zero();
            *tilt = PinTilt::default();
            commands.entity(entity).insert(RigidBody::Dynamic);
        }
        info!("RACK full");
        return;
    }
    let mut swept = 0;
    for (entity, pin, mut t, mut vel, mut tilt) in &mut q_pins {
        if tilt.down && !tilt.swept {
            tilt.swept = true;
            t.translation = Vec3::new(pin.home.x, PARKING_Y, pin.home.z);
            *vel = Velocity::zero();
            commands.entity(entity).insert(RigidBody::Fixed);
            swept += 1;
        }
    }
    info!("RACK swept={} standing={}", swept, standing);
}
