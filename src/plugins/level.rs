// Lane loading & world setup (camera, light, lane slab, ball, pins).
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;

use crate::plugins::arbiter::ArbiterConfig;
use crate::plugins::ball::{Ball, BallKinematic};
use crate::plugins::pin_tracker::PIN_COUNT;
use crate::plugins::pins::{Pin, PinTilt};
use crate::plugins::throwing::ThrowConfig;

// ----------------------- Lane Definition (RON) -----------------------

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Vec3Def { pub x: f32, pub y: f32, pub z: f32 }
impl Vec3Def { pub fn to_vec3(self) -> Vec3 { Vec3::new(self.x, self.y, self.z) } }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct BallDef {
    pub spawn: Vec3Def,
    pub radius: f32,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}
impl Default for BallDef {
    fn default() -> Self {
        Self {
            spawn: Vec3Def { x: 0.0, y: 0.5, z: 5.0 },
            radius: 0.5,
            mass: 50.0,
            friction: 0.2,
            restitution: 0.5,
            linear_damping: 0.5,
            angular_damping: 0.5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PinsDef {
    pub positions: Vec<Vec3Def>,
    pub radius: f32,
    pub height: f32,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Tilt from upright (radians) past which a pin counts as down.
    pub tilt_threshold: f32,
}
impl Default for PinsDef {
    fn default() -> Self {
        let p = |x: f32, z: f32| Vec3Def { x, y: 0.5, z };
        Self {
            positions: vec![
                p(0.0, -10.0),
                p(-0.4, -10.6), p(0.4, -10.6),
                p(-0.8, -11.2), p(0.0, -11.2), p(0.8, -11.2),
                p(-1.2, -11.8), p(-0.4, -11.8), p(0.4, -11.8), p(1.2, -11.8),
            ],
            radius: 0.15,
            height: 1.0,
            mass: 1.5,
            friction: 0.3,
            restitution: 0.4,
            tilt_threshold: 0.5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct BoundsDef {
    pub lane_half_width: f32,
    pub lane_length: f32,
    /// Ball is lost once it drops below this height.
    pub lost_below_y: f32,
    /// Ball has reached the pit once past this depth.
    pub pit_z: f32,
    pub stop_speed: f32,
}
impl Default for BoundsDef {
    fn default() -> Self {
        Self { lane_half_width: 1.5, lane_length: 22.0, lost_below_y: -2.0, pit_z: -14.0, stop_speed: 0.1 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TimingDef {
    pub lost_grace: f32,
    pub pit_grace: f32,
    pub settle_with_pins: f32,
    pub settle_empty: f32,
}
impl Default for TimingDef {
    fn default() -> Self {
        let a = ArbiterConfig::default();
        Self {
            lost_grace: a.lost_grace,
            pit_grace: a.pit_grace,
            settle_with_pins: a.settle_with_pins,
            settle_empty: a.settle_empty,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ThrowDef {
    pub min_speed: f32,
    pub max_speed: f32,
    pub max_charge_secs: f32,
    pub max_aim_deg: f32,
    pub aim_speed_deg: f32,
    pub spin: f32,
}
impl Default for ThrowDef {
    fn default() -> Self {
        let t = ThrowConfig::default();
        Self {
            min_speed: t.min_speed,
            max_speed: t.max_speed,
            max_charge_secs: t.max_charge_secs,
            max_aim_deg: t.max_aim_deg,
            aim_speed_deg: t.aim_speed_deg,
            spin: t.spin,
        }
    }
}

#[derive(Debug, Deserialize, Resource, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LaneDef {
    pub ball: BallDef,
    pub pins: PinsDef,
    pub bounds: BoundsDef,
    pub timing: TimingDef,
    pub throw: ThrowDef,
}

impl LaneDef {
    pub fn arbiter_config(&self) -> ArbiterConfig {
        ArbiterConfig {
            lost_grace: self.timing.lost_grace,
            pit_grace: self.timing.pit_grace,
            settle_with_pins: self.timing.settle_with_pins,
            settle_empty: self.timing.settle_empty,
        }
    }

    pub fn throw_config(&self) -> ThrowConfig {
        ThrowConfig {
            min_speed: self.throw.min_speed,
            max_speed: self.throw.max_speed,
            max_charge_secs: self.throw.max_charge_secs,
            max_aim_deg: self.throw.max_aim_deg,
            aim_speed_deg: self.throw.aim_speed_deg,
            spin: self.throw.spin,
        }
    }
}

pub fn parse_lane(data: &str) -> Result<LaneDef, ron::error::SpannedError> {
    ron::from_str::<LaneDef>(data)
}

/// Pin indices must stay within the rack, so a lane listing anything other
/// than ten positions gets the standard pin setup instead.
pub fn with_full_rack(mut lane: LaneDef) -> LaneDef {
    let n = lane.pins.positions.len();
    if n != PIN_COUNT {
        warn!("LANE expected {} pin positions, got {}; using the standard rack", PIN_COUNT, n);
        lane.pins = PinsDef::default();
    }
    lane
}

// ----------------------- Plugin -----------------------

pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_lane)
            .add_systems(Startup, spawn_lane.after(load_lane));
    }
}

// ----------------------- Systems -----------------------

fn load_lane(mut commands: Commands) {
    #[cfg(target_arch = "wasm32")]
    let lane = {
        // No filesystem in the browser; embed the lane definition at compile time.
        let data = include_str!("../../assets/lanes/standard.ron");
        parse_lane(data).unwrap_or_else(|e| {
            error!("Failed to parse embedded lane: {e}");
            LaneDef::default()
        })
    };

    #[cfg(not(target_arch = "wasm32"))]
    let lane = {
        let path = "assets/lanes/standard.ron";
        match fs::read_to_string(path) {
            Ok(data) => parse_lane(&data).unwrap_or_else(|e| {
                error!("Failed to parse {path}: {e}");
                LaneDef::default()
            }),
            Err(e) => {
                error!("Failed to read lane file {path}: {e}");
                LaneDef::default()
            }
        }
    };

    let lane = with_full_rack(lane);
    // Override tuning from the lane file.
    commands.insert_resource(lane.arbiter_config());
    commands.insert_resource(lane.throw_config());
    commands.insert_resource(lane);
}

fn spawn_lane(
    mut commands: Commands,
    lane: Res<LaneDef>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<StandardMaterial>>,
) {
    let b = &lane.bounds;

    // Camera behind the foul line, looking down the lane.
    let head = lane.ball.spawn.to_vec3();
    commands.spawn(Camera3dBundle {
        transform: Transform::from_translation(head + Vec3::new(0.0, 3.5, 6.0))
            .looking_at(Vec3::new(0.0, 0.0, -8.0), Vec3::Y),
        ..default()
    });

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 20_000.0,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(10.0, 10.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });

    // Lane slab: top surface at y = 0, running from the foul line past the pit line.
    let half_len = b.lane_length * 0.5;
    let center_z = head.z + 2.0 - half_len;
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Cuboid::new(b.lane_half_width * 2.0, 0.5, b.lane_length)),
            material: mats.add(StandardMaterial {
                base_color: Color::srgb(0.76, 0.6, 0.42),
                perceptual_roughness: 0.3,
                ..default()
            }),
            transform: Transform::from_xyz(0.0, -0.25, center_z),
            ..default()
        },
        RigidBody::Fixed,
        Collider::cuboid(b.lane_half_width, 0.25, half_len),
        Friction::coefficient(0.2),
    ));

    // Ball
    let bd = &lane.ball;
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Sphere::new(bd.radius)),
            material: mats.add(StandardMaterial {
                base_color: Color::srgb(0.0, 0.0, 0.5),
                metallic: 0.8,
                perceptual_roughness: 0.2,
                ..default()
            }),
            transform: Transform::from_translation(head),
            ..default()
        },
        Ball,
        BallKinematic::default(),
        RigidBody::Dynamic,
        Collider::ball(bd.radius),
        ColliderMassProperties::Mass(bd.mass),
        Friction::coefficient(bd.friction),
        Restitution::coefficient(bd.restitution),
        Damping { linear_damping: bd.linear_damping, angular_damping: bd.angular_damping },
        Velocity::zero(),
        Ccd::enabled(),
    ));

    // Pins
    let pd = &lane.pins;
    let pin_mesh = meshes.add(Cylinder::new(pd.radius, pd.height));
    let pin_mat = mats.add(StandardMaterial { base_color: Color::WHITE, ..default() });
    for (index, pos) in pd.positions.iter().enumerate() {
        commands.spawn((
            PbrBundle {
                mesh: pin_mesh.clone(),
                material: pin_mat.clone(),
                transform: Transform::from_translation(pos.to_vec3()),
                ..default()
            },
            Pin { index, home: pos.to_vec3() },
            PinTilt::default(),
            RigidBody::Dynamic,
            Collider::cylinder(pd.height * 0.5, pd.radius),
            ColliderMassProperties::Mass(pd.mass),
            Friction::coefficient(pd.friction),
            Restitution::coefficient(pd.restitution),
            Velocity::zero(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_lane_file_keeps_defaults() {
        let lane = parse_lane("(timing: (pit_grace: 3.0), bounds: (stop_speed: 0.2))").unwrap();
        assert_eq!(lane.timing.pit_grace, 3.0);
        assert_eq!(lane.timing.lost_grace, TimingDef::default().lost_grace);
        assert_eq!(lane.bounds.stop_speed, 0.2);
        assert_eq!(lane.pins.positions.len(), 10);
        assert_eq!(lane.arbiter_config().pit_grace, 3.0);
    }

    #[test]
    fn wrong_pin_count_falls_back_to_standard_rack() {
        let extra = "(pins: (positions: [\
            (x: 0.0, y: 0.5, z: -10.0), (x: 0.1, y: 0.5, z: -10.0), (x: 0.2, y: 0.5, z: -10.0),\
            (x: 0.3, y: 0.5, z: -10.0), (x: 0.4, y: 0.5, z: -10.0), (x: 0.5, y: 0.5, z: -10.0),\
            (x: 0.6, y: 0.5, z: -10.0), (x: 0.7, y: 0.5, z: -10.0), (x: 0.8, y: 0.5, z: -10.0),\
            (x: 0.9, y: 0.5, z: -10.0), (x: 1.0, y: 0.5, z: -10.0)], mass: 2.0))";
        let lane = parse_lane(extra).unwrap();
        assert_eq!(lane.pins.positions.len(), 11);
        let lane = with_full_rack(lane);
        assert_eq!(lane.pins, PinsDef::default());

        let short = with_full_rack(parse_lane("(pins: (positions: []))").unwrap());
        assert_eq!(short.pins.positions.len(), PIN_COUNT);
    }

    #[test]
    fn ten_pin_lane_is_kept_as_is() {
        let lane = parse_lane("(pins: (mass: 2.0))").unwrap();
        assert_eq!(with_full_rack(lane.clone()), lane);
    }

    #[test]
    fn bundled_lane_file_parses() {
        let lane = parse_lane(include_str!("../../assets/lanes/standard.ron")).unwrap();
        assert_eq!(lane.pins.positions.len(), 10);
        assert!(lane.bounds.pit_z < lane.pins.positions[9].z);
    }
}
