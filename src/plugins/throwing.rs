// Throwing: input handling, power charge, aim, and the power bar UI.
// Releasing a charge moves the arbiter to InFlight and asks the physics side to launch the ball.
//
// Depends on:
//  - ThrowArbiter (arbiter) for the Idle -> Charging -> InFlight hand-off
//  - GameState (game_state) to refuse throws after the tenth frame

use bevy::prelude::*;

use crate::plugins::arbiter::{GameResetRequest, ThrowArbiter, ThrowRequest};
use crate::plugins::game_state::GameState;

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct ThrowConfig {
    pub min_speed: f32,
    pub max_speed: f32,
    pub max_charge_secs: f32, // time to reach full power
    pub max_aim_deg: f32,
    pub aim_speed_deg: f32,   // degrees per second while an arrow key is held
    pub spin: f32,            // forward roll per unit of launch speed
}
impl Default for ThrowConfig {
    fn default() -> Self {
        Self { min_speed: 5.0, max_speed: 30.0, max_charge_secs: 2.0, max_aim_deg: 10.0, aim_speed_deg: 20.0, spin: 0.1 }
    }
}
impl ThrowConfig {
    pub fn speed_for(&self, power: f32) -> f32 {
        self.min_speed + power.clamp(0.0, 1.0) * (self.max_speed - self.min_speed)
    }
}

#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct ThrowCharge {
    pub charging: bool,
    pub power: f32,   // 0..1, linear ramp while charging
    pub aim_deg: f32, // 0 = straight down the lane, positive to the right
}
impl ThrowCharge {
    pub fn start(&mut self) {
        self.charging = true;
        self.power = 0.0;
    }

    pub fn advance(&mut self, dt: f32, cfg: &ThrowConfig) {
        if !self.charging {
            return;
        }
        let rate = if cfg.max_charge_secs > 0.0 { dt / cfg.max_charge_secs } else { 1.0 };
        self.power = (self.power + rate).min(1.0);
    }

    pub fn steer(&mut self, delta_deg: f32, cfg: &ThrowConfig) {
        self.aim_deg = (self.aim_deg + delta_deg).clamp(-cfg.max_aim_deg, cfg.max_aim_deg);
    }

    /// Unit vector along the lane (towards -Z), rotated by the aim angle.
    pub fn direction(&self) -> Vec3 {
        let a = self.aim_deg.to_radians();
        Vec3::new(a.sin(), 0.0, -a.cos())
    }

    /// Ends the charge and returns the launch request.
    pub fn finish(&mut self) -> ThrowRequest {
        let req = ThrowRequest { direction: self.direction(), power: self.power };
        self.charging = false;
        self.power = 0.0;
        req
    }

    pub fn cancel(&mut self) {
        self.charging = false;
        self.power = 0.0;
    }
}

#[derive(Component)]
pub struct PowerGauge;

#[derive(Component)]
pub struct PowerBar;
#[derive(Component)]
pub struct PowerBarFill;

pub struct ThrowingPlugin;
impl Plugin for ThrowingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ThrowConfig>()
            .init_resource::<ThrowCharge>()
            .add_systems(Startup, spawn_power_ui)
            .add_systems(Update, (handle_throw_input, update_power_gauge, update_power_bar).chain());
    }
}

// ---------------- Power UI ----------------

/// Gauge sits bottom-centre, over the foul line.
const GAUGE_WIDTH_PX: f32 = 240.0;
const GAUGE_HEIGHT_PX: f32 = 14.0;
const GAUGE_BOTTOM_PX: f32 = 24.0;
const GAUGE_BORDER_PX: f32 = 2.0;
const GAUGE_TRACK: [f32; 3] = [0.12, 0.10, 0.09];

/// Fill colour stops as (power, rgb): cool roll, hook speed, overpowered.
const POWER_STOPS: [(f32, [f32; 3]); 3] = [
    (0.0, [0.20, 0.45, 0.85]),
    (0.6, [0.95, 0.70, 0.15]),
    (1.0, [0.85, 0.15, 0.10]),
];

/// Fill colour for a power in 0..=1, interpolated between [`POWER_STOPS`].
pub fn power_rgb(power: f32) -> [f32; 3] {
    let p = power.clamp(0.0, 1.0);
    for pair in POWER_STOPS.windows(2) {
        let ((p0, c0), (p1, c1)) = (pair[0], pair[1]);
        if p <= p1 {
            let t = if p1 > p0 { (p - p0) / (p1 - p0) } else { 1.0 };
            return [0, 1, 2].map(|i| c0[i] + (c1[i] - c0[i]) * t);
        }
    }
    POWER_STOPS[POWER_STOPS.len() - 1].1
}

fn rgb([r, g, b]: [f32; 3]) -> Color {
    Color::srgb(r, g, b)
}

fn spawn_power_ui(mut commands: Commands) {
    let gauge_left = Val::Percent(50.0);
    let gauge_offset = UiRect::left(Val::Px(-GAUGE_WIDTH_PX * 0.5));

    commands.spawn((
        TextBundle::from_section(
            "Power: --",
            TextStyle { font_size: 18.0, color: Color::WHITE, ..default() },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            left: gauge_left,
            margin: gauge_offset,
            bottom: Val::Px(GAUGE_BOTTOM_PX + GAUGE_HEIGHT_PX + 6.0),
            ..default()
        }),
        PowerGauge,
    ));

    commands
        .spawn((
            NodeBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    left: gauge_left,
                    margin: gauge_offset,
                    bottom: Val::Px(GAUGE_BOTTOM_PX),
                    width: Val::Px(GAUGE_WIDTH_PX),
                    height: Val::Px(GAUGE_HEIGHT_PX),
                    padding: UiRect::all(Val::Px(GAUGE_BORDER_PX)),
                    ..default()
                },
                background_color: rgb(GAUGE_TRACK).into(),
                ..default()
            },
            PowerBar,
        ))
        .with_children(|parent| {
            parent.spawn((
                NodeBundle {
                    style: Style { width: Val::Percent(0.0), height: Val::Percent(100.0), ..default() },
                    background_color: rgb(power_rgb(0.0)).into(),
                    ..default()
                },
                PowerBarFill,
            ));
        });
}

// ---------------- Systems ----------------

#[allow(clippy::too_many_arguments)]
fn handle_throw_input(
    time: Res<Time>,
    buttons: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    cfg: Res<ThrowConfig>,
    game: Res<GameState>,
    mut charge: ResMut<ThrowCharge>,
    mut arbiter: ResMut<ThrowArbiter>,
    mut ev_throw: EventWriter<ThrowRequest>,
    mut ev_reset: EventWriter<GameResetRequest>,
) {
    if keys.just_pressed(KeyCode::KeyR) {
        charge.cancel();
        ev_reset.send(GameResetRequest);
        return;
    }

    let dt = time.delta_seconds();
    let mut steer = 0.0;
    if keys.pressed(KeyCode::ArrowLeft) { steer -= cfg.aim_speed_deg * dt; }
    if keys.pressed(KeyCode::ArrowRight) { steer += cfg.aim_speed_deg * dt; }
    if steer != 0.0 && (arbiter.is_idle() || charge.charging) {
        charge.steer(steer, &cfg);
    }

    let pressed = buttons.just_pressed(MouseButton::Left) || keys.just_pressed(KeyCode::Space);
    let released = buttons.just_released(MouseButton::Left) || keys.just_released(KeyCode::Space);

    if pressed && !charge.charging && !game.game_over() {
        match arbiter.begin_charge() {
            Ok(()) => charge.start(),
            Err(e) => debug!("THROW {e}"),
        }
    }

    let cancel = keys.just_pressed(KeyCode::Escape) || buttons.just_pressed(MouseButton::Right);
    if charge.charging && cancel {
        charge.cancel();
        if let Err(e) = arbiter.cancel_charge() {
            warn!("THROW {e}");
        }
        return;
    }

    charge.advance(dt, &cfg);

    if released && charge.charging {
        match arbiter.release() {
            Ok(()) => {
                let req = charge.finish();
                info!("THROW release power={:.2} aim={:.1}", req.power, charge.aim_deg);
                ev_throw.send(req);
            }
            Err(e) => {
                charge.cancel();
                warn!("THROW {e}");
            }
        }
    }
}

fn update_power_gauge(
    charge: Res<ThrowCharge>,
    mut q: Query<&mut Text, With<PowerGauge>>,
) {
    if !charge.is_changed() {
        return;
    }
    if let Ok(mut text) = q.get_single_mut() {
        text.sections[0].value = if charge.charging {
            format!("Power: {:>3}%  Aim: {:+.0}°", (charge.power * 100.0) as u32, charge.aim_deg)
        } else {
            format!("Power: --  Aim: {:+.0}°", charge.aim_deg)
        };
    }
}

fn update_power_bar(
    charge: Res<ThrowCharge>,
    mut q_fill: Query<(&mut Style, &mut BackgroundColor), With<PowerBarFill>>,
) {
    if !charge.is_changed() { return; }
    let power = if charge.charging { charge.power } else { 0.0 };
    if let Ok((mut style, mut color)) = q_fill.get_single_mut() {
        style.width = Val::Percent(power * 100.0);
        *color = rgb(power_rgb(power)).into();
    }
}
