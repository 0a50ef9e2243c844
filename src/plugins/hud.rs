use bevy::prelude::*;

use crate::plugins::game_state::{Frame, GameState, ScoreboardSnapshot, PINS_PER_RACK};

#[derive(Component)]
pub struct Hud;

pub struct HudPlugin;
impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_hud)
            .add_systems(Update, update_hud);
    }
}

/// Scoresheet marks for one frame: `X` strike, `/` spare, `-` miss.
pub fn frame_marks(frame: &Frame) -> String {
    let mut out = String::new();
    let mut fresh = true;
    let mut standing = PINS_PER_RACK;
    for p in frame.pins() {
        if fresh && p == PINS_PER_RACK {
            out.push('X');
        } else if !fresh && p == standing {
            out.push('/');
            fresh = true;
            standing = PINS_PER_RACK;
        } else {
            out.push(if p == 0 { '-' } else { char::from(b'0' + p) });
            fresh = false;
            standing -= p;
        }
    }
    out
}

/// Two-row scoresheet (marks, running totals) plus a status line.
/// Frames whose score still waits on bonus rolls show a blank total.
pub fn format_scoreboard(snap: &ScoreboardSnapshot) -> String {
    let mut marks = String::new();
    let mut totals = String::new();
    for f in &snap.frames {
        let total = f.cumulative.value().map(|v| v.to_string()).unwrap_or_default();
        marks.push_str(&format!("|{:^5}", frame_marks(f)));
        totals.push_str(&format!("|{:^5}", total));
    }
    marks.push('|');
    totals.push('|');
    let status = if snap.game_over {
        format!(
            "GAME OVER  Total: {}  Strikes: {}  Spares: {}  Splits: {}",
            snap.cumulative_total, snap.stats.strikes, snap.stats.spares, snap.stats.splits
        )
    } else {
        format!(
            "Frame {} Ball {}  Total: {}",
            snap.frame_number, snap.roll_number, snap.cumulative_total
        )
    };
    format!("{marks}\n{totals}\n{status}")
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        TextBundle::from_section(
            format_scoreboard(&GameState::new().snapshot()),
            TextStyle { font_size: 20.0, color: Color::WHITE, ..default() },
        )
        .with_style(Style { position_type: PositionType::Absolute, left: Val::Px(12.0), top: Val::Px(8.0), ..default() }),
        Hud,
    ));
}

fn update_hud(game: Res<GameState>, mut q_text: Query<&mut Text, With<Hud>>) {
    if !game.is_changed() {
        return;
    }
    if let Ok(mut text) = q_text.get_single_mut() {
        text.sections[0].value = format_scoreboard(&game.snapshot());
    }
}
