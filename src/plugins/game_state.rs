// Game state & frame/roll sequencing: the single mutable aggregate of a match,
// advanced once per resolved throw and rescored after every roll.

use bevy::prelude::*;

use crate::error::{BowlingError, BowlingResult, Violation};
use crate::plugins::arbiter::{GameResetRequest, ThrowResolved};
use crate::plugins::core_sim::TurnSet;
use crate::plugins::pin_tracker::{is_split, PinSet};
use crate::plugins::scoring::{calculate_scores, FrameScore};

pub const FRAME_COUNT: usize = 10;
pub const PINS_PER_RACK: u8 = 10;

/// One slot in a frame's roll list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollRecord {
    Pins(u8),
    /// Placeholder for the unused second ball of a strike in frames 1-9.
    Ghost,
}

impl RollRecord {
    pub fn pins(self) -> Option<u8> {
        match self {
            RollRecord::Pins(p) => Some(p),
            RollRecord::Ghost => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    pub number: u8,
    pub rolls: Vec<RollRecord>,
    pub score: FrameScore,
    pub cumulative: FrameScore,
    /// First ball of the frame cleared a full rack. Bonus-ball strikes in the
    /// tenth leave this alone and only count in [`GameStats::strikes`].
    pub is_strike: bool,
    pub is_spare: bool,
    pub is_split: bool,
    /// No further rolls will be recorded in this frame.
    pub is_complete: bool,
}

impl Frame {
    fn new(number: u8) -> Self {
        Self {
            number,
            rolls: Vec::with_capacity(3),
            score: FrameScore::Pending,
            cumulative: FrameScore::Pending,
            is_strike: false,
            is_spare: false,
            is_split: false,
            is_complete: false,
        }
    }

    /// Thrown rolls, ghosts skipped.
    pub fn pins(&self) -> impl Iterator<Item = u8> + '_ {
        self.rolls.iter().filter_map(|r| r.pins())
    }

    fn roll(&self, n: usize) -> Option<u8> {
        self.pins().nth(n)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameStats {
    pub strikes: u32,
    pub spares: u32,
    pub splits: u32,
    pub gutter_balls: u32,
    pub highest_frame: u16,
    pub average_frame: f32,
}

/// Closed command set accepted by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    RecordThrow { pins_down: u8, knocked: Option<PinSet> },
    Reset,
}

/// What a recorded roll turned out to be. Returned to callers for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollOutcome {
    pub frame: u8,
    pub roll: u8,
    pub pins: u8,
    pub strike: bool,
    pub spare: bool,
    pub split: bool,
    pub game_over: bool,
}

/// Read-only view handed to presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreboardSnapshot {
    pub frame_number: u8,
    pub roll_number: u8,
    pub frames: Vec<Frame>,
    pub cumulative_total: u16,
    pub game_over: bool,
    pub stats: GameStats,
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct GameState {
    frames: Vec<Frame>,
    frame: u8,
    roll: u8,
    game_over: bool,
    total: u16,
    stats: GameStats,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            frames: (1..=FRAME_COUNT as u8).map(Frame::new).collect(),
            frame: 1,
            roll: 1,
            game_over: false,
            total: 0,
            stats: GameStats::default(),
        }
    }

    pub fn frames(&self) -> &[Frame] { &self.frames }
    pub fn current_frame(&self) -> u8 { self.frame }
    pub fn current_roll(&self) -> u8 { self.roll }
    pub fn game_over(&self) -> bool { self.game_over }
    pub fn total(&self) -> u16 { self.total }
    pub fn stats(&self) -> &GameStats { &self.stats }

    pub fn snapshot(&self) -> ScoreboardSnapshot {
        ScoreboardSnapshot {
            frame_number: self.frame,
            roll_number: self.roll,
            frames: self.frames.clone(),
            cumulative_total: self.total,
            game_over: self.game_over,
            stats: self.stats.clone(),
        }
    }

    pub fn apply(&mut self, cmd: GameCommand) -> BowlingResult<Option<RollOutcome>> {
        match cmd {
            GameCommand::RecordThrow { pins_down, knocked } => {
                self.record_throw(pins_down, knocked).map(Some)
            }
            GameCommand::Reset => {
                self.reset();
                Ok(None)
            }
        }
    }

    /// Back to frame 1 with an empty scoresheet.
    pub fn reset(&mut self) {
        *self = GameState::new();
    }

    /// Records a throw known only by its pin count.
    pub fn advance(&mut self, pins_down: u8) -> BowlingResult<RollOutcome> {
        self.record_throw(pins_down, None)
    }

    /// Non-mutating form of [`GameState::advance`].
    pub fn advanced(&self, pins_down: u8) -> BowlingResult<GameState> {
        let mut next = self.clone();
        next.advance(pins_down)?;
        Ok(next)
    }

    /// Pins standing for the next roll, and whether they are a fresh rack.
    pub fn rack(&self) -> (u8, bool) {
        if self.game_over {
            return (0, false);
        }
        let frame = &self.frames[self.frame as usize - 1];
        let first = frame.roll(0).unwrap_or(0);
        let second = frame.roll(1).unwrap_or(0);
        let full = (PINS_PER_RACK, true);
        match (self.frame as usize == FRAME_COUNT, self.roll) {
            (_, 1) => full,
            (false, _) => (PINS_PER_RACK - first, false),
            (true, 2) if first == PINS_PER_RACK => full,
            (true, 2) => (PINS_PER_RACK - first, false),
            // Tenth frame, third ball.
            (true, _) if first == PINS_PER_RACK && second < PINS_PER_RACK => {
                (PINS_PER_RACK - second, false)
            }
            (true, _) => full,
        }
    }

    pub fn standing_pins(&self) -> u8 {
        self.rack().0
    }

    /// Records one throw and moves to the next roll.
    ///
    /// Rejected throws leave the state untouched. `knocked`, when known, is
    /// used only to detect splits on a fresh rack.
    pub fn record_throw(&mut self, pins_down: u8, knocked: Option<PinSet>) -> BowlingResult<RollOutcome> {
        if self.game_over {
            return Err(Violation::GameAlreadyOver.into());
        }
        if pins_down > PINS_PER_RACK {
            return Err(Violation::PinCountOutOfRange { pins: pins_down }.into());
        }
        let (standing, fresh) = self.rack();
        if pins_down > standing {
            return Err(BowlingError::RuleViolation(Violation::PinsExceedStanding {
                frame: self.frame,
                roll: self.roll,
                pins: pins_down,
                standing,
            }));
        }

        let (frame_no, roll_no) = (self.frame, self.roll);
        let tenth = frame_no as usize == FRAME_COUNT;
        let strike = fresh && pins_down == PINS_PER_RACK;
        let spare = !fresh && pins_down == standing;
        let split = fresh
            && !strike
            && knocked.map_or(false, |k| is_split(k.complement()));

        let frame = &mut self.frames[frame_no as usize - 1];
        frame.rolls.push(RollRecord::Pins(pins_down));

        if strike {
            self.stats.strikes += 1;
            if roll_no == 1 {
                frame.is_strike = true;
            }
        }
        if spare {
            self.stats.spares += 1;
            if roll_no == 2 && !frame.is_strike {
                frame.is_spare = true;
            }
        }
        if split {
            self.stats.splits += 1;
            if roll_no == 1 {
                frame.is_split = true;
            }
        }
        if pins_down == 0 {
            self.stats.gutter_balls += 1;
        }

        if !tenth {
            if strike || roll_no == 2 {
                if strike {
                    frame.rolls.push(RollRecord::Ghost);
                }
                frame.is_complete = true;
                self.frame += 1;
                self.roll = 1;
            } else {
                self.roll = 2;
            }
        } else {
            let bonus_earned = frame.is_strike || frame.is_spare;
            match roll_no {
                1 => self.roll = 2,
                2 if bonus_earned => self.roll = 3,
                _ => {
                    frame.is_complete = true;
                    self.game_over = true;
                }
            }
        }

        self.rescore();
        Ok(RollOutcome {
            frame: frame_no,
            roll: roll_no,
            pins: pins_down,
            strike,
            spare,
            split,
            game_over: self.game_over,
        })
    }

    fn rescore(&mut self) {
        let card = calculate_scores(&self.frames);
        for (frame, tally) in self.frames.iter_mut().zip(card.frames.iter()) {
            frame.score = tally.score;
            frame.cumulative = tally.cumulative;
        }
        self.total = card.total;

        let resolved: Vec<u16> = self.frames.iter().filter_map(|f| f.score.value()).collect();
        self.stats.highest_frame = resolved.iter().copied().max().unwrap_or(0);
        self.stats.average_frame = if resolved.is_empty() {
            0.0
        } else {
            resolved.iter().map(|&s| f32::from(s)).sum::<f32>() / resolved.len() as f32
        };
    }
}

pub struct GameStatePlugin;
impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameState>()
            .add_event::<ThrowResolved>()
            .add_event::<GameResetRequest>()
            .add_systems(
                FixedUpdate,
                (reset_game.in_set(TurnSet::Arbitrate), apply_resolved_throws.in_set(TurnSet::Sequence)),
            );
    }
}

fn apply_resolved_throws(mut ev_resolved: EventReader<ThrowResolved>, mut game: ResMut<GameState>) {
    for ev in ev_resolved.read() {
        let cmd = GameCommand::RecordThrow { pins_down: ev.pins_down, knocked: Some(ev.knocked) };
        match game.apply(cmd) {
            Ok(Some(roll)) => {
                info!(
                    "ROLL frame={} roll={} pins={} strike={} spare={} split={} total={}",
                    roll.frame, roll.roll, roll.pins, roll.strike, roll.spare, roll.split, game.total()
                );
                if roll.game_over {
                    info!("GAME over total={} strikes={} spares={}", game.total(), game.stats().strikes, game.stats().spares);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("ROLL rejected cause={:?}: {e}", ev.cause),
        }
    }
}

// Reset game on request (any phase); runs before the arbiter sees this tick's signals.
fn reset_game(mut ev_reset: EventReader<GameResetRequest>, mut game: ResMut<GameState>) {
    if ev_reset.read().last().is_none() {
        return;
    }
    let previous = game.total();
    game.reset();
    info!("GAME reset previous_total={}", previous);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strike_skips_to_next_frame_with_ghost() {
        let mut game = GameState::new();
        let roll = game.advance(10).unwrap();
        assert!(roll.strike);
        assert_eq!((game.current_frame(), game.current_roll()), (2, 1));
        assert_eq!(game.frames()[0].rolls, vec![RollRecord::Pins(10), RollRecord::Ghost]);
        assert!(game.frames()[0].is_complete);
    }

    #[test]
    fn open_first_ball_moves_to_second_roll() {
        let mut game = GameState::new();
        game.advance(6).unwrap();
        assert_eq!((game.current_frame(), game.current_roll()), (1, 2));
        assert_eq!(game.standing_pins(), 4);
    }

    #[test]
    fn second_ball_over_standing_is_rejected_and_state_unchanged() {
        let mut game = GameState::new();
        game.advance(6).unwrap();
        let before = game.clone();
        let err = game.advance(6).unwrap_err();
        assert_eq!(
            err,
            BowlingError::RuleViolation(Violation::PinsExceedStanding { frame: 1, roll: 2, pins: 6, standing: 4 })
        );
        assert_eq!(game, before);
        assert_eq!(game.frames()[0].rolls.len(), 1);
    }

    #[test]
    fn pin_count_above_ten_is_rejected() {
        let mut game = GameState::new();
        assert_eq!(
            game.advance(11),
            Err(BowlingError::RuleViolation(Violation::PinCountOutOfRange { pins: 11 }))
        );
    }

    #[test]
    fn spare_marks_frame() {
        let mut game = GameState::new();
        game.advance(0).unwrap();
        let roll = game.advance(10).unwrap();
        assert!(roll.spare && !roll.strike);
        assert!(game.frames()[0].is_spare);
        assert!(!game.frames()[0].is_strike);
    }

    #[test]
    fn tenth_frame_open_ends_after_two() {
        let mut game = GameState::new();
        for _ in 0..18 {
            game.advance(0).unwrap();
        }
        game.advance(3).unwrap();
        assert_eq!(game.current_roll(), 2);
        game.advance(4).unwrap();
        assert!(game.game_over());
        assert_eq!(game.advance(1), Err(Violation::GameAlreadyOver.into()));
    }

    #[test]
    fn tenth_frame_strike_gets_two_more_balls() {
        let mut game = GameState::new();
        for _ in 0..18 {
            game.advance(0).unwrap();
        }
        game.advance(10).unwrap();
        assert_eq!((game.current_roll(), game.standing_pins()), (2, 10));
        game.advance(3).unwrap();
        assert_eq!((game.current_roll(), game.standing_pins()), (3, 7));
        assert!(game.advance(8).is_err());
        game.advance(7).unwrap();
        assert!(game.game_over());
        assert_eq!(game.total(), 20);
    }

    #[test]
    fn tenth_frame_spare_rerack_for_third() {
        let mut game = GameState::new();
        for _ in 0..18 {
            game.advance(0).unwrap();
        }
        game.advance(6).unwrap();
        assert!(game.advance(5).is_err());
        game.advance(4).unwrap();
        assert_eq!(game.rack(), (10, true));
        game.advance(10).unwrap();
        assert!(game.game_over());
        assert!(!game.frames()[9].is_strike);
        assert!(game.frames()[9].is_spare);
        assert_eq!(game.stats().strikes, 1);
        assert_eq!(game.stats().spares, 1);
    }

    #[test]
    fn split_needs_pin_layout() {
        let mut game = GameState::new();
        // Everything but the 7 and 10 pins.
        let knocked = PinSet::from_indices(&[0, 1, 2, 3, 4, 5, 7, 8]).unwrap();
        let roll = game.record_throw(8, Some(knocked)).unwrap();
        assert!(roll.split);
        assert!(game.frames()[0].is_split);
        assert_eq!(game.stats().splits, 1);

        let mut game = GameState::new();
        assert!(!game.advance(8).unwrap().split);
    }

    #[test]
    fn advanced_leaves_original_untouched() {
        let game = GameState::new();
        let next = game.advanced(7).unwrap();
        assert_eq!(game.current_roll(), 1);
        assert_eq!(next.current_roll(), 2);
    }

    #[test]
    fn reset_command_reinitialises() {
        let mut game = GameState::new();
        game.advance(10).unwrap();
        game.apply(GameCommand::Reset).unwrap();
        assert_eq!(game, GameState::new());
    }

    #[test]
    fn reset_clears_a_game_in_progress() {
        let mut game = GameState::new();
        game.advance(7).unwrap();
        game.advance(3).unwrap();
        game.advance(10).unwrap();
        game.reset();
        assert_eq!(game, GameState::new());
        assert_eq!(game.standing_pins(), 10);
    }

    #[test]
    fn highest_and_average_use_resolved_frames_only() {
        let mut game = GameState::new();
        for pins in [10, 3, 4] {
            game.advance(pins).unwrap();
        }
        assert_eq!(game.stats().highest_frame, 17);
        assert!((game.stats().average_frame - 12.0).abs() < 1e-6);

        // A strike still waiting on its bonus balls changes neither.
        game.advance(10).unwrap();
        assert!(game.frames()[2].score.is_pending());
        assert_eq!(game.stats().highest_frame, 17);
        assert!((game.stats().average_frame - 12.0).abs() < 1e-6);
        assert_eq!(game.snapshot().stats, *game.stats());
    }

    #[test]
    fn stats_start_empty() {
        let game = GameState::new();
        assert_eq!(game.stats().highest_frame, 0);
        assert_eq!(game.stats().average_frame, 0.0);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut game = GameState::new();
        game.advance(4).unwrap();
        game.advance(5).unwrap();
        let snap = game.snapshot();
        assert_eq!((snap.frame_number, snap.roll_number), (2, 1));
        assert_eq!(snap.cumulative_total, 9);
        assert_eq!(snap.frames.len(), FRAME_COUNT);
        assert!(!snap.game_over);
    }
}
