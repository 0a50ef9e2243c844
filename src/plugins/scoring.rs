// Score calculation: pure projection from recorded frames to per-frame and running scores.
//
// Recomputed from scratch after every roll; at most 21 rolls so there is nothing to cache.

use crate::plugins::game_state::{Frame, FRAME_COUNT, PINS_PER_RACK};

/// A score that may still be waiting on rolls not yet thrown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FrameScore {
    #[default]
    Pending,
    Scored(u16),
}

impl FrameScore {
    pub fn value(self) -> Option<u16> {
        match self {
            FrameScore::Pending => None,
            FrameScore::Scored(v) => Some(v),
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, FrameScore::Pending)
    }

    fn from_option(v: Option<u16>) -> Self {
        v.map_or(FrameScore::Pending, FrameScore::Scored)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameTally {
    pub score: FrameScore,
    pub cumulative: FrameScore,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScoreCard {
    pub frames: Vec<FrameTally>,
    /// Running total through the last frame whose cumulative is known.
    pub total: u16,
}

/// Scores every frame against the flat sequence of thrown (non-ghost) rolls.
///
/// Strike and spare bonuses look ahead in throw order, crossing frame
/// boundaries, and stay `Pending` until the needed rolls exist. The tenth
/// frame never looks past itself: it scores the sum of its rolls once it has
/// all of them. A pending frame makes every later cumulative pending too.
pub fn calculate_scores(frames: &[Frame]) -> ScoreCard {
    let rolls: Vec<u8> = frames.iter().flat_map(|f| f.pins()).collect();
    let mut card = ScoreCard { frames: Vec::with_capacity(frames.len()), total: 0 };
    let mut start = 0usize;
    let mut running = Some(0u16);

    for (i, frame) in frames.iter().enumerate() {
        let own: Vec<u8> = frame.pins().collect();
        let score = if i + 1 == FRAME_COUNT {
            tenth_frame_score(&own)
        } else if own.first() == Some(&PINS_PER_RACK) {
            bonus(&rolls, start + 1, 2).map(|b| 10 + b)
        } else if own.len() >= 2 && own[0] + own[1] == PINS_PER_RACK {
            bonus(&rolls, start + 2, 1).map(|b| 10 + b)
        } else if own.len() >= 2 {
            Some(u16::from(own[0]) + u16::from(own[1]))
        } else {
            None
        };
        start += own.len();

        running = match (running, score) {
            (Some(r), Some(s)) => Some(r + s),
            _ => None,
        };
        if let Some(r) = running {
            card.total = r;
        }
        card.frames.push(FrameTally {
            score: FrameScore::from_option(score),
            cumulative: FrameScore::from_option(running),
        });
    }
    card
}

/// Sum of `count` rolls starting at `from`, if all of them have been thrown.
fn bonus(rolls: &[u8], from: usize, count: usize) -> Option<u16> {
    let window = rolls.get(from..from + count)?;
    Some(window.iter().map(|&r| u16::from(r)).sum())
}

fn tenth_frame_score(own: &[u8]) -> Option<u16> {
    let done = match own {
        [_, _, _] => true,
        [a, b] => a + b < PINS_PER_RACK,
        _ => false,
    };
    done.then(|| own.iter().map(|&r| u16::from(r)).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::game_state::GameState;

    fn play(rolls: &[u8]) -> GameState {
        let mut game = GameState::new();
        for &r in rolls {
            game.advance(r).expect("legal roll");
        }
        game
    }

    #[test]
    fn perfect_game_is_300() {
        let game = play(&[10; 12]);
        assert!(game.game_over());
        assert_eq!(game.total(), 300);
        assert!(game.frames().iter().all(|f| f.is_strike));
    }

    #[test]
    fn gutter_game_is_zero() {
        let game = play(&[0; 20]);
        assert!(game.game_over());
        assert_eq!(game.total(), 0);
        assert_eq!(game.stats().gutter_balls, 20);
    }

    #[test]
    fn spare_takes_next_roll() {
        let game = play(&[5, 5, 5]);
        assert_eq!(game.frames()[0].score, FrameScore::Scored(15));
        assert_eq!(game.frames()[0].cumulative, FrameScore::Scored(15));
        assert!(game.frames()[1].score.is_pending());
    }

    #[test]
    fn spare_waits_for_next_roll() {
        let game = play(&[5, 5]);
        assert!(game.frames()[0].score.is_pending());
        assert_eq!(game.total(), 0);
    }

    #[test]
    fn strike_in_ninth_reads_into_tenth() {
        let mut rolls = vec![0; 16];
        rolls.extend_from_slice(&[10, 3, 4]);
        let game = play(&rolls);
        assert!(game.game_over());
        assert_eq!(game.frames()[8].score, FrameScore::Scored(17));
        assert_eq!(game.frames()[9].score, FrameScore::Scored(7));
        assert_eq!(game.total(), 24);
    }

    #[test]
    fn consecutive_strikes_stay_pending_until_two_rolls_follow() {
        let game = play(&[10, 10]);
        assert!(game.frames()[0].score.is_pending());
        assert!(game.frames()[1].score.is_pending());

        let game = play(&[10, 10, 4]);
        assert_eq!(game.frames()[0].score, FrameScore::Scored(24));
        assert!(game.frames()[1].score.is_pending());
        assert_eq!(game.total(), 24);
    }

    #[test]
    fn pending_frame_blocks_later_cumulatives() {
        // Frame 1 strike pending on one roll, frame 2 open so far.
        let game = play(&[10, 3]);
        let card = calculate_scores(game.frames());
        assert!(card.frames[0].cumulative.is_pending());
        assert!(card.frames[1].cumulative.is_pending());
        assert_eq!(card.total, 0);
    }

    #[test]
    fn tenth_frame_sums_own_rolls() {
        let mut rolls = vec![0; 18];
        rolls.extend_from_slice(&[10, 10, 10]);
        assert_eq!(play(&rolls).frames()[9].score, FrameScore::Scored(30));

        let mut rolls = vec![0; 18];
        rolls.extend_from_slice(&[7, 3, 5]);
        assert_eq!(play(&rolls).frames()[9].score, FrameScore::Scored(15));

        let mut rolls = vec![0; 18];
        rolls.extend_from_slice(&[10, 4]);
        assert!(play(&rolls).frames()[9].score.is_pending());
    }

    #[test]
    fn recomputing_is_idempotent() {
        let game = play(&[10, 7, 3, 9, 0, 10, 0, 8, 8, 2]);
        let first = calculate_scores(game.frames());
        let second = calculate_scores(game.frames());
        assert_eq!(first, second);
    }
}
