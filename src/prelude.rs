//! Convenience re-exports for frequently used types & plugins.
pub use crate::error::{BowlingError, BowlingResult, Violation};
pub use crate::plugins::core_sim::{SimState, AutoConfig, TurnSet, CoreSimPlugin};
pub use crate::plugins::pin_tracker::{PinSet, PinFallTracker, PinTiltEvent, PinTrackerPlugin, is_split};
pub use crate::plugins::arbiter::{
    ArbiterConfig, ArbiterPhase, ArbiterPlugin, BallResetRequest, GameResetRequest, ThrowArbiter,
    ThrowRequest, ThrowResolved, ThrowSignal, ThrowSignalKind,
};
pub use crate::plugins::game_state::{
    Frame, GameCommand, GameState, GameStatePlugin, GameStats, RollOutcome, RollRecord, ScoreboardSnapshot,
};
pub use crate::plugins::scoring::{calculate_scores, FrameScore, ScoreCard};
pub use crate::plugins::level::{LevelPlugin, LaneDef};
pub use crate::plugins::ball::{Ball, BallKinematic, BallPlugin};
pub use crate::plugins::pins::{Pin, PinsPlugin};
pub use crate::plugins::throwing::{ThrowCharge, ThrowConfig, ThrowingPlugin};
pub use crate::plugins::hud::{HudPlugin, Hud, format_scoreboard};
pub use crate::plugins::autoplay::AutoplayPlugin;
