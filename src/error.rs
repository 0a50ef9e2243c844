//! Error types for the turn pipeline.
//!
//! Rule violations are synchronous rejections: the caller gets the error and
//! the game state is left exactly as it was. The other two variants signal a
//! broken contract with the physics side and are logged where they surface.

use std::fmt;

use crate::plugins::arbiter::{ArbiterPhase, ThrowSignalKind};

/// A throw or transition the rules of the game do not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// More pins reported than were standing for this roll.
    PinsExceedStanding {
        frame: u8,
        roll: u8,
        pins: u8,
        standing: u8,
    },
    /// A pin count outside 0..=10.
    PinCountOutOfRange { pins: u8 },
    /// A throw recorded after the tenth frame finished.
    GameAlreadyOver,
    /// An arbiter action requested from a phase that does not accept it.
    OutOfPhase {
        phase: ArbiterPhase,
        action: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BowlingError {
    RuleViolation(Violation),
    /// Pin index outside 0..=9. Always a bug in the reporting side.
    InvalidPinIndex { index: usize },
    /// The arbiter was asked to complete a throw that is not resolving.
    DoubleResolution { cause: ThrowSignalKind },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::PinsExceedStanding {
                frame,
                roll,
                pins,
                standing,
            } => write!(
                f,
                "frame {} roll {}: {} pins reported but only {} standing",
                frame, roll, pins, standing
            ),
            Violation::PinCountOutOfRange { pins } => {
                write!(f, "pin count {} is outside 0..=10", pins)
            }
            Violation::GameAlreadyOver => write!(f, "game is over, no more throws"),
            Violation::OutOfPhase { phase, action } => {
                write!(f, "cannot {} while arbiter is {:?}", action, phase)
            }
        }
    }
}

impl fmt::Display for BowlingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BowlingError::RuleViolation(v) => write!(f, "rule violation: {}", v),
            BowlingError::InvalidPinIndex { index } => {
                write!(f, "pin index {} is outside 0..=9", index)
            }
            BowlingError::DoubleResolution { cause } => write!(
                f,
                "throw already resolved; {:?} tried to resolve it again",
                cause
            ),
        }
    }
}

impl std::error::Error for BowlingError {}

impl From<Violation> for BowlingError {
    fn from(v: Violation) -> Self {
        BowlingError::RuleViolation(v)
    }
}

pub type BowlingResult<T> = Result<T, BowlingError>;
