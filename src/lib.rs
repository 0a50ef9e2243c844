//! Library entry for integration tests & external tooling.
//! Exposes plugin modules and a prelude for common types.

pub mod plugins {
    pub mod core_sim;
    pub mod pin_tracker;
    pub mod arbiter;
    pub mod game_state;
    pub mod scoring;
    pub mod level;
    pub mod ball;
    pub mod pins;
    pub mod throwing;
    pub mod autoplay;
    pub mod hud;
}
pub mod error;
pub mod prelude;
