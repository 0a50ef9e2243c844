// Throw outcome arbitration: turns racing ball signals into exactly one
// "throw finished" hand-off per throw.
//
// Idle -> Charging -> InFlight -> Resolving -> Idle
//
// Each ball signal may start a grace timer. The first timer to elapse wins and
// every other pending timer is dropped with it. A game reset drops them all
// without handing anything to the sequencer.

use std::time::Duration;

use bevy::prelude::*;

use crate::error::{BowlingError, BowlingResult, Violation};
use crate::plugins::core_sim::{SimState, TurnSet};
use crate::plugins::pin_tracker::{PinFallTracker, PinSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ArbiterPhase {
    #[default]
    Idle,
    Charging,
    InFlight,
    Resolving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrowSignalKind {
    /// Speed dropped under the stop threshold after release.
    BallStopped,
    /// Ball fell below the lane plane.
    BallLost,
    /// Ball crossed the far boundary into the pit.
    BallReachedPit,
}

/// Physics side: one boundary/stop observation, stamped with sim time.
#[derive(Event, Debug, Clone, Copy)]
pub struct ThrowSignal {
    pub kind: ThrowSignalKind,
    pub at: f32,
}

/// Presentation side: launch the ball along `direction` (unit, lane plane) with `power` in 0..=1.
#[derive(Event, Debug, Clone, Copy)]
pub struct ThrowRequest {
    pub direction: Vec3,
    pub power: f32,
}

/// Sent to the physics side after every resolved throw and on game reset.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct BallResetRequest;

#[derive(Event, Debug, Clone, Copy, Default)]
pub struct GameResetRequest;

/// Final outcome of one throw, handed to the sequencer.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrowResolved {
    pub pins_down: u8,
    pub knocked: PinSet,
    pub cause: ThrowSignalKind,
}

/// Grace delays in seconds.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct ArbiterConfig {
    pub lost_grace: f32,
    pub pit_grace: f32,
    pub settle_with_pins: f32,
    pub settle_empty: f32,
}
impl Default for ArbiterConfig {
    fn default() -> Self {
        Self { lost_grace: 1.0, pit_grace: 5.0, settle_with_pins: 2.0, settle_empty: 0.25 }
    }
}

#[derive(Debug)]
struct GraceTimer {
    cause: ThrowSignalKind,
    timer: Timer,
}

#[derive(Resource, Debug, Default)]
pub struct ThrowArbiter {
    phase: ArbiterPhase,
    // At most one per signal kind, in start order.
    timers: Vec<GraceTimer>,
    throws: u64,
}

impl ThrowArbiter {
    pub fn phase(&self) -> ArbiterPhase {
        self.phase
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Throws released since the arbiter was created.
    pub fn throws(&self) -> u64 {
        self.throws
    }

    pub fn is_idle(&self) -> bool {
        self.phase == ArbiterPhase::Idle
    }

    pub fn begin_charge(&mut self) -> BowlingResult<()> {
        self.transition(ArbiterPhase::Idle, ArbiterPhase::Charging, "begin charging")
    }

    pub fn cancel_charge(&mut self) -> BowlingResult<()> {
        self.transition(ArbiterPhase::Charging, ArbiterPhase::Idle, "cancel charging")
    }

    pub fn release(&mut self) -> BowlingResult<()> {
        self.transition(ArbiterPhase::Charging, ArbiterPhase::InFlight, "release")?;
        self.throws += 1;
        Ok(())
    }

    fn transition(&mut self, from: ArbiterPhase, to: ArbiterPhase, action: &'static str) -> BowlingResult<()> {
        if self.phase != from {
            return Err(Violation::OutOfPhase { phase: self.phase, action }.into());
        }
        self.phase = to;
        Ok(())
    }

    fn has(&self, cause: ThrowSignalKind) -> bool {
        self.timers.iter().any(|t| t.cause == cause)
    }

    fn start(&mut self, cause: ThrowSignalKind, secs: f32) {
        self.timers.push(GraceTimer { cause, timer: Timer::from_seconds(secs.max(0.0), TimerMode::Once) });
        self.phase = ArbiterPhase::Resolving;
    }

    /// Feeds one ball signal. Returns true if it started a grace timer.
    ///
    /// Lost and pit signals follow whichever of the two arrived first; a stop
    /// cancels a pending pit timer and waits its own settle delay, longer when
    /// pins are already down to let chain reactions finish.
    pub fn on_signal(&mut self, kind: ThrowSignalKind, pins_down: u8, cfg: &ArbiterConfig) -> bool {
        use ThrowSignalKind::*;
        if !matches!(self.phase, ArbiterPhase::InFlight | ArbiterPhase::Resolving) {
            debug!("ARBITER stale signal kind={:?} phase={:?}", kind, self.phase);
            return false;
        }
        match kind {
            BallLost => {
                if self.has(BallLost) || self.has(BallReachedPit) {
                    return false;
                }
                self.start(BallLost, cfg.lost_grace);
            }
            BallReachedPit => {
                if self.has(BallLost) || self.has(BallReachedPit) || self.has(BallStopped) {
                    return false;
                }
                self.start(BallReachedPit, cfg.pit_grace);
            }
            BallStopped => {
                if self.has(BallStopped) {
                    return false;
                }
                self.timers.retain(|t| t.cause != BallReachedPit);
                let settle = if pins_down > 0 { cfg.settle_with_pins } else { cfg.settle_empty };
                self.start(BallStopped, settle);
            }
        }
        true
    }

    /// Advances pending grace timers by `delta`. When one elapses, the throw is
    /// completed: the tracker's pins are handed off and the tracker is reset.
    pub fn tick(&mut self, delta: Duration, tracker: &mut PinFallTracker) -> BowlingResult<Option<ThrowResolved>> {
        let winner = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.timer.remaining() <= delta)
            .min_by_key(|(i, t)| (t.timer.remaining(), *i))
            .map(|(_, t)| t.cause);

        match winner {
            Some(cause) => self.complete(cause, tracker).map(Some),
            None => {
                for t in self.timers.iter_mut() {
                    t.timer.tick(delta);
                }
                Ok(None)
            }
        }
    }

    fn complete(&mut self, cause: ThrowSignalKind, tracker: &mut PinFallTracker) -> BowlingResult<ThrowResolved> {
        if self.phase != ArbiterPhase::Resolving {
            return Err(BowlingError::DoubleResolution { cause });
        }
        self.timers.clear();
        self.phase = ArbiterPhase::Idle;
        let resolved = ThrowResolved { pins_down: tracker.count(), knocked: tracker.knocked(), cause };
        tracker.reset();
        Ok(resolved)
    }

    /// Drops every pending timer and the per-throw pins, back to Idle.
    /// Returns how many timers were cancelled.
    pub fn reset(&mut self, tracker: &mut PinFallTracker) -> usize {
        let cancelled = self.timers.len();
        self.timers.clear();
        self.phase = ArbiterPhase::Idle;
        tracker.reset();
        cancelled
    }
}

pub struct ArbiterPlugin;
impl Plugin for ArbiterPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ThrowArbiter>()
            .init_resource::<ArbiterConfig>()
            .init_resource::<PinFallTracker>()
            .add_event::<ThrowSignal>()
            .add_event::<ThrowRequest>()
            .add_event::<ThrowResolved>()
            .add_event::<BallResetRequest>()
            .add_event::<GameResetRequest>()
            .add_systems(
                FixedUpdate,
                (handle_game_reset, feed_throw_signals, tick_arbiter)
                    .chain()
                    .in_set(TurnSet::Arbitrate),
            );
    }
}

fn handle_game_reset(
    mut ev_reset: EventReader<GameResetRequest>,
    mut arbiter: ResMut<ThrowArbiter>,
    mut tracker: ResMut<PinFallTracker>,
    mut ev_ball: EventWriter<BallResetRequest>,
) {
    if ev_reset.read().last().is_none() {
        return;
    }
    let cancelled = arbiter.reset(&mut tracker);
    info!("ARBITER reset cancelled_timers={}", cancelled);
    ev_ball.send(BallResetRequest);
}

fn feed_throw_signals(
    mut ev_signal: EventReader<ThrowSignal>,
    mut arbiter: ResMut<ThrowArbiter>,
    tracker: Res<PinFallTracker>,
    cfg: Res<ArbiterConfig>,
) {
    let mut signals: Vec<ThrowSignal> = ev_signal.read().copied().collect();
    signals.sort_by(|a, b| a.at.total_cmp(&b.at));
    for s in signals {
        if arbiter.on_signal(s.kind, tracker.count(), &cfg) {
            info!("ARBITER signal kind={:?} at={:.2} pins={}", s.kind, s.at, tracker.count());
        }
    }
}

fn tick_arbiter(
    mut arbiter: ResMut<ThrowArbiter>,
    mut tracker: ResMut<PinFallTracker>,
    sim: Res<SimState>,
    mut ev_resolved: EventWriter<ThrowResolved>,
    mut ev_ball: EventWriter<BallResetRequest>,
) {
    let delta = Duration::from_secs_f32(SimState::TICK_SECONDS);
    match arbiter.tick(delta, &mut tracker) {
        Ok(Some(resolved)) => {
            info!(
                "ARBITER resolve cause={:?} pins={} t={:.2}",
                resolved.cause, resolved.pins_down, sim.elapsed_seconds
            );
            ev_resolved.send(resolved);
            ev_ball.send(BallResetRequest);
        }
        Ok(None) => {}
        Err(e) => error!("ARBITER {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ThrowSignalKind::*;

    const STEP: Duration = Duration::from_millis(10);

    fn in_flight() -> ThrowArbiter {
        let mut arbiter = ThrowArbiter::default();
        arbiter.begin_charge().unwrap();
        arbiter.release().unwrap();
        arbiter
    }

    /// Ticks in 10 ms steps; returns the resolution and the step it happened on.
    fn run(arbiter: &mut ThrowArbiter, tracker: &mut PinFallTracker, max_steps: u32) -> Option<(ThrowResolved, u32)> {
        for step in 1..=max_steps {
            if let Some(r) = arbiter.tick(STEP, tracker).unwrap() {
                return Some((r, step));
            }
        }
        None
    }

    #[test]
    fn phases_reject_out_of_order_actions() {
        let mut arbiter = ThrowArbiter::default();
        assert!(arbiter.release().is_err());
        arbiter.begin_charge().unwrap();
        assert!(arbiter.begin_charge().is_err());
        arbiter.cancel_charge().unwrap();
        assert!(arbiter.is_idle());
        assert_eq!(arbiter.throws(), 0);
    }

    #[test]
    fn lost_ball_resolves_after_grace_with_current_pins() {
        let cfg = ArbiterConfig::default();
        let mut tracker = PinFallTracker::default();
        let mut arbiter = in_flight();
        tracker.report_pin_fall(2).unwrap();
        assert!(arbiter.on_signal(BallLost, tracker.count(), &cfg));
        assert_eq!(arbiter.phase(), ArbiterPhase::Resolving);

        let (resolved, step) = run(&mut arbiter, &mut tracker, 500).unwrap();
        assert_eq!(resolved.cause, BallLost);
        assert_eq!(resolved.pins_down, 1);
        assert!((99..=101).contains(&step), "step={step}");
        assert_eq!(tracker.count(), 0);
        assert!(arbiter.is_idle());
        assert_eq!(arbiter.pending_timers(), 0);
    }

    #[test]
    fn stop_with_pins_down_waits_settle_even_after_pit_cancelled() {
        let cfg = ArbiterConfig::default();
        let mut tracker = PinFallTracker::default();
        let mut arbiter = in_flight();
        assert!(arbiter.on_signal(BallReachedPit, 0, &cfg));
        assert!(run(&mut arbiter, &mut tracker, 50).is_none());
        tracker.report_pin_fall(0).unwrap();
        tracker.report_pin_fall(4).unwrap();
        assert!(arbiter.on_signal(BallStopped, tracker.count(), &cfg));
        assert_eq!(arbiter.pending_timers(), 1);

        assert!(run(&mut arbiter, &mut tracker, 190).is_none());
        // A late fall during the settle window still counts.
        tracker.report_pin_fall(8).unwrap();
        let (resolved, _) = run(&mut arbiter, &mut tracker, 20).unwrap();
        assert_eq!(resolved.cause, BallStopped);
        assert_eq!(resolved.pins_down, 3);
    }

    #[test]
    fn stop_without_pins_resolves_almost_immediately() {
        let cfg = ArbiterConfig::default();
        let mut tracker = PinFallTracker::default();
        let mut arbiter = in_flight();
        arbiter.on_signal(BallStopped, 0, &cfg);
        let (resolved, step) = run(&mut arbiter, &mut tracker, 500).unwrap();
        assert_eq!(resolved.pins_down, 0);
        assert!(step <= 26, "step={step}");
    }

    #[test]
    fn first_of_lost_and_pit_governs() {
        let cfg = ArbiterConfig::default();
        let mut tracker = PinFallTracker::default();
        let mut arbiter = in_flight();
        assert!(arbiter.on_signal(BallReachedPit, 0, &cfg));
        assert!(!arbiter.on_signal(BallLost, 0, &cfg));
        assert!(run(&mut arbiter, &mut tracker, 400).is_none());
        let (resolved, _) = run(&mut arbiter, &mut tracker, 200).unwrap();
        assert_eq!(resolved.cause, BallReachedPit);
    }

    #[test]
    fn earliest_elapsing_timer_wins_and_cancels_rest() {
        let cfg = ArbiterConfig::default();
        let mut tracker = PinFallTracker::default();
        let mut arbiter = in_flight();
        tracker.report_pin_fall(1).unwrap();
        arbiter.on_signal(BallStopped, tracker.count(), &cfg);
        arbiter.on_signal(BallLost, tracker.count(), &cfg);
        assert_eq!(arbiter.pending_timers(), 2);
        let (resolved, _) = run(&mut arbiter, &mut tracker, 500).unwrap();
        assert_eq!(resolved.cause, BallLost);
        assert_eq!(arbiter.pending_timers(), 0);
        assert!(run(&mut arbiter, &mut tracker, 500).is_none());
    }

    #[test]
    fn reset_cancels_pending_timers() {
        let cfg = ArbiterConfig::default();
        let mut tracker = PinFallTracker::default();
        let mut arbiter = in_flight();
        tracker.report_pin_fall(5).unwrap();
        arbiter.on_signal(BallReachedPit, tracker.count(), &cfg);
        arbiter.on_signal(BallStopped, tracker.count(), &cfg);
        assert_eq!(arbiter.reset(&mut tracker), 1);
        assert!(arbiter.is_idle());
        assert_eq!(tracker.count(), 0);
        assert!(run(&mut arbiter, &mut tracker, 1000).is_none());
    }

    #[test]
    fn signals_outside_a_throw_are_ignored() {
        let cfg = ArbiterConfig::default();
        let mut arbiter = ThrowArbiter::default();
        assert!(!arbiter.on_signal(BallStopped, 0, &cfg));
        arbiter.begin_charge().unwrap();
        assert!(!arbiter.on_signal(BallLost, 0, &cfg));
        assert_eq!(arbiter.pending_timers(), 0);
    }

    #[test]
    fn completing_twice_is_refused() {
        let cfg = ArbiterConfig::default();
        let mut tracker = PinFallTracker::default();
        let mut arbiter = in_flight();
        arbiter.on_signal(BallStopped, 0, &cfg);
        assert!(arbiter.complete(BallStopped, &mut tracker).is_ok());
        assert_eq!(
            arbiter.complete(BallStopped, &mut tracker),
            Err(BowlingError::DoubleResolution { cause: BallStopped })
        );
    }
}
