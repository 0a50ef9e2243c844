// Pin fall tracking: which of the ten pins went down during the current throw.
use bevy::prelude::*;

use crate::error::{BowlingError, BowlingResult};
use crate::plugins::core_sim::TurnSet;

pub const PIN_COUNT: usize = 10;

/// Rack adjacency used for split detection. Indices are 0-based (pin 1 = 0).
/// Diagonal neighbours front/back plus the pins directly behind ("sleepers").
const RACK_LINKS: [(usize, usize); 15] = [
    (0, 1), (0, 2),
    (1, 3), (1, 4), (2, 4), (2, 5),
    (3, 6), (3, 7), (4, 7), (4, 8), (5, 8), (5, 9),
    (0, 4), (1, 7), (2, 8),
];

/// Set of pin indices 0..=9 packed into the low ten bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PinSet(u16);

impl PinSet {
    pub const EMPTY: PinSet = PinSet(0);
    pub const FULL_RACK: PinSet = PinSet((1 << PIN_COUNT) - 1);

    pub fn from_indices(indices: &[usize]) -> BowlingResult<Self> {
        let mut set = PinSet::EMPTY;
        for &i in indices {
            set.insert(i)?;
        }
        Ok(set)
    }

    /// Returns `Ok(true)` if the pin was not already in the set.
    pub fn insert(&mut self, index: usize) -> BowlingResult<bool> {
        if index >= PIN_COUNT {
            return Err(BowlingError::InvalidPinIndex { index });
        }
        let bit = 1u16 << index;
        let fresh = self.0 & bit == 0;
        self.0 |= bit;
        Ok(fresh)
    }

    pub fn contains(&self, index: usize) -> bool {
        index < PIN_COUNT && self.0 & (1 << index) != 0
    }

    pub fn count(&self) -> u8 {
        self.0.count_ones() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Pins of the full rack not in this set.
    pub fn complement(&self) -> PinSet {
        PinSet(!self.0 & Self::FULL_RACK.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..PIN_COUNT).filter(move |&i| self.contains(i))
    }
}

/// True if `standing` (what is left after a first ball at a full rack) is a split:
/// headpin down, at least two pins left, and those pins fall into more than one group.
pub fn is_split(standing: PinSet) -> bool {
    if standing.contains(0) || standing.count() < 2 {
        return false;
    }
    // Flood fill from the lowest standing pin.
    let Some(start) = standing.iter().next() else { return false; };
    let mut reached = PinSet::EMPTY;
    let mut stack = vec![start];
    while let Some(pin) = stack.pop() {
        if reached.contains(pin) {
            continue;
        }
        let _ = reached.insert(pin);
        for &(a, b) in RACK_LINKS.iter() {
            let next = if a == pin { b } else if b == pin { a } else { continue };
            if standing.contains(next) && !reached.contains(next) {
                stack.push(next);
            }
        }
    }
    reached != standing
}

/// Per-throw accumulator of downed pins. Reset exactly once per throw boundary
/// (by the arbiter on resolution, or by a game reset).
#[derive(Resource, Debug, Default)]
pub struct PinFallTracker {
    down: PinSet,
}

impl PinFallTracker {
    /// Idempotent: a pin already reported this throw is a no-op (`Ok(false)`).
    pub fn report_pin_fall(&mut self, index: usize) -> BowlingResult<bool> {
        self.down.insert(index)
    }

    pub fn count(&self) -> u8 {
        self.down.count()
    }

    pub fn knocked(&self) -> PinSet {
        self.down
    }

    pub fn reset(&mut self) {
        self.down = PinSet::EMPTY;
    }
}

/// Physics side: a pin tilted past the fall threshold.
#[derive(Event, Debug, Clone, Copy)]
pub struct PinTiltEvent {
    pub index: usize,
}

pub struct PinTrackerPlugin;
impl Plugin for PinTrackerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PinFallTracker>()
            .add_event::<PinTiltEvent>()
            .add_systems(FixedUpdate, record_pin_falls.in_set(TurnSet::Track));
    }
}

fn record_pin_falls(mut ev_tilt: EventReader<PinTiltEvent>, mut tracker: ResMut<PinFallTracker>) {
    for ev in ev_tilt.read() {
        match tracker.report_pin_fall(ev.index) {
            Ok(true) => debug!("PIN down index={} total={}", ev.index, tracker.count()),
            Ok(false) => {}
            Err(e) => error!("PIN report rejected: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_reports_count_once() {
        let mut tracker = PinFallTracker::default();
        assert_eq!(tracker.report_pin_fall(3), Ok(true));
        assert_eq!(tracker.report_pin_fall(3), Ok(false));
        assert_eq!(tracker.report_pin_fall(7), Ok(true));
        assert_eq!(tracker.count(), 2);
        tracker.reset();
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut tracker = PinFallTracker::default();
        assert_eq!(
            tracker.report_pin_fall(10),
            Err(BowlingError::InvalidPinIndex { index: 10 })
        );
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn classic_splits() {
        // 7-10
        assert!(is_split(PinSet::from_indices(&[6, 9]).unwrap()));
        // 4-5 (pin 2 down in front of both)
        assert!(is_split(PinSet::from_indices(&[3, 4]).unwrap()));
        // 6-7-10
        assert!(is_split(PinSet::from_indices(&[5, 6, 9]).unwrap()));
    }

    #[test]
    fn connected_leaves_are_not_splits() {
        // 2-8 sleeper
        assert!(!is_split(PinSet::from_indices(&[1, 7]).unwrap()));
        // 4-7
        assert!(!is_split(PinSet::from_indices(&[3, 6]).unwrap()));
        // single pin
        assert!(!is_split(PinSet::from_indices(&[9]).unwrap()));
        // headpin standing (washout, not a split)
        assert!(!is_split(PinSet::from_indices(&[0, 6, 9]).unwrap()));
    }

    #[test]
    fn complement_of_knocked_is_standing() {
        let knocked = PinSet::from_indices(&[0, 1, 2, 3, 4, 5, 7, 8]).unwrap();
        let standing = knocked.complement();
        assert_eq!(standing.iter().collect::<Vec<_>>(), vec![6, 9]);
    }
}
