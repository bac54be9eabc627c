//! [`Interlock`] – the proximity safety state machine.
//!
//! A small gate the command path must pass through, consulted in two ways:
//!
//! - **Reactively**, on every forward-range reading: inside the cutoff while
//!   the robot is actively steering forward, the interlock demands a coast.
//! - **Proactively**, on every requested `forward` steer: while the last
//!   reading was inside the cutoff the request is substituted with `coast`.
//!
//! All comparisons use strict `<` / `>=` — a reading exactly at the cutoff
//! counts as *not* too close.

use roverlink_types::{ProximityZone, SteerMode};

/// Proximity cutoff in centimeters. Readings arrive in meters and are scaled
/// ×100 before comparison, so cutoff and reading share one unit.
pub const DEFAULT_PROXIMITY_CUTOFF_CM: f64 = 10.0;

/// What the interlock demands after observing a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterlockAction {
    /// The robot is steering forward inside the cutoff: issue a coast
    /// command and a warning.
    ForceCoast,
}

/// Tracks the proximity zone of the latest forward-range reading.
#[derive(Debug, Clone)]
pub struct Interlock {
    cutoff_cm: f64,
    zone: ProximityZone,
}

impl Interlock {
    pub fn new(cutoff_cm: f64) -> Self {
        Interlock {
            cutoff_cm,
            zone: ProximityZone::Clear,
        }
    }

    /// Current zone classification.
    pub fn zone(&self) -> ProximityZone {
        self.zone
    }

    /// Whether forward motion is currently vetoed.
    pub fn too_close(&self) -> bool {
        self.zone == ProximityZone::TooClose
    }

    /// The warning issued alongside every veto or forced coast.
    pub fn warning_text(&self) -> String {
        format!(
            "Cannot move forward.  Forward range < {:.3} cm.",
            self.cutoff_cm
        )
    }

    /// Classify a reading and decide whether the active steer mode must be
    /// overridden.
    ///
    /// The forced coast is edge-triggered on the *active* mode: it fires
    /// only while the robot is believed to be steering forward, not on
    /// every too-close reading.
    pub fn observe(&mut self, distance_cm: f64, active_steer: SteerMode) -> Option<InterlockAction> {
        if distance_cm < self.cutoff_cm {
            self.zone = ProximityZone::TooClose;
            if active_steer == SteerMode::Forward {
                return Some(InterlockAction::ForceCoast);
            }
        } else if distance_cm < 2.0 * self.cutoff_cm {
            // Close enough to show a warning, not close enough to veto.
            self.zone = ProximityZone::Warning;
        } else {
            self.zone = ProximityZone::Clear;
        }
        None
    }

    /// Substitute a vetoed `forward` request with `coast`. Returns the mode
    /// to actually issue and whether the veto fired.
    pub fn vet_steer(&self, requested: SteerMode) -> (SteerMode, bool) {
        if requested == SteerMode::Forward && self.too_close() {
            (SteerMode::Coast, true)
        } else {
            (requested, false)
        }
    }
}

impl Default for Interlock {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_CUTOFF_CM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_inside_cutoff_while_forward_forces_coast() {
        let mut interlock = Interlock::default();
        let action = interlock.observe(DEFAULT_PROXIMITY_CUTOFF_CM - 1.0, SteerMode::Forward);
        assert_eq!(action, Some(InterlockAction::ForceCoast));
        assert!(interlock.too_close());
    }

    #[test]
    fn reading_inside_cutoff_while_coasting_only_flags() {
        let mut interlock = Interlock::default();
        let action = interlock.observe(DEFAULT_PROXIMITY_CUTOFF_CM - 1.0, SteerMode::Coast);
        assert_eq!(action, None);
        assert!(interlock.too_close());
    }

    #[test]
    fn exactly_at_cutoff_is_not_too_close() {
        let mut interlock = Interlock::default();
        let action = interlock.observe(DEFAULT_PROXIMITY_CUTOFF_CM, SteerMode::Forward);
        assert_eq!(action, None);
        assert_eq!(interlock.zone(), ProximityZone::Warning);
    }

    #[test]
    fn warning_zone_between_one_and_two_cutoffs() {
        let mut interlock = Interlock::default();
        interlock.observe(1.5 * DEFAULT_PROXIMITY_CUTOFF_CM, SteerMode::Forward);
        assert_eq!(interlock.zone(), ProximityZone::Warning);
        assert!(!interlock.too_close());
    }

    #[test]
    fn two_cutoffs_clears_after_too_close() {
        let mut interlock = Interlock::default();
        interlock.observe(DEFAULT_PROXIMITY_CUTOFF_CM - 2.0, SteerMode::Coast);
        assert!(interlock.too_close());

        interlock.observe(2.0 * DEFAULT_PROXIMITY_CUTOFF_CM, SteerMode::Coast);
        assert_eq!(interlock.zone(), ProximityZone::Clear);
        // Forward is accepted again.
        assert_eq!(interlock.vet_steer(SteerMode::Forward), (SteerMode::Forward, false));
    }

    #[test]
    fn forward_request_is_vetoed_while_too_close() {
        let mut interlock = Interlock::default();
        interlock.observe(1.0, SteerMode::Coast);
        assert_eq!(interlock.vet_steer(SteerMode::Forward), (SteerMode::Coast, true));
        // Other modes pass untouched.
        assert_eq!(interlock.vet_steer(SteerMode::Reverse), (SteerMode::Reverse, false));
    }

    #[test]
    fn warning_text_names_the_cutoff() {
        let interlock = Interlock::new(25.0);
        assert!(interlock.warning_text().contains("25.000 cm"));
    }
}
