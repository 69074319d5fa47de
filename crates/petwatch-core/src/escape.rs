// ── Escape debounce state machine ──
//
// One tracker per device, fed the `escaped` boolean of every successful
// poll. Pure logic: no clocks, no I/O. The monitor owns the timers and
// acts on the returned `Evaluation`.

use serde::{Deserialize, Serialize};

/// Default number of consecutive escaped readings required to confirm.
pub const DEFAULT_CONFIRMATIONS: u32 = 2;

/// Debounced escape status of one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "count", rename_all = "snake_case")]
pub enum EscapeStatus {
    /// Last reading was safe; counter is 0.
    #[default]
    Safe,
    /// Escaped on this many consecutive readings, threshold not yet reached.
    Suspected(u32),
    /// Escaped on at least `threshold` consecutive readings. Alarm raised.
    Confirmed,
}

impl EscapeStatus {
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }

    pub fn is_suspected(self) -> bool {
        matches!(self, Self::Suspected(_))
    }
}

/// Edge events produced by a single observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Safe → Suspected.
    Suspected,
    /// The threshold was reached on this reading. Fires once per episode.
    Confirmed,
    /// Confirmed → Safe. The raised alarm is withdrawn.
    Cleared,
    /// Suspected → Safe. The suspicion never became an alarm.
    Recovered,
}

/// Result of feeding one reading to an [`EscapeTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: EscapeStatus,
    pub transition: Option<Transition>,
    /// An accelerated recheck is wanted: suspicion is active but unconfirmed.
    pub recheck: bool,
}

/// Consecutive-reading counter with a confirmation threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeTracker {
    threshold: u32,
    count: u32,
}

impl Default for EscapeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATIONS)
    }
}

impl EscapeTracker {
    /// A threshold of 0 is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            count: 0,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn status(&self) -> EscapeStatus {
        match self.count {
            0 => EscapeStatus::Safe,
            n if n >= self.threshold => EscapeStatus::Confirmed,
            n => EscapeStatus::Suspected(n),
        }
    }

    /// Feed one successfully classified reading.
    ///
    /// The counter saturates at the threshold while escaped and drops to
    /// exactly 0 on the first safe reading.
    pub fn observe(&mut self, escaped: bool) -> Evaluation {
        let previous = self.status();

        if !escaped {
            self.count = 0;
            let transition = match previous {
                EscapeStatus::Confirmed => Some(Transition::Cleared),
                EscapeStatus::Suspected(_) => Some(Transition::Recovered),
                EscapeStatus::Safe => None,
            };
            return Evaluation {
                status: EscapeStatus::Safe,
                transition,
                recheck: false,
            };
        }

        self.count = self.count.saturating_add(1).min(self.threshold);
        let status = self.status();
        let transition = match (previous, status) {
            (EscapeStatus::Confirmed, _) => None,
            (_, EscapeStatus::Confirmed) => Some(Transition::Confirmed),
            (EscapeStatus::Safe, EscapeStatus::Suspected(_)) => Some(Transition::Suspected),
            _ => None,
        };

        Evaluation {
            status,
            transition,
            recheck: status.is_suspected(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(threshold: u32, readings: &[bool]) -> (EscapeTracker, Vec<Evaluation>) {
        let mut tracker = EscapeTracker::new(threshold);
        let evals = readings.iter().map(|&r| tracker.observe(r)).collect();
        (tracker, evals)
    }

    fn confirmations(evals: &[Evaluation]) -> usize {
        evals
            .iter()
            .filter(|e| e.transition == Some(Transition::Confirmed))
            .count()
    }

    #[test]
    fn two_escaped_readings_confirm_on_the_second() {
        let (tracker, evals) = run(2, &[true, true]);
        assert_eq!(evals[0].status, EscapeStatus::Suspected(1));
        assert_eq!(evals[0].transition, Some(Transition::Suspected));
        assert!(evals[0].recheck);
        assert_eq!(evals[1].status, EscapeStatus::Confirmed);
        assert_eq!(evals[1].transition, Some(Transition::Confirmed));
        assert!(!evals[1].recheck);
        assert_eq!(tracker.count(), 2);
    }

    #[test]
    fn interrupted_sequence_never_confirms() {
        let (_, evals) = run(2, &[true, false, true]);
        assert_eq!(confirmations(&evals), 0);
        assert_eq!(evals[1].transition, Some(Transition::Recovered));
        assert_eq!(evals[2].status, EscapeStatus::Suspected(1));
    }

    #[test]
    fn confirmed_then_safe_clears_once() {
        let (tracker, evals) = run(2, &[true, true, true, false, false]);
        let cleared = evals
            .iter()
            .filter(|e| e.transition == Some(Transition::Cleared))
            .count();
        assert_eq!(cleared, 1);
        assert_eq!(tracker.status(), EscapeStatus::Safe);
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn confirmed_does_not_retrigger_and_saturates() {
        let (tracker, evals) = run(2, &[true, true, true, true, true]);
        assert_eq!(confirmations(&evals), 1);
        assert!(evals[2..].iter().all(|e| e.transition.is_none()));
        assert!(evals[2..].iter().all(|e| e.status.is_confirmed()));
        assert_eq!(tracker.count(), 2);
    }

    #[test]
    fn threshold_one_confirms_immediately_without_recheck() {
        let (_, evals) = run(1, &[true]);
        assert_eq!(evals[0].status, EscapeStatus::Confirmed);
        assert!(!evals[0].recheck);
    }

    #[test]
    fn zero_threshold_is_treated_as_one() {
        assert_eq!(EscapeTracker::new(0).threshold(), 1);
    }

    #[test]
    fn higher_threshold_keeps_requesting_rechecks() {
        let (_, evals) = run(3, &[true, true, true]);
        assert!(evals[0].recheck);
        assert!(evals[1].recheck);
        assert_eq!(evals[1].status, EscapeStatus::Suspected(2));
        assert_eq!(evals[1].transition, None);
        assert_eq!(evals[2].status, EscapeStatus::Confirmed);
    }

    /// Exhaustive check over every reading sequence up to length 8:
    /// the counter never decreases while escaped, resets to 0 on the first
    /// safe reading, and confirmation fires iff the threshold is reached.
    #[test]
    fn counter_invariants_hold_for_all_short_sequences() {
        for threshold in 1..=4u32 {
            for len in 0..=8u32 {
                for bits in 0..(1u32 << len) {
                    let readings: Vec<bool> = (0..len).map(|i| bits & (1 << i) != 0).collect();
                    let mut tracker = EscapeTracker::new(threshold);
                    let mut streak = 0u32;
                    for &escaped in &readings {
                        let before = tracker.count();
                        let eval = tracker.observe(escaped);
                        if escaped {
                            streak += 1;
                            assert!(tracker.count() >= before);
                            assert!(tracker.count() <= threshold);
                            assert_eq!(
                                eval.transition == Some(Transition::Confirmed),
                                streak == threshold,
                                "threshold={threshold} readings={readings:?}"
                            );
                            assert_eq!(eval.recheck, streak < threshold);
                        } else {
                            streak = 0;
                            assert_eq!(tracker.count(), 0);
                            assert!(!eval.recheck);
                        }
                    }
                }
            }
        }
    }
}
