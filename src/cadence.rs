//! Roadworks cadence gate.
//!
//! Roadworks churn constantly and matter less than accidents, so they are
//! re-evaluated only every `threshold` poll cycles. The first cycle of a run
//! is always due.

/// Default number of poll cycles between roadworks evaluations.
pub const ROADWORKS_EVERY: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceDecision {
    Due,
    NotDue,
}

impl CadenceDecision {
    pub fn is_due(self) -> bool {
        self == CadenceDecision::Due
    }
}

#[derive(Debug, Clone)]
pub struct CadenceController {
    counter: u32,
    threshold: u32,
}

impl CadenceController {
    pub fn new(threshold: u32) -> Self {
        let threshold = threshold.max(1);
        Self {
            counter: threshold - 1,
            threshold,
        }
    }

    /// Advance one poll cycle and report whether roadworks are due on it.
    pub fn tick(&mut self) -> CadenceDecision {
        self.counter += 1;
        if self.counter >= self.threshold {
            self.counter = 0;
            CadenceDecision::Due
        } else {
            CadenceDecision::NotDue
        }
    }

    /// Make the next `tick` due regardless of the counter.
    pub fn force_due(&mut self) {
        self.counter = self.threshold - 1;
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Default for CadenceController {
    fn default() -> Self {
        Self::new(ROADWORKS_EVERY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(cadence: &mut CadenceController, cycles: usize) -> Vec<bool> {
        (0..cycles).map(|_| cadence.tick().is_due()).collect()
    }

    #[test]
    fn test_first_cycle_is_due() {
        let mut cadence = CadenceController::default();
        assert_eq!(cadence.tick(), CadenceDecision::Due);
        assert_eq!(cadence.counter(), 0);
    }

    #[test]
    fn test_due_every_five_cycles() {
        let mut cadence = CadenceController::default();
        assert_eq!(
            run(&mut cadence, 11),
            vec![true, false, false, false, false, true, false, false, false, false, true]
        );
    }

    #[test]
    fn test_sixth_cycle_due_without_changes() {
        let mut cadence = CadenceController::default();
        cadence.tick();
        for _ in 0..4 {
            assert!(!cadence.tick().is_due());
        }
        assert_eq!(cadence.counter(), 4);
        assert!(cadence.tick().is_due());
    }

    #[test]
    fn test_force_due() {
        let mut cadence = CadenceController::default();
        cadence.tick();
        cadence.tick();
        cadence.force_due();
        assert!(cadence.tick().is_due());
        assert!(!cadence.tick().is_due());
    }

    #[test]
    fn test_threshold_of_one_is_always_due() {
        let mut cadence = CadenceController::new(0);
        assert_eq!(cadence.threshold(), 1);
        assert_eq!(run(&mut cadence, 3), vec![true, true, true]);
    }
}
