use std::time::Duration;

use crate::errors::SessionError;

/// Cycles through guidance steps at `total / count` second intervals.
///
/// Advancement is computed from whole elapsed seconds as
/// `floor(elapsed * count / total)`, which equals `floor(elapsed / interval)`
/// without accumulating rounding error for fractional intervals.
#[derive(Debug, Clone, Default)]
pub struct GuidanceSequencer {
    steps: Vec<String>,
    total_secs: u32,
    elapsed_secs: u32,
    advances: u64,
    index: usize,
    active: bool,
    suspended: bool,
}

impl GuidanceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, steps: Vec<String>, total_secs: u32) -> Result<(), SessionError> {
        if steps.is_empty() {
            return Err(SessionError::invalid_config("guidance list is empty"));
        }
        if total_secs == 0 {
            return Err(SessionError::invalid_config(
                "guidance needs a positive session duration",
            ));
        }
        self.steps = steps;
        self.total_secs = total_secs;
        self.elapsed_secs = 0;
        self.advances = 0;
        self.index = 0;
        self.active = true;
        self.suspended = false;
        Ok(())
    }

    /// Deliver one second. Returns the new index when the step changed.
    pub fn on_tick(&mut self) -> Option<usize> {
        if !self.active || self.suspended {
            return None;
        }
        self.elapsed_secs += 1;
        let due = self.elapsed_secs as u64 * self.steps.len() as u64 / self.total_secs as u64;
        if due <= self.advances {
            return None;
        }
        self.advances = due;
        self.index = (self.advances % self.steps.len() as u64) as usize;
        Some(self.index)
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Cancel advancement. Returns false when already ended.
    pub fn end(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    pub fn current(&self) -> Option<&str> {
        self.steps.get(self.index).map(String::as_str)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn advances(&self) -> u64 {
        self.advances
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn interval(&self) -> Option<Duration> {
        if self.steps.is_empty() || self.total_secs == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            self.total_secs as f64 / self.steps.len() as f64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meditation::DURATION_OPTIONS;
    use assert_matches::assert_matches;

    fn steps(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("step {i}")).collect()
    }

    #[test]
    fn interval_divides_duration_by_step_count() {
        for minutes in DURATION_OPTIONS {
            for n in 1..=7 {
                let mut seq = GuidanceSequencer::new();
                seq.begin(steps(n), minutes * 60).unwrap();
                let expected = (minutes * 60) as f64 / n as f64;
                let interval = seq.interval().unwrap().as_secs_f64();
                assert!((interval - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn full_session_advances_floor_total_over_interval_times() {
        for minutes in DURATION_OPTIONS {
            for n in 1..=7usize {
                let total = minutes * 60;
                let mut seq = GuidanceSequencer::new();
                seq.begin(steps(n), total).unwrap();
                for _ in 0..total {
                    seq.on_tick();
                }
                let interval = total as f64 / n as f64;
                let expected = (total as f64 / interval + 1e-9).floor() as u64;
                assert_eq!(seq.advances(), expected);
                assert_eq!(seq.index() as u64, expected % n as u64);
            }
        }
    }

    #[test]
    fn twenty_minutes_five_steps() {
        let mut seq = GuidanceSequencer::new();
        seq.begin(steps(5), 1200).unwrap();
        for _ in 0..239 {
            seq.on_tick();
        }
        assert_eq!(seq.index(), 0);
        assert_eq!(seq.current(), Some("step 1"));

        assert_eq!(seq.on_tick(), Some(1));
        assert_eq!(seq.current(), Some("step 2"));

        for _ in 240..1200 {
            seq.on_tick();
        }
        assert_eq!(seq.index(), 0);
    }

    #[test]
    fn wraps_indefinitely_until_ended() {
        let mut seq = GuidanceSequencer::new();
        seq.begin(steps(2), 4).unwrap();
        let indices: Vec<_> = (0..8).filter_map(|_| seq.on_tick()).collect();
        assert_eq!(indices, vec![1, 0, 1, 0]);

        assert!(seq.end());
        assert_eq!(seq.on_tick(), None);
        assert!(!seq.end());
    }

    #[test]
    fn suspend_holds_position() {
        let mut seq = GuidanceSequencer::new();
        seq.begin(steps(3), 3).unwrap();
        seq.suspend();
        for _ in 0..10 {
            assert_eq!(seq.on_tick(), None);
        }
        seq.resume();
        assert_eq!(seq.on_tick(), Some(1));
    }

    #[test]
    fn empty_list_or_zero_duration_rejected() {
        let mut seq = GuidanceSequencer::new();
        assert_matches!(seq.begin(vec![], 600), Err(SessionError::InvalidConfig(_)));
        assert_matches!(seq.begin(steps(3), 0), Err(SessionError::InvalidConfig(_)));
        assert!(!seq.is_active());
        assert_eq!(seq.interval(), None);
    }

    #[test]
    fn begin_resets_index() {
        let mut seq = GuidanceSequencer::new();
        seq.begin(steps(2), 2).unwrap();
        seq.on_tick();
        assert_eq!(seq.index(), 1);
        seq.begin(steps(4), 40).unwrap();
        assert_eq!(seq.index(), 0);
        assert_eq!(seq.advances(), 0);
    }
}
