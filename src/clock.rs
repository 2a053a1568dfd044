use crate::errors::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Running,
    Paused,
    Stopped,
    Finished,
}

/// Result of delivering one tick to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The clock was not running; nothing changed.
    Ignored,
    Counted { remaining: u32 },
    /// Remaining time just reached zero. Fired once per `start`.
    Completed,
}

/// One-second resolution countdown.
///
/// The clock does not own a thread or timer; the host delivers ticks from its
/// event loop, so ticks for one clock never overlap.
#[derive(Debug, Clone)]
pub struct SessionClock {
    total: u32,
    remaining: u32,
    state: ClockState,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            total: 0,
            remaining: 0,
            state: ClockState::Idle,
        }
    }

    /// Begin counting down from `total_seconds`.
    ///
    /// A paused clock resumes when started with its own remaining value.
    pub fn start(&mut self, total_seconds: u32) -> Result<(), SessionError> {
        if self.state == ClockState::Running {
            return Err(SessionError::ClockAlreadyRunning);
        }
        if total_seconds == 0 {
            return Err(SessionError::invalid_config("clock needs a positive duration"));
        }
        if self.state != ClockState::Paused || total_seconds != self.remaining {
            self.total = total_seconds;
        }
        self.remaining = total_seconds;
        self.state = ClockState::Running;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.state != ClockState::Paused {
            return Err(SessionError::InvalidTransition {
                from: self.state_name(),
                action: "resume the clock",
            });
        }
        self.start(self.remaining)
    }

    pub fn tick(&mut self) -> Tick {
        if self.state != ClockState::Running {
            return Tick::Ignored;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = ClockState::Finished;
            Tick::Completed
        } else {
            Tick::Counted {
                remaining: self.remaining,
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state == ClockState::Running {
            self.state = ClockState::Paused;
        }
    }

    /// Halt immediately. Returns false when there was nothing to stop.
    pub fn stop(&mut self) -> bool {
        match self.state {
            ClockState::Running | ClockState::Paused => {
                self.state = ClockState::Stopped;
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn elapsed(&self) -> u32 {
        self.total - self.remaining
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            ClockState::Idle => "idle",
            ClockState::Running => "running",
            ClockState::Paused => "paused",
            ClockState::Stopped => "stopped",
            ClockState::Finished => "finished",
        }
    }
}
