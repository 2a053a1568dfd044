use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// What the front-end loop reacts to.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

pub trait EventSource: Send + 'static {
    /// Wait at most `timeout` for the next event.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Events delivered over a channel, either from the terminal reader thread
/// or pushed directly by tests.
pub struct ChannelEventSource {
    rx: Receiver<AppEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }

    /// Spawn a reader thread on crossterm's input. Only key presses are
    /// forwarded so a single keystroke never counts twice.
    pub fn terminal() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(forwarded).is_err() {
                break;
            }
        });

        Self::new(rx)
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Pulls one event at a time, turning silence into `Tick`s at the UI rate.
pub struct Runner<E: EventSource> {
    source: E,
    tick_rate: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(source: E, tick_rate: Duration) -> Self {
        Self { source, tick_rate }
    }

    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }

    pub fn step(&self) -> AppEvent {
        self.source
            .recv_timeout(self.tick_rate)
            .unwrap_or(AppEvent::Tick)
    }
}

/// Turns irregular UI ticks into whole-second pulses for the session clock.
///
/// Partial seconds carry over between polls until [`SecondPacer::reset`].
#[derive(Debug, Default)]
pub struct SecondPacer {
    carry: Duration,
    last: Option<Instant>,
}

impl SecondPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds completed since the previous poll. The first poll only sets the origin.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let elapsed = self
            .last
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last = Some(now);
        self.advance(elapsed)
    }

    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.carry += elapsed;
        let whole = self.carry.as_secs();
        self.carry -= Duration::from_secs(whole);
        whole as u32
    }

    /// Forget the origin and any partial second, e.g. while paused.
    pub fn reset(&mut self) {
        self.carry = Duration::ZERO;
        self.last = None;
    }
}
