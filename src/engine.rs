use std::time::Duration;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::audio::{ToneGraph, ToneSynth};
use crate::clock::Tick;
use crate::errors::SessionError;
use crate::guidance::{default_guidance, GuidanceSource};
use crate::meditation::{AudioProfileKind, MeditationTypeProfile};
use crate::session::{
    validate_mood, validate_volume, SessionConfig, SessionRecord, SessionState, StoredSession,
};
use crate::stats::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Configuring,
    PreGuide,
    Active(Activity),
    Completed,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Configuring => "configuring",
            Phase::PreGuide => "reading the guide",
            Phase::Active(Activity::Running) => "meditating",
            Phase::Active(Activity::Paused) => "paused",
            Phase::Completed => "completed",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Active(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    TimeUp,
    Stopped,
}

/// Degraded modes and the last rejected action, for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    pub audio_unavailable: bool,
    pub guidance_fallback: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged { from: Phase, to: Phase },
    GuidanceAdvanced { index: usize },
    GuidanceFallback(String),
    AudioStarted(AudioProfileKind),
    AudioUnavailable(String),
    VolumeChanged(f32),
    GuidanceStopped,
    ClockStopped,
    AudioStopped,
    Saved { id: i64 },
}

/// Drives one meditation session at a time through its phases.
///
/// Every method updates state synchronously before returning. The host
/// calls [`SessionEngine::tick`] once per elapsed second.
pub struct SessionEngine {
    phase: Phase,
    config: SessionConfig,
    session: Option<SessionState>,
    completion: Option<CompletionReason>,
    status: SessionStatus,
    events: Vec<SessionEvent>,
    synth: Box<dyn ToneSynth>,
    guidance: Box<dyn GuidanceSource>,
}

impl SessionEngine {
    pub fn new(synth: Box<dyn ToneSynth>, guidance: Box<dyn GuidanceSource>) -> Self {
        Self {
            phase: Phase::Idle,
            config: SessionConfig::default(),
            session: None,
            completion: None,
            status: SessionStatus::default(),
            events: Vec::new(),
            synth,
            guidance,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> Result<&mut SessionConfig, SessionError> {
        match self.phase {
            Phase::Idle | Phase::Configuring => Ok(&mut self.config),
            _ => Err(self.invalid("change the session setup")),
        }
    }

    pub fn profile(&self) -> &'static MeditationTypeProfile {
        self.config.meditation_type.profile()
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn completion(&self) -> Option<CompletionReason> {
        self.completion
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.session
            .as_ref()
            .map_or(self.config.total_seconds(), SessionState::remaining_seconds)
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.clock.elapsed())
    }

    pub fn guidance_index(&self) -> usize {
        self.session.as_ref().map_or(0, SessionState::guidance_index)
    }

    pub fn current_guidance(&self) -> Option<&str> {
        self.session
            .as_ref()
            .filter(|s| s.sequencer.is_active())
            .and_then(|s| s.sequencer.current())
    }

    pub fn guidance_interval(&self) -> Option<Duration> {
        self.session.as_ref().and_then(|s| s.sequencer.interval())
    }

    pub fn has_live_audio(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(SessionState::has_live_audio)
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn open_setup(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == Phase::Idle, "open the setup")?;
        self.status = SessionStatus::default();
        self.transition(Phase::Configuring);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == Phase::Configuring, "cancel the setup")?;
        self.transition(Phase::Idle);
        Ok(())
    }

    pub fn show_guide(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == Phase::Configuring, "show the guide")?;
        self.transition(Phase::PreGuide);
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == Phase::PreGuide, "go back to setup")?;
        self.transition(Phase::Configuring);
        Ok(())
    }

    /// Start the session. On `InvalidConfig` the engine stays in `PreGuide`.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == Phase::PreGuide, "begin")?;
        self.status = SessionStatus::default();
        match self.start_session() {
            Ok(state) => {
                self.session = Some(state);
                self.completion = None;
                self.transition(Phase::Active(Activity::Running));
                Ok(())
            }
            Err(err) => {
                warn!(%err, "session rejected");
                self.status.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn start_session(&mut self) -> Result<SessionState, SessionError> {
        self.config.validate()?;
        let mut state = SessionState::new(self.config.clone());
        let total = self.config.total_seconds();

        if self.config.with_ai_guidance {
            let steps = self.fetch_guidance();
            state.sequencer.begin(steps, total)?;
        }
        state.clock.start(total)?;
        if self.config.with_music {
            self.start_audio(&mut state);
        }
        info!(
            kind = %self.config.meditation_type,
            minutes = self.config.duration_minutes,
            music = self.config.with_music,
            guidance = self.config.with_ai_guidance,
            "session started"
        );
        Ok(state)
    }

    fn fetch_guidance(&mut self) -> Vec<String> {
        let kind = self.config.meditation_type;
        match self.guidance.guidance(kind, self.config.duration_minutes) {
            Ok(steps) => steps,
            Err(err) => {
                warn!(%err, %kind, "falling back to default guidance");
                self.status.guidance_fallback = true;
                self.events
                    .push(SessionEvent::GuidanceFallback(err.to_string()));
                default_guidance(kind)
            }
        }
    }

    fn start_audio(&mut self, state: &mut SessionState) {
        if let Some(mut previous) = state.audio.take() {
            previous.stop();
        }
        let kind = state.config.meditation_type.audio_profile();
        match self.synth.build(kind, state.config.volume) {
            Ok(graph) => {
                state.audio = Some(graph);
                self.events.push(SessionEvent::AudioStarted(kind));
            }
            Err(err) => {
                warn!(%err, "continuing without sound");
                self.status.audio_unavailable = true;
                self.events
                    .push(SessionEvent::AudioUnavailable(err.to_string()));
            }
        }
    }

    /// Deliver one elapsed second: clock first, then guidance.
    pub fn tick(&mut self) -> Tick {
        if self.phase != Phase::Active(Activity::Running) {
            return Tick::Ignored;
        }
        let Some(state) = self.session.as_mut() else {
            return Tick::Ignored;
        };
        let tick = state.clock.tick();
        if tick == Tick::Ignored {
            return tick;
        }
        if let Some(index) = state.sequencer.on_tick() {
            debug!(index, "guidance advanced");
            self.events.push(SessionEvent::GuidanceAdvanced { index });
        }
        if tick == Tick::Completed {
            self.complete(CompletionReason::TimeUp);
        }
        tick
    }

    /// Suspend the clock and guidance and mute the tone graph.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == Phase::Active(Activity::Running), "pause")?;
        if let Some(state) = self.session.as_mut() {
            state.clock.pause();
            state.sequencer.suspend();
            if let Some(audio) = state.audio.as_mut() {
                audio.set_muted(true);
            }
        }
        self.transition(Phase::Active(Activity::Paused));
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == Phase::Active(Activity::Paused), "resume")?;
        if let Some(state) = self.session.as_mut() {
            state.clock.resume()?;
            state.sequencer.resume();
            if let Some(audio) = state.audio.as_mut() {
                audio.set_muted(false);
            }
        }
        self.transition(Phase::Active(Activity::Running));
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), SessionError> {
        self.require(self.phase.is_active(), "stop")?;
        self.complete(CompletionReason::Stopped);
        Ok(())
    }

    fn complete(&mut self, reason: CompletionReason) {
        self.teardown();
        self.completion = Some(reason);
        info!(
            ?reason,
            elapsed = self.elapsed_seconds(),
            "session completed"
        );
        self.transition(Phase::Completed);
    }

    /// Release the sequencer, clock and tone graph, in that order, once.
    /// Guidance and audio only report a stop when they were running.
    fn teardown(&mut self) {
        let Some(state) = self.session.as_mut() else {
            return;
        };
        if state.torn_down {
            return;
        }
        state.torn_down = true;

        if state.sequencer.end() {
            self.events.push(SessionEvent::GuidanceStopped);
        }

        state.clock.stop();
        self.events.push(SessionEvent::ClockStopped);

        if let Some(mut audio) = state.audio.take() {
            audio.stop();
            self.events.push(SessionEvent::AudioStopped);
        }
        debug!("session resources released");
    }

    /// Change the volume, retargeting a live tone graph in place.
    pub fn set_volume(&mut self, volume: f32) -> Result<(), SessionError> {
        validate_volume(volume)?;
        self.config.volume = volume;
        if let Some(state) = self.session.as_mut() {
            state.config.volume = volume;
            if let Some(audio) = state.audio.as_mut() {
                audio.set_volume(volume);
            }
        }
        self.events.push(SessionEvent::VolumeChanged(volume));
        Ok(())
    }

    /// Build the record for a completed session.
    ///
    /// The duration is the configured one, even after an early stop.
    pub fn record(
        &self,
        mood_after: u8,
        notes: &str,
        date: NaiveDate,
    ) -> Result<SessionRecord, SessionError> {
        self.require(self.phase == Phase::Completed, "record the session")?;
        let Some(state) = self.session.as_ref() else {
            return Err(self.invalid("record the session"));
        };
        validate_mood(mood_after, "mood after")?;
        let cfg = &state.config;
        Ok(SessionRecord {
            date,
            duration_minutes: cfg.duration_minutes,
            meditation_type: cfg.meditation_type,
            with_music: cfg.with_music,
            ai_guidance: cfg.with_ai_guidance,
            mood_before: cfg.mood_before,
            mood_after,
            notes: notes.trim().to_string(),
        })
    }

    /// Persist the results and return to `Idle`.
    ///
    /// A store failure leaves the engine in `Completed` so the caller can retry.
    pub fn submit(
        &mut self,
        mood_after: u8,
        notes: &str,
        store: &mut dyn SessionStore,
    ) -> Result<StoredSession, SessionError> {
        let record = self.record(mood_after, notes, Local::now().date_naive())?;
        match store.create_session(&record) {
            Ok(stored) => {
                info!(id = stored.id, "session saved");
                self.events.push(SessionEvent::Saved { id: stored.id });
                self.finish();
                Ok(stored)
            }
            Err(err) => {
                warn!(%err, "failed to save session");
                self.status.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Leave the results form without saving.
    pub fn discard(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == Phase::Completed, "discard the session")?;
        self.finish();
        Ok(())
    }

    /// Exit route for quitting mid-session: tear down and go idle.
    pub fn abandon(&mut self) {
        if self.phase.is_active() {
            info!(elapsed = self.elapsed_seconds(), "session abandoned");
        }
        self.teardown();
        self.finish();
    }

    fn finish(&mut self) {
        self.session = None;
        self.completion = None;
        self.transition(Phase::Idle);
    }

    fn transition(&mut self, to: Phase) {
        let from = std::mem::replace(&mut self.phase, to);
        if from != to {
            debug!(from = from.name(), to = to.name(), "phase changed");
            self.events.push(SessionEvent::PhaseChanged { from, to });
        }
    }

    fn require(&self, allowed: bool, action: &'static str) -> Result<(), SessionError> {
        if allowed {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.phase.name(),
            action,
        }
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("phase", &self.phase)
            .field("config", &self.config)
            .field("session", &self.session)
            .field("status", &self.status)
            .finish()
    }
}
