use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::audio::ToneGraph;
use crate::clock::SessionClock;
use crate::errors::SessionError;
use crate::guidance::GuidanceSequencer;
use crate::meditation::{MeditationType, DURATION_OPTIONS};

pub const MOOD_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// User-chosen parameters for the next session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub meditation_type: MeditationType,
    pub duration_minutes: u32,
    pub with_music: bool,
    pub with_ai_guidance: bool,
    pub volume: f32,
    pub mood_before: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            meditation_type: MeditationType::Mindfulness,
            duration_minutes: 20,
            with_music: false,
            with_ai_guidance: true,
            volume: 0.7,
            mood_before: 5,
        }
    }
}

impl SessionConfig {
    /// Saturates, since an unvalidated config can hold any minute count.
    pub fn total_seconds(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }

    /// Reject anything that would start a broken session. Values are never clamped.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.duration_minutes == 0 {
            return Err(SessionError::invalid_config("duration must be positive"));
        }
        if !DURATION_OPTIONS.contains(&self.duration_minutes) {
            return Err(SessionError::invalid_config(format!(
                "duration of {} minutes is not one of {:?}",
                self.duration_minutes, DURATION_OPTIONS
            )));
        }
        validate_volume(self.volume)?;
        validate_mood(self.mood_before, "mood before")?;
        Ok(())
    }
}

pub fn validate_volume(volume: f32) -> Result<(), SessionError> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(SessionError::invalid_config(format!(
            "volume {volume} is outside 0.0..=1.0"
        )));
    }
    Ok(())
}

pub fn validate_mood(mood: u8, label: &str) -> Result<(), SessionError> {
    if !MOOD_RANGE.contains(&mood) {
        return Err(SessionError::invalid_config(format!(
            "{label} must be between 1 and 10, got {mood}"
        )));
    }
    Ok(())
}

/// The live session: owns its clock, sequencer and tone graph until teardown.
pub struct SessionState {
    pub config: SessionConfig,
    pub clock: SessionClock,
    pub sequencer: GuidanceSequencer,
    pub audio: Option<Box<dyn ToneGraph>>,
    pub torn_down: bool,
}

impl SessionState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            clock: SessionClock::new(),
            sequencer: GuidanceSequencer::new(),
            audio: None,
            torn_down: false,
        }
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.clock.remaining()
    }

    pub fn guidance_index(&self) -> usize {
        self.sequencer.index()
    }

    pub fn has_live_audio(&self) -> bool {
        self.audio.as_ref().is_some_and(|graph| !graph.is_stopped())
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("sequencer", &self.sequencer)
            .field("audio", &self.audio.as_ref().map(|graph| graph.kind()))
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

/// Summary of a finished session, handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: NaiveDate,
    pub duration_minutes: u32,
    #[serde(rename = "type")]
    pub meditation_type: MeditationType,
    pub with_music: bool,
    pub ai_guidance: bool,
    pub mood_before: u8,
    pub mood_after: u8,
    pub notes: String,
}

impl SessionRecord {
    pub fn mood_delta(&self) -> i16 {
        self.mood_after as i16 - self.mood_before as i16
    }
}

/// A record as returned by a store, carrying its assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: i64,
    #[serde(flatten)]
    pub record: SessionRecord,
}
