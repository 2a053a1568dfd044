//! End-to-end session scenarios driven one second at a time.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;

use zazen::audio::{AudioContext, ToneGraph, ToneSynth};
use zazen::clock::{ClockState, Tick};
use zazen::engine::{Activity, CompletionReason, Phase, SessionEngine, SessionEvent};
use zazen::guidance::{BuiltinGuidance, GuidanceSource};
use zazen::{AudioProfileKind, MeditationType, SessionConfig, SessionError};

type CallLog = Arc<Mutex<Vec<String>>>;

struct RecordingGraph {
    kind: AudioProfileKind,
    log: CallLog,
    stopped: bool,
}

impl ToneGraph for RecordingGraph {
    fn kind(&self) -> AudioProfileKind {
        self.kind
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.lock().unwrap().push(format!("volume {volume}"));
    }

    fn set_muted(&mut self, muted: bool) {
        self.log.lock().unwrap().push(format!("muted {muted}"));
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.log.lock().unwrap().push("stop".to_string());
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[derive(Default)]
struct RecordingSynth {
    log: CallLog,
}

impl ToneSynth for RecordingSynth {
    fn build(
        &mut self,
        kind: AudioProfileKind,
        volume: f32,
    ) -> Result<Box<dyn ToneGraph>, SessionError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("build {kind} {volume}"));
        Ok(Box::new(RecordingGraph {
            kind,
            log: self.log.clone(),
            stopped: false,
        }))
    }
}

struct FailingGuidance;

impl GuidanceSource for FailingGuidance {
    fn guidance(
        &self,
        _kind: MeditationType,
        _duration_minutes: u32,
    ) -> Result<Vec<String>, SessionError> {
        Err(SessionError::guidance_failed("service offline"))
    }
}

struct EmptyGuidance;

impl GuidanceSource for EmptyGuidance {
    fn guidance(
        &self,
        _kind: MeditationType,
        _duration_minutes: u32,
    ) -> Result<Vec<String>, SessionError> {
        Ok(Vec::new())
    }
}

fn start(engine: &mut SessionEngine) -> Result<(), SessionError> {
    engine.open_setup()?;
    engine.show_guide()?;
    engine.begin()
}

fn recording_engine(config: SessionConfig) -> (SessionEngine, CallLog) {
    let synth = RecordingSynth::default();
    let log = synth.log.clone();
    let engine = SessionEngine::new(Box::new(synth), Box::new(BuiltinGuidance)).with_config(config);
    (engine, log)
}

fn teardown_events(events: &[SessionEvent]) -> Vec<&SessionEvent> {
    events
        .iter()
        .filter(|e| {
            matches!(
                e,
                SessionEvent::GuidanceStopped | SessionEvent::ClockStopped | SessionEvent::AudioStopped
            )
        })
        .collect()
}

#[test]
fn mindfulness_twenty_minutes_with_guidance() {
    let (mut engine, log) = recording_engine(SessionConfig {
        meditation_type: MeditationType::Mindfulness,
        duration_minutes: 20,
        with_music: false,
        with_ai_guidance: true,
        ..SessionConfig::default()
    });
    start(&mut engine).unwrap();
    assert_eq!(engine.remaining_seconds(), 1200);
    assert_eq!(
        engine.guidance_interval(),
        Some(std::time::Duration::from_secs(240))
    );
    assert_eq!(engine.guidance_index(), 0);

    let mut completions = 0;
    for second in 1..=1200u32 {
        if engine.tick() == Tick::Completed {
            completions += 1;
        }
        match second {
            239 => assert_eq!(engine.guidance_index(), 0),
            240 => assert_eq!(engine.guidance_index(), 1),
            480 => assert_eq!(engine.guidance_index(), 2),
            720 => assert_eq!(engine.guidance_index(), 3),
            960 => assert_eq!(engine.guidance_index(), 4),
            1199 => assert_eq!(engine.guidance_index(), 4),
            _ => {}
        }
    }

    assert_eq!(completions, 1);
    assert_eq!(engine.phase(), Phase::Completed);
    assert_eq!(engine.completion(), Some(CompletionReason::TimeUp));
    assert_eq!(engine.guidance_index(), 0);
    assert_eq!(engine.remaining_seconds(), 0);

    // nothing runs after completion
    for _ in 0..10 {
        assert_eq!(engine.tick(), Tick::Ignored);
    }
    assert!(log.lock().unwrap().is_empty());

    let advances = engine
        .events()
        .iter()
        .filter(|e| matches!(e, SessionEvent::GuidanceAdvanced { .. }))
        .count();
    assert_eq!(advances, 5);
}

#[test]
fn breathing_ocean_volume_change_keeps_the_graph() {
    let ctx = AudioContext::offline(8_000);
    let mut engine = SessionEngine::new(Box::new(ctx.clone()), Box::new(BuiltinGuidance))
        .with_config(SessionConfig {
            meditation_type: MeditationType::Breathing,
            duration_minutes: 10,
            with_music: true,
            with_ai_guidance: false,
            volume: 0.7,
            ..SessionConfig::default()
        });
    start(&mut engine).unwrap();
    assert!(engine
        .events()
        .contains(&SessionEvent::AudioStarted(AudioProfileKind::Ocean)));
    assert_eq!(ctx.voice_count(), 1);

    for _ in 0..30 {
        engine.tick();
        ctx.render_seconds(0.05);
    }
    engine.set_volume(0.3).unwrap();
    assert_eq!(ctx.voice_count(), 1);
    assert_eq!(ctx.live_generators(), 2);
    assert!(ctx.render_seconds(0.5).iter().any(|s| *s != 0.0));

    engine.stop().unwrap();
    assert_eq!(ctx.live_generators(), 0);
}

#[test]
fn breathing_volume_change_reaches_the_live_graph() {
    let (mut engine, log) = recording_engine(SessionConfig {
        meditation_type: MeditationType::Breathing,
        duration_minutes: 10,
        with_music: true,
        ..SessionConfig::default()
    });
    start(&mut engine).unwrap();
    engine.set_volume(0.3).unwrap();
    engine.stop().unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["build ocean 0.7", "volume 0.3", "stop"]
    );
}

#[test]
fn invalid_duration_never_goes_active() {
    let (mut engine, log) = recording_engine(SessionConfig {
        duration_minutes: 0,
        with_music: true,
        ..SessionConfig::default()
    });
    assert_matches!(start(&mut engine), Err(SessionError::InvalidConfig(_)));
    assert_eq!(engine.phase(), Phase::PreGuide);
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(engine.tick(), Tick::Ignored);

    engine.back().unwrap();
    engine.config_mut().unwrap().duration_minutes = 10;
    engine.show_guide().unwrap();
    engine.begin().unwrap();
    assert!(engine.phase().is_active());
    assert!(engine.status().last_error.is_none());
}

#[test]
fn empty_guidance_list_is_rejected() {
    let mut engine = SessionEngine::new(
        Box::new(RecordingSynth::default()),
        Box::new(EmptyGuidance),
    )
    .with_config(SessionConfig {
        duration_minutes: 10,
        ..SessionConfig::default()
    });
    assert_matches!(start(&mut engine), Err(SessionError::InvalidConfig(_)));
    assert_eq!(engine.phase(), Phase::PreGuide);

    // without guidance the same source is never consulted
    engine.back().unwrap();
    engine.config_mut().unwrap().with_ai_guidance = false;
    engine.show_guide().unwrap();
    engine.begin().unwrap();
    assert_eq!(engine.current_guidance(), None);
}

#[test]
fn failed_guidance_fetch_falls_back_to_defaults() {
    let mut engine = SessionEngine::new(
        Box::new(RecordingSynth::default()),
        Box::new(FailingGuidance),
    )
    .with_config(SessionConfig {
        meditation_type: MeditationType::Breathing,
        duration_minutes: 10,
        ..SessionConfig::default()
    });
    start(&mut engine).unwrap();
    assert!(engine.status().guidance_fallback);
    assert_eq!(
        engine.current_guidance(),
        Some("Sit comfortably with your back straight but relaxed.")
    );
    assert!(engine
        .events()
        .iter()
        .any(|e| matches!(e, SessionEvent::GuidanceFallback(_))));
}

#[test]
fn unavailable_audio_runs_silently() {
    let mut engine = SessionEngine::new(
        Box::new(AudioContext::unavailable("no output device")),
        Box::new(BuiltinGuidance),
    )
    .with_config(SessionConfig {
        duration_minutes: 10,
        with_music: true,
        ..SessionConfig::default()
    });
    start(&mut engine).unwrap();
    assert_eq!(engine.phase(), Phase::Active(Activity::Running));
    assert!(engine.status().audio_unavailable);
    assert!(!engine.has_live_audio());
    assert_eq!(engine.tick(), Tick::Counted { remaining: 599 });
}

#[test]
fn explicit_stop_halfway_tears_down_in_order() {
    let (mut engine, log) = recording_engine(SessionConfig {
        meditation_type: MeditationType::Mindfulness,
        duration_minutes: 10,
        with_music: true,
        with_ai_guidance: true,
        mood_before: 3,
        ..SessionConfig::default()
    });
    start(&mut engine).unwrap();
    for _ in 0..300 {
        engine.tick();
    }
    assert_eq!(engine.remaining_seconds(), 300);
    engine.drain_events();

    engine.stop().unwrap();
    assert_eq!(engine.phase(), Phase::Completed);
    assert_eq!(engine.completion(), Some(CompletionReason::Stopped));
    assert_eq!(engine.elapsed_seconds(), 300);

    let events = engine.drain_events();
    assert_eq!(
        teardown_events(&events),
        vec![
            &SessionEvent::GuidanceStopped,
            &SessionEvent::ClockStopped,
            &SessionEvent::AudioStopped
        ]
    );
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("stop"));

    let state = engine.session().unwrap();
    assert!(state.torn_down);
    assert!(!state.sequencer.is_active());
    assert_eq!(state.clock.state(), ClockState::Stopped);
    assert!(state.audio.is_none());

    // the record keeps the configured length
    let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let record = engine.record(6, "", date).unwrap();
    assert_eq!(record.duration_minutes, 10);
    assert_eq!(record.mood_before, 3);
    assert!(record.with_music);
    assert!(record.ai_guidance);

    // stopping twice is rejected and releases nothing new
    assert_matches!(engine.stop(), Err(SessionError::InvalidTransition { .. }));
    assert!(teardown_events(&engine.drain_events()).is_empty());
}

#[test]
fn natural_completion_tears_down_in_order() {
    let (mut engine, _log) = recording_engine(SessionConfig {
        duration_minutes: 10,
        with_music: true,
        ..SessionConfig::default()
    });
    start(&mut engine).unwrap();
    for _ in 0..600 {
        engine.tick();
    }
    let events = engine.drain_events();
    assert_eq!(
        teardown_events(&events),
        vec![
            &SessionEvent::GuidanceStopped,
            &SessionEvent::ClockStopped,
            &SessionEvent::AudioStopped
        ]
    );
    let completed_at = events
        .iter()
        .position(|e| {
            matches!(
                e,
                SessionEvent::PhaseChanged {
                    to: Phase::Completed,
                    ..
                }
            )
        })
        .unwrap();
    let audio_stopped_at = events
        .iter()
        .position(|e| *e == SessionEvent::AudioStopped)
        .unwrap();
    assert!(audio_stopped_at < completed_at);
}

#[test]
fn abandon_tears_down_in_order() {
    let (mut engine, log) = recording_engine(SessionConfig {
        duration_minutes: 10,
        with_music: true,
        ..SessionConfig::default()
    });
    start(&mut engine).unwrap();
    engine.pause().unwrap();
    engine.drain_events();
    engine.abandon();
    assert_eq!(engine.phase(), Phase::Idle);
    assert_eq!(
        teardown_events(&engine.drain_events()),
        vec![
            &SessionEvent::GuidanceStopped,
            &SessionEvent::ClockStopped,
            &SessionEvent::AudioStopped
        ]
    );
    assert_eq!(
        *log.lock().unwrap(),
        vec!["build bell 0.7", "muted true", "stop"]
    );
}

#[test]
fn unguided_session_reports_no_guidance_teardown() {
    let (mut engine, _log) = recording_engine(SessionConfig {
        duration_minutes: 10,
        with_music: false,
        with_ai_guidance: false,
        ..SessionConfig::default()
    });
    start(&mut engine).unwrap();
    assert!(!engine.session().unwrap().sequencer.is_active());
    engine.drain_events();

    engine.stop().unwrap();
    assert_eq!(
        teardown_events(&engine.drain_events()),
        vec![&SessionEvent::ClockStopped]
    );
    let state = engine.session().unwrap();
    assert_eq!(state.clock.state(), ClockState::Stopped);
    assert_eq!(engine.current_guidance(), None);
}

#[test]
fn pause_resume_cycles_do_not_leak_generators() {
    let ctx = AudioContext::offline(8_000);
    let mut engine = SessionEngine::new(Box::new(ctx.clone()), Box::new(BuiltinGuidance))
        .with_config(SessionConfig {
            meditation_type: MeditationType::LovingKindness,
            duration_minutes: 10,
            with_music: true,
            ..SessionConfig::default()
        });
    start(&mut engine).unwrap();
    let baseline = ctx.live_generators();
    assert_eq!(baseline, 3);

    for _ in 0..20 {
        engine.tick();
        engine.pause().unwrap();
        assert_eq!(engine.tick(), Tick::Ignored);
        engine.resume().unwrap();
        assert!(ctx.live_generators() <= baseline);
        assert_eq!(ctx.voice_count(), 1);
    }
    assert_eq!(engine.remaining_seconds(), 580);

    engine.stop().unwrap();
    assert_eq!(ctx.live_generators(), 0);
    assert_eq!(ctx.voice_count(), 0);
}

#[test]
fn paused_guidance_does_not_advance() {
    let (mut engine, _log) = recording_engine(SessionConfig {
        duration_minutes: 10,
        ..SessionConfig::default()
    });
    start(&mut engine).unwrap();
    // five steps over 600 s: one every 120 s
    for _ in 0..119 {
        engine.tick();
    }
    engine.pause().unwrap();
    for _ in 0..500 {
        engine.tick();
    }
    assert_eq!(engine.guidance_index(), 0);
    engine.resume().unwrap();
    engine.tick();
    assert_eq!(engine.guidance_index(), 1);
}
