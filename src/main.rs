pub mod ui;

use std::{
    error::Error,
    fs::File,
    io::{self, stdin, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

use zazen::{
    app_dirs::AppDirs,
    audio::{open_default_output, render_to_wav, AudioDevice},
    config::{Config, ConfigStore, FileConfigStore},
    engine::{Activity, Phase, SessionEngine, SessionEvent},
    guidance::preferred_source,
    logging,
    meditation::{cycle_duration, MeditationType, DURATION_OPTIONS},
    runtime::{AppEvent, ChannelEventSource, Runner, SecondPacer},
    session::{SessionConfig, MOOD_RANGE},
    stats::{export_csv, MemorySessionStore, SessionStore, SqliteSessionStore, WeeklyStats},
    util::format_delta,
    StoredSession,
};

const TICK_RATE_MS: u64 = 100;
const VOLUME_STEP: f32 = 0.1;

/// guided meditation timer with generated ambient sound
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal meditation timer with rotating guidance prompts, procedurally generated ambient tones, and a mood journal with weekly stats."
)]
pub struct Cli {
    /// kind of meditation to preselect
    #[clap(short = 't', long, value_enum)]
    meditation_type: Option<MeditationType>,

    /// session length in minutes (10, 20, 30, 45 or 60)
    #[clap(short = 'm', long, value_parser = parse_minutes)]
    minutes: Option<u32>,

    /// play the generated ambient tone
    #[clap(long, conflicts_with = "no_music")]
    music: bool,

    /// stay silent even if music is on by default
    #[clap(long)]
    no_music: bool,

    /// turn off the rotating guidance prompts
    #[clap(long)]
    no_guidance: bool,

    /// tone volume between 0.0 and 1.0
    #[clap(long, value_parser = parse_volume)]
    volume: Option<f32>,

    /// how you feel before starting, from 1 to 10
    #[clap(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    mood_before: Option<u8>,

    /// print past sessions and this week's stats, then exit
    #[clap(long)]
    history: bool,

    /// write all past sessions to a CSV file, then exit
    #[clap(long, value_name = "PATH")]
    export_csv: Option<PathBuf>,

    /// render the selected type's tone to a WAV file, then exit
    #[clap(long, value_name = "PATH")]
    export_tone: Option<PathBuf>,

    /// length of the exported tone in seconds
    #[clap(long, default_value_t = 10.0, requires = "export_tone")]
    seconds: f32,

    /// store the given options as the new defaults, then exit
    #[clap(long)]
    save_defaults: bool,
}

fn parse_minutes(s: &str) -> Result<u32, String> {
    let minutes: u32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if DURATION_OPTIONS.contains(&minutes) {
        Ok(minutes)
    } else {
        Err(format!("choose one of {DURATION_OPTIONS:?}"))
    }
}

fn parse_volume(s: &str) -> Result<f32, String> {
    let volume: f32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err("volume must be between 0.0 and 1.0".to_string())
    }
}

impl Cli {
    /// Apply the command line on top of the stored defaults
    fn session_config(&self, defaults: &Config) -> SessionConfig {
        let mut cfg = SessionConfig::from(defaults);
        if let Some(kind) = self.meditation_type {
            cfg.meditation_type = kind;
        }
        if let Some(minutes) = self.minutes {
            cfg.duration_minutes = minutes;
        }
        if self.music {
            cfg.with_music = true;
        }
        if self.no_music {
            cfg.with_music = false;
        }
        if self.no_guidance {
            cfg.with_ai_guidance = false;
        }
        if let Some(volume) = self.volume {
            cfg.volume = volume;
        }
        if let Some(mood) = self.mood_before {
            cfg.mood_before = mood;
        }
        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Home,
    Setup,
    Guide,
    Meditating,
    Results,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    Type,
    Duration,
    Music,
    Guidance,
    Volume,
    MoodBefore,
}

impl SetupField {
    pub const ALL: [SetupField; 6] = [
        SetupField::Type,
        SetupField::Duration,
        SetupField::Music,
        SetupField::Guidance,
        SetupField::Volume,
        SetupField::MoodBefore,
    ];

    fn position(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug)]
pub struct ResultsForm {
    pub mood_after: u8,
    pub notes: String,
}

impl Default for ResultsForm {
    fn default() -> Self {
        Self {
            mood_after: 5,
            notes: String::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub scroll_offset: usize,
    pub sessions: Vec<StoredSession>,
    pub weekly: WeeklyStats,
}

pub struct App {
    pub engine: SessionEngine,
    pub store: Box<dyn SessionStore>,
    pub config: Config,
    pub setup_field: SetupField,
    pub results: ResultsForm,
    pub history: HistoryState,
    pub show_history: bool,
    pub message: Option<String>,
    pub should_quit: bool,
    pub audio_device: Option<AudioDevice>,
    pacer: SecondPacer,
}

impl App {
    pub fn new(engine: SessionEngine, store: Box<dyn SessionStore>, config: Config) -> Self {
        let mut app = Self {
            engine,
            store,
            config,
            setup_field: SetupField::Type,
            results: ResultsForm::default(),
            history: HistoryState::default(),
            show_history: false,
            message: None,
            should_quit: false,
            audio_device: None,
            pacer: SecondPacer::new(),
        };
        app.refresh_history();
        app
    }

    pub fn state(&self) -> AppState {
        if self.show_history {
            return AppState::History;
        }
        match self.engine.phase() {
            Phase::Idle => AppState::Home,
            Phase::Configuring => AppState::Setup,
            Phase::PreGuide => AppState::Guide,
            Phase::Active(_) => AppState::Meditating,
            Phase::Completed => AppState::Results,
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }
        self.message = None;
        let mut screen = ui::screen::current_screen(&self.state());
        screen.on_key(key, self);
        self.process_events();
    }

    /// Feed wall-clock time to a running session. Returns true when a redraw is due.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        if self.engine.phase() != Phase::Active(Activity::Running) {
            self.pacer.reset();
            return false;
        }
        for _ in 0..self.pacer.poll(now) {
            self.engine.tick();
            if self.engine.phase() != Phase::Active(Activity::Running) {
                break;
            }
        }
        self.process_events();
        true
    }

    fn process_events(&mut self) {
        for event in self.engine.drain_events() {
            match event {
                SessionEvent::AudioUnavailable(reason) => {
                    self.message = Some(format!("Playing silently: {reason}"));
                }
                SessionEvent::GuidanceFallback(_) => {
                    self.message = Some("Using the built-in guidance".to_string());
                }
                SessionEvent::PhaseChanged {
                    to: Phase::Completed,
                    ..
                } => {
                    self.results = ResultsForm::default();
                }
                SessionEvent::Saved { id } => {
                    self.message = Some(format!("Session #{id} saved"));
                    self.refresh_history();
                }
                _ => {}
            }
        }
    }

    pub fn refresh_history(&mut self) {
        match (self.store.list_sessions(), self.store.weekly_stats()) {
            (Ok(sessions), Ok(weekly)) => {
                self.history.sessions = sessions;
                self.history.weekly = weekly;
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(%err, "failed to load history");
                self.message = Some(format!("Could not load history: {err}"));
            }
        }
    }

    pub fn open_history(&mut self) {
        self.refresh_history();
        self.history.scroll_offset = 0;
        self.show_history = true;
    }

    pub fn close_history(&mut self) {
        self.show_history = false;
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self
            .history
            .sessions
            .get(self.history.scroll_offset)
            .map(|s| s.id)
        else {
            return;
        };
        match self.store.delete_session(id) {
            Ok(_) => {
                info!(id, "session deleted");
                self.message = Some(format!("Session #{id} deleted"));
                self.refresh_history();
                let last = self.history.sessions.len().saturating_sub(1);
                self.history.scroll_offset = self.history.scroll_offset.min(last);
            }
            Err(err) => self.message = Some(err.to_string()),
        }
    }

    pub fn adjust_setup(&mut self, forward: bool) {
        let field = self.setup_field;
        let Ok(cfg) = self.engine.config_mut() else {
            return;
        };
        match field {
            SetupField::Type => {
                cfg.meditation_type = if forward {
                    cfg.meditation_type.next()
                } else {
                    cfg.meditation_type.previous()
                }
            }
            SetupField::Duration => {
                cfg.duration_minutes = cycle_duration(cfg.duration_minutes, forward)
            }
            SetupField::Music => cfg.with_music = !cfg.with_music,
            SetupField::Guidance => cfg.with_ai_guidance = !cfg.with_ai_guidance,
            SetupField::Volume => cfg.volume = step_volume(cfg.volume, forward),
            SetupField::MoodBefore => cfg.mood_before = step_mood(cfg.mood_before, forward),
        }
    }

    pub fn nudge_volume(&mut self, forward: bool) {
        let volume = step_volume(self.engine.config().volume, forward);
        if let Err(err) = self.engine.set_volume(volume) {
            self.message = Some(err.to_string());
        }
    }

    pub fn begin_session(&mut self) {
        if let Err(err) = self.engine.begin() {
            self.message = Some(err.to_string());
        }
    }

    pub fn toggle_pause(&mut self) {
        let result = match self.engine.phase() {
            Phase::Active(Activity::Running) => self.engine.pause(),
            Phase::Active(Activity::Paused) => self.engine.resume(),
            _ => Ok(()),
        };
        if let Err(err) = result {
            self.message = Some(err.to_string());
        }
    }

    pub fn save_results(&mut self) {
        let mood_after = self.results.mood_after;
        let notes = self.results.notes.clone();
        if let Err(err) = self.engine.submit(mood_after, &notes, self.store.as_mut()) {
            self.message = Some(format!("Could not save: {err}"));
        }
    }

    pub fn quit(&mut self) {
        self.engine.abandon();
        self.should_quit = true;
    }
}

fn step_volume(volume: f32, forward: bool) -> f32 {
    let step = if forward { VOLUME_STEP } else { -VOLUME_STEP };
    ((volume + step) * 10.0).round().clamp(0.0, 10.0) / 10.0
}

fn step_mood(mood: u8, forward: bool) -> u8 {
    let next = if forward {
        mood.saturating_add(1)
    } else {
        mood.saturating_sub(1)
    };
    next.clamp(*MOOD_RANGE.start(), *MOOD_RANGE.end())
}

fn open_store() -> (Box<dyn SessionStore>, Option<String>) {
    match SqliteSessionStore::new() {
        Ok(db) => (Box::new(db), None),
        Err(err) => {
            warn!(%err, "falling back to an in-memory session store");
            (
                Box::new(MemorySessionStore::default()),
                Some(format!("History will not be kept: {err}")),
            )
        }
    }
}

fn print_history<W: Write>(store: &dyn SessionStore, out: &mut W) -> Result<(), Box<dyn Error>> {
    let sessions = store.list_sessions()?;
    let weekly = store.weekly_stats()?;

    writeln!(
        out,
        "This week: {} sessions, {} minutes, avg {:.1} min, {} days, {} with music, {} guided",
        weekly.total_sessions,
        weekly.total_minutes,
        weekly.avg_session_length,
        weekly.active_days,
        weekly.sessions_with_music,
        weekly.sessions_with_ai_guidance,
    )?;
    if sessions.is_empty() {
        writeln!(out, "No sessions yet.")?;
    }
    for s in &sessions {
        let r = &s.record;
        writeln!(
            out,
            "#{:<4} {}  {:<16} {:>3} min  mood {:>2} -> {:>2} ({})  {}",
            s.id,
            r.date,
            r.meditation_type.profile().name,
            r.duration_minutes,
            r.mood_before,
            r.mood_after,
            format_delta(r.mood_delta()),
            r.notes
        )?;
    }
    Ok(())
}

/// Handle the flags that run without the TUI. Returns true if one ran.
fn run_command(cli: &Cli, config_store: &FileConfigStore, defaults: &Config) -> Result<bool, Box<dyn Error>> {
    if cli.save_defaults {
        let session = cli.session_config(defaults);
        config_store.save(&defaults.with_session(&session))?;
        println!("Saved defaults to {}", config_store.path().display());
        return Ok(true);
    }

    if let Some(path) = &cli.export_tone {
        let session = cli.session_config(defaults);
        let kind = session.meditation_type.audio_profile();
        let frames = render_to_wav(kind, session.volume, cli.seconds, path)?;
        println!("Wrote {frames} frames of {kind} to {}", path.display());
        return Ok(true);
    }

    if cli.history || cli.export_csv.is_some() {
        let (store, warning) = open_store();
        if let Some(warning) = warning {
            eprintln!("{warning}");
        }
        if let Some(path) = &cli.export_csv {
            let rows = export_csv(&store.list_sessions()?, File::create(path)?)?;
            println!("Exported {rows} sessions to {}", path.display());
        }
        if cli.history {
            print_history(store.as_ref(), &mut io::stdout().lock())?;
        }
        return Ok(true);
    }

    Ok(false)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(log_path) = AppDirs::log_path() {
        if let Err(err) = logging::init(&log_path) {
            eprintln!("logging disabled: {err}");
        }
    }

    let config_store = FileConfigStore::new();
    let defaults = config_store.load();

    if run_command(&cli, &config_store, &defaults)? {
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let (audio, device) = open_default_output();
    let engine = SessionEngine::new(
        Box::new(audio),
        preferred_source(AppDirs::guidance_path()),
    )
    .with_config(cli.session_config(&defaults));
    let (store, warning) = open_store();

    let mut app = App::new(engine, store, defaults);
    app.audio_device = Some(device);
    app.message = warning;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("zazen started");
    let result = start_tui(&mut terminal, &mut app);
    app.engine.abandon();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        ChannelEventSource::terminal(),
        Duration::from_millis(TICK_RATE_MS),
    );

    terminal.draw(|f| ui::ui(app, f))?;

    while !app.should_quit {
        match runner.step() {
            AppEvent::Tick => {
                if app.on_tick(Instant::now()) {
                    terminal.draw(|f| ui::ui(app, f))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| ui::ui(app, f))?;
            }
            AppEvent::Key(key) => {
                app.on_key(key);
                terminal.draw(|f| ui::ui(app, f))?;
            }
        }
    }

    Ok(())
}
