pub mod charting;
pub mod history;
pub mod screen;

use std::str::FromStr;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use zazen::{
    config::Theme,
    engine::{Activity, CompletionReason, Phase},
    session::SessionConfig,
    util::{format_clock, format_delta, ratio},
};

use crate::{App, SetupField};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn ui(app: &mut App, f: &mut Frame) {
    let screen = screen::current_screen(&app.state());
    screen.render(app, f);
}

/// Accent colour of the selected meditation type
pub fn accent(app: &App) -> Color {
    match app.config.theme {
        Theme::Plain => Color::White,
        Theme::Calm => Color::from_str(app.engine.profile().color).unwrap_or(Color::Cyan),
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

/// Title, body, message and key-help rows shared by every screen
fn frame_layout(area: Rect) -> [Rect; 4] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2], chunks[3]]
}

fn render_chrome(app: &App, f: &mut Frame, title: &str, help: &str) -> Rect {
    let [title_area, body, message_area, help_area] = frame_layout(f.area());
    let color = accent(app);

    let title = Paragraph::new(Span::styled(title.to_string(), bold().fg(color)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title("zazen"),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, title_area);

    let error = app
        .message
        .clone()
        .or_else(|| app.engine.status().last_error.clone());
    if let Some(message) = error {
        let message = Paragraph::new(Span::styled(
            message,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        f.render_widget(message, message_area);
    }

    let help = Paragraph::new(Span::styled(help.to_string(), dim()))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(help, help_area);

    body
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn summary_line(cfg: &SessionConfig) -> String {
    format!(
        "{} min   guidance {}   music {}",
        cfg.duration_minutes,
        on_off(cfg.with_ai_guidance),
        on_off(cfg.with_music)
    )
}

pub fn render_home(app: &mut App, f: &mut Frame) {
    let body = render_chrome(
        app,
        f,
        "Meditation & Mindfulness",
        "(enter) new session  (h) history  (q) quit",
    );
    let weekly = &app.history.weekly;
    let last = app.history.sessions.first().map(|s| {
        format!(
            "Last session: {} on {}, mood {}",
            s.record.meditation_type.profile().name,
            s.record.date.format("%b %d"),
            format_delta(s.record.mood_delta())
        )
    });

    let mut lines = vec![
        Line::from(Span::styled("This week", bold())),
        Line::from(""),
        Line::from(format!(
            "{} sessions   {} minutes   {} days",
            weekly.total_sessions, weekly.total_minutes, weekly.active_days
        )),
        Line::from(format!(
            "avg {} min   {} with music   {} guided",
            charting::format_label(weekly.avg_session_length),
            weekly.sessions_with_music,
            weekly.sessions_with_ai_guidance
        )),
        Line::from(""),
    ];
    if let Some(last) = last {
        lines.push(Line::from(Span::styled(last, dim())));
    }
    if let Some(device) = &app.audio_device {
        lines.push(Line::from(Span::styled(
            format!("audio: {}", device.description),
            dim(),
        )));
    }

    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        body,
    );
}

fn setup_value(cfg: &SessionConfig, field: SetupField) -> String {
    match field {
        SetupField::Type => cfg.meditation_type.profile().name.to_string(),
        SetupField::Duration => format!("{} minutes", cfg.duration_minutes),
        SetupField::Music if cfg.with_music => {
            format!("on ({})", cfg.meditation_type.profile().sound_name)
        }
        SetupField::Music => "off".to_string(),
        SetupField::Guidance => on_off(cfg.with_ai_guidance).to_string(),
        SetupField::Volume => format!("{:.0}%", cfg.volume * 100.0),
        SetupField::MoodBefore => format!("{}/10", cfg.mood_before),
    }
}

fn setup_label(field: SetupField) -> &'static str {
    match field {
        SetupField::Type => "Type",
        SetupField::Duration => "Duration",
        SetupField::Music => "Ambient sound",
        SetupField::Guidance => "Guidance",
        SetupField::Volume => "Volume",
        SetupField::MoodBefore => "Mood before",
    }
}

pub fn render_setup(app: &mut App, f: &mut Frame) {
    let body = render_chrome(
        app,
        f,
        "New session",
        "(↑/↓) field  (←/→) change  (enter) continue  (esc) cancel",
    );
    let color = accent(app);
    let cfg = app.engine.config();

    let mut lines: Vec<Line> = SetupField::ALL
        .iter()
        .map(|&field| {
            let selected = field == app.setup_field;
            let marker = if selected { "> " } else { "  " };
            let value_style = if selected {
                bold().fg(color)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{:<14}", setup_label(field)), dim()),
                Span::styled(setup_value(cfg, field), value_style),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        cfg.meditation_type.profile().description,
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(Paragraph::new(lines), body);
}

pub fn render_guide(app: &mut App, f: &mut Frame) {
    let profile = app.engine.profile();
    let body = render_chrome(
        app,
        f,
        &format!("{} guide", profile.name),
        "(enter) begin  (esc) back",
    );

    let mut lines: Vec<Line> = profile
        .guide
        .iter()
        .enumerate()
        .map(|(i, step)| {
            Line::from(vec![
                Span::styled(format!("{}. ", i + 1), bold().fg(accent(app))),
                Span::raw(*step),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(summary_line(app.engine.config()), dim())));

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), body);
}

pub fn render_meditating(app: &mut App, f: &mut Frame) {
    let paused = app.engine.phase() == Phase::Active(Activity::Paused);
    let name = app.engine.profile().name;
    let title = if paused {
        format!("{name} (paused)")
    } else {
        name.to_string()
    };
    let body = render_chrome(
        app,
        f,
        &title,
        "(space) pause/resume  (s) stop  (+/-) volume  (q) quit",
    );
    let color = accent(app);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(body);

    let remaining = app.engine.remaining_seconds();
    let clock_style = if paused { dim() } else { bold().fg(color) };
    f.render_widget(
        Paragraph::new(Span::styled(format_clock(remaining), clock_style))
            .alignment(Alignment::Center),
        chunks[0],
    );

    let total = app.engine.config().total_seconds();
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(color))
            .ratio(ratio(app.engine.elapsed_seconds(), total))
            .label(""),
        chunks[1],
    );

    if let Some(text) = app.engine.current_guidance() {
        let steps = app
            .engine
            .session()
            .map_or(0, |s| s.sequencer.len());
        let guidance = vec![
            Line::from(Span::styled(
                format!("step {} of {}", app.engine.guidance_index() + 1, steps),
                dim(),
            )),
            Line::from(""),
            Line::from(Span::styled(
                text.to_string(),
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ];
        f.render_widget(
            Paragraph::new(guidance)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            chunks[3],
        );
    }

    let status = app.engine.status();
    let cfg = app.engine.config();
    let sound = if !cfg.with_music {
        "silent".to_string()
    } else if status.audio_unavailable {
        "sound unavailable".to_string()
    } else {
        format!(
            "{}  volume {:.0}%",
            app.engine.profile().sound_name,
            cfg.volume * 100.0
        )
    };
    let mut footer = sound;
    if status.guidance_fallback {
        footer.push_str("  (built-in guidance)");
    }
    f.render_widget(
        Paragraph::new(Span::styled(footer, dim())).alignment(Alignment::Center),
        chunks[4],
    );
}

pub fn render_results(app: &mut App, f: &mut Frame) {
    let heading = match app.engine.completion() {
        Some(CompletionReason::Stopped) => "Session ended early",
        _ => "Session complete",
    };
    let body = render_chrome(
        app,
        f,
        heading,
        "(←/→) mood  (type) notes  (enter) save  (esc) discard",
    );
    let color = accent(app);
    let cfg = app.engine.config();
    let mood_after = app.results.mood_after;
    let delta = mood_after as i16 - cfg.mood_before as i16;

    let lines = vec![
        Line::from(format!(
            "Meditated {} of {} minutes",
            format_clock(app.engine.elapsed_seconds()),
            cfg.duration_minutes
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{:<14}", "Mood before"), dim()),
            Span::raw(format!("{}/10", cfg.mood_before)),
        ]),
        Line::from(vec![
            Span::styled(format!("{:<14}", "Mood after"), dim()),
            Span::styled(format!("< {mood_after} >/10"), bold().fg(color)),
            Span::raw(format!("  ({})", format_delta(delta))),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{:<14}", "Notes"), dim()),
            Span::raw(app.results.notes.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
    ];

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), body);
}
