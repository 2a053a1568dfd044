use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use zazen::{
    stats::{average_mood_delta, daily_minutes_at, type_distribution},
    StoredSession,
};

use crate::{
    ui::charting::{bar_ceiling, format_label, weekly_bars},
    App,
};

/// Pure presenter for a single history row
pub fn present_row(stored: &StoredSession) -> Row<'static> {
    let r = &stored.record;
    let delta = r.mood_delta();
    let delta_style = if delta > 0 {
        Style::default().fg(Color::Green)
    } else if delta < 0 {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let extras = match (r.with_music, r.ai_guidance) {
        (true, true) => "music, guided",
        (true, false) => "music",
        (false, true) => "guided",
        (false, false) => "",
    };

    Row::new(vec![
        Cell::from(format!("#{}", stored.id)),
        Cell::from(r.date.format("%Y-%m-%d").to_string()),
        Cell::from(r.meditation_type.profile().name).style(
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Cell::from(format!("{} min", r.duration_minutes)),
        Cell::from(format!("{} -> {}", r.mood_before, r.mood_after)).style(delta_style),
        Cell::from(extras),
        Cell::from(r.notes.clone()),
    ])
}

/// Render the History screen
pub fn render_history(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(8), // Weekly chart
            Constraint::Length(1), // Type split
            Constraint::Min(0),    // Sessions table
            Constraint::Length(1), // Message
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let weekly = &app.history.weekly;
    let title_text = format!(
        "{} sessions, {} minutes over {} days this week (avg {} min)",
        weekly.total_sessions,
        weekly.total_minutes,
        weekly.active_days,
        format_label(weekly.avg_session_length)
    );
    let title = Paragraph::new(title_text)
        .block(Block::default().borders(Borders::ALL).title("History"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let sessions = &app.history.sessions;
    let bars = weekly_bars(&daily_minutes_at(Local::now().date_naive(), sessions));
    let data: Vec<(&str, u64)> = bars.iter().map(|(l, v)| (l.as_str(), *v)).collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Minutes"))
        .data(data.as_slice())
        .bar_width(5)
        .bar_gap(2)
        .max(bar_ceiling(&bars))
        .bar_style(Style::default().fg(Color::Magenta))
        .value_style(Style::default().fg(Color::Black).bg(Color::Magenta));
    f.render_widget(chart, chunks[1]);

    let mut split: Vec<Span> = type_distribution(sessions)
        .into_iter()
        .map(|(kind, count)| Span::raw(format!("{}: {count}   ", kind.profile().name)))
        .collect();
    if let Some(avg) = average_mood_delta(sessions) {
        split.push(Span::styled(
            format!("avg mood change {avg:+.1}"),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(split)).alignment(Alignment::Center),
        chunks[2],
    );

    if sessions.is_empty() {
        let no_data = Paragraph::new("No sessions yet. Finish a meditation to start your journal.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[3]);
    } else {
        let table_height = chunks[3].height.saturating_sub(3) as usize; // borders + header
        let max_scroll = sessions.len().saturating_sub(1);
        if app.history.scroll_offset > max_scroll {
            app.history.scroll_offset = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("Id"),
            Cell::from("Date"),
            Cell::from("Type"),
            Cell::from("Length"),
            Cell::from("Mood"),
            Cell::from("With"),
            Cell::from("Notes"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let visible_rows: Vec<Row> = app
            .history
            .sessions
            .iter()
            .skip(app.history.scroll_offset)
            .take(table_height)
            .enumerate()
            .map(|(i, stored)| {
                let row = present_row(stored);
                if i == 0 {
                    row.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    row
                }
            })
            .collect();

        let widths = [
            Constraint::Length(6),
            Constraint::Length(11),
            Constraint::Length(16),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Min(10),
        ];

        let table = Table::new(visible_rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Sessions"))
            .column_spacing(1);
        f.render_widget(table, chunks[3]);
    }

    if let Some(message) = &app.message {
        f.render_widget(
            Paragraph::new(Span::styled(
                message.clone(),
                Style::default().fg(Color::Yellow),
            ))
            .alignment(Alignment::Center),
            chunks[4],
        );
    }

    let instructions =
        Paragraph::new("(↑/↓) select  (PgUp/PgDn) page  (Home) top  (x) delete  (esc) back")
            .alignment(Alignment::Center)
            .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[5]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use zazen::{MeditationType, SessionRecord};

    #[test]
    fn test_present_row_does_not_panic() {
        let stored = StoredSession {
            id: 4,
            record: SessionRecord {
                date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                duration_minutes: 20,
                meditation_type: MeditationType::Breathing,
                with_music: true,
                ai_guidance: false,
                mood_before: 6,
                mood_after: 4,
                notes: "restless".into(),
            },
        };
        let _row = present_row(&stored);
    }
}
