use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;

use crate::{
    ui::{
        history::render_history, render_guide, render_home, render_meditating, render_results,
        render_setup,
    },
    App, AppState,
};

/// A UI Screen boundary: responsible for rendering and optional key handling
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
    /// Optional per-screen key handling. Returns true if the key was handled.
    fn on_key(&mut self, _key: KeyEvent, _app: &mut App) -> bool {
        false
    }
}

/// Landing screen with this week's summary
pub struct HomeScreen;

impl Screen for HomeScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_home(app, f);
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        match key.code {
            KeyCode::Enter | KeyCode::Char('n') => {
                if let Err(err) = app.engine.open_setup() {
                    app.message = Some(err.to_string());
                }
            }
            KeyCode::Char('h') => app.open_history(),
            KeyCode::Char('q') | KeyCode::Esc => app.quit(),
            _ => return false,
        }
        true
    }
}

pub struct SetupScreen;

impl Screen for SetupScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_setup(app, f);
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => {
                app.setup_field = app.setup_field.previous()
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                app.setup_field = app.setup_field.next()
            }
            KeyCode::Left | KeyCode::Char('h') => app.adjust_setup(false),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => app.adjust_setup(true),
            KeyCode::Enter => {
                if let Err(err) = app.engine.show_guide() {
                    app.message = Some(err.to_string());
                }
            }
            KeyCode::Esc => {
                if let Err(err) = app.engine.cancel() {
                    app.message = Some(err.to_string());
                }
            }
            _ => return false,
        }
        true
    }
}

/// Read-before-you-start instructions for the chosen type
pub struct GuideScreen;

impl Screen for GuideScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_guide(app, f);
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => app.begin_session(),
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                if let Err(err) = app.engine.back() {
                    app.message = Some(err.to_string());
                }
            }
            _ => return false,
        }
        true
    }
}

pub struct MeditatingScreen;

impl Screen for MeditatingScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_meditating(app, f);
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        match key.code {
            KeyCode::Char(' ') | KeyCode::Char('p') => app.toggle_pause(),
            KeyCode::Char('s') | KeyCode::Esc => {
                if let Err(err) = app.engine.stop() {
                    app.message = Some(err.to_string());
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => app.nudge_volume(true),
            KeyCode::Char('-') | KeyCode::Down => app.nudge_volume(false),
            KeyCode::Char('q') => app.quit(),
            _ => return false,
        }
        true
    }
}

/// Mood-after and notes form shown once a session ends
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_results(app, f);
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        match key.code {
            KeyCode::Left => {
                app.results.mood_after = app.results.mood_after.saturating_sub(1).max(1)
            }
            KeyCode::Right => app.results.mood_after = (app.results.mood_after + 1).min(10),
            KeyCode::Backspace => {
                app.results.notes.pop();
            }
            KeyCode::Char(c) => app.results.notes.push(c),
            KeyCode::Enter => app.save_results(),
            KeyCode::Esc => {
                if let Err(err) = app.engine.discard() {
                    app.message = Some(err.to_string());
                }
            }
            _ => return false,
        }
        true
    }
}

pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_history(app, f);
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        let last = app.history.sessions.len().saturating_sub(1);
        let offset = &mut app.history.scroll_offset;
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => *offset = offset.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => *offset = (*offset + 1).min(last),
            KeyCode::PageUp => *offset = offset.saturating_sub(10),
            KeyCode::PageDown => *offset = (*offset + 10).min(last),
            KeyCode::Home => *offset = 0,
            KeyCode::Char('x') | KeyCode::Delete => app.delete_selected(),
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('q') | KeyCode::Backspace => {
                app.close_history()
            }
            _ => return false,
        }
        true
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Home => Box::new(HomeScreen),
        AppState::Setup => Box::new(SetupScreen),
        AppState::Guide => Box::new(GuideScreen),
        AppState::Meditating => Box::new(MeditatingScreen),
        AppState::Results => Box::new(ResultsScreen),
        AppState::History => Box::new(HistoryScreen),
    }
}
