use std::io;
use std::path::{Path, PathBuf};

use chrono::{Days, Local, NaiveDate};
use itertools::Itertools;
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use tracing::debug;

use crate::app_dirs::AppDirs;
use crate::errors::SessionError;
use crate::meditation::MeditationType;
use crate::session::{SessionRecord, StoredSession};
use crate::util::mean;

/// Length of the trailing stats window, today included.
pub const WEEK_DAYS: u64 = 7;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Aggregate over the trailing seven calendar days.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeeklyStats {
    pub total_minutes: u32,
    pub avg_session_length: f64,
    pub total_sessions: usize,
    pub sessions_with_music: usize,
    pub sessions_with_ai_guidance: usize,
    /// Sessions logged in the window, one per entry.
    pub days_tracked: usize,
    /// Distinct calendar dates with at least one session.
    pub active_days: usize,
}

/// Minutes and session count for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyMinutes {
    pub date: NaiveDate,
    pub minutes: u32,
    pub sessions: usize,
}

/// Persistence for completed sessions.
pub trait SessionStore {
    fn create_session(&mut self, record: &SessionRecord) -> Result<StoredSession, SessionError>;

    /// All sessions, newest first.
    fn list_sessions(&self) -> Result<Vec<StoredSession>, SessionError>;

    fn delete_session(&mut self, id: i64) -> Result<bool, SessionError>;

    fn update_notes(&mut self, id: i64, notes: &str) -> Result<bool, SessionError>;

    fn sessions_on(&self, date: NaiveDate) -> Result<Vec<StoredSession>, SessionError> {
        Ok(self
            .list_sessions()?
            .into_iter()
            .filter(|s| s.record.date == date)
            .collect())
    }

    fn weekly_stats(&self) -> Result<WeeklyStats, SessionError> {
        Ok(weekly_stats_at(
            Local::now().date_naive(),
            &self.list_sessions()?,
        ))
    }
}

fn week_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(WEEK_DAYS - 1))
        .unwrap_or(NaiveDate::MIN)
}

fn in_week(today: NaiveDate, date: NaiveDate) -> bool {
    (week_start(today)..=today).contains(&date)
}

/// Stats for the seven days ending on `today`. Future-dated sessions are ignored.
pub fn weekly_stats_at(today: NaiveDate, sessions: &[StoredSession]) -> WeeklyStats {
    let week: Vec<&SessionRecord> = sessions
        .iter()
        .map(|s| &s.record)
        .filter(|r| in_week(today, r.date))
        .collect();

    let lengths: Vec<f64> = week.iter().map(|r| r.duration_minutes as f64).collect();

    WeeklyStats {
        total_minutes: week.iter().map(|r| r.duration_minutes).sum(),
        avg_session_length: mean(&lengths).unwrap_or(0.0),
        total_sessions: week.len(),
        sessions_with_music: week.iter().filter(|r| r.with_music).count(),
        sessions_with_ai_guidance: week.iter().filter(|r| r.ai_guidance).count(),
        days_tracked: week.len(),
        active_days: week.iter().map(|r| r.date).unique().count(),
    }
}

/// One entry per day of the week ending on `today`, oldest first.
pub fn daily_minutes_at(today: NaiveDate, sessions: &[StoredSession]) -> Vec<DailyMinutes> {
    week_start(today)
        .iter_days()
        .take(WEEK_DAYS as usize)
        .map(|date| {
            let day = sessions.iter().filter(|s| s.record.date == date);
            let (minutes, count) =
                day.fold((0, 0), |(m, c), s| (m + s.record.duration_minutes, c + 1));
            DailyMinutes {
                date,
                minutes,
                sessions: count,
            }
        })
        .collect()
}

/// Session counts per meditation type, most practised first.
pub fn type_distribution(sessions: &[StoredSession]) -> Vec<(MeditationType, usize)> {
    sessions
        .iter()
        .counts_by(|s| s.record.meditation_type)
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.to_string().cmp(&b.0.to_string())))
        .collect()
}

/// Average change in mood across sessions.
pub fn average_mood_delta(sessions: &[StoredSession]) -> Option<f64> {
    let deltas: Vec<f64> = sessions
        .iter()
        .map(|s| s.record.mood_delta() as f64)
        .collect();
    mean(&deltas)
}

/// SQLite-backed store under `$HOME/.local/state/zazen`.
#[derive(Debug)]
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    /// Open the default database, creating it if needed.
    pub fn new() -> Result<Self, SessionError> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("zazen_sessions.db"));
        Self::open(&db_path)
    }

    pub fn open(db_path: &Path) -> Result<Self, SessionError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        debug!(path = %db_path.display(), "opening session store");
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self, SessionError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, SessionError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS meditation_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                type TEXT NOT NULL,
                with_music BOOLEAN NOT NULL,
                ai_guidance BOOLEAN NOT NULL,
                mood_before INTEGER NOT NULL,
                mood_after INTEGER NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_meditation_sessions_date ON meditation_sessions(date)",
            [],
        )?;

        Ok(SqliteSessionStore { conn })
    }

    fn query(&self, sql: &str, date: Option<NaiveDate>) -> rusqlite::Result<Vec<StoredSession>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match date {
            Some(date) => stmt.query_map([date.format(DATE_FORMAT).to_string()], stored_from_row)?,
            None => stmt.query_map([], stored_from_row)?,
        };
        rows.collect()
    }
}

fn stored_from_row(row: &Row<'_>) -> rusqlite::Result<StoredSession> {
    let date_str: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|_| {
        rusqlite::Error::InvalidColumnType(1, "date".to_string(), rusqlite::types::Type::Text)
    })?;
    let type_str: String = row.get(3)?;
    let meditation_type = MeditationType::from_id(&type_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(3, "type".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(StoredSession {
        id: row.get(0)?,
        record: SessionRecord {
            date,
            duration_minutes: row.get(2)?,
            meditation_type,
            with_music: row.get(4)?,
            ai_guidance: row.get(5)?,
            mood_before: row.get(6)?,
            mood_after: row.get(7)?,
            notes: row.get(8)?,
        },
    })
}

const SELECT_SESSIONS: &str = r#"
    SELECT id, date, duration_minutes, type, with_music, ai_guidance,
           mood_before, mood_after, notes
    FROM meditation_sessions
"#;

impl SessionStore for SqliteSessionStore {
    fn create_session(&mut self, record: &SessionRecord) -> Result<StoredSession, SessionError> {
        self.conn.execute(
            r#"
            INSERT INTO meditation_sessions
            (date, duration_minutes, type, with_music, ai_guidance, mood_before, mood_after, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.date.format(DATE_FORMAT).to_string(),
                record.duration_minutes,
                record.meditation_type.to_string(),
                record.with_music,
                record.ai_guidance,
                record.mood_before,
                record.mood_after,
                record.notes,
            ],
        )?;

        Ok(StoredSession {
            id: self.conn.last_insert_rowid(),
            record: record.clone(),
        })
    }

    fn list_sessions(&self) -> Result<Vec<StoredSession>, SessionError> {
        let sql = format!("{SELECT_SESSIONS} ORDER BY date DESC, id DESC");
        Ok(self.query(&sql, None)?)
    }

    fn sessions_on(&self, date: NaiveDate) -> Result<Vec<StoredSession>, SessionError> {
        let sql = format!("{SELECT_SESSIONS} WHERE date = ?1 ORDER BY id DESC");
        Ok(self.query(&sql, Some(date))?)
    }

    fn delete_session(&mut self, id: i64) -> Result<bool, SessionError> {
        let changed = self
            .conn
            .execute("DELETE FROM meditation_sessions WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    fn update_notes(&mut self, id: i64, notes: &str) -> Result<bool, SessionError> {
        let changed = self.conn.execute(
            "UPDATE meditation_sessions SET notes = ?1 WHERE id = ?2",
            params![notes, id],
        )?;
        Ok(changed > 0)
    }
}

/// In-process store; ids start at 1.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Vec<StoredSession>,
    last_id: i64,
}

impl SessionStore for MemorySessionStore {
    fn create_session(&mut self, record: &SessionRecord) -> Result<StoredSession, SessionError> {
        self.last_id += 1;
        let stored = StoredSession {
            id: self.last_id,
            record: record.clone(),
        };
        self.sessions.push(stored.clone());
        Ok(stored)
    }

    fn list_sessions(&self) -> Result<Vec<StoredSession>, SessionError> {
        Ok(self
            .sessions
            .iter()
            .sorted_by(|a, b| b.record.date.cmp(&a.record.date).then(b.id.cmp(&a.id)))
            .cloned()
            .collect())
    }

    fn delete_session(&mut self, id: i64) -> Result<bool, SessionError> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        Ok(self.sessions.len() < before)
    }

    fn update_notes(&mut self, id: i64, notes: &str) -> Result<bool, SessionError> {
        match self.sessions.iter_mut().find(|s| s.id == id) {
            Some(stored) => {
                stored.record.notes = notes.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: i64,
    date: String,
    duration_minutes: u32,
    #[serde(rename = "type")]
    meditation_type: String,
    with_music: bool,
    ai_guidance: bool,
    mood_before: u8,
    mood_after: u8,
    notes: &'a str,
}

/// Write sessions as CSV with a header row. Returns the number of rows written.
pub fn export_csv<W: io::Write>(sessions: &[StoredSession], writer: W) -> Result<usize, csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for stored in sessions {
        let r = &stored.record;
        wtr.serialize(CsvRow {
            id: stored.id,
            date: r.date.format(DATE_FORMAT).to_string(),
            duration_minutes: r.duration_minutes,
            meditation_type: r.meditation_type.to_string(),
            with_music: r.with_music,
            ai_guidance: r.ai_guidance,
            mood_before: r.mood_before,
            mood_after: r.mood_after,
            notes: &r.notes,
        })?;
    }
    wtr.flush()?;
    Ok(sessions.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: NaiveDate, minutes: u32, kind: MeditationType) -> SessionRecord {
        SessionRecord {
            date,
            duration_minutes: minutes,
            meditation_type: kind,
            with_music: false,
            ai_guidance: true,
            mood_before: 5,
            mood_after: 7,
            notes: String::new(),
        }
    }

    fn stored(id: i64, record: SessionRecord) -> StoredSession {
        StoredSession { id, record }
    }

    #[test]
    fn test_weekly_stats_window() {
        let today = day(2026, 3, 10);
        let sessions = vec![
            stored(1, record(today, 20, MeditationType::Mindfulness)),
            stored(2, record(day(2026, 3, 4), 10, MeditationType::Breathing)),
            // one day outside the window
            stored(3, record(day(2026, 3, 3), 60, MeditationType::Breathing)),
            stored(4, record(day(2026, 3, 11), 45, MeditationType::Breathing)),
        ];
        let stats = weekly_stats_at(today, &sessions);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_minutes, 30);
        assert_eq!(stats.avg_session_length, 15.0);
        assert_eq!(stats.days_tracked, 2);
        assert_eq!(stats.active_days, 2);
    }

    #[test]
    fn test_weekly_stats_tracks_sessions_and_active_days() {
        let today = day(2026, 3, 10);
        let mut music = record(today, 10, MeditationType::Breathing);
        music.with_music = true;
        music.ai_guidance = false;
        let sessions = vec![
            stored(1, record(today, 20, MeditationType::Mindfulness)),
            stored(2, music),
            stored(3, record(day(2026, 3, 9), 30, MeditationType::LovingKindness)),
        ];
        let stats = weekly_stats_at(today, &sessions);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.days_tracked, 3);
        assert_eq!(stats.active_days, 2);
        assert_eq!(stats.sessions_with_music, 1);
        assert_eq!(stats.sessions_with_ai_guidance, 2);
        assert_eq!(stats.avg_session_length, 20.0);
    }

    #[test]
    fn test_days_tracked_counts_every_session_on_the_same_day() {
        let today = day(2026, 3, 10);
        let sessions: Vec<StoredSession> = (1..=3)
            .map(|id| stored(id, record(today, 10, MeditationType::Mindfulness)))
            .collect();
        let stats = weekly_stats_at(today, &sessions);
        assert_eq!(stats.days_tracked, 3);
        assert_eq!(stats.active_days, 1);
    }

    #[test]
    fn test_weekly_stats_empty() {
        let stats = weekly_stats_at(day(2026, 3, 10), &[]);
        assert_eq!(stats, WeeklyStats::default());
    }

    #[test]
    fn test_daily_minutes() {
        let today = day(2026, 3, 10);
        let sessions = vec![
            stored(1, record(today, 20, MeditationType::Mindfulness)),
            stored(2, record(today, 10, MeditationType::Mindfulness)),
            stored(3, record(day(2026, 3, 4), 45, MeditationType::Breathing)),
        ];
        let days = daily_minutes_at(today, &sessions);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, day(2026, 3, 4));
        assert_eq!(days[0].minutes, 45);
        assert_eq!(days[6].minutes, 30);
        assert_eq!(days[6].sessions, 2);
        assert_eq!(days[3].sessions, 0);
    }

    #[test]
    fn test_type_distribution_and_mood() {
        let today = day(2026, 3, 10);
        let mut better = record(today, 20, MeditationType::Breathing);
        better.mood_after = 9;
        let sessions = vec![
            stored(1, record(today, 20, MeditationType::Mindfulness)),
            stored(2, better),
            stored(3, record(today, 20, MeditationType::Breathing)),
        ];
        assert_eq!(
            type_distribution(&sessions),
            vec![
                (MeditationType::Breathing, 2),
                (MeditationType::Mindfulness, 1)
            ]
        );
        assert_eq!(average_mood_delta(&sessions), Some(8.0 / 3.0));
        assert_eq!(average_mood_delta(&[]), None);
    }

    #[test]
    fn test_sqlite_round_trip_and_ordering() {
        let mut db = SqliteSessionStore::open_in_memory().unwrap();
        let older = db
            .create_session(&record(day(2026, 3, 1), 10, MeditationType::Breathing))
            .unwrap();
        let newer = db
            .create_session(&record(day(2026, 3, 5), 20, MeditationType::LovingKindness))
            .unwrap();
        assert!(newer.id > older.id);

        let all = db.list_sessions().unwrap();
        assert_eq!(all, vec![newer.clone(), older.clone()]);
        assert_eq!(db.sessions_on(day(2026, 3, 1)).unwrap(), vec![older]);
    }

    #[test]
    fn test_sqlite_update_and_delete() {
        let mut db = SqliteSessionStore::open_in_memory().unwrap();
        let s = db
            .create_session(&record(day(2026, 3, 1), 10, MeditationType::Mindfulness))
            .unwrap();
        assert!(db.update_notes(s.id, "steady").unwrap());
        assert_eq!(db.list_sessions().unwrap()[0].record.notes, "steady");
        assert!(!db.update_notes(999, "nope").unwrap());

        assert!(db.delete_session(s.id).unwrap());
        assert!(!db.delete_session(s.id).unwrap());
        assert!(db.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.db");
        {
            let mut db = SqliteSessionStore::open(&path).unwrap();
            db.create_session(&record(day(2026, 3, 1), 30, MeditationType::Breathing))
                .unwrap();
        }
        let db = SqliteSessionStore::open(&path).unwrap();
        assert_eq!(db.list_sessions().unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store_matches_sqlite_semantics() {
        let mut mem = MemorySessionStore::default();
        let a = mem
            .create_session(&record(day(2026, 3, 5), 10, MeditationType::Breathing))
            .unwrap();
        let b = mem
            .create_session(&record(day(2026, 3, 1), 20, MeditationType::Breathing))
            .unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(mem.list_sessions().unwrap(), vec![a.clone(), b]);
        assert!(mem.delete_session(2).unwrap());
        assert_eq!(mem.sessions_on(day(2026, 3, 5)).unwrap(), vec![a]);
    }

    #[test]
    fn test_export_csv() {
        let mut r = record(day(2026, 3, 1), 10, MeditationType::LovingKindness);
        r.notes = "warm, open".into();
        let mut out = Vec::new();
        let rows = export_csv(&[stored(7, r)], &mut out).unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,date,duration_minutes,type,with_music,ai_guidance,mood_before,mood_after,notes")
        );
        assert_eq!(
            lines.next(),
            Some("7,2026-03-01,10,loving_kindness,false,true,5,7,\"warm, open\"")
        );
    }
}
