mod sequencer;

pub use sequencer::GuidanceSequencer;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use serde::Deserialize;
use tracing::warn;

use crate::errors::SessionError;
use crate::meditation::MeditationType;

static SCRIPT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/guidance/scripts");

#[derive(Deserialize, Clone, Debug)]
struct GuidanceScript {
    #[serde(rename = "type")]
    kind: MeditationType,
    steps: Vec<String>,
}

/// Supplies the guidance steps for a session, fetched once before it starts.
pub trait GuidanceSource {
    fn guidance(
        &self,
        kind: MeditationType,
        duration_minutes: u32,
    ) -> Result<Vec<String>, SessionError>;
}

/// Scripts bundled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinGuidance;

impl GuidanceSource for BuiltinGuidance {
    fn guidance(
        &self,
        kind: MeditationType,
        _duration_minutes: u32,
    ) -> Result<Vec<String>, SessionError> {
        read_bundled_script(kind)
    }
}

fn read_bundled_script(kind: MeditationType) -> Result<Vec<String>, SessionError> {
    let file_name = format!("{kind}.json");
    let file = SCRIPT_DIR
        .get_file(&file_name)
        .ok_or_else(|| SessionError::guidance_failed(format!("{file_name} is not bundled")))?;
    let text = file
        .contents_utf8()
        .ok_or_else(|| SessionError::guidance_failed(format!("{file_name} is not utf-8")))?;
    let script: GuidanceScript = serde_json::from_str(text)
        .map_err(|e| SessionError::guidance_failed(format!("{file_name}: {e}")))?;
    if script.kind != kind {
        return Err(SessionError::guidance_failed(format!(
            "{file_name} holds {} guidance",
            script.kind
        )));
    }
    Ok(script.steps)
}

/// Fallback list used whenever the configured source fails.
///
/// Prefers the bundled script and falls back to the preparation guide, so
/// the result is never empty.
pub fn default_guidance(kind: MeditationType) -> Vec<String> {
    match read_bundled_script(kind) {
        Ok(steps) if !steps.is_empty() => steps,
        Ok(_) | Err(_) => {
            warn!(%kind, "bundled guidance unusable, using preparation guide");
            kind.profile().guide.iter().map(|s| s.to_string()).collect()
        }
    }
}

/// User-provided scripts: a JSON object mapping type identifiers to steps.
///
/// ```json
/// { "mindfulness": ["Settle in.", "Follow the breath."] }
/// ```
#[derive(Debug, Clone)]
pub struct FileGuidance {
    path: PathBuf,
}

impl FileGuidance {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GuidanceSource for FileGuidance {
    fn guidance(
        &self,
        kind: MeditationType,
        _duration_minutes: u32,
    ) -> Result<Vec<String>, SessionError> {
        let bytes = fs::read(&self.path).map_err(|e| {
            SessionError::guidance_failed(format!("{}: {e}", self.path.display()))
        })?;
        let mut scripts: HashMap<String, Vec<String>> = serde_json::from_slice(&bytes)
            .map_err(|e| SessionError::guidance_failed(format!("{}: {e}", self.path.display())))?;
        scripts.remove(&kind.to_string()).ok_or_else(|| {
            SessionError::guidance_failed(format!(
                "{} has no {kind} guidance",
                self.path.display()
            ))
        })
    }
}

/// Tries the user's file first and the bundled scripts second.
pub fn preferred_source(path: Option<PathBuf>) -> Box<dyn GuidanceSource> {
    match path {
        Some(p) if p.exists() => Box::new(FileGuidance::with_path(p)),
        _ => Box::new(BuiltinGuidance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn bundled_scripts_exist_for_every_type() {
        for kind in MeditationType::ALL {
            let steps = BuiltinGuidance.guidance(kind, 20).unwrap();
            assert!(steps.len() >= 5, "{kind} has {} steps", steps.len());
        }
    }

    #[test]
    fn bundled_breathing_script_order() {
        let steps = BuiltinGuidance
            .guidance(MeditationType::Breathing, 10)
            .unwrap();
        assert_eq!(steps[0], "Sit comfortably with your back straight but relaxed.");
        assert_eq!(steps.len(), 6);
    }

    #[test]
    fn default_guidance_is_never_empty() {
        for kind in MeditationType::ALL {
            assert!(!default_guidance(kind).is_empty());
        }
    }

    #[test]
    fn file_guidance_reads_matching_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guidance.json");
        fs::write(
            &path,
            r#"{"breathing": ["in", "out"], "mindfulness": ["sit"]}"#,
        )
        .unwrap();

        let source = FileGuidance::with_path(&path);
        assert_eq!(
            source.guidance(MeditationType::Breathing, 10).unwrap(),
            vec!["in".to_string(), "out".to_string()]
        );
        assert_matches!(
            source.guidance(MeditationType::LovingKindness, 10),
            Err(SessionError::GuidanceFetchFailed(_))
        );
    }

    #[test]
    fn file_guidance_failures() {
        let dir = tempdir().unwrap();
        let missing = FileGuidance::with_path(dir.path().join("nope.json"));
        assert_matches!(
            missing.guidance(MeditationType::Mindfulness, 20),
            Err(SessionError::GuidanceFetchFailed(_))
        );

        let corrupt_path = dir.path().join("corrupt.json");
        fs::write(&corrupt_path, "{not json").unwrap();
        let corrupt = FileGuidance::with_path(&corrupt_path);
        assert_matches!(
            corrupt.guidance(MeditationType::Mindfulness, 20),
            Err(SessionError::GuidanceFetchFailed(_))
        );
    }

    #[test]
    fn preferred_source_falls_back_to_builtin() {
        let dir = tempdir().unwrap();
        let source = preferred_source(Some(dir.path().join("absent.json")));
        assert!(source.guidance(MeditationType::Mindfulness, 20).is_ok());
        let source = preferred_source(None);
        assert!(source.guidance(MeditationType::Mindfulness, 20).is_ok());
    }
}
