//! On-disk library of generated metaphors and their poster images.
//!
//! Layout under the library root:
//!
//! ```text
//! history.json    ordered log of generation runs, newest first
//! presets.json    named poster settings
//! images/<id>.png rendered or downloaded artwork per history entry
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};

use crate::compose::settings::Preset;
use crate::foundation::error::{PosterError, PosterResult};
use crate::metaphor::model::MetaphorResult;

const HISTORY_FILE: &str = "history.json";
const PRESETS_FILE: &str = "presets.json";
const IMAGES_DIR: &str = "images";

/// Lifecycle of a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Done,
    Future,
    Declined,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub topic: String,
    pub metaphor: MetaphorResult,
    pub status: Status,
    /// URL or file reference of the generated artwork, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<String>,
}

impl HistoryEntry {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, metaphor: MetaphorResult) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            topic: topic.into(),
            metaphor,
            status: Status::Pending,
            generated_image: None,
        }
    }
}

/// File-backed library rooted at a single directory.
pub struct Library {
    root: PathBuf,
}

impl Library {
    /// Open a library at `root`, creating the directory tree if absent.
    pub fn open(root: impl Into<PathBuf>) -> PosterResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(IMAGES_DIR))
            .with_context(|| format!("create library at {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// History log, newest first. A missing file is an empty history.
    pub fn load_history(&self) -> PosterResult<Vec<HistoryEntry>> {
        self.load_json(HISTORY_FILE)
    }

    #[tracing::instrument(skip_all, fields(entries = history.len()))]
    pub fn save_history(&self, history: &[HistoryEntry]) -> PosterResult<()> {
        self.save_json(HISTORY_FILE, history)
    }

    /// Prepend an entry to the history log.
    pub fn push_history(&self, entry: HistoryEntry) -> PosterResult<()> {
        let mut history = self.load_history()?;
        history.insert(0, entry);
        self.save_history(&history)
    }

    pub fn load_presets(&self) -> PosterResult<Vec<Preset>> {
        self.load_json(PRESETS_FILE)
    }

    pub fn save_presets(&self, presets: &[Preset]) -> PosterResult<()> {
        self.save_json(PRESETS_FILE, presets)
    }

    pub fn image_path(&self, id: &str) -> PathBuf {
        self.root.join(IMAGES_DIR).join(format!("{id}.png"))
    }

    #[tracing::instrument(skip(self, png), fields(bytes = png.len()))]
    pub fn save_image(&self, id: &str, png: &[u8]) -> PosterResult<()> {
        let path = self.image_path(id);
        fs::write(&path, png).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn load_image(&self, id: &str) -> PosterResult<Vec<u8>> {
        let path = self.image_path(id);
        if !path.exists() {
            return Err(PosterError::store(format!("no image for entry {id}")));
        }
        Ok(fs::read(&path).with_context(|| format!("read {}", path.display()))?)
    }

    fn load_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> PosterResult<Vec<T>> {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text)
            .map_err(|e| PosterError::store(format!("malformed {file}: {e}")))
    }

    fn save_json<T: serde::Serialize>(&self, file: &str, items: &[T]) -> PosterResult<()> {
        let path = self.root.join(file);
        let text = serde_json::to_string_pretty(items).context("serialize library file")?;
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::settings::SettingsPatch;

    fn sample_metaphor() -> MetaphorResult {
        serde_json::from_value(serde_json::json!({
            "step1": {
                "subject": "me",
                "pressure": "deadlines",
                "conflict": "rest vs output",
                "cost": "sleep",
                "emotion": "restless"
            },
            "step2_object": "Candle",
            "step3_mechanic": {
                "rule": "a candle spends itself to make light",
                "x_maps_to": "effort burned",
                "y_maps_to": "light given"
            },
            "step4_quotes": ["Burning down to light the room"],
            "step4_best": { "line1": "Burning down", "line2": "to light the room" },
            "step5_visual": "a single white candle",
            "step5_dalle_prompt": "a single white candle on black"
        }))
        .unwrap()
    }

    #[test]
    fn open_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let lib = Library::open(dir.path().join("lib")).unwrap();
        assert!(lib.root().join("images").is_dir());
    }

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lib = Library::open(dir.path()).unwrap();
        assert!(lib.load_history().unwrap().is_empty());
        assert!(lib.load_presets().unwrap().is_empty());
    }

    #[test]
    fn history_roundtrip_preserves_order_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let lib = Library::open(dir.path()).unwrap();

        let mut first = HistoryEntry::new("a1", "plateau", sample_metaphor());
        first.status = Status::Done;
        lib.push_history(first).unwrap();
        lib.push_history(HistoryEntry::new("b2", "burnout", sample_metaphor()))
            .unwrap();

        let loaded = lib.load_history().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "b2");
        assert_eq!(loaded[0].status, Status::Pending);
        assert_eq!(loaded[1].id, "a1");
        assert_eq!(loaded[1].status, Status::Done);
        assert_eq!(loaded[1].metaphor.step2_object, "Candle");
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Status::Declined).unwrap(),
            r#""declined""#
        );
    }

    #[test]
    fn presets_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let lib = Library::open(dir.path()).unwrap();
        let preset = Preset {
            name: "dark square".to_string(),
            settings: SettingsPatch {
                scale: Some(1.4),
                bg: Some(crate::compose::settings::BackgroundMode::Shiny),
                ..SettingsPatch::default()
            },
        };
        lib.save_presets(std::slice::from_ref(&preset)).unwrap();
        let loaded = lib.load_presets().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "dark square");
        assert_eq!(loaded[0].settings.scale, Some(1.4));
    }

    #[test]
    fn image_roundtrip_and_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let lib = Library::open(dir.path()).unwrap();
        lib.save_image("a1", b"\x89PNG").unwrap();
        assert_eq!(lib.load_image("a1").unwrap(), b"\x89PNG");
        assert!(lib.load_image("zz").is_err());
    }

    #[test]
    fn malformed_history_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let lib = Library::open(dir.path()).unwrap();
        fs::write(dir.path().join("history.json"), "{not json").unwrap();
        let err = lib.load_history().unwrap_err();
        assert!(err.to_string().contains("malformed history.json"));
    }
}
