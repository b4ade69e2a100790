use super::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// File name of the resume list inside the state directory
pub const RESUME_FILE: &str = "downloads.json";

/// One requested download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub title: String,
    pub url: Url,
    /// Directory the file is written to
    pub dir: PathBuf,
    pub source: String,
    pub completed: bool,
    pub added_at: DateTime<Utc>,
}

impl DownloadEntry {
    pub fn new(
        title: impl Into<String>,
        url: Url,
        dir: PathBuf,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url,
            dir,
            source: source.into(),
            completed: false,
            added_at: Utc::now(),
        }
    }
}

/// Downloads that were started, persisted as JSON so unfinished ones can be
/// picked up again. Entries are unique by title.
#[derive(Debug)]
pub struct ResumeList {
    path: PathBuf,
    entries: Mutex<Vec<DownloadEntry>>,
}

impl ResumeList {
    /// Load the list stored at `path`; a missing file is an empty list
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No resume list at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Load `downloads.json` from `state_dir`
    pub fn in_dir(state_dir: &Path) -> Result<Self> {
        Self::load(state_dir.join(RESUME_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add an entry unless one with the same title exists. Returns whether it was added.
    pub fn add(&self, entry: DownloadEntry) -> Result<bool> {
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.title == entry.title) {
            return Ok(false);
        }
        debug!("Adding {} to resume list", entry.title);
        entries.push(entry);
        self.save(&entries)?;
        Ok(true)
    }

    pub fn get(&self, title: &str) -> Option<DownloadEntry> {
        self.entries.lock().iter().find(|e| e.title == title).cloned()
    }

    pub fn all(&self) -> Vec<DownloadEntry> {
        self.entries.lock().clone()
    }

    /// Entries not yet completed, oldest first
    pub fn pending(&self) -> Vec<DownloadEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| !e.completed)
            .cloned()
            .collect()
    }

    pub fn mark_completed(&self, title: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.iter_mut().find(|e| e.title == title) else {
            return Ok(false);
        };
        entry.completed = true;
        self.save(&entries)?;
        Ok(true)
    }

    pub fn remove(&self, title: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.title != title);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }

    fn save(&self, entries: &[DownloadEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }
}
