//! Storage tree location and scanning.
//!
//! OpenCode writes one JSON file per record under
//! `$XDG_DATA_HOME/opencode/storage` with four subdirectories: `message/`,
//! `part/`, `session/` and `session_diff/`. Messages and sessions may be
//! nested one directory level deep; parts are always nested under their
//! message id.

mod lenient;
mod record;

pub use lenient::{LenientF64, LenientI64, LenientString, LenientU64};
pub use record::{
    CacheData, DiffItem, MessageRecord, ModelData, PartRecord, PathData, SessionDiffEntry,
    SessionRecord, Summary, TimeData, TokensData, ToolState, ToolStateInput,
};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the storage root, mainly for tests and
/// inspecting copied trees.
pub const STORAGE_ENV: &str = "OCSTATS_STORAGE";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolved locations of the OpenCode storage subdirectories.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    /// Resolve the storage root: explicit override, then `OCSTATS_STORAGE`,
    /// then `$XDG_DATA_HOME/opencode/storage`, then
    /// `~/.local/share/opencode/storage`.
    pub fn discover(override_dir: Option<&Path>) -> Self {
        if let Some(dir) = override_dir {
            return Self {
                root: dir.to_path_buf(),
            };
        }
        if let Ok(dir) = std::env::var(STORAGE_ENV) {
            if !dir.is_empty() {
                return Self {
                    root: PathBuf::from(dir),
                };
            }
        }
        let data_home = std::env::var("XDG_DATA_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            root: data_home.join("opencode").join("storage"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn message_dir(&self) -> PathBuf {
        self.root.join("message")
    }

    pub fn part_dir(&self) -> PathBuf {
        self.root.join("part")
    }

    pub fn session_dir(&self) -> PathBuf {
        self.root.join("session")
    }

    pub fn session_diff_dir(&self) -> PathBuf {
        self.root.join("session_diff")
    }

    /// List all message JSON files, descending one directory level.
    pub fn list_message_files(&self) -> Vec<PathBuf> {
        list_json_files(&self.message_dir())
    }

    /// List every JSON file across all four subdirectories. Used by the
    /// cache to record file metadata for validation.
    pub fn list_all_files(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for dir in ["message", "part", "session", "session_diff"] {
            out.extend(list_json_files(&self.root.join(dir)));
        }
        out
    }

    /// Load parts for a message, sorted by file name (part files are named
    /// in creation order).
    pub fn load_parts(&self, message_id: &str) -> Vec<PartRecord> {
        let dir = self.part_dir().join(message_id);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "json"))
            .collect();
        paths.sort_unstable();
        paths
            .iter()
            .filter_map(|p| {
                let bytes = fs::read(p).ok()?;
                serde_json::from_slice::<PartRecord>(&bytes).ok()
            })
            .collect()
    }

    /// Load session titles and parent links from `session/`.
    pub fn load_session_index(&self) -> SessionIndex {
        let mut titles = HashMap::new();
        let mut parents = HashMap::new();
        for path in list_json_files(&self.session_dir()) {
            let Ok(bytes) = fs::read(&path) else {
                continue;
            };
            let Ok(record) = serde_json::from_slice::<SessionRecord>(&bytes) else {
                debug!("skipping unparseable session file: {}", path.display());
                continue;
            };
            let id: Box<str> = match record.id {
                Some(id) if !id.0.is_empty() => id.0.into_boxed_str(),
                _ => continue,
            };
            if let Some(parent) = record.parent_id.filter(|p| !p.0.is_empty()) {
                parents.insert(id.clone(), parent.0.into_boxed_str());
            }
            titles.insert(id, record.title.map(|t| t.0).unwrap_or_default());
        }
        SessionIndex { titles, parents }
    }

    /// Load the raw per-session diff arrays from `session_diff/`, keyed by
    /// session id (the file stem).
    pub fn load_session_diff_entries(&self) -> HashMap<String, Vec<SessionDiffEntry>> {
        let mut out = HashMap::new();
        let Ok(entries) = fs::read_dir(self.session_diff_dir()) else {
            return out;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(bytes) = fs::read(&path) else {
                continue;
            };
            let Ok(parsed) = serde_json::from_slice::<Vec<SessionDiffEntry>>(&bytes) else {
                continue;
            };
            out.insert(stem.to_string(), parsed);
        }
        out
    }
}

/// Session titles plus child -> parent links.
#[derive(Debug, Default)]
pub struct SessionIndex {
    pub titles: HashMap<Box<str>, String>,
    pub parents: HashMap<Box<str>, Box<str>>,
}

/// List `.json` files in a directory, descending one level into
/// subdirectories. Missing or unreadable directories yield an empty list.
pub(crate) fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Ok(sub_entries) = fs::read_dir(&path) {
                for sub in sub_entries.flatten() {
                    let sub_path = sub.path();
                    if sub_path.extension().is_some_and(|e| e == "json") {
                        out.push(sub_path);
                    }
                }
            }
        } else if path.extension().is_some_and(|e| e == "json") {
            out.push(path);
        }
    }
    out
}
