//! Usage aggregation over the storage tree.
//!
//! The central unit is the session-day: a session that spans midnight is
//! split into one [`SessionStat`] per local day, with the later days marked
//! as continuations so line counts are not double-attributed.

pub mod chat;
mod collect;
mod diffs;

pub use chat::{load_combined_session_chat, load_session_chat, ChatMessage, MessageContent, ToolCallInfo};
pub use collect::{collect_stats, load_session_diff_map, session_diff_totals};
pub(crate) use collect::{file_diff_from_entry, file_diffs_from_summary};
pub use diffs::{compute_incremental_diffs, merge_intervals_duration, sort_file_diffs};

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::storage::{MessageRecord, TokensData};

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct Tokens {
    pub input: u64,
    pub output: u64,
    pub reasoning: u64,
    pub cache_read: u64,
    pub cache_write: u64,
}

impl Tokens {
    #[inline]
    pub fn total(&self) -> u64 {
        self.input + self.output + self.reasoning + self.cache_read + self.cache_write
    }

    pub(crate) fn add(&mut self, other: &Tokens) {
        self.input += other.input;
        self.output += other.output;
        self.reasoning += other.reasoning;
        self.cache_read += other.cache_read;
        self.cache_write += other.cache_write;
    }

    pub(crate) fn subtract(&mut self, other: &Tokens) {
        self.input = self.input.saturating_sub(other.input);
        self.output = self.output.saturating_sub(other.output);
        self.reasoning = self.reasoning.saturating_sub(other.reasoning);
        self.cache_read = self.cache_read.saturating_sub(other.cache_read);
        self.cache_write = self.cache_write.saturating_sub(other.cache_write);
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct Diffs {
    pub additions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: Box<str>,
    pub additions: u64,
    pub deletions: u64,
    pub status: Box<str>,
}

/// One session's activity within a single local day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStat {
    pub id: Box<str>,
    pub messages: u64,
    pub prompts: u64,
    pub cost: f64,
    pub tokens: Tokens,
    pub diffs: Diffs,
    pub models: HashSet<Box<str>>,
    pub tools: HashMap<Box<str>, u64>,
    pub first_activity: i64,
    pub last_activity: i64,
    pub path_cwd: Box<str>,
    pub path_root: Box<str>,
    pub file_diffs: Vec<FileDiff>,
    pub original_session_id: Option<Box<str>>,
    pub first_created_date: Option<Box<str>>,
    pub is_continuation: bool,
    pub agents: Vec<AgentInfo>,
    pub active_duration_ms: i64,
}

impl SessionStat {
    pub fn new(id: impl Into<Box<str>>) -> Self {
        Self {
            id: id.into(),
            messages: 0,
            prompts: 0,
            cost: 0.0,
            tokens: Tokens::default(),
            diffs: Diffs::default(),
            models: HashSet::new(),
            tools: HashMap::new(),
            first_activity: i64::MAX,
            last_activity: 0,
            path_cwd: Box::default(),
            path_root: Box::default(),
            file_diffs: Vec::new(),
            original_session_id: None,
            first_created_date: None,
            is_continuation: false,
            agents: Vec::new(),
            active_duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: Box<str>,
    pub is_main: bool,
    pub models: HashSet<Box<str>>,
    pub messages: u64,
    pub tokens: Tokens,
    pub first_activity: i64,
    pub last_activity: i64,
    pub active_duration_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayStat {
    pub messages: u64,
    pub prompts: u64,
    pub tokens: Tokens,
    pub diffs: Diffs,
    pub sessions: HashMap<String, Arc<SessionStat>>,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    pub sessions: HashSet<Box<str>>,
    pub messages: u64,
    pub prompts: u64,
    pub tokens: Tokens,
    pub diffs: Diffs,
    pub tools: HashMap<Box<str>, u64>,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelUsage {
    pub name: Box<str>,
    pub short_name: Box<str>,
    pub provider: Box<str>,
    pub display_name: Box<str>,
    pub messages: u64,
    pub sessions: HashSet<Box<str>>,
    pub tokens: Tokens,
    pub tools: HashMap<Box<str>, u64>,
    pub agents: HashMap<Box<str>, u64>,
    #[serde(default)]
    pub daily_tokens: HashMap<String, u64>,
    #[serde(default)]
    pub daily_last_hour: HashMap<String, u8>,
    pub cost: f64,
}

impl ModelUsage {
    pub fn new(name: Box<str>) -> Self {
        let short: Box<str> = name.rsplit('/').next().unwrap_or(&name).into();
        let provider: Box<str> = name.split('/').next().unwrap_or(&name).into();
        let display_name = format!("{}/{}", provider, short).into_boxed_str();
        Self {
            name,
            short_name: short,
            provider,
            display_name,
            messages: 0,
            sessions: HashSet::new(),
            tokens: Tokens::default(),
            tools: HashMap::new(),
            agents: HashMap::new(),
            daily_tokens: HashMap::new(),
            daily_last_hour: HashMap::new(),
            cost: 0.0,
        }
    }
}

#[derive(Clone, Default)]
pub struct ToolUsage {
    pub name: Box<str>,
    pub count: u64,
}

/// The full aggregate plus the bookkeeping maps the incremental cache needs
/// to apply single-file updates later.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub totals: Totals,
    pub per_day: HashMap<String, DayStat>,
    pub session_titles: HashMap<Box<str>, String>,
    pub model_usage: Vec<ModelUsage>,
    pub session_message_files: HashMap<String, HashSet<PathBuf>>,
    pub processed_message_ids: HashSet<Box<str>>,
    pub parent_map: HashMap<Box<str>, Box<str>>,
    pub children_map: HashMap<Box<str>, Vec<Box<str>>>,
}

/// Local-day key for a millisecond timestamp, `%Y-%m-%d`.
#[inline]
pub fn get_day(ts: Option<i64>) -> String {
    match ts {
        Some(ms) => chrono::DateTime::from_timestamp(ms / 1000, 0)
            .map(|dt| {
                dt.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d")
                    .to_string()
            })
            .unwrap_or_else(|| "Unknown".into()),
        None => "Unknown".into(),
    }
}

/// Local hour of day for a millisecond timestamp.
#[inline]
pub(crate) fn local_hour(ms: i64) -> Option<u8> {
    chrono::DateTime::from_timestamp(ms / 1000, 0)
        .map(|dt| dt.with_timezone(&chrono::Local).hour() as u8)
}

/// `provider/model` for a message; the nested model object wins over the
/// top-level ids.
#[inline]
pub(crate) fn get_model_id(msg: &MessageRecord) -> Box<str> {
    let (provider, model) = if let Some(m) = &msg.model {
        (m.provider_id.as_deref(), m.model_id.as_deref())
    } else {
        (msg.provider_id.as_deref(), msg.model_id.as_deref())
    };

    match (provider, model) {
        (Some(p), Some(m)) => format!("{}/{}", p, m).into_boxed_str(),
        (None, Some(m)) => m.to_string().into_boxed_str(),
        _ => "unknown".into(),
    }
}

#[inline]
pub(crate) fn tokens_from(src: &Option<TokensData>) -> Tokens {
    let Some(t) = src else {
        return Tokens::default();
    };
    Tokens {
        input: t.input.map(|v| *v).unwrap_or(0),
        output: t.output.map(|v| *v).unwrap_or(0),
        reasoning: t.reasoning.map(|v| *v).unwrap_or(0),
        cache_read: t.cache.as_ref().and_then(|c| c.read.map(|v| *v)).unwrap_or(0),
        cache_write: t
            .cache
            .as_ref()
            .and_then(|c| c.write.map(|v| *v))
            .unwrap_or(0),
    }
}

pub(crate) fn make_sess_day_key(session: &str, day: &str) -> String {
    format!("{}|{}", session, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_total_and_arith() {
        let mut t = Tokens {
            input: 10,
            output: 20,
            reasoning: 5,
            cache_read: 100,
            cache_write: 2,
        };
        assert_eq!(t.total(), 137);
        let other = Tokens {
            input: 15,
            ..Tokens::default()
        };
        t.subtract(&other);
        assert_eq!(t.input, 0);
        t.add(&other);
        assert_eq!(t.input, 15);
    }

    #[test]
    fn test_get_model_id_precedence() {
        let msg: MessageRecord = serde_json::from_str(
            r#"{"providerID": "top", "modelID": "outer", "model": {"providerID": "anthropic", "modelID": "inner"}}"#,
        )
        .unwrap();
        assert_eq!(get_model_id(&msg).as_ref(), "anthropic/inner");

        let msg: MessageRecord =
            serde_json::from_str(r#"{"providerID": "openai", "modelID": "gpt"}"#).unwrap();
        assert_eq!(get_model_id(&msg).as_ref(), "openai/gpt");

        let msg: MessageRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(get_model_id(&msg).as_ref(), "unknown");
    }

    #[test]
    fn test_get_day_unknown_without_timestamp() {
        assert_eq!(get_day(None), "Unknown");
        assert_eq!(get_day(Some(1_700_000_000_000)).len(), 10);
    }

    #[test]
    fn test_model_usage_names() {
        let usage = ModelUsage::new("anthropic/some-model".into());
        assert_eq!(usage.short_name.as_ref(), "some-model");
        assert_eq!(usage.provider.as_ref(), "anthropic");
        assert_eq!(usage.display_name.as_ref(), "anthropic/some-model");
    }
}
