//! Incremental statistics cache.
//!
//! A full scan of a busy storage tree takes seconds; the cache persists the
//! last aggregate as JSON and applies single-file updates from the watcher
//! in place. Per-message contributions (cost, tokens, duration) are kept so
//! a rewritten message file can have its old values subtracted before the
//! new ones are added.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::stats::{
    self, collect_stats, compute_incremental_diffs, get_day, load_session_diff_map,
    session_diff_totals, sort_file_diffs, AgentInfo, DayStat, FileDiff, ModelUsage, SessionStat,
    Stats, Tokens, Totals,
};
use crate::storage::{MessageRecord, PartRecord, SessionRecord, StorageError, StoragePaths};

const CACHE_FORMAT_VERSION: u64 = 8;
const CACHE_MAX_AGE: Duration = Duration::from_secs(120);
const VALIDATE_SAMPLE: usize = 50;

type SessionDiffUnion = HashMap<String, HashMap<String, FileDiff>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    pub mtime: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CachedStats {
    stats: Stats,
    version: u64,
    file_meta: HashMap<String, FileMeta>,
    #[serde(default)]
    format_version: u64,
    #[serde(default)]
    session_day_union_diffs: SessionDiffUnion,
    #[serde(default)]
    session_sorted_days: HashMap<String, Vec<String>>,
    #[serde(default)]
    session_diff_map: HashMap<String, Vec<FileDiff>>,
    #[serde(default)]
    session_diff_totals: HashMap<String, (u64, u64)>,
    #[serde(default)]
    message_contributions: HashMap<String, (f64, Tokens, i64)>,
    #[serde(default)]
    parent_map: HashMap<Box<str>, Box<str>>,
    #[serde(default)]
    children_map: HashMap<Box<str>, Vec<Box<str>>>,
}

/// Snapshot handed to the UI after an update, avoiding a second full clone.
pub struct StatsUpdate {
    pub affected_sessions: HashSet<String>,
    pub totals: Totals,
    pub per_day: HashMap<String, DayStat>,
    pub session_titles: HashMap<Box<str>, String>,
    pub model_usage: Vec<ModelUsage>,
    pub session_message_files: HashMap<String, HashSet<PathBuf>>,
    pub parent_map: HashMap<Box<str>, Box<str>>,
    pub children_map: HashMap<Box<str>, Vec<Box<str>>>,
}

pub struct StatsCache {
    cache_path: PathBuf,
    storage: StoragePaths,
    stats: Arc<RwLock<CachedStats>>,
}

impl StatsCache {
    pub fn new(storage: StoragePaths) -> Result<Self, StorageError> {
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".cache")
        });
        Self::with_cache_path(storage, cache_dir.join("ocstats").join("stats-cache.json"))
    }

    pub fn with_cache_path(storage: StoragePaths, cache_path: PathBuf) -> Result<Self, StorageError> {
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            cache_path,
            storage,
            stats: Arc::new(RwLock::new(CachedStats {
                format_version: CACHE_FORMAT_VERSION,
                ..CachedStats::default()
            })),
        })
    }

    /// Reuse a recent on-disk snapshot if it still matches the tree, fall
    /// back to a full scan.
    pub fn load_or_compute(&self) -> Stats {
        if let Ok(cache_meta) = fs::metadata(&self.cache_path) {
            let fresh = cache_meta
                .modified()
                .ok()
                .and_then(|t| t.elapsed().ok())
                .is_some_and(|age| age <= CACHE_MAX_AGE);
            if fresh {
                if let Ok(cached) = self.load_cache() {
                    if self.validate_cache_fast(&cached) {
                        info!(version = cached.version, "reusing cached statistics");
                        let stats = cached.stats.clone();
                        *self.stats.write() = cached;
                        return stats;
                    }
                    debug!("cached statistics stale, recomputing");
                }
            }
        }

        let stats = collect_stats(&self.storage);
        self.update_cache(&stats);
        stats
    }

    /// Full rescan regardless of snapshot freshness.
    pub fn recompute(&self) -> Stats {
        let stats = collect_stats(&self.storage);
        self.update_cache(&stats);
        stats
    }

    fn load_cache(&self) -> Result<CachedStats, StorageError> {
        let data = fs::read(&self.cache_path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Cheap validation: format version plus mtime+size of a sample of the
    /// recorded files.
    fn validate_cache_fast(&self, cached: &CachedStats) -> bool {
        if cached.format_version != CACHE_FORMAT_VERSION {
            return false;
        }

        let sample_size = VALIDATE_SAMPLE.min(cached.file_meta.len());
        for (checked, (path, meta)) in cached.file_meta.iter().enumerate() {
            if checked >= sample_size {
                break;
            }
            let Ok(current) = fs::metadata(path) else {
                return false;
            };
            if file_mtime(&current) != meta.mtime || current.len() != meta.size {
                return false;
            }
        }
        true
    }

    /// Apply a batch of changed file paths. Deletions and the root
    /// `session.json` force a full recompute; everything else is folded in
    /// incrementally.
    pub fn update_files(&self, paths: Vec<String>) -> StatsUpdate {
        let mut cached = self.stats.write();
        let affected_sessions = self.update_files_internal(&mut cached, paths);
        StatsUpdate {
            affected_sessions,
            totals: cached.stats.totals.clone(),
            per_day: cached.stats.per_day.clone(),
            session_titles: cached.stats.session_titles.clone(),
            model_usage: cached.stats.model_usage.clone(),
            session_message_files: cached.stats.session_message_files.clone(),
            parent_map: cached.stats.parent_map.clone(),
            children_map: cached.stats.children_map.clone(),
        }
    }

    fn update_files_internal(
        &self,
        cached: &mut CachedStats,
        paths: Vec<String>,
    ) -> HashSet<String> {
        let mut affected_sessions = HashSet::new();

        let has_session_json_root = paths.iter().any(|p| p.ends_with("session.json"));
        let has_deletion = paths.iter().any(|p| !Path::new(p).exists());

        if has_session_json_root || has_deletion {
            debug!("deletion or root session change, recomputing from scratch");
            cached.stats = collect_stats(&self.storage);
            cached.parent_map = cached.stats.parent_map.clone();
            cached.children_map = cached.stats.children_map.clone();
            for p in &paths {
                if !Path::new(p).exists() {
                    cached.file_meta.remove(p);
                }
            }
            for day_stat in cached.stats.per_day.values() {
                for id in day_stat.sessions.keys() {
                    affected_sessions.insert(id.clone());
                }
            }
        } else {
            for p in &paths {
                if p.contains("session_diff/") {
                    if let Some(session_id) = self.apply_session_diff_update(cached, p) {
                        affected_sessions.insert(session_id);
                    }
                } else if p.contains("message/") {
                    if let Some(session_id) = self.apply_message_update(cached, p) {
                        affected_sessions.insert(session_id);
                    }
                } else if p.contains("part/") {
                    apply_part_update(&mut cached.stats, p);
                } else if p.contains("session/") && p.ends_with(".json") {
                    if let Some(session_id) = apply_session_record_update(cached, p) {
                        affected_sessions.insert(session_id);
                    }
                }
            }

            cached
                .stats
                .model_usage
                .sort_unstable_by(|a, b| b.tokens.total().cmp(&a.tokens.total()));
        }

        cached.version += 1;
        cached.format_version = CACHE_FORMAT_VERSION;

        for p in &paths {
            if let Ok(m) = fs::metadata(p) {
                cached.file_meta.insert(
                    p.clone(),
                    FileMeta {
                        mtime: file_mtime(&m),
                        size: m.len(),
                    },
                );
            }
        }

        self.persist(cached);
        affected_sessions
    }

    /// Seed the cache from a freshly computed aggregate and write it out.
    fn update_cache(&self, stats: &Stats) {
        let mut cached = self.stats.write();
        cached.stats.clone_from(stats);
        cached.parent_map = stats.parent_map.clone();
        cached.children_map = stats.children_map.clone();
        cached.session_diff_map = load_session_diff_map(&self.storage);
        cached.session_diff_totals = session_diff_totals(&cached.session_diff_map);

        let message_files = self.storage.list_message_files();
        let (union_diffs, sorted_days, message_contributions) =
            build_session_day_state(&message_files);
        cached.session_day_union_diffs = union_diffs;
        cached.session_sorted_days = sorted_days;
        cached.message_contributions = message_contributions;
        cached.version += 1;
        cached.format_version = CACHE_FORMAT_VERSION;

        cached.file_meta = self
            .storage
            .list_all_files()
            .iter()
            .filter_map(|f| {
                let m = fs::metadata(f).ok()?;
                Some((
                    f.to_string_lossy().into_owned(),
                    FileMeta {
                        mtime: file_mtime(&m),
                        size: m.len(),
                    },
                ))
            })
            .collect();

        self.persist(&cached);
    }

    fn persist(&self, cached: &CachedStats) {
        match serde_json::to_vec(cached) {
            Ok(data) => {
                if let Err(err) = fs::write(&self.cache_path, data) {
                    warn!("failed to write stats cache: {err}");
                }
            }
            Err(err) => warn!("failed to serialize stats cache: {err}"),
        }
    }

    /// A rewritten message file: subtract its previous contribution, then
    /// fold the new values into totals, model usage, day and session.
    fn apply_message_update(&self, cached: &mut CachedStats, path: &str) -> Option<String> {
        let bytes = fs::read(path).ok()?;
        let msg: MessageRecord = serde_json::from_slice(&bytes).ok()?;

        let message_id: Box<str> = match msg.id.clone() {
            Some(id) if !id.0.is_empty() => id.0.into_boxed_str(),
            _ => path.to_string().into_boxed_str(),
        };
        let message_id_str = message_id.to_string();

        let ts = msg.time.as_ref().and_then(|t| t.created.map(|v| *v));
        let day = get_day(ts);
        let role = msg.role.as_ref().map(|s| s.0.as_str()).unwrap_or("");
        let is_user = role == "user";
        let is_assistant = role == "assistant";
        let model_id = stats::get_model_id(&msg);
        let cost = msg.cost.as_ref().map(|c| **c).unwrap_or(0.0);

        let agent_name: Box<str> = msg
            .agent
            .as_ref()
            .filter(|a| !a.0.is_empty())
            .map(|a| a.0.clone().into_boxed_str())
            .unwrap_or_else(|| "unknown".into());

        let original_session_id = msg
            .session_id
            .as_ref()
            .map(|s| s.0.clone())
            .unwrap_or_default();
        let original_boxed: Box<str> = original_session_id.clone().into_boxed_str();
        let session_id = cached
            .parent_map
            .get(&original_boxed)
            .map(|p| p.to_string())
            .unwrap_or_else(|| original_session_id.clone());
        let is_subagent_msg = cached.parent_map.contains_key(&original_boxed);

        let tokens_add = stats::tokens_from(&msg.tokens);

        let is_new_message = !cached.message_contributions.contains_key(&message_id_str);

        let mut duration_add = 0;
        if is_assistant {
            if let Some(t) = &msg.time {
                if let (Some(created), Some(completed)) = (t.created, t.completed) {
                    if *completed > *created {
                        duration_add = *completed - *created;
                    }
                }
            }
        }

        if !is_new_message {
            let (old_cost, old_tokens, old_duration) = cached.message_contributions[&message_id_str];
            let stats = &mut cached.stats;
            stats.totals.tokens.subtract(&old_tokens);
            stats.totals.cost -= old_cost;

            if is_assistant {
                if let Some(m) = stats.model_usage.iter_mut().find(|m| *m.name == *model_id) {
                    m.cost -= old_cost;
                    m.tokens.subtract(&old_tokens);
                    if let Some(daily) = m.daily_tokens.get_mut(&day) {
                        *daily = daily.saturating_sub(old_tokens.total());
                    }
                }
            }

            if let Some(d) = stats.per_day.get_mut(&day) {
                d.cost -= old_cost;
                d.tokens.subtract(&old_tokens);

                if let Some(s_arc) = d.sessions.get_mut(&session_id) {
                    let s = Arc::make_mut(s_arc);
                    s.cost -= old_cost;
                    s.tokens.subtract(&old_tokens);
                    s.active_duration_ms = s.active_duration_ms.saturating_sub(old_duration);

                    if let Some(agent) = s.agents.iter_mut().find(|a| *a.name == *agent_name) {
                        agent.tokens.subtract(&old_tokens);
                        agent.active_duration_ms =
                            agent.active_duration_ms.saturating_sub(old_duration);
                    }
                }
            }
        } else {
            cached.stats.totals.messages += 1;
            if is_user && !is_subagent_msg {
                cached.stats.totals.prompts += 1;
            }
        }

        cached
            .message_contributions
            .insert(message_id_str, (cost, tokens_add, duration_add));

        let stats = &mut cached.stats;
        stats.processed_message_ids.insert(message_id);

        if !original_session_id.is_empty() {
            stats
                .session_message_files
                .entry(original_session_id.clone())
                .or_default()
                .insert(PathBuf::from(path));
        }

        stats.totals.tokens.add(&tokens_add);
        stats.totals.cost += cost;
        if !session_id.is_empty() {
            stats.totals.sessions.insert(session_id.clone().into_boxed_str());
        }

        if is_assistant {
            if let Some(m) = stats.model_usage.iter_mut().find(|m| *m.name == *model_id) {
                if is_new_message {
                    m.messages += 1;
                    *m.agents.entry(agent_name.clone()).or_insert(0) += 1;
                }
                m.cost += cost;
                m.tokens.add(&tokens_add);
                m.sessions.insert(session_id.clone().into_boxed_str());
                *m.daily_tokens.entry(day.clone()).or_insert(0) += tokens_add.total();
                if let Some(hour) = ts.and_then(stats::local_hour) {
                    m.daily_last_hour.insert(day.clone(), hour);
                }
            } else {
                let mut usage = ModelUsage::new(model_id.clone());
                usage.messages = 1;
                usage.sessions.insert(session_id.clone().into_boxed_str());
                usage.tokens = tokens_add;
                usage.agents.insert(agent_name.clone(), 1);
                usage.daily_tokens.insert(day.clone(), tokens_add.total());
                if let Some(hour) = ts.and_then(stats::local_hour) {
                    usage.daily_last_hour.insert(day.clone(), hour);
                }
                usage.cost = cost;
                stats.model_usage.push(usage);
            }
        }

        {
            let d = stats.per_day.entry(day.clone()).or_default();
            if is_new_message {
                d.messages += 1;
                if is_user && !is_subagent_msg {
                    d.prompts += 1;
                }
            }
            d.cost += cost;
            d.tokens.add(&tokens_add);

            let s_arc = d
                .sessions
                .entry(session_id.clone())
                .or_insert_with(|| Arc::new(SessionStat::new(session_id.clone())));
            let s = Arc::make_mut(s_arc);

            if is_new_message {
                s.messages += 1;
                if is_user && !is_subagent_msg {
                    s.prompts += 1;
                }
            }
            s.cost += cost;
            s.active_duration_ms += duration_add;

            if is_assistant {
                s.models.insert(model_id.clone());
            }
            s.tokens.add(&tokens_add);
            if let Some(t) = ts {
                if t < s.first_activity {
                    s.first_activity = t;
                }
            }
            let end_ts = msg
                .time
                .as_ref()
                .and_then(|t| t.completed.map(|v| *v))
                .or(ts);
            if let Some(t) = end_ts {
                if t > s.last_activity {
                    s.last_activity = t;
                }
            }
            if let Some(p) = &msg.path {
                if let Some(cwd) = &p.cwd {
                    s.path_cwd = cwd.clone().into();
                }
                if let Some(root) = &p.root {
                    s.path_root = root.clone().into();
                }
            }

            if let Some(agent) = s.agents.iter_mut().find(|a| *a.name == *agent_name) {
                if is_new_message {
                    agent.messages += 1;
                }
                agent.tokens.add(&tokens_add);
                if is_assistant {
                    agent.models.insert(model_id.clone());
                }
                if let Some(t) = ts {
                    if t < agent.first_activity {
                        agent.first_activity = t;
                    }
                }
                if let Some(t) = end_ts {
                    if t > agent.last_activity {
                        agent.last_activity = t;
                    }
                }
                agent.active_duration_ms += duration_add;
            } else if is_new_message {
                let mut models = HashSet::new();
                if is_assistant {
                    models.insert(model_id.clone());
                }
                s.agents.push(AgentInfo {
                    name: agent_name.clone(),
                    is_main: !is_subagent_msg,
                    models,
                    messages: 1,
                    tokens: tokens_add,
                    first_activity: ts.unwrap_or(i64::MAX),
                    last_activity: end_ts.unwrap_or(0),
                    active_duration_ms: duration_add,
                });
            }
        }

        let cumulative_diffs = extract_cumulative_diffs(&msg);
        if !session_id.is_empty() && !cumulative_diffs.is_empty() {
            let key = stats::make_sess_day_key(&session_id, &day);
            let file_map = cached.session_day_union_diffs.entry(key).or_default();
            for d in &cumulative_diffs {
                if d.path.is_empty() {
                    continue;
                }
                file_map.insert(d.path.to_string(), d.clone());
            }

            // A newer cumulative summary supersedes the recorded final state
            // for this session.
            cached
                .session_diff_map
                .insert(session_id.clone(), cumulative_diffs.clone());

            let adds: u64 = cumulative_diffs.iter().map(|d| d.additions).sum();
            let dels: u64 = cumulative_diffs.iter().map(|d| d.deletions).sum();

            let stats = &mut cached.stats;
            if let Some(&(old_adds, old_dels)) = cached.session_diff_totals.get(&session_id) {
                stats.totals.diffs.additions =
                    stats.totals.diffs.additions.saturating_sub(old_adds);
                stats.totals.diffs.deletions =
                    stats.totals.diffs.deletions.saturating_sub(old_dels);
            }
            stats.totals.diffs.additions += adds;
            stats.totals.diffs.deletions += dels;

            cached
                .session_diff_totals
                .insert(session_id.clone(), (adds, dels));
        }

        if !session_id.is_empty() {
            let days = cached
                .session_sorted_days
                .entry(session_id.clone())
                .or_default();
            if days.binary_search(&day).is_err() {
                days.push(day.clone());
                days.sort_unstable();
            }

            self.reattribute_session_days(cached, &session_id, &day);
        }

        Some(session_id)
    }

    /// Recompute day-level diff attribution for a session from the stored
    /// cumulative unions, starting at the day that changed.
    fn reattribute_session_days(&self, cached: &mut CachedStats, session_id: &str, day: &str) {
        let Some(sorted_days) = cached.session_sorted_days.get(session_id).cloned() else {
            return;
        };
        let start_pos = sorted_days.iter().position(|d| d == day).unwrap_or(0);
        let first_day = sorted_days
            .first()
            .cloned()
            .unwrap_or_else(|| day.to_string());

        for (idx, day_str) in sorted_days.iter().enumerate().skip(start_pos) {
            let lookup_key = stats::make_sess_day_key(session_id, day_str);
            let mut current_day_diffs: Vec<FileDiff> = cached
                .session_day_union_diffs
                .get(&lookup_key)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default();

            let d_stat = cached.stats.per_day.entry(day_str.clone()).or_default();
            let s_arc = d_stat
                .sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(SessionStat::new(session_id.to_string())));
            let s = Arc::make_mut(s_arc);

            let is_continuation = *day_str != first_day;
            s.is_continuation = is_continuation;
            s.first_created_date = is_continuation.then(|| first_day.clone().into_boxed_str());
            s.original_session_id = is_continuation.then(|| session_id.into());

            if !is_continuation {
                if let Some(session_diffs) = cached.session_diff_map.get(session_id) {
                    s.file_diffs = session_diffs.clone();
                    sort_file_diffs(&mut s.file_diffs);
                    let (adds, dels) = cached
                        .session_diff_totals
                        .get(session_id)
                        .copied()
                        .unwrap_or_else(|| {
                            (
                                s.file_diffs.iter().map(|d| d.additions).sum(),
                                s.file_diffs.iter().map(|d| d.deletions).sum(),
                            )
                        });
                    s.diffs.additions = adds;
                    s.diffs.deletions = dels;
                } else {
                    sort_file_diffs(&mut current_day_diffs);
                    s.diffs.additions = current_day_diffs.iter().map(|d| d.additions).sum();
                    s.diffs.deletions = current_day_diffs.iter().map(|d| d.deletions).sum();
                    s.file_diffs = current_day_diffs;
                }
            } else {
                let mut diffs = current_day_diffs;
                sort_file_diffs(&mut diffs);
                if idx > 0 {
                    let prev_key = stats::make_sess_day_key(session_id, &sorted_days[idx - 1]);
                    if let Some(prev_map) = cached.session_day_union_diffs.get(&prev_key) {
                        let mut prev_vec: Vec<FileDiff> = prev_map.values().cloned().collect();
                        sort_file_diffs(&mut prev_vec);
                        diffs = compute_incremental_diffs(&diffs, &prev_vec);
                    }
                }
                s.diffs.additions = diffs.iter().map(|d| d.additions).sum();
                s.diffs.deletions = diffs.iter().map(|d| d.deletions).sum();
                s.file_diffs = diffs;
            }

            d_stat.diffs.additions = d_stat.sessions.values().map(|ss| ss.diffs.additions).sum();
            d_stat.diffs.deletions = d_stat.sessions.values().map(|ss| ss.diffs.deletions).sum();
        }
    }

    /// An updated `session_diff/<id>.json`: replace the session's final
    /// state and re-derive day and global totals.
    fn apply_session_diff_update(&self, cached: &mut CachedStats, path: &str) -> Option<String> {
        let p = Path::new(path);
        let session_id = p.file_stem()?.to_str()?.to_string();

        let bytes = fs::read(path).ok()?;
        let entries: Vec<crate::storage::SessionDiffEntry> = serde_json::from_slice(&bytes).ok()?;
        let mut diffs: Vec<FileDiff> = entries
            .into_iter()
            .map(stats::file_diff_from_entry)
            .collect();
        sort_file_diffs(&mut diffs);

        let adds: u64 = diffs.iter().map(|d| d.additions).sum();
        let dels: u64 = diffs.iter().map(|d| d.deletions).sum();

        if let Some(&(old_adds, old_dels)) = cached.session_diff_totals.get(&session_id) {
            cached.stats.totals.diffs.additions =
                cached.stats.totals.diffs.additions.saturating_sub(old_adds);
            cached.stats.totals.diffs.deletions =
                cached.stats.totals.diffs.deletions.saturating_sub(old_dels);
        }
        cached.stats.totals.diffs.additions += adds;
        cached.stats.totals.diffs.deletions += dels;

        cached
            .session_diff_map
            .insert(session_id.clone(), diffs.clone());
        cached
            .session_diff_totals
            .insert(session_id.clone(), (adds, dels));

        for day_stat in cached.stats.per_day.values_mut() {
            if let Some(s_arc) = day_stat.sessions.get_mut(&session_id) {
                let s = Arc::make_mut(s_arc);
                if !s.is_continuation {
                    s.file_diffs = diffs.clone();
                    s.diffs.additions = adds;
                    s.diffs.deletions = dels;
                }
                day_stat.diffs.additions =
                    day_stat.sessions.values().map(|ss| ss.diffs.additions).sum();
                day_stat.diffs.deletions =
                    day_stat.sessions.values().map(|ss| ss.diffs.deletions).sum();
            }
        }

        Some(session_id)
    }
}

/// An updated `session/<id>.json`: refresh the title and learn new parent
/// links.
fn apply_session_record_update(cached: &mut CachedStats, path: &str) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    let record: SessionRecord = serde_json::from_slice(&bytes).ok()?;

    let session_id: Box<str> = record
        .id
        .map(|s| s.0)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            Path::new(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        })
        .into_boxed_str();
    if session_id.is_empty() {
        return None;
    }

    let title = record.title.map(|s| s.0).unwrap_or_default();
    cached
        .stats
        .session_titles
        .insert(session_id.clone(), title);

    if let Some(pid) = record.parent_id.filter(|p| !p.0.is_empty()) {
        let parent_id: Box<str> = pid.0.into_boxed_str();
        if !cached.parent_map.contains_key(&session_id) {
            cached.parent_map.insert(session_id.clone(), parent_id.clone());
            cached
                .stats
                .parent_map
                .insert(session_id.clone(), parent_id.clone());
            let children = cached.children_map.entry(parent_id.clone()).or_default();
            if !children.contains(&session_id) {
                children.push(session_id.clone());
            }
            let stats_children = cached.stats.children_map.entry(parent_id).or_default();
            if !stats_children.contains(&session_id) {
                stats_children.push(session_id.clone());
            }
        }
    }

    Some(session_id.into_string())
}

/// A new part file only moves tool counters; diff totals stay owned by the
/// session_diff channel.
fn apply_part_update(stats: &mut Stats, path: &str) {
    let Ok(bytes) = fs::read(path) else {
        return;
    };
    let Ok(part) = serde_json::from_slice::<PartRecord>(&bytes) else {
        return;
    };
    if part.part_type.as_deref() == Some("tool") {
        if let Some(tool) = &part.tool {
            *stats.totals.tools.entry(tool.clone().into()).or_insert(0) += 1;
        }
    }
}

fn extract_cumulative_diffs(msg: &MessageRecord) -> Vec<FileDiff> {
    msg.summary
        .as_ref()
        .and_then(|s| s.diffs.as_ref())
        .map(|d| stats::file_diffs_from_summary(d))
        .unwrap_or_default()
}

/// One pass over all message files to seed the per-session-day diff unions,
/// the day lists and the per-message contribution ledger.
#[allow(clippy::type_complexity)]
fn build_session_day_state(
    files: &[PathBuf],
) -> (
    SessionDiffUnion,
    HashMap<String, Vec<String>>,
    HashMap<String, (f64, Tokens, i64)>,
) {
    let mut union: SessionDiffUnion = HashMap::new();
    let mut session_sorted_days: HashMap<String, Vec<String>> = HashMap::new();
    let mut message_contributions: HashMap<String, (f64, Tokens, i64)> = HashMap::new();
    let mut processed_ids: HashSet<Box<str>> = HashSet::with_capacity(files.len());

    let mut messages: Vec<(MessageRecord, PathBuf)> = files
        .iter()
        .filter_map(|p| {
            let bytes = fs::read(p).ok()?;
            let msg: MessageRecord = serde_json::from_slice(&bytes).ok()?;
            Some((msg, p.clone()))
        })
        .collect();

    messages.sort_unstable_by_key(|(m, _)| {
        m.time
            .as_ref()
            .and_then(|t| t.created.map(|v| *v))
            .unwrap_or(0)
    });

    for (msg, path) in messages {
        let message_id: Box<str> = match msg.id.clone() {
            Some(id) if !id.0.is_empty() => id.0.into_boxed_str(),
            _ => path.to_string_lossy().to_string().into_boxed_str(),
        };
        if !processed_ids.insert(message_id.clone()) {
            continue;
        }

        let session_id = msg
            .session_id
            .as_ref()
            .map(|s| s.0.clone())
            .unwrap_or_default();
        if session_id.is_empty() {
            continue;
        }
        let ts = msg.time.as_ref().and_then(|t| t.created.map(|v| *v));
        let day = get_day(ts);

        let days = session_sorted_days.entry(session_id.clone()).or_default();
        if days.binary_search(&day).is_err() {
            days.push(day.clone());
            days.sort_unstable();
        }

        let cost = msg.cost.as_ref().map(|c| **c).unwrap_or(0.0);
        let tokens = stats::tokens_from(&msg.tokens);

        let mut duration = 0;
        if msg.role.as_ref().map(|r| r.0.as_str()) == Some("assistant") {
            if let Some(t) = &msg.time {
                if let (Some(created), Some(completed)) = (t.created, t.completed) {
                    if *completed > *created {
                        duration = *completed - *created;
                    }
                }
            }
        }
        message_contributions.insert(message_id.to_string(), (cost, tokens, duration));

        let diffs = extract_cumulative_diffs(&msg);
        if diffs.is_empty() {
            continue;
        }
        let key = stats::make_sess_day_key(&session_id, &day);
        let file_map = union.entry(key).or_default();
        for d in diffs {
            if d.path.is_empty() {
                continue;
            }
            file_map.insert(d.path.to_string(), d);
        }
    }

    (union, session_sorted_days, message_contributions)
}

fn file_mtime(meta: &fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn message_json(id: &str, session: &str, role: &str, created: i64, input: u64, cost: f64) -> String {
        format!(
            r#"{{
                "id": "{id}",
                "sessionID": "{session}",
                "role": "{role}",
                "time": {{"created": {created}, "completed": {}}},
                "tokens": {{"input": {input}, "output": 0}},
                "cost": {cost}
            }}"#,
            created + 1000
        )
    }

    fn fixture() -> (tempfile::TempDir, StatsCache) {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StoragePaths::discover(Some(&tmp.path().join("storage")));
        let cache =
            StatsCache::with_cache_path(storage, tmp.path().join("cache/stats-cache.json"))
                .unwrap();
        (tmp, cache)
    }

    #[test]
    fn test_load_or_compute_empty() {
        let (_tmp, cache) = fixture();
        let stats = cache.load_or_compute();
        assert_eq!(stats.totals.messages, 0);
    }

    #[test]
    fn test_load_or_compute_reuses_fresh_cache() {
        let (tmp, cache) = fixture();
        let base = 1_700_000_000_000i64;
        let msg_path = tmp.path().join("storage/message/ses_a/msg_1.json");
        write(&msg_path, &message_json("msg_1", "ses_a", "assistant", base, 100, 0.5));

        let first = cache.load_or_compute();
        assert_eq!(first.totals.messages, 1);

        let second = cache.load_or_compute();
        assert_eq!(second.totals.messages, 1);
        assert_eq!(second.totals.tokens.input, 100);
    }

    #[test]
    fn test_update_files_new_message() {
        let (tmp, cache) = fixture();
        let base = 1_700_000_000_000i64;
        let first = tmp.path().join("storage/message/ses_a/msg_1.json");
        write(&first, &message_json("msg_1", "ses_a", "user", base, 0, 0.0));
        cache.load_or_compute();

        let second = tmp.path().join("storage/message/ses_a/msg_2.json");
        write(&second, &message_json("msg_2", "ses_a", "assistant", base + 5000, 200, 1.0));

        let update = cache.update_files(vec![second.to_string_lossy().into_owned()]);
        assert!(update.affected_sessions.contains("ses_a"));
        assert_eq!(update.totals.messages, 2);
        assert_eq!(update.totals.tokens.input, 200);
        assert!((update.totals.cost - 1.0).abs() < 1e-9);
        assert_eq!(update.model_usage.len(), 1);
    }

    #[test]
    fn test_update_files_rewritten_message_replaces_contribution() {
        let (tmp, cache) = fixture();
        let base = 1_700_000_000_000i64;
        let path = tmp.path().join("storage/message/ses_a/msg_1.json");
        write(&path, &message_json("msg_1", "ses_a", "assistant", base, 100, 0.5));
        cache.load_or_compute();

        write(&path, &message_json("msg_1", "ses_a", "assistant", base, 300, 0.9));
        let update = cache.update_files(vec![path.to_string_lossy().into_owned()]);

        assert_eq!(update.totals.messages, 1);
        assert_eq!(update.totals.tokens.input, 300);
        assert!((update.totals.cost - 0.9).abs() < 1e-9);
        let day = update.per_day.values().next().unwrap();
        assert_eq!(day.tokens.input, 300);
    }

    #[test]
    fn test_update_files_session_diff_replaces_totals() {
        let (tmp, cache) = fixture();
        let base = 1_700_000_000_000i64;
        write(
            &tmp.path().join("storage/message/ses_a/msg_1.json"),
            &message_json("msg_1", "ses_a", "assistant", base, 10, 0.1),
        );
        let diff_path = tmp.path().join("storage/session_diff/ses_a.json");
        write(
            &diff_path,
            r#"[{"file": "a.rs", "additions": 4, "deletions": 1, "status": "modified"}]"#,
        );
        cache.load_or_compute();

        write(
            &diff_path,
            r#"[{"file": "a.rs", "additions": 9, "deletions": 3, "status": "modified"}]"#,
        );
        let update = cache.update_files(vec![diff_path.to_string_lossy().into_owned()]);
        assert!(update.affected_sessions.contains("ses_a"));
        assert_eq!(update.totals.diffs.additions, 9);
        assert_eq!(update.totals.diffs.deletions, 3);
        let day = update.per_day.values().next().unwrap();
        assert_eq!(day.sessions["ses_a"].diffs.additions, 9);
    }

    #[test]
    fn test_update_files_deletion_triggers_recompute() {
        let (tmp, cache) = fixture();
        let base = 1_700_000_000_000i64;
        let keep = tmp.path().join("storage/message/ses_a/msg_1.json");
        let gone = tmp.path().join("storage/message/ses_a/msg_2.json");
        write(&keep, &message_json("msg_1", "ses_a", "user", base, 0, 0.0));
        write(&gone, &message_json("msg_2", "ses_a", "assistant", base + 100, 50, 0.2));
        cache.load_or_compute();

        fs::remove_file(&gone).unwrap();
        let update = cache.update_files(vec![gone.to_string_lossy().into_owned()]);
        assert_eq!(update.totals.messages, 1);
        assert_eq!(update.totals.tokens.input, 0);
    }

    #[test]
    fn test_session_record_update_sets_title_and_parent() {
        let (tmp, cache) = fixture();
        cache.load_or_compute();
        let path = tmp.path().join("storage/session/ses_b.json");
        write(
            &path,
            r#"{"id": "ses_b", "title": "new child", "parentID": "ses_a"}"#,
        );
        let update = cache.update_files(vec![path.to_string_lossy().into_owned()]);
        assert!(update.affected_sessions.contains("ses_b"));
        assert_eq!(
            update.session_titles.get("ses_b").map(String::as_str),
            Some("new child")
        );
        assert_eq!(update.parent_map.get("ses_b").map(AsRef::as_ref), Some("ses_a"));
    }
}
