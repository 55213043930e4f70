//! Full scan of the storage tree into a [`Stats`] aggregate.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::storage::{DiffItem, MessageRecord, PartRecord, SessionDiffEntry, StoragePaths};

use super::diffs::{compute_incremental_diffs, merge_intervals_duration, sort_file_diffs};
use super::{
    get_day, get_model_id, local_hour, make_sess_day_key, tokens_from, AgentInfo, DayStat,
    FileDiff, ModelUsage, SessionStat, Stats, Tokens, Totals,
};

pub(crate) fn load_message_from_path(path: &std::path::Path) -> Option<MessageRecord> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub(crate) fn file_diff_from_entry(item: SessionDiffEntry) -> FileDiff {
    FileDiff {
        path: item
            .file
            .map(|s| s.0)
            .unwrap_or_else(|| "unknown".into())
            .into_boxed_str(),
        additions: item.additions.map(|v| *v).unwrap_or(0),
        deletions: item.deletions.map(|v| *v).unwrap_or(0),
        status: item
            .status
            .map(|s| s.0)
            .unwrap_or_else(|| "modified".into())
            .into_boxed_str(),
    }
}

pub(crate) fn file_diffs_from_summary(items: &[DiffItem]) -> Vec<FileDiff> {
    items
        .iter()
        .map(|d| FileDiff {
            path: d
                .file
                .as_ref()
                .map(|s| s.0.clone())
                .unwrap_or_default()
                .into_boxed_str(),
            additions: d.additions.map(|v| *v).unwrap_or(0),
            deletions: d.deletions.map(|v| *v).unwrap_or(0),
            status: d
                .status
                .as_ref()
                .map(|s| s.0.clone())
                .unwrap_or_else(|| "modified".into())
                .into_boxed_str(),
        })
        .collect()
}

/// Per-session final diff state from `session_diff/`, sorted.
pub fn load_session_diff_map(paths: &StoragePaths) -> HashMap<String, Vec<FileDiff>> {
    paths
        .load_session_diff_entries()
        .into_iter()
        .map(|(id, entries)| {
            let mut diffs: Vec<FileDiff> = entries.into_iter().map(file_diff_from_entry).collect();
            sort_file_diffs(&mut diffs);
            (id, diffs)
        })
        .collect()
}

/// Summed additions and deletions per session.
pub fn session_diff_totals(
    session_diff_map: &HashMap<String, Vec<FileDiff>>,
) -> HashMap<String, (u64, u64)> {
    session_diff_map
        .iter()
        .map(|(id, diffs)| {
            let adds: u64 = diffs.iter().map(|d| d.additions).sum();
            let dels: u64 = diffs.iter().map(|d| d.deletions).sum();
            (id.clone(), (adds, dels))
        })
        .collect()
}

/// Flatten a parent chain to its root session, cycle-capped.
pub(crate) fn resolve_parent_map(
    parent_map: &HashMap<Box<str>, Box<str>>,
) -> HashMap<Box<str>, Box<str>> {
    let mut resolved = HashMap::with_capacity(parent_map.len());
    for child in parent_map.keys() {
        let mut cur = child.clone();
        let mut depth = 0;
        while let Some(p) = parent_map.get(&cur) {
            cur = p.clone();
            depth += 1;
            if depth > 20 {
                break;
            }
        }
        resolved.insert(child.clone(), cur);
    }
    resolved
}

struct LoadedMessage {
    msg: MessageRecord,
    tools: Vec<Box<str>>,
    parts: Vec<PartRecord>,
    path: PathBuf,
    message_id: Box<str>,
    cumulative_diffs: Vec<FileDiff>,
}

/// Scan every message, part, session and session_diff file and build the
/// aggregate from scratch.
pub fn collect_stats(paths: &StoragePaths) -> Stats {
    let mut totals = Totals::default();
    let index = paths.load_session_index();
    let session_titles = index.titles;
    let parent_map = resolve_parent_map(&index.parents);

    let mut children_map: HashMap<Box<str>, Vec<Box<str>>> = HashMap::new();
    for (child, parent) in &parent_map {
        children_map
            .entry(parent.clone())
            .or_default()
            .push(child.clone());
    }

    let session_diff_map = load_session_diff_map(paths);
    let msg_files = paths.list_message_files();
    debug!(files = msg_files.len(), "scanning message files");

    let mut per_day: HashMap<String, DayStat> = HashMap::new();
    let mut model_stats: HashMap<Box<str>, ModelUsage> = HashMap::new();
    let mut session_message_files: HashMap<String, HashSet<PathBuf>> = HashMap::new();
    let mut processed_message_ids: HashSet<Box<str>> = HashSet::with_capacity(msg_files.len());
    let mut session_first_days: HashMap<String, String> = HashMap::new();

    let mut processed_data: Vec<LoadedMessage> = msg_files
        .into_iter()
        .filter_map(|path| {
            let msg = load_message_from_path(&path)?;
            let message_id: Box<str> = match &msg.id {
                Some(id) if !id.0.is_empty() => id.0.clone().into_boxed_str(),
                _ => path.to_string_lossy().to_string().into_boxed_str(),
            };
            let parts = match &msg.id {
                Some(id) if !id.0.is_empty() => paths.load_parts(&id.0),
                _ => Vec::new(),
            };
            let tools: Vec<Box<str>> = parts
                .iter()
                .filter(|p| p.part_type.as_deref() == Some("tool"))
                .filter_map(|p| p.tool.as_ref().map(|t| t.as_str().into()))
                .collect();
            let cumulative_diffs = msg
                .summary
                .as_ref()
                .and_then(|s| s.diffs.as_ref())
                .map(|d| file_diffs_from_summary(d))
                .unwrap_or_default();
            Some(LoadedMessage {
                msg,
                tools,
                parts,
                path,
                message_id,
                cumulative_diffs,
            })
        })
        .collect();

    processed_data.sort_unstable_by_key(|d| {
        d.msg
            .time
            .as_ref()
            .and_then(|t| t.created.map(|v| *v))
            .unwrap_or(0)
    });

    // Per-file cumulative diff state per session-day.
    let mut session_day_union_diffs: HashMap<String, HashMap<Box<str>, FileDiff>> = HashMap::new();

    let mut session_overall_start: HashMap<Box<str>, i64> = HashMap::new();
    let mut session_day_intervals: HashMap<String, Vec<(i64, i64)>> = HashMap::new();
    let mut agent_intervals: HashMap<String, Vec<(i64, i64)>> = HashMap::new();

    for data in processed_data {
        if !processed_message_ids.insert(data.message_id) {
            continue;
        }

        let msg = &data.msg;
        let session_id: Box<str> = msg
            .session_id
            .as_ref()
            .map(|s| s.0.as_str())
            .unwrap_or_default()
            .into();

        // Subagent sessions roll up into their root session.
        let effective_session_id: Box<str> = parent_map
            .get(&session_id)
            .cloned()
            .unwrap_or_else(|| session_id.clone());
        let is_subagent_msg = parent_map.contains_key(&session_id);

        let agent_name: Box<str> = msg
            .agent
            .as_ref()
            .filter(|a| !a.0.is_empty())
            .map(|a| a.0.clone().into_boxed_str())
            .unwrap_or_else(|| "unknown".into());

        if !session_id.is_empty() {
            session_message_files
                .entry(session_id.to_string())
                .or_default()
                .insert(data.path);
        }

        let ts_val = msg.time.as_ref().and_then(|t| t.created.map(|v| *v));
        let day = get_day(ts_val);

        let role = msg.role.as_ref().map(|s| s.0.as_str()).unwrap_or("");
        let is_user = role == "user";
        let is_assistant = role == "assistant";
        let model_id = get_model_id(msg);
        let cost = msg.cost.as_ref().map(|c| **c).unwrap_or(0.0);

        let mut msg_tokens = tokens_from(&msg.tokens);

        // Providers that never report reasoning tokens still ship reasoning
        // parts; approximate at four chars per token.
        if msg_tokens.reasoning == 0 && is_assistant {
            let reasoning_chars: usize = data
                .parts
                .iter()
                .filter(|p| p.part_type.as_deref() == Some("reasoning"))
                .filter_map(|p| p.text.as_ref().map(|t| t.len()))
                .sum();
            if reasoning_chars > 0 {
                msg_tokens.reasoning = (reasoning_chars / 4) as u64;
            }
        }

        if !effective_session_id.is_empty()
            && !session_first_days.contains_key(effective_session_id.as_ref())
        {
            session_first_days.insert(effective_session_id.to_string(), day.clone());
        }

        if !effective_session_id.is_empty() {
            totals.sessions.insert(effective_session_id.clone());
        }
        totals.messages += 1;
        if is_user && !is_subagent_msg {
            totals.prompts += 1;
        }
        totals.cost += cost;
        totals.tokens.add(&msg_tokens);

        if is_assistant {
            let model_entry = model_stats
                .entry(model_id.clone())
                .or_insert_with(|| ModelUsage::new(model_id.clone()));
            model_entry.messages += 1;
            if !effective_session_id.is_empty() {
                model_entry.sessions.insert(effective_session_id.clone());
            }
            model_entry.cost += cost;
            model_entry.tokens.add(&msg_tokens);
            *model_entry.daily_tokens.entry(day.clone()).or_insert(0) += msg_tokens.total();
            if let Some(hour) = ts_val.and_then(local_hour) {
                model_entry.daily_last_hour.insert(day.clone(), hour);
            }
            if let Some(agent) = msg
                .agent
                .as_ref()
                .map(|s| s.0.as_str())
                .filter(|s| !s.is_empty())
            {
                *model_entry
                    .agents
                    .entry(agent.to_string().into_boxed_str())
                    .or_insert(0) += 1;
            }
        }

        let day_stat = per_day.entry(day.clone()).or_default();
        day_stat.messages += 1;
        if is_user && !is_subagent_msg {
            day_stat.prompts += 1;
        }
        day_stat.cost += cost;
        day_stat.tokens.add(&msg_tokens);

        let session_stat_arc = match day_stat.sessions.entry(effective_session_id.to_string()) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let mut stat = SessionStat::new(effective_session_id.clone());
                if !effective_session_id.is_empty() {
                    if let Some(first_day) = session_first_days.get(effective_session_id.as_ref()) {
                        if first_day != &day {
                            stat.original_session_id = Some(effective_session_id.clone());
                            stat.first_created_date =
                                Some(first_day.clone().into_boxed_str());
                            stat.is_continuation = true;
                        }
                    }
                }
                e.insert(Arc::new(stat))
            }
        };

        let session_stat = Arc::make_mut(session_stat_arc);
        session_stat.messages += 1;
        if is_user && !is_subagent_msg {
            session_stat.prompts += 1;
        }
        session_stat.cost += cost;
        if is_assistant {
            session_stat.models.insert(model_id.clone());
        }
        session_stat.tokens.add(&msg_tokens);
        if let Some(t) = ts_val {
            if t < session_stat.first_activity {
                session_stat.first_activity = t;
            }
            let start_entry = session_overall_start
                .entry(effective_session_id.clone())
                .or_insert(t);
            if t < *start_entry {
                *start_entry = t;
            }
        }
        let end_ts = msg
            .time
            .as_ref()
            .and_then(|t| t.completed.map(|v| *v))
            .or(ts_val);
        if let Some(t) = end_ts {
            if t > session_stat.last_activity {
                session_stat.last_activity = t;
            }
        }

        if is_assistant {
            if let (Some(created), Some(completed)) = (ts_val, end_ts) {
                if completed > created {
                    session_day_intervals
                        .entry(make_sess_day_key(effective_session_id.as_ref(), &day))
                        .or_default()
                        .push((created, completed));
                    agent_intervals
                        .entry(format!("{}|{}|{}", effective_session_id, day, agent_name))
                        .or_default()
                        .push((created, completed));
                }
            }
        }

        let agent_entry = session_stat
            .agents
            .iter_mut()
            .find(|a| *a.name == *agent_name);
        if let Some(agent) = agent_entry {
            agent.messages += 1;
            agent.tokens.add(&msg_tokens);
            if is_assistant {
                agent.models.insert(model_id.clone());
            }
            if let Some(t) = ts_val {
                if t < agent.first_activity {
                    agent.first_activity = t;
                }
            }
            if let Some(t) = end_ts {
                if t > agent.last_activity {
                    agent.last_activity = t;
                }
            }
        } else {
            let mut models = HashSet::new();
            if is_assistant {
                models.insert(model_id.clone());
            }
            session_stat.agents.push(AgentInfo {
                name: agent_name.clone(),
                is_main: !is_subagent_msg,
                models,
                messages: 1,
                tokens: msg_tokens,
                first_activity: ts_val.unwrap_or(i64::MAX),
                last_activity: end_ts.unwrap_or(0),
                active_duration_ms: 0,
            });
        }

        for t in data.tools {
            *totals.tools.entry(t.clone()).or_insert(0) += 1;
            *session_stat.tools.entry(t.clone()).or_insert(0) += 1;
            if is_assistant {
                if let Some(model_entry) = model_stats.get_mut(&model_id) {
                    *model_entry.tools.entry(t).or_insert(0) += 1;
                }
            }
        }

        if let Some(p) = &msg.path {
            if let Some(cwd) = &p.cwd {
                session_stat.path_cwd = cwd.clone().into();
            }
            if let Some(root) = &p.root {
                session_stat.path_root = root.clone().into();
            }
        }

        if !effective_session_id.is_empty() {
            let file_map = session_day_union_diffs
                .entry(make_sess_day_key(effective_session_id.as_ref(), &day))
                .or_default();
            for d in data.cumulative_diffs {
                if !d.path.is_empty() {
                    file_map.insert(d.path.clone(), d);
                }
            }
        }
    }

    for (key, mut intervals) in session_day_intervals {
        let merged_dur = merge_intervals_duration(&mut intervals);
        if let Some((session_id, day_str)) = key.split_once('|') {
            if let Some(day_stat) = per_day.get_mut(day_str) {
                if let Some(sess_arc) = day_stat.sessions.get_mut(session_id) {
                    Arc::make_mut(sess_arc).active_duration_ms = merged_dur;
                }
            }
        }
    }

    for (key, mut intervals) in agent_intervals {
        let merged_dur = merge_intervals_duration(&mut intervals);
        let mut parts = key.splitn(3, '|');
        let (Some(session_id), Some(day_str), Some(agent_name)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        if let Some(day_stat) = per_day.get_mut(day_str) {
            if let Some(sess_arc) = day_stat.sessions.get_mut(session_id) {
                let sess = Arc::make_mut(sess_arc);
                if let Some(agent) = sess.agents.iter_mut().find(|a| *a.name == *agent_name) {
                    agent.active_duration_ms = merged_dur;
                }
            }
        }
    }

    let precomputed_diff_totals = session_diff_totals(&session_diff_map);

    // Sorted day list per session, for looking up the previous day's
    // cumulative state of continuation sessions.
    let mut session_sorted_days: HashMap<String, Vec<String>> = HashMap::new();
    for key in session_day_union_diffs.keys() {
        if let Some((session_id, day)) = key.split_once('|') {
            session_sorted_days
                .entry(session_id.to_string())
                .or_default()
                .push(day.to_string());
        }
    }
    for days in session_sorted_days.values_mut() {
        days.sort_unstable();
    }

    let mut counted_session_diffs: HashSet<String> = HashSet::new();

    for (day_str, day_stat) in per_day.iter_mut() {
        for sess_arc in day_stat.sessions.values_mut() {
            let sess_id: String = sess_arc.id.to_string();
            let sess = Arc::make_mut(sess_arc);

            if let Some(&overall_start) = session_overall_start.get(sess.id.as_ref()) {
                if overall_start < sess.first_activity {
                    sess.first_activity = overall_start;
                }
            }

            let lookup_key = make_sess_day_key(&sess_id, day_str);
            let current_day_diffs: Option<Vec<FileDiff>> = session_day_union_diffs
                .get(&lookup_key)
                .map(|m| m.values().cloned().collect());

            if !sess.is_continuation {
                // Single-day session: the session_diff file is the
                // authoritative final state, message unions the fallback.
                if let Some(session_diffs) = session_diff_map.get(sess_id.as_str()) {
                    sess.file_diffs = session_diffs.clone();
                    sort_file_diffs(&mut sess.file_diffs);
                    if let Some(&(adds, dels)) = precomputed_diff_totals.get(sess_id.as_str()) {
                        sess.diffs.additions = adds;
                        sess.diffs.deletions = dels;
                    }
                } else if let Some(mut diffs) = current_day_diffs {
                    sort_file_diffs(&mut diffs);
                    sess.diffs.additions = diffs.iter().map(|d| d.additions).sum();
                    sess.diffs.deletions = diffs.iter().map(|d| d.deletions).sum();
                    sess.file_diffs = diffs;
                }
            } else if let Some(mut diffs) = current_day_diffs {
                // Continuation day: subtract the previous day's cumulative
                // state so each day only claims its own line changes.
                if let Some(sorted_days) = session_sorted_days.get(sess_id.as_str()) {
                    if let Some(pos) = sorted_days.iter().position(|d| d == day_str) {
                        if pos > 0 {
                            let prev_key = make_sess_day_key(&sess_id, &sorted_days[pos - 1]);
                            if let Some(prev_map) = session_day_union_diffs.get(&prev_key) {
                                let mut prev_vec: Vec<FileDiff> =
                                    prev_map.values().cloned().collect();
                                sort_file_diffs(&mut prev_vec);
                                sort_file_diffs(&mut diffs);
                                diffs = compute_incremental_diffs(&diffs, &prev_vec);
                            }
                        }
                    }
                }

                sort_file_diffs(&mut diffs);
                sess.diffs.additions = diffs.iter().map(|d| d.additions).sum();
                sess.diffs.deletions = diffs.iter().map(|d| d.deletions).sum();
                sess.file_diffs = diffs;
            }

            day_stat.diffs.additions += sess.diffs.additions;
            day_stat.diffs.deletions += sess.diffs.deletions;

            // Global totals count each session's final state exactly once.
            if counted_session_diffs.insert(sess_id.clone()) {
                if let Some(&(adds, dels)) = precomputed_diff_totals.get(sess_id.as_str()) {
                    totals.diffs.additions += adds;
                    totals.diffs.deletions += dels;
                }
            }
        }
    }

    let mut model_usage: Vec<ModelUsage> = model_stats.into_values().collect();
    model_usage.sort_unstable_by(|a, b| b.tokens.total().cmp(&a.tokens.total()));

    for day_stat in per_day.values_mut() {
        for sess_arc in day_stat.sessions.values_mut() {
            sort_agents(&mut Arc::make_mut(sess_arc).agents);
        }
    }

    Stats {
        totals,
        per_day,
        session_titles,
        model_usage,
        session_message_files,
        processed_message_ids,
        parent_map,
        children_map,
    }
}

/// Main agent first, then alphabetical.
pub(crate) fn sort_agents(agents: &mut [AgentInfo]) {
    agents.sort_by(|a, b| {
        b.is_main
            .cmp(&a.is_main)
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn message_json(
        id: &str,
        session: &str,
        role: &str,
        created: i64,
        completed: i64,
        input: u64,
        output: u64,
        cost: f64,
    ) -> String {
        format!(
            r#"{{
                "id": "{id}",
                "sessionID": "{session}",
                "role": "{role}",
                "time": {{"created": {created}, "completed": {completed}}},
                "tokens": {{"input": {input}, "output": {output}}},
                "cost": {cost}
            }}"#
        )
    }

    fn fixture() -> (tempfile::TempDir, StoragePaths) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StoragePaths::discover(Some(tmp.path()));
        (tmp, paths)
    }

    #[test]
    fn test_collect_stats_empty_tree() {
        let (_tmp, paths) = fixture();
        let stats = collect_stats(&paths);
        assert_eq!(stats.totals.messages, 0);
        assert!(stats.per_day.is_empty());
    }

    #[test]
    fn test_collect_stats_counts_messages_and_tokens() {
        let (_tmp, paths) = fixture();
        let base = 1_700_000_000_000i64;
        write(
            &paths.message_dir().join("ses_a/msg_1.json"),
            &message_json("msg_1", "ses_a", "user", base, base, 0, 0, 0.0),
        );
        write(
            &paths.message_dir().join("ses_a/msg_2.json"),
            &message_json("msg_2", "ses_a", "assistant", base + 1000, base + 5000, 100, 50, 0.25),
        );

        let stats = collect_stats(&paths);
        assert_eq!(stats.totals.messages, 2);
        assert_eq!(stats.totals.prompts, 1);
        assert_eq!(stats.totals.tokens.input, 100);
        assert_eq!(stats.totals.tokens.output, 50);
        assert!((stats.totals.cost - 0.25).abs() < 1e-9);
        assert_eq!(stats.totals.sessions.len(), 1);
        assert_eq!(stats.per_day.len(), 1);

        let day = stats.per_day.values().next().unwrap();
        let sess = day.sessions.get("ses_a").unwrap();
        assert_eq!(sess.messages, 2);
        assert_eq!(sess.active_duration_ms, 4000);
        assert_eq!(stats.model_usage.len(), 1);
        assert_eq!(stats.model_usage[0].name.as_ref(), "unknown");
    }

    #[test]
    fn test_subagent_rolls_up_to_parent() {
        let (_tmp, paths) = fixture();
        let base = 1_700_000_000_000i64;
        write(
            &paths.session_dir().join("ses_parent.json"),
            r#"{"id": "ses_parent", "title": "parent"}"#,
        );
        write(
            &paths.session_dir().join("ses_child.json"),
            r#"{"id": "ses_child", "title": "child", "parentID": "ses_parent"}"#,
        );
        write(
            &paths.message_dir().join("ses_parent/msg_1.json"),
            &message_json("msg_1", "ses_parent", "user", base, base, 0, 0, 0.0),
        );
        // A user message inside the subagent session is not a prompt.
        write(
            &paths.message_dir().join("ses_child/msg_2.json"),
            &message_json("msg_2", "ses_child", "user", base + 100, base + 100, 0, 0, 0.0),
        );
        write(
            &paths.message_dir().join("ses_child/msg_3.json"),
            &message_json("msg_3", "ses_child", "assistant", base + 200, base + 900, 10, 5, 0.01),
        );

        let stats = collect_stats(&paths);
        assert_eq!(stats.totals.sessions.len(), 1);
        assert!(stats.totals.sessions.contains("ses_parent"));
        assert_eq!(stats.totals.prompts, 1);

        let day = stats.per_day.values().next().unwrap();
        assert_eq!(day.sessions.len(), 1);
        let sess = day.sessions.get("ses_parent").unwrap();
        assert_eq!(sess.messages, 3);
        assert_eq!(stats.parent_map.get("ses_child").map(AsRef::as_ref), Some("ses_parent"));
    }

    #[test]
    fn test_duplicate_message_ids_counted_once() {
        let (_tmp, paths) = fixture();
        let base = 1_700_000_000_000i64;
        let body = message_json("msg_1", "ses_a", "assistant", base, base + 100, 10, 10, 0.1);
        write(&paths.message_dir().join("ses_a/msg_1.json"), &body);
        write(&paths.message_dir().join("msg_1.json"), &body);

        let stats = collect_stats(&paths);
        assert_eq!(stats.totals.messages, 1);
    }

    #[test]
    fn test_reasoning_estimated_from_parts() {
        let (_tmp, paths) = fixture();
        let base = 1_700_000_000_000i64;
        write(
            &paths.message_dir().join("ses_a/msg_1.json"),
            &message_json("msg_1", "ses_a", "assistant", base, base + 100, 10, 10, 0.0),
        );
        let reasoning_text = "x".repeat(400);
        write(
            &paths.part_dir().join("msg_1/prt_1.json"),
            &format!(r#"{{"type": "reasoning", "text": "{reasoning_text}"}}"#),
        );

        let stats = collect_stats(&paths);
        assert_eq!(stats.totals.tokens.reasoning, 100);
    }

    #[test]
    fn test_session_diff_is_authoritative_for_single_day() {
        let (_tmp, paths) = fixture();
        let base = 1_700_000_000_000i64;
        write(
            &paths.message_dir().join("ses_a/msg_1.json"),
            &message_json("msg_1", "ses_a", "assistant", base, base + 100, 1, 1, 0.0),
        );
        write(
            &paths.session_diff_dir().join("ses_a.json"),
            r#"[
                {"file": "src/b.rs", "additions": 7, "deletions": 2, "status": "modified"},
                {"file": "src/a.rs", "additions": 3, "deletions": 0, "status": "added"}
            ]"#,
        );

        let stats = collect_stats(&paths);
        assert_eq!(stats.totals.diffs.additions, 10);
        assert_eq!(stats.totals.diffs.deletions, 2);

        let day = stats.per_day.values().next().unwrap();
        let sess = day.sessions.get("ses_a").unwrap();
        assert_eq!(sess.diffs.additions, 10);
        assert_eq!(sess.file_diffs[0].path.as_ref(), "src/b.rs");
        assert_eq!(sess.file_diffs[1].path.as_ref(), "src/a.rs");
    }

    #[test]
    fn test_tool_counts_recorded() {
        let (_tmp, paths) = fixture();
        let base = 1_700_000_000_000i64;
        write(
            &paths.message_dir().join("ses_a/msg_1.json"),
            &message_json("msg_1", "ses_a", "assistant", base, base + 100, 1, 1, 0.0),
        );
        write(
            &paths.part_dir().join("msg_1/prt_1.json"),
            r#"{"type": "tool", "tool": "bash"}"#,
        );
        write(
            &paths.part_dir().join("msg_1/prt_2.json"),
            r#"{"type": "tool", "tool": "bash"}"#,
        );

        let stats = collect_stats(&paths);
        assert_eq!(stats.totals.tools.get("bash").copied(), Some(2));
        assert_eq!(stats.model_usage[0].tools.get("bash").copied(), Some(2));
    }

    #[test]
    fn test_resolve_parent_map_chain() {
        let mut parents: HashMap<Box<str>, Box<str>> = HashMap::new();
        parents.insert("c".into(), "b".into());
        parents.insert("b".into(), "a".into());
        let resolved = resolve_parent_map(&parents);
        assert_eq!(resolved.get("c").map(AsRef::as_ref), Some("a"));
        assert_eq!(resolved.get("b").map(AsRef::as_ref), Some("a"));
    }

    #[test]
    fn test_sort_agents_main_first() {
        let mk = |name: &str, is_main: bool| AgentInfo {
            name: name.into(),
            is_main,
            models: HashSet::new(),
            messages: 0,
            tokens: Tokens::default(),
            first_activity: 0,
            last_activity: 0,
            active_duration_ms: 0,
        };
        let mut agents = vec![mk("zeta", false), mk("build", true), mk("alpha", false)];
        sort_agents(&mut agents);
        let names: Vec<&str> = agents.iter().map(|a| a.name.as_ref()).collect();
        assert_eq!(names, vec!["build", "alpha", "zeta"]);
    }
}
