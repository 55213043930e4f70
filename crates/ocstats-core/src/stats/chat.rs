//! Session transcript loading for the detail view.
//!
//! Tool calls get a compact one-line description from their recorded
//! inputs, and incremental per-message diffs are matched back onto the
//! tool calls that produced them.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::storage::{PartRecord, StoragePaths, ToolStateInput};

use super::collect::{file_diffs_from_summary, load_message_from_path};
use super::diffs::{compute_incremental_diffs, sort_file_diffs};
use super::{get_day, FileDiff};

const MAX_CHARS_PER_TEXT_PART: usize = 4000;

#[derive(Clone)]
pub struct ToolCallInfo {
    pub name: Box<str>,
    pub file_path: Option<Box<str>>,
    pub input: Option<Box<str>>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
}

#[derive(Clone)]
pub enum MessageContent {
    Text(Box<str>),
    ToolCall(ToolCallInfo),
    Thinking,
}

#[derive(Clone)]
pub struct ChatMessage {
    pub role: Box<str>,
    pub model: Option<Box<str>>,
    pub parts: Vec<MessageContent>,
    pub is_subagent: bool,
    pub agent_label: Option<Box<str>>,
}

/// Load a session's transcript, optionally restricted to one day and to
/// messages created strictly after `since_ts` (live-refresh of an open
/// transcript). Message files are taken from the cached per-session file
/// sets when available. Returns the messages and the newest `created`
/// timestamp seen, for use as the next cutoff.
pub fn load_session_chat(
    paths: &StoragePaths,
    session_id: &str,
    files: Option<&HashSet<PathBuf>>,
    day_filter: Option<&str>,
    since_ts: Option<i64>,
) -> (Vec<ChatMessage>, i64) {
    let candidates: Vec<PathBuf> = match files {
        Some(f) => f.iter().cloned().collect(),
        None => paths.list_message_files(),
    };
    let mut msgs: Vec<_> = candidates
        .iter()
        .filter_map(|p| {
            let msg = load_message_from_path(p)?;
            if files.is_none() && msg.session_id.as_ref().map(|s| s.as_str()) != Some(session_id) {
                return None;
            }
            let created = msg.time.as_ref().and_then(|t| t.created.map(|v| *v));
            if let Some(target_day) = day_filter {
                if get_day(created) != target_day {
                    return None;
                }
            }
            if let Some(cutoff) = since_ts {
                if created.unwrap_or(0) <= cutoff {
                    return None;
                }
            }
            Some(msg)
        })
        .map(|msg| (msg, false, None))
        .collect();
    merge_chat_messages(paths, &mut msgs)
}

/// Load a parent session's transcript together with its subagent children,
/// interleaved by timestamp and labelled by agent.
pub fn load_combined_session_chat(
    paths: &StoragePaths,
    parent_session_id: &str,
    children: &[(Box<str>, Box<str>)],
    session_message_files: &HashMap<String, HashSet<PathBuf>>,
    day_filter: Option<&str>,
    since_ts: Option<i64>,
) -> (Vec<ChatMessage>, i64) {
    let mut all_files: Vec<PathBuf> = session_message_files
        .get(parent_session_id)
        .map(|f| f.iter().cloned().collect())
        .unwrap_or_default();
    let child_agent_map: HashMap<&str, &str> = children
        .iter()
        .map(|(id, name)| (id.as_ref(), name.as_ref()))
        .collect();
    for (child_id, _) in children {
        if let Some(files) = session_message_files.get(child_id.as_ref()) {
            all_files.extend(files.iter().cloned());
        }
    }
    if all_files.is_empty() {
        return (Vec::new(), 0);
    }

    let mut msgs: Vec<_> = all_files
        .iter()
        .filter_map(|p| {
            let msg = load_message_from_path(p)?;
            let created = msg.time.as_ref().and_then(|t| t.created.map(|v| *v));
            if let Some(target_day) = day_filter {
                if get_day(created) != target_day {
                    return None;
                }
            }
            if let Some(cutoff) = since_ts {
                if created.unwrap_or(0) <= cutoff {
                    return None;
                }
            }
            let msg_session = msg.session_id.as_ref().map(|s| s.0.as_str()).unwrap_or("");
            let (is_sub, agent_lbl) = match child_agent_map.get(msg_session) {
                Some(agent_name) => (true, Some((*agent_name).to_string().into_boxed_str())),
                None => (false, None),
            };
            Some((msg, is_sub, agent_lbl))
        })
        .collect();
    merge_chat_messages(paths, &mut msgs)
}

type TaggedMessage = (crate::storage::MessageRecord, bool, Option<Box<str>>);

fn merge_chat_messages(
    paths: &StoragePaths,
    msgs: &mut Vec<TaggedMessage>,
) -> (Vec<ChatMessage>, i64) {
    msgs.sort_unstable_by_key(|(m, _, _)| {
        m.time
            .as_ref()
            .and_then(|t| t.created.map(|v| *v))
            .unwrap_or(0)
    });

    let mut max_ts: i64 = 0;
    let mut merged: Vec<ChatMessage> = Vec::with_capacity(msgs.len());
    let mut last_cumulative_diffs: Vec<FileDiff> = Vec::new();

    for (msg, is_sub, agent_lbl) in msgs.drain(..) {
        let created = msg
            .time
            .as_ref()
            .and_then(|t| t.created.map(|v| *v))
            .unwrap_or(0);
        if created > max_ts {
            max_ts = created;
        }

        let mut parts_vec = msg
            .id
            .as_ref()
            .filter(|id| !id.0.is_empty())
            .map(|id| parts_to_content(paths.load_parts(&id.0)))
            .unwrap_or_default();

        let current_cumulative: Vec<FileDiff> = msg
            .summary
            .as_ref()
            .and_then(|s| s.diffs.as_ref())
            .map(|diffs| {
                let mut v = file_diffs_from_summary(diffs);
                sort_file_diffs(&mut v);
                v
            })
            .unwrap_or_else(|| last_cumulative_diffs.clone());

        let incremental = compute_incremental_diffs(&current_cumulative, &last_cumulative_diffs);
        last_cumulative_diffs = current_cumulative;

        match_tool_calls_with_diffs(&mut parts_vec, &incremental);

        let role: Box<str> = msg
            .role
            .as_ref()
            .map(|s| s.as_str())
            .unwrap_or("unknown")
            .into();

        // Consecutive messages from the same speaker collapse into one
        // bubble.
        if let Some(last) = merged.last_mut() {
            if *last.role == *role && last.is_subagent == is_sub && last.agent_label == agent_lbl {
                last.parts.extend(parts_vec);
                continue;
            }
        }

        let full_model = match (
            msg.provider_id.as_ref().map(|s| s.0.clone()).or_else(|| {
                msg.model
                    .as_ref()
                    .and_then(|m| m.provider_id.as_ref().map(|s| s.0.clone()))
            }),
            msg.model_id.as_ref().map(|s| s.0.clone()).or_else(|| {
                msg.model
                    .as_ref()
                    .and_then(|m| m.model_id.as_ref().map(|s| s.0.clone()))
            }),
        ) {
            (Some(p), Some(m)) => Some(format!("{}/{}", p, m).into()),
            (None, Some(m)) => Some(m.into()),
            _ => None,
        };
        merged.push(ChatMessage {
            role,
            model: full_model,
            parts: parts_vec,
            is_subagent: is_sub,
            agent_label: agent_lbl,
        });
    }
    (merged, max_ts)
}

fn parts_to_content(parts: Vec<PartRecord>) -> Vec<MessageContent> {
    let mut result = Vec::with_capacity(parts.len());
    for part in parts {
        if part.part_type.as_deref() == Some("reasoning") {
            continue;
        }
        if part.thought.is_some() {
            result.push(MessageContent::Thinking);
        }
        let mut current_text: Option<Box<str>> = None;
        if let Some(t) = part.text {
            let truncated = truncate_string(&t, MAX_CHARS_PER_TEXT_PART);
            current_text = Some(truncated.clone());
            result.push(MessageContent::Text(truncated));
        }
        if let Some(tool) = part.tool {
            let state_input = part.state.as_ref().and_then(|s| s.input.as_ref());
            let fp: Option<Box<str>> = state_input
                .and_then(|i| infer_tool_file_path(&tool, i).map(|s| s.into_boxed_str()));
            let tool_detail = state_input
                .map(|i| build_tool_detail(&tool, i).into_boxed_str())
                .or(current_text);
            result.push(MessageContent::ToolCall(ToolCallInfo {
                name: tool.into(),
                file_path: fp,
                input: tool_detail,
                additions: None,
                deletions: None,
            }));
        }
    }
    result
}

/// Compact one-line description of a tool call from its input fields.
fn build_tool_detail(tool_name: &str, input: &ToolStateInput) -> String {
    let lower = tool_name.to_ascii_lowercase();
    match lower.as_str() {
        "read" => {
            let fp = input
                .file_path
                .as_deref()
                .or(input.path.as_deref())
                .unwrap_or("");
            let range_str = match (&input.offset, &input.limit) {
                (Some(off), Some(lim)) => {
                    format!(" (offset {}, limit {})", json_num(off), json_num(lim))
                }
                (Some(off), None) => format!(" (offset {})", json_num(off)),
                (None, Some(lim)) => format!(" (limit {})", json_num(lim)),
                _ => " (full file)".to_string(),
            };
            format!("{}{}", short_path(fp), range_str)
        }
        "bash" | "shell" | "exec" | "terminal" => {
            let cmd = input
                .command
                .as_deref()
                .or(input.description.as_deref())
                .unwrap_or("");
            cmd.lines().next().unwrap_or(cmd).to_string()
        }
        "grep" | "find" | "finder" => {
            let pat = input
                .pattern
                .as_deref()
                .or(input.query.as_deref())
                .unwrap_or("");
            match input.path.as_deref().or(input.file_path.as_deref()) {
                Some(p) => format!("`{}` in {}", pat, short_path(p)),
                None => format!("`{}`", pat),
            }
        }
        "edit" | "edit_file" => {
            let fp = input.file_path.as_deref().unwrap_or("");
            let old_hint = input.old_str.as_deref().and_then(first_nonempty_line);
            let new_hint = input.new_str.as_deref().and_then(first_nonempty_line);
            match (old_hint, new_hint) {
                (Some(o), Some(n)) => format!(
                    "{}  \"{}\"  \"{}\"",
                    short_path(fp),
                    truncate_inline(o, 24),
                    truncate_inline(n, 24)
                ),
                (Some(h), None) | (None, Some(h)) => {
                    format!("{}  \"{}\"", short_path(fp), truncate_inline(h, 36))
                }
                (None, None) => short_path(fp),
            }
        }
        "write" | "create" | "create_file" => {
            let fp = input.file_path.as_deref().unwrap_or("");
            if let Some(content) = input.content.as_deref().filter(|s| !s.is_empty()) {
                format!("{} ({} lines)", short_path(fp), content.lines().count().max(1))
            } else {
                short_path(fp)
            }
        }
        "apply_patch" | "patch" | "apply" | "apply_diff" => {
            if let Some(patch) = input.patch_text.as_deref().filter(|s| !s.is_empty()) {
                let files = extract_patch_files(patch);
                if files.is_empty() {
                    "patch".to_string()
                } else {
                    let shown: Vec<String> = files.iter().take(2).map(|f| short_path(f)).collect();
                    let more = files.len().saturating_sub(shown.len());
                    if more > 0 {
                        format!("patch {} (+{} more)", shown.join(", "), more)
                    } else {
                        format!("patch {}", shown.join(", "))
                    }
                }
            } else {
                "patch".to_string()
            }
        }
        "todowrite" => summarize_todos(input.todos.as_ref()),
        "task" => {
            let desc = input.description.as_deref().unwrap_or("");
            if desc.is_empty() {
                "task".to_string()
            } else {
                desc.to_string()
            }
        }
        _ => {
            // Generic fallback covers MCP and plugin tools.
            let mut parts = Vec::new();
            if let Some(fp) = &input.file_path {
                parts.push(short_path(fp));
            }
            if let Some(p) = &input.pattern {
                parts.push(format!("`{}`", p));
            }
            if let Some(q) = &input.query {
                parts.push(truncate_inline(q, 60));
            }
            if let Some(c) = &input.command {
                parts.push(c.lines().next().unwrap_or("").to_string());
            }
            if let Some(u) = &input.url {
                parts.push(truncate_inline(u, 50));
            }
            if let Some(ids) = &input.ids {
                parts.push(format!("{} items", ids.len()));
            }
            parts.join(" ")
        }
    }
}

fn json_num(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(arr) => {
            let nums: Vec<String> = arr.iter().map(json_num).collect();
            nums.join(", ")
        }
        _ => v.to_string(),
    }
}

/// Last two path components.
fn short_path(p: &str) -> String {
    let parts: Vec<&str> = p.rsplit('/').take(2).collect();
    if parts.len() >= 2 {
        format!("{}/{}", parts[1], parts[0])
    } else {
        p.to_string()
    }
}

fn truncate_inline(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        return s.to_string();
    }
    let target = max_chars.saturating_sub(1);
    let byte_pos = s
        .char_indices()
        .nth(target)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..byte_pos].to_string()
}

fn first_nonempty_line(s: &str) -> Option<&str> {
    s.lines().map(str::trim).find(|line| !line.is_empty())
}

fn summarize_todos(todos: Option<&serde_json::Value>) -> String {
    let Some(serde_json::Value::Array(items)) = todos else {
        return "todo update".to_string();
    };
    if items.is_empty() {
        return "todo update (0 items)".to_string();
    }

    let mut pending = 0usize;
    let mut in_progress = 0usize;
    let mut completed = 0usize;
    let mut cancelled = 0usize;
    let mut examples: Vec<String> = Vec::new();

    for item in items {
        let status = item
            .as_object()
            .and_then(|o| o.get("status"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        match status {
            "pending" => pending += 1,
            "in_progress" => in_progress += 1,
            "completed" => completed += 1,
            "cancelled" => cancelled += 1,
            _ => {}
        }

        if examples.len() < 2 {
            if let Some(content) = item
                .as_object()
                .and_then(|o| o.get("content"))
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
            {
                examples.push(truncate_inline(content, 32));
            }
        }
    }

    let mut counts = Vec::new();
    if in_progress > 0 {
        counts.push(format!("{} in-progress", in_progress));
    }
    if pending > 0 {
        counts.push(format!("{} pending", pending));
    }
    if completed > 0 {
        counts.push(format!("{} completed", completed));
    }
    if cancelled > 0 {
        counts.push(format!("{} cancelled", cancelled));
    }

    if !examples.is_empty() {
        let extra = items.len().saturating_sub(examples.len());
        let tail = if extra > 0 {
            format!("; +{} more", extra)
        } else {
            String::new()
        };
        format!("{} todos: {}{}", items.len(), examples.join("; "), tail)
    } else if counts.is_empty() {
        format!("todo update ({} items)", items.len())
    } else {
        format!("{} todos ({})", items.len(), counts.join(", "))
    }
}

fn infer_tool_file_path(tool_name: &str, input: &ToolStateInput) -> Option<String> {
    if let Some(fp) = input.file_path.as_ref().or(input.path.as_ref()) {
        if !fp.trim().is_empty() {
            return Some(fp.clone());
        }
    }

    let lower = tool_name.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "apply_patch" | "patch" | "apply" | "apply_diff"
    ) {
        if let Some(patch) = input.patch_text.as_deref() {
            return extract_patch_files(patch).into_iter().next();
        }
    }
    None
}

fn extract_patch_files(patch: &str) -> Vec<String> {
    let mut files = Vec::new();
    for line in patch.lines() {
        let trimmed = line.trim_start();
        for marker in ["*** Update File:", "*** Add File:", "*** Delete File:"] {
            if let Some(rest) = trimmed.strip_prefix(marker) {
                let p = rest.trim();
                if !p.is_empty() {
                    files.push(p.to_string());
                }
                break;
            }
        }
    }
    files
}

fn truncate_string(s: &str, max: usize) -> Box<str> {
    let char_count = s.chars().count();
    if char_count <= max {
        return s.into();
    }
    let target = max.saturating_sub(3);
    let byte_pos = s
        .char_indices()
        .nth(target)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    format!("{}...", &s[..byte_pos]).into_boxed_str()
}

/// Assign incremental additions/deletions to the tool calls that touched
/// the matching files. Paths compare on their last two components since
/// tool inputs are absolute and diff paths repo-relative.
fn match_tool_calls_with_diffs(parts: &mut [MessageContent], incremental: &[FileDiff]) {
    for part in parts.iter_mut() {
        let MessageContent::ToolCall(tc) = part else {
            continue;
        };
        if let Some(ref fp_str) = tc.file_path {
            let fp_name = fp_str.rsplit('/').next().unwrap_or(fp_str);
            let mut fp_parts: [&str; 2] = ["", ""];
            for (fp_idx, seg) in fp_str.rsplit('/').take(2).enumerate() {
                fp_parts[1 - fp_idx] = seg;
            }
            for d in incremental {
                let mut d_parts: [&str; 2] = ["", ""];
                for (d_idx, seg) in d.path.rsplit('/').take(2).enumerate() {
                    d_parts[1 - d_idx] = seg;
                }
                if fp_parts == d_parts {
                    tc.additions = Some(d.additions);
                    tc.deletions = Some(d.deletions);
                    break;
                }
                let d_name = d.path.rsplit('/').next().unwrap_or(&d.path);
                if d_name == fp_name {
                    tc.additions = Some(d.additions);
                    tc.deletions = Some(d.deletions);
                }
            }
        } else {
            // Patch tools often omit file_path; give them the whole delta.
            let tool_name = tc.name.to_ascii_lowercase();
            if matches!(
                tool_name.as_str(),
                "apply_patch" | "patch" | "apply" | "apply_diff"
            ) {
                let adds: u64 = incremental.iter().map(|d| d.additions).sum();
                let dels: u64 = incremental.iter().map(|d| d.deletions).sum();
                if adds > 0 || dels > 0 {
                    tc.additions = Some(adds);
                    tc.deletions = Some(dels);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input_json(json: &str) -> ToolStateInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_build_tool_detail_read() {
        let input = input_json(r#"{"filePath": "/home/u/proj/src/main.rs", "limit": 100}"#);
        assert_eq!(build_tool_detail("read", &input), "src/main.rs (limit 100)");
        let input = input_json(r#"{"filePath": "/home/u/proj/src/main.rs"}"#);
        assert_eq!(build_tool_detail("read", &input), "src/main.rs (full file)");
    }

    #[test]
    fn test_build_tool_detail_bash_first_line() {
        let input = input_json(r#"{"command": "cargo test\ncargo bench"}"#);
        assert_eq!(build_tool_detail("bash", &input), "cargo test");
    }

    #[test]
    fn test_build_tool_detail_grep() {
        let input = input_json(r#"{"pattern": "fn main", "path": "/proj/src"}"#);
        assert_eq!(build_tool_detail("grep", &input), "`fn main` in proj/src");
    }

    #[test]
    fn test_build_tool_detail_write_counts_lines() {
        let input = input_json(r#"{"filePath": "a/b.rs", "content": "one\ntwo\nthree"}"#);
        assert_eq!(build_tool_detail("write", &input), "a/b.rs (3 lines)");
    }

    #[test]
    fn test_extract_patch_files() {
        let patch = "*** Begin Patch\n*** Update File: src/a.rs\n+x\n*** Add File: src/b.rs\n+y\n*** End Patch";
        assert_eq!(extract_patch_files(patch), vec!["src/a.rs", "src/b.rs"]);
    }

    #[test]
    fn test_summarize_todos() {
        let todos: serde_json::Value = serde_json::from_str(
            r#"[
                {"content": "write parser", "status": "completed"},
                {"content": "wire up cache", "status": "in_progress"},
                {"content": "docs", "status": "pending"}
            ]"#,
        )
        .unwrap();
        let summary = summarize_todos(Some(&todos));
        assert!(summary.starts_with("3 todos:"));
        assert!(summary.contains("write parser"));
        assert!(summary.contains("+1 more"));
        assert_eq!(summarize_todos(None), "todo update");
    }

    #[test]
    fn test_match_tool_calls_with_diffs_by_suffix() {
        let mut parts = vec![MessageContent::ToolCall(ToolCallInfo {
            name: "edit".into(),
            file_path: Some("/abs/path/src/main.rs".into()),
            input: None,
            additions: None,
            deletions: None,
        })];
        let incremental = vec![FileDiff {
            path: "src/main.rs".into(),
            additions: 5,
            deletions: 2,
            status: "modified".into(),
        }];
        match_tool_calls_with_diffs(&mut parts, &incremental);
        let MessageContent::ToolCall(tc) = &parts[0] else {
            panic!("expected tool call");
        };
        assert_eq!(tc.additions, Some(5));
        assert_eq!(tc.deletions, Some(2));
    }

    #[test]
    fn test_match_patch_tool_gets_total_delta() {
        let mut parts = vec![MessageContent::ToolCall(ToolCallInfo {
            name: "apply_patch".into(),
            file_path: None,
            input: None,
            additions: None,
            deletions: None,
        })];
        let incremental = vec![
            FileDiff {
                path: "a.rs".into(),
                additions: 3,
                deletions: 1,
                status: "modified".into(),
            },
            FileDiff {
                path: "b.rs".into(),
                additions: 2,
                deletions: 0,
                status: "added".into(),
            },
        ];
        match_tool_calls_with_diffs(&mut parts, &incremental);
        let MessageContent::ToolCall(tc) = &parts[0] else {
            panic!("expected tool call");
        };
        assert_eq!(tc.additions, Some(5));
        assert_eq!(tc.deletions, Some(1));
    }

    #[test]
    fn test_parts_to_content_skips_reasoning() {
        let parts: Vec<PartRecord> = vec![
            serde_json::from_str(r#"{"type": "reasoning", "text": "hidden"}"#).unwrap(),
            serde_json::from_str(r#"{"type": "text", "text": "visible"}"#).unwrap(),
            serde_json::from_str(
                r#"{"type": "tool", "tool": "bash", "state": {"input": {"command": "ls"}}}"#,
            )
            .unwrap(),
        ];
        let content = parts_to_content(parts);
        assert_eq!(content.len(), 2);
        assert!(matches!(&content[0], MessageContent::Text(t) if t.as_ref() == "visible"));
        assert!(matches!(&content[1], MessageContent::ToolCall(tc) if tc.name.as_ref() == "bash"));
    }

    #[test]
    fn test_load_session_chat_merges_roles() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StoragePaths::discover(Some(tmp.path()));
        let write = |rel: &str, body: &str| {
            let p = tmp.path().join(rel);
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::fs::write(p, body).unwrap();
        };
        let base = 1_700_000_000_000i64;
        write(
            "message/ses_a/msg_1.json",
            &format!(
                r#"{{"id": "msg_1", "sessionID": "ses_a", "role": "user", "time": {{"created": {base}}}}}"#
            ),
        );
        write(
            "message/ses_a/msg_2.json",
            &format!(
                r#"{{"id": "msg_2", "sessionID": "ses_a", "role": "user", "time": {{"created": {}}}}}"#,
                base + 100
            ),
        );
        write(
            "message/ses_a/msg_3.json",
            &format!(
                r#"{{"id": "msg_3", "sessionID": "ses_a", "role": "assistant", "providerID": "p", "modelID": "m", "time": {{"created": {}}}}}"#,
                base + 200
            ),
        );
        write("part/msg_1/prt_1.json", r#"{"type": "text", "text": "hello"}"#);
        write("part/msg_2/prt_1.json", r#"{"type": "text", "text": "again"}"#);
        write("part/msg_3/prt_1.json", r#"{"type": "text", "text": "reply"}"#);

        let (chat, max_ts) = load_session_chat(&paths, "ses_a", None, None, None);
        assert_eq!(chat.len(), 2);
        assert_eq!(chat[0].role.as_ref(), "user");
        assert_eq!(chat[0].parts.len(), 2);
        assert_eq!(chat[1].model.as_deref(), Some("p/m"));
        assert_eq!(max_ts, base + 200);

        // Messages at or below the cutoff are excluded; only the newest one
        // comes back, and the returned timestamp advances with it.
        let (tail, tail_ts) = load_session_chat(&paths, "ses_a", None, None, Some(base + 100));
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].role.as_ref(), "assistant");
        assert_eq!(tail_ts, base + 200);

        let (empty, empty_ts) = load_session_chat(&paths, "ses_a", None, None, Some(base + 200));
        assert!(empty.is_empty());
        assert_eq!(empty_ts, 0);
    }

    #[test]
    fn test_parts_to_content_emits_thinking_marker() {
        let parts: Vec<PartRecord> = vec![serde_json::from_str(
            r#"{"type": "text", "thought": "working through it", "text": "answer"}"#,
        )
        .unwrap()];
        let content = parts_to_content(parts);
        assert_eq!(content.len(), 2);
        assert!(matches!(content[0], MessageContent::Thinking));
        assert!(matches!(&content[1], MessageContent::Text(t) if t.as_ref() == "answer"));
    }
}
