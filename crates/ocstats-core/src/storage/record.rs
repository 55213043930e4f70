//! Raw record types mirroring the JSON layout of the storage tree.
//!
//! Every field is optional; producers omit freely and a missing field must
//! never sink a file. Lenient wrappers absorb the scalar-type drift.

use serde::Deserialize;

use super::lenient::{LenientF64, LenientI64, LenientString, LenientU64};

#[derive(Deserialize, Default)]
pub struct CacheData {
    pub read: Option<LenientU64>,
    pub write: Option<LenientU64>,
}

#[derive(Deserialize, Default)]
pub struct TokensData {
    pub input: Option<LenientU64>,
    pub output: Option<LenientU64>,
    pub reasoning: Option<LenientU64>,
    pub cache: Option<CacheData>,
}

#[derive(Deserialize, Default, Clone)]
pub struct DiffItem {
    pub file: Option<LenientString>,
    pub additions: Option<LenientU64>,
    pub deletions: Option<LenientU64>,
    pub status: Option<LenientString>,
}

#[derive(Deserialize, Default)]
pub struct Summary {
    pub diffs: Option<Vec<DiffItem>>,
}

#[derive(Deserialize, Default)]
pub struct TimeData {
    pub created: Option<LenientI64>,
    pub completed: Option<LenientI64>,
}

#[derive(Deserialize, Default)]
pub struct PathData {
    pub cwd: Option<String>,
    pub root: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ModelData {
    #[serde(rename = "providerID")]
    pub provider_id: Option<LenientString>,
    #[serde(rename = "modelID")]
    pub model_id: Option<LenientString>,
}

/// A message file from `message/`.
#[derive(Deserialize, Default)]
pub struct MessageRecord {
    pub id: Option<LenientString>,
    #[serde(rename = "sessionID")]
    pub session_id: Option<LenientString>,
    pub role: Option<LenientString>,
    pub agent: Option<LenientString>,
    #[serde(rename = "providerID")]
    pub provider_id: Option<LenientString>,
    #[serde(rename = "modelID")]
    pub model_id: Option<LenientString>,
    pub model: Option<ModelData>,
    pub time: Option<TimeData>,
    pub tokens: Option<TokensData>,
    #[serde(default, deserialize_with = "deserialize_lenient_summary")]
    pub summary: Option<Summary>,
    pub path: Option<PathData>,
    pub cost: Option<LenientF64>,
}

/// A part file from `part/<messageID>/`.
#[derive(Deserialize, Default, Clone)]
pub struct PartRecord {
    #[serde(rename = "type")]
    pub part_type: Option<String>,
    pub text: Option<String>,
    pub tool: Option<String>,
    pub thought: Option<String>,
    pub state: Option<ToolState>,
}

#[derive(Deserialize, Default, Clone)]
pub struct ToolState {
    pub input: Option<ToolStateInput>,
}

/// Tool invocation inputs; aliases cover the snake/camel variants seen in
/// the wild.
#[derive(Deserialize, Default, Clone)]
pub struct ToolStateInput {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(alias = "old_str", alias = "oldStr")]
    pub old_str: Option<String>,
    #[serde(alias = "new_str", alias = "newStr")]
    pub new_str: Option<String>,
    #[serde(alias = "content")]
    pub content: Option<String>,
    #[serde(alias = "patchText")]
    pub patch_text: Option<String>,
    pub command: Option<String>,
    pub pattern: Option<String>,
    pub query: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub limit: Option<serde_json::Value>,
    pub offset: Option<serde_json::Value>,
    pub todos: Option<serde_json::Value>,
    pub ids: Option<Vec<String>>,
}

/// A session metadata file from `session/`.
#[derive(Deserialize)]
pub struct SessionRecord {
    pub id: Option<LenientString>,
    pub title: Option<LenientString>,
    #[serde(rename = "parentID")]
    pub parent_id: Option<LenientString>,
}

/// One entry of a `session_diff/<sessionID>.json` array.
#[derive(Deserialize, Default, Clone)]
pub struct SessionDiffEntry {
    pub file: Option<LenientString>,
    pub additions: Option<LenientU64>,
    pub deletions: Option<LenientU64>,
    pub status: Option<LenientString>,
}

/// A `summary` that is not an object (older writers emitted booleans here)
/// degrades to `None` instead of failing the message.
fn deserialize_lenient_summary<'de, D>(deserializer: D) -> Result<Option<Summary>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_record_minimal() {
        let msg: MessageRecord = serde_json::from_str("{}").unwrap();
        assert!(msg.id.is_none());
        assert!(msg.tokens.is_none());
    }

    #[test]
    fn test_message_record_full() {
        let json = r#"{
            "id": "msg_1",
            "sessionID": "ses_1",
            "role": "assistant",
            "agent": "build",
            "model": {"providerID": "anthropic", "modelID": "some-model"},
            "time": {"created": 1700000000000, "completed": 1700000005000},
            "tokens": {"input": 100, "output": "50", "cache": {"read": 10}},
            "cost": "0.012",
            "summary": {"diffs": [{"file": "src/a.rs", "additions": 3, "deletions": 1}]}
        }"#;
        let msg: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id.as_ref().unwrap().0, "msg_1");
        assert_eq!(*msg.tokens.as_ref().unwrap().output.unwrap(), 50);
        assert_eq!(
            *msg.tokens.as_ref().unwrap().cache.as_ref().unwrap().read.unwrap(),
            10
        );
        assert!((*msg.cost.unwrap() - 0.012).abs() < 1e-9);
        let diffs = msg.summary.unwrap().diffs.unwrap();
        assert_eq!(diffs[0].file.as_ref().unwrap().0, "src/a.rs");
    }

    #[test]
    fn test_malformed_summary_degrades_to_none() {
        let msg: MessageRecord = serde_json::from_str(r#"{"summary": true}"#).unwrap();
        assert!(msg.summary.is_none());
    }

    #[test]
    fn test_part_record_tool() {
        let json = r#"{
            "type": "tool",
            "tool": "edit",
            "state": {"input": {"filePath": "src/main.rs"}}
        }"#;
        let part: PartRecord = serde_json::from_str(json).unwrap();
        assert_eq!(part.part_type.as_deref(), Some("tool"));
        assert_eq!(
            part.state
                .unwrap()
                .input
                .unwrap()
                .file_path
                .as_deref(),
            Some("src/main.rs")
        );
    }

    #[test]
    fn test_session_record_parent() {
        let json = r#"{"id": "ses_2", "title": "fix tests", "parentID": "ses_1"}"#;
        let s: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(s.parent_id.unwrap().0, "ses_1");
    }
}
