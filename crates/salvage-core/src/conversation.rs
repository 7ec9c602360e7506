//! Assistant conversation timeline.
//!
//! A decoded composer blob holds a `conversation` array of message objects.
//! Each message carries `text`, a numeric `type` (1 = user) and, usually, a
//! `timingInfo` object with client-side timestamps in varying units.
//!
//! The timeline is the list of non-empty messages, newest first. Its main
//! purpose is picking a recovery cutoff: "restore my files as they were
//! when I sent this message".

use crate::errors::{Result, SalvageError};
use crate::timestamp::{normalize_epoch, DisplayZone, EpochMillis};
use serde::Serialize;
use serde_json::Value;

pub const CONVERSATION_FIELD: &str = "conversation";

const USER_MESSAGE_TYPE: i64 = 1;
const TIMING_FIELDS: &[&str] = &["clientStartTime", "clientRpcSendTime", "clientEndTime"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "You"),
            Speaker::Assistant => write!(f, "AI"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationEntry {
    /// Position in the original `conversation` array
    pub position: usize,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: Option<EpochMillis>,
    /// True when the timestamp was carried forward from an earlier message
    pub inherited: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    entries: Vec<ConversationEntry>,
}

impl Conversation {
    /// Build a conversation from a decoded composer blob
    ///
    /// A missing or non-array `conversation` field yields an empty
    /// conversation.
    ///
    /// # Errors
    ///
    /// `Serialization` if the blob root is not a JSON object.
    pub fn from_json(value: &Value) -> Result<Self> {
        let root = value.as_object().ok_or_else(|| SalvageError::Serialization {
            message: "conversation blob root is not a JSON object".to_string(),
        })?;

        let items = match root.get(CONVERSATION_FIELD).and_then(Value::as_array) {
            Some(items) => items,
            None => return Ok(Self::default()),
        };

        let mut entries = Vec::new();
        let mut last_valid: Option<EpochMillis> = None;

        for (position, item) in items.iter().enumerate() {
            let Some(obj) = item.as_object() else {
                continue;
            };

            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();
            if text.is_empty() {
                continue;
            }

            let speaker = match obj.get("type").and_then(Value::as_i64) {
                Some(USER_MESSAGE_TYPE) => Speaker::User,
                _ => Speaker::Assistant,
            };

            let (timestamp, inherited) = match message_timestamp(item) {
                Some(ts) => {
                    last_valid = Some(ts);
                    (Some(ts), false)
                }
                None => (last_valid, last_valid.is_some()),
            };

            entries.push(ConversationEntry {
                position,
                speaker,
                text: text.to_string(),
                timestamp,
                inherited,
            });
        }

        Ok(Self { entries })
    }

    /// Parse a conversation from raw blob text
    ///
    /// # Errors
    ///
    /// `Serialization` if the text is not JSON or not an object.
    pub fn parse_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Entries in conversation order
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries newest first; entries without any timestamp go last
    pub fn timeline(&self) -> Vec<&ConversationEntry> {
        let mut timeline: Vec<&ConversationEntry> = self.entries.iter().collect();
        // Stable sort: equal timestamps keep conversation order.
        timeline.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        timeline
    }

    /// Cutoff instant of the timeline entry at `index` (0 = newest)
    ///
    /// # Errors
    ///
    /// - `TimelineEntryNotFound` if `index` is out of range
    /// - `InvalidTimestamp` if that entry has no timestamp
    pub fn cutoff_for_entry(&self, index: usize) -> Result<EpochMillis> {
        let timeline = self.timeline();
        let entry = timeline
            .get(index)
            .ok_or(SalvageError::TimelineEntryNotFound {
                index,
                len: timeline.len(),
            })?;
        entry.timestamp.ok_or_else(|| SalvageError::InvalidTimestamp {
            input: format!("timeline entry #{} has no timestamp", index),
        })
    }

    /// Plain-text timeline, newest first, one blank line between messages
    pub fn render_text(&self, zone: DisplayZone) -> String {
        self.timeline()
            .iter()
            .map(|entry| format_entry(entry, zone))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// `[2024-03-15 14:22:00] You: text`
pub fn format_entry(entry: &ConversationEntry, zone: DisplayZone) -> String {
    let when = entry
        .timestamp
        .map(|ts| ts.display(zone))
        .unwrap_or_else(|| "(no timestamp)".to_string());
    format!("[{}] {}: {}", when, entry.speaker, entry.text)
}

fn message_timestamp(item: &Value) -> Option<EpochMillis> {
    let timing = item.get("timingInfo");
    TIMING_FIELDS
        .iter()
        .filter_map(|field| timing.and_then(|t| t.get(*field)))
        .chain(item.get("timestamp"))
        .find_map(normalize_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_speakers_and_empty_text() {
        let convo = Conversation::from_json(&json!({
            "conversation": [
                {"type": 1, "text": " fix the parser ", "timingInfo": {"clientStartTime": 1_710_000_000_000i64}},
                {"type": 2, "text": "   "},
                {"type": 2, "text": "Done."},
                "garbage",
                {"text": "no type"}
            ]
        }))
        .unwrap();

        assert_eq!(convo.len(), 3);
        assert_eq!(convo.entries()[0].speaker, Speaker::User);
        assert_eq!(convo.entries()[0].text, "fix the parser");
        assert_eq!(convo.entries()[1].speaker, Speaker::Assistant);
        assert_eq!(convo.entries()[1].position, 2);
        assert_eq!(convo.entries()[2].speaker, Speaker::Assistant);
    }

    #[test]
    fn test_timestamp_field_priority_and_units() {
        let convo = Conversation::from_json(&json!({
            "conversation": [
                {"type": 1, "text": "a", "timingInfo": {"clientStartTime": 0, "clientRpcSendTime": 1_710_000_001_000i64}},
                {"type": 1, "text": "b", "timestamp": 1_710_000_002},
                {"type": 1, "text": "c", "timingInfo": {"clientEndTime": "1710000003000123"}}
            ]
        }))
        .unwrap();

        let ts: Vec<_> = convo
            .entries()
            .iter()
            .map(|e| e.timestamp.unwrap().as_millis())
            .collect();
        assert_eq!(ts, vec![1_710_000_001_000, 1_710_000_002_000, 1_710_000_003_000]);
    }

    #[test]
    fn test_missing_timestamp_inherits_last_valid() {
        let convo = Conversation::from_json(&json!({
            "conversation": [
                {"type": 2, "text": "orphan"},
                {"type": 1, "text": "q", "timingInfo": {"clientStartTime": 5_000_000_000_000i64}},
                {"type": 2, "text": "answer"}
            ]
        }))
        .unwrap();

        let entries = convo.entries();
        assert_eq!(entries[0].timestamp, None);
        assert!(!entries[0].inherited);
        assert_eq!(entries[2].timestamp, Some(EpochMillis::new(5_000_000_000_000)));
        assert!(entries[2].inherited);
    }

    #[test]
    fn test_timeline_newest_first_untimed_last() {
        let convo = Conversation::from_json(&json!({
            "conversation": [
                {"type": 2, "text": "untimed"},
                {"type": 1, "text": "old", "timestamp": 1_000_000_000_000i64},
                {"type": 1, "text": "new", "timestamp": 2_000_000_000_000i64},
                {"type": 2, "text": "reply-to-new"}
            ]
        }))
        .unwrap();

        let order: Vec<_> = convo.timeline().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(order, vec!["new", "reply-to-new", "old", "untimed"]);
        assert_eq!(
            convo.cutoff_for_entry(0).unwrap(),
            EpochMillis::new(2_000_000_000_000)
        );
        assert!(matches!(
            convo.cutoff_for_entry(3),
            Err(SalvageError::InvalidTimestamp { .. })
        ));
        assert!(matches!(
            convo.cutoff_for_entry(9),
            Err(SalvageError::TimelineEntryNotFound { index: 9, len: 4 })
        ));
    }

    #[test]
    fn test_render_text() {
        let convo = Conversation::from_json(&json!({
            "conversation": [
                {"type": 1, "text": "hello", "timestamp": 1_710_512_520_000i64},
                {"type": 2, "text": "hi"}
            ]
        }))
        .unwrap();

        assert_eq!(
            convo.render_text(DisplayZone::Utc),
            "[2024-03-15 14:22:00] You: hello\n\n[2024-03-15 14:22:00] AI: hi"
        );
    }

    #[test]
    fn test_missing_conversation_is_empty_but_non_object_is_error() {
        assert!(Conversation::from_json(&json!({"other": 1})).unwrap().is_empty());
        assert!(Conversation::from_json(&json!({"conversation": "x"})).unwrap().is_empty());
        assert!(Conversation::from_json(&json!([1])).is_err());
        assert!(Conversation::parse_str("not json").is_err());
    }
}
