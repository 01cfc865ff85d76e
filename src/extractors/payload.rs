//! Best-effort extraction of transcript records from transcript API responses.
//!
//! The response shape of the hosted API is not fixed, so extraction searches
//! known field names instead of deserializing into a schema.

use serde_json::{Map, Value};

const ID_KEYS: &[&str] = &["id", "videoId", "video_id"];
const TITLE_KEYS: &[&str] = &["title", "videoTitle", "video_title"];
const TEXT_KEYS: &[&str] = &[
    "text",
    "transcript",
    "content",
    "captions",
    "subtitles",
    "segments",
    "lines",
    "tracks",
    "data",
];
const CONTAINER_KEYS: &[&str] = &["results", "videos", "items", "data"];

/// One transcript found in an API payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub text: String,
}

/// Extract every transcript record the payload contains.
///
/// Never fails; unrecognized shapes yield an empty list.
pub fn extract(payload: &Value) -> Vec<TranscriptRecord> {
    match payload {
        Value::String(text) => non_empty(text)
            .map(|text| TranscriptRecord {
                id: None,
                title: None,
                text,
            })
            .into_iter()
            .collect(),
        Value::Array(items) => {
            if items.iter().any(has_identity) {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(record_from_object)
                    .collect()
            } else {
                text_from_value(payload)
                    .map(|text| TranscriptRecord {
                        id: None,
                        title: None,
                        text,
                    })
                    .into_iter()
                    .collect()
            }
        }
        Value::Object(map) => {
            for key in CONTAINER_KEYS {
                let Some(nested) = map.get(*key) else {
                    continue;
                };
                if let Value::Array(items) = nested {
                    if items.iter().any(has_identity) {
                        let records = extract(nested);
                        if !records.is_empty() {
                            return records;
                        }
                    }
                }
            }

            record_from_object(map).into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// Whether a value looks like a per-video object rather than a caption segment
fn has_identity(value: &Value) -> bool {
    value.as_object().map_or(false, |map| {
        ID_KEYS
            .iter()
            .chain(TITLE_KEYS)
            .any(|key| scalar_field(map, key).is_some())
    })
}

fn record_from_object(map: &Map<String, Value>) -> Option<TranscriptRecord> {
    let text = text_from_object(map)?;

    Some(TranscriptRecord {
        id: ID_KEYS.iter().find_map(|key| scalar_field(map, key)),
        title: TITLE_KEYS.iter().find_map(|key| scalar_field(map, key)),
        text,
    })
}

fn text_from_object(map: &Map<String, Value>) -> Option<String> {
    TEXT_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(text_from_value)
}

fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(text),
        Value::Array(items) if !items.is_empty() && items.iter().all(is_flat_piece) => {
            let joined = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => non_empty(text),
                    Value::Object(map) => map.get("text").and_then(Value::as_str).and_then(non_empty),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" ");
            non_empty(&joined)
        }
        Value::Array(items) => items.iter().find_map(text_from_value),
        Value::Object(map) => text_from_object(map),
        _ => None,
    }
}

/// Strings and `{ "text": "..." }` segments are joined; anything else is nested
fn is_flat_piece(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Object(map) => map.get("text").map_or(false, Value::is_string),
        _ => false,
    }
}

fn scalar_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(value) => non_empty(value),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn texts(records: &[TranscriptRecord]) -> Vec<&str> {
        records.iter().map(|record| record.text.as_str()).collect()
    }

    #[test]
    fn test_text_segments_under_data_are_joined() {
        let payload = json!({"data": [{"text": "hello"}, {"text": "world"}]});
        let records = extract(&payload);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "hello world");
        assert_eq!(records[0].id, None);
    }

    #[test]
    fn test_plain_string_payload() {
        let records = extract(&json!("plain string"));
        assert_eq!(
            records,
            vec![TranscriptRecord {
                id: None,
                title: None,
                text: "plain string".to_string(),
            }]
        );
    }

    #[test]
    fn test_unrecognized_shapes_are_empty() {
        assert!(extract(&Value::Null).is_empty());
        assert!(extract(&json!({})).is_empty());
        assert!(extract(&json!(42)).is_empty());
        assert!(extract(&json!([])).is_empty());
        assert!(extract(&json!("   ")).is_empty());
        assert!(extract(&json!({"status": "ok", "count": 0})).is_empty());
    }

    #[test]
    fn test_per_video_records_with_nested_tracks() {
        let payload = json!([
            {
                "id": "dQw4w9WgXcQ",
                "title": "Never Gonna Give You Up",
                "tracks": [
                    {"language": "English", "transcript": [
                        {"text": "never gonna", "start": "0.0"},
                        {"text": "give you up", "start": "1.2"}
                    ]},
                    {"language": "German", "transcript": [{"text": "niemals"}]}
                ]
            },
            {"id": "aaaaaaaaaaa", "tracks": []}
        ]);

        let records = extract(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(records[0].title.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(records[0].text, "never gonna give you up");
    }

    #[test]
    fn test_container_of_videos() {
        let payload = json!({
            "results": [
                {"videoId": "one11111111", "transcript": "first video"},
                {"videoId": "two22222222", "transcript": ["second", "video"]}
            ]
        });

        let records = extract(&payload);
        assert_eq!(texts(&records), vec!["first video", "second video"]);
        assert_eq!(records[1].id.as_deref(), Some("two22222222"));
    }

    #[test]
    fn test_first_non_empty_text_field_wins() {
        let payload = json!({
            "title": "Talk",
            "text": "",
            "transcript": {"segments": [{"text": " from "}, {"text": "segments "}]},
            "content": "ignored"
        });

        let records = extract(&payload);
        assert_eq!(texts(&records), vec!["from segments"]);
        assert_eq!(records[0].title.as_deref(), Some("Talk"));
    }

    #[test]
    fn test_top_level_list_of_strings() {
        let records = extract(&json!(["one", "", "two"]));
        assert_eq!(texts(&records), vec!["one two"]);
    }

    #[test]
    fn test_numeric_ids_are_accepted() {
        let records = extract(&json!([{"id": 7, "text": "seven"}]));
        assert_eq!(records[0].id.as_deref(), Some("7"));
    }
}
