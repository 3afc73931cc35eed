//! Timeline page parsing.
//!
//! Timeline operations (search, user tweets, followers, likes...) share one
//! payload shape: somewhere under `data` sits an `instructions` array whose
//! `TimelineAddEntries` instruction carries the page entries, including two
//! cursor entries. The bottom cursor leads to the next page; on later pages
//! it may arrive in a `TimelineReplaceEntry` instead.

use birdline_core::PageResult;
use serde_json::Value;

fn find_instructions(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(instructions)) = map.get("instructions") {
                return Some(instructions);
            }
            map.values().find_map(find_instructions)
        }
        Value::Array(items) => items.iter().find_map(find_instructions),
        _ => None,
    }
}

fn cursor_of(entry: &Value) -> Option<(&str, &str)> {
    let content = entry.get("content")?;
    let is_cursor = ["entryType", "__typename"]
        .iter()
        .any(|key| content.get(*key).and_then(Value::as_str) == Some("TimelineTimelineCursor"));
    if !is_cursor {
        return None;
    }
    let value = content.get("value").and_then(Value::as_str)?;
    let kind = content
        .get("cursorType")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some((kind, value))
}

fn is_bottom(entry: &Value, kind: &str) -> bool {
    kind.eq_ignore_ascii_case("bottom")
        || entry
            .get("entryId")
            .and_then(Value::as_str)
            .is_some_and(|id| id.starts_with("cursor-bottom"))
}

/// Parses a timeline payload into its entries and the bottom cursor.
///
/// Cursor entries are not returned as items. `has_more` requires both a
/// bottom cursor and at least one item, since the server keeps handing out
/// cursors past the end of a collection.
pub fn parse_timeline_page(data: &Value) -> PageResult<Value> {
    let Some(instructions) = find_instructions(data) else {
        return PageResult::last(Vec::new());
    };

    let mut items = Vec::new();
    let mut bottom: Option<String> = None;

    for instruction in instructions {
        let kind = instruction
            .get("type")
            .or_else(|| instruction.get("__typename"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let entries: Vec<&Value> = match kind {
            "TimelineAddEntries" => instruction
                .get("entries")
                .and_then(Value::as_array)
                .map(|e| e.iter().collect())
                .unwrap_or_default(),
            "TimelineReplaceEntry" => instruction.get("entry").into_iter().collect(),
            _ => continue,
        };

        for entry in entries {
            match cursor_of(entry) {
                Some((cursor_kind, value)) => {
                    if is_bottom(entry, cursor_kind) {
                        bottom = Some(value.to_string());
                    }
                }
                None if kind == "TimelineAddEntries" => items.push(entry.clone()),
                None => {}
            }
        }
    }

    let has_more = bottom.is_some() && !items.is_empty();
    PageResult::with_has_more(items, bottom, has_more)
}
