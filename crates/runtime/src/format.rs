//! Transcript cleanup and tool-result rendering.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::SyntaxConfig;
use crate::parser::decode_call;
use crate::tools::{ToolOutput, ToolView};

static NAME_OBJECT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*"name"\s*:"#).unwrap());
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());
static FUNCTION_NARRATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^the function\b[^\n]*\bwas used\b[.!]?$").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap());
static VIEW_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```tool-view:[^\n]*\n.*?\n```\n*").unwrap());

const MAX_LISTED: usize = 5;

/// Cleans raw model text and merges tool fragments into it.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    tokens: Vec<String>,
}

impl OutputFormatter {
    pub fn new(syntax: &SyntaxConfig) -> Self {
        let mut tokens: Vec<String> = syntax
            .control_tokens
            .iter()
            .chain([&syntax.open_marker, &syntax.close_marker])
            .filter(|t| !t.is_empty())
            .cloned()
            .collect();
        // Longest first so a token containing another is removed whole.
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tokens.dedup();
        Self { tokens }
    }

    /// Strip tool-call syntax, echoed call JSON and function narration, and
    /// normalize blank lines. Idempotent.
    pub fn clean(&self, raw: &str) -> String {
        let mut current = self.clean_once(raw);
        loop {
            let next = self.clean_once(&current);
            // Every pass that changes something makes the text shorter.
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn clean_once(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        for token in &self.tokens {
            if text.contains(token.as_str()) {
                text = text.replace(token.as_str(), "");
            }
        }
        let text = strip_call_objects(&text);
        let text = FENCED_BLOCK.replace_all(&text, |caps: &regex::Captures<'_>| {
            if is_narration(&caps[1]) {
                String::new()
            } else {
                caps[0].to_string()
            }
        });
        let text = BLANK_RUN.replace_all(&text, "\n\n");
        text.trim().to_string()
    }

    /// Append non-empty fragments to the cleaned text, blank-line separated.
    pub fn render(&self, cleaned: &str, fragments: &[String]) -> String {
        let parts: Vec<&str> = fragments
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect();
        if parts.is_empty() {
            return cleaned.to_string();
        }
        let joined = parts.join("\n\n");
        if cleaned.is_empty() {
            joined
        } else {
            format!("{cleaned}\n\n{joined}")
        }
    }
}

/// Keep only the first half of text whose two halves are identical.
///
/// Some models echo their whole answer twice; this undoes that.
pub fn dedupe(text: &str) -> String {
    let trimmed = text.trim();
    let mid = trimmed.chars().count() / 2;
    let split = trimmed
        .char_indices()
        .nth(mid)
        .map_or(trimmed.len(), |(i, _)| i);
    let (first, second) = trimmed.split_at(split);
    let (first, second) = (first.trim(), second.trim());
    if !first.is_empty() && first == second {
        first.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Remove embedded view payload blocks, leaving only human-readable text.
pub fn strip_views(text: &str) -> String {
    VIEW_BLOCK.replace_all(text, "").trim().to_string()
}

/// Remove inline `{"name": ..., "parameters": {...}}` objects.
fn strip_call_objects(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut search_from = 0;
    while let Some(m) = NAME_OBJECT_START.find_at(text, search_from) {
        let start = m.start();
        match matching_brace(&text[start..]) {
            Some(len) if is_call_object(&text[start..start + len]) => {
                out.push_str(&text[cursor..start]);
                cursor = start + len;
                search_from = cursor;
            }
            _ => search_from = start + 1,
        }
        if search_from >= text.len() {
            break;
        }
    }
    out.push_str(&text[cursor..]);
    out
}

/// Byte length of the balanced `{...}` object at the start of `s`.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Same shape the structured parser accepts.
fn is_call_object(candidate: &str) -> bool {
    matches!(decode_call(candidate), Ok(Some(_)))
}

/// A fence whose whole body is a "the function ... was used" line.
fn is_narration(inner: &str) -> bool {
    // Skip an info string such as `text` on the opening line.
    let body = match inner.split_once('\n') {
        Some((info, rest)) if !info.trim().contains(char::is_whitespace) => rest,
        _ => inner,
    };
    FUNCTION_NARRATION.is_match(body.trim())
}

/// Primary fragment for a successful tool result.
pub fn render_output(tool: &str, output: &ToolOutput) -> String {
    match output {
        ToolOutput::Text(text) => text.trim().to_string(),
        ToolOutput::Data(value) => format!("✅ {tool}:\n{}", format_value(value)),
        ToolOutput::RichView(view) => {
            let payload = serde_json::to_string(&view.data).unwrap_or_default();
            format!("```tool-view:{}\n{payload}\n```", view.kind)
        }
        ToolOutput::WebContent(url) => format!("🌐 {url}"),
        ToolOutput::ChainedData(value) => format!("🔗 {tool}: {}", inline_value(value)),
    }
}

/// Error fragment for a failed or unrunnable tool.
pub fn render_failure(tool: &str, error: Option<&str>) -> String {
    let error = error.filter(|e| !e.trim().is_empty()).unwrap_or("Unknown error");
    format!("❌ {tool} failed: {error}")
}

/// Short human-readable summary of a rich view, chosen by its type tag.
pub fn render_view_summary(view: &ToolView) -> String {
    let data = &view.data;
    match view.kind.as_str() {
        "date" => {
            let date = field(data, &["formatted", "date"]).unwrap_or_default();
            format!("📅 Today's Date: {date}")
        }
        "search_results" => {
            let query = field(data, &["query"]).unwrap_or_default();
            let mut out = format!("🔍 Search results for \"{query}\"");
            let results = items(data, "results");
            if results.is_empty() {
                out.push_str("\n(no results)");
            }
            for item in results.iter().take(MAX_LISTED) {
                let title = item_field(item, &["title", "snippet"]).unwrap_or("untitled");
                match item_field(item, &["url"]) {
                    Some(url) => out.push_str(&format!("\n• {title} ({url})")),
                    None => out.push_str(&format!("\n• {title}")),
                }
            }
            out
        }
        "calendar_event" => {
            let title = field(data, &["title"]).unwrap_or("Untitled event");
            match field(data, &["start", "date"]) {
                Some(start) => format!("📆 Event: {title} at {start}"),
                None => format!("📆 Event: {title}"),
            }
        }
        "calendar_events" => list_summary("📆 {} calendar events", data, "events", "title"),
        "reminder" => format!("⏰ Reminder: {}", field(data, &["title"]).unwrap_or("Untitled")),
        "reminders" => list_summary("⏰ {} reminders", data, "reminders", "title"),
        "contact" => format!("👤 Contact: {}", field(data, &["name"]).unwrap_or("Unknown")),
        "contacts" => list_summary("👥 {} contacts", data, "contacts", "name"),
        "location" | "current_location" => {
            let place = field(data, &["address", "name", "city"]).unwrap_or("Unknown");
            format!("📍 Location: {place}")
        }
        "nearby_places" | "location_search" => {
            list_summary("📍 {} places nearby", data, "places", "name")
        }
        "directions" => {
            let destination = field(data, &["destination", "to"]).unwrap_or("destination");
            format!("🧭 Directions to {destination}")
        }
        "now_playing" | "music_playing" => {
            let title = field(data, &["title", "song"]).unwrap_or("Unknown");
            match field(data, &["artist"]) {
                Some(artist) => format!("🎵 Now playing: {title} by {artist}"),
                None => format!("🎵 Now playing: {title}"),
            }
        }
        "music_search" | "music_results" => {
            list_summary("🎶 {} songs found", data, "songs", "title")
        }
        "music_control" => {
            let action = field(data, &["action", "status"]).unwrap_or("updated");
            format!("🎛️ Music: {action}")
        }
        other => format!("🎨 {other}"),
    }
}

/// `heading` has one `{}` for the item count.
fn list_summary(heading: &str, data: &Map<String, Value>, key: &str, label: &str) -> String {
    let mut out = heading.replacen("{}", &count(data, key).to_string(), 1);
    for item in items(data, key).iter().take(MAX_LISTED) {
        if let Some(label) = item_field(item, &[label]) {
            out.push_str(&format!("\n• {label}"));
        }
    }
    out
}

fn field<'a>(data: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| data.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

fn item_field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    item.as_object().and_then(|obj| field(obj, keys))
}

fn items<'a>(data: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn count(data: &Map<String, Value>, key: &str) -> usize {
    data.get("count")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or_else(|| items(data, key).len())
}

/// Multi-line rendering of arbitrary JSON data.
fn format_value(value: &Value) -> String {
    match value {
        Value::Object(obj) => obj
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .map(|(k, v)| format!("• {k}: {}", inline_value(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(arr) if arr.is_empty() => "(empty list)".to_string(),
        Value::Array(arr) => arr
            .iter()
            .map(|v| format!("- {}", inline_value(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => inline_value(other),
    }
}

fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "(none)".to_string(),
        Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| format!("{k}: {}", inline_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
