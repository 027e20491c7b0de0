//! Text rendering used by the built-in printers

use crate::config::JsonConfig;
use crate::object::ObjectPtr;
use crate::registry::Registry;

/// Escape quotes, backslashes and control characters
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

pub fn quote(text: &str) -> String {
    format!("\"{}\"", escape(text))
}

/// Print a float so that it reads back as a float
pub fn float(value: impl std::fmt::Display) -> String {
    let text = value.to_string();
    if text.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        format!("{text}.0")
    } else {
        text
    }
}

/// Render a value the way it appears inside a container
///
/// Strings are quoted; stored handles are followed to their value.
pub fn element(registry: &Registry, value: &ObjectPtr) -> String {
    let mut value = value.unwrap_shared();
    if value.is::<ObjectPtr>() {
        if let Ok(inner) = value.get::<ObjectPtr>() {
            value = inner;
        }
    }
    if value.is::<String>() {
        if let Ok(text) = value.with(|s: &String| quote(s)) {
            return text;
        }
    }
    if value.is::<char>() {
        if let Ok(text) = value.with(|c: &char| quote(&c.to_string())) {
            return text;
        }
    }
    registry.stringify(&value)
}

/// `[ a, b ]`, or `[]` when empty
pub fn sequence(items: impl IntoIterator<Item = String>) -> String {
    let items: Vec<String> = items.into_iter().collect();
    if items.is_empty() {
        return "[]".to_string();
    }
    format!("[ {} ]", items.join(", "))
}

/// `{ "k": v }` on one line, or one entry per line when indenting
///
/// Nested multi-line values are shifted right by one indent level.
pub fn mapping(entries: impl IntoIterator<Item = (String, String)>, config: &JsonConfig) -> String {
    let entries: Vec<(String, String)> = entries.into_iter().collect();
    if entries.is_empty() {
        return "{}".to_string();
    }
    if !config.indent {
        let body = entries
            .iter()
            .map(|(key, value)| format!("{}: {}", quote(key), value))
            .collect::<Vec<_>>()
            .join(", ");
        return format!("{{ {body} }}");
    }

    let pad = " ".repeat(config.indent_width);
    let nested = format!("\n{pad}");
    let mut out = String::from("{");
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&nested);
        out.push_str(&quote(key));
        out.push_str(": ");
        out.push_str(&value.replace('\n', &nested));
    }
    out.push_str("\n}");
    out
}
