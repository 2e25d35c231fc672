//! Raw request/response rendering
//!
//! Deterministic, byte-faithful textual reconstruction of a capture event:
//! start line, headers in stored order, blank separator, body. Everything
//! here is a pure function of its input; decoding can degrade but never
//! fail.

use serde::{Deserialize, Serialize};

use crate::correlate::Transaction;
use crate::models::{CaptureEvent, EventKind};

/// Decode bytes as UTF-8, falling back to permissive Latin-1.
///
/// The fallback maps every byte to its code point, so this is total: any
/// input produces a string. Header values and binary bodies share it.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// The event's start line, synthesized from whatever fields exist when the
/// proxy layer didn't precompute one. Absent fields degrade to `...`.
pub fn start_line(event: &CaptureEvent) -> String {
    if let Some(line) = &event.start_line {
        return line.clone();
    }
    match event.kind {
        EventKind::Request => format!(
            "{} {}",
            event.method.map(|m| m.as_str()).unwrap_or("..."),
            event.url.as_deref().unwrap_or("...")
        ),
        EventKind::Response => format!(
            "HTTP/1.1 {}",
            event
                .status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "...".to_string())
        ),
    }
}

/// One-line form for the live feed
pub fn feed_line(event: &CaptureEvent) -> String {
    start_line(event)
}

/// Full textual reconstruction: start line, `name: value` per header in
/// stored order, a blank separator line, then the body.
///
/// Body precedence: `text_body` verbatim (even when empty), else
/// `binary_body` through [`decode_text`], else nothing.
pub fn render_full(event: &CaptureEvent) -> String {
    let mut lines = Vec::with_capacity(event.headers.len() + 3);
    lines.push(start_line(event));
    for (name, value) in &event.headers {
        lines.push(format!("{}: {}", name, decode_text(value)));
    }
    lines.push(String::new());
    if let Some(text) = &event.text_body {
        lines.push(text.clone());
    } else if let Some(raw) = &event.binary_body {
        lines.push(decode_text(raw));
    }
    lines.join("\n")
}

/// Render a drained batch the way the console feed prints it, each event
/// followed by a rule line.
pub fn dump_events(events: &[CaptureEvent]) -> String {
    let rule = "#".repeat(80);
    let mut out = String::new();
    for event in events {
        out.push_str(&render_full(event));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
    }
    out
}

/// Both panes of the transaction detail view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDump {
    pub request_raw: String,
    pub response_raw: String,
}

/// Render both sides of a transaction; an absent side renders empty.
pub fn dump_transaction(tx: &Transaction) -> TransactionDump {
    TransactionDump {
        request_raw: tx.request.as_ref().map(render_full).unwrap_or_default(),
        response_raw: tx.response.as_ref().map(render_full).unwrap_or_default(),
    }
}
