//! Capture event model
//!
//! One observed HTTP request or response, as handed over by the proxy layer.
//! Events are immutable once captured; the correlator only ever receives
//! moves of drained events, never references into the buffer.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Maximum number of payload bytes retained per event.
///
/// Applied once, at capture time. The discarded tail is gone for good;
/// re-rendering an event can never recover it.
pub const BODY_PREVIEW_LIMIT: usize = 2048;

/// Marker appended to payloads cut at [`BODY_PREVIEW_LIMIT`].
pub const TRUNCATION_MARKER: &[u8] = b"...[truncated to 2048 bytes]";

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Connect,
    Trace,
}

impl HttpMethod {
    /// Convert from string (lossy, defaults to GET)
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            "CONNECT" => HttpMethod::Connect,
            "TRACE" => HttpMethod::Trace,
            _ => HttpMethod::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the exchange an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Request,
    Response,
}

/// A single observed request or response.
///
/// The proxy layer fills in whatever it decoded; every field beyond the
/// kind and transaction id is optional, and downstream consumers degrade
/// gracefully when one is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureEvent {
    /// Request or response
    pub kind: EventKind,

    /// Opaque exchange identifier supplied by the proxy layer.
    /// Events with an empty id are dropped at ingest.
    pub transaction_id: String,

    /// Wall-clock capture instant in seconds; used only for duration math
    pub ts: Option<f64>,

    /// Precomputed human-readable start line; synthesized at render time
    /// when absent
    pub start_line: Option<String>,

    /// Request method
    pub method: Option<HttpMethod>,

    /// Request URL (or path, for transparent captures)
    pub url: Option<String>,

    /// Response status code
    pub status_code: Option<u16>,

    /// Response reason phrase
    pub reason: Option<String>,

    /// HTTP version as captured (e.g. "HTTP/1.1")
    pub http_version: Option<String>,

    /// Headers in capture order. Names are kept exactly as seen (no folding,
    /// no dedup); values stay raw bytes and are only decoded at render time.
    pub headers: Vec<(String, Vec<u8>)>,

    /// Decoded text body, when the proxy's charset detection succeeded.
    /// Takes precedence over `binary_body` wherever both are set.
    pub text_body: Option<String>,

    /// Raw payload preview, capped at [`BODY_PREVIEW_LIMIT`]
    pub binary_body: Option<Vec<u8>>,
}

impl CaptureEvent {
    /// Create a request-side event
    pub fn request(
        transaction_id: impl Into<String>,
        method: &str,
        url: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Request,
            transaction_id: transaction_id.into(),
            ts: None,
            start_line: None,
            method: Some(HttpMethod::from_str_lossy(method)),
            url: Some(url.into()),
            status_code: None,
            reason: None,
            http_version: None,
            headers: Vec::new(),
            text_body: None,
            binary_body: None,
        }
    }

    /// Create a response-side event
    pub fn response(
        transaction_id: impl Into<String>,
        status_code: u16,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Response,
            transaction_id: transaction_id.into(),
            ts: None,
            start_line: None,
            method: None,
            url: None,
            status_code: Some(status_code),
            reason: Some(reason.into()),
            http_version: None,
            headers: Vec::new(),
            text_body: None,
            binary_body: None,
        }
    }

    /// Current wall-clock instant in seconds, for producer-side stamping
    pub fn now_ts() -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }

    /// Append a header, preserving capture order
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Case-insensitive header lookup (first match wins). Lookup only;
    /// stored names keep their captured casing.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// Store a raw payload, applying the capture-time preview cap.
    /// An empty payload is recorded as no body at all.
    pub fn set_body_bytes(&mut self, data: &[u8]) {
        self.binary_body = if data.is_empty() {
            None
        } else {
            Some(preview_bytes(data))
        };
    }
}

/// Cap a payload at [`BODY_PREVIEW_LIMIT`] bytes, appending the truncation
/// marker when anything was cut.
pub fn preview_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() <= BODY_PREVIEW_LIMIT {
        return data.to_vec();
    }
    let mut out = data[..BODY_PREVIEW_LIMIT].to_vec();
    out.extend_from_slice(TRUNCATION_MARKER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_payloads_and_marks_them() {
        let data = vec![b'a'; 3000];
        let preview = preview_bytes(&data);
        assert_eq!(preview.len(), BODY_PREVIEW_LIMIT + TRUNCATION_MARKER.len());
        assert!(preview.ends_with(TRUNCATION_MARKER));
        assert_eq!(&preview[..BODY_PREVIEW_LIMIT], &data[..BODY_PREVIEW_LIMIT]);
    }

    #[test]
    fn preview_leaves_payloads_at_the_limit_untouched() {
        let data = vec![b'b'; BODY_PREVIEW_LIMIT];
        assert_eq!(preview_bytes(&data), data);
    }

    #[test]
    fn set_body_bytes_records_empty_payloads_as_absent() {
        let mut event = CaptureEvent::request("tx", "POST", "/upload");
        event.set_body_bytes(b"");
        assert!(event.binary_body.is_none());

        event.set_body_bytes(b"payload");
        assert_eq!(event.binary_body.as_deref(), Some(&b"payload"[..]));
    }

    #[test]
    fn header_lookup_ignores_case_but_preserves_storage() {
        let mut event = CaptureEvent::request("tx", "GET", "/");
        event.push_header("Content-Type", "text/plain");
        event.push_header("X-Id", "42");

        assert_eq!(event.header("content-type"), Some(&b"text/plain"[..]));
        assert_eq!(event.headers[0].0, "Content-Type", "captured casing kept");
        assert_eq!(event.header("missing"), None);
    }

    #[test]
    fn method_parsing_defaults_to_get() {
        assert_eq!(HttpMethod::from_str_lossy("delete"), HttpMethod::Delete);
        assert_eq!(HttpMethod::from_str_lossy("BREW"), HttpMethod::Get);
    }
}
