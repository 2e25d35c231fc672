//! Request/response correlation
//!
//! Consumes drained capture events in capture order and maintains the
//! session's transaction table, pairing each response with its request and
//! describing the resulting display changes as [`UiUpdate`] values.
//!
//! The table is intentionally unbounded for the session lifetime: eviction
//! in the source buffer drops *events*, never already-correlated
//! transactions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    CaptureEvent, EventKind, HttpMethod, MethodClass, RequestSummary, ResponseSummary, RowHandle,
    StatusClass, UiUpdate,
};
use crate::render;

/// One request/response pair, keyed by the proxy layer's exchange id.
///
/// Either side may be absent: the request until capture catches up with a
/// mid-flight exchange, the response until the server answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// First-seen display order, monotonically increasing, never reused
    pub sequence: u64,
    pub request: Option<CaptureEvent>,
    pub response: Option<CaptureEvent>,
    /// Display row reference; `None` until a request has been observed
    pub handle: Option<RowHandle>,
}

impl Transaction {
    fn new(id: String, sequence: u64) -> Self {
        Self {
            id,
            sequence,
            request: None,
            response: None,
            handle: None,
        }
    }
}

/// Groups capture events into transactions and emits incremental UI deltas.
///
/// Single-consumer by contract: the poller that drains the buffer is the
/// only caller of [`ingest`](Self::ingest), so the table itself needs no
/// locking.
#[derive(Debug)]
pub struct TransactionCorrelator {
    transactions: HashMap<String, Transaction>,
    next_sequence: u64,
    next_handle: u64,
}

impl TransactionCorrelator {
    pub fn new() -> Self {
        Self {
            transactions: HashMap::new(),
            next_sequence: 1,
            next_handle: 1,
        }
    }

    /// Process a drained batch strictly in the order given.
    ///
    /// Never fails: events without a transaction id are logged and dropped,
    /// and every other anomaly surfaces only as the absence of an update.
    pub fn ingest<I>(&mut self, events: I) -> Vec<UiUpdate>
    where
        I: IntoIterator<Item = CaptureEvent>,
    {
        let mut updates = Vec::new();
        for event in events {
            if event.transaction_id.is_empty() {
                tracing::debug!("Dropping {:?} event without a transaction id", event.kind);
                continue;
            }
            match event.kind {
                EventKind::Request => self.ingest_request(event, &mut updates),
                EventKind::Response => self.ingest_response(event, &mut updates),
            }
        }
        updates
    }

    fn ingest_request(&mut self, event: CaptureEvent, updates: &mut Vec<UiUpdate>) {
        let summary = request_summary(&event);
        let id = event.transaction_id.clone();

        let next_sequence = &mut self.next_sequence;
        let tx = self.transactions.entry(id.clone()).or_insert_with(|| {
            let sequence = *next_sequence;
            *next_sequence += 1;
            Transaction::new(id, sequence)
        });

        // Connection reuse can alias an id onto a fresh request; the latest
        // request wins, keeping sequence and row.
        tx.request = Some(event);

        if tx.handle.is_none() {
            let handle = RowHandle(self.next_handle);
            self.next_handle += 1;
            tx.handle = Some(handle);
            updates.push(UiUpdate::NewRow {
                id: tx.id.clone(),
                sequence: tx.sequence,
                handle,
                request: summary,
            });

            // A response that arrived first was parked with no UI effect;
            // the freshly created row is where it attaches.
            if let Some(response) = &tx.response {
                updates.push(UiUpdate::UpdateRow {
                    handle,
                    response: response_summary(response),
                    duration: duration_text(tx.request.as_ref(), response),
                });
            }
        }
    }

    fn ingest_response(&mut self, event: CaptureEvent, updates: &mut Vec<UiUpdate>) {
        let id = event.transaction_id.clone();

        let next_sequence = &mut self.next_sequence;
        let tx = self.transactions.entry(id.clone()).or_insert_with(|| {
            let sequence = *next_sequence;
            *next_sequence += 1;
            Transaction::new(id, sequence)
        });

        let summary = response_summary(&event);
        let duration = duration_text(tx.request.as_ref(), &event);
        tx.response = Some(event);

        if let Some(handle) = tx.handle {
            updates.push(UiUpdate::UpdateRow {
                handle,
                response: summary,
                duration,
            });
        }
    }

    /// Read-only lookup for the detail view; does not touch ordering
    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    /// Transactions holding a response that never showed a row (capture
    /// started mid-exchange). The presentation layer decides whether and
    /// how to surface these.
    pub fn unmatched_responses(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .values()
            .filter(|tx| tx.handle.is_none() && tx.response.is_some())
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Drop every transaction. Sequence numbers keep counting so a display
    /// order is never reused within the process.
    pub fn clear(&mut self) {
        self.transactions.clear();
    }
}

impl Default for TransactionCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

fn request_summary(event: &CaptureEvent) -> RequestSummary {
    let method = event.method.unwrap_or(HttpMethod::Get);
    let host = event
        .header("Host")
        .map(render::decode_text)
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let path = event.url.clone().unwrap_or_else(|| "/".to_string());
    RequestSummary {
        method,
        method_class: MethodClass::from_method(method),
        host,
        path,
    }
}

fn response_summary(event: &CaptureEvent) -> ResponseSummary {
    let content_type = event
        .header("Content-Type")
        .map(render::decode_text)
        .filter(|v| !v.is_empty())
        .map(|v| v.split(';').next().unwrap_or("").to_string())
        .unwrap_or_else(|| "-".to_string());
    let status_class = event
        .status_code
        .map(StatusClass::from_code)
        .unwrap_or(StatusClass::Other);
    ResponseSummary {
        status_code: event.status_code,
        status_class,
        content_type,
    }
}

/// `{ms}ms`, milliseconds truncated toward zero; `None` when either side
/// lacks a timestamp.
fn duration_text(request: Option<&CaptureEvent>, response: &CaptureEvent) -> Option<String> {
    let req_ts = request?.ts?;
    let res_ts = response.ts?;
    Some(format!("{}ms", ((res_ts - req_ts) * 1000.0) as i64))
}
