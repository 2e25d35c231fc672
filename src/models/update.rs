//! Incremental history-view updates
//!
//! The correlator describes display changes as plain data; the UI shell
//! decides how rows are actually built and painted.

use serde::{Deserialize, Serialize};

use super::event::HttpMethod;

/// Opaque reference to a rendered history row. Allocated once when a
/// transaction first shows a row and reused for every later update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowHandle(pub u64);

/// Cosmetic color-class hint for the method cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodClass {
    Get,
    Post,
    Delete,
    Other,
}

impl MethodClass {
    pub fn from_method(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => MethodClass::Get,
            HttpMethod::Post => MethodClass::Post,
            HttpMethod::Delete => MethodClass::Delete,
            _ => MethodClass::Other,
        }
    }
}

/// Cosmetic color-class hint for the status cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 4xx
    ClientError,
    /// 5xx and up
    ServerError,
    Other,
}

impl StatusClass {
    pub fn from_code(code: u16) -> Self {
        match code {
            200..=299 => StatusClass::Success,
            400..=499 => StatusClass::ClientError,
            code if code >= 500 => StatusClass::ServerError,
            _ => StatusClass::Other,
        }
    }
}

/// Everything a new history row needs from the request side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub method: HttpMethod,
    pub method_class: MethodClass,
    pub host: String,
    pub path: String,
}

/// Everything a row update needs from the response side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSummary {
    pub status_code: Option<u16>,
    pub status_class: StatusClass,
    /// Content-Type up to the first `;`, or `-` when absent
    pub content_type: String,
}

/// One display change, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiUpdate {
    /// A transaction showed its row for the first time
    NewRow {
        id: String,
        sequence: u64,
        handle: RowHandle,
        request: RequestSummary,
    },
    /// An existing row learned about its response
    UpdateRow {
        handle: RowHandle,
        response: ResponseSummary,
        /// Formatted as `{ms}ms`, truncated toward zero; absent when either
        /// side lacks a timestamp
        duration: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_classes_match_the_colored_methods() {
        assert_eq!(MethodClass::from_method(HttpMethod::Get), MethodClass::Get);
        assert_eq!(
            MethodClass::from_method(HttpMethod::Post),
            MethodClass::Post
        );
        assert_eq!(
            MethodClass::from_method(HttpMethod::Delete),
            MethodClass::Delete
        );
        assert_eq!(
            MethodClass::from_method(HttpMethod::Patch),
            MethodClass::Other
        );
    }

    #[test]
    fn status_classes_follow_code_ranges() {
        assert_eq!(StatusClass::from_code(200), StatusClass::Success);
        assert_eq!(StatusClass::from_code(299), StatusClass::Success);
        assert_eq!(StatusClass::from_code(301), StatusClass::Other);
        assert_eq!(StatusClass::from_code(404), StatusClass::ClientError);
        assert_eq!(StatusClass::from_code(500), StatusClass::ServerError);
        assert_eq!(StatusClass::from_code(599), StatusClass::ServerError);
        assert_eq!(StatusClass::from_code(101), StatusClass::Other);
    }

    #[test]
    fn new_row_serializes_the_fields_the_ui_binds() {
        let update = UiUpdate::NewRow {
            id: "tx-1".into(),
            sequence: 1,
            handle: RowHandle(1),
            request: RequestSummary {
                method: HttpMethod::Get,
                method_class: MethodClass::Get,
                host: "api.example.com".into(),
                path: "/users".into(),
            },
        };

        let value = serde_json::to_value(&update).unwrap();
        let row = &value["NewRow"];
        assert_eq!(row["sequence"], 1);
        assert_eq!(row["id"], "tx-1");
        assert_eq!(row["request"]["host"], "api.example.com");
        assert_eq!(row["request"]["method_class"], "Get");
    }
}
