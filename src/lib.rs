//! # Nibble Capture Core
//!
//! Traffic capture and correlation engine for the Nibble HTTP inspector.
//! Sits downstream of the intercepting proxy layer: it buffers decoded
//! request/response events under bounded memory, pairs them into
//! transactions, and describes the history view's incremental updates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Inspector UI shell                    │
//! ├──────────────────────────────────────────────────────────┤
//! │                  Nibble Capture Core (Rust)               │
//! │  ┌─────────┐   ┌─────────────┐   ┌────────────────────┐  │
//! │  │ Capture │──▶│ Transaction │──▶│   Raw rendering    │  │
//! │  │ buffer  │   │ correlator  │   │ (feed/detail view) │  │
//! │  └─────────┘   └─────────────┘   └────────────────────┘  │
//! │       ▲                                                   │
//! └───────┼───────────────────────────────────────────────────┘
//!         │ push (any thread)
//!   proxy layer (external)
//! ```

// Public modules
pub mod api;
pub mod capture;
pub mod correlate;
pub mod models;
pub mod render;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
