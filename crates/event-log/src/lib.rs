//! Asynchronous CSV event logging for the filtering proxy.
//!
//! Two categories of events are recorded: access decisions for proxied HTTP
//! requests, and TLS handshake outcomes. Request handlers format an event
//! and hand it to an [`EventLog`]. A dedicated writer loop per category
//! appends it as one CSV record to that category's [`Sink`] and flushes it.
//! Handlers never see logging errors.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use event_log::{EventLog, EventLogConfig, RequestSummary, Scorecard};
//!
//! # async fn example() {
//! let config = EventLogConfig {
//!     access_log: "/var/log/proxy/access.csv".into(),
//!     tls_log: "/var/log/proxy/tls.csv".into(),
//!     ..Default::default()
//! };
//! let (log, writers) = EventLog::start(&config);
//!
//! let groups: HashMap<String, String> = HashMap::new();
//! let request = RequestSummary {
//!     url: "http://example.com/".into(),
//!     method: "GET".into(),
//!     response_status: Some(200),
//!     user: "alice".into(),
//!     ..Default::default()
//! };
//! log.log_access(&request, &Scorecard::<String>::default(), &groups)
//!     .await;
//!
//! drop(log);
//! writers.join().await;
//! # }
//! ```

pub mod config;
pub mod format;
pub mod pipeline;
pub mod record;
pub mod sink;

// Re-export primary public types at the crate root for convenience.
pub use config::EventLogConfig;
pub use pipeline::{EventLog, WriterHandles};
pub use record::{
    AccessRecord, AclRule, GroupResolver, LogEvent, RequestSummary, Scorecard, TlsRecord,
};
pub use sink::{Sink, SinkError};
