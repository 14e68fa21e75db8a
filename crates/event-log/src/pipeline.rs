use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use chrono::Local;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::EventLogConfig;
use crate::record::{
    AccessRecord, AclRule, GroupResolver, LogEvent, RequestSummary, Scorecard, TlsRecord,
};
use crate::sink::Sink;

/// A cheap, cloneable handle used to submit access and TLS events to their
/// writer loops.
///
/// Each category has its own channel and its own loop, so a stalled access
/// log never holds up TLS logging and vice versa. Sends wait while the
/// channel is full. No record is ever dropped for lack of space.
#[derive(Clone)]
pub struct EventLog {
    access_tx: mpsc::Sender<LogEvent>,
    tls_tx: mpsc::Sender<LogEvent>,
}

/// Join handles for the two writer loops.
pub struct WriterHandles {
    access: JoinHandle<()>,
    tls: JoinHandle<()>,
}

impl WriterHandles {
    /// Wait for both loops to drain their channels and close their sinks.
    ///
    /// The loops only finish once every [`EventLog`] clone has been dropped.
    pub async fn join(self) {
        for (category, handle) in [("access", self.access), ("tls", self.tls)] {
            if let Err(err) = handle.await {
                error!(category, %err, "event log writer task failed");
            }
        }
    }
}

impl EventLog {
    /// Open both sinks and spawn one writer loop per category.
    ///
    /// Must be called from within a tokio runtime. Each loop runs on the
    /// blocking pool because sink writes are synchronous file I/O.
    pub fn start(config: &EventLogConfig) -> (Self, WriterHandles) {
        let capacity = config.channel_capacity.max(1);

        let (access_tx, access_rx) = mpsc::channel::<LogEvent>(capacity);
        let (tls_tx, tls_rx) = mpsc::channel::<LogEvent>(capacity);

        let access_sink = Sink::open(&config.access_log);
        let tls_sink = Sink::open(&config.tls_log);

        let access = tokio::task::spawn_blocking(move || {
            run_writer_loop("access", access_sink, access_rx);
        });
        let tls = tokio::task::spawn_blocking(move || {
            run_writer_loop("tls", tls_sink, tls_rx);
        });

        (Self { access_tx, tls_tx }, WriterHandles { access, tls })
    }

    /// Hand a formatted access event to the access writer loop.
    pub async fn submit_access_event(&self, event: LogEvent) {
        if let Err(err) = self.access_tx.send(event).await {
            warn!(fields = ?err.0.fields(), "access log channel closed; entry dropped");
        }
    }

    /// Hand a formatted TLS event to the TLS writer loop.
    pub async fn submit_tls_event(&self, event: LogEvent) {
        if let Err(err) = self.tls_tx.send(event).await {
            warn!(fields = ?err.0.fields(), "tls log channel closed; entry dropped");
        }
    }

    /// Like [`submit_access_event`](Self::submit_access_event), for producers
    /// running on plain threads. Panics if called from inside an async
    /// context.
    pub fn blocking_submit_access_event(&self, event: LogEvent) {
        if let Err(err) = self.access_tx.blocking_send(event) {
            warn!(fields = ?err.0.fields(), "access log channel closed; entry dropped");
        }
    }

    /// Like [`submit_tls_event`](Self::submit_tls_event), for producers
    /// running on plain threads.
    pub fn blocking_submit_tls_event(&self, event: LogEvent) {
        if let Err(err) = self.tls_tx.blocking_send(event) {
            warn!(fields = ?err.0.fields(), "tls log channel closed; entry dropped");
        }
    }

    /// Record the outcome of a request judged by the content scorer.
    pub async fn log_access<R>(
        &self,
        request: &RequestSummary,
        scorecard: &Scorecard<R>,
        groups: &dyn GroupResolver,
    ) where
        R: Display + Eq + Hash,
    {
        let record = AccessRecord::from_scorecard(Local::now(), request, scorecard, groups);
        self.submit_access_event(record.to_event()).await;
    }

    /// Record the outcome of a request decided by an ACL rule.
    pub async fn log_access_acl<R>(
        &self,
        request: &RequestSummary,
        tally: &HashMap<R, i64>,
        scores: &HashMap<String, i64>,
        rule: &AclRule,
    ) where
        R: Display + Eq + Hash,
    {
        let record = AccessRecord::from_acl(Local::now(), request, tally, scores, rule);
        self.submit_access_event(record.to_event()).await;
    }

    /// Record the outcome of a TLS handshake with `server_name` at
    /// `server_addr`.
    pub async fn log_tls(
        &self,
        user: &str,
        server_addr: &str,
        server_name: &str,
        err: Option<&(dyn std::error::Error + Send + Sync)>,
    ) {
        let record = TlsRecord::new(
            Local::now(),
            user,
            server_addr,
            server_name,
            err.map(|e| e as &dyn std::error::Error),
        );
        self.submit_tls_event(record.to_event()).await;
    }
}

/// Core loop executed on the blocking pool.
///
/// Writes each received event to `sink` in arrival order. A failed write is
/// reported and skipped. When every sender is gone the sink is closed and
/// the loop exits.
fn run_writer_loop(category: &'static str, mut sink: Sink, mut rx: mpsc::Receiver<LogEvent>) {
    debug!(category, fallback = sink.is_fallback(), "event log writer started");

    while let Some(event) = rx.blocking_recv() {
        if let Err(err) = sink.write(&event) {
            error!(category, %err, "failed to write event log record");
        }
    }

    if let Err(err) = sink.close() {
        error!(category, %err, "failed to close event log on shutdown");
    }
    debug!(category, "event log writer shutting down");
}
