use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use chrono::{DateTime, Local};

use crate::format::{coerce_to_text, format_scores, format_tally, format_timestamp, format_user};

/// One formatted log line: an ordered list of text fields.
///
/// Built by the producer, then moved through the channel to the writer loop
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    fields: Vec<String>,
}

impl LogEvent {
    /// Wrap already-formatted fields, in output order.
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// The fields in the order they are written.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl From<Vec<String>> for LogEvent {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

/// Looks up the named group a user belongs to.
///
/// Called from many request handlers at once, so implementations must be
/// safe for concurrent reads.
pub trait GroupResolver: Send + Sync {
    fn group_for(&self, user: &str) -> Option<String>;
}

impl<S> GroupResolver for HashMap<String, String, S>
where
    S: std::hash::BuildHasher + Send + Sync,
{
    fn group_for(&self, user: &str) -> Option<String> {
        self.get(user).cloned()
    }
}

impl<F> GroupResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn group_for(&self, user: &str) -> Option<String> {
        self(user)
    }
}

/// Result of scoring a request against the filtering rules.
#[derive(Debug, Clone)]
pub struct Scorecard<R> {
    /// Decision label, e.g. `allow` or `block`.
    pub action: String,
    /// How many times each rule matched.
    pub tally: HashMap<R, i64>,
    /// Accumulated score per category.
    pub scores: HashMap<String, i64>,
    /// Descriptions of the rules that caused a block.
    pub blocked: Vec<String>,
}

impl<R> Default for Scorecard<R> {
    fn default() -> Self {
        Self {
            action: String::new(),
            tally: HashMap::new(),
            scores: HashMap::new(),
            blocked: Vec::new(),
        }
    }
}

/// An ACL rule that decided the fate of a request.
#[derive(Debug, Clone, Default)]
pub struct AclRule {
    pub action: String,
    pub conditions: Vec<String>,
}

impl AclRule {
    /// The rule's conditions as a single space-separated string.
    pub fn conditions(&self) -> String {
        self.conditions.join(" ")
    }
}

/// Request-side facts about a completed proxied request.
#[derive(Debug, Clone, Default)]
pub struct RequestSummary {
    pub url: String,
    pub method: String,
    /// `None` when no response was produced.
    pub response_status: Option<u16>,
    pub content_type: String,
    pub content_length: i64,
    /// Content was partially removed before delivery.
    pub pruned: bool,
    pub user: String,
}

/// One access-log row.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub timestamp: DateTime<Local>,
    /// Already annotated with the group, if any.
    pub user: String,
    pub action: String,
    pub url: String,
    pub method: String,
    /// `0` if no response was produced.
    pub status: u16,
    pub content_type: String,
    pub content_length: i64,
    pub pruned: bool,
    pub tally: String,
    pub scores: String,
    /// Blocked-rule descriptions, or ACL conditions for ACL decisions.
    pub rules: String,
}

impl AccessRecord {
    /// Build a record for a request judged by the content scorer.
    pub fn from_scorecard<R>(
        timestamp: DateTime<Local>,
        request: &RequestSummary,
        scorecard: &Scorecard<R>,
        groups: &dyn GroupResolver,
    ) -> Self
    where
        R: Display + Eq + Hash,
    {
        let group = groups.group_for(&request.user);
        Self {
            timestamp,
            user: format_user(&request.user, group.as_deref()),
            action: scorecard.action.clone(),
            url: request.url.clone(),
            method: request.method.clone(),
            status: request.response_status.unwrap_or(0),
            content_type: request.content_type.clone(),
            content_length: request.content_length,
            pruned: request.pruned,
            tally: format_tally(&scorecard.tally),
            scores: format_scores(&scorecard.scores),
            rules: scorecard.blocked.join(", "),
        }
    }

    /// Build a record for a request decided by an ACL rule.
    ///
    /// The user is logged as given, without a group annotation.
    pub fn from_acl<R>(
        timestamp: DateTime<Local>,
        request: &RequestSummary,
        tally: &HashMap<R, i64>,
        scores: &HashMap<String, i64>,
        rule: &AclRule,
    ) -> Self
    where
        R: Display + Eq + Hash,
    {
        Self {
            timestamp,
            user: request.user.clone(),
            action: rule.action.clone(),
            url: request.url.clone(),
            method: request.method.clone(),
            status: request.response_status.unwrap_or(0),
            content_type: request.content_type.clone(),
            content_length: request.content_length,
            pruned: request.pruned,
            tally: format_tally(tally),
            scores: format_scores(scores),
            rules: rule.conditions(),
        }
    }

    pub fn to_event(&self) -> LogEvent {
        let modified = if self.pruned { "pruned" } else { "" };
        LogEvent::new(vec![
            format_timestamp(&self.timestamp),
            self.user.clone(),
            self.action.clone(),
            self.url.clone(),
            self.method.clone(),
            coerce_to_text(self.status),
            self.content_type.clone(),
            coerce_to_text(self.content_length),
            modified.to_string(),
            self.tally.clone(),
            self.scores.clone(),
            self.rules.clone(),
        ])
    }
}

/// One TLS-log row describing a handshake outcome.
#[derive(Debug, Clone)]
pub struct TlsRecord {
    pub timestamp: DateTime<Local>,
    pub user: String,
    pub server_name: String,
    pub server_addr: String,
    /// Empty when the handshake succeeded.
    pub error: String,
}

impl TlsRecord {
    pub fn new(
        timestamp: DateTime<Local>,
        user: impl Into<String>,
        server_addr: impl Into<String>,
        server_name: impl Into<String>,
        error: Option<&dyn std::error::Error>,
    ) -> Self {
        Self {
            timestamp,
            user: user.into(),
            server_name: server_name.into(),
            server_addr: server_addr.into(),
            error: error.map(|err| err.to_string()).unwrap_or_default(),
        }
    }

    pub fn to_event(&self) -> LogEvent {
        LogEvent::new(vec![
            format_timestamp(&self.timestamp),
            self.user.clone(),
            self.server_name.clone(),
            self.server_addr.clone(),
            self.error.clone(),
        ])
    }
}
