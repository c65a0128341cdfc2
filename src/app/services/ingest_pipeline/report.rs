//! Run statistics for an ingestion pass

use serde::Serialize;
use std::time::Duration;

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Non-blank source lines encountered
    pub lines_read: usize,

    /// Documents accepted by the sink
    pub records_written: usize,

    /// Lines with the wrong token count or invalid encoding
    pub format_errors: usize,

    /// Records skipped because a field failed coercion
    pub parse_failures: usize,

    /// Records skipped for lacking a document identity
    pub identity_failures: usize,

    /// Fields set absent after failing coercion
    pub fields_nulled: usize,

    /// Fields set absent because they held the sentinel
    pub sentinel_nulls: usize,

    /// Documents the sink refused
    pub sink_rejections: usize,

    /// Documents whose identity already appeared earlier in this run; only
    /// counted when duplicate tracking is enabled
    pub duplicate_ids: usize,

    /// Bulk requests sent to the sink
    pub batches_sent: usize,

    /// Run stopped early on cancellation
    pub cancelled: bool,

    /// Human-readable issue descriptions, capped
    pub issues: Vec<String>,

    /// Issues not retained because the cap was reached
    pub issues_truncated: usize,

    #[serde(skip)]
    pub elapsed: Duration,

    #[serde(skip)]
    max_issues: usize,
}

impl IngestReport {
    pub fn new(max_issues: usize) -> Self {
        Self {
            max_issues,
            ..Default::default()
        }
    }

    /// Record an issue message, respecting the cap
    pub fn push_issue(&mut self, issue: impl Into<String>) {
        if self.issues.len() < self.max_issues {
            self.issues.push(issue.into());
        } else {
            self.issues_truncated += 1;
        }
    }

    /// Lines that did not end up as a written document
    pub fn failed_lines(&self) -> usize {
        self.format_errors + self.parse_failures + self.identity_failures + self.sink_rejections
    }

    /// Written documents as a percentage of lines read
    pub fn success_rate(&self) -> f64 {
        if self.lines_read == 0 {
            0.0
        } else {
            (self.records_written as f64 / self.lines_read as f64) * 100.0
        }
    }

    /// Every line was written without field-level repairs
    pub fn is_clean(&self) -> bool {
        self.failed_lines() == 0 && self.fields_nulled == 0 && !self.cancelled
    }
}
