//! Main IngestPipeline implementation
//!
//! Streams decoded lines through normalization and into the sink buffer,
//! applying the configured error policy at line and field granularity.

use clap::ValueEnum;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::report::IngestReport;
use crate::app::services::field_normalizer::{FieldNormalizer, NormalizerOptions};
use crate::app::services::index_writer::{BulkBuffer, IndexDocument, IndexSink};
use crate::app::services::record_decoder::RecordDecoder;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_REPORTED_ISSUES};
use crate::schema::RecordSchema;
use crate::Result;

/// What to do with a record that has fields failing coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FieldErrorPolicy {
    /// Leave the failed fields absent and keep the record
    #[default]
    NullField,
    /// Drop the whole record
    SkipRecord,
    /// Stop the run
    Abort,
}

/// Error policy of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestPolicy {
    /// Abort on the first malformed line instead of skipping it
    pub strict_format: bool,
    pub on_field_error: FieldErrorPolicy,
}

/// Decoder, normalizer and sink wiring for one source
#[derive(Clone)]
pub struct IngestPipeline {
    schema: Arc<RecordSchema>,
    decoder: RecordDecoder,
    normalizer: FieldNormalizer,
    policy: IngestPolicy,
    batch_size: usize,
    max_reported_issues: usize,
    track_duplicates: bool,
    progress: Option<ProgressBar>,
}

impl IngestPipeline {
    /// Create a pipeline with default normalizer options and batch size
    pub fn new(schema: Arc<RecordSchema>, policy: IngestPolicy) -> Self {
        Self {
            decoder: RecordDecoder::new(schema.clone()),
            normalizer: FieldNormalizer::new(schema.clone(), NormalizerOptions::default()),
            schema,
            policy,
            batch_size: DEFAULT_BATCH_SIZE,
            max_reported_issues: DEFAULT_MAX_REPORTED_ISSUES,
            track_duplicates: false,
            progress: None,
        }
    }

    pub fn with_normalizer_options(mut self, options: NormalizerOptions) -> Self {
        self.normalizer = FieldNormalizer::new(self.schema.clone(), options);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.decoder = self.decoder.with_delimiter(delimiter);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_reported_issues(mut self, max: usize) -> Self {
        self.max_reported_issues = max;
        self
    }

    /// Count repeated identities in `duplicate_ids`
    ///
    /// Keeps every distinct document id of the run in memory, so memory
    /// grows with the number of distinct documents in the source.
    pub fn with_duplicate_tracking(mut self, enabled: bool) -> Self {
        self.track_duplicates = enabled;
        self
    }

    /// Tick a progress bar once per source line
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn policy(&self) -> IngestPolicy {
        self.policy
    }

    /// Run the source through the pipeline into the sink
    ///
    /// Cancellation is observed between lines; documents already buffered
    /// are still written before returning.
    pub async fn run<R, S>(
        &self,
        source: R,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<IngestReport>
    where
        R: Read,
        S: IndexSink + ?Sized,
    {
        let start_time = Instant::now();
        let mut report = IngestReport::new(self.max_reported_issues);
        let mut buffer = BulkBuffer::new(self.batch_size);
        let mut seen_ids: Option<HashSet<String>> = self.track_duplicates.then(HashSet::new);

        info!(
            "Starting ingestion: {} fields per line, batch size {}, policy {:?}",
            self.schema().len(),
            buffer.batch_size(),
            self.policy
        );

        let mut records = self.decoder.records(source);
        loop {
            // Checked before reading so a cancelled run consumes no further input
            if cancel.is_cancelled() {
                info!("Cancellation requested, stopping after {} lines", report.lines_read);
                report.cancelled = true;
                break;
            }
            let Some(decoded) = records.next() else {
                break;
            };

            let raw = match decoded {
                Ok(raw) => {
                    report.lines_read += 1;
                    raw
                }
                Err(error) if !error.is_recoverable() => return Err(error.into()),
                Err(error) => {
                    report.lines_read += 1;
                    if self.policy.strict_format {
                        return Err(error.into());
                    }
                    debug!("Skipped malformed {}", error);
                    report.format_errors += 1;
                    report.push_issue(format!("Skipped {}", error));
                    self.tick();
                    continue;
                }
            };
            self.tick();

            let line = raw.line_number;
            let outcome = self.normalizer.normalize(&raw);
            report.sentinel_nulls += outcome.sentinel_fields.len();

            if !outcome.errors.is_empty() {
                match self.policy.on_field_error {
                    FieldErrorPolicy::NullField => {
                        report.fields_nulled += outcome.errors.len();
                        for error in &outcome.errors {
                            report.push_issue(format!("line {}: nulled {}", line, error));
                        }
                    }
                    FieldErrorPolicy::SkipRecord => {
                        report.parse_failures += 1;
                        for error in &outcome.errors {
                            report.push_issue(format!("line {}: skipped record, {}", line, error));
                        }
                        continue;
                    }
                    FieldErrorPolicy::Abort => {
                        if let Some(error) = outcome.errors.into_iter().next() {
                            return Err(error.into_error(line));
                        }
                    }
                }
            }

            let document = match IndexDocument::from_record(&outcome.record) {
                Ok(document) => document,
                Err(error) => {
                    debug!("Skipped unaddressable record: {}", error);
                    report.identity_failures += 1;
                    report.push_issue(error.to_string());
                    continue;
                }
            };

            if let Some(seen_ids) = seen_ids.as_mut() {
                if !seen_ids.insert(document.id.clone()) {
                    debug!("Line {}: identity '{}' repeats, overwriting", line, document.id);
                    report.duplicate_ids += 1;
                }
            }

            if let Some(batch) = buffer.push(document) {
                self.write_batch(sink, batch, &mut report).await?;
            }
        }

        let remaining = buffer.take();
        if !remaining.is_empty() {
            self.write_batch(sink, remaining, &mut report).await?;
        }
        sink.close().await?;

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        report.elapsed = start_time.elapsed();
        info!(
            "Ingestion finished: {} lines read, {} written, {} failed in {:.2?}",
            report.lines_read,
            report.records_written,
            report.failed_lines(),
            report.elapsed
        );

        Ok(report)
    }

    async fn write_batch<S>(
        &self,
        sink: &mut S,
        batch: Vec<IndexDocument>,
        report: &mut IngestReport,
    ) -> Result<()>
    where
        S: IndexSink + ?Sized,
    {
        let size = batch.len();
        let outcome = sink.write_batch(batch).await?;
        report.batches_sent += 1;
        report.records_written += outcome.written;
        report.sink_rejections += outcome.rejected.len();

        for rejected in &outcome.rejected {
            report.push_issue(format!(
                "line {}: sink rejected '{}' ({}): {}",
                rejected.line_number, rejected.id, rejected.status, rejected.reason
            ));
        }

        if !outcome.rejected.is_empty() {
            warn!(
                "Sink rejected {} of {} documents in batch",
                outcome.rejected.len(),
                size
            );
        } else {
            debug!("Sink accepted batch of {} documents", size);
        }
        Ok(())
    }

    fn tick(&self) {
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
    }
}
