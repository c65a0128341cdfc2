//! Core record decoder implementation
//!
//! Tokenizes delimited lines with the `csv` crate (quote-aware, no header
//! row) and checks every line against the schema length itself, so a short
//! or long line is reported rather than padded or truncated.

use csv::{ByteRecord, Reader, ReaderBuilder, StringRecord};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

use super::error::DecodeError;
use crate::app::models::RawRecord;
use crate::constants::{DEFAULT_DELIMITER, QUOTE_CHAR};
use crate::schema::RecordSchema;

/// Decoder turning delimited source lines into [`RawRecord`]s
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    schema: Arc<RecordSchema>,
    delimiter: u8,
}

impl RecordDecoder {
    /// Create a decoder for the given positional schema
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            delimiter: DEFAULT_DELIMITER,
        }
    }

    /// Use a different field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(QUOTE_CHAR);
        builder
    }

    /// Decode a single line of source text
    pub fn decode_line(&self, line: &str, line_number: u64) -> Result<RawRecord, DecodeError> {
        let mut reader = self.reader_builder().from_reader(line.as_bytes());
        let mut record = ByteRecord::new();

        let found = reader
            .read_byte_record(&mut record)
            .map_err(|source| DecodeError::Reader {
                line: line_number,
                source,
            })?;

        if !found {
            return Err(DecodeError::Format {
                line: line_number,
                expected: self.schema.len(),
                found: 0,
            });
        }

        self.zip(record, line_number)
    }

    /// Stream decoded records from a reader, one item per non-blank line
    pub fn records<R: Read>(&self, source: R) -> DecodedRecords<R> {
        DecodedRecords {
            reader: self.reader_builder().from_reader(source),
            decoder: self.clone(),
            record: ByteRecord::new(),
            last_line: 0,
            finished: false,
        }
    }

    /// Zip one tokenized line against the schema field names
    fn zip(&self, record: ByteRecord, line_number: u64) -> Result<RawRecord, DecodeError> {
        if record.len() != self.schema.len() {
            debug!(
                "Line {}: {} tokens, schema expects {}",
                line_number,
                record.len(),
                self.schema.len()
            );
            return Err(DecodeError::Format {
                line: line_number,
                expected: self.schema.len(),
                found: record.len(),
            });
        }

        let record =
            StringRecord::from_byte_record(record).map_err(|e| DecodeError::Encoding {
                line: line_number,
                message: e.utf8_error().to_string(),
            })?;

        let values = self
            .schema
            .iter()
            .zip(record.iter())
            .map(|(spec, token)| (spec.name.clone(), token.to_string()))
            .collect();

        Ok(RawRecord::new(line_number, values))
    }
}

/// Iterator over decoded lines of a source reader
///
/// Recoverable failures are yielded in place of the offending line and the
/// iteration continues. A reader failure is yielded once and ends the stream.
pub struct DecodedRecords<R: Read> {
    reader: Reader<R>,
    decoder: RecordDecoder,
    record: ByteRecord,
    last_line: u64,
    finished: bool,
}

impl<R: Read> Iterator for DecodedRecords<R> {
    type Item = Result<RawRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_byte_record(&mut self.record) {
            Ok(true) => {
                let line_number = self
                    .record
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(self.last_line + 1);
                self.last_line = line_number;

                Some(self.decoder.zip(self.record.clone(), line_number))
            }
            Ok(false) => {
                self.finished = true;
                None
            }
            Err(source) => {
                self.finished = true;
                Some(Err(DecodeError::Reader {
                    line: self.last_line,
                    source,
                }))
            }
        }
    }
}
