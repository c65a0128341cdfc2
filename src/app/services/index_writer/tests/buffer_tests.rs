//! Tests for batch accumulation

use super::*;
use crate::app::services::index_writer::BulkBuffer;

#[test]
fn test_buffer_returns_full_batches() {
    let mut buffer = BulkBuffer::new(2);

    assert!(buffer.push(document("a", 1, 1.0)).is_none());
    let batch = buffer.push(document("b", 2, 2.0)).unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].id, "a");
    assert!(buffer.is_empty());

    assert!(buffer.push(document("c", 3, 3.0)).is_none());
    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.take().len(), 1);
    assert!(buffer.take().is_empty());
}

#[test]
fn test_buffer_size_is_at_least_one() {
    let mut buffer = BulkBuffer::new(0);
    assert_eq!(buffer.batch_size(), 1);
    assert!(buffer.push(document("a", 1, 1.0)).is_some());
}
