//! Protobuf wire codec for log records
//!
//! Records are encoded as a `LogEntry` protobuf message and batches as a
//! `LogEntries` message, so a drained batch can be handed to any protobuf
//! transport as-is:
//!
//! ```text
//! message LogEntry {
//!   bytes  message   = 1;
//!   uint32 level     = 2;
//!   uint32 flags     = 3;
//!   sint64 timestamp = 4;   // always present
//!   uint32 line      = 5;
//!   uint32 thread    = 6;
//! }
//!
//! message LogEntries {
//!   repeated LogEntry entries = 1;
//! }
//! ```
//!
//! Fields holding their default value are left out, except `timestamp`.
//! Encoding and decoding both work on caller-provided slices; the only
//! heap-free way to get a record's message back is to borrow it, so
//! [`decode`] returns a [`LogRecord`] pointing into the input.

use prost::bytes::{Buf, BufMut};
use prost::encoding::{
    decode_key, decode_varint, encode_key, encode_varint, encoded_len_varint, key_len,
    sint64, skip_field, uint32, DecodeContext, WireType,
};

use crate::{LogQueueError, LogQueueResult, LogRecord};

pub const MESSAGE_TAG: u32 = 1;
pub const LEVEL_TAG: u32 = 2;
pub const FLAGS_TAG: u32 = 3;
pub const TIMESTAMP_TAG: u32 = 4;
pub const LINE_TAG: u32 = 5;
pub const THREAD_TAG: u32 = 6;

/// Field number of `LogEntries.entries`
pub const BATCH_ENTRIES_TAG: u32 = 1;

const MAX_VARINT32_LEN: usize = 5;
const MAX_VARINT64_LEN: usize = 10;

/// Exact number of bytes [`encode`] writes for `record`
pub fn encoded_len(record: &LogRecord<'_>) -> usize {
    let mut len = sint64::encoded_len(TIMESTAMP_TAG, &record.timestamp);
    if !record.message.is_empty() {
        len += length_delimited_len(MESSAGE_TAG, record.message.len());
    }
    for (tag, value) in optional_fields(record) {
        if value != 0 {
            len += uint32::encoded_len(tag, &value);
        }
    }
    len
}

/// Upper bound on the encoded size of any record with a `message_len` byte message
///
/// Use it to size encode buffers so that [`encode`] cannot fail for
/// messages up to that length.
pub fn max_encoded_len(message_len: usize) -> usize {
    let scalar_fields = [LEVEL_TAG, FLAGS_TAG, LINE_TAG, THREAD_TAG]
        .iter()
        .map(|&tag| key_len(tag) + MAX_VARINT32_LEN)
        .sum::<usize>();
    length_delimited_len(MESSAGE_TAG, message_len)
        + scalar_fields
        + key_len(TIMESTAMP_TAG)
        + MAX_VARINT64_LEN
}

/// Encodes `record` into the front of `out`
///
/// Returns the number of bytes written. Fails with
/// [`LogQueueError::EncodingFailed`] without touching `out` when the record
/// does not fit.
pub fn encode(record: &LogRecord<'_>, out: &mut [u8]) -> LogQueueResult<usize> {
    let required = encoded_len(record);
    if required > out.len() {
        return Err(LogQueueError::EncodingFailed {
            required,
            available: out.len(),
        });
    }

    // Field order follows tag order.
    let mut cursor = &mut out[..required];
    if !record.message.is_empty() {
        encode_key(MESSAGE_TAG, WireType::LengthDelimited, &mut cursor);
        encode_varint(record.message.len() as u64, &mut cursor);
        cursor.put_slice(record.message);
    }
    if record.level != 0 {
        uint32::encode(LEVEL_TAG, &record.level, &mut cursor);
    }
    if record.flags != 0 {
        uint32::encode(FLAGS_TAG, &record.flags, &mut cursor);
    }
    sint64::encode(TIMESTAMP_TAG, &record.timestamp, &mut cursor);
    if record.line != 0 {
        uint32::encode(LINE_TAG, &record.line, &mut cursor);
    }
    if record.thread != 0 {
        uint32::encode(THREAD_TAG, &record.thread, &mut cursor);
    }
    debug_assert!(cursor.is_empty());

    Ok(required)
}

/// Decodes one `LogEntry`, borrowing the message from `bytes`
///
/// Absent fields decode to their defaults; unknown fields are skipped.
pub fn decode(bytes: &[u8]) -> LogQueueResult<LogRecord<'_>> {
    let total = bytes.len();
    let mut cursor = bytes;
    let mut record = LogRecord::default();
    let malformed = |rest: &[u8]| LogQueueError::MalformedRecord {
        offset: total - rest.len(),
    };

    while cursor.has_remaining() {
        let (tag, wire_type) = decode_key(&mut cursor).map_err(|_| malformed(cursor))?;
        let field = match tag {
            MESSAGE_TAG => {
                if wire_type != WireType::LengthDelimited {
                    return Err(malformed(cursor));
                }
                let len = decode_varint(&mut cursor).map_err(|_| malformed(cursor))? as usize;
                if len > cursor.len() {
                    return Err(malformed(cursor));
                }
                let (message, rest) = cursor.split_at(len);
                record.message = message;
                cursor = rest;
                Ok(())
            }
            LEVEL_TAG => uint32::merge(wire_type, &mut record.level, &mut cursor, ctx()),
            FLAGS_TAG => uint32::merge(wire_type, &mut record.flags, &mut cursor, ctx()),
            TIMESTAMP_TAG => sint64::merge(wire_type, &mut record.timestamp, &mut cursor, ctx()),
            LINE_TAG => uint32::merge(wire_type, &mut record.line, &mut cursor, ctx()),
            THREAD_TAG => uint32::merge(wire_type, &mut record.thread, &mut cursor, ctx()),
            _ => skip_field(wire_type, tag, &mut cursor, ctx()),
        };
        field.map_err(|_| malformed(cursor))?;
    }

    Ok(record)
}

/// Reads only the timestamp of an encoded record
///
/// Accepts any [`Buf`], including the two-part view of an entry that wraps
/// around the end of the ring. A record without a timestamp field yields 0.
pub fn decode_timestamp<B: Buf>(mut buf: B) -> LogQueueResult<i64> {
    let total = buf.remaining();
    let mut timestamp = 0i64;

    while buf.has_remaining() {
        let offset = total - buf.remaining();
        let malformed = |_| LogQueueError::MalformedRecord { offset };
        let (tag, wire_type) = decode_key(&mut buf).map_err(malformed)?;
        if tag == TIMESTAMP_TAG {
            sint64::merge(wire_type, &mut timestamp, &mut buf, ctx()).map_err(malformed)?;
        } else {
            skip_field(wire_type, tag, &mut buf, ctx()).map_err(malformed)?;
        }
    }

    Ok(timestamp)
}

/// Bytes one record of `record_len` bytes occupies inside a `LogEntries` batch
pub fn batch_frame_len(record_len: usize) -> usize {
    length_delimited_len(BATCH_ENTRIES_TAG, record_len)
}

/// Writes the `LogEntries.entries` key and length for a record of `record_len` bytes
///
/// Returns the header length. `out` must hold at least
/// `batch_frame_len(record_len) - record_len` bytes.
pub(crate) fn write_batch_header(record_len: usize, out: &mut [u8]) -> usize {
    let header_len = key_len(BATCH_ENTRIES_TAG) + encoded_len_varint(record_len as u64);
    let mut cursor = &mut out[..header_len];
    encode_key(BATCH_ENTRIES_TAG, WireType::LengthDelimited, &mut cursor);
    encode_varint(record_len as u64, &mut cursor);
    header_len
}

/// Iterates over the records of a `LogEntries` batch
///
/// ```rust
/// use ringlog_core::{wire, LogQueue, LogRecord};
///
/// let mut ring = [0u8; 128];
/// let mut scratch = [0u8; 64];
/// let mut queue = LogQueue::new(&mut ring, &mut scratch[..]);
/// queue.push(&LogRecord::new(b"boot", 1)).unwrap();
/// queue.push(&LogRecord::new(b"ready", 2)).unwrap();
///
/// let mut out = [0u8; 64];
/// let batch = queue.pop_multiple(&mut out).unwrap();
/// let timestamps: Vec<i64> = wire::batch_records(batch.as_bytes())
///     .map(|r| r.unwrap().timestamp)
///     .collect();
/// assert_eq!(timestamps, [1, 2]);
/// ```
pub fn batch_records(bytes: &[u8]) -> BatchRecords<'_> {
    BatchRecords {
        total: bytes.len(),
        rest: bytes,
    }
}

/// Iterator returned by [`batch_records`]
#[derive(Debug, Clone)]
pub struct BatchRecords<'a> {
    total: usize,
    rest: &'a [u8],
}

impl<'a> BatchRecords<'a> {
    fn malformed(&mut self) -> Option<LogQueueResult<LogRecord<'a>>> {
        let offset = self.total - self.rest.len();
        self.rest = &[];
        Some(Err(LogQueueError::MalformedRecord { offset }))
    }
}

impl<'a> Iterator for BatchRecords<'a> {
    type Item = LogQueueResult<LogRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.rest.has_remaining() {
            let mut cursor = self.rest;
            let Ok((tag, wire_type)) = decode_key(&mut cursor) else {
                return self.malformed();
            };

            if tag != BATCH_ENTRIES_TAG || wire_type != WireType::LengthDelimited {
                if skip_field(wire_type, tag, &mut cursor, ctx()).is_err() {
                    return self.malformed();
                }
                self.rest = cursor;
                continue;
            }

            let Ok(len) = decode_varint(&mut cursor) else {
                return self.malformed();
            };
            let len = len as usize;
            if len > cursor.len() {
                return self.malformed();
            }

            let (record, rest) = cursor.split_at(len);
            let record_offset = self.total - cursor.len();
            self.rest = rest;
            return Some(decode(record).map_err(|e| match e {
                LogQueueError::MalformedRecord { offset } => LogQueueError::MalformedRecord {
                    offset: record_offset + offset,
                },
                other => other,
            }));
        }
        None
    }
}

fn length_delimited_len(tag: u32, len: usize) -> usize {
    key_len(tag) + encoded_len_varint(len as u64) + len
}

fn optional_fields(record: &LogRecord<'_>) -> [(u32, u32); 4] {
    [
        (LEVEL_TAG, record.level),
        (FLAGS_TAG, record.flags),
        (LINE_TAG, record.line),
        (THREAD_TAG, record.thread),
    ]
}

fn ctx() -> DecodeContext {
    DecodeContext::default()
}
