//! End-to-end queue scenarios and wire compatibility with prost-generated types

use prost::Message;
use ringlog_core::{wire, DropStats, FramedRing, LogQueue, LogQueueError, LogRecord};

/// `LogEntry` as a protobuf toolchain would generate it
#[derive(Clone, PartialEq, Message)]
struct LogEntry {
    #[prost(bytes = "vec", tag = "1")]
    message: Vec<u8>,
    #[prost(uint32, tag = "2")]
    level: u32,
    #[prost(uint32, tag = "3")]
    flags: u32,
    #[prost(sint64, tag = "4")]
    timestamp: i64,
    #[prost(uint32, tag = "5")]
    line: u32,
    #[prost(uint32, tag = "6")]
    thread: u32,
}

#[derive(Clone, PartialEq, Message)]
struct LogEntries {
    #[prost(message, repeated, tag = "1")]
    entries: Vec<LogEntry>,
}

impl From<&LogRecord<'_>> for LogEntry {
    fn from(record: &LogRecord<'_>) -> Self {
        LogEntry {
            message: record.message.to_vec(),
            level: record.level,
            flags: record.flags,
            timestamp: record.timestamp,
            line: record.line,
            thread: record.thread,
        }
    }
}

/// Length of a timestamp-only record with a small timestamp
const MINIMAL_RECORD_LEN: usize = 2;

#[test]
fn three_slot_buffer_keeps_newest_three() {
    let frame = FramedRing::frame_len(MINIMAL_RECORD_LEN);
    let mut log_buffer = vec![0u8; 3 * frame];
    let mut encode_buffer = [0u8; 32];
    let mut queue = LogQueue::new(&mut log_buffer, &mut encode_buffer[..]);

    let timestamps = [11i64, 22, 33, 44, 55];
    for ts in timestamps {
        queue.push(&LogRecord::new(&[], ts)).unwrap();
    }

    assert_eq!(queue.len(), 3);
    assert_eq!(
        queue.drop_stats(),
        DropStats {
            dropped_entries: 2,
            latest_dropped_timestamp: 22
        }
    );

    let mut out = [0u8; 16];
    for expected in [33, 44, 55] {
        let entry = queue.pop(&mut out).unwrap();
        assert_eq!(wire::decode(entry).unwrap().timestamp, expected);
    }
    assert_eq!(queue.pop(&mut out), Err(LogQueueError::InvalidState));
}

#[test]
fn one_byte_destination_truncates_and_consumes() {
    let mut log_buffer = [0u8; 64];
    let mut encode_buffer = [0u8; 32];
    let mut queue = LogQueue::new(&mut log_buffer, &mut encode_buffer[..]);
    queue.push(&LogRecord::new(b"X", 1)).unwrap();

    let mut out = [0u8; 1];
    let err = queue.pop(&mut out).unwrap_err();
    assert_eq!(
        err,
        LogQueueError::DestinationTooSmall {
            required: 5,
            written: 1
        }
    );
    // First byte of the record is the message field key
    assert_eq!(out, [0x0A]);
    assert!(queue.is_empty());
    assert_eq!(queue.pop(&mut out), Err(LogQueueError::InvalidState));
}

#[test]
fn pop_on_empty_queue_is_a_no_op() {
    let mut log_buffer = [0u8; 32];
    let mut encode_buffer = [0u8; 32];
    let mut queue = LogQueue::new(&mut log_buffer, &mut encode_buffer[..]);

    let mut out = [0xFFu8; 8];
    for _ in 0..3 {
        assert_eq!(queue.pop(&mut out), Err(LogQueueError::InvalidState));
    }
    assert_eq!(out, [0xFF; 8]);
    assert_eq!(queue.drop_stats(), DropStats::default());
    assert_eq!(queue.ring().used_bytes(), 0);
}

#[test]
fn oversized_record_is_rejected_without_side_effects() {
    let mut log_buffer = [0u8; 24];
    let mut encode_buffer = [0u8; 64];
    let mut queue = LogQueue::new(&mut log_buffer, &mut encode_buffer[..]);
    queue.push(&LogRecord::new(b"a", 1)).unwrap();
    queue.push(&LogRecord::new(b"b", 2)).unwrap();
    let used = queue.ring().used_bytes();

    let err = queue.push(&LogRecord::new(&[0u8; 30], 3)).unwrap_err();
    assert!(matches!(err, LogQueueError::RecordTooLarge { capacity: 24, .. }));
    assert!(err.is_capacity_error());

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.ring().used_bytes(), used);
    assert_eq!(queue.drop_stats().dropped_entries, 0);
}

#[test]
fn encoding_matches_prost_generated_message() {
    let records = [
        LogRecord::new(b"\x9a\x3f\x00\x11", 1_650_000_000_000),
        LogRecord::new(b"", -1).with_level(5),
        LogRecord::new(b"msg", 7)
            .with_flags(1)
            .with_level(2)
            .with_line(314)
            .with_thread(0xBEEF),
    ];

    for record in &records {
        let mut ours = [0u8; 64];
        let n = wire::encode(record, &mut ours).unwrap();
        assert_eq!(&ours[..n], LogEntry::from(record).encode_to_vec().as_slice());
    }
}

#[test]
fn prost_decodes_popped_records() {
    let mut log_buffer = [0u8; 128];
    let mut encode_buffer = [0u8; 64];
    let mut queue = LogQueue::new(&mut log_buffer, &mut encode_buffer[..]);
    let record = LogRecord::new(b"tok", 0).with_line(12).with_thread(3);
    queue.push(&record).unwrap();

    let mut out = [0u8; 64];
    let entry = queue.pop(&mut out).unwrap();
    assert_eq!(LogEntry::decode(entry).unwrap(), LogEntry::from(&record));
}

#[test]
fn batch_is_a_log_entries_message() {
    let mut log_buffer = [0u8; 256];
    let mut encode_buffer = [0u8; 64];
    let mut queue = LogQueue::new(&mut log_buffer, &mut encode_buffer[..]);

    let records = [
        LogRecord::new(b"boot", 100).with_level(1),
        LogRecord::new(b"link up", 200).with_level(2).with_line(40),
        LogRecord::new(b"", 300).with_flags(4),
    ];
    for record in &records {
        queue.push(record).unwrap();
    }

    let mut out = [0u8; 128];
    let batch = queue.pop_multiple(&mut out).unwrap();
    assert_eq!(batch.entries(), 3);
    assert!(queue.is_empty());

    let decoded = LogEntries::decode(batch.as_bytes()).unwrap();
    let expected: Vec<LogEntry> = records.iter().map(LogEntry::from).collect();
    assert_eq!(decoded.entries, expected);

    let ours: Vec<LogRecord<'_>> = batch.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(ours, records);
}

#[test]
fn batch_then_single_pop_drains_in_order() {
    let mut log_buffer = [0u8; 128];
    let mut encode_buffer = [0u8; 64];
    let mut queue = LogQueue::new(&mut log_buffer, &mut encode_buffer[..]);
    for ts in 1..=5 {
        queue.push(&LogRecord::new(b"0123456789", ts)).unwrap();
    }

    // Each record: 12 byte message field + 2 byte timestamp, 16 framed in a batch
    let mut out = [0u8; 40];
    let batch = queue.pop_multiple(&mut out).unwrap();
    assert_eq!(batch.entries(), 2);
    assert_eq!(batch.len(), 32);

    let mut single = [0u8; 32];
    let entry = queue.pop(&mut single).unwrap();
    assert_eq!(wire::decode(entry).unwrap().timestamp, 3);

    let mut out = [0u8; 64];
    let rest: Vec<i64> = queue
        .pop_multiple(&mut out)
        .unwrap()
        .records()
        .map(|r| r.unwrap().timestamp)
        .collect();
    assert_eq!(rest, [4, 5]);
}

#[test]
fn wrapped_entries_survive_eviction_and_drain() {
    // Odd buffer size forces records to straddle the end of the region
    let mut log_buffer = [0u8; 37];
    let mut encode_buffer = [0u8; 32];
    let mut queue = LogQueue::new(&mut log_buffer, &mut encode_buffer[..]);

    let mut out = [0u8; 32];
    for ts in 0..50i64 {
        queue
            .push(&LogRecord::new(b"payload", ts).with_thread(ts as u32))
            .unwrap();
        if ts % 3 == 0 {
            let record = wire::decode(queue.pop(&mut out).unwrap()).unwrap();
            assert_eq!(record.thread as i64, record.timestamp);
        }
    }

    let stats = queue.drop_stats();
    assert!(stats.dropped_entries > 0);
    assert!(stats.latest_dropped_timestamp < 50);

    let mut last = -1;
    while let Ok(entry) = queue.pop(&mut out) {
        let record = wire::decode(entry).unwrap();
        assert!(record.timestamp > last);
        assert_eq!(record.message, b"payload");
        last = record.timestamp;
    }
    assert_eq!(last, 49);
}
