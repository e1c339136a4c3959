//! Log queue: structured records in, protobuf-framed records out
//!
//! [`LogQueue`] encodes each pushed [`LogRecord`] into a scratch buffer and
//! stores the encoded bytes in a [`FramedRing`]. When the ring is full the
//! oldest records are evicted and counted in [`DropStats`]. Consumers drain
//! either one record at a time with [`LogQueue::pop`] or as many whole
//! records as fit with [`LogQueue::pop_multiple`].
//!
//! # Data Flow
//!
//! ```text
//!  push(record)                                   pop / pop_multiple
//!      │                                                 ▲
//!      ▼                                                 │
//! ┌──────────────┐  encoded  ┌────────────────────────┐  │
//! │ encode buffer│ ────────► │ FramedRing (log buffer)│ ─┘
//! └──────────────┘           └───────────┬────────────┘
//!                                        │ evicted
//!                                        ▼
//!                                   DropStats
//! ```
//!
//! The queue has no internal locking. When an interrupt handler pushes and a
//! task drains, wrap the whole queue in the platform's mutex.

use crate::ring::FramedRing;
use crate::{wire, LogQueueError, LogQueueResult, LogRecord};

/// Drop accounting for records evicted to make room for newer ones
///
/// Only the push path updates these values; they never decrease unless the
/// owner calls [`LogQueue::reset_drop_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DropStats {
    /// Total records evicted because the log buffer was full
    pub dropped_entries: u64,
    /// Timestamp of the most recently evicted record
    pub latest_dropped_timestamp: i64,
}

#[cfg(feature = "defmt")]
impl defmt::Format for DropStats {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "DropStats {{ dropped: {=u64}, latest_ts: {=i64} }}",
            self.dropped_entries,
            self.latest_dropped_timestamp
        )
    }
}

/// Ring-buffer queue of encoded log records
///
/// Backed by a caller-provided log buffer and an encode buffer `S`. With
/// `S = &mut [u8]` both buffers are owned by the caller; see
/// [`LogQueueWithEncodeBuffer`] for a queue that carries its encode buffer
/// inline.
///
/// # Example
///
/// ```rust
/// use ringlog_core::{LogQueue, LogQueueError, LogRecord};
///
/// let mut log_buffer = [0u8; 256];
/// let mut encode_buffer = [0u8; 64];
/// let mut queue = LogQueue::new(&mut log_buffer, &mut encode_buffer[..]);
///
/// queue.push(&LogRecord::new(b"\x01\x02\x03\x04", 1_000).with_level(2))?;
///
/// let mut out = [0u8; 64];
/// let entry = queue.pop(&mut out)?;
/// let record = ringlog_core::wire::decode(entry)?;
/// assert_eq!(record.timestamp, 1_000);
/// assert_eq!(queue.pop(&mut out), Err(LogQueueError::InvalidState));
/// # Ok::<(), LogQueueError>(())
/// ```
#[derive(Debug)]
pub struct LogQueue<'a, S = &'a mut [u8]> {
    ring: FramedRing<'a>,
    encode_buffer: S,
    drop_stats: DropStats,
}

/// A [`LogQueue`] whose `N`-byte encode buffer lives inside the queue itself
///
/// ```rust
/// use ringlog_core::{LogQueueWithEncodeBuffer, LogRecord};
///
/// let mut log_buffer = [0u8; 128];
/// let mut queue = LogQueueWithEncodeBuffer::<32>::with_encode_buffer(&mut log_buffer);
/// queue.push(&LogRecord::new(b"hi", 7)).unwrap();
/// assert_eq!(queue.len(), 1);
/// ```
pub type LogQueueWithEncodeBuffer<'a, const N: usize> = LogQueue<'a, [u8; N]>;

impl<'a, const N: usize> LogQueue<'a, [u8; N]> {
    /// Creates a queue over `log_buffer` with a zeroed inline encode buffer
    pub fn with_encode_buffer(log_buffer: &'a mut [u8]) -> Self {
        Self::new(log_buffer, [0u8; N])
    }
}

impl<'a, S: AsMut<[u8]>> LogQueue<'a, S> {
    /// Creates an empty queue
    ///
    /// `log_buffer` holds the stored records; `encode_buffer` must be large
    /// enough for the biggest record the producer will push (see
    /// [`wire::max_encoded_len`]).
    pub fn new(log_buffer: &'a mut [u8], encode_buffer: S) -> Self {
        Self {
            ring: FramedRing::new(log_buffer),
            encode_buffer,
            drop_stats: DropStats::default(),
        }
    }

    /// Encodes `record` and stores it, evicting the oldest records if needed
    ///
    /// # Errors
    ///
    /// - [`LogQueueError::EncodingFailed`] if the encode buffer is too small
    ///   for this record. Nothing is stored and drop stats are unchanged.
    /// - [`LogQueueError::RecordTooLarge`] if the encoded record cannot fit
    ///   even an empty log buffer. Nothing is stored or evicted.
    pub fn push(&mut self, record: &LogRecord<'_>) -> LogQueueResult<()> {
        let encode_buffer = self.encode_buffer.as_mut();
        let encoded_len = wire::encode(record, encode_buffer).inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::warn!("Dropping log record at {}: {}", record.timestamp, _e);

            #[cfg(feature = "defmt")]
            defmt::warn!("Dropping log record at {=i64}: {}", record.timestamp, _e);
        })?;

        let mut last_evicted_timestamp = None;
        let evicted = self
            .ring
            .push_with(&encode_buffer[..encoded_len], |entry| {
                if let Ok(timestamp) = wire::decode_timestamp(entry.reader()) {
                    last_evicted_timestamp = Some(timestamp);
                }
            })
            .inspect_err(|_e| {
                #[cfg(feature = "tracing")]
                tracing::warn!("Log record does not fit log buffer: {}", _e);

                #[cfg(feature = "defmt")]
                defmt::warn!("Log record does not fit log buffer: {}", _e);
            })?;

        if evicted > 0 {
            self.drop_stats.dropped_entries += evicted as u64;
            if let Some(timestamp) = last_evicted_timestamp {
                self.drop_stats.latest_dropped_timestamp = timestamp;
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Evicted {} log records ({} dropped in total)",
                evicted,
                self.drop_stats.dropped_entries
            );

            #[cfg(feature = "defmt")]
            defmt::debug!(
                "Evicted {=usize} log records ({=u64} dropped in total)",
                evicted,
                self.drop_stats.dropped_entries
            );
        }

        Ok(())
    }

    /// Positional form of [`push`](Self::push) for a tokenized message
    pub fn push_tokenized(
        &mut self,
        message: &[u8],
        flags: u32,
        level: u32,
        line: u32,
        thread: u32,
        timestamp: i64,
    ) -> LogQueueResult<()> {
        self.push(&LogRecord {
            message,
            flags,
            level,
            line,
            thread,
            timestamp,
        })
    }

    /// Removes the oldest record and copies its encoded bytes into `dest`
    ///
    /// On success returns the filled prefix of `dest`, one `LogEntry`
    /// message.
    ///
    /// # Errors
    ///
    /// - [`LogQueueError::InvalidState`] if the queue is empty.
    /// - [`LogQueueError::DestinationTooSmall`] if `dest` is shorter than the
    ///   record. The bytes that fit are written and the record is consumed
    ///   anyway; it cannot be read again.
    pub fn pop<'d>(&mut self, dest: &'d mut [u8]) -> LogQueueResult<&'d [u8]> {
        match self.ring.pop_oldest(dest) {
            Ok(len) => Ok(&dest[..len]),
            Err(e @ LogQueueError::DestinationTooSmall { .. }) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Truncated log record on pop: {}", e);

                #[cfg(feature = "defmt")]
                defmt::warn!("Truncated log record on pop: {}", e);

                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Moves as many whole records as fit into `dest`
    ///
    /// Records are appended oldest first, each framed as a
    /// `LogEntries.entries` field, so the returned bytes form a complete
    /// `LogEntries` message. Stops at the first record that does not fit in
    /// the remaining space; a record is never split. An empty batch is
    /// returned when the queue is empty or when the oldest record alone
    /// does not fit.
    pub fn pop_multiple<'d>(&mut self, dest: &'d mut [u8]) -> LogQueueResult<Batch<'d>> {
        let mut written = 0;
        let mut entries = 0;

        while let Some(oldest) = self.ring.peek_oldest() {
            let record_len = oldest.len();
            if wire::batch_frame_len(record_len) > dest.len() - written {
                break;
            }
            written += wire::write_batch_header(record_len, &mut dest[written..]);
            written += self
                .ring
                .pop_oldest(&mut dest[written..written + record_len])?;
            entries += 1;
        }

        #[cfg(feature = "tracing")]
        if !self.ring.is_empty() {
            tracing::trace!(
                "Batch full after {} records, {} left in queue",
                entries,
                self.ring.len()
            );
        }

        Ok(Batch {
            bytes: &dest[..written],
            entries,
        })
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn drop_stats(&self) -> DropStats {
        self.drop_stats
    }

    /// Zeroes the drop counters, returning the values they held
    pub fn reset_drop_stats(&mut self) -> DropStats {
        core::mem::take(&mut self.drop_stats)
    }

    /// Drops every stored record without counting them as dropped
    pub fn clear(&mut self) {
        self.ring.clear();
    }

    /// Read access to the underlying ring store
    pub fn ring(&self) -> &FramedRing<'a> {
        &self.ring
    }
}

/// Records drained by [`LogQueue::pop_multiple`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'d> {
    bytes: &'d [u8],
    entries: usize,
}

impl<'d> Batch<'d> {
    /// The encoded `LogEntries` message
    pub fn as_bytes(&self) -> &'d [u8] {
        self.bytes
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of records in the batch
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Decodes the records in the batch
    pub fn records(&self) -> wire::BatchRecords<'d> {
        wire::batch_records(self.bytes)
    }
}
