//! Queue sizing configuration
//!
//! The queue itself takes whatever buffers it is given. [`QueueCfg`] lets a
//! firmware image describe those buffers up front and check that they fit
//! the records it intends to log.

use core::fmt;

use crate::ring::FramedRing;
use crate::wire;

/// Buffer sizes for one log queue
///
/// # Quick Sizing Guide
/// - **encode buffer**: at least `wire::max_encoded_len(max_message_len)`
/// - **log buffer**: several worst-case records, so that a burst evicts
///   only the oldest few
///
/// # Examples
/// ```rust
/// use ringlog_core::QueueCfg;
///
/// let cfg = QueueCfg {
///     log_buffer_size: 2048,
///     encode_buffer_size: 128,
///     max_message_len: 64,
/// };
/// assert!(cfg.validate().is_ok());
/// assert!(cfg.min_resident_records() >= 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueCfg {
    /// Bytes backing the ring of stored records
    pub log_buffer_size: usize,
    /// Bytes of scratch space for encoding one record
    pub encode_buffer_size: usize,
    /// Longest tokenized message the producer will push
    pub max_message_len: usize,
}

impl QueueCfg {
    /// Validates the configuration
    ///
    /// Returns `Err` if the log buffer is empty, if the encode buffer cannot
    /// hold a worst-case record, or if a worst-case record does not fit the
    /// log buffer.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.log_buffer_size == 0 {
            return Err("log buffer size must be > 0");
        }
        if self.encode_buffer_size < self.worst_case_record_len() {
            return Err("encode buffer too small for max_message_len");
        }
        if FramedRing::frame_len(self.worst_case_record_len()) > self.log_buffer_size {
            return Err("log buffer too small for a single worst-case record");
        }
        Ok(())
    }

    /// Encoded size of the largest record this configuration allows
    pub fn worst_case_record_len(&self) -> usize {
        wire::max_encoded_len(self.max_message_len)
    }

    /// Records guaranteed to stay resident before eviction starts
    pub fn min_resident_records(&self) -> usize {
        self.log_buffer_size / FramedRing::frame_len(self.worst_case_record_len())
    }
}

impl Default for QueueCfg {
    /// 1 KiB log buffer, 256-byte encode buffer, 128-byte messages
    fn default() -> Self {
        QueueCfg {
            log_buffer_size: 1024,
            encode_buffer_size: 256,
            max_message_len: 128,
        }
    }
}

impl fmt::Display for QueueCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QueueCfg(log={}, encode={}, max_message={})",
            self.log_buffer_size, self.encode_buffer_size, self.max_message_len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_cfg_validation() {
        assert!(QueueCfg::default().validate().is_ok());

        let empty_ring = QueueCfg {
            log_buffer_size: 0,
            ..QueueCfg::default()
        };
        assert_eq!(empty_ring.validate(), Err("log buffer size must be > 0"));

        let small_scratch = QueueCfg {
            encode_buffer_size: 16,
            ..QueueCfg::default()
        };
        assert!(small_scratch.validate().is_err());

        let small_ring = QueueCfg {
            log_buffer_size: 64,
            ..QueueCfg::default()
        };
        assert_eq!(
            small_ring.validate(),
            Err("log buffer too small for a single worst-case record")
        );
    }

    #[test]
    fn test_worst_case_sizing() {
        let cfg = QueueCfg {
            log_buffer_size: 100,
            encode_buffer_size: 64,
            max_message_len: 10,
        };
        // message 12 + four uint32 fields 24 + sint64 11
        assert_eq!(cfg.worst_case_record_len(), 47);
        assert_eq!(cfg.min_resident_records(), 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    #[cfg(feature = "std")]
    fn test_queue_cfg_display() {
        assert_eq!(
            QueueCfg::default().to_string(),
            "QueueCfg(log=1024, encode=256, max_message=128)"
        );
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_queue_cfg_serde_roundtrip() {
        let cfg = QueueCfg::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: QueueCfg = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
