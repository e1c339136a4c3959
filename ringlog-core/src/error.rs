//! Error handling for ringlog queue operations
//!
//! A single error enum covers the framed ring store, the wire codec and the
//! log queue. It carries only plain integers so it stays small and
//! allocation-free on MCU targets.
//!
//! # Error Code System
//!
//! Each error has a numeric code for environments where string formatting is
//! unavailable. Codes are grouped by category:
//!
//! - **State** (0x1000-0x1FFF): operation not valid for the current queue state
//! - **Capacity** (0x2000-0x2FFF): record larger than the ring itself
//! - **Encoding** (0x3000-0x3FFF): scratch buffer too small, malformed records
//! - **Destination** (0x4000-0x4FFF): consumer buffer too small, data truncated
//!
//! ## Platform-Specific Display Behavior
//!
//! - **std mode**: Rich messages (e.g., "Record of 300 bytes exceeds ring capacity of 256 bytes")
//! - **no_std mode**: Compact format with codes (e.g., "Error 0x2001: Record too large")
//!
//! # Example
//!
//! ```rust
//! use ringlog_core::{LogQueueError, LogQueueResult};
//!
//! fn drain(buf: &mut [u8]) -> LogQueueResult<usize> {
//!     Err(LogQueueError::DestinationTooSmall { required: 12, written: buf.len() })
//! }
//!
//! match drain(&mut [0u8; 4]) {
//!     Err(e) if e.is_data_loss() => assert_eq!(e.error_code(), 0x4001),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

#[cfg(feature = "std")]
use thiserror::Error;

/// Unified error type for ring store, codec and queue operations
///
/// No variant is fatal to the queue: every operation leaves the queue in a
/// consistent state and may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum LogQueueError {
    /// Pop attempted on an empty queue; state is unchanged
    #[cfg_attr(feature = "std", error("No entries in queue"))]
    InvalidState,

    /// Record cannot fit even in an empty ring; nothing was stored
    #[cfg_attr(
        feature = "std",
        error("Record of {size} bytes exceeds ring capacity of {capacity} bytes")
    )]
    RecordTooLarge { size: usize, capacity: usize },

    /// Scratch encode buffer is too small for this record; nothing was stored
    #[cfg_attr(
        feature = "std",
        error("Encoding failed: record needs {required} bytes, encode buffer has {available}")
    )]
    EncodingFailed { required: usize, available: usize },

    /// Bytes do not form a valid log record
    #[cfg_attr(feature = "std", error("Malformed log record at byte {offset}"))]
    MalformedRecord { offset: usize },

    /// Destination buffer was smaller than the entry
    ///
    /// The first `written` bytes were copied and the entry was consumed; the
    /// remaining `required - written` bytes are lost.
    #[cfg_attr(
        feature = "std",
        error("Destination too small: entry is {required} bytes, {written} written")
    )]
    DestinationTooSmall { required: usize, written: usize },
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for LogQueueError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let message = match self {
            LogQueueError::InvalidState => "No entries in queue",
            LogQueueError::RecordTooLarge { .. } => "Record too large",
            LogQueueError::EncodingFailed { .. } => "Encoding failed",
            LogQueueError::MalformedRecord { .. } => "Malformed log record",
            LogQueueError::DestinationTooSmall { .. } => "Destination too small",
        };
        write!(f, "Error 0x{:04X}: {}", self.error_code(), message)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LogQueueError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::InvalidState => defmt::write!(f, "InvalidState"),
            Self::RecordTooLarge { size, capacity } => {
                defmt::write!(f, "RecordTooLarge({=usize}/{=usize})", *size, *capacity)
            }
            Self::EncodingFailed {
                required,
                available,
            } => defmt::write!(f, "EncodingFailed({=usize}/{=usize})", *required, *available),
            Self::MalformedRecord { offset } => {
                defmt::write!(f, "MalformedRecord(@{=usize})", *offset)
            }
            Self::DestinationTooSmall { required, written } => {
                defmt::write!(f, "DestinationTooSmall({=usize}/{=usize})", *written, *required)
            }
        }
    }
}

impl LogQueueError {
    /// Returns a numeric error code for embedded environments
    ///
    /// ```rust
    /// use ringlog_core::LogQueueError;
    ///
    /// assert_eq!(LogQueueError::InvalidState.error_code(), 0x1001);
    /// let too_large = LogQueueError::RecordTooLarge { size: 300, capacity: 256 };
    /// assert_eq!(too_large.error_code(), 0x2001);
    /// ```
    pub const fn error_code(&self) -> u32 {
        match self {
            // State errors: 0x1000-0x1FFF
            LogQueueError::InvalidState => 0x1001,

            // Capacity errors: 0x2000-0x2FFF
            LogQueueError::RecordTooLarge { .. } => 0x2001,

            // Encoding errors: 0x3000-0x3FFF
            LogQueueError::EncodingFailed { .. } => 0x3001,
            LogQueueError::MalformedRecord { .. } => 0x3002,

            // Destination errors: 0x4000-0x4FFF
            LogQueueError::DestinationTooSmall { .. } => 0x4001,
        }
    }

    /// Returns the error category based on the error code
    pub const fn error_category(&self) -> u32 {
        self.error_code() & 0xF000
    }

    /// Returns true if a buffer was too small for the data offered to it
    pub fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            LogQueueError::RecordTooLarge { .. } | LogQueueError::EncodingFailed { .. }
        )
    }

    /// Returns true if the failed operation still consumed data
    pub fn is_data_loss(&self) -> bool {
        matches!(self, LogQueueError::DestinationTooSmall { .. })
    }
}

/// Result type for ringlog operations
pub type LogQueueResult<T> = Result<T, LogQueueError>;
