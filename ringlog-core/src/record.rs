//! Structured log record carried by the queue
//!
//! A [`LogRecord`] borrows its message bytes, so building one on the
//! producer side and decoding one on the consumer side both stay
//! allocation-free.

/// One structured log record
///
/// `message` is the already-tokenized message body. Every other field is
/// optional on the wire and only encoded when it differs from its default;
/// `timestamp` is always encoded and always absolute.
///
/// # Example
///
/// ```rust
/// use ringlog_core::LogRecord;
///
/// let record = LogRecord::new(b"\x12\x34\x56\x78", 1_000)
///     .with_level(3)
///     .with_line(42);
/// assert_eq!(record.level, 3);
/// assert_eq!(record.flags, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogRecord<'a> {
    /// Tokenized message payload
    pub message: &'a [u8],
    /// Caller-defined bit field (e.g. message-truncated indicator)
    pub flags: u32,
    /// Severity code
    pub level: u32,
    /// Source line of the log call site
    pub line: u32,
    /// Thread or task identifier
    pub thread: u32,
    /// Monotonic or wall-clock timestamp
    pub timestamp: i64,
}

impl<'a> LogRecord<'a> {
    /// Creates a record with only a message and a timestamp set
    pub const fn new(message: &'a [u8], timestamp: i64) -> Self {
        Self {
            message,
            flags: 0,
            level: 0,
            line: 0,
            thread: 0,
            timestamp,
        }
    }

    pub const fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub const fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub const fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub const fn with_thread(mut self, thread: u32) -> Self {
        self.thread = thread;
        self
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LogRecord<'_> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "LogRecord {{ ts: {=i64}, level: {=u32}, line: {=u32}, thread: {=u32}, flags: {=u32}, msg: {=[u8]:x} }}",
            self.timestamp,
            self.level,
            self.line,
            self.thread,
            self.flags,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_each_field() {
        let record = LogRecord::new(b"abc", -5)
            .with_flags(0b10)
            .with_level(4)
            .with_line(120)
            .with_thread(9);

        assert_eq!(record.message, b"abc");
        assert_eq!(record.flags, 0b10);
        assert_eq!(record.level, 4);
        assert_eq!(record.line, 120);
        assert_eq!(record.thread, 9);
        assert_eq!(record.timestamp, -5);
    }

    #[test]
    fn test_default_is_empty() {
        let record = LogRecord::default();
        assert!(record.message.is_empty());
        assert_eq!(record, LogRecord::new(&[], 0));
    }
}
