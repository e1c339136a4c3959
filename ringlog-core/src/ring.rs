//! Framed ring store over a caller-owned byte region
//!
//! Entries are stored back to back as `varint(len) ++ payload`, wrapping
//! around the end of the region when needed. The length prefix makes every
//! entry boundary recoverable from the bytes alone.
//!
//! ```text
//!            read                         write
//!             │                             │
//!             ▼                             ▼
//! ┌───────┬───┬─────────┬───┬─────────────┬──────────┐
//! │ ..tail│len│ payload │len│   payload   │   free   │
//! └───────┴───┴─────────┴───┴─────────────┴──────────┘
//!   ▲
//!   └── an entry may continue here after wrapping
//! ```
//!
//! When a push does not fit, the oldest entries are evicted whole until it
//! does. Eviction is the store's backpressure mechanism, not an error.

use prost::bytes::buf::Chain;
use prost::bytes::Buf;
use prost::encoding::{decode_varint, encode_varint, encoded_len_varint};

use crate::{LogQueueError, LogQueueResult};

const MAX_PREFIX_LEN: usize = 10;

/// FIFO of variable-length entries in a fixed byte region
///
/// The store indexes into the borrowed region and never allocates. Moving a
/// `FramedRing` is fine: it only holds offsets and the borrow.
///
/// # Example
///
/// ```rust
/// use ringlog_core::FramedRing;
///
/// let mut region = [0u8; 8];
/// let mut ring = FramedRing::new(&mut region);
///
/// assert_eq!(ring.push(b"abc").unwrap(), 0);
/// assert_eq!(ring.push(b"def").unwrap(), 0);
/// // 4 more bytes do not fit next to two 4-byte frames: "abc" is evicted
/// assert_eq!(ring.push(b"ghi").unwrap(), 1);
///
/// let mut out = [0u8; 3];
/// assert_eq!(ring.pop_oldest(&mut out).unwrap(), 3);
/// assert_eq!(&out, b"def");
/// ```
#[derive(Debug)]
pub struct FramedRing<'a> {
    buf: &'a mut [u8],
    read: usize,
    write: usize,
    used: usize,
    entries: usize,
}

impl<'a> FramedRing<'a> {
    /// Creates an empty store over `buf`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            read: 0,
            write: 0,
            used: 0,
            entries: 0,
        }
    }

    /// Bytes one entry with a `payload_len` byte payload occupies
    pub fn frame_len(payload_len: usize) -> usize {
        encoded_len_varint(payload_len as u64) + payload_len
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn used_bytes(&self) -> usize {
        self.used
    }

    pub fn free_bytes(&self) -> usize {
        self.buf.len() - self.used
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Appends one entry, evicting the oldest entries as needed
    ///
    /// Returns how many entries were evicted. Fails with
    /// [`LogQueueError::RecordTooLarge`] and leaves the store untouched if
    /// the framed entry is larger than the whole region.
    pub fn push(&mut self, data: &[u8]) -> LogQueueResult<usize> {
        self.push_with(data, |_| {})
    }

    /// Like [`push`](Self::push), showing each evicted entry to `on_evict` before it is dropped
    pub fn push_with<F>(&mut self, data: &[u8], mut on_evict: F) -> LogQueueResult<usize>
    where
        F: FnMut(EntryView<'_>),
    {
        let frame_len = Self::frame_len(data.len());
        if frame_len > self.capacity() {
            return Err(LogQueueError::RecordTooLarge {
                size: frame_len,
                capacity: self.capacity(),
            });
        }

        let mut evicted = 0;
        while self.free_bytes() < frame_len {
            // The frame fits an empty region, so there is always an entry to evict here.
            let Some((prefix_len, payload_len)) = self.oldest_frame() else {
                break;
            };
            on_evict(self.view(self.offset(self.read, prefix_len), payload_len));
            self.advance_read(prefix_len + payload_len);
            evicted += 1;
        }

        let mut prefix = [0u8; MAX_PREFIX_LEN];
        let prefix_len = {
            let mut cursor = &mut prefix[..];
            encode_varint(data.len() as u64, &mut cursor);
            MAX_PREFIX_LEN - cursor.len()
        };
        self.write_wrapped(&prefix[..prefix_len]);
        self.write_wrapped(data);
        self.used += frame_len;
        self.entries += 1;

        Ok(evicted)
    }

    /// Removes the oldest entry and copies it into `dest`
    ///
    /// Returns the entry length. An empty store yields
    /// [`LogQueueError::InvalidState`]. If `dest` is shorter than the entry,
    /// the bytes that fit are copied, the entry is still removed, and
    /// [`LogQueueError::DestinationTooSmall`] reports what was lost.
    pub fn pop_oldest(&mut self, dest: &mut [u8]) -> LogQueueResult<usize> {
        let (prefix_len, payload_len) = self.oldest_frame().ok_or(LogQueueError::InvalidState)?;
        let written = self
            .view(self.offset(self.read, prefix_len), payload_len)
            .copy_to(dest);
        self.advance_read(prefix_len + payload_len);

        if written < payload_len {
            return Err(LogQueueError::DestinationTooSmall {
                required: payload_len,
                written,
            });
        }
        Ok(payload_len)
    }

    /// Borrows the oldest entry without removing it
    pub fn peek_oldest(&self) -> Option<EntryView<'_>> {
        let (prefix_len, payload_len) = self.oldest_frame()?;
        Some(self.view(self.offset(self.read, prefix_len), payload_len))
    }

    /// Drops the oldest entry, returning its payload length
    pub fn discard_oldest(&mut self) -> LogQueueResult<usize> {
        let (prefix_len, payload_len) = self.oldest_frame().ok_or(LogQueueError::InvalidState)?;
        self.advance_read(prefix_len + payload_len);
        Ok(payload_len)
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
        self.used = 0;
        self.entries = 0;
    }

    /// Iterates over stored entries, oldest first
    pub fn iter(&self) -> Entries<'_, 'a> {
        Entries {
            ring: self,
            at: self.read,
            remaining: self.entries,
        }
    }

    /// Decodes the length prefix of the frame starting at `at`
    ///
    /// Returns `(prefix_len, payload_len)`.
    fn frame_at(&self, at: usize) -> Option<(usize, usize)> {
        let mut header = self.view(at, MAX_PREFIX_LEN.min(self.used)).reader();
        let payload_len = decode_varint(&mut header).ok()? as usize;
        Some((encoded_len_varint(payload_len as u64), payload_len))
    }

    fn oldest_frame(&self) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        self.frame_at(self.read)
    }

    fn view(&self, at: usize, len: usize) -> EntryView<'_> {
        let first_len = len.min(self.capacity() - at);
        EntryView {
            first: &self.buf[at..at + first_len],
            second: &self.buf[..len - first_len],
        }
    }

    fn offset(&self, at: usize, by: usize) -> usize {
        let cap = self.capacity();
        if at + by >= cap {
            at + by - cap
        } else {
            at + by
        }
    }

    fn advance_read(&mut self, frame_len: usize) {
        self.read = self.offset(self.read, frame_len);
        self.used -= frame_len;
        self.entries -= 1;
        if self.entries == 0 {
            self.read = 0;
            self.write = 0;
        }
    }

    fn write_wrapped(&mut self, data: &[u8]) {
        let first_len = data.len().min(self.capacity() - self.write);
        let (first, second) = data.split_at(first_len);
        self.buf[self.write..self.write + first_len].copy_from_slice(first);
        self.buf[..second.len()].copy_from_slice(second);
        self.write = self.offset(self.write, data.len());
    }
}

/// Borrowed view of one stored entry
///
/// An entry that wraps around the end of the region is seen as two slices;
/// `second` is empty otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryView<'b> {
    first: &'b [u8],
    second: &'b [u8],
}

impl<'b> EntryView<'b> {
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Both halves of the entry, in order
    pub fn as_slices(&self) -> (&'b [u8], &'b [u8]) {
        (self.first, self.second)
    }

    /// The entry as one slice, if it does not wrap
    pub fn contiguous(&self) -> Option<&'b [u8]> {
        self.second.is_empty().then_some(self.first)
    }

    /// Copies as much of the entry as fits into `dest`, returning the count
    pub fn copy_to(&self, dest: &mut [u8]) -> usize {
        let first_len = self.first.len().min(dest.len());
        dest[..first_len].copy_from_slice(&self.first[..first_len]);
        let second_len = self.second.len().min(dest.len() - first_len);
        dest[first_len..first_len + second_len].copy_from_slice(&self.second[..second_len]);
        first_len + second_len
    }

    /// A [`Buf`] over the entry's bytes
    pub fn reader(&self) -> Chain<&'b [u8], &'b [u8]> {
        self.first.chain(self.second)
    }

    #[cfg(feature = "std")]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.first);
        out.extend_from_slice(self.second);
        out
    }
}

/// Iterator returned by [`FramedRing::iter`]
#[derive(Debug)]
pub struct Entries<'r, 'a> {
    ring: &'r FramedRing<'a>,
    at: usize,
    remaining: usize,
}

impl<'r> Iterator for Entries<'r, '_> {
    type Item = EntryView<'r>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (prefix_len, payload_len) = self.ring.frame_at(self.at)?;
        let payload_at = self.ring.offset(self.at, prefix_len);
        self.at = self.ring.offset(payload_at, payload_len);
        self.remaining -= 1;
        Some(self.ring.view(payload_at, payload_len))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
