use crate::token::Span;

/// Result of peeking at the input stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    /// The code point under the cursor.
    Char(char),
    /// The stream has no further data right now but has not been closed.
    Ood,
    /// The stream is closed and exhausted.
    Eof,
}

/// Errors raised by stream operations.
///
/// These are resource errors in the sense of the fatal taxonomy: the
/// tokenizer converts them into [`crate::FatalError`] and aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// A rewind reached back past the start of the buffer.
    #[error("rewind of {0} bytes past the start of the buffer")]
    RewindOutOfRange(usize),
    /// A range operation referred to bytes outside the buffer.
    #[error("byte range {start}+{len} lies outside the buffer")]
    RangeOutOfBounds {
        /// Start offset of the offending range.
        start: usize,
        /// Length of the offending range.
        len: usize,
    },
}

/// The capabilities the tokenizer consumes from its input source.
///
/// The buffer behind a stream is shared scratch: the tokenizer rewrites
/// resolved character references and case-normalizes tag, attribute and
/// doctype names in place through the mutation methods below. Offsets are
/// stable across those rewrites for everything before the cursor.
pub trait Stream {
    /// Look at the code point under the cursor without consuming it.
    fn peek(&self) -> Input;

    /// Move the cursor past the current code point. No-op at OOD/EOF.
    fn advance(&mut self);

    /// Byte offset and UTF-8 width of the code point under the cursor.
    ///
    /// The width is 0 when no complete code point is available.
    fn cur_pos(&self) -> (usize, usize);

    /// Move the cursor back `n` bytes.
    fn rewind(&mut self, n: usize) -> Result<(), StreamError>;

    /// Insert a synthesized ASCII byte at the cursor, to be read next.
    fn push_back(&mut self, byte: u8);

    /// Overwrite `len` bytes at `start` with the UTF-8 encoding of `c`,
    /// splicing the remainder of the buffer up or down as needed. A cursor
    /// inside or beyond the range is left at the start of the replacement.
    fn replace_range(&mut self, start: usize, len: usize, c: char) -> Result<(), StreamError>;

    /// Compare two ranges of the buffer byte for byte.
    fn compare_range_cs(&self, a: usize, b: usize, len: usize) -> bool;

    /// Compare two ranges of the buffer, ignoring ASCII case.
    fn compare_range_ci(&self, a: usize, b: usize, len: usize) -> bool;

    /// Compare a range of the buffer against an ASCII literal, ignoring
    /// ASCII case. False if the lengths differ.
    fn compare_range_ascii(&self, start: usize, len: usize, lit: &[u8]) -> bool;

    /// ASCII-lowercase the code point under the cursor in place.
    fn lowercase(&mut self);

    /// ASCII-uppercase the code point under the cursor in place.
    fn uppercase(&mut self);

    /// Borrow the bytes a span refers to. Out-of-range spans yield `&[]`.
    fn slice(&self, span: Span) -> &[u8];

    /// If the backing storage has relocated since the last call, return the
    /// current buffer length. Polled by the tokenizer once per step and
    /// relayed to [`crate::TokenSink::buffer_moved`].
    fn take_buffer_move(&mut self) -> Option<usize> {
        None
    }

    /// Advance over a maximal run of complete code points that contains
    /// none of the ASCII bytes in `stops`, returning the number of bytes
    /// consumed. Never reads past the available data.
    ///
    /// This is the bulk fast path for character runs; the default
    /// implementation steps one code point at a time.
    fn advance_run(&mut self, stops: &[u8]) -> usize {
        let mut n = 0;
        while let Input::Char(c) = self.peek() {
            if c.is_ascii() && stops.contains(&(c as u8)) {
                break;
            }
            let (_, width) = self.cur_pos();
            self.advance();
            n += width;
        }
        n
    }
}

/// UTF-8 sequence width derived from a leading byte. Stray continuation
/// bytes count as width 1 so the cursor can step over them.
fn utf8_width(byte: u8) -> usize {
    match byte {
        0x00..=0xBF => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xFF => 4,
    }
}

/// The built-in [`Stream`]: a growable buffer of decoded document bytes
/// with a cursor and a closed flag.
///
/// Feed input with [`ByteStream::append`], terminate it with
/// [`ByteStream::close`]. While the stream is open an exhausted cursor
/// (including one parked on a trailing incomplete UTF-8 sequence) reads as
/// [`Input::Ood`]; once closed it reads as [`Input::Eof`].
#[derive(Debug, Default)]
pub struct ByteStream {
    buffer: Vec<u8>,
    pos: usize,
    closed: bool,
    last_capacity: usize,
    moved: bool,
}

impl ByteStream {
    /// Create an empty, open stream.
    #[must_use]
    pub fn new() -> Self {
        ByteStream::default()
    }

    /// Append more decoded input to the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        debug_assert!(!self.closed, "append to a closed stream");
        self.buffer.extend_from_slice(bytes);
        self.note_capacity();
    }

    /// Mark the stream as terminated: no further input will arrive.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether [`ByteStream::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The bytes currently held, including everything already consumed.
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Decode the code point under the cursor, if a complete one is there.
    fn current(&self) -> Option<(char, usize)> {
        let tail = &self.buffer[self.pos..];
        let first = *tail.first()?;
        let width = utf8_width(first);
        if width > tail.len() {
            if self.closed {
                // truncated trailing sequence of a finished document
                return Some(('\u{fffd}', tail.len()));
            }
            return None;
        }
        match core::str::from_utf8(&tail[..width]) {
            Ok(s) => s.chars().next().map(|c| (c, width)),
            Err(_) => Some(('\u{fffd}', 1)),
        }
    }

    fn note_capacity(&mut self) {
        if self.buffer.capacity() != self.last_capacity {
            self.last_capacity = self.buffer.capacity();
            self.moved = true;
        }
    }
}

impl Stream for ByteStream {
    fn peek(&self) -> Input {
        match self.current() {
            Some((c, _)) => Input::Char(c),
            None if self.closed => Input::Eof,
            None => Input::Ood,
        }
    }

    fn advance(&mut self) {
        if let Some((_, width)) = self.current() {
            self.pos += width;
        }
    }

    fn cur_pos(&self) -> (usize, usize) {
        (self.pos, self.current().map_or(0, |(_, width)| width))
    }

    fn rewind(&mut self, n: usize) -> Result<(), StreamError> {
        if n > self.pos {
            return Err(StreamError::RewindOutOfRange(n));
        }
        self.pos -= n;
        Ok(())
    }

    fn push_back(&mut self, byte: u8) {
        debug_assert!(byte.is_ascii());
        self.buffer.insert(self.pos, byte);
        self.note_capacity();
    }

    fn replace_range(&mut self, start: usize, len: usize, c: char) -> Result<(), StreamError> {
        let end = start.checked_add(len).filter(|&end| end <= self.buffer.len());
        let Some(end) = end else {
            return Err(StreamError::RangeOutOfBounds { start, len });
        };
        let mut enc = [0u8; 4];
        let encoded = c.encode_utf8(&mut enc).as_bytes();
        self.buffer.splice(start..end, encoded.iter().copied());
        if self.pos > start {
            self.pos = start;
        }
        self.note_capacity();
        Ok(())
    }

    fn compare_range_cs(&self, a: usize, b: usize, len: usize) -> bool {
        match (self.buffer.get(a..a + len), self.buffer.get(b..b + len)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    fn compare_range_ci(&self, a: usize, b: usize, len: usize) -> bool {
        match (self.buffer.get(a..a + len), self.buffer.get(b..b + len)) {
            (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
            _ => false,
        }
    }

    fn compare_range_ascii(&self, start: usize, len: usize, lit: &[u8]) -> bool {
        len == lit.len()
            && self
                .buffer
                .get(start..start + len)
                .is_some_and(|bytes| bytes.eq_ignore_ascii_case(lit))
    }

    fn lowercase(&mut self) {
        if let Some(byte) = self.buffer.get_mut(self.pos) {
            byte.make_ascii_lowercase();
        }
    }

    fn uppercase(&mut self) {
        if let Some(byte) = self.buffer.get_mut(self.pos) {
            byte.make_ascii_uppercase();
        }
    }

    fn slice(&self, span: Span) -> &[u8] {
        self.buffer
            .get(span.start..span.start + span.len)
            .unwrap_or(&[])
    }

    fn take_buffer_move(&mut self) -> Option<usize> {
        if self.moved {
            self.moved = false;
            Some(self.buffer.len())
        } else {
            None
        }
    }

    fn advance_run(&mut self, stops: &[u8]) -> usize {
        let tail = &self.buffer[self.pos..];
        let mut end = match *stops {
            [] => tail.len(),
            [a] => memchr::memchr(a, tail).unwrap_or(tail.len()),
            [a, b] => memchr::memchr2(a, b, tail).unwrap_or(tail.len()),
            [a, b, c] => memchr::memchr3(a, b, c, tail).unwrap_or(tail.len()),
            _ => tail
                .iter()
                .position(|byte| stops.contains(byte))
                .unwrap_or(tail.len()),
        };
        if !self.closed && end == tail.len() {
            // do not consume a trailing incomplete sequence while more
            // input can still arrive
            let mut head = end;
            while head > 0 && tail[head - 1] & 0xC0 == 0x80 {
                head -= 1;
            }
            if head > 0 && head - 1 + utf8_width(tail[head - 1]) > end {
                end = head - 1;
            }
        }
        self.pos += end;
        end
    }
}

impl From<&str> for ByteStream {
    /// Build a closed stream over a complete document.
    fn from(input: &str) -> Self {
        ByteStream::from(input.as_bytes())
    }
}

impl From<&[u8]> for ByteStream {
    /// Build a closed stream over a complete document.
    fn from(input: &[u8]) -> Self {
        let mut stream = ByteStream::new();
        stream.append(input);
        stream.close();
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_ood_then_eof() {
        let mut s = ByteStream::new();
        assert_eq!(s.peek(), Input::Ood);
        s.append(b"a");
        assert_eq!(s.peek(), Input::Char('a'));
        s.advance();
        assert_eq!(s.peek(), Input::Ood);
        s.close();
        assert_eq!(s.peek(), Input::Eof);
    }

    #[test]
    fn incomplete_utf8_is_ood_until_completed() {
        let mut s = ByteStream::new();
        s.append("é".as_bytes().get(..1).unwrap());
        assert_eq!(s.peek(), Input::Ood);
        s.append("é".as_bytes().get(1..).unwrap());
        assert_eq!(s.peek(), Input::Char('é'));
        assert_eq!(s.cur_pos(), (0, 2));
    }

    #[test]
    fn rewind_checks_bounds() {
        let mut s = ByteStream::from("ab");
        s.advance();
        assert_eq!(s.rewind(1), Ok(()));
        assert_eq!(s.rewind(1), Err(StreamError::RewindOutOfRange(1)));
    }

    #[test]
    fn push_back_inserts_at_cursor() {
        let mut s = ByteStream::from("ab");
        s.advance();
        s.push_back(b'-');
        assert_eq!(s.peek(), Input::Char('-'));
        assert_eq!(s.buffer(), b"a-b");
    }

    #[test]
    fn replace_range_splices_and_parks_cursor() {
        let mut s = ByteStream::from("x&amp;y");
        for _ in 0..6 {
            s.advance();
        }
        s.replace_range(1, 5, '&').unwrap();
        assert_eq!(s.buffer(), b"x&y");
        assert_eq!(s.peek(), Input::Char('&'));
        assert!(s.replace_range(2, 9, '&').is_err());
    }

    #[test]
    fn compare_ranges() {
        let s = ByteStream::from("abcABC");
        assert!(s.compare_range_ci(0, 3, 3));
        assert!(!s.compare_range_cs(0, 3, 3));
        assert!(s.compare_range_ascii(3, 3, b"abc"));
        assert!(!s.compare_range_ascii(3, 3, b"ab"));
        assert!(!s.compare_range_cs(3, 3, 4));
    }

    #[test]
    fn case_mutation_in_place() {
        let mut s = ByteStream::from("aB");
        s.uppercase();
        s.advance();
        s.lowercase();
        assert_eq!(s.buffer(), b"Ab");
    }

    #[test]
    fn advance_run_stops_and_preserves_open_tail() {
        let mut s = ByteStream::new();
        s.append("héllo".as_bytes());
        s.append("é".as_bytes().get(..1).unwrap());
        let n = s.advance_run(&[b'&', b'<']);
        assert_eq!(n, "héllo".len());
        assert_eq!(s.peek(), Input::Ood);

        let mut s = ByteStream::from("ab&cd");
        assert_eq!(s.advance_run(&[b'&', b'<']), 2);
        assert_eq!(s.peek(), Input::Char('&'));
    }

    #[test]
    fn buffer_move_is_reported_once() {
        let mut s = ByteStream::new();
        s.append(b"some bytes");
        assert_eq!(s.take_buffer_move(), Some(10));
        assert_eq!(s.take_buffer_move(), None);
    }
}
