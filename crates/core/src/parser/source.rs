//! Forward-only byte source with a refillable lookahead window.

use std::io::{self, Read};

/// Lookahead guaranteed to productions unless the input is exhausted.
pub const MIN_LOOKAHEAD: usize = 1024;

/// Window a refill grows to. Tokens longer than this double it on demand.
pub const MAX_WINDOW: usize = 64 * 1024;

const READ_CHUNK: usize = 8192;

/// Streaming cursor over a reader.
///
/// Peeking never consumes; `consume` advances the cursor and the consumed
/// bytes are never revisited.
pub struct ByteSource<R> {
    reader: R,
    buf: Vec<u8>,
    /// Index of the cursor inside `buf`.
    head: usize,
    /// Absolute offset of `buf[head]`.
    offset: usize,
    eof: bool,
    min_lookahead: usize,
    max_window: usize,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, MIN_LOOKAHEAD, MAX_WINDOW)
    }

    pub fn with_limits(reader: R, min_lookahead: usize, max_window: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            head: 0,
            offset: 0,
            eof: false,
            min_lookahead: min_lookahead.max(1),
            max_window: max_window.max(min_lookahead.max(1)),
        }
    }

    /// Top the window up to `max_window` bytes once it drops below `min_lookahead`.
    pub fn fill(&mut self) -> io::Result<()> {
        if self.eof || self.available() >= self.min_lookahead {
            return Ok(());
        }
        self.top_up()
    }

    /// Read more input regardless of `min_lookahead`.
    ///
    /// A window that already spans `max_window` bytes doubles its limit
    /// first, so every call either extends the window or reaches the end
    /// of input.
    pub fn grow(&mut self) -> io::Result<()> {
        if self.eof {
            return Ok(());
        }
        if self.available() >= self.max_window {
            self.max_window = self.max_window.saturating_mul(2);
            tracing::debug!(
                "lookahead window grown to {} bytes at position {:x}",
                self.max_window,
                self.offset
            );
        }
        self.top_up()
    }

    pub const fn max_window(&self) -> usize {
        self.max_window
    }

    fn top_up(&mut self) -> io::Result<()> {
        self.buf.drain(..self.head);
        self.head = 0;

        let mut chunk = [0u8; READ_CHUNK];
        while self.buf.len() < self.max_window {
            let want = (self.max_window - self.buf.len()).min(READ_CHUNK);
            match self.reader.read(&mut chunk[..want]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Bytes available for matching without reading further.
    pub fn window(&self) -> &[u8] {
        &self.buf[self.head..]
    }

    pub fn available(&self) -> usize {
        self.buf.len() - self.head
    }

    /// True once the reader has reported end of input; the window then
    /// holds everything that is left.
    pub const fn at_eof(&self) -> bool {
        self.eof
    }

    /// True when every byte of the input has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.eof && self.available() == 0
    }

    /// Absolute offset of the cursor.
    pub const fn position(&self) -> usize {
        self.offset
    }

    /// Advance the cursor by `len` bytes, returning them.
    pub fn consume(&mut self, len: usize) -> Vec<u8> {
        let len = len.min(self.available());
        let bytes = self.buf[self.head..self.head + len].to_vec();
        self.head += len;
        self.offset += len;
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(out.len()).min(self.data.len());
            out[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_fill_reaches_min_lookahead() {
        let data = vec![b'x'; 5000];
        let mut source = ByteSource::with_limits(
            Trickle {
                data: &data,
                step: 7,
            },
            1024,
            2048,
        );
        source.fill().unwrap();
        assert_eq!(source.available(), 2048);
        assert!(!source.at_eof());
    }

    #[test]
    fn test_consume_tracks_absolute_position() {
        let data: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        let mut source = ByteSource::with_limits(&data[..], 16, 64);
        let mut seen = Vec::new();
        loop {
            source.fill().unwrap();
            if source.is_exhausted() {
                break;
            }
            let n = source.available().min(10);
            assert_eq!(source.position(), seen.len());
            seen.extend(source.consume(n));
        }
        assert_eq!(seen, data);
    }

    #[test]
    fn test_grow_extends_full_window() {
        let data = vec![b'a'; 300];
        let mut source = ByteSource::with_limits(&data[..], 16, 64);
        source.fill().unwrap();
        assert_eq!(source.available(), 64);

        source.grow().unwrap();
        assert_eq!(source.max_window(), 128);
        assert_eq!(source.available(), 128);
        assert_eq!(source.position(), 0);

        source.grow().unwrap();
        source.grow().unwrap();
        assert!(source.at_eof());
        assert_eq!(source.window(), &data[..]);
    }

    #[test]
    fn test_grow_tops_up_partial_window_first() {
        let data = vec![b'a'; 300];
        let mut source = ByteSource::with_limits(&data[..], 16, 64);
        source.fill().unwrap();
        source.consume(40);
        source.grow().unwrap();
        assert_eq!(source.max_window(), 64);
        assert_eq!(source.available(), 64);
        assert_eq!(source.position(), 40);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut source = ByteSource::new(&b"%PDF-1.4\n"[..]);
        source.fill().unwrap();
        assert_eq!(source.window(), b"%PDF-1.4\n");
        assert_eq!(source.window(), b"%PDF-1.4\n");
        assert!(source.at_eof());
        assert_eq!(source.consume(4), b"%PDF");
        assert_eq!(source.window(), b"-1.4\n");
        assert_eq!(source.position(), 4);
    }
}
