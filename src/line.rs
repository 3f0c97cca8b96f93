//! Byte sink that reports every completed line to a callback.
//!
//! A [`LineBuffer`] sits between stream-oriented producers (anything that writes
//! bytes through [`std::io::Write`]) and line-oriented consumers such as a
//! [`Status`](crate::Status) line.
//!
//! # Mechanics
//!
//! * Every write appends to an internal buffer and then hands each complete
//!   `\n`-terminated line (with the terminator and a preceding `\r` trimmed) to the
//!   line callback, in order, before the write returns.
//! * Closing optionally flushes a trailing unterminated line, then runs the close
//!   callback exactly once. Writes after close fail with [`Error::Closed`].
//! * With [`LineBufferBuilder::flush_partial_after`], text that stays unterminated
//!   for longer than the delay is shown anyway. This keeps counters that only ever
//!   use `\r` (e.g. `"\r42%"`) visible.
//!
//! All operations are serialized by one lock per buffer, so concurrent writers never
//! interleave within a line. The callbacks run while that lock is held: a callback
//! must not write to the same buffer, or it deadlocks.

use std::{
    fmt,
    io::{self, Read},
    sync::{Arc, Weak},
    thread,
    time::Duration,
};

use parking_lot::{Condvar, Mutex};
use web_time::Instant;

use crate::error::{Error, Result};

type LineFn = Box<dyn FnMut(&str) + Send>;
type CloseFn = Box<dyn FnOnce() + Send>;

/// A thread-safe byte sink calling a function for every newline-delimited line.
///
/// Cloning a `LineBuffer` is cheap and yields another handle to the same buffer.
/// Both `LineBuffer` and `&LineBuffer` implement [`io::Write`].
#[derive(Clone)]
pub struct LineBuffer {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    /// Wakes the idle-flush thread when new partial content arrives or on close.
    wake: Condvar,
    partial_after: Option<Duration>,
}

struct State {
    buffer: Vec<u8>,
    closed: bool,
    flush_on_close: bool,

    on_line: LineFn,
    on_close: Option<CloseFn>,

    /// When the currently pending (unterminated) content started waiting.
    pending_since: Option<Instant>,
    timer_started: bool,
}

impl State {
    /// Hands every complete line in the buffer to the callback.
    fn drain_lines(&mut self) {
        let Self {
            buffer, on_line, ..
        } = self;

        let mut consumed = 0;
        while let Some(offset) = buffer[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            let mut line = &buffer[consumed..end];
            if let [rest @ .., b'\r'] = line {
                line = rest;
            }
            on_line(&String::from_utf8_lossy(line));
            consumed = end + 1;
        }
        buffer.drain(..consumed);
        let drained = buffer.is_empty();

        if drained {
            self.pending_since = None;
        } else if self.pending_since.is_none() {
            self.pending_since = Some(Instant::now());
        }
    }

    /// The unterminated rest of the buffer, minus a trailing `\r`.
    fn trailing_text(&self) -> Option<String> {
        let mut rest = self.buffer.as_slice();
        if let [head @ .., b'\r'] = rest {
            rest = head;
        }
        (!rest.is_empty()).then(|| String::from_utf8_lossy(rest).into_owned())
    }

    /// The segment of pending content that would currently be visible on a terminal,
    /// i.e. everything after the last carriage return.
    fn visible_pending(&self) -> Option<String> {
        let mut rest = self.buffer.as_slice();
        if let [head @ .., b'\r'] = rest {
            rest = head;
        }
        if let Some(pos) = rest.iter().rposition(|&b| b == b'\r') {
            rest = &rest[pos + 1..];
        }
        let rest = trim_partial_char(rest);
        (!rest.is_empty()).then(|| String::from_utf8_lossy(rest).into_owned())
    }
}

/// Drops a multi-byte character from the end of `bytes` whose remaining bytes
/// have not been written yet.
fn trim_partial_char(bytes: &[u8]) -> &[u8] {
    let Some(back) = bytes.iter().rev().take(4).position(|&b| b & 0xC0 != 0x80) else {
        return bytes;
    };
    let start = bytes.len() - 1 - back;
    let needed = match bytes[start] {
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        b if b >= 0xC0 => 2,
        _ => 1,
    };
    if bytes.len() - start < needed {
        &bytes[..start]
    } else {
        bytes
    }
}

impl fmt::Debug for LineBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LineBuffer")
            .field("pending", &state.buffer.len())
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

impl LineBuffer {
    /// Creates a new `LineBuffer` calling `on_line` for every completed line.
    ///
    /// A trailing partial line is discarded on close; use [`LineBuffer::builder`]
    /// to change that.
    pub fn new(on_line: impl FnMut(&str) + Send + 'static) -> Self {
        Self::builder(on_line).build()
    }

    /// Starts building a `LineBuffer` with additional options.
    pub fn builder(on_line: impl FnMut(&str) + Send + 'static) -> LineBufferBuilder {
        LineBufferBuilder {
            on_line: Box::new(on_line),
            flush_on_close: false,
            partial_after: None,
            on_close: None,
        }
    }

    /// A buffer that accepts writes until closed and drops everything.
    #[must_use]
    pub fn discard() -> Self {
        Self::new(|_| {})
    }

    /// Writes `bytes` into the buffer, reporting any lines they complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once [`close`](Self::close) has been called.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<usize> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(Error::Closed);
        }

        state.buffer.extend_from_slice(bytes);
        state.drain_lines();
        self.arm_idle_flush(&mut state);
        Ok(bytes.len())
    }

    /// Like [`write_bytes`](Self::write_bytes), but takes a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the buffer is closed.
    pub fn write_str(&self, s: &str) -> Result<usize> {
        self.write_bytes(s.as_bytes())
    }

    /// Like [`write_bytes`](Self::write_bytes), but takes a single byte.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the buffer is closed.
    pub fn write_byte(&self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte]).map(|_| ())
    }

    /// Like [`write_bytes`](Self::write_bytes), but takes a single char.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the buffer is closed.
    pub fn write_char(&self, c: char) -> Result<usize> {
        let mut encoded = [0u8; 4];
        self.write_bytes(c.encode_utf8(&mut encoded).as_bytes())
    }

    /// Reads `reader` to end-of-file into the buffer, holding the lock throughout.
    ///
    /// Lines completed before a read error are still reported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the buffer is closed, or [`Error::Io`] if reading fails.
    pub fn read_from(&self, reader: &mut impl Read) -> Result<u64> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(Error::Closed);
        }

        let read = reader.read_to_end(&mut state.buffer);
        state.drain_lines();
        self.arm_idle_flush(&mut state);

        Ok(read? as u64)
    }

    /// Closes the buffer.
    ///
    /// When configured with [`LineBufferBuilder::flush_on_close`], an unterminated
    /// trailing line is reported one final time. The close callback then runs.
    /// Waits for writes in progress on other threads to finish first.
    ///
    /// Closing an already closed buffer does nothing.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;

        if state.flush_on_close {
            if let Some(rest) = state.trailing_text() {
                (state.on_line)(&rest);
            }
        }
        state.buffer.clear();
        state.pending_since = None;
        self.shared.wake.notify_all();

        if let Some(on_close) = state.on_close.take() {
            on_close();
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    fn arm_idle_flush(&self, state: &mut State) {
        let Some(delay) = self.shared.partial_after else {
            return;
        };
        if state.pending_since.is_none() {
            return;
        }
        if state.timer_started {
            self.shared.wake.notify_one();
            return;
        }

        let weak = Arc::downgrade(&self.shared);
        let spawned = thread::Builder::new()
            .name("line-buffer-flush".into())
            .spawn(move || idle_flush_loop(&weak, delay));
        match spawned {
            Ok(_) => state.timer_started = true,
            Err(err) => {
                tracing::warn!(error = %err, "could not start partial line flusher");
            }
        }
    }
}

/// Reports pending partial content once it has been waiting for `delay`.
///
/// Exits on close, or once every handle to the buffer has been dropped.
fn idle_flush_loop(weak: &Weak<Shared>, delay: Duration) {
    loop {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut state = shared.state.lock();
        if state.closed {
            return;
        }

        match state.pending_since {
            Some(since) if since.elapsed() >= delay => {
                if let Some(visible) = state.visible_pending() {
                    (state.on_line)(&visible);
                }
                state.pending_since = None;
                shared.wake.wait_for(&mut state, delay);
            }
            Some(since) => {
                shared.wake.wait_until(&mut state, since + delay);
            }
            None => {
                shared.wake.wait_for(&mut state, delay);
            }
        }
    }
}

impl io::Write for &LineBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for LineBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builder for [`LineBuffer`] instances with non-default behavior.
pub struct LineBufferBuilder {
    on_line: LineFn,
    flush_on_close: bool,
    partial_after: Option<Duration>,
    on_close: Option<CloseFn>,
}

impl LineBufferBuilder {
    /// Report an unterminated trailing line when the buffer is closed.
    #[must_use]
    pub const fn flush_on_close(mut self, flush: bool) -> Self {
        self.flush_on_close = flush;
        self
    }

    /// Report unterminated content once it has been pending for `delay`.
    ///
    /// The content stays buffered; the eventual newline still reports the full line.
    /// A zero delay disables the idle flush.
    #[must_use]
    pub fn flush_partial_after(mut self, delay: Duration) -> Self {
        self.partial_after = (!delay.is_zero()).then_some(delay);
        self
    }

    /// Sets a function called exactly once, when the buffer is first closed.
    #[must_use]
    pub fn on_close(mut self, on_close: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(on_close));
        self
    }

    /// Consumes the builder and returns the [`LineBuffer`].
    #[must_use]
    pub fn build(self) -> LineBuffer {
        LineBuffer {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    buffer: Vec::new(),
                    closed: false,
                    flush_on_close: self.flush_on_close,
                    on_line: self.on_line,
                    on_close: self.on_close,
                    pending_since: None,
                    timer_started: false,
                }),
                wake: Condvar::new(),
                partial_after: self.partial_after,
            }),
        }
    }
}
