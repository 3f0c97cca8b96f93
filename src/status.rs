//! A live, multi-line status display.
//!
//! [`Status`] manages an ordered set of lines at the bottom of an output device and
//! keeps repainting them in place while they change. When a line is closed its last
//! content moves into the permanent output above the managed area.
//!
//! # Concurrency
//!
//! Every mutating call ([`open`](LineDisplay::open), [`set`](LineDisplay::set),
//! [`close`](LineDisplay::close)) is sent through a bounded queue to a single render
//! thread, which owns the line list exclusively and applies mutations strictly in
//! queue order. Only id allocation happens on the caller's thread, through an atomic
//! counter, so ids stay unique even before [`start`](LineDisplay::start) and after
//! [`stop`](LineDisplay::stop).
//!
//! # Lifecycle
//!
//! `Created -> Started -> Stopped`. Starting twice or stopping out of order panics.
//! Mutations outside the started window are silently dropped.
//!
//! # Compatibility mode
//!
//! When the destination is not an interactive terminal, nothing is rewritten in
//! place. Each update is appended as a new line instead.

use std::{
    collections::HashMap,
    fmt,
    io::{self, IsTerminal, Write},
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use compact_str::{CompactString, format_compact};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use web_time::Instant;

use crate::{line::LineBuffer, terminal::Terminal};

/// Minimum time between two throttled repaints.
pub const MIN_REPAINT_INTERVAL: Duration = Duration::from_millis(50);

/// Identifier of a line in a [`LineDisplay`]. Ids are never reused.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LineId(pub u64);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The operations of a managed multi-line output area.
///
/// Implemented by [`Status`] and by the do-nothing [`NullStatus`], so callers never
/// have to check whether a display is actually present.
pub trait LineDisplay: Send + Sync {
    /// Begins processing updates.
    fn start(&self);

    /// Blocks until every update issued so far has been applied, repaints one final
    /// time and stops processing updates.
    fn stop(&self);

    /// Adds a new line showing `content` below the existing ones and returns its id.
    fn open(&self, content: &str) -> LineId;

    /// Replaces the content of line `id`. Does nothing if the line is not open.
    fn set(&self, id: LineId, content: &str);

    /// Removes line `id`, writing its last content to the permanent output.
    /// Does nothing if the line is not open.
    fn close(&self, id: LineId);

    /// Returns a writer for line `id`.
    ///
    /// Every completed line written to it replaces the content of line `id` (with
    /// `prefix` prepended); closing the writer closes the line.
    fn line(&self, prefix: &str, id: LineId) -> LineBuffer;

    /// Opens a new line showing `prefix` followed by `content`, and returns its writer.
    fn open_line(&self, prefix: &str, content: &str) -> LineBuffer {
        let id = self.open(&format!("{prefix}{content}"));
        self.line(prefix, id)
    }

    /// Returns a writer that goes straight to the output device, above the managed area.
    fn bypass(&self) -> Box<dyn Write + Send>;
}

/// Tunables of a [`Status`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StatusOptions {
    /// Minimum time between two repaints caused by content updates.
    /// Opening and closing lines always repaints immediately.
    pub min_repaint_interval: Duration,

    /// How long a line writer waits before showing an unterminated line.
    /// Not used in compatibility mode. Zero disables it.
    pub partial_flush_delay: Duration,

    /// Number of updates that may be queued before callers block.
    /// Zero hands every update directly to the render thread.
    pub queue_capacity: usize,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            min_repaint_interval: MIN_REPAINT_INTERVAL,
            partial_flush_delay: MIN_REPAINT_INTERVAL * 10,
            queue_capacity: 0,
        }
    }
}

const STATE_CREATED: u8 = 0;
const STATE_STARTED: u8 = 1;
const STATE_STOPPED: u8 = 2;

enum Mutation {
    Open(LineId, CompactString),
    Set(LineId, CompactString),
    Close(LineId),
    Repaint,
}

/// An interactive status display writing to multiple lines at once.
///
/// `Status` is a cheap-to-clone handle; all clones refer to the same display.
/// A `Status` may not be restarted once stopped.
///
/// ```no_run
/// use parallel_status::{LineDisplay, Status};
///
/// let status = Status::detect(std::io::stdout());
/// status.start();
///
/// let id = status.open("downloading");
/// status.set(id, "downloading: 50%");
/// status.close(id);
///
/// status.stop();
/// ```
#[derive(Clone)]
pub struct Status {
    inner: Arc<Inner>,
}

struct Inner {
    state: AtomicU8,
    counter: AtomicU64,
    compat: bool,
    options: StatusOptions,

    terminal: Arc<Mutex<Terminal>>,

    sender: RwLock<Option<Sender<Mutation>>>,
    pending: Mutex<Option<(Renderer, Receiver<Mutation>)>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Status")
            .field("state", &self.inner.state.load(Ordering::Relaxed))
            .field("compat", &self.inner.compat)
            .finish_non_exhaustive()
    }
}

impl Status {
    /// Creates a status writing to `out`, assuming it is an interactive terminal.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self::builder(out).build()
    }

    /// Creates a status writing to `out`, using compatibility mode unless `out` is a terminal.
    pub fn detect(out: impl Write + IsTerminal + Send + 'static) -> Self {
        let interactive = out.is_terminal();
        Self::builder(out).interactive(interactive).build()
    }

    /// Starts building a status writing to `out`.
    pub fn builder(out: impl Write + Send + 'static) -> StatusBuilder {
        StatusBuilder {
            out: Box::new(out),
            interactive: true,
            lines: 0,
            options: StatusOptions::default(),
        }
    }

    /// Returns `true` if this status appends updates instead of repainting in place.
    #[must_use]
    pub fn is_compat(&self) -> bool {
        self.inner.compat
    }

    fn is_started(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == STATE_STARTED
    }

    fn send(&self, mutation: Mutation) {
        if !self.is_started() {
            return;
        }
        // clone the sender so that a concurrent stop() only waits for sends in flight
        let sender = self.inner.sender.read().clone();
        if let Some(sender) = sender {
            // fails only if the render thread is gone, in which case there is nobody to tell
            let _ = sender.send(mutation);
        }
    }
}

impl LineDisplay for Status {
    fn start(&self) {
        if let Err(state) = self.inner.state.compare_exchange(
            STATE_CREATED,
            STATE_STARTED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            if state == STATE_STARTED {
                panic!("Status: start() called multiple times");
            }
            panic!("Status: start() called after stop()");
        }

        let Some((renderer, receiver)) = self.inner.pending.lock().take() else {
            unreachable!("renderer is only taken by the first start()");
        };
        tracing::debug!(compat = self.inner.compat, lines = renderer.ids.len(), "status display started");

        let handle = thread::Builder::new()
            .name("status-render".into())
            .spawn(move || renderer.run(&receiver))
            .unwrap_or_else(|err| panic!("Status: could not spawn render thread: {err}"));
        *self.inner.worker.lock() = Some(handle);
    }

    fn stop(&self) {
        if self
            .inner
            .state
            .compare_exchange(
                STATE_STARTED,
                STATE_STOPPED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            panic!("Status: stop() called out of order");
        }

        // dropping the last sender lets the render thread drain the queue and exit
        drop(self.inner.sender.write().take());

        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(panic) = worker.join() {
                std::panic::resume_unwind(panic);
            }
        }
        tracing::debug!("status display stopped");
    }

    fn open(&self, content: &str) -> LineId {
        // allocate even when not running, so that later calls with this id are no-ops
        let id = LineId(self.inner.counter.fetch_add(1, Ordering::Relaxed) + 1);
        self.send(Mutation::Open(id, content.into()));
        id
    }

    fn set(&self, id: LineId, content: &str) {
        self.send(Mutation::Set(id, content.into()));
    }

    fn close(&self, id: LineId) {
        self.send(Mutation::Close(id));
    }

    fn line(&self, prefix: &str, id: LineId) -> LineBuffer {
        let prefix = CompactString::from(prefix);
        let setter = self.clone();
        let closer = self.clone();

        let mut builder = LineBuffer::builder(move |line| {
            setter.set(id, &format_compact!("{prefix}{line}"));
        })
        .flush_on_close(true)
        .on_close(move || closer.close(id));

        // partial flushes would flood a log with half-lines
        if !self.inner.compat {
            builder = builder.flush_partial_after(self.inner.options.partial_flush_delay);
        }
        builder.build()
    }

    fn bypass(&self) -> Box<dyn Write + Send> {
        Box::new(Bypass {
            status: self.clone(),
            pending: Vec::new(),
        })
    }
}

/// Writes directly to the device of a [`Status`], then asks for the managed area to
/// be redrawn below.
///
/// Output is held back until a line is complete, so a repaint never lands in the
/// middle of a bypassed line. Flushing or dropping the writer emits the rest.
struct Bypass {
    status: Status,
    pending: Vec<u8>,
}

impl Bypass {
    fn emit(&mut self, len: usize) -> io::Result<()> {
        if len == 0 {
            return Ok(());
        }
        // the terminal lock must be released before queueing, the render thread needs it
        let written = self.status.inner.terminal.lock().bypass(&self.pending[..len]);
        // failed lines are dropped rather than repeated on the next write
        self.pending.drain(..len);
        written?;
        self.status.send(Mutation::Repaint);
        Ok(())
    }
}

impl Write for Bypass {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        let complete = self
            .pending
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        self.emit(complete)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit(self.pending.len())
    }
}

impl Drop for Bypass {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            tracing::warn!(error = %err, "bypass output failed");
        }
    }
}

/// Builder for [`Status`] instances.
pub struct StatusBuilder {
    out: Box<dyn Write + Send>,
    interactive: bool,
    lines: usize,
    options: StatusOptions,
}

impl StatusBuilder {
    /// Sets whether the output is an interactive terminal.
    /// When `false`, the status runs in compatibility mode.
    #[must_use]
    pub const fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Starts the status with `count` empty lines, with ids `0..count`.
    ///
    /// Also raises the update queue to hold at least `count` entries.
    #[must_use]
    pub const fn lines(mut self, count: usize) -> Self {
        self.lines = count;
        self
    }

    /// Sets the tunables of the status.
    #[must_use]
    pub const fn options(mut self, options: StatusOptions) -> Self {
        self.options = options;
        self
    }

    /// Consumes the builder and returns the [`Status`]. It still needs to be started.
    #[must_use]
    pub fn build(self) -> Status {
        let count = self.lines as u64;
        let capacity = self.options.queue_capacity.max(self.lines);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);

        let terminal = Arc::new(Mutex::new(Terminal::new(self.out)));
        let compat = !self.interactive;

        let ids: Vec<LineId> = (0..count).map(LineId).collect();
        let lines = ids.iter().map(|&id| (id, CompactString::default())).collect();
        let renderer = Renderer {
            ids,
            lines,
            terminal: Arc::clone(&terminal),
            compat,
            min_interval: self.options.min_repaint_interval,
            last_paint: None,
            dirty: false,
        };

        Status {
            inner: Arc::new(Inner {
                state: AtomicU8::new(STATE_CREATED),
                counter: AtomicU64::new(count),
                compat,
                options: self.options,
                terminal,
                sender: RwLock::new(Some(sender)),
                pending: Mutex::new(Some((renderer, receiver))),
                worker: Mutex::new(None),
            }),
        }
    }
}

/// State owned by the render thread.
struct Renderer {
    /// Active lines, in display order.
    ids: Vec<LineId>,
    lines: HashMap<LineId, CompactString>,

    terminal: Arc<Mutex<Terminal>>,
    compat: bool,

    min_interval: Duration,
    last_paint: Option<Instant>,
    /// A throttled repaint is outstanding.
    dirty: bool,
}

impl Renderer {
    fn run(mut self, receiver: &Receiver<Mutation>) {
        loop {
            let mutation = if self.dirty {
                match receiver.recv_timeout(self.until_next_paint()) {
                    Ok(mutation) => mutation,
                    Err(RecvTimeoutError::Timeout) => {
                        self.repaint(false);
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match receiver.recv() {
                    Ok(mutation) => mutation,
                    Err(_) => break,
                }
            };
            self.apply(mutation);
        }

        self.repaint(true);
        tracing::trace!(remaining = self.ids.len(), "render thread finished");
    }

    fn until_next_paint(&self) -> Duration {
        self.last_paint.map_or(Duration::ZERO, |last| {
            self.min_interval.saturating_sub(last.elapsed())
        })
    }

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Open(id, content) => {
                if self.lines.contains_key(&id) {
                    return;
                }
                tracing::trace!(%id, "line opened");
                self.ids.push(id);
                if self.compat {
                    self.append(&content);
                }
                self.lines.insert(id, content);
                self.repaint(true);
            }
            Mutation::Set(id, content) => {
                let Some(slot) = self.lines.get_mut(&id) else {
                    return;
                };
                *slot = content;
                if self.compat {
                    let content = slot.clone();
                    self.append(&content);
                }
                self.repaint(false);
            }
            Mutation::Close(id) => {
                let Some(index) = self.ids.iter().position(|&active| active == id) else {
                    return;
                };
                self.ids.remove(index);
                let content = self.lines.remove(&id).unwrap_or_default();
                tracing::trace!(%id, "line closed");

                if let Err(err) = self.terminal.lock().scrollback(&content) {
                    tracing::warn!(error = %err, "status output failed");
                }
                self.repaint(true);
            }
            Mutation::Repaint => self.repaint(false),
        }
    }

    /// Compatibility mode: print an updated line on its own.
    fn append(&self, content: &str) {
        if let Err(err) = self.terminal.lock().scrollback(content) {
            tracing::warn!(error = %err, "status output failed");
        }
    }

    /// Redraws all active lines. Unless `force` is set, repaints closer together than
    /// the minimum interval are postponed.
    fn repaint(&mut self, force: bool) {
        if self.compat {
            return;
        }

        let now = Instant::now();
        if !force
            && self
                .last_paint
                .is_some_and(|last| now.duration_since(last) < self.min_interval)
        {
            if !self.dirty {
                tracing::trace!("repaint postponed");
            }
            self.dirty = true;
            return;
        }
        self.last_paint = Some(now);
        self.dirty = false;

        let lines = &self.lines;
        let content = self
            .ids
            .iter()
            .map(|id| lines.get(id).map_or("", CompactString::as_str));
        if let Err(err) = self.terminal.lock().paint(content) {
            tracing::warn!(error = %err, "status repaint failed");
        }
    }
}

/// A [`LineDisplay`] that displays nothing.
///
/// Used in place of a [`Status`] when output is discarded. Ids are still allocated
/// uniquely, line writers accept and drop everything.
#[derive(Debug, Default)]
pub struct NullStatus {
    counter: AtomicU64,
}

impl NullStatus {
    /// Creates a new `NullStatus`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineDisplay for NullStatus {
    fn start(&self) {}

    fn stop(&self) {}

    fn open(&self, _content: &str) -> LineId {
        LineId(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn set(&self, _id: LineId, _content: &str) {}

    fn close(&self, _id: LineId) {}

    fn line(&self, _prefix: &str, _id: LineId) -> LineBuffer {
        LineBuffer::discard()
    }

    fn bypass(&self) -> Box<dyn Write + Send> {
        Box::new(io::sink())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        io::Write as _,
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    use super::{LineDisplay, LineId, NullStatus, Status, StatusOptions};
    use crate::stream::MemoryBuffer;

    fn compat() -> (Status, MemoryBuffer) {
        let buffer = MemoryBuffer::default();
        let status = Status::builder(buffer.clone()).interactive(false).build();
        (status, buffer)
    }

    fn interactive(min_repaint_interval: Duration) -> (Status, MemoryBuffer) {
        let buffer = MemoryBuffer::default();
        let status = Status::builder(buffer.clone())
            .options(StatusOptions {
                min_repaint_interval,
                ..StatusOptions::default()
            })
            .build();
        (status, buffer)
    }

    /// Lifecycle Misuse
    /// Starting twice is a programmer error.
    #[test]
    #[should_panic(expected = "start() called multiple times")]
    fn test_start_twice_panics() {
        let (status, _) = compat();
        status.start();
        status.start();
    }

    #[test]
    #[should_panic(expected = "stop() called out of order")]
    fn test_stop_before_start_panics() {
        let (status, _) = compat();
        status.stop();
    }

    #[test]
    #[should_panic(expected = "stop() called out of order")]
    fn test_stop_twice_panics() {
        let (status, _) = compat();
        status.start();
        status.stop();
        status.stop();
    }

    #[test]
    #[should_panic(expected = "start() called after stop()")]
    fn test_restart_panics() {
        let (status, _) = compat();
        status.start();
        status.stop();
        status.start();
    }

    /// Outside Window
    /// Mutations before start and after stop are ignored, ids stay unique.
    #[test]
    fn test_mutations_outside_started_window_are_ignored() {
        let (status, buffer) = compat();

        let before = status.open("early");
        status.set(before, "early update");
        status.close(before);

        status.start();
        status.stop();

        let after = status.open("late");
        status.set(after, "late update");
        status.close(after);

        assert_ne!(before, after);
        assert_eq!(buffer.contents(), "");
    }

    /// Compatibility Output
    /// Every update is appended, and the closing content once more.
    #[test]
    fn test_compat_appends_updates() {
        let (status, buffer) = compat();
        status.start();

        let id = status.open("a");
        status.set(id, "b");
        status.close(id);
        status.close(id);
        status.close(LineId(999));
        status.set(id, "ignored");

        status.stop();
        assert_eq!(buffer.contents(), "a\nb\nb\n");
    }

    /// Line Writers
    /// Completed lines update the status line, closing the writer closes it.
    #[test]
    fn test_line_writer_bridges_to_status() {
        let (status, buffer) = compat();
        status.start();

        let line = status.open_line("[x] ", "start");
        line.write_str("one\ntwo").unwrap();
        line.close();

        status.stop();
        assert_eq!(
            buffer.contents(),
            "[x] start\n[x] one\n[x] two\n[x] two\n"
        );
    }

    /// Pre-sized Lines
    /// Initial lines take ids 0..n and fresh ids continue after them.
    #[test]
    fn test_presized_lines() {
        let buffer = MemoryBuffer::default();
        let status = Status::builder(buffer.clone())
            .interactive(false)
            .lines(2)
            .build();
        status.start();

        status.set(LineId(0), "zero");
        status.set(LineId(1), "one");
        assert_eq!(status.open("two"), LineId(3));

        status.stop();
        assert_eq!(buffer.contents(), "zero\none\ntwo\n");
    }

    /// Interactive Output
    /// Lines are painted in place and closed lines end up in the output for good.
    #[test]
    fn test_interactive_paints_in_place() {
        let buffer = MemoryBuffer::default();
        let status = Status::new(buffer.clone());
        assert!(!status.is_compat());
        status.start();

        let first = status.open("first");
        let second = status.open("second");
        status.set(second, "second updated");
        status.close(first);

        status.stop();

        let out = buffer.contents();
        assert!(out.contains("\x1b["), "no cursor movement in {out:?}");
        assert!(out.contains("first\n"));
        // the final forced repaint leaves the latest content on screen
        assert!(out.ends_with("second updated\n"), "unexpected tail in {out:?}");
    }

    /// Repaint Throttle
    /// Updates within the interval collapse into the final forced repaint.
    #[test]
    fn test_updates_are_throttled() {
        let (status, buffer) = interactive(Duration::from_secs(10));
        status.start();

        let id = status.open("start");
        for i in 0..200 {
            status.set(id, &format!("v{i}"));
        }

        status.stop();
        assert_eq!(buffer.contents(), "start\n\x1b[1F\x1b[Jv199\n");
    }

    /// Opening and closing repaint at once, regardless of the interval. A closed
    /// line is written to the permanent output exactly once.
    #[test]
    fn test_open_and_close_force_repaint() {
        let (status, buffer) = interactive(Duration::from_secs(10));
        status.start();

        let alpha = status.open("alpha");
        let beta = status.open("beta");
        status.set(alpha, "x");
        status.close(beta);

        status.stop();
        assert_eq!(
            buffer.contents(),
            concat!(
                "alpha\n",
                "\x1b[1F\x1b[Jalpha\nbeta\n",
                "\x1b[2F\x1b[Jbeta\nx\n",
                "\x1b[1F\x1b[Jx\n",
            )
        );
    }

    /// A postponed update is painted once the interval has passed, without
    /// waiting for another mutation.
    #[test]
    fn test_postponed_update_is_painted() {
        let (status, buffer) = interactive(Duration::from_millis(30));
        status.start();

        let id = status.open("before");
        status.set(id, "after");

        let deadline = Instant::now() + Duration::from_secs(2);
        while !buffer.contents().ends_with("after\n") {
            assert!(Instant::now() < deadline, "never painted: {:?}", buffer.contents());
            thread::sleep(Duration::from_millis(5));
        }

        status.stop();
    }

    /// Bypass
    /// Bypassed text goes to the output as is; an unterminated tail is written on drop.
    #[test]
    fn test_bypass_writes_directly() {
        let (status, buffer) = compat();
        status.start();

        let mut bypass = status.bypass();
        writeln!(bypass, "message").unwrap();
        write!(bypass, "tail").unwrap();
        drop(bypass);

        status.stop();
        assert_eq!(buffer.contents(), "message\ntail");
    }

    /// A line written in pieces is emitted whole, so a repaint between the pieces
    /// cannot erase its beginning.
    #[test]
    fn test_bypass_holds_partial_lines() {
        let (status, buffer) = interactive(Duration::from_secs(10));
        status.start();
        status.open("active line");

        let message = "hello";
        let mut bypass = status.bypass();
        write!(bypass, "{message}").unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(buffer.contents(), "active line\n");
        writeln!(bypass).unwrap();
        drop(bypass);

        status.stop();
        assert_eq!(
            buffer.contents(),
            "active line\n\x1b[1F\x1b[Jhello\nactive line\n"
        );
    }

    /// Concurrent Allocation
    /// Ids handed out from many threads never collide.
    #[test]
    fn test_concurrent_open_ids_are_unique() {
        let (status, _) = compat();
        status.start();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let status = status.clone();
                thread::spawn(move || {
                    (0..50)
                        .map(|i| {
                            let id = status.open(&format!("line {i}"));
                            status.close(id);
                            id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        status.stop();
        assert_eq!(seen.len(), 400);
    }

    #[test]
    fn test_null_status() {
        let status: Arc<dyn LineDisplay> = Arc::new(NullStatus::new());
        status.start();

        let a = status.open("a");
        let b = status.open("b");
        assert_ne!(a, b);

        let line = status.open_line("p ", "c");
        line.write_str("ignored\n").unwrap();
        line.close();
        status.bypass().write_all(b"gone").unwrap();

        status.stop();
    }
}
