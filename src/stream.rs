//! Shareable output handles and the two-stream [`IoStream`] passed to handlers.
//!
//! An [`Output`] is a cloneable handle to one writer, remembering whether that writer
//! is an interactive terminal and whether it discards everything. Those two facts
//! decide which kind of [`LineDisplay`] gets built on top of it.

use std::{
    fmt,
    io::{self, IsTerminal, Write},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    error::Result,
    line::LineBuffer,
    status::{LineDisplay, NullStatus, Status},
};

/// A cloneable, thread-safe handle to an output writer.
///
/// Both `Output` and `&Output` implement [`Write`]; writes from different clones are
/// serialized per call.
#[derive(Clone)]
pub struct Output {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
    terminal: bool,
    null: bool,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("terminal", &self.terminal)
            .field("null", &self.null)
            .finish_non_exhaustive()
    }
}

impl Output {
    /// Wraps a writer that is not an interactive terminal.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(out))),
            terminal: false,
            null: false,
        }
    }

    /// Wraps a writer, recording whether it is an interactive terminal.
    pub fn detect(out: impl Write + IsTerminal + Send + 'static) -> Self {
        let terminal = out.is_terminal();
        Self {
            terminal,
            ..Self::new(out)
        }
    }

    /// The standard output of this process.
    #[must_use]
    pub fn stdout() -> Self {
        Self::detect(io::stdout())
    }

    /// The standard error of this process.
    #[must_use]
    pub fn stderr() -> Self {
        Self::detect(io::stderr())
    }

    /// An output that discards everything written to it.
    #[must_use]
    pub fn null() -> Self {
        Self {
            null: true,
            ..Self::new(io::sink())
        }
    }

    /// Returns `true` if the writer is an interactive terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Returns `true` if this output was created by [`Output::null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.null
    }

    /// Builds a display on top of this output.
    ///
    /// Discarding outputs get a [`NullStatus`]. Otherwise a [`Status`] is built,
    /// in compatibility mode unless the output is a terminal.
    #[must_use]
    pub fn status_display(&self) -> Box<dyn LineDisplay> {
        if self.null {
            return Box::new(NullStatus::new());
        }
        Box::new(
            Status::builder(self.clone())
                .interactive(self.terminal)
                .build(),
        )
    }
}

impl Write for &Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        (&*self).write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self).flush()
    }
}

/// An in-memory writer whose clones share one buffer.
///
/// Handy for capturing what a [`Status`] or handler printed.
#[derive(Clone, Debug, Default)]
pub struct MemoryBuffer(Arc<Mutex<Vec<u8>>>);

impl MemoryBuffer {
    /// Everything written so far, lossily decoded as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Everything written so far.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().clone()
    }
}

impl Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The output and error streams handed to a unit of work.
#[derive(Clone, Debug)]
pub struct IoStream {
    /// Standard output.
    pub stdout: Output,
    /// Standard error.
    pub stderr: Output,
}

impl IoStream {
    /// Creates a stream from two outputs.
    #[must_use]
    pub const fn new(stdout: Output, stderr: Output) -> Self {
        Self { stdout, stderr }
    }

    /// The standard output and error of this process.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Output::stdout(), Output::stderr())
    }

    /// A stream discarding all output.
    #[must_use]
    pub fn null() -> Self {
        Self::new(Output::null(), Output::null())
    }

    /// A stream whose output and error both go to `line`.
    #[must_use]
    pub fn from_line(line: LineBuffer) -> Self {
        let out = Output::new(line);
        Self::new(out.clone(), out)
    }

    /// Returns `true` if standard output is an interactive terminal.
    #[must_use]
    pub const fn stdout_is_terminal(&self) -> bool {
        self.stdout.is_terminal()
    }

    /// Returns `true` if standard error is an interactive terminal.
    #[must_use]
    pub const fn stderr_is_terminal(&self) -> bool {
        self.stderr.is_terminal()
    }

    /// Writes `value` to standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn print(&self, value: impl fmt::Display) -> Result<()> {
        let mut out = &self.stdout;
        write!(out, "{value}")?;
        Ok(())
    }

    /// Writes `value` and a newline to standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn println(&self, value: impl fmt::Display) -> Result<()> {
        let mut out = &self.stdout;
        writeln!(out, "{value}")?;
        Ok(())
    }

    /// Writes `value` and a newline to standard error.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn eprintln(&self, value: impl fmt::Display) -> Result<()> {
        let mut err = &self.stderr;
        writeln!(err, "{value}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use parking_lot::Mutex;
    use std::sync::Arc;

    use super::{IoStream, MemoryBuffer, Output};
    use crate::LineBuffer;

    #[test]
    fn test_output_clones_share_writer() {
        let buffer = MemoryBuffer::default();
        let mut a = Output::new(buffer.clone());
        let b = a.clone();

        write!(a, "one ").unwrap();
        let mut b_ref = &b;
        write!(b_ref, "two").unwrap();

        assert_eq!(buffer.contents(), "one two");
        assert!(!a.is_terminal());
        assert!(!a.is_null());
    }

    #[test]
    fn test_null_output() {
        let mut null = Output::null();
        assert!(null.is_null());
        null.write_all(b"gone").unwrap();
    }

    /// Line Streams
    /// Both streams of a line-backed stream end up on the same line.
    #[test]
    fn test_stream_from_line() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let line = LineBuffer::new(move |l| sink.lock().push(l.to_owned()));

        let stream = IoStream::from_line(line.clone());
        stream.println("out").unwrap();
        stream.eprintln("err").unwrap();
        stream.print("par").unwrap();
        stream.println("tial").unwrap();

        assert_eq!(*lines.lock(), ["out", "err", "partial"]);

        line.close();
        assert!(stream.println("late").unwrap_err().is_closed());
    }
}
