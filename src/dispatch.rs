//! Picks between plain sequential execution and a [`Group`] on a status display.
//!
//! [`StreamGroup`] runs a handler over items given a concurrency level:
//!
//! * `1` runs the items one after another on the caller's [`IoStream`]. No display is
//!   created and output appears exactly as the handlers write it.
//! * anything else (`0` meaning unbounded) runs them through a [`Group`], each item
//!   getting an [`IoStream`] whose output and error go to its own status line.

use std::fmt;

use crate::{
    group::{Group, default_prefix_string, use_error_group},
    line::LineBuffer,
    stream::IoStream,
};

type MessageFn<'a, T> = Box<dyn Fn(&T) -> String + Send + Sync + 'a>;

/// Runs a handler over items, sequentially or concurrently depending on the
/// concurrency level.
pub struct StreamGroup<'a, T> {
    concurrency: usize,
    message: Option<MessageFn<'a, T>>,
}

impl<T> fmt::Debug for StreamGroup<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamGroup")
            .field("concurrency", &self.concurrency)
            .field("message", &self.message.is_some())
            .finish()
    }
}

impl<'a, T> StreamGroup<'a, T> {
    /// Creates a dispatcher running at most `concurrency` handlers at once.
    /// `1` means sequential, `0` means no limit.
    #[must_use]
    pub const fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            message: None,
        }
    }

    /// Sets the label printed for each item.
    ///
    /// When running concurrently the label is shown as `[label]: ` in front of each
    /// status line, with all labels padded to the same width.
    #[must_use]
    pub fn message(mut self, message: impl Fn(&T) -> String + Send + Sync + 'a) -> Self {
        self.message = Some(Box::new(message));
        self
    }

    /// Returns `true` if items are run through a status display.
    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.concurrency != 1
    }

    /// Runs `handler` for every item.
    ///
    /// Sequential mode stops at the first failing item. Concurrent mode always runs
    /// every item and then reports the first failure in input order.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `handler`.
    pub fn run<E>(
        &self,
        stream: &IoStream,
        items: &[T],
        handler: impl Fn(&T, &IoStream) -> Result<(), E> + Send + Sync,
    ) -> Result<(), E>
    where
        T: fmt::Display + Sync,
        E: fmt::Display + Send,
    {
        tracing::debug!(
            items = items.len(),
            concurrency = self.concurrency,
            parallel = self.is_parallel(),
            "dispatching"
        );

        if !self.is_parallel() {
            for (index, item) in items.iter().enumerate() {
                let label = self
                    .message
                    .as_ref()
                    .map_or_else(|| default_prefix_string(item, index), |message| message(item));
                if let Err(err) = stream.println(&label) {
                    tracing::debug!(error = %err, "could not print item label");
                }
                handler(item, stream)?;
            }
            return Ok(());
        }

        let mut group = Group::for_errors(|item: &T, _, line: &LineBuffer| {
            handler(item, &IoStream::from_line(line.clone()))
        })
        .handler_limit(self.concurrency);

        if let Some(message) = &self.message {
            group = group
                .prefix_string(move |item, _| format!("[{}]: ", message(item)))
                .prefix_align(true);
        }

        let display = stream.stdout.status_display();
        display.start();
        let result = use_error_group(&*display, &group, items);
        display.stop();

        result.map(|_| ())
    }
}

/// Runs `handler` over `items` with the given concurrency level.
///
/// Shorthand for [`StreamGroup::new`] followed by [`StreamGroup::run`].
///
/// # Errors
///
/// Returns the first error produced by `handler`.
pub fn stream_group<T, E>(
    stream: &IoStream,
    concurrency: usize,
    handler: impl Fn(&T, &IoStream) -> Result<(), E> + Send + Sync,
    items: &[T],
) -> Result<(), E>
where
    T: fmt::Display + Sync,
    E: fmt::Display + Send,
{
    StreamGroup::new(concurrency).run(stream, items, handler)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{StreamGroup, stream_group};
    use crate::stream::{IoStream, MemoryBuffer, Output};

    fn captured() -> (IoStream, MemoryBuffer) {
        let buffer = MemoryBuffer::default();
        let out = Output::new(buffer.clone());
        (IoStream::new(out.clone(), out), buffer)
    }

    /// Sequential Dispatch
    /// Output goes straight to the stream, in order, without control sequences.
    #[test]
    fn test_sequential_writes_directly() {
        let (stream, buffer) = captured();

        let result = stream_group(
            &stream,
            1,
            |item: &&str, ios: &IoStream| ios.println(format!("handled {item}")),
            &["a", "b", "c"],
        );

        assert!(result.is_ok());
        let out = buffer.contents();
        assert_eq!(out, "a: \nhandled a\nb: \nhandled b\nc: \nhandled c\n");
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_sequential_stops_at_first_error() {
        let (stream, _) = captured();
        let ran = AtomicUsize::new(0);

        let result = StreamGroup::new(1).run(&stream, &[1, 2, 3], |item: &u8, _| {
            ran.fetch_add(1, Ordering::SeqCst);
            if *item == 2 { Err("two") } else { Ok(()) }
        });

        assert_eq!(result, Err("two"));
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    /// Concurrent Dispatch
    /// Each item writes to its own bracketed, aligned line and every item runs.
    #[test]
    fn test_concurrent_uses_status_lines() {
        let (stream, buffer) = captured();
        let ran = AtomicUsize::new(0);

        let group = StreamGroup::new(2).message(|item: &&str| (*item).to_owned());
        assert!(group.is_parallel());

        let result = group.run(&stream, &["x", "yyy", "z"], |item, ios| {
            ran.fetch_add(1, Ordering::SeqCst);
            ios.println(format!("hello {item}")).map_err(|e| e.to_string())?;
            if *item == "yyy" {
                return Err(format!("{item} failed"));
            }
            Ok(())
        });

        assert_eq!(result, Err("yyy failed".to_owned()));
        assert_eq!(ran.load(Ordering::SeqCst), 3);

        let out = buffer.contents();
        assert!(out.contains("[x]:   hello x\n"), "{out}");
        assert!(out.contains("[yyy]: hello yyy\n"), "{out}");
        assert!(out.contains("[yyy]: failed (yyy failed)\n"), "{out}");
        assert!(out.contains("[z]:   done\n"), "{out}");
    }

    #[test]
    fn test_concurrent_on_null_output() {
        let stream = IoStream::null();
        let result = stream_group(&stream, 0, |_: &u8, ios: &IoStream| ios.println("gone"), &[1, 2]);
        assert!(result.is_ok());
    }
}
