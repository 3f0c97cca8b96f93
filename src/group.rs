//! Runs a handler over a collection of items, each on its own status line.
//!
//! A [`Group`] hands every item a dedicated [`LineBuffer`] connected to one line of a
//! [`LineDisplay`], runs at most [`Group::handler_limit`] handlers at the same time,
//! and returns one result per item in input order.
//!
//! # Dispatch
//!
//! Items are handed to a fixed pool of workers through a rendezvous queue, in input
//! order. Execution therefore *starts* in input order; completion order is whatever
//! the handlers make of it. Results are stored by index.
//!
//! Without a [`wait_string`](Group::wait_string) a line is opened right before its
//! handler starts and closed right after it returns, so screen order follows start
//! order. With one, all lines are opened up front and closed at the end, keeping
//! screen order equal to input order.
//!
//! Nothing is cancelled or retried: a failing handler does not stop the others.

use std::{
    fmt, io,
    panic::resume_unwind,
    thread,
};

use unicode_width::UnicodeWidthStr;

use crate::{
    line::LineBuffer,
    status::{LineDisplay, Status},
};

type LabelFn<'a, Item> = Box<dyn Fn(&Item, usize) -> String + Send + Sync + 'a>;
type ResultFn<'a, Item, R> = Box<dyn Fn(&R, &Item, usize) -> String + Send + Sync + 'a>;
type HandlerFn<'a, Item, R> = Box<dyn Fn(&Item, usize, &LineBuffer) -> R + Send + Sync + 'a>;

/// Default prefix of a line: the item followed by `": "`.
pub fn default_prefix_string<Item: fmt::Display>(item: &Item, _index: usize) -> String {
    format!("{item}: ")
}

/// Default completion summary: the result formatted with [`fmt::Display`].
pub fn default_result_string<Item, R: fmt::Display>(result: &R, _item: &Item, _index: usize) -> String {
    result.to_string()
}

/// Placeholder shown on lines whose handler has not started: `"waiting"`.
pub fn default_wait_string<Item>(_item: &Item, _index: usize) -> String {
    "waiting".to_owned()
}

/// Completion summary for fallible handlers: `"done"` or `"failed (<error>)"`.
pub fn default_error_string<Item, T, E: fmt::Display>(
    result: &Result<T, E>,
    _item: &Item,
    _index: usize,
) -> String {
    match result {
        Ok(_) => "done".to_owned(),
        Err(err) => format!("failed ({err})"),
    }
}

/// A concurrent set of operations, each writing to a dedicated status line.
pub struct Group<'a, Item, R> {
    handler: HandlerFn<'a, Item, R>,
    prefix_string: LabelFn<'a, Item>,
    prefix_align: bool,
    result_string: ResultFn<'a, Item, R>,
    handler_limit: usize,
    wait_string: Option<LabelFn<'a, Item>>,
}

impl<Item, R> fmt::Debug for Group<'_, Item, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("prefix_align", &self.prefix_align)
            .field("handler_limit", &self.handler_limit)
            .field("waits", &self.wait_string.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a, Item, R> Group<'a, Item, R> {
    /// Creates a group with the default prefix and result formatting.
    pub fn new(handler: impl Fn(&Item, usize, &LineBuffer) -> R + Send + Sync + 'a) -> Self
    where
        Item: fmt::Display + 'a,
        R: fmt::Display + 'a,
    {
        Self::with_formatters(
            handler,
            default_prefix_string::<Item>,
            default_result_string::<Item, R>,
        )
    }

    /// Creates a group with explicit prefix and result formatting.
    pub fn with_formatters(
        handler: impl Fn(&Item, usize, &LineBuffer) -> R + Send + Sync + 'a,
        prefix_string: impl Fn(&Item, usize) -> String + Send + Sync + 'a,
        result_string: impl Fn(&R, &Item, usize) -> String + Send + Sync + 'a,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            prefix_string: Box::new(prefix_string),
            prefix_align: false,
            result_string: Box::new(result_string),
            handler_limit: 0,
            wait_string: None,
        }
    }

    /// Sets the function computing the prefix of each item's line.
    #[must_use]
    pub fn prefix_string(mut self, f: impl Fn(&Item, usize) -> String + Send + Sync + 'a) -> Self {
        self.prefix_string = Box::new(f);
        self
    }

    /// Pads all prefixes of one run with spaces to the same width.
    #[must_use]
    pub const fn prefix_align(mut self, align: bool) -> Self {
        self.prefix_align = align;
        self
    }

    /// Sets the function computing the summary written once an item's handler returns.
    #[must_use]
    pub fn result_string(
        mut self,
        f: impl Fn(&R, &Item, usize) -> String + Send + Sync + 'a,
    ) -> Self {
        self.result_string = Box::new(f);
        self
    }

    /// Sets the maximum number of handlers running at once. `0` means no limit.
    #[must_use]
    pub const fn handler_limit(mut self, limit: usize) -> Self {
        self.handler_limit = limit;
        self
    }

    /// Opens every line up front showing this placeholder, so lines appear in input order.
    #[must_use]
    pub fn wait_string(mut self, f: impl Fn(&Item, usize) -> String + Send + Sync + 'a) -> Self {
        self.wait_string = Some(Box::new(f));
        self
    }

    /// Computes the (optionally aligned) prefix of every item.
    fn prefixes(&self, items: &[Item]) -> Vec<String> {
        let mut prefixes: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(index, item)| (self.prefix_string)(item, index))
            .collect();

        if self.prefix_align {
            let width = prefixes.iter().map(|p| p.width()).max().unwrap_or(0);
            for prefix in &mut prefixes {
                let pad = width - prefix.width();
                prefix.extend(std::iter::repeat_n(' ', pad));
            }
        }
        prefixes
    }

    /// Calls the handler for every item, sending output to `status`.
    ///
    /// Returns once every handler has returned, with results in input order.
    /// A panicking handler is re-raised here after the remaining workers finished.
    pub fn use_status(&self, status: &dyn LineDisplay, items: &[Item]) -> Vec<R>
    where
        Item: Sync,
        R: Send,
    {
        if items.is_empty() {
            return Vec::new();
        }

        let prefixes = self.prefixes(items);
        let waiting: Option<Vec<LineBuffer>> = self.wait_string.as_ref().map(|wait| {
            items
                .iter()
                .enumerate()
                .map(|(index, item)| status.open_line(&prefixes[index], &wait(item, index)))
                .collect()
        });

        let workers = match self.handler_limit {
            0 => items.len(),
            limit => limit.min(items.len()),
        };
        tracing::debug!(items = items.len(), workers, "group dispatch started");

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();
        let (sender, receiver) = crossbeam_channel::bounded::<usize>(0);

        thread::scope(|scope| {
            let prefixes = &prefixes;
            let waiting = waiting.as_deref();

            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let receiver = receiver.clone();
                    scope.spawn(move || {
                        receiver
                            .iter()
                            .map(|index| {
                                let line = waiting.map_or_else(
                                    || status.open_line(&prefixes[index], ""),
                                    |lines| lines[index].clone(),
                                );
                                let result = self.run_one(&items[index], index, &line);
                                if waiting.is_none() {
                                    line.close();
                                }
                                (index, result)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            drop(receiver);

            for index in 0..items.len() {
                // every worker is gone, which only happens when they panicked
                if sender.send(index).is_err() {
                    break;
                }
            }
            drop(sender);

            let mut panicked = None;
            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (index, result) in done {
                            slots[index] = Some(result);
                        }
                    }
                    Err(panic) => panicked = panicked.or(Some(panic)),
                }
            }
            if let Some(panic) = panicked {
                resume_unwind(panic);
            }
        });

        if let Some(lines) = waiting {
            for line in lines {
                line.close();
            }
        }
        tracing::debug!(items = items.len(), "group dispatch finished");

        slots.into_iter().flatten().collect()
    }

    fn run_one(&self, item: &Item, index: usize, line: &LineBuffer) -> R {
        let result = (self.handler)(item, index, line);

        let summary = (self.result_string)(&result, item, index);
        if let Err(err) = line.write_str(&format!("\n{summary}\n")) {
            tracing::debug!(index, error = %err, "could not write completion summary");
        }
        result
    }

    /// Creates a new [`Status`] on `out`, runs [`use_status`](Self::use_status) on it and
    /// stops it again.
    pub fn run(&self, out: impl io::Write + Send + 'static, items: &[Item]) -> Vec<R>
    where
        Item: Sync,
        R: Send,
    {
        let status = Status::new(out);
        status.start();
        let results = self.use_status(&status, items);
        status.stop();
        results
    }
}

impl<'a, Item, T, E> Group<'a, Item, Result<T, E>> {
    /// Creates a group of fallible handlers, summarizing each as `"done"` or `"failed (...)"`.
    pub fn for_errors(
        handler: impl Fn(&Item, usize, &LineBuffer) -> Result<T, E> + Send + Sync + 'a,
    ) -> Self
    where
        Item: fmt::Display + 'a,
        T: 'a,
        E: fmt::Display + 'a,
    {
        Self::with_formatters(
            handler,
            default_prefix_string::<Item>,
            default_error_string::<Item, T, E>,
        )
    }
}

/// Runs `group` on `status` and returns all values, or the first error in input order.
///
/// Every handler runs to completion regardless of failures.
///
/// # Errors
///
/// Returns the error of the lowest-indexed failing item.
pub fn use_error_group<Item, T, E>(
    status: &dyn LineDisplay,
    group: &Group<'_, Item, Result<T, E>>,
    items: &[Item],
) -> Result<Vec<T>, E>
where
    Item: Sync,
    T: Send,
    E: Send,
{
    group.use_status(status, items).into_iter().collect()
}

/// Like [`use_error_group`], but on a new [`Status`] writing to `out`.
///
/// # Errors
///
/// Returns the error of the lowest-indexed failing item.
pub fn run_error_group<Item, T, E>(
    out: impl io::Write + Send + 'static,
    group: &Group<'_, Item, Result<T, E>>,
    items: &[Item],
) -> Result<Vec<T>, E>
where
    Item: Sync,
    T: Send,
    E: Send,
{
    group.run(out, items).into_iter().collect()
}
