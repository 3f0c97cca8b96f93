//! # `parallel_status`
//!
//! A live, multi-line status display for running independent units of work
//! concurrently, each with its own continuously updated line of output.
//!
//! The pieces, leaves first:
//!
//! * **Concurrent**: A [`Group`] runs a handler over many items with a bounded number of
//!   worker threads and returns the results in input order.
//! * **Line-oriented**: Every item writes to a [`LineBuffer`] which turns its byte stream
//!   into whole lines for one line of a [`Status`].
//! * **Single renderer**: [`Status`] applies all updates on one render thread, repaints
//!   at a bounded rate, and falls back to plain appended output when the destination
//!   is not a terminal.
//!
//! ## Modules
//!
//! * [`line`]: The [`LineBuffer`] byte-to-line sink.
//! * [`status`]: The [`Status`] display, the [`LineDisplay`] trait and [`NullStatus`].
//! * [`group`]: Bounded-parallel dispatch of handlers onto status lines.
//! * [`stream`]: [`Output`] handles and the two-stream [`IoStream`].
//! * [`dispatch`]: [`StreamGroup`], choosing between sequential and concurrent execution.
//!
//! ## Example
//!
//! ```no_run
//! use std::io::Write as _;
//!
//! use parallel_status::{Group, NullStatus};
//!
//! let group = Group::new(|item: &u32, _index, line| {
//!     let mut line = line;
//!     writeln!(line, "squaring {item}").ok();
//!     item * item
//! })
//! .handler_limit(4);
//!
//! let squares = group.run(std::io::stdout(), &[1, 2, 3]);
//! assert_eq!(squares, [1, 4, 9]);
//!
//! // the same group, with output discarded
//! assert_eq!(group.use_status(&NullStatus::new(), &[4]), [16]);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod group;
pub mod line;
pub mod status;
pub mod stream;
mod terminal;

pub use dispatch::{StreamGroup, stream_group};
pub use error::{Error, Result};
pub use group::{Group, run_error_group, use_error_group};
pub use line::{LineBuffer, LineBufferBuilder};
pub use status::{LineDisplay, LineId, NullStatus, Status, StatusBuilder, StatusOptions};
pub use stream::{IoStream, MemoryBuffer, Output};
