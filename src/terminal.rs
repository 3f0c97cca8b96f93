//! The output device behind a [`Status`](crate::Status).
//!
//! [`Terminal`] owns the writer and remembers how many rows of the managed area
//! are currently on screen, so the next repaint can move the cursor back up and
//! rewrite them in place. Anything written "around" the managed area (scrollback
//! lines, bypass output) first erases it; the following repaint puts it back below.

use std::io::{self, Write};

use crossterm::{
    cursor::MoveToPreviousLine,
    queue,
    terminal::{self, Clear, ClearType},
};
use unicode_width::UnicodeWidthStr;

pub(crate) struct Terminal {
    out: Box<dyn Write + Send>,
    /// Rows of managed output currently drawn above the cursor.
    drawn: usize,
}

impl Terminal {
    pub(crate) fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out, drawn: 0 }
    }

    /// Moves the cursor to the top of the managed area and clears everything below.
    fn erase(&mut self) -> io::Result<()> {
        if self.drawn == 0 {
            return Ok(());
        }
        let rows = u16::try_from(self.drawn).unwrap_or(u16::MAX);
        queue!(self.out, MoveToPreviousLine(rows), Clear(ClearType::FromCursorDown))?;
        self.drawn = 0;
        Ok(())
    }

    /// Rewrites the managed area with `lines`, in order.
    pub(crate) fn paint<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> io::Result<()> {
        self.erase()?;

        let width = terminal::size().ok().map(|(cols, _)| usize::from(cols));
        let mut rows = 0;
        for line in lines {
            writeln!(self.out, "{line}")?;
            rows += wrapped_rows(line, width);
        }
        self.drawn = rows;
        self.out.flush()
    }

    /// Writes `line` permanently above the managed area.
    pub(crate) fn scrollback(&mut self, line: &str) -> io::Result<()> {
        self.erase()?;
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    /// Writes raw bytes permanently above the managed area.
    pub(crate) fn bypass(&mut self, buf: &[u8]) -> io::Result<()> {
        self.erase()?;
        self.out.write_all(buf)?;
        self.out.flush()
    }
}

/// Number of screen rows `line` occupies at the given terminal width.
fn wrapped_rows(line: &str, width: Option<usize>) -> usize {
    match width {
        Some(width) if width > 0 => line.width().div_ceil(width).max(1),
        _ => 1,
    }
}
