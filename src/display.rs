// EnvStation — Shared Status Display
//
// The status panel is written by more than one task (boot/link status, sensor
// status).  Every write is a whole frame composed under the display lock:
// clear → draw each line → flush, then release.  The lock is never held
// across a sensor or network call.

use core::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::*;

/// Text sink for a small monochrome panel.
pub trait DisplaySink {
    type Error: fmt::Debug;

    /// Blank the off-screen buffer.
    fn clear(&mut self);

    /// Render `text` with its top-left corner at (`x`, `y`).
    fn draw_text(&mut self, x: i32, y: i32, scale: u8, text: &str);

    /// Push the off-screen buffer to the panel.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub type Line = heapless::String<STATUS_LINE_CAPACITY>;

/// Up to four lines of status text, drawn at fixed rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFrame {
    lines: heapless::Vec<Line, STATUS_LINES>,
}

impl StatusFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: &[&str]) -> Self {
        let mut frame = Self::new();
        for line in lines {
            frame.push(format_args!("{}", line));
        }
        frame
    }

    /// Append a formatted line, truncated to the line capacity.  Lines past
    /// the fourth are ignored.
    pub fn push(&mut self, args: fmt::Arguments<'_>) {
        let mut line = Truncating(Line::new());
        // Truncating never reports an error.
        let _ = line.write_fmt(args);
        let _ = self.lines.push(line.0);
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

struct Truncating(Line);

impl fmt::Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Handle to the display lock; cheap to clone into each task.
pub struct SharedDisplay<D> {
    inner: Arc<Mutex<D>>,
}

impl<D> Clone for SharedDisplay<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: DisplaySink> SharedDisplay<D> {
    pub fn new(sink: D) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Replace the panel contents with `frame` as one atomic update.
    pub fn show(&self, frame: &StatusFrame) -> Result<(), D::Error> {
        // A composer that panicked mid-frame leaves at worst a stale buffer,
        // which the clear below discards.
        let mut sink = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        sink.clear();
        for (text, y) in frame.lines().zip(STATUS_LINE_Y) {
            sink.draw_text(0, y, 1, text);
        }
        sink.flush()
    }

    pub fn show_lines(&self, lines: &[&str]) -> Result<(), D::Error> {
        self.show(&StatusFrame::from_lines(lines))
    }
}
