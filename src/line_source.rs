//! The seam between wherever telemetry comes from and the collector.

use std::{error::Error, fmt::Display, io, path::PathBuf};

/// The identifier of the stream a line came from, and the line itself.
pub type StreamLine = (String, String);

/// `LineSource`
///
/// A clearable iterator that emits `(stream, line)` pairs when iterated
/// upon. `next()` returns `None` when nothing is buffered right now, not when
/// the source is exhausted, so callers poll it in a loop.
pub trait LineSource: Iterator<Item = StreamLine> {
    /// Throws away every buffered line.
    fn clear(&mut self);

    /// Takes every line buffered so far.
    fn drain_available(&mut self) -> Vec<StreamLine> {
        std::iter::from_fn(|| self.next()).collect()
    }
}

/// Returned when a line source cannot be set up or driven.
#[derive(Debug)]
pub enum SourceError {
    /// No port was given.
    NoPorts,
    /// A port could not be opened or configured.
    Open {
        /// The port
        port: PathBuf,
        /// What went wrong
        source: io::Error,
    },
    /// Listing ports or talking to a port failed.
    IoError(io::Error),
    /// The generator thread of a synthetic source is gone.
    Stopped,
}

impl Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NoPorts => write!(f, "no serial port given"),
            SourceError::Open { port, source } => {
                write!(f, "could not open {}: {source}", port.display())
            }
            SourceError::IoError(e) => write!(f, "serial io failed: {e}"),
            SourceError::Stopped => write!(f, "the source has already stopped"),
        }
    }
}

impl Error for SourceError {}

impl From<io::Error> for SourceError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}
