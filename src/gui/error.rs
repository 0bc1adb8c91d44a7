use std::{error::Error, fmt::Display, sync::mpsc};

/// Returned when the terminal interface cannot be drawn or its worker
/// thread cannot be reached.
#[derive(Debug)]
pub enum GuiError {
    /// Drawing to the terminal failed.
    IOError(std::io::Error),
    /// The worker thread hung up before the result was sent.
    MPSCSendError,
    /// The worker thread hung up before the result was received.
    MPSCRecvError(mpsc::RecvError),
    /// The worker thread panicked.
    JoinError,
    /// There is nothing to select from.
    NoDevices,
}

impl Display for GuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuiError::IOError(e) => write!(f, "terminal io failed: {e}"),
            GuiError::MPSCSendError => write!(f, "worker thread hung up"),
            GuiError::MPSCRecvError(e) => write!(f, "worker thread hung up: {e}"),
            GuiError::JoinError => write!(f, "worker thread panicked"),
            GuiError::NoDevices => write!(f, "no serial devices found"),
        }
    }
}

impl Error for GuiError {}

impl From<std::io::Error> for GuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl<T> From<mpsc::SendError<T>> for GuiError {
    fn from(_: mpsc::SendError<T>) -> Self {
        Self::MPSCSendError
    }
}

impl From<mpsc::RecvError> for GuiError {
    fn from(value: mpsc::RecvError) -> Self {
        Self::MPSCRecvError(value)
    }
}
