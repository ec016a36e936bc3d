//! Error types for the WS2812 strip driver.

use std::io;

/// Errors raised by the transport between the driver and the controller board.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device did not answer within the transport timeout.
    #[error("Transport timed out")]
    Timeout,

    /// The device is no longer connected.
    #[error("Device disconnected")]
    Disconnected,

    /// The device answered with a frame that does not fit the request.
    #[error("Unexpected response (control byte: {0:#04x})")]
    UnexpectedResponse(u8),

    /// An I/O error from the underlying endpoint.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors that can occur while driving the LED strip.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Not enough bytes for the declared command.
    #[error("Truncated packet (expected {expected} bytes, got {actual})")]
    Truncated {
        /// Bytes required by the command.
        expected: usize,
        /// Bytes available in the buffer.
        actual: usize,
    },

    /// Unrecognized control byte.
    #[error("Unknown command (control byte: {0:#04x})")]
    UnknownCommand(u8),

    /// SetMode carried a mode id that does not exist.
    #[error("Unknown mode id {0}")]
    UnknownMode(u8),

    /// GetData carried a data kind that does not exist.
    #[error("Unknown data kind {0}")]
    UnknownDataKind(u8),

    /// Pixel data does not fit in the target buffer.
    #[error("Pixel data out of range (offset {offset} + length {length} > {capacity})")]
    OutOfRange {
        /// First pixel index written.
        offset: usize,
        /// Number of pixels written.
        length: usize,
        /// Length of the target buffer.
        capacity: usize,
    },

    /// A pixel buffer could not be allocated or resized.
    #[error("Out of memory while allocating {0} pixels")]
    OutOfMemory(usize),

    /// The requested operation does not apply to the active mode.
    #[error("Operation not available in {0} mode")]
    ModeMismatch(&'static str),

    /// Blink settings that cannot produce a pattern.
    #[error("Invalid blink settings (pattern_count {pattern_count}, pattern_len {pattern_len})")]
    InvalidModeSettings {
        /// Number of pattern frames.
        pattern_count: u8,
        /// Pixels per pattern frame.
        pattern_len: u8,
    },

    /// The read buffer cannot hold the rendered response.
    #[error("Buffer too small (need {needed} bytes, have {available})")]
    BufferTooSmall {
        /// Bytes required for the response.
        needed: usize,
        /// Bytes offered by the caller.
        available: usize,
    },

    /// A read was attempted with no pending data request.
    #[error("No pending data request")]
    NoPendingRequest,

    /// The transport to the controller board failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error occurred (e.g., on the device file).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// errno values as seen by device-file callers
const EIO: i32 = 5;
const ENOMEM: i32 = 12;
const EINVAL: i32 = 22;
const EBADRQC: i32 = 56;
const ENODATA: i32 = 61;
const EBADMSG: i32 = 74;
const EMSGSIZE: i32 = 90;
const ENOBUFS: i32 = 105;
const ENODEV: i32 = 19;
const ETIMEDOUT: i32 = 110;
const EPROTO: i32 = 71;
const ERANGE: i32 = 34;
const EAGAIN: i32 = 11;
const EDOM: i32 = 33;

impl ControllerError {
    /// The failure code returned to a device-file caller.
    ///
    /// Every error kind maps to its own negative errno-style code.
    pub fn code(&self) -> i32 {
        let errno = match self {
            Self::Truncated { .. } => EBADMSG,
            Self::UnknownCommand(_) => EBADRQC,
            Self::UnknownMode(_) => EINVAL,
            Self::UnknownDataKind(_) => EDOM,
            Self::OutOfRange { .. } => EMSGSIZE,
            Self::OutOfMemory(_) => ENOMEM,
            Self::ModeMismatch(_) => ENODATA,
            Self::InvalidModeSettings { .. } => ERANGE,
            Self::BufferTooSmall { .. } => ENOBUFS,
            Self::NoPendingRequest => EAGAIN,
            Self::Transport(TransportError::Timeout) => ETIMEDOUT,
            Self::Transport(TransportError::Disconnected) => ENODEV,
            Self::Transport(TransportError::UnexpectedResponse(_)) => EPROTO,
            Self::Transport(TransportError::Io(_)) | Self::Io(_) => EIO,
        };
        -errno
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::Truncated { .. }
            | Self::UnknownCommand(_)
            | Self::UnknownMode(_)
            | Self::UnknownDataKind(_)
            | Self::InvalidModeSettings { .. } => io::ErrorKind::InvalidData,
            Self::OutOfRange { .. } | Self::BufferTooSmall { .. } => io::ErrorKind::InvalidInput,
            Self::OutOfMemory(_) => io::ErrorKind::OutOfMemory,
            Self::ModeMismatch(_) => io::ErrorKind::Unsupported,
            Self::NoPendingRequest => io::ErrorKind::WouldBlock,
            Self::Transport(TransportError::Timeout) => io::ErrorKind::TimedOut,
            Self::Transport(TransportError::Disconnected) => io::ErrorKind::NotConnected,
            Self::Transport(_) | Self::Io(_) => io::ErrorKind::Other,
        }
    }

    /// Recover a controller error carried inside an [`io::Error`].
    ///
    /// Errors produced by a [`StripSession`](crate::StripSession) through the
    /// `std::io` traits come back out typed; anything else becomes [`ControllerError::Io`].
    pub fn from_io(err: io::Error) -> Self {
        if err
            .get_ref()
            .is_some_and(|inner| inner.is::<ControllerError>())
        {
            if let Some(inner) = err.into_inner() {
                if let Ok(typed) = inner.downcast::<ControllerError>() {
                    return *typed;
                }
            }
            return Self::Io(io::Error::other("unrecoverable device error"));
        }
        Self::Io(err)
    }
}

impl From<ControllerError> for io::Error {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::Io(inner) => inner,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}
