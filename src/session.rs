//! Device-file session: the byte-stream face of one strip.

use crate::config::DriverConfig;
use crate::controller::StripController;
use crate::error::ControllerError;
use crate::packet::Command;
use crate::requests::ReadRequestQueue;
use crate::state::StripState;
use crate::transport::Transport;

use log::{debug, error, info, trace};
use std::io;

/// An open control channel to one strip.
///
/// Writes carry packed control-channel commands; reads return the views
/// queued by GetData commands, one view per read. The session also implements
/// [`io::Read`] and [`io::Write`], so anything that drives a device file can
/// drive a session instead.
///
/// # Example
///
/// ```
/// use ws2812_core::{Command, DataKind, MockStrip, StripSession};
///
/// let mut session = StripSession::open(MockStrip::new(), Default::default());
/// let mut request = Command::SetLength(8).encode();
/// Command::GetData(DataKind::Length).encode_into(&mut request);
/// assert_eq!(session.write(&request)?, 6);
///
/// let mut buf = [0u8; 16];
/// assert_eq!(session.read(&mut buf)?, 3);
/// assert_eq!(&buf[..3], &[0, 0, 8]);
/// assert_eq!(session.read(&mut buf)?, 0);
/// # Ok::<(), ws2812_core::ControllerError>(())
/// ```
#[derive(Debug)]
pub struct StripSession {
    controller: StripController,
    requests: ReadRequestQueue,
}

impl StripSession {
    /// Open a session on `transport`. The strip starts in static mode with length 0.
    pub fn open(transport: impl Transport + 'static, config: DriverConfig) -> Self {
        info!("session opened");
        Self {
            controller: StripController::with_config(transport, config),
            requests: ReadRequestQueue::new(),
        }
    }

    /// Decode and execute every command packed into `buf`.
    ///
    /// Returns the number of bytes consumed, which is `buf.len()` on success.
    /// Commands before a failing one have already taken effect.
    ///
    /// # Errors
    /// The error of the first command that fails to decode or execute.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, ControllerError> {
        let mut consumed = 0;
        while consumed < buf.len() {
            let (command, size) = Command::decode(&buf[consumed..]).inspect_err(|e| {
                error!("bad command at byte {}: {}", consumed, e);
            })?;
            trace!("command {:?} ({} bytes)", command, size);
            self.execute(command)?;
            consumed += size;
        }
        Ok(consumed)
    }

    fn execute(&mut self, command: Command) -> Result<(), ControllerError> {
        match command {
            Command::SetLength(length) => self.controller.set_length(length),
            Command::SetPixelData { offset, pixels } => {
                self.controller.set_pixel_data(offset, &pixels)
            }
            Command::SetMode(spec) => self.controller.set_mode(spec),
            Command::Clear => self.controller.clear(),
            Command::GetData(kind) => {
                self.requests.enqueue(kind);
                debug!("queued {:?} ({} pending)", kind, self.requests.len());
                Ok(())
            }
        }
    }

    /// Serve the oldest pending GetData request into `buf`.
    ///
    /// Returns the number of bytes written, or 0 if no request is pending.
    /// The request is consumed even if rendering it fails.
    ///
    /// # Errors
    /// - [`ControllerError::BufferTooSmall`] if the view does not fit in `buf`
    /// - any error from [`StripController::get_view`]
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ControllerError> {
        let Some(kind) = self.requests.dequeue() else {
            trace!("read with no pending request");
            return Ok(0);
        };
        let view = self.controller.get_view(kind)?;
        let needed = view.encoded_len();
        if buf.len() < needed {
            return Err(ControllerError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }
        buf[..needed].copy_from_slice(&view.encode());
        Ok(needed)
    }

    /// Close the session, stopping the blink thread if one is running.
    pub fn close(mut self) {
        self.controller.deactivate();
        info!("session closed");
    }

    /// A snapshot of the session's current state.
    pub fn state(&self) -> StripState {
        StripState {
            mode: self.controller.mode_spec(),
            length: self.controller.length(),
            pending_reads: self.requests.len(),
        }
    }

    /// The controller behind this session.
    pub fn controller(&self) -> &StripController {
        &self.controller
    }
}

impl io::Read for StripSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        StripSession::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Write for StripSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        StripSession::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
