//! Transport to the controller board.

use crate::error::{ControllerError, TransportError};
use crate::frame::{RawFrame, WireFrame, pixel_frames};
use crate::pixel::PixelColor;

use log::trace;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Trait for transports that move 64-byte frames to and from the board.
///
/// Implementations apply their own timeout and report it as
/// [`TransportError::Timeout`]. This allows for mock implementations in tests.
pub trait Transport: Send {
    /// Send one frame.
    fn send_frame(&mut self, frame: &RawFrame) -> Result<(), TransportError>;

    /// Send a request frame and wait for the board's response frame.
    fn send_and_receive(&mut self, request: &RawFrame) -> Result<RawFrame, TransportError>;
}

/// A transport shared by the control path and the blink thread.
///
/// One lock serializes every exchange: a multi-frame transmission is never
/// interleaved with frames from another caller.
pub struct SharedTransport {
    inner: Mutex<Box<dyn Transport>>,
}

impl std::fmt::Debug for SharedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTransport").finish_non_exhaustive()
    }
}

impl SharedTransport {
    /// Wrap a transport.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            inner: Mutex::new(transport),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Transport>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a single frame.
    pub fn send(&self, frame: &WireFrame) -> Result<(), TransportError> {
        trace!("send frame {:#04x}", frame.control());
        self.lock().send_frame(&frame.encode())
    }

    /// Send a request and decode the board's answer.
    pub fn request(&self, frame: &WireFrame) -> Result<WireFrame, ControllerError> {
        trace!("request frame {:#04x}", frame.control());
        let raw = self.lock().send_and_receive(&frame.encode())?;
        WireFrame::decode(&raw)
            .map_err(|_| ControllerError::Transport(TransportError::UnexpectedResponse(raw[0])))
    }

    /// Send `pixels` as consecutive PixelData frames under one lock.
    ///
    /// Returns the number of frames sent.
    pub fn send_pixels(&self, pixels: &[PixelColor]) -> Result<usize, TransportError> {
        let mut transport = self.lock();
        let mut sent = 0;
        for frame in pixel_frames(pixels) {
            transport.send_frame(&frame)?;
            sent += 1;
        }
        trace!("sent {} pixels in {} frames", pixels.len(), sent);
        Ok(sent)
    }
}
