//! User library over a strip device file.

use crate::error::{ControllerError, TransportError};
use crate::modes::{BlinkSettings, DataKind, ModeSpec};
use crate::packet::{Command, ReadView};
use crate::pixel::{PIXEL_SIZE, PixelColor};

use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

/// Default device file created by the driver for the first strip.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/usb_ws2812_0";

/// Largest view a read can return: a PixelData record with `u16::MAX` pixels.
pub const MAX_VIEW_SIZE: usize = 5 + PIXEL_SIZE * u16::MAX as usize;

/// A blink pattern: `pattern_count` frames of `pattern_len` pixels each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlinkPattern {
    pattern_count: u8,
    pattern_len: u8,
    pixels: Vec<PixelColor>,
}

impl BlinkPattern {
    /// Build a pattern from its frames laid out back to back.
    ///
    /// # Errors
    /// - [`ControllerError::InvalidModeSettings`] if either dimension is zero
    /// - [`ControllerError::OutOfRange`] if `pixels` does not hold exactly
    ///   `pattern_count * pattern_len` pixels
    pub fn new(
        pattern_count: u8,
        pattern_len: u8,
        pixels: Vec<PixelColor>,
    ) -> Result<Self, ControllerError> {
        let settings = BlinkSettings::new(pattern_count, pattern_len, 0)?;
        let expected = usize::from(settings.pattern_buffer_len());
        if pixels.len() != expected {
            return Err(ControllerError::OutOfRange {
                offset: 0,
                length: pixels.len(),
                capacity: expected,
            });
        }
        Ok(Self {
            pattern_count,
            pattern_len,
            pixels,
        })
    }

    /// A square pattern where frame `i` is `colors` rotated left by `i`.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidModeSettings`] if `colors` is empty or
    /// longer than 255.
    pub fn rotation(colors: &[PixelColor]) -> Result<Self, ControllerError> {
        let size = u8::try_from(colors.len()).unwrap_or(0);
        let mut pixels = Vec::with_capacity(colors.len() * colors.len());
        for shift in 0..colors.len() {
            pixels.extend(colors.iter().cycle().skip(shift).take(colors.len()));
        }
        Self::new(size, size, pixels)
    }

    /// Number of frames.
    pub fn pattern_count(&self) -> u8 {
        self.pattern_count
    }

    /// Pixels per frame.
    pub fn pattern_len(&self) -> u8 {
        self.pattern_len
    }

    /// All frames, back to back.
    pub fn pixels(&self) -> &[PixelColor] {
        &self.pixels
    }

    /// Blink settings that match this pattern.
    pub fn settings(&self, period_ms: u16) -> BlinkSettings {
        BlinkSettings {
            pattern_count: self.pattern_count,
            pattern_len: self.pattern_len,
            period_ms,
        }
    }
}

impl Default for BlinkPattern {
    /// Red, green and blue chasing each other over three LEDs.
    fn default() -> Self {
        const R: PixelColor = PixelColor::new(0x41, 0, 0);
        const G: PixelColor = PixelColor::new(0, 0x41, 0);
        const B: PixelColor = PixelColor::new(0, 0, 0x41);
        Self {
            pattern_count: 3,
            pattern_len: 3,
            pixels: vec![R, G, B, G, B, R, B, R, G],
        }
    }
}

/// Issues control-channel commands to a strip device.
///
/// Works over anything that behaves like the device file: the real file or an
/// in-process [`StripSession`](crate::StripSession).
///
/// # Example
///
/// ```
/// use ws2812_core::{MockStrip, PixelColor, StripClient, StripSession};
///
/// let session = StripSession::open(MockStrip::new(), Default::default());
/// let mut client = StripClient::new(session);
///
/// client.set_length(16)?;
/// client.set_pixels(0, &[PixelColor::new(65, 0, 0); 16])?;
/// client.set_pixels(4, &[PixelColor::new(0, 65, 0); 4])?;
///
/// let pixels = client.get_data()?;
/// assert_eq!(pixels.len(), 16);
/// assert_eq!(pixels[5], PixelColor::new(0, 65, 0));
/// # Ok::<(), ws2812_core::ControllerError>(())
/// ```
#[derive(Debug)]
pub struct StripClient<D> {
    device: D,
    read_buf: Vec<u8>,
}

impl StripClient<File> {
    /// Open a device file for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ControllerError> {
        let path = path.as_ref();
        debug!("opening {}", path.display());
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<D: Read + Write> StripClient<D> {
    /// Wrap an open device.
    pub fn new(device: D) -> Self {
        Self {
            device,
            read_buf: Vec::new(),
        }
    }

    /// Give the device back.
    pub fn into_inner(self) -> D {
        self.device
    }

    fn send(&mut self, command: &Command) -> Result<(), ControllerError> {
        self.device
            .write_all(&command.encode())
            .map_err(ControllerError::from_io)
    }

    fn request(&mut self, kind: DataKind) -> Result<ReadView, ControllerError> {
        self.send(&Command::GetData(kind))?;
        if self.read_buf.len() < MAX_VIEW_SIZE {
            self.read_buf.resize(MAX_VIEW_SIZE, 0);
        }
        let read = self
            .device
            .read(&mut self.read_buf)
            .map_err(ControllerError::from_io)?;
        if read == 0 {
            return Err(ControllerError::NoPendingRequest);
        }
        ReadView::decode(&self.read_buf[..read])
    }

    fn unexpected_view(&self) -> ControllerError {
        let control = self.read_buf.first().copied().unwrap_or_default();
        ControllerError::Transport(TransportError::UnexpectedResponse(control))
    }

    /// Set the number of LEDs.
    pub fn set_length(&mut self, length: u16) -> Result<(), ControllerError> {
        self.send(&Command::SetLength(length))
    }

    /// Switch the strip off. Leaves blink mode if it is active.
    pub fn clear(&mut self) -> Result<(), ControllerError> {
        self.send(&Command::Clear)
    }

    /// Switch to static mode.
    pub fn set_mode_static(&mut self) -> Result<(), ControllerError> {
        self.send(&Command::SetMode(ModeSpec::Static))
    }

    /// Switch to blink mode with a black pattern of the given shape.
    pub fn set_mode_blink(
        &mut self,
        pattern_count: u8,
        pattern_len: u8,
        period_ms: u16,
    ) -> Result<(), ControllerError> {
        let settings = BlinkSettings::new(pattern_count, pattern_len, period_ms)?;
        self.send(&Command::SetMode(ModeSpec::Blink(settings)))
    }

    /// Write pixels starting at `offset` into the active mode's buffer.
    ///
    /// # Errors
    /// Returns [`ControllerError::OutOfRange`] without writing anything if
    /// `pixels` holds more than `u16::MAX` pixels.
    pub fn set_pixels(
        &mut self,
        offset: u16,
        pixels: &[PixelColor],
    ) -> Result<(), ControllerError> {
        if u16::try_from(pixels.len()).is_err() {
            return Err(ControllerError::OutOfRange {
                offset: usize::from(offset),
                length: pixels.len(),
                capacity: usize::from(u16::MAX),
            });
        }
        self.send(&Command::SetPixelData {
            offset,
            pixels: pixels.to_vec(),
        })
    }

    /// Replace the pattern of the running blink mode.
    ///
    /// # Errors
    /// - [`ControllerError::ModeMismatch`] if blink mode is not active
    /// - [`ControllerError::InvalidModeSettings`] if the pattern shape differs
    ///   from the active blink settings
    pub fn set_blink_pattern(&mut self, pattern: &BlinkPattern) -> Result<(), ControllerError> {
        let settings = match self.get_mode()? {
            ModeSpec::Blink(settings) => settings,
            ModeSpec::Static => return Err(ControllerError::ModeMismatch("static")),
        };
        if settings.pattern_count != pattern.pattern_count
            || settings.pattern_len != pattern.pattern_len
        {
            debug!(
                "pattern {}x{} does not match active {}x{}",
                pattern.pattern_count,
                pattern.pattern_len,
                settings.pattern_count,
                settings.pattern_len
            );
            return Err(ControllerError::InvalidModeSettings {
                pattern_count: pattern.pattern_count,
                pattern_len: pattern.pattern_len,
            });
        }
        self.set_pixels(0, &pattern.pixels)
    }

    /// The LED count reported by the board.
    pub fn get_length(&mut self) -> Result<u16, ControllerError> {
        match self.request(DataKind::Length)? {
            ReadView::Length(length) => Ok(length),
            _ => Err(self.unexpected_view()),
        }
    }

    /// The active mode and its settings.
    pub fn get_mode(&mut self) -> Result<ModeSpec, ControllerError> {
        match self.request(DataKind::ModeSettings)? {
            ReadView::ModeSettings(spec) => Ok(spec),
            _ => Err(self.unexpected_view()),
        }
    }

    /// Size of the buffer owned by the active mode: the strip length in static
    /// mode, the pattern size in blink mode.
    pub fn get_mode_data_length(&mut self) -> Result<u16, ControllerError> {
        match self.get_mode()? {
            ModeSpec::Static => self.get_length(),
            ModeSpec::Blink(settings) => Ok(settings.pattern_buffer_len()),
        }
    }

    /// The pixels currently held by the board.
    pub fn get_data(&mut self) -> Result<Vec<PixelColor>, ControllerError> {
        self.request_pixels(DataKind::PixelData)
    }

    /// The buffer owned by the active mode: live pixels or the blink pattern.
    pub fn get_mode_data(&mut self) -> Result<Vec<PixelColor>, ControllerError> {
        self.request_pixels(DataKind::ModePixelData)
    }

    fn request_pixels(&mut self, kind: DataKind) -> Result<Vec<PixelColor>, ControllerError> {
        match self.request(kind)? {
            ReadView::Pixels(pixels) => Ok(pixels),
            _ => Err(self.unexpected_view()),
        }
    }
}
