//! Strip mode definitions.

use crate::error::ControllerError;
use crate::pixel::{PixelBuffer, SharedPixels};
use crate::scheduler::BlinkScheduler;

use std::time::Duration;

const MODE_ID_STATIC: u8 = 0;
const MODE_ID_BLINK: u8 = 1;

const DATA_KIND_LENGTH: u8 = 0;
const DATA_KIND_MODE: u8 = 1;
const DATA_KIND_PIXEL: u8 = 2;
const DATA_KIND_MODE_PIXEL: u8 = 3;

/// Mode ids as they appear on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModeId {
    /// The strip shows the live buffer.
    Static = MODE_ID_STATIC,
    /// The strip cycles through pattern frames.
    Blink = MODE_ID_BLINK,
}

impl ModeId {
    /// Look up a raw mode id.
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            MODE_ID_STATIC => Self::Static,
            MODE_ID_BLINK => Self::Blink,
            _ => return None,
        })
    }

    /// Total size of a SetMode record (and mode-settings view) for this mode.
    pub fn packet_size(self) -> usize {
        match self {
            Self::Static => 2,
            Self::Blink => 6,
        }
    }

    /// Lowercase name, used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Blink => "blink",
        }
    }
}

/// Blink mode parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkSettings {
    /// Number of frames in the pattern.
    pub pattern_count: u8,
    /// Pixels per frame.
    pub pattern_len: u8,
    /// Time each frame stays on the strip, in milliseconds.
    pub period_ms: u16,
}

impl BlinkSettings {
    /// Create blink settings.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidModeSettings`] if either pattern dimension is zero.
    pub fn new(
        pattern_count: u8,
        pattern_len: u8,
        period_ms: u16,
    ) -> Result<Self, ControllerError> {
        let settings = Self {
            pattern_count,
            pattern_len,
            period_ms,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn validate(&self) -> Result<(), ControllerError> {
        if self.pattern_count == 0 || self.pattern_len == 0 {
            return Err(ControllerError::InvalidModeSettings {
                pattern_count: self.pattern_count,
                pattern_len: self.pattern_len,
            });
        }
        Ok(())
    }

    /// Pixels held by the pattern buffer.
    pub fn pattern_buffer_len(&self) -> u16 {
        u16::from(self.pattern_count) * u16::from(self.pattern_len)
    }

    /// Blink period, never shorter than `min`.
    pub fn period(&self, min: Duration) -> Duration {
        Duration::from_millis(u64::from(self.period_ms)).max(min)
    }
}

/// A requested mode, as carried by SetMode and the mode-settings view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeSpec {
    /// Static mode.
    #[default]
    Static,
    /// Blink mode with its settings.
    Blink(BlinkSettings),
}

impl ModeSpec {
    /// The wire id of this mode.
    pub fn id(&self) -> ModeId {
        match self {
            Self::Static => ModeId::Static,
            Self::Blink(_) => ModeId::Blink,
        }
    }
}

/// What a GetData request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataKind {
    /// The strip length reported by the device.
    Length = DATA_KIND_LENGTH,
    /// The active mode and its settings.
    ModeSettings = DATA_KIND_MODE,
    /// The pixels currently held by the device.
    PixelData = DATA_KIND_PIXEL,
    /// The buffer owned by the active mode (live buffer or blink pattern).
    ModePixelData = DATA_KIND_MODE_PIXEL,
}

impl DataKind {
    /// Look up a raw data kind.
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            DATA_KIND_LENGTH => Self::Length,
            DATA_KIND_MODE => Self::ModeSettings,
            DATA_KIND_PIXEL => Self::PixelData,
            DATA_KIND_MODE_PIXEL => Self::ModePixelData,
            _ => return None,
        })
    }
}

/// Runtime state of the active mode.
#[derive(Debug, Default)]
pub(crate) enum Mode {
    #[default]
    Static,
    Blink(BlinkMode),
}

impl Mode {
    pub(crate) fn spec(&self) -> ModeSpec {
        match self {
            Self::Static => ModeSpec::Static,
            Self::Blink(blink) => ModeSpec::Blink(blink.settings),
        }
    }
}

/// Blink mode data: the pattern buffer and the thread cycling it.
///
/// Dropping it stops the scheduler before the pattern buffer is released.
#[derive(Debug)]
pub(crate) struct BlinkMode {
    pub(crate) settings: BlinkSettings,
    pub(crate) pattern: SharedPixels,
    pub(crate) scheduler: BlinkScheduler,
}

impl BlinkMode {
    pub(crate) fn allocate_pattern(
        settings: &BlinkSettings,
    ) -> Result<SharedPixels, ControllerError> {
        settings.validate()?;
        let buffer = PixelBuffer::zeroed(settings.pattern_buffer_len())?;
        Ok(SharedPixels::new(buffer))
    }

    /// Stop the scheduler and wait for its thread to exit.
    pub(crate) fn stop(mut self) {
        self.scheduler.stop();
    }
}
