//! Fixed 64-byte frames exchanged with the controller board over USB.

use crate::error::ControllerError;
use crate::pixel::{PIXEL_SIZE, PixelColor};

/// Size of every wire frame.
pub const FRAME_SIZE: usize = 64;

/// Pixels carried by one PixelData frame (one block).
pub const PIXELS_PER_FRAME: usize = 21;

/// A raw wire frame.
pub type RawFrame = [u8; FRAME_SIZE];

const CTRL_PIXEL_DATA: u8 = 0x00;
const CTRL_SET_COUNT: u8 = 0x01;
const CTRL_REQUEST_LENGTH: u8 = 0x02;
const CTRL_REQUEST_PIXEL_BLOCK: u8 = 0x03;
const CTRL_CLEAR: u8 = 0x99;

/// A decoded wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    /// Up to [`PIXELS_PER_FRAME`] pixels. Decoding always yields a full block.
    PixelData(Vec<PixelColor>),
    /// Current and maximum LED count. Also the answer to [`WireFrame::RequestLength`].
    SetCount {
        /// Current LED count.
        count: u16,
        /// Maximum LED count supported by the board (0 when sent by the driver).
        max: u16,
    },
    /// Ask the board for its LED count.
    RequestLength,
    /// Ask the board for the pixels of one block.
    RequestPixelBlock {
        /// Block index; the block covers `[21 * index, 21 * index + 21)`.
        block_index: u16,
    },
    /// Switch all LEDs off.
    Clear,
}

impl WireFrame {
    /// The control byte of this frame.
    pub fn control(&self) -> u8 {
        match self {
            Self::PixelData(_) => CTRL_PIXEL_DATA,
            Self::SetCount { .. } => CTRL_SET_COUNT,
            Self::RequestLength => CTRL_REQUEST_LENGTH,
            Self::RequestPixelBlock { .. } => CTRL_REQUEST_PIXEL_BLOCK,
            Self::Clear => CTRL_CLEAR,
        }
    }

    /// Encode into a zero-padded 64-byte frame.
    ///
    /// Pixels past the first [`PIXELS_PER_FRAME`] are not encoded.
    pub fn encode(&self) -> RawFrame {
        let mut raw = [0u8; FRAME_SIZE];
        raw[0] = self.control();
        match self {
            Self::PixelData(pixels) => {
                for (slot, pixel) in raw[1..]
                    .chunks_exact_mut(PIXEL_SIZE)
                    .zip(pixels.iter().take(PIXELS_PER_FRAME))
                {
                    slot.copy_from_slice(&pixel.to_bytes());
                }
            }
            Self::SetCount { count, max } => {
                raw[1..3].copy_from_slice(&count.to_be_bytes());
                raw[3..5].copy_from_slice(&max.to_be_bytes());
            }
            Self::RequestPixelBlock { block_index } => {
                raw[1..3].copy_from_slice(&block_index.to_be_bytes());
            }
            Self::RequestLength | Self::Clear => {}
        }
        raw
    }

    /// Decode a 64-byte frame.
    ///
    /// # Errors
    /// Returns [`ControllerError::UnknownCommand`] for an unknown control byte.
    pub fn decode(raw: &RawFrame) -> Result<Self, ControllerError> {
        let frame = match raw[0] {
            CTRL_PIXEL_DATA => Self::PixelData(
                raw[1..]
                    .chunks_exact(PIXEL_SIZE)
                    .map(|bytes| PixelColor::new(bytes[0], bytes[1], bytes[2]))
                    .collect(),
            ),
            CTRL_SET_COUNT => Self::SetCount {
                count: u16::from_be_bytes([raw[1], raw[2]]),
                max: u16::from_be_bytes([raw[3], raw[4]]),
            },
            CTRL_REQUEST_LENGTH => Self::RequestLength,
            CTRL_REQUEST_PIXEL_BLOCK => Self::RequestPixelBlock {
                block_index: u16::from_be_bytes([raw[1], raw[2]]),
            },
            CTRL_CLEAR => Self::Clear,
            other => return Err(ControllerError::UnknownCommand(other)),
        };
        Ok(frame)
    }
}

/// Split a pixel run into PixelData frames of at most [`PIXELS_PER_FRAME`] pixels.
pub fn pixel_frames(pixels: &[PixelColor]) -> impl Iterator<Item = RawFrame> + '_ {
    pixels
        .chunks(PIXELS_PER_FRAME)
        .map(|chunk| WireFrame::PixelData(chunk.to_vec()).encode())
}

/// Number of blocks needed to cover `count` pixels.
pub fn block_count(count: u16) -> u16 {
    count.div_ceil(PIXELS_PER_FRAME as u16)
}
