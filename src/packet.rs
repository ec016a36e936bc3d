//! Control-channel records exchanged between the user library and the driver.
//!
//! Every record starts with a control byte. Multi-byte integers are big-endian
//! and records are packed:
//!
//! | ctrl | record      | payload                                                   |
//! |------|-------------|-----------------------------------------------------------|
//! | 0    | SetLength   | `u16 length`                                              |
//! | 1    | PixelData   | `u16 led_count, u16 offset, led_count x (r, g, b)`        |
//! | 2    | SetMode     | `u8 mode`; blink adds `u8 count, u8 len, u16 period_ms`   |
//! | 3    | Clear       |                                                           |
//! | 4    | GetData     | `u8 data_kind, u8 reserved`                               |

use crate::error::ControllerError;
use crate::modes::{BlinkSettings, DataKind, ModeId, ModeSpec};
use crate::pixel::{PIXEL_SIZE, PixelColor};

const CTRL_SET_LENGTH: u8 = 0;
const CTRL_PIXEL_DATA: u8 = 1;
const CTRL_SET_MODE: u8 = 2;
const CTRL_CLEAR: u8 = 3;
const CTRL_GET_DATA: u8 = 4;

const SET_LENGTH_SIZE: usize = 3;
const PIXEL_HEADER_SIZE: usize = 5;
const SET_MODE_HEADER_SIZE: usize = 2;
const CLEAR_SIZE: usize = 1;
const GET_DATA_SIZE: usize = 3;

/// A command written to the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resize the strip.
    SetLength(u16),
    /// Write pixels into the active mode's buffer starting at `offset`.
    SetPixelData {
        /// First pixel index written.
        offset: u16,
        /// Pixels to write.
        pixels: Vec<PixelColor>,
    },
    /// Switch to another mode.
    SetMode(ModeSpec),
    /// Switch the strip off and return to static mode.
    Clear,
    /// Queue a view to be returned by the next read.
    GetData(DataKind),
}

fn ensure_len(buf: &[u8], expected: usize) -> Result<(), ControllerError> {
    if buf.len() < expected {
        return Err(ControllerError::Truncated {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

fn decode_pixels(bytes: &[u8]) -> Vec<PixelColor> {
    bytes
        .chunks_exact(PIXEL_SIZE)
        .map(|chunk| PixelColor::new(chunk[0], chunk[1], chunk[2]))
        .collect()
}

fn decode_pixel_record(buf: &[u8]) -> Result<(u16, Vec<PixelColor>, usize), ControllerError> {
    ensure_len(buf, PIXEL_HEADER_SIZE)?;
    let count = usize::from(read_u16(buf, 1));
    let offset = read_u16(buf, 3);
    let size = PIXEL_HEADER_SIZE + count * PIXEL_SIZE;
    ensure_len(buf, size)?;
    Ok((offset, decode_pixels(&buf[PIXEL_HEADER_SIZE..size]), size))
}

// The header count is 16 bits; the payload never runs past it.
fn encode_pixel_record(out: &mut Vec<u8>, offset: u16, pixels: &[PixelColor]) {
    let count = u16::try_from(pixels.len()).unwrap_or(u16::MAX);
    let pixels = &pixels[..usize::from(count)];
    out.reserve(PIXEL_HEADER_SIZE + pixels.len() * PIXEL_SIZE);
    out.push(CTRL_PIXEL_DATA);
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&offset.to_be_bytes());
    for pixel in pixels {
        out.extend_from_slice(&pixel.to_bytes());
    }
}

fn encode_mode(out: &mut Vec<u8>, spec: &ModeSpec) {
    out.push(CTRL_SET_MODE);
    out.push(spec.id() as u8);
    if let ModeSpec::Blink(settings) = spec {
        out.push(settings.pattern_count);
        out.push(settings.pattern_len);
        out.extend_from_slice(&settings.period_ms.to_be_bytes());
    }
}

fn decode_mode(buf: &[u8]) -> Result<(ModeSpec, usize), ControllerError> {
    ensure_len(buf, SET_MODE_HEADER_SIZE)?;
    let id = ModeId::from_raw(buf[1]).ok_or(ControllerError::UnknownMode(buf[1]))?;
    let size = id.packet_size();
    ensure_len(buf, size)?;
    let spec = match id {
        ModeId::Static => ModeSpec::Static,
        ModeId::Blink => ModeSpec::Blink(BlinkSettings {
            pattern_count: buf[2],
            pattern_len: buf[3],
            period_ms: read_u16(buf, 4),
        }),
    };
    Ok((spec, size))
}

impl Command {
    /// Decode the command at the start of `buf`.
    ///
    /// Returns the command and the number of bytes it occupies, so the caller can
    /// continue with the next command packed into the same write.
    ///
    /// # Errors
    /// - [`ControllerError::Truncated`] if `buf` ends inside the command
    /// - [`ControllerError::UnknownCommand`] for an unknown control byte
    /// - [`ControllerError::UnknownMode`] / [`ControllerError::UnknownDataKind`] for unknown ids
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), ControllerError> {
        ensure_len(buf, 1)?;
        match buf[0] {
            CTRL_SET_LENGTH => {
                ensure_len(buf, SET_LENGTH_SIZE)?;
                Ok((Self::SetLength(read_u16(buf, 1)), SET_LENGTH_SIZE))
            }
            CTRL_PIXEL_DATA => {
                let (offset, pixels, size) = decode_pixel_record(buf)?;
                Ok((Self::SetPixelData { offset, pixels }, size))
            }
            CTRL_SET_MODE => {
                let (spec, size) = decode_mode(buf)?;
                Ok((Self::SetMode(spec), size))
            }
            CTRL_CLEAR => Ok((Self::Clear, CLEAR_SIZE)),
            CTRL_GET_DATA => {
                ensure_len(buf, GET_DATA_SIZE)?;
                let kind =
                    DataKind::from_raw(buf[1]).ok_or(ControllerError::UnknownDataKind(buf[1]))?;
                Ok((Self::GetData(kind), GET_DATA_SIZE))
            }
            other => Err(ControllerError::UnknownCommand(other)),
        }
    }

    /// Append the encoded command to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::SetLength(length) => {
                out.push(CTRL_SET_LENGTH);
                out.extend_from_slice(&length.to_be_bytes());
            }
            Self::SetPixelData { offset, pixels } => encode_pixel_record(out, *offset, pixels),
            Self::SetMode(spec) => encode_mode(out, spec),
            Self::Clear => out.push(CTRL_CLEAR),
            Self::GetData(kind) => out.extend_from_slice(&[CTRL_GET_DATA, *kind as u8, 0]),
        }
    }

    /// Encode the command into a new buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }
}

/// A response rendered for a read on the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadView {
    /// Strip length, framed like SetLength.
    Length(u16),
    /// Active mode, framed like SetMode.
    ModeSettings(ModeSpec),
    /// Pixels, framed like PixelData with offset 0.
    Pixels(Vec<PixelColor>),
}

impl ReadView {
    /// Size of the encoded view.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Length(_) => SET_LENGTH_SIZE,
            Self::ModeSettings(spec) => spec.id().packet_size(),
            Self::Pixels(pixels) => PIXEL_HEADER_SIZE + pixels.len() * PIXEL_SIZE,
        }
    }

    /// Encode the view.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        match self {
            Self::Length(length) => Command::SetLength(*length).encode_into(&mut out),
            Self::ModeSettings(spec) => encode_mode(&mut out, spec),
            Self::Pixels(pixels) => encode_pixel_record(&mut out, 0, pixels),
        }
        out
    }

    /// Decode a view returned by a read.
    ///
    /// # Errors
    /// Returns [`ControllerError::Truncated`] for a short view and
    /// [`ControllerError::UnknownCommand`] if the control byte does not start a view.
    pub fn decode(buf: &[u8]) -> Result<Self, ControllerError> {
        ensure_len(buf, 1)?;
        match buf[0] {
            CTRL_SET_LENGTH => {
                ensure_len(buf, SET_LENGTH_SIZE)?;
                Ok(Self::Length(read_u16(buf, 1)))
            }
            CTRL_SET_MODE => decode_mode(buf).map(|(spec, _)| Self::ModeSettings(spec)),
            CTRL_PIXEL_DATA => decode_pixel_record(buf).map(|(_, pixels, _)| Self::Pixels(pixels)),
            other => Err(ControllerError::UnknownCommand(other)),
        }
    }
}
