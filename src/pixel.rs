//! Pixel colors and resizable pixel buffers.

use crate::error::ControllerError;

use log::trace;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Bytes used by one pixel on both wire formats.
pub const PIXEL_SIZE: usize = 3;

/// The RGB color of a single LED.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelColor {
    /// Red component.
    pub red: u8,
    /// Green component.
    pub green: u8,
    /// Blue component.
    pub blue: u8,
}

impl PixelColor {
    /// An LED that is switched off.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Create a color from its components.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Read a color from `r, g, b` bytes.
    pub fn from_bytes(bytes: [u8; PIXEL_SIZE]) -> Self {
        let [red, green, blue] = bytes;
        Self { red, green, blue }
    }

    /// The `r, g, b` bytes of this color.
    pub fn to_bytes(self) -> [u8; PIXEL_SIZE] {
        [self.red, self.green, self.blue]
    }
}

/// An owned, resizable run of pixels.
///
/// The length always equals the number of stored pixels and never exceeds
/// `u16::MAX`, the largest count either wire format can address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<PixelColor>,
}

impl PixelBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `len` black pixels.
    ///
    /// # Errors
    /// Returns [`ControllerError::OutOfMemory`] if the allocation fails.
    pub fn zeroed(len: u16) -> Result<Self, ControllerError> {
        let mut buffer = Self::new();
        buffer.resize(len)?;
        Ok(buffer)
    }

    /// Number of pixels in the buffer.
    pub fn len(&self) -> u16 {
        self.pixels.len() as u16
    }

    /// Whether the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The stored pixels.
    pub fn as_slice(&self) -> &[PixelColor] {
        &self.pixels
    }

    /// Resize to `new_len` pixels.
    ///
    /// Pixels below `min(old, new)` keep their value; pixels added by growing are black.
    ///
    /// # Errors
    /// Returns [`ControllerError::OutOfMemory`] if growing fails; the buffer is left untouched.
    pub fn resize(&mut self, new_len: u16) -> Result<(), ControllerError> {
        let new_len = usize::from(new_len);
        let old_len = self.pixels.len();
        if new_len > old_len {
            self.pixels
                .try_reserve_exact(new_len - old_len)
                .map_err(|_| ControllerError::OutOfMemory(new_len))?;
        }
        self.pixels.resize(new_len, PixelColor::BLACK);
        if new_len < old_len {
            self.pixels.shrink_to_fit();
        }
        trace!("resized pixel buffer {} -> {}", old_len, new_len);
        Ok(())
    }

    /// Copy `data` into the buffer starting at `offset`.
    ///
    /// # Errors
    /// Returns [`ControllerError::OutOfRange`] if `offset + data.len()` exceeds the length.
    pub fn write(&mut self, offset: usize, data: &[PixelColor]) -> Result<(), ControllerError> {
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= self.pixels.len())
            .ok_or(ControllerError::OutOfRange {
                offset,
                length: data.len(),
                capacity: self.pixels.len(),
            })?;
        self.pixels[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// The pixels in `range`, if the range lies inside the buffer.
    pub fn get(&self, range: Range<usize>) -> Option<&[PixelColor]> {
        self.pixels.get(range)
    }

    /// Fill the whole buffer by repeating `frame`, truncating the last repetition.
    ///
    /// An empty frame leaves the buffer unchanged.
    pub fn fill_tiled(&mut self, frame: &[PixelColor]) {
        if frame.is_empty() {
            return;
        }
        for (dest, src) in self.pixels.iter_mut().zip(frame.iter().cycle()) {
            *dest = *src;
        }
    }
}

/// A pixel buffer shared between the control path and the blink thread.
///
/// Each shared buffer has its own lock. See [`crate::controller`] for the lock order.
#[derive(Debug, Clone, Default)]
pub struct SharedPixels(Arc<Mutex<PixelBuffer>>);

impl SharedPixels {
    /// Wrap a buffer for shared access.
    pub fn new(buffer: PixelBuffer) -> Self {
        Self(Arc::new(Mutex::new(buffer)))
    }

    /// Lock the buffer for exclusive access.
    ///
    /// A poisoned lock is recovered: a panicking holder cannot leave the pixels
    /// in a state that violates the buffer's invariants.
    pub fn lock(&self) -> MutexGuard<'_, PixelBuffer> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current length.
    pub fn len(&self) -> u16 {
        self.lock().len()
    }

    /// Copy the pixels out.
    pub fn snapshot(&self) -> Vec<PixelColor> {
        self.lock().as_slice().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: PixelColor = PixelColor::new(65, 0, 0);
    const GREEN: PixelColor = PixelColor::new(0, 65, 0);

    #[test]
    fn test_grow_keeps_prefix_and_zero_fills() {
        let mut buffer = PixelBuffer::zeroed(3).unwrap();
        buffer.write(0, &[RED, GREEN, RED]).unwrap();

        buffer.resize(6).unwrap();
        assert_eq!(buffer.len(), 6);
        assert_eq!(&buffer.as_slice()[..3], &[RED, GREEN, RED]);
        assert!(buffer.as_slice()[3..].iter().all(|p| *p == PixelColor::BLACK));
    }

    #[test]
    fn test_shrink_then_grow_does_not_resurrect() {
        let mut buffer = PixelBuffer::zeroed(4).unwrap();
        buffer.write(0, &[RED; 4]).unwrap();

        buffer.resize(2).unwrap();
        assert_eq!(buffer.as_slice(), &[RED, RED]);

        buffer.resize(4).unwrap();
        assert_eq!(buffer.as_slice(), &[RED, RED, PixelColor::BLACK, PixelColor::BLACK]);
    }

    #[test]
    fn test_write_bounds() {
        let mut buffer = PixelBuffer::zeroed(5).unwrap();

        assert!(buffer.write(3, &[GREEN, GREEN]).is_ok());
        assert!(matches!(
            buffer.write(4, &[GREEN, GREEN]),
            Err(ControllerError::OutOfRange {
                offset: 4,
                length: 2,
                capacity: 5
            })
        ));
        assert!(matches!(
            buffer.write(usize::MAX, &[GREEN]),
            Err(ControllerError::OutOfRange { .. })
        ));
        assert_eq!(
            buffer.as_slice(),
            &[
                PixelColor::BLACK,
                PixelColor::BLACK,
                PixelColor::BLACK,
                GREEN,
                GREEN
            ]
        );
    }

    #[test]
    fn test_write_touches_only_target_range() {
        let mut buffer = PixelBuffer::zeroed(8).unwrap();
        buffer.write(0, &[GREEN; 8]).unwrap();
        buffer.write(2, &[RED; 3]).unwrap();

        for (index, pixel) in buffer.as_slice().iter().enumerate() {
            let expected = if (2..5).contains(&index) { RED } else { GREEN };
            assert_eq!(*pixel, expected, "pixel {index}");
        }
    }

    #[test]
    fn test_fill_tiled_repeats_and_truncates() {
        let mut buffer = PixelBuffer::zeroed(5).unwrap();
        buffer.fill_tiled(&[RED, GREEN]);
        assert_eq!(buffer.as_slice(), &[RED, GREEN, RED, GREEN, RED]);

        let mut short = PixelBuffer::zeroed(1).unwrap();
        short.fill_tiled(&[GREEN, RED, RED]);
        assert_eq!(short.as_slice(), &[GREEN]);
    }

    #[test]
    fn test_pixel_bytes() {
        let pixel = PixelColor::from_bytes([1, 2, 3]);
        assert_eq!(pixel, PixelColor::new(1, 2, 3));
        assert_eq!(pixel.to_bytes(), [1, 2, 3]);
    }
}
