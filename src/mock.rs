//! Mock controller board for testing.

use crate::error::TransportError;
use crate::frame::{PIXELS_PER_FRAME, RawFrame, WireFrame};
use crate::pixel::PixelColor;
use crate::transport::Transport;

use log::trace;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// LED buffer size of the reference board.
pub const DEFAULT_MAX_COUNT: u16 = 1000;

#[derive(Debug)]
struct BoardState {
    count: u16,
    max_count: u16,
    buffer: Vec<PixelColor>,
    write_index: usize,
    display: Vec<PixelColor>,
    frames: Vec<WireFrame>,
    refreshes: usize,
    failing_sends: usize,
    disconnected: bool,
}

impl BoardState {
    fn handle(&mut self, frame: &WireFrame) -> Option<WireFrame> {
        match frame {
            WireFrame::PixelData(pixels) => {
                for pixel in pixels.iter().take(PIXELS_PER_FRAME) {
                    if self.write_index >= usize::from(self.count) {
                        break;
                    }
                    self.buffer[self.write_index] = *pixel;
                    self.write_index += 1;
                }
                if self.write_index == usize::from(self.count) {
                    self.display = self.buffer[..self.write_index].to_vec();
                    self.refreshes += 1;
                    self.write_index = 0;
                }
                None
            }
            WireFrame::SetCount { count, .. } => {
                self.count = (*count).min(self.max_count);
                self.write_index = 0;
                self.display = vec![PixelColor::BLACK; usize::from(self.count)];
                None
            }
            WireFrame::RequestLength => Some(WireFrame::SetCount {
                count: self.count,
                max: self.max_count,
            }),
            WireFrame::RequestPixelBlock { block_index } => {
                let start = usize::from(*block_index) * PIXELS_PER_FRAME;
                let end = (start + PIXELS_PER_FRAME).min(usize::from(self.count));
                let pixels = self.buffer.get(start..end).unwrap_or_default().to_vec();
                Some(WireFrame::PixelData(pixels))
            }
            WireFrame::Clear => {
                self.display.fill(PixelColor::BLACK);
                None
            }
        }
    }

    fn receive(&mut self, raw: &RawFrame) -> Result<Option<WireFrame>, TransportError> {
        if self.disconnected {
            return Err(TransportError::Disconnected);
        }
        if self.failing_sends > 0 {
            self.failing_sends -= 1;
            return Err(TransportError::Timeout);
        }
        // the board ignores frames it does not understand
        let Ok(frame) = WireFrame::decode(raw) else {
            trace!("mock strip ignored control byte {:#04x}", raw[0]);
            return Ok(None);
        };
        let response = self.handle(&frame);
        self.frames.push(frame);
        Ok(response)
    }
}

/// A mock WS2812 controller board.
///
/// Behaves like the board firmware: it assembles PixelData frames into its
/// buffer and latches them to the display once `count` pixels have arrived,
/// answers length and block requests, and blanks the display on Clear.
/// Clones share the same board, so a test can keep a handle after passing
/// one to a controller.
///
/// # Example
///
/// ```
/// use ws2812_core::{MockStrip, PixelColor, StripController};
///
/// let strip = MockStrip::new();
/// let mut controller = StripController::new(strip.clone());
/// controller.set_length(2).unwrap();
/// controller.set_pixel_data(0, &[PixelColor::new(65, 0, 0); 2]).unwrap();
/// assert_eq!(strip.display(), vec![PixelColor::new(65, 0, 0); 2]);
/// ```
#[derive(Debug, Clone)]
pub struct MockStrip {
    state: Arc<Mutex<BoardState>>,
}

impl MockStrip {
    /// Create a board with the default buffer size.
    pub fn new() -> Self {
        Self::with_max_count(DEFAULT_MAX_COUNT)
    }

    /// Create a board that holds at most `max_count` LEDs.
    pub fn with_max_count(max_count: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState {
                count: 0,
                max_count,
                buffer: vec![PixelColor::BLACK; usize::from(max_count)],
                write_index: 0,
                display: Vec::new(),
                frames: Vec::new(),
                refreshes: 0,
                failing_sends: 0,
                disconnected: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current LED count.
    pub fn count(&self) -> u16 {
        self.state().count
    }

    /// Pixels currently shown on the strip.
    pub fn display(&self) -> Vec<PixelColor> {
        self.state().display.clone()
    }

    /// The first `count` pixels of the board's buffer.
    pub fn buffer(&self) -> Vec<PixelColor> {
        let state = self.state();
        state.buffer[..usize::from(state.count)].to_vec()
    }

    /// Every frame the board has accepted, in order.
    pub fn frames(&self) -> Vec<WireFrame> {
        self.state().frames.clone()
    }

    /// Number of PixelData frames received.
    pub fn pixel_frames_received(&self) -> usize {
        self.state()
            .frames
            .iter()
            .filter(|frame| matches!(frame, WireFrame::PixelData(_)))
            .count()
    }

    /// Number of times a complete set of pixels was latched to the display.
    pub fn refreshes(&self) -> usize {
        self.state().refreshes
    }

    /// Make the next `count` exchanges time out.
    pub fn fail_next_sends(&self, count: usize) {
        self.state().failing_sends = count;
    }

    /// Simulate unplugging the board.
    pub fn disconnect(&self) {
        self.state().disconnected = true;
    }
}

impl Default for MockStrip {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockStrip {
    fn send_frame(&mut self, frame: &RawFrame) -> Result<(), TransportError> {
        self.state().receive(frame).map(|_| ())
    }

    fn send_and_receive(&mut self, request: &RawFrame) -> Result<RawFrame, TransportError> {
        match self.state().receive(request)? {
            Some(response) => Ok(response.encode()),
            None => Err(TransportError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::pixel_frames;

    const RED: PixelColor = PixelColor::new(65, 0, 0);

    fn send(strip: &mut MockStrip, frame: WireFrame) {
        strip.send_frame(&frame.encode()).unwrap();
    }

    #[test]
    fn test_latches_after_count_pixels() {
        let mut strip = MockStrip::new();
        send(&mut strip, WireFrame::SetCount { count: 30, max: 0 });

        let pixels = vec![RED; 30];
        let frames: Vec<RawFrame> = pixel_frames(&pixels).collect();
        strip.send_frame(&frames[0]).unwrap();
        assert_eq!(strip.refreshes(), 0);
        assert_eq!(strip.display(), vec![PixelColor::BLACK; 30]);

        strip.send_frame(&frames[1]).unwrap();
        assert_eq!(strip.refreshes(), 1);
        assert_eq!(strip.display(), pixels);
    }

    #[test]
    fn test_answers_length_request() {
        let mut strip = MockStrip::with_max_count(100);
        send(&mut strip, WireFrame::SetCount { count: 500, max: 0 });

        let raw = strip
            .send_and_receive(&WireFrame::RequestLength.encode())
            .unwrap();
        assert_eq!(
            WireFrame::decode(&raw).unwrap(),
            WireFrame::SetCount {
                count: 100,
                max: 100
            }
        );
    }

    #[test]
    fn test_answers_block_request() {
        let mut strip = MockStrip::new();
        send(&mut strip, WireFrame::SetCount { count: 25, max: 0 });
        let mut pixels = vec![RED; 25];
        pixels[22] = PixelColor::new(1, 2, 3);
        for frame in pixel_frames(&pixels) {
            strip.send_frame(&frame).unwrap();
        }

        let raw = strip
            .send_and_receive(&WireFrame::RequestPixelBlock { block_index: 1 }.encode())
            .unwrap();
        match WireFrame::decode(&raw).unwrap() {
            WireFrame::PixelData(block) => {
                assert_eq!(&block[..4], &[RED, PixelColor::new(1, 2, 3), RED, RED]);
                assert!(block[4..].iter().all(|p| *p == PixelColor::BLACK));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_clear_blanks_display_only() {
        let mut strip = MockStrip::new();
        send(&mut strip, WireFrame::SetCount { count: 2, max: 0 });
        send(&mut strip, WireFrame::PixelData(vec![RED; 2]));
        send(&mut strip, WireFrame::Clear);

        assert_eq!(strip.display(), vec![PixelColor::BLACK; 2]);
        assert_eq!(strip.buffer(), vec![RED; 2]);
    }

    #[test]
    fn test_faults() {
        let mut strip = MockStrip::new();
        strip.fail_next_sends(1);
        assert!(matches!(
            strip.send_frame(&WireFrame::Clear.encode()),
            Err(TransportError::Timeout)
        ));
        assert!(strip.send_frame(&WireFrame::Clear.encode()).is_ok());

        assert!(matches!(
            strip.send_and_receive(&WireFrame::Clear.encode()),
            Err(TransportError::Timeout)
        ));

        strip.disconnect();
        assert!(matches!(
            strip.send_frame(&WireFrame::Clear.encode()),
            Err(TransportError::Disconnected)
        ));
    }
}
